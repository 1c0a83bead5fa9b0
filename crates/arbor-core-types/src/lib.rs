//! Core types shared across arbor facilities
//!
//! This crate provides foundational types used by the reconciliation core,
//! its logging facility and any host embedding it:
//!
//! - **Handles**: PredictorHandle, the opaque name of a predictor instance
//! - **Schema constants**: Canonical field keys and event names

pub mod handle;
pub mod schema;

pub use handle::PredictorHandle;
