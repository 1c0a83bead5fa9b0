//! Arbor Core - UI tree reconciliation and learned patch prediction
//!
//! This crate provides the engine a host UI runtime embeds to keep rendered
//! trees in sync cheaply:
//! - Persistent UI tree model (elements, text, keyed siblings) and patches
//! - Deterministic keyed/positional diffing with a round-trip guarantee
//! - Patch application and dry-run verification
//! - Tree validation against configurable resource limits
//! - Per-instance predictors that learn which patches follow a state change
//! - A concurrent registry of predictor instances addressed by opaque handles
//! - Process-wide metrics, JSON wire codec and TOML configuration

pub mod apply;
pub mod codec;
pub mod config;
pub mod diff;
pub mod errors;
pub mod logging_facility;
pub mod metrics;
pub mod model;
pub mod predictor;
pub mod registry;
pub mod rules;

// Re-export commonly used types
pub use apply::{apply, apply_all, verify_all};
pub use arbor_core_types::PredictorHandle;
pub use config::EngineConfig;
pub use diff::{diff, Reconciler};
pub use errors::{ArborError, ExError, ExErrorKind, Result};
pub use metrics::{Metrics, MetricsSnapshot};
pub use model::{Node, Patch, Prediction, StateChange};
pub use predictor::{Predictor, PredictorConfig};
pub use registry::PredictorRegistry;
pub use rules::{validate, ValidationConfig};
