//! Tree diff engine.
//!
//! Compares two UI trees and produces the ordered patch list that turns the
//! old tree into the new one.
//!
//! ## Entry points
//!
//! ```
//! use arbor_core::diff::{diff, Reconciler};
//! use arbor_core::model::Node;
//! use arbor_core::rules::ValidationConfig;
//!
//! let old = Node::text("0");
//! let new = Node::text("1");
//!
//! // Pure structural diff, no limits applied
//! assert_eq!(diff(&old, &new).len(), 1);
//!
//! // Validated, logged and metered
//! let patches = Reconciler::new(ValidationConfig::default()).reconcile(&old, &new)?;
//! assert_eq!(patches.len(), 1);
//! # Ok::<(), arbor_core::errors::ValidationError>(())
//! ```
//!
//! ## Guarantees
//!
//! - **Determinism**: identical inputs produce identical patch lists.
//! - **Round trip**: applying `diff(old, new)` to `old` in order yields `new`.
//! - **Minimal on equality**: `diff(t, t)` is empty, and equal subtrees never
//!   produce patches.
//! - **Index convention**: every path is valid against the tree as it exists
//!   after all preceding patches have been applied.

pub mod children;
pub mod engine;
pub mod reconciler;

pub use engine::diff;
pub use reconciler::Reconciler;
