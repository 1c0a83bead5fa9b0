//! Structured logging facility for arbor
//!
//! - Single initialization point via `init(profile)`
//! - Structured logging macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! The core never installs a subscriber on its own. Hosts call `init` once,
//! tests call `init_test_capture`.
//!
//! # Usage
//!
//! ```rust
//! use arbor_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```
//!
//! # Logging Macros
//!
//! - `log_op_start!(op, ...)` - Log operation start
//! - `log_op_end!(op, duration_ms = ...)` - Log operation end
//! - `log_op_error!(op, err, duration_ms = ...)` - Log operation error with
//!   `err_kind`/`err_code` taken from the canonical `ExError` mapping

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
