//! Canonical logging macros
//!
//! Every operation that logs emits exactly one `start` and one `end` or
//! `end_error` event, all carrying `component`, `op` and `event`.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use arbor_core::log_op_start;
/// log_op_start!("reconcile");
/// log_op_start!("predictor_learn", pattern_key = "7:counter::count");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = arbor_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = arbor_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use arbor_core::log_op_end;
/// log_op_end!("reconcile", duration_ms = 3, patch_count = 2);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = arbor_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = arbor_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// The error is converted into `ExError` to obtain its kind and stable code.
///
/// # Example
///
/// ```
/// # use arbor_core::log_op_error;
/// # use arbor_core::errors::PatchError;
/// let err = PatchError::InvalidPath { path: vec![4] };
/// log_op_error!("apply", err, duration_ms = 1);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        use $crate::errors::ExError;
        let ex_err: ExError = $err.into();
        tracing::warn!(
            component = module_path!(),
            op = $op,
            event = arbor_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            message = ex_err.message(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        use $crate::errors::ExError;
        let ex_err: ExError = $err.into();
        tracing::warn!(
            component = module_path!(),
            op = $op,
            event = arbor_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            message = ex_err.message(),
            $($field)*
        );
    }};
}
