//! Validated, logged reconciliation.

use std::sync::Arc;
use std::time::Instant;

use crate::apply::apply_all;
use crate::diff::engine::diff;
use crate::errors::{PatchError, ValidationError};
use crate::metrics::Metrics;
use crate::model::{Node, Patch};
use crate::rules::validation::{validate, ValidationConfig};
use crate::{log_op_end, log_op_error, log_op_start};

/// Diff front end that enforces tree limits before diffing
///
/// Holds no per-call state; one instance can serve any number of threads.
#[derive(Debug, Clone)]
pub struct Reconciler {
    config: ValidationConfig,
    metrics: Arc<Metrics>,
}

impl Reconciler {
    /// Reconciler recording into the global metrics
    pub fn new(config: ValidationConfig) -> Self {
        Self::with_metrics(config, Metrics::global())
    }

    pub fn with_metrics(config: ValidationConfig, metrics: Arc<Metrics>) -> Self {
        Self { config, metrics }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate both trees, then diff them
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` of `old`, then of `new`; no diff is
    /// attempted when either tree is out of limits.
    pub fn reconcile(&self, old: &Node, new: &Node) -> Result<Vec<Patch>, ValidationError> {
        let start = Instant::now();
        log_op_start!("reconcile");

        let checked = validate(old, &self.config).and_then(|()| validate(new, &self.config));
        if let Err(err) = checked {
            self.metrics.record_validation_failure();
            self.metrics.record_reconcile(start.elapsed(), 0, true);
            log_op_error!(
                "reconcile",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            return Err(err);
        }

        let patches = diff(old, new);
        self.metrics
            .record_reconcile(start.elapsed(), patches.len(), false);
        log_op_end!(
            "reconcile",
            duration_ms = start.elapsed().as_millis() as u64,
            patch_count = patches.len()
        );
        Ok(patches)
    }

    /// Apply a patch list, logged and metered like `reconcile`
    ///
    /// # Errors
    ///
    /// Returns the `PatchError` of the first inapplicable patch.
    pub fn apply(&self, tree: &Node, patches: &[Patch]) -> Result<Node, PatchError> {
        let start = Instant::now();
        log_op_start!("apply_patches", patch_count = patches.len());

        match apply_all(tree, patches) {
            Ok(next) => {
                self.metrics.record_apply(patches.len(), false);
                log_op_end!(
                    "apply_patches",
                    duration_ms = start.elapsed().as_millis() as u64
                );
                Ok(next)
            }
            Err(err) => {
                self.metrics.record_apply(patches.len(), true);
                log_op_error!(
                    "apply_patches",
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                Err(err)
            }
        }
    }
}
