//! Predictor registry
//!
//! Owns independent predictor instances keyed by opaque handle. Each instance
//! sits behind its own reader-writer lock; the handle map is sharded, so
//! operations on different handles never wait on one another.
//!
//! Lookups clone the instance `Arc` out of the map before locking it, so a
//! long `learn` never holds a map shard.

use std::sync::Arc;
use std::time::Instant;

use arbor_core_types::PredictorHandle;
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::errors::{ArborError, PredictorError, Result, SerializationError};
use crate::metrics::Metrics;
use crate::model::{Node, Prediction, StateChange};
use crate::predictor::{ImportOutcome, LearnOutcome, Predictor, PredictorConfig, PredictorStats};
use crate::{log_op_end, log_op_error, log_op_start};

type Instance = Arc<RwLock<Predictor>>;

#[derive(Debug)]
pub struct PredictorRegistry {
    predictors: DashMap<PredictorHandle, Instance>,
    default_config: PredictorConfig,
    metrics: Arc<Metrics>,
}

impl Default for PredictorRegistry {
    fn default() -> Self {
        Self::new(PredictorConfig::default())
    }
}

impl PredictorRegistry {
    /// Registry recording into the global metrics
    pub fn new(default_config: PredictorConfig) -> Self {
        Self::with_metrics(default_config, Metrics::global())
    }

    pub fn with_metrics(default_config: PredictorConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            predictors: DashMap::new(),
            default_config,
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Create a predictor with the registry's default configuration
    pub fn create(&self) -> PredictorHandle {
        self.create_with_config(self.default_config.clone())
    }

    pub fn create_with_config(&self, config: PredictorConfig) -> PredictorHandle {
        let handle = PredictorHandle::new();
        let predictor = Predictor::with_metrics(config, Arc::clone(&self.metrics));
        self.predictors
            .insert(handle, Arc::new(RwLock::new(predictor)));
        self.metrics.record_predictor_created();
        tracing::info!(op = "predictor_create", handle = %handle, "predictor created");
        handle
    }

    /// Remove a predictor
    ///
    /// Calls already holding the instance finish normally; later calls with
    /// this handle fail with `InvalidHandle`.
    ///
    /// # Errors
    ///
    /// `InvalidHandle` if the handle is unknown or already destroyed.
    pub fn destroy(&self, handle: PredictorHandle) -> std::result::Result<(), PredictorError> {
        self.predictors
            .remove(&handle)
            .ok_or(PredictorError::InvalidHandle { handle })?;
        self.metrics.record_predictor_destroyed();
        tracing::info!(op = "predictor_destroy", handle = %handle, "predictor destroyed");
        Ok(())
    }

    pub fn contains(&self, handle: PredictorHandle) -> bool {
        self.predictors.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.predictors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictors.is_empty()
    }

    /// Live handles, sorted (UUIDv7 order follows creation time)
    pub fn handles(&self) -> Vec<PredictorHandle> {
        let mut handles: Vec<PredictorHandle> =
            self.predictors.iter().map(|entry| *entry.key()).collect();
        handles.sort();
        handles
    }

    fn instance(&self, handle: PredictorHandle) -> std::result::Result<Instance, PredictorError> {
        self.predictors
            .get(&handle)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(PredictorError::InvalidHandle { handle })
    }

    /// Run `f` with shared access to one predictor
    ///
    /// # Errors
    ///
    /// `InvalidHandle` if the handle is unknown or destroyed.
    pub fn with_predictor<R>(
        &self,
        handle: PredictorHandle,
        f: impl FnOnce(&Predictor) -> R,
    ) -> std::result::Result<R, PredictorError> {
        let instance = self.instance(handle)?;
        let guard = instance.read();
        Ok(f(&*guard))
    }

    /// Run `f` with exclusive access to one predictor
    ///
    /// # Errors
    ///
    /// `InvalidHandle` if the handle is unknown or destroyed.
    pub fn with_predictor_mut<R>(
        &self,
        handle: PredictorHandle,
        f: impl FnOnce(&mut Predictor) -> R,
    ) -> std::result::Result<R, PredictorError> {
        let instance = self.instance(handle)?;
        let mut guard = instance.write();
        Ok(f(&mut *guard))
    }

    /// # Errors
    ///
    /// `InvalidHandle`, or any error of [`Predictor::learn`].
    pub fn learn(
        &self,
        handle: PredictorHandle,
        change: &StateChange,
        old_tree: &Node,
        new_tree: &Node,
    ) -> Result<LearnOutcome> {
        self.with_predictor_mut(handle, |p| p.learn(change, old_tree, new_tree))?
    }

    /// # Errors
    ///
    /// `InvalidHandle` if the handle is unknown or destroyed.
    pub fn predict(
        &self,
        handle: PredictorHandle,
        change: &StateChange,
        current_tree: &Node,
    ) -> std::result::Result<Option<Prediction>, PredictorError> {
        self.with_predictor(handle, |p| p.predict(change, current_tree))
    }

    /// # Errors
    ///
    /// `InvalidHandle` if the handle is unknown or destroyed.
    pub fn predict_hint(
        &self,
        handle: PredictorHandle,
        hint_id: &str,
        changes: &[StateChange],
        current_tree: &Node,
    ) -> std::result::Result<Option<Prediction>, PredictorError> {
        self.with_predictor(handle, |p| p.predict_hint(hint_id, changes, current_tree))
    }

    /// # Errors
    ///
    /// `InvalidHandle` if the handle is unknown or destroyed.
    pub fn stats(&self, handle: PredictorHandle) -> std::result::Result<PredictorStats, PredictorError> {
        self.with_predictor(handle, Predictor::stats)
    }

    /// # Errors
    ///
    /// `InvalidHandle` if the handle is unknown or destroyed.
    pub fn clear(&self, handle: PredictorHandle) -> std::result::Result<(), PredictorError> {
        self.with_predictor_mut(handle, Predictor::clear)
    }

    /// # Errors
    ///
    /// `InvalidHandle` if the handle is unknown or destroyed.
    pub fn reset(&self, handle: PredictorHandle) -> std::result::Result<(), PredictorError> {
        self.with_predictor_mut(handle, Predictor::reset)
    }

    /// # Errors
    ///
    /// `InvalidHandle`, or `SerializationError` if encoding fails.
    pub fn export(&self, handle: PredictorHandle) -> Result<String> {
        let json: std::result::Result<String, SerializationError> =
            self.with_predictor(handle, Predictor::export)?;
        Ok(json?)
    }

    /// # Errors
    ///
    /// `InvalidHandle`, or any error of [`Predictor::import`].
    pub fn import(&self, handle: PredictorHandle, json: &str) -> Result<ImportOutcome> {
        self.with_predictor_mut(handle, |p| p.import(json))?
    }

    /// Clear every predictor; returns how many were cleared
    pub fn clear_all(&self) -> usize {
        let start = Instant::now();
        log_op_start!("registry_clear_all");

        let instances: Vec<Instance> = self
            .predictors
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for instance in &instances {
            instance.write().clear();
        }

        log_op_end!(
            "registry_clear_all",
            duration_ms = start.elapsed().as_millis() as u64,
            predictors = instances.len()
        );
        instances.len()
    }

    /// Export every predictor, keyed by handle, in handle order
    ///
    /// # Errors
    ///
    /// The first `SerializationError` met; nothing is returned partially.
    pub fn export_all(&self) -> Result<Vec<(PredictorHandle, String)>> {
        let start = Instant::now();
        log_op_start!("registry_export_all");

        let mut exports = Vec::with_capacity(self.len());
        for handle in self.handles() {
            match self.export(handle) {
                Ok(json) => exports.push((handle, json)),
                // destroyed concurrently
                Err(ArborError::Predictor(PredictorError::InvalidHandle { .. })) => {}
                Err(err) => {
                    log_op_error!(
                        "registry_export_all",
                        err.clone(),
                        duration_ms = start.elapsed().as_millis() as u64,
                        handle = %handle
                    );
                    return Err(err);
                }
            }
        }

        log_op_end!(
            "registry_export_all",
            duration_ms = start.elapsed().as_millis() as u64,
            pattern_count = exports.len()
        );
        Ok(exports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> PredictorRegistry {
        PredictorRegistry::with_metrics(PredictorConfig::default(), Arc::new(Metrics::new()))
    }

    #[test]
    fn test_destroyed_handle_is_invalid() {
        let registry = registry();
        let handle = registry.create();
        assert!(registry.contains(handle));

        registry.destroy(handle).unwrap();
        assert_eq!(
            registry.destroy(handle),
            Err(PredictorError::InvalidHandle { handle })
        );
        assert!(matches!(
            registry.predict(handle, &StateChange::new("c", "k", json!(0), json!(1)), &Node::text("0")),
            Err(PredictorError::InvalidHandle { .. })
        ));
    }

    #[test]
    fn test_instances_are_independent() {
        let registry = registry();
        let a = registry.create();
        let b = registry.create();
        let sc = StateChange::new("c", "k", json!(0), json!(1));

        registry
            .learn(a, &sc, &Node::text("0"), &Node::text("1"))
            .unwrap();

        assert_eq!(registry.stats(a).unwrap().pattern_count, 1);
        assert_eq!(registry.stats(b).unwrap().pattern_count, 0);
        assert!(registry.predict(b, &sc, &Node::text("0")).unwrap().is_none());
    }

    #[test]
    fn test_handles_sorted_and_counted() {
        let registry = registry();
        let first = registry.create();
        let second = registry.create();

        let handles = registry.handles();
        assert_eq!(registry.len(), 2);
        assert_eq!(handles.len(), 2);
        assert!(handles.contains(&first) && handles.contains(&second));
        assert!(handles.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(registry.metrics().snapshot().active_predictors, 2);
    }

    #[test]
    fn test_export_import_between_handles() {
        let registry = registry();
        let source = registry.create();
        let target = registry.create();
        let sc = StateChange::new("c", "k", json!(0), json!(1));
        registry
            .learn(source, &sc, &Node::text("0"), &Node::text("1"))
            .unwrap();

        let json = registry.export(source).unwrap();
        let outcome = registry.import(target, &json).unwrap();

        assert_eq!(outcome.imported, 1);
        assert!(registry.predict(target, &sc, &Node::text("0")).unwrap().is_some());
        assert_eq!(registry.export_all().unwrap().len(), 2);
    }
}
