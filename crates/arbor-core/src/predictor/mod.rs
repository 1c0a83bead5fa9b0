//! Pattern-learning predictor.
//!
//! A predictor remembers which patch lists followed each kind of state change
//! and, when the same kind of change happens again, offers the most common
//! one before the authoritative diff is available.
//!
//! ## Lifecycle of a pattern
//!
//! - **New**: created by the first `learn` of a (key, patch list) pair
//! - **Observed**: its count grows on every identical `learn`
//! - **Evicted**: removed by a limit, `clear`, `reset` or `import`
//!
//! ## Limits
//!
//! `learn` checks up front that the new observation can fit at all, then
//! inserts it and evicts other patterns until `max_patterns_per_key`,
//! `max_total_patterns` and `max_memory_bytes` hold again. A failed `learn`
//! leaves the table as it was.
//!
//! ## Concurrency
//!
//! `predict`, `stats`, `memory_usage` and `export` take `&self` and may run in
//! parallel; `learn`, `record_outcome`, `clear`, `reset` and `import` take
//! `&mut self`. Usage ticks and prediction counters are atomics so that
//! `predict` stays read-only.

pub mod config;
pub(crate) mod eviction;
pub(crate) mod fallback;
pub mod memory;
pub mod pattern;
pub mod persist;
pub(crate) mod table;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::apply::apply_in_place;
use crate::diff::diff;
use crate::errors::{ArborError, PredictorError, Result, SerializationError};
use crate::metrics::Metrics;
use crate::model::{Node, Patch, Prediction, StateChange};
use crate::predictor::memory::{bucket_bytes, pattern_bytes, TABLE_OVERHEAD};
use crate::predictor::table::PatternTable;
use crate::rules::validation::validate;
use crate::{log_op_end, log_op_error, log_op_start};

pub use config::{EvictionPolicy, FallbackPolicy, PredictorConfig};
pub use pattern::{PredictionPattern, Snapshots};
pub use persist::{compute_table_digest, PatternTableDocument, FORMAT_VERSION};

/// What `learn` did with an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnOutcome {
    /// A new pattern was stored
    Created { evicted: usize },
    /// An existing pattern with the same patch list was counted again
    Observed {
        observation_count: u64,
        evicted: usize,
    },
}

impl LearnOutcome {
    /// Patterns evicted to make room
    pub fn evicted(&self) -> usize {
        match self {
            LearnOutcome::Created { evicted } | LearnOutcome::Observed { evicted, .. } => *evicted,
        }
    }
}

/// Result of a successful `import`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOutcome {
    /// Patterns present in the document
    pub imported: usize,
    /// Patterns dropped to fit this predictor's limits
    pub evicted: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorStats {
    pub pattern_keys: usize,
    pub pattern_count: usize,
    pub total_observations: u64,
    pub memory_bytes: usize,
    /// Calls to `predict`
    pub prediction_count: u64,
    /// Calls to `predict` that returned a prediction
    pub hit_count: u64,
    /// Mean confidence over hits
    pub average_confidence: f64,
    pub correct_predictions: u64,
    pub incorrect_predictions: u64,
    /// Correct share of outcomes reported via `record_outcome`
    pub hit_rate: f64,
    pub evictions: u64,
}

#[derive(Debug, Default)]
struct Counters {
    predictions: AtomicU64,
    hits: AtomicU64,
    confidence_sum: AtomicU64,
    evictions: AtomicU64,
}

impl Counters {
    fn record_hit(&self, confidence: f64) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.confidence_sum
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + confidence).to_bits())
            })
            .ok();
    }

    fn reset(&self) {
        for counter in [
            &self.predictions,
            &self.hits,
            &self.confidence_sum,
            &self.evictions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[derive(Debug)]
pub struct Predictor {
    config: PredictorConfig,
    table: PatternTable,
    clock: AtomicU64,
    counters: Counters,
    metrics: Arc<Metrics>,
}

impl Predictor {
    /// Predictor recording into the global metrics
    pub fn new(config: PredictorConfig) -> Self {
        Self::with_metrics(config, Metrics::global())
    }

    pub fn with_metrics(config: PredictorConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            config,
            table: PatternTable::new(),
            clock: AtomicU64::new(0),
            counters: Counters::default(),
            metrics,
        }
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record that `change` turned `old_tree` into `new_tree`
    ///
    /// # Errors
    ///
    /// - `ValidationError` if either tree is out of limits
    /// - `PredictorFull` if a pattern limit is zero
    /// - `MemoryLimitExceeded` if this observation alone exceeds
    ///   `max_memory_bytes`
    ///
    /// Stored patterns are unchanged on error.
    pub fn learn(
        &mut self,
        change: &StateChange,
        old_tree: &Node,
        new_tree: &Node,
    ) -> Result<LearnOutcome> {
        let start = Instant::now();
        let key = change.pattern_key();
        log_op_start!("predictor_learn", pattern_key = key.as_str());

        let result = self.learn_pattern(&key, old_tree, new_tree);
        self.metrics.record_learn(start.elapsed(), result.is_err());

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(outcome) => {
                log_op_end!(
                    "predictor_learn",
                    duration_ms = duration_ms,
                    pattern_key = key.as_str(),
                    evicted = outcome.evicted(),
                    pattern_count = self.table.len()
                );
            }
            Err(err) => {
                log_op_error!(
                    "predictor_learn",
                    err.clone(),
                    duration_ms = duration_ms,
                    pattern_key = key.as_str()
                );
            }
        }
        result
    }

    fn learn_pattern(&mut self, key: &str, old_tree: &Node, new_tree: &Node) -> Result<LearnOutcome> {
        validate(old_tree, &self.config.validation)?;
        validate(new_tree, &self.config.validation)?;

        let patches = diff(old_tree, new_tree);
        let snapshots = self.config.retain_snapshots.then(|| Snapshots {
            old: old_tree.clone(),
            new: new_tree.clone(),
        });
        let now = self.tick();
        let candidate = PredictionPattern::new(key.to_string(), patches, snapshots, now);
        self.check_fits(&candidate)?;

        if let Some(index) = self.table.position(key, &candidate.patches) {
            let protect = self.table.bucket(key).and_then(|b| b.get(index)).map(|p| p.created_at);
            if let Some(count) = self.table.observe(key, index, now, candidate.snapshots.clone()) {
                let evicted = self.enforce_limits(protect)?;
                return Ok(LearnOutcome::Observed {
                    observation_count: count,
                    evicted,
                });
            }
        }

        self.table.insert(candidate);
        let trimmed = eviction::trim_bucket(
            &mut self.table,
            key,
            self.config.max_patterns_per_key,
            Some(now),
        );
        self.note_evictions(trimmed);
        let evicted = self.enforce_limits(Some(now))?;
        Ok(LearnOutcome::Created {
            evicted: trimmed + evicted,
        })
    }

    /// Fail before mutating if the candidate could never be stored
    fn check_fits(&self, candidate: &PredictionPattern) -> std::result::Result<(), PredictorError> {
        let limit = self
            .config
            .max_total_patterns
            .min(self.config.max_patterns_per_key);
        if limit == 0 {
            return Err(PredictorError::PredictorFull { limit });
        }

        let required =
            TABLE_OVERHEAD + bucket_bytes(&candidate.pattern_key) + pattern_bytes(candidate);
        if required > self.config.max_memory_bytes {
            return Err(PredictorError::MemoryLimitExceeded {
                required,
                max: self.config.max_memory_bytes,
            });
        }
        Ok(())
    }

    fn enforce_limits(&mut self, protect: Option<u64>) -> std::result::Result<usize, PredictorError> {
        let result = eviction::enforce_limits(&mut self.table, &self.config, protect);
        if let Ok(evicted) = &result {
            self.note_evictions(*evicted);
        }
        result
    }

    fn note_evictions(&self, evicted: usize) {
        if evicted == 0 {
            return;
        }
        self.counters
            .evictions
            .fetch_add(evicted as u64, Ordering::Relaxed);
        self.metrics.record_evictions(evicted);
        tracing::debug!(
            evicted = evicted,
            pattern_count = self.table.len(),
            memory_bytes = self.table.memory_bytes(),
            policy = ?self.config.eviction_policy,
            "patterns evicted"
        );
    }

    /// Guess the patch list `change` will produce on `current_tree`
    ///
    /// Returns `None` when the key has patterns but the best one falls below
    /// `min_confidence`, when adaptation to `current_tree` drops every patch,
    /// or when the key was never learned and the fallback is disabled or has
    /// nothing to offer.
    pub fn predict(&self, change: &StateChange, current_tree: &Node) -> Option<Prediction> {
        let start = Instant::now();
        let key = change.pattern_key();
        log_op_start!("predictor_predict", pattern_key = key.as_str());

        let prediction = match self.table.bucket(&key) {
            Some(bucket) if !bucket.is_empty() => self.predict_learned(bucket, current_tree),
            _ => self.predict_fallback(change, current_tree),
        };

        self.counters.predictions.fetch_add(1, Ordering::Relaxed);
        if let Some(p) = &prediction {
            self.counters.record_hit(p.confidence);
        }
        self.metrics
            .record_prediction(start.elapsed(), prediction.is_some());
        log_op_end!(
            "predictor_predict",
            duration_ms = start.elapsed().as_millis() as u64,
            pattern_key = key.as_str(),
            hit = prediction.is_some()
        );
        prediction
    }

    /// Precompute the patches for a change the host expects to happen next
    ///
    /// A hint names the changes by `hint_id`; only single-change hints have
    /// a learned counterpart, anything else yields `None`.
    pub fn predict_hint(
        &self,
        hint_id: &str,
        changes: &[StateChange],
        current_tree: &Node,
    ) -> Option<Prediction> {
        let [change] = changes else {
            tracing::debug!(
                op = "predictor_predict_hint",
                hint_id = hint_id,
                change_count = changes.len(),
                "multi-change hint not predicted"
            );
            return None;
        };

        let prediction = self.predict(change, current_tree);
        tracing::debug!(
            op = "predictor_predict_hint",
            hint_id = hint_id,
            hit = prediction.is_some(),
            "hint processed"
        );
        prediction
    }

    fn predict_learned(&self, bucket: &[PredictionPattern], current: &Node) -> Option<Prediction> {
        let best = best_pattern(bucket)?;
        let total: u64 = bucket.iter().map(|p| p.observation_count).sum();
        let confidence = best.observation_count as f64 / total.max(1) as f64;
        if confidence < self.config.min_confidence {
            return None;
        }

        best.last_used.set(self.tick());
        adapt(best, current).map(|patches| Prediction {
            patches,
            confidence,
        })
    }

    fn predict_fallback(&self, change: &StateChange, current: &Node) -> Option<Prediction> {
        match self.config.fallback {
            FallbackPolicy::Disabled => None,
            FallbackPolicy::NumericText => {
                let confidence = self.config.fallback_confidence;
                if confidence < self.config.min_confidence {
                    return None;
                }
                let patches = fallback::numeric_text(change, current);
                (!patches.is_empty()).then_some(Prediction {
                    patches,
                    confidence,
                })
            }
        }
    }

    /// Report what actually happened after a prediction was served
    ///
    /// The outcome is attributed to the pattern whose patch list equals
    /// `predicted`, or else to the pattern `predict` would choose. Returns
    /// whether the prediction was correct, or `None` when no pattern exists
    /// for the key.
    pub fn record_outcome(
        &mut self,
        change: &StateChange,
        predicted: &[Patch],
        actual: &[Patch],
    ) -> Option<bool> {
        let key = change.pattern_key();
        let bucket = self.table.bucket(&key)?;
        let created_at = bucket
            .iter()
            .find(|p| p.patches == predicted)
            .or_else(|| best_pattern(bucket))?
            .created_at;

        let correct = predicted == actual;
        let pattern = self.table.pattern_mut(&key, created_at)?;
        if correct {
            pattern.predictions_correct += 1;
        } else {
            pattern.predictions_incorrect += 1;
        }
        Some(correct)
    }

    /// Patterns stored for the key of `change`
    pub fn patterns_for(&self, change: &StateChange) -> &[PredictionPattern] {
        self.table
            .bucket(&change.pattern_key())
            .unwrap_or_default()
    }

    pub fn pattern_count(&self) -> usize {
        self.table.len()
    }

    /// Approximate bytes held by the pattern table
    pub fn memory_usage(&self) -> usize {
        self.table.memory_bytes()
    }

    pub fn stats(&self) -> PredictorStats {
        let (correct, incorrect, observations) = self.table.patterns().fold(
            (0u64, 0u64, 0u64),
            |(c, i, o), p| {
                (
                    c + p.predictions_correct,
                    i + p.predictions_incorrect,
                    o + p.observation_count,
                )
            },
        );
        let hits = self.counters.hits.load(Ordering::Relaxed);
        let confidence_sum = f64::from_bits(self.counters.confidence_sum.load(Ordering::Relaxed));

        PredictorStats {
            pattern_keys: self.table.key_count(),
            pattern_count: self.table.len(),
            total_observations: observations,
            memory_bytes: self.table.memory_bytes(),
            prediction_count: self.counters.predictions.load(Ordering::Relaxed),
            hit_count: hits,
            average_confidence: if hits == 0 {
                0.0
            } else {
                confidence_sum / hits as f64
            },
            correct_predictions: correct,
            incorrect_predictions: incorrect,
            hit_rate: if correct + incorrect == 0 {
                0.0
            } else {
                correct as f64 / (correct + incorrect) as f64
            },
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }

    /// Drop every pattern; counters are kept
    pub fn clear(&mut self) {
        let dropped = self.table.len();
        self.table.clear();
        tracing::info!(op = "predictor_clear", pattern_count = dropped, "patterns cleared");
    }

    /// Drop every pattern and zero all counters and the clock
    pub fn reset(&mut self) {
        self.clear();
        self.counters.reset();
        self.clock.store(0, Ordering::Relaxed);
    }

    /// Serialize the full pattern table
    ///
    /// # Errors
    ///
    /// Returns `SerializationError::Malformed` if JSON serialization fails.
    pub fn export(&self) -> std::result::Result<String, SerializationError> {
        let start = Instant::now();
        log_op_start!("predictor_export");

        let result = persist::build_document(&self.table, self.clock.load(Ordering::Relaxed))
            .and_then(|document| serde_json::to_string(&document).map_err(Into::into));

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(json) => {
                log_op_end!(
                    "predictor_export",
                    duration_ms = duration_ms,
                    pattern_count = self.table.len(),
                    bytes = json.len()
                );
            }
            Err(err) => {
                log_op_error!("predictor_export", err.clone(), duration_ms = duration_ms);
            }
        }
        result
    }

    /// Replace the pattern table with an exported one
    ///
    /// The document is fully checked and fitted to this predictor's limits
    /// before the current table is replaced.
    ///
    /// # Errors
    ///
    /// - `SerializationError` for oversized, malformed, tampered or
    ///   unsupported documents
    /// - `ValidationError` if a stored snapshot or patch payload is out of limits
    /// - `MemoryLimitExceeded` if even an empty table does not fit
    pub fn import(&mut self, json: &str) -> Result<ImportOutcome> {
        let start = Instant::now();
        log_op_start!("predictor_import", bytes = json.len());

        let result = self.import_document(json);

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(outcome) => {
                log_op_end!(
                    "predictor_import",
                    duration_ms = duration_ms,
                    pattern_count = outcome.imported,
                    evicted = outcome.evicted
                );
            }
            Err(err) => {
                log_op_error!("predictor_import", err.clone(), duration_ms = duration_ms);
            }
        }
        result
    }

    fn import_document(&mut self, json: &str) -> Result<ImportOutcome> {
        let document = persist::parse_document(json, &self.config)?;

        let mut table = PatternTable::new();
        let mut clock = document.clock;
        let imported = document.patterns.len();
        for mut pattern in document.patterns {
            clock = clock.max(pattern.created_at).max(pattern.last_used());
            if !self.config.retain_snapshots {
                pattern.snapshots = None;
            }
            table.insert(pattern);
        }

        let evicted = eviction::enforce_all_limits(&mut table, &self.config)
            .map_err(ArborError::from)?;

        self.table = table;
        self.clock.store(clock, Ordering::Relaxed);
        self.note_evictions(evicted);
        Ok(ImportOutcome { imported, evicted })
    }
}

/// Highest observation count; the earliest created wins ties
fn best_pattern(bucket: &[PredictionPattern]) -> Option<&PredictionPattern> {
    bucket.iter().max_by(|a, b| {
        a.observation_count
            .cmp(&b.observation_count)
            .then(b.created_at.cmp(&a.created_at))
    })
}

/// Fit a remembered patch list to the tree it will be applied to
///
/// Without snapshots, or when the tree is the one the pattern was learned
/// from, the list is returned as is. Otherwise the list is replayed against
/// `current` and patches that no longer apply are dropped; `None` if nothing
/// survives.
fn adapt(pattern: &PredictionPattern, current: &Node) -> Option<Vec<Patch>> {
    let snapshots = match &pattern.snapshots {
        Some(snapshots) if snapshots.old != *current && !pattern.patches.is_empty() => snapshots,
        _ => return Some(pattern.patches.clone()),
    };

    let mut scratch = current.clone();
    let adapted: Vec<Patch> = pattern
        .patches
        .iter()
        .filter(|patch| apply_in_place(&mut scratch, patch).is_ok())
        .cloned()
        .collect();

    if adapted.is_empty() {
        tracing::debug!(
            pattern_key = pattern.pattern_key.as_str(),
            learned_nodes = snapshots.old.node_count(),
            "prediction dropped: no patch applies to current tree"
        );
        return None;
    }
    Some(adapted)
}
