//! Process metrics for reconciliation and prediction
//!
//! Counters are lock-free atomics. Average timings are exponentially weighted
//! moving averages stored as `f64` bits and updated with compare-and-swap, so
//! recording never blocks a caller.
//!
//! Components record into an injected `Arc<Metrics>`; hosts that do not care
//! share [`Metrics::global`].

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Weight of the newest sample in the moving averages
const EWMA_ALPHA: f64 = 0.1;

static GLOBAL: OnceLock<Arc<Metrics>> = OnceLock::new();

#[derive(Debug)]
pub struct Metrics {
    started: Instant,

    reconcile_calls: AtomicU64,
    reconcile_errors: AtomicU64,
    patches_generated: AtomicU64,
    validation_failures: AtomicU64,
    avg_reconcile_us: AtomicU64,

    patches_applied: AtomicU64,
    apply_failures: AtomicU64,

    learn_calls: AtomicU64,
    learn_errors: AtomicU64,
    avg_learn_us: AtomicU64,

    predictions: AtomicU64,
    prediction_hits: AtomicU64,
    prediction_misses: AtomicU64,
    avg_prediction_us: AtomicU64,

    evictions: AtomicU64,
    active_predictors: AtomicUsize,
    peak_predictors: AtomicUsize,
}

/// Point-in-time copy of all metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub reconcile_calls: u64,
    pub reconcile_errors: u64,
    pub patches_generated: u64,
    pub validation_failures: u64,
    pub avg_reconcile_us: f64,
    pub patches_applied: u64,
    pub apply_failures: u64,
    pub learn_calls: u64,
    pub learn_errors: u64,
    pub avg_learn_us: f64,
    pub predictions: u64,
    pub prediction_hits: u64,
    pub prediction_misses: u64,
    pub prediction_hit_rate: f64,
    pub avg_prediction_us: f64,
    pub evictions: u64,
    pub active_predictors: usize,
    pub peak_predictors: usize,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            reconcile_calls: AtomicU64::new(0),
            reconcile_errors: AtomicU64::new(0),
            patches_generated: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
            avg_reconcile_us: AtomicU64::new(0),
            patches_applied: AtomicU64::new(0),
            apply_failures: AtomicU64::new(0),
            learn_calls: AtomicU64::new(0),
            learn_errors: AtomicU64::new(0),
            avg_learn_us: AtomicU64::new(0),
            predictions: AtomicU64::new(0),
            prediction_hits: AtomicU64::new(0),
            prediction_misses: AtomicU64::new(0),
            avg_prediction_us: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            active_predictors: AtomicUsize::new(0),
            peak_predictors: AtomicUsize::new(0),
        }
    }

    /// Shared process-wide instance
    pub fn global() -> Arc<Metrics> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Metrics::new())))
    }

    pub fn record_reconcile(&self, elapsed: Duration, patch_count: usize, failed: bool) {
        self.reconcile_calls.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.reconcile_errors.fetch_add(1, Ordering::Relaxed);
        } else {
            self.patches_generated
                .fetch_add(patch_count as u64, Ordering::Relaxed);
        }
        update_average(&self.avg_reconcile_us, elapsed);
    }

    pub fn record_validation_failure(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_apply(&self, patch_count: usize, failed: bool) {
        if failed {
            self.apply_failures.fetch_add(1, Ordering::Relaxed);
        } else {
            self.patches_applied
                .fetch_add(patch_count as u64, Ordering::Relaxed);
        }
    }

    pub fn record_learn(&self, elapsed: Duration, failed: bool) {
        self.learn_calls.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.learn_errors.fetch_add(1, Ordering::Relaxed);
        }
        update_average(&self.avg_learn_us, elapsed);
    }

    /// Record one predict call; `hit` means a prediction was returned
    pub fn record_prediction(&self, elapsed: Duration, hit: bool) {
        self.predictions.fetch_add(1, Ordering::Relaxed);
        let counter = if hit {
            &self.prediction_hits
        } else {
            &self.prediction_misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        update_average(&self.avg_prediction_us, elapsed);
    }

    pub fn record_evictions(&self, count: usize) {
        if count > 0 {
            self.evictions.fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    pub fn record_predictor_created(&self) {
        let active = self.active_predictors.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_predictors.fetch_max(active, Ordering::Relaxed);
    }

    pub fn record_predictor_destroyed(&self) {
        self.active_predictors
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .ok();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let predictions = self.predictions.load(Ordering::Relaxed);
        let hits = self.prediction_hits.load(Ordering::Relaxed);
        MetricsSnapshot {
            uptime_secs: self.started.elapsed().as_secs(),
            reconcile_calls: self.reconcile_calls.load(Ordering::Relaxed),
            reconcile_errors: self.reconcile_errors.load(Ordering::Relaxed),
            patches_generated: self.patches_generated.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            avg_reconcile_us: load_average(&self.avg_reconcile_us),
            patches_applied: self.patches_applied.load(Ordering::Relaxed),
            apply_failures: self.apply_failures.load(Ordering::Relaxed),
            learn_calls: self.learn_calls.load(Ordering::Relaxed),
            learn_errors: self.learn_errors.load(Ordering::Relaxed),
            avg_learn_us: load_average(&self.avg_learn_us),
            predictions,
            prediction_hits: hits,
            prediction_misses: self.prediction_misses.load(Ordering::Relaxed),
            prediction_hit_rate: if predictions == 0 {
                0.0
            } else {
                hits as f64 / predictions as f64
            },
            avg_prediction_us: load_average(&self.avg_prediction_us),
            evictions: self.evictions.load(Ordering::Relaxed),
            active_predictors: self.active_predictors.load(Ordering::Relaxed),
            peak_predictors: self.peak_predictors.load(Ordering::Relaxed),
        }
    }

    /// Zero every counter and average
    ///
    /// The active predictor gauge is left alone; the peak restarts from it.
    pub fn reset(&self) {
        for counter in [
            &self.reconcile_calls,
            &self.reconcile_errors,
            &self.patches_generated,
            &self.validation_failures,
            &self.avg_reconcile_us,
            &self.patches_applied,
            &self.apply_failures,
            &self.learn_calls,
            &self.learn_errors,
            &self.avg_learn_us,
            &self.predictions,
            &self.prediction_hits,
            &self.prediction_misses,
            &self.avg_prediction_us,
            &self.evictions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.peak_predictors.store(
            self.active_predictors.load(Ordering::Relaxed),
            Ordering::Relaxed,
        );
    }
}

fn update_average(cell: &AtomicU64, elapsed: Duration) {
    let sample = elapsed.as_secs_f64() * 1_000_000.0;
    cell.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
        let current = f64::from_bits(bits);
        let next = if bits == 0 {
            sample
        } else {
            current + EWMA_ALPHA * (sample - current)
        };
        Some(next.to_bits())
    })
    .ok();
}

fn load_average(cell: &AtomicU64) -> f64 {
    f64::from_bits(cell.load(Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_counters_accumulate() {
        let metrics = Metrics::new();
        metrics.record_reconcile(Duration::from_micros(100), 3, false);
        metrics.record_reconcile(Duration::from_micros(100), 0, true);
        metrics.record_prediction(Duration::from_micros(10), true);
        metrics.record_prediction(Duration::from_micros(10), false);

        let snap = metrics.snapshot();
        assert_eq!(snap.reconcile_calls, 2);
        assert_eq!(snap.reconcile_errors, 1);
        assert_eq!(snap.patches_generated, 3);
        assert_eq!(snap.predictions, 2);
        assert!((snap.prediction_hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_first_sample_seeds_average() {
        let metrics = Metrics::new();
        metrics.record_learn(Duration::from_micros(200), false);
        assert!((metrics.snapshot().avg_learn_us - 200.0).abs() < 1e-6);

        metrics.record_learn(Duration::from_micros(300), false);
        let avg = metrics.snapshot().avg_learn_us;
        assert!(avg > 200.0 && avg < 300.0);
    }

    #[test]
    fn test_peak_predictors_tracks_maximum() {
        let metrics = Metrics::new();
        metrics.record_predictor_created();
        metrics.record_predictor_created();
        metrics.record_predictor_destroyed();
        metrics.record_predictor_created();
        metrics.record_predictor_destroyed();
        metrics.record_predictor_destroyed();
        metrics.record_predictor_destroyed();

        let snap = metrics.snapshot();
        assert_eq!(snap.active_predictors, 0);
        assert_eq!(snap.peak_predictors, 2);
    }

    #[test]
    fn test_reset_clears_counters() {
        let metrics = Metrics::new();
        metrics.record_predictor_created();
        metrics.record_evictions(4);
        metrics.record_apply(2, false);
        metrics.reset();

        let snap = metrics.snapshot();
        assert_eq!(snap.evictions, 0);
        assert_eq!(snap.patches_applied, 0);
        assert_eq!(snap.active_predictors, 1);
        assert_eq!(snap.peak_predictors, 1);
    }

    #[test]
    fn test_concurrent_recording() {
        let metrics = Metrics::new();
        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..1_000 {
                        metrics.record_reconcile(Duration::from_micros(5), 1, false);
                    }
                });
            }
        });
        let snap = metrics.snapshot();
        assert_eq!(snap.reconcile_calls, 8_000);
        assert_eq!(snap.patches_generated, 8_000);
    }

    #[test]
    fn test_snapshot_serializes() {
        let json = serde_json::to_value(Metrics::new().snapshot()).unwrap();
        assert_eq!(json["reconcile_calls"], 0);
    }
}
