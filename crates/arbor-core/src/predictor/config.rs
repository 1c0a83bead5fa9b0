use serde::{Deserialize, Serialize};

use crate::rules::validation::ValidationConfig;

/// Which pattern goes first when a global limit must be restored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Oldest `last_used` tick (learned or predicted)
    LeastRecentlyUsed,
    /// Lowest observation count
    LeastObserved,
    /// Earliest creation
    OldestFirst,
    /// Lowest share of its key's observations
    LowestConfidence,
}

/// Behaviour for keys that have never been learned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Unlearned keys predict nothing
    Disabled,
    /// A numeric state change rewrites text nodes showing the old number
    NumericText,
}

/// Capacity and behaviour of one predictor instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Predictions below this confidence are withheld
    pub min_confidence: f64,
    pub max_patterns_per_key: usize,
    pub max_total_patterns: usize,
    /// Approximate bytes held by the pattern table
    pub max_memory_bytes: usize,
    pub eviction_policy: EvictionPolicy,
    /// Keep old/new trees with each pattern to adapt predictions to drifted
    /// trees; costs memory per pattern
    pub retain_snapshots: bool,
    pub fallback: FallbackPolicy,
    pub fallback_confidence: f64,
    /// Largest export document `import` accepts, in bytes
    pub max_import_bytes: usize,
    /// Limits applied to trees passed to `learn` and to imported snapshots
    pub validation: ValidationConfig,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
            max_patterns_per_key: 100,
            max_total_patterns: 10_000,
            max_memory_bytes: 100 * 1024 * 1024,
            eviction_policy: EvictionPolicy::LeastObserved,
            retain_snapshots: true,
            fallback: FallbackPolicy::Disabled,
            fallback_confidence: 0.85,
            max_import_bytes: 64 * 1024 * 1024,
            validation: ValidationConfig::default(),
        }
    }
}
