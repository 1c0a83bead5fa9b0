//! Victim selection and limit enforcement
//!
//! Every selection is deterministic: ties on the policy's score fall back to
//! creation order, and creation ticks are unique within a predictor.

use std::cmp::Ordering;

use crate::errors::PredictorError;
use crate::predictor::config::{EvictionPolicy, PredictorConfig};
use crate::predictor::pattern::PredictionPattern;
use crate::predictor::table::PatternTable;

/// A pattern chosen for removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Victim {
    pub key: String,
    pub created_at: u64,
}

impl Victim {
    fn of(pattern: &PredictionPattern) -> Self {
        Self {
            key: pattern.pattern_key.clone(),
            created_at: pattern.created_at,
        }
    }
}

/// Lower scores are evicted first
fn score(policy: EvictionPolicy, pattern: &PredictionPattern, key_total: u64) -> f64 {
    match policy {
        EvictionPolicy::LeastRecentlyUsed => pattern.last_used() as f64,
        EvictionPolicy::LeastObserved => pattern.observation_count as f64,
        EvictionPolicy::OldestFirst => pattern.created_at as f64,
        EvictionPolicy::LowestConfidence => {
            pattern.observation_count as f64 / key_total.max(1) as f64
        }
    }
}

fn rank(a: (f64, &PredictionPattern), b: (f64, &PredictionPattern)) -> Ordering {
    a.0.total_cmp(&b.0)
        .then(a.1.created_at.cmp(&b.1.created_at))
}

/// Every pattern with its score, excluding `protect`
fn scored(
    table: &PatternTable,
    policy: EvictionPolicy,
    protect: Option<u64>,
) -> impl Iterator<Item = (f64, &PredictionPattern)> {
    table.buckets().flat_map(move |(_, bucket)| {
        let key_total: u64 = bucket.iter().map(|p| p.observation_count).sum();
        bucket
            .iter()
            .filter(move |p| Some(p.created_at) != protect)
            .map(move |p| (score(policy, p, key_total), p))
    })
}

/// Pick the pattern to drop when one key holds too many
///
/// Least observed first, oldest among equals. `protect` is never chosen.
pub(crate) fn bucket_victim(bucket: &[PredictionPattern], protect: Option<u64>) -> Option<Victim> {
    bucket
        .iter()
        .filter(|p| Some(p.created_at) != protect)
        .min_by_key(|p| (p.observation_count, p.created_at))
        .map(Victim::of)
}

/// Pick the pattern to drop to restore a table-wide limit
pub(crate) fn global_victim(
    table: &PatternTable,
    policy: EvictionPolicy,
    protect: Option<u64>,
) -> Option<Victim> {
    scored(table, policy, protect)
        .min_by(|a, b| rank(*a, *b))
        .map(|(_, p)| Victim::of(p))
}

/// Drop patterns under `key` until it holds at most `max`
pub(crate) fn trim_bucket(
    table: &mut PatternTable,
    key: &str,
    max: usize,
    protect: Option<u64>,
) -> usize {
    let mut evicted = 0;
    while let Some(victim) = table
        .bucket(key)
        .filter(|bucket| bucket.len() > max)
        .and_then(|bucket| bucket_victim(bucket, protect))
    {
        table.remove(&victim.key, victim.created_at);
        evicted += 1;
    }
    evicted
}

fn over_limits(table: &PatternTable, config: &PredictorConfig) -> bool {
    table.len() > config.max_total_patterns || table.memory_bytes() > config.max_memory_bytes
}

fn limit_error(table: &PatternTable, config: &PredictorConfig) -> PredictorError {
    if table.len() > config.max_total_patterns {
        PredictorError::PredictorFull {
            limit: config.max_total_patterns,
        }
    } else {
        PredictorError::MemoryLimitExceeded {
            required: table.memory_bytes(),
            max: config.max_memory_bytes,
        }
    }
}

/// Evict one pattern at a time until the global limits hold
///
/// Returns the number of evicted patterns.
///
/// # Errors
///
/// `PredictorFull` or `MemoryLimitExceeded` when only `protect` is left and
/// the limits still do not hold.
pub(crate) fn enforce_limits(
    table: &mut PatternTable,
    config: &PredictorConfig,
    protect: Option<u64>,
) -> Result<usize, PredictorError> {
    let mut evicted = 0;
    while over_limits(table, config) {
        let victim = global_victim(table, config.eviction_policy, protect)
            .ok_or_else(|| limit_error(table, config))?;
        table.remove(&victim.key, victim.created_at);
        evicted += 1;
    }
    Ok(evicted)
}

/// Bring a freshly loaded table within every limit
///
/// Ranks the whole table once instead of rescanning per eviction.
///
/// # Errors
///
/// `MemoryLimitExceeded` when even an empty table exceeds the memory limit.
pub(crate) fn enforce_all_limits(
    table: &mut PatternTable,
    config: &PredictorConfig,
) -> Result<usize, PredictorError> {
    let crowded: Vec<String> = table
        .buckets()
        .filter(|(_, bucket)| bucket.len() > config.max_patterns_per_key)
        .map(|(key, _)| key.to_string())
        .collect();
    let mut evicted = crowded
        .iter()
        .map(|key| trim_bucket(table, key, config.max_patterns_per_key, None))
        .sum::<usize>();

    if over_limits(table, config) {
        let mut ranked: Vec<(f64, &PredictionPattern)> =
            scored(table, config.eviction_policy, None).collect();
        ranked.sort_by(|a, b| rank(*a, *b));
        let order: Vec<Victim> = ranked.into_iter().map(|(_, p)| Victim::of(p)).collect();

        for victim in order {
            if !over_limits(table, config) {
                break;
            }
            table.remove(&victim.key, victim.created_at);
            evicted += 1;
        }
    }

    if over_limits(table, config) {
        return Err(limit_error(table, config));
    }
    Ok(evicted)
}
