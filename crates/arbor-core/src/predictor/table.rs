//! Pattern storage with running memory accounting

use std::collections::HashMap;

use crate::model::Patch;
use crate::predictor::memory::{bucket_bytes, pattern_bytes, TABLE_OVERHEAD};
use crate::predictor::pattern::{PredictionPattern, Snapshots};

#[derive(Debug, Clone)]
pub(crate) struct PatternTable {
    buckets: HashMap<String, Vec<PredictionPattern>>,
    len: usize,
    bytes: usize,
}

impl PatternTable {
    pub(crate) fn new() -> Self {
        Self {
            buckets: HashMap::new(),
            len: 0,
            bytes: TABLE_OVERHEAD,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn key_count(&self) -> usize {
        self.buckets.len()
    }

    pub(crate) fn memory_bytes(&self) -> usize {
        self.bytes
    }

    pub(crate) fn bucket(&self, key: &str) -> Option<&[PredictionPattern]> {
        self.buckets.get(key).map(Vec::as_slice)
    }

    pub(crate) fn buckets(&self) -> impl Iterator<Item = (&str, &[PredictionPattern])> {
        self.buckets
            .iter()
            .map(|(key, bucket)| (key.as_str(), bucket.as_slice()))
    }

    pub(crate) fn patterns(&self) -> impl Iterator<Item = &PredictionPattern> {
        self.buckets.values().flatten()
    }

    /// Index of the pattern under `key` with exactly these patches
    pub(crate) fn position(&self, key: &str, patches: &[Patch]) -> Option<usize> {
        self.buckets
            .get(key)?
            .iter()
            .position(|p| p.patches == patches)
    }

    pub(crate) fn insert(&mut self, mut pattern: PredictionPattern) {
        pattern.footprint = pattern_bytes(&pattern);
        self.bytes += pattern.footprint;
        self.len += 1;

        match self.buckets.get_mut(&pattern.pattern_key) {
            Some(bucket) => bucket.push(pattern),
            None => {
                self.bytes += bucket_bytes(&pattern.pattern_key);
                self.buckets
                    .insert(pattern.pattern_key.clone(), vec![pattern]);
            }
        }
    }

    /// Count one more observation of an existing pattern
    ///
    /// Returns the new observation count, or `None` if `index` is stale.
    pub(crate) fn observe(
        &mut self,
        key: &str,
        index: usize,
        now: u64,
        snapshots: Option<Snapshots>,
    ) -> Option<u64> {
        let pattern = self.buckets.get_mut(key)?.get_mut(index)?;
        pattern.observation_count += 1;
        pattern.last_used.set(now);
        if snapshots.is_some() {
            pattern.snapshots = snapshots;
        }

        let footprint = pattern_bytes(pattern);
        self.bytes = self.bytes - pattern.footprint + footprint;
        pattern.footprint = footprint;
        Some(pattern.observation_count)
    }

    /// Mutable access to one pattern for bookkeeping that does not change its size
    pub(crate) fn pattern_mut(&mut self, key: &str, created_at: u64) -> Option<&mut PredictionPattern> {
        self.buckets
            .get_mut(key)?
            .iter_mut()
            .find(|p| p.created_at == created_at)
    }

    pub(crate) fn remove(&mut self, key: &str, created_at: u64) -> Option<PredictionPattern> {
        let bucket = self.buckets.get_mut(key)?;
        let index = bucket.iter().position(|p| p.created_at == created_at)?;
        let pattern = bucket.remove(index);
        if bucket.is_empty() {
            self.buckets.remove(key);
            self.bytes -= bucket_bytes(key);
        }

        self.bytes -= pattern.footprint;
        self.len -= 1;
        Some(pattern)
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::new();
    }
}
