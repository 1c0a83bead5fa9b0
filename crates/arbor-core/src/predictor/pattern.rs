use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::model::{Node, Patch};

/// Logical timestamp that can be advanced through a shared reference
///
/// `predict` runs under a read lock yet still marks patterns as used.
#[derive(Debug, Default)]
pub(crate) struct Tick(AtomicU64);

impl Tick {
    pub(crate) fn new(value: u64) -> Self {
        Self(AtomicU64::new(value))
    }

    pub(crate) fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn set(&self, value: u64) {
        self.0.fetch_max(value, Ordering::Relaxed);
    }
}

impl Clone for Tick {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

impl Serialize for Tick {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.get())
    }
}

impl<'de> Deserialize<'de> for Tick {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u64::deserialize(deserializer).map(Tick::new)
    }
}

/// The trees a pattern was learned from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshots {
    pub old: Node,
    pub new: Node,
}

/// One remembered (pattern key, patch list) association
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionPattern {
    pub(crate) pattern_key: String,
    pub(crate) patches: Vec<Patch>,
    pub(crate) observation_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) snapshots: Option<Snapshots>,
    /// Creation tick; unique within a predictor and used as the pattern id
    pub(crate) created_at: u64,
    pub(crate) last_used: Tick,
    #[serde(default)]
    pub(crate) predictions_correct: u64,
    #[serde(default)]
    pub(crate) predictions_incorrect: u64,
    #[serde(skip)]
    pub(crate) footprint: usize,
}

impl PredictionPattern {
    pub(crate) fn new(
        pattern_key: String,
        patches: Vec<Patch>,
        snapshots: Option<Snapshots>,
        now: u64,
    ) -> Self {
        Self {
            pattern_key,
            patches,
            observation_count: 1,
            snapshots,
            created_at: now,
            last_used: Tick::new(now),
            predictions_correct: 0,
            predictions_incorrect: 0,
            footprint: 0,
        }
    }

    pub fn pattern_key(&self) -> &str {
        &self.pattern_key
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn observation_count(&self) -> u64 {
        self.observation_count
    }

    pub fn snapshots(&self) -> Option<&Snapshots> {
        self.snapshots.as_ref()
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn last_used(&self) -> u64 {
        self.last_used.get()
    }

    pub fn predictions_correct(&self) -> u64 {
        self.predictions_correct
    }

    pub fn predictions_incorrect(&self) -> u64 {
        self.predictions_incorrect
    }
}
