//! Opaque predictor handles
//!
//! A handle names one predictor instance owned by a registry. Handles are
//! UUIDv7 values so they sort by creation time and never collide across
//! registries living in the same process.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for a predictor instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredictorHandle(Uuid);

impl PredictorHandle {
    /// Generate a fresh handle using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Rebuild a handle from its UUID (e.g. received from a host process)
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PredictorHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PredictorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_generation() {
        let h1 = PredictorHandle::new();
        let h2 = PredictorHandle::new();

        assert_ne!(h1, h2);
        assert!(!h1.to_string().is_empty());
    }

    #[test]
    fn test_handle_display_matches_uuid() {
        let h = PredictorHandle::new();
        assert_eq!(h.to_string(), h.as_uuid().to_string());
    }

    #[test]
    fn test_handle_round_trips_through_uuid() {
        let h = PredictorHandle::new();
        assert_eq!(PredictorHandle::from_uuid(*h.as_uuid()), h);
    }

    #[test]
    fn test_serialization_is_transparent() {
        let h = PredictorHandle::new();
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", h.as_uuid()));
        let back: PredictorHandle = serde_json::from_str(&json).unwrap();
        assert_eq!(h, back);
    }
}
