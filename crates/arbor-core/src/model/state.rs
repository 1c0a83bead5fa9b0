use serde::{Deserialize, Serialize};

/// A component state transition reported by the host
///
/// Values are opaque to the core except for the optional numeric-text
/// fallback, which inspects them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub component_id: String,
    pub state_key: String,
    pub old_value: serde_json::Value,
    pub new_value: serde_json::Value,
}

impl StateChange {
    pub fn new(
        component_id: impl Into<String>,
        state_key: impl Into<String>,
        old_value: serde_json::Value,
        new_value: serde_json::Value,
    ) -> Self {
        Self {
            component_id: component_id.into(),
            state_key: state_key.into(),
            old_value,
            new_value,
        }
    }

    /// Key under which patterns for this (component, state key) are stored
    ///
    /// The component id is length-prefixed so that no two distinct pairs can
    /// produce the same key, whatever characters either part contains.
    pub fn pattern_key(&self) -> String {
        format!(
            "{}:{}::{}",
            self.component_id.len(),
            self.component_id,
            self.state_key
        )
    }
}
