use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::node::Node;

/// A single edit to a tree, addressed by a child-index path from the root
///
/// Paths refer to the tree as it exists after all preceding patches in the
/// same list have been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum Patch {
    /// Replace the content of the text node at `path`
    UpdateText { path: Vec<usize>, content: String },

    /// Replace the whole property map of the element at `path`
    UpdateProps {
        path: Vec<usize>,
        props: BTreeMap<String, String>,
    },

    /// Replace the node at `path`
    Replace { path: Vec<usize>, node: Node },

    /// Insert `node` so that it ends up at `path`; the last index may equal
    /// the parent's child count (append)
    Create { path: Vec<usize>, node: Node },

    /// Remove the node at `path`
    Remove { path: Vec<usize> },

    /// Rearrange the keyed children of the element at `path` into `order`
    ReorderChildren { path: Vec<usize>, order: Vec<String> },
}

impl Patch {
    /// Target path of the patch
    pub fn path(&self) -> &[usize] {
        match self {
            Patch::UpdateText { path, .. }
            | Patch::UpdateProps { path, .. }
            | Patch::Replace { path, .. }
            | Patch::Create { path, .. }
            | Patch::Remove { path }
            | Patch::ReorderChildren { path, .. } => path,
        }
    }

    /// Stable operation name, matching the serialized `op` tag
    pub fn op_name(&self) -> &'static str {
        match self {
            Patch::UpdateText { .. } => "UpdateText",
            Patch::UpdateProps { .. } => "UpdateProps",
            Patch::Replace { .. } => "Replace",
            Patch::Create { .. } => "Create",
            Patch::Remove { .. } => "Remove",
            Patch::ReorderChildren { .. } => "ReorderChildren",
        }
    }
}

/// A suggested patch list with a confidence in `[0, 1]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub patches: Vec<Patch>,
    pub confidence: f64,
}

impl Prediction {
    /// Whether this prediction produced exactly the given patches
    pub fn matches(&self, actual: &[Patch]) -> bool {
        self.patches == actual
    }
}
