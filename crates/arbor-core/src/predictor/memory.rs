//! Approximate memory accounting
//!
//! Estimates are inline struct sizes plus the heap bytes of every string,
//! path and child vector. Allocator slack, hash table load factor and the
//! sharing of subtrees between snapshots are not modelled, so the figure is a
//! stable, monotone approximation rather than a measurement. Shared subtrees
//! are counted once per reference, which overestimates.

use std::collections::HashMap;
use std::mem::size_of;

use crate::model::{Element, Node, Patch};
use crate::predictor::pattern::PredictionPattern;

/// Fixed cost of an empty pattern table
pub(crate) const TABLE_OVERHEAD: usize = size_of::<HashMap<String, Vec<PredictionPattern>>>();

/// Cost of one key bucket, excluding its patterns
pub(crate) fn bucket_bytes(key: &str) -> usize {
    size_of::<String>() + size_of::<Vec<PredictionPattern>>() + key.len()
}

/// Cost of one stored pattern
pub(crate) fn pattern_bytes(pattern: &PredictionPattern) -> usize {
    let snapshots = pattern
        .snapshots
        .as_ref()
        .map_or(0, |s| node_bytes(&s.old) + node_bytes(&s.new));

    size_of::<PredictionPattern>()
        + pattern.pattern_key.len()
        + pattern.patches.iter().map(patch_bytes).sum::<usize>()
        + snapshots
}

/// Approximate heap plus inline size of a tree
pub fn node_bytes(node: &Node) -> usize {
    match node {
        Node::Text(text) => size_of::<Node>() + text.content.len(),
        Node::Element(el) => size_of::<Node>() + element_bytes(el),
    }
}

fn element_bytes(el: &Element) -> usize {
    let props: usize = el
        .props
        .iter()
        .map(|(k, v)| 2 * size_of::<String>() + k.len() + v.len())
        .sum();

    size_of::<Element>()
        + el.tag.len()
        + el.key.as_ref().map_or(0, String::len)
        + props
        + el.children.iter().map(node_bytes).sum::<usize>()
}

/// Approximate size of a patch, including any node it carries
pub fn patch_bytes(patch: &Patch) -> usize {
    let payload = match patch {
        Patch::UpdateText { content, .. } => content.len(),
        Patch::UpdateProps { props, .. } => props
            .iter()
            .map(|(k, v)| 2 * size_of::<String>() + k.len() + v.len())
            .sum(),
        Patch::Replace { node, .. } | Patch::Create { node, .. } => node_bytes(node),
        Patch::Remove { .. } => 0,
        Patch::ReorderChildren { order, .. } => order
            .iter()
            .map(|key| size_of::<String>() + key.len())
            .sum(),
    };

    size_of::<Patch>() + patch.path().len() * size_of::<usize>() + payload
}
