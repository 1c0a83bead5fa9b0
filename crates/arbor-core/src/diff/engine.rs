//! Node-level diff.
//!
//! [`diff`] walks both trees in lock step. Nodes that can be updated in place
//! (same kind, tag and key) recurse; anything else is replaced wholesale.

use crate::diff::children::diff_children;
use crate::model::{Node, Patch};

/// Compute the patch list that transforms `old` into `new`
///
/// Pure and infallible. Callers that accept untrusted trees should validate
/// them first or go through [`Reconciler`](crate::diff::Reconciler).
pub fn diff(old: &Node, new: &Node) -> Vec<Patch> {
    let mut patches = Vec::new();
    let mut path = Vec::new();
    diff_node(old, new, &mut path, &mut patches);
    patches
}

/// Diff one pair of nodes located at `path`
///
/// `path` is used as a scratch stack; it is restored before returning.
pub(crate) fn diff_node(old: &Node, new: &Node, path: &mut Vec<usize>, patches: &mut Vec<Patch>) {
    // Shared subtrees compare by pointer first, so unchanged branches are O(1)
    if old == new {
        return;
    }

    match (old, new) {
        (Node::Text(_), Node::Text(text)) => {
            patches.push(Patch::UpdateText {
                path: path.clone(),
                content: text.content.clone(),
            });
        }
        (Node::Element(a), Node::Element(b)) if a.tag == b.tag && a.key == b.key => {
            if a.props != b.props {
                patches.push(Patch::UpdateProps {
                    path: path.clone(),
                    props: b.props.clone(),
                });
            }
            diff_children(&a.children, &b.children, path, patches);
        }
        _ => {
            patches.push(Patch::Replace {
                path: path.clone(),
                node: new.clone(),
            });
        }
    }
}
