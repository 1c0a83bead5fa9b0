//! Patch application
//!
//! ## Atomicity Contract
//!
//! - **All-or-nothing**: `apply` and `apply_all` either return a complete new
//!   tree or an error; the input tree is never modified.
//! - **No panics**: invalid paths, kinds and key sets return `PatchError`.
//! - **Sharing**: the result shares every subtree not on an edited path with
//!   the input.
//!
//! ## Example
//!
//! ```
//! use arbor_core::apply::apply_all;
//! use arbor_core::diff::diff;
//! use arbor_core::model::Node;
//!
//! let old = Node::text("0");
//! let new = Node::text("1");
//! assert_eq!(apply_all(&old, &diff(&old, &new))?, new);
//! # Ok::<(), arbor_core::errors::PatchError>(())
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::errors::{ArborError, PatchError};
use crate::model::{Element, Node, Patch};
use crate::rules::validation::{validate_patch_payload, ValidationConfig};

/// Check whether a patch is applicable to a tree, without applying it
///
/// # Errors
///
/// - `InvalidPath` if the path does not resolve, or a `Create`/`Remove`
///   targets the root or an index out of range
/// - `TypeMismatch` if the target has the wrong kind, or a reorder target has
///   unkeyed or duplicate-keyed children
/// - `KeyNotFound` if a reorder order is not a permutation of the child keys
pub fn can_apply(tree: &Node, patch: &Patch) -> Result<(), PatchError> {
    match patch {
        Patch::UpdateText { path, .. } => match resolve(tree, path)? {
            Node::Text(_) => Ok(()),
            other => Err(mismatch(path, "Text", other)),
        },
        Patch::UpdateProps { path, .. } => resolve_element(tree, path).map(|_| ()),
        Patch::Replace { path, .. } => resolve(tree, path).map(|_| ()),
        Patch::Create { path, .. } => {
            let (parent_path, index) = split_child(path)?;
            let parent = resolve_element(tree, parent_path)?;
            if index > parent.children.len() {
                return Err(invalid(path));
            }
            Ok(())
        }
        Patch::Remove { path } => {
            split_child(path)?;
            resolve(tree, path).map(|_| ())
        }
        Patch::ReorderChildren { path, order } => {
            let el = resolve_element(tree, path)?;
            check_permutation(el, order, path)
        }
    }
}

/// Apply a single patch, returning the new tree
///
/// # Errors
///
/// Same as [`can_apply`]; `tree` is untouched on error.
pub fn apply(tree: &Node, patch: &Patch) -> Result<Node, PatchError> {
    let mut next = tree.clone();
    apply_in_place(&mut next, patch)?;
    Ok(next)
}

/// Apply a patch list in order
///
/// # Errors
///
/// Returns the error of the first patch that cannot be applied; no partial
/// result escapes.
pub fn apply_all(tree: &Node, patches: &[Patch]) -> Result<Node, PatchError> {
    let mut next = tree.clone();
    for (index, patch) in patches.iter().enumerate() {
        if let Err(err) = apply_in_place(&mut next, patch) {
            tracing::debug!(
                patch_index = index,
                patch_op = patch.op_name(),
                error = %err,
                "patch list rejected"
            );
            return Err(err);
        }
    }
    Ok(next)
}

/// Dry-run a patch list: payload limits and sequential applicability
///
/// Useful for checking a prediction or an externally supplied patch list
/// before committing to it.
///
/// # Errors
///
/// Returns the first `ValidationError` or `PatchError` met, in list order.
pub fn verify_all(
    tree: &Node,
    patches: &[Patch],
    config: &ValidationConfig,
) -> Result<(), ArborError> {
    let mut scratch = tree.clone();
    for patch in patches {
        validate_patch_payload(patch, config)?;
        apply_in_place(&mut scratch, patch)?;
    }
    Ok(())
}

/// Check then mutate; `root` is left unchanged when the check fails
pub(crate) fn apply_in_place(root: &mut Node, patch: &Patch) -> Result<(), PatchError> {
    can_apply(root, patch)?;

    match patch {
        Patch::UpdateText { path, content } => {
            *node_at_mut(root, path)? = Node::text(content.clone());
        }
        Patch::UpdateProps { path, props } => {
            element_at_mut(root, path)?.props = props.clone();
        }
        Patch::Replace { path, node } => {
            *node_at_mut(root, path)? = node.clone();
        }
        Patch::Create { path, node } => {
            let (parent_path, index) = split_child(path)?;
            element_at_mut(root, parent_path)?
                .children
                .insert(index, node.clone());
        }
        Patch::Remove { path } => {
            let (parent_path, index) = split_child(path)?;
            element_at_mut(root, parent_path)?.children.remove(index);
        }
        Patch::ReorderChildren { path, order } => {
            let el = element_at_mut(root, path)?;
            let mut by_key: HashMap<String, Node> = std::mem::take(&mut el.children)
                .into_iter()
                .filter_map(|child| child.key().map(str::to_string).map(|key| (key, child)))
                .collect();
            el.children = order.iter().filter_map(|key| by_key.remove(key)).collect();
        }
    }
    Ok(())
}

fn invalid(path: &[usize]) -> PatchError {
    PatchError::InvalidPath {
        path: path.to_vec(),
    }
}

fn mismatch(path: &[usize], expected: &'static str, found: &Node) -> PatchError {
    PatchError::TypeMismatch {
        path: path.to_vec(),
        expected,
        found: found.kind_name(),
    }
}

/// Split a non-root path into parent path and child index
fn split_child(path: &[usize]) -> Result<(&[usize], usize), PatchError> {
    match path.split_last() {
        Some((&index, parent)) => Ok((parent, index)),
        None => Err(invalid(path)),
    }
}

fn resolve<'a>(tree: &'a Node, path: &[usize]) -> Result<&'a Node, PatchError> {
    tree.at_path(path).ok_or_else(|| invalid(path))
}

fn resolve_element<'a>(tree: &'a Node, path: &[usize]) -> Result<&'a Element, PatchError> {
    let node = resolve(tree, path)?;
    node.as_element().ok_or_else(|| mismatch(path, "Element", node))
}

fn node_at_mut<'a>(root: &'a mut Node, path: &[usize]) -> Result<&'a mut Node, PatchError> {
    let mut node = root;
    for &index in path {
        node = match node {
            Node::Element(el) => Arc::make_mut(el)
                .children
                .get_mut(index)
                .ok_or_else(|| invalid(path))?,
            Node::Text(_) => return Err(invalid(path)),
        };
    }
    Ok(node)
}

fn element_at_mut<'a>(root: &'a mut Node, path: &[usize]) -> Result<&'a mut Element, PatchError> {
    match node_at_mut(root, path)? {
        Node::Element(el) => Ok(Arc::make_mut(el)),
        Node::Text(_) => Err(PatchError::TypeMismatch {
            path: path.to_vec(),
            expected: "Element",
            found: "Text",
        }),
    }
}

/// `order` must name every child key exactly once
fn check_permutation(el: &Element, order: &[String], path: &[usize]) -> Result<(), PatchError> {
    let mut remaining: HashSet<&str> = HashSet::with_capacity(el.children.len());
    for child in &el.children {
        let key = child.key().ok_or_else(|| PatchError::TypeMismatch {
            path: path.to_vec(),
            expected: "keyed children",
            found: child.kind_name(),
        })?;
        if !remaining.insert(key) {
            return Err(PatchError::TypeMismatch {
                path: path.to_vec(),
                expected: "uniquely keyed children",
                found: "duplicate key",
            });
        }
    }

    for key in order {
        if !remaining.remove(key.as_str()) {
            return Err(PatchError::KeyNotFound {
                path: path.to_vec(),
                key: key.clone(),
            });
        }
    }

    match el.children.iter().filter_map(Node::key).find(|key| remaining.contains(key)) {
        Some(missing) => Err(PatchError::KeyNotFound {
            path: path.to_vec(),
            key: missing.to_string(),
        }),
        None => Ok(()),
    }
}
