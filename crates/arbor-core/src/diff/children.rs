//! Child list alignment.
//!
//! Children are matched by key when every child on both sides carries a key
//! and keys are unique within each side. Otherwise they are matched by
//! position.
//!
//! Emission order for keyed lists:
//!
//! 1. `Remove` for old-only keys, highest old index first
//! 2. `Create` for new-only keys, lowest new index first
//! 3. one `ReorderChildren` with the full new key order, only when the
//!    surviving keys changed relative order
//! 4. recursion into matched pairs at their new index
//!
//! After step 2 the child list holds exactly the new key set, so step 3 is a
//! permutation and step 4 addresses final positions.
//!
//! Positional lists recurse over the common prefix, then append `Create`s in
//! ascending order and `Remove`s for trailing old children in descending order.

use std::collections::HashMap;

use crate::diff::engine::diff_node;
use crate::model::{Node, Patch};

pub(crate) fn diff_children(
    old: &[Node],
    new: &[Node],
    path: &mut Vec<usize>,
    patches: &mut Vec<Patch>,
) {
    match (key_index(old), key_index(new)) {
        (Some(old_keys), Some(new_keys)) => {
            diff_keyed(old, new, &old_keys, &new_keys, path, patches)
        }
        _ => diff_positional(old, new, path, patches),
    }
}

/// Map key to index, or `None` if any child is unkeyed or a key repeats
fn key_index(children: &[Node]) -> Option<HashMap<&str, usize>> {
    let mut index = HashMap::with_capacity(children.len());
    for (position, child) in children.iter().enumerate() {
        if index.insert(child.key()?, position).is_some() {
            return None;
        }
    }
    Some(index)
}

fn child_path(path: &[usize], index: usize) -> Vec<usize> {
    let mut child = Vec::with_capacity(path.len() + 1);
    child.extend_from_slice(path);
    child.push(index);
    child
}

fn diff_keyed(
    old: &[Node],
    new: &[Node],
    old_keys: &HashMap<&str, usize>,
    new_keys: &HashMap<&str, usize>,
    path: &mut Vec<usize>,
    patches: &mut Vec<Patch>,
) {
    for (index, child) in old.iter().enumerate().rev() {
        if child.key().is_some_and(|key| !new_keys.contains_key(key)) {
            patches.push(Patch::Remove {
                path: child_path(path, index),
            });
        }
    }

    for (index, child) in new.iter().enumerate() {
        if child.key().is_some_and(|key| !old_keys.contains_key(key)) {
            patches.push(Patch::Create {
                path: child_path(path, index),
                node: child.clone(),
            });
        }
    }

    let surviving_old = old
        .iter()
        .filter_map(Node::key)
        .filter(|key| new_keys.contains_key(key));
    let surviving_new = new
        .iter()
        .filter_map(Node::key)
        .filter(|key| old_keys.contains_key(key));
    if !surviving_old.eq(surviving_new) {
        patches.push(Patch::ReorderChildren {
            path: path.clone(),
            order: new.iter().filter_map(Node::key).map(str::to_string).collect(),
        });
    }

    for (index, child) in new.iter().enumerate() {
        if let Some(&old_index) = child.key().and_then(|key| old_keys.get(key)) {
            path.push(index);
            diff_node(&old[old_index], child, path, patches);
            path.pop();
        }
    }
}

fn diff_positional(old: &[Node], new: &[Node], path: &mut Vec<usize>, patches: &mut Vec<Patch>) {
    let common = old.len().min(new.len());

    for (index, (a, b)) in old.iter().zip(new).enumerate() {
        path.push(index);
        diff_node(a, b, path, patches);
        path.pop();
    }

    for (index, child) in new.iter().enumerate().skip(common) {
        patches.push(Patch::Create {
            path: child_path(path, index),
            node: child.clone(),
        });
    }

    for index in (common..old.len()).rev() {
        patches.push(Patch::Remove {
            path: child_path(path, index),
        });
    }
}
