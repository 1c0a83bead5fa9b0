//! Heuristic predictions for keys with no learned patterns

use crate::model::{Node, Patch, StateChange};

/// Rewrite text nodes that display the old numeric value
///
/// Only whole numbers are rewritten: `"15"` is not touched when the value
/// changes from `5`. Returns no patches when either value is not a number
/// or the values are equal.
pub(crate) fn numeric_text(change: &StateChange, current: &Node) -> Vec<Patch> {
    let (old, new) = match (&change.old_value, &change.new_value) {
        (serde_json::Value::Number(old), serde_json::Value::Number(new)) if old != new => {
            (old.to_string(), new.to_string())
        }
        _ => return Vec::new(),
    };

    let mut patches = Vec::new();
    let mut path = Vec::new();
    collect(current, &old, &new, &mut path, &mut patches);
    patches
}

fn collect(node: &Node, old: &str, new: &str, path: &mut Vec<usize>, patches: &mut Vec<Patch>) {
    match node {
        Node::Text(text) => {
            if let Some(content) = replace_number(&text.content, old, new) {
                patches.push(Patch::UpdateText {
                    path: path.clone(),
                    content,
                });
            }
        }
        Node::Element(el) => {
            for (index, child) in el.children.iter().enumerate() {
                path.push(index);
                collect(child, old, new, path, patches);
                path.pop();
            }
        }
    }
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.' || c == '-'
}

/// Replace standalone occurrences of `old` in `content`
fn replace_number(content: &str, old: &str, new: &str) -> Option<String> {
    let mut out = String::with_capacity(content.len());
    let mut last = 0;
    let mut replaced = false;

    for (start, _) in content.match_indices(old) {
        let end = start + old.len();
        let before = content[..start].chars().next_back();
        let after = content[end..].chars().next();
        if before.is_some_and(is_number_char) || after.is_some_and(is_number_char) {
            continue;
        }
        out.push_str(&content[last..start]);
        out.push_str(new);
        last = end;
        replaced = true;
    }

    replaced.then(|| {
        out.push_str(&content[last..]);
        out
    })
}
