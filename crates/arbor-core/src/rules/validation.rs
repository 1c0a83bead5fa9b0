use serde::{Deserialize, Serialize};

use crate::errors::{AttributePart, ValidationError};
use crate::model::{Node, Patch};

/// Longest prefix of an oversized attribute name kept in errors
const REPORTED_NAME_CHARS: usize = 64;

/// Limits every tree must satisfy before it is diffed, learned or decoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Deepest allowed node depth; the root is at depth 0
    pub max_tree_depth: usize,
    pub max_node_count: usize,
    pub max_children: usize,
    /// Bytes, applied to property names
    pub max_attribute_key_length: usize,
    /// Bytes, applied to property values and element keys
    pub max_attribute_value_length: usize,
    /// Bytes, applied to text content
    pub max_text_length: usize,
    /// Bytes, applied to serialized input before parsing
    pub max_json_bytes: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_tree_depth: 100,
            max_node_count: 10_000,
            max_children: 1_000,
            max_attribute_key_length: 256,
            max_attribute_value_length: 4_096,
            max_text_length: 1024 * 1024,
            max_json_bytes: 1024 * 1024,
        }
    }
}

/// Check a tree against the configured limits
///
/// Single walk, fail-fast: the first violation met in pre-order is returned.
/// Work is bounded by the limits themselves, not by the size of the input:
/// the walk never descends past `max_tree_depth + 1` and stops counting at
/// `max_node_count + 1`.
///
/// # Errors
///
/// Returns the first `ValidationError` found.
pub fn validate(tree: &Node, config: &ValidationConfig) -> Result<(), ValidationError> {
    let mut walk = LimitWalk { config, seen: 0 };
    walk.visit(tree, 0)
}

/// Check the payload a patch would introduce into a tree
///
/// The path must be addressable within the limits: no longer than
/// `max_tree_depth` and no index at or past `max_children`. Inserted nodes
/// are validated as standalone trees; text and properties are checked
/// against the same length limits as tree content.
///
/// # Errors
///
/// Returns the first `ValidationError` found.
pub fn validate_patch_payload(
    patch: &Patch,
    config: &ValidationConfig,
) -> Result<(), ValidationError> {
    check_path(patch.path(), config)?;
    match patch {
        Patch::UpdateText { content, .. } => check_text(content, config),
        Patch::UpdateProps { props, .. } => props
            .iter()
            .try_for_each(|(name, value)| check_property(name, value, config)),
        Patch::Replace { node, .. } | Patch::Create { node, .. } => validate(node, config),
        Patch::Remove { .. } => Ok(()),
        Patch::ReorderChildren { order, .. } => {
            if order.len() > config.max_children {
                return Err(ValidationError::TooManyChildren {
                    count: order.len(),
                    max: config.max_children,
                });
            }
            order
                .iter()
                .try_for_each(|key| check_property("key", key, config))
        }
    }
}

struct LimitWalk<'a> {
    config: &'a ValidationConfig,
    seen: usize,
}

impl LimitWalk<'_> {
    fn visit(&mut self, node: &Node, depth: usize) -> Result<(), ValidationError> {
        if depth > self.config.max_tree_depth {
            return Err(ValidationError::TreeTooDeep {
                depth,
                max: self.config.max_tree_depth,
            });
        }

        self.seen += 1;
        if self.seen > self.config.max_node_count {
            return Err(ValidationError::TreeTooLarge {
                nodes: self.seen,
                max: self.config.max_node_count,
            });
        }

        match node {
            Node::Text(text) => check_text(&text.content, self.config),
            Node::Element(el) => {
                if el.children.len() > self.config.max_children {
                    return Err(ValidationError::TooManyChildren {
                        count: el.children.len(),
                        max: self.config.max_children,
                    });
                }
                if let Some(key) = &el.key {
                    check_property("key", key, self.config)?;
                }
                for (name, value) in &el.props {
                    check_property(name, value, self.config)?;
                }
                el.children
                    .iter()
                    .try_for_each(|child| self.visit(child, depth + 1))
            }
        }
    }
}

fn check_path(path: &[usize], config: &ValidationConfig) -> Result<(), ValidationError> {
    if path.len() > config.max_tree_depth {
        return Err(ValidationError::PathTooLong {
            length: path.len(),
            max: config.max_tree_depth,
        });
    }
    match path.iter().find(|&&index| index >= config.max_children) {
        Some(&index) => Err(ValidationError::PathIndexOutOfRange {
            index,
            max: config.max_children,
        }),
        None => Ok(()),
    }
}

fn check_text(content: &str, config: &ValidationConfig) -> Result<(), ValidationError> {
    if content.len() > config.max_text_length {
        return Err(ValidationError::TextTooLong {
            length: content.len(),
            max: config.max_text_length,
        });
    }
    Ok(())
}

fn check_property(name: &str, value: &str, config: &ValidationConfig) -> Result<(), ValidationError> {
    let (part, length, max) = if name.len() > config.max_attribute_key_length {
        (AttributePart::Key, name.len(), config.max_attribute_key_length)
    } else if value.len() > config.max_attribute_value_length {
        (
            AttributePart::Value,
            value.len(),
            config.max_attribute_value_length,
        )
    } else {
        return Ok(());
    };

    Err(ValidationError::AttributeTooLong {
        name: name.chars().take(REPORTED_NAME_CHARS).collect(),
        part,
        length,
        max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn chain(depth: usize) -> Node {
        (0..depth).fold(Node::text("leaf"), |child, _| {
            Node::element("div", BTreeMap::new(), vec![child])
        })
    }

    #[test]
    fn test_depth_limit_is_inclusive() {
        let config = ValidationConfig {
            max_tree_depth: 3,
            ..Default::default()
        };
        assert!(validate(&chain(3), &config).is_ok());
        assert_eq!(
            validate(&chain(4), &config),
            Err(ValidationError::TreeTooDeep { depth: 4, max: 3 })
        );
    }

    #[test]
    fn test_node_count_stops_at_limit_plus_one() {
        let config = ValidationConfig {
            max_node_count: 5,
            ..Default::default()
        };
        let wide = Node::element(
            "ul",
            BTreeMap::new(),
            (0..50).map(|i| Node::text(i.to_string())).collect(),
        );
        assert_eq!(
            validate(&wide, &config),
            Err(ValidationError::TreeTooLarge { nodes: 6, max: 5 })
        );
    }

    #[test]
    fn test_oversized_attribute_name_is_truncated_in_error() {
        let config = ValidationConfig::default();
        let long_name = "x".repeat(10_000);
        let mut props = BTreeMap::new();
        props.insert(long_name, "v".to_string());
        let tree = Node::element("div", props, vec![]);

        match validate(&tree, &config) {
            Err(ValidationError::AttributeTooLong {
                name, part, length, ..
            }) => {
                assert_eq!(part, AttributePart::Key);
                assert_eq!(length, 10_000);
                assert_eq!(name.len(), REPORTED_NAME_CHARS);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_patch_payload_checks_inserted_node() {
        let config = ValidationConfig {
            max_tree_depth: 1,
            ..Default::default()
        };
        let patch = Patch::Create {
            path: vec![0],
            node: chain(2),
        };
        assert!(matches!(
            validate_patch_payload(&patch, &config),
            Err(ValidationError::TreeTooDeep { .. })
        ));
        assert!(validate_patch_payload(&Patch::Remove { path: vec![0] }, &config).is_ok());
    }

    #[test]
    fn test_patch_path_must_fit_limits() {
        let config = ValidationConfig {
            max_tree_depth: 3,
            max_children: 10,
            ..Default::default()
        };
        let remove = |path: Vec<usize>| validate_patch_payload(&Patch::Remove { path }, &config);

        assert!(remove(vec![9, 9, 9]).is_ok());
        assert_eq!(
            remove(vec![0; 200_000]),
            Err(ValidationError::PathTooLong {
                length: 200_000,
                max: 3
            })
        );
        assert_eq!(
            remove(vec![0, 10]),
            Err(ValidationError::PathIndexOutOfRange { index: 10, max: 10 })
        );
    }
}
