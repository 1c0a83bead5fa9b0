//! Tree limit enforcement

mod common;

use arbor_core::errors::{AttributePart, ValidationError};
use arbor_core::model::{ElementBuilder, Node};
use arbor_core::rules::{validate, ValidationConfig};
use common::{counter_tree, no_props, props};

fn chain(depth: usize) -> Node {
    (0..depth).fold(Node::text("leaf"), |child, _| {
        Node::element("div", no_props(), vec![child])
    })
}

#[test]
fn test_default_limits_accept_realistic_tree() {
    // GIVEN a small widget tree
    // WHEN validating with defaults
    // THEN it passes
    assert_eq!(validate(&counter_tree(3), &ValidationConfig::default()), Ok(()));
}

#[test]
fn test_depth_limit_is_inclusive() {
    // GIVEN a depth limit of 3 (root at depth 0)
    let config = ValidationConfig {
        max_tree_depth: 3,
        ..ValidationConfig::default()
    };

    // WHEN the deepest node sits at depth 3, then at depth 4
    // THEN the first passes and the second fails with the measured depth
    assert_eq!(validate(&chain(3), &config), Ok(()));
    assert_eq!(
        validate(&chain(4), &config),
        Err(ValidationError::TreeTooDeep { depth: 4, max: 3 })
    );
}

#[test]
fn test_node_count_stops_at_limit_plus_one() {
    // GIVEN a wide tree of 1 + 50 nodes and a limit of 10
    let config = ValidationConfig {
        max_node_count: 10,
        ..ValidationConfig::default()
    };
    let wide = Node::element(
        "ul",
        no_props(),
        (0..50).map(|i| Node::text(i.to_string())).collect(),
    );

    // WHEN validating
    // THEN counting stops as soon as the limit is crossed
    assert_eq!(
        validate(&wide, &config),
        Err(ValidationError::TreeTooLarge { nodes: 11, max: 10 })
    );
}

#[test]
fn test_children_limit_per_element() {
    let config = ValidationConfig {
        max_children: 2,
        max_node_count: 100,
        ..ValidationConfig::default()
    };
    let three = Node::element(
        "p",
        no_props(),
        vec![Node::text("a"), Node::text("b"), Node::text("c")],
    );

    assert_eq!(
        validate(&three, &config),
        Err(ValidationError::TooManyChildren { count: 3, max: 2 })
    );
}

#[test]
fn test_attribute_key_and_value_limits() {
    let config = ValidationConfig {
        max_attribute_key_length: 4,
        max_attribute_value_length: 6,
        ..ValidationConfig::default()
    };

    // GIVEN a long property name
    let long_name = Node::element("a", props(&[("data-x", "1")]), vec![]);
    // THEN the key part is reported
    assert!(matches!(
        validate(&long_name, &config),
        Err(ValidationError::AttributeTooLong { part: AttributePart::Key, length: 6, max: 4, .. })
    ));

    // GIVEN a long property value
    let long_value = Node::element("a", props(&[("href", "/a/long/path")]), vec![]);
    // THEN the value part is reported with the property name
    assert_eq!(
        validate(&long_value, &config),
        Err(ValidationError::AttributeTooLong {
            name: "href".to_string(),
            part: AttributePart::Value,
            length: 12,
            max: 6
        })
    );

    // GIVEN an element key longer than the value limit
    let long_key = ElementBuilder::new("li").key("row-123456").build();
    // THEN the key is held to the value limit
    assert!(matches!(
        validate(&long_key, &config),
        Err(ValidationError::AttributeTooLong { part: AttributePart::Value, .. })
    ));
}

#[test]
fn test_text_length_counts_bytes() {
    // GIVEN a four-character string of eight bytes
    let config = ValidationConfig {
        max_text_length: 6,
        ..ValidationConfig::default()
    };

    // WHEN validating
    // THEN the byte length is compared
    assert_eq!(
        validate(&Node::text("éééé"), &config),
        Err(ValidationError::TextTooLong { length: 8, max: 6 })
    );
}

#[test]
fn test_first_violation_in_pre_order_wins() {
    // GIVEN a long text before an oversized child list
    let config = ValidationConfig {
        max_text_length: 1,
        max_children: 2,
        ..ValidationConfig::default()
    };
    let tree = Node::element(
        "div",
        no_props(),
        vec![
            Node::text("too long"),
            Node::element(
                "ul",
                no_props(),
                vec![Node::text("a"), Node::text("b"), Node::text("c")],
            ),
        ],
    );

    // WHEN validating
    // THEN the text violation is reported, it is met first
    assert_eq!(
        validate(&tree, &config),
        Err(ValidationError::TextTooLong { length: 8, max: 1 })
    );
}
