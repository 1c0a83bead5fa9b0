use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A node of a UI tree
///
/// Element payloads sit behind an `Arc`, so cloning a tree is cheap and a
/// modified tree shares every untouched subtree with its source. Mutation
/// goes through `Arc::make_mut`, which copies only the spine being edited.
///
/// Trees are values: equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    Element(Arc<Element>),
    Text(Text),
}

/// An element node: tag, optional sibling key, properties, ordered children
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,

    /// Identity among siblings; only meaningful when all siblings are keyed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Ordered property map, so equal maps always compare and hash equal
    #[serde(default)]
    pub props: BTreeMap<String, String>,

    #[serde(default)]
    pub children: Vec<Node>,
}

/// A text leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    pub content: String,
}

impl Node {
    /// Create a text node
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text(Text {
            content: content.into(),
        })
    }

    /// Create an unkeyed element
    pub fn element(
        tag: impl Into<String>,
        props: BTreeMap<String, String>,
        children: Vec<Node>,
    ) -> Self {
        Node::Element(Arc::new(Element {
            tag: tag.into(),
            key: None,
            props,
            children,
        }))
    }

    /// Create a keyed element
    pub fn keyed(
        tag: impl Into<String>,
        key: impl Into<String>,
        props: BTreeMap<String, String>,
        children: Vec<Node>,
    ) -> Self {
        Node::Element(Arc::new(Element {
            tag: tag.into(),
            key: Some(key.into()),
            props,
            children,
        }))
    }

    /// Name of the node kind, used in type-mismatch errors
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Element(_) => "Element",
            Node::Text(_) => "Text",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(t) => Some(&t.content),
            Node::Element(_) => None,
        }
    }

    /// Sibling key; text nodes are never keyed
    pub fn key(&self) -> Option<&str> {
        self.as_element().and_then(|el| el.key.as_deref())
    }

    /// Children of an element, empty for text
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(el) => &el.children,
            Node::Text(_) => &[],
        }
    }

    /// Resolve a child-index path from this node
    pub fn at_path(&self, path: &[usize]) -> Option<&Node> {
        path.iter()
            .try_fold(self, |node, &index| node.children().get(index))
    }

    /// Total number of nodes in this subtree, including itself
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(Node::node_count).sum::<usize>()
    }

    /// Depth of the deepest node below this one (a leaf has depth 0)
    pub fn depth(&self) -> usize {
        self.children()
            .iter()
            .map(|child| child.depth() + 1)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::element(
            "div",
            BTreeMap::new(),
            vec![
                Node::text("a"),
                Node::keyed("li", "k1", BTreeMap::new(), vec![Node::text("b")]),
            ],
        )
    }

    #[test]
    fn test_at_path_resolves_children() {
        let tree = sample();
        assert_eq!(tree.at_path(&[]), Some(&tree));
        assert_eq!(tree.at_path(&[0]).and_then(Node::as_text), Some("a"));
        assert_eq!(tree.at_path(&[1, 0]).and_then(Node::as_text), Some("b"));
        assert!(tree.at_path(&[2]).is_none());
        assert!(tree.at_path(&[0, 0]).is_none());
    }

    #[test]
    fn test_counts_and_depth() {
        let tree = sample();
        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree.depth(), 2);
        assert_eq!(Node::text("x").depth(), 0);
    }

    #[test]
    fn test_keys_only_on_elements() {
        let tree = sample();
        assert_eq!(tree.key(), None);
        assert_eq!(tree.children()[1].key(), Some("k1"));
        assert_eq!(tree.children()[0].key(), None);
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["type"], "Element");
        assert_eq!(json["tag"], "div");
        assert_eq!(json["children"][0]["type"], "Text");
        assert_eq!(json["children"][1]["key"], "k1");
        assert!(json.get("key").is_none());

        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_clone_shares_subtrees() {
        let tree = sample();
        let copy = tree.clone();
        match (&tree, &copy) {
            (Node::Element(a), Node::Element(b)) => assert!(Arc::ptr_eq(a, b)),
            _ => unreachable!(),
        }
    }
}
