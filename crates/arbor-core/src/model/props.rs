//! Property sources and element construction
//!
//! Hosts hand properties over in whatever map shape they already hold. The
//! core reads them through `PropertySource` and stores them ordered.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::node::{Element, Node};

/// Read-only view of a host's element properties
pub trait PropertySource {
    /// All property names
    fn keys(&self) -> Vec<String>;

    /// Value of one property
    fn get(&self, key: &str) -> Option<String>;
}

impl PropertySource for BTreeMap<String, String> {
    fn keys(&self) -> Vec<String> {
        BTreeMap::keys(self).cloned().collect()
    }

    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }
}

impl PropertySource for HashMap<String, String> {
    fn keys(&self) -> Vec<String> {
        HashMap::keys(self).cloned().collect()
    }

    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Pair lists; a later pair wins over an earlier one with the same name
impl PropertySource for [(&str, &str)] {
    fn keys(&self) -> Vec<String> {
        self.iter().map(|(k, _)| (*k).to_string()).collect()
    }

    fn get(&self, key: &str) -> Option<String> {
        self.iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| (*v).to_string())
    }
}

/// Copy every property of a source into an ordered map
pub fn collect_props<S: PropertySource + ?Sized>(source: &S) -> BTreeMap<String, String> {
    source
        .keys()
        .into_iter()
        .filter_map(|key| source.get(&key).map(|value| (key, value)))
        .collect()
}

/// Builder for element nodes
///
/// # Example
///
/// ```
/// use arbor_core::model::{ElementBuilder, Node};
///
/// let item = ElementBuilder::new("li")
///     .key("row-1")
///     .prop("class", "row")
///     .child(Node::text("first"))
///     .build();
/// assert_eq!(item.key(), Some("row-1"));
/// ```
#[derive(Debug, Clone)]
pub struct ElementBuilder {
    element: Element,
}

impl ElementBuilder {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            element: Element {
                tag: tag.into(),
                key: None,
                props: BTreeMap::new(),
                children: Vec::new(),
            },
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.element.key = Some(key.into());
        self
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.element.props.insert(name.into(), value.into());
        self
    }

    /// Merge all properties of a host source; existing names are overwritten
    pub fn props_from<S: PropertySource + ?Sized>(mut self, source: &S) -> Self {
        self.element.props.extend(collect_props(source));
        self
    }

    pub fn child(mut self, child: Node) -> Self {
        self.element.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.element.children.extend(children);
        self
    }

    pub fn build(self) -> Node {
        Node::Element(Arc::new(self.element))
    }
}

impl Node {
    /// Unkeyed element whose properties are read from a host source
    pub fn element_from_source<S: PropertySource + ?Sized>(
        tag: impl Into<String>,
        source: &S,
        children: Vec<Node>,
    ) -> Node {
        ElementBuilder::new(tag)
            .props_from(source)
            .children(children)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_collect_identically() {
        let pairs: &[(&str, &str)] = &[("id", "x"), ("class", "a")];
        let mut hash = HashMap::new();
        hash.insert("class".to_string(), "a".to_string());
        hash.insert("id".to_string(), "x".to_string());

        assert_eq!(collect_props(pairs), collect_props(&hash));
    }

    #[test]
    fn test_pair_source_last_wins() {
        let pairs: &[(&str, &str)] = &[("class", "a"), ("class", "b")];
        let props = collect_props(pairs);
        assert_eq!(props.len(), 1);
        assert_eq!(props.get("class").map(String::as_str), Some("b"));
    }

    #[test]
    fn test_builder_from_source() {
        let pairs: &[(&str, &str)] = &[("href", "/home")];
        let node = ElementBuilder::new("a")
            .props_from(pairs)
            .prop("class", "nav")
            .child(Node::text("Home"))
            .build();

        let el = node.as_element().unwrap();
        assert_eq!(el.tag, "a");
        assert_eq!(el.props.len(), 2);
        assert_eq!(node.children().len(), 1);
    }

    #[test]
    fn test_element_from_source_matches_builder() {
        let mut map = BTreeMap::new();
        map.insert("role".to_string(), "button".to_string());

        let from_source = Node::element_from_source("div", &map, vec![Node::text("ok")]);
        let built = ElementBuilder::new("div")
            .prop("role", "button")
            .child(Node::text("ok"))
            .build();
        assert_eq!(from_source, built);
        assert_eq!(from_source.key(), None);
    }
}
