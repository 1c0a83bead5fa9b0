use std::collections::BTreeMap;
use std::sync::Arc;

use arbor_core::metrics::Metrics;
use arbor_core::model::{Node, StateChange};
use arbor_core::predictor::{Predictor, PredictorConfig};
use serde_json::json;

/// Empty property map
#[allow(dead_code)]
pub fn no_props() -> BTreeMap<String, String> {
    BTreeMap::new()
}

/// Build a property map from pairs
#[allow(dead_code)]
pub fn props(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// `<ul>` whose children are `<li key=k>k</li>` in the given order
#[allow(dead_code)]
pub fn keyed_list(keys: &[&str]) -> Node {
    Node::element(
        "ul",
        no_props(),
        keys.iter()
            .map(|k| Node::keyed("li", *k, no_props(), vec![Node::text(*k)]))
            .collect(),
    )
}

/// A counter widget: `<div class="counter"><span>Count: n</span><button>+</button></div>`
#[allow(dead_code)]
pub fn counter_tree(count: i64) -> Node {
    Node::element(
        "div",
        props(&[("class", "counter")]),
        vec![
            Node::element(
                "span",
                no_props(),
                vec![Node::text(format!("Count: {}", count))],
            ),
            Node::element("button", no_props(), vec![Node::text("+")]),
        ],
    )
}

/// A toggle button rendered for the given state
#[allow(dead_code)]
pub fn toggle_tree(on: bool) -> Node {
    let (label, pressed) = if on { ("On", "true") } else { ("Off", "false") };
    Node::element(
        "button",
        props(&[("aria-pressed", pressed)]),
        vec![Node::text(label)],
    )
}

#[allow(dead_code)]
pub fn toggle_change(component_id: &str) -> StateChange {
    StateChange::new(component_id, "isOn", json!(false), json!(true))
}

#[allow(dead_code)]
pub fn counter_change(from: i64, to: i64) -> StateChange {
    StateChange::new("counter-1", "count", json!(from), json!(to))
}

/// Predictor recording into its own metrics, so tests don't share counters
#[allow(dead_code)]
pub fn isolated_predictor(config: PredictorConfig) -> Predictor {
    Predictor::with_metrics(config, Arc::new(Metrics::new()))
}

/// A single line of nested `<div>`s ending in a text leaf at `depth`
#[allow(dead_code)]
pub fn chain(depth: usize) -> Node {
    (0..depth).fold(Node::text("leaf"), |child, level| {
        let level = level.to_string();
        Node::element("div", props(&[("data-level", level.as_str())]), vec![child])
    })
}
