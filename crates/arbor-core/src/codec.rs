//! JSON wire codec for trees, patch lists and predictions
//!
//! Decoding is the boundary where untrusted input enters the engine, so every
//! decoder checks the raw size before parsing and the decoded content against
//! the validation limits before returning it.

use serde::de::DeserializeOwned;

use crate::errors::{ArborError, SerializationError};
use crate::model::{Node, Patch, Prediction};
use crate::rules::validation::{validate, validate_patch_payload, ValidationConfig};

fn check_size(json: &str, config: &ValidationConfig) -> Result<(), SerializationError> {
    if json.len() > config.max_json_bytes {
        return Err(SerializationError::TooLarge {
            size: json.len(),
            max: config.max_json_bytes,
        });
    }
    Ok(())
}

/// Deepest `{`/`[` nesting accepted for a tree sitting `enclosing`
/// containers below the top of the document
///
/// Each tree level adds a node object and a `children` array; the deepest
/// element adds one more for its `props` or empty `children`. One extra
/// level is allowed so a tree just past `max_tree_depth` still parses and
/// is reported as `TreeTooDeep`.
pub(crate) fn nesting_limit(config: &ValidationConfig, enclosing: usize) -> usize {
    config
        .max_tree_depth
        .saturating_add(1)
        .saturating_mul(2)
        .saturating_add(2)
        .saturating_add(enclosing)
}

/// Bracket scan that skips string contents; stops at the first container
/// past `max`
fn check_nesting(json: &str, max: usize) -> Result<(), SerializationError> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for &byte in json.as_bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                if depth > max {
                    return Err(SerializationError::TooDeeplyNested { depth, max });
                }
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

/// Parse `json` whose nesting has been bounded by the caller's limits
///
/// serde_json's own recursion cap (128) is lifted: the pre-scan keeps the
/// parser's recursion within `max_nesting`, so `max_tree_depth` is the only
/// depth limit callers see.
pub(crate) fn parse_bounded<T: DeserializeOwned>(
    json: &str,
    max_nesting: usize,
) -> Result<T, SerializationError> {
    check_nesting(json, max_nesting)?;
    let mut de = serde_json::Deserializer::from_str(json);
    de.disable_recursion_limit();
    let value = T::deserialize(&mut de)?;
    de.end()?;
    Ok(value)
}

fn parse<T: DeserializeOwned>(
    json: &str,
    config: &ValidationConfig,
    enclosing: usize,
) -> Result<T, ArborError> {
    check_size(json, config)?;
    parse_bounded(json, nesting_limit(config, enclosing)).map_err(|err| {
        tracing::debug!(op = "decode", error = %err, "rejected malformed input");
        ArborError::from(err)
    })
}

/// Decode and validate a tree
///
/// # Errors
///
/// `SerializationError::TooLarge` before any parsing, `TooDeeplyNested` when
/// the bracket nesting could not belong to a tree within `max_tree_depth`,
/// `Malformed` for bad JSON or an unknown node `type`, then any
/// `ValidationError`.
pub fn decode_tree(json: &str, config: &ValidationConfig) -> Result<Node, ArborError> {
    let tree: Node = parse(json, config, 0)?;
    validate(&tree, config)?;
    Ok(tree)
}

/// # Errors
///
/// `SerializationError` if the tree cannot be encoded.
pub fn encode_tree(tree: &Node) -> Result<String, SerializationError> {
    Ok(serde_json::to_string(tree)?)
}

/// Decode a patch list and check every payload against the limits
///
/// Paths are only checked against the depth and child-count limits: whether
/// they resolve depends on a tree, see [`crate::apply::verify_all`].
///
/// # Errors
///
/// As [`decode_tree`].
pub fn decode_patches(json: &str, config: &ValidationConfig) -> Result<Vec<Patch>, ArborError> {
    // list array and patch object around each inserted node
    let patches: Vec<Patch> = parse(json, config, 2)?;
    for patch in &patches {
        validate_patch_payload(patch, config)?;
    }
    Ok(patches)
}

/// # Errors
///
/// `SerializationError` if the patches cannot be encoded.
pub fn encode_patches(patches: &[Patch]) -> Result<String, SerializationError> {
    Ok(serde_json::to_string(patches)?)
}

/// # Errors
///
/// `SerializationError` if the prediction cannot be encoded.
pub fn encode_prediction(prediction: &Prediction) -> Result<String, SerializationError> {
    Ok(serde_json::to_string(prediction)?)
}
