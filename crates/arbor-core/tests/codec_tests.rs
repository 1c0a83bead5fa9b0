//! Wire format and input guards

mod common;

use arbor_core::codec::{decode_patches, decode_tree, encode_patches, encode_prediction, encode_tree};
use arbor_core::diff::diff;
use arbor_core::errors::{ArborError, SerializationError, ValidationError};
use arbor_core::model::Prediction;
use arbor_core::rules::ValidationConfig;
use common::{chain, counter_tree, keyed_list};
use serde_json::{json, Value};

#[test]
fn test_node_field_names_on_the_wire() {
    // GIVEN a keyed list
    let tree = keyed_list(&["A"]);

    // WHEN encoding
    let value: Value = serde_json::from_str(&encode_tree(&tree).unwrap()).unwrap();

    // THEN the collaborator-facing field names are used
    assert_eq!(value["type"], "Element");
    assert_eq!(value["tag"], "ul");
    assert!(value.get("key").is_none());
    assert_eq!(value["children"][0]["key"], "A");
    assert_eq!(value["children"][0]["children"][0], json!({"type": "Text", "content": "A"}));
}

#[test]
fn test_patch_field_names_on_the_wire() {
    // GIVEN patches from a keyed reorder
    let patches = diff(&keyed_list(&["A", "B"]), &keyed_list(&["B", "A"]));

    // WHEN encoding
    let value: Value = serde_json::from_str(&encode_patches(&patches).unwrap()).unwrap();

    // THEN each patch carries op and path
    assert_eq!(
        value,
        json!([{"op": "ReorderChildren", "path": [], "order": ["B", "A"]}])
    );
}

#[test]
fn test_tree_survives_encode_decode() {
    let tree = counter_tree(7);
    let json = encode_tree(&tree).unwrap();
    assert_eq!(decode_tree(&json, &ValidationConfig::default()).unwrap(), tree);
}

#[test]
fn test_oversized_input_rejected_before_parse() {
    // GIVEN a byte budget smaller than the input
    let json = encode_tree(&counter_tree(1)).unwrap();
    let config = ValidationConfig {
        max_json_bytes: json.len() - 1,
        ..ValidationConfig::default()
    };

    // WHEN decoding
    let err = decode_tree(&json, &config).unwrap_err();

    // THEN TooLarge reports both sizes
    assert_eq!(
        err,
        ArborError::Serialization(SerializationError::TooLarge {
            size: json.len(),
            max: json.len() - 1
        })
    );
}

#[test]
fn test_decoded_tree_depth_is_validated() {
    // GIVEN a three-level tree and a depth limit of one
    let json = r#"{"type":"Element","tag":"a","children":[
        {"type":"Element","tag":"b","children":[{"type":"Text","content":"c"}]}
    ]}"#;
    let config = ValidationConfig {
        max_tree_depth: 1,
        ..ValidationConfig::default()
    };

    // WHEN decoding
    // THEN the depth violation is returned instead of a tree
    assert_eq!(
        decode_tree(json, &config),
        Err(ArborError::Validation(ValidationError::TreeTooDeep { depth: 2, max: 1 }))
    );
}

#[test]
fn test_deep_tree_within_limits_round_trips() {
    // GIVEN a tree eighty levels deep, inside the default depth limit
    let config = ValidationConfig::default();
    let tree = chain(80);
    assert!(arbor_core::validate(&tree, &config).is_ok());

    // WHEN encoding and decoding it
    let json = encode_tree(&tree).unwrap();
    let decoded = decode_tree(&json, &config).unwrap();

    // THEN the same tree comes back
    assert_eq!(decoded, tree);
}

#[test]
fn test_deep_tree_at_exact_depth_limit_round_trips() {
    // GIVEN a tree exactly at the limit, as a Create payload
    let config = ValidationConfig::default();
    let patches = vec![arbor_core::model::Patch::Create {
        path: vec![0],
        node: chain(config.max_tree_depth),
    }];

    // WHEN encoding and decoding the patch list
    let json = encode_patches(&patches).unwrap();

    // THEN it is accepted unchanged
    assert_eq!(decode_patches(&json, &config).unwrap(), patches);
}

#[test]
fn test_bracket_bomb_is_rejected_as_too_deeply_nested() {
    // GIVEN input nested far past anything a valid tree needs
    let json = format!("{}{}", "[".repeat(5_000), "]".repeat(5_000));

    // WHEN decoding
    let err = decode_tree(&json, &ValidationConfig::default()).unwrap_err();

    // THEN the scan stops it before parsing
    assert!(matches!(
        err,
        ArborError::Serialization(SerializationError::TooDeeplyNested { max: 204, .. })
    ));
}

#[test]
fn test_unreachable_patch_paths_are_rejected_on_decode() {
    // GIVEN a Remove whose path is far longer than any tree can be deep
    let config = ValidationConfig::default();
    let path = vec![0; 200_000];
    let json = serde_json::to_string(&json!([{"op": "Remove", "path": path}])).unwrap();

    // WHEN decoding
    let err = decode_patches(&json, &config).unwrap_err();

    // THEN it is refused before any tree is touched
    assert_eq!(
        err,
        ArborError::Validation(ValidationError::PathTooLong {
            length: 200_000,
            max: config.max_tree_depth
        })
    );

    // AND an index past the child limit is refused too
    let wide = r#"[{"op":"UpdateText","path":[0,1000],"content":"x"}]"#;
    assert_eq!(
        decode_patches(wide, &config).unwrap_err(),
        ArborError::Validation(ValidationError::PathIndexOutOfRange { index: 1000, max: 1000 })
    );
}

#[test]
fn test_garbage_is_reported_not_panicked() {
    for input in ["", "null", "[]", r#"{"type":"Text"}"#, r#"{"tag":"div"}"#] {
        assert!(matches!(
            decode_tree(input, &ValidationConfig::default()),
            Err(ArborError::Serialization(SerializationError::Malformed { .. }))
        ));
    }
    assert!(decode_patches(r#"[{"op":"Explode","path":[]}]"#, &ValidationConfig::default()).is_err());
}

#[test]
fn test_prediction_field_names_on_the_wire() {
    let prediction = Prediction {
        patches: vec![],
        confidence: 1.0,
    };

    let value: Value = serde_json::from_str(&encode_prediction(&prediction).unwrap()).unwrap();

    assert_eq!(value, json!({"patches": [], "confidence": 1.0}));
}
