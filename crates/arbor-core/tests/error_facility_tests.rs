use arbor_core::errors::{
    ArborError, ExError, ExErrorKind, PatchError, PredictorError, SerializationError,
    ValidationError,
};
use arbor_core::PredictorHandle;

#[test]
fn test_validation_error_verifiable_by_kind() {
    let err = ValidationError::TreeTooDeep { depth: 101, max: 100 };

    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::TreeTooDeep);
    assert_eq!(ex_err.code(), "ERR_TREE_TOO_DEEP");
    assert_eq!(ex_err.op(), Some("validate"));
    assert!(ex_err.message().contains("101"));
}

#[test]
fn test_patch_error_carries_path() {
    let err = PatchError::KeyNotFound {
        path: vec![0, 2],
        key: "row-9".to_string(),
    };

    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::KeyNotFound);
    assert_eq!(ex_err.path(), Some(&[0, 2][..]));
    assert!(ex_err.message().contains("row-9"));
}

#[test]
fn test_invalid_handle_carries_handle() {
    let handle = PredictorHandle::new();
    let err = ArborError::from(PredictorError::InvalidHandle { handle });

    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::InvalidHandle);
    assert_eq!(ex_err.code(), "ERR_INVALID_HANDLE");
    assert_eq!(ex_err.handle(), Some(&handle));
}

#[test]
fn test_limit_errors_report_measured_and_max() {
    let err = PredictorError::MemoryLimitExceeded {
        required: 2048,
        max: 1024,
    };

    let message = err.to_string();

    assert!(message.contains("2048"));
    assert!(message.contains("1024"));
    assert_eq!(ExError::from(err).kind(), ExErrorKind::MemoryLimitExceeded);
}

#[test]
fn test_malformed_json_is_serialization_error() {
    let err: ArborError = serde_json::from_str::<serde_json::Value>("{")
        .unwrap_err()
        .into();

    assert!(matches!(
        err,
        ArborError::Serialization(SerializationError::Malformed { .. })
    ));
    assert_eq!(ExError::from(err).code(), "ERR_SERIALIZATION");
}

#[test]
fn test_error_kind_code_mapping() {
    // Each kind has a stable code
    let kinds = vec![
        (ExErrorKind::TreeTooLarge, "ERR_TREE_TOO_LARGE"),
        (ExErrorKind::TooManyChildren, "ERR_TOO_MANY_CHILDREN"),
        (ExErrorKind::AttributeTooLong, "ERR_ATTRIBUTE_TOO_LONG"),
        (ExErrorKind::TextTooLong, "ERR_TEXT_TOO_LONG"),
        (ExErrorKind::InvalidPath, "ERR_INVALID_PATH"),
        (ExErrorKind::TypeMismatch, "ERR_TYPE_MISMATCH"),
        (ExErrorKind::PredictorFull, "ERR_PREDICTOR_FULL"),
        (ExErrorKind::InvalidConfig, "ERR_INVALID_CONFIG"),
        (ExErrorKind::Io, "ERR_IO"),
    ];

    for (kind, expected_code) in kinds {
        assert_eq!(kind.code(), expected_code);
    }
}

#[test]
fn test_display_includes_code_op_and_context() {
    let ex_err = ExError::new(ExErrorKind::InvalidPath)
        .with_op("apply_patches")
        .with_path(vec![3])
        .with_message("Invalid patch path: [3]");

    let rendered = ex_err.to_string();

    assert!(rendered.starts_with("[ERR_INVALID_PATH] in operation 'apply_patches'"));
    assert!(rendered.contains("(path: [3])"));
}
