use arbor_core_types::PredictorHandle;
use thiserror::Error;

/// Result type alias using ArborError
pub type Result<T> = std::result::Result<T, ArborError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that hosts can match on without
/// parsing messages, and that the logging facility attaches to `end_error`
/// events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Tree validation
    TreeTooDeep,
    TreeTooLarge,
    TooManyChildren,
    AttributeTooLong,
    TextTooLong,

    // Patch apply/verify
    InvalidPath,
    TypeMismatch,
    KeyNotFound,

    // Predictor
    InvalidHandle,
    PredictorFull,
    MemoryLimitExceeded,

    // Wire / persistence formats
    Serialization,

    // Host configuration
    InvalidConfig,
    Io,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::TreeTooDeep => "ERR_TREE_TOO_DEEP",
            ExErrorKind::TreeTooLarge => "ERR_TREE_TOO_LARGE",
            ExErrorKind::TooManyChildren => "ERR_TOO_MANY_CHILDREN",
            ExErrorKind::AttributeTooLong => "ERR_ATTRIBUTE_TOO_LONG",
            ExErrorKind::TextTooLong => "ERR_TEXT_TOO_LONG",
            ExErrorKind::InvalidPath => "ERR_INVALID_PATH",
            ExErrorKind::TypeMismatch => "ERR_TYPE_MISMATCH",
            ExErrorKind::KeyNotFound => "ERR_KEY_NOT_FOUND",
            ExErrorKind::InvalidHandle => "ERR_INVALID_HANDLE",
            ExErrorKind::PredictorFull => "ERR_PREDICTOR_FULL",
            ExErrorKind::MemoryLimitExceeded => "ERR_MEMORY_LIMIT_EXCEEDED",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::Io => "ERR_IO",
        }
    }
}

/// Canonical structured error type
///
/// A flattened view of any arbor error with classification fields for
/// programmatic handling. Built from the typed errors via `From`.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    handle: Option<PredictorHandle>,
    path: Option<Vec<usize>>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            handle: None,
            path: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add predictor handle context
    pub fn with_handle(mut self, handle: PredictorHandle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Add tree path context
    pub fn with_path(mut self, path: Vec<usize>) -> Self {
        self.path = Some(path);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the predictor handle context, if any
    pub fn handle(&self) -> Option<&PredictorHandle> {
        self.handle.as_ref()
    }

    /// Get the tree path context, if any
    pub fn path(&self) -> Option<&[usize]> {
        self.path.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(handle) = &self.handle {
            write!(f, " (handle: {})", handle)?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {:?})", path)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Which half of an attribute exceeded its limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributePart {
    Key,
    Value,
}

impl std::fmt::Display for AttributePart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributePart::Key => write!(f, "key"),
            AttributePart::Value => write!(f, "value"),
        }
    }
}

/// Tree shape/size violations reported by the validator
///
/// Every variant carries the measured value and the configured limit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Tree too deep: depth {depth} exceeds max {max}")]
    TreeTooDeep { depth: usize, max: usize },

    /// `nodes` is the count at which counting stopped, not the full size
    #[error("Tree too large: {nodes} nodes exceeds max {max}")]
    TreeTooLarge { nodes: usize, max: usize },

    #[error("Too many children: {count} exceeds max {max}")]
    TooManyChildren { count: usize, max: usize },

    /// `name` is truncated for oversized keys
    #[error("Attribute {part} too long for '{name}': {length} bytes exceeds max {max}")]
    AttributeTooLong {
        name: String,
        part: AttributePart,
        length: usize,
        max: usize,
    },

    #[error("Text too long: {length} bytes exceeds max {max}")]
    TextTooLong { length: usize, max: usize },

    /// A patch path that no tree within the depth limit can contain
    #[error("Patch path too long: {length} indices exceeds max depth {max}")]
    PathTooLong { length: usize, max: usize },

    #[error("Patch path index {index} out of range: max children {max}")]
    PathIndexOutOfRange { index: usize, max: usize },
}

/// Reasons a patch cannot be applied to a tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("Invalid patch path: {path:?}")]
    InvalidPath { path: Vec<usize> },

    #[error("Patch type mismatch at {path:?}: expected {expected}, found {found}")]
    TypeMismatch {
        path: Vec<usize>,
        expected: &'static str,
        found: &'static str,
    },

    /// Raised when a reorder names a key that is not an unconsumed child key,
    /// or leaves an existing key out
    #[error("Key not found at {path:?}: {key}")]
    KeyNotFound { path: Vec<usize>, key: String },
}

/// Predictor and registry failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PredictorError {
    #[error("Invalid predictor handle: {handle}")]
    InvalidHandle { handle: PredictorHandle },

    #[error("Predictor is at capacity: limit of {limit} patterns cannot be satisfied")]
    PredictorFull { limit: usize },

    #[error("Memory limit exceeded: {required} bytes required, max {max} bytes")]
    MemoryLimitExceeded { required: usize, max: usize },
}

/// Malformed or oversized input to the codec and to export/import
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SerializationError {
    #[error("Input too large: {size} bytes exceeds max {max} bytes")]
    TooLarge { size: usize, max: usize },

    /// Bracket nesting deeper than any tree within `max_tree_depth` can need
    #[error("Input nested too deeply: depth {depth} exceeds max {max}")]
    TooDeeplyNested { depth: usize, max: usize },

    #[error("Malformed input: {message}")]
    Malformed { message: String },

    #[error("Pattern table digest mismatch: recorded {recorded}, computed {computed}")]
    DigestMismatch { recorded: String, computed: String },

    #[error("Unsupported pattern table format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}

impl From<serde_json::Error> for SerializationError {
    fn from(err: serde_json::Error) -> Self {
        SerializationError::Malformed {
            message: err.to_string(),
        }
    }
}

/// Comprehensive error taxonomy for arbor operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArborError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Predictor(#[from] PredictorError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

impl From<serde_json::Error> for ArborError {
    fn from(err: serde_json::Error) -> Self {
        ArborError::Serialization(err.into())
    }
}

/// Conversion from ArborError to ExError
impl From<ArborError> for ExError {
    fn from(err: ArborError) -> Self {
        match err {
            ArborError::Validation(e) => e.into(),
            ArborError::Patch(e) => e.into(),
            ArborError::Predictor(e) => e.into(),
            ArborError::Serialization(e) => e.into(),
        }
    }
}

impl From<ValidationError> for ExError {
    fn from(err: ValidationError) -> Self {
        let kind = match &err {
            ValidationError::TreeTooDeep { .. } => ExErrorKind::TreeTooDeep,
            ValidationError::TreeTooLarge { .. } => ExErrorKind::TreeTooLarge,
            ValidationError::TooManyChildren { .. } => ExErrorKind::TooManyChildren,
            ValidationError::AttributeTooLong { .. } => ExErrorKind::AttributeTooLong,
            ValidationError::TextTooLong { .. } => ExErrorKind::TextTooLong,
            ValidationError::PathTooLong { .. } | ValidationError::PathIndexOutOfRange { .. } => {
                ExErrorKind::InvalidPath
            }
        };
        ExError::new(kind)
            .with_op("validate")
            .with_message(err.to_string())
    }
}

impl From<PatchError> for ExError {
    fn from(err: PatchError) -> Self {
        let message = err.to_string();
        match err {
            PatchError::InvalidPath { path } => ExError::new(ExErrorKind::InvalidPath)
                .with_path(path)
                .with_message(message),
            PatchError::TypeMismatch { path, .. } => ExError::new(ExErrorKind::TypeMismatch)
                .with_path(path)
                .with_message(message),
            PatchError::KeyNotFound { path, .. } => ExError::new(ExErrorKind::KeyNotFound)
                .with_path(path)
                .with_message(message),
        }
    }
}

impl From<PredictorError> for ExError {
    fn from(err: PredictorError) -> Self {
        let message = err.to_string();
        match err {
            PredictorError::InvalidHandle { handle } => ExError::new(ExErrorKind::InvalidHandle)
                .with_handle(handle)
                .with_message(message),
            PredictorError::PredictorFull { .. } => {
                ExError::new(ExErrorKind::PredictorFull).with_message(message)
            }
            PredictorError::MemoryLimitExceeded { .. } => {
                ExError::new(ExErrorKind::MemoryLimitExceeded).with_message(message)
            }
        }
    }
}

impl From<SerializationError> for ExError {
    fn from(err: SerializationError) -> Self {
        ExError::new(ExErrorKind::Serialization).with_message(err.to_string())
    }
}
