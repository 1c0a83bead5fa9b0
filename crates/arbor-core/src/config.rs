//! Engine configuration
//!
//! Hosts usually keep these settings in a TOML file:
//!
//! ```toml
//! [validation]
//! max_tree_depth = 64
//!
//! [predictor]
//! min_confidence = 0.8
//! eviction_policy = "least_recently_used"
//! fallback = "numeric_text"
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::{ExError, ExErrorKind};
use crate::predictor::PredictorConfig;
use crate::rules::validation::ValidationConfig;

/// Configuration for one embedding of the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Limits for `Reconciler` and the codec
    pub validation: ValidationConfig,
    /// Defaults for predictors created by a registry
    pub predictor: PredictorConfig,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read engine config from {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse engine config TOML{}: {source}", display_path(.path))]
    Toml {
        path: Option<PathBuf>,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid engine config{}: {reason}", display_path(.path))]
    Invalid {
        path: Option<PathBuf>,
        reason: String,
    },
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" ({})", p.display()))
        .unwrap_or_default()
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path.to_path_buf()),
                source,
            },
            ConfigError::Invalid { path: None, reason } => ConfigError::Invalid {
                path: Some(path.to_path_buf()),
                reason,
            },
            other => other,
        }
    }
}

impl From<ConfigError> for ExError {
    fn from(err: ConfigError) -> Self {
        let kind = match &err {
            ConfigError::Io { .. } => ExErrorKind::Io,
            ConfigError::Toml { .. } | ConfigError::Invalid { .. } => ExErrorKind::InvalidConfig,
        };
        ExError::new(kind)
            .with_op("load_config")
            .with_message(err.to_string())
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        path: None,
        reason: reason.into(),
    }
}

fn check_unit(name: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(format!("{} must be within [0, 1], got {}", name, value)))
    }
}

fn check_positive(name: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(invalid(format!("{} must be greater than 0", name)));
    }
    Ok(())
}

impl ValidationConfig {
    /// # Errors
    ///
    /// `ConfigError::Invalid` naming the first zero limit.
    pub fn check(&self) -> Result<(), ConfigError> {
        check_positive("max_node_count", self.max_node_count)?;
        check_positive("max_json_bytes", self.max_json_bytes)
    }
}

impl PredictorConfig {
    /// # Errors
    ///
    /// `ConfigError::Invalid` for confidences outside `[0, 1]` or invalid
    /// nested validation limits.
    pub fn check(&self) -> Result<(), ConfigError> {
        check_unit("min_confidence", self.min_confidence)?;
        check_unit("fallback_confidence", self.fallback_confidence)?;
        self.validation.check()
    }
}

impl EngineConfig {
    /// # Errors
    ///
    /// `ConfigError::Invalid` describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validation.check()?;
        self.predictor.check()
    }
}

/// Parse and validate TOML text
///
/// # Errors
///
/// `ConfigError::Toml` for syntax or type errors, `ConfigError::Invalid` for
/// out-of-range values.
pub fn load_from_str(input: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig =
        toml::from_str(input).map_err(|source| ConfigError::Toml { path: None, source })?;
    config.validate()?;
    tracing::debug!(
        max_tree_depth = config.validation.max_tree_depth,
        min_confidence = config.predictor.min_confidence,
        "engine config loaded"
    );
    Ok(config)
}

/// Read, parse and validate a TOML file
///
/// # Errors
///
/// As [`load_from_str`], plus `ConfigError::Io` if the file cannot be read.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|err| err.with_path(path))
}
