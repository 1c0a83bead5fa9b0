//! Export/import document for pattern tables.
//!
//! The document is JSON with a format version, an export timestamp, the
//! predictor's logical clock, every pattern, and a SHA-256 digest of the
//! canonical pattern list.
//!
//! ## Determinism Guarantees
//!
//! - Patterns are ordered by (pattern key, creation tick)
//! - Same table → same `patterns` bytes → same `table_digest`
//! - `exported_at` is informational and excluded from the digest

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::codec::{nesting_limit, parse_bounded};
use crate::errors::{ArborError, SerializationError};
use crate::predictor::config::PredictorConfig;
use crate::predictor::pattern::PredictionPattern;
use crate::predictor::table::PatternTable;
use crate::rules::validation::{validate, validate_patch_payload};

/// Current document format
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternTableDocument {
    pub format_version: u32,
    /// RFC 3339 UTC timestamp
    pub exported_at: String,
    pub clock: u64,
    pub table_digest: String,
    pub patterns: Vec<PredictionPattern>,
}

/// Compute the digest of an ordered pattern list
///
/// Hex-encoded SHA-256 of the compact JSON encoding (64 characters).
///
/// # Errors
///
/// Returns `SerializationError::Malformed` if JSON serialization fails.
pub fn compute_table_digest(patterns: &[PredictionPattern]) -> Result<String, SerializationError> {
    let canonical = serde_json::to_vec(patterns)?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

pub(crate) fn build_document(
    table: &PatternTable,
    clock: u64,
) -> Result<PatternTableDocument, SerializationError> {
    let mut patterns: Vec<PredictionPattern> = table.patterns().cloned().collect();
    patterns.sort_by(|a, b| {
        a.pattern_key
            .cmp(&b.pattern_key)
            .then(a.created_at.cmp(&b.created_at))
    });

    Ok(PatternTableDocument {
        format_version: FORMAT_VERSION,
        exported_at: chrono::Utc::now().to_rfc3339(),
        clock,
        table_digest: compute_table_digest(&patterns)?,
        patterns,
    })
}

/// Parse and check an export document without touching any predictor
///
/// Checks, in order: size, bracket nesting, JSON shape, format version, digest, then every
/// pattern (non-empty key, positive count, unique creation tick, snapshot
/// trees and patch payloads within the validation limits).
pub(crate) fn parse_document(
    json: &str,
    config: &PredictorConfig,
) -> Result<PatternTableDocument, ArborError> {
    if json.len() > config.max_import_bytes {
        return Err(SerializationError::TooLarge {
            size: json.len(),
            max: config.max_import_bytes,
        }
        .into());
    }

    // document, patterns, pattern, patches and patch wrap the deepest tree
    let document: PatternTableDocument =
        parse_bounded(json, nesting_limit(&config.validation, 5))?;

    if document.format_version != FORMAT_VERSION {
        return Err(SerializationError::UnsupportedVersion {
            found: document.format_version,
            supported: FORMAT_VERSION,
        }
        .into());
    }

    let computed = compute_table_digest(&document.patterns)?;
    if computed != document.table_digest {
        return Err(SerializationError::DigestMismatch {
            recorded: document.table_digest,
            computed,
        }
        .into());
    }

    let mut ticks = HashSet::with_capacity(document.patterns.len());
    for pattern in &document.patterns {
        check_pattern(pattern, config, &mut ticks)?;
    }
    Ok(document)
}

fn malformed(message: String) -> ArborError {
    SerializationError::Malformed { message }.into()
}

fn check_pattern(
    pattern: &PredictionPattern,
    config: &PredictorConfig,
    ticks: &mut HashSet<u64>,
) -> Result<(), ArborError> {
    if pattern.pattern_key.is_empty() {
        return Err(malformed("pattern with empty pattern_key".to_string()));
    }
    if pattern.observation_count == 0 {
        return Err(malformed(format!(
            "pattern {} created at {} has zero observations",
            pattern.pattern_key, pattern.created_at
        )));
    }
    if !ticks.insert(pattern.created_at) {
        return Err(malformed(format!(
            "duplicate pattern creation tick {}",
            pattern.created_at
        )));
    }

    if let Some(snapshots) = &pattern.snapshots {
        validate(&snapshots.old, &config.validation)?;
        validate(&snapshots.new, &config.validation)?;
    }
    for patch in &pattern.patches {
        validate_patch_payload(patch, &config.validation)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Patch;

    fn table() -> PatternTable {
        let mut table = PatternTable::new();
        table.insert(PredictionPattern::new(
            "b".into(),
            vec![Patch::Remove { path: vec![0] }],
            None,
            2,
        ));
        table.insert(PredictionPattern::new("a".into(), vec![], None, 1));
        table
    }

    #[test]
    fn test_document_is_sorted_and_digested() {
        let doc = build_document(&table(), 2).unwrap();
        assert_eq!(doc.format_version, FORMAT_VERSION);
        assert_eq!(doc.patterns[0].pattern_key(), "a");
        assert_eq!(doc.table_digest.len(), 64);
        assert_eq!(doc.table_digest, compute_table_digest(&doc.patterns).unwrap());
    }

    #[test]
    fn test_tampered_document_is_rejected() {
        let doc = build_document(&table(), 2).unwrap();
        let mut json = serde_json::to_value(&doc).unwrap();
        json["patterns"][0]["observation_count"] = 50.into();

        let result = parse_document(&json.to_string(), &PredictorConfig::default());
        assert!(matches!(
            result,
            Err(ArborError::Serialization(SerializationError::DigestMismatch { .. }))
        ));
    }

    #[test]
    fn test_oversized_document_is_rejected_before_parsing() {
        let config = PredictorConfig {
            max_import_bytes: 8,
            ..Default::default()
        };
        assert!(matches!(
            parse_document("not even json", &config),
            Err(ArborError::Serialization(SerializationError::TooLarge { size: 13, max: 8 }))
        ));
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let mut doc = build_document(&table(), 2).unwrap();
        doc.format_version = 99;
        let json = serde_json::to_string(&doc).unwrap();
        assert!(matches!(
            parse_document(&json, &PredictorConfig::default()),
            Err(ArborError::Serialization(
                SerializationError::UnsupportedVersion { found: 99, .. }
            ))
        ));
    }
}
