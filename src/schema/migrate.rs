//! Legacy-to-flat dataset migration
//!
//! Older quiz logs were stored either as a bare array of log records or as
//! `{version, generated_at, logs}`. The flat layout the application reads is
//! `{dataset_name, type, created_at, logs}`.

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{info, warn};

use crate::error::FixtureError;
use crate::store::{dataset_files, display_name, load_json, write_json, SkippedFile};
use crate::types::DatasetType;

/// `created_at` given to migrated documents that carry no timestamp
pub const DEFAULT_CREATED_AT: &str = "2025-11-18";

/// Header keys of the legacy layout that the flat layout replaces
const LEGACY_KEYS: [&str; 2] = ["version", "generated_at"];

#[derive(Debug, Clone)]
pub struct MigrateOptions {
    /// Explicit dataset name; inferred from the file stem when absent
    pub dataset_name: Option<String>,
    /// Explicit dataset type; otherwise the document's own, else `class`
    pub dataset_type: Option<DatasetType>,
    pub created_at_fallback: String,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            dataset_name: None,
            dataset_type: None,
            created_at_fallback: DEFAULT_CREATED_AT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MigrateOutcome {
    /// The document already had `dataset_name` and `type`
    AlreadyFlat,
    Migrated {
        dataset_name: String,
        dataset_type: DatasetType,
        logs: usize,
    },
}

/// Per-file result of migrating a directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigratedFile {
    pub file: String,
    #[serde(flatten)]
    pub outcome: MigrateOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrateReport {
    pub files: Vec<MigratedFile>,
    pub skipped: Vec<SkippedFile>,
}

impl MigrateReport {
    pub fn migrated_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, MigrateOutcome::Migrated { .. }))
            .count()
    }
}

/// True when the document already has both `dataset_name` and `type`
pub fn is_flat(doc: &Value) -> bool {
    doc.get("dataset_name").is_some() && doc.get("type").is_some()
}

/// Dataset name for a legacy file stem.
///
/// Stems mentioning `dummy` map to `quiz_log_dummy`; stems mentioning
/// `student` or `class` drop their underscores; anything else is kept.
pub fn infer_dataset_name(stem: &str) -> String {
    let lower = stem.to_lowercase();
    if lower.contains("dummy") {
        "quiz_log_dummy".to_string()
    } else if lower.contains("student") || lower.contains("class") {
        stem.replace('_', "")
    } else {
        stem.to_string()
    }
}

/// Convert a legacy document to the flat layout.
///
/// Returns `None` when the document is already flat. Keys other than the
/// legacy header are carried over after the flat header.
pub fn migrate_document(
    doc: Value,
    stem: &str,
    options: &MigrateOptions,
) -> Result<Option<Value>, FixtureError> {
    if is_flat(&doc) {
        return Ok(None);
    }

    let mut rest = match doc {
        Value::Array(logs) => {
            let mut map = Map::new();
            map.insert("logs".to_string(), Value::Array(logs));
            map
        }
        Value::Object(map) => map,
        other => {
            return Err(FixtureError::InvalidShape(format!(
                "expected an object or an array of logs, found {}",
                json_kind(&other)
            )))
        }
    };

    let logs = match rest.remove("logs") {
        Some(Value::Array(logs)) => logs,
        None | Some(Value::Null) => Vec::new(),
        Some(other) => {
            return Err(FixtureError::InvalidShape(format!(
                "`logs` must be an array, found {}",
                json_kind(&other)
            )))
        }
    };

    let existing_name = rest
        .remove("dataset_name")
        .and_then(|v| v.as_str().map(str::to_string));
    let dataset_name = options
        .dataset_name
        .clone()
        .or(existing_name)
        .unwrap_or_else(|| infer_dataset_name(stem));

    let existing_type = rest
        .remove("type")
        .and_then(|v| serde_json::from_value::<DatasetType>(v).ok());
    let dataset_type = options.dataset_type.or(existing_type).unwrap_or_default();

    let created_at = ["created_at", "generated_at"]
        .iter()
        .find_map(|key| rest.get(*key).and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| options.created_at_fallback.clone());
    rest.remove("created_at");
    for key in LEGACY_KEYS {
        rest.remove(key);
    }

    let mut flat = Map::new();
    flat.insert("dataset_name".to_string(), Value::from(dataset_name));
    flat.insert("type".to_string(), Value::from(dataset_type.as_str()));
    flat.insert("created_at".to_string(), Value::from(created_at));
    flat.insert("logs".to_string(), Value::Array(logs));
    flat.extend(rest);

    Ok(Some(Value::Object(flat)))
}

/// Migrate one file in place
pub fn migrate_file(path: &Path, options: &MigrateOptions) -> Result<MigrateOutcome, FixtureError> {
    let doc = load_json(path)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let Some(flat) = migrate_document(doc, &stem, options)? else {
        info!(path = %path.display(), "already flat, skipping");
        return Ok(MigrateOutcome::AlreadyFlat);
    };

    write_json(path, &flat)?;
    let outcome = MigrateOutcome::Migrated {
        dataset_name: flat["dataset_name"].as_str().unwrap_or_default().to_string(),
        dataset_type: serde_json::from_value(flat["type"].clone()).unwrap_or_default(),
        logs: flat["logs"].as_array().map_or(0, Vec::len),
    };
    info!(path = %path.display(), ?outcome, "migrated");
    Ok(outcome)
}

/// Migrate every dataset file in `dir` (except `index.json`).
///
/// Names are always inferred per file; `options.dataset_name` is ignored.
/// A file that fails is reported and the rest are still processed.
pub fn migrate_dir(dir: &Path, options: &MigrateOptions) -> Result<MigrateReport, FixtureError> {
    let per_file = MigrateOptions {
        dataset_name: None,
        ..options.clone()
    };

    let mut report = MigrateReport::default();
    for path in dataset_files(dir)? {
        match migrate_file(&path, &per_file) {
            Ok(outcome) => report.files.push(MigratedFile {
                file: display_name(&path),
                outcome,
            }),
            Err(e) => {
                warn!("failed to migrate {}: {e}", path.display());
                report.skipped.push(SkippedFile::new(&path, e));
            }
        }
    }
    Ok(report)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
