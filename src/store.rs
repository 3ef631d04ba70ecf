//! Dataset file loading and writing
//!
//! Documents are kept as `serde_json::Value` when they are rewritten in place
//! so that keys this crate does not model survive the round trip. Writes go
//! to a sibling temporary file first and are renamed over the target, so a
//! failed write never leaves a truncated dataset behind.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::FixtureError;

/// File name of the dataset index inside a dataset directory
pub const INDEX_FILE_NAME: &str = "index.json";

/// A dataset file a directory-wide operation could not process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub file: String,
    pub reason: String,
}

impl SkippedFile {
    pub fn new(path: &Path, reason: impl ToString) -> Self {
        Self {
            file: display_name(path),
            reason: reason.to_string(),
        }
    }
}

/// File name of `path` for reports, falling back to the whole path
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read and parse a JSON document
pub fn load_json(path: &Path) -> Result<Value, FixtureError> {
    let content = fs::read_to_string(path).map_err(|source| FixtureError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| FixtureError::MalformedDocument {
        path: path.to_path_buf(),
        source,
    })
}

/// Like [`load_json`], but a missing file yields `None`
pub fn load_json_if_exists(path: &Path) -> Result<Option<Value>, FixtureError> {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| FixtureError::MalformedDocument {
                path: path.to_path_buf(),
                source,
            }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(FixtureError::ReadError {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Read and deserialize a JSON document into a typed value
pub fn load_typed<T: DeserializeOwned>(path: &Path) -> Result<T, FixtureError> {
    let value = load_json(path)?;
    serde_json::from_value(value).map_err(|source| FixtureError::MalformedDocument {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize `value` as pretty JSON (two-space indent) and replace `path`
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), FixtureError> {
    let content = serde_json::to_string_pretty(value)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| FixtureError::WriteError {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let tmp_path = temporary_sibling(path);
    let write_result = fs::write(&tmp_path, content).and_then(|()| fs::rename(&tmp_path, path));
    if let Err(source) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(FixtureError::WriteError {
            path: path.to_path_buf(),
            source,
        });
    }

    debug!(path = %path.display(), "wrote dataset");
    Ok(())
}

fn temporary_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// List `*.json` dataset files in a directory, excluding the index, sorted
/// by file name
pub fn dataset_files(dir: &Path) -> Result<Vec<PathBuf>, FixtureError> {
    let entries = fs::read_dir(dir).map_err(|source| FixtureError::ReadError {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let is_index = path.file_name().is_some_and(|name| name == INDEX_FILE_NAME);
        if path.is_file() && is_json && !is_index {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
