//! Dataset index (`index.json`)
//!
//! The analytics application discovers datasets through an index file that
//! sits next to them. Each entry names the file, its dataset name and type,
//! and optionally lists the sessions the dataset contains.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::FixtureError;
use crate::store::{
    dataset_files, display_name, load_json, load_typed, write_json, SkippedFile, INDEX_FILE_NAME,
};
use crate::types::DatasetType;

/// Date reported for a session with no usable timestamp
pub const UNKNOWN_DATE: &str = "unknown";

/// Reference to one session inside a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRef {
    pub session_id: String,
    pub index: usize,
    pub date: String,
}

/// One dataset listed in the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub file: String,
    pub dataset_name: String,
    /// Kept as text so unrecognized dataset types pass through unchanged
    #[serde(rename = "type")]
    pub dataset_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions: Option<Vec<SessionRef>>,
}

/// Contents of `index.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetIndex {
    pub datasets: Vec<IndexEntry>,
}

impl DatasetIndex {
    /// Replace the entry for the same file, or append. Returns true when an
    /// existing entry was replaced.
    pub fn upsert(&mut self, entry: IndexEntry) -> bool {
        match self.datasets.iter_mut().find(|e| e.file == entry.file) {
            Some(existing) => {
                *existing = entry;
                true
            }
            None => {
                self.datasets.push(entry);
                false
            }
        }
    }

    pub fn session_count(&self) -> usize {
        self.datasets
            .iter()
            .filter_map(|e| e.sessions.as_ref())
            .map(Vec::len)
            .sum()
    }
}

/// Outcome of rebuilding an index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub datasets: usize,
    pub sessions: usize,
    pub skipped: Vec<SkippedFile>,
}

/// Index entry for a parsed dataset document.
///
/// `dataset_name` falls back to the file stem and `type` to `class`.
/// With `with_sessions`, the session listing is attached when non-empty.
pub fn index_entry(file_name: &str, doc: &Value, with_sessions: bool) -> IndexEntry {
    let stem = file_name.strip_suffix(".json").unwrap_or(file_name);
    let text = |key: &str| {
        doc.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let sessions = if with_sessions {
        Some(session_refs(doc)).filter(|refs| !refs.is_empty())
    } else {
        None
    };

    IndexEntry {
        file: file_name.to_string(),
        dataset_name: text("dataset_name").unwrap_or_else(|| stem.to_string()),
        dataset_type: text("type").unwrap_or_else(|| DatasetType::Class.as_str().to_string()),
        sessions,
    }
}

/// List the sessions of a dataset document.
///
/// Sessions come from `vector_test_sessions.sessions` when present,
/// otherwise from a top-level `sessions` array.
pub fn session_refs(doc: &Value) -> Vec<SessionRef> {
    let sessions = doc
        .get("vector_test_sessions")
        .and_then(|v| v.get("sessions"))
        .and_then(Value::as_array)
        .or_else(|| doc.get("sessions").and_then(Value::as_array));

    let Some(sessions) = sessions else {
        return Vec::new();
    };

    sessions
        .iter()
        .enumerate()
        .map(|(index, session)| SessionRef {
            session_id: session
                .get("session_id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("session_{index}")),
            index,
            date: session_date(session).unwrap_or_else(|| UNKNOWN_DATE.to_string()),
        })
        .collect()
}

fn session_date(session: &Value) -> Option<String> {
    let direct = ["timestamp_start", "generated_at", "created_at"]
        .iter()
        .find_map(|key| session.get(*key).and_then(Value::as_str));

    let first_log = || {
        ["answer_logs", "logs"].iter().find_map(|key| {
            session
                .get(*key)
                .and_then(Value::as_array)
                .and_then(|logs| logs.first())
                .and_then(|log| log.get("timestamp"))
                .and_then(Value::as_str)
        })
    };

    direct
        .filter(|s| !s.is_empty())
        .or_else(first_log)
        .map(str::to_string)
}

/// Build an index from every dataset file in `dir`, sorted by file name.
/// Unreadable files are reported and skipped.
pub fn build_index(dir: &Path, with_sessions: bool) -> Result<(DatasetIndex, IndexReport), FixtureError> {
    let mut index = DatasetIndex::default();
    let mut report = IndexReport::default();

    for path in dataset_files(dir)? {
        match load_json(&path) {
            Ok(doc) => {
                let entry = index_entry(&display_name(&path), &doc, with_sessions);
                debug!(
                    file = %entry.file,
                    sessions = entry.sessions.as_ref().map_or(0, Vec::len),
                    "indexed dataset"
                );
                index.datasets.push(entry);
            }
            Err(e) => {
                warn!("skipping {}: {e}", path.display());
                report.skipped.push(SkippedFile::new(&path, e));
            }
        }
    }

    report.datasets = index.datasets.len();
    report.sessions = index.session_count();
    Ok((index, report))
}

/// Rebuild `<dir>/index.json` from the dataset files in `dir`
pub fn regenerate_index(dir: &Path, with_sessions: bool) -> Result<IndexReport, FixtureError> {
    let (index, report) = build_index(dir, with_sessions)?;
    write_json(&dir.join(INDEX_FILE_NAME), &index)?;
    Ok(report)
}

/// Insert or replace one entry of `<dir>/index.json`, creating the file if
/// needed. A malformed index is replaced.
pub fn upsert_index_entry(dir: &Path, entry: IndexEntry) -> Result<(), FixtureError> {
    let path = dir.join(INDEX_FILE_NAME);
    let mut index = if path.exists() {
        load_typed::<DatasetIndex>(&path).unwrap_or_else(|e| {
            warn!("rebuilding unreadable index: {e}");
            DatasetIndex::default()
        })
    } else {
        DatasetIndex::default()
    };

    let file = entry.file.clone();
    let replaced = index.upsert(entry);
    write_json(&path, &index)?;
    debug!(file = %file, replaced, "updated index entry");
    Ok(())
}
