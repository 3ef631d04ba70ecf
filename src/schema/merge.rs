//! Merge several student log files into one multi-session document

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::FixtureError;
use crate::generator::format_timestamp;
use crate::store::{load_json, write_json, SkippedFile};

/// `user_id` of a merged document when no input names one
pub const DEFAULT_MERGED_USER: &str = "merged_user";

/// Default output file name
pub const MERGED_FILE_NAME: &str = "merged_student_log.json";

/// Layout of one merge input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceShape {
    /// `{user_id?, sessions: [...]}`
    MultiSession,
    /// `{session_id?, generated_at?, logs: [...]}`
    SingleSession,
    /// `[log, log, ...]`
    LogArray,
}

/// Sessions extracted from one input document
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSessions {
    pub shape: SourceShape,
    pub user_id: Option<String>,
    pub sessions: Vec<Value>,
}

/// Merged multi-session document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedSessions {
    pub user_id: String,
    /// Sessions are carried through as-is so unknown fields survive
    pub sessions: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedInput {
    pub file: String,
    pub shape: SourceShape,
    pub sessions: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub user_id: String,
    pub sessions: usize,
    pub inputs: Vec<MergedInput>,
    pub skipped: Vec<SkippedFile>,
}

/// Fresh identifier for a session that arrived without one
pub fn import_session_id() -> String {
    format!("import_{}", Uuid::new_v4().simple())
}

/// Extract sessions from a parsed input document.
///
/// Single-session inputs and bare log arrays are wrapped into one session;
/// missing `session_id`/`generated_at` are filled in.
pub fn extract_sessions(doc: Value, now: DateTime<Utc>) -> Result<ExtractedSessions, FixtureError> {
    match doc {
        Value::Array(logs) => Ok(ExtractedSessions {
            shape: SourceShape::LogArray,
            user_id: None,
            sessions: vec![wrap_session(None, None, logs, now)],
        }),
        Value::Object(mut map) => {
            let user_id = map
                .get("user_id")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string);

            if let Some(Value::Array(sessions)) = map.remove("sessions") {
                return Ok(ExtractedSessions {
                    shape: SourceShape::MultiSession,
                    user_id,
                    sessions,
                });
            }

            if let Some(Value::Array(logs)) = map.remove("logs") {
                let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
                let session = wrap_session(text("session_id"), text("generated_at"), logs, now);
                return Ok(ExtractedSessions {
                    shape: SourceShape::SingleSession,
                    user_id,
                    sessions: vec![session],
                });
            }

            Err(FixtureError::InvalidShape(
                "expected a `sessions` array, a `logs` array or a bare log array".to_string(),
            ))
        }
        _ => Err(FixtureError::InvalidShape(
            "expected a JSON object or array".to_string(),
        )),
    }
}

fn wrap_session(
    session_id: Option<String>,
    generated_at: Option<String>,
    logs: Vec<Value>,
    now: DateTime<Utc>,
) -> Value {
    let mut session = Map::new();
    session.insert(
        "session_id".to_string(),
        Value::from(session_id.unwrap_or_else(import_session_id)),
    );
    session.insert(
        "generated_at".to_string(),
        Value::from(generated_at.unwrap_or_else(|| format_timestamp(&now))),
    );
    session.insert("logs".to_string(), Value::Array(logs));
    Value::Object(session)
}

/// Merge the sessions of every input, in input order.
///
/// The first `user_id` found wins. Missing or malformed inputs are reported
/// and skipped; ending up with no sessions at all is an error.
pub fn merge_sources(
    paths: &[PathBuf],
    now: DateTime<Utc>,
) -> Result<(MergedSessions, MergeReport), FixtureError> {
    let mut user_id: Option<String> = None;
    let mut sessions = Vec::new();
    let mut report = MergeReport::default();

    for path in paths {
        let extracted = load_json(path).and_then(|doc| extract_sessions(doc, now));
        match extracted {
            Ok(extracted) => {
                if user_id.is_none() {
                    user_id = extracted.user_id;
                }
                report.inputs.push(MergedInput {
                    file: path.display().to_string(),
                    shape: extracted.shape,
                    sessions: extracted.sessions.len(),
                });
                sessions.extend(extracted.sessions);
            }
            Err(e) => {
                warn!("skipping {}: {e}", path.display());
                report.skipped.push(SkippedFile {
                    file: path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if sessions.is_empty() {
        return Err(FixtureError::NothingToMerge(format!(
            "no sessions found in {} input file(s)",
            paths.len()
        )));
    }

    let merged = MergedSessions {
        user_id: user_id.unwrap_or_else(|| DEFAULT_MERGED_USER.to_string()),
        sessions,
    };
    report.user_id = merged.user_id.clone();
    report.sessions = merged.sessions.len();
    Ok((merged, report))
}

/// Merge `paths` and write the result to `output`
pub fn merge_files(
    paths: &[PathBuf],
    output: &Path,
    now: DateTime<Utc>,
) -> Result<MergeReport, FixtureError> {
    let (merged, report) = merge_sources(paths, now)?;
    write_json(output, &merged)?;
    info!(
        output = %output.display(),
        sessions = report.sessions,
        user_id = %report.user_id,
        "merged student logs"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::default_base_instant;
    use crate::store::load_typed;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_extract_multi_session() {
        let doc = json!({"user_id": "stu_1", "sessions": [{"session_id": "a", "extra": 1}]});
        let extracted = extract_sessions(doc, default_base_instant()).unwrap();
        assert_eq!(extracted.shape, SourceShape::MultiSession);
        assert_eq!(extracted.user_id.as_deref(), Some("stu_1"));
        assert_eq!(extracted.sessions, vec![json!({"session_id": "a", "extra": 1})]);
    }

    #[test]
    fn test_extract_single_session_keeps_ids() {
        let doc = json!({
            "session_id": "s9",
            "generated_at": "2025-11-01T00:00:00Z",
            "logs": [{"correct": true}]
        });
        let extracted = extract_sessions(doc, default_base_instant()).unwrap();
        assert_eq!(extracted.shape, SourceShape::SingleSession);
        assert_eq!(
            extracted.sessions,
            vec![json!({
                "session_id": "s9",
                "generated_at": "2025-11-01T00:00:00Z",
                "logs": [{"correct": true}]
            })]
        );
    }

    #[test]
    fn test_extract_log_array_generates_ids() {
        let extracted =
            extract_sessions(json!([{"correct": false}]), default_base_instant()).unwrap();
        assert_eq!(extracted.shape, SourceShape::LogArray);
        let session = &extracted.sessions[0];
        let id = session["session_id"].as_str().unwrap();
        assert!(id.starts_with("import_"));
        assert_eq!(id.len(), "import_".len() + 32);
        assert_eq!(session["generated_at"], "2025-11-20T12:00:00.000Z");
    }

    #[test]
    fn test_extract_rejects_unknown_shape() {
        assert!(extract_sessions(json!({"foo": 1}), default_base_instant()).is_err());
        assert!(extract_sessions(json!("text"), default_base_instant()).is_err());
    }

    #[test]
    fn test_merge_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        let c = dir.path().join("c.json");
        fs::write(&a, r#"[{"correct": true}]"#).unwrap();
        fs::write(&b, r#"{"user_id": "stu_2", "sessions": [{"session_id": "x"}, {"session_id": "y"}]}"#).unwrap();
        fs::write(&c, r#"{"user_id": "stu_3", "logs": []}"#).unwrap();
        let missing = dir.path().join("missing.json");
        let output = dir.path().join(MERGED_FILE_NAME);

        let report = merge_files(
            &[a, missing, b, c],
            &output,
            default_base_instant(),
        )
        .unwrap();
        assert_eq!(report.user_id, "stu_2");
        assert_eq!(report.sessions, 4);
        assert_eq!(report.inputs.len(), 3);
        assert_eq!(report.skipped.len(), 1);

        let merged: MergedSessions = load_typed(&output).unwrap();
        assert_eq!(merged.user_id, "stu_2");
        assert_eq!(merged.sessions[1]["session_id"], "x");
        assert_eq!(merged.sessions[2]["session_id"], "y");
    }

    #[test]
    fn test_merge_defaults_user() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        fs::write(&a, r#"{"logs": [{"correct": true}]}"#).unwrap();

        let (merged, _) = merge_sources(&[a], default_base_instant()).unwrap();
        assert_eq!(merged.user_id, DEFAULT_MERGED_USER);
    }

    #[test]
    fn test_merge_nothing_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        fs::write(&a, r#"{"sessions": []}"#).unwrap();
        let output = dir.path().join("out.json");

        assert!(matches!(
            merge_files(&[a], &output, default_base_instant()),
            Err(FixtureError::NothingToMerge(_))
        ));
        assert!(!output.exists());
    }
}
