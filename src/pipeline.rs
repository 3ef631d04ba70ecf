//! Feature pipeline orchestration
//!
//! Locates the sessions inside a dataset document, reduces each session's logs
//! to a feature vector and attaches it as `cluster_features`.
//!
//! Sessions are looked up under `vector_test_sessions.sessions` and under a
//! top-level `sessions` array. A session is annotated only if it has a `logs`
//! array; sessions in other shapes are counted and left untouched.

use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::FixtureError;
use crate::features::FeatureReducer;
use crate::schema::lenient;
use crate::store::{load_json, write_json};
use crate::types::FeatureVector;

/// Key under which derived features are stored on a session
pub const FEATURES_KEY: &str = "cluster_features";

/// Outcome of annotating one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnnotateReport {
    pub sessions_seen: usize,
    pub annotated: usize,
    /// Sessions without a `logs` array
    pub skipped: usize,
    /// Log entries that were not JSON objects
    pub dropped_records: usize,
    /// Axis scores outside the configured axis range
    pub out_of_range_axis_samples: usize,
}

/// Outcome of backfilling one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub sessions_seen: usize,
    pub already_present: usize,
    pub from_donor: usize,
    pub computed: usize,
}

/// Annotate every session of a dataset JSON string with cluster features
/// using the default reducer (stateless, one-shot).
///
/// # Example
/// ```
/// let json = r#"{"vector_test_sessions": {"sessions": [{"session_id": "s1", "logs": []}]}}"#;
/// let annotated = quizlog_fixtures::pipeline::annotate_json(json).unwrap();
/// assert!(annotated.contains("cluster_features"));
/// ```
pub fn annotate_json(json: &str) -> Result<String, FixtureError> {
    let mut doc: Value = serde_json::from_str(json)?;
    let reducer = FeatureReducer::default();
    if !has_sessions(&doc) {
        return Err(FixtureError::InvalidShape(
            "document has no sessions array".to_string(),
        ));
    }
    annotate_document(&mut doc, &reducer);
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Attach `cluster_features` to every session that has a `logs` array
pub fn annotate_document(doc: &mut Value, reducer: &FeatureReducer) -> AnnotateReport {
    let mut report = AnnotateReport::default();

    for sessions in session_lists_mut(doc) {
        for session in sessions.iter_mut() {
            report.sessions_seen += 1;
            let Some(logs) = session.get("logs").filter(|logs| logs.is_array()) else {
                report.skipped += 1;
                continue;
            };

            let (records, dropped) = lenient::log_records(logs);
            let features = reducer.reduce(&records);
            report.dropped_records += dropped;
            report.out_of_range_axis_samples += reducer.out_of_range_axis_samples(&records);

            let session_id = session
                .get("session_id")
                .and_then(|id| id.as_str())
                .unwrap_or("?");
            debug!(
                session_id,
                logs = records.len(),
                "computed cluster features"
            );
            set_features(session, &features);
            report.annotated += 1;
        }
    }

    report
}

/// Fill in `cluster_features` for sessions that lack them.
///
/// The donor's feature vectors are consumed in order; a missing or invalid
/// donor entry falls back to computing the vector from the session's logs.
pub fn backfill_document(
    doc: &mut Value,
    donor: Option<&Value>,
    reducer: &FeatureReducer,
) -> BackfillReport {
    let donor_features = donor.map(donor_feature_list).unwrap_or_default();
    let mut report = BackfillReport::default();
    let mut index = 0;

    for sessions in session_lists_mut(doc) {
        for session in sessions.iter_mut() {
            report.sessions_seen += 1;
            let position = index;
            index += 1;

            if !session.is_object() || session.get(FEATURES_KEY).is_some() {
                report.already_present += usize::from(session.is_object());
                continue;
            }

            match donor_features.get(position).copied().flatten() {
                Some(features) => {
                    set_features(session, &features);
                    report.from_donor += 1;
                }
                None => {
                    let (records, _) = session
                        .get("logs")
                        .map(lenient::log_records)
                        .unwrap_or_default();
                    set_features(session, &reducer.reduce(&records));
                    report.computed += 1;
                }
            }
        }
    }

    report
}

/// Stateful processor applying one reducer configuration to dataset files
#[derive(Debug, Clone, Default)]
pub struct FeatureProcessor {
    reducer: FeatureReducer,
}

impl FeatureProcessor {
    pub fn new(reducer: FeatureReducer) -> Self {
        Self { reducer }
    }

    pub fn reducer(&self) -> &FeatureReducer {
        &self.reducer
    }

    /// Load, annotate and rewrite a dataset file.
    ///
    /// The file is only rewritten after it parsed completely and at least one
    /// sessions array was found.
    pub fn annotate_file(&self, path: &Path) -> Result<AnnotateReport, FixtureError> {
        let mut doc = load_json(path)?;
        if !has_sessions(&doc) {
            return Err(FixtureError::InvalidShape(format!(
                "{} has no sessions array",
                path.display()
            )));
        }

        let report = annotate_document(&mut doc, &self.reducer);
        if report.out_of_range_axis_samples > 0 {
            warn!(
                path = %path.display(),
                samples = report.out_of_range_axis_samples,
                min = self.reducer.config().axis_range.min,
                max = self.reducer.config().axis_range.max,
                "axis scores outside the configured range; check which range the logs were generated for"
            );
        }
        write_json(path, &doc)?;
        Ok(report)
    }

    /// Backfill missing features in a dataset file, optionally from a donor file
    pub fn backfill_file(
        &self,
        path: &Path,
        donor_path: Option<&Path>,
    ) -> Result<BackfillReport, FixtureError> {
        let donor = match donor_path {
            Some(donor_path) => match load_json(donor_path) {
                Ok(donor) => Some(donor),
                Err(e) => {
                    warn!("donor dataset unavailable, computing features instead: {e}");
                    None
                }
            },
            None => None,
        };

        let mut doc = load_json(path)?;
        if !has_sessions(&doc) {
            return Err(FixtureError::InvalidShape(format!(
                "{} has no sessions array",
                path.display()
            )));
        }

        let report = backfill_document(&mut doc, donor.as_ref(), &self.reducer);
        write_json(path, &doc)?;
        Ok(report)
    }
}

fn set_features(session: &mut Value, features: &FeatureVector) {
    if let Some(obj) = session.as_object_mut() {
        obj.insert(
            FEATURES_KEY.to_string(),
            Value::from(features.values().to_vec()),
        );
    }
}

/// Feature vectors of donor sessions that carry `cluster_features`, in order.
/// Entries with an invalid shape or out-of-range values are `None`.
fn donor_feature_list(donor: &Value) -> Vec<Option<FeatureVector>> {
    session_lists(donor)
        .into_iter()
        .flatten()
        .filter_map(|session| session.get(FEATURES_KEY))
        .map(|value| FeatureVector::from_json(value).filter(FeatureVector::is_normalized))
        .collect()
}

fn has_sessions(doc: &Value) -> bool {
    !session_lists(doc).is_empty()
}

fn session_lists(doc: &Value) -> Vec<&Vec<Value>> {
    let mut lists = Vec::new();
    if let Some(Value::Array(items)) = doc.get("vector_test_sessions").and_then(|v| v.get("sessions")) {
        lists.push(items);
    }
    if let Some(Value::Array(items)) = doc.get("sessions") {
        lists.push(items);
    }
    lists
}

/// Same lists as [`session_lists`], in the same order regardless of the
/// document's key order
fn session_lists_mut(doc: &mut Value) -> Vec<&mut Vec<Value>> {
    let Some(root) = doc.as_object_mut() else {
        return Vec::new();
    };
    let mut nested = None;
    let mut top_level = None;
    for (key, value) in root.iter_mut() {
        match key.as_str() {
            "vector_test_sessions" => nested = value.get_mut("sessions"),
            "sessions" => top_level = Some(value),
            _ => {}
        }
    }
    [nested, top_level]
        .into_iter()
        .filter_map(|candidate| match candidate {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureConfig;
    use crate::normalizer::AxisRange;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_document() -> Value {
        json!({
            "dataset_name": "quiz_log_dummy",
            "type": "class",
            "logs": [{"correct": true}],
            "vector_test_sessions": {
                "user_id": "dummy_student",
                "generated_at": "2025-11-20T12:00:00.000Z",
                "sessions": [
                    {
                        "session_id": "session_001",
                        "logs": [
                            {"correct": true, "response_time": 10, "path": ["c1", "c2"],
                             "vector": {"logic": 1}, "glossaryShown": []},
                            {"correct": false, "response_time": 20, "path": ["c1"],
                             "vector": {"logic": -1}, "glossaryShown": ["t1", "t2"]}
                        ]
                    },
                    {"session_id": "session_002", "logs": []},
                    {"session_id": "session_003", "answer_logs": []}
                ]
            }
        })
    }

    #[test]
    fn test_annotate_document() {
        let mut doc = sample_document();
        let report = annotate_document(&mut doc, &FeatureReducer::default());

        assert_eq!(
            report,
            AnnotateReport {
                sessions_seen: 3,
                annotated: 2,
                skipped: 1,
                dropped_records: 0,
                out_of_range_axis_samples: 0,
            }
        );

        let sessions = &doc["vector_test_sessions"]["sessions"];
        assert_eq!(
            sessions[0][FEATURES_KEY],
            json!([0.5, 0.5, 0.15, 0.5, 0.5, 0.5, 0.1, 0.04])
        );
        assert_eq!(sessions[1][FEATURES_KEY], json!(vec![0.5; 8]));
        assert!(sessions[2].get(FEATURES_KEY).is_none());
        // Unrelated keys survive untouched
        assert_eq!(doc["logs"], json!([{"correct": true}]));
        assert_eq!(doc["vector_test_sessions"]["user_id"], "dummy_student");
    }

    #[test]
    fn test_annotate_top_level_sessions() {
        let mut doc = json!({
            "sessions": [{"session_id": "a", "logs": [{"correct": true}, "bogus"]}]
        });
        let report = annotate_document(&mut doc, &FeatureReducer::default());
        assert_eq!(report.annotated, 1);
        assert_eq!(report.dropped_records, 1);
        assert_eq!(doc["sessions"][0][FEATURES_KEY][0], json!(1.0));
        assert_eq!(doc["sessions"][0][FEATURES_KEY][7], json!(0.02));
    }

    #[test]
    fn test_annotate_reports_out_of_range_axes() {
        let mut doc = json!({
            "sessions": [{"logs": [{"vector": {"logic": 3, "analysis": -3}}]}]
        });
        let report = annotate_document(&mut doc, &FeatureReducer::default());
        assert_eq!(report.out_of_range_axis_samples, 2);

        let wide =
            FeatureReducer::new(FeatureConfig::default().with_axis_range(AxisRange::WIDE)).unwrap();
        let report = annotate_document(&mut doc, &wide);
        assert_eq!(report.out_of_range_axis_samples, 0);
    }

    #[test]
    fn test_annotate_json_requires_sessions() {
        assert!(matches!(
            annotate_json(r#"{"logs": []}"#),
            Err(FixtureError::InvalidShape(_))
        ));
        assert!(matches!(
            annotate_json("not json"),
            Err(FixtureError::JsonError(_))
        ));
    }

    #[test]
    fn test_backfill_prefers_donor_then_computes() {
        let mut doc = json!({
            "vector_test_sessions": {"sessions": [
                {"session_id": "s1", "logs": []},
                {"session_id": "s2", "logs": [{"correct": false}]},
                {"session_id": "s3", "logs": [{"correct": true}]},
                {"session_id": "s4", "logs": [], "cluster_features": [0, 0, 0, 0, 0, 0, 0, 0]}
            ]}
        });
        let donor = json!({
            "sessions": [
                {"cluster_features": [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8]},
                {"no_features": true},
                {"cluster_features": [0.9, 0.9, 0.9, 0.9, 0.9, 0.9, 0.9, 0.9]},
                {"cluster_features": [2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]},
                {"cluster_features": [0.3, 0.3, 0.3, 0.3, 0.3, 0.3, 0.3, 0.3]}
            ]
        });

        let report = backfill_document(&mut doc, Some(&donor), &FeatureReducer::default());
        assert_eq!(
            report,
            BackfillReport {
                sessions_seen: 4,
                already_present: 1,
                from_donor: 2,
                computed: 1,
            }
        );

        let sessions = &doc["vector_test_sessions"]["sessions"];
        assert_eq!(
            sessions[0][FEATURES_KEY],
            json!([0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8])
        );
        assert_eq!(sessions[1][FEATURES_KEY], json!(vec![0.9; 8]));
        // The third donor vector is out of range, so the features come from the logs
        assert_eq!(sessions[2][FEATURES_KEY][0], json!(1.0));
        assert_eq!(sessions[2][FEATURES_KEY][7], json!(0.02));
        assert_eq!(sessions[3][FEATURES_KEY], json!([0, 0, 0, 0, 0, 0, 0, 0]));
    }

    #[test]
    fn test_backfill_without_donor_computes() {
        let mut doc = json!({"sessions": [{"session_id": "s1"}]});
        let report = backfill_document(&mut doc, None, &FeatureReducer::default());
        assert_eq!(report.computed, 1);
        assert_eq!(doc["sessions"][0][FEATURES_KEY], json!(vec![0.5; 8]));
    }

    #[test]
    fn test_backfill_pairing_ignores_key_order() {
        let donor = json!({
            "sessions": [
                {"cluster_features": vec![0.1; 8]},
                {"cluster_features": vec![0.9; 8]}
            ]
        });
        let nested_first = json!({
            "vector_test_sessions": {"sessions": [{"session_id": "nested", "logs": []}]},
            "sessions": [{"session_id": "top", "logs": []}]
        });
        let top_first = json!({
            "sessions": [{"session_id": "top", "logs": []}],
            "vector_test_sessions": {"sessions": [{"session_id": "nested", "logs": []}]}
        });

        for mut doc in [nested_first, top_first] {
            let report = backfill_document(&mut doc, Some(&donor), &FeatureReducer::default());
            assert_eq!(report.from_donor, 2);
            assert_eq!(
                doc["vector_test_sessions"]["sessions"][0][FEATURES_KEY],
                json!(vec![0.1; 8])
            );
            assert_eq!(doc["sessions"][0][FEATURES_KEY], json!(vec![0.9; 8]));
        }
    }

    #[test]
    fn test_annotate_file_rewrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quiz_log_dummy.json");
        write_json(&path, &sample_document()).unwrap();

        let processor = FeatureProcessor::default();
        let report = processor.annotate_file(&path).unwrap();
        assert_eq!(report.annotated, 2);

        let doc = load_json(&path).unwrap();
        assert!(doc["vector_test_sessions"]["sessions"][0]
            .get(FEATURES_KEY)
            .is_some());
    }

    #[test]
    fn test_annotate_file_leaves_malformed_input_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{\"sessions\": [").unwrap();

        let processor = FeatureProcessor::default();
        assert!(processor.annotate_file(&path).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"sessions\": [");
    }

    #[test]
    fn test_annotate_file_without_sessions_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.json");
        std::fs::write(&path, r#"{"logs":[]}"#).unwrap();

        let processor = FeatureProcessor::default();
        assert!(matches!(
            processor.annotate_file(&path),
            Err(FixtureError::InvalidShape(_))
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"logs":[]}"#);
    }
}
