//! Core data types for quiz-session fixtures
//!
//! These types mirror the JSON documents consumed by the student-analytics
//! application: per-question log records, sessions built from them, and the
//! dataset documents that hold both.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::schema::lenient;

/// Number of coordinates in a cluster feature vector
pub const FEATURE_COUNT: usize = 8;

/// Cognitive-style axis scored on a selected answer choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Logic,
    Analysis,
    Creativity,
}

impl Axis {
    /// All axes in feature-vector order
    pub const ALL: [Axis; 3] = [Axis::Logic, Axis::Analysis, Axis::Creativity];

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::Logic => "logic",
            Axis::Analysis => "analysis",
            Axis::Creativity => "creativity",
        }
    }
}

/// Axis scores attached to a log record.
///
/// Every axis is optional; an absent axis contributes nothing to the
/// corresponding feature average.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisVector {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::axis_score"
    )]
    pub logic: Option<i32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::axis_score"
    )]
    pub analysis: Option<i32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::axis_score"
    )]
    pub creativity: Option<i32>,
}

impl AxisVector {
    pub fn get(&self, axis: Axis) -> Option<i32> {
        match axis {
            Axis::Logic => self.logic,
            Axis::Analysis => self.analysis,
            Axis::Creativity => self.creativity,
        }
    }

    pub fn set(&mut self, axis: Axis, value: i32) {
        match axis {
            Axis::Logic => self.logic = Some(value),
            Axis::Analysis => self.analysis = Some(value),
            Axis::Creativity => self.creativity = Some(value),
        }
    }
}

/// A single click on an answer choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Click {
    /// Choice identifier (e.g. "c2")
    #[serde(rename = "choiceId")]
    pub choice_id: String,
    /// Cumulative seconds since the question was shown
    pub time: f64,
}

/// One answered question within a session.
///
/// Deserialization is tolerant: malformed sub-fields degrade to their
/// "absent" value instead of failing the whole record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(
        rename = "questionId",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub question_id: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub timestamp: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "lenient::clicks"
    )]
    pub clicks: Vec<Click>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub final_answer: Option<String>,

    /// Whether the final answer matched the expected answer
    #[serde(default, deserialize_with = "lenient::flag")]
    pub correct: bool,

    /// Seconds to answer; `None` means unknown
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::seconds"
    )]
    pub response_time: Option<f64>,

    /// Choice identifiers selected on the way to the final answer
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub path: Vec<String>,

    #[serde(
        rename = "conceptTags",
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "lenient::string_list"
    )]
    pub concept_tags: Vec<String>,

    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "lenient::string_list"
    )]
    pub recommended_terms: Vec<String>,

    /// Glossary term identifiers shown while answering
    #[serde(
        rename = "glossaryShown",
        default,
        deserialize_with = "lenient::string_list"
    )]
    pub glossary_shown: Vec<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::axis_vector"
    )]
    pub vector: Option<AxisVector>,
}

/// Fixed-length normalized summary of one session's logs.
///
/// Serialized as a bare JSON array of eight numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    /// Neutral midpoint used when a session has no logs
    pub fn neutral() -> Self {
        Self([0.5; FEATURE_COUNT])
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    /// True when every coordinate is finite and lies in `[0, 1]`
    pub fn is_normalized(&self) -> bool {
        self.0
            .iter()
            .all(|v| v.is_finite() && (0.0..=1.0).contains(v))
    }

    /// Interpret a JSON value as a feature vector, if it has the right shape
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let items = value.as_array()?;
        if items.len() != FEATURE_COUNT {
            return None;
        }
        let mut values = [0.0; FEATURE_COUNT];
        for (slot, item) in values.iter_mut().zip(items) {
            *slot = item.as_f64()?;
        }
        Some(Self(values))
    }
}

impl std::ops::Index<usize> for FeatureVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

/// One learner's quiz-taking episode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub logs: Vec<LogRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_features: Option<FeatureVector>,
}

/// The `vector_test_sessions` block of a quiz log document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCollection {
    pub user_id: String,
    pub generated_at: String,
    pub sessions: Vec<Session>,
}

/// Whether a dataset describes a whole class or a single student
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetType {
    #[default]
    Class,
    Student,
}

impl DatasetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetType::Class => "class",
            DatasetType::Student => "student",
        }
    }
}

/// Flat quiz log dataset document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizLogDocument {
    pub dataset_name: String,
    #[serde(rename = "type", default)]
    pub dataset_type: DatasetType,
    pub created_at: String,
    #[serde(default)]
    pub logs: Vec<LogRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_test_sessions: Option<SessionCollection>,
}

/// Mean axis scores over a session's logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorSummary {
    pub logic: f64,
    pub analysis: f64,
    pub creativity: f64,
}

/// Session of a ground-truth clustered dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSession {
    pub user_id: String,
    pub session_id: String,
    pub timestamp_start: String,
    pub timestamp_end: String,
    pub logs: Vec<LogRecord>,
    pub vector_summary: VectorSummary,
    pub cluster_features: FeatureVector,
    /// Profile the session was sampled from (1-based)
    pub cluster_ground_truth: u8,
    pub num_questions: usize,
    pub correct_count: usize,
    pub correct_rate: f64,
    pub avg_reaction_time: f64,
    pub avg_path_length: f64,
}

/// Summary block of a clustered dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterMetadata {
    pub total_sessions: usize,
    /// Session count per profile, keyed `cluster_<n>`
    pub ground_truth_distribution: BTreeMap<String, usize>,
}

/// Dataset of sessions sampled from known behavioral profiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterDataset {
    pub dataset_name: String,
    #[serde(rename = "type")]
    pub dataset_type: DatasetType,
    pub created_at: String,
    pub description: String,
    pub sessions: Vec<ClusterSession>,
    pub metadata: ClusterMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_log_record() {
        let json = r#"{
            "questionId": "q003",
            "timestamp": "2025-11-20T12:00:00.000Z",
            "clicks": [{"choiceId": "c1", "time": 1.2}, {"choiceId": "c3", "time": 4.0}],
            "final_answer": "c3",
            "correct": true,
            "response_time": 4.0,
            "path": ["c1", "c3"],
            "conceptTags": ["logic"],
            "glossaryShown": ["concept.logic.intro"],
            "vector": {"logic": 1, "analysis": -1, "creativity": 0}
        }"#;

        let log: LogRecord = serde_json::from_str(json).unwrap();
        assert_eq!(log.question_id.as_deref(), Some("q003"));
        assert!(log.correct);
        assert_eq!(log.response_time, Some(4.0));
        assert_eq!(log.path, vec!["c1", "c3"]);
        assert_eq!(log.clicks.len(), 2);
        assert_eq!(log.glossary_shown.len(), 1);
        let vector = log.vector.unwrap();
        assert_eq!(vector.get(Axis::Logic), Some(1));
        assert_eq!(vector.get(Axis::Analysis), Some(-1));
        assert_eq!(vector.get(Axis::Creativity), Some(0));
    }

    #[test]
    fn test_malformed_fields_degrade_to_absent() {
        let json = r#"{
            "correct": "yes",
            "response_time": "slow",
            "path": "c1",
            "glossaryShown": null,
            "vector": [1, 2, 3]
        }"#;

        let log: LogRecord = serde_json::from_str(json).unwrap();
        assert!(!log.correct);
        assert_eq!(log.response_time, None);
        assert!(log.path.is_empty());
        assert!(log.glossary_shown.is_empty());
        assert_eq!(log.vector, None);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let log: LogRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(log, LogRecord::default());
    }

    #[test]
    fn test_feature_vector_serializes_as_array() {
        let features = FeatureVector::new([0.5, 0.5, 0.15, 0.5, 0.5, 0.5, 0.1, 0.04]);
        let json = serde_json::to_string(&features).unwrap();
        assert_eq!(json, "[0.5,0.5,0.15,0.5,0.5,0.5,0.1,0.04]");

        let parsed: FeatureVector = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, features);
    }

    #[test]
    fn test_feature_vector_from_json_rejects_wrong_shape() {
        assert!(FeatureVector::from_json(&serde_json::json!([0.1, 0.2])).is_none());
        assert!(FeatureVector::from_json(&serde_json::json!("nope")).is_none());
        assert!(
            FeatureVector::from_json(&serde_json::json!([0, 0, 0, 0, 0, 0, 0, "x"])).is_none()
        );
        let ok = FeatureVector::from_json(&serde_json::json!([0, 1, 0, 1, 0, 1, 0, 1])).unwrap();
        assert!(ok.is_normalized());
    }

    #[test]
    fn test_dataset_type_round_trip() {
        let doc: QuizLogDocument = serde_json::from_str(
            r#"{"dataset_name": "demo", "type": "student", "created_at": "2025-11-18"}"#,
        )
        .unwrap();
        assert_eq!(doc.dataset_type, DatasetType::Student);
        assert!(doc.logs.is_empty());
        assert!(doc.vector_test_sessions.is_none());
    }
}
