//! Demo-project logs generated from a project's `quiz.json`
//!
//! Every session answers each question of the quiz once. Final answers and
//! paths use the quiz's own choice identifiers, and a choice's authored
//! `vector` is logged when it has one.

use chrono::{DateTime, Duration, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{format_timestamp, owned, summarize_vectors, CountRange};
use crate::error::FixtureError;
use crate::features::{FeatureConfig, FeatureReducer};
use crate::index::{session_refs, upsert_index_entry, IndexEntry};
use crate::normalizer::{round_to, AxisRange, FEATURE_DECIMALS};
use crate::schema::lenient;
use crate::store::{load_typed, write_json};
use crate::types::{Axis, AxisVector, DatasetType, FeatureVector, LogRecord, VectorSummary};

/// Answer choice of a quiz question
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QuizChoice {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub value: Option<String>,
    #[serde(rename = "isCorrect", default, deserialize_with = "lenient::flag")]
    pub is_correct: bool,
    #[serde(default, deserialize_with = "lenient::axis_vector")]
    pub vector: Option<AxisVector>,
}

impl QuizChoice {
    /// Identifier logged for this choice: its `id`, else its `value`, else
    /// its position in the question
    pub fn choice_id(&self, position: usize) -> String {
        self.id
            .as_deref()
            .filter(|id| !id.is_empty())
            .or(self.value.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| position.to_string())
    }

    fn authored_vector(&self) -> Option<AxisVector> {
        self.vector.filter(|v| *v != AxisVector::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QuizQuestion {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<QuizChoice>,
}

/// The parts of a project's `quiz.json` the demo generator reads
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QuizDefinition {
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
}

impl QuizDefinition {
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        load_typed(path)
    }
}

/// Configuration for demo-log generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoGenConfig {
    /// Project the quiz belongs to; names the user and the output file
    pub project_id: String,
    pub session_count: usize,
    /// Each session draws its error rate uniformly from this range
    pub error_rate_min: f64,
    pub error_rate_max: f64,
    pub response_time_min: f64,
    pub response_time_max: f64,
    /// Path length including the final answer
    pub path_steps: CountRange,
    pub concept_tags: Vec<String>,
    pub quiz_version: String,
    /// Range of generated scores for choices without an authored vector
    pub axis_range: AxisRange,
    /// `cluster_ground_truth` is drawn from `0..ground_truth_labels`
    pub ground_truth_labels: u8,
    pub window_days: u32,
    pub features: FeatureConfig,
}

impl Default for DemoGenConfig {
    fn default() -> Self {
        Self {
            project_id: "demo_project".to_string(),
            session_count: 50,
            error_rate_min: 0.2,
            error_rate_max: 0.4,
            response_time_min: 2.0,
            response_time_max: 8.0,
            path_steps: CountRange::new(1, 4),
            concept_tags: owned(&["demo"]),
            quiz_version: "demo_v1".to_string(),
            axis_range: AxisRange::UNIT,
            ground_truth_labels: 3,
            window_days: 30,
            features: FeatureConfig::default(),
        }
    }
}

impl DemoGenConfig {
    pub fn validate(&self) -> Result<(), FixtureError> {
        if self.project_id.is_empty() {
            return Err(FixtureError::InvalidPolicy("project_id is empty".to_string()));
        }
        if !(0.0 <= self.error_rate_min
            && self.error_rate_min <= self.error_rate_max
            && self.error_rate_max <= 1.0)
        {
            return Err(FixtureError::InvalidPolicy(format!(
                "error rate range [{}, {}] must lie within [0, 1]",
                self.error_rate_min, self.error_rate_max
            )));
        }
        if !(self.response_time_min >= 0.0
            && self.response_time_min <= self.response_time_max
            && self.response_time_max.is_finite())
        {
            return Err(FixtureError::InvalidPolicy(format!(
                "invalid response time range [{}, {}]",
                self.response_time_min, self.response_time_max
            )));
        }
        self.path_steps.validate("path_steps")?;
        if self.path_steps.min == 0 {
            return Err(FixtureError::InvalidPolicy(
                "path_steps: paths need at least the final answer".to_string(),
            ));
        }
        if self.ground_truth_labels == 0 {
            return Err(FixtureError::InvalidPolicy(
                "ground_truth_labels must be positive".to_string(),
            ));
        }
        self.axis_range.check_generated("axis_range")?;
        self.features.validate()
    }

    /// Default `user_id` of the generated document
    pub fn user_id(&self) -> String {
        format!("demo_student_{}", self.project_id)
    }

    /// Default output file name, `<project_id>_logs.json`
    pub fn file_name(&self) -> String {
        format!("{}_logs.json", self.project_id)
    }
}

/// Session of a demo-project log document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoSession {
    pub session_id: String,
    pub generated_at: String,
    pub quiz_version: String,
    pub logs: Vec<LogRecord>,
    pub vector_summary: VectorSummary,
    pub cluster_features: FeatureVector,
    pub cluster_ground_truth: u8,
}

/// Multi-session log document for one demo project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoDataset {
    pub user_id: String,
    pub sessions: Vec<DemoSession>,
}

/// Generate `session_count` sessions answering every question of `quiz`.
///
/// Questions without choices are skipped; a quiz without any answerable
/// question is rejected.
pub fn generate_demo<R: Rng + ?Sized>(
    config: &DemoGenConfig,
    quiz: &QuizDefinition,
    rng: &mut R,
    base: DateTime<Utc>,
) -> Result<DemoDataset, FixtureError> {
    config.validate()?;
    if quiz.questions.iter().all(|q| q.choices.is_empty()) {
        return Err(FixtureError::InvalidShape(
            "quiz has no questions with choices".to_string(),
        ));
    }
    let reducer = FeatureReducer::new(config.features)?;

    let sessions = (0..config.session_count)
        .map(|index| generate_session(config, quiz, &reducer, rng, base, index))
        .collect();

    Ok(DemoDataset {
        user_id: config.user_id(),
        sessions,
    })
}

fn generate_session<R: Rng + ?Sized>(
    config: &DemoGenConfig,
    quiz: &QuizDefinition,
    reducer: &FeatureReducer,
    rng: &mut R,
    base: DateTime<Utc>,
    index: usize,
) -> DemoSession {
    let started = base - Duration::days(rng.random_range(0..=i64::from(config.window_days)));
    let generated_at = format_timestamp(&started);
    let error_rate = rng.random_range(config.error_rate_min..=config.error_rate_max);

    let logs: Vec<LogRecord> = quiz
        .questions
        .iter()
        .enumerate()
        .filter(|(_, question)| !question.choices.is_empty())
        .map(|(position, question)| {
            let mut log = answer_question(config, question, rng, error_rate);
            log.question_id = Some(
                question
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("q_{}", position + 1)),
            );
            log.timestamp = Some(generated_at.clone());
            log
        })
        .collect();

    let session_id = format!("session_{}_{index:03}", started.timestamp());
    debug!(session_id = %session_id, logs = logs.len(), "generated demo session");

    DemoSession {
        session_id,
        generated_at,
        quiz_version: config.quiz_version.clone(),
        vector_summary: summarize_vectors(&logs, FEATURE_DECIMALS),
        cluster_features: reducer.reduce(&logs),
        cluster_ground_truth: rng.random_range(0..config.ground_truth_labels),
        logs,
    }
}

fn answer_question<R: Rng + ?Sized>(
    config: &DemoGenConfig,
    question: &QuizQuestion,
    rng: &mut R,
    error_rate: f64,
) -> LogRecord {
    let choices: Vec<(usize, &QuizChoice)> = question.choices.iter().enumerate().collect();
    let correct_choice = choices
        .iter()
        .find(|(_, choice)| choice.is_correct)
        .or_else(|| choices.first())
        .copied();
    let wrong_choices: Vec<(usize, &QuizChoice)> = choices
        .iter()
        .filter(|(_, choice)| !choice.is_correct)
        .copied()
        .collect();

    let correct = !rng.random_bool(error_rate);
    let selected = if correct {
        correct_choice
    } else {
        wrong_choices.choose(rng).copied().or_else(|| choices.first().copied())
    };

    let (final_answer, vector) = match selected {
        Some((position, choice)) => (choice.choice_id(position), choice.authored_vector()),
        None => (String::new(), None),
    };

    let steps = config.path_steps.sample(rng);
    let mut path: Vec<String> = (1..steps)
        .filter_map(|_| choices.choose(rng))
        .map(|(position, choice)| choice.choice_id(*position))
        .collect();
    path.push(final_answer.clone());

    let vector = vector.unwrap_or_else(|| {
        let mut generated = AxisVector::default();
        for axis in Axis::ALL {
            generated.set(
                axis,
                rng.random_range(config.axis_range.min..=config.axis_range.max),
            );
        }
        generated
    });

    let response_time = rng.random_range(config.response_time_min..=config.response_time_max);

    LogRecord {
        final_answer: Some(final_answer),
        correct,
        response_time: Some(round_to(response_time, 2)),
        path,
        concept_tags: config.concept_tags.clone(),
        vector: Some(vector),
        ..LogRecord::default()
    }
}

/// Write the dataset as `<dir>/<project_id>_logs.json` and register it, with
/// its session listing, in the directory's `index.json`
pub fn write_demo_dataset(
    dir: &Path,
    config: &DemoGenConfig,
    dataset: &DemoDataset,
) -> Result<PathBuf, FixtureError> {
    let file_name = config.file_name();
    let path = dir.join(&file_name);
    write_json(&path, dataset)?;

    let sessions = session_refs(&serde_json::to_value(dataset)?);
    upsert_index_entry(
        dir,
        IndexEntry {
            file: file_name,
            dataset_name: config.project_id.clone(),
            dataset_type: DatasetType::Class.as_str().to_string(),
            sessions: Some(sessions),
        },
    )?;

    info!(
        path = %path.display(),
        sessions = dataset.sessions.len(),
        user_id = %dataset.user_id,
        "wrote demo logs"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{default_base_instant, make_rng};
    use crate::index::DatasetIndex;
    use crate::store::{load_json, INDEX_FILE_NAME};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn quiz() -> QuizDefinition {
        serde_json::from_value(json!({
            "title": "demo",
            "questions": [
                {
                    "id": "q1",
                    "choices": [
                        {"text": "A", "value": 0, "isCorrect": true,
                         "vector": {"logic": 2, "analysis": 0, "creativity": -1}},
                        {"text": "B", "value": 1, "isCorrect": false}
                    ]
                },
                {"id": "empty", "choices": []},
                {
                    "choices": [
                        {"id": "yes", "isCorrect": false},
                        {"id": "no", "isCorrect": false}
                    ]
                }
            ]
        }))
        .unwrap()
    }

    fn generate(config: &DemoGenConfig, seed: u64) -> DemoDataset {
        let mut rng = make_rng(Some(seed));
        generate_demo(config, &quiz(), &mut rng, default_base_instant()).unwrap()
    }

    #[test]
    fn test_choice_id_fallbacks() {
        let quiz = quiz();
        let first = &quiz.questions[0].choices;
        assert_eq!(first[0].choice_id(0), "0");
        assert_eq!(first[1].choice_id(1), "1");
        assert_eq!(quiz.questions[2].choices[1].choice_id(1), "no");
        assert_eq!(QuizChoice::default().choice_id(3), "3");
    }

    #[test]
    fn test_sessions_answer_every_question_with_choices() {
        let config = DemoGenConfig {
            project_id: "demo_project_02".to_string(),
            session_count: 12,
            ..DemoGenConfig::default()
        };
        let dataset = generate(&config, 5);
        assert_eq!(dataset.user_id, "demo_student_demo_project_02");
        assert_eq!(dataset.sessions.len(), 12);

        let reducer = FeatureReducer::default();
        for (i, session) in dataset.sessions.iter().enumerate() {
            assert!(session.session_id.ends_with(&format!("_{i:03}")));
            assert_eq!(session.quiz_version, "demo_v1");
            assert!(session.cluster_ground_truth < 3);
            assert_eq!(session.cluster_features, reducer.reduce(&session.logs));

            let ids: Vec<&str> = session
                .logs
                .iter()
                .map(|log| log.question_id.as_deref().unwrap())
                .collect();
            assert_eq!(ids, vec!["q1", "q_3"]);

            for log in &session.logs {
                let rt = log.response_time.unwrap();
                assert!((2.0..=8.0).contains(&rt));
                assert!((1..=4).contains(&log.path.len()));
                assert_eq!(log.path.last(), log.final_answer.as_ref());
                assert_eq!(log.concept_tags, vec!["demo"]);
                assert_eq!(log.timestamp.as_ref(), Some(&session.generated_at));
            }
        }
    }

    #[test]
    fn test_answers_follow_correctness() {
        let dataset = generate(&DemoGenConfig::default(), 9);
        let logs: Vec<&LogRecord> = dataset.sessions.iter().flat_map(|s| &s.logs).collect();

        for log in logs.iter().filter(|log| log.question_id.as_deref() == Some("q1")) {
            if log.correct {
                assert_eq!(log.final_answer.as_deref(), Some("0"));
                // Authored vector of the correct choice
                assert_eq!(log.vector.unwrap().logic, Some(2));
            } else {
                assert_eq!(log.final_answer.as_deref(), Some("1"));
                let vector = log.vector.unwrap();
                assert!(Axis::ALL
                    .iter()
                    .all(|axis| (-1..=1).contains(&vector.get(*axis).unwrap())));
            }
        }

        let incorrect = logs.iter().filter(|log| !log.correct).count();
        let rate = incorrect as f64 / logs.len() as f64;
        assert!((0.1..=0.5).contains(&rate), "error rate {rate}");
    }

    #[test]
    fn test_quiz_without_choices_rejected() {
        let quiz: QuizDefinition =
            serde_json::from_value(json!({"questions": [{"id": "q1"}]})).unwrap();
        let mut rng = make_rng(Some(1));
        assert!(matches!(
            generate_demo(&DemoGenConfig::default(), &quiz, &mut rng, default_base_instant()),
            Err(FixtureError::InvalidShape(_))
        ));
    }

    #[test]
    fn test_invalid_error_rate_rejected() {
        let config = DemoGenConfig {
            error_rate_min: 0.6,
            error_rate_max: 0.4,
            ..DemoGenConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let config = DemoGenConfig::default();
        assert_eq!(generate(&config, 3), generate(&config, 3));
    }

    #[test]
    fn test_write_demo_dataset_lists_sessions_in_index() {
        let dir = tempfile::tempdir().unwrap();
        let config = DemoGenConfig {
            project_id: "demo_project_03".to_string(),
            session_count: 4,
            ..DemoGenConfig::default()
        };
        let dataset = generate(&config, 11);

        let path = write_demo_dataset(dir.path(), &config, &dataset).unwrap();
        assert_eq!(path, dir.path().join("demo_project_03_logs.json"));

        let doc = load_json(&path).unwrap();
        assert_eq!(doc["user_id"], "demo_student_demo_project_03");
        assert_eq!(doc["sessions"].as_array().unwrap().len(), 4);

        let index: DatasetIndex = load_typed(&dir.path().join(INDEX_FILE_NAME)).unwrap();
        let entry = &index.datasets[0];
        assert_eq!(entry.dataset_name, "demo_project_03");
        assert_eq!(entry.dataset_type, "class");
        let sessions = entry.sessions.as_ref().unwrap();
        assert_eq!(sessions.len(), 4);
        assert_eq!(sessions[2].session_id, dataset.sessions[2].session_id);
        assert_eq!(sessions[2].date, dataset.sessions[2].generated_at);
    }
}
