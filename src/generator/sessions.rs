//! Multi-session vector fixtures (`vector_test_sessions`)

use chrono::{DateTime, Duration, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{info, warn};

use super::logs::{fill_header, DUMMY_DATASET_NAME};
use super::policy::{PathPolicy, WeightedRanges};
use super::{
    check_probability, format_timestamp, owned, sample_distinct, CountRange, GLOSSARY_TERMS,
    QUESTION_IDS,
};
use crate::error::FixtureError;
use crate::normalizer::AxisRange;
use crate::store::{load_json_if_exists, write_json};
use crate::types::{Axis, AxisVector, LogRecord, Session, SessionCollection};

/// Configuration for vector-session generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionGenConfig {
    pub session_count: usize,
    pub logs_per_session: CountRange,
    pub correct_probability: f64,
    pub user_id: String,
    pub response_times: WeightedRanges,
    pub path: PathPolicy,
    pub questions: Vec<String>,
    pub concept_tags: Vec<String>,
    pub concept_tag_count: CountRange,
    pub glossary_terms: Vec<String>,
    /// Chance that any glossary terms are shown for a question
    pub glossary_probability: f64,
    pub glossary_count: CountRange,
    /// Range of the per-log axis scores
    pub axis_range: AxisRange,
    /// Session starts fall within this many days before the base instant
    pub window_days: u32,
}

impl Default for SessionGenConfig {
    fn default() -> Self {
        Self {
            session_count: 50,
            logs_per_session: CountRange::new(3, 10),
            correct_probability: 0.6,
            user_id: "dummy_student".to_string(),
            response_times: WeightedRanges::response_times(),
            path: PathPolicy::default(),
            questions: owned(&QUESTION_IDS),
            concept_tags: owned(&[
                "gravity",
                "astronomy",
                "fluid",
                "pressure",
                "creativity",
                "problem-solving",
                "logic",
                "analysis",
                "memory",
                "cognition",
            ]),
            concept_tag_count: CountRange::new(1, 3),
            glossary_terms: owned(&GLOSSARY_TERMS),
            glossary_probability: 0.7,
            glossary_count: CountRange::new(0, 2),
            axis_range: AxisRange::UNIT,
            window_days: 30,
        }
    }
}

impl SessionGenConfig {
    pub fn validate(&self) -> Result<(), FixtureError> {
        check_probability("correct_probability", self.correct_probability)?;
        check_probability("glossary_probability", self.glossary_probability)?;
        self.logs_per_session.validate("logs_per_session")?;
        self.concept_tag_count.validate("concept_tag_count")?;
        self.glossary_count.validate("glossary_count")?;
        self.response_times.validate()?;
        self.path.validate()?;
        self.axis_range.check_generated("axis_range")?;
        if self.questions.is_empty() {
            return Err(FixtureError::InvalidPolicy(
                "question list is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Generate `session_count` sessions named `session_001`, `session_002`, ...
pub fn generate_sessions<R: Rng + ?Sized>(
    config: &SessionGenConfig,
    rng: &mut R,
    base: DateTime<Utc>,
) -> Result<SessionCollection, FixtureError> {
    config.validate()?;
    let window_ms = i64::from(config.window_days) * 24 * 60 * 60 * 1000;

    let sessions = (1..=config.session_count)
        .map(|number| {
            let offset = if window_ms > 0 {
                rng.random_range(0..window_ms)
            } else {
                0
            };
            let start = base - Duration::milliseconds(offset);
            let log_count = config.logs_per_session.sample(rng);
            let logs = (0..log_count)
                .map(|i| generate_log(config, rng, start + Duration::minutes(i as i64)))
                .collect();

            Session {
                session_id: format!("session_{number:03}"),
                generated_at: Some(format_timestamp(&start)),
                logs,
                cluster_features: None,
            }
        })
        .collect();

    Ok(SessionCollection {
        user_id: config.user_id.clone(),
        generated_at: format_timestamp(&base),
        sessions,
    })
}

fn generate_log<R: Rng + ?Sized>(
    config: &SessionGenConfig,
    rng: &mut R,
    timestamp: DateTime<Utc>,
) -> LogRecord {
    let question_id = config.questions.choose(rng).cloned();
    let correct = rng.random_bool(config.correct_probability);
    let response_time = config.response_times.sample(rng);
    let path = config.path.sample(rng);

    let tag_count = config.concept_tag_count.sample(rng);
    let concept_tags = sample_distinct(rng, &config.concept_tags, tag_count);
    let glossary_shown = if rng.random_bool(config.glossary_probability) {
        let count = config.glossary_count.sample(rng);
        sample_distinct(rng, &config.glossary_terms, count)
    } else {
        Vec::new()
    };

    let mut vector = AxisVector::default();
    for axis in Axis::ALL {
        vector.set(
            axis,
            rng.random_range(config.axis_range.min..=config.axis_range.max),
        );
    }

    LogRecord {
        question_id,
        timestamp: Some(format_timestamp(&timestamp)),
        final_answer: path.last().cloned(),
        correct,
        response_time: Some(response_time),
        path,
        concept_tags,
        glossary_shown,
        vector: Some(vector),
        ..LogRecord::default()
    }
}

/// Store `sessions` under `vector_test_sessions` of the document at `path`,
/// keeping its flat `logs` and any other keys.
pub fn write_vector_sessions(
    path: &Path,
    sessions: &SessionCollection,
    now: DateTime<Utc>,
) -> Result<(), FixtureError> {
    let mut doc = match load_json_if_exists(path)? {
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(FixtureError::InvalidShape(format!(
                "{} is not a JSON object",
                path.display()
            )))
        }
        None => {
            warn!(path = %path.display(), "dataset not found, creating it");
            Map::new()
        }
    };

    fill_header(&mut doc, DUMMY_DATASET_NAME, now);
    doc.entry("logs").or_insert_with(|| Value::Array(Vec::new()));
    doc.insert(
        "vector_test_sessions".to_string(),
        serde_json::to_value(sessions)?,
    );
    write_json(path, &Value::Object(doc))?;

    let total_logs: usize = sessions.sessions.iter().map(|s| s.logs.len()).sum();
    info!(
        path = %path.display(),
        sessions = sessions.sessions.len(),
        total_logs,
        "wrote vector sessions"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{default_base_instant, make_rng};
    use crate::store::load_json;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn generate(config: &SessionGenConfig, seed: u64) -> SessionCollection {
        let mut rng = make_rng(Some(seed));
        generate_sessions(config, &mut rng, default_base_instant()).unwrap()
    }

    #[test]
    fn test_generated_sessions_shape() {
        let collection = generate(&SessionGenConfig::default(), 5);
        assert_eq!(collection.user_id, "dummy_student");
        assert_eq!(collection.generated_at, "2025-11-20T12:00:00.000Z");
        assert_eq!(collection.sessions.len(), 50);
        assert_eq!(collection.sessions[0].session_id, "session_001");
        assert_eq!(collection.sessions[49].session_id, "session_050");

        for session in &collection.sessions {
            assert!((3..=10).contains(&session.logs.len()));
            for log in &session.logs {
                assert!((1..=3).contains(&log.concept_tags.len()));
                assert!(log.glossary_shown.len() <= 2);
                let vector = log.vector.unwrap();
                for axis in Axis::ALL {
                    let score = vector.get(axis).unwrap();
                    assert!((-1..=1).contains(&score));
                }
                assert!(log.clicks.is_empty());
            }
        }
    }

    #[test]
    fn test_log_timestamps_are_one_minute_apart() {
        let collection = generate(&SessionGenConfig::default(), 8);
        let session = &collection.sessions[0];
        let start = DateTime::parse_from_rfc3339(session.generated_at.as_deref().unwrap()).unwrap();
        for (i, log) in session.logs.iter().enumerate() {
            let ts = DateTime::parse_from_rfc3339(log.timestamp.as_deref().unwrap()).unwrap();
            assert_eq!(ts - start, Duration::minutes(i as i64));
        }
    }

    #[test]
    fn test_wide_axis_range() {
        let config = SessionGenConfig {
            axis_range: AxisRange::WIDE,
            session_count: 10,
            ..SessionGenConfig::default()
        };
        let collection = generate(&config, 2);
        let scores: Vec<i32> = collection
            .sessions
            .iter()
            .flat_map(|s| &s.logs)
            .filter_map(|log| log.vector.and_then(|v| v.logic))
            .collect();
        assert!(scores.iter().all(|s| (-3..=3).contains(s)));
        assert!(scores.iter().any(|s| s.abs() > 1));
    }

    #[test]
    fn test_unbounded_axis_range_rejected() {
        let config = SessionGenConfig {
            axis_range: AxisRange { min: i32::MIN, max: i32::MAX },
            ..SessionGenConfig::default()
        };
        let mut rng = make_rng(Some(1));
        assert!(matches!(
            generate_sessions(&config, &mut rng, default_base_instant()),
            Err(FixtureError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn test_write_vector_sessions_keeps_flat_logs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quiz_log_dummy.json");
        write_json(
            &path,
            &json!({
                "dataset_name": "quiz_log_dummy",
                "type": "class",
                "created_at": "2025-11-18",
                "logs": [{"questionId": "q001", "correct": true}]
            }),
        )
        .unwrap();

        let collection = generate(
            &SessionGenConfig {
                session_count: 2,
                ..SessionGenConfig::default()
            },
            1,
        );
        write_vector_sessions(&path, &collection, default_base_instant()).unwrap();

        let doc = load_json(&path).unwrap();
        assert_eq!(doc["created_at"], "2025-11-18");
        assert_eq!(doc["logs"], json!([{"questionId": "q001", "correct": true}]));
        assert_eq!(
            doc["vector_test_sessions"]["sessions"]
                .as_array()
                .map(Vec::len),
            Some(2)
        );
    }

    #[test]
    fn test_write_vector_sessions_refuses_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.json");
        std::fs::write(&path, "[]").unwrap();

        let collection = generate(
            &SessionGenConfig {
                session_count: 1,
                ..SessionGenConfig::default()
            },
            1,
        );
        assert!(write_vector_sessions(&path, &collection, default_base_instant()).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }
}
