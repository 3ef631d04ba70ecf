//! Flat quiz log generation (`quiz_log_dummy.json`)

use chrono::{DateTime, Duration, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{info, warn};

use super::policy::{build_clicks, PathPolicy, WeightedRanges};
use super::{check_probability, format_timestamp, owned, sample_distinct, CountRange, QUESTION_IDS};
use crate::error::FixtureError;
use crate::store::{load_json_if_exists, write_json};
use crate::types::{DatasetType, LogRecord};

/// Dataset name given to generated flat logs
pub const DUMMY_DATASET_NAME: &str = "quiz_log_dummy";

/// Configuration for flat log generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogGenConfig {
    pub count: usize,
    pub correct_probability: f64,
    pub response_times: WeightedRanges,
    pub path: PathPolicy,
    pub questions: Vec<String>,
    pub concept_tags: Vec<String>,
    /// Tags attached to each incorrect answer
    pub concept_tag_count: CountRange,
    pub recommended_terms: Vec<String>,
    /// Terms recommended after each incorrect answer
    pub recommended_term_count: CountRange,
    /// Timestamps fall within this many days before the base instant
    pub window_days: u32,
}

impl Default for LogGenConfig {
    fn default() -> Self {
        Self {
            count: 50,
            correct_probability: 0.5,
            response_times: WeightedRanges::response_times(),
            path: PathPolicy::default(),
            questions: owned(&QUESTION_IDS),
            concept_tags: owned(&["短期記憶", "作業記憶", "注意", "条件づけ", "認知負荷", "メタ認知"]),
            concept_tag_count: CountRange::new(1, 2),
            recommended_terms: owned(&[
                "短期記憶",
                "作業記憶",
                "注意制御",
                "長期記憶",
                "二重過程理論",
                "ワーキングメモリ",
            ]),
            recommended_term_count: CountRange::new(1, 3),
            window_days: 30,
        }
    }
}

impl LogGenConfig {
    pub fn validate(&self) -> Result<(), FixtureError> {
        check_probability("correct_probability", self.correct_probability)?;
        self.response_times.validate()?;
        self.path.validate()?;
        self.concept_tag_count.validate("concept_tag_count")?;
        self.recommended_term_count.validate("recommended_term_count")?;
        if self.questions.is_empty() {
            return Err(FixtureError::InvalidPolicy(
                "question list is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Generate `config.count` flat log records with timestamps in the
/// `window_days` before `base`
pub fn generate_logs<R: Rng + ?Sized>(
    config: &LogGenConfig,
    rng: &mut R,
    base: DateTime<Utc>,
) -> Result<Vec<LogRecord>, FixtureError> {
    config.validate()?;
    let window_ms = i64::from(config.window_days) * 24 * 60 * 60 * 1000;

    let logs = (0..config.count)
        .map(|_| {
            let question_id = config.questions.choose(rng).cloned();
            let correct = rng.random_bool(config.correct_probability);
            let response_time = config.response_times.sample(rng);
            let path = config.path.sample(rng);
            let clicks = build_clicks(rng, &path, response_time);
            let offset = if window_ms > 0 {
                rng.random_range(0..window_ms)
            } else {
                0
            };
            let timestamp = base - Duration::milliseconds(offset);

            let (concept_tags, recommended_terms) = if correct {
                (Vec::new(), Vec::new())
            } else {
                let tag_count = config.concept_tag_count.sample(rng);
                let term_count = config.recommended_term_count.sample(rng);
                (
                    sample_distinct(rng, &config.concept_tags, tag_count),
                    sample_distinct(rng, &config.recommended_terms, term_count),
                )
            };

            LogRecord {
                question_id,
                timestamp: Some(format_timestamp(&timestamp)),
                final_answer: path.last().cloned(),
                clicks,
                correct,
                response_time: Some(response_time),
                path,
                concept_tags,
                recommended_terms,
                ..LogRecord::default()
            }
        })
        .collect();

    Ok(logs)
}

/// Store `logs` as the flat `logs` of the document at `path`.
///
/// An existing document keeps every other key (`vector_test_sessions`
/// included); missing `dataset_name`, `type` and `created_at` are filled in.
/// An unreadable existing file is replaced with a fresh document.
pub fn write_flat_logs(
    path: &Path,
    logs: &[LogRecord],
    now: DateTime<Utc>,
) -> Result<(), FixtureError> {
    let mut doc = match load_json_if_exists(path) {
        Ok(Some(Value::Object(map))) => map,
        Ok(Some(_)) => {
            warn!(path = %path.display(), "existing file is not a JSON object, starting fresh");
            Map::new()
        }
        Ok(None) => Map::new(),
        Err(e) => {
            warn!("could not read existing dataset, starting fresh: {e}");
            Map::new()
        }
    };

    fill_header(&mut doc, DUMMY_DATASET_NAME, now);
    doc.insert("logs".to_string(), serde_json::to_value(logs)?);
    write_json(path, &Value::Object(doc))?;

    let correct = logs.iter().filter(|log| log.correct).count();
    info!(
        path = %path.display(),
        logs = logs.len(),
        correct,
        "wrote flat logs"
    );
    Ok(())
}

/// Insert `dataset_name`, `type` and `created_at` where absent
pub(crate) fn fill_header(doc: &mut Map<String, Value>, dataset_name: &str, now: DateTime<Utc>) {
    doc.entry("dataset_name")
        .or_insert_with(|| Value::from(dataset_name));
    doc.entry("type")
        .or_insert_with(|| Value::from(DatasetType::Class.as_str()));
    doc.entry("created_at")
        .or_insert_with(|| Value::from(format_timestamp(&now)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{default_base_instant, make_rng};
    use crate::store::load_json;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn generate(seed: u64) -> Vec<LogRecord> {
        let mut rng = make_rng(Some(seed));
        generate_logs(&LogGenConfig::default(), &mut rng, default_base_instant()).unwrap()
    }

    #[test]
    fn test_generated_logs_are_consistent() {
        let logs = generate(1);
        assert_eq!(logs.len(), 50);
        let base = default_base_instant();

        for log in &logs {
            assert!(!log.path.is_empty() && log.path.len() <= 4);
            assert_eq!(log.final_answer.as_ref(), log.path.last());
            assert_eq!(log.clicks.len(), log.path.len());
            assert_eq!(log.clicks.last().map(|c| c.time), log.response_time);

            let ts = DateTime::parse_from_rfc3339(log.timestamp.as_deref().unwrap())
                .unwrap()
                .with_timezone(&Utc);
            let age = base - ts;
            assert!(age >= Duration::zero() && age <= Duration::days(30));

            if log.correct {
                assert!(log.concept_tags.is_empty());
                assert!(log.recommended_terms.is_empty());
            } else {
                assert!((1..=2).contains(&log.concept_tags.len()));
                assert!((1..=3).contains(&log.recommended_terms.len()));
            }
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        assert_eq!(generate(17), generate(17));
        assert_ne!(generate(17), generate(18));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = LogGenConfig {
            correct_probability: 1.5,
            ..LogGenConfig::default()
        };
        let mut rng = make_rng(Some(1));
        assert!(matches!(
            generate_logs(&config, &mut rng, default_base_instant()),
            Err(FixtureError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn test_write_flat_logs_preserves_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quiz_log_dummy.json");
        write_json(
            &path,
            &json!({
                "dataset_name": "custom",
                "logs": [{"correct": true}],
                "vector_test_sessions": {"user_id": "u", "sessions": []}
            }),
        )
        .unwrap();

        let logs = generate(3);
        write_flat_logs(&path, &logs, default_base_instant()).unwrap();

        let doc = load_json(&path).unwrap();
        assert_eq!(doc["dataset_name"], "custom");
        assert_eq!(doc["type"], "class");
        assert_eq!(doc["created_at"], "2025-11-20T12:00:00.000Z");
        assert_eq!(doc["vector_test_sessions"]["user_id"], "u");
        assert_eq!(doc["logs"].as_array().map(Vec::len), Some(50));
    }

    #[test]
    fn test_write_flat_logs_creates_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("students").join("quiz_log_dummy.json");

        write_flat_logs(&path, &generate(4), default_base_instant()).unwrap();

        let doc = load_json(&path).unwrap();
        assert_eq!(doc["dataset_name"], DUMMY_DATASET_NAME);
        let first = &doc["logs"][0];
        for key in ["questionId", "timestamp", "clicks", "final_answer", "correct", "response_time", "path"] {
            assert!(first.get(key).is_some(), "missing {key}");
        }
    }
}
