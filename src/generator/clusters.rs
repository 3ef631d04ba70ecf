//! Ground-truth clustered datasets (`cluster_dummy.json`)
//!
//! Sessions cycle through a list of behavioral profiles. Each profile biases
//! correctness, path length, reaction time and axis scores, so a clustering
//! of the derived feature vectors can be checked against the profile a
//! session was sampled from.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use super::policy::{build_clicks, PathPolicy};
use super::{
    check_probability, format_timestamp, owned, round1, sample_distinct, summarize_vectors,
    CountRange, QUESTION_IDS,
};
use crate::error::FixtureError;
use crate::features::{FeatureConfig, FeatureReducer};
use crate::index::{upsert_index_entry, IndexEntry};
use crate::normalizer::{mean_or_zero, round_to, AxisRange};
use crate::store::write_json;
use crate::types::{
    Axis, AxisVector, ClusterDataset, ClusterMetadata, ClusterSession, DatasetType, LogRecord,
};

/// Behavioral profile sessions are sampled from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterProfile {
    /// Label stored as `cluster_ground_truth`
    pub ground_truth: u8,
    pub label: String,
    pub correct_probability: f64,
    pub path_steps: CountRange,
    /// Base reaction time in seconds before the per-step surcharge
    pub reaction_time_min: f64,
    pub reaction_time_max: f64,
    /// Range the profile's axis scores are drawn from
    pub axis_bias: AxisRange,
}

impl ClusterProfile {
    /// Quick, confident answers
    pub fn fast() -> Self {
        Self {
            ground_truth: 1,
            label: "fast".to_string(),
            correct_probability: 0.8,
            path_steps: CountRange::new(1, 2),
            reaction_time_min: 1.0,
            reaction_time_max: 5.0,
            axis_bias: AxisRange { min: 1, max: 3 },
        }
    }

    /// Moves between choices before settling
    pub fn exploratory() -> Self {
        Self {
            ground_truth: 2,
            label: "exploratory".to_string(),
            correct_probability: 0.6,
            path_steps: CountRange::new(2, 4),
            reaction_time_min: 5.0,
            reaction_time_max: 15.0,
            axis_bias: AxisRange { min: -1, max: 1 },
        }
    }

    /// Slow and deliberate
    pub fn careful() -> Self {
        Self {
            ground_truth: 3,
            label: "careful".to_string(),
            correct_probability: 0.4,
            path_steps: CountRange::new(3, 6),
            reaction_time_min: 15.0,
            reaction_time_max: 30.0,
            axis_bias: AxisRange { min: -3, max: -1 },
        }
    }

    fn validate(&self) -> Result<(), FixtureError> {
        check_probability(&format!("{} correct_probability", self.label), self.correct_probability)?;
        self.path_steps.validate(&format!("{} path_steps", self.label))?;
        if self.path_steps.min == 0 {
            return Err(FixtureError::InvalidPolicy(format!(
                "{}: paths need at least one step",
                self.label
            )));
        }
        if !(self.reaction_time_min >= 0.0 && self.reaction_time_min <= self.reaction_time_max) {
            return Err(FixtureError::InvalidPolicy(format!(
                "{}: invalid reaction time range [{}, {}]",
                self.label, self.reaction_time_min, self.reaction_time_max
            )));
        }
        self.axis_bias
            .check_generated(&format!("{} axis_bias", self.label))
    }
}

/// Configuration for clustered dataset generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterGenConfig {
    pub dataset_name: String,
    pub description: String,
    pub session_count: CountRange,
    pub questions_per_session: CountRange,
    pub profiles: Vec<ClusterProfile>,
    /// Seconds added to the reaction time per path step
    pub seconds_per_step: f64,
    /// Chance an axis score ignores the profile bias
    pub noise_probability: f64,
    pub noise_range: AxisRange,
    pub questions: Vec<String>,
    pub choices: Vec<String>,
    pub window_days: u32,
    /// Feature layout used for `cluster_features`
    pub features: FeatureConfig,
}

impl Default for ClusterGenConfig {
    fn default() -> Self {
        Self {
            dataset_name: "cluster_dummy".to_string(),
            description: "Clustering fixture with ground-truth behavioral profiles".to_string(),
            session_count: CountRange::new(20, 30),
            questions_per_session: CountRange::new(5, 10),
            profiles: vec![
                ClusterProfile::fast(),
                ClusterProfile::exploratory(),
                ClusterProfile::careful(),
            ],
            seconds_per_step: 0.5,
            noise_probability: 0.1,
            noise_range: AxisRange::WIDE,
            questions: owned(&QUESTION_IDS),
            choices: PathPolicy::default().choices,
            window_days: 30,
            features: FeatureConfig::default().with_axis_range(AxisRange::WIDE),
        }
    }
}

impl ClusterGenConfig {
    pub fn validate(&self) -> Result<(), FixtureError> {
        self.session_count.validate("session_count")?;
        self.questions_per_session.validate("questions_per_session")?;
        check_probability("noise_probability", self.noise_probability)?;
        self.noise_range.check_generated("noise_range")?;
        if self.profiles.is_empty() {
            return Err(FixtureError::InvalidPolicy("no profiles configured".to_string()));
        }
        for profile in &self.profiles {
            profile.validate()?;
        }
        if !(self.seconds_per_step.is_finite() && self.seconds_per_step >= 0.0) {
            return Err(FixtureError::InvalidPolicy(format!(
                "seconds_per_step must be non-negative, got {}",
                self.seconds_per_step
            )));
        }
        if self.questions.is_empty() {
            return Err(FixtureError::InvalidPolicy("question list is empty".to_string()));
        }
        if self.choices.len() < 2 {
            return Err(FixtureError::InvalidPolicy(
                "multi-step paths need at least two choices".to_string(),
            ));
        }
        self.features.validate()
    }
}

/// Generate a clustered dataset; sessions cycle through the profiles in
/// order and `created_at` is `now`
pub fn generate_clusters<R: Rng + ?Sized>(
    config: &ClusterGenConfig,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<ClusterDataset, FixtureError> {
    config.validate()?;
    let reducer = FeatureReducer::new(config.features)?;
    let path_policy = PathPolicy {
        choices: config.choices.clone(),
        ..PathPolicy::default()
    };

    let session_count = config.session_count.sample(rng);
    let sessions: Vec<ClusterSession> = (0..session_count)
        .map(|i| {
            let profile = &config.profiles[i % config.profiles.len()];
            let learner = i / config.profiles.len() + 1;
            generate_session(config, profile, &path_policy, &reducer, rng, now, i, learner)
        })
        .collect();

    let mut distribution: BTreeMap<String, usize> = config
        .profiles
        .iter()
        .map(|p| (format!("cluster_{}", p.ground_truth), 0))
        .collect();
    for session in &sessions {
        *distribution
            .entry(format!("cluster_{}", session.cluster_ground_truth))
            .or_default() += 1;
    }

    Ok(ClusterDataset {
        dataset_name: config.dataset_name.clone(),
        dataset_type: DatasetType::Class,
        created_at: format_timestamp(&now),
        description: config.description.clone(),
        metadata: ClusterMetadata {
            total_sessions: sessions.len(),
            ground_truth_distribution: distribution,
        },
        sessions,
    })
}

#[allow(clippy::too_many_arguments)]
fn generate_session<R: Rng + ?Sized>(
    config: &ClusterGenConfig,
    profile: &ClusterProfile,
    path_policy: &PathPolicy,
    reducer: &FeatureReducer,
    rng: &mut R,
    now: DateTime<Utc>,
    index: usize,
    learner: usize,
) -> ClusterSession {
    let start = session_start(rng, now, config.window_days);
    let question_count = config.questions_per_session.sample(rng);
    let questions = sample_distinct(rng, &config.questions, question_count);

    let mut elapsed = 0.0_f64;
    let mut logs = Vec::with_capacity(questions.len());
    for question_id in questions {
        let correct = rng.random_bool(profile.correct_probability);
        let steps = profile.path_steps.sample(rng);
        let path = path_policy.walk(rng, steps);
        let base_time = rng.random_range(profile.reaction_time_min..=profile.reaction_time_max);
        let response_time = round1(base_time + steps as f64 * config.seconds_per_step);
        let clicks = build_clicks(rng, &path, response_time);
        elapsed += response_time;

        let mut vector = AxisVector::default();
        for axis in Axis::ALL {
            let range = if rng.random_bool(config.noise_probability) {
                config.noise_range
            } else {
                profile.axis_bias
            };
            vector.set(axis, rng.random_range(range.min..=range.max));
        }

        logs.push(LogRecord {
            question_id: Some(question_id),
            timestamp: Some(format_timestamp(
                &(start + Duration::seconds(elapsed.floor() as i64)),
            )),
            final_answer: path.last().cloned(),
            clicks,
            correct,
            response_time: Some(response_time),
            path,
            vector: Some(vector),
            ..LogRecord::default()
        });
    }

    let n = logs.len();
    let correct_count = logs.iter().filter(|log| log.correct).count();
    let total_path: usize = logs.iter().map(|log| log.path.len()).sum();

    ClusterSession {
        user_id: format!("student_{learner:03}"),
        session_id: format!("cluster_session_{:03}", index + 1),
        timestamp_start: format_timestamp(&start),
        timestamp_end: format_timestamp(
            &(start + Duration::seconds(elapsed.floor() as i64 + 10)),
        ),
        vector_summary: summarize_vectors(&logs, 2),
        cluster_features: reducer.reduce(&logs),
        cluster_ground_truth: profile.ground_truth,
        num_questions: n,
        correct_count,
        correct_rate: round_to(mean_or_zero(correct_count as f64, n), 6),
        avg_reaction_time: round1(mean_or_zero(elapsed, n)),
        avg_path_length: round1(mean_or_zero(total_path as f64, n)),
        logs,
    }
}

/// Random day within the window, at a random time between 09:00 and 18:59
fn session_start<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>, window_days: u32) -> DateTime<Utc> {
    let days_ago = rng.random_range(0..=i64::from(window_days));
    let day = (now - Duration::days(days_ago)).date_naive();
    let (hour, minute, second) = (
        rng.random_range(9..=18),
        rng.random_range(0..=59),
        rng.random_range(0..=59),
    );
    day.and_hms_opt(hour, minute, second)
        .map(|naive| naive.and_utc())
        .unwrap_or(now)
}

/// Write the dataset as `<dir>/<dataset_name>.json` and register it in the
/// directory's `index.json`
pub fn write_cluster_dataset(dir: &Path, dataset: &ClusterDataset) -> Result<PathBuf, FixtureError> {
    let file_name = format!("{}.json", dataset.dataset_name);
    let path = dir.join(&file_name);
    write_json(&path, dataset)?;
    upsert_index_entry(
        dir,
        IndexEntry {
            file: file_name,
            dataset_name: dataset.dataset_name.clone(),
            dataset_type: dataset.dataset_type.as_str().to_string(),
            sessions: None,
        },
    )?;

    info!(
        path = %path.display(),
        sessions = dataset.metadata.total_sessions,
        distribution = ?dataset.metadata.ground_truth_distribution,
        "wrote clustered dataset"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{default_base_instant, make_rng};
    use crate::store::{load_json, load_typed};
    use pretty_assertions::assert_eq;

    fn generate(seed: u64) -> ClusterDataset {
        let mut rng = make_rng(Some(seed));
        generate_clusters(&ClusterGenConfig::default(), &mut rng, default_base_instant()).unwrap()
    }

    #[test]
    fn test_sessions_cycle_profiles() {
        let dataset = generate(21);
        let n = dataset.sessions.len();
        assert!((20..=30).contains(&n));
        assert_eq!(dataset.metadata.total_sessions, n);

        for (i, session) in dataset.sessions.iter().enumerate() {
            assert_eq!(session.cluster_ground_truth as usize, i % 3 + 1);
            assert_eq!(session.user_id, format!("student_{:03}", i / 3 + 1));
        }

        let counted: usize = dataset.metadata.ground_truth_distribution.values().sum();
        assert_eq!(counted, n);
        assert_eq!(
            dataset.metadata.ground_truth_distribution.keys().collect::<Vec<_>>(),
            vec!["cluster_1", "cluster_2", "cluster_3"]
        );
    }

    #[test]
    fn test_profiles_shape_sessions() {
        let dataset = generate(4);
        for session in &dataset.sessions {
            let profile = match session.cluster_ground_truth {
                1 => ClusterProfile::fast(),
                2 => ClusterProfile::exploratory(),
                _ => ClusterProfile::careful(),
            };
            assert!((5..=10).contains(&session.num_questions));
            assert_eq!(session.logs.len(), session.num_questions);
            for log in &session.logs {
                let steps = log.path.len();
                assert!(steps >= profile.path_steps.min && steps <= profile.path_steps.max);
                let rt = log.response_time.unwrap();
                let surcharge = steps as f64 * 0.5;
                assert!(rt >= profile.reaction_time_min + surcharge - 0.051);
                assert!(rt <= profile.reaction_time_max + surcharge + 0.051);
                assert_eq!(log.clicks.len(), steps);
            }
            assert!(session.cluster_features.is_normalized());
        }
    }

    #[test]
    fn test_features_match_reducer() {
        let dataset = generate(9);
        let reducer =
            FeatureReducer::new(FeatureConfig::default().with_axis_range(AxisRange::WIDE)).unwrap();
        for session in &dataset.sessions {
            assert_eq!(session.cluster_features, reducer.reduce(&session.logs));
            let expected_rate = session.correct_count as f64 / session.num_questions as f64;
            assert!((session.correct_rate - expected_rate).abs() < 1e-6);
        }
    }

    #[test]
    fn test_fast_sessions_score_higher_logic_than_careful() {
        let dataset = generate(13);
        let mean_logic = |gt: u8| {
            let values: Vec<f64> = dataset
                .sessions
                .iter()
                .filter(|s| s.cluster_ground_truth == gt)
                .map(|s| s.vector_summary.logic)
                .collect();
            values.iter().sum::<f64>() / values.len() as f64
        };
        assert!(mean_logic(1) > mean_logic(3));
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        assert_eq!(generate(77), generate(77));
    }

    #[test]
    fn test_empty_profiles_rejected() {
        let config = ClusterGenConfig {
            profiles: Vec::new(),
            ..ClusterGenConfig::default()
        };
        let mut rng = make_rng(Some(1));
        assert!(generate_clusters(&config, &mut rng, default_base_instant()).is_err());
    }

    #[test]
    fn test_oversized_axis_ranges_rejected() {
        let mut rng = make_rng(Some(1));
        let noisy = ClusterGenConfig {
            noise_range: AxisRange { min: -1_000, max: 1_000 },
            ..ClusterGenConfig::default()
        };
        assert!(generate_clusters(&noisy, &mut rng, default_base_instant()).is_err());

        let mut biased = ClusterGenConfig::default();
        biased.profiles[0].axis_bias = AxisRange { min: 0, max: i32::MAX };
        assert!(generate_clusters(&biased, &mut rng, default_base_instant()).is_err());
    }

    #[test]
    fn test_write_cluster_dataset_registers_index() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = generate(1);

        let path = write_cluster_dataset(dir.path(), &dataset).unwrap();
        assert_eq!(path, dir.path().join("cluster_dummy.json"));

        let stored: ClusterDataset = load_typed(&path).unwrap();
        assert_eq!(stored.sessions.len(), dataset.sessions.len());

        // Writing twice keeps a single index entry
        write_cluster_dataset(dir.path(), &dataset).unwrap();
        let index = load_json(&dir.path().join("index.json")).unwrap();
        let datasets = index["datasets"].as_array().unwrap();
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0]["file"], "cluster_dummy.json");
        assert_eq!(datasets[0]["type"], "class");
    }
}
