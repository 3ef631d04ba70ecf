//! Synthetic fixture generation
//!
//! Every generator is driven by an explicit configuration struct (with
//! defaults matching the fixtures the analytics application ships with) and
//! takes the random source as a parameter, so a seeded `Pcg32` reproduces a
//! dataset exactly.

pub mod clusters;
pub mod demo;
pub mod logs;
pub mod policy;
pub mod sessions;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::error::FixtureError;
use crate::normalizer::{mean_or_zero, round_to};
use crate::types::{Axis, LogRecord, VectorSummary};

pub use clusters::{generate_clusters, ClusterGenConfig, ClusterProfile};
pub use demo::{generate_demo, DemoGenConfig, QuizDefinition};
pub use logs::{generate_logs, LogGenConfig};
pub use policy::{build_clicks, PathPolicy, WeightedRange, WeightedRanges};
pub use sessions::{generate_sessions, SessionGenConfig};

/// Question identifiers `q001..q010`
pub const QUESTION_IDS: [&str; 10] = [
    "q001", "q002", "q003", "q004", "q005", "q006", "q007", "q008", "q009", "q010",
];

/// Glossary term identifiers surfaced by the quiz application
pub const GLOSSARY_TERMS: [&str; 8] = [
    "concept.gravity.basic",
    "concept.gravity.deep",
    "concept.pressure.intro",
    "concept.creativity.basic",
    "concept.logic.intro",
    "concept.analysis.basic",
    "concept.memory.working",
    "concept.cognition.metacognition",
];

/// Build the random source for a generator run.
///
/// With a seed the output is reproducible; without one the generator is
/// seeded from the operating system.
pub fn make_rng(seed: Option<u64>) -> Pcg32 {
    match seed {
        Some(seed) => Pcg32::seed_from_u64(seed),
        None => Pcg32::from_os_rng(),
    }
}

/// Fixed instant the bundled vector-session fixtures are generated around
pub fn default_base_instant() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(2025, 11, 20)
        .and_then(|date| date.and_hms_opt(12, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or_default()
}

/// RFC 3339 with millisecond precision and a `Z` suffix
pub fn format_timestamp(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Inclusive integer range used for counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: usize,
    pub max: usize,
}

impl CountRange {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn validate(&self, name: &str) -> Result<(), FixtureError> {
        if self.min > self.max {
            return Err(FixtureError::InvalidPolicy(format!(
                "{name}: min {} exceeds max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        rng.random_range(self.min..=self.max)
    }
}

/// Round to one decimal place, the precision used for generated seconds
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Pick up to `count` distinct entries from `pool`
pub(crate) fn sample_distinct<R: Rng + ?Sized>(
    rng: &mut R,
    pool: &[String],
    count: usize,
) -> Vec<String> {
    pool.choose_multiple(rng, count).cloned().collect()
}

pub(crate) fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Mean score per axis over the logs that carry one, rounded to `decimals`
pub(crate) fn summarize_vectors(logs: &[LogRecord], decimals: i32) -> VectorSummary {
    let mean = |axis: Axis| {
        let scores: Vec<f64> = logs
            .iter()
            .filter_map(|log| log.vector.and_then(|v| v.get(axis)))
            .map(f64::from)
            .collect();
        round_to(mean_or_zero(scores.iter().sum(), scores.len()), decimals)
    };
    VectorSummary {
        logic: mean(Axis::Logic),
        analysis: mean(Axis::Analysis),
        creativity: mean(Axis::Creativity),
    }
}

pub(crate) fn check_probability(name: &str, value: f64) -> Result<(), FixtureError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(FixtureError::InvalidPolicy(format!(
            "{name} must be a probability in [0, 1], got {value}"
        )));
    }
    Ok(())
}
