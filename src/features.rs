//! Cluster feature derivation
//!
//! Reduces the log records of one session to an 8-dimensional feature vector
//! in `[0, 1]`, used downstream for unsupervised grouping of learners.
//!
//! | index | feature | normalization |
//! |---|---|---|
//! | 0 | correct rate | none |
//! | 1 | mean response time | / `response_time_saturation_sec` |
//! | 2 | mean path length (non-empty paths) | / `path_length_saturation` |
//! | 3-5 | mean logic / analysis / creativity | axis range onto `[0, 1]` |
//! | 6 | total glossary terms shown | / `glossary_saturation` |
//! | 7 | number of logs | / `log_count_saturation` |

use serde::{Deserialize, Serialize};

use crate::error::FixtureError;
use crate::normalizer::{clamp_unit, mean_or_zero, round_to, saturate, AxisRange, FEATURE_DECIMALS};
use crate::types::{Axis, FeatureVector, LogRecord, FEATURE_COUNT};

/// Feature names in vector order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "correct_rate",
    "avg_response_time",
    "avg_path_length",
    "avg_vector_logic",
    "avg_vector_analysis",
    "avg_vector_creativity",
    "glossary_count",
    "total_logs",
];

/// Normalization constants for feature derivation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Mean response time (seconds) that maps to 1.0
    pub response_time_saturation_sec: f64,
    /// Mean path length that maps to 1.0
    pub path_length_saturation: f64,
    /// Glossary terms per session that map to 1.0
    pub glossary_saturation: f64,
    /// Logs per session that map to 1.0
    pub log_count_saturation: f64,
    /// Range of per-log axis scores
    pub axis_range: AxisRange,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            response_time_saturation_sec: 30.0,
            path_length_saturation: 10.0,
            glossary_saturation: 20.0,
            log_count_saturation: 50.0,
            axis_range: AxisRange::UNIT,
        }
    }
}

impl FeatureConfig {
    pub fn with_axis_range(mut self, axis_range: AxisRange) -> Self {
        self.axis_range = axis_range;
        self
    }

    pub fn validate(&self) -> Result<(), FixtureError> {
        let saturations = [
            ("response_time_saturation_sec", self.response_time_saturation_sec),
            ("path_length_saturation", self.path_length_saturation),
            ("glossary_saturation", self.glossary_saturation),
            ("log_count_saturation", self.log_count_saturation),
        ];
        for (name, value) in saturations {
            if !(value.is_finite() && value > 0.0) {
                return Err(FixtureError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        AxisRange::new(self.axis_range.min, self.axis_range.max)?;
        Ok(())
    }
}

/// Feature reducer for session logs
#[derive(Debug, Clone, Default)]
pub struct FeatureReducer {
    config: FeatureConfig,
}

impl FeatureReducer {
    pub fn new(config: FeatureConfig) -> Result<Self, FixtureError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Reduce a session's logs to its feature vector.
    ///
    /// An empty session yields the neutral vector (all 0.5). Absent or
    /// malformed sub-fields only shrink the sample set of the affected
    /// feature; a feature with no samples uses a raw value of 0.
    pub fn reduce(&self, logs: &[LogRecord]) -> FeatureVector {
        if logs.is_empty() {
            return FeatureVector::neutral();
        }

        let cfg = &self.config;
        let n = logs.len();
        let acc = logs.iter().fold(Accumulator::default(), Accumulator::add);

        let correct_rate = acc.correct as f64 / n as f64;
        let avg_response_time = mean_or_zero(acc.response_time_sum, acc.response_time_count);
        let avg_path_length = mean_or_zero(acc.path_length_sum as f64, acc.path_count);

        let mut values = [0.0; FEATURE_COUNT];
        values[0] = clamp_unit(correct_rate);
        values[1] = saturate(avg_response_time, cfg.response_time_saturation_sec);
        values[2] = saturate(avg_path_length, cfg.path_length_saturation);
        for (slot, (sum, count)) in acc.axes.iter().enumerate() {
            values[3 + slot] = cfg.axis_range.to_unit(mean_or_zero(*sum, *count));
        }
        values[6] = saturate(acc.glossary_terms as f64, cfg.glossary_saturation);
        values[7] = saturate(n as f64, cfg.log_count_saturation);

        FeatureVector::new(values.map(|v| round_to(v, FEATURE_DECIMALS)))
    }

    /// Count axis scores that fall outside the configured range.
    ///
    /// Such scores are still averaged (and the result clamped), but a non-zero
    /// count usually means the logs were generated for a different range.
    pub fn out_of_range_axis_samples(&self, logs: &[LogRecord]) -> usize {
        logs.iter()
            .filter_map(|log| log.vector.as_ref())
            .flat_map(|vector| Axis::ALL.iter().filter_map(|axis| vector.get(*axis)))
            .filter(|score| !self.config.axis_range.contains(*score))
            .count()
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    correct: usize,
    response_time_sum: f64,
    response_time_count: usize,
    path_length_sum: usize,
    path_count: usize,
    /// (sum, count) per axis in `Axis::ALL` order
    axes: [(f64, usize); 3],
    glossary_terms: usize,
}

impl Accumulator {
    fn add(mut self, log: &LogRecord) -> Self {
        if log.correct {
            self.correct += 1;
        }
        if let Some(rt) = log.response_time {
            self.response_time_sum += rt;
            self.response_time_count += 1;
        }
        if !log.path.is_empty() {
            self.path_length_sum += log.path.len();
            self.path_count += 1;
        }
        if let Some(vector) = &log.vector {
            for (slot, axis) in Axis::ALL.iter().enumerate() {
                if let Some(score) = vector.get(*axis) {
                    self.axes[slot].0 += score as f64;
                    self.axes[slot].1 += 1;
                }
            }
        }
        self.glossary_terms += log.glossary_shown.len();
        self
    }
}
