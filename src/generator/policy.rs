//! Sampling policies shared by the generators

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{owned, round1, CountRange};
use crate::error::FixtureError;
use crate::types::Click;

const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// One bucket of a [`WeightedRanges`] table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedRange {
    pub label: String,
    pub probability: f64,
    pub min: f64,
    pub max: f64,
}

impl WeightedRange {
    pub fn new(label: &str, probability: f64, min: f64, max: f64) -> Self {
        Self {
            label: label.to_string(),
            probability,
            min,
            max,
        }
    }
}

/// Probability table mapping categories to value ranges.
///
/// A bucket is selected by weight, then a value is drawn uniformly from its
/// range and rounded to one decimal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightedRanges(Vec<WeightedRange>);

impl WeightedRanges {
    pub fn new(buckets: Vec<WeightedRange>) -> Result<Self, FixtureError> {
        let ranges = Self(buckets);
        ranges.validate()?;
        Ok(ranges)
    }

    /// Response-time table: instant 30 %, searching 40 %, deliberate 30 %
    pub fn response_times() -> Self {
        Self(vec![
            WeightedRange::new("instant", 0.3, 0.5, 2.0),
            WeightedRange::new("searching", 0.4, 3.0, 12.0),
            WeightedRange::new("deliberate", 0.3, 15.0, 40.0),
        ])
    }

    pub fn buckets(&self) -> &[WeightedRange] {
        &self.0
    }

    pub fn validate(&self) -> Result<(), FixtureError> {
        if self.0.is_empty() {
            return Err(FixtureError::InvalidPolicy(
                "probability table has no buckets".to_string(),
            ));
        }

        let mut total = 0.0;
        for bucket in &self.0 {
            if !(bucket.probability.is_finite() && bucket.probability >= 0.0) {
                return Err(FixtureError::InvalidPolicy(format!(
                    "bucket '{}' has invalid probability {}",
                    bucket.label, bucket.probability
                )));
            }
            if !(bucket.min.is_finite() && bucket.max.is_finite() && bucket.min <= bucket.max) {
                return Err(FixtureError::InvalidPolicy(format!(
                    "bucket '{}' has invalid range [{}, {}]",
                    bucket.label, bucket.min, bucket.max
                )));
            }
            total += bucket.probability;
        }

        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(FixtureError::InvalidPolicy(format!(
                "bucket probabilities sum to {total}, expected 1"
            )));
        }
        Ok(())
    }

    /// Select a bucket by weight
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&WeightedRange> {
        let roll: f64 = rng.random();
        let mut cumulative = 0.0;
        for bucket in &self.0 {
            cumulative += bucket.probability;
            if roll < cumulative {
                return Some(bucket);
            }
        }
        // Rounding can leave the cumulative sum a hair below 1
        self.0.last()
    }

    /// Select a bucket and draw a value from its range
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self.pick(rng) {
            Some(bucket) => round1(rng.random_range(bucket.min..=bucket.max)),
            None => 0.0,
        }
    }
}

impl Default for WeightedRanges {
    fn default() -> Self {
        Self::response_times()
    }
}

/// How answer paths are walked over the choice alphabet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathPolicy {
    pub choices: Vec<String>,
    pub steps: CountRange,
}

impl Default for PathPolicy {
    fn default() -> Self {
        Self {
            choices: owned(&["c1", "c2", "c3", "c4"]),
            steps: CountRange::new(1, 4),
        }
    }
}

impl PathPolicy {
    pub fn with_steps(mut self, steps: CountRange) -> Self {
        self.steps = steps;
        self
    }

    pub fn validate(&self) -> Result<(), FixtureError> {
        self.steps.validate("path steps")?;
        if self.steps.min == 0 {
            return Err(FixtureError::InvalidPolicy(
                "paths need at least one step".to_string(),
            ));
        }
        if self.choices.is_empty() {
            return Err(FixtureError::InvalidPolicy(
                "path policy has no choices".to_string(),
            ));
        }
        if self.choices.len() < 2 && self.steps.max > 1 {
            return Err(FixtureError::InvalidPolicy(
                "multi-step paths need at least two choices".to_string(),
            ));
        }
        Ok(())
    }

    /// Walk a path with a step count drawn from `steps`
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<String> {
        let steps = self.steps.sample(rng);
        self.walk(rng, steps)
    }

    /// Random walk of exactly `steps` selections where consecutive
    /// selections differ
    pub fn walk<R: Rng + ?Sized>(&self, rng: &mut R, steps: usize) -> Vec<String> {
        let n = self.choices.len();
        if n == 0 {
            return Vec::new();
        }

        let mut path = Vec::with_capacity(steps);
        let mut previous: Option<usize> = None;
        for _ in 0..steps {
            let next = match previous {
                Some(prev) if n > 1 => {
                    // Draw from the other n - 1 choices
                    let idx = rng.random_range(0..n - 1);
                    if idx >= prev {
                        idx + 1
                    } else {
                        idx
                    }
                }
                _ => rng.random_range(0..n),
            };
            path.push(self.choices[next].clone());
            previous = Some(next);
        }
        path
    }
}

/// Clicks consistent with `path`: one per step, cumulative times
/// non-decreasing and capped by `response_time`, the last one equal to it.
pub fn build_clicks<R: Rng + ?Sized>(rng: &mut R, path: &[String], response_time: f64) -> Vec<Click> {
    let total = response_time.max(0.0);
    let mut clicks = Vec::with_capacity(path.len());
    let mut elapsed = 0.0_f64;

    for (i, choice) in path.iter().enumerate() {
        let remaining_clicks = path.len() - i;
        let time = if remaining_clicks == 1 {
            total
        } else {
            let interval = (total - elapsed).max(0.0) / remaining_clicks as f64;
            elapsed = (elapsed + interval * rng.random_range(0.5..=1.5)).min(total);
            round1(elapsed).min(total)
        };
        clicks.push(Click {
            choice_id: choice.clone(),
            time,
        });
    }
    clicks
}
