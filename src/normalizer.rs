//! Unit-interval normalization
//!
//! Scales raw session statistics onto `[0, 1]` and rounds them to the
//! precision stored in fixture files.

use serde::{Deserialize, Serialize};

use crate::error::FixtureError;

/// Decimal digits kept in normalized feature values
pub const FEATURE_DECIMALS: i32 = 6;

/// Largest axis score magnitude a generator may produce
pub const MAX_GENERATED_AXIS_SCORE: i32 = 10;

/// Inclusive integer range that axis scores are drawn from.
///
/// Fixture generations disagree on this range: per-log `vector` scores are
/// produced in `[-1, 1]`, while older session summaries used `[-3, 3]`.
/// The range is therefore explicit configuration rather than a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

impl AxisRange {
    /// `[-1, 1]`, the range used for per-log `vector` scores
    pub const UNIT: AxisRange = AxisRange { min: -1, max: 1 };

    /// `[-3, 3]`, the range used by session-level vector summaries
    pub const WIDE: AxisRange = AxisRange { min: -3, max: 3 };

    pub fn new(min: i32, max: i32) -> Result<Self, FixtureError> {
        if min >= max {
            return Err(FixtureError::InvalidConfig(format!(
                "axis range must satisfy min < max, got [{min}, {max}]"
            )));
        }
        Ok(Self { min, max })
    }

    /// Reject ranges reaching beyond `±MAX_GENERATED_AXIS_SCORE`; generators
    /// sample every integer in the range
    pub fn check_generated(&self, name: &str) -> Result<(), FixtureError> {
        if self.min >= self.max {
            return Err(FixtureError::InvalidPolicy(format!(
                "{name} must satisfy min < max, got [{}, {}]",
                self.min, self.max
            )));
        }
        if self.min < -MAX_GENERATED_AXIS_SCORE || self.max > MAX_GENERATED_AXIS_SCORE {
            return Err(FixtureError::InvalidPolicy(format!(
                "{name} [{}, {}] exceeds ±{MAX_GENERATED_AXIS_SCORE}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    pub fn contains(&self, value: i32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Midpoint of the range; an average equal to it normalizes to 0.5
    pub fn midpoint(&self) -> f64 {
        (f64::from(self.min) + f64::from(self.max)) / 2.0
    }

    /// Map a value linearly so that `min → 0` and `max → 1`, clamped
    pub fn to_unit(&self, value: f64) -> f64 {
        let min = f64::from(self.min);
        let span = f64::from(self.max) - min;
        clamp_unit((value - min) / span)
    }
}

impl Default for AxisRange {
    fn default() -> Self {
        Self::UNIT
    }
}

/// Divide by a saturation point and clamp to `[0, 1]`
pub fn saturate(value: f64, saturation: f64) -> f64 {
    if saturation <= 0.0 {
        return 0.0;
    }
    clamp_unit(value / saturation)
}

/// Clamp to `[0, 1]`; NaN maps to 0
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Round half away from zero to `decimals` digits
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Mean of a sample set, or 0 when there are no samples
pub fn mean_or_zero(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_range_to_unit() {
        let unit = AxisRange::UNIT;
        assert_eq!(unit.to_unit(-1.0), 0.0);
        assert_eq!(unit.to_unit(0.0), 0.5);
        assert_eq!(unit.to_unit(1.0), 1.0);

        let wide = AxisRange::WIDE;
        assert_eq!(wide.to_unit(-3.0), 0.0);
        assert_eq!(wide.to_unit(0.0), 0.5);
        assert!((wide.to_unit(1.0) - 4.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_axis_range_clamps_out_of_range() {
        assert_eq!(AxisRange::UNIT.to_unit(3.0), 1.0);
        assert_eq!(AxisRange::UNIT.to_unit(-7.0), 0.0);
    }

    #[test]
    fn test_axis_range_validation() {
        assert!(AxisRange::new(1, 1).is_err());
        assert!(AxisRange::new(2, -2).is_err());
        let range = AxisRange::new(-2, 2).unwrap();
        assert_eq!(range.midpoint(), 0.0);
        assert!(range.contains(2));
        assert!(!range.contains(3));
    }

    #[test]
    fn test_extreme_axis_range_does_not_overflow() {
        let full = AxisRange::new(i32::MIN, i32::MAX).unwrap();
        assert_eq!(full.to_unit(f64::from(i32::MIN)), 0.0);
        assert_eq!(full.to_unit(f64::from(i32::MAX)), 1.0);
        assert!((full.to_unit(0.0) - 0.5).abs() < 1e-9);
        assert!((full.midpoint() + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_generated_ranges_are_bounded() {
        assert!(AxisRange::WIDE.check_generated("axis_range").is_ok());
        assert!(AxisRange { min: 1, max: 3 }.check_generated("bias").is_ok());
        assert!(AxisRange { min: 2, max: 2 }.check_generated("bias").is_err());
        assert!(matches!(
            AxisRange { min: i32::MIN, max: i32::MAX }.check_generated("axis_range"),
            Err(FixtureError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn test_saturate() {
        assert_eq!(saturate(15.0, 30.0), 0.5);
        assert_eq!(saturate(45.0, 30.0), 1.0);
        assert_eq!(saturate(-1.0, 30.0), 0.0);
        assert_eq!(saturate(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.123_456_789, FEATURE_DECIMALS), 0.123457);
        assert_eq!(round_to(1.0 / 3.0, 2), 0.33);
    }

    #[test]
    fn test_clamp_unit_nan() {
        assert_eq!(clamp_unit(f64::NAN), 0.0);
    }
}
