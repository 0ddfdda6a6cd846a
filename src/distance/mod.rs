//! Descriptor distance metrics.
//!
//! Descriptor components may be marked missing with NaN (see
//! [`MISSING_VALUE`]). The missing-value metrics skip such components, so a
//! missing entry contributes nothing instead of poisoning the sum. Vectors of
//! different lengths are accepted by those metrics only when the surplus
//! tail of the longer vector is entirely missing; anything else is a
//! `DimensionMismatch`.

use crate::util::{TieMatchError, TieMatchResult};

mod scalar;
#[cfg(feature = "simd")]
mod simd;

/// Marker for a missing descriptor component.
pub const MISSING_VALUE: f32 = f32::NAN;

/// Returns true when a component is marked missing.
#[inline]
pub fn is_missing(value: f32) -> bool {
    value.is_nan()
}

/// Distance metric selected at configuration time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DistanceMetric {
    /// Plain Euclidean distance; vectors must have equal length and missing
    /// components propagate NaN.
    Euclidean,
    /// Euclidean distance over the components present in both vectors.
    EuclideanMissingValue,
    /// `sum(|a^alpha - b^alpha|^beta)` over the components present in both
    /// vectors.
    FlexiblePower { alpha: f64, beta: f64 },
}

impl Default for DistanceMetric {
    fn default() -> Self {
        DistanceMetric::EuclideanMissingValue
    }
}

impl DistanceMetric {
    /// Checks the metric parameters.
    pub fn validate(&self) -> TieMatchResult<()> {
        if let DistanceMetric::FlexiblePower { alpha, beta } = *self {
            if !alpha.is_finite() || !beta.is_finite() || alpha <= 0.0 || beta <= 0.0 {
                return Err(TieMatchError::InvalidConfig {
                    reason: "flexible power alpha and beta must be finite and > 0",
                });
            }
        }
        Ok(())
    }

    /// True when missing components are skipped.
    pub fn skips_missing(&self) -> bool {
        !matches!(self, DistanceMetric::Euclidean)
    }

    /// Distance of `v` from the origin.
    pub fn evaluate(&self, v: &[f32]) -> f64 {
        match *self {
            DistanceMetric::Euclidean => scalar::sum_squares(v).sqrt(),
            DistanceMetric::EuclideanMissingValue => scalar::sum_squares_present(v).sqrt(),
            DistanceMetric::FlexiblePower { alpha, beta } => {
                scalar::flexible_power_norm(v, alpha, beta)
            }
        }
    }

    /// Distance between `a` and `b`.
    pub fn evaluate_pair(&self, a: &[f32], b: &[f32]) -> TieMatchResult<f64> {
        let common = self.common_len(a, b)?;
        let (a, b) = (&a[..common], &b[..common]);
        let value = match *self {
            DistanceMetric::Euclidean => squared_diff(a, b).sqrt(),
            DistanceMetric::EuclideanMissingValue => squared_diff_present(a, b).sqrt(),
            DistanceMetric::FlexiblePower { alpha, beta } => {
                scalar::flexible_power_pair(a, b, alpha, beta)
            }
        };
        Ok(value)
    }

    /// Number of leading components to compare, or `DimensionMismatch`.
    fn common_len(&self, a: &[f32], b: &[f32]) -> TieMatchResult<usize> {
        if a.len() == b.len() {
            return Ok(a.len());
        }
        let mismatch = TieMatchError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        };
        if !self.skips_missing() {
            return Err(mismatch);
        }
        let (short, long) = if a.len() < b.len() { (a, b) } else { (b, a) };
        if long[short.len()..].iter().all(|&v| is_missing(v)) {
            Ok(short.len())
        } else {
            Err(mismatch)
        }
    }
}

#[cfg(not(feature = "simd"))]
fn squared_diff(a: &[f32], b: &[f32]) -> f64 {
    scalar::squared_diff(a, b)
}

#[cfg(feature = "simd")]
fn squared_diff(a: &[f32], b: &[f32]) -> f64 {
    simd::squared_diff(a, b)
}

#[cfg(not(feature = "simd"))]
fn squared_diff_present(a: &[f32], b: &[f32]) -> f64 {
    scalar::squared_diff_present(a, b)
}

#[cfg(feature = "simd")]
fn squared_diff_present(a: &[f32], b: &[f32]) -> f64 {
    simd::squared_diff_present(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euclidean_matches_hand_computation() {
        let d = DistanceMetric::Euclidean
            .evaluate_pair(&[0.0, 3.0], &[4.0, 0.0])
            .unwrap();
        assert!((d - 5.0).abs() < 1e-9);
        assert!((DistanceMetric::Euclidean.evaluate(&[3.0, 4.0]) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn missing_component_equals_omitting_it() {
        let metric = DistanceMetric::EuclideanMissingValue;
        let with_missing = metric
            .evaluate_pair(&[1.0, MISSING_VALUE, 5.0], &[4.0, 100.0, 1.0])
            .unwrap();
        let omitted = metric.evaluate_pair(&[1.0, 5.0], &[4.0, 1.0]).unwrap();
        assert!(with_missing.is_finite());
        assert!((with_missing - omitted).abs() < 1e-9);
        assert!((with_missing - 5.0).abs() < 1e-9);
    }

    #[test]
    fn missing_tail_reconciles_lengths() {
        let metric = DistanceMetric::EuclideanMissingValue;
        let d = metric
            .evaluate_pair(&[1.0, 2.0, MISSING_VALUE, MISSING_VALUE], &[1.0, 2.0])
            .unwrap();
        assert_eq!(d, 0.0);
        let err = metric.evaluate_pair(&[1.0, 2.0, 3.0], &[1.0, 2.0]).unwrap_err();
        assert_eq!(err, TieMatchError::DimensionMismatch { left: 3, right: 2 });
        assert!(DistanceMetric::Euclidean
            .evaluate_pair(&[1.0, MISSING_VALUE], &[1.0])
            .is_err());
    }

    #[test]
    fn flexible_power_reduces_to_squared_euclidean() {
        let metric = DistanceMetric::FlexiblePower {
            alpha: 1.0,
            beta: 2.0,
        };
        let d = metric
            .evaluate_pair(&[1.0, MISSING_VALUE, 3.0], &[2.0, 7.0, 5.0])
            .unwrap();
        assert!((d - 5.0).abs() < 1e-9);
        assert!((metric.evaluate(&[1.0, 2.0]) - 5.0).abs() < 1e-9);
        assert!(DistanceMetric::FlexiblePower {
            alpha: 0.0,
            beta: 1.0
        }
        .validate()
        .is_err());
    }

    #[test]
    fn all_missing_gives_zero_distance() {
        let metric = DistanceMetric::EuclideanMissingValue;
        let d = metric
            .evaluate_pair(&[MISSING_VALUE; 4], &[1.0, 2.0, 3.0, 4.0])
            .unwrap();
        assert_eq!(d, 0.0);
    }
}
