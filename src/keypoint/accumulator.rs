//! Mutable keypoint record grown across iterations.

use crate::descriptor::{accumulate_histogram, magnitude_orientation, DescriptorKind};
use crate::distance::MISSING_VALUE;
use crate::image::region::Point2;
use crate::keypoint::Keypoint;
use crate::scale::IterationBands;

/// Descriptor under construction for one keypoint.
#[derive(Clone, Debug)]
pub struct KeyAccumulator {
    position: Point2,
    first_iteration: usize,
    values: Vec<f32>,
    kind: DescriptorKind,
}

impl KeyAccumulator {
    /// Starts a record at `position` (region-local base coordinates).
    ///
    /// Pair slots for iterations without a contribution stay missing.
    pub fn new(position: Point2, first_iteration: usize, kind: DescriptorKind, iterations: usize) -> Self {
        let fill = match kind {
            DescriptorKind::MagnitudeOrientation { .. } => MISSING_VALUE,
            DescriptorKind::OrientationHistogram { .. } => 0.0,
        };
        Self {
            position,
            first_iteration,
            values: vec![fill; kind.descriptor_len(iterations)],
            kind,
        }
    }

    /// Region-local base position.
    pub fn position(&self) -> Point2 {
        self.position
    }

    /// Iteration at which the record was created.
    pub fn first_iteration(&self) -> usize {
        self.first_iteration
    }

    /// Descriptor values accumulated so far.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Adds the contribution of `bands` sampled at level pixel `(x, y)`.
    pub fn update(&mut self, bands: &IterationBands, x: usize, y: usize) {
        match self.kind {
            DescriptorKind::MagnitudeOrientation {
                orientation_step_deg,
            } => {
                let slot = 2 * bands.iteration;
                if slot + 1 < self.values.len() {
                    let pair = magnitude_orientation(bands, x, y, orientation_step_deg);
                    self.values[slot..slot + 2].copy_from_slice(&pair);
                }
            }
            DescriptorKind::OrientationHistogram { radius, .. } => {
                accumulate_histogram(bands, x, y, radius, &mut self.values);
            }
        }
    }

    /// Converts the record into an immutable keypoint shifted by `offset`.
    ///
    /// Histograms are L2-normalized; an all-zero histogram is kept as is.
    pub fn finalize(self, offset: Point2) -> Keypoint {
        let mut values = self.values;
        if let DescriptorKind::OrientationHistogram { .. } = self.kind {
            let norm = values
                .iter()
                .map(|&v| f64::from(v) * f64::from(v))
                .sum::<f64>()
                .sqrt();
            if norm > 0.0 {
                for v in &mut values {
                    *v = (f64::from(*v) / norm) as f32;
                }
            }
        }
        let position = Point2::new(self.position.x + offset.x, self.position.y + offset.y);
        Keypoint::new(position, values).with_first_iteration(self.first_iteration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_start_missing_and_finalize_with_offset() {
        let kind = DescriptorKind::default();
        let acc = KeyAccumulator::new(Point2::new(3.25, 4.0), 1, kind, 3);
        assert_eq!(acc.values().len(), 6);
        assert!(acc.values().iter().all(|v| v.is_nan()));
        let key = acc.finalize(Point2::new(100.0, 50.0));
        assert_eq!(key.position(), Point2::new(103.25, 54.0));
        assert_eq!(key.first_iteration(), 1);
    }

    #[test]
    fn histogram_is_normalized_on_finalize() {
        let kind = DescriptorKind::OrientationHistogram { bins: 4, radius: 2 };
        let mut acc = KeyAccumulator::new(Point2::new(0.0, 0.0), 0, kind, 2);
        acc.values[0] = 3.0;
        acc.values[2] = 4.0;
        let key = acc.finalize(Point2::new(0.0, 0.0));
        let d = key.descriptor();
        assert!((d[0] - 0.6).abs() < 1e-6);
        assert!((d[2] - 0.8).abs() < 1e-6);
        assert_eq!(d[1], 0.0);
    }

    #[test]
    fn empty_histogram_stays_zero() {
        let kind = DescriptorKind::OrientationHistogram { bins: 8, radius: 2 };
        let acc = KeyAccumulator::new(Point2::new(1.0, 1.0), 0, kind, 4);
        let key = acc.finalize(Point2::new(0.0, 0.0));
        assert!(key.descriptor().iter().all(|&v| v == 0.0));
    }
}
