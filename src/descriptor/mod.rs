//! Per-iteration descriptor contributions.
//!
//! Two layouts are supported. `MagnitudeOrientation` records one
//! `(magnitude, quantized orientation)` pair per iteration at the keypoint
//! pixel. `OrientationHistogram` accumulates a fixed-length orientation
//! histogram over a window around the keypoint, weighting each sample by its
//! gradient magnitude and by the shared Gaussian weight table.

use crate::candidate::local_region;
use crate::scale::{window_weight, IterationBands};
use crate::util::math::wrap_deg_360;
use crate::util::{TieMatchError, TieMatchResult};

/// Descriptor layout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DescriptorKind {
    /// One `(magnitude, orientation)` pair per iteration.
    MagnitudeOrientation {
        /// Orientation quantization step in degrees.
        orientation_step_deg: f32,
    },
    /// Gaussian-weighted orientation histogram accumulated over iterations.
    OrientationHistogram {
        /// Number of histogram bins over 360 degrees.
        bins: usize,
        /// Window radius in level pixels.
        radius: usize,
    },
}

impl Default for DescriptorKind {
    fn default() -> Self {
        DescriptorKind::MagnitudeOrientation {
            orientation_step_deg: 10.0,
        }
    }
}

impl DescriptorKind {
    /// Checks the configuration for usable values.
    pub fn validate(&self) -> TieMatchResult<()> {
        match *self {
            DescriptorKind::MagnitudeOrientation {
                orientation_step_deg,
            } => {
                if !orientation_step_deg.is_finite()
                    || orientation_step_deg < 0.0
                    || orientation_step_deg >= 360.0
                {
                    return Err(TieMatchError::InvalidConfig {
                        reason: "orientation_step_deg must be in [0, 360)",
                    });
                }
            }
            DescriptorKind::OrientationHistogram { bins, radius } => {
                if bins == 0 {
                    return Err(TieMatchError::InvalidConfig {
                        reason: "histogram bins must be >= 1",
                    });
                }
                if radius == 0 {
                    return Err(TieMatchError::InvalidConfig {
                        reason: "histogram radius must be >= 1",
                    });
                }
            }
        }
        Ok(())
    }

    /// Length of a finalized descriptor for `iterations` passes.
    pub fn descriptor_len(&self, iterations: usize) -> usize {
        match *self {
            DescriptorKind::MagnitudeOrientation { .. } => 2 * iterations,
            DescriptorKind::OrientationHistogram { bins, .. } => bins,
        }
    }
}

/// Rounds an orientation to the nearest multiple of `step_deg`, in `[0, 360)`.
///
/// A step of zero keeps full precision.
pub fn quantize_orientation(angle_deg: f32, step_deg: f32) -> f32 {
    if step_deg <= 0.0 {
        return wrap_deg_360(angle_deg);
    }
    wrap_deg_360((angle_deg / step_deg).round() * step_deg)
}

/// Magnitude and quantized orientation at a level pixel.
pub fn magnitude_orientation(bands: &IterationBands, x: usize, y: usize, step_deg: f32) -> [f32; 2] {
    let magnitude = bands.magnitude.at(x, y);
    let orientation = quantize_orientation(bands.orientation.at(x, y), step_deg);
    [magnitude, orientation]
}

/// Adds the weighted orientation histogram around `(x, y)` into `hist`.
pub fn accumulate_histogram(bands: &IterationBands, x: usize, y: usize, radius: usize, hist: &mut [f32]) {
    let bins = hist.len();
    if bins == 0 {
        return;
    }
    let bin_width = 360.0 / bins as f32;
    let (x0, y0, x1, y1) = local_region(bands.width(), bands.height(), x, y, radius);
    for yy in y0..=y1 {
        let wy = window_weight(yy as isize - y as isize, radius);
        for xx in x0..=x1 {
            let wx = window_weight(xx as isize - x as isize, radius);
            let magnitude = bands.magnitude.at(xx, yy);
            if magnitude == 0.0 {
                continue;
            }
            let bin = ((bands.orientation.at(xx, yy) / bin_width) as usize).min(bins - 1);
            hist[bin] += magnitude * wx * wy;
        }
    }
}
