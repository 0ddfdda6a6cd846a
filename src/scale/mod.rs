//! Scale-space construction for keypoint detection.
//!
//! Iteration `i` belongs to octave `i / scales_per_octave` and scale step
//! `s = i % scales_per_octave`. Each octave works on the next 2x2
//! box-downsampled pyramid level, and the smoothing sigma restarts at
//! `initial_sigma * 2^(s / scales_per_octave)` relative to that level.
//!
//! For the difference-of-Gaussians family the response is
//! `G(sigma * k) * I - G(sigma) * I` with `k = 2^(1 / scales_per_octave)`;
//! for the gradient family it is the gradient magnitude of `G(sigma) * I`.
//! Both families also expose the gradient magnitude and orientation of the
//! smoothed level for descriptor construction.

mod gaussian;

pub use gaussian::{
    blur_x, blur_y, gaussian_blur, weight_table, GaussianKernel, WEIGHT_TABLE_LEN,
};
pub(crate) use gaussian::window_weight;

use crate::image::pyramid::ImagePyramid;
use crate::image::{ImageView, OwnedImage};
use crate::kernel::map_rows;
use crate::util::math::{hypot, orientation_deg};
use crate::util::{TieMatchError, TieMatchResult};

/// Upper bound on pyramid depth.
const MAX_OCTAVES: usize = 16;

/// Response image used for extremum detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseFamily {
    /// Difference of two Gaussian-smoothed images.
    DifferenceOfGaussians,
    /// Gradient magnitude of the smoothed image.
    GradientMagnitude,
}

/// Configuration of the scale-space pyramid.
#[derive(Clone, Debug, PartialEq)]
pub struct ScaleSpaceConfig {
    /// Response family used for detection.
    pub family: ResponseFamily,
    /// Sigma of the first scale step in every octave.
    pub initial_sigma: f32,
    /// Iterations per octave before the working image is halved.
    pub scales_per_octave: usize,
}

impl Default for ScaleSpaceConfig {
    fn default() -> Self {
        Self {
            family: ResponseFamily::DifferenceOfGaussians,
            initial_sigma: 1.6,
            scales_per_octave: 3,
        }
    }
}

impl ScaleSpaceConfig {
    /// Checks the configuration for usable values.
    pub fn validate(&self) -> TieMatchResult<()> {
        if !self.initial_sigma.is_finite() || self.initial_sigma <= 0.0 {
            return Err(TieMatchError::InvalidConfig {
                reason: "initial_sigma must be finite and > 0",
            });
        }
        if self.scales_per_octave == 0 {
            return Err(TieMatchError::InvalidConfig {
                reason: "scales_per_octave must be >= 1",
            });
        }
        Ok(())
    }

    /// Octave (pyramid level) used by an iteration.
    pub fn octave_of(&self, iteration: usize) -> usize {
        iteration / self.scales_per_octave
    }

    /// Number of octaves touched by `iterations` passes.
    pub fn num_octaves(&self, iterations: usize) -> usize {
        if iterations == 0 {
            0
        } else {
            self.octave_of(iterations - 1) + 1
        }
    }

    /// Sigma for scale step `step` (may be negative or beyond the octave).
    fn sigma_at_step(&self, step: i32) -> f32 {
        let k = 2.0f32.powf(1.0 / self.scales_per_octave as f32);
        self.initial_sigma * k.powi(step)
    }

    /// Level-relative smoothing sigma of an iteration.
    pub fn sigma_of(&self, iteration: usize) -> f32 {
        self.sigma_at_step((iteration % self.scales_per_octave) as i32)
    }
}

/// Derived images for one iteration, all sized like the octave level.
pub struct IterationBands {
    /// Iteration index.
    pub iteration: usize,
    /// Pyramid level the bands were computed on.
    pub octave: usize,
    /// Level-relative smoothing sigma.
    pub sigma: f32,
    /// `G(sigma) * I`.
    pub smoothed: OwnedImage,
    /// Detection response at this scale.
    pub response: OwnedImage,
    /// Response one scale step below (only when adjacent layers are requested).
    pub response_below: Option<OwnedImage>,
    /// Response one scale step above (only when adjacent layers are requested).
    pub response_above: Option<OwnedImage>,
    /// Gradient magnitude of `smoothed`.
    pub magnitude: OwnedImage,
    /// Gradient orientation of `smoothed`, degrees in `[0, 360)`.
    pub orientation: OwnedImage,
}

impl IterationBands {
    /// Level width.
    pub fn width(&self) -> usize {
        self.response.width()
    }

    /// Level height.
    pub fn height(&self) -> usize {
        self.response.height()
    }
}

/// Builds per-iteration bands over an octave pyramid.
pub struct ScaleSpaceBuilder {
    cfg: ScaleSpaceConfig,
    pyramid: ImagePyramid,
    iterations: usize,
    adjacent_layers: bool,
    parallel: bool,
}

impl ScaleSpaceBuilder {
    /// Prepares the octave pyramid for `iterations` passes.
    ///
    /// Every octave level must be at least `min_extent` pixels on each side,
    /// otherwise `RegionTooSmall` is returned.
    pub fn new(
        base: ImageView<'_, f32>,
        iterations: usize,
        cfg: &ScaleSpaceConfig,
        min_extent: usize,
    ) -> TieMatchResult<Self> {
        cfg.validate()?;
        if iterations == 0 {
            return Err(TieMatchError::InvalidConfig {
                reason: "number of iterations must be >= 1",
            });
        }

        let octaves = cfg.num_octaves(iterations);
        let min_extent = min_extent.max(3);
        if octaves > MAX_OCTAVES {
            return Err(TieMatchError::InvalidConfig {
                reason: "too many octaves for the requested iterations",
            });
        }
        let min_size = min_extent << (octaves - 1);
        let width = base.width();
        let height = base.height();
        if (width >> (octaves - 1)) < min_extent || (height >> (octaves - 1)) < min_extent {
            return Err(TieMatchError::RegionTooSmall {
                width,
                height,
                min_size,
            });
        }

        let pyramid = ImagePyramid::build(base, octaves)?;
        Ok(Self {
            cfg: cfg.clone(),
            pyramid,
            iterations,
            adjacent_layers: false,
            parallel: false,
        })
    }

    /// Also computes the responses one scale step below and above.
    pub fn with_adjacent_layers(mut self, enabled: bool) -> Self {
        self.adjacent_layers = enabled;
        self
    }

    /// Runs the per-row kernels in parallel when the `rayon` feature is enabled.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Number of iterations prepared.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Returns the configuration in use.
    pub fn config(&self) -> &ScaleSpaceConfig {
        &self.cfg
    }

    /// Computes the bands for iteration `iteration`.
    pub fn setup(&self, iteration: usize) -> TieMatchResult<IterationBands> {
        if iteration >= self.iterations {
            return Err(TieMatchError::InvalidConfig {
                reason: "iteration index beyond prepared iterations",
            });
        }
        let octave = self.cfg.octave_of(iteration);
        let level = self
            .pyramid
            .level(octave)
            .ok_or(TieMatchError::RegionTooSmall {
                width: self.pyramid.levels()[0].width(),
                height: self.pyramid.levels()[0].height(),
                min_size: 3 << octave,
            })?;
        let step = (iteration % self.cfg.scales_per_octave) as i32;
        let sigma = self.cfg.sigma_at_step(step);

        let smoothed = gaussian_blur(level, sigma, self.parallel)?;
        let (magnitude, orientation) = gradient_bands(&smoothed, self.parallel)?;

        let response = self.response_at(level, step, &smoothed, &magnitude)?;
        let (response_below, response_above) = if self.adjacent_layers {
            let below_smoothed = gaussian_blur(level, self.cfg.sigma_at_step(step - 1), self.parallel)?;
            let above_smoothed = gaussian_blur(level, self.cfg.sigma_at_step(step + 1), self.parallel)?;
            let below = self.adjacent_response(level, step - 1, &below_smoothed)?;
            let above = self.adjacent_response(level, step + 1, &above_smoothed)?;
            (Some(below), Some(above))
        } else {
            (None, None)
        };

        Ok(IterationBands {
            iteration,
            octave,
            sigma,
            smoothed,
            response,
            response_below,
            response_above,
            magnitude,
            orientation,
        })
    }

    fn response_at(
        &self,
        level: &OwnedImage,
        step: i32,
        smoothed: &OwnedImage,
        magnitude: &OwnedImage,
    ) -> TieMatchResult<OwnedImage> {
        match self.cfg.family {
            ResponseFamily::DifferenceOfGaussians => {
                let wider = gaussian_blur(level, self.cfg.sigma_at_step(step + 1), self.parallel)?;
                difference(&wider, smoothed)
            }
            ResponseFamily::GradientMagnitude => Ok(magnitude.clone()),
        }
    }

    fn adjacent_response(
        &self,
        level: &OwnedImage,
        step: i32,
        smoothed: &OwnedImage,
    ) -> TieMatchResult<OwnedImage> {
        match self.cfg.family {
            ResponseFamily::DifferenceOfGaussians => {
                let wider = gaussian_blur(level, self.cfg.sigma_at_step(step + 1), self.parallel)?;
                difference(&wider, smoothed)
            }
            ResponseFamily::GradientMagnitude => Ok(gradient_bands(smoothed, self.parallel)?.0),
        }
    }
}

/// Pixel-wise `a - b`.
fn difference(a: &OwnedImage, b: &OwnedImage) -> TieMatchResult<OwnedImage> {
    if a.width() != b.width() || a.height() != b.height() {
        return Err(TieMatchError::InvalidDimensions {
            width: b.width(),
            height: b.height(),
        });
    }
    let data = a
        .data()
        .iter()
        .zip(b.data())
        .map(|(x, y)| x - y)
        .collect();
    OwnedImage::new(data, a.width(), a.height())
}

/// Central-difference gradient magnitude and orientation (degrees).
pub fn gradient_bands(
    src: &OwnedImage,
    parallel: bool,
) -> TieMatchResult<(OwnedImage, OwnedImage)> {
    let width = src.width();
    let height = src.height();
    let gradient = |x: usize, y: usize| {
        let (xi, yi) = (x as isize, y as isize);
        let dx = 0.5 * (src.at_clamped(xi + 1, yi) - src.at_clamped(xi - 1, yi));
        let dy = 0.5 * (src.at_clamped(xi, yi + 1) - src.at_clamped(xi, yi - 1));
        (dx, dy)
    };
    let magnitude = map_rows(width, height, parallel, |y, row| {
        for (x, out) in row.iter_mut().enumerate() {
            let (dx, dy) = gradient(x, y);
            *out = hypot(dx, dy);
        }
    })?;
    let orientation = map_rows(width, height, parallel, |y, row| {
        for (x, out) in row.iter_mut().enumerate() {
            let (dx, dy) = gradient(x, y);
            *out = orientation_deg(dy, dx);
        }
    })?;
    Ok((magnitude, orientation))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(width: usize, height: usize, cx: f32, cy: f32, sigma: f32) -> OwnedImage {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                data.push(255.0 * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp());
            }
        }
        OwnedImage::new(data, width, height).unwrap()
    }

    #[test]
    fn iteration_schedule_halves_per_octave() {
        let cfg = ScaleSpaceConfig::default();
        assert_eq!(cfg.octave_of(0), 0);
        assert_eq!(cfg.octave_of(2), 0);
        assert_eq!(cfg.octave_of(3), 1);
        assert_eq!(cfg.num_octaves(6), 2);
        assert!((cfg.sigma_of(0) - 1.6).abs() < 1e-6);
        assert!((cfg.sigma_of(3) - 1.6).abs() < 1e-6);
        assert!(cfg.sigma_of(1) > cfg.sigma_of(0));
    }

    #[test]
    fn rejects_regions_smaller_than_neighborhood() {
        let img = OwnedImage::filled(5, 5, 0.0).unwrap();
        let cfg = ScaleSpaceConfig::default();
        let err = ScaleSpaceBuilder::new(img.view(), 6, &cfg, 3).err().unwrap();
        assert_eq!(
            err,
            TieMatchError::RegionTooSmall {
                width: 5,
                height: 5,
                min_size: 6,
            }
        );
        let tiny = OwnedImage::filled(2, 40, 0.0).unwrap();
        assert!(matches!(
            ScaleSpaceBuilder::new(tiny.view(), 1, &cfg, 3),
            Err(TieMatchError::RegionTooSmall { .. })
        ));
    }

    #[test]
    fn later_octaves_use_halved_levels() {
        let img = OwnedImage::filled(32, 20, 1.0).unwrap();
        let builder = ScaleSpaceBuilder::new(img.view(), 4, &ScaleSpaceConfig::default(), 3).unwrap();
        let bands0 = builder.setup(0).unwrap();
        let bands3 = builder.setup(3).unwrap();
        assert_eq!((bands0.width(), bands0.height()), (32, 20));
        assert_eq!((bands3.width(), bands3.height()), (16, 10));
        assert_eq!(bands3.octave, 1);
        assert!(builder.setup(4).is_err());
    }

    #[test]
    fn dog_response_is_negative_at_blob_center() {
        let img = blob(41, 41, 20.0, 20.0, 2.0);
        let builder = ScaleSpaceBuilder::new(img.view(), 1, &ScaleSpaceConfig::default(), 3)
            .unwrap()
            .with_adjacent_layers(true);
        let bands = builder.setup(0).unwrap();
        let center = bands.response.at(20, 20);
        assert!(center < -10.0);
        assert!(bands.response.at(19, 20) > center);
        assert!(bands.response_below.is_some());
        assert!(bands.response_above.is_some());
    }

    #[test]
    fn gradient_orientation_follows_ramp() {
        let data: Vec<f32> = (0..10 * 10).map(|i| (i / 10) as f32 * 3.0).collect();
        let ramp = OwnedImage::new(data, 10, 10).unwrap();
        let (magnitude, orientation) = gradient_bands(&ramp, false).unwrap();
        assert!((magnitude.at(5, 5) - 3.0).abs() < 1e-5);
        assert!((orientation.at(5, 5) - 90.0).abs() < 1e-4);
    }

    #[test]
    fn flat_region_has_zero_response() {
        let img = OwnedImage::filled(24, 24, 7.0).unwrap();
        let cfg = ScaleSpaceConfig {
            family: ResponseFamily::GradientMagnitude,
            ..ScaleSpaceConfig::default()
        };
        let bands = ScaleSpaceBuilder::new(img.view(), 1, &cfg, 3)
            .unwrap()
            .setup(0)
            .unwrap();
        assert!(bands.response.data().iter().all(|v| v.abs() < 1e-4));
    }
}
