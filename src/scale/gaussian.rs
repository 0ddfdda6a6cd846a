//! Separable Gaussian filtering and the shared orientation weight table.

use crate::image::OwnedImage;
use crate::kernel::map_rows;
use crate::util::{TieMatchError, TieMatchResult};
use std::sync::OnceLock;

/// Number of entries in the Gaussian weight table.
pub const WEIGHT_TABLE_LEN: usize = 73;

/// Index of the zero-offset entry.
const WEIGHT_TABLE_CENTER: usize = (WEIGHT_TABLE_LEN - 1) / 2;

/// Standard deviation of the table, in table steps.
const WEIGHT_TABLE_SIGMA: f32 = 12.0;

/// Kernel half-width in multiples of sigma.
const KERNEL_TRUNCATE: f32 = 4.0;

static WEIGHT_TABLE: OnceLock<[f32; WEIGHT_TABLE_LEN]> = OnceLock::new();

/// Returns the process-wide Gaussian weight table.
///
/// Entry `k` is `exp(-(k - 36)^2 / (2 * 12^2))`, so the table spans three
/// standard deviations on either side of the center. It is computed once and
/// never mutated.
pub fn weight_table() -> &'static [f32; WEIGHT_TABLE_LEN] {
    WEIGHT_TABLE.get_or_init(|| {
        let mut table = [0.0f32; WEIGHT_TABLE_LEN];
        let denom = 2.0 * WEIGHT_TABLE_SIGMA * WEIGHT_TABLE_SIGMA;
        for (k, weight) in table.iter_mut().enumerate() {
            let offset = k as f32 - WEIGHT_TABLE_CENTER as f32;
            *weight = (-(offset * offset) / denom).exp();
        }
        table
    })
}

/// Weight for a pixel `offset` away from the window center, with the window
/// radius stretched over the full table.
pub(crate) fn window_weight(offset: isize, radius: usize) -> f32 {
    let radius = radius.max(1) as f32;
    let scaled = (offset as f32 * WEIGHT_TABLE_CENTER as f32 / radius).round() as isize;
    let idx = WEIGHT_TABLE_CENTER as isize + scaled;
    if idx < 0 || idx >= WEIGHT_TABLE_LEN as isize {
        return 0.0;
    }
    weight_table()[idx as usize]
}

/// Normalized, truncated 1D Gaussian kernel.
#[derive(Clone, Debug)]
pub struct GaussianKernel {
    taps: Vec<f32>,
    radius: usize,
}

impl GaussianKernel {
    /// Builds a kernel with half-width `ceil(4 * sigma)`.
    pub fn new(sigma: f32) -> TieMatchResult<Self> {
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(TieMatchError::InvalidConfig {
                reason: "gaussian sigma must be finite and > 0",
            });
        }
        let radius = (KERNEL_TRUNCATE * sigma).ceil().max(1.0) as usize;
        let denom = 2.0 * sigma * sigma;
        let mut taps: Vec<f32> = (0..=2 * radius)
            .map(|i| {
                let x = i as f32 - radius as f32;
                (-(x * x) / denom).exp()
            })
            .collect();
        let sum: f32 = taps.iter().sum();
        for tap in &mut taps {
            *tap /= sum;
        }
        Ok(Self { taps, radius })
    }

    /// Kernel half-width in pixels.
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Kernel coefficients, centered at `radius`.
    pub fn taps(&self) -> &[f32] {
        &self.taps
    }
}

/// Convolves along x with edge replication.
pub fn blur_x(
    src: &OwnedImage,
    kernel: &GaussianKernel,
    parallel: bool,
) -> TieMatchResult<OwnedImage> {
    let radius = kernel.radius as isize;
    map_rows(src.width(), src.height(), parallel, |y, row| {
        for (x, out) in row.iter_mut().enumerate() {
            let mut acc = 0.0f32;
            for (k, &tap) in kernel.taps.iter().enumerate() {
                let sx = x as isize + k as isize - radius;
                acc += tap * src.at_clamped(sx, y as isize);
            }
            *out = acc;
        }
    })
}

/// Convolves along y with edge replication.
pub fn blur_y(
    src: &OwnedImage,
    kernel: &GaussianKernel,
    parallel: bool,
) -> TieMatchResult<OwnedImage> {
    let radius = kernel.radius as isize;
    map_rows(src.width(), src.height(), parallel, |y, row| {
        for (x, out) in row.iter_mut().enumerate() {
            let mut acc = 0.0f32;
            for (k, &tap) in kernel.taps.iter().enumerate() {
                let sy = y as isize + k as isize - radius;
                acc += tap * src.at_clamped(x as isize, sy);
            }
            *out = acc;
        }
    })
}

/// Smooths with a separable Gaussian: x pass, then y pass.
pub fn gaussian_blur(src: &OwnedImage, sigma: f32, parallel: bool) -> TieMatchResult<OwnedImage> {
    let kernel = GaussianKernel::new(sigma)?;
    let tmp = blur_x(src, &kernel, parallel)?;
    blur_y(&tmp, &kernel, parallel)
}
