//! Strict local extremum detection.
//!
//! A pixel qualifies only when it is strictly greater than every neighbor or
//! strictly smaller than every neighbor. Any tie disqualifies it, so flat
//! regions never produce candidates.

use crate::image::OwnedImage;
use crate::kernel::collect_rows;
use crate::scale::IterationBands;
use crate::util::{TieMatchError, TieMatchResult};

/// Neighborhood compared against the center pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Neighborhood {
    /// Square window in the current response image.
    Spatial,
    /// Square window in the current response plus the same window one scale
    /// step below and above.
    ScaleSpace,
}

/// Configuration for the local extremum detector.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorConfig {
    /// Neighborhood shape.
    pub neighborhood: Neighborhood,
    /// Window radius; 1 gives a 3x3 window.
    pub radius: usize,
    /// Minimum absolute response for a candidate.
    pub contrast_threshold: f32,
    /// Pixels excluded along every level border.
    pub border: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            neighborhood: Neighborhood::Spatial,
            radius: 1,
            contrast_threshold: 2.0,
            border: 1,
        }
    }
}

impl DetectorConfig {
    /// Checks the configuration for usable values.
    pub fn validate(&self) -> TieMatchResult<()> {
        if self.radius == 0 {
            return Err(TieMatchError::InvalidConfig {
                reason: "detector radius must be >= 1",
            });
        }
        if !self.contrast_threshold.is_finite() || self.contrast_threshold < 0.0 {
            return Err(TieMatchError::InvalidConfig {
                reason: "contrast_threshold must be finite and >= 0",
            });
        }
        Ok(())
    }

    /// Smallest level extent that leaves at least one scannable pixel.
    pub fn min_extent(&self) -> usize {
        (2 * self.border.max(self.radius) + 1).max(3)
    }
}

/// Polarity of an extremum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtremumKind {
    Maximum,
    Minimum,
}

/// Detected extremum in level pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extremum {
    pub x: usize,
    pub y: usize,
    pub value: f32,
    pub kind: ExtremumKind,
}

/// Inclusive window `(x0, y0, x1, y1)` of `radius` around `(x, y)`, clipped
/// to a `width x height` image.
pub fn local_region(
    width: usize,
    height: usize,
    x: usize,
    y: usize,
    radius: usize,
) -> (usize, usize, usize, usize) {
    let max_x = width.saturating_sub(1);
    let max_y = height.saturating_sub(1);
    (
        x.saturating_sub(radius).min(max_x),
        y.saturating_sub(radius).min(max_y),
        x.saturating_add(radius).min(max_x),
        y.saturating_add(radius).min(max_y),
    )
}

/// Classifies `center` against its neighbors using strict inequalities.
///
/// Returns `None` on any tie, any NaN, or an empty neighborhood.
pub fn classify_extremum<I>(center: f32, neighbors: I) -> Option<ExtremumKind>
where
    I: IntoIterator<Item = f32>,
{
    if center.is_nan() {
        return None;
    }
    let mut any = false;
    let mut all_lower = true;
    let mut all_higher = true;
    for value in neighbors {
        if value.is_nan() {
            return None;
        }
        any = true;
        if value >= center {
            all_lower = false;
        }
        if value <= center {
            all_higher = false;
        }
        if !all_lower && !all_higher {
            return None;
        }
    }
    match (any, all_lower, all_higher) {
        (true, true, _) => Some(ExtremumKind::Maximum),
        (true, _, true) => Some(ExtremumKind::Minimum),
        _ => None,
    }
}

fn window_values(
    img: &OwnedImage,
    x: usize,
    y: usize,
    radius: usize,
    skip_center: bool,
) -> impl Iterator<Item = f32> + '_ {
    let (x0, y0, x1, y1) = local_region(img.width(), img.height(), x, y, radius);
    (y0..=y1).flat_map(move |yy| {
        (x0..=x1).filter_map(move |xx| {
            if skip_center && xx == x && yy == y {
                None
            } else {
                Some(img.at(xx, yy))
            }
        })
    })
}

/// Tests whether `(x, y)` is a strict extremum of `img` within `radius`.
pub fn is_spatial_extremum(
    img: &OwnedImage,
    x: usize,
    y: usize,
    radius: usize,
) -> Option<ExtremumKind> {
    if x >= img.width() || y >= img.height() {
        return None;
    }
    classify_extremum(img.at(x, y), window_values(img, x, y, radius, true))
}

fn scale_space_extremum(
    bands: &IterationBands,
    x: usize,
    y: usize,
    radius: usize,
) -> Option<ExtremumKind> {
    let (below, above) = match (&bands.response_below, &bands.response_above) {
        (Some(below), Some(above)) => (below, above),
        _ => return is_spatial_extremum(&bands.response, x, y, radius),
    };
    let neighbors = window_values(&bands.response, x, y, radius, true)
        .chain(window_values(below, x, y, radius, false))
        .chain(window_values(above, x, y, radius, false));
    classify_extremum(bands.response.at(x, y), neighbors)
}

/// Scans the interior of an iteration's response for strict extrema.
///
/// Candidates are returned in row-major order regardless of `parallel`.
pub fn detect_extrema(bands: &IterationBands, cfg: &DetectorConfig, parallel: bool) -> Vec<Extremum> {
    let width = bands.width();
    let height = bands.height();
    let border = cfg.border;
    if width <= 2 * border || height <= 2 * border {
        return Vec::new();
    }

    collect_rows(border..height - border, parallel, |y| {
        let mut row = Vec::new();
        for x in border..width - border {
            let value = bands.response.at(x, y);
            if value.is_nan() || value.abs() <= cfg.contrast_threshold {
                continue;
            }
            let kind = match cfg.neighborhood {
                Neighborhood::Spatial => is_spatial_extremum(&bands.response, x, y, cfg.radius),
                Neighborhood::ScaleSpace => scale_space_extremum(bands, x, y, cfg.radius),
            };
            if let Some(kind) = kind {
                row.push(Extremum { x, y, value, kind });
            }
        }
        row
    })
}
