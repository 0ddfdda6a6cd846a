//! Iterative keypoint extraction.

use crate::candidate::{detect_extrema, is_spatial_extremum, DetectorConfig, Neighborhood};
use crate::descriptor::DescriptorKind;
use crate::image::pyramid::{base_to_level_pixel, level_to_base};
use crate::image::region::{Point2, RasterRegion};
use crate::keypoint::map::{KeypointMap, PositionKey};
use crate::keypoint::{KeyAccumulator, PointSet};
use crate::refine::{neighborhood_3x3, refine_offset_2d};
use crate::scale::{IterationBands, ScaleSpaceBuilder, ScaleSpaceConfig};
use crate::trace::{trace_event, trace_span};
use crate::util::{TieMatchError, TieMatchResult};

/// Configuration for keypoint extraction.
#[derive(Clone, Debug, PartialEq)]
pub struct KeypointConfig {
    /// Number of scale-space iterations.
    pub iterations: usize,
    /// Scale-space construction.
    pub scale_space: ScaleSpaceConfig,
    /// Extremum detection.
    pub detector: DetectorConfig,
    /// Descriptor layout.
    pub descriptor: DescriptorKind,
    /// Refine detected positions to sub-pixel accuracy.
    pub subpixel: bool,
    /// Use rayon for the per-row kernels when the feature is enabled.
    pub parallel: bool,
}

impl Default for KeypointConfig {
    fn default() -> Self {
        Self {
            iterations: 6,
            scale_space: ScaleSpaceConfig::default(),
            detector: DetectorConfig::default(),
            descriptor: DescriptorKind::default(),
            subpixel: true,
            parallel: false,
        }
    }
}

impl KeypointConfig {
    /// Validates all nested configuration.
    pub fn validate(&self) -> TieMatchResult<()> {
        if self.iterations == 0 {
            return Err(TieMatchError::InvalidConfig {
                reason: "number of iterations must be >= 1",
            });
        }
        self.scale_space.validate()?;
        self.detector.validate()?;
        self.descriptor.validate()
    }
}

/// Extracts a keypoint set from one raster region.
///
/// Each call to [`KeypointSetFilter::update`] is an independent run over the
/// current input and produces one [`PointSet`].
#[derive(Clone)]
pub struct KeypointSetFilter<'a> {
    cfg: KeypointConfig,
    input: Option<RasterRegion<'a>>,
}

impl<'a> KeypointSetFilter<'a> {
    /// Creates a filter with no input.
    pub fn new(cfg: KeypointConfig) -> Self {
        Self { cfg, input: None }
    }

    /// Returns the configuration in use.
    pub fn config(&self) -> &KeypointConfig {
        &self.cfg
    }

    /// Sets the raster region to process.
    pub fn set_input(&mut self, region: RasterRegion<'a>) {
        self.input = Some(region);
    }

    /// Sets the number of scale-space iterations.
    pub fn set_number_of_iterations(&mut self, iterations: usize) {
        self.cfg.iterations = iterations;
    }

    /// Runs every iteration over the input and exports the surviving keypoints.
    pub fn update(&self) -> TieMatchResult<PointSet> {
        let region = self
            .input
            .ok_or(TieMatchError::MissingInput { input: "raster region" })?;
        extract_keypoints(region, &self.cfg)
    }
}

/// Runs keypoint extraction on `region` with `cfg`.
pub fn extract_keypoints(region: RasterRegion<'_>, cfg: &KeypointConfig) -> TieMatchResult<PointSet> {
    cfg.validate()?;
    let view = region.view();
    let _span = trace_span!(
        "keypoint_extraction",
        width = view.width(),
        height = view.height(),
        iterations = cfg.iterations
    )
    .entered();

    let builder = ScaleSpaceBuilder::new(
        view,
        cfg.iterations,
        &cfg.scale_space,
        cfg.detector.min_extent(),
    )?
    .with_adjacent_layers(cfg.detector.neighborhood == Neighborhood::ScaleSpace)
    .with_parallel(cfg.parallel);

    let mut map = KeypointMap::new();
    for iteration in 0..cfg.iterations {
        let _iteration_span = trace_span!("keypoint_iteration", iteration = iteration).entered();
        let bands = builder.setup(iteration)?;
        let added = detect_keys(&bands, cfg, &mut map);
        let before = map.len();
        map.retain(|key, _| check_key(&bands, &cfg.detector, key));
        let discarded = before - map.len();
        for (key, acc) in map.iter_mut() {
            update_key(&bands, key, acc);
        }
        trace_event!(
            "keys",
            octave = bands.octave,
            added = added,
            discarded = discarded,
            alive = map.len()
        );
    }

    let (ox, oy) = region.offset();
    let points = export_solution(map, Point2::new(ox as f64, oy as f64));
    trace_event!("keypoints_exported", count = points.len());
    Ok(points)
}

/// Detects this iteration's extrema and adds them to the map.
fn detect_keys(bands: &IterationBands, cfg: &KeypointConfig, map: &mut KeypointMap) -> usize {
    let mut added = 0;
    for extremum in detect_extrema(bands, &cfg.detector, cfg.parallel) {
        let (dx, dy) = if cfg.subpixel {
            let s = neighborhood_3x3(&bands.response, extremum.x, extremum.y);
            refine_offset_2d(s, extremum.kind)
        } else {
            (0.0, 0.0)
        };
        let position = Point2::new(
            level_to_base(extremum.x as f64 + f64::from(dx), bands.octave),
            level_to_base(extremum.y as f64 + f64::from(dy), bands.octave),
        );
        let (_, inserted) = map.add_key(position, bands.octave, || {
            KeyAccumulator::new(position, bands.iteration, cfg.descriptor, cfg.iterations)
        });
        if inserted {
            added += 1;
        }
    }
    added
}

/// Level pixel of `key` in `bands`, if it lies inside the detection interior.
fn level_pixel(bands: &IterationBands, border: usize, key: &PositionKey) -> Option<(usize, usize)> {
    let lx = base_to_level_pixel(key.x, bands.octave);
    let ly = base_to_level_pixel(key.y, bands.octave);
    let border = border as isize;
    if lx < border
        || ly < border
        || lx >= bands.width() as isize - border
        || ly >= bands.height() as isize - border
    {
        return None;
    }
    Some((lx as usize, ly as usize))
}

/// A key stays valid while it is a strict spatial extremum of the current
/// response at its nearest level pixel.
fn check_key(bands: &IterationBands, detector: &DetectorConfig, key: &PositionKey) -> bool {
    match level_pixel(bands, detector.border, key) {
        Some((x, y)) => is_spatial_extremum(&bands.response, x, y, detector.radius).is_some(),
        None => false,
    }
}

fn update_key(bands: &IterationBands, key: &PositionKey, acc: &mut KeyAccumulator) {
    let x = base_to_level_pixel(key.x, bands.octave).clamp(0, bands.width() as isize - 1);
    let y = base_to_level_pixel(key.y, bands.octave).clamp(0, bands.height() as isize - 1);
    acc.update(bands, x as usize, y as usize);
}

/// Finalizes every surviving entry in map order.
fn export_solution(map: KeypointMap, offset: Point2) -> PointSet {
    map.into_sorted()
        .map(|(_, acc)| acc.finalize(offset))
        .collect()
}
