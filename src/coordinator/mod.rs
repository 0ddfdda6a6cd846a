//! Homologous point search over an image pair.
//!
//! Image 1 is sampled with a grid of bins (or taken whole in
//! [`SearchMode::Full`]). Each bin is reprojected into image 2 through the
//! injected [`PointTransform`] to find a padded search window; keypoints are
//! extracted from both crops and matched, and every landmark whose predicted
//! position misses its image-2 match by `2 * precision` pixels or more is
//! discarded.
//!
//! Bins are independent and may run in parallel; reports always come back in
//! grid order. A bin that is too small or whose reprojection fails is skipped
//! and recorded in its report instead of aborting the run.

mod bins;
mod output;
mod transform;

pub use bins::{
    bin_grid, corner_bounding_box, reproject_pixel, search_window, BinGridConfig, WindowContext,
};
pub use output::{write_tie_point_file, write_tie_points, TiePoint};
pub use transform::{AffineTransform, IdentityTransform, PointTransform};

use crate::image::region::{ImageGeometry, PixelRegion, Point2, RasterRegion, RasterSource};
use crate::kernel::collect_rows;
use crate::keypoint::{extract_keypoints, KeypointConfig};
use crate::matching::{match_sets, Landmark, MatchingConfig};
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{TieMatchError, TieMatchResult};

/// How image 1 is partitioned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchMode {
    /// Whole image 1 against whole image 2.
    Full,
    /// Sparse bins reprojected into image 2.
    GeoBins(BinGridConfig),
}

impl Default for SearchMode {
    fn default() -> Self {
        SearchMode::GeoBins(BinGridConfig::default())
    }
}

/// Configuration for homologous point search.
#[derive(Clone, Debug, PartialEq)]
pub struct HomologousConfig {
    /// Partitioning of image 1.
    pub mode: SearchMode,
    /// Expected registration accuracy in image-2 pixels.
    ///
    /// Search windows are padded by `2 * precision` and landmarks are kept
    /// only when their reprojection error is below `2 * precision`.
    pub precision: f64,
    /// Apply the reprojection error check.
    pub geometric_filter: bool,
    /// Extraction settings shared by both crops.
    pub keypoints: KeypointConfig,
    /// Matching settings for each bin pair.
    pub matching: MatchingConfig,
    /// Process bins in parallel when the `rayon` feature is enabled.
    pub parallel: bool,
}

impl Default for HomologousConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::default(),
            precision: 30.0,
            geometric_filter: true,
            keypoints: KeypointConfig::default(),
            matching: MatchingConfig::default(),
            parallel: false,
        }
    }
}

impl HomologousConfig {
    /// Validates all nested configuration.
    pub fn validate(&self) -> TieMatchResult<()> {
        if !self.precision.is_finite() || self.precision <= 0.0 {
            return Err(TieMatchError::InvalidConfig {
                reason: "precision must be finite and > 0",
            });
        }
        if let SearchMode::GeoBins(grid) = &self.mode {
            grid.validate()?;
        }
        self.keypoints.validate()?;
        self.matching.validate()
    }

    /// Search window padding in pixels.
    pub fn padding(&self) -> usize {
        (2.0 * self.precision).ceil() as usize
    }
}

/// Why a bin produced no matches.
#[derive(Clone, Debug, PartialEq)]
pub enum BinSkip {
    /// The reprojected window does not overlap image 2.
    EmptyWindow,
    /// A recoverable stage failure.
    Failed(TieMatchError),
}

/// Outcome of one bin.
#[derive(Clone, Debug, PartialEq)]
pub struct BinReport {
    /// Image-1 bin.
    pub bin: PixelRegion,
    /// Image-2 search window, when one was computed.
    pub window: Option<PixelRegion>,
    /// Keypoints found in the image-1 crop.
    pub keypoints1: usize,
    /// Keypoints found in the image-2 window.
    pub keypoints2: usize,
    /// Landmarks returned by matching.
    pub landmarks: usize,
    /// Landmarks that passed the geometric check.
    pub tie_points: Vec<TiePoint>,
    /// Landmarks rejected by the geometric check or a failed transform.
    pub discarded: usize,
    /// Set when the bin was not matched.
    pub skipped: Option<BinSkip>,
}

impl BinReport {
    fn new(bin: PixelRegion) -> Self {
        Self {
            bin,
            window: None,
            keypoints1: 0,
            keypoints2: 0,
            landmarks: 0,
            tie_points: Vec::new(),
            discarded: 0,
            skipped: None,
        }
    }
}

/// Outcome of a full run, bins in grid order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HomologousReport {
    /// One report per bin.
    pub bins: Vec<BinReport>,
}

impl HomologousReport {
    /// Accepted tie points in bin order.
    pub fn tie_points(&self) -> Vec<TiePoint> {
        self.bins
            .iter()
            .flat_map(|b| b.tie_points.iter().copied())
            .collect()
    }

    /// Landmarks rejected by the geometric check.
    pub fn discarded(&self) -> usize {
        self.bins.iter().map(|b| b.discarded).sum()
    }

    /// Bins that were skipped.
    pub fn skipped(&self) -> usize {
        self.bins.iter().filter(|b| b.skipped.is_some()).count()
    }
}

/// Reprojection check applied to landmarks.
#[derive(Clone, Copy)]
pub struct GeometricFilter<'a> {
    /// Geometry of image 1.
    pub geometry1: ImageGeometry,
    /// Geometry of image 2.
    pub geometry2: ImageGeometry,
    /// Image-1 world to image-2 world mapping.
    pub transform: &'a dyn PointTransform,
    /// Optional frame for the written image-2 coordinates.
    pub output_transform: Option<&'a dyn PointTransform>,
    /// Landmarks need an error below `2 * precision` pixels.
    pub precision: f64,
    /// When false every landmark is kept without an error.
    pub enabled: bool,
}

impl GeometricFilter<'_> {
    /// True when `error` is strictly below `2 * precision`.
    pub fn accepts(&self, error: f64) -> bool {
        error < 2.0 * self.precision
    }

    /// Splits landmarks into tie points and a discard count.
    ///
    /// A landmark whose reprojection or output transform fails is logged and
    /// counted as discarded.
    pub fn apply(&self, landmarks: &[Landmark]) -> (Vec<TiePoint>, usize) {
        let mut accepted = Vec::with_capacity(landmarks.len());
        let mut discarded = 0;
        for landmark in landmarks {
            match self.tie_point(landmark) {
                Some(tp) => accepted.push(tp),
                None => discarded += 1,
            }
        }
        (accepted, discarded)
    }

    fn tie_point(&self, landmark: &Landmark) -> Option<TiePoint> {
        let error = if self.enabled {
            let predicted =
                reproject_pixel(landmark.point1, &self.geometry1, &self.geometry2, self.transform);
            let error = transform_or_warn(predicted, landmark)?.distance(&landmark.point2);
            if !self.accepts(error) {
                return None;
            }
            Some(error)
        } else {
            None
        };
        let world2 = self.geometry2.pixel_to_world(landmark.point2);
        let point2 = match self.output_transform {
            Some(t) => transform_or_warn(t.transform_point(world2), landmark)?,
            None => world2,
        };
        Some(TiePoint {
            point1: self.geometry1.pixel_to_world(landmark.point1),
            point2,
            pixel1: landmark.point1,
            pixel2: landmark.point2,
            error,
            distance: landmark.distance,
        })
    }
}

fn transform_or_warn(result: TieMatchResult<Point2>, landmark: &Landmark) -> Option<Point2> {
    match result {
        Ok(p) => Some(p),
        Err(err) => {
            trace_warn!(
                "landmark_transform_failed",
                index1 = landmark.index1,
                index2 = landmark.index2,
                reason = err.to_string().as_str()
            );
            None
        }
    }
}

/// Drives bin-wise extraction, matching and filtering over an image pair.
pub struct HomologousPointExtractor<'a> {
    image1: &'a dyn RasterSource,
    image2: &'a dyn RasterSource,
    transform: &'a dyn PointTransform,
    output_transform: Option<&'a dyn PointTransform>,
    cfg: HomologousConfig,
}

impl<'a> HomologousPointExtractor<'a> {
    /// `transform` maps image-1 world coordinates to image-2 world coordinates.
    pub fn new(
        image1: &'a dyn RasterSource,
        image2: &'a dyn RasterSource,
        transform: &'a dyn PointTransform,
        cfg: HomologousConfig,
    ) -> TieMatchResult<Self> {
        cfg.validate()?;
        Ok(Self {
            image1,
            image2,
            transform,
            output_transform: None,
            cfg,
        })
    }

    /// Writes image-2 coordinates in the frame of `transform`.
    pub fn with_output_transform(mut self, transform: &'a dyn PointTransform) -> Self {
        self.output_transform = Some(transform);
        self
    }

    pub fn config(&self) -> &HomologousConfig {
        &self.cfg
    }

    /// Image-1 bins in processing order.
    pub fn bins(&self) -> Vec<PixelRegion> {
        match &self.cfg.mode {
            SearchMode::Full => vec![self.image1.extent()],
            SearchMode::GeoBins(grid) => bin_grid(self.image1.width(), self.image1.height(), grid),
        }
    }

    /// Image-2 search window of `bin`.
    pub fn window_for(&self, bin: &PixelRegion) -> TieMatchResult<Option<PixelRegion>> {
        match &self.cfg.mode {
            SearchMode::Full => Ok(Some(self.image2.extent())),
            SearchMode::GeoBins(grid) => {
                let ctx = WindowContext {
                    geometry1: self.image1.geometry(),
                    geometry2: self.image2.geometry(),
                    transform: self.transform,
                    extent2: self.image2.extent(),
                    padding: self.cfg.padding(),
                    margin: grid.margin,
                };
                search_window(bin, &ctx)
            }
        }
    }

    /// The landmark check used for every bin.
    pub fn geometric_filter(&self) -> GeometricFilter<'a> {
        GeometricFilter {
            geometry1: self.image1.geometry(),
            geometry2: self.image2.geometry(),
            transform: self.transform,
            output_transform: self.output_transform,
            precision: self.cfg.precision,
            enabled: self.cfg.geometric_filter,
        }
    }

    /// Processes a single bin.
    ///
    /// `RegionTooSmall` and `TransformFailure` mark the bin as skipped; other
    /// errors are returned.
    pub fn match_bin(&self, bin: &PixelRegion) -> TieMatchResult<BinReport> {
        let _span = trace_span!("homologous_bin", x = bin.x, y = bin.y).entered();
        let mut report = BinReport::new(*bin);
        match self.process_bin(bin, &mut report) {
            Ok(()) => {}
            Err(
                err @ (TieMatchError::RegionTooSmall { .. } | TieMatchError::TransformFailure { .. }),
            ) => {
                trace_warn!(
                    "bin_skipped",
                    x = bin.x,
                    y = bin.y,
                    reason = err.to_string().as_str()
                );
                report.skipped = Some(BinSkip::Failed(err));
            }
            Err(err) => return Err(err),
        }
        Ok(report)
    }

    fn process_bin(&self, bin: &PixelRegion, report: &mut BinReport) -> TieMatchResult<()> {
        let window = match self.window_for(bin)? {
            Some(window) => window,
            None => {
                trace_warn!("bin_skipped", x = bin.x, y = bin.y, reason = "empty search window");
                report.skipped = Some(BinSkip::EmptyWindow);
                return Ok(());
            }
        };
        report.window = Some(window);

        let crop1 = self.image1.read_region(bin)?;
        let crop2 = self.image2.read_region(&window)?;
        let region1 = RasterRegion::new(crop1.view()).with_offset(bin.x as usize, bin.y as usize);
        let region2 =
            RasterRegion::new(crop2.view()).with_offset(window.x as usize, window.y as usize);
        let set1 = extract_keypoints(region1, &self.cfg.keypoints)?;
        let set2 = extract_keypoints(region2, &self.cfg.keypoints)?;
        report.keypoints1 = set1.len();
        report.keypoints2 = set2.len();

        let landmarks = match_sets(&set1, &set2, &self.cfg.matching)?;
        report.landmarks = landmarks.len();
        let (tie_points, discarded) = self.geometric_filter().apply(&landmarks);
        report.tie_points = tie_points;
        report.discarded = discarded;

        trace_event!(
            "bin_matched",
            keypoints1 = report.keypoints1,
            keypoints2 = report.keypoints2,
            landmarks = report.landmarks,
            accepted = report.tie_points.len(),
            discarded = report.discarded
        );
        Ok(())
    }

    /// Processes every bin and returns the reports in grid order.
    pub fn run(&self) -> TieMatchResult<HomologousReport> {
        let bins = self.bins();
        let _span = trace_span!("homologous_points", bins = bins.len()).entered();
        let results = collect_rows(0..bins.len(), self.cfg.parallel, |i| {
            vec![self.match_bin(&bins[i])]
        });
        let bins = results.into_iter().collect::<TieMatchResult<Vec<_>>>()?;
        let report = HomologousReport { bins };
        trace_event!(
            "homologous_points_done",
            tie_points = report.tie_points().len(),
            discarded = report.discarded(),
            skipped = report.skipped()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::region::GeoImage;
    use crate::image::OwnedImage;

    fn landmark(p1: Point2, p2: Point2) -> Landmark {
        Landmark {
            point1: p1,
            point2: p2,
            index1: 0,
            index2: 0,
            distance: 0.0,
            ratio: None,
        }
    }

    fn identity_filter(precision: f64) -> GeometricFilter<'static> {
        GeometricFilter {
            geometry1: ImageGeometry::default(),
            geometry2: ImageGeometry::default(),
            transform: &IdentityTransform,
            output_transform: None,
            precision,
            enabled: true,
        }
    }

    #[test]
    fn error_at_twice_precision_is_rejected() {
        let filter = identity_filter(30.0);
        let p = Point2::new(100.0, 100.0);
        let lms = [
            landmark(p, Point2::new(160.0, 100.0)),
            landmark(p, Point2::new(190.0, 100.0)),
            landmark(p, Point2::new(159.5, 100.0)),
        ];
        let (accepted, discarded) = filter.apply(&lms);
        assert_eq!(discarded, 2);
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].error, Some(59.5));
    }

    #[test]
    fn disabled_filter_keeps_everything() {
        let filter = GeometricFilter {
            enabled: false,
            ..identity_filter(1.0)
        };
        let lms = [landmark(Point2::new(0.0, 0.0), Point2::new(500.0, 0.0))];
        let (accepted, discarded) = filter.apply(&lms);
        assert_eq!((accepted.len(), discarded), (1, 0));
        assert_eq!(accepted[0].error, None);
    }

    #[test]
    fn output_transform_moves_point2_only() {
        let shift = AffineTransform::translation(1000.0, 0.0);
        let filter = GeometricFilter {
            output_transform: Some(&shift),
            ..identity_filter(5.0)
        };
        let p = Point2::new(3.0, 4.0);
        let (accepted, _) = filter.apply(&[landmark(p, p)]);
        assert_eq!(accepted[0].point1, p);
        assert_eq!(accepted[0].point2, Point2::new(1003.0, 4.0));
    }

    #[test]
    fn failed_landmark_transforms_are_discarded() {
        let failing = |p: Point2| -> TieMatchResult<Point2> {
            if p.x > 50.0 {
                Err(TieMatchError::TransformFailure {
                    x: p.x,
                    y: p.y,
                    reason: "outside projection domain".to_string(),
                })
            } else {
                Ok(p)
            }
        };
        let near = Point2::new(10.0, 10.0);
        let far = Point2::new(80.0, 10.0);
        let lms = [landmark(near, near), landmark(far, far)];

        let mut filter = identity_filter(30.0);
        filter.transform = &failing;
        let (accepted, discarded) = filter.apply(&lms);
        assert_eq!(discarded, 1);
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].pixel1, near);

        let mut filter = identity_filter(30.0);
        filter.output_transform = Some(&failing);
        let (accepted, discarded) = filter.apply(&lms);
        assert_eq!(discarded, 1);
        assert_eq!(accepted[0].point2, near);
    }

    #[test]
    fn flat_images_give_empty_report() {
        let img = GeoImage::new(OwnedImage::filled(128, 128, 0.0).unwrap(), ImageGeometry::default());
        let cfg = HomologousConfig {
            mode: SearchMode::GeoBins(BinGridConfig {
                bin_size: (48, 48),
                bin_step: (16, 16),
                margin: 4,
            }),
            precision: 5.0,
            ..HomologousConfig::default()
        };
        let extractor = HomologousPointExtractor::new(&img, &img, &IdentityTransform, cfg).unwrap();
        let report = extractor.run().unwrap();
        assert_eq!(report.bins.len(), 4);
        assert!(report.tie_points().is_empty());
        assert_eq!(report.discarded(), 0);
        assert_eq!(report.skipped(), 0);
        assert!(report.bins.iter().all(|b| b.keypoints1 == 0 && b.keypoints2 == 0));
    }

    #[test]
    fn unreachable_window_skips_bin() {
        let img = GeoImage::new(OwnedImage::filled(64, 64, 0.0).unwrap(), ImageGeometry::default());
        let far = AffineTransform::translation(1.0e6, 0.0);
        let cfg = HomologousConfig {
            mode: SearchMode::GeoBins(BinGridConfig {
                bin_size: (32, 32),
                bin_step: (0, 0),
                margin: 0,
            }),
            ..HomologousConfig::default()
        };
        let extractor = HomologousPointExtractor::new(&img, &img, &far, cfg).unwrap();
        let report = extractor.run().unwrap();
        assert_eq!(report.bins.len(), 4);
        assert!(report.bins.iter().all(|b| b.skipped == Some(BinSkip::EmptyWindow)));
    }

    #[test]
    fn reprojection_beyond_integer_range_skips_bin() {
        let img = GeoImage::new(OwnedImage::filled(64, 64, 0.0).unwrap(), ImageGeometry::default());
        let cfg = HomologousConfig {
            mode: SearchMode::GeoBins(BinGridConfig {
                bin_size: (32, 32),
                bin_step: (0, 0),
                margin: 0,
            }),
            ..HomologousConfig::default()
        };
        for shift in [-1.0e19, 1.0e19, -1.0e300] {
            let far = AffineTransform::translation(shift, 0.0);
            let extractor = HomologousPointExtractor::new(&img, &img, &far, cfg.clone()).unwrap();
            let report = extractor.run().unwrap();
            assert_eq!(report.bins.len(), 4);
            assert!(report.bins.iter().all(|b| b.skipped == Some(BinSkip::EmptyWindow)));
        }
    }

    #[test]
    fn non_finite_reprojection_skips_bin() {
        let img = GeoImage::new(OwnedImage::filled(64, 64, 0.0).unwrap(), ImageGeometry::default());
        let nan = |_: Point2| -> TieMatchResult<Point2> { Ok(Point2::new(f64::NAN, f64::NAN)) };
        let cfg = HomologousConfig {
            mode: SearchMode::GeoBins(BinGridConfig {
                bin_size: (32, 32),
                bin_step: (0, 0),
                margin: 0,
            }),
            ..HomologousConfig::default()
        };
        let extractor = HomologousPointExtractor::new(&img, &img, &nan, cfg).unwrap();
        let report = extractor.run().unwrap();
        assert_eq!(report.bins.len(), 4);
        for bin in &report.bins {
            assert_eq!(bin.window, None);
            assert!(matches!(
                bin.skipped,
                Some(BinSkip::Failed(TieMatchError::TransformFailure { .. }))
            ));
        }
    }

    #[test]
    fn failing_transform_skips_bin() {
        let img = GeoImage::new(OwnedImage::filled(64, 64, 0.0).unwrap(), ImageGeometry::default());
        let failing = |p: Point2| -> TieMatchResult<Point2> {
            Err(TieMatchError::TransformFailure {
                x: p.x,
                y: p.y,
                reason: "outside projection domain".to_string(),
            })
        };
        let cfg = HomologousConfig {
            mode: SearchMode::GeoBins(BinGridConfig {
                bin_size: (32, 32),
                bin_step: (32, 32),
                margin: 0,
            }),
            ..HomologousConfig::default()
        };
        let extractor = HomologousPointExtractor::new(&img, &img, &failing, cfg).unwrap();
        let report = extractor.run().unwrap();
        assert_eq!(report.bins.len(), 1);
        assert!(matches!(
            report.bins[0].skipped,
            Some(BinSkip::Failed(TieMatchError::TransformFailure { .. }))
        ));
    }
}
