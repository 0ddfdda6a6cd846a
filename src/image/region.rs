//! Region and geometry types shared by the extraction and coordinator stages.
//!
//! Pixel coordinates follow the pixel-center convention: pixel `(i, j)` covers
//! `[i - 0.5, i + 0.5] x [j - 0.5, j + 0.5]` in continuous index space, and
//! `ImageGeometry` maps continuous indices to world coordinates through an
//! origin (world position of pixel `(0, 0)`) and a per-axis spacing.

use crate::image::{ImageView, OwnedImage};
use crate::util::{TieMatchError, TieMatchResult};

/// 2D point in pixel or world coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    /// Creates a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Integer pixel region; the index may be negative before cropping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRegion {
    pub x: isize,
    pub y: isize,
    pub width: usize,
    pub height: usize,
}

impl PixelRegion {
    /// Creates a region from its top-left index and size.
    pub const fn new(x: isize, y: isize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns true when the region has zero area.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// One past the last column, saturating at `isize::MAX`.
    pub fn end_x(&self) -> isize {
        self.x.saturating_add_unsigned(self.width)
    }

    /// One past the last row, saturating at `isize::MAX`.
    pub fn end_y(&self) -> isize {
        self.y.saturating_add_unsigned(self.height)
    }

    /// Grows the region by `radius` pixels on every side.
    pub fn pad_by_radius(&self, radius: usize) -> Self {
        Self {
            x: self.x.saturating_sub_unsigned(radius),
            y: self.y.saturating_sub_unsigned(radius),
            width: self.width.saturating_add(radius.saturating_mul(2)),
            height: self.height.saturating_add(radius.saturating_mul(2)),
        }
    }

    /// Shrinks the region by `radius` pixels on every side.
    pub fn shrink_by_radius(&self, radius: usize) -> Self {
        Self {
            x: self.x.saturating_add_unsigned(radius),
            y: self.y.saturating_add_unsigned(radius),
            width: self.width.saturating_sub(radius.saturating_mul(2)),
            height: self.height.saturating_sub(radius.saturating_mul(2)),
        }
    }

    /// Crops the region to `bounds`; `None` when the overlap has zero area.
    pub fn crop(&self, bounds: &PixelRegion) -> Option<PixelRegion> {
        let x0 = self.x.max(bounds.x);
        let y0 = self.y.max(bounds.y);
        let x1 = self.end_x().min(bounds.end_x());
        let y1 = self.end_y().min(bounds.end_y());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(PixelRegion::new(x0, y0, x1.abs_diff(x0), y1.abs_diff(y0)))
    }

    /// Returns true when the continuous point lies inside the region's pixel footprint.
    pub fn contains(&self, p: &Point2) -> bool {
        p.x >= self.x as f64 - 0.5
            && p.y >= self.y as f64 - 0.5
            && p.x <= self.end_x() as f64 - 0.5
            && p.y <= self.end_y() as f64 - 0.5
    }
}

/// Affine pixel-to-world mapping of a raster.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageGeometry {
    /// World coordinates of the center of pixel `(0, 0)`.
    pub origin: Point2,
    /// World size of one pixel; negative values flip the axis.
    pub spacing: Point2,
}

impl Default for ImageGeometry {
    fn default() -> Self {
        Self {
            origin: Point2::new(0.0, 0.0),
            spacing: Point2::new(1.0, 1.0),
        }
    }
}

impl ImageGeometry {
    /// Creates a geometry, rejecting zero or non-finite spacing.
    pub fn new(origin: Point2, spacing: Point2) -> TieMatchResult<Self> {
        let finite = origin.x.is_finite()
            && origin.y.is_finite()
            && spacing.x.is_finite()
            && spacing.y.is_finite();
        if !finite {
            return Err(TieMatchError::InvalidConfig {
                reason: "geometry must be finite",
            });
        }
        if spacing.x == 0.0 || spacing.y == 0.0 {
            return Err(TieMatchError::InvalidConfig {
                reason: "pixel spacing must be non-zero",
            });
        }
        Ok(Self { origin, spacing })
    }

    /// Maps a continuous pixel index to world coordinates.
    pub fn pixel_to_world(&self, p: Point2) -> Point2 {
        Point2::new(
            self.origin.x + p.x * self.spacing.x,
            self.origin.y + p.y * self.spacing.y,
        )
    }

    /// Maps world coordinates to a continuous pixel index.
    pub fn world_to_pixel(&self, w: Point2) -> Point2 {
        Point2::new(
            (w.x - self.origin.x) / self.spacing.x,
            (w.y - self.origin.y) / self.spacing.y,
        )
    }
}

/// Borrowed raster crop handed to keypoint extraction.
///
/// `offset` is the index of the crop's top-left pixel in the full image, so
/// exported keypoints land in full-image pixel coordinates.
#[derive(Clone, Copy)]
pub struct RasterRegion<'a> {
    view: ImageView<'a, f32>,
    offset_x: usize,
    offset_y: usize,
}

impl<'a> RasterRegion<'a> {
    /// Wraps a view located at the full-image origin.
    pub fn new(view: ImageView<'a, f32>) -> Self {
        Self {
            view,
            offset_x: 0,
            offset_y: 0,
        }
    }

    /// Sets the full-image index of the view's top-left pixel.
    pub fn with_offset(mut self, x: usize, y: usize) -> Self {
        self.offset_x = x;
        self.offset_y = y;
        self
    }

    /// Returns the pixel data.
    pub fn view(&self) -> ImageView<'a, f32> {
        self.view
    }

    /// Returns the full-image index of the top-left pixel.
    pub fn offset(&self) -> (usize, usize) {
        (self.offset_x, self.offset_y)
    }

    /// Returns the region footprint in full-image pixel space.
    pub fn footprint(&self) -> PixelRegion {
        PixelRegion::new(
            self.offset_x as isize,
            self.offset_y as isize,
            self.view.width(),
            self.view.height(),
        )
    }
}

/// Supplier of raster crops with known geometry.
pub trait RasterSource: Sync {
    /// Full image width in pixels.
    fn width(&self) -> usize;

    /// Full image height in pixels.
    fn height(&self) -> usize;

    /// Pixel-to-world mapping of the full image.
    fn geometry(&self) -> ImageGeometry;

    /// Reads a dense row-major copy of `region`, which must lie inside the image.
    fn read_region(&self, region: &PixelRegion) -> TieMatchResult<OwnedImage>;

    /// The full image extent.
    fn extent(&self) -> PixelRegion {
        PixelRegion::new(0, 0, self.width(), self.height())
    }
}

/// In-memory raster with geometry.
#[derive(Clone, Debug)]
pub struct GeoImage {
    image: OwnedImage,
    geometry: ImageGeometry,
}

impl GeoImage {
    /// Pairs pixel data with its geometry.
    pub fn new(image: OwnedImage, geometry: ImageGeometry) -> Self {
        Self { image, geometry }
    }

    /// Returns the pixel data.
    pub fn image(&self) -> &OwnedImage {
        &self.image
    }
}

impl RasterSource for GeoImage {
    fn width(&self) -> usize {
        self.image.width()
    }

    fn height(&self) -> usize {
        self.image.height()
    }

    fn geometry(&self) -> ImageGeometry {
        self.geometry
    }

    fn read_region(&self, region: &PixelRegion) -> TieMatchResult<OwnedImage> {
        OwnedImage::from_view(self.image.view().crop(region)?)
    }
}
