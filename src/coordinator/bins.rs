//! Bin grid over image 1 and search windows in image 2.

use crate::coordinator::transform::PointTransform;
use crate::image::region::{ImageGeometry, PixelRegion, Point2};
use crate::util::{TieMatchError, TieMatchResult};

/// Layout of the sampling bins over image 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BinGridConfig {
    /// Bin width and height in pixels.
    pub bin_size: (usize, usize),
    /// Gap between consecutive bins along x and y.
    pub bin_step: (usize, usize),
    /// Pixels kept free along every image border.
    pub margin: usize,
}

impl Default for BinGridConfig {
    fn default() -> Self {
        Self {
            bin_size: (256, 256),
            bin_step: (256, 256),
            margin: 10,
        }
    }
}

impl BinGridConfig {
    /// Checks the bin layout.
    pub fn validate(&self) -> TieMatchResult<()> {
        if self.bin_size.0 == 0 || self.bin_size.1 == 0 {
            return Err(TieMatchError::InvalidConfig {
                reason: "bin_size must be >= 1",
            });
        }
        Ok(())
    }

    /// Number of bins along an axis of `size` pixels.
    pub fn bins_along(size: usize, bin: usize, step: usize, margin: usize) -> usize {
        let usable = size.saturating_sub(2 * margin);
        usable.div_ceil(bin + step)
    }
}

/// Bins over an image of `width x height`, row-major (y outer).
///
/// Each bin starts `margin + k * (bin_size + bin_step)` pixels from the
/// border and is cropped to the image shrunk by `margin`.
pub fn bin_grid(width: usize, height: usize, cfg: &BinGridConfig) -> Vec<PixelRegion> {
    let bounds = PixelRegion::new(0, 0, width, height).shrink_by_radius(cfg.margin);
    if bounds.is_empty() || cfg.bin_size.0 == 0 || cfg.bin_size.1 == 0 {
        return Vec::new();
    }
    let (bw, bh) = cfg.bin_size;
    let (sx, sy) = cfg.bin_step;
    let nx = BinGridConfig::bins_along(width, bw, sx, cfg.margin);
    let ny = BinGridConfig::bins_along(height, bh, sy, cfg.margin);

    let mut bins = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        let y = (cfg.margin + j * (bh + sy)) as isize;
        for i in 0..nx {
            let x = (cfg.margin + i * (bw + sx)) as isize;
            if let Some(bin) = PixelRegion::new(x, y, bw, bh).crop(&bounds) {
                bins.push(bin);
            }
        }
    }
    bins
}

/// Axis-aligned bounding box `(min, max)` of four corners.
pub fn corner_bounding_box(corners: [Point2; 4]) -> (Point2, Point2) {
    let mut min = corners[0];
    let mut max = corners[0];
    for c in &corners[1..] {
        min.x = min.x.min(c.x);
        min.y = min.y.min(c.y);
        max.x = max.x.max(c.x);
        max.y = max.y.max(c.y);
    }
    (min, max)
}

/// Reprojects an image-1 pixel into image-2 pixel space.
pub fn reproject_pixel(
    p: Point2,
    geometry1: &ImageGeometry,
    geometry2: &ImageGeometry,
    transform: &dyn PointTransform,
) -> TieMatchResult<Point2> {
    let world1 = geometry1.pixel_to_world(p);
    let world2 = transform.transform_point(world1)?;
    let pixel2 = geometry2.world_to_pixel(world2);
    if !pixel2.x.is_finite() || !pixel2.y.is_finite() {
        return Err(TieMatchError::TransformFailure {
            x: world1.x,
            y: world1.y,
            reason: "reprojection produced a non-finite pixel".to_string(),
        });
    }
    Ok(pixel2)
}

/// Inputs for locating a bin's counterpart in image 2.
#[derive(Clone, Copy)]
pub struct WindowContext<'a> {
    /// Geometry of image 1.
    pub geometry1: ImageGeometry,
    /// Geometry of image 2.
    pub geometry2: ImageGeometry,
    /// Image-1 world to image-2 world mapping.
    pub transform: &'a dyn PointTransform,
    /// Full extent of image 2.
    pub extent2: PixelRegion,
    /// Padding around the reprojected bin, in image-2 pixels.
    pub padding: usize,
    /// Border of image 2 excluded from the window.
    pub margin: usize,
}

/// Image-2 window covering the reprojection of `bin`.
///
/// All four bin corners are reprojected and their bounding box is padded,
/// then clipped to image 2 shrunk by the margin. `None` when nothing remains.
/// A corner that does not reproject to a finite pixel is a `TransformFailure`.
pub fn search_window(bin: &PixelRegion, ctx: &WindowContext<'_>) -> TieMatchResult<Option<PixelRegion>> {
    let x0 = bin.x as f64 - 0.5;
    let y0 = bin.y as f64 - 0.5;
    let x1 = x0 + bin.width as f64;
    let y1 = y0 + bin.height as f64;
    let mut corners = [Point2::default(); 4];
    for (corner, p) in corners.iter_mut().zip([
        Point2::new(x0, y0),
        Point2::new(x1, y0),
        Point2::new(x0, y1),
        Point2::new(x1, y1),
    ]) {
        *corner = reproject_pixel(p, &ctx.geometry1, &ctx.geometry2, ctx.transform)?;
    }
    let (min, max) = corner_bounding_box(corners);
    let bounds = ctx.extent2.shrink_by_radius(ctx.margin);
    let x_span = clip_span(min.x, max.x, ctx.padding, bounds.x, bounds.end_x());
    let y_span = clip_span(min.y, max.y, ctx.padding, bounds.y, bounds.end_y());
    Ok(match (x_span, y_span) {
        (Some((x, width)), Some((y, height))) => Some(PixelRegion::new(x, y, width, height)),
        _ => None,
    })
}

/// Pixel span `[floor(min) - pad, floor(min) + ceil(max - floor(min)) + pad)`
/// clipped to `[lo, hi)`, as `(start, len)`.
///
/// Computed in `f64` so that reprojections far outside the integer range
/// clip to nothing instead of overflowing.
fn clip_span(min: f64, max: f64, padding: usize, lo: isize, hi: isize) -> Option<(isize, usize)> {
    let start = min.floor();
    let end = start + (max - start).ceil();
    let pad = padding as f64;
    let first = (start - pad).max(lo as f64);
    let last = (end + pad).min(hi as f64);
    if last <= first {
        return None;
    }
    // both ends now lie inside [lo, hi]
    let first = first as isize;
    let last = last as isize;
    Some((first, last.abs_diff(first)))
}
