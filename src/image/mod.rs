//! Single-channel rasters used by the extraction pipeline.
//!
//! [`ImageView`] borrows pixel rows from caller memory; rows may be padded, so
//! consecutive rows start `stride` elements apart. [`OwnedImage`] is the dense
//! `f32` buffer every pipeline stage produces. Crops of a view are zero-copy
//! and keep the parent stride.

use crate::image::region::PixelRegion;
use crate::util::{TieMatchError, TieMatchResult};

#[cfg(feature = "image-io")]
pub mod io;
pub mod pyramid;
pub mod region;

/// Borrowed raster rows with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Wraps a dense row-major buffer.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> TieMatchResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Wraps a buffer whose rows start `stride` elements apart.
    pub fn new(data: &'a [T], width: usize, height: usize, stride: usize) -> TieMatchResult<Self> {
        let needed = min_buffer_len(width, height, stride)?;
        if data.len() < needed {
            return Err(TieMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Elements between the starts of consecutive rows.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Row `y` without padding, or `None` past the last row.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.stride;
        self.data.get(start..start + self.width)
    }

    /// Iterates the rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &'a [T]> + '_ {
        (0..self.height).filter_map(move |y| self.row(y))
    }

    /// Zero-copy view of `region`, which must lie inside the view.
    pub fn crop(&self, region: &PixelRegion) -> TieMatchResult<ImageView<'a, T>> {
        let bounds = PixelRegion::new(0, 0, self.width, self.height);
        if region.is_empty() {
            return Err(TieMatchError::InvalidDimensions {
                width: region.width,
                height: region.height,
            });
        }
        if region.crop(&bounds) != Some(*region) {
            return Err(TieMatchError::RoiOutOfBounds {
                x: region.x.max(0) as usize,
                y: region.y.max(0) as usize,
                width: region.width,
                height: region.height,
                img_width: self.width,
                img_height: self.height,
            });
        }
        let start = region.y as usize * self.stride + region.x as usize;
        ImageView::new(&self.data[start..], region.width, region.height, self.stride)
    }
}

/// Shortest buffer that holds `height` rows of `width` samples at `stride`.
fn min_buffer_len(width: usize, height: usize, stride: usize) -> TieMatchResult<usize> {
    if width == 0 || height == 0 {
        return Err(TieMatchError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(TieMatchError::InvalidStride { width, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(TieMatchError::InvalidDimensions { width, height })
}

/// Owned contiguous single-channel `f32` raster.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedImage {
    data: Vec<f32>,
    width: usize,
    height: usize,
}

impl OwnedImage {
    /// Wraps a row-major buffer of exactly `width * height` samples.
    pub fn new(data: Vec<f32>, width: usize, height: usize) -> TieMatchResult<Self> {
        if width == 0 || height == 0 {
            return Err(TieMatchError::InvalidDimensions { width, height });
        }
        let needed = width
            .checked_mul(height)
            .ok_or(TieMatchError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(TieMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(TieMatchError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Creates an image filled with a constant value.
    pub fn filled(width: usize, height: usize, value: f32) -> TieMatchResult<Self> {
        let len = width
            .checked_mul(height)
            .ok_or(TieMatchError::InvalidDimensions { width, height })?;
        Self::new(vec![value; len], width, height)
    }

    /// Copies a view into a dense buffer.
    pub fn from_view(view: ImageView<'_, f32>) -> TieMatchResult<Self> {
        Self::collect_rows(view, |row, out| out.extend_from_slice(row))
    }

    /// Converts an 8-bit view to `f32` samples.
    pub fn from_u8_view(view: ImageView<'_, u8>) -> TieMatchResult<Self> {
        Self::collect_rows(view, |row, out| out.extend(row.iter().map(|&v| f32::from(v))))
    }

    fn collect_rows<T>(
        view: ImageView<'_, T>,
        mut push: impl FnMut(&[T], &mut Vec<f32>),
    ) -> TieMatchResult<Self> {
        let mut data = Vec::with_capacity(view.width() * view.height());
        for row in view.rows() {
            push(row, &mut data);
        }
        Self::new(data, view.width(), view.height())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major samples.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Returns the sample at `(x, y)`; callers guarantee bounds.
    #[inline]
    pub(crate) fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    /// Returns the sample at signed coordinates, replicating edge pixels.
    #[inline]
    pub(crate) fn at_clamped(&self, x: isize, y: isize) -> f32 {
        let cx = x.clamp(0, self.width as isize - 1) as usize;
        let cy = y.clamp(0, self.height as isize - 1) as usize;
        self.at(cx, cy)
    }

    /// Borrows the image as a dense view.
    pub fn view(&self) -> ImageView<'_, f32> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }
}
