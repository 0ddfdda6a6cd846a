//! Octave pyramid construction for `f32` rasters.
//!
//! Downsampling uses a 2x2 box filter: `dst = (a + b + c + d) / 4`. Level
//! pixel `j` covers base pixels `2j` and `2j + 1`, so the level-to-base mapping
//! is `base = (j + 0.5) * 2^level - 0.5`. An odd trailing row or column is
//! dropped.

use crate::image::{ImageView, OwnedImage};
use crate::util::{TieMatchError, TieMatchResult};

/// Halves an image with a 2x2 box filter.
pub fn downsample_box(src: &OwnedImage) -> TieMatchResult<OwnedImage> {
    let dst_width = src.width() / 2;
    let dst_height = src.height() / 2;
    if dst_width == 0 || dst_height == 0 {
        return Err(TieMatchError::InvalidDimensions {
            width: dst_width,
            height: dst_height,
        });
    }

    let mut dst = Vec::with_capacity(dst_width * dst_height);
    for y in 0..dst_height {
        for x in 0..dst_width {
            let a = src.at(2 * x, 2 * y);
            let b = src.at(2 * x + 1, 2 * y);
            let c = src.at(2 * x, 2 * y + 1);
            let d = src.at(2 * x + 1, 2 * y + 1);
            dst.push((a + b + c + d) * 0.25);
        }
    }
    OwnedImage::new(dst, dst_width, dst_height)
}

/// Owned image pyramid built from a base level.
pub struct ImagePyramid {
    levels: Vec<OwnedImage>,
}

impl ImagePyramid {
    /// Builds a pyramid from a base view.
    ///
    /// `max_levels` is clamped to at least 1 so the base level is always present.
    /// Construction stops early once a level would drop below 2x2.
    pub fn build(base: ImageView<'_, f32>, max_levels: usize) -> TieMatchResult<Self> {
        let max_levels = max_levels.max(1);
        let mut levels = vec![OwnedImage::from_view(base)?];

        while levels.len() < max_levels {
            let prev = &levels[levels.len() - 1];
            if prev.width() < 4 || prev.height() < 4 {
                break;
            }
            let next = downsample_box(prev)?;
            levels.push(next);
        }

        Ok(Self { levels })
    }

    /// Returns all pyramid levels (level 0 is the base resolution).
    pub fn levels(&self) -> &[OwnedImage] {
        &self.levels
    }

    /// Returns a specific pyramid level.
    pub fn level(&self, index: usize) -> Option<&OwnedImage> {
        self.levels.get(index)
    }

    /// Returns the number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Returns true when the pyramid has no levels (never after `build`).
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Maps a level pixel coordinate to base-level coordinates.
#[inline]
pub fn level_to_base(coord: f64, level: usize) -> f64 {
    let scale = (1u64 << level) as f64;
    (coord + 0.5) * scale - 0.5
}

/// Maps a base-level coordinate to the nearest level pixel.
#[inline]
pub fn base_to_level_pixel(coord: f64, level: usize) -> isize {
    let scale = (1u64 << level) as f64;
    ((coord + 0.5) / scale - 0.5).round() as isize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downsample_averages_blocks() {
        let data: Vec<f32> = (0..16).map(|v| v as f32).collect();
        let img = OwnedImage::new(data, 4, 4).unwrap();
        let half = downsample_box(&img).unwrap();
        assert_eq!(half.width(), 2);
        assert_eq!(half.data(), &[2.5, 4.5, 10.5, 12.5]);
    }

    #[test]
    fn level_mapping_round_trips_pixel_centers() {
        for level in 0..4 {
            for j in 0..10 {
                let base = level_to_base(j as f64, level);
                assert_eq!(base_to_level_pixel(base, level), j as isize);
            }
        }
        assert_eq!(base_to_level_pixel(63.0, 1), 31);
        assert_eq!(base_to_level_pixel(32.0, 1), 16);
    }
}
