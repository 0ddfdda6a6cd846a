//! Convenience helpers for loading rasters via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::{ImageView, OwnedImage};
use crate::util::{TieMatchError, TieMatchResult};
use std::path::Path;

/// Creates an owned floating point image from a grayscale image buffer.
pub fn owned_from_gray_image(img: &image::GrayImage) -> TieMatchResult<OwnedImage> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    let view = ImageView::from_slice(img.as_raw().as_slice(), width, height)?;
    OwnedImage::from_u8_view(view)
}

/// Extracts one channel (1-based `band`) of a dynamic image.
///
/// Samples are rescaled to the 0..255 range regardless of the source depth.
pub fn owned_band_from_dynamic_image(
    img: &image::DynamicImage,
    band: usize,
) -> TieMatchResult<OwnedImage> {
    let channels = usize::from(img.color().channel_count());
    if band == 0 || band > channels {
        return Err(TieMatchError::InvalidConfig {
            reason: "band index out of range for input image",
        });
    }
    if channels == 1 {
        return owned_from_gray_image(&img.to_luma8());
    }

    // luma-alpha images expand to rgba with alpha in the last slot
    let channel = if channels == 2 && band == 2 { 3 } else { band - 1 };
    let rgba = img.to_rgba32f();
    let width = rgba.width() as usize;
    let height = rgba.height() as usize;
    let data = rgba
        .pixels()
        .map(|px| px.0[channel] * 255.0)
        .collect::<Vec<f32>>();
    OwnedImage::new(data, width, height)
}

/// Loads an image from disk and returns a single band as `f32` samples.
pub fn load_band<P: AsRef<Path>>(path: P, band: usize) -> TieMatchResult<OwnedImage> {
    let img = image::open(path).map_err(|err| TieMatchError::ImageIo {
        reason: err.to_string(),
    })?;
    owned_band_from_dynamic_image(&img, band)
}

/// Loads an image from disk and converts it to grayscale.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> TieMatchResult<OwnedImage> {
    let img = image::open(path).map_err(|err| TieMatchError::ImageIo {
        reason: err.to_string(),
    })?;
    owned_from_gray_image(&img.to_luma8())
}
