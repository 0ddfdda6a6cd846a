//! Error types for tiematch.

use thiserror::Error;

/// Result alias for tiematch operations.
pub type TieMatchResult<T> = std::result::Result<T, TieMatchError>;

/// Errors that can occur when extracting or matching keypoints.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TieMatchError {
    /// Width or height is zero or overflows the addressable size.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is too short for the requested view.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Requested region does not fit inside the image.
    #[error("roi ({x}, {y}, {width}x{height}) out of bounds for {img_width}x{img_height} image")]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// Region cannot hold the detection neighborhood at every pyramid level.
    #[error("region {width}x{height} is smaller than the minimum size {min_size}")]
    RegionTooSmall {
        width: usize,
        height: usize,
        min_size: usize,
    },
    /// Descriptor vectors cannot be reconciled by missing-value padding.
    #[error("descriptor dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
    /// The injected reprojection function rejected a point.
    #[error("transform failed at ({x}, {y}): {reason}")]
    TransformFailure { x: f64, y: f64, reason: String },
    /// Configuration values are out of range or inconsistent.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: &'static str },
    /// An entry point was updated before its input was set.
    #[error("missing input: {input}")]
    MissingInput { input: &'static str },
    /// Writing the tie-point output failed.
    #[error("i/o error: {reason}")]
    Io { reason: String },
    /// Loading an image from disk failed.
    #[error("image i/o error: {reason}")]
    ImageIo { reason: String },
}

impl From<std::io::Error> for TieMatchError {
    fn from(err: std::io::Error) -> Self {
        TieMatchError::Io {
            reason: err.to_string(),
        }
    }
}
