//! Candidate keypoint detection.
//!
//! Scans response images for strict local extrema in 2D or across adjacent
//! scale layers.

pub(crate) mod extrema;

pub use extrema::{
    classify_extremum, detect_extrema, is_spatial_extremum, local_region, DetectorConfig,
    Extremum, ExtremumKind, Neighborhood,
};
