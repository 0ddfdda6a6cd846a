//! Low-level building blocks for custom extraction pipelines.
//!
//! These items expose the scale-space bands, the extremum test, sub-pixel
//! refinement and descriptor sampling used by [`crate::KeypointSetFilter`].
//! Most users should prefer [`crate::extract_keypoints`] and
//! [`crate::match_sets`].

pub use crate::candidate::{
    classify_extremum, detect_extrema, is_spatial_extremum, local_region, Extremum, ExtremumKind,
};
pub use crate::descriptor::{accumulate_histogram, magnitude_orientation, quantize_orientation};
pub use crate::image::pyramid::{base_to_level_pixel, downsample_box, level_to_base};
pub use crate::keypoint::{KeyAccumulator, PositionKey};
pub use crate::refine::{parabola_vertex, refine_offset_2d};
pub use crate::scale::{gaussian_blur, gradient_bands, weight_table, IterationBands, ScaleSpaceBuilder};
