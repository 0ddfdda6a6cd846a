//! TieMatch extracts scale-space keypoints and matches them across image
//! pairs to produce tie points.
//!
//! The pipeline builds a Gaussian scale space per raster region, detects strict
//! local extrema, grows a descriptor for every keypoint across iterations and
//! exports an ordered point set. Point sets from two images are matched by
//! nearest-neighbor search under a missing-value aware distance, and the
//! coordinator verifies matches against an injected reprojection function.
//! Row kernels and bin processing can run in parallel with the `rayon`
//! feature; the `simd` feature vectorizes descriptor distances.

mod candidate;
pub mod coordinator;
pub mod descriptor;
pub mod distance;
pub mod image;
mod kernel;
pub mod keypoint;
pub mod lowlevel;
pub mod matching;
mod refine;
pub mod scale;
mod trace;
pub mod util;

pub use candidate::{DetectorConfig, Neighborhood};
pub use coordinator::{
    write_tie_point_file, write_tie_points, AffineTransform, BinGridConfig, HomologousConfig,
    HomologousPointExtractor, HomologousReport, IdentityTransform, PointTransform, SearchMode,
    TiePoint,
};
pub use descriptor::DescriptorKind;
pub use distance::{DistanceMetric, MISSING_VALUE};
pub use image::pyramid::ImagePyramid;
pub use image::region::{GeoImage, ImageGeometry, PixelRegion, Point2, RasterRegion, RasterSource};
pub use image::{ImageView, OwnedImage};
pub use keypoint::{extract_keypoints, Keypoint, KeypointConfig, KeypointSetFilter, PointSet};
pub use matching::{match_sets, KeypointMatcher, Landmark, LandmarkList, MatchingConfig};
pub use scale::{ResponseFamily, ScaleSpaceConfig};
pub use util::{TieMatchError, TieMatchResult};
