//! Keypoint extraction over a raster region.
//!
//! [`KeypointSetFilter`] runs the scale-space iterations, deduplicating
//! keypoints in an ordered map keyed by position, and exports an immutable
//! [`PointSet`]. Keypoints are exported in lexicographic position order
//! (x first, then y), independent of detection order.

mod accumulator;
mod filter;
mod map;

pub use accumulator::KeyAccumulator;
pub use filter::{extract_keypoints, KeypointConfig, KeypointSetFilter};
pub use map::PositionKey;

use crate::image::region::Point2;

/// A finalized keypoint: position plus descriptor vector.
///
/// Positions are full-image pixel coordinates with pixel centers at integer
/// values. Missing descriptor components are NaN.
#[derive(Clone, Debug, PartialEq)]
pub struct Keypoint {
    position: Point2,
    descriptor: Vec<f32>,
    first_iteration: usize,
}

impl Keypoint {
    /// Creates a keypoint from a position and descriptor.
    pub fn new(position: Point2, descriptor: Vec<f32>) -> Self {
        Self {
            position,
            descriptor,
            first_iteration: 0,
        }
    }

    pub(crate) fn with_first_iteration(mut self, iteration: usize) -> Self {
        self.first_iteration = iteration;
        self
    }

    /// Full-image pixel position.
    pub fn position(&self) -> Point2 {
        self.position
    }

    /// Returns the x coordinate.
    pub fn x(&self) -> f64 {
        self.position.x
    }

    /// Returns the y coordinate.
    pub fn y(&self) -> f64 {
        self.position.y
    }

    /// Descriptor components.
    pub fn descriptor(&self) -> &[f32] {
        &self.descriptor
    }

    /// Iteration at which the keypoint was first detected.
    pub fn first_iteration(&self) -> usize {
        self.first_iteration
    }
}

/// Ordered collection of finalized keypoints.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointSet {
    points: Vec<Keypoint>,
}

impl PointSet {
    /// Wraps keypoints in the given order.
    pub fn new(points: Vec<Keypoint>) -> Self {
        Self { points }
    }

    /// Number of keypoints.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true when there are no keypoints.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Keypoint at `index`.
    pub fn get(&self, index: usize) -> Option<&Keypoint> {
        self.points.get(index)
    }

    /// All keypoints in order.
    pub fn points(&self) -> &[Keypoint] {
        &self.points
    }

    /// Iterates keypoints in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Keypoint> {
        self.points.iter()
    }
}

impl FromIterator<Keypoint> for PointSet {
    fn from_iter<I: IntoIterator<Item = Keypoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a Keypoint;
    type IntoIter = std::slice::Iter<'a, Keypoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl IntoIterator for PointSet {
    type Item = Keypoint;
    type IntoIter = std::vec::IntoIter<Keypoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}
