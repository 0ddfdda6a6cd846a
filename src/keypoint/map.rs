//! Ordered keypoint map keyed by sub-pixel position.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::image::pyramid::base_to_level_pixel;
use crate::image::region::Point2;
use crate::keypoint::KeyAccumulator;

/// Map key with a total lexicographic order: x first, then y.
///
/// Comparison uses `f64::total_cmp`, so every value (NaN included) has a
/// deterministic place in the order.
#[derive(Clone, Copy, Debug)]
pub struct PositionKey {
    pub x: f64,
    pub y: f64,
}

impl PositionKey {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn point(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

impl Ord for PositionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.x
            .total_cmp(&other.x)
            .then_with(|| self.y.total_cmp(&other.y))
    }
}

impl PartialOrd for PositionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PositionKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PositionKey {}

/// Keypoints being grown during one extraction run.
#[derive(Debug, Default)]
pub(crate) struct KeypointMap {
    entries: BTreeMap<PositionKey, KeyAccumulator>,
}

impl KeypointMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Finds an entry whose position falls on level pixel `(lx, ly)` of `octave`.
    pub(crate) fn find_at_level(&self, lx: isize, ly: isize, octave: usize) -> Option<PositionKey> {
        let scale = (1u64 << octave) as f64;
        let lo = PositionKey::new(lx as f64 * scale - 1.0, f64::NEG_INFINITY);
        let hi = PositionKey::new((lx + 1) as f64 * scale, f64::INFINITY);
        self.entries
            .range(lo..=hi)
            .map(|(key, _)| *key)
            .find(|key| {
                base_to_level_pixel(key.x, octave) == lx && base_to_level_pixel(key.y, octave) == ly
            })
    }

    /// Inserts a record at `position` unless an entry already covers the same
    /// level pixel at `octave`. Returns the key of the entry and whether it is new.
    pub(crate) fn add_key(
        &mut self,
        position: Point2,
        octave: usize,
        make: impl FnOnce() -> KeyAccumulator,
    ) -> (PositionKey, bool) {
        let lx = base_to_level_pixel(position.x, octave);
        let ly = base_to_level_pixel(position.y, octave);
        if let Some(key) = self.find_at_level(lx, ly, octave) {
            return (key, false);
        }
        let key = PositionKey::new(position.x, position.y);
        let inserted = match self.entries.entry(key) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(make());
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        };
        (key, inserted)
    }

    /// Keeps only the entries for which `keep` returns true.
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&PositionKey, &mut KeyAccumulator) -> bool) {
        self.entries.retain(|key, acc| keep(key, acc));
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&PositionKey, &mut KeyAccumulator)> {
        self.entries.iter_mut()
    }

    /// Drains the entries in key order.
    pub(crate) fn into_sorted(self) -> impl Iterator<Item = (PositionKey, KeyAccumulator)> {
        self.entries.into_iter()
    }
}
