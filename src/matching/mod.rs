//! Nearest-neighbor matching of two keypoint sets.
//!
//! Every point of set 1 is compared with every point of set 2 under the
//! configured [`DistanceMetric`]. The nearest candidate is accepted subject to
//! the optional absolute distance threshold, the optional nearest to
//! second-nearest ratio test, and, when enabled, a mutual (back) match check.
//! Landmarks are returned in set-1 order.

use crate::distance::DistanceMetric;
use crate::image::region::Point2;
use crate::kernel::collect_rows;
use crate::keypoint::{Keypoint, PointSet};
use crate::trace::{trace_event, trace_span};
use crate::util::{TieMatchError, TieMatchResult};

/// Matching policy.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchingConfig {
    /// Descriptor distance.
    pub metric: DistanceMetric,
    /// Reject when `nearest / second_nearest` is not below this value.
    ///
    /// The test is skipped when fewer than two finite candidates exist.
    pub ratio_threshold: Option<f64>,
    /// Reject when the nearest distance exceeds this value.
    pub distance_threshold: Option<f64>,
    /// Keep only pairs that are also nearest when matching set 2 against set 1.
    pub back_matching: bool,
    /// Match set-1 points in parallel when the `rayon` feature is enabled.
    pub parallel: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::default(),
            ratio_threshold: None,
            distance_threshold: None,
            back_matching: false,
            parallel: false,
        }
    }
}

impl MatchingConfig {
    /// Checks thresholds and metric parameters.
    pub fn validate(&self) -> TieMatchResult<()> {
        self.metric.validate()?;
        if let Some(ratio) = self.ratio_threshold {
            if !ratio.is_finite() || ratio <= 0.0 {
                return Err(TieMatchError::InvalidConfig {
                    reason: "ratio_threshold must be finite and > 0",
                });
            }
        }
        if let Some(distance) = self.distance_threshold {
            if distance.is_nan() || distance < 0.0 {
                return Err(TieMatchError::InvalidConfig {
                    reason: "distance_threshold must be >= 0",
                });
            }
        }
        Ok(())
    }
}

/// A matched pair of keypoints.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Landmark {
    /// Position of the point from set 1.
    pub point1: Point2,
    /// Position of the point from set 2.
    pub point2: Point2,
    /// Index of the point in set 1.
    pub index1: usize,
    /// Index of the point in set 2.
    pub index2: usize,
    /// Descriptor distance of the pair.
    pub distance: f64,
    /// Nearest to second-nearest distance ratio, when a second candidate existed.
    pub ratio: Option<f64>,
}

/// Landmarks of one matching call, in set-1 order.
pub type LandmarkList = Vec<Landmark>;

#[derive(Clone, Copy, Debug)]
struct Nearest {
    index: usize,
    distance: f64,
    ratio: Option<f64>,
}

/// Nearest and second-nearest candidates of `query` in `candidates`.
///
/// NaN distances are ignored; ties keep the lowest index.
fn nearest(
    query: &Keypoint,
    candidates: &PointSet,
    metric: &DistanceMetric,
) -> TieMatchResult<Option<Nearest>> {
    let mut best: Option<(usize, f64)> = None;
    let mut second = f64::INFINITY;
    for (index, candidate) in candidates.iter().enumerate() {
        let d = metric.evaluate_pair(query.descriptor(), candidate.descriptor())?;
        if d.is_nan() {
            continue;
        }
        match best {
            Some((_, bd)) if d >= bd => {
                if d < second {
                    second = d;
                }
            }
            Some((_, bd)) => {
                second = bd;
                best = Some((index, d));
            }
            None => best = Some((index, d)),
        }
    }
    Ok(best.map(|(index, distance)| Nearest {
        index,
        distance,
        ratio: second.is_finite().then(|| ratio_of(distance, second)),
    }))
}

fn ratio_of(nearest: f64, second: f64) -> f64 {
    if second > 0.0 {
        nearest / second
    } else {
        // both distances are zero: the match is fully ambiguous
        1.0
    }
}

/// Nearest candidate that passes the distance and ratio tests.
fn accepted(
    query: &Keypoint,
    candidates: &PointSet,
    cfg: &MatchingConfig,
) -> TieMatchResult<Option<Nearest>> {
    let found = match nearest(query, candidates, &cfg.metric)? {
        Some(found) => found,
        None => return Ok(None),
    };
    if let Some(max) = cfg.distance_threshold {
        if found.distance > max {
            return Ok(None);
        }
    }
    if let (Some(max_ratio), Some(ratio)) = (cfg.ratio_threshold, found.ratio) {
        if ratio >= max_ratio {
            return Ok(None);
        }
    }
    Ok(Some(found))
}

/// Matches `set1` against `set2`.
///
/// An empty input yields an empty list. Descriptor lengths that the metric
/// cannot reconcile fail with `DimensionMismatch`.
pub fn match_sets(set1: &PointSet, set2: &PointSet, cfg: &MatchingConfig) -> TieMatchResult<LandmarkList> {
    cfg.validate()?;
    if set1.is_empty() || set2.is_empty() {
        return Ok(Vec::new());
    }
    let _span = trace_span!("keypoint_matching", set1 = set1.len(), set2 = set2.len()).entered();

    let results = collect_rows(0..set1.len(), cfg.parallel, |i| {
        vec![match_one(i, set1, set2, cfg)]
    });
    let mut landmarks = Vec::new();
    for result in results {
        if let Some(landmark) = result? {
            landmarks.push(landmark);
        }
    }
    trace_event!("landmarks", count = landmarks.len());
    Ok(landmarks)
}

fn match_one(
    index1: usize,
    set1: &PointSet,
    set2: &PointSet,
    cfg: &MatchingConfig,
) -> TieMatchResult<Option<Landmark>> {
    let p1 = &set1.points()[index1];
    let found = match accepted(p1, set2, cfg)? {
        Some(found) => found,
        None => return Ok(None),
    };
    let p2 = &set2.points()[found.index];
    if cfg.back_matching {
        match accepted(p2, set1, cfg)? {
            Some(back) if back.index == index1 => {}
            _ => return Ok(None),
        }
    }
    Ok(Some(Landmark {
        point1: p1.position(),
        point2: p2.position(),
        index1,
        index2: found.index,
        distance: found.distance,
        ratio: found.ratio,
    }))
}

/// Stateful front-end over [`match_sets`].
#[derive(Clone, Debug)]
pub struct KeypointMatcher<'a> {
    cfg: MatchingConfig,
    input1: Option<&'a PointSet>,
    input2: Option<&'a PointSet>,
}

impl<'a> KeypointMatcher<'a> {
    pub fn new(cfg: MatchingConfig) -> Self {
        Self {
            cfg,
            input1: None,
            input2: None,
        }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.cfg
    }

    pub fn set_input1(&mut self, set: &'a PointSet) {
        self.input1 = Some(set);
    }

    pub fn set_input2(&mut self, set: &'a PointSet) {
        self.input2 = Some(set);
    }

    /// Matches the two inputs.
    pub fn update(&self) -> TieMatchResult<LandmarkList> {
        let set1 = self.input1.ok_or(TieMatchError::MissingInput { input: "point set 1" })?;
        let set2 = self.input2.ok_or(TieMatchError::MissingInput { input: "point set 2" })?;
        match_sets(set1, set2, &self.cfg)
    }
}
