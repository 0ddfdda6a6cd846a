//! Reprojection between image frames.

use crate::image::region::Point2;
use crate::util::{TieMatchError, TieMatchResult};

/// Maps a world point of one frame into another frame.
///
/// Implementations must be shareable across bin workers.
pub trait PointTransform: Sync {
    /// Reprojects `p`, or reports `TransformFailure` outside the valid domain.
    fn transform_point(&self, p: Point2) -> TieMatchResult<Point2>;
}

impl<F> PointTransform for F
where
    F: Fn(Point2) -> TieMatchResult<Point2> + Sync,
{
    fn transform_point(&self, p: Point2) -> TieMatchResult<Point2> {
        self(p)
    }
}

/// Leaves points unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct IdentityTransform;

impl PointTransform for IdentityTransform {
    fn transform_point(&self, p: Point2) -> TieMatchResult<Point2> {
        Ok(p)
    }
}

/// `x' = a*x + b*y + c`, `y' = d*x + e*y + f`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffineTransform {
    coefficients: [f64; 6],
}

impl AffineTransform {
    /// Creates a transform from `[a, b, c, d, e, f]`.
    pub fn new(coefficients: [f64; 6]) -> TieMatchResult<Self> {
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(TieMatchError::InvalidConfig {
                reason: "affine coefficients must be finite",
            });
        }
        Ok(Self { coefficients })
    }

    /// Pure translation.
    pub fn translation(tx: f64, ty: f64) -> Self {
        Self {
            coefficients: [1.0, 0.0, tx, 0.0, 1.0, ty],
        }
    }

    /// Rotation by `angle_deg` (counter-clockwise) about `center`.
    pub fn rotation_about(angle_deg: f64, center: Point2) -> Self {
        let (s, c) = angle_deg.to_radians().sin_cos();
        let tx = center.x - c * center.x + s * center.y;
        let ty = center.y - s * center.x - c * center.y;
        Self {
            coefficients: [c, -s, tx, s, c, ty],
        }
    }

    /// Returns `[a, b, c, d, e, f]`.
    pub fn coefficients(&self) -> [f64; 6] {
        self.coefficients
    }
}

impl PointTransform for AffineTransform {
    fn transform_point(&self, p: Point2) -> TieMatchResult<Point2> {
        let [a, b, c, d, e, f] = self.coefficients;
        let out = Point2::new(a * p.x + b * p.y + c, d * p.x + e * p.y + f);
        if !out.x.is_finite() || !out.y.is_finite() {
            return Err(TieMatchError::TransformFailure {
                x: p.x,
                y: p.y,
                reason: "non-finite affine result".to_string(),
            });
        }
        Ok(out)
    }
}
