//! Angle helpers shared by the gradient and descriptor stages.

use std::f32::consts::TAU;

/// Computes the gradient orientation in degrees within `[0, 360)`.
///
/// The angle is `atan2(dy, dx)` shifted by a full turn when negative, then
/// converted to degrees.
pub(crate) fn orientation_deg(dy: f32, dx: f32) -> f32 {
    let mut angle = dy.atan2(dx);
    if angle < 0.0 {
        angle += TAU;
    }
    wrap_deg_360(angle.to_degrees())
}

/// Wraps an angle in degrees to the range [0, 360).
pub(crate) fn wrap_deg_360(angle_deg: f32) -> f32 {
    let wrapped = angle_deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Euclidean norm of a 2D vector.
pub(crate) fn hypot(dx: f32, dy: f32) -> f32 {
    (dx * dx + dy * dy).sqrt()
}
