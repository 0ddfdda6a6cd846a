//! Sub-pixel refinement of detected extrema.
//!
//! Each axis is refined independently by fitting a parabola through the
//! center sample and its two neighbors along that axis.

use crate::candidate::ExtremumKind;
use crate::image::OwnedImage;

/// Offsets at or beyond half a pixel would move the extremum into a
/// neighboring pixel and are discarded.
const MAX_OFFSET: f32 = 0.5;

/// Curvatures below this magnitude are treated as flat.
const MIN_CURVATURE: f32 = 1e-6;

/// Vertex offset of the parabola through `(-1, fm)`, `(0, f0)`, `(1, fp)`.
///
/// The curvature must open away from the extremum polarity (downwards for a
/// maximum, upwards for a minimum) and the vertex must stay within half a
/// sample of the center; otherwise `None` is returned.
pub fn parabola_vertex(fm: f32, f0: f32, fp: f32, kind: ExtremumKind) -> Option<f32> {
    if !fm.is_finite() || !f0.is_finite() || !fp.is_finite() {
        return None;
    }
    let curvature = fm - 2.0 * f0 + fp;
    let opens_correctly = match kind {
        ExtremumKind::Maximum => curvature <= -MIN_CURVATURE,
        ExtremumKind::Minimum => curvature >= MIN_CURVATURE,
    };
    if !opens_correctly {
        return None;
    }
    let offset = 0.5 * (fm - fp) / curvature;
    (offset.is_finite() && offset.abs() < MAX_OFFSET).then_some(offset)
}

/// Refines an extremum from its 3x3 neighborhood centered at `s[1][1]`.
///
/// Returns `(dx, dy)` strictly inside `(-0.5, 0.5)`; an axis whose fit is
/// ill-conditioned keeps a zero offset.
pub fn refine_offset_2d(s: [[f32; 3]; 3], kind: ExtremumKind) -> (f32, f32) {
    let dx = parabola_vertex(s[1][0], s[1][1], s[1][2], kind).unwrap_or(0.0);
    let dy = parabola_vertex(s[0][1], s[1][1], s[2][1], kind).unwrap_or(0.0);
    (dx, dy)
}

/// Gathers the 3x3 neighborhood of `(x, y)` with edge replication.
pub(crate) fn neighborhood_3x3(img: &OwnedImage, x: usize, y: usize) -> [[f32; 3]; 3] {
    let mut s = [[0.0f32; 3]; 3];
    for (dy, row) in s.iter_mut().enumerate() {
        for (dx, value) in row.iter_mut().enumerate() {
            *value = img.at_clamped(x as isize + dx as isize - 1, y as isize + dy as isize - 1);
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_of_symmetric_samples_is_centered() {
        assert_eq!(parabola_vertex(1.0, 2.0, 1.0, ExtremumKind::Maximum), Some(0.0));
        assert_eq!(parabola_vertex(1.0, 2.0, 1.0, ExtremumKind::Minimum), None);
        assert_eq!(parabola_vertex(1.0, 1.0, 1.0, ExtremumKind::Maximum), None);
        assert_eq!(parabola_vertex(f32::NAN, 1.0, 0.0, ExtremumKind::Maximum), None);
    }

    #[test]
    fn paraboloid_maximum_is_recovered() {
        let mut s = [[0.0f32; 3]; 3];
        for (yi, row) in s.iter_mut().enumerate() {
            for (xi, v) in row.iter_mut().enumerate() {
                let x = xi as f32 - 1.0;
                let y = yi as f32 - 1.0;
                *v = 1.0 - (x - 0.3).powi(2) - (y + 0.2).powi(2);
            }
        }
        let (dx, dy) = refine_offset_2d(s, ExtremumKind::Maximum);
        assert!((dx - 0.3).abs() < 1e-3);
        assert!((dy + 0.2).abs() < 1e-3);
    }

    #[test]
    fn paraboloid_minimum_is_recovered() {
        let mut s = [[0.0f32; 3]; 3];
        for (yi, row) in s.iter_mut().enumerate() {
            for (xi, v) in row.iter_mut().enumerate() {
                let x = xi as f32 - 1.0;
                let y = yi as f32 - 1.0;
                *v = (x + 0.1).powi(2) + y * y - 5.0;
            }
        }
        let (dx, dy) = refine_offset_2d(s, ExtremumKind::Minimum);
        assert!((dx + 0.1).abs() < 1e-3);
        assert!(dy.abs() < 1e-6);
    }

    #[test]
    fn wrong_curvature_keeps_center() {
        let s = [[0.0, 0.0, 0.0], [0.0, 1.0, 2.9], [0.0, 0.0, 0.0]];
        let (dx, dy) = refine_offset_2d(s, ExtremumKind::Maximum);
        assert_eq!(dx, 0.0);
        assert!(dy.abs() < 1e-6);
    }
}
