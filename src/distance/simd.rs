//! SIMD-accelerated distance kernels using the `wide` crate.
//!
//! Components are widened to `f64` and processed 4 at a time with `f64x4`,
//! so lane arithmetic matches the scalar kernels. Missing (NaN) differences
//! are masked to zero with a self-comparison.

use wide::f64x4;

const LANES: usize = 4;

/// Load 4 f32 values widened into f64x4.
#[inline]
fn load_f64x4(slice: &[f32]) -> f64x4 {
    f64x4::from([
        f64::from(slice[0]),
        f64::from(slice[1]),
        f64::from(slice[2]),
        f64::from(slice[3]),
    ])
}

pub(crate) fn squared_diff(a: &[f32], b: &[f32]) -> f64 {
    let len = a.len().min(b.len());
    let simd_end = len / LANES * LANES;
    let mut acc = f64x4::ZERO;
    let mut i = 0;
    while i < simd_end {
        let d = load_f64x4(&a[i..]) - load_f64x4(&b[i..]);
        acc += d * d;
        i += LANES;
    }
    acc.reduce_add() + super::scalar::squared_diff(&a[simd_end..len], &b[simd_end..len])
}

pub(crate) fn squared_diff_present(a: &[f32], b: &[f32]) -> f64 {
    let len = a.len().min(b.len());
    let simd_end = len / LANES * LANES;
    let mut acc = f64x4::ZERO;
    let mut i = 0;
    while i < simd_end {
        let d = load_f64x4(&a[i..]) - load_f64x4(&b[i..]);
        // NaN != NaN, so the mask is false exactly where a component is missing
        let d = d.simd_eq(d).select(d, f64x4::ZERO);
        acc += d * d;
        i += LANES;
    }
    acc.reduce_add() + super::scalar::squared_diff_present(&a[simd_end..len], &b[simd_end..len])
}
