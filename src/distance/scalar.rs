//! Scalar reference kernels for the distance metrics.

use super::is_missing;

pub(crate) fn sum_squares(v: &[f32]) -> f64 {
    v.iter().map(|&x| f64::from(x) * f64::from(x)).sum()
}

pub(crate) fn sum_squares_present(v: &[f32]) -> f64 {
    v.iter()
        .filter(|&&x| !is_missing(x))
        .map(|&x| f64::from(x) * f64::from(x))
        .sum()
}

pub(crate) fn squared_diff(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum()
}

pub(crate) fn squared_diff_present(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .filter(|(&x, &y)| !is_missing(x) && !is_missing(y))
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum()
}

pub(crate) fn flexible_power_norm(v: &[f32], alpha: f64, beta: f64) -> f64 {
    v.iter()
        .filter(|&&x| !is_missing(x))
        .map(|&x| f64::from(x).abs().powf(alpha).powf(beta))
        .sum()
}

pub(crate) fn flexible_power_pair(a: &[f32], b: &[f32], alpha: f64, beta: f64) -> f64 {
    a.iter()
        .zip(b)
        .filter(|(&x, &y)| !is_missing(x) && !is_missing(y))
        .map(|(&x, &y)| {
            let px = signed_pow(f64::from(x), alpha);
            let py = signed_pow(f64::from(y), alpha);
            (px - py).abs().powf(beta)
        })
        .sum()
}

/// `x^alpha` that keeps the sign of negative inputs instead of producing NaN.
fn signed_pow(x: f64, alpha: f64) -> f64 {
    x.signum() * x.abs().powf(alpha)
}
