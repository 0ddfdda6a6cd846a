//! Rayon-parallel row kernels (feature-gated).
//!
//! Rows are distributed across threads; per-row outputs are written into
//! disjoint slices or merged back in row order, so results match the
//! sequential kernels exactly.

use crate::image::OwnedImage;
use crate::util::TieMatchResult;
use rayon::prelude::*;

pub(crate) fn map_rows_par<F>(width: usize, height: usize, fill: F) -> TieMatchResult<OwnedImage>
where
    F: Fn(usize, &mut [f32]) + Sync + Send,
{
    let mut data = vec![0.0f32; width * height];
    data.par_chunks_mut(width.max(1))
        .enumerate()
        .for_each(|(y, row)| fill(y, row));
    OwnedImage::new(data, width, height)
}

pub(crate) fn collect_rows_par<T, F>(rows: std::ops::Range<usize>, scan: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> Vec<T> + Sync + Send,
{
    // Parallel scan over rows, merged in row order
    let row_results: Vec<Vec<T>> = rows.into_par_iter().map(scan).collect();
    row_results.into_iter().flatten().collect()
}
