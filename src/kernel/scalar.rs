//! Sequential reference implementations of the row kernels.

use crate::image::OwnedImage;
use crate::util::TieMatchResult;

pub(crate) fn map_rows_seq<F>(width: usize, height: usize, fill: F) -> TieMatchResult<OwnedImage>
where
    F: Fn(usize, &mut [f32]),
{
    let mut data = vec![0.0f32; width * height];
    for (y, row) in data.chunks_mut(width.max(1)).enumerate() {
        fill(y, row);
    }
    OwnedImage::new(data, width, height)
}

pub(crate) fn collect_rows_seq<T, F>(rows: std::ops::Range<usize>, scan: F) -> Vec<T>
where
    F: Fn(usize) -> Vec<T>,
{
    let mut out = Vec::new();
    for y in rows {
        out.extend(scan(y));
    }
    out
}
