//! Row-oriented raster kernels.
//!
//! Every per-pixel stage (blurring, gradients, extremum scans) is expressed as
//! an independent function of the output row, which lets the same closure run
//! sequentially or row-parallel (`rayon` feature) with identical results.

use crate::image::OwnedImage;
use crate::util::TieMatchResult;

pub(crate) mod scalar;

#[cfg(feature = "rayon")]
pub(crate) mod rayon;

/// Builds an image by filling each output row independently.
pub(crate) fn map_rows<F>(
    width: usize,
    height: usize,
    parallel: bool,
    fill: F,
) -> TieMatchResult<OwnedImage>
where
    F: Fn(usize, &mut [f32]) + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        if parallel {
            return self::rayon::map_rows_par(width, height, fill);
        }
    }
    let _ = parallel;
    scalar::map_rows_seq(width, height, fill)
}

/// Runs `scan` for each row in `rows` and concatenates the results in row order.
pub(crate) fn collect_rows<T, F>(rows: std::ops::Range<usize>, parallel: bool, scan: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> Vec<T> + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        if parallel {
            return self::rayon::collect_rows_par(rows, scan);
        }
    }
    let _ = parallel;
    scalar::collect_rows_seq(rows, scan)
}
