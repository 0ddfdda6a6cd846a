//! Tie-point records and their text output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::image::region::Point2;
use crate::util::TieMatchResult;

/// An accepted homologous point pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TiePoint {
    /// Image-1 world coordinates.
    pub point1: Point2,
    /// Image-2 world coordinates, or the output frame when one is configured.
    pub point2: Point2,
    /// Image-1 full-image pixel position.
    pub pixel1: Point2,
    /// Image-2 full-image pixel position.
    pub pixel2: Point2,
    /// Reprojection error in image-2 pixels, when the geometric filter ran.
    pub error: Option<f64>,
    /// Descriptor distance of the underlying landmark.
    pub distance: f64,
}

/// Writes one `x1\ty1\tx2\ty2` line per tie point with 12 decimals.
pub fn write_tie_points<W: Write>(writer: &mut W, points: &[TiePoint]) -> TieMatchResult<()> {
    for tp in points {
        writeln!(
            writer,
            "{:.12}\t{:.12}\t{:.12}\t{:.12}",
            tp.point1.x, tp.point1.y, tp.point2.x, tp.point2.y
        )?;
    }
    Ok(())
}

/// Creates (or truncates) `path` and writes the tie points into it.
///
/// The file is created even when `points` is empty.
pub fn write_tie_point_file(path: impl AsRef<Path>, points: &[TiePoint]) -> TieMatchResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_tie_points(&mut writer, points)?;
    writer.flush()?;
    Ok(())
}
