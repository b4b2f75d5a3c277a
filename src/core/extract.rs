//! Crop extraction
//!
//! Cuts the square window around a center pixel out of a raster, clipping
//! to raster bounds. A window whose clipped extent is empty in either
//! dimension yields no crop; the caller skips persistence and moves on.

use crate::types::{Crop, Raster};
use ndarray::s;

/// Extract the `[row-buffer, row+buffer) x [col-buffer, col+buffer)`
/// sub-grid, clipped to the raster.
///
/// Returns `None` when the clipped window has zero area in either
/// dimension. Nothing here is an error: degenerate windows are an
/// expected outcome of track points near (or off) the disc edge.
pub fn extract(raster: &Raster, row: usize, col: usize, buffer: usize) -> Option<Crop> {
    let (ny, nx) = raster.shape();
    let r0 = row.saturating_sub(buffer);
    let r1 = (row + buffer).min(ny);
    let c0 = col.saturating_sub(buffer);
    let c1 = (col + buffer).min(nx);
    if r0 >= r1 || c0 >= c1 {
        log::debug!(
            "empty crop window at ({}, {}) with buffer {}, raster {}x{}",
            row,
            col,
            buffer,
            ny,
            nx
        );
        return None;
    }
    Some(Crop {
        row,
        col,
        buffer,
        data: raster.data.slice(s![r0..r1, c0..c1]).to_owned(),
    })
}
