//! Per-raster occupancy mask
//!
//! Tracks which pixels have been consumed by an extracted sample so that
//! negative draws never overlap an existing crop footprint. Created fresh
//! for each raster and dropped with it.

use ndarray::{s, Array2};
use std::ops::Range;

/// Boolean grid, raster-shaped; `true` means the cell belongs to an
/// extracted sample's footprint.
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    mask: Array2<bool>,
}

impl OccupancyGrid {
    /// All-free mask for an `ny` x `nx` raster.
    pub fn new(ny: usize, nx: usize) -> Self {
        Self {
            mask: Array2::from_elem((ny, nx), false),
        }
    }

    /// Grid dimensions as (rows, columns).
    pub fn shape(&self) -> (usize, usize) {
        self.mask.dim()
    }

    /// The `(2*buffer) x (2*buffer)` window centered at the index, clipped
    /// to grid bounds.
    fn window(&self, row: usize, col: usize, buffer: usize) -> (Range<usize>, Range<usize>) {
        let (ny, nx) = self.mask.dim();
        let r0 = row.saturating_sub(buffer);
        let r1 = (row + buffer).min(ny);
        let c0 = col.saturating_sub(buffer);
        let c1 = (col + buffer).min(nx);
        (r0..r1, c0..c1)
    }

    /// True iff every cell of the clipped window is unmarked.
    pub fn is_free(&self, row: usize, col: usize, buffer: usize) -> bool {
        let (rows, cols) = self.window(row, col, buffer);
        self.mask.slice(s![rows, cols]).iter().all(|&occupied| !occupied)
    }

    /// Mark every cell of the clipped window as occupied. Idempotent.
    pub fn mark(&mut self, row: usize, col: usize, buffer: usize) {
        let (rows, cols) = self.window(row, col, buffer);
        self.mask.slice_mut(s![rows, cols]).fill(true);
    }

    /// Number of occupied cells; equals the union size of all marked
    /// windows.
    pub fn occupied_cells(&self) -> usize {
        self.mask.iter().filter(|&&occupied| occupied).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_grid_is_all_free() {
        let grid = OccupancyGrid::new(100, 100);
        assert_eq!(grid.occupied_cells(), 0);
        assert!(grid.is_free(50, 50, 10));
    }

    #[test]
    fn test_mark_consumes_square_window() {
        // Positive sample at (50, 50) with buffer 10 consumes rows and
        // columns [40, 60): exactly 400 cells.
        let mut grid = OccupancyGrid::new(100, 100);
        grid.mark(50, 50, 10);
        assert_eq!(grid.occupied_cells(), 400);

        // Overlapping draw is rejected, distant draw is accepted.
        assert!(!grid.is_free(45, 45, 10));
        assert!(grid.is_free(80, 80, 10));
    }

    #[test]
    fn test_is_free_false_everywhere_inside_marked_window() {
        let mut grid = OccupancyGrid::new(100, 100);
        grid.mark(50, 50, 10);
        for row in 40..60 {
            for col in 40..60 {
                assert!(!grid.is_free(row, col, 1), "({}, {})", row, col);
            }
        }
    }

    #[test]
    fn test_mark_is_idempotent() {
        let mut grid = OccupancyGrid::new(100, 100);
        grid.mark(50, 50, 10);
        let once = grid.occupied_cells();
        grid.mark(50, 50, 10);
        assert_eq!(grid.occupied_cells(), once);
    }

    #[test]
    fn test_window_clips_at_grid_edge() {
        let mut grid = OccupancyGrid::new(100, 100);
        grid.mark(0, 0, 10);
        // Clipped to rows [0, 10) x cols [0, 10).
        assert_eq!(grid.occupied_cells(), 100);
        assert!(!grid.is_free(5, 5, 1));
        assert!(grid.is_free(20, 20, 5));
    }

    #[test]
    fn test_disjoint_marks_accumulate_without_double_count() {
        let mut grid = OccupancyGrid::new(200, 200);
        grid.mark(50, 50, 10);
        grid.mark(150, 150, 10);
        assert_eq!(grid.occupied_cells(), 800);

        // A third, partially overlapping mark only adds the new cells.
        grid.mark(50, 60, 10);
        assert_eq!(grid.occupied_cells(), 800 + 200);
    }
}
