//! Crop artifact persistence
//!
//! Each accepted crop produces two artifacts under its category
//! directory: a JSON snapshot of the numeric grid and an inverted
//! grayscale PNG rendering (high radiance drawn dark, matching the
//! infrared convention where cold cloud tops stand out).

use crate::core::SampleSink;
use crate::types::{GridData, SampleKind, StormError, StormResult};
use image::{GrayImage, Luma};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Numeric grid snapshot written next to the rendered image
#[derive(Debug, Serialize)]
struct GridSnapshot {
    rows: usize,
    cols: usize,
    /// Row-major cell values
    values: Vec<f32>,
}

/// Writes crop artifacts under `{root}/positive/` and `{root}/negative/`
pub struct DiskSink {
    root: PathBuf,
}

impl DiskSink {
    /// Create the sink and its category directories.
    pub fn new(root: &Path) -> StormResult<Self> {
        for kind in [SampleKind::Positive, SampleKind::Negative] {
            std::fs::create_dir_all(root.join(kind.dir_name()))?;
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }
}

impl SampleSink for DiskSink {
    fn save(&self, key: &str, kind: SampleKind, grid: &GridData) -> StormResult<()> {
        let dir = self.root.join(kind.dir_name());
        let (rows, cols) = grid.dim();

        let snapshot = GridSnapshot {
            rows,
            cols,
            values: grid.iter().copied().collect(),
        };
        let encoded = serde_json::to_vec(&snapshot)
            .map_err(|e| StormError::Processing(format!("snapshot encode failed: {}", e)))?;
        std::fs::write(dir.join(format!("{}_cropped.json", key)), encoded)?;

        let rendered = render_grayscale(grid);
        rendered.save(dir.join(format!("{}_cropped.png", key)))?;

        log::debug!("saved {} sample {}", kind, key);
        Ok(())
    }
}

/// Render a grid as an inverted grayscale image, one pixel per cell.
///
/// Values are min-max normalized over the finite cells; non-finite cells
/// render white, like masked pixels in the source scan.
pub fn render_grayscale(grid: &GridData) -> GrayImage {
    let (rows, cols) = grid.dim();

    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &value in grid.iter() {
        if value.is_finite() {
            min = min.min(value);
            max = max.max(value);
        }
    }
    let range = if max > min { max - min } else { 1.0 };

    GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
        let value = grid[[y as usize, x as usize]];
        if !value.is_finite() {
            return Luma([255u8]);
        }
        let t = (value - min) / range;
        Luma([255 - (t * 255.0).round() as u8])
    })
}
