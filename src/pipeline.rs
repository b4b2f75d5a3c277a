//! Batch driver: one raster per distinct track timestamp
//!
//! Processes timestamps strictly one at a time; the raster and its
//! occupancy mask are owned by the current iteration and dropped before
//! the next fetch, which bounds memory to a single full-disc scan. No
//! per-timestamp failure terminates the batch.

use crate::core::{SampleSink, SamplerParams, TrainingSampler};
use crate::io::ibtracs::group_by_time;
use crate::types::{Raster, StormResult, TrackPoint};
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Supplies one canonical raster per timestamp.
///
/// The fetch may be slow and may fail; retry and backoff, if any, belong
/// to the implementation, not the callers.
pub trait RasterProvider {
    fn fetch(&self, timestamp: DateTime<Utc>) -> StormResult<Raster>;
}

/// Run configuration, passed explicitly to every stage; no process-wide
/// state.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Root directory for the positive/ and negative/ artifact trees
    pub output_dir: PathBuf,
    pub bucket: String,
    pub product: String,
    /// ABI band number
    pub band: u8,
    /// Rendering density; the crop half-width is 1.5x this value
    pub dpi: u32,
    /// Negative attempts are capped at this multiple of the target count
    pub attempt_multiplier: usize,
    /// Fixed RNG seed for reproducible negative sampling
    pub seed: Option<u64>,
}

impl RunConfig {
    /// Crop half-width in pixels.
    pub fn buffer(&self) -> usize {
        (self.dpi as f64 * 1.5) as usize
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./data/training"),
            bucket: "noaa-goes16".to_string(),
            product: "ABI-L1b-RadF".to_string(),
            band: 13,
            dpi: 166,
            attempt_multiplier: 5,
            seed: None,
        }
    }
}

/// Aggregate counts for a whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Timestamps whose raster was fetched and sampled
    pub timestamps: usize,
    /// Timestamps skipped because their raster could not be retrieved
    pub failed: usize,
    pub positives: usize,
    pub negatives: usize,
}

/// Process every distinct timestamp of the track dataset in first-seen
/// order.
///
/// Retrieval failures are logged at error level and counted; sample-level
/// skips inside a raster never surface here. The summary is the run's
/// only partial-success record beyond the log stream.
pub fn run<P: RasterProvider, S: SampleSink>(
    config: &RunConfig,
    provider: &P,
    sink: S,
    points: &[TrackPoint],
) -> RunSummary {
    let params = SamplerParams {
        buffer: config.buffer(),
        attempt_multiplier: config.attempt_multiplier,
        seed: config.seed,
    };
    let sampler = TrainingSampler::new(params, sink);

    let groups = group_by_time(points);
    log::info!(
        "{} track points across {} distinct timestamps",
        points.len(),
        groups.len()
    );

    let mut summary = RunSummary::default();
    for (timestamp, group) in groups {
        log::info!("date: {}", timestamp.format("%Y-%m-%d %H:%M"));

        let raster = match provider.fetch(timestamp) {
            Ok(raster) => raster,
            Err(e) => {
                log::error!("skipping {}: {}", timestamp, e);
                summary.failed += 1;
                continue;
            }
        };

        let counts = sampler.process_raster(&raster, &group);
        summary.timestamps += 1;
        summary.positives += counts.positives;
        summary.negatives += counts.negatives;
        // raster and its mask drop here, before the next fetch
    }
    summary
}
