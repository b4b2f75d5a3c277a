//! Positive/negative sample orchestration for one raster
//!
//! Runs the per-raster phases in order: every track point becomes a
//! positive crop, then random locations are drawn until the negative
//! count matches the positive count or the attempt budget is exhausted.

use crate::core::extract::extract;
use crate::core::locate::locate;
use crate::core::occupancy::OccupancyGrid;
use crate::types::{GridData, Raster, SampleKind, StormResult, TrackPoint};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Destination for accepted crops.
///
/// Implementations persist the numeric grid under the given category with
/// the deterministic naming key; failures are reported back but the
/// sampler treats them as non-fatal for the individual sample.
pub trait SampleSink {
    fn save(&self, key: &str, kind: SampleKind, grid: &GridData) -> StormResult<()>;
}

impl<S: SampleSink + ?Sized> SampleSink for &S {
    fn save(&self, key: &str, kind: SampleKind, grid: &GridData) -> StormResult<()> {
        (**self).save(key, kind, grid)
    }
}

/// Sampling parameters
#[derive(Debug, Clone)]
pub struct SamplerParams {
    /// Crop half-width in pixels
    pub buffer: usize,
    /// Negative attempts are capped at `attempt_multiplier * target`
    pub attempt_multiplier: usize,
    /// Fixed RNG seed for reproducible negative draws
    pub seed: Option<u64>,
}

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            // 1.5x the default 166 DPI rendering density
            buffer: 249,
            attempt_multiplier: 5,
            seed: None,
        }
    }
}

/// Counts for one processed raster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleSummary {
    pub positives: usize,
    pub negatives: usize,
    /// Negative draws attempted, accepted or not
    pub attempts: usize,
}

/// Extracts positive and negative training samples from a single raster
pub struct TrainingSampler<S: SampleSink> {
    params: SamplerParams,
    sink: S,
}

impl<S: SampleSink> TrainingSampler<S> {
    pub fn new(params: SamplerParams, sink: S) -> Self {
        Self { params, sink }
    }

    /// Run both phases for one raster and its timestamp's track points.
    ///
    /// Individual points are skipped (never propagated) when their
    /// projection degenerates or their crop clips to zero area; sink
    /// failures are logged and the sample's footprint stays consumed so
    /// the occupancy invariant holds.
    pub fn process_raster(&self, raster: &Raster, points: &[TrackPoint]) -> SampleSummary {
        let (ny, nx) = raster.shape();
        let buffer = self.params.buffer;
        let mut occupancy = OccupancyGrid::new(ny, nx);

        let positives = self.positive_phase(raster, points, &mut occupancy);
        let (negatives, attempts) = self.negative_phase(raster, positives, &mut occupancy);

        log::info!(
            "raster {}: {} positive, {} negative samples ({} negative draws)",
            raster.timestamp.format("%Y-%m-%d %HZ"),
            positives,
            negatives,
            attempts
        );
        SampleSummary {
            positives,
            negatives,
            attempts,
        }
    }

    /// One crop per track point, in dataset row order.
    fn positive_phase(
        &self,
        raster: &Raster,
        points: &[TrackPoint],
        occupancy: &mut OccupancyGrid,
    ) -> usize {
        let buffer = self.params.buffer;
        let mut accepted = 0;

        for point in points {
            let (px, py) = raster.projection.project(point.lon, point.lat);
            let Some((row, col)) = locate(raster, px, py) else {
                log::debug!(
                    "track point {} ({}, {}) projects outside the disc, skipping",
                    point.sid,
                    point.lat,
                    point.lon
                );
                continue;
            };
            let Some(crop) = extract(raster, row, col, buffer) else {
                continue;
            };

            let key = crop.naming_key(&raster.timestamp);
            if let Err(e) = self.sink.save(&key, SampleKind::Positive, &crop.data) {
                log::warn!("failed to persist positive sample {}: {}", key, e);
            }
            occupancy.mark(row, col, buffer);
            accepted += 1;
        }
        accepted
    }

    /// Random non-overlapping draws until `target` accepted or the
    /// attempt budget runs out.
    fn negative_phase(
        &self,
        raster: &Raster,
        target: usize,
        occupancy: &mut OccupancyGrid,
    ) -> (usize, usize) {
        let (ny, nx) = raster.shape();
        let buffer = self.params.buffer;
        let max_attempts = self.params.attempt_multiplier * target;

        // Draws stay a full buffer away from the raster edge so crops
        // never clip; a raster smaller than one window yields no draws.
        if target == 0 || ny <= 2 * buffer || nx <= 2 * buffer {
            return (0, 0);
        }

        let mut rng = match self.params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut accepted = 0;
        let mut attempts = 0;
        while accepted < target && attempts < max_attempts {
            attempts += 1;
            let row = rng.gen_range(buffer..ny - buffer);
            let col = rng.gen_range(buffer..nx - buffer);
            if !occupancy.is_free(row, col, buffer) {
                continue;
            }
            let Some(crop) = extract(raster, row, col, buffer) else {
                continue;
            };

            let key = crop.naming_key(&raster.timestamp);
            if let Err(e) = self.sink.save(&key, SampleKind::Negative, &crop.data) {
                log::warn!("failed to persist negative sample {}: {}", key, e);
            }
            occupancy.mark(row, col, buffer);
            accepted += 1;
        }
        (accepted, attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GeosProjection, StormError, SweepAxis};
    use chrono::{DateTime, TimeZone, Utc};
    use ndarray::{Array1, Array2};
    use std::cell::RefCell;

    /// Collects saved samples in memory.
    #[derive(Default)]
    struct MemorySink {
        saved: RefCell<Vec<(String, SampleKind)>>,
        fail: bool,
    }

    impl SampleSink for MemorySink {
        fn save(&self, key: &str, kind: SampleKind, _grid: &GridData) -> StormResult<()> {
            if self.fail {
                return Err(StormError::Processing("sink unavailable".to_string()));
            }
            self.saved.borrow_mut().push((key.to_string(), kind));
            Ok(())
        }
    }

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 9, 6, 12, 0, 0).unwrap()
    }

    /// Full-disc raster whose axes span the visible extent of GOES-16, so
    /// any in-disc track point locates to an interior pixel.
    fn full_disc_raster(n: usize) -> Raster {
        let half = 5_434_000.0_f64;
        let step = 2.0 * half / (n as f64 - 1.0);
        Raster {
            data: Array2::zeros((n, n)),
            x: Array1::from_vec((0..n).map(|i| -half + i as f64 * step).collect()),
            // GOES y axis decreases with row index
            y: Array1::from_vec((0..n).map(|i| half - i as f64 * step).collect()),
            projection: GeosProjection {
                perspective_height: 35_786_023.0,
                lon_origin: -75.0,
                sweep: SweepAxis::X,
                semi_major_axis: 6_378_137.0,
                semi_minor_axis: 6_356_752.31414,
            },
            timestamp: timestamp(),
        }
    }

    fn storm(lat: f64, lon: f64) -> TrackPoint {
        TrackPoint {
            sid: "2017228N14314".to_string(),
            season: 2017,
            number: 30,
            name: "HARVEY".to_string(),
            time: timestamp(),
            nature: "TS".to_string(),
            lat,
            lon,
            wind: Some(100.0),
            pressure: Some(938.0),
        }
    }

    fn params(buffer: usize) -> SamplerParams {
        SamplerParams {
            buffer,
            attempt_multiplier: 5,
            seed: Some(7),
        }
    }

    #[test]
    fn test_negatives_match_positives_on_open_raster() {
        let raster = full_disc_raster(200);
        let sink = MemorySink::default();
        let sampler = TrainingSampler::new(params(5), &sink);

        let points = vec![storm(15.0, -55.0), storm(25.0, -90.0)];
        let summary = sampler.process_raster(&raster, &points);

        assert_eq!(summary.positives, 2);
        assert_eq!(summary.negatives, 2);
        assert!(summary.attempts <= 10);

        let saved = sink.saved.borrow();
        assert_eq!(
            saved.iter().filter(|(_, k)| *k == SampleKind::Positive).count(),
            2
        );
        assert_eq!(
            saved.iter().filter(|(_, k)| *k == SampleKind::Negative).count(),
            2
        );
    }

    #[test]
    fn test_accepted_samples_never_overlap() {
        let raster = full_disc_raster(120);
        let sink = MemorySink::default();
        let buffer = 8;
        let sampler = TrainingSampler::new(params(buffer), &sink);

        let points = vec![storm(15.0, -55.0), storm(-20.0, -100.0)];
        sampler.process_raster(&raster, &points);

        // Recover each accepted window from its naming key and check the
        // union size: no overlap means the sum of clipped windows.
        let (ny, nx) = raster.shape();
        let mut occupancy = OccupancyGrid::new(ny, nx);
        let mut expected = 0;
        for (key, _) in sink.saved.borrow().iter() {
            let fields: Vec<&str> = key.split('_').collect();
            let col: usize = fields[2].parse().expect("col field");
            let row: usize = fields[3].parse().expect("row field");
            let r0 = row.saturating_sub(buffer);
            let r1 = (row + buffer).min(ny);
            let c0 = col.saturating_sub(buffer);
            let c1 = (col + buffer).min(nx);
            expected += (r1 - r0) * (c1 - c0);
            occupancy.mark(row, col, buffer);
        }
        assert_eq!(occupancy.occupied_cells(), expected);
    }

    #[test]
    fn test_saturated_raster_terminates_within_budget() {
        // One positive window covers the whole usable interior, so no
        // negative draw can ever be accepted.
        let raster = full_disc_raster(40);
        let sink = MemorySink::default();
        let sampler = TrainingSampler::new(params(15), &sink);

        let points = vec![storm(0.0, -75.0)];
        let summary = sampler.process_raster(&raster, &points);

        assert_eq!(summary.positives, 1);
        assert_eq!(summary.negatives, 0);
        assert_eq!(summary.attempts, 5);
    }

    #[test]
    fn test_out_of_disc_point_is_skipped() {
        // The antipode of the sub-satellite point projects to non-finite
        // scan coordinates.
        let raster = full_disc_raster(100);
        let sink = MemorySink::default();
        let sampler = TrainingSampler::new(params(5), &sink);

        let summary = sampler.process_raster(&raster, &[storm(0.0, 105.0)]);
        assert_eq!(summary.positives, 0);
        assert_eq!(summary.negatives, 0);
        assert!(sink.saved.borrow().is_empty());
    }

    #[test]
    fn test_no_track_points_yields_empty_summary() {
        let raster = full_disc_raster(50);
        let sink = MemorySink::default();
        let sampler = TrainingSampler::new(params(5), &sink);
        assert_eq!(sampler.process_raster(&raster, &[]), SampleSummary::default());
    }

    #[test]
    fn test_sink_failure_is_non_fatal_and_footprint_stays_consumed() {
        let raster = full_disc_raster(100);
        let sink = MemorySink {
            fail: true,
            ..MemorySink::default()
        };
        let sampler = TrainingSampler::new(params(5), &sink);

        let summary = sampler.process_raster(&raster, &[storm(15.0, -55.0)]);
        // The sample still counts toward the negative target even though
        // nothing was persisted.
        assert_eq!(summary.positives, 1);
        assert!(sink.saved.borrow().is_empty());
    }
}
