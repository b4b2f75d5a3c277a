//! stormcrop: labeled training-sample extraction from GOES imagery
//!
//! Builds image-crop training sets for a tropical-cyclone detector: maps
//! IBTrACS storm-center coordinates onto GOES full-disc scans through the
//! geostationary projection, cuts a positive crop around each storm, and
//! draws an equal number of non-overlapping negative crops from the rest
//! of the disc.

pub mod types;
pub mod io;
pub mod core;
pub mod pipeline;

// Re-export main types and functions for easier access
pub use types::{
    Crop, GeosProjection, GridData, Raster, SampleKind, StormError, StormResult, SweepAxis,
    TrackPoint,
};

pub use crate::core::{
    extract, locate, OccupancyGrid, SampleSink, SampleSummary, SamplerParams, TrainingSampler,
};
pub use io::{DiskSink, GoesFetcher};
pub use pipeline::{run, RasterProvider, RunConfig, RunSummary};
