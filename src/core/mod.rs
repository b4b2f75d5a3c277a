//! Core sample-extraction algorithms

pub mod projection;
pub mod locate;
pub mod occupancy;
pub mod extract;
pub mod sampler;

// Re-export main types
pub use locate::locate;
pub use extract::extract;
pub use occupancy::OccupancyGrid;
pub use sampler::{SampleSink, SampleSummary, SamplerParams, TrainingSampler};
