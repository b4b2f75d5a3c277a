//! Batch driver: build a season's training set from GOES imagery and
//! IBTrACS storm tracks.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use stormcrop::io::{ibtracs, DiskSink, GoesFetcher};
use stormcrop::pipeline::{self, RunConfig};

#[derive(Parser, Debug)]
#[command(
    name = "stormcrop",
    version,
    about = "Extract labeled GOES image crops for tropical-cyclone detector training"
)]
struct Args {
    /// Storm season (year) to process
    #[arg(long, default_value_t = 2017)]
    year: i32,

    /// IBTrACS basin code (NA, EP, WP, ...)
    #[arg(long, default_value = "NA")]
    basin: String,

    /// Existing IBTrACS CSV; downloaded into the data directory when omitted
    #[arg(long)]
    track_file: Option<PathBuf>,

    /// Directory for cached downloads
    #[arg(long, env = "STORMCROP_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Root directory for the positive/ and negative/ sample trees
    #[arg(long, env = "STORMCROP_OUTPUT_DIR", default_value = "./data/training")]
    output_dir: PathBuf,

    /// GOES archive bucket
    #[arg(long, default_value = "noaa-goes16")]
    bucket: String,

    /// GOES product name
    #[arg(long, default_value = "ABI-L1b-RadF")]
    product: String,

    /// ABI band (13 = clean longwave infrared)
    #[arg(long, default_value_t = 13)]
    band: u8,

    /// Rendering density; the crop half-width is 1.5x this value
    #[arg(long, default_value_t = 166)]
    dpi: u32,

    /// Fixed RNG seed for reproducible negative sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Re-download the IBTrACS archive even when cached
    #[arg(long, default_value_t = false)]
    overwrite_tracks: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let started = Instant::now();

    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(ibtracs::default_data_dir);

    log::info!("reading validated IBTrACS data");
    let track_path = match &args.track_file {
        Some(path) => path.clone(),
        None => ibtracs::download_track_data(&args.basin, &data_dir, args.overwrite_tracks)
            .context("IBTrACS download failed")?,
    };
    let filter = ibtracs::TrackFilter::tropical_storms(args.year);
    let points = ibtracs::read_track_csv(&track_path, &filter)
        .with_context(|| format!("failed to read {}", track_path.display()))?;
    log::info!(
        "loaded {} tropical-storm track points for season {}",
        points.len(),
        args.year
    );

    let config = RunConfig {
        output_dir: args.output_dir,
        bucket: args.bucket,
        product: args.product,
        band: args.band,
        dpi: args.dpi,
        attempt_multiplier: 5,
        seed: args.seed,
    };

    let provider = GoesFetcher::new(&config.bucket, &config.product, config.band)
        .context("failed to build GOES client")?;
    let sink = DiskSink::new(&config.output_dir).context("failed to prepare output directories")?;

    let summary = pipeline::run(&config, &provider, &sink, &points);

    log::info!(
        "processed {} timestamps ({} failed): {} positive, {} negative samples",
        summary.timestamps,
        summary.failed,
        summary.positives,
        summary.negatives
    );
    log::info!("total time taken: {:.1}s", started.elapsed().as_secs_f64());
    Ok(())
}
