use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Radiance/reflectance grid values
pub type GridValue = f32;

/// 2D raster data array (rows x columns)
pub type GridData = Array2<GridValue>;

/// Sweep angle axis of a geostationary imager
///
/// GOES ABI sweeps along the x axis; Meteosat SEVIRI sweeps along y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepAxis {
    X,
    Y,
}

impl std::fmt::Display for SweepAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SweepAxis::X => write!(f, "x"),
            SweepAxis::Y => write!(f, "y"),
        }
    }
}

impl FromStr for SweepAxis {
    type Err = StormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "x" => Ok(SweepAxis::X),
            "y" => Ok(SweepAxis::Y),
            other => Err(StormError::InvalidFormat(format!(
                "unknown sweep angle axis: {:?}",
                other
            ))),
        }
    }
}

/// Geostationary projection parameters of a full-disc scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeosProjection {
    /// Satellite height above the ellipsoid, meters
    pub perspective_height: f64,
    /// Longitude of the projection origin (sub-satellite point), degrees
    pub lon_origin: f64,
    pub sweep: SweepAxis,
    /// Ellipsoid semi-major axis, meters
    pub semi_major_axis: f64,
    /// Ellipsoid semi-minor axis, meters
    pub semi_minor_axis: f64,
}

/// A full-disc satellite raster with projected coordinate axes
///
/// `x` and `y` hold the planar coordinate of each column/row center in
/// meters (scan angle multiplied by satellite height). The grid is owned
/// by one timestamp's processing iteration and dropped at its end.
#[derive(Debug, Clone)]
pub struct Raster {
    /// Radiance grid, ny rows x nx columns
    pub data: GridData,
    /// Planar x coordinate per column, length nx
    pub x: Array1<f64>,
    /// Planar y coordinate per row, length ny
    pub y: Array1<f64>,
    pub projection: GeosProjection,
    pub timestamp: DateTime<Utc>,
}

impl Raster {
    /// Grid dimensions as (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }
}

/// One labeled storm-track observation from the IBTrACS archive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackPoint {
    pub sid: String,
    pub season: i32,
    pub number: u32,
    pub name: String,
    pub time: DateTime<Utc>,
    /// Storm nature code (TS = tropical storm)
    pub nature: String,
    pub lat: f64,
    pub lon: f64,
    pub wind: Option<f64>,
    pub pressure: Option<f64>,
}

/// Training-sample category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleKind {
    /// Crop centered on a known storm location
    Positive,
    /// Crop from a random location overlapping no other sample
    Negative,
}

impl SampleKind {
    /// Artifact subdirectory for this category
    pub fn dir_name(self) -> &'static str {
        match self {
            SampleKind::Positive => "positive",
            SampleKind::Negative => "negative",
        }
    }
}

impl std::fmt::Display for SampleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// A square sub-grid cut from a raster, clipped to raster bounds
#[derive(Debug, Clone)]
pub struct Crop {
    /// Center row index in the source raster
    pub row: usize,
    /// Center column index in the source raster
    pub col: usize,
    /// Half-width of the requested window, pixels
    pub buffer: usize,
    pub data: GridData,
}

impl Crop {
    /// Deterministic artifact naming key: `{stamp}_{col:05}_{row:05}_{buffer}`
    pub fn naming_key(&self, timestamp: &DateTime<Utc>) -> String {
        format!(
            "{}_{:05}_{:05}_{}",
            timestamp.format("%Y%m%d_%HZ"),
            self.col,
            self.row,
            self.buffer
        )
    }
}

/// Error types for sample extraction
#[derive(Debug, thiserror::Error)]
pub enum StormError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("retrieval failed: {0}")]
    Retrieval(String),

    #[error("invalid data format: {0}")]
    InvalidFormat(String),

    #[error("metadata error: {0}")]
    Metadata(String),

    #[error("processing error: {0}")]
    Processing(String),
}

/// Result type for sample-extraction operations
pub type StormResult<T> = Result<T, StormError>;
