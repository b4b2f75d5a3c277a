//! IBTrACS storm-track archive access
//!
//! Downloads the per-basin best-track CSV from NCEI and parses it into
//! [`TrackPoint`] rows. The file carries a units row directly under the
//! header, numeric columns with blank placeholders, and one row per
//! storm observation ordered by storm and time.

use crate::types::{StormError, StormResult, TrackPoint};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const IBTRACS_BASE_URL: &str = "https://www.ncei.noaa.gov/data/\
international-best-track-archive-for-climate-stewardship-ibtracs/\
v04r00/access/csv";

/// Default directory for cached track archives.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("stormcrop"))
        .unwrap_or_else(|| PathBuf::from("./data"))
}

/// Download the IBTrACS archive for a basin, reusing a cached copy
/// unless `overwrite` is set. Returns the local file path.
pub fn download_track_data(basin: &str, data_dir: &Path, overwrite: bool) -> StormResult<PathBuf> {
    std::fs::create_dir_all(data_dir)?;
    let path = data_dir.join(format!("ibtracs_{}.csv", basin));

    if path.exists() && !overwrite {
        log::info!(
            "IBTrACS file {} already exists, skipping download",
            path.display()
        );
        return Ok(path);
    }

    let url = format!("{}/ibtracs.{}.list.v04r00.csv", IBTRACS_BASE_URL, basin);
    log::info!("downloading IBTrACS {} archive from {}", basin, url);

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()?;
    let body = client.get(&url).send()?.error_for_status()?.bytes()?;
    std::fs::write(&path, &body)?;

    log::info!("saved {} bytes to {}", body.len(), path.display());
    Ok(path)
}

/// Row filter applied while reading the archive
#[derive(Debug, Clone)]
pub struct TrackFilter {
    pub season_start: i32,
    pub season_end: i32,
    /// Keep only rows with this nature code (e.g. "TS") when set
    pub nature: Option<String>,
}

impl TrackFilter {
    /// All tropical storms of one season.
    pub fn tropical_storms(season: i32) -> Self {
        Self {
            season_start: season,
            season_end: season,
            nature: Some("TS".to_string()),
        }
    }

    fn matches(&self, point: &TrackPoint) -> bool {
        if point.season < self.season_start || point.season > self.season_end {
            return false;
        }
        match &self.nature {
            Some(nature) => point.nature == *nature,
            None => true,
        }
    }
}

/// Raw CSV columns before numeric conversion
#[derive(Debug, Deserialize)]
struct RawTrackRow {
    #[serde(rename = "SID")]
    sid: String,
    #[serde(rename = "SEASON")]
    season: String,
    #[serde(rename = "NUMBER")]
    number: String,
    #[serde(rename = "NAME")]
    name: String,
    #[serde(rename = "ISO_TIME")]
    iso_time: String,
    #[serde(rename = "NATURE")]
    nature: String,
    #[serde(rename = "LAT")]
    lat: String,
    #[serde(rename = "LON")]
    lon: String,
    #[serde(rename = "WMO_WIND")]
    wmo_wind: String,
    #[serde(rename = "WMO_PRES")]
    wmo_pres: String,
}

/// Read and filter an IBTrACS CSV, preserving dataset row order.
///
/// The units row under the header is skipped; rows whose mandatory
/// numeric fields fail to parse are logged and dropped rather than
/// aborting the read.
pub fn read_track_csv(path: &Path, filter: &TrackFilter) -> StormResult<Vec<TrackPoint>> {
    log::info!("reading IBTrACS data from {}", path.display());

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut points = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        if index == 0 {
            // units row
            continue;
        }
        let raw: RawTrackRow = match record.deserialize(Some(&headers)) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("skipping malformed row {}: {}", index + 2, e);
                continue;
            }
        };
        let point = match parse_row(raw) {
            Ok(point) => point,
            Err(e) => {
                log::warn!("skipping row {}: {}", index + 2, e);
                continue;
            }
        };
        if filter.matches(&point) {
            points.push(point);
        }
    }

    log::info!("kept {} track points after filtering", points.len());
    Ok(points)
}

/// Group points by distinct timestamp in first-seen order.
pub fn group_by_time(points: &[TrackPoint]) -> Vec<(DateTime<Utc>, Vec<TrackPoint>)> {
    let mut order: Vec<DateTime<Utc>> = Vec::new();
    let mut groups: HashMap<DateTime<Utc>, Vec<TrackPoint>> = HashMap::new();

    for point in points {
        if !groups.contains_key(&point.time) {
            order.push(point.time);
        }
        groups.entry(point.time).or_default().push(point.clone());
    }

    order
        .into_iter()
        .map(|time| {
            let group = groups.remove(&time).unwrap_or_default();
            (time, group)
        })
        .collect()
}

fn parse_row(raw: RawTrackRow) -> StormResult<TrackPoint> {
    let time = NaiveDateTime::parse_from_str(raw.iso_time.trim(), "%Y-%m-%d %H:%M:%S")
        .map_err(|e| {
            StormError::InvalidFormat(format!("bad ISO_TIME {:?}: {}", raw.iso_time, e))
        })?
        .and_utc();

    Ok(TrackPoint {
        sid: raw.sid.trim().to_string(),
        season: parse_field("SEASON", &raw.season)?,
        number: parse_field("NUMBER", &raw.number)?,
        name: raw.name.trim().to_string(),
        time,
        nature: raw.nature.trim().to_string(),
        lat: parse_field("LAT", &raw.lat)?,
        lon: parse_field("LON", &raw.lon)?,
        wind: parse_optional(&raw.wmo_wind),
        pressure: parse_optional(&raw.wmo_pres),
    })
}

fn parse_field<T: std::str::FromStr>(column: &str, value: &str) -> StormResult<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| {
        StormError::InvalidFormat(format!("bad {} value {:?}: {}", column, value, e))
    })
}

/// Blank or unparsable optional columns become None.
fn parse_optional(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse().ok()
}
