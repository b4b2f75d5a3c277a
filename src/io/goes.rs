//! GOES full-disc scan retrieval
//!
//! Resolves a track timestamp to one canonical Level-1b radiance scan in
//! the public NOAA archive bucket: builds the hourly key prefix, lists
//! matching objects through the anonymous S3 REST interface, downloads
//! the first match, and decodes it into a [`Raster`] through GDAL's
//! netCDF driver without touching the local disk.

use crate::pipeline::RasterProvider;
use crate::types::{GeosProjection, Raster, StormError, StormResult};
use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use gdal::{Dataset, Metadata};
use ndarray::{Array1, Array2};
use serde::Deserialize;
use std::time::Duration;

/// One page of an S3 `list-type=2` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBucketResult {
    #[serde(default)]
    contents: Vec<ListEntry>,
    is_truncated: bool,
    next_continuation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListEntry {
    key: String,
}

/// Fetches and decodes GOES ABI scans from a public archive bucket
pub struct GoesFetcher {
    bucket: String,
    product: String,
    band: u8,
    client: reqwest::blocking::Client,
}

impl GoesFetcher {
    pub fn new(bucket: &str, product: &str, band: u8) -> StormResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(600))
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            bucket: bucket.to_string(),
            product: product.to_string(),
            band,
            client,
        })
    }

    /// ABI scan mode in effect at the given time. Mode 3 was the default
    /// full-disc cadence until 2019-04-02T16:00Z, mode 6 after.
    pub fn scan_mode(timestamp: DateTime<Utc>) -> &'static str {
        let cutover = Utc.with_ymd_and_hms(2019, 4, 2, 16, 0, 0).unwrap();
        if timestamp < cutover {
            "M3"
        } else {
            "M6"
        }
    }

    /// Object key prefix selecting the hour's scans for this product and
    /// band: `{product}/{year}/{day-of-year}/{hour}/OR_{product}-{mode}C{band}`.
    pub fn hourly_prefix(&self, timestamp: DateTime<Utc>) -> String {
        format!(
            "{}/{}/{:03}/{:02}/OR_{}-{}C{:02}",
            self.product,
            timestamp.year(),
            timestamp.ordinal(),
            timestamp.hour(),
            self.product,
            Self::scan_mode(timestamp),
            self.band
        )
    }

    /// All object keys under a prefix, following continuation tokens
    /// across pages.
    pub fn list_keys(&self, prefix: &str) -> StormResult<Vec<String>> {
        let url = format!("https://{}.s3.amazonaws.com/", self.bucket);
        let mut keys = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&url)
                .query(&[("list-type", "2"), ("prefix", prefix)]);
            if let Some(t) = &token {
                request = request.query(&[("continuation-token", t.as_str())]);
            }
            let body = request.send()?.error_for_status()?.text()?;
            let page = parse_list_response(&body)?;

            keys.extend(page.contents.into_iter().map(|entry| entry.key));
            if !page.is_truncated {
                break;
            }
            token = page.next_continuation_token;
            if token.is_none() {
                break;
            }
        }
        Ok(keys)
    }

    fn download(&self, key: &str) -> StormResult<Vec<u8>> {
        let url = format!("https://{}.s3.amazonaws.com/{}", self.bucket, key);
        log::debug!("downloading {}", url);
        let bytes = self.client.get(&url).send()?.error_for_status()?.bytes()?;
        log::debug!("downloaded {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }

    /// Decode a netCDF scan held in memory into a [`Raster`].
    fn decode(&self, bytes: Vec<u8>, timestamp: DateTime<Utc>) -> StormResult<Raster> {
        let vsi_path = format!("/vsimem/stormcrop_{}.nc", timestamp.format("%Y%m%d%H"));
        gdal::vsi::create_mem_file(&vsi_path, bytes)?;
        let result = read_radiance(&vsi_path, timestamp);
        let _ = gdal::vsi::unlink_mem_file(&vsi_path);
        result
    }
}

impl RasterProvider for GoesFetcher {
    fn fetch(&self, timestamp: DateTime<Utc>) -> StormResult<Raster> {
        let prefix = self.hourly_prefix(timestamp);
        log::debug!("listing s3://{}/{}", self.bucket, prefix);

        let keys = self.list_keys(&prefix)?;
        // The first key listed within the hour is taken as the canonical
        // scan for that timestamp.
        let key = keys.first().ok_or_else(|| {
            StormError::Retrieval(format!(
                "no scan found in {} under prefix {}",
                self.bucket, prefix
            ))
        })?;
        log::debug!("selected scan {}", key);

        let bytes = self.download(key)?;
        self.decode(bytes, timestamp)
    }
}

fn parse_list_response(body: &str) -> StormResult<ListBucketResult> {
    quick_xml::de::from_str(body)
        .map_err(|e| StormError::InvalidFormat(format!("S3 listing parse failed: {}", e)))
}

/// Read the radiance subdataset plus coordinate axes and projection
/// attributes from a netCDF file.
fn read_radiance(path: &str, timestamp: DateTime<Utc>) -> StormResult<Raster> {
    let dataset = Dataset::open(format!("NETCDF:\"{}\":Rad", path))?;
    let (width, height) = dataset.raster_size();
    log::debug!("scan size: {}x{}", width, height);

    let band = dataset.rasterband(1)?;
    let nodata = band.no_data_value();
    let scale = band.scale().unwrap_or(1.0) as f32;
    let offset = band.offset().unwrap_or(0.0) as f32;

    let raw = band.read_as::<f32>((0, 0), (width, height), (width, height), None)?;
    let mut data = Array2::from_shape_vec((height, width), raw.data)
        .map_err(|e| StormError::Processing(format!("failed to reshape radiance grid: {}", e)))?;
    data.mapv_inplace(|v| {
        if nodata.map_or(false, |nd| (v as f64 - nd).abs() < 1e-6) {
            f32::NAN
        } else {
            v * scale + offset
        }
    });

    let projection = read_projection(&dataset)?;

    let transform = dataset.geo_transform()?;
    let mut x = Array1::from_vec(
        (0..width)
            .map(|i| transform[0] + (i as f64 + 0.5) * transform[1])
            .collect(),
    );
    let mut y = Array1::from_vec(
        (0..height)
            .map(|j| transform[3] + (j as f64 + 0.5) * transform[5])
            .collect(),
    );

    // The file stores scanning angles in radians; planar coordinates are
    // the angle multiplied by the satellite height. Axes already in
    // meters (newer GDAL netCDF drivers convert) are left alone.
    let span = x
        .iter()
        .chain(y.iter())
        .fold(0.0_f64, |m, v| m.max(v.abs()));
    if span < 1.0 {
        x.mapv_inplace(|v| v * projection.perspective_height);
        y.mapv_inplace(|v| v * projection.perspective_height);
    }

    Ok(Raster {
        data,
        x,
        y,
        projection,
        timestamp,
    })
}

/// Projection parameters from the scan's `goes_imager_projection`
/// container variable.
fn read_projection(dataset: &Dataset) -> StormResult<GeosProjection> {
    let attr = |name: &str| -> StormResult<f64> {
        let item = format!("goes_imager_projection#{}", name);
        let value = dataset
            .metadata_item(&item, "")
            .ok_or_else(|| StormError::Metadata(format!("missing attribute {}", item)))?;
        value
            .trim()
            .parse::<f64>()
            .map_err(|e| StormError::Metadata(format!("bad attribute {}={:?}: {}", item, value, e)))
    };

    let sweep = dataset
        .metadata_item("goes_imager_projection#sweep_angle_axis", "")
        .unwrap_or_else(|| "x".to_string());

    Ok(GeosProjection {
        perspective_height: attr("perspective_point_height")?,
        lon_origin: attr("longitude_of_projection_origin")?,
        sweep: sweep.parse()?,
        semi_major_axis: attr("semi_major_axis")?,
        semi_minor_axis: attr("semi_minor_axis")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> GoesFetcher {
        GoesFetcher::new("noaa-goes16", "ABI-L1b-RadF", 13).expect("client")
    }

    #[test]
    fn test_scan_mode_cutover() {
        let before = Utc.with_ymd_and_hms(2017, 9, 6, 12, 0, 0).unwrap();
        let last_m3 = Utc.with_ymd_and_hms(2019, 4, 2, 15, 59, 59).unwrap();
        let first_m6 = Utc.with_ymd_and_hms(2019, 4, 2, 16, 0, 0).unwrap();
        assert_eq!(GoesFetcher::scan_mode(before), "M3");
        assert_eq!(GoesFetcher::scan_mode(last_m3), "M3");
        assert_eq!(GoesFetcher::scan_mode(first_m6), "M6");
    }

    #[test]
    fn test_hourly_prefix_layout() {
        // 2017-09-06 is day 249 of a non-leap year.
        let ts = Utc.with_ymd_and_hms(2017, 9, 6, 12, 0, 0).unwrap();
        assert_eq!(
            fetcher().hourly_prefix(ts),
            "ABI-L1b-RadF/2017/249/12/OR_ABI-L1b-RadF-M3C13"
        );
    }

    #[test]
    fn test_hourly_prefix_pads_day_and_hour() {
        let ts = Utc.with_ymd_and_hms(2018, 1, 2, 3, 0, 0).unwrap();
        assert_eq!(
            fetcher().hourly_prefix(ts),
            "ABI-L1b-RadF/2018/002/03/OR_ABI-L1b-RadF-M3C13"
        );
    }

    #[test]
    fn test_parse_list_response_single_page() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>noaa-goes16</Name>
  <Prefix>ABI-L1b-RadF/2017/249/12/OR_ABI-L1b-RadF-M3C13</Prefix>
  <KeyCount>2</KeyCount>
  <MaxKeys>1000</MaxKeys>
  <IsTruncated>false</IsTruncated>
  <Contents>
    <Key>ABI-L1b-RadF/2017/249/12/OR_ABI-L1b-RadF-M3C13_G16_s20172491200377.nc</Key>
    <Size>1</Size>
  </Contents>
  <Contents>
    <Key>ABI-L1b-RadF/2017/249/12/OR_ABI-L1b-RadF-M3C13_G16_s20172491215377.nc</Key>
    <Size>1</Size>
  </Contents>
</ListBucketResult>"#;

        let page = parse_list_response(body).expect("parse");
        assert!(!page.is_truncated);
        assert_eq!(page.next_continuation_token, None);
        assert_eq!(page.contents.len(), 2);
        assert!(page.contents[0].key.contains("s20172491200377"));
    }

    #[test]
    fn test_parse_list_response_truncated_page() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <IsTruncated>true</IsTruncated>
  <NextContinuationToken>1dkA9+token==</NextContinuationToken>
  <Contents><Key>a</Key></Contents>
</ListBucketResult>"#;

        let page = parse_list_response(body).expect("parse");
        assert!(page.is_truncated);
        assert_eq!(
            page.next_continuation_token.as_deref(),
            Some("1dkA9+token==")
        );
    }

    #[test]
    fn test_parse_list_response_empty_listing() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <KeyCount>0</KeyCount>
  <IsTruncated>false</IsTruncated>
</ListBucketResult>"#;

        let page = parse_list_response(body).expect("parse");
        assert!(page.contents.is_empty());
    }

    #[test]
    fn test_parse_list_response_rejects_garbage() {
        assert!(parse_list_response("not xml at all").is_err());
    }
}
