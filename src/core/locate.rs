//! Nearest-pixel search against raster coordinate axes

use crate::types::Raster;
use ndarray::ArrayView1;

/// Resolve planar coordinates to the nearest raster pixel.
///
/// Searches `x` against the raster's x axis and `y` against its y axis
/// independently for the minimum absolute difference, with the first
/// occurrence winning ties. Non-finite axis entries are skipped, matching
/// NaN-masked coordinate variables in the source scan.
///
/// Returns `None` for non-finite planar input (a track point outside the
/// visible disc projects to extreme or NaN coordinates); callers treat
/// that the same as an empty crop and skip the point.
pub fn locate(raster: &Raster, x: f64, y: f64) -> Option<(usize, usize)> {
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    let col = nearest_index(raster.x.view(), x)?;
    let row = nearest_index(raster.y.view(), y)?;
    Some((row, col))
}

/// Index of the axis value closest to `target`, skipping non-finite entries.
fn nearest_index(axis: ArrayView1<'_, f64>, target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &value) in axis.iter().enumerate() {
        if !value.is_finite() {
            continue;
        }
        let distance = (value - target).abs();
        match best {
            Some((_, b)) if distance >= b => {}
            _ => best = Some((i, distance)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GeosProjection, SweepAxis};
    use chrono::{TimeZone, Utc};
    use ndarray::{Array1, Array2};

    fn test_raster(x: Vec<f64>, y: Vec<f64>) -> Raster {
        let (nx, ny) = (x.len(), y.len());
        Raster {
            data: Array2::zeros((ny, nx)),
            x: Array1::from_vec(x),
            y: Array1::from_vec(y),
            projection: GeosProjection {
                perspective_height: 35_786_023.0,
                lon_origin: -75.0,
                sweep: SweepAxis::X,
                semi_major_axis: 6_378_137.0,
                semi_minor_axis: 6_356_752.31414,
            },
            timestamp: Utc.with_ymd_and_hms(2017, 9, 6, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_nearest_value_per_axis() {
        let raster = test_raster(vec![0.0, 10.0, 20.0, 30.0], vec![100.0, 50.0, 0.0]);
        assert_eq!(locate(&raster, 12.0, 55.0), Some((1, 1)));
        assert_eq!(locate(&raster, 29.0, 99.0), Some((0, 3)));
    }

    #[test]
    fn test_tie_break_is_first_occurrence() {
        // 5.0 is equidistant from 0.0 and 10.0; the lower index wins.
        let raster = test_raster(vec![0.0, 10.0], vec![0.0, 10.0]);
        assert_eq!(locate(&raster, 5.0, 5.0), Some((0, 0)));
    }

    #[test]
    fn test_nan_axis_entries_are_skipped() {
        let raster = test_raster(vec![f64::NAN, 10.0, 20.0], vec![0.0, f64::NAN]);
        assert_eq!(locate(&raster, 0.0, 100.0), Some((0, 1)));
    }

    #[test]
    fn test_non_finite_input_is_rejected() {
        let raster = test_raster(vec![0.0, 10.0], vec![0.0, 10.0]);
        assert_eq!(locate(&raster, f64::NAN, 5.0), None);
        assert_eq!(locate(&raster, f64::INFINITY, 5.0), None);
        assert_eq!(locate(&raster, 5.0, f64::NEG_INFINITY), None);
    }

    #[test]
    fn test_all_nan_axis_yields_none() {
        let raster = test_raster(vec![f64::NAN, f64::NAN], vec![0.0, 10.0]);
        assert_eq!(locate(&raster, 5.0, 5.0), None);
    }
}
