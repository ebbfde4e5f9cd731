//! Grid arithmetic for the tile pyramid.
//!
//! Rows count northward from the grid origin latitude and columns count
//! eastward from the origin longitude. Both are zero-based.

use crate::geo::GeoError;

fn check_delta(delta: f64) -> Result<(), GeoError> {
    if !delta.is_finite() || delta <= 0.0 {
        return Err(GeoError::InvalidDelta(delta));
    }
    Ok(())
}

fn to_index(value: f64) -> Result<u32, GeoError> {
    let index = value.floor();
    if index < 0.0 {
        return Err(GeoError::NegativeIndex(index as i64));
    }
    Ok(index as u32)
}

/// Row containing `lat` for tiles `delta` degrees tall.
///
/// A latitude exactly 180° above the origin (the north pole for the
/// default origin) belongs to the last row rather than a row past it.
pub fn compute_row(delta: f64, lat: f64, origin_lat: f64) -> Result<u32, GeoError> {
    check_delta(delta)?;
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(GeoError::InvalidLatitude(lat));
    }

    let offset = lat - origin_lat;
    let row = to_index(offset / delta)?;
    if offset == 180.0 && row > 0 {
        Ok(row - 1)
    } else {
        Ok(row)
    }
}

/// Column containing `lon` for tiles `delta` degrees wide.
///
/// Longitudes west of the origin wrap around by 360°. A longitude exactly
/// 360° east of the origin belongs to the last column.
pub fn compute_column(delta: f64, lon: f64, origin_lon: f64) -> Result<u32, GeoError> {
    check_delta(delta)?;
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(GeoError::InvalidLongitude(lon));
    }

    let mut offset = lon - origin_lon;
    if offset < 0.0 {
        offset += 360.0;
    }
    let col = to_index(offset / delta)?;
    if offset == 360.0 && col > 0 {
        Ok(col - 1)
    } else {
        Ok(col)
    }
}

/// Southern edge of `row`.
pub fn row_latitude(row: i64, delta: f64, origin_lat: f64) -> Result<f64, GeoError> {
    check_delta(delta)?;
    if row < 0 {
        return Err(GeoError::NegativeIndex(row));
    }
    Ok(origin_lat + row as f64 * delta)
}

/// Western edge of `col`.
pub fn column_longitude(col: i64, delta: f64, origin_lon: f64) -> Result<f64, GeoError> {
    check_delta(delta)?;
    if col < 0 {
        return Err(GeoError::NegativeIndex(col));
    }
    Ok(origin_lon + col as f64 * delta)
}
