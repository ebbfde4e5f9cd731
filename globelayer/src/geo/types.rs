//! Core geographic types.

use std::fmt;

/// Minimum latitude in degrees.
pub const MIN_LAT: f64 = -90.0;
/// Maximum latitude in degrees.
pub const MAX_LAT: f64 = 90.0;
/// Minimum longitude in degrees.
pub const MIN_LON: f64 = -180.0;
/// Maximum longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Errors raised when constructing geographic values.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoError {
    /// Latitude outside [-90, 90] or not finite
    InvalidLatitude(f64),
    /// Longitude outside [-180, 180] or not finite
    InvalidLongitude(f64),
    /// Sector whose minimum exceeds its maximum
    InvalidSector {
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    },
    /// Grid spacing that is zero, negative or not finite
    InvalidDelta(f64),
    /// Grid index below zero
    NegativeIndex(i64),
}

impl fmt::Display for GeoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoError::InvalidLatitude(lat) => write!(f, "Invalid latitude: {}", lat),
            GeoError::InvalidLongitude(lon) => write!(f, "Invalid longitude: {}", lon),
            GeoError::InvalidSector {
                min_lat,
                max_lat,
                min_lon,
                max_lon,
            } => write!(
                f,
                "Invalid sector: lat [{}, {}], lon [{}, {}]",
                min_lat, max_lat, min_lon, max_lon
            ),
            GeoError::InvalidDelta(delta) => write!(f, "Invalid grid delta: {}", delta),
            GeoError::NegativeIndex(index) => write!(f, "Negative grid index: {}", index),
        }
    }
}

impl std::error::Error for GeoError {}

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    /// Creates a position without range validation.
    ///
    /// Also used for angular spans such as tile deltas, which are not
    /// positions and may exceed the longitude range.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Creates a position, rejecting values outside the valid ranges.
    pub fn checked(lat: f64, lon: f64) -> Result<Self, GeoError> {
        if !lat.is_finite() || !(MIN_LAT..=MAX_LAT).contains(&lat) {
            return Err(GeoError::InvalidLatitude(lat));
        }
        if !lon.is_finite() || !(MIN_LON..=MAX_LON).contains(&lon) {
            return Err(GeoError::InvalidLongitude(lon));
        }
        Ok(Self { lat, lon })
    }

    pub fn lat_radians(&self) -> f64 {
        self.lat.to_radians()
    }

    pub fn lon_radians(&self) -> f64 {
        self.lon.to_radians()
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}°, {:.6}°)", self.lat, self.lon)
    }
}

/// An axis-aligned latitude/longitude rectangle, in degrees.
///
/// Edges are inclusive: two sectors that share only an edge intersect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sector {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl Sector {
    /// The whole globe.
    pub const FULL_SPHERE: Sector = Sector {
        min_lat: MIN_LAT,
        max_lat: MAX_LAT,
        min_lon: MIN_LON,
        max_lon: MAX_LON,
    };

    /// Creates a sector from degree bounds.
    ///
    /// Bounds must be finite, inside the valid ranges, and ordered.
    pub fn from_degrees(
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    ) -> Result<Self, GeoError> {
        LatLon::checked(min_lat, min_lon)?;
        LatLon::checked(max_lat, max_lon)?;
        if min_lat > max_lat || min_lon > max_lon {
            return Err(GeoError::InvalidSector {
                min_lat,
                max_lat,
                min_lon,
                max_lon,
            });
        }
        Ok(Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    /// Creates a sector from grid arithmetic without validation.
    ///
    /// Tile sectors near the antimeridian or poles may extend slightly
    /// past the valid ranges when the grid does not divide evenly.
    pub(crate) const fn from_degrees_unchecked(
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    ) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }

    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    pub fn delta_lat(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn delta_lon(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn centroid(&self) -> LatLon {
        LatLon::new(
            0.5 * (self.min_lat + self.max_lat),
            0.5 * (self.min_lon + self.max_lon),
        )
    }

    /// Corners in SW, SE, NE, NW order.
    pub fn corners(&self) -> [LatLon; 4] {
        [
            LatLon::new(self.min_lat, self.min_lon),
            LatLon::new(self.min_lat, self.max_lon),
            LatLon::new(self.max_lat, self.max_lon),
            LatLon::new(self.max_lat, self.min_lon),
        ]
    }

    pub fn contains(&self, position: LatLon) -> bool {
        position.lat >= self.min_lat
            && position.lat <= self.max_lat
            && position.lon >= self.min_lon
            && position.lon <= self.max_lon
    }

    pub fn contains_sector(&self, other: &Sector) -> bool {
        other.min_lat >= self.min_lat
            && other.max_lat <= self.max_lat
            && other.min_lon >= self.min_lon
            && other.max_lon <= self.max_lon
    }

    pub fn intersects(&self, other: &Sector) -> bool {
        !(other.max_lon < self.min_lon
            || other.min_lon > self.max_lon
            || other.max_lat < self.min_lat
            || other.min_lat > self.max_lat)
    }

    /// Like `intersects`, but sectors that only share an edge or corner
    /// do not overlap.
    pub fn overlaps(&self, other: &Sector) -> bool {
        other.min_lon < self.max_lon
            && other.max_lon > self.min_lon
            && other.min_lat < self.max_lat
            && other.max_lat > self.min_lat
    }

    /// Returns the overlapping region, or `None` when the sectors are disjoint.
    pub fn intersection(&self, other: &Sector) -> Option<Sector> {
        if !self.intersects(other) {
            return None;
        }
        Some(Sector {
            min_lat: self.min_lat.max(other.min_lat),
            max_lat: self.max_lat.min(other.max_lat),
            min_lon: self.min_lon.max(other.min_lon),
            max_lon: self.max_lon.min(other.max_lon),
        })
    }

    /// Splits the sector at its centroid.
    ///
    /// Returned in SW, SE, NW, NE order, which matches the row/column order
    /// of child tiles: (2r, 2c), (2r, 2c+1), (2r+1, 2c), (2r+1, 2c+1).
    pub fn subdivide(&self) -> [Sector; 4] {
        let mid = self.centroid();
        [
            Sector::from_degrees_unchecked(self.min_lat, mid.lat, self.min_lon, mid.lon),
            Sector::from_degrees_unchecked(self.min_lat, mid.lat, mid.lon, self.max_lon),
            Sector::from_degrees_unchecked(mid.lat, self.max_lat, self.min_lon, mid.lon),
            Sector::from_degrees_unchecked(mid.lat, self.max_lat, mid.lon, self.max_lon),
        ]
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.6}°, {:.6}°] x [{:.6}°, {:.6}°]",
            self.min_lat, self.max_lat, self.min_lon, self.max_lon
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_rejects_inverted_bounds() {
        let result = Sector::from_degrees(10.0, -10.0, 0.0, 10.0);
        assert!(matches!(result, Err(GeoError::InvalidSector { .. })));
    }

    #[test]
    fn test_sector_rejects_out_of_range_latitude() {
        let result = Sector::from_degrees(-91.0, 0.0, 0.0, 10.0);
        assert!(matches!(result, Err(GeoError::InvalidLatitude(_))));
    }

    #[test]
    fn test_sector_rejects_nan() {
        let result = Sector::from_degrees(0.0, 10.0, f64::NAN, 10.0);
        assert!(matches!(result, Err(GeoError::InvalidLongitude(_))));
    }

    #[test]
    fn test_touching_sectors_intersect() {
        let west = Sector::from_degrees(0.0, 10.0, 0.0, 10.0).unwrap();
        let east = Sector::from_degrees(0.0, 10.0, 10.0, 20.0).unwrap();
        assert!(west.intersects(&east));

        let far = Sector::from_degrees(0.0, 10.0, 10.5, 20.0).unwrap();
        assert!(!west.intersects(&far));
    }

    #[test]
    fn test_touching_sectors_do_not_overlap() {
        let west = Sector::from_degrees(0.0, 10.0, 0.0, 10.0).unwrap();
        let east = Sector::from_degrees(0.0, 10.0, 10.0, 20.0).unwrap();
        assert!(!west.overlaps(&east));
        assert!(!east.overlaps(&west));

        let corner = Sector::from_degrees(10.0, 20.0, 10.0, 20.0).unwrap();
        assert!(!west.overlaps(&corner));

        let shifted = Sector::from_degrees(5.0, 15.0, 9.5, 20.0).unwrap();
        assert!(west.overlaps(&shifted));
    }

    #[test]
    fn test_intersection() {
        let a = Sector::from_degrees(0.0, 10.0, 0.0, 10.0).unwrap();
        let b = Sector::from_degrees(5.0, 20.0, -5.0, 5.0).unwrap();
        let i = a.intersection(&b).unwrap();
        assert_eq!(i, Sector::from_degrees(5.0, 10.0, 0.0, 5.0).unwrap());
    }

    #[test]
    fn test_subdivide_order_and_coverage() {
        let s = Sector::from_degrees(0.0, 36.0, 0.0, 36.0).unwrap();
        let [sw, se, nw, ne] = s.subdivide();

        assert_eq!(sw, Sector::from_degrees(0.0, 18.0, 0.0, 18.0).unwrap());
        assert_eq!(se, Sector::from_degrees(0.0, 18.0, 18.0, 36.0).unwrap());
        assert_eq!(nw, Sector::from_degrees(18.0, 36.0, 0.0, 18.0).unwrap());
        assert_eq!(ne, Sector::from_degrees(18.0, 36.0, 18.0, 36.0).unwrap());
    }

    #[test]
    fn test_centroid() {
        let s = Sector::from_degrees(-10.0, 30.0, 100.0, 120.0).unwrap();
        assert_eq!(s.centroid(), LatLon::new(10.0, 110.0));
    }
}
