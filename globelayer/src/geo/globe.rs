//! Globe model.
//!
//! Cartesian frame: +Y through the north pole, +Z through (0°, 0°),
//! +X through (0°, 90°E).

use glam::DVec3;

use super::types::{LatLon, Sector};

/// WGS84 equatorial radius in meters.
pub const WGS84_EQUATORIAL_RADIUS: f64 = 6_378_137.0;

/// Shape and terrain of the body the layer is draped over.
pub trait Globe: Send + Sync {
    /// Radius used to convert angular texel sizes to meters.
    fn radius(&self) -> f64;

    /// Cartesian point for a geographic position at the given elevation.
    fn point_at(&self, position: LatLon, elevation: f64) -> DVec3;

    /// Geographic position and elevation of a Cartesian point.
    fn position_of(&self, point: DVec3) -> (LatLon, f64);

    /// Terrain elevation at a position in meters.
    fn elevation_at(&self, _position: LatLon) -> f64 {
        0.0
    }

    /// Lowest and highest terrain elevation inside a sector.
    fn elevation_range(&self, _sector: &Sector) -> (f64, f64) {
        (0.0, 0.0)
    }
}

/// A smooth sphere without terrain.
#[derive(Debug, Clone, Copy)]
pub struct SphericalGlobe {
    radius: f64,
}

impl SphericalGlobe {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }

    /// Earth-sized sphere using the WGS84 equatorial radius.
    pub fn earth() -> Self {
        Self::new(WGS84_EQUATORIAL_RADIUS)
    }
}

impl Default for SphericalGlobe {
    fn default() -> Self {
        Self::earth()
    }
}

impl Globe for SphericalGlobe {
    fn radius(&self) -> f64 {
        self.radius
    }

    fn point_at(&self, position: LatLon, elevation: f64) -> DVec3 {
        let lat = position.lat_radians();
        let lon = position.lon_radians();
        let r = self.radius + elevation;
        let cos_lat = lat.cos();
        DVec3::new(
            r * cos_lat * lon.sin(),
            r * lat.sin(),
            r * cos_lat * lon.cos(),
        )
    }

    fn position_of(&self, point: DVec3) -> (LatLon, f64) {
        let r = point.length();
        if r == 0.0 {
            return (LatLon::new(0.0, 0.0), -self.radius);
        }
        let lat = (point.y / r).clamp(-1.0, 1.0).asin().to_degrees();
        let lon = point.x.atan2(point.z).to_degrees();
        (LatLon::new(lat, lon), r - self.radius)
    }
}
