//! Per-frame view state.

use std::sync::Arc;

use chrono::Utc;
use glam::DVec3;

use crate::geo::{Frustum, Globe, LatLon, Sector, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

/// Everything the layer needs to know about the current frame.
#[derive(Clone)]
pub struct ViewState {
    pub globe: Arc<dyn Globe>,
    pub eye_point: DVec3,
    pub frustum: Frustum,
    /// Horizontal field of view in degrees
    pub field_of_view: f64,
    /// Surface position under the centre of the viewport, if on the globe
    pub viewport_center: Option<LatLon>,
    /// Conservative bound of the visible surface, if known
    pub visible_sector: Option<Sector>,
    pub vertical_exaggeration: f64,
    /// Frame time in ms since the Unix epoch
    pub timestamp: i64,
}

impl ViewState {
    pub fn new(globe: Arc<dyn Globe>, eye_point: DVec3, frustum: Frustum, field_of_view: f64) -> Self {
        Self {
            globe,
            eye_point,
            frustum,
            field_of_view,
            viewport_center: None,
            visible_sector: None,
            vertical_exaggeration: 1.0,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// A camera `altitude` meters above `position` looking straight down,
    /// with north up.
    ///
    /// The viewport centre is `position` and the visible sector is the
    /// region within the horizon.
    pub fn looking_down(
        globe: Arc<dyn Globe>,
        position: LatLon,
        altitude: f64,
        field_of_view: f64,
        aspect: f64,
    ) -> Self {
        let altitude = altitude.max(1.0);
        let eye = globe.point_at(position, altitude);
        let target = globe.point_at(position, 0.0);

        let (lat, lon) = (position.lat_radians(), position.lon_radians());
        let north = DVec3::new(-lat.sin() * lon.sin(), lat.cos(), -lat.sin() * lon.cos());

        let radius = globe.radius();
        let horizon = ((radius + altitude).powi(2) - radius * radius).sqrt();
        let near = (altitude * 0.01).max(1.0);
        let far = horizon + radius * 0.1;

        let half_x = (field_of_view.to_radians() * 0.5).tan();
        let fov_y = 2.0 * (half_x / aspect.max(1e-6)).atan();
        let frustum = Frustum::perspective(eye, target, north, fov_y.to_degrees(), aspect, near, far);

        let mut view = Self::new(globe, eye, frustum, field_of_view);
        view.viewport_center = Some(position);
        view.visible_sector = Some(horizon_sector(position, altitude, radius));
        view
    }

    pub fn with_viewport_center(mut self, center: Option<LatLon>) -> Self {
        self.viewport_center = center;
        self
    }

    pub fn with_visible_sector(mut self, sector: Option<Sector>) -> Self {
        self.visible_sector = sector;
        self
    }

    pub fn with_vertical_exaggeration(mut self, exaggeration: f64) -> Self {
        self.vertical_exaggeration = exaggeration;
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Eye position and altitude above the globe.
    pub fn eye_position(&self) -> (LatLon, f64) {
        self.globe.position_of(self.eye_point)
    }

    /// Point request priorities are measured from: the surface under the
    /// viewport centre, or the eye when the centre is off the globe.
    pub fn reference_point(&self) -> DVec3 {
        match self.viewport_center {
            Some(center) => {
                let elevation = self.globe.elevation_at(center) * self.vertical_exaggeration;
                self.globe.point_at(center, elevation)
            }
            None => self.eye_point,
        }
    }
}

/// Sector containing every surface point visible from `altitude` above
/// `position` on a sphere.
fn horizon_sector(position: LatLon, altitude: f64, radius: f64) -> Sector {
    let reach = (radius / (radius + altitude)).clamp(-1.0, 1.0).acos().to_degrees();
    let min_lat = (position.lat - reach).max(MIN_LAT);
    let max_lat = (position.lat + reach).min(MAX_LAT);

    let (min_lon, max_lon) = if max_lat >= MAX_LAT || min_lat <= MIN_LAT {
        (MIN_LON, MAX_LON)
    } else {
        let widest = position.lat.abs() + reach;
        let half = reach / widest.to_radians().cos();
        let (west, east) = (position.lon - half, position.lon + half);
        if half >= 180.0 || west < MIN_LON || east > MAX_LON {
            // Wraps across the antimeridian; sectors cannot express that
            (MIN_LON, MAX_LON)
        } else {
            (west, east)
        }
    };
    Sector::from_degrees(min_lat, max_lat, min_lon, max_lon).unwrap_or(Sector::FULL_SPHERE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::SphericalGlobe;

    fn globe() -> Arc<dyn Globe> {
        Arc::new(SphericalGlobe::earth())
    }

    #[test]
    fn test_looking_down_sees_the_surface_below() {
        let view = ViewState::looking_down(globe(), LatLon::new(46.0, 7.0), 10_000.0, 45.0, 1.5);
        let below = view.globe.point_at(LatLon::new(46.0, 7.0), 0.0);
        assert!(view.frustum.contains_point(below));

        let far_side = view.globe.point_at(LatLon::new(-46.0, -173.0), 0.0);
        assert!(!view.frustum.contains_point(far_side));
    }

    #[test]
    fn test_eye_position() {
        let view = ViewState::looking_down(globe(), LatLon::new(10.0, 20.0), 5_000.0, 45.0, 1.0);
        let (position, altitude) = view.eye_position();
        assert!((position.lat - 10.0).abs() < 1e-9);
        assert!((position.lon - 20.0).abs() < 1e-9);
        assert!((altitude - 5_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_horizon_sector_low_altitude() {
        let sector = horizon_sector(LatLon::new(0.0, 0.0), 10_000.0, 6_378_137.0);
        assert!(sector.contains(LatLon::new(0.0, 0.0)));
        assert!(sector.delta_lat() < 10.0);
        assert!(sector.delta_lon() < 10.0);
    }

    #[test]
    fn test_horizon_sector_near_pole_is_full_width() {
        let sector = horizon_sector(LatLon::new(88.0, 0.0), 1_000_000.0, 6_378_137.0);
        assert_eq!(sector.min_lon(), MIN_LON);
        assert_eq!(sector.max_lon(), MAX_LON);
    }

    #[test]
    fn test_reference_point_falls_back_to_eye() {
        let view = ViewState::looking_down(globe(), LatLon::new(0.0, 0.0), 1_000.0, 45.0, 1.0)
            .with_viewport_center(None);
        assert_eq!(view.reference_point(), view.eye_point);
    }
}
