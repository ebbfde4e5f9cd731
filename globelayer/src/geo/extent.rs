//! Bounding volumes and view-frustum tests used for tile culling.

use glam::{DMat4, DVec3, DVec4};

use super::globe::Globe;
use super::types::{LatLon, Sector};

/// Plane indices into the frustum planes array.
const LEFT: usize = 0;
const RIGHT: usize = 1;
const BOTTOM: usize = 2;
const TOP: usize = 3;
const NEAR: usize = 4;
const FAR: usize = 5;

/// Samples per axis when fitting a sphere around a sector.
const SECTOR_SAMPLES: usize = 3;

/// A sphere enclosing a tile's geometry in Cartesian space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: DVec3,
    pub radius: f64,
}

impl BoundingSphere {
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Fits a sphere around the surface patch covered by a sector.
    ///
    /// The patch is sampled on a grid at both the lowest and highest
    /// (exaggerated) elevation. The radius is padded by the sagitta of the
    /// arc between neighbouring samples so the curved surface between
    /// samples stays inside.
    pub fn from_sector(globe: &dyn Globe, sector: &Sector, vertical_exaggeration: f64) -> Self {
        let (min_elevation, max_elevation) = globe.elevation_range(sector);
        let elevations = [
            min_elevation * vertical_exaggeration,
            max_elevation * vertical_exaggeration,
        ];

        let steps = (SECTOR_SAMPLES - 1) as f64;
        let mut points = Vec::with_capacity(SECTOR_SAMPLES * SECTOR_SAMPLES * 2);
        for i in 0..SECTOR_SAMPLES {
            let lat = sector.min_lat() + sector.delta_lat() * i as f64 / steps;
            for j in 0..SECTOR_SAMPLES {
                let lon = sector.min_lon() + sector.delta_lon() * j as f64 / steps;
                for elevation in elevations {
                    points.push(globe.point_at(LatLon::new(lat, lon), elevation));
                }
            }
        }

        let center = points.iter().fold(DVec3::ZERO, |acc, p| acc + *p) / points.len() as f64;
        let radius = points
            .iter()
            .map(|p| p.distance(center))
            .fold(0.0_f64, f64::max);

        let half_span = 0.5 * sector.delta_lat().max(sector.delta_lon()) / steps;
        let outer = globe.radius() + elevations[1].max(0.0);
        let sagitta = outer * (1.0 - half_span.to_radians().cos());

        Self::new(center, radius + sagitta)
    }
}

/// A view frustum defined by six inward-pointing planes.
#[derive(Debug, Clone)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far. `xyz` is the unit inward
    /// normal and `w` the signed distance term.
    planes: [DVec4; 6],
}

impl Frustum {
    /// Extracts frustum planes from a view-projection matrix with OpenGL
    /// clip conventions (z in [-1, 1]) using the Griggs-Hartmann method.
    pub fn from_view_projection(vp: &DMat4) -> Self {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];

        let mut planes = [DVec4::ZERO; 6];
        planes[LEFT] = rows[3] + rows[0];
        planes[RIGHT] = rows[3] - rows[0];
        planes[BOTTOM] = rows[3] + rows[1];
        planes[TOP] = rows[3] - rows[1];
        planes[NEAR] = rows[3] + rows[2];
        planes[FAR] = rows[3] - rows[2];

        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 0.0 {
                *plane /= len;
            }
        }

        Self { planes }
    }

    /// Builds a perspective frustum for a camera at `eye` looking at `target`.
    ///
    /// `fov_y` is the vertical field of view in degrees.
    pub fn perspective(
        eye: DVec3,
        target: DVec3,
        up: DVec3,
        fov_y: f64,
        aspect: f64,
        near: f64,
        far: f64,
    ) -> Self {
        let view = DMat4::look_at_rh(eye, target, up);
        let projection = DMat4::perspective_rh_gl(fov_y.to_radians(), aspect, near, far);
        Self::from_view_projection(&(projection * view))
    }

    /// Tests whether a sphere is at least partially inside the frustum.
    ///
    /// Conservative: may accept spheres just outside a frustum corner.
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(sphere.center) + plane.w >= -sphere.radius)
    }

    /// Tests whether a point is inside the frustum.
    pub fn contains_point(&self, point: DVec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(point) + plane.w >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::SphericalGlobe;

    fn looking_down_z() -> Frustum {
        Frustum::perspective(
            DVec3::new(0.0, 0.0, 10.0),
            DVec3::ZERO,
            DVec3::Y,
            60.0,
            1.0,
            0.1,
            100.0,
        )
    }

    #[test]
    fn test_sphere_in_front_is_visible() {
        let frustum = looking_down_z();
        assert!(frustum.intersects_sphere(&BoundingSphere::new(DVec3::ZERO, 1.0)));
        assert!(frustum.contains_point(DVec3::ZERO));
    }

    #[test]
    fn test_sphere_behind_camera_is_culled() {
        let frustum = looking_down_z();
        let sphere = BoundingSphere::new(DVec3::new(0.0, 0.0, 20.0), 1.0);
        assert!(!frustum.intersects_sphere(&sphere));
    }

    #[test]
    fn test_sphere_straddling_plane_is_visible() {
        let frustum = looking_down_z();
        // Far off to the side but large enough to poke into view
        let sphere = BoundingSphere::new(DVec3::new(30.0, 0.0, 0.0), 28.0);
        assert!(frustum.intersects_sphere(&sphere));

        let small = BoundingSphere::new(DVec3::new(30.0, 0.0, 0.0), 1.0);
        assert!(!frustum.intersects_sphere(&small));
    }

    #[test]
    fn test_sector_sphere_contains_corners_and_centroid() {
        let globe = SphericalGlobe::earth();
        let sector = Sector::from_degrees(0.0, 36.0, 0.0, 36.0).unwrap();
        let sphere = BoundingSphere::from_sector(&globe, &sector, 1.0);

        let mut samples: Vec<LatLon> = sector.corners().to_vec();
        samples.push(sector.centroid());
        samples.push(LatLon::new(9.0, 27.0));
        for p in samples {
            let point = globe.point_at(p, 0.0);
            assert!(point.distance(sphere.center) <= sphere.radius + 1e-6);
        }
    }
}
