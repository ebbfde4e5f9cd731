//! Geographic primitives
//!
//! Provides latitude/longitude positions, geographic sectors, the globe
//! model used to turn geographic positions into Cartesian points, and the
//! bounding volumes used for visibility culling.

mod extent;
mod globe;
mod types;

pub use extent::{BoundingSphere, Frustum};
pub use globe::{Globe, SphericalGlobe, WGS84_EQUATORIAL_RADIUS};
pub use types::{GeoError, LatLon, Sector, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};
