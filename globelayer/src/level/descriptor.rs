//! Level descriptors.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::geo::{LatLon, Sector};
use crate::tile::grid;

use super::absent::{AbsentResourceList, DEFAULT_MAX_ABSENT_TRIES, DEFAULT_MIN_CHECK_INTERVAL};
use super::error::LevelError;

/// Parameters for building a [`Level`].
#[derive(Debug, Clone)]
pub struct LevelParams {
    pub number: u32,
    /// Empty names mark placeholder levels that have no imagery
    pub name: String,
    /// Angular size of one tile, in degrees
    pub tile_delta: LatLon,
    pub tile_width: u32,
    pub tile_height: u32,
    pub cache_name: String,
    pub format_suffix: String,
    pub dataset: Option<String>,
    pub service: Option<String>,
    /// Textures updated before this time (ms since the Unix epoch) are stale
    pub expiry_time: i64,
    pub active: bool,
    pub absent_max_tries: u32,
    pub absent_min_check_interval: Duration,
}

impl Default for LevelParams {
    fn default() -> Self {
        Self {
            number: 0,
            name: "0".to_string(),
            tile_delta: LatLon::new(36.0, 36.0),
            tile_width: 512,
            tile_height: 512,
            cache_name: String::new(),
            format_suffix: ".dds".to_string(),
            dataset: None,
            service: None,
            expiry_time: 0,
            active: true,
            absent_max_tries: DEFAULT_MAX_ABSENT_TRIES,
            absent_min_check_interval: DEFAULT_MIN_CHECK_INTERVAL,
        }
    }
}

/// One resolution tier of a tile pyramid.
///
/// Everything except the expiry time and the absent list is fixed at
/// construction.
#[derive(Debug)]
pub struct Level {
    number: u32,
    name: String,
    tile_delta: LatLon,
    tile_width: u32,
    tile_height: u32,
    texel_size: f64,
    cache_name: Arc<str>,
    path: String,
    format_suffix: String,
    dataset: Option<String>,
    service: Option<String>,
    expiry_time: AtomicI64,
    active: bool,
    absent: AbsentResourceList,
}

impl Level {
    pub fn new(params: LevelParams) -> Result<Self, LevelError> {
        let mut problems = Vec::new();
        if !params.tile_delta.lat.is_finite() || params.tile_delta.lat <= 0.0 {
            problems.push(format!("tile delta latitude {}", params.tile_delta.lat));
        }
        if !params.tile_delta.lon.is_finite() || params.tile_delta.lon <= 0.0 {
            problems.push(format!("tile delta longitude {}", params.tile_delta.lon));
        }
        if params.tile_width == 0 {
            problems.push("tile width 0".to_string());
        }
        if params.tile_height == 0 {
            problems.push("tile height 0".to_string());
        }
        if params.cache_name.is_empty() {
            problems.push("empty cache name".to_string());
        }
        if !problems.is_empty() {
            return Err(LevelError::InvalidParameters(format!(
                "level {}: {}",
                params.number,
                problems.join(", ")
            )));
        }

        let texel_size = params.tile_delta.lat.to_radians() / params.tile_height as f64;
        let path = format!("{}/{}", params.cache_name, params.name);

        Ok(Self {
            number: params.number,
            name: params.name,
            tile_delta: params.tile_delta,
            tile_width: params.tile_width,
            tile_height: params.tile_height,
            texel_size,
            cache_name: Arc::from(params.cache_name),
            path,
            format_suffix: params.format_suffix,
            dataset: params.dataset,
            service: params.service,
            expiry_time: AtomicI64::new(params.expiry_time),
            active: params.active,
            absent: AbsentResourceList::new(
                params.absent_max_tries,
                params.absent_min_check_interval,
            ),
        })
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True for placeholder and inactive levels.
    ///
    /// Empty levels take part in traversal but never hold imagery.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() || !self.active
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn tile_delta(&self) -> LatLon {
        self.tile_delta
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    /// Angular size of one texel in radians.
    pub fn texel_size(&self) -> f64 {
        self.texel_size
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub(crate) fn shared_cache_name(&self) -> Arc<str> {
        Arc::clone(&self.cache_name)
    }

    /// Relative directory for this level's tiles: `<cache name>/<level name>`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn format_suffix(&self) -> &str {
        &self.format_suffix
    }

    pub fn dataset(&self) -> Option<&str> {
        self.dataset.as_deref()
    }

    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    pub fn expiry_time(&self) -> i64 {
        self.expiry_time.load(Ordering::Relaxed)
    }

    pub fn set_expiry_time(&self, expiry_time: i64) {
        self.expiry_time.store(expiry_time, Ordering::Relaxed);
    }

    pub fn absent_resources(&self) -> &AbsentResourceList {
        &self.absent
    }

    /// Sector of this level's tile that contains `position`.
    pub fn sector_for_position(&self, position: LatLon, origin: LatLon) -> Result<Sector, LevelError> {
        let row = grid::compute_row(self.tile_delta.lat, position.lat, origin.lat)?;
        let col = grid::compute_column(self.tile_delta.lon, position.lon, origin.lon)?;
        let min_lat = grid::row_latitude(row as i64, self.tile_delta.lat, origin.lat)?;
        let min_lon = grid::column_longitude(col as i64, self.tile_delta.lon, origin.lon)?;
        Ok(Sector::from_degrees_unchecked(
            min_lat,
            min_lat + self.tile_delta.lat,
            min_lon,
            min_lon + self.tile_delta.lon,
        ))
    }
}
