//! Level sets: the ordered pyramid of levels covering one sector.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::geo::{LatLon, Sector};
use crate::tile::{grid, TextureTile, TileKey};

use super::absent::{DEFAULT_MAX_ABSENT_TRIES, DEFAULT_MIN_CHECK_INTERVAL};
use super::descriptor::{Level, LevelParams};
use super::error::LevelError;

/// Default angular size of a level-zero tile, in degrees.
pub const DEFAULT_LEVEL_ZERO_TILE_DELTA: f64 = 36.0;

/// Default number of levels.
pub const DEFAULT_NUM_LEVELS: u32 = 19;

/// Default tile width and height in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 512;

/// Default image file suffix.
pub const DEFAULT_FORMAT_SUFFIX: &str = ".dds";

/// Default grid origin: the south-west corner of the globe.
pub const DEFAULT_TILE_ORIGIN: LatLon = LatLon::new(-90.0, -180.0);

/// Caps the deepest level used inside a region.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorResolution {
    pub sector: Sector,
    pub level: u32,
}

impl SectorResolution {
    pub fn new(sector: Sector, level: u32) -> Self {
        Self { sector, level }
    }
}

/// Configuration for a [`LevelSet`].
#[derive(Debug, Clone)]
pub struct LevelSetConfig {
    /// Region covered by the imagery
    pub sector: Sector,

    /// South-west corner of the tile grid
    pub tile_origin: LatLon,

    /// Angular size of level-zero tiles
    pub level_zero_tile_delta: LatLon,

    pub num_levels: u32,

    /// Leading levels that exist only for traversal
    pub num_empty_levels: u32,

    /// Levels that are skipped for imagery
    pub inactive_levels: Vec<u32>,

    pub tile_width: u32,
    pub tile_height: u32,

    /// Shared by all levels; also the root of the on-disk cache layout
    pub cache_name: String,

    pub format_suffix: String,
    pub dataset: Option<String>,
    pub service: Option<String>,

    /// Milliseconds since the Unix epoch; 0 disables expiry
    pub expiry_time: i64,

    pub sector_resolution_limits: Vec<SectorResolution>,

    pub absent_max_tries: u32,
    pub absent_min_check_interval: Duration,
}

impl LevelSetConfig {
    /// Creates a configuration with default geometry for the given cache name.
    pub fn new(cache_name: impl Into<String>) -> Self {
        Self {
            cache_name: cache_name.into(),
            ..Default::default()
        }
    }

    pub fn with_sector(mut self, sector: Sector) -> Self {
        self.sector = sector;
        self
    }

    pub fn with_tile_origin(mut self, origin: LatLon) -> Self {
        self.tile_origin = origin;
        self
    }

    pub fn with_level_zero_tile_delta(mut self, delta: LatLon) -> Self {
        self.level_zero_tile_delta = delta;
        self
    }

    pub fn with_num_levels(mut self, num_levels: u32) -> Self {
        self.num_levels = num_levels;
        self
    }

    pub fn with_num_empty_levels(mut self, num_empty_levels: u32) -> Self {
        self.num_empty_levels = num_empty_levels;
        self
    }

    pub fn with_inactive_levels(mut self, levels: Vec<u32>) -> Self {
        self.inactive_levels = levels;
        self
    }

    pub fn with_tile_size(mut self, width: u32, height: u32) -> Self {
        self.tile_width = width;
        self.tile_height = height;
        self
    }

    pub fn with_format_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.format_suffix = suffix.into();
        self
    }

    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = Some(dataset.into());
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_expiry_time(mut self, expiry_time: i64) -> Self {
        self.expiry_time = expiry_time;
        self
    }

    pub fn with_sector_resolution_limit(mut self, limit: SectorResolution) -> Self {
        self.sector_resolution_limits.push(limit);
        self
    }

    pub fn with_absent_policy(mut self, max_tries: u32, min_check_interval: Duration) -> Self {
        self.absent_max_tries = max_tries;
        self.absent_min_check_interval = min_check_interval;
        self
    }
}

impl Default for LevelSetConfig {
    fn default() -> Self {
        Self {
            sector: Sector::FULL_SPHERE,
            tile_origin: DEFAULT_TILE_ORIGIN,
            level_zero_tile_delta: LatLon::new(
                DEFAULT_LEVEL_ZERO_TILE_DELTA,
                DEFAULT_LEVEL_ZERO_TILE_DELTA,
            ),
            num_levels: DEFAULT_NUM_LEVELS,
            num_empty_levels: 0,
            inactive_levels: Vec::new(),
            tile_width: DEFAULT_TILE_SIZE,
            tile_height: DEFAULT_TILE_SIZE,
            cache_name: String::new(),
            format_suffix: DEFAULT_FORMAT_SUFFIX.to_string(),
            dataset: None,
            service: None,
            expiry_time: 0,
            sector_resolution_limits: Vec::new(),
            absent_max_tries: DEFAULT_MAX_ABSENT_TRIES,
            absent_min_check_interval: DEFAULT_MIN_CHECK_INTERVAL,
        }
    }
}

/// An ordered pyramid of levels sharing one grid origin.
///
/// Level `i` has tiles exactly half the angular size of level `i - 1`,
/// so every tile has four children on the next level.
#[derive(Debug)]
pub struct LevelSet {
    sector: Sector,
    tile_origin: LatLon,
    level_zero_tile_delta: LatLon,
    num_level_zero_columns: u32,
    levels: Vec<Arc<Level>>,
    sector_resolution_limits: Vec<SectorResolution>,
}

impl LevelSet {
    pub fn new(config: LevelSetConfig) -> Result<Self, LevelError> {
        if config.num_levels == 0 {
            return Err(LevelError::NoLevels);
        }
        let delta = config.level_zero_tile_delta;
        if !(delta.lat > 0.0 && delta.lon > 0.0 && delta.lat.is_finite() && delta.lon.is_finite())
        {
            return Err(LevelError::InvalidParameters(format!(
                "level zero tile delta {}",
                delta
            )));
        }

        let first_col = grid::compute_column(delta.lon, config.sector.min_lon(), config.tile_origin.lon)?;
        let last_col = grid::compute_column(delta.lon, config.sector.max_lon(), config.tile_origin.lon)?;
        let num_level_zero_columns = (last_col as i64 - first_col as i64 + 1).max(1) as u32;

        let mut levels = Vec::with_capacity(config.num_levels as usize);
        for i in 0..config.num_levels {
            let name = if i < config.num_empty_levels {
                String::new()
            } else {
                (i - config.num_empty_levels).to_string()
            };
            let scale = 2f64.powi(i as i32);
            let level = Level::new(LevelParams {
                number: i,
                name,
                tile_delta: LatLon::new(delta.lat / scale, delta.lon / scale),
                tile_width: config.tile_width,
                tile_height: config.tile_height,
                cache_name: config.cache_name.clone(),
                format_suffix: config.format_suffix.clone(),
                dataset: config.dataset.clone(),
                service: config.service.clone(),
                expiry_time: config.expiry_time,
                active: !config.inactive_levels.contains(&i),
                absent_max_tries: config.absent_max_tries,
                absent_min_check_interval: config.absent_min_check_interval,
            })?;
            levels.push(Arc::new(level));
        }

        let last_level = config.num_levels - 1;
        let mut limits = config.sector_resolution_limits;
        for limit in &limits {
            if limit.level > last_level {
                warn!(
                    sector = %limit.sector,
                    level = limit.level,
                    last_level,
                    "Sector resolution limit exceeds the last level"
                );
            }
        }
        limits.sort_by(|a, b| b.level.cmp(&a.level));

        Ok(Self {
            sector: config.sector,
            tile_origin: config.tile_origin,
            level_zero_tile_delta: delta,
            num_level_zero_columns,
            levels,
            sector_resolution_limits: limits,
        })
    }

    pub fn sector(&self) -> &Sector {
        &self.sector
    }

    pub fn tile_origin(&self) -> LatLon {
        self.tile_origin
    }

    pub fn level_zero_tile_delta(&self) -> LatLon {
        self.level_zero_tile_delta
    }

    /// Level-zero columns spanned by the coverage sector.
    pub fn num_level_zero_columns(&self) -> u32 {
        self.num_level_zero_columns
    }

    pub fn num_levels(&self) -> u32 {
        self.levels.len() as u32
    }

    pub fn levels(&self) -> &[Arc<Level>] {
        &self.levels
    }

    pub fn level(&self, number: u32) -> Option<&Arc<Level>> {
        self.levels.get(number as usize)
    }

    pub fn first_level(&self) -> &Arc<Level> {
        &self.levels[0]
    }

    pub fn last_level(&self) -> &Arc<Level> {
        &self.levels[self.levels.len() - 1]
    }

    /// The level above the last one; the last level itself when there is
    /// only one.
    pub fn next_to_last_level(&self) -> &Arc<Level> {
        &self.levels[self.levels.len().saturating_sub(2)]
    }

    pub fn next_level(&self, number: u32) -> Option<&Arc<Level>> {
        self.level(number + 1)
    }

    pub fn is_final_level(&self, number: u32) -> bool {
        number + 1 >= self.num_levels()
    }

    /// Missing levels count as empty.
    pub fn is_level_empty(&self, number: u32) -> bool {
        self.level(number).map_or(true, |l| l.is_empty())
    }

    pub fn sector_resolution_limits(&self) -> &[SectorResolution] {
        &self.sector_resolution_limits
    }

    /// Deepest level allowed inside `sector`.
    ///
    /// Returns `None` when the sector is outside the coverage.
    pub fn last_level_for_sector(&self, sector: &Sector) -> Option<&Arc<Level>> {
        if !self.sector.intersects(sector) {
            return None;
        }
        let limited = self
            .sector_resolution_limits
            .iter()
            .find(|limit| limit.sector.intersects(sector))
            .map(|limit| limit.level.min(self.num_levels() - 1));
        match limited {
            Some(level) => self.level(level),
            None => Some(self.last_level()),
        }
    }

    /// Deepest level with imagery allowed inside `sector`.
    ///
    /// Skips empty or inactive levels below the limit; falls back to the
    /// limit itself when no level down to zero has imagery.
    pub fn last_drawable_level_for_sector(&self, sector: &Sector) -> Option<&Arc<Level>> {
        let limit = self.last_level_for_sector(sector)?;
        self.levels[..=limit.number() as usize]
            .iter()
            .rev()
            .find(|level| !level.is_empty())
            .or(Some(limit))
    }

    /// Deepest level allowed at `position`.
    pub fn last_level_for_location(&self, position: LatLon) -> Option<&Arc<Level>> {
        if !self.sector.contains(position) {
            return None;
        }
        let limited = self
            .sector_resolution_limits
            .iter()
            .find(|limit| limit.sector.contains(position))
            .map(|limit| limit.level.min(self.num_levels() - 1));
        match limited {
            Some(level) => self.level(level),
            None => Some(self.last_level()),
        }
    }

    /// Picks the level whose texel size best matches `resolution` radians.
    ///
    /// Walks down from level zero and stops at the first non-empty level
    /// with texels no larger than the resolution; the last allowed level
    /// when none qualifies. The nearest coarser non-empty level wins if its
    /// texel size is closer to the target.
    pub fn level_for_resolution(
        &self,
        sector: &Sector,
        resolution: f64,
    ) -> Result<&Arc<Level>, LevelError> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(LevelError::InvalidResolution(resolution));
        }
        let target = self
            .last_level_for_sector(sector)
            .ok_or(LevelError::OutOfCoverage(*sector))?;

        let mut chosen = target.number() as usize;
        for (i, level) in self.levels[..chosen].iter().enumerate() {
            if level.is_empty() {
                continue;
            }
            if level.texel_size() <= resolution {
                chosen = i;
                break;
            }
        }

        let finer = &self.levels[chosen];
        if let Some(coarser) = self.levels[..chosen].iter().rev().find(|l| !l.is_empty()) {
            if (coarser.texel_size() - resolution).abs() < (finer.texel_size() - resolution).abs() {
                chosen = coarser.number() as usize;
            }
        }
        Ok(&self.levels[chosen])
    }

    /// Columns in the full global grid at a level.
    pub fn num_columns_in_level(&self, level: &Level) -> u64 {
        (360.0 / level.tile_delta().lon).ceil() as u64
    }

    /// Unique number of a tile within its level.
    pub fn tile_number(&self, key: &TileKey) -> u64 {
        let columns = self
            .level(key.level())
            .map(|l| self.num_columns_in_level(l))
            .unwrap_or(1);
        key.row() as u64 * columns + key.col() as u64
    }

    /// Whether a tile's imagery should not be requested.
    ///
    /// Always true for empty levels.
    pub fn is_resource_absent(&self, key: &TileKey) -> bool {
        match self.level(key.level()) {
            Some(level) if !level.is_empty() => {
                level.absent_resources().is_absent(self.tile_number(key))
            }
            _ => true,
        }
    }

    pub fn mark_resource_absent(&self, key: &TileKey) {
        if let Some(level) = self.level(key.level()) {
            level.absent_resources().mark_absent(self.tile_number(key));
        }
    }

    pub fn mark_resource_permanently_absent(&self, key: &TileKey) {
        if let Some(level) = self.level(key.level()) {
            level
                .absent_resources()
                .mark_permanently_absent(self.tile_number(key));
        }
    }

    pub fn unmark_resource_absent(&self, key: &TileKey) {
        if let Some(level) = self.level(key.level()) {
            level.absent_resources().unmark(self.tile_number(key));
        }
    }

    /// Forgets every absent mark on every level.
    pub fn clear_absent_resources(&self) {
        for level in &self.levels {
            level.absent_resources().clear();
        }
    }

    /// Latest expiry time across levels.
    pub fn expiry_time(&self) -> i64 {
        self.levels
            .iter()
            .map(|l| l.expiry_time())
            .max()
            .unwrap_or(0)
    }

    pub fn set_expiry_time(&self, expiry_time: i64) {
        for level in &self.levels {
            level.set_expiry_time(expiry_time);
        }
    }

    fn check_key(&self, key: &TileKey) -> Result<&Arc<Level>, LevelError> {
        let level = self
            .level(key.level())
            .ok_or(LevelError::UnknownLevel(key.level()))?;
        if key.cache_name() != level.cache_name() {
            return Err(LevelError::CacheMismatch {
                expected: level.cache_name().to_string(),
                actual: key.cache_name().to_string(),
            });
        }
        Ok(level)
    }

    /// Geographic bounds of the tile identified by `key`.
    pub fn sector_for_key(&self, key: &TileKey) -> Result<Sector, LevelError> {
        let level = self.check_key(key)?;
        let delta = level.tile_delta();
        let min_lat = grid::row_latitude(key.row() as i64, delta.lat, self.tile_origin.lat)?;
        let min_lon = grid::column_longitude(key.col() as i64, delta.lon, self.tile_origin.lon)?;
        Ok(Sector::from_degrees_unchecked(
            min_lat,
            min_lat + delta.lat,
            min_lon,
            min_lon + delta.lon,
        ))
    }

    /// Key of the tile at `level` containing `position`.
    pub fn key_for_position(&self, position: LatLon, level: u32) -> Result<TileKey, LevelError> {
        let lvl = self.level(level).ok_or(LevelError::UnknownLevel(level))?;
        let delta = lvl.tile_delta();
        let row = grid::compute_row(delta.lat, position.lat, self.tile_origin.lat)?;
        let col = grid::compute_column(delta.lon, position.lon, self.tile_origin.lon)?;
        Ok(TileKey::with_shared_name(
            level,
            row,
            col,
            lvl.shared_cache_name(),
        ))
    }

    /// Key of the tile at `level` containing the centroid of `sector`.
    pub fn key_for_sector(&self, sector: &Sector, level: u32) -> Result<TileKey, LevelError> {
        self.key_for_position(sector.centroid(), level)
    }

    pub fn create_tile(&self, key: &TileKey) -> Result<TextureTile, LevelError> {
        let sector = self.sector_for_key(key)?;
        let level = self.check_key(key)?;
        Ok(TextureTile::new(sector, Arc::clone(level), key.row(), key.col()))
    }

    /// Level-zero tiles covering the coverage sector, row-major from the
    /// south-west.
    pub fn top_level_tiles(&self) -> Result<Vec<TextureTile>, LevelError> {
        let level = self.first_level();
        let delta = level.tile_delta();
        let origin = self.tile_origin;

        let first_row = grid::compute_row(delta.lat, self.sector.min_lat(), origin.lat)?;
        let last_row = grid::compute_row(delta.lat, self.sector.max_lat(), origin.lat)?;
        let first_col = grid::compute_column(delta.lon, self.sector.min_lon(), origin.lon)?;
        let last_col = grid::compute_column(delta.lon, self.sector.max_lon(), origin.lon)?;

        let mut tiles = Vec::new();
        for row in first_row..=last_row {
            let min_lat = grid::row_latitude(row as i64, delta.lat, origin.lat)?;
            for col in first_col..=last_col {
                let min_lon = grid::column_longitude(col as i64, delta.lon, origin.lon)?;
                let sector = Sector::from_degrees_unchecked(
                    min_lat,
                    min_lat + delta.lat,
                    min_lon,
                    min_lon + delta.lon,
                );
                tiles.push(TextureTile::new(sector, Arc::clone(level), row, col));
            }
        }
        Ok(tiles)
    }
}
