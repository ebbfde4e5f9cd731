//! Layer configuration.

use std::time::Duration;

use crate::retrieve::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT};

/// Default detail hint origin; the base exponent of the split test.
pub const DEFAULT_DETAIL_HINT_ORIGIN: f64 = 2.8;

/// Tiles entirely poleward of this latitude use a coarser split threshold.
pub const DEFAULT_POLAR_LATITUDE: f64 = 75.0;

/// Multiplier applied to the detail exponent for polar tiles.
pub const DEFAULT_POLAR_DETAIL_FACTOR: f64 = 0.9;

/// Field of view (degrees) at which no field-of-view scaling applies.
pub const REFERENCE_FIELD_OF_VIEW: f64 = 45.0;

/// Configuration for a tiled image layer.
///
/// # Example
///
/// ```
/// use globelayer::layer::LayerConfig;
///
/// let config = LayerConfig::new("Blue Marble")
///     .with_detail_hint(0.2)
///     .with_force_level_zero_loads(true);
/// assert_eq!(config.detail_factor(), 3.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LayerConfig {
    pub name: String,

    /// User adjustment of detail; positive values select finer levels.
    /// Typically within [-0.5, 0.5].
    pub detail_hint: f64,

    pub detail_hint_origin: f64,

    pub polar_latitude: f64,
    pub polar_detail_factor: f64,

    /// Synchronously load level-zero textures from local data once, so
    /// there is always a coarse fallback to draw.
    pub force_level_zero_loads: bool,

    /// Pin level-zero textures in memory.
    pub retain_level_zero_tiles: bool,

    /// Textures installed before this time (ms since the Unix epoch) are
    /// reloaded; 0 disables expiry.
    pub expiry_time: i64,

    /// Eye altitude range, in meters, over which the layer renders.
    pub min_active_altitude: f64,
    pub max_active_altitude: f64,

    /// Whether tiles may be fetched from a remote service.
    pub network_retrieval_enabled: bool,

    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl LayerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_detail_hint(mut self, hint: f64) -> Self {
        self.detail_hint = hint;
        self
    }

    pub fn with_detail_hint_origin(mut self, origin: f64) -> Self {
        self.detail_hint_origin = origin;
        self
    }

    pub fn with_polar_adjustment(mut self, latitude: f64, factor: f64) -> Self {
        self.polar_latitude = latitude;
        self.polar_detail_factor = factor;
        self
    }

    pub fn with_force_level_zero_loads(mut self, force: bool) -> Self {
        self.force_level_zero_loads = force;
        self
    }

    pub fn with_retain_level_zero_tiles(mut self, retain: bool) -> Self {
        self.retain_level_zero_tiles = retain;
        self
    }

    pub fn with_expiry_time(mut self, expiry_time: i64) -> Self {
        self.expiry_time = expiry_time;
        self
    }

    pub fn with_active_altitudes(mut self, min: f64, max: f64) -> Self {
        self.min_active_altitude = min;
        self.max_active_altitude = max;
        self
    }

    pub fn with_network_retrieval(mut self, enabled: bool) -> Self {
        self.network_retrieval_enabled = enabled;
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }

    /// Exponent of the split threshold: origin plus hint.
    pub fn detail_factor(&self) -> f64 {
        self.detail_hint_origin + self.detail_hint
    }
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            detail_hint: 0.0,
            detail_hint_origin: DEFAULT_DETAIL_HINT_ORIGIN,
            polar_latitude: DEFAULT_POLAR_LATITUDE,
            polar_detail_factor: DEFAULT_POLAR_DETAIL_FACTOR,
            force_level_zero_loads: false,
            retain_level_zero_tiles: false,
            expiry_time: 0,
            min_active_altitude: f64::MIN,
            max_active_altitude: f64::MAX,
            network_retrieval_enabled: true,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}
