//! INI layer configuration file.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use thiserror::Error;
use tracing::{debug, error};

use crate::cache::DEFAULT_MEMORY_CACHE_BYTES;
use crate::executor::DEFAULT_MAX_ACTIVE_LOADS;
use crate::geo::{LatLon, Sector};
use crate::layer::LayerConfig;
use crate::level::{LevelSetConfig, SectorResolution};

use super::size::parse_size;

/// File name looked up under the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Default configuration file location, e.g. `~/.config/globelayer/config.ini`.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("globelayer").join(CONFIG_FILE_NAME))
}

/// Errors from reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] ini::ParseError),

    #[error("invalid value for [{section}] {key} = '{value}': {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// Where tiles come from.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalSettings {
    /// URL template with `{level}`, `{row}`, `{col}`, `{dataset}` and
    /// `{suffix}` placeholders; takes precedence over the level set's service
    pub url_template: Option<String>,

    /// Directory holding tiles in the cache layout, used instead of a
    /// remote service
    pub local_root: Option<PathBuf>,

    pub max_active_loads: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            url_template: None,
            local_root: None,
            max_active_loads: DEFAULT_MAX_ACTIVE_LOADS,
        }
    }
}

/// Where textures are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// File store root; the platform cache directory when unset
    pub directory: Option<PathBuf>,
    pub memory_size: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: None,
            memory_size: DEFAULT_MEMORY_CACHE_BYTES,
        }
    }
}

/// Everything needed to build one layer.
#[derive(Debug, Clone, Default)]
pub struct LayerConfigFile {
    pub layer: LayerConfig,
    pub levels: LevelSetConfig,
    pub retrieval: RetrievalSettings,
    pub cache: CacheSettings,
}

impl LayerConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| {
            error!(path = %path.display(), error = %source, "Failed to read config file");
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let config = Self::from_ini(&ini).inspect_err(|e| {
            error!(path = %path.display(), error = %e, "Invalid config file");
        })?;
        debug!(path = %path.display(), layer = %config.layer.name, "Loaded config file");
        Ok(config)
    }

    /// Loads the file at [`config_file_path`], or defaults when there is none.
    pub fn load_default() -> Result<Self, ConfigError> {
        match config_file_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.read_layer(&Section::new(ini, "layer"))?;
        config.read_levels(&Section::new(ini, "levels"))?;
        config.read_retrieval(&Section::new(ini, "retrieval"))?;
        config.read_cache(&Section::new(ini, "cache"))?;
        Ok(config)
    }

    fn read_layer(&mut self, section: &Section<'_>) -> Result<(), ConfigError> {
        let layer = &mut self.layer;
        if let Some(name) = section.get("name") {
            layer.name = name.to_string();
        }
        section.set(&mut layer.detail_hint, "detail_hint")?;
        section.set(&mut layer.detail_hint_origin, "detail_hint_origin")?;
        section.set(&mut layer.polar_latitude, "polar_latitude")?;
        section.set(&mut layer.polar_detail_factor, "polar_detail_factor")?;
        section.set(&mut layer.force_level_zero_loads, "force_level_zero_loads")?;
        section.set(&mut layer.retain_level_zero_tiles, "retain_level_zero_tiles")?;
        section.set(&mut layer.expiry_time, "expiry_time")?;
        section.set(&mut layer.min_active_altitude, "min_active_altitude")?;
        section.set(&mut layer.max_active_altitude, "max_active_altitude")?;
        Ok(())
    }

    fn read_levels(&mut self, section: &Section<'_>) -> Result<(), ConfigError> {
        let levels = &mut self.levels;
        if let Some(name) = section.get("cache_name") {
            levels.cache_name = name.to_string();
        }
        if self.layer.name.is_empty() {
            self.layer.name = levels.cache_name.clone();
        }
        section.set(&mut levels.num_levels, "num_levels")?;
        section.set(&mut levels.num_empty_levels, "num_empty_levels")?;
        if let Some(size) = section.parse::<u32>("tile_size")? {
            levels.tile_width = size;
            levels.tile_height = size;
        }
        section.set(&mut levels.tile_width, "tile_width")?;
        section.set(&mut levels.tile_height, "tile_height")?;
        if let Some(suffix) = section.get("format_suffix") {
            levels.format_suffix = suffix.to_string();
        }
        section.set(&mut levels.expiry_time, "expiry_time")?;

        if let Some(sector) = section.with("sector", parse_sector)? {
            levels.sector = sector;
        }
        if let Some(origin) = section.with("tile_origin", parse_lat_lon)? {
            levels.tile_origin = origin;
        }
        if let Some(delta) = section.with("level_zero_tile_delta", parse_lat_lon)? {
            levels.level_zero_tile_delta = delta;
        }
        if let Some(inactive) = section.with("inactive_levels", parse_list)? {
            levels.inactive_levels = inactive;
        }
        if let Some(limits) = section.with("sector_resolution_limits", parse_limits)? {
            levels.sector_resolution_limits = limits;
        }
        Ok(())
    }

    fn read_retrieval(&mut self, section: &Section<'_>) -> Result<(), ConfigError> {
        if let Some(service) = section.get("service") {
            self.levels.service = Some(service.to_string());
        }
        if let Some(dataset) = section.get("dataset") {
            self.levels.dataset = Some(dataset.to_string());
        }
        if let Some(template) = section.get("url_template") {
            self.retrieval.url_template = Some(template.to_string());
        }
        if let Some(root) = section.get("local_root") {
            self.retrieval.local_root = Some(PathBuf::from(root));
        }
        section.set(&mut self.retrieval.max_active_loads, "max_active_loads")?;
        section.set(&mut self.layer.network_retrieval_enabled, "network_enabled")?;
        if let Some(ms) = section.parse::<u64>("connect_timeout_ms")? {
            self.layer.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = section.parse::<u64>("read_timeout_ms")? {
            self.layer.read_timeout = Duration::from_millis(ms);
        }
        section.set(&mut self.levels.absent_max_tries, "absent_max_tries")?;
        if let Some(secs) = section.parse::<u64>("absent_check_interval_secs")? {
            self.levels.absent_min_check_interval = Duration::from_secs(secs);
        }
        Ok(())
    }

    fn read_cache(&mut self, section: &Section<'_>) -> Result<(), ConfigError> {
        if let Some(dir) = section.get("directory") {
            self.cache.directory = Some(PathBuf::from(dir));
        }
        if let Some(size) = section.with("memory_size", |text| {
            parse_size(text).ok_or_else(|| "expected a size such as 512MB".to_string())
        })? {
            self.cache.memory_size = size;
        }
        Ok(())
    }
}

impl FromStr for LayerConfigFile {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::from_ini(&Ini::load_from_str(text)?)
    }
}

// =============================================================================
// Section access
// =============================================================================

struct Section<'a> {
    name: &'static str,
    properties: Option<&'a Properties>,
}

impl<'a> Section<'a> {
    fn new(ini: &'a Ini, name: &'static str) -> Self {
        Self {
            name,
            properties: ini.section(Some(name)),
        }
    }

    fn get(&self, key: &str) -> Option<&'a str> {
        self.properties
            .and_then(|p| p.get(key))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    fn invalid(&self, key: &str, value: &str, reason: String) -> ConfigError {
        ConfigError::InvalidValue {
            section: self.name.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason,
        }
    }

    fn with<T, F>(&self, key: &str, parse: F) -> Result<Option<T>, ConfigError>
    where
        F: FnOnce(&str) -> Result<T, String>,
    {
        match self.get(key) {
            Some(value) => parse(value)
                .map(Some)
                .map_err(|reason| self.invalid(key, value, reason)),
            None => Ok(None),
        }
    }

    fn parse<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.with(key, |value| value.parse::<T>().map_err(|e| e.to_string()))
    }

    fn set<T>(&self, target: &mut T, key: &str) -> Result<(), ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        if let Some(value) = self.parse(key)? {
            *target = value;
        }
        Ok(())
    }
}

fn parse_numbers(text: &str, expected: usize) -> Result<Vec<f64>, String> {
    let values = text
        .split(',')
        .map(|part| part.trim().parse::<f64>().map_err(|e| e.to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() != expected {
        return Err(format!("expected {} comma-separated numbers", expected));
    }
    Ok(values)
}

/// `min_lat,max_lat,min_lon,max_lon` in degrees.
fn parse_sector(text: &str) -> Result<Sector, String> {
    let v = parse_numbers(text, 4)?;
    Sector::from_degrees(v[0], v[1], v[2], v[3]).map_err(|e| e.to_string())
}

/// `lat,lon` in degrees.
fn parse_lat_lon(text: &str) -> Result<LatLon, String> {
    let v = parse_numbers(text, 2)?;
    Ok(LatLon::new(v[0], v[1]))
}

fn parse_list(text: &str) -> Result<Vec<u32>, String> {
    text.split(',')
        .map(|part| part.trim().parse::<u32>().map_err(|e| e.to_string()))
        .collect()
}

/// `sector:level` pairs separated by `|`.
fn parse_limits(text: &str) -> Result<Vec<SectorResolution>, String> {
    text.split('|')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (sector, level) = entry
                .split_once(':')
                .ok_or_else(|| format!("'{}' is not sector:level", entry))?;
            let level = level.trim().parse::<u32>().map_err(|e| e.to_string())?;
            Ok(SectorResolution::new(parse_sector(sector)?, level))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[layer]
name = Blue Marble
detail_hint = 0.25
force_level_zero_loads = true
expiry_time = 1700000000000

[levels]
cache_name = Earth/BlueMarble
num_levels = 6
num_empty_levels = 1
tile_size = 256
format_suffix = .png
sector = -60,60,-180,180
level_zero_tile_delta = 36,36
sector_resolution_limits = 45,48,6,11:4 | 0,10,0,10:2

[retrieval]
service = https://tiles.example.com/wms
dataset = bmng
network_enabled = false
connect_timeout_ms = 2500
max_active_loads = 3

[cache]
memory_size = 64MB
unknown_key = ignored
"#;

    #[test]
    fn test_parse_all_sections() {
        let config: LayerConfigFile = SAMPLE.parse().unwrap();

        assert_eq!(config.layer.name, "Blue Marble");
        assert_eq!(config.layer.detail_hint, 0.25);
        assert!(config.layer.force_level_zero_loads);
        assert_eq!(config.layer.expiry_time, 1_700_000_000_000);
        assert!(!config.layer.network_retrieval_enabled);
        assert_eq!(config.layer.connect_timeout, Duration::from_millis(2500));

        assert_eq!(config.levels.cache_name, "Earth/BlueMarble");
        assert_eq!(config.levels.num_levels, 6);
        assert_eq!(config.levels.num_empty_levels, 1);
        assert_eq!((config.levels.tile_width, config.levels.tile_height), (256, 256));
        assert_eq!(config.levels.format_suffix, ".png");
        assert_eq!(config.levels.sector.min_lat(), -60.0);
        assert_eq!(config.levels.sector_resolution_limits.len(), 2);
        assert_eq!(config.levels.sector_resolution_limits[0].level, 4);
        assert_eq!(config.levels.service.as_deref(), Some("https://tiles.example.com/wms"));
        assert_eq!(config.levels.dataset.as_deref(), Some("bmng"));

        assert_eq!(config.retrieval.max_active_loads, 3);
        assert_eq!(config.cache.memory_size, 64 * 1024 * 1024);
    }

    #[test]
    fn test_missing_sections_keep_defaults() {
        let config: LayerConfigFile = "[levels]\ncache_name = Earth/X\n".parse().unwrap();
        assert_eq!(config.layer.name, "Earth/X");
        assert_eq!(config.levels.num_levels, crate::level::DEFAULT_NUM_LEVELS);
        assert_eq!(config.retrieval, RetrievalSettings::default());
    }

    #[test]
    fn test_invalid_value_names_the_key() {
        let err = "[levels]\nnum_levels = many\n"
            .parse::<LayerConfigFile>()
            .unwrap_err();
        match err {
            ConfigError::InvalidValue { section, key, value, .. } => {
                assert_eq!(section, "levels");
                assert_eq!(key, "num_levels");
                assert_eq!(value, "many");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_sector_rejected() {
        let err = "[levels]\nsector = 10,-10,0,5\n"
            .parse::<LayerConfigFile>()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "sector"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = LayerConfigFile::load(file.path()).unwrap();
        assert_eq!(config.levels.cache_name, "Earth/BlueMarble");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = LayerConfigFile::load(&dir.path().join("absent.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
