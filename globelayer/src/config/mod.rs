//! Configuration files.
//!
//! Layers are described by INI files with four sections:
//!
//! ```ini
//! [layer]
//! name = Blue Marble
//! detail_hint = 0.2
//! force_level_zero_loads = true
//!
//! [levels]
//! cache_name = Earth/BlueMarble
//! num_levels = 8
//! tile_size = 512
//! sector = -90,90,-180,180
//!
//! [retrieval]
//! service = https://tiles.example.com/imagery
//! dataset = bmng
//! connect_timeout_ms = 8000
//!
//! [cache]
//! memory_size = 512MB
//! ```
//!
//! Missing keys keep their defaults and unknown keys are ignored.

mod file;
mod size;

pub use file::{
    config_file_path, CacheSettings, ConfigError, LayerConfigFile, RetrievalSettings,
    CONFIG_FILE_NAME,
};
pub use size::{format_size, parse_size};
