//! Levels and level sets
//!
//! A level is one resolution tier of the tile pyramid. A level set is the
//! ordered stack of levels for one imagery dataset, with shared grid
//! origin and coverage sector.

mod absent;
mod descriptor;
mod error;
mod set;

pub use absent::{AbsentResourceList, DEFAULT_MAX_ABSENT_TRIES, DEFAULT_MIN_CHECK_INTERVAL};
pub use descriptor::{Level, LevelParams};
pub use error::LevelError;
pub use set::{
    LevelSet, LevelSetConfig, SectorResolution, DEFAULT_FORMAT_SUFFIX,
    DEFAULT_LEVEL_ZERO_TILE_DELTA, DEFAULT_NUM_LEVELS, DEFAULT_TILE_ORIGIN, DEFAULT_TILE_SIZE,
};
