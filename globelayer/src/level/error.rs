//! Level set error types.

use thiserror::Error;

use crate::geo::{GeoError, Sector};

/// Errors raised while building or querying a level set.
#[derive(Debug, Error)]
pub enum LevelError {
    /// One or more construction parameters are invalid
    #[error("invalid level parameters: {0}")]
    InvalidParameters(String),

    /// A level set needs at least one level
    #[error("level set has no levels")]
    NoLevels,

    /// Level number outside the set
    #[error("level {0} does not exist")]
    UnknownLevel(u32),

    /// Resolution that is zero, negative or not finite
    #[error("invalid resolution: {0}")]
    InvalidResolution(f64),

    /// Sector lies entirely outside the level set's coverage
    #[error("sector {0} is outside the level set coverage")]
    OutOfCoverage(Sector),

    /// Key built for a different level set
    #[error("tile key belongs to cache '{actual}', expected '{expected}'")]
    CacheMismatch { expected: String, actual: String },

    /// Grid arithmetic failed
    #[error("grid error: {0}")]
    Geo(#[from] GeoError),
}
