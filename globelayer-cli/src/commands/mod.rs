//! CLI sub-commands.

pub mod bulk;
pub mod levels;
pub mod locate;
pub mod simulate;

use globelayer::geo::LatLon;

use crate::error::CliError;

/// Validated position from command-line degrees.
pub fn position(lat: f64, lon: f64) -> Result<LatLon, CliError> {
    LatLon::checked(lat, lon).map_err(|e| CliError::InvalidArgument(e.to_string()))
}
