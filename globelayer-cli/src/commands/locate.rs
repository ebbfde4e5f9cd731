//! `locate` - find the tile containing a position.

use clap::{ArgGroup, Args};
use globelayer::level::LevelSet;

use super::position;
use crate::error::CliError;
use crate::runner::CliRunner;

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("target").required(true).args(["level", "resolution"])))]
pub struct LocateArgs {
    /// Latitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Level number
    #[arg(long)]
    pub level: Option<u32>,

    /// Target resolution in radians per texel; picks the matching level
    #[arg(long)]
    pub resolution: Option<f64>,
}

pub fn run(runner: &CliRunner, args: LocateArgs) -> Result<(), CliError> {
    runner.log_startup("locate");
    let levels = runner.level_set()?;
    println!("{}", describe(&levels, &args)?);
    Ok(())
}

fn describe(levels: &LevelSet, args: &LocateArgs) -> Result<String, CliError> {
    let position = position(args.lat, args.lon)?;
    let level = match (args.level, args.resolution) {
        (Some(level), _) => level,
        (None, Some(resolution)) => levels
            .level_for_resolution(levels.sector(), resolution)?
            .number(),
        (None, None) => {
            return Err(CliError::InvalidArgument(
                "one of --level or --resolution is required".to_string(),
            ))
        }
    };

    let key = levels.key_for_position(position, level)?;
    let tile = levels.create_tile(&key)?;
    let empty = if tile.level().is_empty() { " (empty level)" } else { "" };
    Ok(format!(
        "Tile:   {}{}\nSector: {}\nPath:   {}\nSize:   {}x{} px",
        tile.label(),
        empty,
        tile.sector(),
        tile.path(),
        tile.width(),
        tile.height()
    ))
}
