//! GlobeLayer CLI - inspect level sets and exercise tiled image layers.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::bulk::BulkArgs;
use commands::locate::LocateArgs;
use commands::simulate::SimulateArgs;
use error::CliError;
use runner::CliRunner;

#[derive(Debug, Parser)]
#[command(name = "globelayer", version, about)]
struct Cli {
    /// Layer configuration file (INI); defaults to the user config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to a file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the level table of the configured level set
    Levels,

    /// Show the tile containing a position
    Locate(LocateArgs),

    /// Fly a camera down over a position and report each frame
    Simulate(SimulateArgs),

    /// Download a region into the file store
    Bulk(BulkArgs),
}

fn run(cli: Cli) -> Result<(), CliError> {
    let runner = CliRunner::new(cli.config.as_deref(), cli.log_dir.as_deref())?;
    match cli.command {
        Commands::Levels => commands::levels::run(&runner),
        Commands::Locate(args) => commands::locate::run(&runner, args),
        Commands::Simulate(args) => commands::simulate::run(&runner, args),
        Commands::Bulk(args) => commands::bulk::run(&runner, args),
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
