//! `bulk` - download a region into the file store ahead of time.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use globelayer::config::format_size;
use globelayer::geo::{Sector, WGS84_EQUATORIAL_RADIUS};
use globelayer::layer::{BulkDownloader, BulkProgress, BulkSummary, DEFAULT_BULK_CONCURRENCY};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Rough compressed size of one tile, for the dry-run estimate.
const ESTIMATED_TILE_BYTES: u64 = 150 * 1024;

#[derive(Debug, Args)]
pub struct BulkArgs {
    #[arg(long, allow_hyphen_values = true)]
    pub min_lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    pub max_lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    pub min_lon: f64,

    #[arg(long, allow_hyphen_values = true)]
    pub max_lon: f64,

    /// Target resolution in radians per texel
    #[arg(long)]
    pub resolution: f64,

    /// Parallel downloads
    #[arg(long, default_value_t = DEFAULT_BULK_CONCURRENCY)]
    pub concurrency: usize,

    /// Only report how many tiles are missing
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(runner: &CliRunner, args: BulkArgs) -> Result<(), CliError> {
    runner.log_startup("bulk");
    let sector = Sector::from_degrees(args.min_lat, args.max_lat, args.min_lon, args.max_lon)
        .map_err(|e| CliError::InvalidArgument(e.to_string()))?;

    let levels = runner.level_set()?;
    let downloader = BulkDownloader::new(
        levels,
        runner.file_store()?,
        runner.retriever()?,
        sector,
        args.resolution,
    )?
    .with_concurrency(args.concurrency);

    let missing = downloader.estimated_missing_count()?;
    println!(
        "Target level {} ({:.1} m/texel) over {}",
        downloader.target_level(),
        args.resolution * WGS84_EQUATORIAL_RADIUS,
        downloader.sector()
    );
    println!(
        "{} tiles missing, roughly {}",
        missing,
        format_size(missing as u64 * ESTIMATED_TILE_BYTES)
    );
    if args.dry_run || missing == 0 {
        return Ok(());
    }

    let token = downloader.cancellation_token();
    if let Err(e) = ctrlc::set_handler(move || token.cancel()) {
        warn!(error = %e, "Could not install Ctrl-C handler");
    }

    let bar = ProgressBar::new(missing as u64);
    if let Ok(style) =
        ProgressStyle::with_template("{bar:50} {pos:>6}/{len:6} {msg} remaining: {eta}")
    {
        bar.set_style(style);
    }

    let runtime = runner.runtime()?;
    let progress = downloader.progress();
    let summary = runtime.block_on(async {
        let run = downloader.run();
        tokio::pin!(run);
        let mut ticker = tokio::time::interval(Duration::from_millis(100));
        loop {
            tokio::select! {
                result = &mut run => break result,
                _ = ticker.tick() => update_bar(&bar, &progress),
            }
        }
    })?;
    update_bar(&bar, &progress);
    bar.finish_and_clear();

    println!("{}", summary_text(&summary));
    Ok(())
}

fn update_bar(bar: &ProgressBar, progress: &Arc<BulkProgress>) {
    if progress.total() > 0 {
        bar.set_length(progress.total() as u64);
    }
    bar.set_position(progress.processed() as u64);
    if progress.failed() > 0 {
        bar.set_message(format!("{} failed", progress.failed()));
    }
}

fn summary_text(summary: &BulkSummary) -> String {
    let mut text = format!(
        "Level {}: {} downloaded, {} failed, {} already present",
        summary.target_level, summary.downloaded, summary.failed, summary.already_present
    );
    if summary.cancelled {
        text.push_str(" (cancelled)");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_text_notes_cancellation() {
        let summary = BulkSummary {
            target_level: 3,
            already_present: 2,
            downloaded: 5,
            failed: 1,
            cancelled: true,
        };
        assert_eq!(
            summary_text(&summary),
            "Level 3: 5 downloaded, 1 failed, 2 already present (cancelled)"
        );
    }
}
