//! `simulate` - fly a camera down over a position and render frames.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use globelayer::cache::{MemoryTextureCache, TextureCache};
use globelayer::executor::ThreadPoolTaskService;
use globelayer::geo::{Globe, SphericalGlobe, WGS84_EQUATORIAL_RADIUS};
use globelayer::layer::{FrameStats, TiledImageLayer, ViewState};
use globelayer::source::{level_tint, CachedTextureSource, ProceduralTextureSource, TextureSource};
use globelayer::telemetry::LayerMetrics;
use serde::Serialize;
use tracing::{info, warn};

use super::position;
use crate::error::CliError;
use crate::runner::CliRunner;

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Latitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Starting eye altitude in meters
    #[arg(long, default_value_t = 20_000_000.0)]
    pub from_altitude: f64,

    /// Final eye altitude in meters
    #[arg(long, default_value_t = 5_000.0)]
    pub to_altitude: f64,

    #[arg(long, default_value_t = 60)]
    pub frames: u32,

    /// Pause between frames in milliseconds
    #[arg(long, default_value_t = 50)]
    pub frame_interval_ms: u64,

    /// Horizontal field of view in degrees
    #[arg(long, default_value_t = 45.0)]
    pub fov: f64,

    /// Generate tinted tiles instead of reading the store or network
    #[arg(long)]
    pub procedural: bool,

    /// Emit one JSON object per frame
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct FrameLine<'a> {
    frame: u32,
    altitude: f64,
    #[serde(flatten)]
    stats: &'a FrameStats,
}

pub fn run(runner: &CliRunner, args: SimulateArgs) -> Result<(), CliError> {
    runner.log_startup("simulate");
    let target = position(args.lat, args.lon)?;
    if args.frames == 0 {
        return Err(CliError::InvalidArgument("--frames must be positive".to_string()));
    }
    if args.from_altitude <= 0.0 || args.to_altitude <= 0.0 {
        return Err(CliError::InvalidArgument("altitudes must be positive".to_string()));
    }

    let config = runner.config();
    let levels = runner.level_set()?;
    let cache: Arc<dyn TextureCache> = Arc::new(MemoryTextureCache::new(config.cache.memory_size));
    let metrics = Arc::new(LayerMetrics::new());
    let retain = config.layer.retain_level_zero_tiles;

    let source: Arc<dyn TextureSource> = if args.procedural {
        Arc::new(
            ProceduralTextureSource::new(Arc::clone(&levels), Arc::clone(&cache), level_tint)
                .with_retain_level_zero(retain)
                .with_metrics(Arc::clone(&metrics)),
        )
    } else {
        // The blocking HTTP client has to be built before the runtime starts
        Arc::new(
            CachedTextureSource::new(
                Arc::clone(&levels),
                runner.file_store()?,
                runner.retriever()?,
                Arc::clone(&cache),
            )
            .with_retain_level_zero(retain)
            .with_network_retrieval(config.layer.network_retrieval_enabled)
            .with_metrics(Arc::clone(&metrics)),
        )
    };

    let runtime = runner.runtime()?;
    let tasks = Arc::new(ThreadPoolTaskService::new(
        runtime.handle().clone(),
        config.retrieval.max_active_loads,
    ));
    let mut layer = TiledImageLayer::new(config.layer.clone(), levels, cache, source, tasks)?
        .with_metrics(Arc::clone(&metrics));

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst)) {
            warn!(error = %e, "Could not install Ctrl-C handler");
        }
    }

    let globe: Arc<dyn Globe> = Arc::new(SphericalGlobe::new(WGS84_EQUATORIAL_RADIUS));
    let interval = Duration::from_millis(args.frame_interval_ms);
    for frame in 0..args.frames {
        if stop.load(Ordering::SeqCst) {
            info!(frame, "Simulation interrupted");
            break;
        }
        let altitude = altitude_at(args.from_altitude, args.to_altitude, frame, args.frames);
        let view = ViewState::looking_down(Arc::clone(&globe), target, altitude, args.fov, 16.0 / 9.0);
        let report = layer.render(&view);

        if args.json {
            let line = FrameLine {
                frame,
                altitude,
                stats: &report.stats,
            };
            let json = serde_json::to_string(&line)
                .map_err(|e| CliError::Runtime(e.to_string()))?;
            println!("{}", json);
        } else {
            println!("{}", frame_line(frame, altitude, &report.stats));
        }
        std::thread::sleep(interval);
    }

    let snapshot = layer.metrics().snapshot();
    if args.json {
        let json = serde_json::to_string(&snapshot).map_err(|e| CliError::Runtime(e.to_string()))?;
        println!("{}", json);
    } else {
        println!();
        println!("Frames rendered:   {}", snapshot.frames_rendered);
        println!("Requests submitted: {}", snapshot.requests_submitted);
        println!("Requests dropped:  {}", snapshot.requests_dropped);
        println!("Textures loaded:   {}", snapshot.textures_loaded());
        println!("Loads failed:      {}", snapshot.loads_failed);
        println!("Marked absent:     {}", snapshot.resources_marked_absent);
    }
    runtime.shutdown_timeout(Duration::from_secs(2));
    Ok(())
}

/// Geometric interpolation so each frame descends by the same ratio.
fn altitude_at(from: f64, to: f64, frame: u32, frames: u32) -> f64 {
    if frames <= 1 {
        return to;
    }
    let t = frame as f64 / (frames - 1) as f64;
    from * (to / from).powf(t)
}

fn frame_line(frame: u32, altitude: f64, stats: &FrameStats) -> String {
    format!(
        "frame {:>4}  alt {:>12.0} m  drawn {:>4} (own {:>4}, fallback {:>4}, missing {:>3})  \
         requested {:>4}  submitted {:>3}  dropped {:>3}{}",
        frame,
        altitude,
        stats.tiles_drawn,
        stats.own,
        stats.fallback,
        stats.missing,
        stats.requested,
        stats.drain.submitted,
        stats.drain.dropped,
        if stats.at_max_resolution { "  max-res" } else { "" }
    )
}
