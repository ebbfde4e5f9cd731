//! Textures computed from the tile itself.
//!
//! Useful for debugging overlays and for exercising the layer without any
//! imagery on disk or on the network.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::cache::TextureCache;
use crate::level::LevelSet;
use crate::telemetry::LayerMetrics;
use crate::texture::{TextureData, TextureError};
use crate::tile::TextureTile;

use super::{AbsentReason, LoadOrigin, LoadOutcome, TextureInstaller, TextureSource};

/// Level colours, cycled for deep pyramids.
const LEVEL_COLORS: [[u8; 3]; 8] = [
    [230, 25, 75],
    [60, 180, 75],
    [255, 225, 25],
    [0, 130, 200],
    [245, 130, 48],
    [145, 30, 180],
    [70, 240, 240],
    [240, 50, 230],
];

/// Solid texture tinted by level, darker on alternating tiles so tile
/// boundaries are visible.
pub fn level_tint(tile: &TextureTile) -> Result<TextureData, TextureError> {
    let [r, g, b] = LEVEL_COLORS[tile.level_number() as usize % LEVEL_COLORS.len()];
    let shade = |c: u8| {
        if (tile.row() + tile.col()) % 2 == 0 {
            c
        } else {
            c / 2
        }
    };
    TextureData::solid(tile.width(), tile.height(), [shade(r), shade(g), shade(b), 255])
}

/// Texture source that runs a generator function for each tile.
pub struct ProceduralTextureSource<F>
where
    F: Fn(&TextureTile) -> Result<TextureData, TextureError> + Send + Sync,
{
    levels: Arc<LevelSet>,
    installer: TextureInstaller,
    generator: F,
    latency: Duration,
    metrics: Arc<LayerMetrics>,
}

impl<F> ProceduralTextureSource<F>
where
    F: Fn(&TextureTile) -> Result<TextureData, TextureError> + Send + Sync,
{
    pub fn new(levels: Arc<LevelSet>, cache: Arc<dyn TextureCache>, generator: F) -> Self {
        Self {
            levels,
            installer: TextureInstaller::new(cache, false),
            generator,
            latency: Duration::ZERO,
            metrics: Arc::new(LayerMetrics::new()),
        }
    }

    pub fn with_retain_level_zero(self, retain: bool) -> Self {
        self.installer.set_retain_level_zero(retain);
        self
    }

    /// Sleep before each asynchronous load, imitating a slow origin.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<LayerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    fn generate(&self, tile: &TextureTile) -> LoadOutcome {
        match (self.generator)(tile) {
            Ok(texture) => {
                self.installer.install(tile, texture);
                self.levels.unmark_resource_absent(tile.key());
                self.metrics.texture_generated();
                LoadOutcome::Loaded(LoadOrigin::Generated)
            }
            Err(e) => {
                debug!(tile = %tile.label(), error = %e, "Texture generation failed");
                self.levels.mark_resource_permanently_absent(tile.key());
                self.metrics.resource_marked_absent();
                self.metrics.load_failed();
                LoadOutcome::Failed(e.to_string())
            }
        }
    }
}

impl<F> TextureSource for ProceduralTextureSource<F>
where
    F: Fn(&TextureTile) -> Result<TextureData, TextureError> + Send + Sync,
{
    fn name(&self) -> &str {
        "procedural"
    }

    fn load(&self, tile: &TextureTile) -> LoadOutcome {
        if tile.level().is_empty() {
            return LoadOutcome::Absent(AbsentReason::EmptyLevel);
        }
        if self.installer.has_fresh_texture(tile) {
            return LoadOutcome::AlreadyResident;
        }
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        self.generate(tile)
    }

    fn force_load(&self, tile: &TextureTile) -> bool {
        !tile.level().is_empty() && self.generate(tile).is_loaded()
    }

    fn set_retain_level_zero(&self, retain: bool) {
        self.installer.set_retain_level_zero(retain);
    }
}
