//! The tiled image layer: per-frame selection, requests and expiry.

use std::sync::Arc;

use glam::DVec3;
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::cache::TextureCache;
use crate::executor::{LoadEvent, LoadTask, TaskService};
use crate::geo::WGS84_EQUATORIAL_RADIUS;
use crate::level::{LevelError, LevelSet};
use crate::telemetry::LayerMetrics;
use crate::source::TextureSource;
use crate::tile::TextureTile;

use super::config::LayerConfig;
use super::draw::{BindingKind, DrawList, TextureBinding};
use super::request::{DrainReport, RequestQueue};
use super::selector::{SelectionPass, SelectionStats, SplitCriterion};
use super::view::ViewState;

// =============================================================================
// Frame Report
// =============================================================================

/// Counters for one rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FrameStats {
    pub tiles_drawn: usize,
    pub own: usize,
    pub fallback: usize,
    pub missing: usize,
    pub visited: usize,
    pub culled: usize,
    /// Distinct tiles queued for loading
    pub requested: usize,
    /// Resident textures queued again because they expired
    pub expired: usize,
    pub drain: DrainReport,
    pub at_max_resolution: bool,
    /// False when the layer did not run this frame
    pub active: bool,
}

/// What the renderer gets back from [`TiledImageLayer::render`].
#[derive(Debug, Default)]
pub struct FrameReport {
    /// Tiles to draw, coarse textures first
    pub draw_list: DrawList,
    pub stats: FrameStats,
}

// =============================================================================
// Tiled Image Layer
// =============================================================================

/// Imagery layer over a quad-tree tile pyramid.
///
/// Composes a [`LevelSet`] with the texture cache it draws from, a
/// [`TextureSource`] that fills the cache, and a [`TaskService`] that runs
/// loads off the render thread. [`render`](Self::render) is called once per
/// frame from the render thread.
pub struct TiledImageLayer {
    config: LayerConfig,
    levels: Arc<LevelSet>,
    top_level_tiles: Vec<TextureTile>,
    cache: Arc<dyn TextureCache>,
    source: Arc<dyn TextureSource>,
    tasks: Arc<dyn TaskService>,
    queue: RequestQueue,
    level_zero_loaded: bool,
    at_max_resolution: bool,
    events: Option<UnboundedSender<LoadEvent>>,
    metrics: Arc<LayerMetrics>,
}

impl TiledImageLayer {
    pub fn new(
        config: LayerConfig,
        levels: Arc<LevelSet>,
        cache: Arc<dyn TextureCache>,
        source: Arc<dyn TextureSource>,
        tasks: Arc<dyn TaskService>,
    ) -> Result<Self, LevelError> {
        let top_level_tiles = levels.top_level_tiles()?;
        if config.expiry_time > 0 {
            levels.set_expiry_time(config.expiry_time);
        }

        info!(
            layer = %config.name,
            source = source.name(),
            levels = levels.num_levels(),
            top_level_tiles = top_level_tiles.len(),
            "Created tiled image layer"
        );

        source.set_retain_level_zero(config.retain_level_zero_tiles);
        source.set_network_retrieval_enabled(config.network_retrieval_enabled);

        Ok(Self {
            config,
            levels,
            top_level_tiles,
            cache,
            source,
            tasks,
            queue: RequestQueue::new(),
            level_zero_loaded: false,
            at_max_resolution: false,
            events: None,
            metrics: Arc::new(LayerMetrics::new()),
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<LayerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Receives a [`LoadEvent`] whenever a load task finishes.
    ///
    /// Replaces any earlier subscription.
    pub fn subscribe(&mut self) -> UnboundedReceiver<LoadEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn levels(&self) -> &Arc<LevelSet> {
        &self.levels
    }

    pub fn top_level_tiles(&self) -> &[TextureTile] {
        &self.top_level_tiles
    }

    pub fn cache(&self) -> &Arc<dyn TextureCache> {
        &self.cache
    }

    pub fn source(&self) -> &Arc<dyn TextureSource> {
        &self.source
    }

    pub fn metrics(&self) -> &Arc<LayerMetrics> {
        &self.metrics
    }

    pub fn set_detail_hint(&mut self, hint: f64) {
        self.config.detail_hint = hint;
    }

    pub fn set_force_level_zero_loads(&mut self, force: bool) {
        self.config.force_level_zero_loads = force;
        self.level_zero_loaded = false;
    }

    pub fn set_retain_level_zero_tiles(&mut self, retain: bool) {
        self.config.retain_level_zero_tiles = retain;
        self.source.set_retain_level_zero(retain);
        self.level_zero_loaded = false;
    }

    pub fn set_network_retrieval_enabled(&mut self, enabled: bool) {
        self.config.network_retrieval_enabled = enabled;
        self.source.set_network_retrieval_enabled(enabled);
    }

    /// Sets the expiry time on the layer and every level.
    pub fn set_expiry_time(&mut self, expiry_time: i64) {
        self.config.expiry_time = expiry_time;
        self.levels.set_expiry_time(expiry_time);
    }

    /// Whether the last frame was at the finest level available at the
    /// viewport centre.
    pub fn is_at_max_resolution(&self) -> bool {
        self.at_max_resolution
    }

    /// Forgets every resource marked absent so it is requested again.
    pub fn invalidate_absent_resources(&self) {
        self.levels.clear_absent_resources();
        info!(layer = %self.config.name, "Cleared absent resource marks");
    }

    /// Eye altitude below which the finest level no longer suffices.
    pub fn min_effective_altitude(&self, radius: Option<f64>) -> f64 {
        let radius = radius.unwrap_or(WGS84_EQUATORIAL_RADIUS);
        let texel_meters = radius * self.levels.last_level().texel_size();
        texel_meters * 10f64.powf(self.config.detail_factor())
    }

    /// Eye altitude above which the coarsest non-empty level is finer than
    /// needed, or `None` when every level is empty.
    pub fn max_effective_altitude(&self, radius: Option<f64>) -> Option<f64> {
        let radius = radius.unwrap_or(WGS84_EQUATORIAL_RADIUS);
        let last = self.levels.last_level().number();
        let level = self
            .levels
            .levels()
            .iter()
            .take(last as usize)
            .find(|level| !level.is_empty())?;
        // A coarser level would have twice the texel size
        let texel_meters = 2.0 * radius * level.texel_size();
        Some(texel_meters * 10f64.powf(self.config.detail_factor()))
    }

    /// Whether the eye altitude is inside the configured active range.
    pub fn is_active_at(&self, view: &ViewState) -> bool {
        let (_, altitude) = view.eye_position();
        altitude >= self.config.min_active_altitude && altitude <= self.config.max_active_altitude
    }

    /// False only when the visible region is known and misses the layer.
    pub fn is_layer_in_view(&self, view: &ViewState) -> bool {
        view.visible_sector
            .map_or(true, |visible| self.levels.sector().intersects(&visible))
    }

    /// Selects, sorts and requests tiles for one frame.
    pub fn render(&mut self, view: &ViewState) -> FrameReport {
        let criterion = SplitCriterion::new(&self.config, view.field_of_view);
        self.at_max_resolution = self.compute_at_max_resolution(view, &criterion);

        if !self.is_active_at(view) || !self.is_layer_in_view(view) {
            // Anything queued belongs to an earlier frame
            self.queue.clear();
            return FrameReport {
                draw_list: DrawList::new(),
                stats: FrameStats {
                    at_max_resolution: self.at_max_resolution,
                    ..FrameStats::default()
                },
            };
        }

        if self.config.force_level_zero_loads && !self.level_zero_loaded {
            self.load_all_top_level_textures();
        }

        let selection = SelectionPass::new(&self.levels, view, self.cache.as_ref(), criterion)
            .assemble(&self.top_level_tiles);
        let mut draw_list = selection.draw_list;
        draw_list.sort_by_texture_level();

        let reference = view.reference_point();
        for tile in selection.requests {
            self.request_texture(view, tile, reference);
        }

        let expired = self.check_texture_expiration(view, &draw_list, reference);
        let requested = self.queue.len();
        let drain = self.send_requests();

        self.metrics.frame_rendered(draw_list.len());
        let stats = frame_stats(&draw_list, selection.stats, requested, expired, drain);
        FrameReport {
            draw_list,
            stats: FrameStats {
                at_max_resolution: self.at_max_resolution,
                ..stats
            },
        }
    }

    /// The viewport centre is outside the layer, or the next-to-last level
    /// would still split there.
    fn compute_at_max_resolution(&self, view: &ViewState, criterion: &SplitCriterion) -> bool {
        let Some(center) = view.viewport_center else {
            return false;
        };
        if !self.levels.sector().contains(center) {
            return true;
        }
        let level = self.levels.next_to_last_level();
        let tile = match self
            .levels
            .key_for_position(center, level.number())
            .and_then(|key| self.levels.create_tile(&key))
        {
            Ok(tile) => tile,
            Err(e) => {
                debug!(error = %e, "Could not resolve tile at viewport centre");
                return false;
            }
        };

        let globe = view.globe.as_ref();
        let texel_meters = globe.radius() * level.texel_size();
        let eye_distance = tile.eye_distance(globe, view.eye_point, view.vertical_exaggeration);
        criterion.needs_split(texel_meters, tile.sector(), eye_distance)
    }

    /// Synchronously loads level-zero textures from local data.
    ///
    /// Runs once until the configuration changes; tiles that fail stay
    /// without a texture.
    fn load_all_top_level_textures(&mut self) {
        let mut loaded = 0;
        for tile in &self.top_level_tiles {
            if tile.level().is_empty() || self.cache.is_resident(tile.key()) {
                continue;
            }
            if self.source.force_load(tile) {
                loaded += 1;
            }
        }
        debug!(layer = %self.config.name, loaded, "Forced level-zero loads");
        self.level_zero_loaded = true;
    }

    fn request_texture(&mut self, view: &ViewState, tile: TextureTile, reference: DVec3) {
        let centroid = tile.centroid_point(view.globe.as_ref(), view.vertical_exaggeration);
        let priority = centroid.distance(reference);
        if self.queue.push(tile, priority) {
            self.metrics.request_enqueued();
        }
    }

    /// Re-requests drawn tiles whose resident texture predates the expiry
    /// time. Only checked once the layer's expiry time has passed.
    fn check_texture_expiration(
        &mut self,
        view: &ViewState,
        draw_list: &DrawList,
        reference: DVec3,
    ) -> usize {
        let expiry_time = self.config.expiry_time;
        if expiry_time <= 0 || expiry_time > view.timestamp {
            return 0;
        }

        let mut expired = 0;
        for entry in draw_list {
            if entry.binding != TextureBinding::Own {
                continue;
            }
            let stale = self
                .cache
                .get(entry.tile.key())
                .is_some_and(|cached| cached.is_expired(entry.tile.level().expiry_time()));
            if stale {
                self.request_texture(view, entry.tile.clone(), reference);
                self.metrics.texture_expired();
                expired += 1;
            }
        }
        expired
    }

    fn send_requests(&mut self) -> DrainReport {
        let levels = Arc::clone(&self.levels);
        let source = Arc::clone(&self.source);
        let events = self.events.clone();

        let report = self.queue.drain(self.tasks.as_ref(), |request| {
            if levels.is_resource_absent(request.key()) {
                return None;
            }
            let (tile, priority) = request.into_parts();
            let task = LoadTask::new(tile, priority, Arc::clone(&source));
            Some(match &events {
                Some(tx) => task.with_events(tx.clone()),
                None => task,
            })
        });

        self.metrics.requests_submitted(report.submitted);
        if report.dropped > 0 {
            self.metrics.requests_dropped(report.dropped);
            debug!(
                layer = %self.config.name,
                dropped = report.dropped,
                "Task service full; dropped requests until next frame"
            );
        }
        report
    }
}

fn frame_stats(
    draw_list: &DrawList,
    selection: SelectionStats,
    requested: usize,
    expired: usize,
    drain: DrainReport,
) -> FrameStats {
    FrameStats {
        tiles_drawn: draw_list.len(),
        own: draw_list.count(BindingKind::Own),
        fallback: draw_list.count(BindingKind::Fallback),
        missing: draw_list.count(BindingKind::Missing),
        visited: selection.visited,
        culled: selection.culled,
        requested,
        expired,
        drain,
        at_max_resolution: false,
        active: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryTextureCache;
    use crate::executor::InlineTaskService;
    use crate::geo::{Globe, LatLon, Sector, SphericalGlobe};
    use crate::level::LevelSetConfig;
    use crate::source::{level_tint, ProceduralTextureSource};

    const CACHE_NAME: &str = "Earth/Test";

    fn globe() -> Arc<dyn Globe> {
        Arc::new(SphericalGlobe::earth())
    }

    fn levels(num_levels: u32, num_empty: u32) -> Arc<LevelSet> {
        Arc::new(
            LevelSet::new(
                LevelSetConfig::new(CACHE_NAME)
                    .with_num_levels(num_levels)
                    .with_num_empty_levels(num_empty)
                    .with_tile_size(64, 64),
            )
            .unwrap(),
        )
    }

    fn layer(config: LayerConfig, levels: Arc<LevelSet>) -> TiledImageLayer {
        let cache: Arc<dyn TextureCache> = Arc::new(MemoryTextureCache::new(256 * 1024 * 1024));
        let source = Arc::new(ProceduralTextureSource::new(
            Arc::clone(&levels),
            Arc::clone(&cache),
            level_tint,
        ));
        TiledImageLayer::new(config, levels, cache, source, Arc::new(InlineTaskService::new())).unwrap()
    }

    fn view(altitude: f64) -> ViewState {
        ViewState::looking_down(globe(), LatLon::new(46.0, 7.0), altitude, 45.0, 1.5)
    }

    #[test]
    fn test_first_frame_requests_textures() {
        let mut layer = layer(LayerConfig::new("test"), levels(4, 0));
        let report = layer.render(&view(20_000_000.0));

        assert!(report.stats.active);
        assert!(!report.draw_list.is_empty());
        // Nothing resident yet, so nothing to fall back on
        assert_eq!(report.stats.own, 0);
        assert_eq!(report.stats.missing, report.stats.tiles_drawn);
        assert!(report.stats.drain.submitted > 0);

        // Inline service loaded them; the next frame draws them
        let report = layer.render(&view(20_000_000.0));
        assert!(report.stats.own > 0);
    }

    #[test]
    fn test_inactive_finest_level_keeps_globe_covered() {
        let levels = Arc::new(
            LevelSet::new(
                LevelSetConfig::new(CACHE_NAME)
                    .with_num_levels(4)
                    .with_inactive_levels(vec![3])
                    .with_tile_size(64, 64),
            )
            .unwrap(),
        );
        let config = LayerConfig::new("test").with_force_level_zero_loads(true);
        let mut layer = layer(config, levels);

        let mut report = FrameReport::default();
        for _ in 0..5 {
            report = layer.render(&view(10_000.0));
        }
        assert!(report.stats.tiles_drawn > 0);
        assert_eq!(report.stats.missing, 0);
        assert!(report.stats.own > 0);
        assert!(report.draw_list.iter().all(|d| d.tile.level_number() <= 2));
    }

    #[test]
    fn test_layer_settings_reach_source() {
        let levels = levels(3, 0);
        let memory = Arc::new(MemoryTextureCache::new(256 * 1024 * 1024));
        let cache: Arc<dyn TextureCache> = memory.clone();
        let source = Arc::new(ProceduralTextureSource::new(
            Arc::clone(&levels),
            Arc::clone(&cache),
            level_tint,
        ));
        let config = LayerConfig::new("test")
            .with_force_level_zero_loads(true)
            .with_retain_level_zero_tiles(true);
        let mut layer = TiledImageLayer::new(
            config,
            levels,
            cache,
            source,
            Arc::new(InlineTaskService::new()),
        )
        .unwrap();

        layer.render(&view(20_000_000.0));
        layer.render(&view(20_000_000.0));
        memory.run_pending_tasks();
        assert_eq!(memory.stats().pinned_count, layer.top_level_tiles().len() as u64);

        // Turning retention off applies to textures installed afterwards
        memory.clear();
        layer.set_retain_level_zero_tiles(false);
        layer.render(&view(20_000_000.0));
        memory.run_pending_tasks();
        assert_eq!(memory.stats().pinned_count, 0);
        assert!(memory.stats().entry_count >= layer.top_level_tiles().len() as u64);
    }

    #[test]
    fn test_inactive_outside_altitude_range() {
        let config = LayerConfig::new("test").with_active_altitudes(0.0, 1_000.0);
        let mut layer = layer(config, levels(4, 0));
        let report = layer.render(&view(50_000.0));
        assert!(!report.stats.active);
        assert!(report.draw_list.is_empty());
    }

    #[test]
    fn test_not_in_view_when_visible_sector_misses_layer() {
        let levels = Arc::new(
            LevelSet::new(
                LevelSetConfig::new(CACHE_NAME)
                    .with_num_levels(3)
                    .with_sector(Sector::from_degrees(-40.0, -20.0, 110.0, 150.0).unwrap()),
            )
            .unwrap(),
        );
        let mut layer = layer(LayerConfig::new("australia"), levels);
        let v = view(10_000.0);
        assert!(!layer.is_layer_in_view(&v));
        assert!(!layer.render(&v).stats.active);
    }

    #[test]
    fn test_force_level_zero_loads_once() {
        let config = LayerConfig::new("test").with_force_level_zero_loads(true);
        let mut layer = layer(config, levels(3, 0));
        let report = layer.render(&view(20_000_000.0));

        // Level zero was loaded before selection, so nothing is missing
        assert_eq!(report.stats.missing, 0);
        assert!(layer.level_zero_loaded);

        layer.set_force_level_zero_loads(true);
        assert!(!layer.level_zero_loaded);
    }

    #[test]
    fn test_effective_altitudes() {
        let layer = layer(LayerConfig::new("test"), levels(5, 1));
        let radius = 6_378_137.0;
        let factor = 10f64.powf(2.8);

        let min = layer.min_effective_altitude(Some(radius));
        let last = layer.levels().last_level().texel_size();
        assert!((min - radius * last * factor).abs() < 1e-6);

        // Level 0 is empty, so level 1 sets the ceiling
        let max = layer.max_effective_altitude(Some(radius)).unwrap();
        let first = layer.levels().level(1).unwrap().texel_size();
        assert!((max - 2.0 * radius * first * factor).abs() < 1e-6);
        assert!(max > min);
    }

    #[test]
    fn test_at_max_resolution_when_close() {
        let mut layer = layer(LayerConfig::new("test"), levels(3, 0));
        layer.render(&view(100.0));
        assert!(layer.is_at_max_resolution());

        layer.render(&view(40_000_000.0));
        assert!(!layer.is_at_max_resolution());
    }

    #[test]
    fn test_expired_textures_are_requested_again() {
        let mut layer = layer(LayerConfig::new("test"), levels(3, 0));
        let v = view(20_000_000.0);
        layer.render(&v);
        let report = layer.render(&v);
        assert!(report.stats.own > 0);

        // Everything installed so far is older than this
        std::thread::sleep(std::time::Duration::from_millis(5));
        let now = chrono::Utc::now().timestamp_millis();
        layer.set_expiry_time(now);
        let report = layer.render(&v.clone().with_timestamp(now + 1));
        assert_eq!(report.stats.expired, report.stats.own);
        assert!(report.stats.drain.submitted > 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_load_events() {
        let mut layer = layer(LayerConfig::new("test"), levels(3, 0));
        let mut events = layer.subscribe();
        let report = layer.render(&view(20_000_000.0));

        let mut received = 0;
        while let Ok(event) = events.try_recv() {
            assert!(event.outcome.is_loaded());
            received += 1;
        }
        assert_eq!(received, report.stats.drain.submitted);
    }
}
