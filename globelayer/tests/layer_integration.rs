//! Integration tests for the tiled image layer.
//!
//! These tests drive complete frames through `TiledImageLayer` with real
//! caches, sources and task services:
//! - Progressive refinement from coarse fallbacks to own textures
//! - Fallback and draw-list invariants over a camera descent
//! - Empty levels are traversed but never loaded
//! - Duplicate suppression across layers sharing a resource
//! - File-store-backed loading with forced level-zero loads
//!
//! Run with: `cargo test --test layer_integration`

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tempfile::TempDir;

use globelayer::cache::{FileStore, MemoryTextureCache, TextureCache};
use globelayer::executor::{InlineTaskService, TaskService, ThreadPoolTaskService};
use globelayer::geo::{Globe, LatLon, SphericalGlobe};
use globelayer::layer::{
    DrawList, FrameReport, LayerConfig, TextureBinding, TiledImageLayer, ViewState,
};
use globelayer::level::{LevelSet, LevelSetConfig};
use globelayer::retrieve::LocalRetriever;
use globelayer::source::{
    level_tint, CachedTextureSource, LoadOutcome, ProceduralTextureSource, TextureSource,
};
use globelayer::tile::{TextureTile, TileKey};

// ============================================================================
// Helper Functions
// ============================================================================

const CACHE_NAME: &str = "Earth/Integration";

/// Zurich, where the camera descends.
const TARGET: LatLon = LatLon::new(47.37, 8.54);

fn globe() -> Arc<dyn Globe> {
    Arc::new(SphericalGlobe::earth())
}

fn level_set(num_levels: u32, num_empty: u32) -> Arc<LevelSet> {
    Arc::new(
        LevelSet::new(
            LevelSetConfig::new(CACHE_NAME)
                .with_num_levels(num_levels)
                .with_num_empty_levels(num_empty)
                .with_tile_size(32, 32)
                .with_format_suffix(".png"),
        )
        .unwrap(),
    )
}

fn memory_cache() -> Arc<dyn TextureCache> {
    Arc::new(MemoryTextureCache::new(512 * 1024 * 1024))
}

fn view(altitude: f64) -> ViewState {
    ViewState::looking_down(globe(), TARGET, altitude, 45.0, 1.5)
}

/// Wraps a source and records every tile it was asked to load.
struct RecordingSource<S> {
    inner: S,
    loads: Mutex<Vec<TileKey>>,
}

impl<S: TextureSource> RecordingSource<S> {
    fn new(inner: S) -> Self {
        Self {
            inner,
            loads: Mutex::new(Vec::new()),
        }
    }

    fn loaded_levels(&self) -> HashSet<u32> {
        self.loads.lock().iter().map(|k| k.level()).collect()
    }
}

impl<S: TextureSource> TextureSource for RecordingSource<S> {
    fn name(&self) -> &str {
        "recording"
    }

    fn load(&self, tile: &TextureTile) -> LoadOutcome {
        self.loads.lock().push(tile.key().clone());
        self.inner.load(tile)
    }

    fn force_load(&self, tile: &TextureTile) -> bool {
        self.loads.lock().push(tile.key().clone());
        self.inner.force_load(tile)
    }

    fn set_retain_level_zero(&self, retain: bool) {
        self.inner.set_retain_level_zero(retain);
    }

    fn set_network_retrieval_enabled(&self, enabled: bool) {
        self.inner.set_network_retrieval_enabled(enabled);
    }
}

/// Every fallback is resident, and every missing binding has no resident
/// ancestor in the same frame.
fn assert_fallbacks_resident(draw_list: &DrawList, cache: &dyn TextureCache) {
    for entry in draw_list {
        match &entry.binding {
            TextureBinding::Own => assert!(cache.is_resident(entry.tile.key())),
            TextureBinding::Fallback { tile, transform } => {
                assert!(cache.is_resident(tile.key()), "fallback {} not resident", tile);
                assert!(tile.level_number() < entry.tile.level_number());
                assert!(tile.sector().contains_sector(entry.tile.sector()));
                assert!(transform.scale_s > 0.0 && transform.scale_s <= 1.0);
            }
            TextureBinding::Missing => assert!(!cache.is_resident(entry.tile.key())),
        }
    }
}

/// No tile is drawn twice and no drawn tile contains another.
fn assert_no_overlap(draw_list: &DrawList) {
    let keys: HashSet<_> = draw_list.iter().map(|e| e.tile.key().clone()).collect();
    assert_eq!(keys.len(), draw_list.len(), "duplicate tile in draw list");

    for entry in draw_list {
        let mut ancestor = entry.tile.key().parent();
        while let Some(key) = ancestor {
            assert!(!keys.contains(&key), "{} drawn with its ancestor {}", entry.tile, key);
            ancestor = key.parent();
        }
    }
}

fn assert_sorted_by_texture_level(report: &FrameReport) {
    let levels: Vec<u32> = report.draw_list.iter().map(|e| e.texture_level()).collect();
    assert!(levels.windows(2).all(|w| w[0] <= w[1]), "unsorted: {:?}", levels);
}

// ============================================================================
// Frame Tests
// ============================================================================

#[test]
fn test_descent_refines_progressively() {
    let levels = level_set(8, 0);
    let cache = memory_cache();
    let source = Arc::new(ProceduralTextureSource::new(
        Arc::clone(&levels),
        Arc::clone(&cache),
        level_tint,
    ));
    let config = LayerConfig::new("procedural").with_force_level_zero_loads(true);
    let mut layer = TiledImageLayer::new(
        config,
        Arc::clone(&levels),
        Arc::clone(&cache),
        source,
        Arc::new(InlineTaskService::new()),
    )
    .unwrap();

    let mut deepest = 0;
    for altitude in [20_000_000.0, 5_000_000.0, 1_000_000.0, 200_000.0, 50_000.0] {
        // Render each altitude twice: the first frame requests, the second
        // draws what arrived
        for _ in 0..2 {
            let report = layer.render(&view(altitude));
            assert!(report.stats.active);
            assert!(!report.draw_list.is_empty());
            assert_fallbacks_resident(&report.draw_list, cache.as_ref());
            assert_no_overlap(&report.draw_list);
            assert_sorted_by_texture_level(&report);
            // Level zero was forced; nothing should lack a texture
            assert_eq!(report.stats.missing, 0);
        }
        let report = layer.render(&view(altitude));
        assert_eq!(report.stats.own, report.stats.tiles_drawn);
        let level = report
            .draw_list
            .iter()
            .map(|e| e.tile.level_number())
            .max()
            .unwrap();
        assert!(level >= deepest, "descending selected a coarser level");
        deepest = level;
    }
    assert!(deepest >= 5);

    let snapshot = layer.metrics().snapshot();
    assert_eq!(snapshot.frames_rendered, 15);
    assert!(snapshot.requests_submitted > 0);
}

#[test]
fn test_empty_levels_traversed_not_loaded() {
    let levels = level_set(7, 2);
    let cache = memory_cache();
    let source = Arc::new(RecordingSource::new(ProceduralTextureSource::new(
        Arc::clone(&levels),
        Arc::clone(&cache),
        level_tint,
    )));
    let mut layer = TiledImageLayer::new(
        LayerConfig::new("gaps").with_force_level_zero_loads(true),
        Arc::clone(&levels),
        Arc::clone(&cache),
        source.clone(),
        Arc::new(InlineTaskService::new()),
    )
    .unwrap();

    for altitude in [10_000_000.0, 1_000_000.0, 100_000.0] {
        for _ in 0..3 {
            let report = layer.render(&view(altitude));
            assert!(report.draw_list.iter().all(|e| !e.tile.level().is_empty()));
        }
    }

    let loaded = source.loaded_levels();
    assert!(!loaded.is_empty());
    assert!(!loaded.contains(&0));
    assert!(!loaded.contains(&1));
}

#[test]
fn test_full_task_service_drops_and_recovers() {
    /// Accepts one task per frame.
    struct OnePerFrame {
        inner: InlineTaskService,
        used: Mutex<bool>,
    }

    impl TaskService for OnePerFrame {
        fn submit(&self, task: globelayer::executor::LoadTask) -> globelayer::executor::Submission {
            *self.used.lock() = true;
            self.inner.submit(task)
        }

        fn is_full(&self) -> bool {
            *self.used.lock()
        }

        fn active_count(&self) -> usize {
            0
        }
    }

    // A single level keeps the selection small
    let levels = level_set(1, 0);
    let cache = memory_cache();
    let source = Arc::new(ProceduralTextureSource::new(
        Arc::clone(&levels),
        Arc::clone(&cache),
        level_tint,
    ));
    let tasks = Arc::new(OnePerFrame {
        inner: InlineTaskService::new(),
        used: Mutex::new(false),
    });
    let mut layer = TiledImageLayer::new(
        LayerConfig::new("starved"),
        levels,
        Arc::clone(&cache),
        source,
        tasks.clone(),
    )
    .unwrap();

    let first = layer.render(&view(20_000_000.0));
    assert_eq!(first.stats.drain.submitted, 1);
    assert_eq!(first.stats.drain.dropped, first.stats.requested - 1);

    // Dropped requests come back on later frames until everything is loaded
    let mut frames = 1;
    loop {
        *tasks.used.lock() = false;
        let report = layer.render(&view(20_000_000.0));
        frames += 1;
        if report.stats.requested == 0 {
            assert_eq!(report.stats.own, report.stats.tiles_drawn);
            break;
        }
        assert!(frames < 500, "requests never drained");
    }
    assert!(frames > 2);
}

// ============================================================================
// Shared Resource Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_layers_sharing_a_resource_load_it_once() {
    let levels = level_set(5, 0);
    let cache = memory_cache();
    let source = Arc::new(RecordingSource::new(
        ProceduralTextureSource::new(Arc::clone(&levels), Arc::clone(&cache), level_tint)
            .with_latency(Duration::from_millis(300)),
    ));
    let tasks: Arc<dyn TaskService> = Arc::new(ThreadPoolTaskService::current(10_000).unwrap());

    let make_layer = |name: &str| {
        TiledImageLayer::new(
            LayerConfig::new(name),
            Arc::clone(&levels),
            Arc::clone(&cache),
            source.clone(),
            Arc::clone(&tasks),
        )
        .unwrap()
    };
    let mut first = make_layer("first");
    let mut second = make_layer("second");

    let v = view(5_000_000.0);
    let a = first.render(&v);
    let b = second.render(&v);

    assert!(a.stats.drain.submitted > 0);
    assert_eq!(b.stats.drain.submitted, 0);
    assert_eq!(b.stats.drain.duplicates, a.stats.drain.submitted);

    while tasks.active_count() > 0 {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let loads = source.loads.lock().len();
    assert_eq!(loads, a.stats.drain.submitted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_load_events_reach_subscriber() {
    let levels = level_set(4, 0);
    let cache = memory_cache();
    let source = Arc::new(ProceduralTextureSource::new(
        Arc::clone(&levels),
        Arc::clone(&cache),
        level_tint,
    ));
    let tasks = Arc::new(ThreadPoolTaskService::current(64).unwrap());
    let mut layer = TiledImageLayer::new(
        LayerConfig::new("events"),
        levels,
        Arc::clone(&cache),
        source,
        tasks,
    )
    .unwrap();
    let mut events = layer.subscribe();

    let report = layer.render(&view(20_000_000.0));
    let expected = report.stats.drain.submitted;
    assert!(expected > 0);

    for _ in 0..expected {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("load event timed out")
            .expect("channel closed");
        assert!(event.outcome.is_loaded());
        assert!(cache.is_resident(&event.key));
    }
}

// ============================================================================
// File Store Tests
// ============================================================================

/// Writes PNG tiles for `keys` under `root` in the cache layout.
fn write_tiles(root: &std::path::Path, levels: &LevelSet, keys: &[TileKey]) {
    let store = FileStore::new(root);
    for key in keys {
        let tile = levels.create_tile(key).unwrap();
        let png = level_tint(&tile).unwrap().encode_png().unwrap();
        store.write(&tile.path(), &png).unwrap();
    }
}

#[test]
fn test_file_store_backed_layer() {
    let store_dir = TempDir::new().unwrap();
    let origin_dir = TempDir::new().unwrap();
    let levels = level_set(3, 0);

    // Level zero is already in the store; level one lives at the origin
    let level_zero: Vec<TileKey> = levels
        .top_level_tiles()
        .unwrap()
        .iter()
        .map(|t| t.key().clone())
        .collect();
    write_tiles(store_dir.path(), &levels, &level_zero);

    let level_one: Vec<TileKey> = level_zero
        .iter()
        .flat_map(|k| {
            let (r, c) = (k.row() * 2, k.col() * 2);
            [(r, c), (r, c + 1), (r + 1, c), (r + 1, c + 1)]
        })
        .map(|(r, c)| TileKey::new(1, r, c, CACHE_NAME))
        .collect();
    write_tiles(origin_dir.path(), &levels, &level_one);

    let cache = memory_cache();
    let source = Arc::new(CachedTextureSource::new(
        Arc::clone(&levels),
        FileStore::new(store_dir.path()),
        Arc::new(LocalRetriever::new(origin_dir.path())),
        Arc::clone(&cache),
    ));
    let mut layer = TiledImageLayer::new(
        LayerConfig::new("files").with_force_level_zero_loads(true),
        Arc::clone(&levels),
        Arc::clone(&cache),
        source.clone(),
        Arc::new(InlineTaskService::new()),
    )
    .unwrap();

    // Far enough out that level one satisfies every visible tile
    let far = view(60_000_000.0);
    let first = layer.render(&far);
    assert_eq!(first.stats.missing, 0);
    assert!(first.stats.fallback > 0);
    assert!(first.draw_list.iter().all(|e| e.tile.level_number() == 1));

    let settled = layer.render(&far);
    assert_eq!(settled.stats.own, settled.stats.tiles_drawn);

    // Retrieved tiles were copied into the store
    let store = source.store();
    let copied = level_one
        .iter()
        .filter(|k| store.contains(&levels.create_tile(k).unwrap().path()))
        .count();
    assert_eq!(copied, settled.stats.own);

    // Level two exists nowhere: it falls back to level one and is marked
    // absent instead of being requested every frame
    let near = view(5_000_000.0);
    let report = layer.render(&near);
    let level_two: Vec<_> = report
        .draw_list
        .iter()
        .filter(|e| e.tile.level_number() == 2)
        .collect();
    assert!(!level_two.is_empty());
    for entry in &level_two {
        assert!(levels.is_resource_absent(entry.tile.key()));
        match &entry.binding {
            TextureBinding::Fallback { tile, .. } => assert_eq!(tile.level_number(), 1),
            other => panic!("expected a level-one fallback, got {:?}", other),
        }
    }
    assert_fallbacks_resident(&report.draw_list, cache.as_ref());

    let again = layer.render(&near);
    assert_eq!(again.stats.requested, 0);
}
