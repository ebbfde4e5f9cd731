//! File-store-backed texture source with retrieval.
//!
//! # Load sequence
//!
//! 1. If a fresh texture is already resident, do nothing.
//! 2. Look for the tile in the file store. Expired files are deleted and
//!    treated as missing. A file that fails to decode is deleted and
//!    treated as missing.
//! 3. Retrieve the tile, write it to the store, and read it back once.
//!    Data that still fails to decode marks the tile absent for good.
//!
//! Retrieval failures mark the tile absent under the level's retry policy.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::{FileStore, TextureCache};
use crate::level::LevelSet;
use crate::retrieve::{RetrieveError, Retriever};
use crate::telemetry::LayerMetrics;
use crate::texture::TextureData;
use crate::tile::TextureTile;

use super::{AbsentReason, LoadOrigin, LoadOutcome, TextureInstaller, TextureSource};

/// Result of reading a tile from the file store.
#[derive(Debug, PartialEq, Eq)]
enum StoreRead {
    Loaded,
    Missing,
    Corrupt,
}

/// Texture source backed by a [`FileStore`] and a [`Retriever`].
pub struct CachedTextureSource {
    levels: Arc<LevelSet>,
    store: FileStore,
    retriever: Arc<dyn Retriever>,
    installer: TextureInstaller,
    network_enabled: AtomicBool,
    metrics: Arc<LayerMetrics>,
}

impl CachedTextureSource {
    pub fn new(
        levels: Arc<LevelSet>,
        store: FileStore,
        retriever: Arc<dyn Retriever>,
        cache: Arc<dyn TextureCache>,
    ) -> Self {
        Self {
            levels,
            store,
            retriever,
            installer: TextureInstaller::new(cache, false),
            network_enabled: AtomicBool::new(true),
            metrics: Arc::new(LayerMetrics::new()),
        }
    }

    /// Keep level-zero textures out of eviction.
    pub fn with_retain_level_zero(self, retain: bool) -> Self {
        self.installer.set_retain_level_zero(retain);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<LayerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_network_retrieval(self, enabled: bool) -> Self {
        self.set_network_retrieval_enabled(enabled);
        self
    }

    pub fn set_network_retrieval_enabled(&self, enabled: bool) {
        self.network_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_network_retrieval_enabled(&self) -> bool {
        self.network_enabled.load(Ordering::Relaxed)
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<LayerMetrics> {
        &self.metrics
    }

    fn mark_absent(&self, tile: &TextureTile) {
        self.levels.mark_resource_absent(tile.key());
        self.metrics.resource_marked_absent();
    }

    fn mark_permanently_absent(&self, tile: &TextureTile) {
        self.levels.mark_resource_permanently_absent(tile.key());
        self.metrics.resource_marked_absent();
    }

    fn discard(&self, path: &Path) {
        if let Err(e) = self.store.remove(path) {
            warn!(path = %path.display(), error = %e, "Failed to delete cache file");
        }
    }

    fn read_from_store(&self, tile: &TextureTile) -> StoreRead {
        let Some(path) = self.store.find(&tile.path()) else {
            return StoreRead::Missing;
        };

        if self.store.is_expired(&path, tile.level().expiry_time()) {
            debug!(tile = %tile.label(), path = %path.display(), "Deleting expired cache file");
            self.discard(&path);
            self.metrics.expired_file_deleted();
            return StoreRead::Missing;
        }

        let bytes = match self.store.read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(tile = %tile.label(), error = %e, "Failed to read cache file");
                return StoreRead::Missing;
            }
        };

        match TextureData::decode(&bytes) {
            Ok(texture) => {
                self.installer.install(tile, texture);
                self.levels.unmark_resource_absent(tile.key());
                StoreRead::Loaded
            }
            Err(e) => {
                info!(
                    tile = %tile.label(),
                    path = %path.display(),
                    error = %e,
                    "Deleted corrupt texture file"
                );
                self.discard(&path);
                self.metrics.corrupt_file_deleted();
                StoreRead::Corrupt
            }
        }
    }

    fn retrieve(&self, tile: &TextureTile) -> LoadOutcome {
        if self.retriever.is_remote() && !self.is_network_retrieval_enabled() {
            self.mark_absent(tile);
            return LoadOutcome::Absent(AbsentReason::NetworkDisabled);
        }

        let bytes = match self.retriever.retrieve(tile) {
            Ok(bytes) => bytes,
            Err(RetrieveError::TextResponse {
                content_type,
                excerpt,
            }) => {
                warn!(
                    tile = %tile.label(),
                    content_type = %content_type,
                    response = %excerpt,
                    "Retrieval returned text instead of an image"
                );
                self.mark_absent(tile);
                self.metrics.load_failed();
                return LoadOutcome::Absent(AbsentReason::TextResponse);
            }
            Err(e) => {
                debug!(tile = %tile.label(), retriever = self.retriever.name(), error = %e, "Retrieval failed");
                self.mark_absent(tile);
                self.metrics.load_failed();
                return LoadOutcome::Failed(e.to_string());
            }
        };
        self.metrics.texture_retrieved(bytes.len());

        if let Err(e) = self.store.write(&tile.path(), &bytes) {
            warn!(tile = %tile.label(), error = %e, "Failed to write retrieved tile");
            self.mark_absent(tile);
            self.metrics.load_failed();
            return LoadOutcome::Failed(e.to_string());
        }

        match self.read_from_store(tile) {
            StoreRead::Loaded => LoadOutcome::Loaded(LoadOrigin::Retrieved),
            StoreRead::Corrupt => {
                self.mark_permanently_absent(tile);
                self.metrics.load_failed();
                LoadOutcome::Absent(AbsentReason::Corrupt)
            }
            StoreRead::Missing => {
                self.mark_absent(tile);
                self.metrics.load_failed();
                LoadOutcome::Failed(format!("{} missing after write", tile.path()))
            }
        }
    }
}

impl TextureSource for CachedTextureSource {
    fn name(&self) -> &str {
        self.retriever.name()
    }

    fn load(&self, tile: &TextureTile) -> LoadOutcome {
        if tile.level().is_empty() {
            return LoadOutcome::Absent(AbsentReason::EmptyLevel);
        }
        if self.installer.has_fresh_texture(tile) {
            return LoadOutcome::AlreadyResident;
        }
        if self.read_from_store(tile) == StoreRead::Loaded {
            self.metrics.texture_loaded_from_disk();
            return LoadOutcome::Loaded(LoadOrigin::FileStore);
        }
        self.retrieve(tile)
    }

    fn force_load(&self, tile: &TextureTile) -> bool {
        if tile.level().is_empty() {
            return false;
        }
        let loaded = self.read_from_store(tile) == StoreRead::Loaded;
        if loaded {
            self.metrics.texture_loaded_from_disk();
        }
        loaded
    }

    fn set_retain_level_zero(&self, retain: bool) {
        self.installer.set_retain_level_zero(retain);
    }

    fn set_network_retrieval_enabled(&self, enabled: bool) {
        self.network_enabled.store(enabled, Ordering::Relaxed);
    }
}
