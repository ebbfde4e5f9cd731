//! Texture sources
//!
//! A texture source turns a tile into a resident texture. It runs on load
//! workers (except for the one-time forced level-zero load) and is the only
//! component that writes to the texture cache.
//!
//! - [`CachedTextureSource`]: file store first, then a [`Retriever`],
//!   writing retrieved bytes back to the store
//! - [`ProceduralTextureSource`]: textures computed from the tile itself
//!
//! [`Retriever`]: crate::retrieve::Retriever

mod cached;
mod procedural;

pub use cached::CachedTextureSource;
pub use procedural::{level_tint, ProceduralTextureSource};

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cache::TextureCache;
use crate::texture::TextureData;
use crate::tile::TextureTile;

/// Where an installed texture came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    FileStore,
    Retrieved,
    Generated,
}

/// Why a tile has no imagery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsentReason {
    /// Placeholder or inactive level
    EmptyLevel,
    /// Data could not be decoded even after a fresh retrieval
    Corrupt,
    /// Remote retrieval is turned off
    NetworkDisabled,
    /// Server returned text instead of an image
    TextResponse,
}

/// Result of one load attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(LoadOrigin),
    /// A fresh texture was already in memory
    AlreadyResident,
    Absent(AbsentReason),
    Failed(String),
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded(_))
    }
}

impl fmt::Display for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadOutcome::Loaded(origin) => write!(f, "loaded ({:?})", origin),
            LoadOutcome::AlreadyResident => write!(f, "already resident"),
            LoadOutcome::Absent(reason) => write!(f, "absent ({:?})", reason),
            LoadOutcome::Failed(msg) => write!(f, "failed: {}", msg),
        }
    }
}

/// Produces textures for tiles.
pub trait TextureSource: Send + Sync {
    fn name(&self) -> &str;

    /// Full asynchronous-path load. Runs on a worker thread and may block.
    fn load(&self, tile: &TextureTile) -> LoadOutcome;

    /// Synchronous load from local data only, used once for level-zero
    /// tiles. Returns whether a texture was installed.
    fn force_load(&self, tile: &TextureTile) -> bool;

    /// Pin level-zero textures installed from now on.
    fn set_retain_level_zero(&self, _retain: bool) {}

    /// Allow or forbid remote retrieval. Sources without a remote origin
    /// ignore it.
    fn set_network_retrieval_enabled(&self, _enabled: bool) {}
}

/// Installs decoded textures into the texture cache.
///
/// Level-zero textures are pinned when `retain_level_zero` is set so the
/// coarsest fallback is never evicted.
#[derive(Clone)]
pub struct TextureInstaller {
    cache: Arc<dyn TextureCache>,
    retain_level_zero: Arc<AtomicBool>,
}

impl TextureInstaller {
    pub fn new(cache: Arc<dyn TextureCache>, retain_level_zero: bool) -> Self {
        Self {
            cache,
            retain_level_zero: Arc::new(AtomicBool::new(retain_level_zero)),
        }
    }

    pub fn set_retain_level_zero(&self, retain: bool) {
        self.retain_level_zero.store(retain, Ordering::Relaxed);
    }

    pub fn retains_level_zero(&self) -> bool {
        self.retain_level_zero.load(Ordering::Relaxed)
    }

    pub fn cache(&self) -> &Arc<dyn TextureCache> {
        &self.cache
    }

    pub fn install(&self, tile: &TextureTile, texture: TextureData) {
        if self.retains_level_zero() && tile.level_number() == 0 {
            self.cache.pin(tile.key().clone(), texture);
        } else {
            self.cache.insert(tile.key().clone(), texture);
        }
    }

    /// Whether a non-expired texture for the tile is in memory.
    pub fn has_fresh_texture(&self, tile: &TextureTile) -> bool {
        self.cache
            .get(tile.key())
            .is_some_and(|entry| !entry.is_expired(tile.level().expiry_time()))
    }
}
