//! Core traits and types for texture residency.
//!
//! The [`TextureCache`] trait is the only state shared between the render
//! thread and the load workers. The render thread asks whether a tile is
//! resident; workers install decoded textures. Implementations must be
//! safe to call from both sides at once.
//!
//! # Example
//!
//! ```
//! use globelayer::cache::{MemoryTextureCache, TextureCache};
//! use globelayer::texture::TextureData;
//! use globelayer::tile::TileKey;
//!
//! let cache = MemoryTextureCache::new(64 * 1024 * 1024);
//! let key = TileKey::new(0, 2, 5, "Earth/BlueMarble");
//! assert!(!cache.is_resident(&key));
//!
//! cache.insert(key.clone(), TextureData::solid(4, 4, [0, 0, 0, 255]).unwrap());
//! assert!(cache.is_resident(&key));
//! ```

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::texture::TextureData;
use crate::tile::TileKey;

/// A resident texture and the time it was installed.
#[derive(Debug)]
pub struct CachedTexture {
    texture: TextureData,
    /// Milliseconds since the Unix epoch
    updated_at: i64,
}

impl CachedTexture {
    pub fn new(texture: TextureData) -> Self {
        Self::with_update_time(texture, Utc::now().timestamp_millis())
    }

    pub fn with_update_time(texture: TextureData, updated_at: i64) -> Self {
        Self {
            texture,
            updated_at,
        }
    }

    pub fn texture(&self) -> &TextureData {
        &self.texture
    }

    pub fn updated_at(&self) -> i64 {
        self.updated_at
    }

    /// Whether the texture was installed before `expiry_time`.
    pub fn is_expired(&self, expiry_time: i64) -> bool {
        self.updated_at > 0 && self.updated_at < expiry_time
    }

    pub fn size_in_bytes(&self) -> usize {
        self.texture.size_in_bytes()
    }
}

/// Size-bounded store of decoded textures keyed by tile.
pub trait TextureCache: Send + Sync {
    /// Whether a texture for `key` is currently in memory.
    fn is_resident(&self, key: &TileKey) -> bool;

    fn get(&self, key: &TileKey) -> Option<Arc<CachedTexture>>;

    /// Installs a texture, evicting older entries as needed.
    fn insert(&self, key: TileKey, texture: TextureData);

    /// Installs a texture that is exempt from eviction.
    fn pin(&self, key: TileKey, texture: TextureData) {
        self.insert(key, texture);
    }

    fn remove(&self, key: &TileKey);

    /// Bytes held, including pinned entries.
    fn size_bytes(&self) -> u64;

    fn entry_count(&self) -> u64;
}

/// Errors from the on-disk tile store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error while touching a cache file.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Relative path that would escape the store root.
    #[error("Invalid cache path: {0}")]
    InvalidPath(String),

    /// No usable cache directory could be determined.
    #[error("No cache directory available")]
    NoCacheDirectory,
}
