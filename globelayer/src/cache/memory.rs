//! In-memory texture cache with size-bounded eviction using moka.
//!
//! Lookups happen on the render thread every frame, so the cache uses
//! `moka::sync::Cache`, whose reads are lock-free. Inserts come from
//! worker threads. Pinned entries live in a separate map that eviction
//! never touches.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use moka::notification::RemovalCause;
use moka::sync::Cache;

use crate::texture::TextureData;
use crate::tile::TileKey;

use super::traits::{CachedTexture, TextureCache};

/// Default memory budget: 512 MB.
pub const DEFAULT_MEMORY_CACHE_BYTES: u64 = 512 * 1024 * 1024;

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size_bytes: u64,
    pub entry_count: u64,
    pub pinned_count: u64,
}

/// Texture cache backed by moka with a byte-size weigher.
pub struct MemoryTextureCache {
    cache: Cache<TileKey, Arc<CachedTexture>>,
    pinned: DashMap<TileKey, Arc<CachedTexture>>,
    pinned_bytes: AtomicU64,
    max_size_bytes: u64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: Arc<AtomicU64>,
}

impl MemoryTextureCache {
    /// Create a cache holding at most `max_size_bytes` of evictable textures.
    pub fn new(max_size_bytes: u64) -> Self {
        let evictions = Arc::new(AtomicU64::new(0));
        let listener_evictions = Arc::clone(&evictions);

        let cache = Cache::builder()
            .weigher(|_key: &TileKey, value: &Arc<CachedTexture>| -> u32 {
                value.size_in_bytes().min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes)
            .eviction_listener(move |_key, _value, cause| {
                if cause == RemovalCause::Size {
                    listener_evictions.fetch_add(1, Ordering::Relaxed);
                }
            })
            .build();

        Self {
            cache,
            pinned: DashMap::new(),
            pinned_bytes: AtomicU64::new(0),
            max_size_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions,
        }
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Applies pending evictions. Mostly useful in tests, where moka's
    /// lazy maintenance would otherwise make sizes lag behind inserts.
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
        self.pinned.clear();
        self.pinned_bytes.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> MemoryCacheStats {
        MemoryCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size_bytes: self.size_bytes(),
            entry_count: self.entry_count(),
            pinned_count: self.pinned.len() as u64,
        }
    }
}

impl Default for MemoryTextureCache {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CACHE_BYTES)
    }
}

impl TextureCache for MemoryTextureCache {
    fn is_resident(&self, key: &TileKey) -> bool {
        self.pinned.contains_key(key) || self.cache.contains_key(key)
    }

    fn get(&self, key: &TileKey) -> Option<Arc<CachedTexture>> {
        let found = match self.pinned.get(key) {
            Some(entry) => Some(Arc::clone(entry.value())),
            None => self.cache.get(key),
        };
        match found {
            Some(texture) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(texture)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn insert(&self, key: TileKey, texture: TextureData) {
        self.cache.insert(key, Arc::new(CachedTexture::new(texture)));
    }

    fn pin(&self, key: TileKey, texture: TextureData) {
        let entry = Arc::new(CachedTexture::new(texture));
        let size = entry.size_in_bytes() as u64;
        self.cache.invalidate(&key);
        if let Some(previous) = self.pinned.insert(key, entry) {
            self.pinned_bytes
                .fetch_sub(previous.size_in_bytes() as u64, Ordering::Relaxed);
        }
        self.pinned_bytes.fetch_add(size, Ordering::Relaxed);
    }

    fn remove(&self, key: &TileKey) {
        self.cache.invalidate(key);
        if let Some((_, previous)) = self.pinned.remove(key) {
            self.pinned_bytes
                .fetch_sub(previous.size_in_bytes() as u64, Ordering::Relaxed);
        }
    }

    fn size_bytes(&self) -> u64 {
        self.cache.weighted_size() + self.pinned_bytes.load(Ordering::Relaxed)
    }

    fn entry_count(&self) -> u64 {
        self.cache.entry_count() + self.pinned.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texture(side: u32) -> TextureData {
        TextureData::solid(side, side, [1, 2, 3, 255]).unwrap()
    }

    fn key(col: u32) -> TileKey {
        TileKey::new(2, 1, col, "Earth/Test")
    }

    #[test]
    fn test_insert_and_get() {
        let cache = MemoryTextureCache::new(1024 * 1024);
        assert!(cache.get(&key(0)).is_none());

        cache.insert(key(0), texture(8));
        let entry = cache.get(&key(0)).unwrap();
        assert_eq!(entry.texture().width(), 8);
        assert!(entry.updated_at() > 0);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_size_limit_evicts() {
        // Each 16x16 texture weighs 1 KiB; room for four
        let cache = MemoryTextureCache::new(4 * 1024);
        for col in 0..32 {
            cache.insert(key(col), texture(16));
        }
        cache.run_pending_tasks();

        assert!(cache.size_bytes() <= 4 * 1024);
        assert!(cache.entry_count() <= 4);
    }

    #[test]
    fn test_pinned_entries_survive_pressure() {
        let cache = MemoryTextureCache::new(2 * 1024);
        let level_zero = TileKey::new(0, 0, 0, "Earth/Test");
        cache.pin(level_zero.clone(), texture(16));

        for col in 0..32 {
            cache.insert(key(col), texture(16));
        }
        cache.run_pending_tasks();

        assert!(cache.is_resident(&level_zero));
        assert_eq!(cache.stats().pinned_count, 1);
    }

    #[test]
    fn test_remove() {
        let cache = MemoryTextureCache::new(1024 * 1024);
        cache.pin(key(1), texture(4));
        cache.insert(key(2), texture(4));
        cache.remove(&key(1));
        cache.remove(&key(2));
        assert!(!cache.is_resident(&key(1)));
        assert!(!cache.is_resident(&key(2)));
        assert_eq!(cache.stats().pinned_count, 0);
    }

    #[test]
    fn test_expiry_check() {
        let entry = CachedTexture::with_update_time(texture(2), 1_000);
        assert!(entry.is_expired(2_000));
        assert!(!entry.is_expired(500));
        let never_stamped = CachedTexture::with_update_time(texture(2), 0);
        assert!(!never_stamped.is_expired(2_000));
    }
}
