//! Texture residency and on-disk storage
//!
//! - [`TextureCache`] / [`MemoryTextureCache`]: decoded textures in memory,
//!   bounded by a byte budget, queried by the render thread every frame
//! - [`FileStore`]: encoded tile files on disk, touched only by workers

mod disk;
mod memory;
mod traits;

pub use disk::{FileStore, CACHE_DIR_NAME};
pub use memory::{MemoryCacheStats, MemoryTextureCache, DEFAULT_MEMORY_CACHE_BYTES};
pub use traits::{CachedTexture, StoreError, TextureCache};
