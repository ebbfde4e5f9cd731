//! Texture data for GlobeLayer.
//!
//! Textures are decoded to RGBA8 on worker threads and handed to the
//! texture cache. Nothing in this module touches a graphics API; uploading
//! pixels is left to the host renderer.
//!
//! # Example
//!
//! ```
//! use globelayer::texture::TextureData;
//!
//! let texture = TextureData::solid(16, 16, [0, 64, 128, 255]).unwrap();
//! let png = texture.encode_png().unwrap();
//! let decoded = TextureData::decode(&png).unwrap();
//! assert_eq!(decoded.width(), 16);
//! assert_eq!(decoded.size_in_bytes(), 16 * 16 * 4);
//! ```

mod data;
mod error;
mod transform;

pub use data::TextureData;
pub use error::TextureError;
pub use transform::SubRectTransform;
