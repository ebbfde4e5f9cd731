//! Tiles of the imagery pyramid
//!
//! Provides tile identity ([`TileKey`]), the tile value used during
//! traversal ([`TextureTile`]), and the row/column grid arithmetic shared
//! by level sets and tiles.

pub mod grid;
mod key;
mod texture_tile;

pub use key::TileKey;
pub use texture_tile::TextureTile;
