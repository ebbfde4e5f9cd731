//! The per-frame list of tiles to draw.

use std::cmp::Ordering;

use crate::texture::SubRectTransform;
use crate::tile::TextureTile;

/// Which texture a selected tile is drawn with.
#[derive(Debug, Clone, PartialEq)]
pub enum TextureBinding {
    /// The tile's own texture is resident
    Own,
    /// A resident ancestor's texture, sampled through `transform`
    Fallback {
        tile: TextureTile,
        transform: SubRectTransform,
    },
    /// Nothing to draw with yet (only the top of the pyramid, or tiles
    /// whose ancestors are all missing)
    Missing,
}

/// Discriminant of a [`TextureBinding`], for logs and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Own,
    Fallback,
    Missing,
}

impl TextureBinding {
    pub fn kind(&self) -> BindingKind {
        match self {
            TextureBinding::Own => BindingKind::Own,
            TextureBinding::Fallback { .. } => BindingKind::Fallback,
            TextureBinding::Missing => BindingKind::Missing,
        }
    }
}

/// A selected tile and the texture to draw it with.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawTile {
    pub tile: TextureTile,
    pub binding: TextureBinding,
}

impl DrawTile {
    pub fn new(tile: TextureTile, binding: TextureBinding) -> Self {
        Self { tile, binding }
    }

    /// Level of the texture actually drawn: the fallback's level when
    /// borrowing, the tile's own level otherwise.
    pub fn texture_level(&self) -> u32 {
        match &self.binding {
            TextureBinding::Fallback { tile, .. } => tile.level_number(),
            _ => self.tile.level_number(),
        }
    }
}

/// Orders draw tiles so coarser textures are drawn first and finer ones
/// overdraw them.
pub fn compare_texture_level(a: &DrawTile, b: &DrawTile) -> Ordering {
    a.texture_level().cmp(&b.texture_level())
}

/// Tiles selected for one frame.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    tiles: Vec<DrawTile>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tile: DrawTile) {
        self.tiles.push(tile);
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DrawTile> {
        self.tiles.iter()
    }

    pub fn tiles(&self) -> &[DrawTile] {
        &self.tiles
    }

    /// Stable sort by [`compare_texture_level`].
    pub fn sort_by_texture_level(&mut self) {
        self.tiles.sort_by(compare_texture_level);
    }

    pub fn count(&self, kind: BindingKind) -> usize {
        self.tiles.iter().filter(|t| t.binding.kind() == kind).count()
    }
}

impl IntoIterator for DrawList {
    type Item = DrawTile;
    type IntoIter = std::vec::IntoIter<DrawTile>;

    fn into_iter(self) -> Self::IntoIter {
        self.tiles.into_iter()
    }
}

impl<'a> IntoIterator for &'a DrawList {
    type Item = &'a DrawTile;
    type IntoIter = std::slice::Iter<'a, DrawTile>;

    fn into_iter(self) -> Self::IntoIter {
        self.tiles.iter()
    }
}
