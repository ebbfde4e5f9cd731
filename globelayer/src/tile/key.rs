//! Tile identity.

use std::fmt;
use std::sync::Arc;

/// Identity of a tile within a level set.
///
/// Two keys are equal when level, row, column and cache name all match.
/// Keys order by level, then row, then column, so sorting a set of keys
/// yields coarse tiles first.
///
/// # Example
///
/// ```
/// use globelayer::tile::TileKey;
///
/// let key = TileKey::new(3, 5, 7, "Earth/BlueMarble");
/// assert_eq!(key.level(), 3);
/// assert_eq!(key.row(), 5);
/// assert_eq!(key.col(), 7);
/// assert_eq!(key.to_string(), "Earth/BlueMarble/3/5/7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    level: u32,
    row: u32,
    col: u32,
    cache_name: Arc<str>,
}

impl TileKey {
    /// Create a new tile key.
    pub fn new(level: u32, row: u32, col: u32, cache_name: impl Into<Arc<str>>) -> Self {
        Self {
            level,
            row,
            col,
            cache_name: cache_name.into(),
        }
    }

    pub(crate) fn with_shared_name(level: u32, row: u32, col: u32, cache_name: Arc<str>) -> Self {
        Self {
            level,
            row,
            col,
            cache_name,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn col(&self) -> u32 {
        self.col
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    /// Key of the tile one level coarser that contains this one.
    ///
    /// Returns `None` at level zero.
    pub fn parent(&self) -> Option<TileKey> {
        if self.level == 0 {
            return None;
        }
        Some(Self::with_shared_name(
            self.level - 1,
            self.row / 2,
            self.col / 2,
            Arc::clone(&self.cache_name),
        ))
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.cache_name, self.level, self.row, self.col
        )
    }
}
