//! Imagery tiles.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use glam::DVec3;

use crate::geo::{BoundingSphere, Globe, LatLon, Sector};
use crate::level::Level;
use crate::texture::SubRectTransform;

use super::key::TileKey;

/// One cell of one level of the tile pyramid.
///
/// Tiles are cheap values created on demand during traversal; texture
/// residency lives in the texture cache, keyed by [`TileKey`]. Equality,
/// hashing and ordering use the key only.
#[derive(Clone)]
pub struct TextureTile {
    key: TileKey,
    sector: Sector,
    level: Arc<Level>,
}

impl TextureTile {
    pub fn new(sector: Sector, level: Arc<Level>, row: u32, col: u32) -> Self {
        let key = TileKey::with_shared_name(level.number(), row, col, level.shared_cache_name());
        Self { key, sector, level }
    }

    pub fn key(&self) -> &TileKey {
        &self.key
    }

    pub fn sector(&self) -> &Sector {
        &self.sector
    }

    pub fn level(&self) -> &Arc<Level> {
        &self.level
    }

    pub fn level_number(&self) -> u32 {
        self.key.level()
    }

    pub fn row(&self) -> u32 {
        self.key.row()
    }

    pub fn col(&self) -> u32 {
        self.key.col()
    }

    pub fn width(&self) -> u32 {
        self.level.tile_width()
    }

    pub fn height(&self) -> u32 {
        self.level.tile_height()
    }

    /// Relative cache path: `<level path>/<row>/<row>_<col><suffix>`.
    ///
    /// Tiles on empty levels have no suffix since they never hold imagery.
    pub fn path(&self) -> String {
        let mut path = format!(
            "{}/{}/{}_{}",
            self.level.path(),
            self.row(),
            self.row(),
            self.col()
        );
        if !self.level.is_empty() {
            path.push_str(self.level.format_suffix());
        }
        path
    }

    /// Human readable identity, e.g. `3(3), 12, 40`.
    pub fn label(&self) -> String {
        format!(
            "{}({}), {}, {}",
            self.level_number(),
            self.level.name(),
            self.row(),
            self.col()
        )
    }

    /// The four tiles on `next_level` covering this tile, ordered
    /// (2r, 2c), (2r, 2c+1), (2r+1, 2c), (2r+1, 2c+1).
    pub fn subdivide(&self, next_level: &Arc<Level>) -> [TextureTile; 4] {
        let [sw, se, nw, ne] = self.sector.subdivide();
        let row = self.row() * 2;
        let col = self.col() * 2;
        [
            TextureTile::new(sw, Arc::clone(next_level), row, col),
            TextureTile::new(se, Arc::clone(next_level), row, col + 1),
            TextureTile::new(nw, Arc::clone(next_level), row + 1, col),
            TextureTile::new(ne, Arc::clone(next_level), row + 1, col + 1),
        ]
    }

    fn surface_point(&self, globe: &dyn Globe, position: LatLon, vertical_exaggeration: f64) -> DVec3 {
        globe.point_at(position, globe.elevation_at(position) * vertical_exaggeration)
    }

    /// Cartesian point at the sector centroid on the terrain surface.
    pub fn centroid_point(&self, globe: &dyn Globe, vertical_exaggeration: f64) -> DVec3 {
        self.surface_point(globe, self.sector.centroid(), vertical_exaggeration)
    }

    /// Shortest distance from `eye` to the tile's corners and centroid.
    pub fn eye_distance(&self, globe: &dyn Globe, eye: DVec3, vertical_exaggeration: f64) -> f64 {
        let mut nearest = self.centroid_point(globe, vertical_exaggeration).distance(eye);
        for corner in self.sector.corners() {
            let d = self
                .surface_point(globe, corner, vertical_exaggeration)
                .distance(eye);
            nearest = nearest.min(d);
        }
        nearest
    }

    /// Bounding volume used for frustum culling.
    pub fn extent(&self, globe: &dyn Globe, vertical_exaggeration: f64) -> BoundingSphere {
        BoundingSphere::from_sector(globe, &self.sector, vertical_exaggeration)
    }

    /// Transform for drawing this tile with `ancestor`'s texture.
    pub fn transform_within(&self, ancestor: &TextureTile) -> Option<SubRectTransform> {
        SubRectTransform::between(&self.sector, &ancestor.sector)
    }
}

impl PartialEq for TextureTile {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for TextureTile {}

impl Hash for TextureTile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for TextureTile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TextureTile {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Debug for TextureTile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureTile")
            .field("key", &self.key)
            .field("sector", &self.sector)
            .finish()
    }
}

impl fmt::Display for TextureTile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::SphericalGlobe;
    use crate::level::{LevelSet, LevelSetConfig};

    fn levels() -> LevelSet {
        LevelSet::new(
            LevelSetConfig::new("Earth/Test")
                .with_num_levels(4)
                .with_num_empty_levels(1)
                .with_format_suffix(".png"),
        )
        .unwrap()
    }

    #[test]
    fn test_path_has_suffix_only_on_non_empty_levels() {
        let set = levels();
        let top = set.create_tile(&TileKey::new(0, 2, 3, "Earth/Test")).unwrap();
        assert_eq!(top.path(), "Earth/Test//2/2_3");

        let tile = set.create_tile(&TileKey::new(2, 9, 14, "Earth/Test")).unwrap();
        assert_eq!(tile.path(), "Earth/Test/1/9/9_14.png");
    }

    #[test]
    fn test_label() {
        let set = levels();
        let tile = set.create_tile(&TileKey::new(2, 9, 14, "Earth/Test")).unwrap();
        assert_eq!(tile.label(), "2(1), 9, 14");
    }

    #[test]
    fn test_subdivide_matches_grid() {
        let set = levels();
        let tile = set.create_tile(&TileKey::new(1, 3, 5, "Earth/Test")).unwrap();
        let next = set.level(2).unwrap();

        for child in tile.subdivide(next) {
            let from_key = set.sector_for_key(child.key()).unwrap();
            assert_eq!(child.sector(), &from_key);
            assert_eq!(child.key().parent().as_ref(), Some(tile.key()));
        }
    }

    #[test]
    fn test_eye_distance_uses_nearest_sample() {
        let set = levels();
        let globe = SphericalGlobe::earth();
        let tile = set.create_tile(&TileKey::new(0, 2, 5, "Earth/Test")).unwrap();
        // Eye right above the south-west corner
        let corner = tile.sector().corners()[0];
        let eye = globe.point_at(corner, 1000.0);
        assert!((tile.eye_distance(&globe, eye, 1.0) - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_transform_within_ancestor() {
        let set = levels();
        let parent = set.create_tile(&TileKey::new(1, 3, 5, "Earth/Test")).unwrap();
        let [_, _, nw, _] = parent.subdivide(set.level(2).unwrap());
        let transform = nw.transform_within(&parent).unwrap();
        assert_eq!(transform.apply(0.0, 0.0), (0.0, 0.5));
    }

    #[test]
    fn test_equality_by_key() {
        let set = levels();
        let a = set.create_tile(&TileKey::new(1, 3, 5, "Earth/Test")).unwrap();
        let b = set.create_tile(&TileKey::new(1, 3, 5, "Earth/Test")).unwrap();
        let c = set.create_tile(&TileKey::new(1, 3, 6, "Earth/Test")).unwrap();
        assert_eq!(a, b);
        assert!(a < c);
    }
}
