//! Texture coordinate transforms for drawing with an ancestor's texture.

use crate::geo::Sector;

/// Maps a tile's unit texture coordinates into the sub-rectangle of an
/// enclosing tile's texture.
///
/// `s` runs west to east and `t` south to north.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubRectTransform {
    pub scale_s: f64,
    pub scale_t: f64,
    pub offset_s: f64,
    pub offset_t: f64,
}

impl SubRectTransform {
    pub const IDENTITY: SubRectTransform = SubRectTransform {
        scale_s: 1.0,
        scale_t: 1.0,
        offset_s: 0.0,
        offset_t: 0.0,
    };

    /// Transform placing `inner` within `outer`.
    ///
    /// Returns `None` if `outer` does not contain `inner` or is degenerate.
    pub fn between(inner: &Sector, outer: &Sector) -> Option<Self> {
        if !outer.contains_sector(inner) || outer.delta_lat() <= 0.0 || outer.delta_lon() <= 0.0 {
            return None;
        }
        Some(Self {
            scale_s: inner.delta_lon() / outer.delta_lon(),
            scale_t: inner.delta_lat() / outer.delta_lat(),
            offset_s: (inner.min_lon() - outer.min_lon()) / outer.delta_lon(),
            offset_t: (inner.min_lat() - outer.min_lat()) / outer.delta_lat(),
        })
    }

    /// Applies the transform to a texture coordinate.
    pub fn apply(&self, s: f64, t: f64) -> (f64, f64) {
        (
            self.offset_s + s * self.scale_s,
            self.offset_t + t * self.scale_t,
        )
    }
}

impl Default for SubRectTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadrant_transform() {
        let outer = Sector::from_degrees(0.0, 36.0, 0.0, 36.0).unwrap();
        let [_, se, _, _] = outer.subdivide();
        let transform = SubRectTransform::between(&se, &outer).unwrap();

        assert_eq!(transform.scale_s, 0.5);
        assert_eq!(transform.scale_t, 0.5);
        assert_eq!(transform.apply(0.0, 0.0), (0.5, 0.0));
        assert_eq!(transform.apply(1.0, 1.0), (1.0, 0.5));
    }

    #[test]
    fn test_same_sector_is_identity() {
        let s = Sector::from_degrees(10.0, 20.0, 30.0, 40.0).unwrap();
        assert_eq!(
            SubRectTransform::between(&s, &s),
            Some(SubRectTransform::IDENTITY)
        );
    }

    #[test]
    fn test_non_containing_sector() {
        let a = Sector::from_degrees(0.0, 10.0, 0.0, 10.0).unwrap();
        let b = Sector::from_degrees(5.0, 15.0, 0.0, 10.0).unwrap();
        assert!(SubRectTransform::between(&b, &a).is_none());
    }
}
