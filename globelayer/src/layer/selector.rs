//! Level-of-detail selection.
//!
//! Each frame the layer walks the tile pyramid from the top-level tiles
//! down. A visible tile is drawn when it is fine enough for its distance
//! to the eye, or when no finer level exists; otherwise its four children
//! are visited. While descending, the deepest ancestor whose texture is
//! resident is carried along as the fallback ("resource") tile for any
//! descendant that has to be drawn before its own texture arrives.

use tracing::trace;

use crate::cache::TextureCache;
use crate::geo::Sector;
use crate::level::LevelSet;
use crate::tile::TextureTile;

use super::config::{LayerConfig, REFERENCE_FIELD_OF_VIEW};
use super::draw::{DrawList, DrawTile, TextureBinding};
use super::view::ViewState;

/// Screen-space error test deciding when a tile must be subdivided.
///
/// A tile splits when one of its texels, in meters, is larger than the
/// eye distance scaled by `10^-detail` and by the field of view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitCriterion {
    detail_factor: f64,
    polar_latitude: f64,
    polar_detail_factor: f64,
    fov_scale: f64,
}

impl SplitCriterion {
    pub fn new(config: &LayerConfig, field_of_view: f64) -> Self {
        let reference = (REFERENCE_FIELD_OF_VIEW.to_radians() * 0.5).tan();
        let fov_scale = ((field_of_view.to_radians() * 0.5).tan() / reference).clamp(0.0, 1.0);
        Self {
            detail_factor: config.detail_factor(),
            polar_latitude: config.polar_latitude,
            polar_detail_factor: config.polar_detail_factor,
            fov_scale,
        }
    }

    pub fn fov_scale(&self) -> f64 {
        self.fov_scale
    }

    /// Whether the whole sector lies poleward of the polar latitude.
    pub fn is_polar(&self, sector: &Sector) -> bool {
        sector.min_lat() >= self.polar_latitude || sector.max_lat() <= -self.polar_latitude
    }

    /// `10^-s`, with `s` discounted for polar sectors.
    pub fn detail_scale(&self, sector: &Sector) -> f64 {
        let mut s = self.detail_factor;
        if self.is_polar(sector) {
            s *= self.polar_detail_factor;
        }
        10f64.powf(-s)
    }

    /// Largest texel size, in meters, a tile at `eye_distance` may have
    /// without splitting.
    pub fn threshold(&self, sector: &Sector, eye_distance: f64) -> f64 {
        eye_distance * self.detail_scale(sector) * self.fov_scale
    }

    /// Strict comparison: a texel exactly at the threshold does not split.
    pub fn needs_split(&self, texel_meters: f64, sector: &Sector, eye_distance: f64) -> bool {
        texel_meters > self.threshold(sector, eye_distance)
    }
}

/// Per-frame traversal counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionStats {
    pub visited: usize,
    pub culled: usize,
}

/// Output of one traversal.
#[derive(Debug, Default)]
pub struct Selection {
    pub draw_list: DrawList,
    /// Tiles drawn without their own texture that should be loaded
    pub requests: Vec<TextureTile>,
    pub stats: SelectionStats,
}

/// One frame's traversal over the tile pyramid.
pub(crate) struct SelectionPass<'a> {
    levels: &'a LevelSet,
    view: &'a ViewState,
    cache: &'a dyn TextureCache,
    criterion: SplitCriterion,
    selection: Selection,
}

impl<'a> SelectionPass<'a> {
    pub(crate) fn new(
        levels: &'a LevelSet,
        view: &'a ViewState,
        cache: &'a dyn TextureCache,
        criterion: SplitCriterion,
    ) -> Self {
        Self {
            levels,
            view,
            cache,
            criterion,
            selection: Selection::default(),
        }
    }

    pub(crate) fn assemble(mut self, top_levels: &[TextureTile]) -> Selection {
        for tile in top_levels {
            if self.is_tile_visible(tile) {
                self.visit(tile, None);
            } else {
                self.selection.stats.culled += 1;
            }
        }
        self.selection
    }

    fn is_tile_visible(&self, tile: &TextureTile) -> bool {
        let extent = tile.extent(self.view.globe.as_ref(), self.view.vertical_exaggeration);
        self.view.frustum.intersects_sphere(&extent)
            && self
                .view
                .visible_sector
                .map_or(true, |visible| visible.intersects(tile.sector()))
    }

    fn is_resident(&self, tile: &TextureTile) -> bool {
        self.cache.is_resident(tile.key())
    }

    fn meets_render_criteria(&self, tile: &TextureTile) -> bool {
        // Levels below the deepest one with imagery are never drawn
        let final_level = self
            .levels
            .last_drawable_level_for_sector(tile.sector())
            .map_or(0, |level| level.number());
        if tile.level_number() >= final_level {
            return true;
        }
        // Placeholder levels have nothing to show; always look deeper
        if tile.level().is_empty() {
            return false;
        }

        let globe = self.view.globe.as_ref();
        let texel_meters = globe.radius() * tile.level().texel_size();
        let eye_distance =
            tile.eye_distance(globe, self.view.eye_point, self.view.vertical_exaggeration);
        !self
            .criterion
            .needs_split(texel_meters, tile.sector(), eye_distance)
    }

    fn visit<'t>(&mut self, tile: &'t TextureTile, resource: Option<&'t TextureTile>) {
        self.selection.stats.visited += 1;

        if self.meets_render_criteria(tile) {
            self.select(tile, resource);
            return;
        }

        let cursor = if tile.level_number() == 0 || self.is_resident(tile) {
            Some(tile)
        } else {
            resource
        };

        let levels = self.levels;
        let Some(next_level) = levels.next_level(tile.level_number()) else {
            self.select(tile, cursor);
            return;
        };

        for child in tile.subdivide(next_level) {
            if !levels.sector().intersects(child.sector()) {
                continue;
            }
            if self.is_tile_visible(&child) {
                self.visit(&child, cursor);
            } else {
                self.selection.stats.culled += 1;
            }
        }
    }

    fn select(&mut self, tile: &TextureTile, resource: Option<&TextureTile>) {
        if tile.level().is_empty() {
            return;
        }

        if self.is_resident(tile) {
            self.push(tile, TextureBinding::Own);
            return;
        }

        if !self.levels.is_resource_absent(tile.key()) {
            self.selection.requests.push(tile.clone());
        }

        let binding = match resource {
            Some(fallback) if self.is_resident(fallback) => match tile.transform_within(fallback) {
                Some(transform) => TextureBinding::Fallback {
                    tile: fallback.clone(),
                    transform,
                },
                None => TextureBinding::Missing,
            },
            _ => TextureBinding::Missing,
        };
        trace!(tile = %tile.label(), binding = ?binding.kind(), "Selected tile");
        self.push(tile, binding);
    }

    fn push(&mut self, tile: &TextureTile, binding: TextureBinding) {
        self.selection.draw_list.push(DrawTile::new(tile.clone(), binding));
    }
}
