//! Tile URL construction.

use crate::tile::TextureTile;

/// Builds the request URL for a tile.
pub trait TileUrlBuilder: Send + Sync {
    /// Returns `None` when the tile cannot be requested from this source.
    fn url_for(&self, tile: &TextureTile) -> Option<String>;
}

/// Query-string URLs of the form
/// `<service>?T=<dataset>&L=<level name>&X=<col>&Y=<row>`.
///
/// Service and dataset come from the tile's level.
#[derive(Debug, Clone, Default)]
pub struct ServiceUrlBuilder;

impl TileUrlBuilder for ServiceUrlBuilder {
    fn url_for(&self, tile: &TextureTile) -> Option<String> {
        let level = tile.level();
        let service = level.service()?;
        let dataset = level.dataset()?;
        if level.is_empty() {
            return None;
        }

        let mut url = String::from(service);
        if !url.contains('?') {
            url.push('?');
        } else if !url.ends_with('?') && !url.ends_with('&') {
            url.push('&');
        }
        url.push_str(&format!(
            "T={}&L={}&X={}&Y={}",
            dataset,
            level.name(),
            tile.col(),
            tile.row()
        ));
        Some(url)
    }
}

/// URLs built from a template with `{level}`, `{row}`, `{col}`,
/// `{dataset}` and `{suffix}` placeholders.
///
/// ```
/// use globelayer::retrieve::TemplateUrlBuilder;
///
/// let builder = TemplateUrlBuilder::new("https://tiles.example.com/{level}/{row}/{col}.png");
/// assert_eq!(builder.template(), "https://tiles.example.com/{level}/{row}/{col}.png");
/// ```
#[derive(Debug, Clone)]
pub struct TemplateUrlBuilder {
    template: String,
}

impl TemplateUrlBuilder {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

impl TileUrlBuilder for TemplateUrlBuilder {
    fn url_for(&self, tile: &TextureTile) -> Option<String> {
        let level = tile.level();
        if level.is_empty() {
            return None;
        }
        Some(
            self.template
                .replace("{level}", level.name())
                .replace("{row}", &tile.row().to_string())
                .replace("{col}", &tile.col().to_string())
                .replace("{dataset}", level.dataset().unwrap_or_default())
                .replace("{suffix}", level.format_suffix()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{LevelSet, LevelSetConfig};
    use crate::tile::TileKey;

    fn levels(service: &str) -> LevelSet {
        LevelSet::new(
            LevelSetConfig::new("Earth/Test")
                .with_num_levels(4)
                .with_num_empty_levels(1)
                .with_dataset("bmng")
                .with_service(service),
        )
        .unwrap()
    }

    #[test]
    fn test_service_url() {
        let set = levels("https://example.com/imagery");
        let tile = set.create_tile(&TileKey::new(2, 7, 9, "Earth/Test")).unwrap();
        assert_eq!(
            ServiceUrlBuilder.url_for(&tile).unwrap(),
            "https://example.com/imagery?T=bmng&L=1&X=9&Y=7"
        );
    }

    #[test]
    fn test_service_url_with_existing_query() {
        let set = levels("https://example.com/tiles?key=abc");
        let tile = set.create_tile(&TileKey::new(1, 0, 0, "Earth/Test")).unwrap();
        assert_eq!(
            ServiceUrlBuilder.url_for(&tile).unwrap(),
            "https://example.com/tiles?key=abc&T=bmng&L=0&X=0&Y=0"
        );
    }

    #[test]
    fn test_no_url_for_empty_level() {
        let set = levels("https://example.com/imagery");
        let tile = set.create_tile(&TileKey::new(0, 0, 0, "Earth/Test")).unwrap();
        assert!(ServiceUrlBuilder.url_for(&tile).is_none());
        assert!(TemplateUrlBuilder::new("x/{level}").url_for(&tile).is_none());
    }

    #[test]
    fn test_template_url() {
        let set = levels("unused");
        let tile = set.create_tile(&TileKey::new(3, 12, 40, "Earth/Test")).unwrap();
        let builder = TemplateUrlBuilder::new("https://t.example.com/{dataset}/{level}/{row}/{col}{suffix}");
        assert_eq!(
            builder.url_for(&tile).unwrap(),
            "https://t.example.com/bmng/2/12/40.dds"
        );
    }
}
