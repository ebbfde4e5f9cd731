//! Retrievers fetch encoded tile images from their origin.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::tile::TextureTile;

use super::error::RetrieveError;
use super::http::HttpClient;
use super::url::TileUrlBuilder;

/// Longest excerpt of a text response kept for diagnostics.
const TEXT_EXCERPT_LEN: usize = 200;

/// Fetches the encoded image for one tile.
///
/// Called on worker threads only; implementations may block.
pub trait Retriever: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this retriever goes over the network.
    fn is_remote(&self) -> bool;

    fn retrieve(&self, tile: &TextureTile) -> Result<Vec<u8>, RetrieveError>;
}

fn is_text_content(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.contains("text") || ct.contains("xml") || ct.contains("html")
}

/// Retrieves tiles from an HTTP tile service.
pub struct RemoteRetriever {
    client: Arc<dyn HttpClient>,
    urls: Arc<dyn TileUrlBuilder>,
}

impl RemoteRetriever {
    pub fn new(client: Arc<dyn HttpClient>, urls: Arc<dyn TileUrlBuilder>) -> Self {
        Self { client, urls }
    }
}

impl Retriever for RemoteRetriever {
    fn name(&self) -> &str {
        "remote"
    }

    fn is_remote(&self) -> bool {
        true
    }

    fn retrieve(&self, tile: &TextureTile) -> Result<Vec<u8>, RetrieveError> {
        let url = self
            .urls
            .url_for(tile)
            .ok_or_else(|| RetrieveError::NoUrl(tile.label()))?;
        debug!(tile = %tile.label(), url = %url, "Retrieving tile");

        let response = self.client.get(&url)?;

        if let Some(content_type) = response.content_type.as_deref() {
            if is_text_content(content_type) {
                let end = response.body.len().min(TEXT_EXCERPT_LEN);
                return Err(RetrieveError::TextResponse {
                    content_type: content_type.to_string(),
                    excerpt: String::from_utf8_lossy(&response.body[..end]).into_owned(),
                });
            }
        }
        if response.body.is_empty() {
            return Err(RetrieveError::Http(format!("Empty response from {}", url)));
        }
        Ok(response.body)
    }
}

/// Retrieves tiles from a local directory laid out like the tile cache.
#[derive(Debug, Clone)]
pub struct LocalRetriever {
    root: PathBuf,
}

impl LocalRetriever {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Retriever for LocalRetriever {
    fn name(&self) -> &str {
        "local"
    }

    fn is_remote(&self) -> bool {
        false
    }

    fn retrieve(&self, tile: &TextureTile) -> Result<Vec<u8>, RetrieveError> {
        let path = self.root.join(tile.path());
        std::fs::read(&path).map_err(|e| RetrieveError::Io(format!("{}: {}", path.display(), e)))
    }
}
