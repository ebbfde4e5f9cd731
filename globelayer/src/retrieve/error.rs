//! Retrieval error types.

use thiserror::Error;

/// Errors raised while fetching tile imagery.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RetrieveError {
    /// Transport-level failure (connect, timeout, TLS, ...)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Server answered with text (an error page) instead of an image
    #[error("unexpected text response ({content_type}): {excerpt}")]
    TextResponse {
        content_type: String,
        excerpt: String,
    },

    /// No URL could be built for the tile
    #[error("no URL for tile {0}")]
    NoUrl(String),

    /// Local source could not be read
    #[error("I/O error: {0}")]
    Io(String),

    /// Network retrieval is turned off
    #[error("network retrieval is disabled")]
    NetworkDisabled,
}

impl RetrieveError {
    /// Whether retrying later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RetrieveError::Http(_) => true,
            RetrieveError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
