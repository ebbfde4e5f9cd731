//! Tile retrieval
//!
//! Retrievers fetch encoded tile images from their origin: an HTTP tile
//! service ([`RemoteRetriever`]) or a local directory ([`LocalRetriever`]).
//! Retrieved bytes are written to the file store and decoded by the
//! texture source; retrievers never touch the texture cache.

mod error;
pub mod http;
mod retriever;
mod url;

pub use error::RetrieveError;
pub use http::{HttpClient, HttpResponse, ReqwestClient, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT};
pub use retriever::{LocalRetriever, RemoteRetriever, Retriever};
pub use url::{ServiceUrlBuilder, TemplateUrlBuilder, TileUrlBuilder};
