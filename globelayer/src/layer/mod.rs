//! The tiled image layer.
//!
//! ```text
//!   ViewState ──► TiledImageLayer::render
//!                   │
//!                   ├─ SelectionPass      quad-tree descent, split test,
//!                   │                     fallback cursor
//!                   ├─ DrawList           sorted by texture level
//!                   └─ RequestQueue ────► TaskService ──► TextureSource
//!                      nearest first        (workers)       │
//!                                                           ▼
//!                                                     TextureCache
//! ```
//!
//! Selection and queue draining run on the render thread. Everything after
//! submission runs on workers and shows up in the cache on a later frame.

mod bulk;
mod config;
mod draw;
mod request;
mod selector;
mod tiled;
mod view;

pub use bulk::{BulkDownloader, BulkProgress, BulkSummary, DEFAULT_BULK_CONCURRENCY};
pub use config::{
    LayerConfig, DEFAULT_DETAIL_HINT_ORIGIN, DEFAULT_POLAR_DETAIL_FACTOR, DEFAULT_POLAR_LATITUDE,
    REFERENCE_FIELD_OF_VIEW,
};
pub use draw::{compare_texture_level, BindingKind, DrawList, DrawTile, TextureBinding};
pub use request::{DrainReport, RequestQueue, TextureRequest};
pub use selector::{Selection, SelectionStats, SplitCriterion};
pub use tiled::{FrameReport, FrameStats, TiledImageLayer};
pub use view::ViewState;
