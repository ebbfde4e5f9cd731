//! GlobeLayer - Tiled imagery layers for virtual globes
//!
//! This library decides which imagery tile, at which resolution, is shown
//! for each frame of a globe renderer, and how missing textures are fetched
//! and cached without blocking the render loop.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   per frame    ┌──────────────┐  drain   ┌──────────────┐
//! │  ViewState  │──────────────► │ TiledImage-  │────────► │ TaskService  │
//! └─────────────┘                │    Layer     │          └──────┬───────┘
//!                                │              │                 │ worker
//!        DrawList ◄──────────────│ select + LOD │                 ▼
//!                                └──────┬───────┘          ┌──────────────┐
//!                                       │ is_resident      │TextureSource │
//!                                       ▼                  └──────┬───────┘
//!                                ┌──────────────┐   insert        │
//!                                │ TextureCache │ ◄───────────────┘
//!                                └──────────────┘
//! ```
//!
//! The render thread only selects tiles and enqueues requests. Everything
//! after "enqueue" runs on worker threads.

pub mod cache;
pub mod config;
pub mod executor;
pub mod geo;
pub mod layer;
pub mod level;
pub mod logging;
pub mod retrieve;
pub mod source;
pub mod telemetry;
pub mod texture;
pub mod tile;
