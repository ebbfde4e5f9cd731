//! Background execution of texture loads
//!
//! The render thread hands [`LoadTask`]s to a [`TaskService`]; the service
//! runs them on worker threads with bounded concurrency and at most one
//! in-flight load per tile. Each finished task emits a [`LoadEvent`] so
//! the host knows to redraw.
//!
//! ```text
//! render thread                 worker threads
//! ─────────────                 ──────────────
//! RequestQueue::drain ──submit──► ThreadPoolTaskService
//!                                   │ spawn_blocking
//!                                   ▼
//!                                 LoadTask::run ──► TextureSource::load
//!                                   │
//!        LoadEvent ◄────────────────┘ (mpsc)
//! ```

mod service;
mod task;

pub use service::{
    InlineTaskService, Submission, TaskService, ThreadPoolTaskService, DEFAULT_MAX_ACTIVE_LOADS,
};
pub use task::{LoadEvent, LoadTask};
