//! Layer telemetry for observability and user feedback.
//!
//! Lock-free atomic counters are updated by the render thread (selection
//! and request scheduling) and by load workers (disk hits, retrievals,
//! failures). Views take point-in-time snapshots.
//!
//! # Architecture
//!
//! ```text
//! render thread ──┐
//!                 ├──► LayerMetrics ─────► TelemetrySnapshot ─────► Views
//! load workers ───┘   (atomic counters)   (point-in-time copy)     (CLI, etc.)
//! ```
//!
//! # Example
//!
//! ```
//! use globelayer::telemetry::LayerMetrics;
//!
//! let metrics = LayerMetrics::new();
//! metrics.frame_rendered(120);
//! metrics.texture_retrieved(48_000);
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.frames_rendered, 1);
//! assert_eq!(snapshot.bytes_retrieved, 48_000);
//! ```

mod metrics;
mod snapshot;

pub use metrics::LayerMetrics;
pub use snapshot::TelemetrySnapshot;
