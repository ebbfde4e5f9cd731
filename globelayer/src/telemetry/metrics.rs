//! Atomic layer counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::snapshot::TelemetrySnapshot;

/// Counters shared by the render thread and load workers.
#[derive(Debug)]
pub struct LayerMetrics {
    started: Instant,

    frames_rendered: AtomicU64,
    last_frame_tiles: AtomicU64,

    requests_enqueued: AtomicU64,
    requests_submitted: AtomicU64,
    requests_dropped: AtomicU64,

    loads_from_disk: AtomicU64,
    loads_retrieved: AtomicU64,
    loads_generated: AtomicU64,
    loads_failed: AtomicU64,
    resources_marked_absent: AtomicU64,
    corrupt_files_deleted: AtomicU64,
    expired_files_deleted: AtomicU64,
    textures_expired: AtomicU64,
    bytes_retrieved: AtomicU64,
}

impl LayerMetrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            frames_rendered: AtomicU64::new(0),
            last_frame_tiles: AtomicU64::new(0),
            requests_enqueued: AtomicU64::new(0),
            requests_submitted: AtomicU64::new(0),
            requests_dropped: AtomicU64::new(0),
            loads_from_disk: AtomicU64::new(0),
            loads_retrieved: AtomicU64::new(0),
            loads_generated: AtomicU64::new(0),
            loads_failed: AtomicU64::new(0),
            resources_marked_absent: AtomicU64::new(0),
            corrupt_files_deleted: AtomicU64::new(0),
            expired_files_deleted: AtomicU64::new(0),
            textures_expired: AtomicU64::new(0),
            bytes_retrieved: AtomicU64::new(0),
        }
    }

    // =========================================================================
    // Render thread
    // =========================================================================

    pub fn frame_rendered(&self, tiles_drawn: usize) {
        self.frames_rendered.fetch_add(1, Ordering::Relaxed);
        self.last_frame_tiles
            .store(tiles_drawn as u64, Ordering::Relaxed);
    }

    pub fn request_enqueued(&self) {
        self.requests_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_submitted(&self, count: usize) {
        self.requests_submitted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn requests_dropped(&self, count: usize) {
        self.requests_dropped
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn texture_expired(&self) {
        self.textures_expired.fetch_add(1, Ordering::Relaxed);
    }

    // =========================================================================
    // Load workers
    // =========================================================================

    pub fn texture_loaded_from_disk(&self) {
        self.loads_from_disk.fetch_add(1, Ordering::Relaxed);
    }

    pub fn texture_retrieved(&self, bytes: usize) {
        self.loads_retrieved.fetch_add(1, Ordering::Relaxed);
        self.bytes_retrieved
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn texture_generated(&self) {
        self.loads_generated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn load_failed(&self) {
        self.loads_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn resource_marked_absent(&self) {
        self.resources_marked_absent
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn corrupt_file_deleted(&self) {
        self.corrupt_files_deleted
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn expired_file_deleted(&self) {
        self.expired_files_deleted
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        let uptime = self.started.elapsed();
        let secs = uptime.as_secs_f64();
        let bytes_retrieved = self.bytes_retrieved.load(Ordering::Relaxed);

        TelemetrySnapshot {
            uptime_secs: secs,
            frames_rendered: self.frames_rendered.load(Ordering::Relaxed),
            last_frame_tiles: self.last_frame_tiles.load(Ordering::Relaxed),
            requests_enqueued: self.requests_enqueued.load(Ordering::Relaxed),
            requests_submitted: self.requests_submitted.load(Ordering::Relaxed),
            requests_dropped: self.requests_dropped.load(Ordering::Relaxed),
            loads_from_disk: self.loads_from_disk.load(Ordering::Relaxed),
            loads_retrieved: self.loads_retrieved.load(Ordering::Relaxed),
            loads_generated: self.loads_generated.load(Ordering::Relaxed),
            loads_failed: self.loads_failed.load(Ordering::Relaxed),
            resources_marked_absent: self.resources_marked_absent.load(Ordering::Relaxed),
            corrupt_files_deleted: self.corrupt_files_deleted.load(Ordering::Relaxed),
            expired_files_deleted: self.expired_files_deleted.load(Ordering::Relaxed),
            textures_expired: self.textures_expired.load(Ordering::Relaxed),
            bytes_retrieved,
            bytes_per_second: if secs > 0.0 {
                bytes_retrieved as f64 / secs
            } else {
                0.0
            },
        }
    }
}

impl Default for LayerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
