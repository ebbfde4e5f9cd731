//! Point-in-time telemetry.

use serde::Serialize;

/// Copy of the layer counters at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub uptime_secs: f64,

    pub frames_rendered: u64,
    pub last_frame_tiles: u64,

    pub requests_enqueued: u64,
    pub requests_submitted: u64,
    pub requests_dropped: u64,

    pub loads_from_disk: u64,
    pub loads_retrieved: u64,
    pub loads_generated: u64,
    pub loads_failed: u64,
    pub resources_marked_absent: u64,
    pub corrupt_files_deleted: u64,
    pub expired_files_deleted: u64,
    pub textures_expired: u64,

    pub bytes_retrieved: u64,
    pub bytes_per_second: f64,
}

impl TelemetrySnapshot {
    /// Textures installed by any path.
    pub fn textures_loaded(&self) -> u64 {
        self.loads_from_disk + self.loads_retrieved + self.loads_generated
    }

    /// Fraction of installed textures that came from the file store.
    pub fn disk_hit_rate(&self) -> f64 {
        let total = self.textures_loaded();
        if total == 0 {
            0.0
        } else {
            self.loads_from_disk as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_hit_rate() {
        let snapshot = TelemetrySnapshot {
            loads_from_disk: 3,
            loads_retrieved: 1,
            ..Default::default()
        };
        assert_eq!(snapshot.textures_loaded(), 4);
        assert!((snapshot.disk_hit_rate() - 0.75).abs() < 1e-12);
        assert_eq!(TelemetrySnapshot::default().disk_hit_rate(), 0.0);
    }
}
