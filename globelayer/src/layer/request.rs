//! Texture request queue.
//!
//! Requests gathered during tile selection are ordered by priority, the
//! distance from the tile to the view's reference point (lower first),
//! then by enqueue order. A tile is held at most once: requesting it again
//! replaces its priority with the newer one. Superseded heap entries are
//! recognised by their sequence number and skipped on pop.
//!
//! # Example
//!
//! ```ignore
//! use globelayer::layer::RequestQueue;
//!
//! let mut queue = RequestQueue::new();
//! queue.push(tile.clone(), 100.0);
//! queue.push(tile.clone(), 50.0);
//!
//! // One request, carrying the latest priority
//! assert_eq!(queue.len(), 1);
//! assert_eq!(queue.pop().unwrap().priority(), 50.0);
//! ```

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use serde::Serialize;

use crate::executor::{LoadTask, Submission, TaskService};
use crate::tile::{TextureTile, TileKey};

// =============================================================================
// Texture Request
// =============================================================================

/// A tile waiting for its texture to be loaded.
#[derive(Debug, Clone)]
pub struct TextureRequest {
    tile: TextureTile,
    priority: f64,
    sequence: u64,
}

impl TextureRequest {
    pub fn tile(&self) -> &TextureTile {
        &self.tile
    }

    pub fn key(&self) -> &TileKey {
        self.tile.key()
    }

    pub fn priority(&self) -> f64 {
        self.priority
    }

    pub fn into_parts(self) -> (TextureTile, f64) {
        (self.tile, self.priority)
    }
}

// Ordering for BinaryHeap: lower priority value first, then lower sequence first
impl PartialEq for TextureRequest {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TextureRequest {}

impl PartialOrd for TextureRequest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TextureRequest {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse both keys so the nearest and
        // oldest request is on top
        match other.priority.total_cmp(&self.priority) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            ordering => ordering,
        }
    }
}

// =============================================================================
// Drain Report
// =============================================================================

/// What happened to the requests of one drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub submitted: usize,
    /// Already loading; nothing new scheduled
    pub duplicates: usize,
    /// Discarded because the task service was full
    pub dropped: usize,
    /// Discarded because the resource is known to be absent
    pub skipped_absent: usize,
}

// =============================================================================
// Request Queue
// =============================================================================

/// Per-frame priority queue of texture requests, unique by tile.
#[derive(Debug, Default)]
pub struct RequestQueue {
    heap: BinaryHeap<TextureRequest>,
    latest: HashMap<TileKey, u64>,
    next_sequence: u64,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or re-prioritises a request.
    ///
    /// Returns `true` if the tile was not already queued.
    pub fn push(&mut self, tile: TextureTile, priority: f64) -> bool {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let is_new = self.latest.insert(tile.key().clone(), sequence).is_none();
        self.heap.push(TextureRequest {
            tile,
            priority,
            sequence,
        });
        is_new
    }

    /// Removes and returns the most urgent request.
    pub fn pop(&mut self) -> Option<TextureRequest> {
        while let Some(request) = self.heap.pop() {
            if self.latest.get(request.key()) == Some(&request.sequence) {
                self.latest.remove(request.key());
                return Some(request);
            }
        }
        None
    }

    /// Number of distinct tiles queued.
    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.latest.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.latest.clear();
    }

    /// Hands requests to `service` in priority order, then empties the queue.
    ///
    /// `make_task` returns `None` for requests whose resource has become
    /// absent. Once the service is full, the remaining requests are dropped;
    /// the selector re-issues them next frame if they are still needed.
    pub fn drain<F>(&mut self, service: &dyn TaskService, mut make_task: F) -> DrainReport
    where
        F: FnMut(TextureRequest) -> Option<LoadTask>,
    {
        let mut report = DrainReport::default();
        while let Some(request) = self.pop() {
            if service.is_full() {
                report.dropped += 1;
                continue;
            }
            let Some(task) = make_task(request) else {
                report.skipped_absent += 1;
                continue;
            };
            match service.submit(task) {
                Submission::Accepted => report.submitted += 1,
                Submission::Duplicate => report.duplicates += 1,
                Submission::Rejected => report.dropped += 1,
            }
        }
        self.clear();
        report
    }
}
