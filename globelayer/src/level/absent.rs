//! Bookkeeping for resources known to be unavailable.
//!
//! A failed retrieval marks the resource. The resource counts as absent
//! while it is inside the minimum re-check interval, and permanently once
//! it has failed `max_tries` times. Permanent marks are only lifted by
//! [`AbsentResourceList::unmark`] or [`AbsentResourceList::clear`].

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Failures before a resource is treated as absent for the session.
pub const DEFAULT_MAX_ABSENT_TRIES: u32 = 2;

/// Minimum time between retries of a failed resource.
pub const DEFAULT_MIN_CHECK_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
struct AbsentEntry {
    tries: u32,
    last_marked: Instant,
}

/// Thread-safe set of absent resource ids for one level.
#[derive(Debug)]
pub struct AbsentResourceList {
    entries: DashMap<u64, AbsentEntry>,
    max_tries: u32,
    min_check_interval: Duration,
}

impl AbsentResourceList {
    pub fn new(max_tries: u32, min_check_interval: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_tries: max_tries.max(1),
            min_check_interval,
        }
    }

    /// Records one failed attempt.
    pub fn mark_absent(&self, id: u64) {
        let now = Instant::now();
        self.entries
            .entry(id)
            .and_modify(|e| {
                e.tries = e.tries.saturating_add(1);
                e.last_marked = now;
            })
            .or_insert(AbsentEntry {
                tries: 1,
                last_marked: now,
            });
    }

    /// Marks the resource absent until explicitly unmarked.
    pub fn mark_permanently_absent(&self, id: u64) {
        self.entries.insert(
            id,
            AbsentEntry {
                tries: self.max_tries,
                last_marked: Instant::now(),
            },
        );
    }

    pub fn is_absent(&self, id: u64) -> bool {
        match self.entries.get(&id) {
            Some(entry) => {
                entry.tries >= self.max_tries
                    || entry.last_marked.elapsed() < self.min_check_interval
            }
            None => false,
        }
    }

    pub fn unmark(&self, id: u64) {
        self.entries.remove(&id);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AbsentResourceList {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ABSENT_TRIES, DEFAULT_MIN_CHECK_INTERVAL)
    }
}
