//! Task services run load tasks off the render thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashSet;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::tile::TileKey;

use super::task::LoadTask;

/// Default number of loads allowed in flight at once.
pub const DEFAULT_MAX_ACTIVE_LOADS: usize = 8;

/// Result of handing a task to a [`TaskService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Scheduled for execution
    Accepted,
    /// A task for the same tile is already in flight; nothing was scheduled
    Duplicate,
    /// The service is at capacity
    Rejected,
}

impl Submission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Submission::Accepted)
    }
}

/// Executes load tasks with bounded concurrency.
pub trait TaskService: Send + Sync {
    fn submit(&self, task: LoadTask) -> Submission;

    /// Whether new submissions would be rejected right now.
    fn is_full(&self) -> bool;

    fn active_count(&self) -> usize;
}

/// Removes the key from the in-flight set even if the task panics.
struct ActiveGuard {
    active: Arc<DashSet<TileKey>>,
    key: TileKey,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.remove(&self.key);
    }
}

/// Runs tasks on a tokio runtime's blocking pool.
///
/// At most `max_active` tasks are in flight; at most one per tile.
pub struct ThreadPoolTaskService {
    handle: Handle,
    max_active: usize,
    active: Arc<DashSet<TileKey>>,
    completed: Arc<AtomicU64>,
}

impl ThreadPoolTaskService {
    pub fn new(handle: Handle, max_active: usize) -> Self {
        Self {
            handle,
            max_active: max_active.max(1),
            active: Arc::new(DashSet::new()),
            completed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Uses the runtime of the calling context.
    ///
    /// Returns `None` outside a tokio runtime.
    pub fn current(max_active: usize) -> Option<Self> {
        Handle::try_current()
            .ok()
            .map(|handle| Self::new(handle, max_active))
    }

    pub fn max_active(&self) -> usize {
        self.max_active
    }

    pub fn completed_count(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }

    pub fn is_in_flight(&self, key: &TileKey) -> bool {
        self.active.contains(key)
    }
}

impl TaskService for ThreadPoolTaskService {
    fn submit(&self, task: LoadTask) -> Submission {
        if self.is_full() {
            return Submission::Rejected;
        }
        let key = task.key().clone();
        if !self.active.insert(key.clone()) {
            debug!(tile = %key, "Load already in flight");
            return Submission::Duplicate;
        }

        let guard = ActiveGuard {
            active: Arc::clone(&self.active),
            key,
        };
        let completed = Arc::clone(&self.completed);
        let handle = self.handle.spawn_blocking(move || {
            let _guard = guard;
            task.run();
            completed.fetch_add(1, Ordering::Relaxed);
        });

        // Surface panics in the log instead of losing them with the handle
        self.handle.spawn(async move {
            if let Err(e) = handle.await {
                warn!(error = %e, "Load task panicked");
            }
        });
        Submission::Accepted
    }

    fn is_full(&self) -> bool {
        self.active.len() >= self.max_active
    }

    fn active_count(&self) -> usize {
        self.active.len()
    }
}

/// Runs each task synchronously inside `submit`.
///
/// For hosts without a runtime and for deterministic tests.
#[derive(Debug, Default)]
pub struct InlineTaskService {
    completed: AtomicU64,
}

impl InlineTaskService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed_count(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}

impl TaskService for InlineTaskService {
    fn submit(&self, task: LoadTask) -> Submission {
        task.run();
        self.completed.fetch_add(1, Ordering::Relaxed);
        Submission::Accepted
    }

    fn is_full(&self) -> bool {
        false
    }

    fn active_count(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryTextureCache, TextureCache};
    use crate::level::{LevelSet, LevelSetConfig};
    use crate::source::{LoadOutcome, TextureSource};
    use crate::tile::TextureTile;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Source that blocks until released, counting loads.
    struct GatedSource {
        gate: Arc<Barrier>,
        loads: AtomicUsize,
    }

    impl TextureSource for GatedSource {
        fn name(&self) -> &str {
            "gated"
        }

        fn load(&self, _tile: &TextureTile) -> LoadOutcome {
            self.gate.wait();
            self.loads.fetch_add(1, Ordering::SeqCst);
            LoadOutcome::AlreadyResident
        }

        fn force_load(&self, _tile: &TextureTile) -> bool {
            false
        }
    }

    fn tiles(n: u32) -> Vec<TextureTile> {
        let set = LevelSet::new(LevelSetConfig::new("Earth/Test").with_num_levels(4)).unwrap();
        (0..n)
            .map(|c| set.create_tile(&TileKey::new(3, 5, c, "Earth/Test")).unwrap())
            .collect()
    }

    async fn wait_idle(service: &ThreadPoolTaskService) {
        for _ in 0..200 {
            if service.is_idle() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("service did not become idle");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_duplicate_and_capacity() {
        let gate = Arc::new(Barrier::new(3));
        let source = Arc::new(GatedSource {
            gate: Arc::clone(&gate),
            loads: AtomicUsize::new(0),
        });
        let service = ThreadPoolTaskService::current(2).unwrap();
        let t = tiles(3);

        let task = |tile: &TextureTile| LoadTask::new(tile.clone(), 1.0, source.clone());
        assert_eq!(service.submit(task(&t[0])), Submission::Accepted);
        assert_eq!(service.submit(task(&t[0])), Submission::Duplicate);
        assert_eq!(service.submit(task(&t[1])), Submission::Accepted);
        assert!(service.is_full());
        assert_eq!(service.submit(task(&t[2])), Submission::Rejected);

        // Release both workers
        tokio::task::spawn_blocking(move || {
            gate.wait();
        })
        .await
        .unwrap();

        wait_idle(&service).await;
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
        assert_eq!(service.completed_count(), 2);
        assert!(!service.is_in_flight(t[0].key()));
    }

    #[tokio::test]
    async fn test_events_are_sent() {
        let set = Arc::new(
            LevelSet::new(
                LevelSetConfig::new("Earth/Test")
                    .with_num_levels(2)
                    .with_tile_size(2, 2),
            )
            .unwrap(),
        );
        let cache = Arc::new(MemoryTextureCache::new(1024));
        let source = Arc::new(crate::source::ProceduralTextureSource::new(
            Arc::clone(&set),
            cache.clone(),
            crate::source::level_tint,
        ));
        let tile = set.create_tile(&TileKey::new(1, 0, 0, "Earth/Test")).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let service = InlineTaskService::new();
        let submission = service.submit(LoadTask::new(tile.clone(), 0.0, source).with_events(tx));
        assert!(submission.is_accepted());

        let event = rx.recv().await.unwrap();
        assert_eq!(&event.key, tile.key());
        assert!(event.outcome.is_loaded());
        assert!(cache.is_resident(tile.key()));
    }
}
