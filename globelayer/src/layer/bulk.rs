//! Bulk download of a region into the file store.
//!
//! Enumerates every tile of every non-empty level up to the level matching
//! a target resolution, skips tiles already in the store, and retrieves the
//! rest on the blocking pool with a bounded number in flight.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::FileStore;
use crate::geo::Sector;
use crate::level::{LevelError, LevelSet};
use crate::retrieve::Retriever;
use crate::tile::{TextureTile, TileKey};

/// Default number of retrievals in flight.
pub const DEFAULT_BULK_CONCURRENCY: usize = 4;

/// Live counters of a running download.
#[derive(Debug, Default)]
pub struct BulkProgress {
    total: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    done: AtomicBool,
}

impl BulkProgress {
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    /// Tiles finished either way.
    pub fn processed(&self) -> usize {
        self.completed() + self.failed()
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Relaxed)
    }
}

/// Final counts of a download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkSummary {
    pub target_level: u32,
    pub already_present: usize,
    pub downloaded: usize,
    pub failed: usize,
    pub cancelled: bool,
}

/// Downloads a sector of a level set into a [`FileStore`].
pub struct BulkDownloader {
    levels: Arc<LevelSet>,
    store: FileStore,
    retriever: Arc<dyn Retriever>,
    sector: Sector,
    target_level: u32,
    concurrency: usize,
    cancellation: CancellationToken,
    progress: Arc<BulkProgress>,
}

impl BulkDownloader {
    /// Resolves the target level for `resolution` radians per texel.
    pub fn new(
        levels: Arc<LevelSet>,
        store: FileStore,
        retriever: Arc<dyn Retriever>,
        sector: Sector,
        resolution: f64,
    ) -> Result<Self, LevelError> {
        let target_level = levels.level_for_resolution(&sector, resolution)?.number();
        Ok(Self {
            levels,
            store,
            retriever,
            sector,
            target_level,
            concurrency: DEFAULT_BULK_CONCURRENCY,
            cancellation: CancellationToken::new(),
            progress: Arc::new(BulkProgress::default()),
        })
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn target_level(&self) -> u32 {
        self.target_level
    }

    pub fn sector(&self) -> &Sector {
        &self.sector
    }

    /// Token that stops the download when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn progress(&self) -> Arc<BulkProgress> {
        Arc::clone(&self.progress)
    }

    /// All tiles of non-empty levels up to the target level that overlap
    /// the sector, coarse levels first.
    pub fn tiles(&self) -> Result<Vec<TextureTile>, LevelError> {
        let Some(region) = self.sector.intersection(self.levels.sector()) else {
            return Ok(Vec::new());
        };

        // Tiles that only touch the region's edge are left out, unless the
        // region itself has no area
        let degenerate = region.delta_lat() <= 0.0 || region.delta_lon() <= 0.0;
        let mut tiles = Vec::new();
        for level in &self.levels.levels()[..=self.target_level as usize] {
            if level.is_empty() {
                continue;
            }
            let south_west = self.levels.key_for_position(region.corners()[0], level.number())?;
            let north_east = self.levels.key_for_position(region.corners()[2], level.number())?;
            for row in south_west.row()..=north_east.row() {
                for col in south_west.col()..=north_east.col() {
                    let key = TileKey::new(level.number(), row, col, level.cache_name());
                    let tile = self.levels.create_tile(&key)?;
                    let covered = if degenerate {
                        tile.sector().intersects(&region)
                    } else {
                        tile.sector().overlaps(&region)
                    };
                    if covered {
                        tiles.push(tile);
                    }
                }
            }
        }
        Ok(tiles)
    }

    /// Tiles not yet in the file store.
    pub fn missing_tiles(&self) -> Result<Vec<TextureTile>, LevelError> {
        Ok(self
            .tiles()?
            .into_iter()
            .filter(|tile| !self.store.contains(&tile.path()))
            .collect())
    }

    pub fn estimated_missing_count(&self) -> Result<usize, LevelError> {
        self.missing_tiles().map(|tiles| tiles.len())
    }

    /// Downloads every missing tile.
    ///
    /// Failed tiles are counted and logged; they do not stop the run.
    pub async fn run(&self) -> Result<BulkSummary, LevelError> {
        let all = self.tiles()?.len();
        let missing = self.missing_tiles()?;
        let mut summary = BulkSummary {
            target_level: self.target_level,
            already_present: all - missing.len(),
            ..BulkSummary::default()
        };

        self.progress.total.store(missing.len(), Ordering::Relaxed);
        info!(
            sector = %self.sector,
            target_level = self.target_level,
            missing = missing.len(),
            present = summary.already_present,
            "Starting bulk download"
        );

        let mut pending = FuturesUnordered::new();
        let mut tiles = missing.into_iter();

        for tile in tiles.by_ref().take(self.concurrency) {
            pending.push(self.spawn_download(tile));
        }

        while let Some(joined) = pending.next().await {
            match joined {
                Ok(true) => {
                    summary.downloaded += 1;
                    self.progress.completed.fetch_add(1, Ordering::Relaxed);
                }
                Ok(false) => {
                    summary.failed += 1;
                    self.progress.failed.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    warn!(error = %e, "Bulk download worker panicked");
                    summary.failed += 1;
                    self.progress.failed.fetch_add(1, Ordering::Relaxed);
                }
            }

            if self.cancellation.is_cancelled() {
                summary.cancelled = true;
                continue;
            }
            if let Some(tile) = tiles.next() {
                pending.push(self.spawn_download(tile));
            }
        }

        self.progress.done.store(true, Ordering::Relaxed);
        info!(
            downloaded = summary.downloaded,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Bulk download finished"
        );
        Ok(summary)
    }

    fn spawn_download(&self, tile: TextureTile) -> tokio::task::JoinHandle<bool> {
        let store = self.store.clone();
        let retriever = Arc::clone(&self.retriever);
        tokio::task::spawn_blocking(move || match retriever.retrieve(&tile) {
            Ok(bytes) => match store.write(&tile.path(), &bytes) {
                Ok(path) => {
                    debug!(tile = %tile.label(), path = %path.display(), "Downloaded tile");
                    true
                }
                Err(e) => {
                    warn!(tile = %tile.label(), error = %e, "Failed to store tile");
                    false
                }
            },
            Err(e) => {
                debug!(tile = %tile.label(), error = %e, "Failed to retrieve tile");
                false
            }
        })
    }
}
