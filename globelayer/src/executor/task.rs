//! Texture load tasks and completion events.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

use crate::source::{LoadOutcome, TextureSource};
use crate::tile::{TextureTile, TileKey};

/// Sent after every finished load so the host can schedule a repaint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadEvent {
    pub key: TileKey,
    pub outcome: LoadOutcome,
}

/// Loads one tile's texture through a [`TextureSource`].
///
/// Identity is the tile key: two tasks for the same tile are duplicates
/// regardless of priority.
pub struct LoadTask {
    tile: TextureTile,
    priority: f64,
    source: Arc<dyn TextureSource>,
    events: Option<UnboundedSender<LoadEvent>>,
}

impl LoadTask {
    pub fn new(tile: TextureTile, priority: f64, source: Arc<dyn TextureSource>) -> Self {
        Self {
            tile,
            priority,
            source,
            events: None,
        }
    }

    /// Report completion on `events`.
    pub fn with_events(mut self, events: UnboundedSender<LoadEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn key(&self) -> &TileKey {
        self.tile.key()
    }

    pub fn tile(&self) -> &TextureTile {
        &self.tile
    }

    /// Distance to the view reference point; lower runs first.
    pub fn priority(&self) -> f64 {
        self.priority
    }

    /// Performs the load and reports the outcome.
    pub fn run(self) -> LoadOutcome {
        let outcome = self.source.load(&self.tile);
        trace!(tile = %self.tile.label(), outcome = %outcome, "Load task finished");

        if let Some(events) = &self.events {
            // Receiver gone means nobody is listening for repaints
            let _ = events.send(LoadEvent {
                key: self.tile.key().clone(),
                outcome: outcome.clone(),
            });
        }
        outcome
    }
}

impl fmt::Debug for LoadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadTask")
            .field("tile", &self.tile.label())
            .field("priority", &self.priority)
            .field("source", &self.source.name())
            .finish()
    }
}
