//! On-disk tile store.
//!
//! Tiles are stored under a root directory using each tile's relative
//! path (`<cache name>/<level>/<row>/<row>_<col><suffix>`). Writes go to
//! a temporary sibling first and are renamed into place, so readers never
//! observe a partially written file.
//!
//! All operations are blocking and are expected to run on worker threads.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::UNIX_EPOCH;

use tracing::debug;

use super::traits::StoreError;

/// Directory name used under the platform cache directory.
pub const CACHE_DIR_NAME: &str = "globelayer";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn io_error(path: &Path, source: io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// File-backed store rooted at one directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store under the platform cache directory, e.g. `~/.cache/globelayer`.
    pub fn in_default_location() -> Result<Self, StoreError> {
        Self::default_root().map(Self::new)
    }

    pub fn default_root() -> Result<PathBuf, StoreError> {
        dirs::cache_dir()
            .map(|dir| dir.join(CACHE_DIR_NAME))
            .ok_or(StoreError::NoCacheDirectory)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a relative tile path.
    ///
    /// Rejects absolute paths and parent-directory components.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, StoreError> {
        let rel = Path::new(relative);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if relative.is_empty() || escapes {
            return Err(StoreError::InvalidPath(relative.to_string()));
        }
        Ok(self.root.join(rel))
    }

    /// Path of an existing file, if present.
    pub fn find(&self, relative: &str) -> Option<PathBuf> {
        let path = self.resolve(relative).ok()?;
        if path.is_file() {
            Some(path)
        } else {
            None
        }
    }

    pub fn contains(&self, relative: &str) -> bool {
        self.find(relative).is_some()
    }

    pub fn read(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
        fs::read(path).map_err(|e| io_error(path, e))
    }

    /// Writes `data` atomically and returns the final path.
    pub fn write(&self, relative: &str, data: &[u8]) -> Result<PathBuf, StoreError> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| StoreError::InvalidPath(relative.to_string()))?;
        let temp = path.with_file_name(format!(
            ".{}.{}.{}.tmp",
            file_name,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(e) = fs::write(&temp, data) {
            let _ = fs::remove_file(&temp);
            return Err(io_error(&temp, e));
        }
        if let Err(e) = fs::rename(&temp, &path) {
            let _ = fs::remove_file(&temp);
            return Err(io_error(&path, e));
        }
        debug!(path = %path.display(), bytes = data.len(), "Wrote cache file");
        Ok(path)
    }

    /// Deletes a file. Missing files are not an error.
    pub fn remove(&self, path: &Path) -> Result<(), StoreError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(path, e)),
        }
    }

    /// Last modification time in milliseconds since the Unix epoch.
    pub fn modified_millis(&self, path: &Path) -> Option<i64> {
        let modified = fs::metadata(path).ok()?.modified().ok()?;
        let since_epoch = modified.duration_since(UNIX_EPOCH).ok()?;
        i64::try_from(since_epoch.as_millis()).ok()
    }

    /// Whether the file was written before `expiry_time`.
    ///
    /// An expiry time of zero or less never expires anything.
    pub fn is_expired(&self, path: &Path, expiry_time: i64) -> bool {
        if expiry_time <= 0 {
            return false;
        }
        match self.modified_millis(path) {
            Some(modified) => modified < expiry_time,
            None => false,
        }
    }
}
