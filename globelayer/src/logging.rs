//! Logging initialisation.
//!
//! Console output always goes to stderr. When a log directory is given,
//! the same events are also written, without colour, to a file in that
//! directory through a non-blocking writer. Keep the returned
//! [`LoggingGuard`] alive until exit or buffered lines are lost.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Log file name inside the log directory.
pub const LOG_FILE_NAME: &str = "globelayer.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("logging already initialised: {0}")]
    AlreadyInitialized(String),
}

/// Flushes the file writer when dropped.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Platform log directory, e.g. `~/.local/share/globelayer/logs`.
pub fn default_log_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("globelayer").join("logs"))
}

/// `RUST_LOG` if set, else `default_filter`.
pub fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Installs the global subscriber.
pub fn init_logging(
    log_dir: Option<&Path>,
    default_filter: &str,
) -> Result<LoggingGuard, LoggingError> {
    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);
    let registry = tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(console);

    let Some(dir) = log_dir else {
        registry
            .try_init()
            .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;
        return Ok(LoggingGuard { _file: None });
    };

    std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(
        dir,
        LOG_FILE_NAME,
    ));
    let file = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);
    registry
        .with(file)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;
    Ok(LoggingGuard { _file: Some(guard) })
}
