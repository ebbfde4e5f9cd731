//! CLI error type.

use std::fmt;

use globelayer::cache::StoreError;
use globelayer::config::ConfigError;
use globelayer::level::LevelError;
use globelayer::logging::LoggingError;
use globelayer::retrieve::RetrieveError;

/// Errors reported to the user before exiting with a failure status.
#[derive(Debug)]
pub enum CliError {
    Config(String),
    Levels(LevelError),
    Store(StoreError),
    Retrieve(RetrieveError),
    Logging(LoggingError),
    Runtime(String),
    InvalidArgument(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Levels(e) => write!(f, "Level set error: {}", e),
            CliError::Store(e) => write!(f, "File store error: {}", e),
            CliError::Retrieve(e) => write!(f, "Retrieval error: {}", e),
            CliError::Logging(e) => write!(f, "Logging error: {}", e),
            CliError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LevelError> for CliError {
    fn from(e: LevelError) -> Self {
        CliError::Levels(e)
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        CliError::Store(e)
    }
}

impl From<RetrieveError> for CliError {
    fn from(e: RetrieveError) -> Self {
        CliError::Retrieve(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}
