//! Shared setup for commands: configuration, logging and layer parts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use globelayer::cache::FileStore;
use globelayer::config::LayerConfigFile;
use globelayer::level::LevelSet;
use globelayer::logging::{self, LoggingGuard, DEFAULT_LOG_FILTER};
use globelayer::retrieve::{
    LocalRetriever, RemoteRetriever, ReqwestClient, Retriever, ServiceUrlBuilder,
    TemplateUrlBuilder, TileUrlBuilder,
};
use tracing::info;

use crate::error::CliError;

/// Command context built once in `main`.
pub struct CliRunner {
    config: LayerConfigFile,
    config_path: Option<PathBuf>,
    _logging: LoggingGuard,
}

impl CliRunner {
    /// Initialises logging and loads `config_path`, or the default config
    /// file when none is given.
    pub fn new(config_path: Option<&Path>, log_dir: Option<&Path>) -> Result<Self, CliError> {
        let logging = logging::init_logging(log_dir, DEFAULT_LOG_FILTER)?;
        let config = match config_path {
            Some(path) => LayerConfigFile::load(path)?,
            None => LayerConfigFile::load_default()?,
        };
        Ok(Self {
            config,
            config_path: config_path.map(Path::to_path_buf),
            _logging: logging,
        })
    }

    pub fn config(&self) -> &LayerConfigFile {
        &self.config
    }

    pub fn log_startup(&self, command: &str) {
        info!(
            command,
            version = env!("CARGO_PKG_VERSION"),
            config = %self
                .config_path
                .as_deref()
                .map_or_else(|| "(defaults)".to_string(), |p| p.display().to_string()),
            layer = %self.config.layer.name,
            "globelayer starting"
        );
    }

    pub fn level_set(&self) -> Result<Arc<LevelSet>, CliError> {
        if self.config.levels.cache_name.is_empty() {
            return Err(CliError::Config(
                "[levels] cache_name is required".to_string(),
            ));
        }
        Ok(Arc::new(LevelSet::new(self.config.levels.clone())?))
    }

    pub fn file_store(&self) -> Result<FileStore, CliError> {
        match &self.config.cache.directory {
            Some(dir) => Ok(FileStore::new(dir)),
            None => Ok(FileStore::in_default_location()?),
        }
    }

    /// Local root when configured, otherwise an HTTP retriever using the URL
    /// template or the level set's service.
    ///
    /// Must be called outside the async runtime.
    pub fn retriever(&self) -> Result<Arc<dyn Retriever>, CliError> {
        let retrieval = &self.config.retrieval;
        if let Some(root) = &retrieval.local_root {
            return Ok(Arc::new(LocalRetriever::new(root)));
        }

        let urls: Arc<dyn TileUrlBuilder> = match &retrieval.url_template {
            Some(template) => Arc::new(TemplateUrlBuilder::new(template)),
            None if self.config.levels.service.is_some() => Arc::new(ServiceUrlBuilder),
            None => {
                return Err(CliError::Config(
                    "no tile origin: set [retrieval] local_root, url_template or service"
                        .to_string(),
                ))
            }
        };
        let layer = &self.config.layer;
        let client = ReqwestClient::with_timeouts(layer.connect_timeout, layer.read_timeout)?;
        Ok(Arc::new(RemoteRetriever::new(Arc::new(client), urls)))
    }

    pub fn runtime(&self) -> Result<tokio::runtime::Runtime, CliError> {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("globelayer-worker")
            .build()
            .map_err(|e| CliError::Runtime(e.to_string()))
    }
}
