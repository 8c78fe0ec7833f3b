//! Server state and configuration.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::FolioError;
use crate::render::{HtmlRasterizer, Rasterizer};
use crate::store::{MemoryStore, TemplateStore};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
    /// Directory of `*.json` templates loaded into the store at startup.
    pub seed_dir: Option<PathBuf>,
}

/// Application state shared across handlers.
pub struct AppState {
    pub config: ServerConfig,
    pub store: Arc<dyn TemplateStore>,
    pub rasterizer: Arc<dyn Rasterizer>,
}

impl AppState {
    /// State with an in-memory store and the HTML rasterizer.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_parts(config, Arc::new(MemoryStore::new()), Arc::new(HtmlRasterizer))
    }

    pub fn with_parts(
        config: ServerConfig,
        store: Arc<dyn TemplateStore>,
        rasterizer: Arc<dyn Rasterizer>,
    ) -> Self {
        Self {
            config,
            store,
            rasterizer,
        }
    }

    /// Load the configured seed directory into the store. Returns the number
    /// of templates created; zero when no directory is configured.
    pub async fn seed(&self) -> Result<usize, FolioError> {
        let Some(dir) = &self.config.seed_dir else {
            return Ok(0);
        };
        let count = super::seed_store(self.store.as_ref(), dir).await?;
        tracing::info!(count, dir = %dir.display(), "seeded template store");
        Ok(count)
    }
}
