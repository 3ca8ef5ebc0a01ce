//! Application state.

use std::sync::Arc;

use crate::detection::oracle::DetectorSet;
use crate::server::config::ServerConfig;
use crate::storage::ImageStore;

/// Shared application state. Everything behind it is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub detectors: Arc<DetectorSet>,
    pub store: Arc<ImageStore>,
}

impl AppState {
    pub fn new(config: ServerConfig, detectors: DetectorSet, store: ImageStore) -> Self {
        Self {
            config,
            detectors: Arc::new(detectors),
            store: Arc::new(store),
        }
    }

    /// Load cascades and open storage as described by `config`
    pub async fn from_config(config: ServerConfig) -> anyhow::Result<Self> {
        let detectors = DetectorSet::load_dir(&config.cascade_dir)?;
        let store = ImageStore::open(&config.upload_dir, &config.processed_dir).await?;
        Ok(Self::new(config, detectors, store))
    }
}
