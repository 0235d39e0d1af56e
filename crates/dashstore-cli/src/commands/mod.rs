pub mod keys;
pub mod migrate;
pub mod new_id;
pub mod status;

use anyhow::{Context as _, Result};
use dashstore_infrastructure::{
    builtin_registry, ConfigService, JsonFileStore, MigrationRunner, StoreConfig,
};
use std::path::PathBuf;

/// Resolved settings shared by every command.
pub struct Context {
    pub config: StoreConfig,
    pub store_path: PathBuf,
}

impl Context {
    pub fn load(config_path: Option<PathBuf>, store_override: Option<PathBuf>) -> Result<Self> {
        let service = match config_path {
            Some(path) => ConfigService::with_path(path),
            None => ConfigService::new()?,
        };
        let config = service
            .get_config()
            .with_context(|| format!("Failed to load {}", service.path().display()))?;

        let store_path = match store_override {
            Some(path) => path,
            None => config.resolved_store_path()?,
        };

        Ok(Self { config, store_path })
    }

    pub fn open_store(&self) -> Result<JsonFileStore> {
        JsonFileStore::open(&self.store_path)
            .with_context(|| format!("Failed to open store {}", self.store_path.display()))
    }

    pub fn runner(&self) -> Result<MigrationRunner> {
        Ok(MigrationRunner::with_marker_key(
            builtin_registry()?,
            self.config.marker_key.clone(),
        ))
    }
}
