//! Configuration service implementation.
//!
//! Loads the runner configuration from `config.toml`
//! (`~/.config/dashstore/config.toml` unless a path is given).

use crate::migration::DEFAULT_MARKER_KEY;
use crate::paths::DashStorePaths;
use dashstore_core::error::{DashStoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Runner configuration. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Location of the JSON store. `None` resolves to the platform data dir.
    pub store_path: Option<PathBuf>,
    /// Reserved key holding the migration marker.
    pub marker_key: String,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            marker_key: DEFAULT_MARKER_KEY.to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl StoreConfig {
    /// Parses a config document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: StoreConfig = toml::from_str(content)?;
        if config.marker_key.trim().is_empty() {
            return Err(DashStoreError::config("marker_key must not be empty"));
        }
        Ok(config)
    }

    /// Returns the configured store path, or the platform default.
    pub fn resolved_store_path(&self) -> Result<PathBuf> {
        match &self.store_path {
            Some(path) => Ok(path.clone()),
            None => Ok(DashStorePaths::store_file()?),
        }
    }
}

/// Configuration service that loads and caches the runner configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<StoreConfig>>>,
}

impl ConfigService {
    /// Creates a service reading the default config file.
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(DashStorePaths::config_file()?))
    }

    /// Creates a service reading `path`.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the configuration, loading it from file on first access.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error if the file exists but cannot be read or
    /// parsed.
    pub fn get_config(&self) -> Result<StoreConfig> {
        {
            let read_lock = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(cached) = read_lock.as_ref() {
                return Ok(cached.clone());
            }
        }

        let loaded = Self::load_config(&self.path)?;

        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = Some(loaded.clone());

        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = None;
    }

    fn load_config(path: &Path) -> Result<StoreConfig> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file; using defaults");
            return Ok(StoreConfig::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            DashStoreError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        StoreConfig::from_toml_str(&content).map_err(|e| {
            DashStoreError::config(format!("Invalid config {}: {}", path.display(), e))
        })
    }
}
