//! Path management for dashstore configuration and data files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/dashstore/         # Config directory
//! └── config.toml              # Runner configuration
//!
//! ~/.local/share/dashstore/    # Data directory
//! ├── store.json               # Persisted key-value record
//! └── store.lock               # Exclusive write lock
//! ```

use std::path::PathBuf;

const APP_DIR: &str = "dashstore";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for dashstore_core::DashStoreError {
    fn from(err: PathError) -> Self {
        Self::config(err.to_string())
    }
}

/// Default locations, resolved per platform via `dirs`.
pub struct DashStorePaths;

impl DashStorePaths {
    /// Returns the dashstore configuration directory (e.g. `~/.config/dashstore/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the dashstore data directory (e.g. `~/.local/share/dashstore/`).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the default path of the persisted store.
    pub fn store_file() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("store.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_live_under_app_dirs() {
        // CI machines without a home directory cannot resolve anything
        let (Ok(config_file), Ok(store_file)) =
            (DashStorePaths::config_file(), DashStorePaths::store_file())
        else {
            return;
        };

        assert!(config_file.ends_with("dashstore/config.toml"));
        assert!(store_file.ends_with("dashstore/store.json"));
    }
}
