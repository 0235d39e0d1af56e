//! Error types for dashstore.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the storage and migration layers.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DashStoreError {
    /// The persistence medium cannot be read or written
    #[error("Storage unavailable: {message}")]
    StorageUnavailable { message: String },

    /// A migration unit failed while running
    #[error("Migration '{id}' failed: {message}")]
    MigrationFailed { id: String, message: String },

    /// A string is not a well-formed migration identifier
    #[error("Invalid migration identifier: '{0}'")]
    InvalidIdentifier(String),

    /// Two units were registered under the same identifier
    #[error("Duplicate migration identifier: '{0}'")]
    DuplicateMigration(String),

    /// The migration marker changed underneath a running pass
    #[error("Migration marker changed concurrently: expected {expected:?}, found {found:?}")]
    MarkerConflict {
        expected: Option<String>,
        found: Option<String>,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DashStoreError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a StorageUnavailable error
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
        }
    }

    /// Creates a MigrationFailed error
    pub fn migration_failed(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MigrationFailed {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a StorageUnavailable error
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. })
    }

    /// Check if this is a MigrationFailed error
    pub fn is_migration_failed(&self) -> bool {
        matches!(self, Self::MigrationFailed { .. })
    }

    /// Check if this is a MarkerConflict error
    pub fn is_marker_conflict(&self) -> bool {
        matches!(self, Self::MarkerConflict { .. })
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for DashStoreError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageUnavailable {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for DashStoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for DashStoreError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, DashStoreError>`.
pub type Result<T> = std::result::Result<T, DashStoreError>;
