//! Versioned migrations for the persisted key-value record.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    MigrationRunner                       │
//! │  reads marker → registry.pending(marker) → run each      │
//! │  unit → compare-and-set marker to the unit's id          │
//! └──────────────────────────────────────────────────────────┘
//!                             │
//!                             V
//!                    MigrationRegistry
//!                 (sorted by MigrationId)
//!                             │
//!          ┌──────────────────┼──────────────────┐
//!          V                  V                  V
//!  ConsolidateSelected   RenameSnakeCase   CamelCaseDesk
//!  CustomItemKeys        Keys              Settings
//! ```
//!
//! # Adding a Migration
//!
//! 1. Generate an identifier: `dashstore new-id <slug>`
//! 2. Implement `Migration` in a module here. `run` must be a no-op once its
//!    legacy data is gone, because a failed pass retries the unit from the
//!    start.
//! 3. Add the unit to `builtin_registry()`. Position in the list does not
//!    matter; the registry sorts by identifier.

mod camel_case;
mod custom_item_keys;
mod registry;
mod runner;

// Public API
pub use registry::{MigrationRegistry, RegisteredMigration};
pub use runner::{MigrationRunner, DEFAULT_MARKER_KEY};

// Re-export specific migrations for advanced use cases
pub use camel_case::{
    snake_to_camel, CamelCaseDeskSettings, RenameSnakeCaseKeys, DESK_SETTINGS_KEY,
    LEGACY_SNAKE_CASE_KEYS,
};
pub use custom_item_keys::{ConsolidateSelectedCustomItemKeys, CONSOLIDATED_KEY, LEGACY_SUFFIX};

use dashstore_core::error::Result;
use std::sync::Arc;

/// Builds the registry of every migration shipped with this build.
///
/// # Errors
///
/// Returns an error if a built-in unit has a malformed or duplicate
/// identifier.
pub fn builtin_registry() -> Result<MigrationRegistry> {
    MigrationRegistry::new(vec![
        Arc::new(ConsolidateSelectedCustomItemKeys),
        Arc::new(RenameSnakeCaseKeys),
        Arc::new(CamelCaseDeskSettings),
    ])
}
