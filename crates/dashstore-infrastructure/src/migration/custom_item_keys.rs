//! Consolidates per-application calls custom item keys into one object.
//!
//! Legacy layout, one scalar key per application:
//!
//! ```text
//! appA/calls/selectedCustomItemKey = "x"
//! appB/calls/selectedCustomItemKey = "y"
//! ```
//!
//! New layout, a single JSON object:
//!
//! ```text
//! calls/selectedCustomItemKeys = {"appA":"x","appB":"y"}
//! ```

use anyhow::{Context, Result};
use dashstore_core::migration::Migration;
use dashstore_core::store::KeyValueStore;
use serde_json::{Map, Value};

/// Suffix shared by every legacy per-application key.
pub const LEGACY_SUFFIX: &str = "/calls/selectedCustomItemKey";

/// Key holding the consolidated `{ appId: itemKey }` object.
pub const CONSOLIDATED_KEY: &str = "calls/selectedCustomItemKeys";

#[derive(Debug, Default)]
pub struct ConsolidateSelectedCustomItemKeys;

impl Migration for ConsolidateSelectedCustomItemKeys {
    fn id(&self) -> &str {
        "20210415000000-consolidate-selected-custom-item-keys"
    }

    fn description(&self) -> &str {
        "Consolidate <appId>/calls/selectedCustomItemKey into calls/selectedCustomItemKeys"
    }

    fn run(&self, store: &mut dyn KeyValueStore) -> Result<()> {
        for key in store.keys() {
            let Some(app_id) = key.strip_suffix(LEGACY_SUFFIX) else {
                continue;
            };
            if app_id.is_empty() {
                tracing::warn!(key = %key, "Skipping legacy custom item key without an application id");
                continue;
            }
            let Some(value) = store.get(&key) else {
                continue;
            };

            let mut partial = Map::new();
            partial.insert(app_id.to_string(), Value::String(value));
            store
                .upsert_object(CONSOLIDATED_KEY, partial)
                .with_context(|| format!("Failed to merge '{}' into {}", key, CONSOLIDATED_KEY))?;

            // Only drop the legacy key once its value is safely merged
            store
                .remove(&key)
                .with_context(|| format!("Failed to remove legacy key '{}'", key))?;

            tracing::debug!(app_id, "Consolidated selected custom item key");
        }

        Ok(())
    }
}
