//! snake_case → camelCase migrations.
//!
//! Early dashboard builds stored flat snake_case keys and snake_case object
//! fields. Current builds read camelCase only.

use anyhow::{Context, Result};
use dashstore_core::migration::Migration;
use dashstore_core::store::KeyValueStore;
use serde_json::{Map, Value};

/// Flat keys renamed by [`RenameSnakeCaseKeys`].
pub const LEGACY_SNAKE_CASE_KEYS: &[&str] = &[
    "sendbird_token",
    "sendbird_token_expires_at",
    "last_visited_application_id",
    "desk_agent_connection",
];

/// Key whose object fields are rewritten by [`CamelCaseDeskSettings`].
pub const DESK_SETTINGS_KEY: &str = "deskSettings";

/// Converts `snake_case` to `camelCase`.
///
/// Empty segments from leading, trailing, or doubled underscores are dropped.
pub fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, segment) in name.split('_').filter(|s| !s.is_empty()).enumerate() {
        if i == 0 {
            out.push_str(segment);
            continue;
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Renames the fixed set of legacy snake_case keys to camelCase.
///
/// Values are copied verbatim. When the camelCase key already exists it was
/// written by a newer build, so it is kept and only the legacy key is dropped.
#[derive(Debug, Default)]
pub struct RenameSnakeCaseKeys;

impl Migration for RenameSnakeCaseKeys {
    fn id(&self) -> &str {
        "20210702000000-camel-case-storage-keys"
    }

    fn description(&self) -> &str {
        "Rename snake_case storage keys to camelCase"
    }

    fn run(&self, store: &mut dyn KeyValueStore) -> Result<()> {
        for &legacy in LEGACY_SNAKE_CASE_KEYS {
            let Some(value) = store.get(legacy) else {
                continue;
            };
            let renamed = snake_to_camel(legacy);

            if store.get(&renamed).is_none() {
                store
                    .set(&renamed, &value)
                    .with_context(|| format!("Failed to write '{}'", renamed))?;
            } else {
                tracing::debug!(legacy, renamed = %renamed, "camelCase key already present; keeping it");
            }

            store
                .remove(legacy)
                .with_context(|| format!("Failed to remove legacy key '{}'", legacy))?;
        }

        Ok(())
    }
}

/// Rewrites the top-level fields of the desk settings object to camelCase.
///
/// Fields already in camelCase win over their snake_case duplicates, and each
/// dropped duplicate is logged. Absent or non-object values are left alone.
#[derive(Debug, Default)]
pub struct CamelCaseDeskSettings;

impl Migration for CamelCaseDeskSettings {
    fn id(&self) -> &str {
        "20210702000100-camel-case-desk-settings"
    }

    fn description(&self) -> &str {
        "Rename deskSettings fields to camelCase"
    }

    fn run(&self, store: &mut dyn KeyValueStore) -> Result<()> {
        let Some(Value::Object(fields)) = store.get_json(DESK_SETTINGS_KEY) else {
            tracing::debug!("No desk settings object to reshape");
            return Ok(());
        };

        if !fields.keys().any(|name| name.contains('_')) {
            return Ok(());
        }

        let (mut snake, camel): (Vec<_>, Vec<_>) =
            fields.into_iter().partition(|(name, _)| name.contains('_'));
        snake.sort_by(|(a, _), (b, _)| a.cmp(b));

        // Existing camelCase fields win; among colliding snake_case fields the
        // first in name order wins
        let mut reshaped: Map<String, Value> = camel.into_iter().collect();
        for (name, value) in snake {
            let renamed = snake_to_camel(&name);
            if renamed.is_empty() || reshaped.contains_key(&renamed) {
                tracing::warn!(
                    field = %name,
                    renamed = %renamed,
                    "Dropping desk settings field whose camelCase name is taken"
                );
                continue;
            }
            reshaped.insert(renamed, value);
        }

        let encoded = serde_json::to_string(&Value::Object(reshaped))?;
        store
            .set(DESK_SETTINGS_KEY, &encoded)
            .context("Failed to write reshaped desk settings")?;

        Ok(())
    }
}
