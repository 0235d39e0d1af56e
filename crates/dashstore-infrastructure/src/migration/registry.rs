//! Migration registry: the static, ordered catalog of migration units.
//!
//! Units are sorted by identifier at construction, so the order in which they
//! are declared never affects the order in which they run.

use dashstore_core::error::{DashStoreError, Result};
use dashstore_core::migration::{Migration, MigrationId};
use std::sync::Arc;

/// A unit together with its parsed identifier.
#[derive(Clone)]
pub struct RegisteredMigration {
    pub id: MigrationId,
    pub migration: Arc<dyn Migration>,
}

impl RegisteredMigration {
    pub fn description(&self) -> &str {
        self.migration.description()
    }
}

impl std::fmt::Debug for RegisteredMigration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredMigration")
            .field("id", &self.id.to_string())
            .field("description", &self.description())
            .finish()
    }
}

/// Ordered collection of migration units keyed by [`MigrationId`].
///
/// # Example
///
/// ```ignore
/// let registry = MigrationRegistry::new(vec![
///     Arc::new(RenameSnakeCaseKeys),
///     Arc::new(ConsolidateSelectedCustomItemKeys),
/// ])?;
///
/// // Everything after the recorded marker, oldest first
/// for pending in registry.pending(marker.as_ref()) { ... }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MigrationRegistry {
    /// Ascending by identifier.
    migrations: Vec<RegisteredMigration>,
}

impl MigrationRegistry {
    /// Builds a registry from units in any order.
    ///
    /// # Errors
    ///
    /// - `InvalidIdentifier` if a unit's id is not `YYYYMMDDHHMMSS-<suffix>`
    /// - `DuplicateMigration` if two units share an identifier
    pub fn new(migrations: Vec<Arc<dyn Migration>>) -> Result<Self> {
        let mut migrations = migrations
            .into_iter()
            .map(|migration| {
                Ok(RegisteredMigration {
                    id: MigrationId::parse(migration.id())?,
                    migration,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        migrations.sort_by(|a, b| a.id.cmp(&b.id));

        if let Some(pair) = migrations.windows(2).find(|pair| pair[0].id == pair[1].id) {
            return Err(DashStoreError::DuplicateMigration(pair[0].id.to_string()));
        }

        Ok(Self { migrations })
    }

    /// Creates a registry with no units.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns every unit with an identifier strictly greater than `since`,
    /// ascending. `None` means nothing has been applied yet.
    pub fn pending(&self, since: Option<&MigrationId>) -> &[RegisteredMigration] {
        let start = match since {
            Some(since) => self.migrations.partition_point(|m| &m.id <= since),
            None => 0,
        };

        &self.migrations[start..]
    }

    /// Iterates over all units, ascending by identifier.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredMigration> {
        self.migrations.iter()
    }

    /// Returns the identifier of the newest unit, if any.
    pub fn latest(&self) -> Option<&MigrationId> {
        self.migrations.last().map(|m| &m.id)
    }

    pub fn contains(&self, id: &MigrationId) -> bool {
        self.migrations
            .binary_search_by(|candidate| candidate.id.cmp(id))
            .is_ok()
    }

    /// Returns true if no migrations are registered.
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Returns the number of registered migrations.
    pub fn len(&self) -> usize {
        self.migrations.len()
    }
}
