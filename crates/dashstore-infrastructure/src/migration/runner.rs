//! Migration runner: applies pending units and advances the marker.

use super::registry::MigrationRegistry;
use dashstore_core::error::{DashStoreError, Result};
use dashstore_core::migration::{Migration, MigrationId, MigrationReport, RunnerState};
use dashstore_core::store::KeyValueStore;

/// Reserved key holding the identifier of the last applied migration.
pub const DEFAULT_MARKER_KEY: &str = "__dashstore/migrations/last_applied";

/// Applies registry units to a store in ascending identifier order.
///
/// State machine: `Idle → Running → (Completed | Failed)`. A runner can be
/// invoked again from either terminal state: after `Completed` with nothing
/// new it is a no-op, after `Failed` it retries from the recorded marker.
///
/// # Example
///
/// ```ignore
/// let mut runner = MigrationRunner::new(builtin_registry()?);
/// let report = runner.run(&mut store)?;
/// assert_eq!(report.state, RunnerState::Completed);
/// ```
#[derive(Debug)]
pub struct MigrationRunner {
    registry: MigrationRegistry,
    marker_key: String,
    state: RunnerState,
}

impl MigrationRunner {
    /// Creates a runner using [`DEFAULT_MARKER_KEY`].
    pub fn new(registry: MigrationRegistry) -> Self {
        Self::with_marker_key(registry, DEFAULT_MARKER_KEY)
    }

    pub fn with_marker_key(registry: MigrationRegistry, marker_key: impl Into<String>) -> Self {
        Self {
            registry,
            marker_key: marker_key.into(),
            state: RunnerState::Idle,
        }
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn marker_key(&self) -> &str {
        &self.marker_key
    }

    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    /// Reads the marker from `store`. `None` means nothing applied yet.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentifier` if the stored marker cannot be parsed.
    pub fn read_marker(&self, store: &dyn KeyValueStore) -> Result<Option<MigrationId>> {
        store
            .get(&self.marker_key)
            .map(|raw| MigrationId::parse(&raw))
            .transpose()
    }

    /// Lists the identifiers a pass would apply, without running anything.
    pub fn plan(&self, store: &dyn KeyValueStore) -> Result<Vec<MigrationId>> {
        let marker = self.read_marker(store)?;
        Ok(self
            .registry
            .pending(marker.as_ref())
            .iter()
            .map(|m| m.id.clone())
            .collect())
    }

    /// Runs every pending unit against `store`.
    ///
    /// The store is refreshed first, so a pass started from a stale handle
    /// sees the marker other writers left. After each unit succeeds the marker
    /// is advanced to its identifier. The pass stops at the first failing
    /// unit, leaving the marker at the last unit that succeeded.
    ///
    /// # Errors
    ///
    /// - `InvalidIdentifier` if the stored marker cannot be parsed
    /// - `MigrationFailed` if a unit fails (or the unit's own
    ///   `DashStoreError` when it failed with one, e.g. `StorageUnavailable`)
    /// - `MarkerConflict` if another writer moved the marker during the pass
    ///
    /// Failures are only logged at debug level; reporting them is up to the
    /// caller (see `run_startup_migrations`).
    pub fn run(&mut self, store: &mut dyn KeyValueStore) -> Result<MigrationReport> {
        let span = tracing::info_span!("migration_pass", marker_key = %self.marker_key);
        let _guard = span.enter();

        self.state = RunnerState::Running;
        let result = self.run_pass(store);
        self.state = match &result {
            Ok(_) => RunnerState::Completed,
            Err(_) => RunnerState::Failed,
        };

        match &result {
            Ok(report) if report.is_noop() => {
                tracing::debug!("No pending migrations");
            }
            Ok(report) => {
                tracing::info!(
                    "Migration pass completed: {} unit(s) applied, marker now {}",
                    report.applied.len(),
                    display_marker(report.marker_after.as_ref())
                );
            }
            Err(e) => {
                tracing::debug!("Migration pass failed: {}", e);
            }
        }

        result
    }

    fn run_pass(&self, store: &mut dyn KeyValueStore) -> Result<MigrationReport> {
        store.refresh()?;
        let marker_before = self.read_marker(store)?;
        let pending = self.registry.pending(marker_before.as_ref());

        if !pending.is_empty() {
            tracing::info!(
                "Starting migration pass from {} ({} pending)",
                display_marker(marker_before.as_ref()),
                pending.len()
            );
        }

        let mut marker = marker_before.clone();
        let mut applied = Vec::with_capacity(pending.len());

        for (i, pending_migration) in pending.iter().enumerate() {
            let id = &pending_migration.id;
            tracing::info!(
                "Migration step {}/{}: {} ({})",
                i + 1,
                pending.len(),
                id,
                pending_migration.description()
            );

            apply(pending_migration.migration.as_ref(), id, store)?;
            self.advance_marker(store, marker.as_ref(), id)?;

            marker = Some(id.clone());
            applied.push(id.clone());
        }

        Ok(MigrationReport {
            marker_before,
            marker_after: marker,
            applied,
            state: RunnerState::Completed,
        })
    }

    fn advance_marker(
        &self,
        store: &mut dyn KeyValueStore,
        expected: Option<&MigrationId>,
        next: &MigrationId,
    ) -> Result<()> {
        let expected = expected.map(MigrationId::to_string);
        let written =
            store.compare_and_set(&self.marker_key, expected.as_deref(), &next.to_string())?;

        if !written {
            return Err(DashStoreError::MarkerConflict {
                expected,
                found: store.get(&self.marker_key),
            });
        }
        Ok(())
    }
}

fn apply(migration: &dyn Migration, id: &MigrationId, store: &mut dyn KeyValueStore) -> Result<()> {
    migration.run(store).map_err(|e| match e.downcast_ref::<DashStoreError>() {
        Some(inner) if inner.is_storage_unavailable() => inner.clone(),
        _ => DashStoreError::migration_failed(id.to_string(), format!("{:#}", e)),
    })
}

fn display_marker(marker: Option<&MigrationId>) -> String {
    marker.map_or_else(|| "<none>".to_string(), MigrationId::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use anyhow::Context;
    use std::sync::Arc;

    struct WriteKey {
        id: &'static str,
        key: &'static str,
    }

    impl Migration for WriteKey {
        fn id(&self) -> &str {
            self.id
        }

        fn description(&self) -> &str {
            "writes a key"
        }

        fn run(&self, store: &mut dyn KeyValueStore) -> anyhow::Result<()> {
            store.set(self.key, "done")?;
            Ok(())
        }
    }

    struct Unavailable;

    impl Migration for Unavailable {
        fn id(&self) -> &str {
            "20210201000000-unavailable"
        }

        fn description(&self) -> &str {
            "storage goes away"
        }

        fn run(&self, _store: &mut dyn KeyValueStore) -> anyhow::Result<()> {
            Err(DashStoreError::storage_unavailable("quota exceeded"))
                .context("writing consolidated key")
        }
    }

    fn runner(migrations: Vec<Arc<dyn Migration>>) -> MigrationRunner {
        MigrationRunner::new(MigrationRegistry::new(migrations).unwrap())
    }

    #[test]
    fn test_new_runner_is_idle() {
        let runner = runner(vec![]);
        assert_eq!(runner.state(), RunnerState::Idle);
        assert_eq!(runner.marker_key(), DEFAULT_MARKER_KEY);
    }

    #[test]
    fn test_run_applies_and_records_marker() {
        let mut runner = runner(vec![
            Arc::new(WriteKey { id: "20210101000000-a", key: "a" }),
            Arc::new(WriteKey { id: "20210201000000-b", key: "b" }),
        ]);
        let mut store = MemoryStore::new();

        let report = runner.run(&mut store).unwrap();

        assert_eq!(runner.state(), RunnerState::Completed);
        assert_eq!(report.marker_before, None);
        assert_eq!(report.applied.len(), 2);
        assert_eq!(
            store.get(DEFAULT_MARKER_KEY).as_deref(),
            Some("20210201000000-b")
        );
    }

    #[test]
    fn test_plan_does_not_execute() {
        let runner = runner(vec![Arc::new(WriteKey { id: "20210101000000-a", key: "a" })]);
        let store = MemoryStore::new();

        let plan = runner.plan(&store).unwrap();

        assert_eq!(plan, vec![MigrationId::parse("20210101000000-a").unwrap()]);
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn test_invalid_marker_fails_before_any_unit() {
        let mut runner = runner(vec![Arc::new(WriteKey { id: "20210101000000-a", key: "a" })]);
        let mut store: MemoryStore = [(DEFAULT_MARKER_KEY, "garbage")].into_iter().collect();

        let err = runner.run(&mut store).unwrap_err();

        assert_eq!(err, DashStoreError::InvalidIdentifier("garbage".to_string()));
        assert_eq!(runner.state(), RunnerState::Failed);
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn test_storage_unavailable_keeps_its_variant() {
        let mut runner = runner(vec![
            Arc::new(WriteKey { id: "20210101000000-a", key: "a" }),
            Arc::new(Unavailable),
        ]);
        let mut store = MemoryStore::new();

        let err = runner.run(&mut store).unwrap_err();

        assert!(err.is_storage_unavailable());
        assert_eq!(
            store.get(DEFAULT_MARKER_KEY).as_deref(),
            Some("20210101000000-a")
        );
    }

    /// A store whose marker is bumped by "another tab" the first time the
    /// runner tries to write it.
    struct RacingStore {
        inner: MemoryStore,
        marker_key: &'static str,
        raced: bool,
    }

    impl KeyValueStore for RacingStore {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> dashstore_core::Result<()> {
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> dashstore_core::Result<()> {
            self.inner.remove(key)
        }

        fn keys(&self) -> Vec<String> {
            self.inner.keys()
        }

        fn compare_and_set(
            &mut self,
            key: &str,
            expected: Option<&str>,
            value: &str,
        ) -> dashstore_core::Result<bool> {
            if key == self.marker_key && !self.raced {
                self.raced = true;
                self.inner.set(key, "20210301000000-other")?;
            }
            self.inner.compare_and_set(key, expected, value)
        }
    }

    #[test]
    fn test_concurrent_marker_write_is_a_conflict() {
        let mut runner = runner(vec![Arc::new(WriteKey { id: "20210101000000-a", key: "a" })]);
        let mut store = RacingStore {
            inner: MemoryStore::new(),
            marker_key: DEFAULT_MARKER_KEY,
            raced: false,
        };

        let err = runner.run(&mut store).unwrap_err();

        assert_eq!(
            err,
            DashStoreError::MarkerConflict {
                expected: None,
                found: Some("20210301000000-other".to_string()),
            }
        );
        assert_eq!(runner.state(), RunnerState::Failed);
        // The marker is never moved backwards
        assert_eq!(
            store.get(DEFAULT_MARKER_KEY).as_deref(),
            Some("20210301000000-other")
        );
    }
}
