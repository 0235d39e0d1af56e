//! Startup entry point for migrations.
//!
//! Hosts call [`run_startup_migrations`] once, before any feature code reads
//! the store. Failures are logged and reported as [`StartupOutcome::Degraded`]
//! so the host can keep running on the unmigrated record.

use crate::migration::MigrationRunner;
use dashstore_core::error::DashStoreError;
use dashstore_core::migration::MigrationReport;
use dashstore_core::store::KeyValueStore;

/// Result of the startup migration pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupOutcome {
    /// Every pending migration was applied (possibly none).
    Migrated(MigrationReport),
    /// The pass failed; the store is left at the last successful unit.
    Degraded(DashStoreError),
}

impl StartupOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

/// Runs pending migrations without ever failing the caller.
pub fn run_startup_migrations(
    store: &mut dyn KeyValueStore,
    runner: &mut MigrationRunner,
) -> StartupOutcome {
    match runner.run(store) {
        Ok(report) => StartupOutcome::Migrated(report),
        Err(e) => {
            if e.is_storage_unavailable() {
                tracing::error!("Storage unavailable; continuing without migrations: {}", e);
            } else {
                tracing::error!(
                    "Migrations failed; continuing in degraded mode (retried on next start): {}",
                    e
                );
            }
            StartupOutcome::Degraded(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::{builtin_registry, MigrationRegistry};
    use crate::storage::MemoryStore;
    use dashstore_core::migration::{Migration, RunnerState};
    use std::io;
    use std::sync::{Arc, Mutex};

    struct AlwaysFails;

    impl Migration for AlwaysFails {
        fn id(&self) -> &str {
            "20210101000000-always-fails"
        }

        fn description(&self) -> &str {
            "always fails"
        }

        fn run(&self, _store: &mut dyn KeyValueStore) -> anyhow::Result<()> {
            anyhow::bail!("legacy value is unreadable")
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_successful_startup() {
        let mut runner = MigrationRunner::new(builtin_registry().unwrap());
        let mut store = MemoryStore::new();

        let outcome = run_startup_migrations(&mut store, &mut runner);

        let report = match outcome {
            StartupOutcome::Migrated(report) => report,
            StartupOutcome::Degraded(e) => panic!("expected Migrated, got {:?}", e),
        };
        assert_eq!(report.state, RunnerState::Completed);
        assert_eq!(report.applied.len(), 3);
    }

    #[test]
    fn test_failure_is_degraded_not_fatal() {
        let registry = MigrationRegistry::new(vec![Arc::new(AlwaysFails)]).unwrap();
        let mut runner = MigrationRunner::new(registry);
        let mut store = MemoryStore::new();

        let outcome = run_startup_migrations(&mut store, &mut runner);

        assert!(outcome.is_degraded());
        assert_eq!(runner.state(), RunnerState::Failed);
        assert!(store.is_empty());
    }

    #[test]
    fn test_failure_is_logged_as_error_once() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let registry = MigrationRegistry::new(vec![Arc::new(AlwaysFails)]).unwrap();
        let mut runner = MigrationRunner::new(registry);
        let mut store = MemoryStore::new();

        let outcome = tracing::subscriber::with_default(subscriber, || {
            run_startup_migrations(&mut store, &mut runner)
        });

        assert!(outcome.is_degraded());
        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("ERROR").count(), 1, "{}", output);
    }
}
