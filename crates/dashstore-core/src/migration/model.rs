//! Migration unit trait and runner result types.

use serde::{Deserialize, Serialize};

use super::id::MigrationId;
use crate::store::KeyValueStore;

/// A single versioned, one-shot transformation of persisted data.
///
/// The runner guarantees a unit is applied at most once per store. A unit that
/// fails is retried from the start on the next pass, so `run` must be a no-op
/// when its preconditions (legacy keys present, old shape present) no longer
/// hold.
pub trait Migration: Send + Sync {
    /// Returns the identifier (`YYYYMMDDHHMMSS-<suffix>`) that names and
    /// orders this unit.
    ///
    /// Validated when the unit is registered.
    fn id(&self) -> &str;

    /// Returns a human-readable description of this unit.
    ///
    /// Used for logging and `dashstore list`.
    fn description(&self) -> &str;

    /// Applies the transformation.
    ///
    /// # Errors
    ///
    /// Returns an error if the transformation cannot be completed. Errors that
    /// wrap a [`crate::DashStoreError`] keep their variant when surfaced by
    /// the runner.
    fn run(&self, store: &mut dyn KeyValueStore) -> anyhow::Result<()>;
}

/// Lifecycle state of a migration runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerState {
    /// No pass has started yet.
    Idle,
    /// A pass is executing units.
    Running,
    /// The last pass applied every pending unit.
    Completed,
    /// The last pass stopped at a failing unit.
    Failed,
}

/// Outcome of a completed migration pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Marker value read at the start of the pass.
    pub marker_before: Option<MigrationId>,
    /// Marker value after the pass.
    pub marker_after: Option<MigrationId>,
    /// Units applied during this pass, in execution order.
    pub applied: Vec<MigrationId>,
    pub state: RunnerState,
}

impl MigrationReport {
    /// Returns true if the pass had nothing to apply.
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}
