pub mod error;
pub mod migration;
pub mod store;

// Re-export common types
pub use error::{DashStoreError, Result};
pub use migration::{Migration, MigrationId, MigrationReport, RunnerState};
pub use store::KeyValueStore;
