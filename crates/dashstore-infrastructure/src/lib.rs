pub mod bootstrap;
pub mod config_service;
pub mod migration;
pub mod paths;
pub mod storage;

pub use crate::bootstrap::{run_startup_migrations, StartupOutcome};
pub use crate::config_service::{ConfigService, StoreConfig};
pub use crate::migration::{builtin_registry, MigrationRegistry, MigrationRunner};
pub use crate::storage::{JsonFileStore, MemoryStore};
