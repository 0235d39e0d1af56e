//! Migration domain types.
//!
//! The registry and runner that operate on these types live in
//! `dashstore-infrastructure`.

mod id;
mod model;

pub use id::MigrationId;
pub use model::{Migration, MigrationReport, RunnerState};
