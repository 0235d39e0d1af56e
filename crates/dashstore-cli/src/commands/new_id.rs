use anyhow::{Context, Result};
use dashstore_core::MigrationId;

pub fn generate(slug: &str) -> Result<()> {
    let id = MigrationId::generate(slug)
        .with_context(|| format!("'{}' is not a valid slug (use a-z, 0-9, '-', '_')", slug))?;

    println!("{}", id);
    Ok(())
}
