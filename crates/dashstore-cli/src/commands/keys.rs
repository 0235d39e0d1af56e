use super::Context;
use anyhow::{bail, Result};
use dashstore_core::KeyValueStore;

pub fn list(context: &Context) -> Result<()> {
    let store = context.open_store()?;
    for key in store.keys() {
        println!("{}", key);
    }
    Ok(())
}

pub fn get(context: &Context, key: &str) -> Result<()> {
    let store = context.open_store()?;
    match store.get(key) {
        Some(value) => println!("{}", value),
        None => bail!("Key '{}' not found", key),
    }
    Ok(())
}

pub fn set(context: &Context, key: &str, value: &str) -> Result<()> {
    if key == context.config.marker_key {
        bail!("'{}' is reserved for the migration marker", key);
    }

    let mut store = context.open_store()?;
    store.set(key, value)?;
    tracing::info!(key, "Value written");
    Ok(())
}
