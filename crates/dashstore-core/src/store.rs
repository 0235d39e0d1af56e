//! Storage accessor trait.
//!
//! Every read and write of the persisted record goes through [`KeyValueStore`].
//! Runners and migration units receive the store as `&mut dyn KeyValueStore`
//! rather than reaching for a global handle.

use serde_json::{Map, Value};

use crate::error::Result;

/// Accessor over a string-keyed persistent key-value medium.
///
/// Values are raw strings. Structured values are stored as JSON documents and
/// handled by the provided `get_json` / `upsert_object` helpers.
pub trait KeyValueStore {
    /// Reads a raw value. Returns `None` if the key does not exist.
    fn get(&self, key: &str) -> Option<String>;

    /// Overwrites a value unconditionally.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Deletes a key. Removing an absent key is a no-op.
    fn remove(&mut self, key: &str) -> Result<()>;

    /// Returns a sorted snapshot of every stored key.
    fn keys(&self) -> Vec<String>;

    /// Writes `value` only if the current value equals `expected`
    /// (`None` meaning the key is absent).
    ///
    /// Returns `Ok(false)` without writing when the current value differs.
    /// Backends that can lock the medium should override this so the
    /// comparison and write happen atomically.
    fn compare_and_set(&mut self, key: &str, expected: Option<&str>, value: &str) -> Result<bool> {
        if self.get(key).as_deref() != expected {
            return Ok(false);
        }
        self.set(key, value)?;
        Ok(true)
    }

    /// Reads and JSON-decodes a value.
    ///
    /// Undecodable values are treated as absent.
    fn get_json(&self, key: &str) -> Option<Value> {
        let raw = self.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Ignoring malformed JSON value");
                None
            }
        }
    }

    /// Shallow-merges `partial` into the JSON object stored at `key`.
    ///
    /// An absent value, an undecodable value, or a value that is not a JSON
    /// object is treated as an empty object. Fields in `partial` overwrite
    /// existing fields of the same name. Shared backends should override this
    /// so the read and the write see the same record.
    fn upsert_object(&mut self, key: &str, partial: Map<String, Value>) -> Result<()> {
        let encoded = merge_object(key, self.get(key).as_deref(), partial)?;
        self.set(key, &encoded)
    }

    /// Re-reads the medium so later reads observe other writers.
    ///
    /// The runner calls this at the start of every pass. Backends without a
    /// cached snapshot keep the no-op default.
    fn refresh(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Merges `partial` into the raw `current` value of `key` and returns the
/// encoded object, following the rules of [`KeyValueStore::upsert_object`].
pub fn merge_object(key: &str, current: Option<&str>, partial: Map<String, Value>) -> Result<String> {
    let mut merged = match current.map(serde_json::from_str::<Value>) {
        Some(Ok(Value::Object(map))) => map,
        Some(Ok(_)) => {
            tracing::warn!(key, "Replacing non-object value during upsert");
            Map::new()
        }
        Some(Err(e)) => {
            tracing::warn!(key, error = %e, "Replacing malformed JSON value during upsert");
            Map::new()
        }
        None => Map::new(),
    };

    merged.extend(partial);

    Ok(serde_json::to_string(&Value::Object(merged))?)
}
