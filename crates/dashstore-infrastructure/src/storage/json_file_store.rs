//! Durable key-value store backed by a single JSON file.
//!
//! The whole record is one JSON object of string values. Mutations are
//! serialized across processes with an exclusive lock file and written via
//! tmp file + atomic rename.

use dashstore_core::error::{DashStoreError, Result};
use dashstore_core::store::{merge_object, KeyValueStore};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

/// A `KeyValueStore` persisted to a JSON file.
///
/// Provides:
/// - **Atomicity**: each mutation is all-or-nothing via tmp file + atomic rename
/// - **Isolation**: an exclusive lock is held from reload to rename, so
///   concurrent writers never lose each other's keys or each other's fields
///   merged through `upsert_object`
/// - **Durability**: explicit fsync before rename
///
/// Reads are served from the snapshot taken at `open`, refreshed on every
/// mutation and by `refresh`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Opens the store at `path`, loading its current contents.
    ///
    /// A missing or empty file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the file cannot be read or is not a
    /// JSON object of string values.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = load_entries(&path)?;
        tracing::debug!(path = %path.display(), keys = entries.len(), "Opened JSON file store");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the file, picking up writes made by other processes.
    pub fn reload(&mut self) -> Result<()> {
        self.entries = load_entries(&self.path)?;
        Ok(())
    }

    /// Runs `f` against the freshly reloaded record under the exclusive lock,
    /// saving the result if `f` reports a change.
    fn update<F, T>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> (bool, T),
    {
        let _lock = FileLock::acquire(&self.path)?;

        let mut entries = load_entries(&self.path)?;
        let (changed, output) = f(&mut entries);

        if changed {
            save_entries(&self.path, &entries)?;
        }
        self.entries = entries;

        Ok(output)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
            (true, ())
        })
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.update(|entries| (entries.remove(key).is_some(), ()))
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn compare_and_set(&mut self, key: &str, expected: Option<&str>, value: &str) -> Result<bool> {
        self.update(|entries| {
            if entries.get(key).map(String::as_str) != expected {
                return (false, false);
            }
            entries.insert(key.to_string(), value.to_string());
            (true, true)
        })
    }

    fn upsert_object(&mut self, key: &str, partial: Map<String, Value>) -> Result<()> {
        self.update(|entries| {
            match merge_object(key, entries.get(key).map(String::as_str), partial) {
                Ok(encoded) => {
                    entries.insert(key.to_string(), encoded);
                    (true, Ok(()))
                }
                Err(e) => (false, Err(e)),
            }
        })?
    }

    fn refresh(&mut self) -> Result<()> {
        self.reload()
    }
}

fn load_entries(path: &Path) -> Result<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        DashStoreError::storage_unavailable(format!("Failed to read {}: {}", path.display(), e))
    })?;

    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    serde_json::from_str(&content).map_err(|e| {
        DashStoreError::storage_unavailable(format!(
            "{} is not a JSON object of strings: {}",
            path.display(),
            e
        ))
    })
}

fn save_entries(path: &Path, entries: &BTreeMap<String, String>) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(entries)?;

    // Write to temporary file in the same directory
    let tmp_path = temp_path(path)?;
    let mut tmp_file = File::create(&tmp_path)?;
    tmp_file.write_all(json.as_bytes())?;

    // Ensure data is written to disk
    tmp_file.sync_all()?;
    drop(tmp_file);

    // Atomic rename
    fs::rename(&tmp_path, path)?;

    Ok(())
}

fn temp_path(path: &Path) -> Result<PathBuf> {
    let file_name = path.file_name().ok_or_else(|| {
        DashStoreError::storage_unavailable(format!("{} has no file name", path.display()))
    })?;

    let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
    Ok(path.with_file_name(tmp_name))
}

/// A file lock guard that releases the lock when dropped.
struct FileLock {
    file: File,
}

impl FileLock {
    /// Acquires an exclusive lock on the sibling `.lock` file of `path`.
    fn acquire(path: &Path) -> Result<Self> {
        let lock_path = path.with_extension("lock");

        if let Some(parent) = lock_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        fs2::FileExt::lock_exclusive(&file).map_err(|e| {
            DashStoreError::storage_unavailable(format!(
                "Failed to lock {}: {}",
                lock_path.display(),
                e
            ))
        })?;

        Ok(FileLock { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_nonexistent_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(temp_dir.path().join("store.json")).unwrap();
        assert!(store.keys().is_empty());
    }

    #[test]
    fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("store.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        store.set("sendbirdToken", "tok123").unwrap();
        store.set("doomed", "x").unwrap();
        store.remove("doomed").unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("sendbirdToken").as_deref(), Some("tok123"));
        assert_eq!(reopened.keys(), vec!["sendbirdToken"]);
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        store.set("k", "v").unwrap();

        assert!(path.exists());
        assert!(!temp_dir.path().join(".store.json.tmp").exists());
    }

    #[test]
    fn test_corrupted_file_is_storage_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let err = JsonFileStore::open(&path).unwrap_err();
        assert!(err.is_storage_unavailable());
    }

    #[test]
    fn test_second_handle_writes_are_not_lost() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");

        let mut first = JsonFileStore::open(&path).unwrap();
        let mut second = JsonFileStore::open(&path).unwrap();

        first.set("a", "1").unwrap();
        second.set("b", "2").unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.keys(), vec!["a", "b"]);
        assert_eq!(second.get("a").as_deref(), Some("1"));
    }

    #[test]
    fn test_compare_and_set_sees_other_handle() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");

        let mut first = JsonFileStore::open(&path).unwrap();
        let mut second = JsonFileStore::open(&path).unwrap();

        assert!(first.compare_and_set("marker", None, "m1").unwrap());
        // second's snapshot is stale, but the check runs against the file
        assert!(!second.compare_and_set("marker", None, "m2").unwrap());
        assert_eq!(second.get("marker").as_deref(), Some("m1"));
    }

    #[test]
    fn test_upsert_from_stale_handle_keeps_other_fields() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");

        let mut first = JsonFileStore::open(&path).unwrap();
        let mut second = JsonFileStore::open(&path).unwrap();

        let mut b = Map::new();
        b.insert("appB".to_string(), Value::from("y"));
        second.upsert_object("calls/selectedCustomItemKeys", b).unwrap();

        // first never saw the field written by second
        let mut a = Map::new();
        a.insert("appA".to_string(), Value::from("x"));
        first.upsert_object("calls/selectedCustomItemKeys", a).unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get_json("calls/selectedCustomItemKeys").unwrap(),
            serde_json::json!({"appA": "x", "appB": "y"})
        );
    }

    #[test]
    fn test_refresh_picks_up_other_handle() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");

        let mut first = JsonFileStore::open(&path).unwrap();
        let mut second = JsonFileStore::open(&path).unwrap();
        second.set("sendbirdToken", "tok123").unwrap();

        assert_eq!(first.get("sendbirdToken"), None);
        first.refresh().unwrap();
        assert_eq!(first.get("sendbirdToken").as_deref(), Some("tok123"));
    }
}
