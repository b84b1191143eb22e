//! Flat key-value persistence primitives.
//!
//! `LocalStore` is the single storage seam the rest of the workspace depends
//! on: a flat string-to-string store with whole-value reads and writes. The
//! file-backed implementation keeps one JSON file per key; the in-memory one
//! backs tests and the transfer round-trip.

pub mod cache;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

pub use cache::KeyedCache;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Serialize and write, swallowing failures with a logged warning. Persistence
/// is an optimization here, never a correctness dependency; a quota or io
/// failure must not block the user action that triggered it.
pub fn try_persist<T: Serialize>(store: &dyn LocalStore, key: &str, value: &T) {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(error) => {
            warn!(key, %error, "failed to serialize value for persistence");
            return;
        }
    };
    if let Err(error) = store.set(key, &json) {
        warn!(key, %error, "failed to persist value, continuing without");
    }
}

/// Read and parse a persisted value, treating a missing key or an unparsable
/// payload as absent.
pub fn load_json<T: DeserializeOwned>(store: &dyn LocalStore, key: &str) -> Option<T> {
    let raw = store.get(key).ok().flatten()?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(key, %error, "discarding unparsable persisted value");
            None
        }
    }
}

/// One file per key under a data directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl LocalStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.key_path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.key_path(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock_values(&self.values).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        lock_values(&self.values).insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        lock_values(&self.values).remove(key);
        Ok(())
    }
}

// A poisoned lock still holds the last fully written map.
fn lock_values(values: &Mutex<HashMap<String, String>>) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
    values.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_store_roundtrip() {
        let tmp = TempDir::new().expect("tempdir");
        let store = JsonFileStore::new(tmp.path());

        assert!(store.get("team").expect("get").is_none());
        store.set("team", "[1,2]").expect("set");
        assert_eq!(store.get("team").expect("get").as_deref(), Some("[1,2]"));

        store.remove("team").expect("remove");
        assert!(store.get("team").expect("get").is_none());
        // Removing a missing key is not an error.
        store.remove("team").expect("remove twice");
    }

    #[test]
    fn load_json_ignores_garbage() {
        let store = MemoryStore::new();
        store.set("team", "not json at all").expect("set");
        let loaded: Option<Vec<u32>> = load_json(&store, "team");
        assert!(loaded.is_none());
    }

    #[test]
    fn try_persist_then_load_roundtrips() {
        let store = MemoryStore::new();
        try_persist(&store, "team", &vec![1u32, 2, 3]);
        let loaded: Option<Vec<u32>> = load_json(&store, "team");
        assert_eq!(loaded, Some(vec![1, 2, 3]));
    }
}
