//! Persistence substrate.
//!
//! Every component that persists state goes through a [`KeyValueStore`]
//! handed to it at construction. The concrete engine is the embedder's
//! choice: [`SqliteStore`] for the CLI, [`MemoryStore`] for tests.

mod config;
pub mod database;

pub use config::Config;
pub use database::SqliteStore;

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ConfigError, StorageError};

/// Key holding the canonical task collection.
pub const TASKS_KEY: &str = "dayplanner.tasks";
/// Key holding the skip ledger (`{ taskId: count }`).
pub const SKIP_LEDGER_KEY: &str = "dayplanner.skip-ledger";
/// Key holding learned durations per normalized task name.
pub const DURATION_LEARNING_KEY: &str = "dayplanner.duration-learning";
/// Legacy payload (`{ "tasks": [...] }`) read when no unified collection exists.
pub const LEGACY_HUB_KEY: &str = "hub-data";

/// Synchronous string key-value storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Read and decode a JSON payload, degrading to `T::default()`.
///
/// Missing keys are silent. Read failures and corrupt payloads are logged
/// at `warn` and recovered.
pub fn read_json_or_default<T>(kv: &dyn KeyValueStore, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match kv.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to read stored payload");
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "stored payload is corrupt, using defaults");
            T::default()
        }
    }
}

/// Encode `value` as JSON and write it under `key`.
pub fn write_json<T: Serialize + ?Sized>(
    kv: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let encoded = serde_json::to_string(value).map_err(|e| StorageError::EncodeFailed {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    kv.set(key, &encoded)
}

/// Returns the data directory.
///
/// `DAYPLANNER_HOME` wins when set. Otherwise `~/.config/dayplanner`, or
/// `~/.config/dayplanner-dev` when `DAYPLANNER_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("DAYPLANNER_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("DAYPLANNER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("dayplanner-dev")
            } else {
                base_dir.join("dayplanner")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn memory_store_roundtrip() {
        let kv = MemoryStore::new();
        assert!(kv.get("a").unwrap().is_none());
        kv.set("a", "1").unwrap();
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("1"));
        kv.remove("a").unwrap();
        assert!(kv.get("a").unwrap().is_none());
    }

    #[test]
    fn corrupt_payload_reads_as_default() {
        let kv = MemoryStore::new();
        kv.set("ledger", "{not json").unwrap();
        let ledger: BTreeMap<String, u32> = read_json_or_default(&kv, "ledger");
        assert!(ledger.is_empty());
    }

    #[test]
    fn write_then_read_json() {
        let kv = MemoryStore::new();
        let mut ledger = BTreeMap::new();
        ledger.insert("task-1".to_string(), 3u32);
        write_json(&kv, "ledger", &ledger).unwrap();
        let back: BTreeMap<String, u32> = read_json_or_default(&kv, "ledger");
        assert_eq!(back.get("task-1"), Some(&3));
    }
}
