//! Durable key-value storage for state that lives outside the relational
//! store: sync watermarks, the user identity record and the error log.
//!
//! Backed by a single JSON object file in the data directory.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use thiserror::Error;

const STATE_FILE: &str = "state.json";

#[derive(Debug, Error)]
pub enum KvError {
    #[error("failed to access state file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode/decode state: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct KvStore {
    path: PathBuf,
}

impl KvStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: data_dir.into().join(STATE_FILE),
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, KvError> {
        let map = self.read_map()?;
        match map.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), KvError> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), serde_json::to_value(value)?);
        self.write_map(&map)
    }

    /// Removes a key. Returns false when it was not present.
    pub fn remove(&self, key: &str) -> Result<bool, KvError> {
        let mut map = self.read_map()?;
        let existed = map.remove(key).is_some();
        if existed {
            self.write_map(&map)?;
        }
        Ok(existed)
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, KvError> {
        let map = self.read_map()?;
        Ok(map
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn read_map(&self) -> Result<Map<String, Value>, KvError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<(), KvError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (KvStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = KvStore::new(temp_dir.path());
        (store, temp_dir)
    }

    #[test]
    fn test_get_missing_returns_none() {
        let (store, _temp) = test_store();
        let value: Option<String> = store.get("missing").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_set_and_get() {
        let (store, _temp) = test_store();
        store.set("greeting", &"hello".to_string()).unwrap();

        let value: Option<String> = store.get("greeting").unwrap();
        assert_eq!(value.as_deref(), Some("hello"));
    }

    #[test]
    fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = KvStore::new(temp_dir.path());
            store.set("count", &42i64).unwrap();
        }
        let store = KvStore::new(temp_dir.path());
        let value: Option<i64> = store.get("count").unwrap();
        assert_eq!(value, Some(42));
    }

    #[test]
    fn test_remove() {
        let (store, _temp) = test_store();
        store.set("key", &1i64).unwrap();

        assert!(store.remove("key").unwrap());
        assert!(!store.remove("key").unwrap());
    }

    #[test]
    fn test_keys_with_prefix() {
        let (store, _temp) = test_store();
        store.set("watermark:alpha", &1i64).unwrap();
        store.set("watermark:beta", &2i64).unwrap();
        store.set("user", &3i64).unwrap();

        let mut keys = store.keys_with_prefix("watermark:").unwrap();
        keys.sort();
        assert_eq!(keys, vec!["watermark:alpha", "watermark:beta"]);
    }
}
