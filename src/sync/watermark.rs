//! Per-channel sync watermarks.
//!
//! A watermark marks the last successfully completed pull for a channel. It
//! is advanced only after a full page sequence succeeds; an interrupted pull
//! leaves it untouched so the next attempt re-pulls from the prior point
//! (at-least-once, deduplicated by remote id on insert).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kv::{KvError, KvStore};

const KEY_PREFIX: &str = "watermark:";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watermark {
    pub last_synced_at: DateTime<Utc>,
    pub last_synced_block_id: Option<i64>,
    pub last_synced_block_created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct WatermarkStore {
    kv: KvStore,
}

impl WatermarkStore {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    pub fn get(&self, slug: &str) -> Result<Option<Watermark>, KvError> {
        self.kv.get(&format!("{}{}", KEY_PREFIX, slug))
    }

    pub fn record(&self, slug: &str, watermark: &Watermark) -> Result<(), KvError> {
        self.kv.set(&format!("{}{}", KEY_PREFIX, slug), watermark)
    }

    /// Explicit user-triggered reset; the only way a watermark goes away.
    pub fn reset(&self, slug: &str) -> Result<bool, KvError> {
        self.kv.remove(&format!("{}{}", KEY_PREFIX, slug))
    }

    pub fn channels(&self) -> Result<Vec<String>, KvError> {
        Ok(self
            .kv
            .keys_with_prefix(KEY_PREFIX)?
            .into_iter()
            .map(|k| k[KEY_PREFIX.len()..].to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (WatermarkStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = WatermarkStore::new(KvStore::new(temp_dir.path()));
        (store, temp_dir)
    }

    #[test]
    fn test_record_and_get() {
        let (store, _temp) = test_store();
        let watermark = Watermark {
            last_synced_at: Utc::now(),
            last_synced_block_id: Some(42),
            last_synced_block_created_at: None,
        };

        store.record("my-channel", &watermark).unwrap();

        let loaded = store.get("my-channel").unwrap().unwrap();
        assert_eq!(loaded.last_synced_block_id, Some(42));
        assert!(store.get("other-channel").unwrap().is_none());
    }

    #[test]
    fn test_reset() {
        let (store, _temp) = test_store();
        let watermark = Watermark {
            last_synced_at: Utc::now(),
            last_synced_block_id: None,
            last_synced_block_created_at: None,
        };
        store.record("chan", &watermark).unwrap();

        assert!(store.reset("chan").unwrap());
        assert!(store.get("chan").unwrap().is_none());
        assert!(!store.reset("chan").unwrap());
    }

    #[test]
    fn test_channels_listing() {
        let (store, _temp) = test_store();
        let watermark = Watermark {
            last_synced_at: Utc::now(),
            last_synced_block_id: None,
            last_synced_block_created_at: None,
        };
        store.record("alpha", &watermark).unwrap();
        store.record("beta", &watermark).unwrap();

        let mut channels = store.channels().unwrap();
        channels.sort();
        assert_eq!(channels, vec!["alpha", "beta"]);
    }
}
