//! Bounded error log for background failures.
//!
//! Sync errors that should not interrupt the user land here instead, capped
//! to the most recent entries. Persisted through the key-value store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kv::{KvError, KvStore};

const ERROR_LOG_KEY: &str = "error_log";
const ERROR_LOG_CAP: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub error: String,
    pub time: DateTime<Utc>,
    pub pathname: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Diagnostics {
    kv: KvStore,
}

impl Diagnostics {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    /// Appends an entry, dropping the oldest once the buffer is full. A
    /// failing diagnostic sink must never surface as an error itself.
    pub fn record(&self, error: impl Into<String>, pathname: Option<&str>) {
        let entry = ErrorEntry {
            error: error.into(),
            time: Utc::now(),
            pathname: pathname.map(str::to_string),
        };

        let result = self.entries().and_then(|mut entries| {
            entries.push(entry);
            if entries.len() > ERROR_LOG_CAP {
                let excess = entries.len() - ERROR_LOG_CAP;
                entries.drain(..excess);
            }
            self.kv.set(ERROR_LOG_KEY, &entries)
        });

        if let Err(e) = result {
            tracing::warn!("failed to record error log entry: {}", e);
        }
    }

    /// Entries in chronological order, oldest first.
    pub fn entries(&self) -> Result<Vec<ErrorEntry>, KvError> {
        Ok(self.kv.get(ERROR_LOG_KEY)?.unwrap_or_default())
    }

    pub fn clear(&self) -> Result<(), KvError> {
        self.kv.remove(ERROR_LOG_KEY)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_diagnostics() -> (Diagnostics, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let diagnostics = Diagnostics::new(KvStore::new(temp_dir.path()));
        (diagnostics, temp_dir)
    }

    #[test]
    fn test_record_and_read() {
        let (diagnostics, _temp) = test_diagnostics();
        diagnostics.record("sync failed", Some("sync/push"));

        let entries = diagnostics.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].error, "sync failed");
        assert_eq!(entries[0].pathname.as_deref(), Some("sync/push"));
    }

    #[test]
    fn test_ring_buffer_is_bounded() {
        let (diagnostics, _temp) = test_diagnostics();
        for i in 0..60 {
            diagnostics.record(format!("error {}", i), None);
        }

        let entries = diagnostics.entries().unwrap();
        assert_eq!(entries.len(), ERROR_LOG_CAP);
        // Oldest entries were dropped
        assert_eq!(entries[0].error, "error 10");
        assert_eq!(entries.last().unwrap().error, "error 59");
    }

    #[test]
    fn test_clear() {
        let (diagnostics, _temp) = test_diagnostics();
        diagnostics.record("oops", None);
        diagnostics.clear().unwrap();
        assert!(diagnostics.entries().unwrap().is_empty());
    }
}
