//! Sync error types.

use crate::kv::KvError;
use crate::library::LibraryError;

/// Errors that can occur during sync operations.
#[derive(Debug)]
pub enum SyncError {
    /// No Are.na access token configured
    NotConfigured,
    /// Network-level failure reaching the remote API
    Http(String),
    /// The remote API answered with a non-success status
    Api { status: u16, body: String },
    /// Response body did not match the expected shape
    Parse(String),
    /// Local data layer failure
    Library(LibraryError),
    /// Durable state failure (watermarks, identity)
    State(KvError),
    /// A sync attempt for this collection is already running
    InFlight(i64),
    /// The collection has no remote channel linkage
    NotLinked(i64),
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::NotConfigured => {
                write!(f, "Sync not configured. Add an Are.na access token to config.")
            }
            SyncError::Http(e) => write!(f, "Network error: {}", e),
            SyncError::Api { status, body } => {
                write!(f, "Remote API returned status {}: {}", status, body)
            }
            SyncError::Parse(e) => write!(f, "Unexpected remote response: {}", e),
            SyncError::Library(e) => write!(f, "Data layer error: {}", e),
            SyncError::State(e) => write!(f, "State error: {}", e),
            SyncError::InFlight(id) => {
                write!(f, "A sync for collection {} is already in progress", id)
            }
            SyncError::NotLinked(id) => {
                write!(f, "Collection {} is not linked to a remote channel", id)
            }
        }
    }
}

impl std::error::Error for SyncError {}

impl From<LibraryError> for SyncError {
    fn from(e: LibraryError) -> Self {
        SyncError::Library(e)
    }
}

impl From<KvError> for SyncError {
    fn from(e: KvError) -> Self {
        SyncError::State(e)
    }
}
