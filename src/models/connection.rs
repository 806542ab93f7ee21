use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Join record linking one block to one collection.
///
/// At most one connection exists per (block, collection) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub block_id: i64,
    pub collection_id: i64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    /// Set when the link itself originated remotely.
    pub remote_created_at: Option<DateTime<Utc>>,
}
