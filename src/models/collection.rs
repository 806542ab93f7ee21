use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::RemoteSource;

/// A named grouping of blocks.
///
/// `num_blocks`, `last_connected_at` and the effective `thumbnail` are
/// derived from connections at query time, never stored authoritatively
/// (an explicit thumbnail override is the one exception).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Explicit thumbnail override, when one was set.
    pub thumbnail: Option<String>,
    /// Content of the most recently connected block, the thumbnail
    /// fallback.
    pub latest_content: Option<String>,
    pub created_by: String,
    pub remote: Option<RemoteSource>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub num_blocks: i64,
    pub last_connected_at: Option<DateTime<Utc>>,
}

impl Collection {
    /// Effective thumbnail: the override when set, otherwise the most
    /// recently connected block's content.
    pub fn effective_thumbnail(&self) -> Option<&str> {
        self.thumbnail.as_deref().or(self.latest_content.as_deref())
    }

    /// True when this collection mirrors a remote channel.
    pub fn is_remote_linked(&self) -> bool {
        self.remote.is_some()
    }

    /// The remote channel slug, when linked.
    pub fn channel_slug(&self) -> Option<&str> {
        self.remote.as_ref().map(|r| r.id.as_str())
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({} blocks)", self.id, self.title, self.num_blocks)?;
        if let Some(slug) = self.channel_slug() {
            write!(f, " ↔ are.na/{}", slug)?;
        }
        Ok(())
    }
}

/// Insert request for a new collection.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCollection {
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub remote: Option<RemoteSource>,
}

impl NewCollection {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            thumbnail: None,
            remote: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    pub fn with_remote(mut self, remote: RemoteSource) -> Self {
        self.remote = Some(remote);
        self
    }
}
