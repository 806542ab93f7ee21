use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Remote provider name for Are.na-mirrored entities.
pub const REMOTE_PROVIDER_ARENA: &str = "arena";

/// What a block's `content` field means.
///
/// Text holds the content inline. Image, Video, Audio and Document hold a
/// reference (a relative path into the blob store for local captures, or a
/// remote URL for imported items). Link holds a representative image
/// reference, with the actual link in `source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Text,
    Image,
    Video,
    Audio,
    Document,
    Link,
}

impl BlockKind {
    /// Kinds whose content may reference a file in the blob store.
    pub fn is_media(self) -> bool {
        matches!(
            self,
            BlockKind::Image | BlockKind::Video | BlockKind::Audio | BlockKind::Document
        )
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BlockKind::Text => "Text",
            BlockKind::Image => "Image",
            BlockKind::Video => "Video",
            BlockKind::Audio => "Audio",
            BlockKind::Document => "Document",
            BlockKind::Link => "Link",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for BlockKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Text" => Ok(BlockKind::Text),
            "Image" => Ok(BlockKind::Image),
            "Video" => Ok(BlockKind::Video),
            "Audio" => Ok(BlockKind::Audio),
            "Document" => Ok(BlockKind::Document),
            "Link" => Ok(BlockKind::Link),
            other => Err(format!("unknown block kind: {}", other)),
        }
    }
}

/// Which external system an entity is mirrored to/from, and that system's
/// native identifier for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSource {
    pub provider: String,
    pub id: String,
    /// The remote service's own class for the item, recorded on push/pull.
    pub class: Option<String>,
}

impl RemoteSource {
    pub fn arena(id: impl Into<String>) -> Self {
        Self {
            provider: REMOTE_PROVIDER_ARENA.to_string(),
            id: id.into(),
            class: None,
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }
}

/// Capture location metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A single archived content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: String,
    pub kind: BlockKind,
    pub content_type: Option<String>,
    pub source: Option<String>,
    pub created_by: String,
    pub remote: Option<RemoteSource>,
    pub captured_at: Option<DateTime<Utc>>,
    pub capture_location: Option<GeoPoint>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Number of collections this block is connected to.
    pub num_connections: i64,
}

impl Block {
    /// True when this block has been mirrored to a remote service.
    pub fn is_synced(&self) -> bool {
        self.remote.is_some()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = self.title.as_deref().unwrap_or("(untitled)");
        write!(f, "[{}] {} ({})", self.id, title, self.kind)?;
        if let Some(remote) = &self.remote {
            write!(f, " · {}:{}", remote.provider, remote.id)?;
        }
        Ok(())
    }
}

/// Insert request for a new block.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBlock {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: String,
    pub kind: BlockKind,
    pub content_type: Option<String>,
    pub source: Option<String>,
    pub remote: Option<RemoteSource>,
    pub captured_at: Option<DateTime<Utc>>,
    pub capture_location: Option<GeoPoint>,
    /// Collections to connect the block to in the same logical operation.
    pub collections_to_connect: Vec<i64>,
    /// When the initial connections originated remotely (channel import).
    pub remote_connected_at: Option<DateTime<Utc>>,
}

impl NewBlock {
    pub fn new(kind: BlockKind, content: impl Into<String>) -> Self {
        Self {
            title: None,
            description: None,
            content: content.into(),
            kind,
            content_type: None,
            source: None,
            remote: None,
            captured_at: None,
            capture_location: None,
            collections_to_connect: Vec::new(),
            remote_connected_at: None,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(BlockKind::Text, content).with_content_type("text/plain")
    }

    pub fn link(url: impl Into<String>, image: impl Into<String>) -> Self {
        let mut block = Self::new(BlockKind::Link, image);
        block.source = Some(url.into());
        block
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_remote(mut self, remote: RemoteSource) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_capture(mut self, at: DateTime<Utc>, location: Option<GeoPoint>) -> Self {
        self.captured_at = Some(at);
        self.capture_location = location;
        self
    }

    pub fn connect_to(mut self, collection_ids: Vec<i64>) -> Self {
        self.collections_to_connect = collection_ids;
        self
    }

    pub fn connected_remotely_at(mut self, at: DateTime<Utc>) -> Self {
        self.remote_connected_at = Some(at);
        self
    }
}
