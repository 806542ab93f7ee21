//! Push of pending local blocks to a linked channel.
//!
//! Each block is pushed individually and reported in an explicit per-item
//! outcome list, so one failing item never blocks the rest of the batch and
//! callers can see exactly what failed. Idempotence comes from the
//! presence check: a block that already carries a remote id is not pending
//! and is never pushed again.

use crate::blob::is_blob_path;
use crate::library::Library;
use crate::models::{Block, BlockKind, RemoteSource};

use super::client::{ArenaClient, NewRemoteBlock};
use super::SyncError;

#[derive(Debug, Clone)]
pub struct PushOutcome {
    pub block_id: i64,
    /// Remote id on success, error message on failure.
    pub result: Result<i64, String>,
}

#[derive(Debug, Clone)]
pub struct PushReport {
    pub collection_id: i64,
    pub outcomes: Vec<PushOutcome>,
}

impl PushReport {
    pub fn pushed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.pushed()
    }
}

/// Builds the remote payload for a block, or None for content that cannot
/// be represented remotely (local media files are not uploaded).
pub(crate) fn remote_payload(block: &Block) -> Option<NewRemoteBlock> {
    let mut payload = NewRemoteBlock {
        title: block.title.clone(),
        description: block.description.clone(),
        ..Default::default()
    };

    match block.kind {
        BlockKind::Text => {
            payload.content = Some(block.content.clone());
        }
        BlockKind::Link => {
            payload.source = Some(block.source.clone().unwrap_or_else(|| block.content.clone()));
        }
        _ if is_blob_path(&block.content) => return None,
        // Media blocks whose content is already a URL push as a source
        _ => {
            payload.source = Some(block.content.clone());
        }
    }

    Some(payload)
}

/// Pushes the given pending blocks into a channel, stamping each success
/// with its remote identity through the data access layer.
pub(crate) async fn push_blocks(
    library: &Library,
    client: &ArenaClient,
    collection_id: i64,
    slug: &str,
    blocks: &[Block],
) -> Result<PushReport, SyncError> {
    let mut outcomes = Vec::with_capacity(blocks.len());

    for block in blocks {
        let Some(payload) = remote_payload(block) else {
            outcomes.push(PushOutcome {
                block_id: block.id,
                result: Err("local file content cannot be pushed".to_string()),
            });
            continue;
        };

        match client.create_block(slug, &payload).await {
            Ok(remote) => {
                let stamp = RemoteSource::arena(remote.id.to_string()).with_class(remote.class);
                library.mark_block_synced(block.id, &stamp).await?;
                outcomes.push(PushOutcome {
                    block_id: block.id,
                    result: Ok(remote.id),
                });
            }
            // Missing configuration fails the whole cycle, not one item
            Err(SyncError::NotConfigured) => return Err(SyncError::NotConfigured),
            Err(e) => {
                outcomes.push(PushOutcome {
                    block_id: block.id,
                    result: Err(e.to_string()),
                });
            }
        }
    }

    Ok(PushReport {
        collection_id,
        outcomes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn block(kind: BlockKind, content: &str, source: Option<&str>) -> Block {
        Block {
            id: 1,
            title: Some("t".to_string()),
            description: None,
            content: content.to_string(),
            kind,
            content_type: None,
            source: source.map(str::to_string),
            created_by: "user".to_string(),
            remote: None,
            captured_at: None,
            capture_location: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            num_connections: 0,
        }
    }

    #[test]
    fn test_text_payload_carries_content() {
        let payload = remote_payload(&block(BlockKind::Text, "hello", None)).unwrap();
        assert_eq!(payload.content.as_deref(), Some("hello"));
        assert!(payload.source.is_none());
    }

    #[test]
    fn test_link_payload_prefers_source() {
        let payload = remote_payload(&block(
            BlockKind::Link,
            "https://img.example/preview.png",
            Some("https://example.com"),
        ))
        .unwrap();
        assert_eq!(payload.source.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_remote_image_pushes_as_source() {
        let payload =
            remote_payload(&block(BlockKind::Image, "https://img.example/a.jpg", None)).unwrap();
        assert_eq!(payload.source.as_deref(), Some("https://img.example/a.jpg"));
    }

    #[test]
    fn test_local_media_is_not_pushable() {
        assert!(remote_payload(&block(BlockKind::Image, "blobs/abc.png", None)).is_none());
    }
}
