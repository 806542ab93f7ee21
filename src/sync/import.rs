//! Channel import: pull a remote channel's contents into a local
//! collection.
//!
//! Pages are processed as they arrive, each page's inserts in their own
//! transaction, so an interrupted pull keeps the pages that finished. The
//! watermark is recorded only after the final page; a retry re-pulls from
//! the prior point and deduplicates by remote id.
//!
//! Nested channels (`base_class` "Channel") are not recursed into; they are
//! counted and skipped.

use chrono::{DateTime, Utc};

use crate::library::Library;
use crate::models::{NewBlock, NewCollection, RemoteSource, REMOTE_PROVIDER_ARENA};

use super::client::{ArenaClient, RemoteItem};
use super::watermark::{Watermark, WatermarkStore};
use super::SyncError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub collection_id: i64,
    /// New local blocks created from remote items.
    pub created: usize,
    /// Items whose remote id already existed locally.
    pub skipped_existing: usize,
    /// Nested channels, not recursed into.
    pub skipped_channels: usize,
    /// Item classes with no local mapping.
    pub skipped_unsupported: usize,
    pub pages: i64,
}

/// Imports a channel given a pasted URL or bare slug. Creates the mirror
/// collection on first import; later runs reuse it and only add what is
/// missing.
pub async fn import_channel(
    library: &Library,
    client: &ArenaClient,
    watermarks: &WatermarkStore,
    reference: &str,
) -> Result<ImportSummary, SyncError> {
    let slug = ArenaClient::parse_channel_reference(reference);

    let mut page = client.channel_page(&slug, 1).await?;

    let collection_id = match library
        .find_collection_by_remote_id(REMOTE_PROVIDER_ARENA, &slug)
        .await?
    {
        Some(collection) => collection.id,
        None => {
            let title = page.title.clone().unwrap_or_else(|| slug.clone());
            library
                .create_collection(
                    NewCollection::new(title).with_remote(RemoteSource::arena(slug.clone())),
                )
                .await?
        }
    };

    let mut summary = ImportSummary {
        collection_id,
        ..Default::default()
    };
    let mut last_block_id: Option<i64> = None;
    let mut last_connected: Option<DateTime<Utc>> = None;

    loop {
        summary.pages += 1;

        let mut new_blocks: Vec<NewBlock> = Vec::new();
        for item in &page.contents {
            if !item.is_block() {
                summary.skipped_channels += 1;
                continue;
            }

            last_block_id = last_block_id.max(Some(item.id));
            if let Some(connected) = parse_remote_time(item.connected_at.as_deref()) {
                last_connected = last_connected.max(Some(connected));
            }

            let already_present = library
                .find_block_by_remote_id(REMOTE_PROVIDER_ARENA, &item.id.to_string())
                .await?
                .is_some();
            if already_present {
                summary.skipped_existing += 1;
                continue;
            }

            match map_remote_item(item) {
                Some(block) => {
                    new_blocks.push(block.connect_to(vec![collection_id]));
                    summary.created += 1;
                }
                None => summary.skipped_unsupported += 1,
            }
        }

        // One transaction per page
        library.create_blocks(new_blocks, None).await?;

        if !page.has_more() {
            break;
        }
        page = client.channel_page(&slug, page.page + 1).await?;
    }

    watermarks.record(
        &slug,
        &Watermark {
            last_synced_at: Utc::now(),
            last_synced_block_id: last_block_id,
            last_synced_block_created_at: last_connected,
        },
    )?;

    Ok(summary)
}

/// Maps a remote item onto a local block, or None for classes with no local
/// representation.
pub(crate) fn map_remote_item(item: &RemoteItem) -> Option<NewBlock> {
    let mut block = match item.class.as_str() {
        "Text" => NewBlock::text(item.content.clone().unwrap_or_default()),
        "Image" => {
            let url = item.image_url()?.to_string();
            let mut image = NewBlock::new(crate::models::BlockKind::Image, url.clone());
            image.content_type = guess_media_type(&url);
            if let Some(source) = item.source_url() {
                image = image.with_source(source);
            }
            image
        }
        "Link" => {
            let source = item.source_url()?.to_string();
            let image = item.image_url().unwrap_or(source.as_str()).to_string();
            NewBlock::link(source, image)
        }
        _ => return None,
    };

    if let Some(title) = &item.title {
        block = block.with_title(title);
    }
    if let Some(description) = &item.description {
        block = block.with_description(description);
    }
    if let Some(connected) = parse_remote_time(item.connected_at.as_deref()) {
        block = block.connected_remotely_at(connected);
    }

    Some(
        block.with_remote(RemoteSource::arena(item.id.to_string()).with_class(item.class.clone())),
    )
}

fn parse_remote_time(s: Option<&str>) -> Option<DateTime<Utc>> {
    s.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn guess_media_type(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    mime_guess::from_path(path).first().map(|m| m.to_string())
}
