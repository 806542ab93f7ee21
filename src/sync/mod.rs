//! Remote synchronization with Are.na.
//!
//! Collections can be linked to Are.na channels. The engine pulls channel
//! contents into local blocks (import) and pushes locally created blocks in
//! linked collections back to the channel. Deletions are never mirrored in
//! either direction.
//!
//! ## Protocol
//!
//! 1. Pull pages through `GET /channels/<slug>` until `page * per >= length`
//! 2. Items with `base_class` "Block" map onto local blocks by class
//!    (Image/Text/Link); already-imported items are matched by remote id
//! 3. Push creates remote blocks via `POST /channels/<slug>/blocks` and
//!    stamps the local block with the returned id, making later pushes
//!    skip it

mod client;
mod error;
mod import;
mod orchestrator;
mod push;
mod watermark;

pub use client::{ArenaClient, ChannelPage, NewRemoteBlock, RemoteItem};
pub use error::SyncError;
pub use import::{import_channel, ImportSummary};
pub use orchestrator::Syncer;
pub use push::{PushOutcome, PushReport};
pub use watermark::{Watermark, WatermarkStore};
