//! Sync CLI commands for pushing pending blocks to linked channels.

use clap::{Args, Subcommand};

use crate::config::Config;
use crate::library::Library;
use crate::sync::Syncer;

/// Sync with Are.na
#[derive(Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Subcommand)]
enum SyncSubcommand {
    /// Show sync configuration, linked collections and watermarks
    Status,

    /// Forget pull watermarks so the next import re-pulls from scratch
    Reset {
        /// Channel slug; all channels when omitted
        channel: Option<String>,
    },
}

impl SyncCommand {
    pub async fn run(
        &self,
        library: &Library,
        syncer: &Syncer,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            None => self.sync(syncer).await,
            Some(SyncSubcommand::Status) => self.status(library, syncer, config).await,
            Some(SyncSubcommand::Reset { channel }) => self.reset(syncer, channel.as_deref()),
        }
    }

    fn reset(
        &self,
        syncer: &Syncer,
        channel: Option<&str>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        syncer.reset_backoff();
        match channel {
            Some(slug) => {
                if syncer.watermarks().reset(slug)? {
                    println!("Forgot watermark for {}", slug);
                } else {
                    println!("No watermark for {}", slug);
                }
            }
            None => {
                for slug in syncer.watermarks().channels()? {
                    syncer.watermarks().reset(&slug)?;
                    println!("Forgot watermark for {}", slug);
                }
            }
        }
        Ok(())
    }

    async fn sync(&self, syncer: &Syncer) -> Result<(), Box<dyn std::error::Error>> {
        println!("Pushing pending blocks...");
        println!();

        // An explicit sync retries even backed-off blocks
        syncer.reset_backoff();

        let results = syncer.sync_all().await;
        if results.is_empty() {
            println!("No remote-linked collections.");
            return Ok(());
        }

        for (collection_id, result) in results {
            match result {
                Ok(report) if report.outcomes.is_empty() => {
                    println!("  ✓ collection {} - up to date", report.collection_id);
                }
                Ok(report) => {
                    println!(
                        "  ✓ collection {} - {} pushed, {} failed",
                        report.collection_id,
                        report.pushed(),
                        report.failed()
                    );
                    for outcome in report.outcomes.iter().filter(|o| o.result.is_err()) {
                        if let Err(error) = &outcome.result {
                            println!("      block {}: {}", outcome.block_id, error);
                        }
                    }
                }
                Err(e) => {
                    println!("  ✗ collection {} - {}", collection_id, e);
                }
            }
        }

        Ok(())
    }

    async fn status(
        &self,
        library: &Library,
        syncer: &Syncer,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        println!("Sync Status");
        println!("===========");
        println!();

        if config.arena.is_configured() {
            println!("Access token: configured");
        } else {
            println!("Access token: not configured (pushes disabled)");
        }
        println!("API endpoint: {}", config.arena.base_url);
        println!("Auto-sync: {}", if config.arena.auto_sync { "on" } else { "off" });
        println!();

        let linked = library.remote_linked_collections();
        if linked.is_empty() {
            println!("No remote-linked collections.");
            return Ok(());
        }

        for collection in linked {
            let pending = library.pending_blocks(collection.id).await?;
            println!("{}", collection);
            println!("  pending blocks: {}", pending.len());
            if let Some(slug) = collection.channel_slug() {
                match syncer.watermarks().get(slug)? {
                    Some(watermark) => {
                        println!("  last pulled: {}", watermark.last_synced_at.to_rfc3339())
                    }
                    None => println!("  last pulled: never"),
                }
            }
        }

        Ok(())
    }
}
