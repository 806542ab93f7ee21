use clap::Args;

use crate::sync::Syncer;

/// Import an Are.na channel into a local collection
#[derive(Args)]
pub struct ImportCommand {
    /// Channel URL or slug
    pub channel: String,
}

impl ImportCommand {
    pub async fn run(&self, syncer: &Syncer) -> Result<(), Box<dyn std::error::Error>> {
        println!("Importing {}...", self.channel);

        let summary = syncer.import_channel(&self.channel).await?;

        println!();
        println!(
            "Collection {}: {} new block(s) across {} page(s)",
            summary.collection_id, summary.created, summary.pages
        );
        if summary.skipped_existing > 0 {
            println!("  {} already present", summary.skipped_existing);
        }
        if summary.skipped_channels > 0 {
            println!(
                "  {} nested channel(s) skipped (not imported)",
                summary.skipped_channels
            );
        }
        if summary.skipped_unsupported > 0 {
            println!("  {} unsupported item(s) skipped", summary.skipped_unsupported);
        }

        Ok(())
    }
}
