use clap::Args;

use crate::library::Library;

/// Connect a block to one or more collections
#[derive(Args)]
pub struct ConnectCommand {
    /// Block ID
    pub block_id: i64,

    /// Collection IDs
    #[arg(required = true)]
    pub collection_ids: Vec<i64>,

    /// Replace the block's connection set with exactly these collections
    #[arg(long)]
    pub replace: bool,
}

impl ConnectCommand {
    pub async fn run(&self, library: &Library) -> Result<(), Box<dyn std::error::Error>> {
        if self.replace {
            library
                .replace_connections(self.block_id, &self.collection_ids)
                .await?;
            println!(
                "Block {} is now connected to exactly {} collection(s)",
                self.block_id,
                self.collection_ids.len()
            );
        } else {
            let inserted = library
                .add_connections(self.block_id, &self.collection_ids)
                .await?;
            println!("Added {} connection(s)", inserted);
        }
        Ok(())
    }
}

/// Disconnect a block from a collection
#[derive(Args)]
pub struct DisconnectCommand {
    /// Block ID
    pub block_id: i64,

    /// Collection ID
    pub collection_id: i64,
}

impl DisconnectCommand {
    pub async fn run(&self, library: &Library) -> Result<(), Box<dyn std::error::Error>> {
        if library
            .disconnect(self.block_id, self.collection_id)
            .await?
        {
            println!(
                "Disconnected block {} from collection {}",
                self.block_id, self.collection_id
            );
        } else {
            println!("No such connection.");
        }
        Ok(())
    }
}
