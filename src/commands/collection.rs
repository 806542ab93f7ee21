use clap::{Args, Subcommand, ValueEnum};

use crate::library::{ItemQuery, Library, SortType};
use crate::models::{NewCollection, RemoteSource};
use crate::sync::ArenaClient;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct CollectionCommand {
    #[command(subcommand)]
    pub command: CollectionSubcommand,
}

#[derive(Subcommand)]
pub enum CollectionSubcommand {
    /// Create a new collection
    Create {
        /// Collection title
        title: String,

        /// Collection description
        #[arg(long)]
        description: Option<String>,

        /// Explicit thumbnail override
        #[arg(long)]
        thumbnail: Option<String>,
    },

    /// List all collections
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a collection and its items
    Show {
        /// Collection ID
        id: i64,

        /// Page of items to show (zero-based); all items when omitted
        #[arg(long)]
        page: Option<u32>,

        /// Shuffle the items with the session's shuffle order
        #[arg(long)]
        shuffle: bool,

        /// Pick a fresh shuffle order first
        #[arg(long)]
        reshuffle: bool,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Edit a collection in place
    Edit {
        /// Collection ID
        id: i64,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New thumbnail override
        #[arg(long)]
        thumbnail: Option<String>,
    },

    /// Link a collection to an Are.na channel
    Link {
        /// Collection ID
        id: i64,

        /// Channel URL or slug
        channel: String,
    },

    /// Delete a collection; its blocks survive
    Delete {
        /// Collection ID
        id: i64,
    },
}

impl CollectionCommand {
    pub async fn run(&self, library: &Library) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            CollectionSubcommand::Create {
                title,
                description,
                thumbnail,
            } => {
                let mut collection = NewCollection::new(title);
                if let Some(description) = description {
                    collection = collection.with_description(description);
                }
                if let Some(thumbnail) = thumbnail {
                    collection = collection.with_thumbnail(thumbnail);
                }

                let id = library.create_collection(collection).await?;
                println!("Created collection {}", id);
                Ok(())
            }

            CollectionSubcommand::List { format } => {
                let collections = library.all_collections();
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&collections)?)
                    }
                    OutputFormat::Text => {
                        if collections.is_empty() {
                            println!("No collections.");
                        }
                        for collection in collections {
                            println!("{}", collection);
                        }
                        let stats = library.stats().await?;
                        println!();
                        println!(
                            "{} collection(s), {} block(s), {} connection(s)",
                            stats.collections, stats.blocks, stats.connections
                        );
                    }
                }
                Ok(())
            }

            CollectionSubcommand::Edit {
                id,
                title,
                description,
                thumbnail,
            } => {
                let mut collection = library.get_collection(*id)?;
                if let Some(title) = title {
                    collection.title = title.clone();
                }
                if let Some(description) = description {
                    collection.description = Some(description.clone());
                }
                if let Some(thumbnail) = thumbnail {
                    collection.thumbnail = Some(thumbnail.clone());
                }
                library.update_collection(&collection).await?;
                println!("Updated collection {}", id);
                Ok(())
            }

            CollectionSubcommand::Show {
                id,
                page,
                shuffle,
                reshuffle,
                format,
            } => {
                let collection = library.get_collection(*id)?;
                if *reshuffle {
                    library.reshuffle();
                }
                let query = ItemQuery {
                    page: *page,
                    sort: if *shuffle {
                        SortType::Random
                    } else {
                        SortType::Newest
                    },
                };
                let items = library.collection_items(*id, &query).await?;

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&items)?)
                    }
                    OutputFormat::Text => {
                        println!("{}", collection);
                        if let Some(thumbnail) = collection.effective_thumbnail() {
                            println!("  thumbnail: {}", thumbnail);
                        }
                        if let Some(last) = collection.last_connected_at {
                            println!("  last connected: {}", last.to_rfc3339());
                        }
                        println!();
                        for item in items {
                            println!("  {}", item);
                        }
                    }
                }
                Ok(())
            }

            CollectionSubcommand::Link { id, channel } => {
                let slug = ArenaClient::parse_channel_reference(channel);
                library
                    .link_collection_remote(*id, &RemoteSource::arena(slug.clone()))
                    .await?;
                println!("Linked collection {} to are.na/{}", id, slug);
                Ok(())
            }

            CollectionSubcommand::Delete { id } => {
                library.delete_collection(*id).await?;
                println!("Deleted collection {}", id);
                Ok(())
            }
        }
    }
}
