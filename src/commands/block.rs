use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::library::Library;
use crate::models::{BlockKind, GeoPoint, NewBlock};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Text,
    Image,
    Video,
    Audio,
    Document,
    Link,
}

impl From<KindArg> for BlockKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Text => BlockKind::Text,
            KindArg::Image => BlockKind::Image,
            KindArg::Video => BlockKind::Video,
            KindArg::Audio => BlockKind::Audio,
            KindArg::Document => BlockKind::Document,
            KindArg::Link => BlockKind::Link,
        }
    }
}

#[derive(Args)]
pub struct BlockCommand {
    #[command(subcommand)]
    pub command: BlockSubcommand,
}

#[derive(Subcommand)]
pub enum BlockSubcommand {
    /// Archive a new block
    Add {
        /// Inline content (text, or a URL for links)
        content: Option<String>,

        /// Archive a local media file instead of inline content
        #[arg(long)]
        file: Option<PathBuf>,

        /// Stable asset identifier for the stored file; a random name is
        /// used when omitted
        #[arg(long, requires = "file")]
        asset_id: Option<String>,

        /// Capture latitude
        #[arg(long, requires = "longitude")]
        latitude: Option<f64>,

        /// Capture longitude
        #[arg(long, requires = "latitude")]
        longitude: Option<f64>,

        /// Block title
        #[arg(long)]
        title: Option<String>,

        /// Block description
        #[arg(long)]
        description: Option<String>,

        /// Block kind; inferred when omitted
        #[arg(long, value_enum)]
        kind: Option<KindArg>,

        /// Source URL the content came from
        #[arg(long)]
        source: Option<String>,

        /// Collections to connect the block to (can be repeated)
        #[arg(long = "collect", value_name = "COLLECTION_ID")]
        collections: Vec<i64>,
    },

    /// List all blocks
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Filter by a search term over title, description and content
        #[arg(long)]
        search: Option<String>,
    },

    /// Show a block's details
    Show {
        /// Block ID
        id: i64,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Edit a block in place
    Edit {
        /// Block ID
        id: i64,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New content
        #[arg(long)]
        content: Option<String>,
    },

    /// Delete a block, its connections, and any media file it owns
    Delete {
        /// Block ID
        id: i64,
    },
}

impl BlockCommand {
    pub async fn run(&self, library: &Library) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            BlockSubcommand::Add {
                content,
                file,
                asset_id,
                latitude,
                longitude,
                title,
                description,
                kind,
                source,
                collections,
            } => {
                let mut block = match (file, content) {
                    (Some(path), _) => build_file_block(library, path, asset_id.as_deref())?,
                    (None, Some(content)) => match source {
                        Some(url) => NewBlock::link(url.clone(), content.clone()),
                        None => NewBlock::text(content.clone()),
                    },
                    (None, None) => {
                        return Err("provide inline content or --file".into());
                    }
                };

                if let Some(kind) = kind {
                    block.kind = (*kind).into();
                }
                block.title = title.clone().or(block.title);
                block.description = description.clone().or(block.description);
                if let Some(source) = source {
                    block.source = Some(source.clone());
                }
                if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
                    let at = block.captured_at.unwrap_or_else(chrono::Utc::now);
                    block = block.with_capture(
                        at,
                        Some(GeoPoint {
                            latitude: *latitude,
                            longitude: *longitude,
                        }),
                    );
                }
                block = block.connect_to(collections.clone());

                let id = library.create_block(block).await?;
                println!("Created block {}", id);
                Ok(())
            }

            BlockSubcommand::List { format, search } => {
                let blocks = match search {
                    Some(term) => library.search_blocks(term).await?,
                    None => library.all_blocks(),
                };
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&blocks)?),
                    OutputFormat::Text => {
                        if blocks.is_empty() {
                            println!("No blocks.");
                        }
                        for block in blocks {
                            println!("{}", block);
                        }
                    }
                }
                Ok(())
            }

            BlockSubcommand::Show { id, format } => {
                let block = library.get_block(*id)?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&block)?),
                    OutputFormat::Text => {
                        println!("{}", block);
                        if let Some(description) = &block.description {
                            println!("  {}", description);
                        }
                        println!("  content: {}", block.content);
                        if let Some(source) = &block.source {
                            println!("  source: {}", source);
                        }
                        println!("  connections: {}", block.num_connections);
                        println!("  synced: {}", if block.is_synced() { "yes" } else { "no" });
                        println!("  created: {}", block.created_at.to_rfc3339());
                    }
                }
                Ok(())
            }

            BlockSubcommand::Edit {
                id,
                title,
                description,
                content,
            } => {
                let mut block = library.get_block(*id)?;
                if let Some(title) = title {
                    block.title = Some(title.clone());
                }
                if let Some(description) = description {
                    block.description = Some(description.clone());
                }
                if let Some(content) = content {
                    block.content = content.clone();
                }
                library.update_block(&block).await?;
                println!("Updated block {}", id);
                Ok(())
            }

            BlockSubcommand::Delete { id } => {
                library.delete_block(*id).await?;
                println!("Deleted block {}", id);
                Ok(())
            }
        }
    }
}

/// Copies a local file into the blob store and derives the block kind from
/// its media type. The file's modification time becomes the capture time.
fn build_file_block(
    library: &Library,
    path: &PathBuf,
    asset_id: Option<&str>,
) -> Result<NewBlock, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)?;
    let content_type = mime_guess::from_path(path)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let kind = match content_type.split('/').next() {
        Some("image") => BlockKind::Image,
        Some("video") => BlockKind::Video,
        Some("audio") => BlockKind::Audio,
        _ => BlockKind::Document,
    };

    let blob_path = match asset_id {
        Some(asset_id) => library.store_blob_as(asset_id, &bytes, &content_type)?,
        None => library.store_blob(&bytes, &content_type)?,
    };

    let mut block = NewBlock::new(kind, blob_path).with_content_type(content_type);
    block.title = path.file_stem().map(|s| s.to_string_lossy().to_string());
    if let Ok(modified) = std::fs::metadata(path).and_then(|m| m.modified()) {
        block = block.with_capture(modified.into(), None);
    }
    Ok(block)
}
