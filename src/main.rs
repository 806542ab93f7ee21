use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

mod blob;
mod commands;
mod config;
mod db;
mod diagnostics;
mod kv;
mod library;
mod models;
mod session;
mod sync;

use blob::BlobStore;
use commands::{
    BlockCommand, CollectionCommand, ConfigCommand, ConnectCommand, DisconnectCommand,
    ImportCommand, LogCommand, SyncCommand,
};
use config::Config;
use diagnostics::Diagnostics;
use kv::KvStore;
use library::Library;
use session::Session;
use sync::{ArenaClient, Syncer, WatermarkStore};

#[derive(Parser)]
#[command(name = "gather")]
#[command(version)]
#[command(about = "Archive blocks into collections, with Are.na sync", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage blocks (archived content)
    Block(BlockCommand),

    /// Manage collections
    Collection(CollectionCommand),

    /// Connect a block to collections
    Connect(ConnectCommand),

    /// Disconnect a block from a collection
    Disconnect(DisconnectCommand),

    /// Import an Are.na channel
    Import(ImportCommand),

    /// Push pending blocks to linked channels
    Sync(SyncCommand),

    /// Manage configuration
    Config(ConfigCommand),

    /// Show the background error log
    Log(LogCommand),
}

/// Everything a command needs, built once per invocation.
struct App {
    library: Arc<Library>,
    syncer: Syncer,
    auto_sync: bool,
}

impl App {
    async fn build(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let pool = db::init_db(&config.database_path).await?;
        let kv = KvStore::new(&config.data_dir);
        let session = Session::load_or_create(&kv)?;
        let blobs = BlobStore::new(&config.data_dir);
        let diagnostics = Diagnostics::new(kv.clone());

        let (notifier, requests) = library::sync_channel();
        let library = Arc::new(
            Library::open(pool, blobs, session)
                .await?
                .with_notifier(notifier),
        );

        let client = ArenaClient::from_config(&config.arena)?;
        let syncer = Syncer::new(
            Arc::clone(&library),
            client,
            WatermarkStore::new(kv),
            diagnostics.clone(),
            requests,
        );

        Ok(Self {
            library,
            syncer,
            auto_sync: config.arena.auto_sync && config.arena.is_configured(),
        })
    }

    /// Best-effort push of whatever the command's mutations queued.
    /// Failures land in the error log; the CLI keeps working offline.
    async fn try_auto_sync(&self) {
        if self.auto_sync {
            self.syncer.run_pending().await;
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Block(cmd)) => {
            let app = App::build(&config).await?;
            cmd.run(&app.library).await?;
            app.try_auto_sync().await;
        }
        Some(Commands::Collection(cmd)) => {
            let app = App::build(&config).await?;
            cmd.run(&app.library).await?;
            app.try_auto_sync().await;
        }
        Some(Commands::Connect(cmd)) => {
            let app = App::build(&config).await?;
            cmd.run(&app.library).await?;
            app.try_auto_sync().await;
        }
        Some(Commands::Disconnect(cmd)) => {
            let app = App::build(&config).await?;
            cmd.run(&app.library).await?;
            app.try_auto_sync().await;
        }
        Some(Commands::Import(cmd)) => {
            let app = App::build(&config).await?;
            cmd.run(&app.syncer).await?;
            app.try_auto_sync().await;
        }
        Some(Commands::Sync(cmd)) => {
            let app = App::build(&config).await?;
            cmd.run(&app.library, &app.syncer, &config).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        Some(Commands::Log(cmd)) => {
            let diagnostics = Diagnostics::new(KvStore::new(&config.data_dir));
            cmd.run(&diagnostics)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
