use clap::{Args, Subcommand, ValueEnum};

use crate::config::Config;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        println!("config file: {}", Config::default_config_path().display());
                        println!("database_path: {}", config.database_path.display());
                        println!("data_dir: {}", config.data_dir.display());
                        println!();

                        println!("arena.base_url: {}", config.arena.base_url);
                        println!(
                            "arena.access_token: {}",
                            if config.arena.is_configured() {
                                "(set)"
                            } else {
                                "(not set)"
                            }
                        );
                        println!("arena.auto_sync: {}", config.arena.auto_sync);
                    }
                }
                Ok(())
            }
        }
    }
}
