use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default endpoint of the Are.na v2 API.
pub const DEFAULT_ARENA_BASE_URL: &str = "https://api.are.na/v2";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite database
    pub database_path: PathBuf,
    /// Directory for blobs and durable app state
    pub data_dir: PathBuf,
    /// Are.na sync settings
    pub arena: ArenaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Personal access token; pushing requires one
    pub access_token: Option<String>,
    pub base_url: String,
    /// Push pending blocks after mutating commands
    pub auto_sync: bool,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            base_url: DEFAULT_ARENA_BASE_URL.to_string(),
            auto_sync: true,
        }
    }
}

impl ArenaConfig {
    pub fn is_configured(&self) -> bool {
        self.access_token.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let data_dir = PathBuf::from(&home).join(".gather");
        Self {
            database_path: data_dir.join("gather.db"),
            data_dir,
            arena: ArenaConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut config = Self::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            config = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
        }

        // Apply environment variable overrides
        if let Ok(db_path) = std::env::var("GATHER_DATABASE_PATH") {
            config.database_path = PathBuf::from(db_path);
        }
        if let Ok(data_dir) = std::env::var("GATHER_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(token) = std::env::var("GATHER_ARENA_TOKEN") {
            config.arena.access_token = Some(token);
        }

        Ok(config)
    }

    /// Default config file path: ~/.config/gather/config.yaml
    pub fn default_config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join(".config")
            .join("gather")
            .join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    e
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}
