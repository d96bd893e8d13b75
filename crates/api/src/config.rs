//! Server configuration

use std::path::PathBuf;
use std::str::FromStr;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::Level;

/// Default config file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config/diginori.toml";

const DEFAULT_ORIGINS: [&str; 5] = [
    "http://localhost",
    "http://localhost:9000",
    "https://diginori.com",
    "https://www.diginori.com",
    "https://diginori-universe.github.io",
];

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind_addr: String,
    /// SQLite file holding the `test` and `name_card` tables
    pub database_path: PathBuf,
    /// Origins allowed by CORS
    pub allowed_origins: Vec<String>,
    /// Max tracing level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            database_path: PathBuf::from("sqllite.db"),
            allowed_origins: DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect(),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load from the default file (if present) and `DIGINORI_*` variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Layer defaults, an optional file at `path`, then the environment
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Config::builder()
            .set_default("bind_addr", defaults.bind_addr)?
            .set_default(
                "database_path",
                defaults.database_path.to_string_lossy().into_owned(),
            )?
            .set_default("allowed_origins", defaults.allowed_origins)?
            .set_default("log_level", defaults.log_level)?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("DIGINORI")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("allowed_origins"),
            )
            .build()?
            .try_deserialize()
    }

    /// Parsed `log_level`
    pub fn level(&self) -> Result<Level, ConfigError> {
        Level::from_str(&self.log_level)
            .map_err(|e| ConfigError::Message(format!("log_level `{}`: {}", self.log_level, e)))
    }
}
