//! Server configuration parsing.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::explorer::{DEFAULT_LIMIT, DEFAULT_SAMPLE_SIZE, ExplorerConfig};

/// Server configuration loaded from a TOML file.
///
/// ```toml
/// [server]
/// bind = "127.0.0.1"
/// port = 8080
/// static_path = "ui/dist"
///
/// [storage]
/// path = ".idb-explorer"
///
/// [query]
/// default_limit = 50
/// sample_size = 3
/// ```
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server bind settings.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1" or "0.0.0.0").
    pub bind: String,
    pub port: u16,
    /// Directory of a static UI to serve for unmatched paths.
    #[serde(default)]
    pub static_path: Option<String>,
}

/// Where the object-store engine keeps its files.
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub path: String,
}

/// Query defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub default_limit: usize,
    pub sample_size: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

impl QueryConfig {
    pub fn explorer_config(&self) -> ExplorerConfig {
        ExplorerConfig {
            default_limit: self.default_limit.max(1),
            sample_size: self.sample_size.max(1),
        }
    }
}

/// Cross-origin settings. Disabled by default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    pub allow_credentials: bool,
    /// Preflight cache duration in seconds.
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allow_origins: Vec::new(),
            allow_methods: vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()],
            allow_headers: vec!["content-type".to_string()],
            allow_credentials: false,
            max_age: 3600,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "idb_explorer=debug,tower_http=info".
    pub level: String,
    pub format: LogFormat,
    /// "stdout", "stderr", or a file path.
    pub output: String,
    pub color: bool,
    pub target: bool,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            output: "stderr".to_string(),
            color: true,
            target: false,
            timestamps: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().display().to_string(), e))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Socket address string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}': {1}")]
    Io(String, std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
