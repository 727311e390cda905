//! # Server Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SHOPLIST_PORT=9000                                                 │
//! │     SHOPLIST_STORAGE_BACKEND=json                                      │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $SHOPLIST_CONFIG, or                                               │
//! │     ~/.config/shoplist-manager/config.toml (Linux)                     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     127.0.0.1:8766, sqlite in the platform data dir                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [server]
//! bind_addr = "127.0.0.1"
//! port = 8766
//!
//! [storage]
//! backend = "sqlite"   # sqlite | json | memory
//! path = "/var/lib/shoplist"
//!
//! [logging]
//! filter = "info"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ServerError, ServerResult};

/// Default WebSocket port.
pub const DEFAULT_PORT: u16 = 8766;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "SHOPLIST_CONFIG";

// =============================================================================
// Storage Backend Selection
// =============================================================================

/// Where the two documents are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// `shoplist.db` in the storage directory.
    #[default]
    Sqlite,

    /// One JSON file per document in the storage directory.
    Json,

    /// Nothing survives a restart.
    Memory,
}

impl StorageBackend {
    /// Returns true if this backend writes to disk.
    pub fn is_persistent(&self) -> bool {
        !matches!(self, StorageBackend::Memory)
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Sqlite => write!(f, "sqlite"),
            StorageBackend::Json => write!(f, "json"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" | "db" => Ok(StorageBackend::Sqlite),
            "json" | "file" => Ok(StorageBackend::Json),
            "memory" | "none" => Ok(StorageBackend::Memory),
            other => Err(ServerError::InvalidConfig(format!(
                "Unknown storage backend: '{}'. Valid options: sqlite, json, memory",
                other
            ))),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Bind address (default: 127.0.0.1).
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Port for the WebSocket server.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Data directory. Falls back to the platform data dir when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_filter(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl ServerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, else `$SHOPLIST_CONFIG`, else the platform path)
    /// 3. Environment variables
    ///
    /// A missing file is not an error; an unreadable or invalid one is.
    pub fn load(config_path: Option<PathBuf>) -> ServerResult<Self> {
        let path = config_path
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
            .or_else(Self::default_config_path);

        let mut config = match path {
            Some(path) if path.exists() => {
                info!(?path, "Loading config from file");
                Self::from_file(&path)?
            }
            Some(path) => {
                debug!(?path, "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(|name| std::env::var(name).ok());

        if config.storage.path.is_none() && config.storage.backend.is_persistent() {
            config.storage.path = Self::default_data_dir();
        }

        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML file.
    pub fn from_file(path: &Path) -> ServerResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ServerResult<()> {
        if self.server.port == 0 {
            return Err(ServerError::InvalidConfig(
                "server.port must be greater than 0".into(),
            ));
        }

        if self.server.bind_addr.trim().is_empty() {
            return Err(ServerError::InvalidConfig(
                "server.bind_addr must not be empty".into(),
            ));
        }

        if self.storage.backend.is_persistent() && self.storage.path.is_none() {
            return Err(ServerError::InvalidConfig(format!(
                "storage.path is required for the {} backend",
                self.storage.backend
            )));
        }

        Ok(())
    }

    /// Applies overrides from a variable lookup (the process environment in
    /// [`load`](Self::load)).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("SHOPLIST_BIND_ADDR") {
            debug!(bind_addr = %addr, "Overriding bind address from environment");
            self.server.bind_addr = addr;
        }

        if let Some(port) = lookup("SHOPLIST_PORT") {
            match port.parse::<u16>() {
                Ok(p) => {
                    debug!(port = p, "Overriding port from environment");
                    self.server.port = p;
                }
                Err(_) => warn!(port = %port, "Ignoring invalid SHOPLIST_PORT"),
            }
        }

        if let Some(backend) = lookup("SHOPLIST_STORAGE_BACKEND") {
            match backend.parse() {
                Ok(parsed) => {
                    debug!(backend = %backend, "Overriding storage backend from environment");
                    self.storage.backend = parsed;
                }
                Err(_) => warn!(backend = %backend, "Ignoring unknown SHOPLIST_STORAGE_BACKEND"),
            }
        }

        if let Some(path) = lookup("SHOPLIST_STORAGE_PATH") {
            self.storage.path = Some(PathBuf::from(path));
        }

        if let Some(filter) = lookup("SHOPLIST_LOG") {
            self.logging.filter = filter;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "shoplist", "shoplist-manager")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Returns the default data directory.
    pub fn default_data_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "shoplist", "shoplist-manager")
            .map(|dirs| dirs.data_dir().to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_storage_backend_parsing() {
        assert_eq!("sqlite".parse::<StorageBackend>().unwrap(), StorageBackend::Sqlite);
        assert_eq!("JSON".parse::<StorageBackend>().unwrap(), StorageBackend::Json);
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert!("postgres".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.server.bind_address(), "127.0.0.1:8766");
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [storage]
            backend = "json"
            path = "/tmp/shoplist"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_addr, "127.0.0.1");
        assert_eq!(config.storage.backend, StorageBackend::Json);
        assert_eq!(config.storage.path, Some(PathBuf::from("/tmp/shoplist")));
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SHOPLIST_BIND_ADDR", "0.0.0.0"),
            ("SHOPLIST_PORT", "9100"),
            ("SHOPLIST_STORAGE_BACKEND", "memory"),
            ("SHOPLIST_LOG", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = ServerConfig::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.server.bind_address(), "0.0.0.0:9100");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let mut config = ServerConfig::default();
        config.apply_overrides(|name| match name {
            "SHOPLIST_PORT" => Some("not-a-port".into()),
            "SHOPLIST_STORAGE_BACKEND" => Some("postgres".into()),
            _ => None,
        });

        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ServerConfig::default();
        config.storage.path = Some(PathBuf::from("/tmp/shoplist"));
        assert!(config.validate().is_ok());

        config.server.port = 0;
        assert!(config.validate().is_err());

        config.server.port = DEFAULT_PORT;
        config.storage.path = None;
        assert!(config.validate().is_err());

        config.storage.backend = StorageBackend::Memory;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            format!(
                "[storage]\nbackend = \"json\"\npath = {:?}\n",
                dir.path().join("data")
            ),
        )
        .unwrap();

        let config = ServerConfig::from_file(&path).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Json);
        assert_eq!(config.storage.path, Some(dir.path().join("data")));
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = \"high\"\n").unwrap();

        assert!(matches!(
            ServerConfig::from_file(&path),
            Err(ServerError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_toml_serialization() {
        let config = ServerConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[logging]"));
    }
}
