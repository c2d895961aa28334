//! Configuration loading and resolution
//!
//! Each setting is resolved in priority order:
//! 1. Command-line argument or environment variable (highest priority)
//! 2. TOML config file
//! 3. Compiled default (fallback)
//!
//! The database URL and the token secret have no compiled default; startup
//! fails when neither source provides them.

use crate::time::millis_to_duration;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8080;
/// Default bind host
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default deadline for a single write or read against the store
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
/// Default bound for the readiness ping
pub const DEFAULT_READINESS_TIMEOUT_MS: u64 = 2_000;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging section of the TOML file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when RUST_LOG is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Database section of the TOML file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite busy timeout; writers for the same database queue this long
    pub busy_timeout_ms: u64,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            max_connections: 10,
        }
    }
}

/// On-disk TOML configuration; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub database_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub request_timeout_ms: Option<u64>,
    pub readiness_timeout_ms: Option<u64>,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Load a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    Ok(toml::from_str(&content)?)
}

/// Values taken from the command line or the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved service configuration
#[derive(Clone)]
pub struct ServiceConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
    pub readiness_timeout: Duration,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

// Keeps the secret out of logs
impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("database_url", &self.database_url)
            .field("jwt_secret", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("request_timeout", &self.request_timeout)
            .field("readiness_timeout", &self.readiness_timeout)
            .field("database", &self.database)
            .field("logging", &self.logging)
            .finish()
    }
}

impl ServiceConfig {
    /// Merge overrides on top of the file configuration
    pub fn resolve(overrides: ConfigOverrides, file: TomlConfig) -> Result<Self> {
        let database_url = required("DATABASE_URL", overrides.database_url, file.database_url)?;
        let jwt_secret = required("JWT_SECRET", overrides.jwt_secret, file.jwt_secret)?;

        let host = non_empty(overrides.host)
            .or_else(|| non_empty(file.host))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = overrides.port.or(file.port).unwrap_or(DEFAULT_PORT);

        let request_timeout_ms = file.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
        let readiness_timeout_ms = file
            .readiness_timeout_ms
            .unwrap_or(DEFAULT_READINESS_TIMEOUT_MS);
        if request_timeout_ms == 0 || readiness_timeout_ms == 0 {
            return Err(Error::Config("timeouts must be greater than zero".to_string()));
        }
        if file.database.max_connections == 0 {
            return Err(Error::Config(
                "database.max_connections must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            jwt_secret,
            host,
            port,
            request_timeout: millis_to_duration(request_timeout_ms),
            readiness_timeout: millis_to_duration(readiness_timeout_ms),
            database: file.database,
            logging: file.logging,
        })
    }

    /// Socket address string for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required(key: &str, primary: Option<String>, fallback: Option<String>) -> Result<String> {
    non_empty(primary)
        .or_else(|| non_empty(fallback))
        .ok_or_else(|| Error::Config(format!("missing required configuration: {}", key)))
}
