//! Configuration management for the removal desk server.
//!
//! Loads configuration from environment variables with sensible defaults.
//! A `.env` file is read first when present (see `main`).

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "removal_desk=info,tower_http=info";

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `STORAGE_BACKEND` names no known backend.
    #[error("Unknown storage backend '{0}' (expected 'memory' or 'postgres')")]
    UnknownBackend(String),

    /// The Postgres backend was selected without a database URL.
    #[error("DATABASE_URL is required when STORAGE_BACKEND=postgres")]
    MissingDatabaseUrl,

    /// A pool needs at least one connection.
    #[error("DATABASE_MAX_CONNECTIONS must be at least 1")]
    ZeroConnections,

    /// Nothing would be allowed to call the API from a browser.
    #[error("Invalid CORS origin '{0}'")]
    InvalidCorsOrigin(String),
}

/// Where requests and audit entries live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process tables, lost on restart
    Memory,
    /// `PostgreSQL`
    Postgres,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::Postgres => "postgres",
        })
    }
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "postgres" | "postgresql" | "db" => Ok(Self::Postgres),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Storage configuration
    pub storage: StorageConfig,
    /// HTTP server configuration
    pub server: ServerConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Selected backend
    pub backend: StorageBackend,
    /// `PostgreSQL` connection URL
    pub database_url: Option<String>,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
    /// Create missing tables at startup
    pub init_schema: bool,
}

impl StorageConfig {
    /// Connection timeout as a [`Duration`].
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// `tracing` filter directives
    pub log_level: String,
    /// Origins allowed to call the API from a browser
    pub cors_allowed_origins: Vec<String>,
}

impl ServerConfig {
    /// `host:port` to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `STORAGE_BACKEND` is not recognized.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup` (environment-free for tests).
    ///
    /// Without an explicit `STORAGE_BACKEND`, a non-empty `DATABASE_URL`
    /// selects Postgres and its absence selects memory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `STORAGE_BACKEND` is not recognized.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed_with<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
        ) -> Option<T> {
            lookup(key).and_then(|s| s.trim().parse().ok())
        }

        let database_url = lookup("DATABASE_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let backend = match lookup("STORAGE_BACKEND").filter(|s| !s.trim().is_empty()) {
            Some(name) => name.parse()?,
            None if database_url.is_some() => StorageBackend::Postgres,
            None => StorageBackend::Memory,
        };

        Ok(Self {
            storage: StorageConfig {
                backend,
                database_url,
                max_connections: parsed_with(&lookup, "DATABASE_MAX_CONNECTIONS").unwrap_or(10),
                connect_timeout: parsed_with(&lookup, "DATABASE_CONNECT_TIMEOUT").unwrap_or(30),
                init_schema: parsed_with(&lookup, "DATABASE_INIT_SCHEMA").unwrap_or(true),
            },
            server: ServerConfig {
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parsed_with(&lookup, "PORT").unwrap_or(1337),
                log_level: lookup("RUST_LOG")
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
                cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|| "http://localhost:5173,http://localhost:5174".to_string())
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToString::to_string)
                    .collect(),
            },
        })
    }

    /// Check settings that are individually valid but inconsistent together.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.backend == StorageBackend::Postgres {
            if self.storage.database_url.is_none() {
                return Err(ConfigError::MissingDatabaseUrl);
            }
            if self.storage.max_connections == 0 {
                return Err(ConfigError::ZeroConnections);
            }
        }
        if let Some(bad) = self
            .server
            .cors_allowed_origins
            .iter()
            .find(|o| !(o.starts_with("http://") || o.starts_with("https://")))
        {
            return Err(ConfigError::InvalidCorsOrigin(bad.clone()));
        }
        Ok(())
    }
}
