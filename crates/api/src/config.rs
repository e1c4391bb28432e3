use std::str::FromStr;

use sitevault_core::engine::{EngineConfig, DEFAULT_MAX_ALLOCATION_ATTEMPTS};

use crate::auth::jwt::JwtConfig;

/// Errors raised while loading [`ServerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Which snapshot store backs the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// PostgreSQL at `database_url`.
    Postgres { database_url: String },
    /// Process-local in-memory store. Contents are lost on restart.
    Memory,
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long background tasks get to drain after the server stops
    /// accepting connections (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// JWT token configuration.
    pub jwt: JwtConfig,
    /// Snapshot engine tuning.
    pub engine: EngineConfig,
    /// Snapshot store selection.
    pub store: StoreBackend,
    /// Emit logs as JSON lines instead of the human-readable format.
    pub log_json: bool,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&|name: &str| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, with defaults.
    ///
    /// | Env Var                            | Default                 |
    /// |------------------------------------|-------------------------|
    /// | `HOST`                             | `0.0.0.0`               |
    /// | `PORT`                             | `3000`                  |
    /// | `CORS_ORIGINS`                     | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`             | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`            | `30`                    |
    /// | `SNAPSHOT_MAX_ALLOCATION_ATTEMPTS` | `16`                    |
    /// | `SNAPSHOT_STORE`                   | `postgres`              |
    /// | `DATABASE_URL`                     | required for postgres   |
    /// | `LOG_FORMAT`                       | `text`                  |
    pub fn from_vars<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_var(lookup, "PORT", 3000)?;

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = parse_var(lookup, "REQUEST_TIMEOUT_SECS", 30)?;
        let shutdown_timeout_secs: u64 = parse_var(lookup, "SHUTDOWN_TIMEOUT_SECS", 30)?;

        let max_allocation_attempts: u32 = parse_var(
            lookup,
            "SNAPSHOT_MAX_ALLOCATION_ATTEMPTS",
            DEFAULT_MAX_ALLOCATION_ATTEMPTS,
        )?;
        if max_allocation_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "SNAPSHOT_MAX_ALLOCATION_ATTEMPTS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        let store = match lookup("SNAPSHOT_STORE").as_deref() {
            Some("memory") => StoreBackend::Memory,
            None | Some("postgres") => StoreBackend::Postgres {
                database_url: lookup("DATABASE_URL")
                    .filter(|s| !s.is_empty())
                    .ok_or(ConfigError::Missing("DATABASE_URL"))?,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "SNAPSHOT_STORE",
                    value: other.to_string(),
                    reason: "expected 'postgres' or 'memory'".into(),
                })
            }
        };

        let log_json = lookup("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json"));

        let jwt = JwtConfig::from_vars(lookup)?;

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt,
            engine: EngineConfig {
                max_allocation_attempts,
            },
            store,
            log_json,
        })
    }
}

/// Read `name` through `lookup` and parse it, falling back to `default` when
/// unset.
pub(crate) fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
