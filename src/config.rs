use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "GlucoseSync";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Header carrying the shared secret on every `/v1` request.
pub const API_KEY_HEADER: &str = "X-API-Key";

const ENV_BIND_ADDR: &str = "GLUCOSE_SYNC_BIND_ADDR";
const ENV_DB_PATH: &str = "GLUCOSE_SYNC_DB_PATH";
const ENV_API_KEY: &str = "GLUCOSE_SYNC_API_KEY";
const ENV_BUSY_TIMEOUT_MS: &str = "GLUCOSE_SYNC_BUSY_TIMEOUT_MS";
const ENV_CONNECT_ATTEMPTS: &str = "GLUCOSE_SYNC_CONNECT_ATTEMPTS";
const ENV_CONNECT_RETRY_MS: &str = "GLUCOSE_SYNC_CONNECT_RETRY_MS";
const ENV_LOG: &str = "GLUCOSE_SYNC_LOG";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:7081";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_CONNECT_ATTEMPTS: u32 = 10;
const DEFAULT_CONNECT_RETRY_MS: u64 = 1_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing env: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("cannot determine home directory; set {ENV_DB_PATH}")]
    NoHomeDir,
}

/// Get the application data directory (~/GlucoseSync/)
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_NAME))
}

/// Default SQLite file when `GLUCOSE_SYNC_DB_PATH` is unset
pub fn default_db_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("glucose.db"))
}

/// Log filter used when neither `RUST_LOG` nor `GLUCOSE_SYNC_LOG` is set.
pub fn default_log_filter() -> String {
    std::env::var(ENV_LOG).unwrap_or_else(|_| "info,glucose_sync=debug".to_string())
}

/// Runtime configuration for the sync service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    pub api_key: String,
    pub busy_timeout: Duration,
    pub connect_attempts: u32,
    pub connect_retry: Duration,
}

impl ServiceConfig {
    /// Load configuration from process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_raw = lookup(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|e| ConfigError::Invalid {
            name: ENV_BIND_ADDR,
            reason: format!("{e}"),
        })?;

        let db_path = match lookup(ENV_DB_PATH) {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => default_db_path().ok_or(ConfigError::NoHomeDir)?,
        };

        let api_key = lookup(ENV_API_KEY)
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::Missing(ENV_API_KEY))?;

        let busy_timeout_ms = parse_or(&lookup, ENV_BUSY_TIMEOUT_MS, DEFAULT_BUSY_TIMEOUT_MS)?;
        let connect_attempts = parse_or(&lookup, ENV_CONNECT_ATTEMPTS, DEFAULT_CONNECT_ATTEMPTS)?;
        let connect_retry_ms = parse_or(&lookup, ENV_CONNECT_RETRY_MS, DEFAULT_CONNECT_RETRY_MS)?;

        if connect_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: ENV_CONNECT_ATTEMPTS,
                reason: "must be at least 1".into(),
            });
        }

        Ok(Self {
            bind_addr,
            db_path,
            api_key,
            busy_timeout: Duration::from_millis(busy_timeout_ms),
            connect_attempts,
            connect_retry: Duration::from_millis(connect_retry_ms),
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}
