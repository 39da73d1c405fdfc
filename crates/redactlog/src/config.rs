//! Configuration loaded from the environment.
//!
//! Variables are read with the `REDACTLOG_` prefix after an optional `.env`
//! file has been loaded.
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `REDACTLOG_SENSITIVE_FIELDS` | comma-separated field names | none |
//! | `REDACTLOG_POOL_MAX_BUFFERS` | idle buffers kept for reuse | 64 |
//! | `REDACTLOG_POOL_MAX_CAPACITY` | largest buffer kept, in bytes | 65536 |
//! | `REDACTLOG_BODY_LIMIT` | largest request body read, in bytes | 1048576 |
//! | `REDACTLOG_TRUST_FORWARDED_FOR` | take `client_ip` from proxy headers | false |
//! | `REDACTLOG_LOG_FILTER` | `tracing` filter directive | `RUST_LOG`, then `info,redactlog=debug` |
//!
//! # Example
//!
//! ```ignore
//! use redactlog::config::{init_tracing, LoggerConfig};
//! use redactlog::{LoggerMiddleware, TracingSink};
//!
//! let config = LoggerConfig::from_env()?;
//! init_tracing(config.log_filter.as_deref());
//! let logger = LoggerMiddleware::from_config(&config, TracingSink::new());
//! ```

use crate::pool::{DEFAULT_MAX_BUFFERS, DEFAULT_MAX_CAPACITY};
use redactlog_core::DEFAULT_BODY_LIMIT;
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Prefix for every configuration variable.
pub const ENV_PREFIX: &str = "REDACTLOG_";

const DEFAULT_FILTER: &str = "info,redactlog=debug";

/// Error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable deserialization failed.
    #[error("configuration error: {0}")]
    Env(#[from] envy::Error),
}

/// Logger settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggerConfig {
    /// Fields masked in request and response bodies
    #[serde(default)]
    pub sensitive_fields: Vec<String>,

    /// Idle buffers kept for reuse
    #[serde(default = "default_pool_max_buffers")]
    pub pool_max_buffers: usize,

    /// Buffers grown beyond this many bytes are not reused
    #[serde(default = "default_pool_max_capacity")]
    pub pool_max_capacity: usize,

    /// Request bodies larger than this are not buffered
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,

    /// Resolve `client_ip` from `X-Forwarded-For` / `X-Real-IP`
    #[serde(default)]
    pub trust_forwarded_for: bool,

    /// Filter directive for [`init_tracing`]
    #[serde(default)]
    pub log_filter: Option<String>,
}

fn default_pool_max_buffers() -> usize {
    DEFAULT_MAX_BUFFERS
}

fn default_pool_max_capacity() -> usize {
    DEFAULT_MAX_CAPACITY
}

fn default_body_limit() -> usize {
    DEFAULT_BODY_LIMIT
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            sensitive_fields: Vec::new(),
            pool_max_buffers: DEFAULT_MAX_BUFFERS,
            pool_max_capacity: DEFAULT_MAX_CAPACITY,
            body_limit: DEFAULT_BODY_LIMIT,
            trust_forwarded_for: false,
            log_filter: None,
        }
    }
}

impl LoggerConfig {
    /// Load `.env` if present, then read `REDACTLOG_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        let config: Self = envy::prefixed(ENV_PREFIX).from_env()?;
        Ok(config.normalized())
    }

    /// Read settings from explicit `(name, value)` pairs.
    ///
    /// Names carry the `REDACTLOG_` prefix, as in the environment.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Self = envy::prefixed(ENV_PREFIX).from_iter(vars)?;
        Ok(config.normalized())
    }

    fn normalized(mut self) -> Self {
        self.sensitive_fields = self
            .sensitive_fields
            .into_iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        self
    }
}

/// Load environment variables from a `.env` file.
///
/// Silently ignores a missing file.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Install a global `tracing` subscriber.
///
/// The filter is taken from `filter`, then `RUST_LOG`, then
/// `info,redactlog=debug`. Does nothing if a subscriber is already set.
pub fn init_tracing(filter: Option<&str>) {
    let (env_filter, rejected) = match filter.map(|d| (d, EnvFilter::try_new(d))) {
        Some((_, Ok(env_filter))) => (env_filter, None),
        Some((directive, Err(err))) => (EnvFilter::new(DEFAULT_FILTER), Some((directive, err))),
        None => (
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
            None,
        ),
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if let Some((directive, err)) = rejected {
        tracing::warn!(%directive, error = %err, "invalid log filter, using default");
    }
}
