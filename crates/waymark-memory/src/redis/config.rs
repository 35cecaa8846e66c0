//! Redis connection configuration
//!
//! Configuration can be built in code or loaded from the environment:
//!
//! - `WAYMARK_REDIS_URL` - Connection URL (default: `redis://localhost:6379`)
//! - `WAYMARK_REDIS_POOL_SIZE` - Pool size, 1 to 100 (default: 10)
//! - `WAYMARK_REDIS_CONNECT_TIMEOUT_SECS` - Connection timeout in seconds (default: 5)
//! - `WAYMARK_REDIS_COMMAND_TIMEOUT_SECS` - Per-command timeout in seconds (default: 30)
//! - `WAYMARK_REDIS_KEY_PREFIX` - Namespace prepended to every key (default: none)

use std::env;
use std::time::Duration;

use waymark_core::{StoreError, StoreKeys};

/// Maximum number of pooled connections.
const MAX_POOL_SIZE: usize = 100;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for StoreError {
    fn from(err: ConfigError) -> Self {
        StoreError::InvalidConfig(err.to_string())
    }
}

/// Redis backend configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379/0")
    pub url: String,
    /// Maximum number of connections in the pool
    pub pool_size: usize,
    /// Timeout for establishing a connection or waiting for a pooled one
    pub connect_timeout: Duration,
    /// Timeout applied to every individual command round-trip
    pub command_timeout: Duration,
    /// Key prefix for namespace isolation
    pub key_prefix: Option<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(30),
            key_prefix: None,
        }
    }
}

impl RedisConfig {
    /// Create config for a standalone Redis server
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Load configuration from `WAYMARK_REDIS_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any variable has an invalid value or the
    /// resulting configuration fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = get_env_string("WAYMARK_REDIS_URL") {
            config.url = url;
        }
        if let Some(size) = get_env_usize("WAYMARK_REDIS_POOL_SIZE")? {
            config.pool_size = size;
        }
        if let Some(secs) = get_env_u64("WAYMARK_REDIS_CONNECT_TIMEOUT_SECS")? {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = get_env_u64("WAYMARK_REDIS_COMMAND_TIMEOUT_SECS")? {
            config.command_timeout = Duration::from_secs(secs);
        }
        if let Some(prefix) = get_env_string("WAYMARK_REDIS_KEY_PREFIX") {
            config.key_prefix = Some(prefix);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set connection pool size
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set per-command timeout
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set key prefix for namespace isolation
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Key layout for this configuration
    pub fn keys(&self) -> StoreKeys {
        match &self.key_prefix {
            Some(prefix) => StoreKeys::with_prefix(prefix.clone()),
            None => StoreKeys::new(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Redis URL cannot be empty".to_string(),
            ));
        }
        if !(self.url.starts_with("redis://")
            || self.url.starts_with("rediss://")
            || self.url.starts_with("redis+unix://")
            || self.url.starts_with("unix://"))
        {
            return Err(ConfigError::ValidationError(format!(
                "Unsupported Redis URL scheme in '{}'",
                self.url
            )));
        }
        if self.pool_size == 0 {
            return Err(ConfigError::ValidationError(
                "Pool size cannot be zero".to_string(),
            ));
        }
        if self.pool_size > MAX_POOL_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "Pool size too large (max {})",
                MAX_POOL_SIZE
            )));
        }
        if self.connect_timeout.is_zero() || self.command_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "Timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn get_env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn get_env_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    match env::var(key) {
        Ok(val) => val
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid u64 value '{val}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}

fn get_env_usize(key: &str) -> Result<Option<usize>, ConfigError> {
    match env::var(key) {
        Ok(val) => val
            .parse::<usize>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid usize value '{val}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}
