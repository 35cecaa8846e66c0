//! Connection pool construction and error sanitizing

use deadpool_redis::{Config, Pool, PoolConfig, Runtime, Timeouts};
use redis::{ErrorKind as RedisErrorKind, RedisError};

use waymark_core::{StoreError, StoreOperation};

use super::config::RedisConfig;

/// Redis connection pool utility functions
pub struct RedisPoolUtils;

impl RedisPoolUtils {
    /// Build a pool for `config`. Connections are opened lazily.
    pub fn create_pool(config: &RedisConfig) -> Result<Pool, StoreError> {
        let mut pool_config = Config::from_url(config.url.as_str());
        let mut size = PoolConfig::new(config.pool_size);
        size.timeouts = Timeouts {
            wait: Some(config.connect_timeout),
            create: Some(config.connect_timeout),
            recycle: Some(config.connect_timeout),
        };
        pool_config.pool = Some(size);

        pool_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| {
                StoreError::unavailable(
                    StoreOperation::Connect,
                    format!("Failed to create connection pool: {}", e),
                )
            })
    }

    /// Map a Redis error to a message safe to log or surface to callers.
    pub fn sanitize_error(error: &RedisError) -> String {
        match error.kind() {
            RedisErrorKind::AuthenticationFailed => "Authentication failed".to_string(),
            RedisErrorKind::TypeError => "Data type error".to_string(),
            RedisErrorKind::ExecAbortError => "Transaction aborted".to_string(),
            RedisErrorKind::BusyLoadingError => "Redis is loading data".to_string(),
            RedisErrorKind::NoScriptError => "Script not found".to_string(),
            RedisErrorKind::ReadOnly => "Redis is read-only".to_string(),
            _ if error.is_timeout() => "Operation timeout".to_string(),
            _ if error.is_io_error() || error.is_connection_dropped() => {
                "Connection error".to_string()
            }
            _ => "Redis operation failed".to_string(),
        }
    }

    /// Wrap a Redis error as [`StoreError::Unavailable`].
    pub fn store_error(operation: StoreOperation, error: &RedisError) -> StoreError {
        StoreError::unavailable(operation, Self::sanitize_error(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_hides_details() {
        let err = RedisError::from((
            RedisErrorKind::AuthenticationFailed,
            "WRONGPASS",
            "user secret-user".to_string(),
        ));
        let message = RedisPoolUtils::sanitize_error(&err);
        assert_eq!(message, "Authentication failed");
        assert!(!message.contains("secret"));
    }

    #[test]
    fn test_io_errors_become_connection_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused 10.0.0.7");
        let err = RedisError::from(io);
        assert_eq!(RedisPoolUtils::sanitize_error(&err), "Connection error");
    }

    #[tokio::test]
    async fn test_create_pool_is_lazy() {
        // Nothing listens here; pool creation must still succeed.
        let config = RedisConfig::new("redis://127.0.0.1:1").with_pool_size(2);
        let pool = RedisPoolUtils::create_pool(&config).unwrap();
        assert_eq!(pool.status().max_size, 2);
    }

    #[test]
    fn test_store_error_carries_operation() {
        let err = RedisError::from((RedisErrorKind::ReadOnly, "READONLY"));
        let store_err = RedisPoolUtils::store_error(StoreOperation::SaveMemory, &err);
        assert_eq!(store_err.operation(), Some(StoreOperation::SaveMemory));
        assert!(store_err.to_string().contains("read-only"));
    }
}
