//! Redis connection configuration, pooling, health and server-side scripts.

pub mod config;
pub mod health;
pub mod pool;
pub mod scripts;

pub use config::{ConfigError, RedisConfig};
pub use health::RedisHealth;
pub use pool::RedisPoolUtils;
