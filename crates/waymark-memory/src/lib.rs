//! # Waymark Memory
//!
//! Redis backend for the waymark [`MemoryStore`] contract.
//!
//! - Memory items live in per-item hashes, indexed by a `createdAt`-scored sorted set
//! - Checkpoints are hashes holding the serialized snapshot
//! - Locks are `SET NX PX` keys released through an owner-checking Lua script
//! - Connections come from a deadpool-redis pool; every command carries a timeout
//!
//! ## Example
//!
//! ```rust,no_run
//! use waymark_memory::{RedisConfig, RedisMemoryStore};
//! use waymark_core::{MemoryItem, MemoryStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RedisConfig::from_env()?;
//! let store = RedisMemoryStore::connect(config).await?;
//!
//! store.save_memory(&MemoryItem::new("note", "hello"), None).await?;
//! let recent = store.query_recent(20).await?;
//! # Ok(())
//! # }
//! ```

pub mod redis;
mod redis_store;

pub use self::redis::{ConfigError, RedisConfig, RedisHealth};
pub use redis_store::RedisMemoryStore;
pub use waymark_core::{MemoryStore, StoreError, StoreResult};
