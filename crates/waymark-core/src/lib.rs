//! # Waymark Core
//!
//! Core types and traits shared by the waymark crates.
//!
//! - **[MemoryItem]**, **[AgentSnapshot]**, **[PipelineResult]**: the data model
//! - **[MemoryStore]**: async contract of the durable memory/checkpoint/lock store
//! - **[InMemoryStore]**: process-local backend with the same semantics as the Redis one
//! - **[StoreKeys]**: key layout shared by every backend
//! - **[Registry]**: name-to-handler lookup table
//!
//! ## Example
//!
//! ```rust
//! use waymark_core::{InMemoryStore, MemoryItem, MemoryStore};
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryStore::new();
//! let item = MemoryItem::new("note", "remember the milk");
//! store.save_memory(&item, None).await.unwrap();
//!
//! let recent = store.query_recent(10).await.unwrap();
//! assert_eq!(recent[0].id(), item.id());
//! # });
//! ```

pub mod error;
pub mod in_memory;
pub mod keys;
pub mod registry;
pub mod store;
pub mod types;

pub use error::{StoreError, StoreOperation, StoreResult};
pub use in_memory::InMemoryStore;
pub use keys::StoreKeys;
pub use registry::Registry;
pub use store::MemoryStore;
pub use types::{AgentSnapshot, MemoryItem, PipelineResult, now_millis};
