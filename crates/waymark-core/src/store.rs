//! The memory/checkpoint/lock store contract.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::{AgentSnapshot, MemoryItem};

/// Durable storage for memory items, checkpoints and TTL locks.
///
/// Every operation may fail with [`crate::StoreError::Unavailable`]. Absence is
/// not an error: lookups return `Ok(None)` and deletes are idempotent.
///
/// The recency index and per-item storage are only eventually consistent: an
/// item's TTL does not remove its index entry, so readers of the index must
/// treat a missing item as "not found" and skip it.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use waymark_core::{InMemoryStore, MemoryStore};
///
/// # tokio_test::block_on(async {
/// let store = InMemoryStore::new();
/// let ttl = Duration::from_secs(30);
///
/// assert!(store.acquire_lock("report", ttl, "worker-a").await.unwrap());
/// assert!(!store.acquire_lock("report", ttl, "worker-b").await.unwrap());
/// assert!(!store.release_lock("report", "worker-b").await.unwrap());
/// assert!(store.release_lock("report", "worker-a").await.unwrap());
/// # });
/// ```
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Write an item and index it by `created_at`.
    ///
    /// `ttl` expires the item's own storage only, never its index entry.
    async fn save_memory(&self, item: &MemoryItem, ttl: Option<Duration>) -> StoreResult<()>;

    async fn get_memory(&self, id: &str) -> StoreResult<Option<MemoryItem>>;

    /// Remove an item and its index entry. Deleting a missing item is a no-op.
    async fn delete_memory(&self, id: &str) -> StoreResult<()>;

    /// Up to `limit` items, newest first. Index entries whose item has expired
    /// or been removed are skipped.
    async fn query_recent(&self, limit: usize) -> StoreResult<Vec<MemoryItem>>;

    /// Store a snapshot under `id`, replacing any previous one.
    async fn save_checkpoint(&self, id: &str, snapshot: &AgentSnapshot) -> StoreResult<()>;

    async fn load_checkpoint(&self, id: &str) -> StoreResult<Option<AgentSnapshot>>;

    /// Ids of all checkpoints whose id starts with `prefix`.
    async fn list_checkpoints(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Atomically create the lock if absent. Returns `true` iff this call created it.
    async fn acquire_lock(&self, lock_key: &str, ttl: Duration, owner_id: &str)
    -> StoreResult<bool>;

    /// Delete the lock only if `owner_id` currently holds it. Returns `true` iff deleted.
    async fn release_lock(&self, lock_key: &str, owner_id: &str) -> StoreResult<bool>;

    /// Round-trip to the backend.
    async fn ping(&self) -> StoreResult<()>;

    /// Release the underlying connections. Later calls fail as unavailable.
    async fn close(&self);
}
