use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{StoreError, StoreOperation, StoreResult};
use crate::store::MemoryStore;
use crate::types::{AgentSnapshot, MemoryItem};

/// Process-local [`MemoryStore`] with the same observable semantics as the
/// Redis backend: per-item TTL that leaves the recency index untouched,
/// overwrite-only checkpoints, and owner-checked locks that expire on their own.
///
/// Suitable for tests, development, and single-process deployments. All data
/// is lost when the process exits. Clones share the same storage.
///
/// # Example
///
/// ```rust
/// use waymark_core::{AgentSnapshot, InMemoryStore, MemoryStore};
///
/// # tokio_test::block_on(async {
/// let store = InMemoryStore::new();
/// let snapshot = AgentSnapshot::new("planner-1", "0.3.0").with_pending_task("t-1");
/// store.save_checkpoint("planner-1", &snapshot).await.unwrap();
///
/// let loaded = store.load_checkpoint("planner-1").await.unwrap();
/// assert_eq!(loaded, Some(snapshot));
/// # });
/// ```
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    closed: Arc<AtomicBool>,
}

#[derive(Default)]
struct State {
    items: HashMap<String, Expiring<MemoryItem>>,
    /// (createdAt, id), mirroring a sorted set ordered by score then member.
    timeline: BTreeSet<(i64, String)>,
    timeline_scores: HashMap<String, i64>,
    /// Serialized snapshots, so loads go through the same encoding as Redis.
    checkpoints: HashMap<String, String>,
    locks: HashMap<String, Expiring<String>>,
}

struct Expiring<T> {
    value: T,
    expires_at: Option<Instant>,
}

impl<T> Expiring<T> {
    /// A TTL too large to represent as an instant never expires.
    fn new(value: T, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
        }
    }

    fn live(&self, now: Instant) -> Option<&T> {
        match self.expires_at {
            Some(deadline) if deadline <= now => None,
            _ => Some(&self.value),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in the recency index, including stale ones.
    pub fn timeline_len(&self) -> usize {
        self.state
            .read()
            .map(|state| state.timeline.len())
            .unwrap_or_default()
    }

    fn ensure_open(&self, operation: StoreOperation) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::unavailable(operation, "store is closed"));
        }
        Ok(())
    }

    fn read(&self, operation: StoreOperation) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.ensure_open(operation)?;
        self.state
            .read()
            .map_err(|e| StoreError::unavailable(operation, format!("lock poisoned: {}", e)))
    }

    fn write(&self, operation: StoreOperation) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.ensure_open(operation)?;
        self.state
            .write()
            .map_err(|e| StoreError::unavailable(operation, format!("lock poisoned: {}", e)))
    }
}

impl State {
    fn index(&mut self, id: &str, score: i64) {
        if let Some(previous) = self.timeline_scores.insert(id.to_string(), score) {
            self.timeline.remove(&(previous, id.to_string()));
        }
        self.timeline.insert((score, id.to_string()));
    }

    fn unindex(&mut self, id: &str) {
        if let Some(score) = self.timeline_scores.remove(id) {
            self.timeline.remove(&(score, id.to_string()));
        }
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn save_memory(&self, item: &MemoryItem, ttl: Option<Duration>) -> StoreResult<()> {
        let mut state = self.write(StoreOperation::SaveMemory)?;
        state
            .items
            .insert(item.id().to_string(), Expiring::new(item.clone(), ttl));
        state.index(item.id(), item.created_at());
        debug!(id = %item.id(), kind = %item.kind(), "Saved memory item");
        Ok(())
    }

    async fn get_memory(&self, id: &str) -> StoreResult<Option<MemoryItem>> {
        let state = self.read(StoreOperation::GetMemory)?;
        let now = Instant::now();
        Ok(state
            .items
            .get(id)
            .and_then(|entry| entry.live(now))
            .cloned())
    }

    async fn delete_memory(&self, id: &str) -> StoreResult<()> {
        let mut state = self.write(StoreOperation::DeleteMemory)?;
        state.items.remove(id);
        state.unindex(id);
        Ok(())
    }

    async fn query_recent(&self, limit: usize) -> StoreResult<Vec<MemoryItem>> {
        let state = self.read(StoreOperation::QueryRecent)?;
        let now = Instant::now();
        // Resolve the newest `limit` index entries, then drop the stale ones.
        let items = state
            .timeline
            .iter()
            .rev()
            .take(limit)
            .filter_map(|(_, id)| state.items.get(id).and_then(|entry| entry.live(now)))
            .cloned()
            .collect();
        Ok(items)
    }

    async fn save_checkpoint(&self, id: &str, snapshot: &AgentSnapshot) -> StoreResult<()> {
        let encoded = serde_json::to_string(snapshot)
            .map_err(|e| StoreError::serialization(StoreOperation::SaveCheckpoint, e.to_string()))?;
        let mut state = self.write(StoreOperation::SaveCheckpoint)?;
        state.checkpoints.insert(id.to_string(), encoded);
        Ok(())
    }

    async fn load_checkpoint(&self, id: &str) -> StoreResult<Option<AgentSnapshot>> {
        let state = self.read(StoreOperation::LoadCheckpoint)?;
        state
            .checkpoints
            .get(id)
            .map(|encoded| {
                serde_json::from_str(encoded).map_err(|e| {
                    StoreError::serialization(StoreOperation::LoadCheckpoint, e.to_string())
                })
            })
            .transpose()
    }

    async fn list_checkpoints(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let state = self.read(StoreOperation::ListCheckpoints)?;
        let mut ids: Vec<String> = state
            .checkpoints
            .keys()
            .filter(|id| id.starts_with(prefix))
            .cloned()
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn acquire_lock(
        &self,
        lock_key: &str,
        ttl: Duration,
        owner_id: &str,
    ) -> StoreResult<bool> {
        let mut state = self.write(StoreOperation::AcquireLock)?;
        let now = Instant::now();
        if state
            .locks
            .get(lock_key)
            .is_some_and(|lock| lock.live(now).is_some())
        {
            return Ok(false);
        }
        state.locks.insert(
            lock_key.to_string(),
            Expiring::new(owner_id.to_string(), Some(ttl)),
        );
        Ok(true)
    }

    async fn release_lock(&self, lock_key: &str, owner_id: &str) -> StoreResult<bool> {
        let mut state = self.write(StoreOperation::ReleaseLock)?;
        let now = Instant::now();
        let held_by_owner = state
            .locks
            .get(lock_key)
            .and_then(|lock| lock.live(now))
            .is_some_and(|holder| holder == owner_id);
        if held_by_owner {
            state.locks.remove(lock_key);
        }
        Ok(held_by_owner)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.ensure_open(StoreOperation::Ping)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_at(id: &str, created_at: i64) -> MemoryItem {
        MemoryItem::new("note", format!("content-{}", id))
            .with_id(id)
            .with_created_at(created_at)
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = InMemoryStore::new();
        assert_eq!(store.get_memory("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_query_recent_newest_first_and_limited() {
        let store = InMemoryStore::new();
        for (id, ts) in [("a", 10), ("b", 30), ("c", 20)] {
            store.save_memory(&item_at(id, ts), None).await.unwrap();
        }

        let recent = store.query_recent(2).await.unwrap();
        let ids: Vec<_> = recent.iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec!["b", "c"]);

        assert!(store.query_recent(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ttl_expires_item_but_not_index() {
        let store = InMemoryStore::new();
        store
            .save_memory(&item_at("short", 5), Some(Duration::from_millis(20)))
            .await
            .unwrap();
        store.save_memory(&item_at("long", 1), None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(store.get_memory("short").await.unwrap(), None);
        assert_eq!(store.timeline_len(), 2);
        let recent = store.query_recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id(), "long");
    }

    #[tokio::test]
    async fn test_same_millisecond_items_newest_first() {
        let store = InMemoryStore::new();
        let older = MemoryItem::new("note", "older").with_created_at(7);
        let newer = MemoryItem::new("note", "newer").with_created_at(7);
        store.save_memory(&older, None).await.unwrap();
        store.save_memory(&newer, None).await.unwrap();

        let recent = store.query_recent(2).await.unwrap();
        let contents: Vec<_> = recent.iter().map(|i| i.content()).collect();
        assert_eq!(contents, vec!["newer", "older"]);
    }

    #[tokio::test]
    async fn test_unbounded_ttl_never_expires() {
        let store = InMemoryStore::new();
        store
            .save_memory(&item_at("forever", 1), Some(Duration::MAX))
            .await
            .unwrap();
        assert!(store.acquire_lock("k", Duration::MAX, "a").await.unwrap());

        assert!(store.get_memory("forever").await.unwrap().is_some());
        assert!(!store.acquire_lock("k", Duration::from_secs(1), "b").await.unwrap());
        assert_eq!(store.query_recent(1).await.unwrap().len(), 1);
        assert!(store.release_lock("k", "a").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_twice_is_noop() {
        let store = InMemoryStore::new();
        store.save_memory(&item_at("x", 1), None).await.unwrap();
        store.delete_memory("x").await.unwrap();
        store.delete_memory("x").await.unwrap();
        assert_eq!(store.get_memory("x").await.unwrap(), None);
        assert_eq!(store.timeline_len(), 0);
    }

    #[tokio::test]
    async fn test_checkpoint_overwrite() {
        let store = InMemoryStore::new();
        let first = AgentSnapshot::new("cp", "1").with_variable("k", "v1");
        let second = AgentSnapshot::new("cp", "2");
        store.save_checkpoint("cp", &first).await.unwrap();
        store.save_checkpoint("cp", &second).await.unwrap();
        assert_eq!(store.load_checkpoint("cp").await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_list_checkpoints_by_prefix() {
        let store = InMemoryStore::new();
        for id in ["agent-1", "agent-2", "other"] {
            store
                .save_checkpoint(id, &AgentSnapshot::new(id, "1"))
                .await
                .unwrap();
        }
        let ids = store.list_checkpoints("agent-").await.unwrap();
        assert_eq!(ids, vec!["agent-1".to_string(), "agent-2".to_string()]);
        assert_eq!(store.list_checkpoints("").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_lock_expiry_allows_new_owner() {
        let store = InMemoryStore::new();
        let ttl = Duration::from_millis(20);
        assert!(store.acquire_lock("k", ttl, "a").await.unwrap());
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(store.acquire_lock("k", Duration::from_secs(5), "b").await.unwrap());
        assert!(!store.release_lock("k", "a").await.unwrap());
        assert!(store.release_lock("k", "b").await.unwrap());
    }

    #[tokio::test]
    async fn test_closed_store_is_unavailable() {
        let store = InMemoryStore::new();
        store.close().await;
        let err = store.query_recent(5).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Unavailable {
                operation: StoreOperation::QueryRecent,
                ..
            }
        ));
        assert!(store.ping().await.is_err());
    }
}
