use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use deadpool_redis::{Connection, Pool, PoolError};
use redis::{AsyncCommands, RedisResult};
use tracing::{debug, warn};

use waymark_core::{
    AgentSnapshot, MemoryItem, MemoryStore, StoreError, StoreKeys, StoreOperation, StoreResult,
};

use crate::redis::config::RedisConfig;
use crate::redis::health::RedisHealth;
use crate::redis::pool::RedisPoolUtils;
use crate::redis::scripts;

/// Keys requested per SCAN round-trip.
const SCAN_COUNT: usize = 100;

/// [`MemoryStore`] backed by a Redis server through a deadpool-redis pool.
///
/// Every command is bounded by the configured `command_timeout`; failures
/// surface as [`StoreError::Unavailable`] with a sanitized reason.
#[derive(Clone)]
pub struct RedisMemoryStore {
    pool: Pool,
    keys: StoreKeys,
    config: RedisConfig,
}

impl std::fmt::Debug for RedisMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisMemoryStore")
            .field("keys", &self.keys)
            .field("pool_size", &self.config.pool_size)
            .finish_non_exhaustive()
    }
}

impl RedisMemoryStore {
    /// Validate `config`, build the pool and check the server answers PING.
    pub async fn connect(config: RedisConfig) -> StoreResult<Self> {
        config.validate()?;
        let pool = RedisPoolUtils::create_pool(&config)?;
        let store = Self::from_pool(pool, config);
        store.ping().await.map_err(|e| match e {
            StoreError::Unavailable { reason, .. } => {
                StoreError::unavailable(StoreOperation::Connect, reason)
            }
            other => other,
        })?;
        debug!(pool_size = store.config.pool_size, "Connected to Redis");
        Ok(store)
    }

    /// Connect to `redis://localhost:6379` with default settings.
    pub async fn localhost() -> StoreResult<Self> {
        Self::connect(RedisConfig::default()).await
    }

    /// Wrap an existing pool without probing the server.
    pub fn from_pool(pool: Pool, config: RedisConfig) -> Self {
        let keys = config.keys();
        Self { pool, keys, config }
    }

    pub fn keys(&self) -> &StoreKeys {
        &self.keys
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    /// Probe the server with PING and `INFO server`.
    pub async fn health_check(&self) -> RedisHealth {
        let start = Instant::now();
        let probe = async {
            let mut conn = self.connection(StoreOperation::Ping).await?;
            self.run(
                StoreOperation::Ping,
                redis::cmd("PING").query_async::<String>(&mut conn),
            )
            .await?;
            // INFO is optional; some managed servers disable it.
            let info = self
                .run(
                    StoreOperation::Ping,
                    redis::cmd("INFO").arg("server").query_async::<String>(&mut conn),
                )
                .await
                .ok();
            Ok::<_, StoreError>(info)
        }
        .await;

        match probe {
            Ok(info) => {
                RedisHealth::healthy(start.elapsed(), info.as_deref(), self.config.pool_size)
            }
            Err(e) => {
                RedisHealth::unhealthy(start.elapsed(), e.to_string(), self.config.pool_size)
            }
        }
    }

    async fn connection(&self, operation: StoreOperation) -> StoreResult<Connection> {
        self.pool.get().await.map_err(|e| {
            let reason = match &e {
                PoolError::Backend(err) => RedisPoolUtils::sanitize_error(err),
                PoolError::Timeout(_) => "Timed out waiting for a pooled connection".to_string(),
                PoolError::Closed => "Connection pool is closed".to_string(),
                _ => "Connection pool unavailable".to_string(),
            };
            StoreError::unavailable(operation, reason)
        })
    }

    /// Await one Redis round-trip under the command timeout.
    async fn run<T>(
        &self,
        operation: StoreOperation,
        command: impl Future<Output = RedisResult<T>>,
    ) -> StoreResult<T> {
        match tokio::time::timeout(self.config.command_timeout, command).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(RedisPoolUtils::store_error(operation, &e)),
            Err(_) => Err(StoreError::unavailable(operation, "Operation timeout")),
        }
    }
}

#[async_trait]
impl MemoryStore for RedisMemoryStore {
    async fn save_memory(&self, item: &MemoryItem, ttl: Option<Duration>) -> StoreResult<()> {
        let op = StoreOperation::SaveMemory;
        let fields = item_fields(item).map_err(|e| StoreError::serialization(op, e))?;
        let key = self.keys.memory(item.id());

        let mut pipe = redis::pipe();
        pipe.atomic()
            .del(&key)
            .ignore()
            .hset_multiple(&key, &fields)
            .ignore()
            .zadd(self.keys.timeline(), item.id(), item.created_at())
            .ignore();
        if let Some(ttl) = ttl {
            pipe.pexpire(&key, ttl_millis(ttl)).ignore();
        }

        let mut conn = self.connection(op).await?;
        self.run(op, pipe.query_async::<()>(&mut conn)).await?;
        debug!(id = %item.id(), kind = %item.kind(), "Saved memory item");
        Ok(())
    }

    async fn get_memory(&self, id: &str) -> StoreResult<Option<MemoryItem>> {
        let op = StoreOperation::GetMemory;
        let mut conn = self.connection(op).await?;
        let fields: HashMap<String, String> =
            self.run(op, conn.hgetall(self.keys.memory(id))).await?;
        item_from_fields(&fields).map_err(|e| StoreError::serialization(op, e))
    }

    async fn delete_memory(&self, id: &str) -> StoreResult<()> {
        let op = StoreOperation::DeleteMemory;
        let mut pipe = redis::pipe();
        pipe.atomic()
            .del(self.keys.memory(id))
            .ignore()
            .zrem(self.keys.timeline(), id)
            .ignore();

        let mut conn = self.connection(op).await?;
        self.run(op, pipe.query_async::<()>(&mut conn)).await?;
        debug!(id = %id, "Deleted memory item");
        Ok(())
    }

    async fn query_recent(&self, limit: usize) -> StoreResult<Vec<MemoryItem>> {
        let op = StoreOperation::QueryRecent;
        // ZREVRANGE 0 -1 would mean "everything".
        if limit == 0 {
            return Ok(Vec::new());
        }
        let stop = isize::try_from(limit - 1).unwrap_or(isize::MAX);

        let mut conn = self.connection(op).await?;
        let ids: Vec<String> = self
            .run(op, conn.zrevrange(self.keys.timeline(), 0, stop))
            .await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for id in &ids {
            pipe.hgetall(self.keys.memory(id));
        }
        let rows: Vec<HashMap<String, String>> =
            self.run(op, pipe.query_async(&mut conn)).await?;

        let mut items = Vec::with_capacity(rows.len());
        for (id, fields) in ids.iter().zip(rows) {
            match item_from_fields(&fields) {
                Ok(Some(item)) => items.push(item),
                Ok(None) => debug!(id = %id, "Skipping stale timeline entry"),
                Err(e) => warn!(id = %id, error = %e, "Skipping unreadable memory item"),
            }
        }
        Ok(items)
    }

    async fn save_checkpoint(&self, id: &str, snapshot: &AgentSnapshot) -> StoreResult<()> {
        let op = StoreOperation::SaveCheckpoint;
        let encoded = serde_json::to_string(snapshot)
            .map_err(|e| StoreError::serialization(op, e.to_string()))?;
        let key = self.keys.checkpoint(id);
        let fields = [
            ("snapshot", encoded),
            ("createdAt", snapshot.created_at.to_string()),
            ("agentVersion", snapshot.agent_version.clone()),
        ];

        let mut pipe = redis::pipe();
        pipe.atomic()
            .del(&key)
            .ignore()
            .hset_multiple(&key, &fields)
            .ignore();

        let mut conn = self.connection(op).await?;
        self.run(op, pipe.query_async::<()>(&mut conn)).await?;
        debug!(checkpoint = %id, version = %snapshot.agent_version, "Saved checkpoint");
        Ok(())
    }

    async fn load_checkpoint(&self, id: &str) -> StoreResult<Option<AgentSnapshot>> {
        let op = StoreOperation::LoadCheckpoint;
        let mut conn = self.connection(op).await?;
        let encoded: Option<String> = self
            .run(op, conn.hget(self.keys.checkpoint(id), "snapshot"))
            .await?;
        encoded
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|e| StoreError::serialization(op, e.to_string()))
            })
            .transpose()
    }

    async fn list_checkpoints(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let op = StoreOperation::ListCheckpoints;
        let pattern = self.keys.checkpoint_pattern(prefix);
        let mut conn = self.connection(op).await?;

        let mut cursor: u64 = 0;
        let mut ids = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = self
                .run(
                    op,
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(SCAN_COUNT)
                        .query_async(&mut conn),
                )
                .await?;
            ids.extend(
                batch
                    .iter()
                    .filter_map(|key| self.keys.checkpoint_id(key))
                    .map(str::to_string),
            );
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once.
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn acquire_lock(
        &self,
        lock_key: &str,
        ttl: Duration,
        owner_id: &str,
    ) -> StoreResult<bool> {
        let op = StoreOperation::AcquireLock;
        let mut conn = self.connection(op).await?;
        let reply: Option<String> = self
            .run(
                op,
                redis::cmd("SET")
                    .arg(self.keys.lock(lock_key))
                    .arg(owner_id)
                    .arg("NX")
                    .arg("PX")
                    .arg(ttl_millis(ttl))
                    .query_async(&mut conn),
            )
            .await?;
        let acquired = reply.is_some();
        if !acquired {
            debug!(lock = %lock_key, owner = %owner_id, "Lock held by another owner");
        }
        Ok(acquired)
    }

    async fn release_lock(&self, lock_key: &str, owner_id: &str) -> StoreResult<bool> {
        let op = StoreOperation::ReleaseLock;
        let mut conn = self.connection(op).await?;
        let deleted: i64 = self
            .run(
                op,
                scripts::release_lock()
                    .key(self.keys.lock(lock_key))
                    .arg(owner_id)
                    .invoke_async(&mut conn),
            )
            .await?;
        Ok(deleted == 1)
    }

    async fn ping(&self) -> StoreResult<()> {
        let op = StoreOperation::Ping;
        let mut conn = self.connection(op).await?;
        self.run(op, redis::cmd("PING").query_async::<String>(&mut conn))
            .await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close();
        debug!("Closed Redis pool");
    }
}

/// Longest expiry sent to Redis. The server rejects `PX`/`PEXPIRE` values
/// that overflow once added to its clock, and inside `MULTI` that rejection
/// only surfaces after the other queued writes have applied.
const MAX_TTL_MILLIS: i64 = i64::MAX / 2;

/// Expiry in milliseconds, clamped to `1..=MAX_TTL_MILLIS`.
fn ttl_millis(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis())
        .unwrap_or(MAX_TTL_MILLIS)
        .clamp(1, MAX_TTL_MILLIS)
}

/// Hash fields of `memory:{id}`.
fn item_fields(item: &MemoryItem) -> Result<Vec<(&'static str, String)>, String> {
    let metadata = serde_json::to_string(item.metadata()).map_err(|e| e.to_string())?;
    Ok(vec![
        ("id", item.id().to_string()),
        ("type", item.kind().to_string()),
        ("content", item.content().to_string()),
        ("metadata", metadata),
        ("createdAt", item.created_at().to_string()),
    ])
}

/// Rebuild an item from `HGETALL`; an empty hash means the item is gone.
fn item_from_fields(fields: &HashMap<String, String>) -> Result<Option<MemoryItem>, String> {
    if fields.is_empty() {
        return Ok(None);
    }
    let field = |name: &str| {
        fields
            .get(name)
            .ok_or_else(|| format!("missing field '{}'", name))
    };

    let metadata: HashMap<String, String> = match fields.get("metadata") {
        Some(raw) if !raw.is_empty() => {
            serde_json::from_str(raw).map_err(|e| format!("invalid metadata: {}", e))?
        }
        _ => HashMap::new(),
    };
    let created_at = field("createdAt")?
        .parse::<i64>()
        .map_err(|e| format!("invalid createdAt: {}", e))?;

    Ok(Some(MemoryItem::from_parts(
        field("id")?.as_str(),
        field("type")?.as_str(),
        field("content")?.as_str(),
        metadata,
        created_at,
    )))
}
