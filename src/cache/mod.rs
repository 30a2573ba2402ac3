//! Redis-backed storefront read cache.
//!
//! Writes to the catalog or the discount tables invalidate whole key
//! prefixes with a cursor SCAN + DEL pass. Every operation here is
//! best-effort: a Redis failure degrades to a cache miss, never to a
//! request failure.

use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

const SCAN_BATCH: usize = 100;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct CacheClient {
    client: Arc<redis::Client>,
    namespace: String,
    default_ttl: Duration,
}

impl CacheClient {
    pub fn new(client: Arc<redis::Client>, namespace: impl Into<String>, default_ttl: Duration) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            default_ttl,
        }
    }

    /// Key scoped to a store, e.g. `shopcore:store:<id>:catalog:products`.
    pub fn store_key(&self, store_id: Uuid, suffix: &str) -> String {
        format!("{}:store:{}:{}", self.namespace, store_id, suffix)
    }

    fn store_prefix(&self, store_id: Uuid, area: &str) -> String {
        format!("{}:store:{}:{}", self.namespace, store_id, area)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let mut conn = self.client.get_async_connection().await?;
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let payload = serde_json::to_string(value)?;
        let mut conn = self.client.get_async_connection().await?;
        conn.set_ex::<_, _, ()>(key, payload, self.default_ttl.as_secs() as usize)
            .await?;
        Ok(())
    }

    /// Deletes every key under `<namespace>:store:<id>:<area>` via a cursor
    /// SCAN so large keyspaces are walked in batches. Returns the number of
    /// keys removed.
    pub async fn invalidate_store_area(&self, store_id: Uuid, area: &str) -> Result<u64, CacheError> {
        let pattern = format!("{}*", self.store_prefix(store_id, area));
        let removed = self.delete_matching(&pattern).await?;
        debug!(store_id = %store_id, area, removed, "cache prefix invalidated");
        Ok(removed)
    }

    /// Fire-and-forget variant used after writes: failures are logged and
    /// swallowed so the write path never depends on Redis.
    pub async fn invalidate_store_area_best_effort(&self, store_id: Uuid, area: &str) {
        if let Err(e) = self.invalidate_store_area(store_id, area).await {
            warn!(store_id = %store_id, area, error = %e, "cache invalidation failed; continuing");
        }
    }

    /// Cross-tenant variant for maintenance jobs that touch every store
    /// (e.g. the discount sweep).
    pub async fn invalidate_area_all_stores(&self, area: &str) -> Result<u64, CacheError> {
        let pattern = format!("{}:store:*:{}*", self.namespace, area);
        self.delete_matching(&pattern).await
    }

    async fn delete_matching(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut conn = self.client.get_async_connection().await?;
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let deleted: u64 = redis::cmd("DEL").arg(&keys).query_async(&mut conn).await?;
                removed += deleted;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> CacheClient {
        let client = Arc::new(redis::Client::open("redis://127.0.0.1:6399").unwrap());
        CacheClient::new(client, "shopcore-test", Duration::from_secs(60))
    }

    #[test]
    fn store_keys_are_namespaced_per_store() {
        let cache = cache();
        let store_a = Uuid::new_v4();
        let store_b = Uuid::new_v4();

        let key_a = cache.store_key(store_a, "catalog:products");
        let key_b = cache.store_key(store_b, "catalog:products");

        assert!(key_a.starts_with("shopcore-test:store:"));
        assert_ne!(key_a, key_b);
    }

    #[tokio::test]
    async fn unreachable_redis_surfaces_as_error_not_panic() {
        // Port 6399 has no server; the best-effort path must swallow this.
        let cache = cache();
        let store_id = Uuid::new_v4();
        assert!(cache.invalidate_store_area(store_id, "catalog").await.is_err());
        cache.invalidate_store_area_best_effort(store_id, "catalog").await;
    }
}
