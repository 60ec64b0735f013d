//! In-memory cache implementation using moka and dashmap.
//!
//! Backs the [`crate::ports::Cache`] port: small progress records
//! (serialised JSON) and short-lived rate-limit/dedup counters owned by
//! rules and batches. TTLs are per-entry (a single key's gate window
//! differs from another's), so entries carry their own expiry rather than
//! using moka's cache-wide `time_to_live`.
//!
//! # Usage
//!
//! ```ignore
//! use ingest_core::store::MemoryCache;
//! use ingest_core::ports::Cache;
//!
//! let cache = MemoryCache::new();
//! cache.set("key", "value".into(), Duration::from_secs(60)).await?;
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use moka::future::Cache as MokaCache;

use crate::error::Result;
use crate::ports::Cache;

/// Default max number of live string entries before LRU eviction kicks in.
const MAX_ENTRIES: u64 = 50_000;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Moka/dashmap-backed in-memory cache.
///
/// Thread-safe; share across tasks via `Arc<MemoryCache>`.
#[derive(Debug)]
pub struct MemoryCache {
    entries: MokaCache<String, Arc<Entry>>,
    /// Atomic counters, separate from `entries` since increments need
    /// read-modify-write under a single lock rather than moka's
    /// get-then-insert.
    counters: Arc<DashMap<String, (u64, Instant)>>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    /// Create a new memory cache with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: MokaCache::builder().max_capacity(MAX_ENTRIES).build(),
            counters: Arc::new(DashMap::new()),
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entries.get(key).await {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                self.entries.invalidate(key).await;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.entries
            .insert(
                key.to_string(),
                Arc::new(Entry { value, expires_at: Instant::now() + ttl }),
            )
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.invalidate(key).await;
        self.counters.remove(key);
        Ok(())
    }

    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64> {
        let now = Instant::now();
        let mut slot = self.counters.entry(key.to_string()).or_insert((0, now + ttl));
        if slot.1 <= now {
            *slot = (0, now + ttl);
        }
        slot.0 += 1;
        slot.1 = now + ttl;
        Ok(slot.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_and_get_roundtrip() {
        let cache = MemoryCache::new();
        cache.set("key", "value".into(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("key").await.unwrap(), Some("value".into()));
    }

    #[tokio::test]
    async fn expired_entry_reads_as_missing() {
        let cache = MemoryCache::new();
        cache
            .set("key", "value".into(), Duration::from_millis(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_removes_key() {
        let cache = MemoryCache::new();
        cache.set("key", "value".into(), Duration::from_secs(60)).await.unwrap();
        cache.delete("key").await.unwrap();
        assert_eq!(cache.get("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn increment_starts_at_one_and_resets_after_ttl() {
        let cache = MemoryCache::new();
        assert_eq!(cache.increment("counter", Duration::from_millis(20)).await.unwrap(), 1);
        assert_eq!(cache.increment("counter", Duration::from_millis(20)).await.unwrap(), 2);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.increment("counter", Duration::from_secs(60)).await.unwrap(), 1);
    }
}
