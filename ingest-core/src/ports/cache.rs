//! Caching port for distributed key/value state with TTL.
//!
//! The core only stores two kinds of data in the cache: small progress
//! records (`BlockTrackerRecord`, serialised as JSON) and short-lived
//! rate-limit/dedup counters owned by individual rules. It does not use the
//! cache as a read-through accelerator for the relational store.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE
// ═══════════════════════════════════════════════════════════════════════════════

/// Port for distributed key/value caching with TTL.
///
/// Implementations must be thread-safe (this trait requires `Send + Sync`)
/// since batches and rules across different chains read and write
/// concurrently through a shared handle.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get a raw string value.
    ///
    /// Returns `None` on cache miss or TTL expiration.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a raw string value with a TTL.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Remove a value.
    ///
    /// Idempotent: removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Atomically increment a counter, creating it at 1 if absent, and
    /// (re)set its TTL on every increment. Used for rate-limit and
    /// once-per-window dedup gates.
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64>;

    /// Get and deserialize a JSON value.
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(raw) => {
                let value = serde_json::from_str(&raw)
                    .map_err(crate::error::InfraError::from)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Serialize and set a JSON value with a TTL.
    async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let raw = serde_json::to_string(value).map_err(crate::error::InfraError::from)?;
        self.set(key, raw, ttl).await
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks {
    //! In-memory mock implementation for testing.

    use std::collections::HashMap;
    use std::sync::RwLock;
    use std::time::{Duration, Instant};

    use async_trait::async_trait;

    use super::Cache;
    use crate::error::Result;

    struct Entry {
        value: String,
        expires_at: Instant,
    }

    /// Simple in-memory cache for testing, with real TTL expiry.
    #[derive(Default)]
    pub struct MockCache {
        entries: RwLock<HashMap<String, Entry>>,
    }

    impl MockCache {
        /// Create an empty mock cache.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl Cache for MockCache {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            let mut entries = self.entries.write().expect("lock poisoned");
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    Ok(Some(entry.value.clone()))
                }
                Some(_) => {
                    entries.remove(key);
                    Ok(None)
                }
                None => Ok(None),
            }
        }

        async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
            self.entries.write().expect("lock poisoned").insert(
                key.to_string(),
                Entry {
                    value,
                    expires_at: Instant::now() + ttl,
                },
            );
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.entries.write().expect("lock poisoned").remove(key);
            Ok(())
        }

        async fn increment(&self, key: &str, ttl: Duration) -> Result<u64> {
            let mut entries = self.entries.write().expect("lock poisoned");
            let current = match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    entry.value.parse::<u64>().unwrap_or(0)
                }
                _ => 0,
            };
            let next = current + 1;
            entries.insert(
                key.to_string(),
                Entry {
                    value: next.to_string(),
                    expires_at: Instant::now() + ttl,
                },
            );
            Ok(next)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::MockCache;
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        n: u64,
    }

    #[tokio::test]
    async fn set_and_get_roundtrip() {
        let cache = MockCache::new();
        cache
            .set("key", "value".into(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("key").await.unwrap(), Some("value".into()));
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let cache = MockCache::new();
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_removes_key() {
        let cache = MockCache::new();
        cache
            .set("key", "value".into(), Duration::from_secs(60))
            .await
            .unwrap();
        cache.delete("key").await.unwrap();
        assert_eq!(cache.get("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn increment_starts_at_one_and_accumulates() {
        let cache = MockCache::new();
        assert_eq!(cache.increment("counter", Duration::from_secs(60)).await.unwrap(), 1);
        assert_eq!(cache.increment("counter", Duration::from_secs(60)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn json_roundtrip() {
        let cache = MockCache::new();
        let sample = Sample { n: 42 };
        cache
            .set_json("sample", &sample, Duration::from_secs(60))
            .await
            .unwrap();
        let loaded: Option<Sample> = cache.get_json("sample").await.unwrap();
        assert_eq!(loaded, Some(sample));
    }
}
