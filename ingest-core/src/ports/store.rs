//! Storage port traits for data persistence.
//!
//! These traits define the contract for persisting and retrieving
//! domain entities. Infrastructure adapters implement these traits
//! using concrete storage backends (Postgres in this core).

use async_trait::async_trait;

use crate::error::Result;
use crate::types::entities::{PoolRecord, PositionRecord, SubscriberRecord};
use crate::types::primitives::ChainId;

// ═══════════════════════════════════════════════════════════════════════════════
// POSITION STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Port for position persistence operations.
///
/// Handles CRUD operations for tracked Uniswap-V3 positions, including
/// worker-startup entity-set loading and inactive-position cleanup.
///
/// # Implementation Notes
///
/// Implementations should:
/// - Index on `(chain_id, nft_id)` for fast lookups
/// - Index on `(chain_id, is_active)` for the worker's entity-set queries
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Get a position by its chain and NFT id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    async fn get_position(&self, chain_id: ChainId, nft_id: &str) -> Result<Option<PositionRecord>>;

    /// Save a new position or update an existing one.
    ///
    /// Uses upsert semantics - creates if not exists, updates if exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn save_position(&self, position: &PositionRecord) -> Result<()>;

    /// Get active positions for a chain, for worker startup entity-set loading.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    async fn get_active_positions(&self, chain_id: ChainId) -> Result<Vec<PositionRecord>>;

    /// Mark a position inactive (closed/burned).
    ///
    /// # Errors
    ///
    /// Returns an error if the position doesn't exist or the database
    /// operation fails.
    async fn deactivate_position(&self, chain_id: ChainId, nft_id: &str) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// POOL STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Port for pool persistence operations.
///
/// Tracks which pools still have at least one active position watching
/// them, used by the pool-price worker's `position.closed` handling.
#[async_trait]
pub trait PoolStore: Send + Sync {
    /// Get a pool by its chain and address.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    async fn get_pool(&self, chain_id: ChainId, pool_address: &str) -> Result<Option<PoolRecord>>;

    /// Save a new pool or update an existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn save_pool(&self, pool: &PoolRecord) -> Result<()>;

    /// Get pools with at least one active position, for worker startup
    /// entity-set loading.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    async fn get_active_pools(&self, chain_id: ChainId) -> Result<Vec<PoolRecord>>;

    /// Count active positions referencing a pool.
    ///
    /// Used to decide whether a pool subscription can be dropped when a
    /// position closes.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    async fn count_active_positions_for_pool(
        &self,
        chain_id: ChainId,
        pool_address: &str,
    ) -> Result<u64>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// SUBSCRIBER STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Port for poll-driven subscriber persistence.
///
/// Backs the subscriber lifecycle timer: staleness pausing, pruning of
/// long-paused rows, and discovery of newly active rows.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Save a new subscriber row or update an existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn save_subscriber(&self, subscriber: &SubscriberRecord) -> Result<()>;

    /// Get all active subscriber rows for a chain, for worker startup
    /// entity-set loading and new-entity discovery.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    async fn get_active_subscribers(&self, chain_id: ChainId) -> Result<Vec<SubscriberRecord>>;

    /// Get paused subscriber rows older than the prune threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    async fn get_prunable_subscribers(
        &self,
        chain_id: ChainId,
        prune_threshold_ms: i64,
    ) -> Result<Vec<SubscriberRecord>>;

    /// Delete a subscriber row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn delete_subscriber(&self, id: &uuid::Uuid) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// INDEXER STATE STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Port for durable indexer progress, distinct from the cache-backed
/// `BlockTracker` heartbeat.
///
/// The cache holds the fast-path, TTL'd high-water mark consulted on
/// every restart; this store holds the same value durably so a cold
/// cache (e.g. after a cache-cluster failover) can still recover a
/// sane catch-up starting point instead of replaying from the
/// contract's deployment block.
#[async_trait]
pub trait IndexerStateStore: Send + Sync {
    /// Get the last durably-published block for a chain/subsystem pair.
    ///
    /// Returns `None` if nothing has ever been recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    async fn get_last_block(&self, chain_id: ChainId, subsystem: &str) -> Result<Option<u64>>;

    /// Durably record the last published block for a chain/subsystem pair.
    ///
    /// Called after a successful Finalized-phase scan, mirroring the
    /// cache-backed `BlockTracker` advance.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn set_last_block(&self, chain_id: ChainId, subsystem: &str, block: u64) -> Result<()>;
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks {
    //! In-memory mock implementations for testing.

    use std::collections::HashMap;
    use std::sync::RwLock;

    use async_trait::async_trait;
    use uuid::Uuid;

    use super::{IndexerStateStore, PoolStore, PositionStore, SubscriberStore};
    use crate::error::Result;
    use crate::types::entities::{PoolRecord, PositionRecord, SubscriberRecord};
    use crate::types::primitives::ChainId;

    /// In-memory position store keyed by `(chainId, nftId)`.
    #[derive(Default)]
    pub struct MockPositionStore {
        positions: RwLock<HashMap<(ChainId, String), PositionRecord>>,
    }

    impl MockPositionStore {
        /// Create an empty mock store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl PositionStore for MockPositionStore {
        async fn get_position(
            &self,
            chain_id: ChainId,
            nft_id: &str,
        ) -> Result<Option<PositionRecord>> {
            Ok(self
                .positions
                .read()
                .expect("lock poisoned")
                .get(&(chain_id, nft_id.to_string()))
                .cloned())
        }

        async fn save_position(&self, position: &PositionRecord) -> Result<()> {
            self.positions.write().expect("lock poisoned").insert(
                (position.chain_id, position.nft_id.clone()),
                position.clone(),
            );
            Ok(())
        }

        async fn get_active_positions(&self, chain_id: ChainId) -> Result<Vec<PositionRecord>> {
            Ok(self
                .positions
                .read()
                .expect("lock poisoned")
                .values()
                .filter(|p| p.chain_id == chain_id && p.is_active)
                .cloned()
                .collect())
        }

        async fn deactivate_position(&self, chain_id: ChainId, nft_id: &str) -> Result<()> {
            if let Some(position) = self
                .positions
                .write()
                .expect("lock poisoned")
                .get_mut(&(chain_id, nft_id.to_string()))
            {
                position.is_active = false;
            }
            Ok(())
        }
    }

    /// In-memory pool store keyed by `(chainId, poolAddress)`.
    #[derive(Default)]
    pub struct MockPoolStore {
        pools: RwLock<HashMap<(ChainId, String), PoolRecord>>,
    }

    impl MockPoolStore {
        /// Create an empty mock store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl PoolStore for MockPoolStore {
        async fn get_pool(&self, chain_id: ChainId, pool_address: &str) -> Result<Option<PoolRecord>> {
            Ok(self
                .pools
                .read()
                .expect("lock poisoned")
                .get(&(chain_id, pool_address.to_string()))
                .cloned())
        }

        async fn save_pool(&self, pool: &PoolRecord) -> Result<()> {
            self.pools.write().expect("lock poisoned").insert(
                (pool.chain_id, pool.pool_address.to_hex()),
                pool.clone(),
            );
            Ok(())
        }

        async fn get_active_pools(&self, chain_id: ChainId) -> Result<Vec<PoolRecord>> {
            Ok(self
                .pools
                .read()
                .expect("lock poisoned")
                .values()
                .filter(|p| p.chain_id == chain_id && p.has_active_positions)
                .cloned()
                .collect())
        }

        async fn count_active_positions_for_pool(
            &self,
            _chain_id: ChainId,
            _pool_address: &str,
        ) -> Result<u64> {
            Ok(0)
        }
    }

    /// In-memory subscriber store keyed by row id.
    #[derive(Default)]
    pub struct MockSubscriberStore {
        subscribers: RwLock<HashMap<Uuid, SubscriberRecord>>,
    }

    impl MockSubscriberStore {
        /// Create an empty mock store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl SubscriberStore for MockSubscriberStore {
        async fn save_subscriber(&self, subscriber: &SubscriberRecord) -> Result<()> {
            self.subscribers
                .write()
                .expect("lock poisoned")
                .insert(subscriber.id, subscriber.clone());
            Ok(())
        }

        async fn get_active_subscribers(&self, chain_id: ChainId) -> Result<Vec<SubscriberRecord>> {
            use crate::types::enums::SubscriberState;
            Ok(self
                .subscribers
                .read()
                .expect("lock poisoned")
                .values()
                .filter(|s| s.chain_id == chain_id && s.state == SubscriberState::Active)
                .cloned()
                .collect())
        }

        async fn get_prunable_subscribers(
            &self,
            chain_id: ChainId,
            prune_threshold_ms: i64,
        ) -> Result<Vec<SubscriberRecord>> {
            let now = chrono::Utc::now();
            Ok(self
                .subscribers
                .read()
                .expect("lock poisoned")
                .values()
                .filter(|s| s.chain_id == chain_id && s.is_prunable(now, prune_threshold_ms))
                .cloned()
                .collect())
        }

        async fn delete_subscriber(&self, id: &Uuid) -> Result<()> {
            self.subscribers.write().expect("lock poisoned").remove(id);
            Ok(())
        }
    }

    /// In-memory durable progress store keyed by `(chainId, subsystem)`.
    #[derive(Default)]
    pub struct MockIndexerStateStore {
        blocks: RwLock<HashMap<(ChainId, String), u64>>,
    }

    impl MockIndexerStateStore {
        /// Create an empty mock store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl IndexerStateStore for MockIndexerStateStore {
        async fn get_last_block(&self, chain_id: ChainId, subsystem: &str) -> Result<Option<u64>> {
            Ok(self
                .blocks
                .read()
                .expect("lock poisoned")
                .get(&(chain_id, subsystem.to_string()))
                .copied())
        }

        async fn set_last_block(
            &self,
            chain_id: ChainId,
            subsystem: &str,
            block: u64,
        ) -> Result<()> {
            self.blocks
                .write()
                .expect("lock poisoned")
                .insert((chain_id, subsystem.to_string()), block);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::{MockIndexerStateStore, MockPoolStore, MockPositionStore, MockSubscriberStore};
    use super::*;
    use crate::types::enums::SubscriberState;
    use crate::types::primitives::EthAddress;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_position(nft_id: &str, is_active: bool) -> PositionRecord {
        PositionRecord {
            id: Uuid::new_v4(),
            chain_id: ChainId::Ethereum,
            nft_id: nft_id.to_string(),
            pool_address: EthAddress::ZERO,
            owner: EthAddress::ZERO,
            is_active,
            tick_lower: -100,
            tick_upper: 100,
            liquidity: "0".to_string(),
            current_value: None,
            unrealized_pnl: None,
            unclaimed_fees: None,
            created_at_block: 1,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn position_store_roundtrip_and_active_filter() {
        let store = MockPositionStore::new();
        store.save_position(&sample_position("1", true)).await.unwrap();
        store.save_position(&sample_position("2", false)).await.unwrap();

        let active = store.get_active_positions(ChainId::Ethereum).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].nft_id, "1");

        assert!(store
            .get_position(ChainId::Ethereum, "1")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn position_store_deactivate() {
        let store = MockPositionStore::new();
        store.save_position(&sample_position("1", true)).await.unwrap();
        store.deactivate_position(ChainId::Ethereum, "1").await.unwrap();
        assert!(store
            .get_active_positions(ChainId::Ethereum)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn pool_store_roundtrip() {
        let store = MockPoolStore::new();
        let pool = PoolRecord {
            id: Uuid::new_v4(),
            chain_id: ChainId::Ethereum,
            pool_address: EthAddress::ZERO,
            has_active_positions: true,
            last_sqrt_price_x96: None,
            last_tick: None,
            updated_at: Utc::now(),
        };
        store.save_pool(&pool).await.unwrap();
        let active = store.get_active_pools(ChainId::Ethereum).await.unwrap();
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn subscriber_store_prunable_filter() {
        let store = MockSubscriberStore::new();
        let mut row = SubscriberRecord {
            id: Uuid::new_v4(),
            chain_id: ChainId::Ethereum,
            entity_key: "0xabc".to_string(),
            state: SubscriberState::Paused,
            last_polled_at: Utc::now(),
            expires_after_ms: Some(1_000),
            paused_at: Some(Utc::now() - chrono::Duration::milliseconds(10_000)),
        };
        store.save_subscriber(&row).await.unwrap();
        let prunable = store
            .get_prunable_subscribers(ChainId::Ethereum, 5_000)
            .await
            .unwrap();
        assert_eq!(prunable.len(), 1);

        row.state = SubscriberState::Active;
        row.paused_at = None;
        store.save_subscriber(&row).await.unwrap();
        let prunable = store
            .get_prunable_subscribers(ChainId::Ethereum, 5_000)
            .await
            .unwrap();
        assert!(prunable.is_empty());
    }

    #[tokio::test]
    async fn indexer_state_store_roundtrip() {
        let store = MockIndexerStateStore::new();
        assert_eq!(
            store.get_last_block(ChainId::Ethereum, "position-liquidity").await.unwrap(),
            None
        );
        store
            .set_last_block(ChainId::Ethereum, "position-liquidity", 100)
            .await
            .unwrap();
        assert_eq!(
            store.get_last_block(ChainId::Ethereum, "position-liquidity").await.unwrap(),
            Some(100)
        );
    }
}
