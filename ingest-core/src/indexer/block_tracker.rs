//! `BlockTracker`: cache-backed high-water mark of durably published blocks.
//!
//! One record per `(chainId, subsystem)` pair, keyed as
//! `"onchain-data:{subsystem}:last-block:{chainId}"` with a one-year TTL.
//! Workers read it on start to bound their catch-up range, and write it
//! either after a successful Finalized-phase scan or via a periodic
//! heartbeat during idle periods.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::ports::Cache;
use crate::types::entities::BlockTrackerRecord;
use crate::types::primitives::ChainId;

/// Reads and writes the cache-backed `BlockTracker` record for one subsystem.
///
/// Cheap to clone: holds only an `Arc<dyn Cache>` and the subsystem name.
#[derive(Clone)]
pub struct BlockTracker<C: Cache> {
    cache: Arc<C>,
    subsystem: String,
}

impl<C: Cache> BlockTracker<C> {
    /// Create a tracker for a named subsystem (e.g. `"position-liquidity"`).
    #[must_use]
    pub fn new(cache: Arc<C>, subsystem: impl Into<String>) -> Self {
        Self {
            cache,
            subsystem: subsystem.into(),
        }
    }

    /// Read the last durably-published block for a chain.
    ///
    /// Returns `None` on cache miss (cold cache or never written).
    ///
    /// # Errors
    ///
    /// Returns an error if the cache read fails.
    #[instrument(skip(self), fields(subsystem = %self.subsystem, chain_id = %chain_id))]
    pub async fn last_block(&self, chain_id: ChainId) -> Result<Option<u64>> {
        let key = BlockTrackerRecord::cache_key(&self.subsystem, chain_id);
        let record: Option<BlockTrackerRecord> = self.cache.get_json(&key).await?;
        Ok(record.map(|r| r.block_number))
    }

    /// Advance the tracked block for a chain.
    ///
    /// Invariant: callers must only call this with a block number ≥ the
    /// previously stored one (the cache itself does not enforce
    /// monotonicity); the Finalized-phase scan and the heartbeat are the
    /// only two call sites and both already satisfy this.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache write fails.
    #[instrument(skip(self), fields(subsystem = %self.subsystem, chain_id = %chain_id, block))]
    pub async fn advance(&self, chain_id: ChainId, block: u64) -> Result<()> {
        let key = BlockTrackerRecord::cache_key(&self.subsystem, chain_id);
        let record = BlockTrackerRecord {
            block_number: block,
            updated_at: Utc::now(),
        };
        self.cache
            .set_json(&key, &record, Duration::from_secs(BlockTrackerRecord::TTL_SECONDS))
            .await?;
        debug!(block, "block tracker advanced");
        Ok(())
    }

    /// Write the heartbeat value if it's higher than (or equal to) what's
    /// currently stored, so a worker that sees no events for a stretch
    /// still bounds its restart catch-up range.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache read or write fails.
    #[instrument(skip(self), fields(subsystem = %self.subsystem, chain_id = %chain_id, block))]
    pub async fn heartbeat(&self, chain_id: ChainId, block: u64) -> Result<()> {
        match self.last_block(chain_id).await? {
            Some(current) if current >= block => {
                debug!(current, block, "heartbeat below current tracked block, skipping");
                Ok(())
            }
            _ => self.advance(chain_id, block).await,
        }
    }
}

impl<C: Cache> std::fmt::Debug for BlockTracker<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockTracker")
            .field("subsystem", &self.subsystem)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ports::cache_mocks::MockCache;

    fn tracker() -> BlockTracker<MockCache> {
        BlockTracker::new(Arc::new(MockCache::new()), "position-liquidity")
    }

    #[tokio::test]
    async fn last_block_is_none_on_cold_cache() {
        let tracker = tracker();
        assert_eq!(tracker.last_block(ChainId::Ethereum).await.unwrap(), None);
    }

    #[tokio::test]
    async fn advance_then_read_roundtrips() {
        let tracker = tracker();
        tracker.advance(ChainId::Ethereum, 100).await.unwrap();
        assert_eq!(tracker.last_block(ChainId::Ethereum).await.unwrap(), Some(100));
    }

    #[tokio::test]
    async fn heartbeat_does_not_regress() {
        let tracker = tracker();
        tracker.advance(ChainId::Ethereum, 100).await.unwrap();
        tracker.heartbeat(ChainId::Ethereum, 50).await.unwrap();
        assert_eq!(tracker.last_block(ChainId::Ethereum).await.unwrap(), Some(100));
    }

    #[tokio::test]
    async fn heartbeat_advances_when_higher() {
        let tracker = tracker();
        tracker.advance(ChainId::Ethereum, 100).await.unwrap();
        tracker.heartbeat(ChainId::Ethereum, 150).await.unwrap();
        assert_eq!(tracker.last_block(ChainId::Ethereum).await.unwrap(), Some(150));
    }

    #[tokio::test]
    async fn tracks_chains_independently() {
        let tracker = tracker();
        tracker.advance(ChainId::Ethereum, 100).await.unwrap();
        tracker.advance(ChainId::Arbitrum, 200).await.unwrap();
        assert_eq!(tracker.last_block(ChainId::Ethereum).await.unwrap(), Some(100));
        assert_eq!(tracker.last_block(ChainId::Arbitrum).await.unwrap(), Some(200));
    }
}
