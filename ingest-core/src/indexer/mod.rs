//! Core indexing logic for on-chain Uniswap-V3 position tracking.
//!
//! Two complementary paths feed the same message-bus exchanges:
//!
//! - [`SubscriptionBatch`] holds a live log subscription for up to
//!   [`MAX_PER_BATCH`] filter keys and dispatches each delivered log
//!   immediately (or into a buffer, while catch-up is in flight).
//! - [`CatchUpOrchestrator`] replays historical logs a streaming
//!   subscription would have missed, split at the chain's finalized block.
//!
//! [`BlockTracker`] is the cache-backed high-water mark both paths consult
//! to bound their replay range and advance once logs are durably published.
//!
//! # Usage
//!
//! ```ignore
//! use ingest_core::indexer::{BlockTracker, CatchUpOrchestrator, SubscriptionBatch};
//!
//! let tracker = BlockTracker::new(cache, "position-liquidity");
//! let orchestrator = CatchUpOrchestrator::new(rpc.clone(), chain_id);
//! let batch = Arc::new(SubscriptionBatch::new(rpc, publisher, classifier, chain_id));
//! batch.start().await?;
//! ```

mod block_tracker;
mod catchup_orchestrator;
mod subscription_batch;

pub use block_tracker::BlockTracker;
pub use catchup_orchestrator::{CatchUpOrchestrator, PhaseResult, DEFAULT_BATCH_SIZE_BLOCKS};
pub use subscription_batch::{LogClassifier, SubscriptionBatch, MAX_PER_BATCH};
