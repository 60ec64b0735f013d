//! Core trait for chain RPC access.
//!
//! This module defines the single abstraction every ingestion worker talks
//! to instead of an alloy provider directly:
//!
//! - [`ChainRpc`] - block heights, log scanning, multicall, receipts, and
//!   streaming event subscriptions
//! - [`LogSubscription`] - a live feed of logs backed by a background task
//!
//! # Design Philosophy
//!
//! This trait is designed to:
//! - **Be chain-agnostic**: work with any EVM-compatible chain
//! - **Separate catch-up from streaming**: [`get_logs`](ChainRpc::get_logs)
//!   is a bounded one-shot scan; [`subscribe_events`](ChainRpc::subscribe_events)
//!   is a live feed. Reconnection policy belongs to the caller
//!   (the subscription batch), not this trait.
//! - **Support testing**: a mock implementation satisfies the same trait
//!   object callers use in production.
//!
//! # Example
//!
//! ```ignore
//! use chain_rpc::{ChainRpc, LogFilter};
//!
//! async fn scan_window<R: ChainRpc>(rpc: &R, from: u64, to: u64) -> chain_rpc::Result<usize> {
//!     let filter = LogFilter::new(from, to);
//!     let logs = rpc.get_logs(&filter).await?;
//!     Ok(logs.len())
//! }
//! ```

use alloy::primitives::TxHash;
use alloy::rpc::types::Log;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::types::{LogFilter, MulticallCall, MulticallResult, TransactionReceipt};

// ═══════════════════════════════════════════════════════════════════════════════
// LOG SUBSCRIPTION
// ═══════════════════════════════════════════════════════════════════════════════

/// A live feed of logs matching a filter.
///
/// Backed by a background task that forwards decoded logs onto a bounded
/// channel. The subscription ends (the channel closes) when the underlying
/// transport drops the connection; callers are expected to call
/// [`ChainRpc::subscribe_events`] again to reconnect, applying their own
/// backoff policy.
#[derive(Debug)]
pub struct LogSubscription {
    receiver: mpsc::Receiver<Log>,
    task: JoinHandle<()>,
}

impl LogSubscription {
    /// Build a subscription from a receiver and the task that feeds it.
    #[must_use]
    pub const fn new(receiver: mpsc::Receiver<Log>, task: JoinHandle<()>) -> Self {
        Self { receiver, task }
    }

    /// Receive the next log, or `None` once the feed has closed.
    pub async fn recv(&mut self) -> Option<Log> {
        self.receiver.recv().await
    }

    /// Tear down the subscription's background task.
    pub fn close(&self) {
        self.task.abort();
    }
}

impl Drop for LogSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN RPC TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Core trait for interacting with any EVM chain's read side.
///
/// Implementations handle chain-specific RPC quirks while presenting a
/// uniform interface to the ingestion core. There is no write path here;
/// this crate is concerned only with observing chain state.
#[async_trait]
pub trait ChainRpc: Send + Sync + 'static {
    /// Chain identifier (e.g. 1 for Ethereum mainnet, 42161 for Arbitrum).
    fn chain_id(&self) -> u64;

    /// Current chain head, as reported by the RPC endpoint.
    async fn block_number(&self) -> Result<u64>;

    /// The latest finalized block, if the endpoint exposes a `finalized`
    /// tag. Callers fall back to a per-chain safety margin when this
    /// returns `Ok(None)`.
    async fn finalized_block_number(&self) -> Result<Option<u64>>;

    /// Scan a bounded block range for matching logs.
    ///
    /// Implementations should not silently truncate results; if the
    /// underlying endpoint rejects the range (too many blocks, too many
    /// results) the error should propagate so the caller can shrink its
    /// window and retry.
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>>;

    /// Execute a batch of read-only calls in a single round trip.
    ///
    /// Calls with `allow_failure: true` report their failure in the
    /// corresponding [`MulticallResult`] rather than failing the whole
    /// batch.
    async fn multicall(&self, calls: Vec<MulticallCall>) -> Result<Vec<MulticallResult>>;

    /// Fetch a transaction receipt, if the transaction has been mined.
    async fn get_transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<TransactionReceipt>>;

    /// Open a live subscription for logs matching `filter`.
    ///
    /// `filter.from_block`/`to_block` are ignored; a subscription always
    /// starts from "now". The returned [`LogSubscription`] yields logs in
    /// delivery order, including logs with `removed: true` for reorged
    /// blocks — the caller is responsible for dropping those.
    async fn subscribe_events(&self, filter: LogFilter) -> Result<LogSubscription>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// BLANKET IMPLEMENTATION
// ═══════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl<T: ChainRpc + ?Sized> ChainRpc for std::sync::Arc<T> {
    fn chain_id(&self) -> u64 {
        (**self).chain_id()
    }

    async fn block_number(&self) -> Result<u64> {
        (**self).block_number().await
    }

    async fn finalized_block_number(&self) -> Result<Option<u64>> {
        (**self).finalized_block_number().await
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>> {
        (**self).get_logs(filter).await
    }

    async fn multicall(&self, calls: Vec<MulticallCall>) -> Result<Vec<MulticallResult>> {
        (**self).multicall(calls).await
    }

    async fn get_transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<TransactionReceipt>> {
        (**self).get_transaction_receipt(tx_hash).await
    }

    async fn subscribe_events(&self, filter: LogFilter) -> Result<LogSubscription> {
        (**self).subscribe_events(filter).await
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    struct StubRpc {
        chain_id: u64,
    }

    #[async_trait]
    impl ChainRpc for StubRpc {
        fn chain_id(&self) -> u64 {
            self.chain_id
        }

        async fn block_number(&self) -> Result<u64> {
            Ok(1000)
        }

        async fn finalized_block_number(&self) -> Result<Option<u64>> {
            Ok(Some(936))
        }

        async fn get_logs(&self, _filter: &LogFilter) -> Result<Vec<Log>> {
            Ok(vec![])
        }

        async fn multicall(&self, calls: Vec<MulticallCall>) -> Result<Vec<MulticallResult>> {
            Ok(calls
                .into_iter()
                .map(|_| MulticallResult {
                    success: true,
                    return_data: Default::default(),
                })
                .collect())
        }

        async fn get_transaction_receipt(
            &self,
            _tx_hash: TxHash,
        ) -> Result<Option<TransactionReceipt>> {
            Ok(None)
        }

        async fn subscribe_events(&self, _filter: LogFilter) -> Result<LogSubscription> {
            let (tx, rx) = mpsc::channel(1);
            drop(tx);
            let task = tokio::spawn(async {});
            Ok(LogSubscription::new(rx, task))
        }
    }

    #[tokio::test]
    async fn stub_chain_id() {
        let rpc = StubRpc { chain_id: 8453 };
        assert_eq!(rpc.chain_id(), 8453);
    }

    #[tokio::test]
    async fn stub_block_number() {
        let rpc = StubRpc { chain_id: 1 };
        assert_eq!(rpc.block_number().await.unwrap(), 1000);
    }

    #[tokio::test]
    async fn arc_rpc_delegates() {
        let rpc = std::sync::Arc::new(StubRpc { chain_id: 42 });
        assert_eq!(rpc.chain_id(), 42);
        assert_eq!(rpc.finalized_block_number().await.unwrap(), Some(936));
    }

    #[tokio::test]
    async fn multicall_preserves_call_count() {
        let rpc = StubRpc { chain_id: 1 };
        let calls = vec![
            MulticallCall::new(alloy::primitives::Address::ZERO, Default::default()),
            MulticallCall::new(alloy::primitives::Address::ZERO, Default::default()),
        ];
        let results = rpc.multicall(calls).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn subscription_closes_when_sender_dropped() {
        let rpc = StubRpc { chain_id: 1 };
        let mut sub = rpc.subscribe_events(LogFilter::unbounded()).await.unwrap();
        assert!(sub.recv().await.is_none());
    }
}
