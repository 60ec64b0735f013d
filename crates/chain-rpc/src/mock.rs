//! Mock chain RPC for testing.
//!
//! This module provides [`MockChainRpc`], which implements [`ChainRpc`] for
//! use in unit and property-based tests without a real blockchain
//! connection.
//!
//! # Panics
//!
//! The mock's methods panic if internal locks are poisoned, which should
//! only happen if a test panics while holding a lock.

#![allow(clippy::expect_used)]
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use alloy::primitives::TxHash;
use alloy::rpc::types::Log;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{ChainRpcError, Result};
use crate::traits::{ChainRpc, LogSubscription};
use crate::types::{LogFilter, MulticallCall, MulticallResult, TransactionReceipt};

// ═══════════════════════════════════════════════════════════════════════════════
// MOCK CHAIN RPC
// ═══════════════════════════════════════════════════════════════════════════════

/// Mock chain RPC for testing.
///
/// Tests seed canned logs, block numbers, and multicall results, then
/// assert on the ingestion core's behavior without touching the network.
///
/// # Example
///
/// ```
/// use chain_rpc::mock::MockChainRpc;
/// use chain_rpc::ChainRpc;
///
/// #[tokio::main]
/// async fn main() {
///     let rpc = MockChainRpc::new(1);
///     rpc.set_block_number(1000);
///     rpc.set_finalized_block_number(Some(936));
///
///     assert_eq!(rpc.block_number().await.unwrap(), 1000);
///     assert_eq!(rpc.finalized_block_number().await.unwrap(), Some(936));
/// }
/// ```
#[derive(Debug)]
pub struct MockChainRpc {
    chain_id: u64,
    block_number: AtomicU64,
    finalized_block_number: RwLock<Option<u64>>,
    /// Logs served by `get_logs`, keyed by a `(from_block, to_block)` window.
    logs_by_range: RwLock<HashMap<(u64, u64), Vec<Log>>>,
    /// Logs that `subscribe_events` pushes once a subscription is opened.
    streamed_logs: RwLock<Vec<Log>>,
    multicall_results: RwLock<Vec<MulticallResult>>,
    receipts: RwLock<HashMap<TxHash, TransactionReceipt>>,
    get_logs_calls: AtomicU64,
    multicall_calls: AtomicU64,
    subscribe_calls: AtomicU64,
}

impl MockChainRpc {
    /// Create a new mock for the given chain ID, with head and finalized
    /// block both at 0 and no canned responses registered.
    #[must_use]
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            block_number: AtomicU64::new(0),
            finalized_block_number: RwLock::new(None),
            logs_by_range: RwLock::new(HashMap::new()),
            streamed_logs: RwLock::new(Vec::new()),
            multicall_results: RwLock::new(Vec::new()),
            receipts: RwLock::new(HashMap::new()),
            get_logs_calls: AtomicU64::new(0),
            multicall_calls: AtomicU64::new(0),
            subscribe_calls: AtomicU64::new(0),
        }
    }

    /// Set the simulated chain head.
    pub fn set_block_number(&self, block: u64) {
        self.block_number.store(block, Ordering::SeqCst);
    }

    /// Set the simulated finalized block (`None` to simulate a chain
    /// without a finalized tag).
    pub fn set_finalized_block_number(&self, block: Option<u64>) {
        *self.finalized_block_number.write().expect("lock poisoned") = block;
    }

    /// Register the logs `get_logs` should return for an exact
    /// `(from_block, to_block)` window.
    pub fn set_logs_for_range(&self, from_block: u64, to_block: u64, logs: Vec<Log>) {
        self.logs_by_range
            .write()
            .expect("lock poisoned")
            .insert((from_block, to_block), logs);
    }

    /// Set the logs a new subscription immediately replays, simulating a
    /// burst of streaming events.
    pub fn set_streamed_logs(&self, logs: Vec<Log>) {
        *self.streamed_logs.write().expect("lock poisoned") = logs;
    }

    /// Set the results `multicall` returns, regardless of the calls given.
    pub fn set_multicall_results(&self, results: Vec<MulticallResult>) {
        *self.multicall_results.write().expect("lock poisoned") = results;
    }

    /// Register a receipt to be returned for a transaction hash.
    pub fn set_receipt(&self, tx_hash: TxHash, receipt: TransactionReceipt) {
        self.receipts
            .write()
            .expect("lock poisoned")
            .insert(tx_hash, receipt);
    }

    /// Number of times `get_logs` has been called.
    #[must_use]
    pub fn get_logs_call_count(&self) -> u64 {
        self.get_logs_calls.load(Ordering::SeqCst)
    }

    /// Number of times `multicall` has been called.
    #[must_use]
    pub fn multicall_call_count(&self) -> u64 {
        self.multicall_calls.load(Ordering::SeqCst)
    }

    /// Number of times `subscribe_events` has been called.
    #[must_use]
    pub fn subscribe_call_count(&self) -> u64 {
        self.subscribe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainRpc for MockChainRpc {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn block_number(&self) -> Result<u64> {
        Ok(self.block_number.load(Ordering::SeqCst))
    }

    async fn finalized_block_number(&self) -> Result<Option<u64>> {
        Ok(*self.finalized_block_number.read().expect("lock poisoned"))
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>> {
        self.get_logs_calls.fetch_add(1, Ordering::SeqCst);
        let (Some(from), Some(to)) = (filter.from_block, filter.to_block) else {
            return Err(ChainRpcError::InvalidConfig(
                "get_logs requires a bounded range".into(),
            ));
        };
        Ok(self
            .logs_by_range
            .read()
            .expect("lock poisoned")
            .get(&(from, to))
            .cloned()
            .unwrap_or_default())
    }

    async fn multicall(&self, calls: Vec<MulticallCall>) -> Result<Vec<MulticallResult>> {
        self.multicall_calls.fetch_add(1, Ordering::SeqCst);
        let canned = self.multicall_results.read().expect("lock poisoned");
        if canned.is_empty() {
            // No canned results registered: default to success with empty
            // return data for every call, so tests that don't care about
            // multicall output aren't forced to set it up.
            Ok(calls
                .iter()
                .map(|_| MulticallResult {
                    success: true,
                    return_data: Default::default(),
                })
                .collect())
        } else {
            Ok(canned.clone())
        }
    }

    async fn get_transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<TransactionReceipt>> {
        Ok(self
            .receipts
            .read()
            .expect("lock poisoned")
            .get(&tx_hash)
            .cloned())
    }

    async fn subscribe_events(&self, _filter: LogFilter) -> Result<LogSubscription> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let logs = self.streamed_logs.read().expect("lock poisoned").clone();
        let (tx, rx) = mpsc::channel(logs.len().max(1));
        let task = tokio::spawn(async move {
            for log in logs {
                if tx.send(log).await.is_err() {
                    break;
                }
            }
        });
        Ok(LogSubscription::new(rx, task))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn block_number_defaults_to_zero() {
        let rpc = MockChainRpc::new(1);
        assert_eq!(rpc.block_number().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn set_and_get_finalized_block_number() {
        let rpc = MockChainRpc::new(1);
        rpc.set_finalized_block_number(Some(500));
        assert_eq!(rpc.finalized_block_number().await.unwrap(), Some(500));
    }

    #[tokio::test]
    async fn get_logs_requires_bounded_range() {
        let rpc = MockChainRpc::new(1);
        let filter = LogFilter::unbounded();
        assert!(rpc.get_logs(&filter).await.is_err());
    }

    #[tokio::test]
    async fn get_logs_returns_registered_range() {
        let rpc = MockChainRpc::new(1);
        rpc.set_logs_for_range(100, 200, vec![]);
        let filter = LogFilter::new(100, 200);
        let logs = rpc.get_logs(&filter).await.unwrap();
        assert!(logs.is_empty());
        assert_eq!(rpc.get_logs_call_count(), 1);
    }

    #[tokio::test]
    async fn multicall_defaults_to_success() {
        let rpc = MockChainRpc::new(1);
        let calls = vec![
            MulticallCall::new(alloy::primitives::Address::ZERO, Default::default()),
            MulticallCall::new(alloy::primitives::Address::ZERO, Default::default()),
        ];
        let results = rpc.multicall(calls).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(rpc.multicall_call_count(), 1);
    }

    #[tokio::test]
    async fn subscribe_events_replays_streamed_logs_then_closes() {
        let rpc = MockChainRpc::new(1);
        let mut sub = rpc
            .subscribe_events(LogFilter::unbounded())
            .await
            .unwrap();
        assert!(sub.recv().await.is_none());
        assert_eq!(rpc.subscribe_call_count(), 1);
    }

    #[tokio::test]
    async fn get_transaction_receipt_unknown_hash_is_none() {
        let rpc = MockChainRpc::new(1);
        let receipt = rpc.get_transaction_receipt(TxHash::ZERO).await.unwrap();
        assert!(receipt.is_none());
    }
}
