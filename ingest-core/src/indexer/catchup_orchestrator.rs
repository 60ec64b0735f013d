//! `CatchUpOrchestrator`: reorg-safe finalized/non-finalized gap replay.
//!
//! For a given chain and set of filter keys, replays all historical logs
//! the streaming subscription would have missed, in blockchain order,
//! exactly once under steady-state conditions. The chain's head is split
//! at the finalized block `F`: a blocking **non-finalized** scan covers
//! `[F+1, C]` and never advances the cached last-block (reorgs are still
//! possible there); a background **finalized** scan covers
//! `[max(cached, deployment), F]` and advances the cache on success.

use alloy::primitives::{Address, B256};
use alloy::rpc::types::Log;
use chain_rpc::{ChainRpc, LogFilter};
use tracing::{instrument, warn};

use crate::error::Result;
use crate::types::primitives::ChainId;

/// Fixed-size window, in blocks, for each `eth_getLogs` request — the
/// common provider cap for a single call.
pub const DEFAULT_BATCH_SIZE_BLOCKS: u64 = 10_000;

/// Result of scanning one phase (finalized or non-finalized).
#[derive(Debug, Clone)]
pub struct PhaseResult {
    /// Total logs found across all windows, before deduplication.
    pub events_found: usize,
    /// Logs actually published (after dedup).
    pub events_published: usize,
    /// Start of the scanned range (inclusive).
    pub from_block: u64,
    /// End of the scanned range (inclusive).
    pub to_block: u64,
    /// First window-scan error encountered, if any. The phase still
    /// continues past a failed window.
    pub error: Option<String>,
}

/// Replays historical logs for one `(chainId, addresses, topics)` target.
pub struct CatchUpOrchestrator<R> {
    rpc: R,
    chain_id: ChainId,
    batch_size_blocks: u64,
}

impl<R: ChainRpc> CatchUpOrchestrator<R> {
    /// Build an orchestrator for a chain, using the default window size.
    #[must_use]
    pub const fn new(rpc: R, chain_id: ChainId) -> Self {
        Self {
            rpc,
            chain_id,
            batch_size_blocks: DEFAULT_BATCH_SIZE_BLOCKS,
        }
    }

    /// Override the per-window block count (tests use small windows).
    #[must_use]
    pub const fn with_batch_size_blocks(mut self, batch_size_blocks: u64) -> Self {
        self.batch_size_blocks = batch_size_blocks;
        self
    }

    /// Determine the finalized/head split for this chain.
    ///
    /// Uses the RPC's `finalized` tag if available, otherwise falls back
    /// to `head - chain_id.finality_margin()`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying RPC calls fail.
    #[instrument(skip(self), fields(chain_id = %self.chain_id))]
    pub async fn finality_split(&self) -> Result<(u64, u64)> {
        let head = self.rpc.block_number().await?;
        let finalized = match self.rpc.finalized_block_number().await? {
            Some(f) => f,
            None => head.saturating_sub(self.chain_id.finality_margin()),
        };
        Ok((finalized, head))
    }

    /// Scan a bounded range, windowed at `batch_size_blocks`, deduplicated
    /// by `(transactionHash, logIndex)` and sorted by `(blockNumber,
    /// logIndex)`.
    ///
    /// A failed window is logged and skipped; the scan continues with
    /// subsequent windows. This never touches the `BlockTracker` cache —
    /// callers decide whether/how to advance it based on which phase this
    /// scan belongs to.
    ///
    /// # Errors
    ///
    /// This method itself does not fail on a per-window RPC error (those
    /// are captured in the returned [`PhaseResult`]); it can still fail if
    /// `from > to`.
    #[instrument(skip(self, addresses, topics), fields(chain_id = %self.chain_id, from, to))]
    pub async fn scan_range(
        &self,
        from: u64,
        to: u64,
        addresses: Vec<Address>,
        topics: Vec<Option<Vec<B256>>>,
    ) -> Result<(PhaseResult, Vec<Log>)> {
        if from > to {
            return Ok((
                PhaseResult {
                    events_found: 0,
                    events_published: 0,
                    from_block: from,
                    to_block: to,
                    error: None,
                },
                Vec::new(),
            ));
        }

        let mut all_logs = Vec::new();
        let mut first_error = None;
        let mut window_start = from;

        while window_start <= to {
            let window_end = window_start
                .saturating_add(self.batch_size_blocks - 1)
                .min(to);

            let mut filter = LogFilter::new(window_start, window_end).with_addresses(addresses.clone());
            for (position, alternatives) in topics.iter().enumerate() {
                if let Some(alternatives) = alternatives {
                    filter = filter.with_topic(position, alternatives.clone());
                }
            }

            match self.rpc.get_logs(&filter).await {
                Ok(logs) => all_logs.extend(logs),
                Err(e) => {
                    warn!(
                        chain_id = %self.chain_id,
                        from = window_start,
                        to = window_end,
                        error = %e,
                        "catch-up window scan failed, continuing"
                    );
                    if first_error.is_none() {
                        first_error = Some(e.to_string());
                    }
                }
            }

            window_start = window_end + 1;
        }

        let events_found = all_logs.len();
        let deduped = dedup_and_sort(all_logs);
        let events_published = deduped.len();

        Ok((
            PhaseResult {
                events_found,
                events_published,
                from_block: from,
                to_block: to,
                error: first_error,
            },
            deduped,
        ))
    }
}

/// Deduplicate by `(transactionHash, logIndex)` and sort by
/// `(blockNumber, logIndex)`.
fn dedup_and_sort(logs: Vec<Log>) -> Vec<Log> {
    use std::collections::HashSet;

    let mut seen: HashSet<(B256, u64)> = HashSet::with_capacity(logs.len());
    let mut deduped: Vec<Log> = logs
        .into_iter()
        .filter(|log| {
            let key = (
                log.transaction_hash.unwrap_or_default(),
                log.log_index.unwrap_or_default(),
            );
            seen.insert(key)
        })
        .collect();

    deduped.sort_by_key(|log| (log.block_number.unwrap_or_default(), log.log_index.unwrap_or_default()));
    deduped
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, B256};
    use alloy::rpc::types::Log as RpcLog;
    use chain_rpc::mock::MockChainRpc;

    fn log_at(block_number: u64, log_index: u64, tx_hash: B256) -> RpcLog {
        RpcLog {
            inner: alloy::primitives::Log {
                address: Address::ZERO,
                data: alloy::primitives::LogData::new(vec![], alloy::primitives::Bytes::new()).unwrap(),
            },
            block_hash: None,
            block_number: Some(block_number),
            block_timestamp: None,
            transaction_hash: Some(tx_hash),
            transaction_index: None,
            log_index: Some(log_index),
            removed: false,
        }
    }

    #[tokio::test]
    async fn finality_split_uses_rpc_tag_when_present() {
        let rpc = MockChainRpc::new(1);
        rpc.set_block_number(1000);
        rpc.set_finalized_block_number(Some(936));

        let orchestrator = CatchUpOrchestrator::new(rpc, ChainId::Ethereum);
        let (finalized, head) = orchestrator.finality_split().await.unwrap();
        assert_eq!(finalized, 936);
        assert_eq!(head, 1000);
    }

    #[tokio::test]
    async fn finality_split_falls_back_to_safety_margin() {
        let rpc = MockChainRpc::new(1);
        rpc.set_block_number(1000);
        rpc.set_finalized_block_number(None);

        let orchestrator = CatchUpOrchestrator::new(rpc, ChainId::Ethereum);
        let (finalized, head) = orchestrator.finality_split().await.unwrap();
        assert_eq!(finalized, 1000 - ChainId::Ethereum.finality_margin());
        assert_eq!(head, 1000);
    }

    #[tokio::test]
    async fn scan_range_dedupes_by_tx_hash_and_log_index() {
        let rpc = MockChainRpc::new(1);
        let tx = B256::repeat_byte(1);
        rpc.set_logs_for_range(0, 9, vec![log_at(5, 0, tx), log_at(5, 0, tx)]);

        let orchestrator = CatchUpOrchestrator::new(rpc, ChainId::Ethereum);
        let (result, logs) = orchestrator
            .scan_range(0, 9, vec![Address::ZERO], vec![])
            .await
            .unwrap();

        assert_eq!(result.events_found, 2);
        assert_eq!(result.events_published, 1);
        assert_eq!(logs.len(), 1);
    }

    #[tokio::test]
    async fn scan_range_sorts_by_block_then_log_index() {
        let rpc = MockChainRpc::new(1);
        let tx_a = B256::repeat_byte(1);
        let tx_b = B256::repeat_byte(2);
        let tx_c = B256::repeat_byte(3);
        rpc.set_logs_for_range(
            0,
            9,
            vec![log_at(7, 1, tx_b), log_at(5, 2, tx_a), log_at(5, 0, tx_c)],
        );

        let orchestrator = CatchUpOrchestrator::new(rpc, ChainId::Ethereum);
        let (_, logs) = orchestrator
            .scan_range(0, 9, vec![Address::ZERO], vec![])
            .await
            .unwrap();

        let ordering: Vec<(u64, u64)> = logs
            .iter()
            .map(|l| (l.block_number.unwrap(), l.log_index.unwrap()))
            .collect();
        assert_eq!(ordering, vec![(5, 0), (5, 2), (7, 1)]);
    }

    #[tokio::test]
    async fn scan_range_windows_at_batch_size() {
        let rpc = MockChainRpc::new(1);
        rpc.set_logs_for_range(0, 4, vec![log_at(2, 0, B256::repeat_byte(1))]);
        rpc.set_logs_for_range(5, 9, vec![log_at(7, 0, B256::repeat_byte(2))]);

        let orchestrator = CatchUpOrchestrator::new(rpc, ChainId::Ethereum).with_batch_size_blocks(5);
        let (result, logs) = orchestrator
            .scan_range(0, 9, vec![Address::ZERO], vec![])
            .await
            .unwrap();

        assert_eq!(result.events_found, 2);
        assert_eq!(logs.len(), 2);
    }

    #[tokio::test]
    async fn empty_range_returns_no_logs() {
        let rpc = MockChainRpc::new(1);
        let orchestrator = CatchUpOrchestrator::new(rpc, ChainId::Ethereum);
        let (result, logs) = orchestrator
            .scan_range(100, 50, vec![Address::ZERO], vec![])
            .await
            .unwrap();
        assert_eq!(result.events_found, 0);
        assert!(logs.is_empty());
    }
}
