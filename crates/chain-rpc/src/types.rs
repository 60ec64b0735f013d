//! Common types for chain RPC operations.
//!
//! - [`LogFilter`] - Filter for querying or subscribing to logs
//! - [`TransactionReceipt`] - Receipt of a confirmed transaction
//! - [`MulticallCall`] / [`MulticallResult`] - Batched read-only contract calls

use alloy::primitives::{Address, Bytes, TxHash, B256};
use alloy::rpc::types::Log;
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// LOG FILTER TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Filter parameters for querying or subscribing to logs.
///
/// The same filter shape backs both a one-shot `eth_getLogs` call (used by
/// the catch-up scan) and a live `eth_subscribe("logs", ...)` subscription,
/// so a [`crate::traits::ChainRpc`] implementation applies identical
/// address/topic matching in both paths.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    /// Starting block (inclusive). `None` for a live subscription.
    pub from_block: Option<u64>,

    /// Ending block (inclusive). `None` for a live subscription.
    pub to_block: Option<u64>,

    /// Contract addresses to filter. When empty, logs from all addresses
    /// are returned. Capped at `MAX_POOLS_PER_CONNECTION` by the caller.
    pub addresses: Vec<Address>,

    /// Topics to filter, one entry per topic position. Each entry is a set
    /// of alternatives (OR'd together); `None` entries are wildcards.
    pub topics: Vec<Option<Vec<B256>>>,
}

impl LogFilter {
    /// Create a new filter for a block range.
    #[must_use]
    pub const fn new(from_block: u64, to_block: u64) -> Self {
        Self {
            from_block: Some(from_block),
            to_block: Some(to_block),
            addresses: Vec::new(),
            topics: Vec::new(),
        }
    }

    /// Create a filter with no block bounds, suitable for a live subscription.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            from_block: None,
            to_block: None,
            addresses: Vec::new(),
            topics: Vec::new(),
        }
    }

    /// Set a single address filter.
    #[must_use]
    pub fn with_address(mut self, address: Address) -> Self {
        self.addresses = vec![address];
        self
    }

    /// Set multiple address filters (one `getLogs` call per window covers
    /// every member of a batch).
    #[must_use]
    pub fn with_addresses(mut self, addresses: Vec<Address>) -> Self {
        self.addresses = addresses;
        self
    }

    /// Add a topic alternative set at a specific position.
    ///
    /// Position 0 is the event signature, positions 1-3 are indexed
    /// parameters. Passing multiple signatures at position 0 lets a single
    /// filter watch several event types at once (e.g.
    /// `IncreaseLiquidity | DecreaseLiquidity | Collect`).
    #[must_use]
    pub fn with_topic(mut self, position: usize, topics: Vec<B256>) -> Self {
        while self.topics.len() <= position {
            self.topics.push(None);
        }
        self.topics[position] = Some(topics);
        self
    }

    /// Set a single event signature (topic 0).
    #[must_use]
    pub fn with_event_signature(self, signature: B256) -> Self {
        self.with_topic(0, vec![signature])
    }

    /// Set the union of event signatures watched at topic 0.
    #[must_use]
    pub fn with_event_signatures(self, signatures: Vec<B256>) -> Self {
        self.with_topic(0, signatures)
    }
}

/// Receipt of a confirmed transaction.
#[derive(Debug, Clone)]
pub struct TransactionReceipt {
    /// Transaction hash.
    pub tx_hash: TxHash,

    /// Block hash the transaction was included in.
    pub block_hash: B256,

    /// Block number the transaction was included in.
    pub block_number: u64,

    /// Index of the transaction in the block.
    pub tx_index: u64,

    /// Address of the sender.
    pub from: Address,

    /// Address of the receiver (`None` for contract creation).
    pub to: Option<Address>,

    /// Whether the transaction succeeded.
    pub success: bool,

    /// Logs emitted by this transaction.
    pub logs: Vec<Log>,
}

impl TransactionReceipt {
    /// Check if the transaction succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MULTICALL TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// One read-only call to batch into a multicall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MulticallCall {
    /// Target contract address.
    pub target: Address,
    /// ABI-encoded calldata.
    pub call_data: Bytes,
    /// When `false`, a revert in this call aborts the whole multicall.
    pub allow_failure: bool,
}

impl MulticallCall {
    /// Create a call that tolerates failure (the default for reconciliation
    /// pollers, which must not let one bad pool/position sour the batch).
    #[must_use]
    pub const fn new(target: Address, call_data: Bytes) -> Self {
        Self {
            target,
            call_data,
            allow_failure: true,
        }
    }

    /// Create a call that aborts the whole multicall on revert.
    #[must_use]
    pub const fn required(target: Address, call_data: Bytes) -> Self {
        Self {
            target,
            call_data,
            allow_failure: false,
        }
    }
}

/// Result of one call within a multicall batch.
#[derive(Debug, Clone)]
pub struct MulticallResult {
    /// Whether the call succeeded.
    pub success: bool,
    /// Return data (empty on failure).
    pub return_data: Bytes,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_builder() {
        let addr: Address = "0x1234567890123456789012345678901234567890"
            .parse()
            .unwrap();
        let topic = B256::repeat_byte(0xab);

        let filter = LogFilter::new(100, 200)
            .with_address(addr)
            .with_event_signature(topic);

        assert_eq!(filter.from_block, Some(100));
        assert_eq!(filter.to_block, Some(200));
        assert_eq!(filter.addresses.len(), 1);
        assert_eq!(filter.topics[0], Some(vec![topic]));
    }

    #[test]
    fn log_filter_multiple_event_signatures() {
        let sig_a = B256::repeat_byte(0x01);
        let sig_b = B256::repeat_byte(0x02);

        let filter = LogFilter::unbounded().with_event_signatures(vec![sig_a, sig_b]);

        assert!(filter.from_block.is_none());
        assert_eq!(filter.topics[0], Some(vec![sig_a, sig_b]));
    }

    #[test]
    fn multicall_call_allow_failure_default() {
        let call = MulticallCall::new(Address::ZERO, Bytes::new());
        assert!(call.allow_failure);

        let required = MulticallCall::required(Address::ZERO, Bytes::new());
        assert!(!required.allow_failure);
    }
}
