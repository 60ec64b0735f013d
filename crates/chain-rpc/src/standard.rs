//! Standard EVM chain RPC implementation using alloy.
//!
//! [`StandardChainRpc`] implements [`ChainRpc`] for any EVM chain that
//! exposes a standard JSON-RPC HTTP endpoint for reads/catch-up and a
//! WebSocket endpoint for streaming subscriptions.
//!
//! # Example
//!
//! ```ignore
//! use chain_rpc::{StandardChainRpc, ChainRpc};
//!
//! let rpc = StandardChainRpc::new("https://eth.llamarpc.com", "wss://eth.llamarpc.com").await?;
//! let head = rpc.block_number().await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use alloy::network::Ethereum;
use alloy::primitives::{Address, TxHash};
use alloy::providers::{Provider, ProviderBuilder, RootProvider, WsConnect};
use alloy::rpc::types::{BlockNumberOrTag, Filter, FilterBlockOption, Topic};
use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

use crate::error::{ChainRpcError, Result};
use crate::traits::{ChainRpc, LogSubscription};
use crate::types::{LogFilter, MulticallCall, MulticallResult, TransactionReceipt};

/// Channel capacity for a live log subscription. Large enough to absorb a
/// burst of logs from a single block without the batch consumer stalling
/// the transport task.
const SUBSCRIPTION_CHANNEL_CAPACITY: usize = 256;

/// Multicall3 is deployed at this address on every chain this core
/// targets (Ethereum, Arbitrum, Base, BSC, Polygon, Optimism).
const MULTICALL3_ADDRESS: Address = alloy::primitives::address!("cA11bde05977b3631167028862bE2a173976CA11");

sol! {
    #[sol(rpc)]
    interface IMulticall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct Result {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls) external payable returns (Result[] memory returnData);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STANDARD CHAIN RPC
// ═══════════════════════════════════════════════════════════════════════════════

/// Standard chain RPC adapter for EVM chains without special features.
///
/// Reads (block number, `getLogs`, multicall, receipts) go over HTTP.
/// Streaming subscriptions open a fresh WebSocket connection each time
/// [`subscribe_events`](ChainRpc::subscribe_events) is called; the caller
/// (a `SubscriptionBatch`) owns reconnection.
#[derive(Debug, Clone)]
pub struct StandardChainRpc {
    http: Arc<RootProvider<Ethereum>>,
    ws_url: String,
    chain_id: u64,
}

impl StandardChainRpc {
    /// Connect to a chain given its HTTP RPC URL (for reads) and WebSocket
    /// URL (for streaming).
    ///
    /// # Errors
    ///
    /// Returns an error if either URL is invalid or the chain ID query
    /// fails.
    pub async fn new(http_url: &str, ws_url: &str) -> Result<Self> {
        Self::with_timeout(http_url, ws_url, Duration::from_secs(30)).await
    }

    /// Connect with a custom HTTP request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if either URL is invalid, the HTTP client cannot be
    /// built, or the chain ID query fails.
    pub async fn with_timeout(http_url: &str, ws_url: &str, timeout: Duration) -> Result<Self> {
        let url: reqwest::Url = http_url
            .parse()
            .map_err(|e| ChainRpcError::InvalidConfig(format!("invalid RPC URL: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainRpcError::Connection(format!("failed to build HTTP client: {e}")))?;

        let provider = ProviderBuilder::default().connect_reqwest(client, url);

        let chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| ChainRpcError::Connection(format!("failed to get chain ID: {e}")))?;

        debug!(chain_id, http_url, "connected to EVM chain");

        Ok(Self {
            http: Arc::new(provider),
            ws_url: ws_url.to_string(),
            chain_id,
        })
    }

    /// Access the underlying alloy provider for operations this trait
    /// doesn't cover.
    #[must_use]
    pub fn inner(&self) -> &RootProvider<Ethereum> {
        &self.http
    }

    fn to_alloy_filter(filter: &LogFilter) -> Filter {
        let mut f = Filter::default();

        f = match (filter.from_block, filter.to_block) {
            (Some(from), Some(to)) => f.from_block(from).to_block(to),
            (Some(from), None) => f.from_block(from),
            (None, Some(to)) => f.to_block(to),
            (None, None) => f,
        };

        if !filter.addresses.is_empty() {
            f = f.address(filter.addresses.clone());
        }

        for (position, alternatives) in filter.topics.iter().enumerate() {
            if let Some(topics) = alternatives {
                let topic: Topic = topics.clone().into();
                f = match position {
                    0 => f.event_signature(topic),
                    1 => f.topic1(topic),
                    2 => f.topic2(topic),
                    3 => f.topic3(topic),
                    _ => f,
                };
            }
        }

        f
    }

    fn from_alloy_receipt(
        receipt: &alloy::rpc::types::TransactionReceipt,
    ) -> Result<TransactionReceipt> {
        Ok(TransactionReceipt {
            tx_hash: receipt.transaction_hash,
            block_hash: receipt
                .block_hash
                .ok_or_else(|| ChainRpcError::InvalidResponse("missing block_hash".into()))?,
            block_number: receipt
                .block_number
                .ok_or_else(|| ChainRpcError::InvalidResponse("missing block_number".into()))?,
            tx_index: receipt.transaction_index.unwrap_or(0),
            from: receipt.from,
            to: receipt.to,
            success: receipt.status(),
            logs: receipt.inner.logs().to_vec(),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN RPC IMPLEMENTATION
// ═══════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl ChainRpc for StandardChainRpc {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    #[instrument(skip(self), fields(chain_id = self.chain_id))]
    async fn block_number(&self) -> Result<u64> {
        self.http.get_block_number().await.map_err(ChainRpcError::from)
    }

    #[instrument(skip(self), fields(chain_id = self.chain_id))]
    async fn finalized_block_number(&self) -> Result<Option<u64>> {
        match self
            .http
            .get_block_by_number(BlockNumberOrTag::Finalized)
            .await
        {
            Ok(Some(block)) => Ok(Some(block.header.number)),
            Ok(None) => Ok(None),
            Err(e) => {
                // Not every chain exposes a finalized tag; the caller
                // falls back to a safety-margin heuristic in that case.
                warn!(error = %e, "finalized tag unavailable, caller should use safety margin");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, filter), fields(chain_id = self.chain_id))]
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<alloy::rpc::types::Log>> {
        let alloy_filter = Self::to_alloy_filter(filter);
        self.http
            .get_logs(&alloy_filter)
            .await
            .map_err(ChainRpcError::from)
    }

    #[instrument(skip(self, calls), fields(chain_id = self.chain_id, call_count = calls.len()))]
    async fn multicall(&self, calls: Vec<MulticallCall>) -> Result<Vec<MulticallResult>> {
        let call3s: Vec<IMulticall3::Call3> = calls
            .into_iter()
            .map(|c| IMulticall3::Call3 {
                target: c.target,
                allowFailure: c.allow_failure,
                callData: c.call_data,
            })
            .collect();

        let multicall = IMulticall3::new(MULTICALL3_ADDRESS, &self.http);
        let response = multicall
            .aggregate3(call3s)
            .call()
            .await
            .map_err(|e| ChainRpcError::Rpc {
                code: -32000,
                message: e.to_string(),
            })?;

        Ok(response
            .into_iter()
            .map(|r| MulticallResult {
                success: r.success,
                return_data: r.returnData,
            })
            .collect())
    }

    #[instrument(skip(self), fields(chain_id = self.chain_id))]
    async fn get_transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<TransactionReceipt>> {
        match self.http.get_transaction_receipt(tx_hash).await {
            Ok(Some(receipt)) => Ok(Some(Self::from_alloy_receipt(&receipt)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(ChainRpcError::from(e)),
        }
    }

    #[instrument(skip(self, filter), fields(chain_id = self.chain_id))]
    async fn subscribe_events(&self, filter: LogFilter) -> Result<LogSubscription> {
        let ws = WsConnect::new(self.ws_url.clone());
        let ws_provider = ProviderBuilder::default()
            .connect_ws(ws)
            .await
            .map_err(|e| ChainRpcError::Connection(format!("websocket connect failed: {e}")))?;

        let mut alloy_filter = Self::to_alloy_filter(&filter);
        alloy_filter.block_option = FilterBlockOption::Range {
            from_block: None,
            to_block: None,
        };

        let sub = ws_provider
            .subscribe_logs(&alloy_filter)
            .await
            .map_err(|e| ChainRpcError::Connection(format!("log subscription failed: {e}")))?;

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_CHANNEL_CAPACITY);
        let task = tokio::spawn(async move {
            let mut stream = sub.into_stream();
            while let Some(log) = stream.next().await {
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

    // These tests require a running anvil instance and are ignored by
    // default. Run with: cargo test -p chain-rpc -- --ignored

    #[tokio::test]
    #[ignore = "requires running RPC endpoint"]
    async fn connect_to_anvil() {
        let rpc = StandardChainRpc::new("http://127.0.0.1:8545", "ws://127.0.0.1:8545")
            .await
            .expect("should connect to anvil");

        assert_eq!(rpc.chain_id(), 31337);
    }

    #[tokio::test]
    #[ignore = "requires running RPC endpoint"]
    async fn block_number_advances() {
        let rpc = StandardChainRpc::new("http://127.0.0.1:8545", "ws://127.0.0.1:8545")
            .await
            .expect("should connect");

        let head = rpc.block_number().await.expect("should get block number");
        assert!(head > 0 || head == 0);
    }

    #[tokio::test]
    async fn invalid_url_fails() {
        let result = StandardChainRpc::new("not-a-valid-url", "ws://unused").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("invalid"));
    }

    #[test]
    fn to_alloy_filter_applies_block_range_and_address() {
        let addr: Address = "0x1234567890123456789012345678901234567890"
            .parse()
            .expect("valid");
        let filter = LogFilter::new(100, 200).with_address(addr);

        let alloy_filter = StandardChainRpc::to_alloy_filter(&filter);

        assert_eq!(alloy_filter.get_from_block(), Some(100));
        assert_eq!(alloy_filter.get_to_block(), Some(200));
    }

    #[test]
    fn to_alloy_filter_handles_multiple_event_signatures() {
        let sig_a = alloy::primitives::B256::repeat_byte(0x01);
        let sig_b = alloy::primitives::B256::repeat_byte(0x02);
        let filter = LogFilter::unbounded().with_event_signatures(vec![sig_a, sig_b]);

        let alloy_filter = StandardChainRpc::to_alloy_filter(&filter);
        assert!(alloy_filter.get_from_block().is_none());
    }
}
