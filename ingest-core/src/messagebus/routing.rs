//! Exchange names and routing-key builders for the message bus.
//!
//! `domain-events` routing keys are built by
//! [`crate::ports::EventPublisher::publish_domain_event`]'s default method;
//! the builders here cover the four component-specific exchanges.

use crate::types::enums::NfpmTransferKind;
use crate::types::primitives::ChainId;

/// Pool price/swap events, keyed by pool address.
pub const EXCHANGE_POOL_PRICES: &str = "pool-prices";
/// Position increase/decrease/collect liquidity events, keyed by NFT id.
pub const EXCHANGE_POSITION_LIQUIDITY_EVENTS: &str = "position-liquidity-events";
/// Close-order lifecycle events, keyed by NFT id and trigger mode.
pub const EXCHANGE_CLOSE_ORDER_EVENTS: &str = "close-order-events";
/// NFT Position Manager transfer events, keyed by mint/burn/transfer and NFT id.
pub const EXCHANGE_NFPM_TRANSFER_EVENTS: &str = "nfpm-transfer-events";
/// Platform-wide domain event envelopes.
pub const EXCHANGE_DOMAIN_EVENTS: &str = "domain-events";

/// All exchanges declared on (re)connect. Each is a durable, non-auto-delete
/// topic exchange.
pub const ALL_EXCHANGES: &[&str] = &[
    EXCHANGE_POOL_PRICES,
    EXCHANGE_POSITION_LIQUIDITY_EVENTS,
    EXCHANGE_CLOSE_ORDER_EVENTS,
    EXCHANGE_NFPM_TRANSFER_EVENTS,
    EXCHANGE_DOMAIN_EVENTS,
];

/// `uniswapv3.{chainId}.{poolAddress}`, address lowercased.
#[must_use]
pub fn pool_price_routing_key(chain_id: ChainId, pool_address: &str) -> String {
    format!("uniswapv3.{chain_id}.{}", pool_address.to_lowercase())
}

/// `uniswapv3.{chainId}.{nftId}`.
#[must_use]
pub fn position_liquidity_routing_key(chain_id: ChainId, nft_id: u64) -> String {
    format!("uniswapv3.{chain_id}.{nft_id}")
}

/// `closer.{chainId}.{nftId}.{triggerMode}`.
#[must_use]
pub fn close_order_routing_key(chain_id: ChainId, nft_id: u64, trigger_mode: &str) -> String {
    format!("closer.{chain_id}.{nft_id}.{trigger_mode}")
}

/// `uniswapv3.{chainId}.{mint|burn|transfer}.{nftId}`.
#[must_use]
pub fn nfpm_transfer_routing_key(chain_id: ChainId, kind: NfpmTransferKind, nft_id: u64) -> String {
    format!("uniswapv3.{chain_id}.{}.{nft_id}", kind.routing_segment())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_price_key_lowercases_address() {
        let key = pool_price_routing_key(ChainId::Ethereum, "0xABCDEF");
        assert_eq!(key, "uniswapv3.1.0xabcdef");
    }

    #[test]
    fn position_liquidity_key_format() {
        assert_eq!(
            position_liquidity_routing_key(ChainId::Arbitrum, 42),
            "uniswapv3.42161.42"
        );
    }

    #[test]
    fn close_order_key_format() {
        assert_eq!(
            close_order_routing_key(ChainId::Ethereum, 7, "stop-loss"),
            "closer.1.7.stop-loss"
        );
    }

    #[test]
    fn nfpm_transfer_key_format() {
        assert_eq!(
            nfpm_transfer_routing_key(ChainId::Ethereum, NfpmTransferKind::Mint, 7),
            "uniswapv3.1.mint.7"
        );
        assert_eq!(
            nfpm_transfer_routing_key(ChainId::Ethereum, NfpmTransferKind::Burn, 7),
            "uniswapv3.1.burn.7"
        );
    }

    #[test]
    fn all_exchanges_lists_five() {
        assert_eq!(ALL_EXCHANGES.len(), 5);
    }
}
