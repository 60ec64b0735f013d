//! Strongly-typed event structures decoded from Uniswap-V3 contracts, plus
//! the domain-event envelope published to the message bus.
//!
//! Each `*Event` struct corresponds to a Solidity event emitted by a pool,
//! the NFT Position Manager, or the closer/order contract. Events are
//! decoded from blockchain logs and enriched with metadata before being
//! folded into a [`DomainEventEnvelope`] for publication.

use alloy::primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::primitives::ChainId;

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT METADATA
// ═══════════════════════════════════════════════════════════════════════════════

/// Metadata attached to every indexed event.
///
/// This provides context about where and when the event occurred on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Block number where the event was emitted.
    pub block_number: u64,
    /// Hash of the block containing this event.
    pub block_hash: B256,
    /// Transaction hash that emitted this event.
    pub tx_hash: B256,
    /// Index of the transaction within the block.
    pub tx_index: u64,
    /// Index of the log within the transaction.
    pub log_index: u64,
    /// Timestamp when the block was mined, if known at decode time.
    pub timestamp: Option<DateTime<Utc>>,
    /// Contract address that emitted this event.
    pub contract: Address,
}

// ═══════════════════════════════════════════════════════════════════════════════
// UNIFIED EVENT ENUM
// ═══════════════════════════════════════════════════════════════════════════════

/// Unified enum for every decoded on-chain event this core understands.
///
/// Use pattern matching to handle specific event types; new variants may be
/// added as contracts this core watches evolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
#[non_exhaustive]
pub enum ChainEvent {
    /// Liquidity was added to a position.
    IncreaseLiquidity(IncreaseLiquidityEvent),
    /// Liquidity was removed from a position.
    DecreaseLiquidity(DecreaseLiquidityEvent),
    /// Owed tokens were collected from a position.
    Collect(CollectEvent),
    /// A swap occurred in a pool, moving its price.
    Swap(SwapEvent),
    /// An NFT position token was transferred (mint/burn/transfer).
    NfpmTransfer(NfpmTransferEvent),
    /// A close-order lifecycle event fired on the closer contract.
    CloseOrderEvent(CloseOrderLifecycleEvent),
}

impl ChainEvent {
    /// Get the metadata for this event.
    #[must_use]
    pub const fn metadata(&self) -> &EventMetadata {
        match self {
            Self::IncreaseLiquidity(e) => &e.meta,
            Self::DecreaseLiquidity(e) => &e.meta,
            Self::Collect(e) => &e.meta,
            Self::Swap(e) => &e.meta,
            Self::NfpmTransfer(e) => &e.meta,
            Self::CloseOrderEvent(e) => &e.meta,
        }
    }

    /// Event type name, used for logging and metrics labels.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::IncreaseLiquidity(_) => "IncreaseLiquidity",
            Self::DecreaseLiquidity(_) => "DecreaseLiquidity",
            Self::Collect(_) => "Collect",
            Self::Swap(_) => "Swap",
            Self::NfpmTransfer(_) => "NfpmTransfer",
            Self::CloseOrderEvent(_) => "CloseOrderEvent",
        }
    }
}

/// Liquidity was added to a position (NFPM `IncreaseLiquidity`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncreaseLiquidityEvent {
    /// Event metadata.
    pub meta: EventMetadata,
    /// NFT position ID.
    pub token_id: U256,
    /// Liquidity added.
    pub liquidity: U256,
    /// Amount of token0 deposited.
    pub amount0: U256,
    /// Amount of token1 deposited.
    pub amount1: U256,
}

/// Liquidity was removed from a position (NFPM `DecreaseLiquidity`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecreaseLiquidityEvent {
    /// Event metadata.
    pub meta: EventMetadata,
    /// NFT position ID.
    pub token_id: U256,
    /// Liquidity removed.
    pub liquidity: U256,
    /// Amount of token0 owed as a result.
    pub amount0: U256,
    /// Amount of token1 owed as a result.
    pub amount1: U256,
}

/// Owed tokens were collected from a position (NFPM `Collect`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectEvent {
    /// Event metadata.
    pub meta: EventMetadata,
    /// NFT position ID.
    pub token_id: U256,
    /// Recipient of the collected tokens.
    pub recipient: Address,
    /// Amount of token0 collected.
    pub amount0: U256,
    /// Amount of token1 collected.
    pub amount1: U256,
}

/// A swap occurred in a pool, moving its sqrt price (pool `Swap`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapEvent {
    /// Event metadata.
    pub meta: EventMetadata,
    /// Initiator of the swap.
    pub sender: Address,
    /// Recipient of the output token.
    pub recipient: Address,
    /// Signed delta of token0 (negative = pool paid out).
    pub amount0: alloy::primitives::I256,
    /// Signed delta of token1 (negative = pool paid out).
    pub amount1: alloy::primitives::I256,
    /// New sqrt price, Q64.96 fixed point.
    pub sqrt_price_x96: U256,
    /// Pool liquidity after the swap.
    pub liquidity: U256,
    /// New tick after the swap.
    pub tick: i32,
}

/// An ERC-721 transfer of a position NFT (mint/burn/ordinary transfer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NfpmTransferEvent {
    /// Event metadata.
    pub meta: EventMetadata,
    /// Sender (zero address for a mint).
    pub from: Address,
    /// Recipient (zero address for a burn).
    pub to: Address,
    /// NFT position ID transferred.
    pub token_id: U256,
}

/// A lifecycle event on a close/limit-order contract keyed by NFT id and
/// trigger mode (e.g. stop-loss vs take-profit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseOrderLifecycleEvent {
    /// Event metadata.
    pub meta: EventMetadata,
    /// NFT position ID the order watches.
    pub token_id: U256,
    /// Which trigger condition fired or changed.
    pub trigger_mode: String,
    /// Free-form lifecycle phase (e.g. `"armed"`, `"triggered"`, `"cancelled"`).
    pub phase: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// DOMAIN EVENT ENVELOPE
// ═══════════════════════════════════════════════════════════════════════════════

/// Kind of entity a [`DomainEventEnvelope`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// A Uniswap-V3 liquidity position (keyed by NFT id).
    Position,
    /// A Uniswap-V3 pool (keyed by pool address).
    Pool,
    /// A close/limit order on a position.
    CloseOrder,
    /// A tracked wallet.
    Wallet,
    /// A subscriber row driving poll-based tracking.
    Subscriber,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Position => "position",
            Self::Pool => "pool",
            Self::CloseOrder => "close_order",
            Self::Wallet => "wallet",
            Self::Subscriber => "subscriber",
        };
        write!(f, "{s}")
    }
}

/// A self-describing domain event published to the message bus.
///
/// Consumers filter by routing-key glob rather than by deserialising and
/// branching on `type`; `type` and `payload` are still included so a
/// consumer that already decoded the envelope need not re-parse the
/// routing key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEventEnvelope {
    /// Event type, e.g. `"position.created"`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Chain the event originated on.
    pub chain_id: ChainId,
    /// Identifier of the subject entity (NFT id, pool address, ...).
    pub entity_id: String,
    /// Kind of entity `entity_id` identifies.
    pub entity_type: EntityType,
    /// Owning user/wallet, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Event-specific payload, already JSON-serialised domain data.
    pub payload: serde_json::Value,
    /// Where this envelope originated (e.g. `"subscription-batch"`,
    /// `"catchup-orchestrator"`, `"rule:daily-nav-snapshot"`).
    pub source: String,
    /// When this envelope was constructed (not necessarily when the
    /// underlying chain event was mined).
    pub received_at: DateTime<Utc>,
    /// Block number the event was observed at, if on-chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Transaction hash, if on-chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<B256>,
    /// Log index within the transaction, if on-chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_index: Option<u64>,
}

impl DomainEventEnvelope {
    /// Serialise to the wire format: UTF-8 JSON.
    ///
    /// # Errors
    /// Returns an error if serialisation fails (should not happen for a
    /// well-formed envelope built from this module's types).
    pub fn to_wire_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> EventMetadata {
        EventMetadata {
            block_number: 12345,
            block_hash: B256::ZERO,
            tx_hash: B256::ZERO,
            tx_index: 0,
            log_index: 0,
            timestamp: None,
            contract: Address::ZERO,
        }
    }

    #[test]
    fn chain_event_type_name() {
        let event = ChainEvent::Swap(SwapEvent {
            meta: sample_metadata(),
            sender: Address::ZERO,
            recipient: Address::ZERO,
            amount0: alloy::primitives::I256::ZERO,
            amount1: alloy::primitives::I256::ZERO,
            sqrt_price_x96: U256::ZERO,
            liquidity: U256::ZERO,
            tick: 0,
        });

        assert_eq!(event.type_name(), "Swap");
    }

    #[test]
    fn chain_event_metadata_access() {
        let meta = sample_metadata();
        let event = ChainEvent::NfpmTransfer(NfpmTransferEvent {
            meta: meta.clone(),
            from: Address::ZERO,
            to: Address::ZERO,
            token_id: U256::from(7),
        });

        assert_eq!(event.metadata().block_number, meta.block_number);
    }

    #[test]
    fn envelope_serialises_to_json() {
        let envelope = DomainEventEnvelope {
            event_type: "position.created".into(),
            chain_id: ChainId::Ethereum,
            entity_id: "42".into(),
            entity_type: EntityType::Position,
            user_id: Some("0xabc".into()),
            payload: serde_json::json!({ "liquidity": "1000" }),
            source: "subscription-batch".into(),
            received_at: Utc::now(),
            block_number: Some(12345),
            transaction_hash: Some(B256::ZERO),
            log_index: Some(0),
        };

        let bytes = envelope.to_wire_bytes().expect("serialises");
        let text = String::from_utf8(bytes).expect("utf8");
        assert!(text.contains("\"type\":\"position.created\""));
    }

    #[test]
    fn entity_type_display() {
        assert_eq!(EntityType::CloseOrder.to_string(), "close_order");
    }
}
