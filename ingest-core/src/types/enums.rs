//! Small state-machine and mode enumerations shared across the indexer.
//!
//! These are in-memory/runtime enums (not persisted via `sqlx::Type`) except
//! [`SubscriberState`], which mirrors a stored column and needs DB
//! round-tripping.

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// CONNECTION STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifecycle state of a `SubscriptionBatch`'s streaming connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Not yet started.
    Idle,
    /// Subscription request in flight.
    Connecting,
    /// Actively receiving logs.
    Connected,
    /// Lost connection, retrying with backoff.
    Reconnecting,
    /// Stopped; will not reconnect unless restarted explicitly.
    Stopped,
}

impl ConnectionState {
    /// Whether the batch is in a state where it can accept `start()`.
    #[must_use]
    pub const fn can_start(self) -> bool {
        matches!(self, Self::Idle | Self::Stopped)
    }

    /// Whether the batch currently holds a live subscription.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Connected | Self::Reconnecting)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Stopped => "stopped",
        };
        write!(f, "{s}")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BATCH MODE
// ═══════════════════════════════════════════════════════════════════════════════

/// Whether a batch publishes events immediately or buffers them.
///
/// `Buffering` can additionally be scoped to individual members; that detail
/// lives alongside the batch's membership map rather than in this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatchMode {
    /// Events are published as soon as they are handled.
    Normal,
    /// Events are appended to the global buffer instead of published.
    Buffering,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SUBSCRIBER STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// State of an externally poll-driven subscriber row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "varchar")]
pub enum SubscriberState {
    /// Actively polled and tracked.
    Active,
    /// Stopped polling (stale); still retained for a grace period.
    Paused,
    /// Eligible for removal; row will be pruned.
    Deleted,
}

impl SubscriberState {
    /// Validate a transition between two states per the subscriber
    /// lifecycle: `active -> paused -> deleted`, with `paused -> active`
    /// allowed (an external re-poll reviving a stale subscriber).
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Paused)
                | (Self::Paused, Self::Active)
                | (Self::Paused, Self::Deleted)
        )
    }
}

impl std::fmt::Display for SubscriberState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Deleted => "deleted",
        };
        write!(f, "{s}")
    }
}

/// Error returned by an invalid subscriber state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot transition subscriber from {from} to {to}")]
pub struct InvalidSubscriberTransition {
    /// Originating state.
    pub from: SubscriberState,
    /// Rejected destination state.
    pub to: SubscriberState,
}

// ═══════════════════════════════════════════════════════════════════════════════
// NFPM TRANSFER KIND
// ═══════════════════════════════════════════════════════════════════════════════

/// Kind of ERC-721 transfer observed on the NFT Position Manager, used to
/// build the `uniswapv3.{chainId}.{MINT|BURN|TRANSFER}.{nftId}` routing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NfpmTransferKind {
    /// `from` is the zero address: a position NFT was minted.
    Mint,
    /// `to` is the zero address: a position NFT was burned.
    Burn,
    /// Neither side is the zero address: an ordinary transfer.
    Transfer,
}

impl NfpmTransferKind {
    /// Classify a transfer from its `from`/`to` addresses.
    #[must_use]
    pub fn classify(from_is_zero: bool, to_is_zero: bool) -> Self {
        if from_is_zero {
            Self::Mint
        } else if to_is_zero {
            Self::Burn
        } else {
            Self::Transfer
        }
    }

    /// Routing-key segment, matching the exchange's exact casing contract.
    #[must_use]
    pub const fn routing_segment(self) -> &'static str {
        match self {
            Self::Mint => "mint",
            Self::Burn => "burn",
            Self::Transfer => "transfer",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    mod connection_state_tests {
        use super::*;

        #[test]
        fn idle_and_stopped_can_start() {
            assert!(ConnectionState::Idle.can_start());
            assert!(ConnectionState::Stopped.can_start());
            assert!(!ConnectionState::Connected.can_start());
        }

        #[test]
        fn connected_and_reconnecting_are_live() {
            assert!(ConnectionState::Connected.is_live());
            assert!(ConnectionState::Reconnecting.is_live());
            assert!(!ConnectionState::Idle.is_live());
        }
    }

    mod subscriber_state_tests {
        use super::*;

        #[test]
        fn active_to_paused_is_valid() {
            assert!(SubscriberState::Active.can_transition_to(SubscriberState::Paused));
        }

        #[test]
        fn paused_to_active_is_valid() {
            assert!(SubscriberState::Paused.can_transition_to(SubscriberState::Active));
        }

        #[test]
        fn paused_to_deleted_is_valid() {
            assert!(SubscriberState::Paused.can_transition_to(SubscriberState::Deleted));
        }

        #[test]
        fn active_to_deleted_is_invalid() {
            assert!(!SubscriberState::Active.can_transition_to(SubscriberState::Deleted));
        }

        #[test]
        fn deleted_is_terminal() {
            assert!(!SubscriberState::Deleted.can_transition_to(SubscriberState::Active));
            assert!(!SubscriberState::Deleted.can_transition_to(SubscriberState::Paused));
        }
    }

    mod nfpm_transfer_kind_tests {
        use super::*;

        #[test]
        fn classifies_mint() {
            assert_eq!(NfpmTransferKind::classify(true, false), NfpmTransferKind::Mint);
        }

        #[test]
        fn classifies_burn() {
            assert_eq!(NfpmTransferKind::classify(false, true), NfpmTransferKind::Burn);
        }

        #[test]
        fn classifies_transfer() {
            assert_eq!(
                NfpmTransferKind::classify(false, false),
                NfpmTransferKind::Transfer
            );
        }

        #[test]
        fn routing_segments_are_lowercase() {
            assert_eq!(NfpmTransferKind::Mint.routing_segment(), "mint");
            assert_eq!(NfpmTransferKind::Burn.routing_segment(), "burn");
            assert_eq!(NfpmTransferKind::Transfer.routing_segment(), "transfer");
        }
    }
}
