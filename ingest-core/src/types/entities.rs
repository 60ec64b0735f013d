//! Domain entities for database and cache persistence.
//!
//! These structs represent current state, as opposed to the historical
//! occurrences in [`super::events`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::SubscriberState;
use super::primitives::{ChainId, EthAddress};

// ═══════════════════════════════════════════════════════════════════════════════
// POSITION
// ═══════════════════════════════════════════════════════════════════════════════

/// A tracked Uniswap-V3 liquidity position (one NFT on one chain).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
    /// Unique identifier.
    pub id: Uuid,
    /// Chain the position's NFT lives on.
    pub chain_id: ChainId,
    /// NFT Position Manager token ID (`U256` as a decimal string).
    pub nft_id: String,
    /// Pool the position provides liquidity to.
    pub pool_address: EthAddress,
    /// Current owner of the position NFT.
    pub owner: EthAddress,
    /// Whether the position is still open (has not been burned/closed).
    pub is_active: bool,
    /// Lower tick of the position's liquidity range, fixed at mint.
    pub tick_lower: i32,
    /// Upper tick of the position's liquidity range, fixed at mint.
    pub tick_upper: i32,
    /// Liquidity as of the last refresh (`U256` as a decimal string).
    pub liquidity: String,
    /// Current USD (or reporting-currency) value as of the last refresh.
    pub current_value: Option<String>,
    /// Unrealized profit/loss as of the last refresh.
    pub unrealized_pnl: Option<String>,
    /// Unclaimed fees as of the last refresh.
    pub unclaimed_fees: Option<String>,
    /// Block the position was first observed at.
    pub created_at_block: i64,
    /// Last state refresh.
    pub updated_at: DateTime<Utc>,
}

impl PositionRecord {
    /// Per-batch member key for this position: the NFT id.
    #[must_use]
    pub fn member_key(&self) -> &str {
        &self.nft_id
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// POOL
// ═══════════════════════════════════════════════════════════════════════════════

/// A tracked Uniswap-V3 pool, watched for price-moving `Swap` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRecord {
    /// Unique identifier.
    pub id: Uuid,
    /// Chain the pool lives on.
    pub chain_id: ChainId,
    /// Pool contract address.
    pub pool_address: EthAddress,
    /// Whether any active position still references this pool.
    pub has_active_positions: bool,
    /// Most recently observed sqrt price (`U256` as a decimal string).
    pub last_sqrt_price_x96: Option<String>,
    /// Most recently observed tick.
    pub last_tick: Option<i32>,
    /// Last state refresh.
    pub updated_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SUBSCRIBER
// ═══════════════════════════════════════════════════════════════════════════════

/// An externally poll-driven subscriber row, tracked through
/// `active -> paused -> deleted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberRecord {
    /// Unique identifier.
    pub id: Uuid,
    /// Chain the subscriber's entity lives on.
    pub chain_id: ChainId,
    /// Entity the subscriber watches (pool address, NFT id, etc).
    pub entity_key: String,
    /// Current lifecycle state.
    pub state: SubscriberState,
    /// Last time this row was re-confirmed by an external poll.
    pub last_polled_at: DateTime<Utc>,
    /// Staleness threshold; `None` means the row never auto-pauses.
    pub expires_after_ms: Option<i64>,
    /// When the row transitioned to `Paused`, if it has.
    pub paused_at: Option<DateTime<Utc>>,
}

impl SubscriberRecord {
    /// Whether this row has gone stale and should move to `Paused`.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.expires_after_ms {
            Some(expires_after_ms) if self.state == SubscriberState::Active => {
                let elapsed = now.signed_duration_since(self.last_polled_at);
                elapsed.num_milliseconds() > expires_after_ms
            }
            _ => false,
        }
    }

    /// Whether a paused row has sat long enough to be pruned.
    #[must_use]
    pub fn is_prunable(&self, now: DateTime<Utc>, prune_threshold_ms: i64) -> bool {
        match (self.state, self.paused_at) {
            (SubscriberState::Paused, Some(paused_at)) => {
                now.signed_duration_since(paused_at).num_milliseconds() > prune_threshold_ms
            }
            _ => false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BLOCK TRACKER RECORD
// ═══════════════════════════════════════════════════════════════════════════════

/// Cached high-water mark of durably published blocks for one
/// `(chainId, subsystem)` pair.
///
/// Stored under a key like `onchain-data:position-liquidity:last-block:<chainId>`
/// with a one-year TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTrackerRecord {
    /// Highest block number whose effects have been durably published.
    pub block_number: u64,
    /// When this record was last written.
    pub updated_at: DateTime<Utc>,
}

impl BlockTrackerRecord {
    /// Build a cache key for a chain/subsystem pair.
    #[must_use]
    pub fn cache_key(subsystem: &str, chain_id: ChainId) -> String {
        format!("onchain-data:{subsystem}:last-block:{}", chain_id.as_u64())
    }

    /// TTL for block-tracker cache entries: one year, in seconds.
    pub const TTL_SECONDS: u64 = 31_536_000;
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCHEDULED TASK
// ═══════════════════════════════════════════════════════════════════════════════

/// Bookkeeping the [`crate::scheduler`] keeps for one registered cron task.
#[derive(Debug, Clone)]
pub struct ScheduledTaskRecord {
    /// Stable task identifier, returned from `registerSchedule`.
    pub id: Uuid,
    /// Name of the owning rule (e.g. `"daily-nav-snapshot"`).
    pub rule_name: String,
    /// 5-field minute-granularity cron expression.
    pub cron_expression: String,
    /// IANA timezone the expression is evaluated in.
    pub timezone: String,
    /// Human-readable description, surfaced in status reports.
    pub description: String,
    /// When this task was registered.
    pub registered_at: DateTime<Utc>,
    /// When the callback last ran, successfully or not.
    pub last_execution_at: Option<DateTime<Utc>>,
    /// Total number of invocations.
    pub execution_count: u64,
    /// Message from the most recent failed invocation, if any.
    pub last_error: Option<String>,
}

impl ScheduledTaskRecord {
    /// Record a successful invocation.
    pub fn record_success(&mut self, at: DateTime<Utc>) {
        self.last_execution_at = Some(at);
        self.execution_count += 1;
        self.last_error = None;
    }

    /// Record a failed invocation; the task remains registered.
    pub fn record_failure(&mut self, at: DateTime<Utc>, error: impl Into<String>) {
        self.last_execution_at = Some(at);
        self.execution_count += 1;
        self.last_error = Some(error.into());
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// USER NAV SNAPSHOT
// ═══════════════════════════════════════════════════════════════════════════════

/// One user's aggregated NAV at a point in time, produced by the daily
/// snapshot rule's Snapshot phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserNavSnapshotRecord {
    /// Owning user/wallet id.
    pub user_id: String,
    /// Currency the snapshot's amounts are reported in.
    pub reporting_currency: String,
    /// Aggregated total value across the user's positions and ledger
    /// balances, as a decimal string.
    pub total_value: String,
    /// When this snapshot was computed.
    pub computed_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_subscriber(state: SubscriberState) -> SubscriberRecord {
        SubscriberRecord {
            id: Uuid::nil(),
            chain_id: ChainId::Ethereum,
            entity_key: "0xabc".into(),
            state,
            last_polled_at: Utc::now(),
            expires_after_ms: Some(1_000),
            paused_at: None,
        }
    }

    #[test]
    fn subscriber_is_stale_after_expiry() {
        let mut sub = sample_subscriber(SubscriberState::Active);
        sub.last_polled_at = Utc::now() - chrono::Duration::milliseconds(5_000);
        assert!(sub.is_stale(Utc::now()));
    }

    #[test]
    fn subscriber_is_not_stale_when_recently_polled() {
        let sub = sample_subscriber(SubscriberState::Active);
        assert!(!sub.is_stale(Utc::now()));
    }

    #[test]
    fn paused_subscriber_is_prunable_after_threshold() {
        let mut sub = sample_subscriber(SubscriberState::Paused);
        sub.paused_at = Some(Utc::now() - chrono::Duration::milliseconds(10_000));
        assert!(sub.is_prunable(Utc::now(), 5_000));
    }

    #[test]
    fn active_subscriber_is_never_prunable() {
        let sub = sample_subscriber(SubscriberState::Active);
        assert!(!sub.is_prunable(Utc::now(), 0));
    }

    #[test]
    fn block_tracker_cache_key_format() {
        let key = BlockTrackerRecord::cache_key("position-liquidity", ChainId::Arbitrum);
        assert_eq!(key, "onchain-data:position-liquidity:last-block:42161");
    }

    #[test]
    fn scheduled_task_records_success() {
        let mut task = ScheduledTaskRecord {
            id: Uuid::nil(),
            rule_name: "daily-nav-snapshot".into(),
            cron_expression: "0 0 * * *".into(),
            timezone: "UTC".into(),
            description: "Daily NAV snapshot".into(),
            registered_at: Utc::now(),
            last_execution_at: None,
            execution_count: 0,
            last_error: Some("previous failure".into()),
        };

        task.record_success(Utc::now());
        assert_eq!(task.execution_count, 1);
        assert!(task.last_error.is_none());
    }

    #[test]
    fn scheduled_task_records_failure_without_unregistering() {
        let mut task = ScheduledTaskRecord {
            id: Uuid::nil(),
            rule_name: "token-list-refresh".into(),
            cron_expression: "17 3 * * *".into(),
            timezone: "UTC".into(),
            description: "Token list refresh".into(),
            registered_at: Utc::now(),
            last_execution_at: None,
            execution_count: 3,
            last_error: None,
        };

        task.record_failure(Utc::now(), "rpc timeout");
        assert_eq!(task.execution_count, 4);
        assert_eq!(task.last_error.as_deref(), Some("rpc timeout"));
    }
}
