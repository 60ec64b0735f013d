//! Port definitions for dependency injection and testability.
//!
//! Ports are trait definitions that describe what the domain layer needs.
//! Following hexagonal architecture, adapters (in the infrastructure layer)
//! implement these traits to provide concrete functionality.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Domain Layer                            │
//! │                                                                 │
//! │  Uses ports (traits) to define what it needs                   │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐            │
//! │  │PositionStore│  │  PoolStore  │  │SubscriberStore│           │
//! │  └──────┬──────┘  └──────┬──────┘  └──────┬──────┘            │
//! │         │                │                │                    │
//! └─────────┼────────────────┼────────────────┼────────────────────┘
//!           │                │                │
//!           ▼                ▼                ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Infrastructure Layer                        │
//! │                                                                 │
//! │  Provides adapters (implementations) for ports                 │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐            │
//! │  │PostgresStore│  │PostgresStore │  │PostgresStore│            │
//! │  │(implements  │  │(implements   │  │(implements  │            │
//! │  │PositionStore)│  │ PoolStore)  │  │SubscriberStore)│         │
//! │  └─────────────┘  └─────────────┘  └─────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Port Categories
//!
//! | Category | Ports | Purpose |
//! |----------|-------|---------|
//! | Storage | [`PositionStore`], [`PoolStore`], [`SubscriberStore`], [`IndexerStateStore`] | Data persistence |
//! | Messaging | [`EventPublisher`] | Topic-exchange event publishing |
//! | Caching | [`Cache`] | Progress records, rate-limit/dedup counters |
//! | Time | [`Clock`] | Testable time operations |
//! | Chain | `chain_rpc::ChainRpc` | EVM JSON-RPC/WS access (re-exported from the `chain-rpc` crate) |
//! | Valuation | [`PositionValuer`] | Tick/price -> value math, consumed as an opaque pure function |
//! | Market data | [`MarketDataSource`] | External token-list/price-feed fetch |
//! | Ledger | [`LedgerJournal`] | Double-entry balance aggregation, consumed as an opaque interface |
//!
//! # Usage
//!
//! ```ignore
//! use ingest_core::ports::{PositionStore, Clock, SystemClock};
//!
//! // Application code depends on traits, not implementations
//! async fn process_position<S: PositionStore, C: Clock>(
//!     store: &S,
//!     clock: &C,
//!     chain_id: ChainId,
//!     nft_id: &str,
//! ) -> Result<()> {
//!     let position = store.get_position(chain_id, nft_id).await?;
//!     let now = clock.now();
//!     // ...
//!     Ok(())
//! }
//!
//! // In production, use real implementations
//! let store = PostgresPositionStore::new(pool);
//! let clock = SystemClock;
//!
//! // In tests, use mocks
//! let store = MockPositionStore::new();
//! let clock = FakeClock::new(fixed_time);
//! ```

mod cache;
mod clock;
mod ledger;
mod market_data;
mod store;
mod streaming;
mod valuation;

// Re-export all port traits
pub use cache::Cache;
pub use clock::{Clock, SystemClock};
pub use ledger::LedgerJournal;
pub use market_data::MarketDataSource;
pub use store::{IndexerStateStore, PoolStore, PositionStore, SubscriberStore};
pub use streaming::EventPublisher;
pub use valuation::{PositionValuation, PositionValuationInput, PositionValuer};

// Re-export test utilities for tests and downstream crates using test-utils feature
#[cfg(any(test, feature = "test-utils"))]
pub use clock::FakeClock;

#[cfg(any(test, feature = "test-utils"))]
pub use cache::mocks as cache_mocks;
#[cfg(any(test, feature = "test-utils"))]
pub use ledger::mocks as ledger_mocks;
#[cfg(any(test, feature = "test-utils"))]
pub use market_data::mocks as market_data_mocks;
#[cfg(any(test, feature = "test-utils"))]
pub use store::mocks as store_mocks;
#[cfg(any(test, feature = "test-utils"))]
pub use streaming::mocks as streaming_mocks;
#[cfg(any(test, feature = "test-utils"))]
pub use valuation::mocks as valuation_mocks;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_ports_are_send_sync() {
        // Compile-time check that all port traits require Send + Sync
        fn assert_send_sync<T: Send + Sync>() {}

        // These would fail to compile if traits don't require Send + Sync
        fn check_position_store<T: PositionStore>() {
            assert_send_sync::<T>();
        }
        fn check_pool_store<T: PoolStore>() {
            assert_send_sync::<T>();
        }
        fn check_subscriber_store<T: SubscriberStore>() {
            assert_send_sync::<T>();
        }
        fn check_indexer_state_store<T: IndexerStateStore>() {
            assert_send_sync::<T>();
        }
        fn check_event_publisher<T: EventPublisher>() {
            assert_send_sync::<T>();
        }
        fn check_cache<T: Cache>() {
            assert_send_sync::<T>();
        }
        fn check_clock<T: Clock>() {
            assert_send_sync::<T>();
        }
    }
}
