//! Uniswap-V3 position ingestion core.
//!
//! A Rust backend service that watches on-chain Uniswap-V3 pool and NFT
//! Position Manager events across multiple EVM chains, tracks position
//! and pool state in `PostgreSQL`, and publishes domain events onto a
//! `RabbitMQ` (AMQP) message bus for downstream consumers.
//!
//! # Architecture
//!
//! The core follows a hexagonal architecture: streaming and catch-up
//! ingestion, workers and scheduled rules sit in the middle, talking to
//! swappable adapters through ports.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          INGEST CORE                             │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐          │
//! │  │ Subscription  │  │   Catch-Up   │  │   Workers /  │          │
//! │  │    Batch     │─▶│ Orchestrator │─▶│    Rules     │          │
//! │  └──────────────┘  └──────────────┘  └──────────────┘          │
//! │                                              │                  │
//! │              ┌───────────────────────────────┼──────────────┐  │
//! │              ▼                               ▼              ▼  │
//! │       ┌──────────────┐              ┌──────────────┐   ┌─────┐ │
//! │       │  Message Bus │              │    Store     │   │Cache│ │
//! │       └──────────────┘              └──────────────┘   └─────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`types`] - Domain types (enums, events, entities, primitives)
//! - [`error`] - Layered error types
//! - [`config`] - Configuration loading and validation
//! - [`abi`] - ABI bindings for the pool and NFT Position Manager contracts
//! - [`indexer`] - Streaming subscription batches and historical catch-up
//! - [`worker`] - Long-lived entity-set workers (position liquidity, pool
//!   price, NFPM transfer)
//! - [`rules`] - Scheduled reconciliation jobs (token-list refresh, daily
//!   NAV snapshot)
//! - [`scheduler`] - Cron-driven task scheduling shared by workers and rules
//! - [`messagebus`] - `RabbitMQ` publishing and routing-key conventions
//! - [`store`] - Data persistence (`PostgreSQL`, in-memory cache)
//!
//! # Getting Started
//!
//! ```bash
//! # Set up environment
//! cp .env.example .env
//! # Edit .env with your configuration
//!
//! # Run migrations
//! sqlx migrate run
//!
//! # Start the ingestion core
//! cargo run -- run
//! ```

#![doc(html_root_url = "https://docs.rs/ingest-core")]

// Module declarations
pub mod abi;
pub mod config;
pub mod error;
pub mod indexer;
pub mod messagebus;
pub mod ports;
pub mod rules;
pub mod scheduler;
pub mod store;
pub mod types;
pub mod worker;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the library version string
#[must_use]
pub const fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
        assert!(version().starts_with("0."));
    }
}
