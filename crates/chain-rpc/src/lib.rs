//! Chain RPC abstraction for EVM-compatible blockchains.
//!
//! This crate provides a unified interface for observing chain state —
//! block heights, logs, multicall reads, and receipts — abstracting away
//! transport and per-chain RPC quirks.
//!
//! # Overview
//!
//! The core of this crate is the [`ChainRpc`] trait, implemented here by
//! [`StandardChainRpc`] for any standard EVM JSON-RPC/WebSocket endpoint.
//!
//! # Quick Start
//!
//! ```ignore
//! use chain_rpc::{ChainRpc, StandardChainRpc};
//!
//! async fn head<R: ChainRpc>(rpc: &R) {
//!     let block = rpc.block_number().await.unwrap();
//!     println!("head: {block}");
//! }
//! ```
//!
//! # Modules
//!
//! - [`traits`] - the [`ChainRpc`] port and [`traits::LogSubscription`]
//! - [`types`] - log filters, receipts, multicall call/result types
//! - [`standard`] - [`StandardChainRpc`], the alloy-backed adapter
//! - [`error`] - error types with detailed context
//! - [`mock`] - [`mock::MockChainRpc`] test double (behind `test-utils`)
//!
//! # Architecture
//!
//! This crate follows the ports-and-adapters (hexagonal) architecture:
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              Ingestion core                     │
//! └─────────────────────────────────────────────────┘
//!                        │
//!                        │ uses
//!                        ▼
//! ┌─────────────────────────────────────────────────┐
//! │              ChainRpc trait (Port)               │
//! │  - block_number() / finalized_block_number()    │
//! │  - get_logs() / multicall()                     │
//! │  - subscribe_events()                            │
//! └─────────────────────────────────────────────────┘
//!                        │
//!          ┌─────────────┴─────────────┐
//!          │                           │
//!          ▼                           ▼
//! ┌─────────────────┐       ┌─────────────────────┐
//! │ StandardChainRpc │       │ MockChainRpc        │
//! │ (Adapter)        │       │ (test double)       │
//! │ uses: alloy      │       │                     │
//! └─────────────────┘       └─────────────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/chain-rpc")]

// ═══════════════════════════════════════════════════════════════════════════════
// MODULES
// ═══════════════════════════════════════════════════════════════════════════════

pub mod error;
pub mod standard;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

// ═══════════════════════════════════════════════════════════════════════════════
// RE-EXPORTS
// ═══════════════════════════════════════════════════════════════════════════════

pub use error::{ChainRpcError, Result};
pub use standard::StandardChainRpc;
pub use traits::{ChainRpc, LogSubscription};
pub use types::{LogFilter, MulticallCall, MulticallResult, TransactionReceipt};

// ═══════════════════════════════════════════════════════════════════════════════
// PRELUDE
// ═══════════════════════════════════════════════════════════════════════════════

/// Convenience re-exports for common use.
///
/// # Usage
///
/// ```ignore
/// use chain_rpc::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ChainRpcError, Result};
    pub use crate::traits::{ChainRpc, LogSubscription};
    pub use crate::types::{LogFilter, MulticallCall, MulticallResult, TransactionReceipt};
}

// ═══════════════════════════════════════════════════════════════════════════════
// CRATE INFO
// ═══════════════════════════════════════════════════════════════════════════════

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the crate version string.
#[must_use]
pub const fn version() -> &'static str {
    VERSION
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!version().is_empty());
        assert!(version().starts_with("0."));
    }

    #[test]
    fn exports_are_available() {
        let _: fn(u64, u64) -> LogFilter = LogFilter::new;
        let _err: ChainRpcError = ChainRpcError::unsupported("test");
    }

    #[test]
    fn prelude_works() {
        use crate::prelude::*;

        let filter = LogFilter::new(0, 100);
        assert_eq!(filter.from_block, Some(0));
    }
}
