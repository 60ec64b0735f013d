//! ABI bindings for the on-chain contracts this core watches.
//!
//! This module provides type-safe Rust bindings for Solidity events and
//! view functions using the `alloy::sol!` macro. [`uniswap_v3`] covers
//! both contracts that matter here: the pool (per token pair/fee tier)
//! and the NFT Position Manager (per chain).
//!
//! # Usage
//!
//! Events are decoded from raw logs using the `SolEvent` trait:
//!
//! ```ignore
//! use alloy::sol_types::SolEvent;
//! use ingest_core::abi::uniswap_v3::Swap;
//!
//! let event = Swap::decode_log(&log.inner, true)?;
//! println!("pool {} swapped at tick {}", log.address(), event.tick);
//! ```

pub mod uniswap_v3;

// Re-export event types for convenience
pub use uniswap_v3::{Collect, DecreaseLiquidity, IncreaseLiquidity, Swap, Transfer};

#[cfg(test)]
mod tests {
    use alloy::sol_types::SolEvent;

    use super::*;

    /// Verify that all event signature hashes are unique (no collisions).
    #[test]
    fn event_signatures_are_unique() {
        let signatures = [
            Swap::SIGNATURE_HASH,
            IncreaseLiquidity::SIGNATURE_HASH,
            DecreaseLiquidity::SIGNATURE_HASH,
            Collect::SIGNATURE_HASH,
            Transfer::SIGNATURE_HASH,
        ];

        let mut seen = std::collections::HashSet::new();
        for sig in signatures {
            assert!(seen.insert(sig), "duplicate event signature hash detected: {sig:?}");
        }
        assert_eq!(seen.len(), 5, "expected 5 unique event signatures");
    }

    #[test]
    fn event_signature_strings() {
        assert_eq!(
            Swap::SIGNATURE,
            "Swap(address,address,int256,int256,uint160,uint128,int24)"
        );
        assert_eq!(Transfer::SIGNATURE, "Transfer(address,address,uint256)");
    }
}
