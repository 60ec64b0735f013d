//! Validated primitive types for domain entities.
//!
//! These newtypes provide:
//! - Type safety (can't accidentally pass a chain ID as a block number)
//! - Validation at construction time
//! - Domain semantics in function signatures

use std::fmt;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ETHEREUM ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// Validated 20-byte Ethereum address.
///
/// This newtype ensures addresses are always exactly 20 bytes.
/// Use `Address` from `alloy-primitives` for on-chain interaction,
/// but this type for persistence and domain logic.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EthAddress([u8; 20]);

impl EthAddress {
    /// Create from a fixed-size array (infallible).
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Try to create from a byte slice.
    ///
    /// # Errors
    /// Returns `InvalidEthAddress::WrongLength` if the slice is not exactly
    /// 20 bytes.
    pub fn from_slice(slice: &[u8]) -> Result<Self, InvalidEthAddress> {
        let bytes: [u8; 20] = slice
            .try_into()
            .map_err(|_| InvalidEthAddress::WrongLength(slice.len()))?;
        Ok(Self(bytes))
    }

    /// Parse from hex string (with or without 0x prefix).
    ///
    /// # Errors
    /// Returns `InvalidEthAddress` if the string is not valid hex or wrong
    /// length.
    pub fn from_hex(s: &str) -> Result<Self, InvalidEthAddress> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        if s.len() != 40 {
            return Err(InvalidEthAddress::WrongLength(s.len() / 2));
        }
        let bytes = hex::decode(s).map_err(|_| InvalidEthAddress::InvalidHex)?;
        Self::from_slice(&bytes)
    }

    /// Get the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Get as a byte slice.
    #[must_use]
    pub const fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Convert to lowercase hex string with 0x prefix.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Check if this is the zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// The zero address (0x0000...0000).
    pub const ZERO: Self = Self([0u8; 20]);
}

impl fmt::Debug for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EthAddress({})", self.to_hex())
    }
}

impl fmt::Display for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<EthAddress> for String {
    fn from(addr: EthAddress) -> Self {
        addr.to_hex()
    }
}

impl TryFrom<String> for EthAddress {
    type Error = InvalidEthAddress;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl TryFrom<&str> for EthAddress {
    type Error = InvalidEthAddress;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::from_hex(s)
    }
}

impl From<[u8; 20]> for EthAddress {
    fn from(bytes: [u8; 20]) -> Self {
        Self::new(bytes)
    }
}

impl From<Address> for EthAddress {
    fn from(addr: Address) -> Self {
        Self::new(addr.0.0)
    }
}

impl From<EthAddress> for Address {
    fn from(addr: EthAddress) -> Self {
        Self::from(addr.0)
    }
}

/// Error for invalid Ethereum addresses.
#[derive(Debug, Clone, Error)]
pub enum InvalidEthAddress {
    /// Address has wrong byte length.
    #[error("wrong length: expected 20 bytes, got {0}")]
    WrongLength(usize),
    /// Address contains invalid hex characters.
    #[error("invalid hex encoding")]
    InvalidHex,
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN ID
// ═══════════════════════════════════════════════════════════════════════════════

/// A chain this deployment is configured to ingest from.
///
/// Only a fixed set of chains is supported; constructing a `ChainId` from an
/// arbitrary integer validates against that set rather than accepting any
/// `u64`, so an unsupported chain is rejected at the edge with a typed
/// error instead of surfacing as a runtime RPC failure deep in the
/// indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub enum ChainId {
    /// Ethereum mainnet.
    Ethereum,
    /// Arbitrum One.
    Arbitrum,
    /// Base.
    Base,
    /// BNB Smart Chain.
    Bsc,
    /// Polygon PoS.
    Polygon,
    /// OP Mainnet.
    Optimism,
    /// Local development chain (anvil/hardhat).
    Local,
}

impl ChainId {
    /// All chains this deployment knows how to ingest from.
    pub const ALL: [Self; 7] = [
        Self::Ethereum,
        Self::Arbitrum,
        Self::Base,
        Self::Bsc,
        Self::Polygon,
        Self::Optimism,
        Self::Local,
    ];

    /// Numeric EVM chain ID.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        match self {
            Self::Ethereum => 1,
            Self::Arbitrum => 42161,
            Self::Base => 8453,
            Self::Bsc => 56,
            Self::Polygon => 137,
            Self::Optimism => 10,
            Self::Local => 31337,
        }
    }

    /// Finality safety margin, in blocks, used when a chain has no
    /// queryable `finalized` tag.
    #[must_use]
    pub const fn finality_margin(self) -> u64 {
        match self {
            Self::Ethereum | Self::Arbitrum | Self::Base | Self::Bsc | Self::Optimism => 64,
            Self::Polygon => 128,
            Self::Local => 1,
        }
    }

    /// Parse from a numeric EVM chain ID.
    ///
    /// # Errors
    /// Returns `InvalidChainId` if the id is not one of the supported
    /// chains.
    pub fn from_u64(id: u64) -> Result<Self, InvalidChainId> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_u64() == id)
            .ok_or(InvalidChainId(id))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u64())
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.as_u64()
    }
}

impl TryFrom<u64> for ChainId {
    type Error = InvalidChainId;

    fn try_from(id: u64) -> Result<Self, Self::Error> {
        Self::from_u64(id)
    }
}

/// Error for an unsupported chain ID.
#[derive(Debug, Clone, Copy, Error)]
#[error("unsupported chain id: {0}")]
pub struct InvalidChainId(pub u64);

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod eth_address_tests {
        use super::*;

        #[test]
        fn from_hex_with_prefix() {
            let addr = EthAddress::from_hex("0x1234567890123456789012345678901234567890").unwrap();
            assert_eq!(addr.to_hex(), "0x1234567890123456789012345678901234567890");
        }

        #[test]
        fn from_hex_without_prefix() {
            let addr = EthAddress::from_hex("1234567890123456789012345678901234567890").unwrap();
            assert_eq!(addr.to_hex(), "0x1234567890123456789012345678901234567890");
        }

        #[test]
        fn from_hex_wrong_length() {
            assert!(EthAddress::from_hex("0x1234").is_err());
        }

        #[test]
        fn from_hex_invalid_chars() {
            assert!(EthAddress::from_hex("0xgggggggggggggggggggggggggggggggggggggggg").is_err());
        }

        #[test]
        fn zero_address() {
            assert!(EthAddress::ZERO.is_zero());
            assert_eq!(
                EthAddress::ZERO.to_hex(),
                "0x0000000000000000000000000000000000000000"
            );
        }

        #[test]
        fn alloy_address_roundtrip() {
            let addr_hex = "0x1234567890123456789012345678901234567890";
            let eth_addr = EthAddress::from_hex(addr_hex).unwrap();
            let alloy_addr: Address = eth_addr.into();
            let back: EthAddress = alloy_addr.into();
            assert_eq!(eth_addr, back);
        }
    }

    mod chain_id_tests {
        use super::*;

        #[test]
        fn from_u64_known_chains() {
            assert_eq!(ChainId::from_u64(1).unwrap(), ChainId::Ethereum);
            assert_eq!(ChainId::from_u64(42161).unwrap(), ChainId::Arbitrum);
            assert_eq!(ChainId::from_u64(8453).unwrap(), ChainId::Base);
            assert_eq!(ChainId::from_u64(56).unwrap(), ChainId::Bsc);
            assert_eq!(ChainId::from_u64(137).unwrap(), ChainId::Polygon);
            assert_eq!(ChainId::from_u64(10).unwrap(), ChainId::Optimism);
        }

        #[test]
        fn from_u64_unsupported_chain_errors() {
            let err = ChainId::from_u64(999).unwrap_err();
            assert_eq!(err.0, 999);
        }

        #[test]
        fn roundtrip_as_u64() {
            for chain in ChainId::ALL {
                assert_eq!(ChainId::from_u64(chain.as_u64()).unwrap(), chain);
            }
        }

        #[test]
        fn polygon_has_larger_finality_margin() {
            assert!(ChainId::Polygon.finality_margin() > ChainId::Ethereum.finality_margin());
        }

        #[test]
        fn display_prints_numeric_id() {
            assert_eq!(ChainId::Arbitrum.to_string(), "42161");
        }
    }
}
