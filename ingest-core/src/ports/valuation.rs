//! Position-valuation port.
//!
//! Tick-to-amount conversion and quote-token valuation are domain-specific
//! AMM/financial math, not something this core implements: this port is the
//! opaque pure-function interface the reconciliation rules call into.
//! Implementations may be a local math crate or a client to a dedicated
//! pricing/valuation service; either way the core only orchestrates calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ═══════════════════════════════════════════════════════════════════════════════
// VALUATION
// ═══════════════════════════════════════════════════════════════════════════════

/// On-chain inputs needed to value one position: its liquidity/tick range
/// and the owning pool's current price, plus accrued-but-uncollected fees.
/// Every amount is a decimal string (`U256`/`uint128` at the wire boundary).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionValuationInput {
    /// The position's liquidity as of the last refresh.
    pub liquidity: String,
    /// Lower tick of the position's range.
    pub tick_lower: i32,
    /// Upper tick of the position's range.
    pub tick_upper: i32,
    /// Pool's current `sqrtPriceX96`.
    pub sqrt_price_x96: String,
    /// Pool's current tick.
    pub current_tick: i32,
    /// Uncollected `token0` fees owed to the position.
    pub tokens_owed0: String,
    /// Uncollected `token1` fees owed to the position.
    pub tokens_owed1: String,
}

/// Result of valuing one position in the deployment's reporting currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionValuation {
    /// Current mark-to-market value of the position's underlying amounts.
    pub current_value: String,
    /// Unrealized profit/loss versus the position's cost basis.
    pub unrealized_pnl: String,
    /// Value of uncollected fees, converted to the reporting currency.
    pub unclaimed_fees: String,
}

/// Port over tick-range valuation and quote-token conversion.
///
/// # Implementation Notes
///
/// A real implementation performs the Uniswap-V3 tick-to-amount math and
/// converts the result through a quote-token price; this core treats both
/// as opaque.
#[async_trait]
pub trait PositionValuer: Send + Sync {
    /// Value a single position.
    ///
    /// # Errors
    ///
    /// Returns an error if the valuation cannot be computed (e.g. a price
    /// source is unavailable).
    async fn value_position(&self, input: &PositionValuationInput) -> Result<PositionValuation>;
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks {
    //! Mock implementation for testing.

    use async_trait::async_trait;

    use super::{PositionValuation, PositionValuationInput, PositionValuer};
    use crate::error::Result;

    /// Mock valuer that returns a fixed valuation regardless of input,
    /// useful for exercising the refresh pipeline without real AMM math.
    #[derive(Debug, Clone)]
    pub struct FixedPositionValuer {
        /// Valuation to return from every call.
        pub valuation: PositionValuation,
    }

    impl FixedPositionValuer {
        /// Build a mock that always values a position at zero.
        #[must_use]
        pub fn zero() -> Self {
            Self {
                valuation: PositionValuation {
                    current_value: "0".to_string(),
                    unrealized_pnl: "0".to_string(),
                    unclaimed_fees: "0".to_string(),
                },
            }
        }
    }

    #[async_trait]
    impl PositionValuer for FixedPositionValuer {
        async fn value_position(&self, _input: &PositionValuationInput) -> Result<PositionValuation> {
            Ok(self.valuation.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::FixedPositionValuer;
    use super::*;

    #[tokio::test]
    async fn fixed_valuer_ignores_input() {
        let valuer = FixedPositionValuer::zero();
        let input = PositionValuationInput {
            liquidity: "1000".to_string(),
            tick_lower: -100,
            tick_upper: 100,
            sqrt_price_x96: "79228162514264337593543950336".to_string(),
            current_tick: 0,
            tokens_owed0: "0".to_string(),
            tokens_owed1: "0".to_string(),
        };
        let valuation = valuer.value_position(&input).await.unwrap();
        assert_eq!(valuation.current_value, "0");
    }
}
