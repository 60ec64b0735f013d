//! ABI bindings for Uniswap-V3 core and periphery contract events.
//!
//! Two contracts matter to this core:
//! - The **pool** contract (one per token pair/fee tier), which emits
//!   `Swap` on every price-moving trade.
//! - The **NFT Position Manager** (NFPM, one per chain), which emits
//!   `IncreaseLiquidity`/`DecreaseLiquidity`/`Collect` for position state
//!   changes and the standard ERC-721 `Transfer` for mint/burn/ownership
//!   changes of the position NFT itself.
//!
//! # Solidity Contracts
//!
//! ```solidity
//! contract UniswapV3Pool {
//!     event Swap(address indexed sender, address indexed recipient, int256 amount0, int256 amount1, uint160 sqrtPriceX96, uint128 liquidity, int24 tick);
//! }
//!
//! contract NonfungiblePositionManager {
//!     event IncreaseLiquidity(uint256 indexed tokenId, uint128 liquidity, uint256 amount0, uint256 amount1);
//!     event DecreaseLiquidity(uint256 indexed tokenId, uint128 liquidity, uint256 amount0, uint256 amount1);
//!     event Collect(uint256 indexed tokenId, address recipient, uint256 amount0, uint256 amount1);
//!     event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);
//! }
//! ```

use alloy::sol;

sol! {
    /// Emitted by a pool on every swap; the canonical price/liquidity tick.
    #[derive(Debug, PartialEq, Eq)]
    event Swap(
        address indexed sender,
        address indexed recipient,
        int256 amount0,
        int256 amount1,
        uint160 sqrtPriceX96,
        uint128 liquidity,
        int24 tick
    );

    /// Emitted by the NFPM when liquidity is added to a position.
    #[derive(Debug, PartialEq, Eq)]
    event IncreaseLiquidity(
        uint256 indexed tokenId,
        uint128 liquidity,
        uint256 amount0,
        uint256 amount1
    );

    /// Emitted by the NFPM when liquidity is removed from a position.
    #[derive(Debug, PartialEq, Eq)]
    event DecreaseLiquidity(
        uint256 indexed tokenId,
        uint128 liquidity,
        uint256 amount0,
        uint256 amount1
    );

    /// Emitted by the NFPM when accrued fees are collected.
    #[derive(Debug, PartialEq, Eq)]
    event Collect(
        uint256 indexed tokenId,
        address recipient,
        uint256 amount0,
        uint256 amount1
    );

    /// Standard ERC-721 transfer, emitted by the NFPM for mint (`from` zero),
    /// burn (`to` zero), and ordinary ownership transfers of a position NFT.
    #[derive(Debug, PartialEq, Eq)]
    event Transfer(
        address indexed from,
        address indexed to,
        uint256 indexed tokenId
    );

    /// Pool's current price/tick, read by the NAV-snapshot refresh phase.
    function slot0() external view returns (
        uint160 sqrtPriceX96,
        int24 tick,
        uint16 observationIndex,
        uint16 observationCardinality,
        uint16 observationCardinalityNext,
        uint8 feeProtocol,
        bool unlocked
    );

    /// Position state, read by the NAV-snapshot refresh phase.
    function positions(uint256 tokenId) external view returns (
        uint96 nonce,
        address operator,
        address token0,
        address token1,
        uint24 fee,
        int24 tickLower,
        int24 tickUpper,
        uint128 liquidity,
        uint256 feeGrowthInside0LastX128,
        uint256 feeGrowthInside1LastX128,
        uint128 tokensOwed0,
        uint128 tokensOwed1
    );
}
