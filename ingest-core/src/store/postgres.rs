//! PostgreSQL implementation of store ports using SQLx.
//!
//! This module provides the primary persistence layer: positions, pools,
//! subscriber rows and durable indexer progress, all behind the port
//! traits in [`crate::ports::store`].
//!
//! # Type Conversions
//!
//! `PostgreSQL` uses signed integers for numeric columns while the domain
//! uses `u64`/`ChainId`. These casts are safe because:
//! - Chain IDs are drawn from [`ChainId::ALL`], well under `i64::MAX`.
//! - Block numbers won't exceed `i64::MAX` (~9 quintillion).
//! - Tick values fit comfortably in `i32`.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{DomainError, InfraError, Result};
use crate::ports::{IndexerStateStore, PoolStore, PositionStore, SubscriberStore};
use crate::types::entities::{PoolRecord, PositionRecord, SubscriberRecord};
use crate::types::enums::SubscriberState;
use crate::types::primitives::{ChainId, EthAddress};

// ═══════════════════════════════════════════════════════════════════════════════
// POSTGRES STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// `PostgreSQL`-based store implementation.
///
/// Implements all store port traits using `SQLx` for database access.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new `PostgreSQL` store with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| InfraError::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }
}

fn chain_id_to_i64(chain_id: ChainId) -> i64 {
    chain_id.as_u64() as i64
}

fn chain_id_from_i64(raw: i64) -> Result<ChainId> {
    Ok(ChainId::from_u64(raw as u64).map_err(DomainError::from)?)
}

fn address_from_bytes(field: &'static str, bytes: &[u8]) -> Result<EthAddress> {
    EthAddress::from_slice(bytes)
        .map_err(|e| DomainError::InvalidValue { field, reason: e.to_string() })
        .map_err(Into::into)
}

// ═══════════════════════════════════════════════════════════════════════════════
// POSITION STORE IMPLEMENTATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Database row for tracked positions.
#[derive(Debug, FromRow)]
struct PositionRow {
    id: Uuid,
    chain_id: i64,
    nft_id: String,
    pool_address: Vec<u8>,
    owner: Vec<u8>,
    is_active: bool,
    tick_lower: i32,
    tick_upper: i32,
    liquidity: String,
    current_value: Option<String>,
    unrealized_pnl: Option<String>,
    unclaimed_fees: Option<String>,
    created_at_block: i64,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<PositionRow> for PositionRecord {
    type Error = crate::error::AppError;

    fn try_from(row: PositionRow) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            chain_id: chain_id_from_i64(row.chain_id)?,
            nft_id: row.nft_id,
            pool_address: address_from_bytes("pool_address", &row.pool_address)?,
            owner: address_from_bytes("owner", &row.owner)?,
            is_active: row.is_active,
            tick_lower: row.tick_lower,
            tick_upper: row.tick_upper,
            liquidity: row.liquidity,
            current_value: row.current_value,
            unrealized_pnl: row.unrealized_pnl,
            unclaimed_fees: row.unclaimed_fees,
            created_at_block: row.created_at_block,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl PositionStore for PostgresStore {
    #[instrument(skip(self), fields(chain_id = %chain_id, nft_id = %nft_id))]
    async fn get_position(&self, chain_id: ChainId, nft_id: &str) -> Result<Option<PositionRecord>> {
        let row = sqlx::query_as::<_, PositionRow>(
            r"
            SELECT id, chain_id, nft_id, pool_address, owner, is_active,
                   tick_lower, tick_upper, liquidity, current_value,
                   unrealized_pnl, unclaimed_fees, created_at_block, updated_at
            FROM positions
            WHERE chain_id = $1 AND nft_id = $2
            ",
        )
        .bind(chain_id_to_i64(chain_id))
        .bind(nft_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self, position), fields(chain_id = %position.chain_id, nft_id = %position.nft_id))]
    async fn save_position(&self, position: &PositionRecord) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO positions (
                id, chain_id, nft_id, pool_address, owner, is_active,
                tick_lower, tick_upper, liquidity, current_value,
                unrealized_pnl, unclaimed_fees, created_at_block, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (chain_id, nft_id) DO UPDATE SET
                owner = EXCLUDED.owner,
                is_active = EXCLUDED.is_active,
                liquidity = EXCLUDED.liquidity,
                current_value = EXCLUDED.current_value,
                unrealized_pnl = EXCLUDED.unrealized_pnl,
                unclaimed_fees = EXCLUDED.unclaimed_fees,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(position.id)
        .bind(chain_id_to_i64(position.chain_id))
        .bind(&position.nft_id)
        .bind(position.pool_address.as_slice())
        .bind(position.owner.as_slice())
        .bind(position.is_active)
        .bind(position.tick_lower)
        .bind(position.tick_upper)
        .bind(&position.liquidity)
        .bind(&position.current_value)
        .bind(&position.unrealized_pnl)
        .bind(&position.unclaimed_fees)
        .bind(position.created_at_block)
        .bind(position.updated_at)
        .execute(&self.pool)
        .await?;

        debug!("position saved");
        Ok(())
    }

    #[instrument(skip(self), fields(chain_id = %chain_id))]
    async fn get_active_positions(&self, chain_id: ChainId) -> Result<Vec<PositionRecord>> {
        let rows = sqlx::query_as::<_, PositionRow>(
            r"
            SELECT id, chain_id, nft_id, pool_address, owner, is_active,
                   tick_lower, tick_upper, liquidity, current_value,
                   unrealized_pnl, unclaimed_fees, created_at_block, updated_at
            FROM positions
            WHERE chain_id = $1 AND is_active = true
            ORDER BY created_at_block ASC
            ",
        )
        .bind(chain_id_to_i64(chain_id))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self), fields(chain_id = %chain_id, nft_id = %nft_id))]
    async fn deactivate_position(&self, chain_id: ChainId, nft_id: &str) -> Result<()> {
        sqlx::query(
            r"
            UPDATE positions SET is_active = false, updated_at = now()
            WHERE chain_id = $1 AND nft_id = $2
            ",
        )
        .bind(chain_id_to_i64(chain_id))
        .bind(nft_id)
        .execute(&self.pool)
        .await?;

        debug!("position deactivated");
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// POOL STORE IMPLEMENTATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Database row for tracked pools.
#[derive(Debug, FromRow)]
struct PoolRow {
    id: Uuid,
    chain_id: i64,
    pool_address: Vec<u8>,
    has_active_positions: bool,
    last_sqrt_price_x96: Option<String>,
    last_tick: Option<i32>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<PoolRow> for PoolRecord {
    type Error = crate::error::AppError;

    fn try_from(row: PoolRow) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            chain_id: chain_id_from_i64(row.chain_id)?,
            pool_address: address_from_bytes("pool_address", &row.pool_address)?,
            has_active_positions: row.has_active_positions,
            last_sqrt_price_x96: row.last_sqrt_price_x96,
            last_tick: row.last_tick,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl PoolStore for PostgresStore {
    #[instrument(skip(self), fields(chain_id = %chain_id, pool_address = %pool_address))]
    async fn get_pool(&self, chain_id: ChainId, pool_address: &str) -> Result<Option<PoolRecord>> {
        let addr = EthAddress::from_hex(pool_address).map_err(DomainError::from)?;
        let row = sqlx::query_as::<_, PoolRow>(
            r"
            SELECT id, chain_id, pool_address, has_active_positions,
                   last_sqrt_price_x96, last_tick, updated_at
            FROM pools
            WHERE chain_id = $1 AND pool_address = $2
            ",
        )
        .bind(chain_id_to_i64(chain_id))
        .bind(addr.as_slice())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self, pool), fields(chain_id = %pool.chain_id, pool_address = %pool.pool_address))]
    async fn save_pool(&self, pool: &PoolRecord) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO pools (
                id, chain_id, pool_address, has_active_positions,
                last_sqrt_price_x96, last_tick, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (chain_id, pool_address) DO UPDATE SET
                has_active_positions = EXCLUDED.has_active_positions,
                last_sqrt_price_x96 = EXCLUDED.last_sqrt_price_x96,
                last_tick = EXCLUDED.last_tick,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(pool.id)
        .bind(chain_id_to_i64(pool.chain_id))
        .bind(pool.pool_address.as_slice())
        .bind(pool.has_active_positions)
        .bind(&pool.last_sqrt_price_x96)
        .bind(pool.last_tick)
        .bind(pool.updated_at)
        .execute(&self.pool)
        .await?;

        debug!("pool saved");
        Ok(())
    }

    #[instrument(skip(self), fields(chain_id = %chain_id))]
    async fn get_active_pools(&self, chain_id: ChainId) -> Result<Vec<PoolRecord>> {
        let rows = sqlx::query_as::<_, PoolRow>(
            r"
            SELECT id, chain_id, pool_address, has_active_positions,
                   last_sqrt_price_x96, last_tick, updated_at
            FROM pools
            WHERE chain_id = $1 AND has_active_positions = true
            ",
        )
        .bind(chain_id_to_i64(chain_id))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self), fields(chain_id = %chain_id, pool_address = %pool_address))]
    async fn count_active_positions_for_pool(
        &self,
        chain_id: ChainId,
        pool_address: &str,
    ) -> Result<u64> {
        let addr = EthAddress::from_hex(pool_address).map_err(DomainError::from)?;
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM positions
            WHERE chain_id = $1 AND pool_address = $2 AND is_active = true
            ",
        )
        .bind(chain_id_to_i64(chain_id))
        .bind(addr.as_slice())
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u64)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SUBSCRIBER STORE IMPLEMENTATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Database row for poll-driven subscriber rows.
#[derive(Debug, FromRow)]
struct SubscriberRow {
    id: Uuid,
    chain_id: i64,
    entity_key: String,
    state: SubscriberState,
    last_polled_at: chrono::DateTime<chrono::Utc>,
    expires_after_ms: Option<i64>,
    paused_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TryFrom<SubscriberRow> for SubscriberRecord {
    type Error = crate::error::AppError;

    fn try_from(row: SubscriberRow) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            chain_id: chain_id_from_i64(row.chain_id)?,
            entity_key: row.entity_key,
            state: row.state,
            last_polled_at: row.last_polled_at,
            expires_after_ms: row.expires_after_ms,
            paused_at: row.paused_at,
        })
    }
}

#[async_trait]
impl SubscriberStore for PostgresStore {
    #[instrument(skip(self, subscriber), fields(id = %subscriber.id))]
    async fn save_subscriber(&self, subscriber: &SubscriberRecord) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO subscribers (
                id, chain_id, entity_key, state, last_polled_at,
                expires_after_ms, paused_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                state = EXCLUDED.state,
                last_polled_at = EXCLUDED.last_polled_at,
                expires_after_ms = EXCLUDED.expires_after_ms,
                paused_at = EXCLUDED.paused_at
            ",
        )
        .bind(subscriber.id)
        .bind(chain_id_to_i64(subscriber.chain_id))
        .bind(&subscriber.entity_key)
        .bind(subscriber.state)
        .bind(subscriber.last_polled_at)
        .bind(subscriber.expires_after_ms)
        .bind(subscriber.paused_at)
        .execute(&self.pool)
        .await?;

        debug!("subscriber saved");
        Ok(())
    }

    #[instrument(skip(self), fields(chain_id = %chain_id))]
    async fn get_active_subscribers(&self, chain_id: ChainId) -> Result<Vec<SubscriberRecord>> {
        let rows = sqlx::query_as::<_, SubscriberRow>(
            r"
            SELECT id, chain_id, entity_key, state, last_polled_at,
                   expires_after_ms, paused_at
            FROM subscribers
            WHERE chain_id = $1 AND state = $2
            ",
        )
        .bind(chain_id_to_i64(chain_id))
        .bind(SubscriberState::Active)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self), fields(chain_id = %chain_id, prune_threshold_ms = prune_threshold_ms))]
    async fn get_prunable_subscribers(
        &self,
        chain_id: ChainId,
        prune_threshold_ms: i64,
    ) -> Result<Vec<SubscriberRecord>> {
        let rows = sqlx::query_as::<_, SubscriberRow>(
            r"
            SELECT id, chain_id, entity_key, state, last_polled_at,
                   expires_after_ms, paused_at
            FROM subscribers
            WHERE chain_id = $1 AND state = $2
              AND paused_at IS NOT NULL
              AND EXTRACT(EPOCH FROM (now() - paused_at)) * 1000 > $3
            ",
        )
        .bind(chain_id_to_i64(chain_id))
        .bind(SubscriberState::Paused)
        .bind(prune_threshold_ms as f64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn delete_subscriber(&self, id: &Uuid) -> Result<()> {
        sqlx::query("DELETE FROM subscribers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!("subscriber deleted");
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// INDEXER STATE STORE IMPLEMENTATION
// ═══════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl IndexerStateStore for PostgresStore {
    #[instrument(skip(self), fields(chain_id = %chain_id, subsystem = subsystem))]
    async fn get_last_block(&self, chain_id: ChainId, subsystem: &str) -> Result<Option<u64>> {
        let row: Option<i64> = sqlx::query_scalar(
            "SELECT block_number FROM indexer_state WHERE chain_id = $1 AND subsystem = $2",
        )
        .bind(chain_id_to_i64(chain_id))
        .bind(subsystem)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|b| b as u64))
    }

    #[instrument(skip(self), fields(chain_id = %chain_id, subsystem = subsystem, block = block))]
    async fn set_last_block(&self, chain_id: ChainId, subsystem: &str, block: u64) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO indexer_state (chain_id, subsystem, block_number)
            VALUES ($1, $2, $3)
            ON CONFLICT (chain_id, subsystem) DO UPDATE SET block_number = EXCLUDED.block_number
            ",
        )
        .bind(chain_id_to_i64(chain_id))
        .bind(subsystem)
        .bind(block as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
