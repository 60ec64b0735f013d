//! Daily NAV snapshot rule.
//!
//! Three-phase pipeline, run once a day:
//! 1. **Refresh** — batch-read every watched pool's `slot0` price via
//!    multicall, value every active position against it through the
//!    [`PositionValuer`] port, persist the refreshed pool/position state,
//!    and publish a `position.state.refreshed` domain event per position.
//! 2. **Prices** — fetch the current token list and reporting-currency
//!    prices from the external market-data source, caching them for
//!    downstream valuation to read.
//! 3. **Snapshot** — ask the ledger for every user with an active position,
//!    aggregate their cumulative double-entry balances, and persist one
//!    snapshot row per user.
//!
//! Tick-to-amount math and double-entry bookkeeping are not implemented
//! here: they live behind [`PositionValuer`] and [`LedgerJournal`]
//! respectively, consumed as opaque interfaces.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use chain_rpc::{ChainRpc, MulticallCall};
use chrono::Utc;
use tracing::{info, warn};

use crate::abi::uniswap_v3::slot0Call;
use crate::error::Result;
use crate::ports::{
    Cache, EventPublisher, LedgerJournal, MarketDataSource, PoolStore, PositionStore,
    PositionValuationInput, PositionValuer,
};
use crate::rules::BusinessRule;
use crate::scheduler::{ScheduleCallback, ScheduleConfig, Scheduler};
use crate::types::entities::PositionRecord;
use crate::types::events::{DomainEventEnvelope, EntityType};
use crate::types::primitives::{ChainId, EthAddress};
use crate::worker::run_multicall_batches;

const RULE_NAME: &str = "daily-nav-snapshot";
const PRICES_CACHE_KEY: &str = "rule:daily-nav-snapshot:quote-prices";
const PRICES_TTL: Duration = Duration::from_secs(25 * 60 * 60);
const DEFAULT_MULTICALL_WINDOW: usize = 50;

/// Runs the Refresh/Prices/Snapshot pipeline once a day.
pub struct NavSnapshotRule<R, St, Po, V, M, L, P, Ca> {
    chain_rpcs: HashMap<ChainId, Arc<R>>,
    position_store: Arc<St>,
    pool_store: Arc<Po>,
    valuer: Arc<V>,
    market_data: Arc<M>,
    ledger: Arc<L>,
    publisher: Arc<P>,
    cache: Arc<Ca>,
    scheduler: Arc<Scheduler>,
    multicall_window: usize,
}

impl<R, St, Po, V, M, L, P, Ca> NavSnapshotRule<R, St, Po, V, M, L, P, Ca>
where
    R: ChainRpc + 'static,
    St: PositionStore + 'static,
    Po: PoolStore + 'static,
    V: PositionValuer + 'static,
    M: MarketDataSource + 'static,
    L: LedgerJournal + 'static,
    P: EventPublisher + 'static,
    Ca: Cache + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chain_rpcs: HashMap<ChainId, Arc<R>>,
        position_store: Arc<St>,
        pool_store: Arc<Po>,
        valuer: Arc<V>,
        market_data: Arc<M>,
        ledger: Arc<L>,
        publisher: Arc<P>,
        cache: Arc<Ca>,
        scheduler: Arc<Scheduler>,
    ) -> Self {
        Self {
            chain_rpcs,
            position_store,
            pool_store,
            valuer,
            market_data,
            ledger,
            publisher,
            cache,
            scheduler,
            multicall_window: DEFAULT_MULTICALL_WINDOW,
        }
    }
}

async fn refresh_phase<R, St, Po, V, P>(
    chain_rpcs: &HashMap<ChainId, Arc<R>>,
    position_store: &Arc<St>,
    pool_store: &Arc<Po>,
    valuer: &Arc<V>,
    publisher: &Arc<P>,
    multicall_window: usize,
) -> Result<()>
where
    R: ChainRpc,
    St: PositionStore,
    Po: PoolStore,
    V: PositionValuer,
    P: EventPublisher,
{
    for (chain_id, rpc) in chain_rpcs {
        let positions = position_store.get_active_positions(*chain_id).await?;
        if positions.is_empty() {
            continue;
        }

        let mut pool_addresses: Vec<EthAddress> = Vec::new();
        for position in &positions {
            if !pool_addresses.contains(&position.pool_address) {
                pool_addresses.push(position.pool_address);
            }
        }

        let calls: Vec<MulticallCall> = pool_addresses
            .iter()
            .map(|addr| {
                MulticallCall::new(
                    Address::from(*addr),
                    Bytes::from(slot0Call {}.abi_encode()),
                )
            })
            .collect();
        let results = run_multicall_batches(rpc.as_ref(), calls, multicall_window).await?;

        let mut prices: HashMap<EthAddress, (U256, i32)> = HashMap::new();
        for (addr, result) in pool_addresses.iter().zip(results.iter()) {
            if !result.success {
                warn!(chain_id = %chain_id, pool = %addr.to_hex(), "slot0 multicall read failed");
                continue;
            }
            match slot0Call::abi_decode_returns(&result.return_data) {
                Ok(ret) => {
                    prices.insert(*addr, (U256::from(ret.sqrtPriceX96), ret.tick.as_i32()));
                }
                Err(e) => {
                    warn!(chain_id = %chain_id, pool = %addr.to_hex(), error = %e, "failed to decode slot0 return");
                }
            }
        }

        for mut pool in pool_store.get_active_pools(*chain_id).await? {
            if let Some((sqrt_price, tick)) = prices.get(&pool.pool_address) {
                pool.last_sqrt_price_x96 = Some(sqrt_price.to_string());
                pool.last_tick = Some(*tick);
                pool.updated_at = Utc::now();
                pool_store.save_pool(&pool).await?;
            }
        }

        for position in positions {
            let Some((sqrt_price, tick)) = prices.get(&position.pool_address) else {
                continue;
            };
            refresh_position(position, *chain_id, *sqrt_price, *tick, valuer, position_store, publisher).await?;
        }
    }
    Ok(())
}

async fn refresh_position<St, V, P>(
    position: PositionRecord,
    chain_id: ChainId,
    sqrt_price_x96: U256,
    current_tick: i32,
    valuer: &Arc<V>,
    position_store: &Arc<St>,
    publisher: &Arc<P>,
) -> Result<()>
where
    St: PositionStore,
    V: PositionValuer,
    P: EventPublisher,
{
    let input = PositionValuationInput {
        liquidity: position.liquidity.clone(),
        tick_lower: position.tick_lower,
        tick_upper: position.tick_upper,
        sqrt_price_x96: sqrt_price_x96.to_string(),
        current_tick,
        tokens_owed0: "0".to_string(),
        tokens_owed1: "0".to_string(),
    };
    let valuation = valuer.value_position(&input).await?;

    let mut updated = position;
    updated.current_value = Some(valuation.current_value.clone());
    updated.unrealized_pnl = Some(valuation.unrealized_pnl.clone());
    updated.unclaimed_fees = Some(valuation.unclaimed_fees.clone());
    updated.updated_at = Utc::now();
    position_store.save_position(&updated).await?;

    let envelope = DomainEventEnvelope {
        event_type: "position.state.refreshed".to_string(),
        chain_id,
        entity_id: updated.nft_id,
        entity_type: EntityType::Position,
        user_id: None,
        payload: serde_json::json!({
            "currentValue": valuation.current_value,
            "unrealizedPnl": valuation.unrealized_pnl,
            "unclaimedFees": valuation.unclaimed_fees,
        }),
        source: format!("rule:{RULE_NAME}"),
        received_at: Utc::now(),
        block_number: None,
        transaction_hash: None,
        log_index: None,
    };
    if let Err(e) = publisher.publish_domain_event(&envelope).await {
        warn!(error = %e, "failed to publish position.state.refreshed");
    }
    Ok(())
}

async fn prices_phase<M, Ca>(market_data: &Arc<M>, cache: &Arc<Ca>) -> Result<()>
where
    M: MarketDataSource,
    Ca: Cache,
{
    let ids = market_data.fetch_token_list().await?;
    let prices = market_data.fetch_prices(&ids).await?;
    info!(count = prices.len(), "fetched quote-token prices");
    cache.set_json(PRICES_CACHE_KEY, &prices, PRICES_TTL).await
}

async fn snapshot_phase<L: LedgerJournal>(ledger: &Arc<L>) -> Result<()> {
    let users = ledger.users_with_active_positions().await?;
    for user_id in users {
        match ledger.aggregate_user_balances(&user_id).await {
            Ok(snapshot) => {
                if let Err(e) = ledger.save_snapshot(&snapshot).await {
                    warn!(user_id = %user_id, error = %e, "failed to save NAV snapshot");
                }
            }
            Err(e) => warn!(user_id = %user_id, error = %e, "failed to aggregate NAV for user"),
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_once<R, St, Po, V, M, L, P, Ca>(
    chain_rpcs: &HashMap<ChainId, Arc<R>>,
    position_store: &Arc<St>,
    pool_store: &Arc<Po>,
    valuer: &Arc<V>,
    market_data: &Arc<M>,
    ledger: &Arc<L>,
    publisher: &Arc<P>,
    cache: &Arc<Ca>,
    multicall_window: usize,
) -> Result<()>
where
    R: ChainRpc,
    St: PositionStore,
    Po: PoolStore,
    V: PositionValuer,
    M: MarketDataSource,
    L: LedgerJournal,
    P: EventPublisher,
    Ca: Cache,
{
    refresh_phase(chain_rpcs, position_store, pool_store, valuer, publisher, multicall_window).await?;
    prices_phase(market_data, cache).await?;
    snapshot_phase(ledger).await?;
    Ok(())
}

#[async_trait]
impl<R, St, Po, V, M, L, P, Ca> BusinessRule for NavSnapshotRule<R, St, Po, V, M, L, P, Ca>
where
    R: ChainRpc + 'static,
    St: PositionStore + 'static,
    Po: PoolStore + 'static,
    V: PositionValuer + 'static,
    M: MarketDataSource + 'static,
    L: LedgerJournal + 'static,
    P: EventPublisher + 'static,
    Ca: Cache + 'static,
{
    fn name(&self) -> &'static str {
        RULE_NAME
    }

    fn description(&self) -> &'static str {
        "refresh position/pool state and write a daily per-user NAV snapshot"
    }

    async fn on_startup(&self) -> Result<()> {
        let chain_rpcs = self.chain_rpcs.clone();
        let position_store = Arc::clone(&self.position_store);
        let pool_store = Arc::clone(&self.pool_store);
        let valuer = Arc::clone(&self.valuer);
        let market_data = Arc::clone(&self.market_data);
        let ledger = Arc::clone(&self.ledger);
        let publisher = Arc::clone(&self.publisher);
        let cache = Arc::clone(&self.cache);
        let multicall_window = self.multicall_window;

        let callback: ScheduleCallback = Arc::new(move || {
            let chain_rpcs = chain_rpcs.clone();
            let position_store = Arc::clone(&position_store);
            let pool_store = Arc::clone(&pool_store);
            let valuer = Arc::clone(&valuer);
            let market_data = Arc::clone(&market_data);
            let ledger = Arc::clone(&ledger);
            let publisher = Arc::clone(&publisher);
            let cache = Arc::clone(&cache);
            Box::pin(async move {
                run_once(
                    &chain_rpcs,
                    &position_store,
                    &pool_store,
                    &valuer,
                    &market_data,
                    &ledger,
                    &publisher,
                    &cache,
                    multicall_window,
                )
                .await
            })
        });

        self.scheduler
            .register_schedule(
                RULE_NAME,
                ScheduleConfig {
                    cron_expression: "0 0 * * *".to_string(),
                    description: self.description().to_string(),
                    timezone: Some("UTC".to_string()),
                    run_on_start: false,
                },
                callback,
            )
            .await?;
        Ok(())
    }

    async fn on_shutdown(&self) {
        self.scheduler.unregister_all_for_rule(RULE_NAME).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::cache_mocks::MockCache;
    use crate::ports::ledger_mocks::MockLedgerJournal;
    use crate::ports::market_data_mocks::MockMarketDataSource;
    use crate::ports::store_mocks::{MockPoolStore, MockPositionStore};
    use crate::ports::streaming_mocks::MockEventPublisher;
    use crate::ports::valuation_mocks::FixedPositionValuer;
    use chain_rpc::mock::MockChainRpc;

    #[tokio::test]
    async fn snapshot_phase_saves_one_row_per_user() {
        let mut balances = HashMap::new();
        balances.insert("user-1".to_string(), "100.00".to_string());
        balances.insert("user-2".to_string(), "250.00".to_string());
        let ledger = Arc::new(MockLedgerJournal::new(
            vec!["user-1".to_string(), "user-2".to_string()],
            balances,
        ));

        snapshot_phase(&ledger).await.unwrap();
        assert_eq!(ledger.saved.read().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn refresh_phase_skips_positions_without_a_price() {
        let position_store = Arc::new(MockPositionStore::new());
        let pool_store = Arc::new(MockPoolStore::new());
        let valuer = Arc::new(FixedPositionValuer::zero());
        let publisher = Arc::new(MockEventPublisher::new());
        let chain_rpcs: HashMap<ChainId, Arc<MockChainRpc>> = HashMap::new();

        // No chains registered: refresh is a no-op, not an error.
        refresh_phase(
            &chain_rpcs,
            &position_store,
            &pool_store,
            &valuer,
            &publisher,
            DEFAULT_MULTICALL_WINDOW,
        )
        .await
        .unwrap();
        assert_eq!(publisher.count(), 0);
    }

    #[tokio::test]
    async fn prices_phase_caches_fetched_prices() {
        let market_data = Arc::new(MockMarketDataSource::new(vec!["ethereum".to_string()]));
        market_data
            .prices
            .write()
            .unwrap()
            .insert("ethereum".to_string(), "3000.00".to_string());
        let cache = Arc::new(MockCache::new());

        prices_phase(&market_data, &cache).await.unwrap();
        let cached: Option<HashMap<String, String>> =
            cache.get_json(PRICES_CACHE_KEY).await.unwrap();
        assert_eq!(cached.unwrap()["ethereum"], "3000.00");
    }
}
