//! Token-list refresh rule.
//!
//! Refreshes the supported token-id list from the external market-data
//! source once a day. Gated by a 24h cache key so a scheduler double-fire
//! (or an overlapping manual trigger) is a no-op rather than a duplicate
//! external fetch.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::error::Result;
use crate::ports::{Cache, MarketDataSource};
use crate::rules::BusinessRule;
use crate::scheduler::{ScheduleCallback, ScheduleConfig, Scheduler};

const RULE_NAME: &str = "refresh-coingecko-tokens";
const LAST_RUN_CACHE_KEY: &str = "rule:refresh-coingecko-tokens:last-run";
const GATE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Refreshes the token list once per day, idempotently.
pub struct TokenListRefreshRule<Ca, M> {
    cache: Arc<Ca>,
    market_data: Arc<M>,
    scheduler: Arc<Scheduler>,
}

impl<Ca, M> TokenListRefreshRule<Ca, M>
where
    Ca: Cache + 'static,
    M: MarketDataSource + 'static,
{
    pub fn new(cache: Arc<Ca>, market_data: Arc<M>, scheduler: Arc<Scheduler>) -> Self {
        Self {
            cache,
            market_data,
            scheduler,
        }
    }
}

async fn run_once<Ca, M>(cache: &Arc<Ca>, market_data: &Arc<M>) -> Result<()>
where
    Ca: Cache,
    M: MarketDataSource,
{
    if cache.get(LAST_RUN_CACHE_KEY).await?.is_some() {
        info!("token-list refresh already ran within the last 24h, skipping");
        return Ok(());
    }

    let tokens = market_data.fetch_token_list().await?;
    info!(count = tokens.len(), "refreshed token list");

    cache
        .set(LAST_RUN_CACHE_KEY, Utc::now().to_rfc3339(), GATE_TTL)
        .await?;
    Ok(())
}

#[async_trait]
impl<Ca, M> BusinessRule for TokenListRefreshRule<Ca, M>
where
    Ca: Cache + 'static,
    M: MarketDataSource + 'static,
{
    fn name(&self) -> &'static str {
        RULE_NAME
    }

    fn description(&self) -> &'static str {
        "refresh the supported token-id list from the external market-data source"
    }

    async fn on_startup(&self) -> Result<()> {
        let cache = Arc::clone(&self.cache);
        let market_data = Arc::clone(&self.market_data);
        let callback: ScheduleCallback = Arc::new(move || {
            let cache = Arc::clone(&cache);
            let market_data = Arc::clone(&market_data);
            Box::pin(async move { run_once(&cache, &market_data).await })
        });

        self.scheduler
            .register_schedule(
                RULE_NAME,
                ScheduleConfig {
                    cron_expression: "17 3 * * *".to_string(),
                    description: self.description().to_string(),
                    timezone: Some("UTC".to_string()),
                    run_on_start: true,
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
    use crate::ports::market_data_mocks::MockMarketDataSource;

    #[tokio::test]
    async fn second_call_within_24h_skips_fetch() {
        let cache = Arc::new(MockCache::new());
        let market_data = Arc::new(MockMarketDataSource::new(vec!["ethereum".to_string()]));

        run_once(&cache, &market_data).await.unwrap();
        assert_eq!(market_data.token_list_call_count(), 1);

        run_once(&cache, &market_data).await.unwrap();
        assert_eq!(
            market_data.token_list_call_count(),
            1,
            "second run within the gate window must not re-fetch"
        );
    }

    #[tokio::test]
    async fn rule_registers_and_unregisters_its_schedule() {
        let cache = Arc::new(MockCache::new());
        let market_data = Arc::new(MockMarketDataSource::new(vec![]));
        let scheduler = Arc::new(Scheduler::new());

        let rule = TokenListRefreshRule::new(cache, market_data, Arc::clone(&scheduler));
        rule.on_startup().await.unwrap();
        assert_eq!(scheduler.all_tasks().await.len(), 1);

        rule.on_shutdown().await;
        assert_eq!(scheduler.all_tasks().await.len(), 0);
    }
}
