//! Worker that streams pool `Swap` events, address-keyed by pool address.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use alloy::rpc::types::Log;
use async_trait::async_trait;
use chain_rpc::types::LogFilter;
use chain_rpc::ChainRpc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::settings::{CatchupSettings, SubscriberLifecycleSettings};
use crate::error::Result;
use crate::indexer::{
    BlockTracker, CatchUpOrchestrator, LogClassifier, SubscriptionBatch, MAX_PER_BATCH,
};
use crate::ports::{Cache, EventPublisher, PoolStore};
use crate::scheduler::{ScheduleCallback, ScheduleConfig, Scheduler};
use crate::types::primitives::ChainId;
use crate::worker::classifiers::PoolPriceClassifier;
use crate::worker::{interval_cron_expression, Worker};

const SUBSYSTEM: &str = "pool-price";

type Batch<R, P> = SubscriptionBatch<R, P, PoolPriceClassifier>;

struct Inner<R, P, St, Ca> {
    chain_rpcs: HashMap<ChainId, Arc<R>>,
    publisher: Arc<P>,
    pool_store: Arc<St>,
    cache: Arc<Ca>,
    scheduler: Arc<Scheduler>,
    classifier: Arc<PoolPriceClassifier>,
    max_per_batch: usize,
    catchup: CatchupSettings,
    lifecycle: SubscriberLifecycleSettings,
    batches: RwLock<HashMap<ChainId, Vec<Arc<Batch<R, P>>>>>,
    subscribed_addresses: RwLock<HashMap<ChainId, HashSet<String>>>,
    schedule_ids: RwLock<Vec<Uuid>>,
}

/// Streams pool-price (`Swap`) events for every chain it's configured with.
pub struct PoolPriceWorker<R, P, St, Ca> {
    inner: Arc<Inner<R, P, St, Ca>>,
}

impl<R, P, St, Ca> PoolPriceWorker<R, P, St, Ca>
where
    R: ChainRpc + 'static,
    P: EventPublisher + 'static,
    St: PoolStore + 'static,
    Ca: Cache + 'static,
{
    #[must_use]
    pub fn new(
        chain_rpcs: HashMap<ChainId, Arc<R>>,
        publisher: Arc<P>,
        pool_store: Arc<St>,
        cache: Arc<Ca>,
        scheduler: Arc<Scheduler>,
        catchup: CatchupSettings,
        lifecycle: SubscriberLifecycleSettings,
        max_pools_per_connection: usize,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                chain_rpcs,
                publisher,
                pool_store,
                cache,
                scheduler,
                classifier: Arc::new(PoolPriceClassifier),
                max_per_batch: max_pools_per_connection.min(MAX_PER_BATCH),
                catchup,
                lifecycle,
                batches: RwLock::new(HashMap::new()),
                subscribed_addresses: RwLock::new(HashMap::new()),
                schedule_ids: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Handle a `position.created` event that references a pool: add the
    /// pool to a batch with capacity if it isn't already tracked.
    pub async fn on_pool_referenced(&self, chain_id: ChainId, pool_address: &str) -> Result<()> {
        on_pool_referenced(&self.inner, chain_id, pool_address).await
    }

    /// `position.closed`: remove the pool from its batch only if no other
    /// active position still references it.
    pub async fn on_position_closed(&self, chain_id: ChainId, pool_address: &str) -> Result<()> {
        let still_referenced = self
            .inner
            .pool_store
            .count_active_positions_for_pool(chain_id, pool_address)
            .await?
            > 0;
        if !still_referenced {
            remove_pool(&self.inner, chain_id, pool_address).await;
        }
        Ok(())
    }

    /// `position.deleted` / `position.burned` never removes a pool by
    /// itself; only a closed position with no remaining references does
    /// (see [`Self::on_position_closed`]).
    pub async fn on_position_removed(&self, _chain_id: ChainId, _pool_address: &str) {}
}

fn filter_for_members<X: LogClassifier>(classifier: &X, members: &[String]) -> LogFilter {
    let filter = LogFilter::unbounded().with_topic(0, classifier.event_signatures());
    classifier.apply_members(filter, members)
}

async fn publish_logs<X: LogClassifier, P: EventPublisher>(
    classifier: &X,
    publisher: &P,
    chain_id: ChainId,
    logs: Vec<Log>,
) {
    for log in logs {
        if log.removed {
            continue;
        }
        match classifier.envelope(chain_id, &log) {
            Ok((exchange, routing_key, payload)) => {
                if let Err(e) = publisher.publish(&exchange, &routing_key, &payload).await {
                    warn!(chain_id = %chain_id, error = %e, "failed to publish catch-up event");
                }
            }
            Err(e) => {
                warn!(chain_id = %chain_id, error = %e, "failed to build envelope for catch-up log");
            }
        }
    }
}

async fn start_chain<R, P, St, Ca>(
    inner: &Arc<Inner<R, P, St, Ca>>,
    chain_id: ChainId,
    rpc: Arc<R>,
) -> Result<()>
where
    R: ChainRpc + 'static,
    P: EventPublisher + 'static,
    St: PoolStore + 'static,
    Ca: Cache + 'static,
{
    let pools = inner.pool_store.get_active_pools(chain_id).await?;
    let addresses: Vec<String> = pools
        .iter()
        .map(|p| p.pool_address.to_hex())
        .collect();

    let mut chain_batches = Vec::new();
    for chunk in addresses.chunks(inner.max_per_batch.max(1)) {
        let batch: Arc<Batch<R, P>> = Arc::new(SubscriptionBatch::new(
            Arc::clone(&rpc),
            Arc::clone(&inner.publisher),
            Arc::clone(&inner.classifier),
            chain_id,
        ));
        for address in chunk {
            batch.add_member(address.clone()).await?;
        }
        batch.enable_buffering().await;
        batch.start(&batch).await?;
        chain_batches.push(batch);
    }

    if inner.catchup.enabled {
        let orchestrator = CatchUpOrchestrator::new(Arc::clone(&rpc), chain_id)
            .with_batch_size_blocks(inner.catchup.batch_size_blocks);
        let (finalized, head) = orchestrator.finality_split().await?;
        let filter = filter_for_members(&*inner.classifier, &addresses);

        let (result, logs) = orchestrator
            .scan_range(finalized + 1, head, filter.addresses, filter.topics)
            .await?;
        info!(
            chain_id = %chain_id,
            from = result.from_block,
            to = result.to_block,
            published = result.events_published,
            "pool-price non-finalized catch-up done"
        );
        publish_logs(&*inner.classifier, &*inner.publisher, chain_id, logs).await;
    }

    for batch in &chain_batches {
        batch.flush_buffer_and_disable_buffering().await;
    }

    inner.batches.write().await.insert(chain_id, chain_batches);
    inner
        .subscribed_addresses
        .write()
        .await
        .insert(chain_id, addresses.iter().cloned().collect());

    if inner.catchup.enabled {
        spawn_finalized_catchup(Arc::clone(inner), chain_id, rpc, addresses);
    }

    Ok(())
}

fn spawn_finalized_catchup<R, P, St, Ca>(
    inner: Arc<Inner<R, P, St, Ca>>,
    chain_id: ChainId,
    rpc: Arc<R>,
    addresses: Vec<String>,
) where
    R: ChainRpc + 'static,
    P: EventPublisher + 'static,
    St: PoolStore + 'static,
    Ca: Cache + 'static,
{
    tokio::spawn(async move {
        let tracker = BlockTracker::new(Arc::clone(&inner.cache), SUBSYSTEM);
        let from = match tracker.last_block(chain_id).await {
            Ok(Some(block)) => block,
            Ok(None) => 0,
            Err(e) => {
                warn!(chain_id = %chain_id, error = %e, "failed to read block tracker");
                return;
            }
        };

        let orchestrator = CatchUpOrchestrator::new(rpc, chain_id)
            .with_batch_size_blocks(inner.catchup.batch_size_blocks);
        let Ok((finalized, _head)) = orchestrator.finality_split().await else {
            return;
        };
        let filter = filter_for_members(&*inner.classifier, &addresses);

        match orchestrator
            .scan_range(from, finalized, filter.addresses, filter.topics)
            .await
        {
            Ok((result, logs)) => {
                publish_logs(&*inner.classifier, &*inner.publisher, chain_id, logs).await;
                if result.error.is_none() {
                    if let Err(e) = tracker.advance(chain_id, finalized).await {
                        warn!(chain_id = %chain_id, error = %e, "failed to advance block tracker");
                    }
                }
            }
            Err(e) => warn!(chain_id = %chain_id, error = %e, "finalized catch-up scan failed"),
        }
    });
}

async fn find_or_create_batch<R, P>(
    batches: &RwLock<HashMap<ChainId, Vec<Arc<Batch<R, P>>>>>,
    publisher: &Arc<P>,
    classifier: &Arc<PoolPriceClassifier>,
    chain_id: ChainId,
    rpc: &Arc<R>,
) -> Result<Arc<Batch<R, P>>>
where
    R: ChainRpc + 'static,
    P: EventPublisher + 'static,
{
    let mut batches = batches.write().await;
    let chain_batches = batches.entry(chain_id).or_default();
    for batch in chain_batches.iter() {
        if batch.has_capacity().await {
            return Ok(Arc::clone(batch));
        }
    }
    let batch: Arc<Batch<R, P>> = Arc::new(SubscriptionBatch::new(
        Arc::clone(rpc),
        Arc::clone(publisher),
        Arc::clone(classifier),
        chain_id,
    ));
    batch.start(&batch).await?;
    chain_batches.push(Arc::clone(&batch));
    Ok(batch)
}

async fn on_pool_referenced<R, P, St, Ca>(
    inner: &Arc<Inner<R, P, St, Ca>>,
    chain_id: ChainId,
    pool_address: &str,
) -> Result<()>
where
    R: ChainRpc + 'static,
    P: EventPublisher + 'static,
    St: PoolStore + 'static,
    Ca: Cache + 'static,
{
    let already_tracked = inner
        .subscribed_addresses
        .read()
        .await
        .get(&chain_id)
        .is_some_and(|addrs| addrs.contains(pool_address));
    if already_tracked {
        return Ok(());
    }

    let Some(rpc) = inner.chain_rpcs.get(&chain_id).cloned() else {
        warn!(chain_id = %chain_id, "pool-price worker has no RPC client for this chain");
        return Ok(());
    };
    let batch = find_or_create_batch(
        &inner.batches,
        &inner.publisher,
        &inner.classifier,
        chain_id,
        &rpc,
    )
    .await?;

    batch
        .enable_buffering_for_member(pool_address.to_string())
        .await;
    batch.add_member(pool_address.to_string()).await?;

    if inner.catchup.enabled {
        let orchestrator = CatchUpOrchestrator::new(rpc, chain_id)
            .with_batch_size_blocks(inner.catchup.batch_size_blocks);
        let (finalized, head) = orchestrator.finality_split().await?;
        let filter = filter_for_members(&*inner.classifier, &[pool_address.to_string()]);
        let (_, logs) = orchestrator
            .scan_range(finalized + 1, head, filter.addresses, filter.topics)
            .await?;
        publish_logs(&*inner.classifier, &*inner.publisher, chain_id, logs).await;
    }

    batch
        .flush_member_buffer_and_disable_buffering(pool_address)
        .await;

    inner
        .subscribed_addresses
        .write()
        .await
        .entry(chain_id)
        .or_default()
        .insert(pool_address.to_string());
    Ok(())
}

async fn remove_pool<R, P, St, Ca>(
    inner: &Arc<Inner<R, P, St, Ca>>,
    chain_id: ChainId,
    pool_address: &str,
) where
    R: ChainRpc + 'static,
    P: EventPublisher + 'static,
{
    if let Some(chain_batches) = inner.batches.read().await.get(&chain_id) {
        for batch in chain_batches {
            batch.remove_member(pool_address).await;
        }
    }
    if let Some(addresses) = inner.subscribed_addresses.write().await.get_mut(&chain_id) {
        addresses.remove(pool_address);
    }
}

async fn cleanup_inactive_pools<R, P, St, Ca>(inner: &Arc<Inner<R, P, St, Ca>>) -> Result<()>
where
    R: ChainRpc + 'static,
    P: EventPublisher + 'static,
    St: PoolStore + 'static,
    Ca: Cache + 'static,
{
    let chains: Vec<ChainId> = inner
        .subscribed_addresses
        .read()
        .await
        .keys()
        .copied()
        .collect();
    for chain_id in chains {
        let active: HashSet<String> = inner
            .pool_store
            .get_active_pools(chain_id)
            .await?
            .into_iter()
            .map(|p| p.pool_address.to_hex())
            .collect();

        let stale: Vec<String> = {
            let subscribed = inner.subscribed_addresses.read().await;
            let Some(addresses) = subscribed.get(&chain_id) else {
                continue;
            };
            addresses.difference(&active).cloned().collect()
        };

        for pool_address in stale {
            remove_pool(inner, chain_id, &pool_address).await;
        }
    }
    Ok(())
}

async fn heartbeat_once<R, P, St, Ca>(inner: &Arc<Inner<R, P, St, Ca>>) -> Result<()>
where
    R: ChainRpc + 'static,
{
    let tracker = BlockTracker::new(Arc::clone(&inner.cache), SUBSYSTEM);
    for (&chain_id, rpc) in &inner.chain_rpcs {
        let block = rpc.block_number().await?;
        tracker.heartbeat(chain_id, block).await?;
    }
    Ok(())
}

async fn start_timers<R, P, St, Ca>(inner: &Arc<Inner<R, P, St, Ca>>) -> Result<()>
where
    R: ChainRpc + 'static,
    P: EventPublisher + 'static,
    St: PoolStore + 'static,
    Ca: Cache + 'static,
{
    let heartbeat_inner = Arc::clone(inner);
    let heartbeat_callback: ScheduleCallback = Arc::new(move || {
        let inner = Arc::clone(&heartbeat_inner);
        Box::pin(async move { heartbeat_once(&inner).await })
    });
    let heartbeat_id = inner
        .scheduler
        .register_schedule(
            "pool-price-heartbeat",
            ScheduleConfig {
                cron_expression: interval_cron_expression(inner.catchup.heartbeat_interval()),
                description: "write chain head into the block tracker".to_string(),
                timezone: None,
                run_on_start: false,
            },
            heartbeat_callback,
        )
        .await?;

    let cleanup_inner = Arc::clone(inner);
    let cleanup_callback: ScheduleCallback = Arc::new(move || {
        let inner = Arc::clone(&cleanup_inner);
        Box::pin(async move { cleanup_inactive_pools(&inner).await })
    });
    let cleanup_id = inner
        .scheduler
        .register_schedule(
            "pool-price-cleanup",
            ScheduleConfig {
                cron_expression: interval_cron_expression(inner.lifecycle.cleanup_interval()),
                description: "remove pools with no remaining active positions".to_string(),
                timezone: None,
                run_on_start: false,
            },
            cleanup_callback,
        )
        .await?;

    let mut schedule_ids = inner.schedule_ids.write().await;
    schedule_ids.push(heartbeat_id);
    schedule_ids.push(cleanup_id);
    Ok(())
}

#[async_trait]
impl<R, P, St, Ca> Worker for PoolPriceWorker<R, P, St, Ca>
where
    R: ChainRpc + 'static,
    P: EventPublisher + 'static,
    St: PoolStore + 'static,
    Ca: Cache + 'static,
{
    fn name(&self) -> &'static str {
        "pool-price"
    }

    async fn start(&self) -> Result<()> {
        let chains: Vec<(ChainId, Arc<R>)> = self
            .inner
            .chain_rpcs
            .iter()
            .map(|(&id, rpc)| (id, Arc::clone(rpc)))
            .collect();
        for (chain_id, rpc) in chains {
            start_chain(&self.inner, chain_id, rpc).await?;
        }
        start_timers(&self.inner).await?;
        Ok(())
    }

    async fn stop(&self) {
        for id in self.inner.schedule_ids.read().await.iter() {
            self.inner.scheduler.unregister_schedule(*id).await;
        }
        let batches = self.inner.batches.read().await;
        for chain_batches in batches.values() {
            for batch in chain_batches {
                batch.stop().await;
            }
        }
    }
}
