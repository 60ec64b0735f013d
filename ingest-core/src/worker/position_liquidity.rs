//! Worker that streams NFT Position Manager liquidity events
//! (`IncreaseLiquidity`/`DecreaseLiquidity`/`Collect`) for every active
//! position, id-keyed by `tokenId`.

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
use crate::ports::{Cache, EventPublisher, PositionStore};
use crate::scheduler::{ScheduleCallback, ScheduleConfig, Scheduler};
use crate::types::primitives::ChainId;
use crate::worker::classifiers::PositionLiquidityClassifier;
use crate::worker::{interval_cron_expression, Worker};

const SUBSYSTEM: &str = "position-liquidity";

type Batch<R, P> = SubscriptionBatch<R, P, PositionLiquidityClassifier>;

struct Inner<R, P, St, Ca> {
    chain_rpcs: HashMap<ChainId, Arc<R>>,
    publisher: Arc<P>,
    position_store: Arc<St>,
    cache: Arc<Ca>,
    scheduler: Arc<Scheduler>,
    classifier: Arc<PositionLiquidityClassifier>,
    max_per_batch: usize,
    catchup: CatchupSettings,
    lifecycle: SubscriberLifecycleSettings,
    batches: RwLock<HashMap<ChainId, Vec<Arc<Batch<R, P>>>>>,
    subscribed_ids: RwLock<HashMap<ChainId, HashSet<String>>>,
    schedule_ids: RwLock<Vec<Uuid>>,
}

/// Streams position-liquidity events for every chain it's configured with.
pub struct PositionLiquidityWorker<R, P, St, Ca> {
    inner: Arc<Inner<R, P, St, Ca>>,
}

impl<R, P, St, Ca> PositionLiquidityWorker<R, P, St, Ca>
where
    R: ChainRpc + 'static,
    P: EventPublisher + 'static,
    St: PositionStore + 'static,
    Ca: Cache + 'static,
{
    #[must_use]
    pub fn new(
        chain_rpcs: HashMap<ChainId, Arc<R>>,
        publisher: Arc<P>,
        position_store: Arc<St>,
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
                position_store,
                cache,
                scheduler,
                classifier: Arc::new(PositionLiquidityClassifier),
                max_per_batch: max_pools_per_connection.min(MAX_PER_BATCH),
                catchup,
                lifecycle,
                batches: RwLock::new(HashMap::new()),
                subscribed_ids: RwLock::new(HashMap::new()),
                schedule_ids: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Handle a `position.created` domain event: add the position to a
    /// batch with capacity, replaying any history it missed before it
    /// existed in the subscriber's view.
    pub async fn on_position_created(&self, chain_id: ChainId, nft_id: &str) -> Result<()> {
        on_position_created(&self.inner, chain_id, nft_id).await
    }

    /// `position.closed` keeps the subscription: a closed position's NFT
    /// may receive new liquidity and reopen on the same id.
    pub async fn on_position_closed(&self, _chain_id: ChainId, _nft_id: &str) {}

    /// `position.deleted` / `position.burned` removes the id unconditionally.
    pub async fn on_position_removed(&self, chain_id: ChainId, nft_id: &str) {
        on_position_removed(&self.inner, chain_id, nft_id).await;
    }
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
    St: PositionStore + 'static,
    Ca: Cache + 'static,
{
    let positions = inner.position_store.get_active_positions(chain_id).await?;
    let ids: Vec<String> = positions
        .iter()
        .map(|p| p.member_key().to_string())
        .collect();

    let mut chain_batches = Vec::new();
    for chunk in ids.chunks(inner.max_per_batch.max(1)) {
        let batch: Arc<Batch<R, P>> = Arc::new(SubscriptionBatch::new(
            Arc::clone(&rpc),
            Arc::clone(&inner.publisher),
            Arc::clone(&inner.classifier),
            chain_id,
        ));
        for id in chunk {
            batch.add_member(id.clone()).await?;
        }
        batch.enable_buffering().await;
        batch.start(&batch).await?;
        chain_batches.push(batch);
    }

    if inner.catchup.enabled {
        let orchestrator = CatchUpOrchestrator::new(Arc::clone(&rpc), chain_id)
            .with_batch_size_blocks(inner.catchup.batch_size_blocks);
        let (finalized, head) = orchestrator.finality_split().await?;
        let filter = filter_for_members(&*inner.classifier, &ids);

        let (result, logs) = orchestrator
            .scan_range(finalized + 1, head, filter.addresses, filter.topics)
            .await?;
        info!(
            chain_id = %chain_id,
            from = result.from_block,
            to = result.to_block,
            published = result.events_published,
            "position-liquidity non-finalized catch-up done"
        );
        publish_logs(&*inner.classifier, &*inner.publisher, chain_id, logs).await;
    }

    for batch in &chain_batches {
        batch.flush_buffer_and_disable_buffering().await;
    }

    inner.batches.write().await.insert(chain_id, chain_batches);
    inner
        .subscribed_ids
        .write()
        .await
        .insert(chain_id, ids.iter().cloned().collect());

    if inner.catchup.enabled {
        spawn_finalized_catchup(Arc::clone(inner), chain_id, rpc, ids);
    }

    Ok(())
}

fn spawn_finalized_catchup<R, P, St, Ca>(
    inner: Arc<Inner<R, P, St, Ca>>,
    chain_id: ChainId,
    rpc: Arc<R>,
    ids: Vec<String>,
) where
    R: ChainRpc + 'static,
    P: EventPublisher + 'static,
    St: PositionStore + 'static,
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
        let filter = filter_for_members(&*inner.classifier, &ids);

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

async fn find_or_create_batch<R, P, St, Ca>(
    inner: &Arc<Inner<R, P, St, Ca>>,
    chain_id: ChainId,
    rpc: &Arc<R>,
) -> Result<Arc<Batch<R, P>>>
where
    R: ChainRpc + 'static,
    P: EventPublisher + 'static,
{
    let mut batches = inner.batches.write().await;
    let chain_batches = batches.entry(chain_id).or_default();
    for batch in chain_batches.iter() {
        if batch.has_capacity().await {
            return Ok(Arc::clone(batch));
        }
    }
    let batch: Arc<Batch<R, P>> = Arc::new(SubscriptionBatch::new(
        Arc::clone(rpc),
        Arc::clone(&inner.publisher),
        Arc::clone(&inner.classifier),
        chain_id,
    ));
    batch.start(&batch).await?;
    chain_batches.push(Arc::clone(&batch));
    Ok(batch)
}

async fn on_position_created<R, P, St, Ca>(
    inner: &Arc<Inner<R, P, St, Ca>>,
    chain_id: ChainId,
    nft_id: &str,
) -> Result<()>
where
    R: ChainRpc + 'static,
    P: EventPublisher + 'static,
    St: PositionStore + 'static,
    Ca: Cache + 'static,
{
    let already_tracked = inner
        .subscribed_ids
        .read()
        .await
        .get(&chain_id)
        .is_some_and(|ids| ids.contains(nft_id));
    if already_tracked {
        return Ok(());
    }

    let Some(rpc) = inner.chain_rpcs.get(&chain_id).cloned() else {
        warn!(chain_id = %chain_id, "position-liquidity worker has no RPC client for this chain");
        return Ok(());
    };
    let batch = find_or_create_batch(inner, chain_id, &rpc).await?;

    batch.enable_buffering_for_member(nft_id.to_string()).await;
    batch.add_member(nft_id.to_string()).await?;

    if inner.catchup.enabled {
        let orchestrator = CatchUpOrchestrator::new(rpc, chain_id)
            .with_batch_size_blocks(inner.catchup.batch_size_blocks);
        let (finalized, head) = orchestrator.finality_split().await?;
        let filter = filter_for_members(&*inner.classifier, &[nft_id.to_string()]);
        let (_, logs) = orchestrator
            .scan_range(finalized + 1, head, filter.addresses, filter.topics)
            .await?;
        publish_logs(&*inner.classifier, &*inner.publisher, chain_id, logs).await;
    }

    batch
        .flush_member_buffer_and_disable_buffering(nft_id)
        .await;

    inner
        .subscribed_ids
        .write()
        .await
        .entry(chain_id)
        .or_default()
        .insert(nft_id.to_string());
    Ok(())
}

async fn on_position_removed<R, P, St, Ca>(
    inner: &Arc<Inner<R, P, St, Ca>>,
    chain_id: ChainId,
    nft_id: &str,
) where
    R: ChainRpc + 'static,
    P: EventPublisher + 'static,
{
    if let Some(chain_batches) = inner.batches.read().await.get(&chain_id) {
        for batch in chain_batches {
            batch.remove_member(nft_id).await;
        }
    }
    if let Some(ids) = inner.subscribed_ids.write().await.get_mut(&chain_id) {
        ids.remove(nft_id);
    }
}

async fn cleanup_inactive_positions<R, P, St, Ca>(inner: &Arc<Inner<R, P, St, Ca>>) -> Result<()>
where
    R: ChainRpc + 'static,
    P: EventPublisher + 'static,
    St: PositionStore + 'static,
    Ca: Cache + 'static,
{
    let chains: Vec<ChainId> = inner.subscribed_ids.read().await.keys().copied().collect();
    for chain_id in chains {
        let active_ids: HashSet<String> = inner
            .position_store
            .get_active_positions(chain_id)
            .await?
            .into_iter()
            .map(|p| p.member_key().to_string())
            .collect();

        let stale: Vec<String> = {
            let subscribed = inner.subscribed_ids.read().await;
            let Some(ids) = subscribed.get(&chain_id) else {
                continue;
            };
            ids.difference(&active_ids).cloned().collect()
        };

        for nft_id in stale {
            on_position_removed(inner, chain_id, &nft_id).await;
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
    St: PositionStore + 'static,
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
            "position-liquidity-heartbeat",
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
        Box::pin(async move { cleanup_inactive_positions(&inner).await })
    });
    let cleanup_id = inner
        .scheduler
        .register_schedule(
            "position-liquidity-cleanup",
            ScheduleConfig {
                cron_expression: interval_cron_expression(inner.lifecycle.cleanup_interval()),
                description: "remove closed/deleted positions from their batches".to_string(),
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
impl<R, P, St, Ca> Worker for PositionLiquidityWorker<R, P, St, Ca>
where
    R: ChainRpc + 'static,
    P: EventPublisher + 'static,
    St: PositionStore + 'static,
    Ca: Cache + 'static,
{
    fn name(&self) -> &'static str {
        "position-liquidity"
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
