//! Worker shells: long-running subsystems that own one or more
//! [`crate::indexer::SubscriptionBatch`]es and keep them in sync with the
//! active-entity set, plus a [`Coordinator`] that starts/stops them together.
//!
//! A worker is not itself the batching/streaming machinery — that's
//! `indexer::SubscriptionBatch` and `indexer::CatchUpOrchestrator`. A worker
//! is the glue: it decides how many batches to run, which members go in
//! which batch, and how to react when a domain event says an entity was
//! created, closed, or deleted.

mod classifiers;
pub mod nfpm_transfer;
pub mod pool_price;
pub mod position_liquidity;

pub use classifiers::{NfpmTransferClassifier, PositionLiquidityClassifier, PoolPriceClassifier};
pub use nfpm_transfer::NfpmTransferWorker;
pub use pool_price::PoolPriceWorker;
pub use position_liquidity::PositionLiquidityWorker;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chain_rpc::{ChainRpc, MulticallCall, MulticallResult};
use tracing::{error, info};

use crate::error::Result;

/// Builds a cron expression that fires roughly every `interval`.
///
/// The [`crate::scheduler::Scheduler`] accepts both the standard 5-field
/// minute-granularity form and the `cron` crate's native 6-field form with
/// a leading seconds field. Sub-minute intervals use the seconds field
/// directly (`*/N * * * * *`); everything else is rounded to the nearest
/// minute, since a heartbeat or cleanup timer has no need for tighter
/// precision than that.
#[must_use]
pub fn interval_cron_expression(interval: Duration) -> String {
    let total_secs = interval.as_secs().max(1);
    if total_secs < 60 {
        format!("*/{total_secs} * * * * *")
    } else {
        let minutes = ((total_secs + 30) / 60).clamp(1, 59);
        format!("*/{minutes} * * * *")
    }
}

/// A long-running subsystem managed by the [`Coordinator`].
#[async_trait]
pub trait Worker: Send + Sync {
    /// Short name used in logs and metrics labels.
    fn name(&self) -> &'static str;

    /// Bring the worker up: load initial state, partition members into
    /// batches, start streaming and catch-up. Returns once the worker is
    /// live (catch-up against the finalized tip may continue in the
    /// background).
    async fn start(&self) -> Result<()>;

    /// Tear the worker down: stop membership-sync timers, then batches,
    /// then connections, in that order.
    async fn stop(&self);
}

/// Starts and stops a fixed set of [`Worker`]s together.
///
/// Workers start concurrently; a failure in one does not block the others
/// from starting, but the first error is surfaced to the caller once every
/// worker has had a chance to start. Workers stop in registration order,
/// sequentially, since shutdown is not latency-sensitive and sequential
/// stopping keeps log output easy to follow.
#[derive(Default)]
pub struct Coordinator {
    workers: Vec<Arc<dyn Worker>>,
}

impl Coordinator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            workers: Vec::new(),
        }
    }

    pub fn register(&mut self, worker: Arc<dyn Worker>) {
        self.workers.push(worker);
    }

    /// Start every registered worker concurrently. Returns the first error
    /// encountered, if any, after every worker has attempted to start.
    pub async fn start_all(&self) -> Result<()> {
        let mut handles = Vec::with_capacity(self.workers.len());
        for worker in &self.workers {
            let worker = Arc::clone(worker);
            handles.push(tokio::spawn(
                async move { (worker.name(), worker.start().await) },
            ));
        }

        let mut first_err = None;
        for handle in handles {
            match handle.await {
                Ok((name, Ok(()))) => info!(worker = name, "worker started"),
                Ok((name, Err(e))) => {
                    error!(worker = name, error = %e, "worker failed to start");
                    first_err.get_or_insert(e);
                }
                Err(join_err) => {
                    error!(error = %join_err, "worker start task panicked");
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Stop every registered worker, in registration order.
    pub async fn stop_all(&self) {
        for worker in &self.workers {
            info!(worker = worker.name(), "stopping worker");
            worker.stop().await;
        }
    }
}

/// Runs a batch of multicall reads in fixed-size chunks and concatenates
/// the results in call order.
///
/// Shared by workers and business rules that refresh on-chain state for a
/// large member set: chunking keeps a single `eth_call` payload (and the
/// node's per-call gas/size limits) bounded regardless of how many entities
/// are being refreshed.
///
/// # Errors
/// Returns the first RPC error encountered; a failing chunk aborts the
/// whole refresh rather than returning partial results, since callers
/// generally need every result to line up positionally with their input.
pub async fn run_multicall_batches<R: ChainRpc + ?Sized>(
    rpc: &R,
    calls: Vec<MulticallCall>,
    chunk_size: usize,
) -> Result<Vec<MulticallResult>> {
    let mut results = Vec::with_capacity(calls.len());
    for chunk in calls.chunks(chunk_size.max(1)) {
        let chunk_results = rpc.multicall(chunk.to_vec()).await?;
        results.extend(chunk_results);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn interval_cron_expression_uses_seconds_field_below_a_minute() {
        assert_eq!(interval_cron_expression(Duration::from_secs(15)), "*/15 * * * * *");
        assert_eq!(interval_cron_expression(Duration::from_millis(500)), "*/1 * * * * *");
    }

    #[test]
    fn interval_cron_expression_rounds_to_minutes_at_and_above_a_minute() {
        assert_eq!(interval_cron_expression(Duration::from_secs(60)), "*/1 * * * *");
        assert_eq!(interval_cron_expression(Duration::from_secs(300)), "*/5 * * * *");
        assert_eq!(interval_cron_expression(Duration::from_secs(90)), "*/2 * * * *");
    }

    struct CountingWorker {
        label: &'static str,
        starts: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Worker for CountingWorker {
        fn name(&self) -> &'static str {
            self.label
        }

        async fn start(&self) -> Result<()> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(crate::error::AppError::Initialization(
                    "boom".to_string(),
                ));
            }
            Ok(())
        }

        async fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn coordinator_starts_all_workers_even_if_one_fails() {
        let starts = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));

        let mut coordinator = Coordinator::new();
        coordinator.register(Arc::new(CountingWorker {
            label: "ok",
            starts: Arc::clone(&starts),
            stops: Arc::clone(&stops),
            fail: false,
        }));
        coordinator.register(Arc::new(CountingWorker {
            label: "bad",
            starts: Arc::clone(&starts),
            stops: Arc::clone(&stops),
            fail: true,
        }));

        let result = coordinator.start_all().await;
        assert!(result.is_err());
        assert_eq!(starts.load(Ordering::SeqCst), 2);

        coordinator.stop_all().await;
        assert_eq!(stops.load(Ordering::SeqCst), 2);
    }
}
