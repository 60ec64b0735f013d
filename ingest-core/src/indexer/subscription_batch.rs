//! `SubscriptionBatch`: a live log subscription shared by up to
//! [`MAX_PER_BATCH`] filter keys on one chain.
//!
//! Mirrors the keep-alive/reconnect shape of a streaming WebSocket
//! processor, generalised over the [`chain_rpc::ChainRpc`] port and
//! parametrised by a [`LogClassifier`] that knows how to extract a member
//! key and build a routing envelope for a given component (position
//! liquidity, pool swaps, NFPM transfers, close-order lifecycle, ...).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::B256;
use alloy::rpc::types::Log;
use chain_rpc::{ChainRpc, LogFilter};
use tokio::sync::{Mutex, Notify, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

use crate::error::{DomainError, Result};
use crate::ports::EventPublisher;
use crate::types::enums::{BatchMode, ConnectionState};
use crate::types::primitives::ChainId;

/// Maximum number of filter keys a single batch may hold.
pub const MAX_PER_BATCH: usize = 1000;

/// Default linear-backoff unit for automatic reconnects.
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

/// Default cap on automatic reconnect attempts before giving up.
const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// A ready-to-publish message: exchange, routing key, payload bytes.
type Envelope = (String, String, Vec<u8>);

/// Knows how to turn a raw log into a member key and a publishable
/// envelope for one component (e.g. position-liquidity, pool-swaps).
pub trait LogClassifier: Send + Sync {
    /// Extract the member key this log belongs to (pool address for
    /// address-keyed batches, NFT id for id-keyed batches). `None` if the
    /// log doesn't map to a tracked member.
    fn member_key(&self, log: &Log) -> Option<String>;

    /// Build the `(exchange, routing_key, payload)` this log should be
    /// published as.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be decoded into this
    /// component's event shape.
    fn envelope(&self, chain_id: ChainId, log: &Log) -> Result<Envelope>;

    /// Event signatures this batch subscribes to.
    fn event_signatures(&self) -> Vec<B256>;

    /// Apply the current membership onto a base filter: an address list
    /// for address-keyed batches (pool swaps), or an indexed-topic union
    /// for id-keyed batches (position liquidity, NFPM transfers).
    fn apply_members(&self, filter: LogFilter, members: &[String]) -> LogFilter;
}

/// Why the supervisor loop's inner receive loop broke, deciding whether
/// the next reconnect attempt pays the backoff delay.
enum BreakReason {
    /// Membership changed or `stop()` was called; reconnect/exit immediately.
    Intentional,
    /// Subscription error or the log stream ended; backoff before retrying.
    Errored,
}

/// A live log subscription shared by a set of filter keys on one chain.
pub struct SubscriptionBatch<R, P, X> {
    rpc: Arc<R>,
    publisher: Arc<P>,
    classifier: Arc<X>,
    chain_id: ChainId,
    state: RwLock<ConnectionState>,
    members: RwLock<HashSet<String>>,
    mode: RwLock<BatchMode>,
    buffering_members: RwLock<HashSet<String>>,
    global_buffer: Mutex<Vec<Envelope>>,
    member_buffers: Mutex<HashMap<String, Vec<Envelope>>>,
    block_observer: RwLock<Option<Arc<dyn Fn(u64) + Send + Sync>>>,
    cancel: RwLock<Option<CancellationToken>>,
    reconnect_notify: Notify,
    base_delay: Duration,
    max_reconnect_attempts: u32,
}

impl<R, P, X> std::fmt::Debug for SubscriptionBatch<R, P, X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionBatch")
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

impl<R, P, X> SubscriptionBatch<R, P, X>
where
    R: ChainRpc + 'static,
    P: EventPublisher + 'static,
    X: LogClassifier + 'static,
{
    /// Build an idle batch for a chain.
    #[must_use]
    pub fn new(rpc: Arc<R>, publisher: Arc<P>, classifier: Arc<X>, chain_id: ChainId) -> Self {
        Self {
            rpc,
            publisher,
            classifier,
            chain_id,
            state: RwLock::new(ConnectionState::Idle),
            members: RwLock::new(HashSet::new()),
            mode: RwLock::new(BatchMode::Normal),
            buffering_members: RwLock::new(HashSet::new()),
            global_buffer: Mutex::new(Vec::new()),
            member_buffers: Mutex::new(HashMap::new()),
            block_observer: RwLock::new(None),
            cancel: RwLock::new(None),
            reconnect_notify: Notify::new(),
            base_delay: DEFAULT_BASE_DELAY,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }

    /// Current connection state.
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Whether another member can still be added.
    pub async fn has_capacity(&self) -> bool {
        self.members.read().await.len() < MAX_PER_BATCH
    }

    /// Whether `key` is a current member.
    pub async fn has_member(&self, key: &str) -> bool {
        self.members.read().await.contains(key)
    }

    /// Number of current members.
    pub async fn member_count(&self) -> usize {
        self.members.read().await.len()
    }

    /// Start the batch: Idle/Stopped → Connecting → Connected, and spawn
    /// the supervisor task that owns the underlying subscription.
    ///
    /// # Errors
    ///
    /// Returns a conflict error if the batch is already running.
    #[instrument(skip(self), fields(chain_id = %self.chain_id))]
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        {
            let state = *self.state.read().await;
            if !state.can_start() {
                return Err(DomainError::Conflict(format!("subscription batch already {state}")).into());
            }
        }

        let cancel = CancellationToken::new();
        *self.cancel.write().await = Some(cancel.clone());

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.supervise(cancel).await;
        });

        Ok(())
    }

    /// Stop the batch: cancel the supervisor, release the subscription,
    /// state → Stopped. Idempotent.
    #[instrument(skip(self), fields(chain_id = %self.chain_id))]
    pub async fn stop(&self) {
        if let Some(cancel) = self.cancel.write().await.take() {
            cancel.cancel();
        }
        *self.state.write().await = ConnectionState::Stopped;
    }

    /// Add a member. Triggers an intentional reconnect if already running;
    /// triggers `start()` if currently idle with no prior members.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch is already at [`MAX_PER_BATCH`].
    #[instrument(skip(self), fields(chain_id = %self.chain_id, member = %key))]
    pub async fn add_member(self: &Arc<Self>, key: impl Into<String>) -> Result<()> {
        let key = key.into();
        let was_empty = {
            let mut members = self.members.write().await;
            if members.len() >= MAX_PER_BATCH && !members.contains(&key) {
                return Err(DomainError::CapacityExceeded {
                    chain_id: self.chain_id.as_u64(),
                    batch_index: 0,
                    max: MAX_PER_BATCH,
                }
                .into());
            }
            let was_empty = members.is_empty();
            members.insert(key);
            was_empty
        };

        let state = *self.state.read().await;
        if state.is_live() {
            self.reconnect_notify.notify_one();
        } else if was_empty && state.can_start() {
            self.start().await?;
        }
        Ok(())
    }

    /// Remove a member. Triggers an intentional reconnect if still running
    /// and non-empty; stops the batch if membership is now empty.
    /// Idempotent.
    #[instrument(skip(self), fields(chain_id = %self.chain_id, member = %key))]
    pub async fn remove_member(&self, key: &str) {
        let now_empty = {
            let mut members = self.members.write().await;
            members.remove(key);
            members.is_empty()
        };
        self.buffering_members.write().await.remove(key);
        self.member_buffers.lock().await.remove(key);

        let state = *self.state.read().await;
        if now_empty {
            self.stop().await;
        } else if state.is_live() {
            self.reconnect_notify.notify_one();
        }
    }

    /// Switch to global buffering mode.
    pub async fn enable_buffering(&self) {
        *self.mode.write().await = BatchMode::Buffering;
    }

    /// Mark a single member as buffering.
    pub async fn enable_buffering_for_member(&self, key: impl Into<String>) {
        let key = key.into();
        self.buffering_members.write().await.insert(key.clone());
        self.member_buffers.lock().await.entry(key).or_default();
    }

    /// Publish every globally-buffered envelope in insertion order, then
    /// switch back to Normal mode. Publish failures are logged and do not
    /// stop the flush.
    #[instrument(skip(self), fields(chain_id = %self.chain_id))]
    pub async fn flush_buffer_and_disable_buffering(&self) {
        let buffered = std::mem::take(&mut *self.global_buffer.lock().await);
        for (exchange, routing_key, payload) in buffered {
            self.publish_best_effort(&exchange, &routing_key, &payload).await;
        }
        *self.mode.write().await = BatchMode::Normal;
    }

    /// Publish a single member's buffered envelopes in order, then stop
    /// buffering for that member.
    #[instrument(skip(self), fields(chain_id = %self.chain_id, member = %key))]
    pub async fn flush_member_buffer_and_disable_buffering(&self, key: &str) {
        let buffered = self
            .member_buffers
            .lock()
            .await
            .remove(key)
            .unwrap_or_default();
        for (exchange, routing_key, payload) in buffered {
            self.publish_best_effort(&exchange, &routing_key, &payload).await;
        }
        self.buffering_members.write().await.remove(key);
    }

    /// Replace the block observer (`None` to clear it).
    pub async fn set_block_observer(&self, observer: Option<Arc<dyn Fn(u64) + Send + Sync>>) {
        *self.block_observer.write().await = observer;
    }

    /// Handle one delivered log: discard removed, notify the block
    /// observer, then dispatch by mode.
    async fn handle_log(&self, log: Log) {
        if log.removed {
            return;
        }

        if let Some(block_number) = log.block_number {
            if let Some(observer) = self.block_observer.read().await.clone() {
                observer(block_number);
            }
        }

        let Some(member) = self.classifier.member_key(&log) else {
            return;
        };

        let envelope = match self.classifier.envelope(self.chain_id, &log) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "failed to build envelope for log, dropping");
                return;
            }
        };

        let mode = *self.mode.read().await;
        if matches!(mode, BatchMode::Buffering) {
            self.global_buffer.lock().await.push(envelope);
            return;
        }

        if self.buffering_members.read().await.contains(&member) {
            self.member_buffers
                .lock()
                .await
                .entry(member)
                .or_default()
                .push(envelope);
            return;
        }

        let (exchange, routing_key, payload) = envelope;
        self.publish_best_effort(&exchange, &routing_key, &payload).await;
    }

    async fn publish_best_effort(&self, exchange: &str, routing_key: &str, payload: &[u8]) {
        if let Err(e) = self.publisher.publish(exchange, routing_key, payload).await {
            warn!(exchange, routing_key, error = %e, "publish failed, continuing");
        }
    }

    async fn build_filter(&self) -> LogFilter {
        let members: Vec<String> = self.members.read().await.iter().cloned().collect();
        let topics = self.classifier.event_signatures();
        let mut filter = LogFilter::unbounded();
        if !topics.is_empty() {
            filter = filter.with_topic(0, topics);
        }
        self.classifier.apply_members(filter, &members)
    }

    /// Supervisor loop: owns the subscription, reconnects on error with
    /// linear backoff, reconnects immediately on membership changes.
    async fn supervise(self: Arc<Self>, cancel: CancellationToken) {
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                *self.state.write().await = ConnectionState::Stopped;
                return;
            }

            *self.state.write().await = ConnectionState::Connecting;
            let filter = self.build_filter().await;

            let mut subscription = match self.rpc.subscribe_events(filter).await {
                Ok(sub) => sub,
                Err(e) => {
                    error!(error = %e, attempt, "subscription failed");
                    if !self.wait_for_retry(&cancel, attempt).await {
                        return;
                    }
                    attempt += 1;
                    continue;
                }
            };

            *self.state.write().await = ConnectionState::Connected;
            attempt = 0;

            let break_reason = loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        subscription.close();
                        *self.state.write().await = ConnectionState::Stopped;
                        return;
                    }
                    () = self.reconnect_notify.notified() => {
                        subscription.close();
                        break BreakReason::Intentional;
                    }
                    maybe_log = subscription.recv() => {
                        match maybe_log {
                            Some(log) => self.handle_log(log).await,
                            None => {
                                warn!("log subscription stream ended");
                                break BreakReason::Errored;
                            }
                        }
                    }
                }
            };

            *self.state.write().await = ConnectionState::Reconnecting;

            match break_reason {
                BreakReason::Intentional => {}
                BreakReason::Errored => {
                    if !self.wait_for_retry(&cancel, attempt).await {
                        return;
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Sleep for the linear-backoff delay, respecting cancellation and the
    /// max-attempts cap. Returns `false` if the supervisor should exit.
    async fn wait_for_retry(&self, cancel: &CancellationToken, attempt: u32) -> bool {
        if attempt >= self.max_reconnect_attempts {
            error!(attempt, "max reconnect attempts exceeded, stopping batch");
            *self.state.write().await = ConnectionState::Stopped;
            return false;
        }

        let delay = self.base_delay * (attempt + 1);
        debug!(?delay, attempt, "waiting before reconnect");
        tokio::select! {
            () = cancel.cancelled() => false,
            () = tokio::time::sleep(delay) => true,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ports::streaming_mocks::MockEventPublisher;
    use alloy::primitives::Address;
    use chain_rpc::mock::MockChainRpc;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct TestClassifier;

    impl LogClassifier for TestClassifier {
        fn member_key(&self, log: &Log) -> Option<String> {
            Some(log.address().to_string())
        }

        fn envelope(&self, chain_id: ChainId, log: &Log) -> Result<Envelope> {
            Ok((
                "pool-prices".to_string(),
                format!("uniswapv3.{}.{}", chain_id.as_u64(), log.address()),
                b"{}".to_vec(),
            ))
        }

        fn event_signatures(&self) -> Vec<B256> {
            vec![B256::repeat_byte(0xAB)]
        }

        fn apply_members(&self, filter: LogFilter, members: &[String]) -> LogFilter {
            let addresses = members
                .iter()
                .filter_map(|m| m.parse::<Address>().ok())
                .collect();
            filter.with_addresses(addresses)
        }
    }

    fn test_log(block_number: u64, removed: bool) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: Address::ZERO,
                data: alloy::primitives::LogData::new(vec![], alloy::primitives::Bytes::new()).unwrap(),
            },
            block_hash: None,
            block_number: Some(block_number),
            block_timestamp: None,
            transaction_hash: None,
            transaction_index: None,
            log_index: Some(0),
            removed,
        }
    }

    fn new_batch() -> (
        Arc<SubscriptionBatch<MockChainRpc, MockEventPublisher, TestClassifier>>,
        Arc<MockChainRpc>,
        Arc<MockEventPublisher>,
    ) {
        let rpc = Arc::new(MockChainRpc::new(1));
        let publisher = Arc::new(MockEventPublisher::new());
        let classifier = Arc::new(TestClassifier);
        let batch = Arc::new(SubscriptionBatch::new(
            Arc::clone(&rpc),
            Arc::clone(&publisher),
            classifier,
            ChainId::Ethereum,
        ));
        (batch, rpc, publisher)
    }

    #[tokio::test]
    async fn starts_idle() {
        let (batch, _, _) = new_batch();
        assert_eq!(batch.state().await, ConnectionState::Idle);
        assert_eq!(batch.member_count().await, 0);
    }

    #[tokio::test]
    async fn add_member_starts_batch_from_idle() {
        let (batch, _, _) = new_batch();
        batch.add_member("0xabc").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(batch.has_member("0xabc").await);
        assert!(batch.state().await.is_live());
    }

    #[tokio::test]
    async fn remove_last_member_stops_batch() {
        let (batch, _, _) = new_batch();
        batch.add_member("0xabc").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        batch.remove_member("0xabc").await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(batch.state().await, ConnectionState::Stopped);
        assert_eq!(batch.member_count().await, 0);
    }

    #[tokio::test]
    async fn add_member_rejects_over_capacity() {
        let (batch, _, _) = new_batch();
        for i in 0..MAX_PER_BATCH {
            batch.members.write().await.insert(format!("member-{i}"));
        }
        assert!(!batch.has_capacity().await);
        assert!(batch.add_member("one-too-many").await.is_err());
    }

    #[tokio::test]
    async fn removed_log_is_discarded() {
        let (batch, _, publisher) = new_batch();
        let log = test_log(5, true);
        batch.handle_log(log).await;
        assert_eq!(publisher.count(), 0);
    }

    #[tokio::test]
    async fn block_observer_invoked_for_non_removed_log() {
        let (batch, _, _) = new_batch();
        let observed = Arc::new(AtomicU64::new(0));
        let observed_clone = Arc::clone(&observed);
        batch
            .set_block_observer(Some(Arc::new(move |b: u64| {
                observed_clone.store(b, Ordering::SeqCst);
            })))
            .await;

        let log = test_log(42, false);
        batch.handle_log(log).await;

        assert_eq!(observed.load(Ordering::SeqCst), 42);
    }

    #[tokio::test]
    async fn direct_publish_in_normal_mode() {
        let (batch, _, publisher) = new_batch();
        let log = test_log(1, false);
        batch.handle_log(log).await;
        assert_eq!(publisher.count(), 1);
    }

    #[tokio::test]
    async fn global_buffering_defers_publish() {
        let (batch, _, publisher) = new_batch();
        batch.enable_buffering().await;

        let log = test_log(1, false);
        batch.handle_log(log).await;
        assert_eq!(publisher.count(), 0);

        batch.flush_buffer_and_disable_buffering().await;
        assert_eq!(publisher.count(), 1);
    }

    #[tokio::test]
    async fn member_buffering_defers_only_that_member() {
        let (batch, _, publisher) = new_batch();
        let key = Address::ZERO.to_string();
        batch.enable_buffering_for_member(key.clone()).await;

        let log = test_log(1, false);
        batch.handle_log(log).await;
        assert_eq!(publisher.count(), 0);

        batch.flush_member_buffer_and_disable_buffering(&key).await;
        assert_eq!(publisher.count(), 1);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let (batch, _, _) = new_batch();
        batch.stop().await;
        batch.stop().await;
        assert_eq!(batch.state().await, ConnectionState::Stopped);
    }
}
