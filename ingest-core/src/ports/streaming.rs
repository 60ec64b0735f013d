//! Streaming port for event publishing.
//!
//! Defines the contract for publishing events to a topic-exchange message
//! bus (AMQP in production).

use async_trait::async_trait;

use crate::error::Result;
use crate::types::events::DomainEventEnvelope;

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT PUBLISHER
// ═══════════════════════════════════════════════════════════════════════════════

/// Port for publishing to the message bus's topic exchanges.
///
/// # Exchanges
///
/// | Exchange | Routing key |
/// |----------|-------------|
/// | `pool-prices` | `uniswapv3.{chainId}.{poolAddress}` |
/// | `position-liquidity-events` | `uniswapv3.{chainId}.{nftId}` |
/// | `close-order-events` | `closer.{chainId}.{nftId}.{triggerMode}` |
/// | `nfpm-transfer-events` | `uniswapv3.{chainId}.{mint\|burn\|transfer}.{nftId}` |
/// | `domain-events` | `position.{created\|closed\|burned\|deleted}.{chainId}.{nftId}` |
///
/// All exchanges are durable, non-auto-delete, type `topic`.
///
/// # Implementation Notes
///
/// Implementations should:
/// - Maintain exactly one connection and one channel
/// - Declare topology idempotently on (re)connect
/// - Buffer messages during network issues
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish raw bytes to an exchange with a routing key.
    ///
    /// # Errors
    ///
    /// Returns an error if publishing fails after retries.
    async fn publish(&self, exchange: &str, routing_key: &str, payload: &[u8]) -> Result<()>;

    /// Serialize and publish a domain event envelope to the platform
    /// `domain-events` exchange.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or publishing fails.
    async fn publish_domain_event(&self, envelope: &DomainEventEnvelope) -> Result<()> {
        let routing_key = format!(
            "position.{}.{}.{}",
            envelope.event_type, envelope.chain_id, envelope.entity_id
        );
        let payload = envelope
            .to_wire_bytes()
            .map_err(crate::error::InfraError::from)?;
        self.publish("domain-events", &routing_key, &payload).await
    }

    /// Flush pending messages.
    ///
    /// Ensures all buffered messages are sent before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if flush fails.
    async fn flush(&self) -> Result<()>;

    /// Check if the publisher is connected.
    fn is_connected(&self) -> bool;
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks {
    //! Mock implementations for testing.

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, RwLock};

    use super::*;

    /// Mock publisher that records every `(exchange, routing_key)` pair and
    /// optionally fails.
    #[derive(Debug, Clone)]
    pub struct MockEventPublisher {
        /// Exchange/routing-key pairs seen, in publish order.
        pub published: Arc<RwLock<Vec<(String, String)>>>,
        /// Whether to simulate connection.
        pub connected: Arc<AtomicBool>,
        /// Whether to fail on publish.
        pub should_fail: Arc<AtomicBool>,
        /// Number of `flush()` calls observed.
        pub flush_count: Arc<AtomicUsize>,
    }

    impl Default for MockEventPublisher {
        fn default() -> Self {
            Self {
                published: Arc::new(RwLock::new(Vec::new())),
                connected: Arc::new(AtomicBool::new(true)),
                should_fail: Arc::new(AtomicBool::new(false)),
                flush_count: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl MockEventPublisher {
        /// Create a new mock publisher.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Get the number of messages published.
        #[must_use]
        pub fn count(&self) -> usize {
            self.published.read().expect("lock poisoned").len()
        }

        /// Set whether to simulate connection failure.
        pub fn set_connected(&self, connected: bool) {
            self.connected.store(connected, Ordering::SeqCst);
        }

        /// Set whether to fail on publish.
        pub fn set_should_fail(&self, should_fail: bool) {
            self.should_fail.store(should_fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl EventPublisher for MockEventPublisher {
        async fn publish(&self, exchange: &str, routing_key: &str, _payload: &[u8]) -> Result<()> {
            if self.should_fail.load(Ordering::SeqCst) {
                return Err(crate::error::AppError::Infra(
                    crate::error::InfraError::MessageBus("mock publish failure".into()),
                ));
            }
            self.published
                .write()
                .expect("lock poisoned")
                .push((exchange.to_string(), routing_key.to_string()));
            Ok(())
        }

        async fn flush(&self) -> Result<()> {
            self.flush_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::MockEventPublisher;
    use super::*;
    use crate::types::events::EntityType;
    use crate::types::primitives::ChainId;
    use chrono::Utc;

    #[tokio::test]
    async fn mock_publisher_records_exchange_and_routing_key() {
        let publisher = MockEventPublisher::new();
        publisher
            .publish("pool-prices", "uniswapv3.1.0xabc", b"{}")
            .await
            .unwrap();
        assert_eq!(publisher.count(), 1);
        assert!(publisher.is_connected());
    }

    #[tokio::test]
    async fn publish_failure_is_reported() {
        let publisher = MockEventPublisher::new();
        publisher.set_should_fail(true);
        assert!(publisher.publish("pool-prices", "rk", b"{}").await.is_err());
    }

    #[tokio::test]
    async fn publish_domain_event_builds_routing_key() {
        let publisher = MockEventPublisher::new();
        let envelope = DomainEventEnvelope {
            event_type: "created".to_string(),
            chain_id: ChainId::Ethereum,
            entity_id: "42".to_string(),
            entity_type: EntityType::Position,
            user_id: None,
            payload: serde_json::json!({}),
            source: "ingest-core".to_string(),
            received_at: Utc::now(),
            block_number: None,
            transaction_hash: None,
            log_index: None,
        };

        publisher.publish_domain_event(&envelope).await.unwrap();
        let published = publisher.published.read().unwrap();
        assert_eq!(published[0], ("domain-events".to_string(), "position.created.1.42".to_string()));
    }
}
