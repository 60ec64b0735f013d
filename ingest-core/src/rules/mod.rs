//! Scheduled reconciliation rules.
//!
//! A rule is a [`BusinessRule`]: it registers its own cron schedule(s) in
//! `on_startup` and tears them down in `on_shutdown`, through the same
//! [`crate::scheduler::Scheduler`] the streaming workers use. Unlike
//! `worker::Coordinator`, rule registration is a fast, local, almost
//! infallible call (no network handshake to wait on), so [`RuleRegistry`]
//! starts rules sequentially and aborts on the first error rather than
//! tolerating partial failure.

pub mod nav_snapshot;
pub mod token_list_refresh;

pub use nav_snapshot::NavSnapshotRule;
pub use token_list_refresh::TokenListRefreshRule;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;

/// A periodic reconciliation job registered with the scheduler.
#[async_trait]
pub trait BusinessRule: Send + Sync {
    /// Stable rule name, used as the scheduler's `rule_name` so all of a
    /// rule's schedules can be unregistered together.
    fn name(&self) -> &'static str;

    /// Human-readable description, surfaced in status reports.
    fn description(&self) -> &'static str;

    /// Register the rule's cron schedule(s).
    async fn on_startup(&self) -> Result<()>;

    /// Unregister every schedule this rule owns. Idempotent.
    async fn on_shutdown(&self);
}

/// Starts and stops a fixed set of [`BusinessRule`]s together.
#[derive(Default)]
pub struct RuleRegistry {
    rules: Vec<Arc<dyn BusinessRule>>,
}

impl RuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn register(&mut self, rule: Arc<dyn BusinessRule>) {
        self.rules.push(rule);
    }

    /// Start every registered rule, in registration order. Aborts on the
    /// first error.
    ///
    /// # Errors
    ///
    /// Returns the first error a rule's `on_startup` raises.
    pub async fn start_all(&self) -> Result<()> {
        for rule in &self.rules {
            info!(rule = rule.name(), description = rule.description(), "starting rule");
            rule.on_startup().await?;
        }
        Ok(())
    }

    /// Stop every registered rule, in registration order.
    pub async fn stop_all(&self) {
        for rule in &self.rules {
            info!(rule = rule.name(), "stopping rule");
            rule.on_shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRule {
        starts: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl BusinessRule for CountingRule {
        fn name(&self) -> &'static str {
            "counting-rule"
        }

        fn description(&self) -> &'static str {
            "test rule"
        }

        async fn on_startup(&self) -> Result<()> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(crate::error::AppError::Initialization("boom".to_string()));
            }
            Ok(())
        }

        async fn on_shutdown(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn registry_aborts_on_first_failure() {
        let starts = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));

        let mut registry = RuleRegistry::new();
        registry.register(Arc::new(CountingRule {
            starts: Arc::clone(&starts),
            stops: Arc::clone(&stops),
            fail: true,
        }));
        registry.register(Arc::new(CountingRule {
            starts: Arc::clone(&starts),
            stops: Arc::clone(&stops),
            fail: false,
        }));

        let result = registry.start_all().await;
        assert!(result.is_err());
        // second rule never started since the first aborted the sequence.
        assert_eq!(starts.load(Ordering::SeqCst), 1);
    }
}
