//! Double-entry journal port, consumed by the NAV-snapshot rule's Snapshot
//! phase.
//!
//! Double-entry bookkeeping is domain-specific financial logic this core
//! does not implement: account codes, journal entries, and balance
//! aggregation are assumed to live behind this port, called as a pure/opaque
//! interface.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::entities::UserNavSnapshotRecord;

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER
// ═══════════════════════════════════════════════════════════════════════════════

/// Port over the double-entry ledger used to aggregate per-user NAV.
#[async_trait]
pub trait LedgerJournal: Send + Sync {
    /// List users who own at least one active position, for the daily
    /// snapshot pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn users_with_active_positions(&self) -> Result<Vec<String>>;

    /// Aggregate one user's cumulative journal balances, across double-entry
    /// account codes, into a single reporting-currency snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if aggregation fails.
    async fn aggregate_user_balances(&self, user_id: &str) -> Result<UserNavSnapshotRecord>;

    /// Persist one computed snapshot row.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn save_snapshot(&self, snapshot: &UserNavSnapshotRecord) -> Result<()>;
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks {
    //! Mock implementation for testing.

    use std::collections::HashMap;
    use std::sync::RwLock;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::LedgerJournal;
    use crate::error::{AppError, InfraError, Result};
    use crate::types::entities::UserNavSnapshotRecord;

    /// Mock ledger keyed by user id, with canned per-user balances and a
    /// record of every snapshot saved.
    #[derive(Default)]
    pub struct MockLedgerJournal {
        /// Users to return from `users_with_active_positions`.
        pub users: Vec<String>,
        /// Canned reporting-currency balance per user.
        pub balances: HashMap<String, String>,
        /// Snapshots saved via `save_snapshot`, in call order.
        pub saved: RwLock<Vec<UserNavSnapshotRecord>>,
    }

    impl MockLedgerJournal {
        /// Build a mock with the given users and balances.
        #[must_use]
        pub fn new(users: Vec<String>, balances: HashMap<String, String>) -> Self {
            Self {
                users,
                balances,
                saved: RwLock::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LedgerJournal for MockLedgerJournal {
        async fn users_with_active_positions(&self) -> Result<Vec<String>> {
            Ok(self.users.clone())
        }

        async fn aggregate_user_balances(&self, user_id: &str) -> Result<UserNavSnapshotRecord> {
            let balance = self.balances.get(user_id).cloned().ok_or_else(|| {
                AppError::Infra(InfraError::NotFound)
            })?;
            Ok(UserNavSnapshotRecord {
                user_id: user_id.to_string(),
                reporting_currency: "USD".to_string(),
                total_value: balance,
                computed_at: Utc::now(),
            })
        }

        async fn save_snapshot(&self, snapshot: &UserNavSnapshotRecord) -> Result<()> {
            self.saved.write().expect("lock poisoned").push(snapshot.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::MockLedgerJournal;
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn aggregate_and_save_roundtrip() {
        let mut balances = HashMap::new();
        balances.insert("user-1".to_string(), "12345.67".to_string());
        let ledger = MockLedgerJournal::new(vec!["user-1".to_string()], balances);

        let users = ledger.users_with_active_positions().await.unwrap();
        assert_eq!(users, vec!["user-1"]);

        let snapshot = ledger.aggregate_user_balances("user-1").await.unwrap();
        assert_eq!(snapshot.total_value, "12345.67");

        ledger.save_snapshot(&snapshot).await.unwrap();
        assert_eq!(ledger.saved.read().unwrap().len(), 1);
    }
}
