//! External market-data port: token lists and quote-token prices.
//!
//! Backs the token-list-refresh rule and the NAV-snapshot rule's Prices
//! phase. A real adapter calls an external pricing API (CoinGecko or
//! similar) over `reqwest`; this core only consumes the port.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

// ═══════════════════════════════════════════════════════════════════════════════
// MARKET DATA
// ═══════════════════════════════════════════════════════════════════════════════

/// Port over an external token/price data provider.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch the current supported token-id list.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream provider is unreachable or returns
    /// a malformed response.
    async fn fetch_token_list(&self) -> Result<Vec<String>>;

    /// Fetch current prices (in the reporting currency) for a batch of
    /// quote-token price-source ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream provider is unreachable or returns
    /// a malformed response.
    async fn fetch_prices(&self, source_ids: &[String]) -> Result<HashMap<String, String>>;
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks {
    //! Mock implementation for testing.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::RwLock;

    use async_trait::async_trait;

    use super::MarketDataSource;
    use crate::error::Result;

    /// Mock data source returning canned token lists and prices, and
    /// counting how many times each method was called.
    #[derive(Default)]
    pub struct MockMarketDataSource {
        /// Token ids to return from `fetch_token_list`.
        pub token_list: Vec<String>,
        /// Prices to return from `fetch_prices`, keyed by source id.
        pub prices: RwLock<HashMap<String, String>>,
        token_list_calls: AtomicUsize,
        price_calls: AtomicUsize,
    }

    impl MockMarketDataSource {
        /// Build a mock with the given canned token list.
        #[must_use]
        pub fn new(token_list: Vec<String>) -> Self {
            Self {
                token_list,
                prices: RwLock::new(HashMap::new()),
                token_list_calls: AtomicUsize::new(0),
                price_calls: AtomicUsize::new(0),
            }
        }

        /// Number of times `fetch_token_list` was called.
        #[must_use]
        pub fn token_list_call_count(&self) -> usize {
            self.token_list_calls.load(Ordering::SeqCst)
        }

        /// Number of times `fetch_prices` was called.
        #[must_use]
        pub fn price_call_count(&self) -> usize {
            self.price_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MarketDataSource for MockMarketDataSource {
        async fn fetch_token_list(&self) -> Result<Vec<String>> {
            self.token_list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.token_list.clone())
        }

        async fn fetch_prices(&self, source_ids: &[String]) -> Result<HashMap<String, String>> {
            self.price_calls.fetch_add(1, Ordering::SeqCst);
            let prices = self.prices.read().expect("lock poisoned");
            Ok(source_ids
                .iter()
                .filter_map(|id| prices.get(id).map(|p| (id.clone(), p.clone())))
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::MockMarketDataSource;
    use super::*;

    #[tokio::test]
    async fn fetch_token_list_counts_calls() {
        let source = MockMarketDataSource::new(vec!["ethereum".to_string()]);
        assert_eq!(source.fetch_token_list().await.unwrap(), vec!["ethereum"]);
        assert_eq!(source.token_list_call_count(), 1);
    }

    #[tokio::test]
    async fn fetch_prices_filters_to_known_ids() {
        let source = MockMarketDataSource::new(vec![]);
        source
            .prices
            .write()
            .unwrap()
            .insert("ethereum".to_string(), "3000.50".to_string());
        let prices = source
            .fetch_prices(&["ethereum".to_string(), "unknown".to_string()])
            .await
            .unwrap();
        assert_eq!(prices.len(), 1);
        assert_eq!(prices["ethereum"], "3000.50");
    }
}
