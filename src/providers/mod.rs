//! Market data provider adapters module

pub mod types;
pub mod finnhub;
pub mod rate_limiter;

#[cfg(test)]
pub(crate) mod testing;

use crate::error::Result;
use crate::models::Symbol;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use types::*;

/// Provider trait that all market data sources must implement
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Provider ID (e.g., "finnhub")
    fn id(&self) -> &'static str;

    /// Get candles for a symbol between two instants
    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<CandlesResponse>;

    /// Search for symbols by ticker or company name
    async fn search(&self, query: &str) -> Result<SearchResponse>;

    /// Get key financial metrics
    async fn fetch_metrics(&self, symbol: &Symbol) -> Result<MetricsResponse>;

    /// Get market or company news
    async fn fetch_news(&self, news_type: &NewsType) -> Result<Vec<NewsStory>>;
}
