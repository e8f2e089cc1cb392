//! Scripted in-memory provider for tests

use crate::error::{AppError, Result};
use crate::models::{SearchResult, Symbol};
use crate::providers::types::*;
use crate::providers::MarketDataProvider;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

/// Candles with one point per (day of March 2024, close) pair, at 15:00 UTC
pub fn candles(points: &[(u32, f64)]) -> CandlesResponse {
    let timestamps = points
        .iter()
        .map(|(day, _)| Utc.with_ymd_and_hms(2024, 3, *day, 15, 0, 0).unwrap().timestamp())
        .collect();
    let closes: Vec<f64> = points.iter().map(|(_, close)| *close).collect();
    CandlesResponse {
        open: closes.clone(),
        high: closes.clone(),
        low: closes.clone(),
        close: closes,
        timestamps,
        status: "ok".to_string(),
    }
}

pub fn search_hit(symbol: &str) -> SearchResult {
    SearchResult {
        symbol: symbol.to_string(),
        display_symbol: symbol.to_string(),
        description: format!("{} INC", symbol),
        kind: "Common Stock".to_string(),
    }
}

#[derive(Default)]
pub struct FakeProvider {
    candles: Mutex<HashMap<String, (Duration, std::result::Result<CandlesResponse, String>)>>,
    transient_failures: Mutex<HashMap<String, usize>>,
    searches: Mutex<HashMap<String, (Duration, Vec<SearchResult>)>>,
    metrics: Mutex<Option<Metrics>>,
    news: Mutex<Vec<NewsStory>>,
    pub candle_calls: Mutex<Vec<String>>,
    /// Candle requests that ran to completion (not dropped mid-delay)
    pub candle_completions: Mutex<Vec<String>>,
    pub search_calls: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candles(self, symbol: &str, response: CandlesResponse) -> Self {
        self.with_delayed_candles(symbol, Duration::ZERO, response)
    }

    pub fn with_delayed_candles(self, symbol: &str, delay: Duration, response: CandlesResponse) -> Self {
        self.candles.lock().insert(symbol.to_string(), (delay, Ok(response)));
        self
    }

    pub fn with_failure(self, symbol: &str, message: &str) -> Self {
        self.candles
            .lock()
            .insert(symbol.to_string(), (Duration::ZERO, Err(message.to_string())));
        self
    }

    /// Fail the first `count` candle requests for a symbol before serving the script
    pub fn with_transient_failures(self, symbol: &str, count: usize) -> Self {
        self.transient_failures.lock().insert(symbol.to_string(), count);
        self
    }

    pub fn with_search(self, query: &str, delay: Duration, results: Vec<SearchResult>) -> Self {
        self.searches.lock().insert(query.to_string(), (delay, results));
        self
    }

    pub fn with_metrics(self, metrics: Metrics) -> Self {
        *self.metrics.lock() = Some(metrics);
        self
    }

    pub fn with_news(self, news: Vec<NewsStory>) -> Self {
        *self.news.lock() = news;
        self
    }

    pub fn candle_call_count(&self, symbol: &str) -> usize {
        self.candle_calls.lock().iter().filter(|s| s.as_str() == symbol).count()
    }

    pub fn completed_candle_count(&self, symbol: &str) -> usize {
        self.candle_completions.lock().iter().filter(|s| s.as_str() == symbol).count()
    }
}

#[async_trait]
impl MarketDataProvider for FakeProvider {
    fn id(&self) -> &'static str {
        "fake"
    }

    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<CandlesResponse> {
        self.candle_calls.lock().push(symbol.to_string());

        {
            let mut failures = self.transient_failures.lock();
            if let Some(remaining) = failures.get_mut(symbol.as_str()) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(AppError::Network("connection reset".to_string()));
                }
            }
        }

        let script = self.candles.lock().get(symbol.as_str()).cloned();
        match script {
            Some((delay, outcome)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                self.candle_completions.lock().push(symbol.to_string());
                outcome.map_err(AppError::Network)
            }
            None => Err(AppError::NoData(symbol.to_string())),
        }
    }

    async fn search(&self, query: &str) -> Result<SearchResponse> {
        self.search_calls.lock().push(query.to_string());

        let script = self.searches.lock().get(query).cloned();
        match script {
            Some((delay, results)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(SearchResponse {
                    count: results.len(),
                    results,
                })
            }
            None => Err(AppError::Network(format!("search failed for {}", query))),
        }
    }

    async fn fetch_metrics(&self, symbol: &Symbol) -> Result<MetricsResponse> {
        self.metrics
            .lock()
            .clone()
            .map(|metric| MetricsResponse { metric })
            .ok_or_else(|| AppError::NoData(format!("No metrics for {}", symbol)))
    }

    async fn fetch_news(&self, _news_type: &NewsType) -> Result<Vec<NewsStory>> {
        let news = self.news.lock().clone();
        if news.is_empty() {
            return Err(AppError::Network("news unavailable".to_string()));
        }
        Ok(news)
    }
}
