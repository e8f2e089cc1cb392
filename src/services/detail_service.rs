//! Detail Service
//!
//! Data behind the per-stock detail screen and the news feed: the cached
//! candle series with its chart settings, key financial metrics and news.

use crate::error::Result;
use crate::models::{Symbol, TimeSeries};
use crate::providers::types::{Metrics, NewsStory, NewsType};
use crate::providers::MarketDataProvider;
use crate::services::fetch_coordinator::FetchCoordinator;
use crate::services::metrics_service::format_decimal;
use crate::services::projection_service::{ChartViewModel, ProjectionService};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Labelled metric for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockDetail {
    pub symbol: Symbol,
    pub company_name: String,
    pub series: Option<Arc<TimeSeries>>,
    pub chart: Option<ChartViewModel>,
    pub metrics: Option<Metrics>,
    pub metric_rows: Vec<MetricRow>,
}

pub struct DetailService {
    provider: Arc<dyn MarketDataProvider>,
    fetcher: Arc<FetchCoordinator>,
    projector: Arc<ProjectionService>,
}

impl DetailService {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        fetcher: Arc<FetchCoordinator>,
        projector: Arc<ProjectionService>,
    ) -> Self {
        Self {
            provider,
            fetcher,
            projector,
        }
    }

    /// Key financial metrics for a symbol
    pub async fn metrics(&self, symbol: &Symbol) -> Result<Metrics> {
        info!("DetailService::metrics - {}", symbol);
        let response = self.provider.fetch_metrics(symbol).await?;
        Ok(response.metric)
    }

    /// Top stories or company news; failures yield an empty list
    pub async fn news(&self, news_type: &NewsType) -> Vec<NewsStory> {
        info!("DetailService::news - {}", news_type.title());
        match self.provider.fetch_news(news_type).await {
            Ok(stories) => stories,
            Err(e) => {
                warn!("Failed to load {}: {}", news_type.title(), e);
                Vec::new()
            }
        }
    }

    /// Everything the detail screen shows for one symbol.
    ///
    /// Uses the cached series, fetching it first if absent. Missing candles
    /// or metrics leave the matching fields empty rather than failing.
    pub async fn detail(&self, symbol: &Symbol, company_name: &str) -> StockDetail {
        info!("DetailService::detail - {}", symbol);

        let (_, metrics) = tokio::join!(
            self.fetcher.ensure_fetched(std::slice::from_ref(symbol)),
            self.metrics(symbol)
        );

        let metrics = metrics
            .map_err(|e| warn!("No metrics for {}: {}", symbol, e))
            .ok();
        let series = self.fetcher.store().get(symbol);

        StockDetail {
            symbol: symbol.clone(),
            company_name: company_name.to_string(),
            chart: series.as_deref().map(|s| self.projector.chart(s)),
            series,
            metric_rows: metrics.as_ref().map(metric_rows).unwrap_or_default(),
            metrics,
        }
    }
}

pub fn metric_rows(metrics: &Metrics) -> Vec<MetricRow> {
    let row = |name: &str, value: Option<f64>| MetricRow {
        name: name.to_string(),
        value: value
            .map(|v| format_decimal(v, 2))
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| "-".to_string()),
    };

    vec![
        row("52W High", metrics.annual_week_high),
        row("52W Low", metrics.annual_week_low),
        row("52W Return", metrics.annual_week_price_return_daily),
        row("Beta", metrics.beta),
        row("10D Vol.", metrics.ten_day_average_trading_volume),
    ]
}
