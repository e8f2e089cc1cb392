//! Provider response types

use crate::models::{CandleStickPoint, SearchResult, TimeSeries};
use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Candle response in parallel-array form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandlesResponse {
    #[serde(rename = "o", default)]
    pub open: Vec<f64>,
    #[serde(rename = "h", default)]
    pub high: Vec<f64>,
    #[serde(rename = "l", default)]
    pub low: Vec<f64>,
    #[serde(rename = "c", default)]
    pub close: Vec<f64>,
    #[serde(rename = "t", default)]
    pub timestamps: Vec<i64>,
    #[serde(rename = "s", default)]
    pub status: String,
}

impl CandlesResponse {
    /// Whether the provider reported an empty window
    pub fn is_no_data(&self) -> bool {
        self.status == "no_data" || self.timestamps.is_empty()
    }

    /// Zip the parallel arrays into points, most recent first.
    ///
    /// Arrays of unequal length are truncated to the shortest one; entries
    /// with an out-of-range timestamp are dropped.
    pub fn candle_sticks(&self) -> Vec<CandleStickPoint> {
        let count = self
            .timestamps
            .len()
            .min(self.open.len())
            .min(self.high.len())
            .min(self.low.len())
            .min(self.close.len());

        let mut points: Vec<CandleStickPoint> = (0..count)
            .filter_map(|i| {
                DateTime::from_timestamp(self.timestamps[i], 0).map(|date| CandleStickPoint {
                    date,
                    open: self.open[i],
                    high: self.high[i],
                    low: self.low[i],
                    close: self.close[i],
                })
            })
            .collect();

        points.sort_by(|a, b| b.date.cmp(&a.date));
        points
    }

    pub fn into_time_series(self) -> TimeSeries {
        TimeSeries::from_points(self.candle_sticks())
    }
}

/// Symbol search response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub count: usize,
    #[serde(rename = "result", default)]
    pub results: Vec<SearchResult>,
}

/// Financial metrics envelope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsResponse {
    #[serde(default)]
    pub metric: Metrics,
}

/// Key statistics for a symbol
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(rename = "52WeekHigh")]
    pub annual_week_high: Option<f64>,
    #[serde(rename = "52WeekLow")]
    pub annual_week_low: Option<f64>,
    #[serde(rename = "52WeekPriceReturnDaily")]
    pub annual_week_price_return_daily: Option<f64>,
    pub beta: Option<f64>,
    #[serde(rename = "10DayAverageTradingVolume")]
    pub ten_day_average_trading_volume: Option<f64>,
}

/// News article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsStory {
    #[serde(default)]
    pub category: String,
    pub datetime: i64,
    pub headline: String,
    pub id: i64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub related: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub summary: String,
    pub url: String,
}

/// News feed selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewsType {
    TopStories,
    Company(crate::models::Symbol),
}

impl NewsType {
    pub fn title(&self) -> String {
        match self {
            NewsType::TopStories => "Top Stories".to_string(),
            NewsType::Company(symbol) => symbol.to_string(),
        }
    }
}
