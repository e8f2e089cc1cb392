//! Core domain models shared by the stores, services and providers

use crate::error::{AppError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized (trimmed, uppercase) ticker symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Normalize raw user or provider input into a symbol
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation("Symbol must not be empty".to_string()));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(AppError::Validation(format!("Invalid symbol: {}", raw)));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One OHLC bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandleStickPoint {
    pub date: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl CandleStickPoint {
    /// Calendar day of this point in the given market timezone
    pub fn day(&self, tz: Tz) -> NaiveDate {
        self.date.with_timezone(&tz).date_naive()
    }
}

/// Candles for one symbol, most recent first.
///
/// Immutable once built; a re-fetch replaces the whole series.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeries {
    points: Vec<CandleStickPoint>,
}

impl TimeSeries {
    /// Build a series, sorting points descending by date
    pub fn from_points(mut points: Vec<CandleStickPoint>) -> Self {
        points.sort_by(|a, b| b.date.cmp(&a.date));
        Self { points }
    }

    pub fn points(&self) -> &[CandleStickPoint] {
        &self.points
    }

    pub fn latest(&self) -> Option<&CandleStickPoint> {
        self.points.first()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Closing prices in chronological order (oldest first)
    pub fn chronological_closes(&self) -> Vec<f64> {
        self.points.iter().rev().map(|p| p.close).collect()
    }
}

/// Watched symbol with its display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub symbol: Symbol,
    pub company_name: String,
}

/// Symbol search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub symbol: String,
    pub display_symbol: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
}
