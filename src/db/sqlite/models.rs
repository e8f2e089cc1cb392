//! SQLite database models

use crate::error::{AppError, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub api_base_url: String,
    pub candle_resolution: String,
    /// Size of the candle window requested per symbol
    pub lookback_days: u32,
    pub search_debounce_ms: u64,
    /// 1 disables retry
    pub max_fetch_attempts: u32,
    pub requests_per_second: u32,
    /// IANA zone used for calendar-day comparisons
    pub market_timezone: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "https://finnhub.io/api/v1/".to_string(),
            candle_resolution: "1".to_string(),
            lookback_days: 3,
            search_debounce_ms: 300,
            max_fetch_attempts: 1,
            requests_per_second: 30,
            market_timezone: "America/New_York".to_string(),
        }
    }
}

impl Settings {
    pub fn market_tz(&self) -> Result<Tz> {
        self.market_timezone
            .parse::<Tz>()
            .map_err(|e| AppError::Config(format!("Invalid market timezone: {}", e)))
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

/// Partial settings update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    pub api_base_url: Option<String>,
    pub candle_resolution: Option<String>,
    pub lookback_days: Option<u32>,
    pub search_debounce_ms: Option<u64>,
    pub max_fetch_attempts: Option<u32>,
    pub requests_per_second: Option<u32>,
    pub market_timezone: Option<String>,
}
