//! Settings management

use crate::db::sqlite::models::{Settings, SettingsUpdate};
use crate::error::{AppError, Result};
use chrono_tz::Tz;
use rusqlite::Connection;

/// Get settings
pub fn get_settings(conn: &Connection) -> Result<Settings> {
    let settings = conn.query_row(
        "SELECT api_base_url, candle_resolution, lookback_days, search_debounce_ms,
                max_fetch_attempts, requests_per_second, market_timezone
         FROM settings WHERE id = 1",
        [],
        |row| {
            Ok(Settings {
                api_base_url: row.get(0)?,
                candle_resolution: row.get(1)?,
                lookback_days: row.get::<_, i64>(2)?.max(1) as u32,
                search_debounce_ms: row.get::<_, i64>(3)?.max(0) as u64,
                max_fetch_attempts: row.get::<_, i64>(4)?.max(1) as u32,
                requests_per_second: row.get::<_, i64>(5)?.max(1) as u32,
                market_timezone: row.get(6)?,
            })
        },
    )?;

    Ok(settings)
}

/// Update settings
pub fn update_settings(conn: &Connection, update: SettingsUpdate) -> Result<Settings> {
    let mut updates = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(url) = update.api_base_url {
        url::Url::parse(&url)?;
        updates.push("api_base_url = ?");
        params.push(Box::new(url));
    }
    if let Some(r) = update.candle_resolution {
        updates.push("candle_resolution = ?");
        params.push(Box::new(r));
    }
    if let Some(d) = update.lookback_days {
        if d == 0 {
            return Err(AppError::Validation("lookback_days must be positive".to_string()));
        }
        updates.push("lookback_days = ?");
        params.push(Box::new(d as i64));
    }
    if let Some(ms) = update.search_debounce_ms {
        updates.push("search_debounce_ms = ?");
        params.push(Box::new(ms as i64));
    }
    if let Some(a) = update.max_fetch_attempts {
        updates.push("max_fetch_attempts = ?");
        params.push(Box::new(a.max(1) as i64));
    }
    if let Some(rps) = update.requests_per_second {
        updates.push("requests_per_second = ?");
        params.push(Box::new(rps.max(1) as i64));
    }
    if let Some(tz) = update.market_timezone {
        tz.parse::<Tz>()
            .map_err(|e| AppError::Validation(format!("Unknown timezone '{}': {}", tz, e)))?;
        updates.push("market_timezone = ?");
        params.push(Box::new(tz));
    }

    if !updates.is_empty() {
        updates.push("updated_at = datetime('now')");

        let sql = format!("UPDATE settings SET {} WHERE id = 1", updates.join(", "));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;
    }

    get_settings(conn)
}
