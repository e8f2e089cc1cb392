//! Watchlist persistence
//!
//! Membership lives in `watchlist` (one row per symbol, ordered by
//! `position`), display names in `company_names`, and the onboarding flag in
//! `preferences`. The primary keys make a repeated add a no-op.

use crate::error::Result;
use crate::models::{Symbol, WatchlistEntry};
use rusqlite::{params, Connection, OptionalExtension};

const ONBOARDED_KEY: &str = "hasOnboarded";

/// Whether the default watchlist has been seeded
pub fn has_onboarded(conn: &Connection) -> Result<bool> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM preferences WHERE key = ?1",
            [ONBOARDED_KEY],
            |row| row.get(0),
        )
        .optional()?;

    Ok(value.as_deref() == Some("1"))
}

/// Seed the watchlist and mark onboarding complete, atomically.
///
/// Returns false without touching the watchlist if already onboarded.
pub fn seed_defaults(conn: &mut Connection, entries: &[WatchlistEntry]) -> Result<bool> {
    let tx = conn.transaction()?;

    let already: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM preferences WHERE key = ?1 AND value = '1')",
        [ONBOARDED_KEY],
        |row| row.get(0),
    )?;
    if already {
        return Ok(false);
    }

    for entry in entries {
        insert_entry(&tx, entry)?;
    }

    tx.execute(
        "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, '1')",
        [ONBOARDED_KEY],
    )?;
    tx.commit()?;

    tracing::info!("Seeded default watchlist with {} symbols", entries.len());
    Ok(true)
}

/// Load entries in insertion order
pub fn list_entries(conn: &Connection) -> Result<Vec<WatchlistEntry>> {
    let mut stmt = conn.prepare(
        "SELECT w.symbol, COALESCE(n.name, w.symbol)
         FROM watchlist w
         LEFT JOIN company_names n ON n.symbol = w.symbol
         ORDER BY w.position ASC",
    )?;

    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut entries = Vec::with_capacity(rows.len());
    for (symbol, company_name) in rows {
        match Symbol::parse(&symbol) {
            Ok(symbol) => entries.push(WatchlistEntry { symbol, company_name }),
            Err(e) => tracing::warn!("Skipping corrupt watchlist row '{}': {}", symbol, e),
        }
    }

    Ok(entries)
}

/// Check membership
pub fn contains(conn: &Connection, symbol: &Symbol) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM watchlist WHERE symbol = ?1)",
        [symbol.as_str()],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Add an entry; returns true if the symbol was not already present.
///
/// The display name is refreshed either way.
pub fn add_entry(conn: &mut Connection, entry: &WatchlistEntry) -> Result<bool> {
    let tx = conn.transaction()?;
    let inserted = insert_entry(&tx, entry)?;
    tx.commit()?;
    Ok(inserted)
}

/// Remove an entry and its display name; returns true if a row was deleted
pub fn remove_entry(conn: &mut Connection, symbol: &Symbol) -> Result<bool> {
    let tx = conn.transaction()?;
    let deleted = tx.execute("DELETE FROM watchlist WHERE symbol = ?1", [symbol.as_str()])?;
    tx.execute("DELETE FROM company_names WHERE symbol = ?1", [symbol.as_str()])?;
    tx.commit()?;
    Ok(deleted > 0)
}

fn insert_entry(conn: &Connection, entry: &WatchlistEntry) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO watchlist (symbol, position)
         VALUES (?1, (SELECT COALESCE(MAX(position), -1) + 1 FROM watchlist))",
        [entry.symbol.as_str()],
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO company_names (symbol, name) VALUES (?1, ?2)",
        params![entry.symbol.as_str(), entry.company_name],
    )?;

    Ok(inserted > 0)
}
