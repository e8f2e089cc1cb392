//! SQLite database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Run all database migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    run_migration(conn, "001_settings", CREATE_SETTINGS_TABLE)?;
    run_migration(conn, "002_preferences", CREATE_PREFERENCES_TABLE)?;
    run_migration(conn, "003_watchlist", CREATE_WATCHLIST_TABLE)?;
    run_migration(conn, "004_company_names", CREATE_COMPANY_NAMES_TABLE)?;

    tracing::info!("Database migrations completed");
    Ok(())
}

fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM migrations WHERE name = ?)",
        [name],
        |row| row.get(0),
    )?;

    if !exists {
        tracing::info!("Running migration: {}", name);
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO migrations (name) VALUES (?)", [name])?;
    }

    Ok(())
}

const CREATE_SETTINGS_TABLE: &str = r#"
CREATE TABLE settings (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    api_base_url TEXT NOT NULL DEFAULT 'https://finnhub.io/api/v1/',
    candle_resolution TEXT NOT NULL DEFAULT '1',
    lookback_days INTEGER NOT NULL DEFAULT 3,
    search_debounce_ms INTEGER NOT NULL DEFAULT 300,
    max_fetch_attempts INTEGER NOT NULL DEFAULT 1,
    requests_per_second INTEGER NOT NULL DEFAULT 30,
    market_timezone TEXT NOT NULL DEFAULT 'America/New_York',
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
INSERT OR IGNORE INTO settings (id) VALUES (1);
"#;

const CREATE_PREFERENCES_TABLE: &str = r#"
CREATE TABLE preferences (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

const CREATE_WATCHLIST_TABLE: &str = r#"
CREATE TABLE watchlist (
    symbol TEXT PRIMARY KEY,
    position INTEGER NOT NULL,
    added_at TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE INDEX idx_watchlist_position ON watchlist(position);
"#;

const CREATE_COMPANY_NAMES_TABLE: &str = r#"
CREATE TABLE company_names (
    symbol TEXT PRIMARY KEY,
    name TEXT NOT NULL
);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, 4);
    }
}
