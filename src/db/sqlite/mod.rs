//! SQLite database module

pub mod models;
mod migrations;
mod settings;
mod watchlist;

use crate::error::Result;
use crate::models::{Symbol, WatchlistEntry};
pub use models::{Settings, SettingsUpdate};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

/// SQLite database wrapper
pub struct SqliteDb {
    conn: Mutex<Connection>,
}

impl SqliteDb {
    /// Create new SQLite database connection
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::with_connection(conn)
    }

    /// In-memory database, used by tests and ephemeral sessions
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock();
        migrations::run_migrations(&conn)
    }

    // ========== Watchlist Methods ==========

    /// Check whether the default watchlist has been seeded
    pub fn has_onboarded(&self) -> Result<bool> {
        let conn = self.conn.lock();
        watchlist::has_onboarded(&conn)
    }

    /// Seed default entries once per database lifetime
    pub fn seed_watchlist(&self, entries: &[WatchlistEntry]) -> Result<bool> {
        let mut conn = self.conn.lock();
        watchlist::seed_defaults(&mut conn, entries)
    }

    /// Get watchlist entries in insertion order
    pub fn list_watchlist(&self) -> Result<Vec<WatchlistEntry>> {
        let conn = self.conn.lock();
        watchlist::list_entries(&conn)
    }

    /// Check watchlist membership
    pub fn watchlist_contains(&self, symbol: &Symbol) -> Result<bool> {
        let conn = self.conn.lock();
        watchlist::contains(&conn, symbol)
    }

    /// Add a watchlist entry
    pub fn add_to_watchlist(&self, entry: &WatchlistEntry) -> Result<bool> {
        let mut conn = self.conn.lock();
        watchlist::add_entry(&mut conn, entry)
    }

    /// Remove a watchlist entry and its display name
    pub fn remove_from_watchlist(&self, symbol: &Symbol) -> Result<bool> {
        let mut conn = self.conn.lock();
        watchlist::remove_entry(&mut conn, symbol)
    }

    // ========== Settings Methods ==========

    /// Get settings
    pub fn get_settings(&self) -> Result<Settings> {
        let conn = self.conn.lock();
        settings::get_settings(&conn)
    }

    /// Update settings
    pub fn update_settings(&self, update: SettingsUpdate) -> Result<Settings> {
        let conn = self.conn.lock();
        settings::update_settings(&conn, update)
    }
}
