//! Watchlist Service
//!
//! Sole writer of watchlist membership. Reads and writes go straight to the
//! local SQLite database, so every call is synchronous and never touches the
//! network. Membership changes are broadcast through the [`ChangeNotifier`]
//! after the write has committed.

use crate::db::sqlite::SqliteDb;
use crate::error::Result;
use crate::events::ChangeNotifier;
use crate::models::{Symbol, WatchlistEntry};
use std::sync::Arc;
use tracing::{debug, info};

/// Entries seeded on first-ever access
const DEFAULT_ENTRIES: [(&str, &str); 4] = [
    ("MSFT", "Microsoft Corporation"),
    ("GOOG", "Alphabet"),
    ("AMZN", "Amazon.com, Inc."),
    ("SNAP", "Snap Inc."),
];

pub fn default_entries() -> Result<Vec<WatchlistEntry>> {
    DEFAULT_ENTRIES
        .iter()
        .map(|(symbol, name)| {
            Ok(WatchlistEntry {
                symbol: Symbol::parse(symbol)?,
                company_name: name.to_string(),
            })
        })
        .collect()
}

pub struct WatchlistService {
    db: Arc<SqliteDb>,
    notifier: ChangeNotifier,
}

impl WatchlistService {
    pub fn new(db: Arc<SqliteDb>, notifier: ChangeNotifier) -> Self {
        Self { db, notifier }
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    fn ensure_seeded(&self) -> Result<()> {
        if !self.db.has_onboarded()? && self.db.seed_watchlist(&default_entries()?)? {
            info!("First run: default watchlist seeded");
        }
        Ok(())
    }

    /// Entries in insertion order, seeding the defaults on first access
    pub fn list(&self) -> Result<Vec<WatchlistEntry>> {
        self.ensure_seeded()?;
        self.db.list_watchlist()
    }

    /// Add a symbol; returns false if it was already watched.
    ///
    /// The display name is refreshed either way. The notifier fires only
    /// when membership actually changed.
    pub fn add(&self, symbol: &str, company_name: &str) -> Result<bool> {
        self.ensure_seeded()?;

        let entry = WatchlistEntry {
            symbol: Symbol::parse(symbol)?,
            company_name: company_name.trim().to_string(),
        };

        let added = self.db.add_to_watchlist(&entry)?;
        if added {
            info!("WatchlistService::add - {}", entry.symbol);
            self.notifier.notify();
        } else {
            debug!("{} already on watchlist", entry.symbol);
        }
        Ok(added)
    }

    /// Remove a symbol and its display name; returns false if it was not watched
    pub fn remove(&self, symbol: &str) -> Result<bool> {
        self.ensure_seeded()?;

        let symbol = Symbol::parse(symbol)?;
        let removed = self.db.remove_from_watchlist(&symbol)?;
        if removed {
            info!("WatchlistService::remove - {}", symbol);
            self.notifier.notify();
        }
        Ok(removed)
    }

    pub fn contains(&self, symbol: &str) -> Result<bool> {
        self.ensure_seeded()?;
        self.db.watchlist_contains(&Symbol::parse(symbol)?)
    }
}
