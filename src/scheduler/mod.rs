//! Scheduler module for Stockwatch
//!
//! Background tasks driven by watchlist change signals.

mod refresh;

pub use refresh::WatchlistRefresher;
