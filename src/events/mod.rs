//! Change notification
//!
//! Fan-out of "watchlist changed" signals over a tokio broadcast channel.
//! Any number of subscribers may listen; publishing never blocks and never
//! fails when nobody is listening.

use tokio::sync::broadcast;

/// Default channel capacity. Signals carry no payload, so a lagging
/// receiver only needs to know that at least one change happened.
const DEFAULT_CAPACITY: usize = 16;

/// Watchlist membership changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchlistChanged;

/// Broadcasts watchlist membership changes
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<WatchlistChanged>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tx: broadcast::channel(capacity.max(1)).0,
        }
    }

    /// Fire the signal; returns how many subscribers received it
    pub fn notify(&self) -> usize {
        let delivered = self.tx.send(WatchlistChanged).unwrap_or(0);
        tracing::debug!("Watchlist change delivered to {} subscribers", delivered);
        delivered
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> broadcast::Receiver<WatchlistChanged> {
        self.tx.subscribe()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
