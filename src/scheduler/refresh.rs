//! Watchlist refresher
//!
//! Background task that reacts to watchlist changes: prunes the candle cache
//! to current members, fetches whatever is missing, re-projects the rows and
//! publishes them on a watch channel. Signals that pile up while a refresh is
//! running are coalesced into a single follow-up pass.

use crate::error::Result;
use crate::models::Symbol;
use crate::services::{BatchReport, FetchCoordinator, ProjectionService, RowViewModel, WatchlistService};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub struct WatchlistRefresher {
    watchlist: Arc<WatchlistService>,
    fetcher: Arc<FetchCoordinator>,
    projector: Arc<ProjectionService>,
    rows_tx: watch::Sender<Vec<RowViewModel>>,
}

impl WatchlistRefresher {
    pub fn new(
        watchlist: Arc<WatchlistService>,
        fetcher: Arc<FetchCoordinator>,
        projector: Arc<ProjectionService>,
    ) -> Self {
        Self {
            watchlist,
            fetcher,
            projector,
            rows_tx: watch::channel(Vec::new()).0,
        }
    }

    /// Subscribe to the latest projected rows
    pub fn rows(&self) -> watch::Receiver<Vec<RowViewModel>> {
        self.rows_tx.subscribe()
    }

    pub fn latest_rows(&self) -> Vec<RowViewModel> {
        self.rows_tx.borrow().clone()
    }

    /// One full pass: prune, fetch missing, project, publish
    pub async fn refresh(&self) -> Result<BatchReport> {
        let entries = self.watchlist.list()?;
        let symbols: Vec<Symbol> = entries.iter().map(|e| e.symbol.clone()).collect();

        let keep: HashSet<Symbol> = symbols.iter().cloned().collect();
        let store = self.fetcher.store();
        store.retain_symbols(&keep);

        let report = self.fetcher.ensure_fetched(&symbols).await;

        let rows = self.projector.project(&entries, store);
        info!("Publishing {} watchlist rows", rows.len());
        self.rows_tx.send_replace(rows);

        Ok(report)
    }

    async fn refresh_logged(&self) {
        if let Err(e) = self.refresh().await {
            error!("Watchlist refresh failed: {}", e);
        }
    }

    /// Run an initial refresh, then one per batch of change signals
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        let mut changes = self.watchlist.notifier().subscribe();

        tokio::spawn(async move {
            info!("Watchlist refresher started");
            self.refresh_logged().await;

            loop {
                match changes.recv().await {
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Refresher lagged behind {} change signals", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }

                loop {
                    match changes.try_recv() {
                        Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }

                self.refresh_logged().await;
            }

            info!("Watchlist refresher stopped");
        })
    }
}
