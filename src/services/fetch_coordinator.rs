//! Fetch Coordinator
//!
//! Fetches candles for every requested symbol that is not cached yet, one
//! task per symbol, and returns only once every launched fetch has
//! terminated. Results are written into the [`TimeSeriesStore`] by the
//! awaiting caller as each task finishes, never by the worker tasks.
//!
//! A symbol already being fetched by another batch is not fetched again;
//! the second batch waits for the first one's outcome instead.

use crate::error::{AppError, ErrorKind, Result};
use crate::models::{Symbol, TimeSeries};
use crate::providers::MarketDataProvider;
use crate::services::time_series_store::TimeSeriesStore;
use chrono::Utc;
use futures_util::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

type InFlight = Arc<Mutex<HashMap<Symbol, watch::Receiver<bool>>>>;

/// Fetch window and retry policy
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub lookback_days: u32,
    /// Total attempts per symbol; 1 disables retry
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            lookback_days: 3,
            max_attempts: 1,
            base_backoff: Duration::from_millis(500),
        }
    }
}

/// Outcome of one `ensure_fetched` call
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Fetched by this batch
    pub fetched: Vec<Symbol>,
    /// Already cached, skipped
    pub cached: Vec<Symbol>,
    /// In flight from another batch and completed successfully
    pub joined: Vec<Symbol>,
    /// Failed, in this batch or the one it joined
    pub failed: Vec<(Symbol, ErrorKind)>,
}

/// Coordinates parallel candle fetches into the time series store
pub struct FetchCoordinator {
    provider: Arc<dyn MarketDataProvider>,
    store: Arc<TimeSeriesStore>,
    config: FetchConfig,
    in_flight: InFlight,
}

impl FetchCoordinator {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        store: Arc<TimeSeriesStore>,
        config: FetchConfig,
    ) -> Self {
        Self {
            provider,
            store,
            config,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &Arc<TimeSeriesStore> {
        &self.store
    }

    pub fn is_in_flight(&self, symbol: &Symbol) -> bool {
        self.in_flight.lock().contains_key(symbol)
    }

    /// Make sure every symbol has either a cached series or a recorded failure.
    ///
    /// Never fails as a whole: per-symbol errors are logged and reported.
    pub async fn ensure_fetched(&self, symbols: &[Symbol]) -> BatchReport {
        let mut report = BatchReport::default();
        let mut seen = HashSet::new();
        let mut launched = Vec::new();
        let mut waiting = Vec::new();

        {
            let mut in_flight = self.in_flight.lock();
            for symbol in symbols {
                if !seen.insert(symbol.clone()) {
                    continue;
                }
                if self.store.contains(symbol) {
                    report.cached.push(symbol.clone());
                    continue;
                }
                if let Some(rx) = in_flight.get(symbol) {
                    waiting.push((symbol.clone(), rx.clone()));
                    continue;
                }

                let (tx, rx) = watch::channel(false);
                in_flight.insert(symbol.clone(), rx);

                let provider = Arc::clone(&self.provider);
                let config = self.config.clone();
                let task_symbol = symbol.clone();
                let handle = tokio::spawn(async move {
                    fetch_series(provider.as_ref(), &task_symbol, &config).await
                });
                launched.push((symbol.clone(), tx, handle));
            }
        }

        info!(
            "FetchCoordinator::ensure_fetched - launching {} ({} cached, {} in flight elsewhere)",
            launched.len(),
            report.cached.len(),
            waiting.len()
        );

        let mut guard = InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            owned: launched
                .iter()
                .map(|(symbol, _, handle)| (symbol.clone(), handle.abort_handle()))
                .collect(),
        };

        let mut pending: FuturesUnordered<_> = launched
            .into_iter()
            .map(|(symbol, tx, handle)| async move { (symbol, tx, handle.await) })
            .collect();

        while let Some((symbol, tx, joined)) = pending.next().await {
            let outcome = joined.unwrap_or_else(|e| {
                error!("Fetch task for {} aborted: {}", symbol, e);
                Err(AppError::Internal(format!("fetch task failed: {}", e)))
            });

            match outcome {
                Ok(series) => {
                    debug!("Fetched {} candles for {}", series.len(), symbol);
                    self.store.insert(symbol.clone(), series);
                    report.fetched.push(symbol.clone());
                }
                Err(e) => {
                    warn!("Failed to fetch candles for {}: {}", symbol, e);
                    self.store.record_failure(symbol.clone(), e.kind());
                    report.failed.push((symbol.clone(), e.kind()));
                }
            }

            guard.release(&symbol);
            let _ = tx.send(true);
        }

        for (symbol, mut rx) in waiting {
            // A closed channel means the owning batch was dropped mid-flight
            let _ = rx.wait_for(|done| *done).await;

            if self.store.contains(&symbol) {
                report.joined.push(symbol);
            } else {
                let kind = self.store.failure(&symbol).unwrap_or(ErrorKind::Internal);
                report.failed.push((symbol, kind));
            }
        }

        info!(
            "Fetch batch complete: {} fetched, {} joined, {} failed",
            report.fetched.len(),
            report.joined.len(),
            report.failed.len()
        );
        report
    }
}

/// If the batch is dropped early, aborts the fetches it still owns and
/// clears their in-flight markers, so no orphaned fetch outlives its marker
struct InFlightGuard {
    in_flight: InFlight,
    owned: HashMap<Symbol, AbortHandle>,
}

impl InFlightGuard {
    fn release(&mut self, symbol: &Symbol) {
        if self.owned.remove(symbol).is_some() {
            self.in_flight.lock().remove(symbol);
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.owned.is_empty() {
            return;
        }
        let mut in_flight = self.in_flight.lock();
        for (symbol, task) in self.owned.drain() {
            debug!("Batch dropped, aborting fetch for {}", symbol);
            task.abort();
            in_flight.remove(&symbol);
        }
    }
}

/// Fetch and decode one symbol's window, retrying transient failures.
///
/// A response that decodes to zero points is still a success; the empty
/// series is stored and renders as a row with no price and zero change.
async fn fetch_series(
    provider: &dyn MarketDataProvider,
    symbol: &Symbol,
    config: &FetchConfig,
) -> Result<TimeSeries> {
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let to = Utc::now();
        let from = to - chrono::Duration::days(i64::from(config.lookback_days));

        let result = provider
            .fetch_candles(symbol, from, to)
            .await
            .map(|response| response.into_time_series());

        match result {
            Err(e) if attempt < max_attempts && e.kind() == ErrorKind::Network => {
                let delay = backoff_delay(config.base_backoff, attempt);
                warn!(
                    "Attempt {}/{} for {} failed: {}; retrying in {:?}ms",
                    attempt,
                    max_attempts,
                    symbol,
                    e,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Exponential backoff with up to 50% random jitter
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
    let jitter_ms = (exp.as_millis() as u64) / 2;
    let jitter = if jitter_ms > 0 {
        rand::thread_rng().gen_range(0..=jitter_ms)
    } else {
        0
    };
    exp + Duration::from_millis(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::{candles, FakeProvider};

    fn sym(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    fn coordinator(provider: FakeProvider, config: FetchConfig) -> (FetchCoordinator, Arc<FakeProvider>) {
        let provider = Arc::new(provider);
        let coordinator = FetchCoordinator::new(
            provider.clone() as Arc<dyn MarketDataProvider>,
            Arc::new(TimeSeriesStore::new()),
            config,
        );
        (coordinator, provider)
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_failure_completes_once() {
        let provider = FakeProvider::new()
            .with_delayed_candles("AAPL", Duration::from_millis(300), candles(&[(5, 110.0), (4, 100.0)]))
            .with_failure("MSFT", "connection refused")
            .with_delayed_candles("GOOG", Duration::from_millis(100), candles(&[(5, 50.0)]));
        let (coordinator, _) = coordinator(provider, FetchConfig::default());

        let report = coordinator
            .ensure_fetched(&[sym("AAPL"), sym("MSFT"), sym("GOOG")])
            .await;

        // Returning at all means every task finished; the slowest took 300ms
        let store = coordinator.store();
        assert_eq!(store.len(), 2);
        assert!(store.contains(&sym("AAPL")));
        assert!(store.contains(&sym("GOOG")));
        assert!(!store.contains(&sym("MSFT")));

        assert_eq!(report.fetched.len(), 2);
        assert_eq!(report.failed, vec![(sym("MSFT"), ErrorKind::Network)]);
        assert!(!coordinator.is_in_flight(&sym("AAPL")));
    }

    #[tokio::test]
    async fn test_cached_symbols_not_refetched() {
        let provider = FakeProvider::new().with_candles("AAPL", candles(&[(5, 1.0)]));
        let (coordinator, provider) = coordinator(provider, FetchConfig::default());

        coordinator.ensure_fetched(&[sym("AAPL")]).await;
        let report = coordinator.ensure_fetched(&[sym("AAPL"), sym("AAPL")]).await;

        assert_eq!(report.cached, vec![sym("AAPL")]);
        assert_eq!(provider.candle_call_count("AAPL"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_batches_share_in_flight_fetch() {
        let provider = FakeProvider::new()
            .with_delayed_candles("AAPL", Duration::from_millis(200), candles(&[(5, 1.0)]))
            .with_candles("SNAP", candles(&[(5, 2.0)]));
        let (coordinator, provider) = coordinator(provider, FetchConfig::default());

        let first_batch = [sym("AAPL")];
        let second_batch = [sym("AAPL"), sym("SNAP")];
        let (first, second) = tokio::join!(
            coordinator.ensure_fetched(&first_batch),
            coordinator.ensure_fetched(&second_batch),
        );

        assert_eq!(provider.candle_call_count("AAPL"), 1);
        assert_eq!(first.fetched, vec![sym("AAPL")]);
        assert_eq!(second.joined, vec![sym("AAPL")]);
        assert_eq!(second.fetched, vec![sym("SNAP")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_batch_aborts_its_fetches() {
        let provider = FakeProvider::new()
            .with_delayed_candles("AAPL", Duration::from_millis(500), candles(&[(5, 1.0)]));
        let (coordinator, provider) = coordinator(provider, FetchConfig::default());
        let batch = [sym("AAPL")];

        let cancelled =
            tokio::time::timeout(Duration::from_millis(100), coordinator.ensure_fetched(&batch)).await;
        assert!(cancelled.is_err());
        assert!(!coordinator.is_in_flight(&sym("AAPL")));

        // The orphaned fetch must not keep running past the cancellation
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(provider.completed_candle_count("AAPL"), 0);

        let report = coordinator.ensure_fetched(&batch).await;
        assert_eq!(report.fetched, vec![sym("AAPL")]);
        assert_eq!(provider.candle_call_count("AAPL"), 2);
        assert_eq!(provider.completed_candle_count("AAPL"), 1);
    }

    #[tokio::test]
    async fn test_empty_window_is_stored() {
        let provider = FakeProvider::new().with_candles("AAPL", candles(&[]));
        let (coordinator, _) = coordinator(provider, FetchConfig::default());

        let report = coordinator.ensure_fetched(&[sym("AAPL")]).await;

        assert_eq!(report.fetched, vec![sym("AAPL")]);
        assert!(coordinator.store().get(&sym("AAPL")).unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_retry_recovers_transient_failure() {
        let provider = FakeProvider::new()
            .with_candles("AAPL", candles(&[(5, 1.0)]))
            .with_transient_failures("AAPL", 2);
        let config = FetchConfig {
            max_attempts: 3,
            ..Default::default()
        };
        let (coordinator, provider) = coordinator(provider, config);

        let report = coordinator.ensure_fetched(&[sym("AAPL")]).await;

        assert_eq!(report.fetched, vec![sym("AAPL")]);
        assert_eq!(provider.candle_call_count("AAPL"), 3);
    }

    #[tokio::test]
    async fn test_no_retry_by_default_and_no_data_recorded() {
        let provider = FakeProvider::new()
            .with_candles("AAPL", candles(&[(5, 1.0)]))
            .with_transient_failures("AAPL", 1);
        let (coordinator, provider) = coordinator(provider, FetchConfig::default());

        let report = coordinator.ensure_fetched(&[sym("AAPL"), sym("ZZZZ")]).await;

        assert_eq!(provider.candle_call_count("AAPL"), 1);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(coordinator.store().failure(&sym("ZZZZ")), Some(ErrorKind::NoData));
    }

    #[test]
    fn test_backoff_grows() {
        let base = Duration::from_millis(100);
        assert!(backoff_delay(base, 1) >= Duration::from_millis(100));
        assert!(backoff_delay(base, 1) <= Duration::from_millis(150));
        assert!(backoff_delay(base, 3) >= Duration::from_millis(400));
    }
}
