//! Search Service
//!
//! Debounced symbol search. Rapid query changes collapse into at most one
//! pending timer; when the quiet interval passes, one search is issued and
//! tagged with a sequence number. A response is delivered only if no newer
//! search (or clear) has been issued since, so a slow older response can
//! never overwrite newer results.
//!
//! Cancelling a pending timer never cancels a search already in flight.

use crate::error::{AppError, Result};
use crate::models::SearchResult;
use crate::providers::MarketDataProvider;
use parking_lot::{Mutex, ReentrantMutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Receives search results; called from a runtime worker thread
pub trait SearchResultsConsumer: Send + Sync {
    fn update_results(&self, results: Vec<SearchResult>);
}

struct PendingSearch {
    query: String,
    generation: u64,
    timer: JoinHandle<()>,
}

struct Inner {
    provider: Arc<dyn MarketDataProvider>,
    consumer: Arc<dyn SearchResultsConsumer>,
    quiet: Duration,
    pending: Mutex<Option<PendingSearch>>,
    /// Identifies timers so a superseded one can tell it lost
    generation: AtomicU64,
    /// Sequence number of the newest issued search or clear
    latest: AtomicU64,
    /// Serializes deliveries; reentrant so a consumer may requery from its callback
    delivery: ReentrantMutex<()>,
}

pub struct SearchDebouncer {
    inner: Arc<Inner>,
    runtime: Handle,
}

impl SearchDebouncer {
    /// Must be called from within a tokio runtime
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        consumer: Arc<dyn SearchResultsConsumer>,
        quiet: Duration,
    ) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| AppError::Internal(format!("SearchDebouncer needs a tokio runtime: {}", e)))?;

        Ok(Self {
            inner: Arc::new(Inner {
                provider,
                consumer,
                quiet,
                pending: Mutex::new(None),
                generation: AtomicU64::new(0),
                latest: AtomicU64::new(0),
                delivery: ReentrantMutex::new(()),
            }),
            runtime,
        })
    }

    /// Query currently waiting for its quiet interval, if any
    pub fn pending_query(&self) -> Option<String> {
        self.inner.pending.lock().as_ref().map(|p| p.query.clone())
    }

    /// Feed a new query text
    pub fn on_query_changed(&self, text: &str) {
        let query = text.trim();
        let mut pending = self.inner.pending.lock();

        if let Some(previous) = pending.take() {
            debug!("Superseding pending search '{}'", previous.query);
            previous.timer.abort();
        }

        if query.is_empty() {
            drop(pending);
            let seq = self.inner.latest.fetch_add(1, Ordering::SeqCst) + 1;
            self.inner.deliver(seq, Vec::new());
            return;
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);
        let task_query = query.to_string();
        let timer = self.runtime.spawn(async move {
            tokio::time::sleep(inner.quiet).await;
            inner.fire(generation, task_query).await;
        });

        *pending = Some(PendingSearch {
            query: query.to_string(),
            generation,
            timer,
        });
    }
}

impl Inner {
    async fn fire(&self, generation: u64, query: String) {
        let seq = {
            let mut pending = self.pending.lock();
            match pending.as_ref() {
                Some(p) if p.generation == generation => {
                    *pending = None;
                    self.latest.fetch_add(1, Ordering::SeqCst) + 1
                }
                _ => return,
            }
        };

        info!("SearchService::search - '{}' (seq {})", query, seq);

        let results = match self.provider.search(&query).await {
            Ok(response) => response.results,
            Err(e) => {
                warn!("Search for '{}' failed: {}", query, e);
                Vec::new()
            }
        };

        self.deliver(seq, results);
    }

    fn deliver(&self, seq: u64, results: Vec<SearchResult>) {
        let _guard = self.delivery.lock();

        let latest = self.latest.load(Ordering::SeqCst);
        if seq != latest {
            debug!("Discarding stale search response (seq {} < {})", seq, latest);
            return;
        }

        self.consumer.update_results(results);
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        if let Some(pending) = self.inner.pending.lock().take() {
            pending.timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::{search_hit, FakeProvider};

    #[derive(Default)]
    struct RecordingConsumer {
        deliveries: Mutex<Vec<Vec<SearchResult>>>,
    }

    impl SearchResultsConsumer for RecordingConsumer {
        fn update_results(&self, results: Vec<SearchResult>) {
            self.deliveries.lock().push(results);
        }
    }

    fn debouncer(provider: FakeProvider) -> (SearchDebouncer, Arc<FakeProvider>, Arc<RecordingConsumer>) {
        let provider = Arc::new(provider);
        let consumer = Arc::new(RecordingConsumer::default());
        let debouncer = SearchDebouncer::new(
            provider.clone() as Arc<dyn MarketDataProvider>,
            consumer.clone() as Arc<dyn SearchResultsConsumer>,
            Duration::from_millis(300),
        )
        .unwrap();
        (debouncer, provider, consumer)
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_changes_issue_one_search() {
        let provider = FakeProvider::new().with_search("AAPL", Duration::ZERO, vec![search_hit("AAPL")]);
        let (debouncer, provider, consumer) = debouncer(provider);

        for text in ["A", "AA", "AAP", "AAP ", "aapl"] {
            debouncer.on_query_changed(text);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        // "aapl" is not scripted; only the exact last text is searched
        debouncer.on_query_changed("AAPL");
        assert_eq!(debouncer.pending_query().as_deref(), Some("AAPL"));

        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(*provider.search_calls.lock(), vec!["AAPL".to_string()]);
        assert_eq!(*consumer.deliveries.lock(), vec![vec![search_hit("AAPL")]]);
        assert_eq!(debouncer.pending_query(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_stale_response_is_discarded() {
        let provider = FakeProvider::new()
            .with_search("AA", Duration::from_millis(500), vec![search_hit("AA")])
            .with_search("AAPL", Duration::from_millis(100), vec![search_hit("AAPL")]);
        let (debouncer, provider, consumer) = debouncer(provider);

        debouncer.on_query_changed("AA");
        tokio::time::sleep(Duration::from_millis(350)).await;
        debouncer.on_query_changed("AAPL");
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(provider.search_calls.lock().len(), 2);
        assert_eq!(*consumer.deliveries.lock(), vec![vec![search_hit("AAPL")]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_query_drops_in_flight_response() {
        let provider = FakeProvider::new().with_search("AA", Duration::from_millis(500), vec![search_hit("AA")]);
        let (debouncer, provider, consumer) = debouncer(provider);

        debouncer.on_query_changed("AA");
        tokio::time::sleep(Duration::from_millis(350)).await;
        debouncer.on_query_changed("   ");
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(provider.search_calls.lock().len(), 1);
        assert_eq!(*consumer.deliveries.lock(), vec![Vec::<SearchResult>::new()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_delivers_empty_results() {
        let (debouncer, _, consumer) = debouncer(FakeProvider::new());

        debouncer.on_query_changed("ZZZZ");
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(*consumer.deliveries.lock(), vec![Vec::<SearchResult>::new()]);
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        let consumer = Arc::new(RecordingConsumer::default());
        let result = SearchDebouncer::new(
            Arc::new(FakeProvider::new()),
            consumer,
            Duration::from_millis(300),
        );
        assert!(result.is_err());
    }
}
