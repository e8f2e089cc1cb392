//! Application state management

use crate::db::sqlite::{Settings, SqliteDb};
use crate::error::{AppError, Result};
use crate::events::ChangeNotifier;
use crate::providers::finnhub::FinnhubProvider;
use crate::providers::MarketDataProvider;
use crate::scheduler::WatchlistRefresher;
use crate::services::{
    DetailService, FetchConfig, FetchCoordinator, MetricsDeriver, ProjectionService,
    SearchDebouncer, SearchResultsConsumer, TimeSeriesStore, WatchlistService,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const DB_FILE: &str = "stockwatch.db";

/// Every service of the core, built once at start and shared by handle
pub struct AppState {
    /// SQLite database connection
    pub sqlite: Arc<SqliteDb>,

    /// Settings as loaded at start
    pub settings: Settings,

    /// Market data source
    pub provider: Arc<dyn MarketDataProvider>,

    /// Watchlist change signal
    pub notifier: ChangeNotifier,

    pub watchlist: Arc<WatchlistService>,
    pub time_series: Arc<TimeSeriesStore>,
    pub fetcher: Arc<FetchCoordinator>,
    pub projector: Arc<ProjectionService>,
    pub refresher: Arc<WatchlistRefresher>,
    pub details: Arc<DetailService>,

    /// Application data directory
    pub data_dir: PathBuf,
}

impl AppState {
    /// Open the database under `data_dir` and connect to Finnhub
    pub fn new(data_dir: PathBuf, api_key: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::Config("Finnhub API key is not set".to_string()));
        }

        // Create data directory if it doesn't exist
        std::fs::create_dir_all(&data_dir)?;
        tracing::info!("Data directory: {:?}", data_dir);

        let sqlite = Arc::new(SqliteDb::new(&data_dir.join(DB_FILE))?);
        let settings = sqlite.get_settings()?;

        let provider: Arc<dyn MarketDataProvider> = Arc::new(FinnhubProvider::new(
            &settings.api_base_url,
            api_key,
            settings.candle_resolution.clone(),
            settings.requests_per_second,
        )?);

        Self::with_provider(sqlite, provider, data_dir)
    }

    /// Wire the services around an existing database and provider
    pub fn with_provider(
        sqlite: Arc<SqliteDb>,
        provider: Arc<dyn MarketDataProvider>,
        data_dir: PathBuf,
    ) -> Result<Self> {
        let settings = sqlite.get_settings()?;
        let deriver = MetricsDeriver::new(settings.market_tz()?);

        let notifier = ChangeNotifier::new();
        let watchlist = Arc::new(WatchlistService::new(Arc::clone(&sqlite), notifier.clone()));
        let time_series = Arc::new(TimeSeriesStore::new());
        let fetcher = Arc::new(FetchCoordinator::new(
            Arc::clone(&provider),
            Arc::clone(&time_series),
            FetchConfig {
                lookback_days: settings.lookback_days,
                max_attempts: settings.max_fetch_attempts,
                base_backoff: Duration::from_millis(500),
            },
        ));
        let projector = Arc::new(ProjectionService::new(deriver));
        let refresher = Arc::new(WatchlistRefresher::new(
            Arc::clone(&watchlist),
            Arc::clone(&fetcher),
            Arc::clone(&projector),
        ));
        let details = Arc::new(DetailService::new(
            Arc::clone(&provider),
            Arc::clone(&fetcher),
            Arc::clone(&projector),
        ));

        tracing::info!("Application state initialized with provider '{}'", provider.id());

        Ok(Self {
            sqlite,
            settings,
            provider,
            notifier,
            watchlist,
            time_series,
            fetcher,
            projector,
            refresher,
            details,
            data_dir,
        })
    }

    /// A debouncer delivering to `consumer`; needs a running tokio runtime
    pub fn search_debouncer(
        &self,
        consumer: Arc<dyn SearchResultsConsumer>,
    ) -> Result<SearchDebouncer> {
        SearchDebouncer::new(
            Arc::clone(&self.provider),
            consumer,
            self.settings.search_debounce(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::SettingsUpdate;
    use crate::providers::testing::{candles, FakeProvider};

    #[tokio::test]
    async fn test_services_share_one_cache() {
        let sqlite = Arc::new(SqliteDb::open_in_memory().unwrap());
        sqlite
            .update_settings(SettingsUpdate {
                market_timezone: Some("UTC".to_string()),
                ..Default::default()
            })
            .unwrap();
        let provider = FakeProvider::new().with_candles("MSFT", candles(&[(5, 1.0)]));
        let state = AppState::with_provider(sqlite, Arc::new(provider), PathBuf::from(".")).unwrap();

        state.refresher.refresh().await.unwrap();

        assert!(state.time_series.contains(&crate::models::Symbol::parse("MSFT").unwrap()));
        assert_eq!(state.refresher.latest_rows().len(), 1);
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppState::new(dir.path().to_path_buf(), " ").err().unwrap();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }
}
