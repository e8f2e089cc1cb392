//! Services Layer
//!
//! Business logic of the watchlist core. Each service is an explicit object
//! constructed once in [`crate::state::AppState`] and shared by handle.
//!
//! # Architecture
//!
//! ```text
//! WatchlistService --notify--> WatchlistRefresher
//!                                 ├──> FetchCoordinator --> Provider
//!                                 │        └──> TimeSeriesStore
//!                                 └──> ProjectionService --> rows
//! SearchDebouncer --> Provider --> consumer
//! ```
//!
//! # Services
//!
//! - `WatchlistService` - Persisted watchlist membership
//! - `TimeSeriesStore` - In-memory candle cache
//! - `FetchCoordinator` - Parallel, deduplicated candle fetches
//! - `MetricsDeriver` - Change fraction and display text
//! - `ProjectionService` - Row and chart view models
//! - `SearchDebouncer` - Debounced symbol search
//! - `DetailService` - Metrics, news, detail payload

pub mod watchlist_service;
pub mod time_series_store;
pub mod fetch_coordinator;
pub mod metrics_service;
pub mod projection_service;
pub mod search_service;
pub mod detail_service;

// Re-export commonly used types and services
pub use watchlist_service::WatchlistService;
pub use time_series_store::TimeSeriesStore;
pub use fetch_coordinator::{BatchReport, FetchConfig, FetchCoordinator};
pub use metrics_service::{percent_text, ChangeDirection, MetricsDeriver};
pub use projection_service::{ChartViewModel, ProjectionService, RowState, RowStatus, RowViewModel};
pub use search_service::{SearchDebouncer, SearchResultsConsumer};
pub use detail_service::{DetailService, MetricRow, StockDetail};
