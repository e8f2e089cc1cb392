//! Stockwatch - watchlist data core
//!
//! Keeps a persisted watchlist, fetches and caches candle series per symbol,
//! derives change figures and projects render-ready rows. Also provides a
//! debounced symbol search and the data behind the detail and news screens.

pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod providers;
pub mod scheduler;
pub mod services;
pub mod state;

pub use error::{AppError, Result};
pub use state::AppState;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging; `RUST_LOG` overrides the default filter
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stockwatch=debug,stockwatch_lib=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
