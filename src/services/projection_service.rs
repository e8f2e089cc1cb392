//! Projection Service
//!
//! Turns watchlist entries plus cached series into render-ready rows.
//! Rows are rebuilt from scratch on every pass, in watchlist order.

use crate::error::ErrorKind;
use crate::models::{TimeSeries, WatchlistEntry};
use crate::services::metrics_service::{ChangeDirection, MetricsDeriver};
use crate::services::time_series_store::TimeSeriesStore;
use serde::Serialize;

/// One watchlist row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowViewModel {
    pub symbol: String,
    pub company_name: String,
    pub latest_price_text: String,
    pub change_percent_text: String,
    pub change_direction: ChangeDirection,
    pub change_fraction: f64,
    /// Closes, oldest first
    pub sparkline_series: Vec<f64>,
}

/// Chart settings for the detail screen
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartViewModel {
    pub data: Vec<f64>,
    pub show_legend: bool,
    pub show_axis: bool,
    pub fill: ChangeDirection,
}

/// Per-row outcome, for consumers that render error and loading states
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "camelCase")]
pub enum RowState {
    Ready(RowViewModel),
    Failed(ErrorKind),
    Loading,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowStatus {
    pub entry: WatchlistEntry,
    pub state: RowState,
}

pub struct ProjectionService {
    deriver: MetricsDeriver,
}

impl ProjectionService {
    pub fn new(deriver: MetricsDeriver) -> Self {
        Self { deriver }
    }

    /// Rows for every entry with a cached series; the rest are omitted
    pub fn project(&self, entries: &[WatchlistEntry], store: &TimeSeriesStore) -> Vec<RowViewModel> {
        let rows: Vec<RowViewModel> = entries
            .iter()
            .filter_map(|entry| {
                store
                    .get(&entry.symbol)
                    .map(|series| self.row(entry, &series))
            })
            .collect();

        tracing::debug!(
            "Projected {} of {} watchlist entries",
            rows.len(),
            entries.len()
        );
        rows
    }

    /// One status per entry, failed and pending entries included
    pub fn project_with_status(
        &self,
        entries: &[WatchlistEntry],
        store: &TimeSeriesStore,
    ) -> Vec<RowStatus> {
        entries
            .iter()
            .map(|entry| {
                let state = match store.get(&entry.symbol) {
                    Some(series) => RowState::Ready(self.row(entry, &series)),
                    None => match store.failure(&entry.symbol) {
                        Some(kind) => RowState::Failed(kind),
                        None => RowState::Loading,
                    },
                };
                RowStatus {
                    entry: entry.clone(),
                    state,
                }
            })
            .collect()
    }

    pub fn row(&self, entry: &WatchlistEntry, series: &TimeSeries) -> RowViewModel {
        let fraction = self.deriver.change_fraction(series);

        RowViewModel {
            symbol: entry.symbol.to_string(),
            company_name: entry.company_name.clone(),
            latest_price_text: self.deriver.latest_price_text(series),
            change_percent_text: self.deriver.percent_text(fraction),
            change_direction: ChangeDirection::from_fraction(fraction),
            change_fraction: fraction,
            sparkline_series: series.chronological_closes(),
        }
    }

    pub fn chart(&self, series: &TimeSeries) -> ChartViewModel {
        ChartViewModel {
            data: series.chronological_closes(),
            show_legend: false,
            show_axis: true,
            fill: self.deriver.direction(series),
        }
    }
}
