//! In-memory candle cache
//!
//! Single source of truth for "have we already fetched this symbol".
//! Series are stored behind `Arc` and replaced wholesale, never patched.

use crate::error::ErrorKind;
use crate::models::{Symbol, TimeSeries};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct TimeSeriesStore {
    /// Symbol -> most recently fetched series
    series: DashMap<Symbol, Arc<TimeSeries>>,

    /// Symbol -> kind of the last failed fetch
    failures: DashMap<Symbol, ErrorKind>,
}

impl TimeSeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &Symbol) -> Option<Arc<TimeSeries>> {
        self.series.get(symbol).map(|r| Arc::clone(r.value()))
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.series.contains_key(symbol)
    }

    /// Store a freshly fetched series, replacing any previous one
    pub fn insert(&self, symbol: Symbol, series: TimeSeries) {
        self.failures.remove(&symbol);
        self.series.insert(symbol, Arc::new(series));
    }

    pub fn record_failure(&self, symbol: Symbol, kind: ErrorKind) {
        if !self.series.contains_key(&symbol) {
            self.failures.insert(symbol, kind);
        }
    }

    pub fn failure(&self, symbol: &Symbol) -> Option<ErrorKind> {
        self.failures.get(symbol).map(|r| *r.value())
    }

    /// Keep only the given symbols; returns the evicted ones
    pub fn retain_symbols(&self, keep: &HashSet<Symbol>) -> Vec<Symbol> {
        let stale: Vec<Symbol> = self
            .series
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|symbol| !keep.contains(symbol))
            .collect();

        for symbol in &stale {
            self.series.remove(symbol);
        }
        self.failures.retain(|symbol, _| keep.contains(symbol));

        if !stale.is_empty() {
            tracing::debug!("Evicted {} cached series", stale.len());
        }
        stale
    }

    /// Symbols from `symbols` with no cached series, in input order
    pub fn missing(&self, symbols: &[Symbol]) -> Vec<Symbol> {
        symbols
            .iter()
            .filter(|symbol| !self.contains(symbol))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
