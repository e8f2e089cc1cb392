//! Metrics Service
//!
//! Derives the change fraction and display strings from a time series.
//! Every call site (row colouring, percentage text, chart fill) goes through
//! [`MetricsDeriver::change_fraction`] so they can never disagree.

use crate::models::TimeSeries;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

const MAX_FRACTION_DIGITS: usize = 2;

/// Direction of the day-over-day change; zero counts as up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDirection {
    Up,
    Down,
}

impl ChangeDirection {
    pub fn from_fraction(fraction: f64) -> Self {
        if fraction < 0.0 {
            ChangeDirection::Down
        } else {
            ChangeDirection::Up
        }
    }
}

/// Pure derivations over a date-descending series
#[derive(Debug, Clone, Copy)]
pub struct MetricsDeriver {
    tz: Tz,
}

impl MetricsDeriver {
    /// `tz` decides where one calendar day ends and the next begins
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Latest close relative to the previous calendar day's close, minus one.
    ///
    /// Same-day intraday points are skipped when looking for the prior close.
    /// Returns 0 for an empty or single-day series, and when the prior close
    /// is 0 (no meaningful ratio exists).
    pub fn change_fraction(&self, series: &TimeSeries) -> f64 {
        let Some(latest) = series.latest() else {
            return 0.0;
        };
        let latest_day = latest.day(self.tz);

        let prior = series
            .points()
            .iter()
            .find(|point| point.day(self.tz) != latest_day);

        match prior {
            Some(prior) if prior.close != 0.0 => latest.close / prior.close - 1.0,
            _ => 0.0,
        }
    }

    pub fn direction(&self, series: &TimeSeries) -> ChangeDirection {
        ChangeDirection::from_fraction(self.change_fraction(series))
    }

    /// Latest close as decimal text, empty for an empty series
    pub fn latest_price_text(&self, series: &TimeSeries) -> String {
        series
            .latest()
            .map(|point| format_decimal(point.close, MAX_FRACTION_DIGITS))
            .unwrap_or_default()
    }

    /// Fraction as percent text, e.g. `0.1` -> `10%`
    pub fn percent_text(&self, fraction: f64) -> String {
        percent_text(fraction)
    }
}

/// Fraction as percent text with at most two fraction digits
pub fn percent_text(fraction: f64) -> String {
    format!("{}%", format_decimal(fraction * 100.0, MAX_FRACTION_DIGITS))
}

/// Decimal text with `,` grouping and at most `max_fraction_digits`
/// fraction digits (trailing zeros dropped). Non-finite input yields "".
pub fn format_decimal(value: f64, max_fraction_digits: usize) -> String {
    if !value.is_finite() {
        return String::new();
    }

    let rounded = format!("{:.*}", max_fraction_digits, value.abs());
    let (int_part, frac_part) = match rounded.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part.trim_end_matches('0')),
        None => (rounded.as_str(), ""),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let is_zero = int_part.chars().all(|c| c == '0') && frac_part.is_empty();
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };

    if frac_part.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac_part)
    }
}
