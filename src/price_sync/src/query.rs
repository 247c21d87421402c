//! Filtering and aggregation over rows already loaded from the store.
//!
//! Everything here is pure: no I/O, no wall clock. Windows are anchored on the
//! latest date actually present in the input, so results are reproducible.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::{models::PriceObservation, registry::TickerRegistry};

/// Rows whose ticker is in `selected`, in input order.
///
/// An empty selection yields an empty result; telling the user "no tickers
/// selected" is the caller's job.
pub fn filter_by_tickers<S: AsRef<str>>(
    all: &[PriceObservation],
    selected: &[S],
) -> Vec<PriceObservation> {
    all.iter()
        .filter(|row| selected.iter().any(|s| s.as_ref() == row.ticker))
        .cloned()
        .collect()
}

/// Rows inside the `n` calendar days ending at the latest date present.
///
/// With the latest row on 01-10 and `n = 3`, rows dated 01-08, 01-09 and 01-10
/// are kept. `n = 0` or an empty input yields nothing.
pub fn window_by_trailing_days(series: &[PriceObservation], n: u32) -> Vec<PriceObservation> {
    let Some(cutoff) = window_start(series, n) else {
        return Vec::new();
    };
    series.iter().filter(|row| row.date >= cutoff).cloned().collect()
}

fn window_start(series: &[PriceObservation], n: u32) -> Option<NaiveDate> {
    if n == 0 {
        return None;
    }
    let latest = series.iter().map(|row| row.date).max()?;
    Some(
        latest
            .checked_sub_days(Days::new(u64::from(n - 1)))
            .unwrap_or(NaiveDate::MIN),
    )
}

/// The latest row and the one before it, for a single ticker.
///
/// `latest` has the maximum date; `previous` has the next-lower date for the
/// same ticker. With only one row, `previous` is `latest` itself (delta 0).
/// Returns `None` for an empty series.
pub fn latest_and_previous(
    series: &[PriceObservation],
) -> Option<(PriceObservation, PriceObservation)> {
    let latest = series.iter().max_by_key(|row| row.date)?;
    let previous = series
        .iter()
        .filter(|row| row.ticker == latest.ticker && row.date < latest.date)
        .max_by_key(|row| row.date)
        .unwrap_or(latest);
    Some((latest.clone(), previous.clone()))
}

/// `latest.close - previous.close`, or `None` when either close is missing
/// (legacy rows only).
pub fn delta(latest: &PriceObservation, previous: &PriceObservation) -> Option<f64> {
    Some(latest.close? - previous.close?)
}

/// Distinct tickers in order of first appearance.
pub fn tickers_present(all: &[PriceObservation]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for row in all {
        if !out.iter().any(|t| *t == row.ticker) {
            out.push(row.ticker.clone());
        }
    }
    out
}

/// The `n` newest rows, newest date first and tickers ascending within a date.
pub fn most_recent(rows: &[PriceObservation], n: usize) -> Vec<PriceObservation> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.ticker.cmp(&b.ticker)));
    sorted.truncate(n);
    sorted
}

/// Latest close and change for one ticker, labeled for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerSnapshot {
    /// Ticker symbol.
    pub ticker: String,
    /// Display name from the registry, or the symbol.
    pub label: String,
    /// Row with the latest date.
    pub latest: PriceObservation,
    /// Row before it (equal to `latest` when there is only one).
    pub previous: PriceObservation,
    /// `latest.close - previous.close`; see [`delta`].
    pub delta: Option<f64>,
}

/// One snapshot per ticker in `selected` that has at least one row, in selection order.
///
/// Pass each ticker's full series: `previous` is looked up in `rows`, so a
/// windowed input can hide the prior close.
pub fn ticker_snapshots<S: AsRef<str>>(
    rows: &[PriceObservation],
    selected: &[S],
    registry: &TickerRegistry,
) -> Vec<TickerSnapshot> {
    selected
        .iter()
        .filter_map(|ticker| {
            let ticker = ticker.as_ref();
            let series = filter_by_tickers(rows, &[ticker]);
            let (latest, previous) = latest_and_previous(&series)?;
            Some(TickerSnapshot {
                ticker: ticker.to_string(),
                label: registry.label(ticker).to_string(),
                delta: delta(&latest, &previous),
                latest,
                previous,
            })
        })
        .collect()
}

/// What the "latest" view shows: per-ticker snapshots and the newest rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestView {
    /// One entry per selected ticker with data, computed over its full series.
    pub snapshots: Vec<TickerSnapshot>,
    /// Newest rows inside the trailing window, newest first.
    pub recent: Vec<PriceObservation>,
}

impl LatestView {
    /// True when none of the selected tickers has any row.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Builds the latest view for `selected` from every stored row.
///
/// Snapshots use each ticker's whole history; only the row table is limited to
/// the last `days` calendar days (anchored on the latest selected row) and to
/// `max_rows` entries.
pub fn latest_view<S: AsRef<str>>(
    all: &[PriceObservation],
    selected: &[S],
    registry: &TickerRegistry,
    days: u32,
    max_rows: usize,
) -> LatestView {
    let rows = filter_by_tickers(all, selected);
    let window = window_by_trailing_days(&rows, days);
    LatestView {
        snapshots: ticker_snapshots(&rows, selected, registry),
        recent: most_recent(&window, max_rows),
    }
}
