//! A collection of daily bars for a single symbol.

use crate::models::bar::DailyBar;

/// Daily bars for one symbol, ordered by date ascending.
///
/// An empty `bars` vector is a valid answer: the provider had nothing for the
/// requested window (market holiday, delisted symbol, ...).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DailySeries {
    /// The symbol this data represents (e.g., "7974.T").
    pub symbol: String,
    /// The collection of bars.
    pub bars: Vec<DailyBar>,
}

impl DailySeries {
    /// Creates a series from already ordered bars.
    pub fn new(symbol: impl Into<String>, bars: Vec<DailyBar>) -> Self {
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    /// An empty series for `symbol`.
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self::new(symbol, Vec::new())
    }

    /// Number of bars in the series.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// True when the provider returned no bars.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}
