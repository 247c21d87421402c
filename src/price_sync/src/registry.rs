//! Ordered ticker → display name mapping.

use indexmap::IndexMap;

/// The tickers to ingest, in ingestion order, with their display names.
///
/// Not persisted; built from [`crate::config::SyncConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickerRegistry {
    entries: IndexMap<String, String>,
}

impl TickerRegistry {
    /// Builds a registry from `(symbol, display name)` pairs. Later duplicates
    /// replace the display name but keep the first position.
    pub fn new<I, S, N>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, N)>,
        S: Into<String>,
        N: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(s, n)| (s.into(), n.into()))
                .collect(),
        }
    }

    /// Symbols in registry order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// `(symbol, display name)` pairs in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(s, n)| (s.as_str(), n.as_str()))
    }

    /// Display name for `symbol`, falling back to the symbol itself.
    pub fn label<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.entries.get(symbol).map(String::as_str).unwrap_or(symbol)
    }

    /// Whether `symbol` is configured.
    pub fn contains(&self, symbol: &str) -> bool {
        self.entries.contains_key(symbol)
    }

    /// Number of configured tickers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no ticker is configured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
