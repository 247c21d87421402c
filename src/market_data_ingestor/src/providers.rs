//! Provider abstraction for market data sources.
//!
//! This module defines the [`DataProvider`] trait, the unified interface for
//! fetching recent daily bars for one symbol from any market data vendor.
//!
//! Implementations only talk to their vendor. They do not retry and they do not
//! enforce a deadline; both are the caller's policy. They must however tell
//! "nothing to report" apart from "could not ask": the former is
//! `Ok(DailySeries)` with no bars, the latter is a [`ProviderError`].
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use market_data_ingestor::models::bar_series::DailySeries;
//! use market_data_ingestor::providers::{DataProvider, ProviderError};
//!
//! struct MyProvider;
//!
//! #[async_trait]
//! impl DataProvider for MyProvider {
//!     async fn fetch_recent(
//!         &self,
//!         symbol: &str,
//!         _lookback_days: u32,
//!     ) -> Result<DailySeries, ProviderError> {
//!         Ok(DailySeries::empty(symbol))
//!     }
//! }
//! ```

pub mod yahoo_chart;

use async_trait::async_trait;
use snafu::{Backtrace, Snafu};

use crate::models::bar_series::DailySeries;

/// Default number of days fetched per symbol.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 5;

/// Trait for fetching recent daily bars from a market data provider.
///
/// Supports dynamic dispatch (`dyn DataProvider`) for runtime selection of providers.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Fetches the most recent `lookback_days` of daily bars for `symbol`.
    ///
    /// # Returns
    ///
    /// * `Ok(DailySeries)` - Bars ordered by date ascending; possibly empty.
    /// * `Err(ProviderError)` - The provider could not be queried or answered with an error.
    async fn fetch_recent(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> Result<DailySeries, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The configured request rate cannot be expressed as a quota.
    #[snafu(display("Invalid rate limit: {message}"))]
    RateLimit {
        message: String,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a `DataProvider` implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., connection refused, DNS, client timeout).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The provider answered with a non-success HTTP status.
    #[snafu(display("HTTP {status}: {body}"))]
    Status {
        status: u16,
        body: String,
        backtrace: Backtrace,
    },

    /// The provider's API returned a specific error message (e.g., unknown symbol).
    #[snafu(display("API error: {message}"))]
    Api {
        message: String,
        backtrace: Backtrace,
    },

    /// The response could not be understood (format drift, missing fields).
    #[snafu(display("Unexpected response: {message}"))]
    Decode {
        message: String,
        backtrace: Backtrace,
    },

    /// The request parameters were invalid for this specific provider.
    #[snafu(display("Invalid parameters for provider: {message}"))]
    Validation {
        message: String,
        backtrace: Backtrace,
    },
}

impl ProviderError {
    /// Whether asking again later could plausibly succeed.
    ///
    /// Network failures, throttling (429) and server-side errors (5xx) are
    /// transient; everything else is a property of the request or the symbol.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Reqwest { .. } => true,
            ProviderError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
