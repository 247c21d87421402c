//! Ingestion run: fetch every configured ticker and store what came back.
//!
//! ## Isolation
//! Tickers are processed one after another, in registry order. A fetch or write
//! failure is recorded against that ticker in the [`IngestReport`] and the run
//! moves on; only store-level failures (cannot open, cannot migrate) abort it.
//!
//! ## Deadlines & retries
//! Each fetch attempt is bounded by [`IngestOptions::fetch_timeout`]. Transient
//! failures (network errors, timeouts, HTTP 429/5xx) are retried up to
//! [`IngestOptions::max_retries`] times with exponential backoff.
//!
//! ## Single writer
//! The run borrows the [`Store`] mutably, so upserts are serialized by construction.

use std::time::Duration;

use market_data_ingestor::{
    models::bar_series::DailySeries,
    providers::{DEFAULT_LOOKBACK_DAYS, DataProvider, ProviderError},
};
use thiserror::Error;

use crate::{
    db::migrate::SchemaOutcome,
    error::StoreError,
    models::PriceObservation,
    registry::TickerRegistry,
    store::Store,
};

/// Fetch policy for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOptions {
    /// Days of history requested per ticker.
    pub lookback_days: u32,
    /// Deadline for one fetch attempt.
    pub fetch_timeout: Duration,
    /// Extra attempts for transient failures.
    pub max_retries: u32,
    /// Delay before the first retry; doubles per attempt.
    pub retry_base_delay: Duration,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            fetch_timeout: Duration::from_secs(30),
            max_retries: 0,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The store could not be prepared.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a single ticker did not make it into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickerError {
    /// The provider failed or timed out; message kept for diagnostics.
    Fetch(String),
    /// The fetched batch was rejected by the store.
    Write(String),
}

impl std::fmt::Display for TickerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TickerError::Fetch(m) => write!(f, "fetch failed: {m}"),
            TickerError::Write(m) => write!(f, "write failed: {m}"),
        }
    }
}

/// Result of one ticker within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerOutcome {
    /// Ticker symbol.
    pub ticker: String,
    /// Rows returned by the provider (0 on fetch failure).
    pub fetched: usize,
    /// Rows that were new to the store.
    pub inserted: usize,
    /// Failure, if any.
    pub error: Option<TickerError>,
}

impl TickerOutcome {
    /// True when the ticker completed without error.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-ticker outcome of a run, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// What [`Store::ensure_schema`] did at the start of the run.
    pub schema: Option<SchemaOutcome>,
    /// One entry per registry ticker.
    pub tickers: Vec<TickerOutcome>,
}

impl IngestReport {
    /// Entry for `ticker`, if it was part of the run.
    pub fn get(&self, ticker: &str) -> Option<&TickerOutcome> {
        self.tickers.iter().find(|t| t.ticker == ticker)
    }

    /// Entries that failed.
    pub fn failed(&self) -> impl Iterator<Item = &TickerOutcome> {
        self.tickers.iter().filter(|t| !t.is_ok())
    }

    /// Sum of newly inserted rows.
    pub fn total_inserted(&self) -> usize {
        self.tickers.iter().map(|t| t.inserted).sum()
    }

    /// True when every ticker completed without error.
    pub fn is_clean(&self) -> bool {
        self.tickers.iter().all(TickerOutcome::is_ok)
    }
}

enum FetchFailure {
    Provider(ProviderError),
    TimedOut(Duration),
}

impl FetchFailure {
    fn is_transient(&self) -> bool {
        match self {
            FetchFailure::Provider(e) => e.is_transient(),
            FetchFailure::TimedOut(_) => true,
        }
    }

    fn message(&self) -> String {
        match self {
            FetchFailure::Provider(e) => e.to_string(),
            FetchFailure::TimedOut(after) => format!("timed out after {after:?}"),
        }
    }
}

async fn fetch_once(
    provider: &dyn DataProvider,
    symbol: &str,
    opts: &IngestOptions,
) -> Result<DailySeries, FetchFailure> {
    match tokio::time::timeout(
        opts.fetch_timeout,
        provider.fetch_recent(symbol, opts.lookback_days),
    )
    .await
    {
        Ok(Ok(series)) => Ok(series),
        Ok(Err(e)) => Err(FetchFailure::Provider(e)),
        Err(_) => Err(FetchFailure::TimedOut(opts.fetch_timeout)),
    }
}

async fn fetch_with_retry(
    provider: &dyn DataProvider,
    symbol: &str,
    opts: &IngestOptions,
) -> Result<DailySeries, FetchFailure> {
    let mut attempt = 0;
    loop {
        match fetch_once(provider, symbol, opts).await {
            Ok(series) => return Ok(series),
            Err(failure) if failure.is_transient() && attempt < opts.max_retries => {
                let delay = opts
                    .retry_base_delay
                    .saturating_mul(2u32.saturating_pow(attempt));
                tracing::debug!(symbol, attempt, ?delay, error = %failure.message(), "retrying fetch");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(failure) => return Err(failure),
        }
    }
}

/// Fetches every ticker in `registry` and upserts the results into `store`.
///
/// The schema is ensured first; failure there is fatal. Afterwards nothing a
/// single ticker does can abort the run.
pub async fn run_ingestion(
    registry: &TickerRegistry,
    store: &mut Store,
    provider: &dyn DataProvider,
    opts: &IngestOptions,
) -> Result<IngestReport, IngestError> {
    let schema = store.ensure_schema()?;
    let mut report = IngestReport {
        schema: Some(schema),
        tickers: Vec::with_capacity(registry.len()),
    };

    for symbol in registry.symbols() {
        let outcome = ingest_one(symbol, store, provider, opts).await?;
        report.tickers.push(outcome);
    }

    tracing::info!(
        tickers = report.tickers.len(),
        inserted = report.total_inserted(),
        failed = report.failed().count(),
        "ingestion finished"
    );
    Ok(report)
}

async fn ingest_one(
    symbol: &str,
    store: &mut Store,
    provider: &dyn DataProvider,
    opts: &IngestOptions,
) -> Result<TickerOutcome, IngestError> {
    let mut outcome = TickerOutcome {
        ticker: symbol.to_string(),
        fetched: 0,
        inserted: 0,
        error: None,
    };

    let series = match fetch_with_retry(provider, symbol, opts).await {
        Ok(series) => series,
        Err(failure) => {
            let message = failure.message();
            tracing::warn!(symbol, error = %message, "fetch failed; skipping ticker");
            outcome.error = Some(TickerError::Fetch(message));
            return Ok(outcome);
        }
    };

    outcome.fetched = series.len();
    if series.is_empty() {
        tracing::info!(symbol, "provider returned no rows");
        return Ok(outcome);
    }

    let rows: Vec<PriceObservation> = series
        .bars
        .iter()
        .map(|bar| PriceObservation::from_bar(symbol, bar))
        .collect();

    match store.upsert(&rows) {
        Ok(inserted) => {
            outcome.inserted = inserted;
            tracing::info!(symbol, fetched = outcome.fetched, inserted, "stored");
        }
        Err(e) if e.is_fatal() => return Err(e.into()),
        Err(e) => {
            tracing::warn!(symbol, error = %e, "write failed");
            let message = match e {
                StoreError::WriteFailed(m) => m,
                other => other.to_string(),
            };
            outcome.error = Some(TickerError::Write(message));
        }
    }
    Ok(outcome)
}
