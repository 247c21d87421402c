//! Diesel models mapping to [`crate::schema::stock_price`].

use chrono::NaiveDate;
use diesel::prelude::*;
use market_data_ingestor::models::bar::DailyBar;
use serde::Serialize;

use crate::schema::stock_price;

/// One stored daily observation. Identity is `(date, ticker)`.
///
/// Used for both SELECT and INSERT; rows are never updated once written.
/// `close` and `volume` are `None` only on rows migrated from the legacy table;
/// anything written through [`crate::store::Store::upsert`] carries both.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize)]
#[diesel(table_name = stock_price, check_for_backend(diesel::sqlite::Sqlite))]
pub struct PriceObservation {
    /// Trading date, stored as `YYYY-MM-DD`.
    pub date: NaiveDate,
    /// Exchange symbol (e.g., "7974.T").
    pub ticker: String,
    /// Closing price.
    pub close: Option<f64>,
    /// Traded volume; never negative.
    pub volume: Option<f64>,
}

impl PriceObservation {
    /// Builds a complete observation.
    pub fn new(date: NaiveDate, ticker: impl Into<String>, close: f64, volume: f64) -> Self {
        Self {
            date,
            ticker: ticker.into(),
            close: Some(close),
            volume: Some(volume),
        }
    }

    /// Tags a provider bar with the ticker it was fetched for.
    pub fn from_bar(ticker: &str, bar: &DailyBar) -> Self {
        Self::new(bar.date, ticker, bar.close, bar.volume)
    }

    /// Checks a row before it is written.
    ///
    /// New rows must carry a finite close and a finite, non-negative volume.
    /// Returns a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.ticker.trim().is_empty() {
            return Err(format!("{}: empty ticker", self.date));
        }
        match self.close {
            Some(close) if close.is_finite() => {}
            Some(_) => return Err(format!("{} {}: close is not finite", self.date, self.ticker)),
            None => return Err(format!("{} {}: close is missing", self.date, self.ticker)),
        }
        match self.volume {
            Some(volume) if volume.is_finite() && volume >= 0.0 => {}
            Some(volume) => {
                return Err(format!(
                    "{} {}: volume {volume} is negative or not finite",
                    self.date, self.ticker
                ));
            }
            None => return Err(format!("{} {}: volume is missing", self.date, self.ticker)),
        }
        Ok(())
    }
}
