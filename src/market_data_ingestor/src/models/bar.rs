//! Canonical in-memory representation of one trading day.
//!
//! This struct is the standard output of every [`DataProvider`](crate::providers::DataProvider)
//! implementation, regardless of where the numbers came from.

use chrono::NaiveDate;

/// A single daily observation for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    /// Trading date in the exchange's local calendar.
    pub date: NaiveDate,

    /// Closing price.
    pub close: f64,

    /// Volume traded during the session. Providers that omit volume report 0.
    pub volume: f64,
}

impl DailyBar {
    /// Convenience constructor.
    pub fn new(date: NaiveDate, close: f64, volume: f64) -> Self {
        Self {
            date,
            close,
            volume,
        }
    }
}
