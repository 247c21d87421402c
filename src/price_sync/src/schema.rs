//! Diesel table definitions.
//!
//! Column names follow the on-disk layout (`Date`, `Ticker`, ...), which predates this crate.

diesel::table! {
    /// Daily observations keyed by `(Date, Ticker)`.
    stock_price (date, ticker) {
        /// Trading date as `YYYY-MM-DD` text.
        #[sql_name = "Date"]
        date -> Date,
        /// Exchange symbol.
        #[sql_name = "Ticker"]
        ticker -> Text,
        /// Closing price; NULL only on rows carried over from the legacy table.
        #[sql_name = "Close"]
        close -> Nullable<Double>,
        /// Traded volume; NULL only on rows carried over from the legacy table.
        #[sql_name = "Volume"]
        volume -> Nullable<Double>,
    }
}
