//! Daily closing price ingestion for a configured set of tickers.
//!
//! The crate owns the `stock_price` SQLite table keyed by `(Date, Ticker)`:
//! [`store::Store`] creates or migrates it and performs idempotent inserts,
//! [`ingest::run_ingestion`] fills it from a
//! [`market_data_ingestor::providers::DataProvider`], and [`query`] filters and
//! aggregates what was loaded. [`cache::SnapshotCache`] sits between the store and
//! readers that poll.

#![deny(missing_docs)]

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod models;
pub mod providers;
pub mod query;
pub mod registry;
#[allow(missing_docs)]
pub mod schema;
pub mod store;
