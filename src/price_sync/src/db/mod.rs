//! Database utilities for connections and schema lifecycle.
//!
//! This module provides:
//! - SQLite connection helpers: [`connection::connect_sqlite`] applies WAL and a 5000ms busy_timeout.
//! - Schema detection and the one-shot legacy fix-up: [`migrate::detect`] and [`migrate::ensure_schema`].
//!
//! Example:
//! ```no_run
//! use price_sync::db::{connection, migrate};
//!
//! let db_path = std::env::temp_dir().join("price_sync_example.db");
//! let mut conn = connection::connect_sqlite(db_path.to_str().unwrap()).expect("connect");
//! migrate::ensure_schema(&mut conn, migrate::LEGACY_TICKER).expect("schema");
//! ```

pub mod connection;
pub mod migrate;
