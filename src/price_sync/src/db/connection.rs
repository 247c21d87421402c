//! SQLite connection helpers.
//!
//! Provides [`connect_sqlite`] that opens (or creates) a database file and applies
//! connection-wide PRAGMAs: WAL journaling and a 5000ms busy_timeout.

use diesel::{Connection, RunQueryDsl, SqliteConnection, sql_query};

use crate::error::{StoreError, StoreResult};

/// Open a SQLite connection and apply connection-wide PRAGMAs.
///
/// Any failure, including a PRAGMA the file refuses, is reported as
/// [`StoreError::StorageUnavailable`].
pub fn connect_sqlite(database_url: &str) -> StoreResult<SqliteConnection> {
    let unavailable = |reason: String| StoreError::StorageUnavailable {
        path: database_url.to_string(),
        reason,
    };

    let mut conn =
        SqliteConnection::establish(database_url).map_err(|e| unavailable(e.to_string()))?;

    // Readers keep working while ingestion writes
    sql_query("PRAGMA journal_mode=WAL;")
        .execute(&mut conn)
        .map_err(|e| unavailable(e.to_string()))?;
    sql_query("PRAGMA busy_timeout=5000;")
        .execute(&mut conn)
        .map_err(|e| unavailable(e.to_string()))?;
    Ok(conn)
}
