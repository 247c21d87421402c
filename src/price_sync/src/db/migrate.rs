//! Schema detection and the one-shot legacy fix-up for `stock_price`.
//!
//! The table exists in exactly two known layouts:
//! - **Legacy**: `Date TEXT PRIMARY KEY, Close REAL, Volume REAL`, written when only
//!   one ticker was tracked.
//! - **Current**: `(Date, Ticker)` composite key, see [`CREATE_STOCK_PRICE`].
//!
//! [`ensure_schema`] inspects the column set once and moves the store to the
//! current layout: create it when absent, rebuild it when legacy, do nothing
//! otherwise. The rebuild runs in one `BEGIN IMMEDIATE` transaction, so a failure
//! leaves the legacy table exactly as it was.

use diesel::{
    QueryableByName, RunQueryDsl, SqliteConnection, connection::SimpleConnection, sql_query,
    sql_types::Text,
};

use crate::error::{StoreError, StoreResult};

/// Ticker assigned to rows written before the store tracked more than one symbol.
pub const LEGACY_TICKER: &str = "7974.T";

/// Name of the price table.
pub const TABLE: &str = "stock_price";

const LEGACY_RENAMED: &str = "stock_price_legacy";

/// DDL for the current layout.
///
/// `Close` and `Volume` stay nullable like the legacy columns, so every legacy
/// row has a place in the new table. New writes are checked in
/// [`PriceObservation::validate`](crate::models::PriceObservation::validate).
pub const CREATE_STOCK_PRICE: &str = r#"
CREATE TABLE stock_price (
    Date   TEXT NOT NULL,
    Ticker TEXT NOT NULL,
    Close  REAL,
    Volume REAL,
    PRIMARY KEY (Date, Ticker)
);
"#;

/// Layout of the `stock_price` table as found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    /// No table yet.
    Missing,
    /// Single-ticker layout without a `Ticker` column.
    Legacy,
    /// Composite-keyed layout.
    Current,
}

/// What [`ensure_schema`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaOutcome {
    /// The table did not exist and was created.
    Created,
    /// A legacy table was rebuilt; `rows` were carried over.
    Migrated {
        /// Number of legacy rows copied into the new table.
        rows: usize,
    },
    /// Nothing to do.
    AlreadyCurrent,
}

#[derive(QueryableByName)]
struct TableColumn {
    #[diesel(sql_type = Text)]
    name: String,
}

/// Inspects the column set of `stock_price`.
pub fn detect(conn: &mut SqliteConnection) -> diesel::QueryResult<SchemaVersion> {
    let columns: Vec<TableColumn> = sql_query(format!("PRAGMA table_info({TABLE});")).load(conn)?;

    if columns.is_empty() {
        return Ok(SchemaVersion::Missing);
    }
    // SQLite column names are case-insensitive
    if columns.iter().any(|c| c.name.eq_ignore_ascii_case("Ticker")) {
        Ok(SchemaVersion::Current)
    } else {
        Ok(SchemaVersion::Legacy)
    }
}

/// Brings `stock_price` to the current layout. Safe to call on every startup.
///
/// Every legacy row is copied with `legacy_ticker` as its ticker and its date
/// normalized to `YYYY-MM-DD`; NULL closes and volumes are carried over as-is.
/// Only a date SQLite cannot read aborts the migration with
/// [`StoreError::MigrationFailed`], leaving the legacy table untouched.
pub fn ensure_schema(
    conn: &mut SqliteConnection,
    legacy_ticker: &str,
) -> StoreResult<SchemaOutcome> {
    // Fast path without taking the write lock
    if detect(conn)? == SchemaVersion::Current {
        return Ok(SchemaOutcome::AlreadyCurrent);
    }

    let outcome = conn
        .immediate_transaction::<_, diesel::result::Error, _>(|conn| {
            // Re-check under the lock: another process may have won the race.
            match detect(conn)? {
                SchemaVersion::Current => Ok(SchemaOutcome::AlreadyCurrent),
                SchemaVersion::Missing => {
                    conn.batch_execute(CREATE_STOCK_PRICE)?;
                    Ok(SchemaOutcome::Created)
                }
                SchemaVersion::Legacy => {
                    let rows = migrate_legacy(conn, legacy_ticker)?;
                    Ok(SchemaOutcome::Migrated { rows })
                }
            }
        })
        .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;

    match outcome {
        SchemaOutcome::Created => tracing::info!(table = TABLE, "created price table"),
        SchemaOutcome::Migrated { rows } => {
            tracing::info!(table = TABLE, rows, legacy_ticker, "migrated legacy price table")
        }
        SchemaOutcome::AlreadyCurrent => {}
    }
    Ok(outcome)
}

fn migrate_legacy(conn: &mut SqliteConnection, legacy_ticker: &str) -> diesel::QueryResult<usize> {
    conn.batch_execute(&format!("ALTER TABLE {TABLE} RENAME TO {LEGACY_RENAMED};"))?;
    conn.batch_execute(CREATE_STOCK_PRICE)?;

    let copied = sql_query(format!(
        "INSERT INTO {TABLE} (Date, Ticker, Close, Volume)
         SELECT date(Date), ?, Close, Volume FROM {LEGACY_RENAMED};"
    ))
    .bind::<Text, _>(legacy_ticker)
    .execute(conn)?;

    conn.batch_execute(&format!("DROP TABLE {LEGACY_RENAMED};"))?;
    Ok(copied)
}
