//! Durable, idempotent persistence of [`PriceObservation`] rows.
//!
//! A [`Store`] owns one SQLite connection and is the single writer for the
//! file it opened. Writes are insert-if-absent: the first observation stored
//! for a `(date, ticker)` key wins and is never revised.

use std::path::Path;

use diesel::{SqliteConnection, prelude::*};

use crate::{
    db::{
        connection::connect_sqlite,
        migrate::{self, LEGACY_TICKER, SchemaOutcome},
    },
    error::{StoreError, StoreResult},
    models::PriceObservation,
    schema::stock_price,
};

/// Handle to the price database.
pub struct Store {
    conn: SqliteConnection,
    location: String,
    legacy_ticker: String,
    schema_ready: bool,
}

impl Store {
    /// Opens or creates the database at `location`.
    ///
    /// Fails with [`StoreError::StorageUnavailable`] if the file cannot be opened.
    /// A path that is not valid UTF-8 is rejected the same way rather than opened
    /// under a lossy spelling. The schema is not touched here; see
    /// [`Store::ensure_schema`].
    pub fn open(location: impl AsRef<Path>) -> StoreResult<Self> {
        let path = location.as_ref();
        let location = path
            .to_str()
            .ok_or_else(|| StoreError::StorageUnavailable {
                path: path.display().to_string(),
                reason: "path is not valid UTF-8".to_string(),
            })?
            .to_string();
        let conn = connect_sqlite(&location)?;
        Ok(Self {
            conn,
            location,
            legacy_ticker: LEGACY_TICKER.to_string(),
            schema_ready: false,
        })
    }

    /// Overrides the ticker assigned to legacy rows during migration.
    pub fn with_legacy_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.legacy_ticker = ticker.into();
        self
    }

    /// Path this store was opened with.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Creates or migrates the price table as needed. Idempotent.
    pub fn ensure_schema(&mut self) -> StoreResult<SchemaOutcome> {
        let outcome = migrate::ensure_schema(&mut self.conn, &self.legacy_ticker)?;
        self.schema_ready = true;
        Ok(outcome)
    }

    fn ready(&mut self) -> StoreResult<()> {
        if !self.schema_ready {
            self.ensure_schema()?;
        }
        Ok(())
    }

    /// Inserts every row whose `(date, ticker)` is not stored yet and returns how
    /// many were new. Existing keys are skipped, never overwritten.
    ///
    /// The batch is all-or-nothing: rows are validated up front and written in one
    /// immediate transaction. Any invalid row or database error rejects the whole
    /// batch with [`StoreError::WriteFailed`].
    pub fn upsert(&mut self, rows: &[PriceObservation]) -> StoreResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        self.ready()?;

        for row in rows {
            row.validate().map_err(StoreError::WriteFailed)?;
        }

        self.conn
            .immediate_transaction::<_, diesel::result::Error, _>(|conn| {
                let mut inserted = 0;
                for row in rows {
                    inserted += diesel::insert_into(stock_price::table)
                        .values(row)
                        .on_conflict((stock_price::date, stock_price::ticker))
                        .do_nothing()
                        .execute(conn)?;
                }
                Ok(inserted)
            })
            .map_err(|e| StoreError::WriteFailed(e.to_string()))
    }

    /// Every stored row, ordered by date ascending.
    ///
    /// Rows sharing a date come back in ticker order, but callers should not
    /// depend on that.
    pub fn load_all(&mut self) -> StoreResult<Vec<PriceObservation>> {
        self.ready()?;
        let rows = stock_price::table
            .order((stock_price::date.asc(), stock_price::ticker.asc()))
            .select(PriceObservation::as_select())
            .load(&mut self.conn)?;
        Ok(rows)
    }

    /// Rows of a single ticker, ordered by date ascending.
    pub fn load_ticker(&mut self, ticker: &str) -> StoreResult<Vec<PriceObservation>> {
        self.ready()?;
        let rows = stock_price::table
            .filter(stock_price::ticker.eq(ticker))
            .order(stock_price::date.asc())
            .select(PriceObservation::as_select())
            .load(&mut self.conn)?;
        Ok(rows)
    }

    /// Number of stored rows.
    pub fn count(&mut self) -> StoreResult<i64> {
        self.ready()?;
        let n: i64 = stock_price::table.count().get_result(&mut self.conn)?;
        Ok(n)
    }
}
