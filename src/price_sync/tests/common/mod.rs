#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::{QueryableByName, connection::SimpleConnection, prelude::*, sql_types::Text};
use market_data_ingestor::{
    models::{bar::DailyBar, bar_series::DailySeries},
    providers::{ApiSnafu, DataProvider, ProviderError, StatusSnafu},
};
use price_sync::{db::connection, models::PriceObservation, store::Store};
use tempfile::TempDir;

#[derive(QueryableByName)]
struct JournalMode {
    #[diesel(sql_type = Text)]
    journal_mode: String,
}
#[derive(QueryableByName)]
struct BusyTimeout {
    #[diesel(sql_type = diesel::sql_types::Integer, column_name = "timeout")]
    busy_timeout: i32,
}

pub struct TestDb {
    _dir: TempDir,     // keep alive for the life of the test
    pub path: PathBuf, // <tmpdir>/prices.db
}

impl TestDb {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("prices.db");
        Self { _dir: dir, path }
    }

    pub fn open(&self) -> Store {
        Store::open(&self.path).expect("open store")
    }

    pub fn raw(&self) -> SqliteConnection {
        connection::connect_sqlite(self.path.to_str().expect("utf-8 path")).expect("connect")
    }
}

/// Fresh database with the current schema in place.
pub fn setup_store() -> (TestDb, Store) {
    let db = TestDb::new();
    let mut store = db.open();
    store.ensure_schema().expect("schema");
    (db, store)
}

/// Database holding the single-ticker table, seeded with `(date, close, volume)` rows.
pub fn setup_legacy(rows: &[(&str, Option<f64>, Option<f64>)]) -> TestDb {
    let db = TestDb::new();
    let mut conn = db.raw();
    conn.batch_execute("CREATE TABLE stock_price (Date TEXT PRIMARY KEY, Close REAL, Volume REAL);")
        .expect("legacy table");
    for (date, close, volume) in rows {
        diesel::sql_query("INSERT INTO stock_price (Date, Close, Volume) VALUES (?, ?, ?);")
            .bind::<Text, _>(*date)
            .bind::<diesel::sql_types::Nullable<diesel::sql_types::Double>, _>(*close)
            .bind::<diesel::sql_types::Nullable<diesel::sql_types::Double>, _>(*volume)
            .execute(&mut conn)
            .expect("legacy row");
    }
    db
}

pub fn assert_sqlite_pragmas(conn: &mut SqliteConnection) {
    use diesel::sql_query;

    let jm: JournalMode = sql_query("PRAGMA journal_mode;").get_result(conn).unwrap();
    assert_eq!(jm.journal_mode.to_lowercase(), "wal");

    let bt: BusyTimeout = sql_query("PRAGMA busy_timeout;").get_result(conn).unwrap();
    assert_eq!(bt.busy_timeout, 5000);
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
}

pub fn obs(d: &str, ticker: &str, close: f64, volume: f64) -> PriceObservation {
    PriceObservation::new(date(d), ticker, close, volume)
}

pub fn bars(rows: &[(&str, f64, f64)]) -> Vec<DailyBar> {
    rows.iter()
        .map(|(d, c, v)| DailyBar::new(date(d), *c, *v))
        .collect()
}

/// Canned answer for one symbol.
pub enum Canned {
    Bars(Vec<DailyBar>),
    /// Provider-level error (not transient).
    Api(&'static str),
    /// HTTP status error; 429 and 5xx are transient.
    Status(u16),
    /// Sleeps past any sane deadline.
    Hang,
    /// Fails with HTTP 503 this many times, then returns the bars.
    Flaky(usize, Vec<DailyBar>),
}

/// In-memory provider answering from a table; unknown symbols get an empty series.
#[derive(Default)]
pub struct FakeProvider {
    answers: HashMap<String, Canned>,
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, symbol: &str, answer: Canned) -> Self {
        self.answers.insert(symbol.to_string(), answer);
        self
    }

    pub fn calls(&self, symbol: &str) -> usize {
        self.calls.lock().unwrap().get(symbol).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataProvider for FakeProvider {
    async fn fetch_recent(
        &self,
        symbol: &str,
        _lookback_days: u32,
    ) -> Result<DailySeries, ProviderError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.entry(symbol.to_string()).or_insert(0);
            *n += 1;
            *n
        };

        match self.answers.get(symbol) {
            None => Ok(DailySeries::empty(symbol)),
            Some(Canned::Bars(b)) => Ok(DailySeries::new(symbol, b.clone())),
            Some(Canned::Api(message)) => ApiSnafu { message: *message }.fail(),
            Some(Canned::Status(status)) => StatusSnafu {
                status: *status,
                body: "canned",
            }
            .fail(),
            Some(Canned::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(DailySeries::empty(symbol))
            }
            Some(Canned::Flaky(failures, b)) => {
                if attempt <= *failures {
                    StatusSnafu {
                        status: 503u16,
                        body: "try later",
                    }
                    .fail()
                } else {
                    Ok(DailySeries::new(symbol, b.clone()))
                }
            }
        }
    }
}
