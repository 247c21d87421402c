use std::time::Duration;

use price_sync::{
    db::migrate::SchemaOutcome,
    error::StoreError,
    ingest::{IngestError, IngestOptions, TickerError, run_ingestion},
    registry::TickerRegistry,
    store::Store,
};

mod common;
use common::{Canned, FakeProvider, TestDb, bars, obs, setup_legacy, setup_store};

fn registry(symbols: &[&str]) -> TickerRegistry {
    TickerRegistry::new(symbols.iter().map(|s| (*s, *s)))
}

fn fast_opts() -> IngestOptions {
    IngestOptions {
        fetch_timeout: Duration::from_millis(200),
        retry_base_delay: Duration::from_millis(1),
        ..IngestOptions::default()
    }
}

#[tokio::test]
async fn one_failing_ticker_does_not_block_the_others() {
    let (_db, mut store) = setup_store();
    let provider = FakeProvider::new()
        .with("A", Canned::Bars(bars(&[("2024-01-01", 10.0, 100.0), ("2024-01-02", 11.0, 90.0)])))
        .with("B", Canned::Api("No data found, symbol may be delisted"))
        .with("C", Canned::Bars(bars(&[("2024-01-02", 20.0, 5.0)])));

    let report = run_ingestion(&registry(&["A", "B", "C"]), &mut store, &provider, &fast_opts())
        .await
        .unwrap();

    assert_eq!(report.tickers.len(), 3);
    assert_eq!(report.get("A").unwrap().inserted, 2);
    assert_eq!(report.get("C").unwrap().inserted, 1);

    let b = report.get("B").unwrap();
    assert_eq!(b.fetched, 0);
    match &b.error {
        Some(TickerError::Fetch(message)) => assert!(message.contains("delisted")),
        other => panic!("expected fetch error, got {other:?}"),
    }

    assert_eq!(report.failed().count(), 1);
    assert!(!report.is_clean());
    assert_eq!(store.count().unwrap(), 3);
    assert!(store.load_ticker("B").unwrap().is_empty());
}

#[tokio::test]
async fn report_follows_registry_order() {
    let (_db, mut store) = setup_store();
    let provider = FakeProvider::new();
    let report = run_ingestion(&registry(&["Z", "A", "M"]), &mut store, &provider, &fast_opts())
        .await
        .unwrap();

    let order: Vec<_> = report.tickers.iter().map(|t| t.ticker.as_str()).collect();
    assert_eq!(order, vec!["Z", "A", "M"]);
}

#[tokio::test]
async fn empty_fetch_is_not_an_error() {
    let (_db, mut store) = setup_store();
    let provider = FakeProvider::new().with("7974.T", Canned::Bars(vec![]));

    let report = run_ingestion(&registry(&["7974.T"]), &mut store, &provider, &fast_opts())
        .await
        .unwrap();

    let t = report.get("7974.T").unwrap();
    assert!(t.is_ok());
    assert_eq!((t.fetched, t.inserted), (0, 0));
    assert!(report.is_clean());
}

#[tokio::test]
async fn rerunning_inserts_nothing_new() {
    let (_db, mut store) = setup_store();
    let provider = FakeProvider::new()
        .with("7974.T", Canned::Bars(bars(&[("2024-01-04", 7400.0, 1.0), ("2024-01-05", 7500.0, 2.0)])));
    let reg = registry(&["7974.T"]);

    let first = run_ingestion(&reg, &mut store, &provider, &fast_opts()).await.unwrap();
    assert_eq!(first.total_inserted(), 2);
    assert_eq!(first.schema, Some(SchemaOutcome::AlreadyCurrent));

    let second = run_ingestion(&reg, &mut store, &provider, &fast_opts()).await.unwrap();
    let t = second.get("7974.T").unwrap();
    assert_eq!((t.fetched, t.inserted), (2, 0));
    assert_eq!(store.count().unwrap(), 2);
}

#[tokio::test]
async fn hanging_provider_times_out_per_ticker() {
    let (_db, mut store) = setup_store();
    let provider = FakeProvider::new()
        .with("SLOW", Canned::Hang)
        .with("FAST", Canned::Bars(bars(&[("2024-01-02", 1.0, 1.0)])));
    let opts = IngestOptions {
        fetch_timeout: Duration::from_millis(50),
        ..fast_opts()
    };

    let report = run_ingestion(&registry(&["SLOW", "FAST"]), &mut store, &provider, &opts)
        .await
        .unwrap();

    match &report.get("SLOW").unwrap().error {
        Some(TickerError::Fetch(message)) => assert!(message.contains("timed out")),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(report.get("FAST").unwrap().inserted, 1);
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let (_db, mut store) = setup_store();
    let provider = FakeProvider::new()
        .with("FLAKY", Canned::Flaky(2, bars(&[("2024-01-03", 5.0, 5.0)])));
    let opts = IngestOptions {
        max_retries: 2,
        ..fast_opts()
    };

    let report = run_ingestion(&registry(&["FLAKY"]), &mut store, &provider, &opts)
        .await
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(report.get("FLAKY").unwrap().inserted, 1);
    assert_eq!(provider.calls("FLAKY"), 3);
}

#[tokio::test]
async fn retries_are_off_by_default_and_skip_permanent_errors() {
    let (_db, mut store) = setup_store();
    let provider = FakeProvider::new()
        .with("FLAKY", Canned::Flaky(1, bars(&[("2024-01-03", 5.0, 5.0)])))
        .with("GONE", Canned::Status(404))
        .with("BAD", Canned::Api("Not Found"));

    let report = run_ingestion(
        &registry(&["FLAKY", "GONE"]),
        &mut store,
        &provider,
        &fast_opts(),
    )
    .await
    .unwrap();
    assert_eq!(report.failed().count(), 2);
    assert_eq!(provider.calls("FLAKY"), 1);

    let opts = IngestOptions {
        max_retries: 3,
        ..fast_opts()
    };
    run_ingestion(&registry(&["GONE", "BAD"]), &mut store, &provider, &opts)
        .await
        .unwrap();
    assert_eq!(provider.calls("GONE"), 2);
    assert_eq!(provider.calls("BAD"), 1);
}

#[tokio::test]
async fn rejected_batch_is_reported_against_its_ticker() {
    let (_db, mut store) = setup_store();
    let provider = FakeProvider::new()
        .with("NEG", Canned::Bars(bars(&[("2024-01-02", 1.0, 1.0), ("2024-01-03", 1.0, -3.0)])))
        .with("OK", Canned::Bars(bars(&[("2024-01-02", 2.0, 2.0)])));

    let report = run_ingestion(&registry(&["NEG", "OK"]), &mut store, &provider, &fast_opts())
        .await
        .unwrap();

    let neg = report.get("NEG").unwrap();
    assert_eq!(neg.fetched, 2);
    assert_eq!(neg.inserted, 0);
    assert!(matches!(neg.error, Some(TickerError::Write(_))));
    assert!(store.load_ticker("NEG").unwrap().is_empty());
    assert_eq!(report.get("OK").unwrap().inserted, 1);
}

#[tokio::test]
async fn run_migrates_legacy_store_first() {
    let db = setup_legacy(&[("2024-01-01", Some(100.0), Some(1000.0))]);
    let mut store = db.open();
    let provider = FakeProvider::new()
        .with("7974.T", Canned::Bars(bars(&[("2024-01-01", 555.0, 1.0), ("2024-01-02", 101.0, 800.0)])));

    let report = run_ingestion(&registry(&["7974.T"]), &mut store, &provider, &fast_opts())
        .await
        .unwrap();

    assert_eq!(report.schema, Some(SchemaOutcome::Migrated { rows: 1 }));
    assert_eq!(report.get("7974.T").unwrap().inserted, 1);
    assert_eq!(
        store.load_all().unwrap(),
        vec![
            obs("2024-01-01", "7974.T", 100.0, 1000.0),
            obs("2024-01-02", "7974.T", 101.0, 800.0),
        ]
    );
}

#[tokio::test]
async fn legacy_nulls_do_not_block_ingestion() {
    let db = setup_legacy(&[
        ("2024-01-01", Some(100.0), Some(1000.0)),
        ("2024-01-02", None, Some(0.0)),
    ]);
    let mut store = db.open();
    let provider = FakeProvider::new()
        .with("7974.T", Canned::Bars(bars(&[("2024-01-03", 103.0, 900.0)])));
    let reg = registry(&["7974.T"]);

    for expected in [SchemaOutcome::Migrated { rows: 2 }, SchemaOutcome::AlreadyCurrent] {
        let report = run_ingestion(&reg, &mut store, &provider, &fast_opts())
            .await
            .unwrap();
        assert_eq!(report.schema, Some(expected));
        assert!(report.is_clean());
    }

    assert_eq!(provider.calls("7974.T"), 2);
    assert_eq!(store.count().unwrap(), 3);
}

#[tokio::test]
async fn failed_migration_aborts_before_fetching() {
    let db = setup_legacy(&[("not a date", Some(100.0), Some(1.0))]);
    let mut store: Store = db.open();
    let provider = FakeProvider::new();

    let err = run_ingestion(&registry(&["7974.T"]), &mut store, &provider, &fast_opts())
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Store(StoreError::MigrationFailed(_))));
    assert_eq!(provider.total_calls(), 0);
}

#[tokio::test]
async fn empty_registry_yields_empty_report() {
    let db = TestDb::new();
    let mut store = db.open();
    let provider = FakeProvider::new();

    let report = run_ingestion(&TickerRegistry::default(), &mut store, &provider, &fast_opts())
        .await
        .unwrap();
    assert!(report.tickers.is_empty());
    assert_eq!(report.schema, Some(SchemaOutcome::Created));
}
