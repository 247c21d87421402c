use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use price_sync::{
    cache,
    config::{SyncConfig, load_config_path, normalize_config},
    ingest::run_ingestion,
    providers::build_provider,
    query,
    store::Store,
};

#[derive(Parser)]
#[command(version, about = "Daily stock price sync")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Args)]
struct ConfigArg {
    /// TOML config file; built-in defaults when omitted.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Fetch recent closes for every configured ticker and store new rows.
    Ingest {
        #[command(flatten)]
        cfg: ConfigArg,
        /// Days of history to request; overrides `lookback_days`.
        #[arg(long)]
        lookback: Option<u32>,
    },
    /// Create or migrate the price table and exit.
    Migrate(ConfigArg),
    /// Print the latest close and change per ticker.
    Latest {
        #[command(flatten)]
        cfg: ConfigArg,
        /// Trailing calendar days to consider.
        #[arg(long, default_value_t = 30)]
        days: u32,
        /// Comma-separated tickers; all configured tickers when omitted.
        #[arg(long, value_delimiter = ',')]
        tickers: Vec<String>,
    },
}

fn load_config(arg: &ConfigArg) -> Result<SyncConfig> {
    match &arg.config {
        Some(path) => load_config_path(path),
        None => {
            let mut cfg = SyncConfig::default();
            normalize_config(&mut cfg)?;
            cfg.apply_env_overrides()?;
            Ok(cfg)
        }
    }
}

fn open_store(cfg: &SyncConfig) -> Result<Store> {
    let store = Store::open(&cfg.database)
        .with_context(|| format!("open database {}", cfg.database.display()))?;
    Ok(store.with_legacy_ticker(cfg.legacy_ticker.clone()))
}

fn fmt_value(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.precision$}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Ingest { cfg: arg, lookback } => {
            let cfg = load_config(&arg)?;
            let mut opts = cfg.ingest_options();
            if let Some(days) = lookback {
                if days == 0 {
                    bail!("--lookback must be at least 1");
                }
                opts.lookback_days = days;
            }

            let mut store = open_store(&cfg)?;
            let provider = build_provider(cfg.provider)?;
            let report = run_ingestion(&cfg.registry(), &mut store, provider.as_ref(), &opts).await?;
            cache::global().invalidate();

            for t in &report.tickers {
                match &t.error {
                    None => println!("{:<10} fetched {:>4}  inserted {:>4}", t.ticker, t.fetched, t.inserted),
                    Some(e) => println!("{:<10} FAILED  {e}", t.ticker),
                }
            }
            println!(
                "{} new rows, {} of {} tickers failed",
                report.total_inserted(),
                report.failed().count(),
                report.tickers.len()
            );
        }
        Cmd::Migrate(arg) => {
            let cfg = load_config(&arg)?;
            let mut store = open_store(&cfg)?;
            let outcome = store.ensure_schema()?;
            println!("{}: {outcome:?}", store.location());
        }
        Cmd::Latest { cfg: arg, days, tickers } => {
            let cfg = load_config(&arg)?;
            let registry = cfg.registry();
            let selected: Vec<String> = if tickers.is_empty() {
                registry.symbols().map(str::to_string).collect()
            } else {
                tickers.iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect()
            };
            if selected.is_empty() {
                bail!("no tickers selected");
            }

            let mut store = open_store(&cfg)?;
            let cache = cache::global();
            cache.set_max_age(cfg.cache_ttl());
            let all = cache.get_or_load(&mut store)?;

            let view = query::latest_view(&all, &selected, &registry, days, 10);
            if view.is_empty() {
                println!("no data for {}", selected.join(", "));
                return Ok(());
            }

            for snap in &view.snapshots {
                println!(
                    "{:<14} {:<10} {} close {:>10}  change {:>9}",
                    snap.label,
                    snap.ticker,
                    snap.latest.date,
                    fmt_value(snap.latest.close, 2),
                    snap.delta.map_or_else(|| "n/a".to_string(), |d| format!("{d:+.2}")),
                );
            }
            println!();
            for row in &view.recent {
                println!(
                    "{}  {:<10} {:>10} {:>14}",
                    row.date,
                    row.ticker,
                    fmt_value(row.close, 2),
                    fmt_value(row.volume, 0),
                );
            }
        }
    }

    Ok(())
}
