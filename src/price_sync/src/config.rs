//! Sync configuration: parsing, normalization, and loading.
//!
//! The configuration is a small TOML document naming the database file, the
//! provider, the fetch policy and the ordered `[tickers]` table (symbol →
//! display name). Every key is optional; the defaults track Nintendo and
//! Square Enix into `nintendo_stock.db`.
//!
//! Key behaviors:
//! - Ticker symbols and display names are trimmed; a blank display name falls
//!   back to the symbol.
//! - Empty or duplicate symbols (after trimming) are errors, as is an
//!   explicitly empty `[tickers]` table.
//! - `PRICE_SYNC_DATABASE` overrides `database` and `PRICE_SYNC_LOOKBACK_DAYS`
//!   overrides `lookback_days` when set.
//!
//! Entrypoints:
//! - Parse + normalize from a TOML string: [`load_config_str`]
//! - Parse + normalize from a file path: [`load_config_path`]

use std::{collections::HashSet, path::PathBuf, time::Duration};

use anyhow::{Context, bail};
use indexmap::IndexMap;
use market_data_ingestor::providers::DEFAULT_LOOKBACK_DAYS;
use serde::{Deserialize, Serialize};
use shared_utils::env::{get_env_var_opt, parse_env_var};

use crate::{db::migrate::LEGACY_TICKER, ingest::IngestOptions, registry::TickerRegistry};

/// Environment variable overriding [`SyncConfig::database`].
pub const DATABASE_ENV: &str = "PRICE_SYNC_DATABASE";

/// Environment variable overriding [`SyncConfig::lookback_days`].
pub const LOOKBACK_ENV: &str = "PRICE_SYNC_LOOKBACK_DAYS";

/// Which upstream to use (serde snake_case).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// Yahoo Finance v8 chart API.
    #[default]
    Yahoo,
}

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// SQLite file holding the `stock_price` table.
    #[serde(default = "default_database")]
    pub database: PathBuf,
    /// Market data provider.
    #[serde(default)]
    pub provider: ProviderId,
    /// Days of history requested per ticker and run.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    /// Deadline for one ticker's fetch, in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Extra attempts for transient fetch failures.
    #[serde(default)]
    pub max_retries: u32,
    /// First retry delay in milliseconds; doubles per attempt.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Ticker assigned to rows migrated from the single-ticker layout.
    #[serde(default = "default_legacy_ticker")]
    pub legacy_ticker: String,
    /// Maximum age of the in-process snapshot of all rows, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Ordered map of ticker symbol -> display name.
    #[serde(default = "default_tickers")]
    pub tickers: IndexMap<String, String>,
}

fn default_database() -> PathBuf {
    PathBuf::from("nintendo_stock.db")
}

fn default_lookback_days() -> u32 {
    DEFAULT_LOOKBACK_DAYS
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_legacy_ticker() -> String {
    LEGACY_TICKER.to_string()
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_tickers() -> IndexMap<String, String> {
    IndexMap::from([
        ("7974.T".to_string(), "Nintendo".to_string()),
        ("9684.T".to_string(), "Square Enix".to_string()),
    ])
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            provider: ProviderId::default(),
            lookback_days: default_lookback_days(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_retries: 0,
            retry_base_delay_ms: default_retry_base_delay_ms(),
            legacy_ticker: default_legacy_ticker(),
            cache_ttl_secs: default_cache_ttl_secs(),
            tickers: default_tickers(),
        }
    }
}

impl SyncConfig {
    /// The ticker registry in configured order.
    pub fn registry(&self) -> TickerRegistry {
        TickerRegistry::new(self.tickers.iter().map(|(s, n)| (s.clone(), n.clone())))
    }

    /// Fetch policy for [`crate::ingest::run_ingestion`].
    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            lookback_days: self.lookback_days,
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            max_retries: self.max_retries,
            retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }

    /// Snapshot cache max age.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Applies [`DATABASE_ENV`] and [`LOOKBACK_ENV`] when set.
    ///
    /// Errors when the lookback override is not a positive integer.
    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        if let Some(db) = get_env_var_opt(DATABASE_ENV) {
            self.database = PathBuf::from(db);
        }
        if let Some(days) = parse_env_var::<u32>(LOOKBACK_ENV)? {
            if days == 0 {
                bail!("{LOOKBACK_ENV} must be at least 1");
            }
            self.lookback_days = days;
        }
        Ok(())
    }
}

/// Summary of changes performed during normalization.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    /// Number of symbols that changed when trimming.
    pub symbols_trimmed: usize,
    /// Number of blank display names replaced by their symbol.
    pub labels_defaulted: usize,
}

/// Normalize a configuration in place.
///
/// Errors:
/// - Empty ticker table, empty or duplicate symbols after trimming
/// - `lookback_days == 0`, `fetch_timeout_secs == 0`, blank `legacy_ticker`
pub fn normalize_config(cfg: &mut SyncConfig) -> anyhow::Result<NormalizationReport> {
    let mut report = NormalizationReport::default();

    if cfg.lookback_days == 0 {
        bail!("lookback_days must be at least 1");
    }
    if cfg.fetch_timeout_secs == 0 {
        bail!("fetch_timeout_secs must be at least 1");
    }
    cfg.legacy_ticker = cfg.legacy_ticker.trim().to_string();
    if cfg.legacy_ticker.is_empty() {
        bail!("legacy_ticker cannot be empty");
    }
    if cfg.tickers.is_empty() {
        bail!("no tickers configured");
    }

    let mut rebuilt: IndexMap<String, String> = IndexMap::with_capacity(cfg.tickers.len());
    let mut seen = HashSet::new();

    for (raw_symbol, raw_label) in std::mem::take(&mut cfg.tickers) {
        let symbol = raw_symbol.trim().to_string();
        if symbol.is_empty() {
            bail!("ticker symbol cannot be empty after trimming");
        }
        if symbol != raw_symbol {
            report.symbols_trimmed += 1;
        }
        if !seen.insert(symbol.clone()) {
            bail!("duplicate ticker after normalization: {symbol}");
        }

        let mut label = raw_label.trim().to_string();
        if label.is_empty() {
            label = symbol.clone();
            report.labels_defaulted += 1;
        }
        rebuilt.insert(symbol, label);
    }

    cfg.tickers = rebuilt;
    Ok(report)
}

/// Parse and normalize a configuration from a TOML string.
///
/// Environment overrides are not applied here; see [`load_config_path`].
pub fn load_config_str(toml_str: &str) -> anyhow::Result<SyncConfig> {
    let mut cfg: SyncConfig = toml::from_str(toml_str).context("failed to parse config TOML")?;
    let report = normalize_config(&mut cfg).context("normalize_config failed")?;
    tracing::debug!(?report, "normalized config");
    Ok(cfg)
}

/// Read a config file from disk, parse, normalize, and apply environment overrides.
pub fn load_config_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<SyncConfig> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read config file {}", path.as_ref().display()))?;
    let mut cfg = load_config_str(&text)?;
    cfg.apply_env_overrides()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_overrides() {
        unsafe {
            std::env::remove_var(DATABASE_ENV);
            std::env::remove_var(LOOKBACK_ENV);
        }
    }

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = load_config_str("").unwrap();
        assert_eq!(cfg, SyncConfig::default());
        assert_eq!(
            cfg.registry().iter().collect::<Vec<_>>(),
            vec![("7974.T", "Nintendo"), ("9684.T", "Square Enix")]
        );
    }

    #[test]
    fn tickers_keep_file_order_and_are_trimmed() {
        let cfg = load_config_str(
            r#"
            database = "prices.db"
            lookback_days = 10

            [tickers]
            " 9684.T " = "Square Enix"
            "7974.T" = "  "
            "#,
        )
        .unwrap();

        assert_eq!(cfg.database, PathBuf::from("prices.db"));
        assert_eq!(cfg.ingest_options().lookback_days, 10);
        let reg = cfg.registry();
        assert_eq!(reg.symbols().collect::<Vec<_>>(), vec!["9684.T", "7974.T"]);
        assert_eq!(reg.label("7974.T"), "7974.T");
    }

    #[test]
    fn report_counts_changes() {
        let mut cfg = SyncConfig::default();
        cfg.tickers = IndexMap::from([
            (" A ".to_string(), "".to_string()),
            ("B".to_string(), "Bee".to_string()),
        ]);
        let report = normalize_config(&mut cfg).unwrap();
        assert_eq!(
            report,
            NormalizationReport {
                symbols_trimmed: 1,
                labels_defaulted: 1
            }
        );
    }

    #[test]
    fn duplicate_symbol_collision_errors() {
        let mut cfg = SyncConfig::default();
        cfg.tickers.insert(" 7974.T".into(), "Nintendo again".into());
        let err = normalize_config(&mut cfg).unwrap_err();
        assert!(err.to_string().contains("duplicate ticker"));
    }

    #[test]
    fn explicit_empty_table_is_rejected() {
        let err = load_config_str("[tickers]\n").unwrap_err();
        assert!(format!("{err:#}").contains("no tickers configured"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(load_config_str("databse = \"typo.db\"").is_err());
    }

    #[test]
    fn zero_lookback_is_rejected() {
        assert!(load_config_str("lookback_days = 0").is_err());
    }

    #[test]
    #[serial]
    fn env_overrides_replace_file_values() {
        clear_overrides();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sync.toml");
        std::fs::write(&path, "database = \"file.db\"\nlookback_days = 5\n").unwrap();

        unsafe {
            std::env::set_var(DATABASE_ENV, "env.db");
            std::env::set_var(LOOKBACK_ENV, " 20 ");
        }
        let cfg = load_config_path(&path);
        clear_overrides();

        let cfg = cfg.unwrap();
        assert_eq!(cfg.database, PathBuf::from("env.db"));
        assert_eq!(cfg.ingest_options().lookback_days, 20);
    }

    #[test]
    #[serial]
    fn bad_lookback_override_is_rejected() {
        clear_overrides();
        let mut cfg = SyncConfig::default();

        unsafe { std::env::set_var(LOOKBACK_ENV, "a week") };
        let err = cfg.apply_env_overrides().unwrap_err();
        assert!(err.to_string().contains(LOOKBACK_ENV));

        unsafe { std::env::set_var(LOOKBACK_ENV, "0") };
        assert!(cfg.apply_env_overrides().is_err());
        clear_overrides();

        cfg.apply_env_overrides().unwrap();
        assert_eq!(cfg.lookback_days, DEFAULT_LOOKBACK_DAYS);
    }
}
