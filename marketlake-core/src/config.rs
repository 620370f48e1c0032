//! Pipeline configuration, stored as TOML.
//!
//! Every section falls back to its defaults when omitted, so an empty file is
//! a valid configuration that reproduces the stock collection run.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fetch::RetryPolicy;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "marketlake.toml";

/// Environment variable overriding `database.path`.
pub const DB_ENV_VAR: &str = "MARKETLAKE_DB";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("market_data.db"),
        }
    }
}

/// Outbound HTTP client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Disable TLS certificate verification. Never on by default.
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("marketlake/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
            accept_invalid_certs: false,
        }
    }
}

/// CoinGecko `/coins/markets` snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinGeckoConfig {
    pub base_url: String,
    pub vs_currency: String,
    pub per_page: u32,
    pub pages: u32,
    pub retry: RetryPolicy,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".into(),
            vs_currency: "usd".into(),
            per_page: 250,
            pages: 5,
            retry: RetryPolicy::coingecko(),
        }
    }
}

/// CoinGecko `/coins/{id}/market_chart` daily history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinPricesConfig {
    pub coin_ids: Vec<String>,
    pub vs_currency: String,
    pub days: u32,
    pub retry: RetryPolicy,
}

impl Default for CoinPricesConfig {
    fn default() -> Self {
        Self {
            coin_ids: [
                "bitcoin",
                "ethereum",
                "tether",
                "binancecoin",
                "solana",
                "ripple",
                "usd-coin",
                "cardano",
                "avalanche-2",
                "dogecoin",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            vs_currency: "usd".into(),
            days: 365,
            retry: RetryPolicy::coingecko(),
        }
    }
}

/// WTI crude daily CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OilConfig {
    pub url: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Local CSV loaded when the remote fetch fails.
    pub fallback_csv: Option<PathBuf>,
    pub retry: RetryPolicy,
}

impl Default for OilConfig {
    fn default() -> Self {
        Self {
            url: "https://raw.githubusercontent.com/datasets/oil-prices/main/data/wti-daily.csv"
                .into(),
            start: ymd(2020, 1, 1),
            end: ymd(2026, 1, 31),
            fallback_csv: None,
            retry: RetryPolicy::single_file(),
        }
    }
}

/// Yahoo Finance v8 chart endpoint. `start` and `end` are both inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StocksConfig {
    pub base_url: String,
    pub tickers: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub retry: RetryPolicy,
}

impl Default for StocksConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query2.finance.yahoo.com/v8/finance/chart".into(),
            tickers: vec!["^GSPC".into(), "^IXIC".into(), "^NSEI".into()],
            start: ymd(2020, 1, 1),
            end: ymd(2025, 9, 30),
            retry: RetryPolicy::yahoo(),
        }
    }
}

/// Series and defaults used by the dashboard views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub bitcoin_id: String,
    pub sp500_ticker: String,
    pub nifty_ticker: String,
    pub top_coins: usize,
    pub explore_default_days: i64,
    pub coin_default_days: i64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bitcoin_id: "bitcoin".into(),
            sp500_ticker: "^GSPC".into(),
            nifty_ticker: "^NSEI".into(),
            top_coins: 3,
            explore_default_days: 365,
            coin_default_days: 90,
        }
    }
}

/// The complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    pub coingecko: CoinGeckoConfig,
    pub coin_prices: CoinPricesConfig,
    pub oil: OilConfig,
    pub stocks: StocksConfig,
    pub dashboard: DashboardConfig,
}

impl PipelineConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the config to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Resolve the effective config.
    ///
    /// An explicit path must exist. Without one, `marketlake.toml` in the
    /// working directory is used if present, else the defaults. Environment
    /// overrides are applied last.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.is_file() {
                    Self::from_file(local)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `MARKETLAKE_DB` from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup, so tests need not touch the
    /// process environment.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(db) = lookup(DB_ENV_VAR).filter(|v| !v.trim().is_empty()) {
            self.database.path = PathBuf::from(db);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.database.path.as_os_str().is_empty() {
            return invalid("database.path must not be empty".into());
        }
        if self.http.timeout_secs == 0 {
            return invalid("http.timeout_secs must be at least 1".into());
        }
        if !(1..=250).contains(&self.coingecko.per_page) {
            return invalid(format!(
                "coingecko.per_page must be within 1..=250, got {}",
                self.coingecko.per_page
            ));
        }
        if self.coingecko.pages == 0 {
            return invalid("coingecko.pages must be at least 1".into());
        }
        if self.coin_prices.days == 0 {
            return invalid("coin_prices.days must be at least 1".into());
        }
        if self.oil.start > self.oil.end {
            return invalid(format!(
                "oil.start ({}) is after oil.end ({})",
                self.oil.start, self.oil.end
            ));
        }
        if self.stocks.start > self.stocks.end {
            return invalid(format!(
                "stocks.start ({}) is after stocks.end ({})",
                self.stocks.start, self.stocks.end
            ));
        }
        if self.dashboard.top_coins == 0 {
            return invalid("dashboard.top_coins must be at least 1".into());
        }
        if self.dashboard.explore_default_days < 1 || self.dashboard.coin_default_days < 1 {
            return invalid("dashboard default ranges must span at least one day".into());
        }

        for (section, policy) in [
            ("coingecko", &self.coingecko.retry),
            ("coin_prices", &self.coin_prices.retry),
            ("oil", &self.oil.retry),
            ("stocks", &self.stocks.retry),
        ] {
            policy
                .validate()
                .map_err(|reason| ConfigError::Invalid(format!("{section}.retry: {reason}")))?;
        }
        Ok(())
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}
