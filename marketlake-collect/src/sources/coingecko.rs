//! CoinGecko `/coins/markets` and `/coins/{id}/market_chart` payloads.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use marketlake_core::config::{CoinGeckoConfig, CoinPricesConfig};
use marketlake_core::domain::{non_negative, non_negative_opt, round6};
use marketlake_core::{CoinDailyPrice, CoinSnapshot, ParseError};
use serde::Deserialize;
use serde_json::Value;

use super::Parsed;

pub fn markets_url(base_url: &str) -> String {
    format!("{}/coins/markets", base_url.trim_end_matches('/'))
}

pub fn markets_params(config: &CoinGeckoConfig, page: u32) -> Vec<(&'static str, String)> {
    vec![
        ("vs_currency", config.vs_currency.clone()),
        ("order", "market_cap_desc".to_string()),
        ("per_page", config.per_page.to_string()),
        ("page", page.to_string()),
        ("sparkline", "false".to_string()),
    ]
}

pub fn market_chart_url(base_url: &str, coin_id: &str) -> String {
    format!(
        "{}/coins/{}/market_chart",
        base_url.trim_end_matches('/'),
        coin_id
    )
}

pub fn market_chart_params(config: &CoinPricesConfig) -> Vec<(&'static str, String)> {
    vec![
        ("vs_currency", config.vs_currency.clone()),
        ("days", config.days.to_string()),
    ]
}

/// One element of the markets array. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketRecord {
    pub id: Option<String>,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<i64>,
    pub total_volume: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub ath: Option<f64>,
    pub atl: Option<f64>,
    pub last_updated: Option<String>,
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ParseError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ParseError::MissingField { field }),
    }
}

impl TryFrom<MarketRecord> for CoinSnapshot {
    type Error = ParseError;

    fn try_from(rec: MarketRecord) -> Result<Self, Self::Error> {
        let last_updated = match rec.last_updated.as_deref() {
            None => None,
            Some(raw) => Some(
                DateTime::parse_from_rfc3339(raw)
                    .map(|ts| ts.with_timezone(&Utc))
                    .map_err(|_| ParseError::InvalidValue {
                        field: "last_updated",
                        value: raw.to_string(),
                    })?,
            ),
        };

        Ok(CoinSnapshot {
            id: required("id", rec.id)?,
            symbol: required("symbol", rec.symbol)?,
            name: required("name", rec.name)?,
            current_price: non_negative_opt("current_price", rec.current_price)?,
            market_cap: rec.market_cap,
            market_cap_rank: rec.market_cap_rank,
            total_volume: rec.total_volume,
            circulating_supply: rec.circulating_supply,
            total_supply: rec.total_supply,
            ath: non_negative_opt("ath", rec.ath)?,
            atl: non_negative_opt("atl", rec.atl)?,
            last_updated,
        })
    }
}

/// Parse one markets page. Each element is validated on its own so a bad
/// record only costs that record.
pub fn parse_markets_page(payload: &Value) -> Result<Parsed<CoinSnapshot>, ParseError> {
    let records = payload
        .as_array()
        .ok_or_else(|| ParseError::Malformed("markets payload is not an array".into()))?;

    let mut parsed = Parsed::default();
    for record in records {
        parsed.push(
            MarketRecord::deserialize(record)
                .map_err(|e| ParseError::Malformed(e.to_string()))
                .and_then(CoinSnapshot::try_from),
        );
    }
    Ok(parsed)
}

/// Body of `/coins/{id}/market_chart`. Only `prices` is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketChart {
    #[serde(default)]
    pub prices: Vec<[Option<f64>; 2]>,
}

impl MarketChart {
    pub fn from_value(payload: &Value) -> Result<Self, ParseError> {
        Self::deserialize(payload).map_err(|e| ParseError::Malformed(e.to_string()))
    }
}

/// Collapse `[timestamp_ms, price]` points to one row per UTC calendar day,
/// keeping the latest point of each day. Prices are rounded to 6 decimals.
pub fn daily_prices(coin_id: &str, chart: &MarketChart) -> Parsed<CoinDailyPrice> {
    let mut parsed = Parsed::default();
    let mut by_day: BTreeMap<NaiveDate, (i64, f64)> = BTreeMap::new();

    for point in &chart.prices {
        let [Some(ts), Some(price)] = *point else {
            parsed.skipped.push(ParseError::MissingField { field: "prices" });
            continue;
        };
        let ts_ms = ts as i64;
        let Some(day) = DateTime::from_timestamp_millis(ts_ms).map(|dt| dt.date_naive()) else {
            parsed.skipped.push(ParseError::InvalidValue {
                field: "timestamp",
                value: ts.to_string(),
            });
            continue;
        };
        let price = match non_negative("price_usd", price) {
            Ok(p) => p,
            Err(e) => {
                parsed.skipped.push(e);
                continue;
            }
        };
        match by_day.get(&day) {
            Some((seen, _)) if *seen > ts_ms => {}
            _ => {
                by_day.insert(day, (ts_ms, price));
            }
        }
    }

    parsed.rows = by_day
        .into_iter()
        .map(|(date, (_, price))| CoinDailyPrice {
            coin_id: coin_id.to_string(),
            date,
            price_usd: round6(price),
        })
        .collect();
    parsed
}
