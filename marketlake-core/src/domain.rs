//! Row types for the four market tables and the parse error shared by every
//! source adapter.
//!
//! Dates are carried as `NaiveDate` in memory and stored as ISO `YYYY-MM-DD`
//! text so that SQL range filters can compare them lexically.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical storage format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Canonical storage format for point-in-time timestamps (UTC).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A payload or row that could not be turned into a valid record.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("invalid value for '{field}': {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("negative value for '{field}': {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Format a date in the canonical storage format.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a canonical `YYYY-MM-DD` date.
pub fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| ParseError::InvalidValue {
        field,
        value: raw.to_string(),
    })
}

/// Format a timestamp in the canonical storage format.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Round to six decimal places, the precision every price is stored at.
pub fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Reject NaN, infinities and negative values for a price-like field.
pub fn non_negative(field: &'static str, value: f64) -> Result<f64, ParseError> {
    if !value.is_finite() {
        return Err(ParseError::InvalidValue {
            field,
            value: value.to_string(),
        });
    }
    if value < 0.0 {
        return Err(ParseError::Negative { field, value });
    }
    Ok(value)
}

/// Same as [`non_negative`] for optional fields; `None` passes through.
pub fn non_negative_opt(field: &'static str, value: Option<f64>) -> Result<Option<f64>, ParseError> {
    value.map(|v| non_negative(field, v)).transpose()
}

/// One row per coin, replaced wholesale on every snapshot run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinSnapshot {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<i64>,
    pub total_volume: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub ath: Option<f64>,
    pub atl: Option<f64>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Daily USD price of one coin, keyed by (coin id, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinDailyPrice {
    pub coin_id: String,
    pub date: NaiveDate,
    pub price_usd: f64,
}

/// Daily WTI crude price per barrel, keyed by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OilDailyPrice {
    pub date: NaiveDate,
    pub price_usd: f64,
}

/// Daily OHLCV bar for a stock or index, keyed by (ticker, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockDailyBar {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round6_truncates_noise() {
        assert_eq!(round6(1.123_456_789), 1.123_457);
        assert_eq!(round6(42.0), 42.0);
    }

    #[test]
    fn dates_use_iso_format() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        assert_eq!(format_date(d), "2025-01-02");
        assert_eq!(parse_date("date", "2025-01-02").unwrap(), d);
        assert!(matches!(
            parse_date("date", "01/02/2025"),
            Err(ParseError::InvalidValue { field: "date", .. })
        ));
    }

    #[test]
    fn negative_prices_are_rejected() {
        assert_eq!(non_negative("price", 0.0), Ok(0.0));
        assert!(matches!(
            non_negative("price", -37.63),
            Err(ParseError::Negative { field: "price", .. })
        ));
        assert!(non_negative("price", f64::NAN).is_err());
        assert_eq!(non_negative_opt("ath", None), Ok(None));
    }

    #[test]
    fn timestamps_are_utc_with_z_suffix() {
        let ts = DateTime::parse_from_rfc3339("2025-03-01T12:30:45.123+00:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_timestamp(ts), "2025-03-01T12:30:45Z");
    }
}
