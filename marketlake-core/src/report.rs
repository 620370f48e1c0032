//! Read-side queries behind the dashboard views.
//!
//! Every function takes the store and recomputes from scratch; nothing is
//! cached between calls.

use chrono::{Days, NaiveDate};
use rusqlite::types::Value;
use serde::Serialize;
use thiserror::Error;

use crate::config::DashboardConfig;
use crate::domain::{format_date, parse_date};
use crate::store::{Cell, MarketStore, QueryResult, StoreError};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Start date must be before end date.")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("unexpected value in column '{column}': {value}")]
    Decode { column: String, value: String },
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ReportError> {
        if start > end {
            return Err(ReportError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The `days` days up to and including `today`.
    pub fn last_days(today: NaiveDate, days: u64) -> Self {
        let start = today
            .checked_sub_days(Days::new(days))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    fn bounds(&self) -> [Value; 2] {
        [
            Value::Text(format_date(self.start)),
            Value::Text(format_date(self.end)),
        ]
    }
}

/// Which stored series the dashboard compares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSeries {
    pub bitcoin_id: String,
    pub sp500_ticker: String,
    pub nifty_ticker: String,
}

impl From<&DashboardConfig> for ReportSeries {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            bitcoin_id: config.bitcoin_id.clone(),
            sp500_ticker: config.sp500_ticker.clone(),
            nifty_ticker: config.nifty_ticker.clone(),
        }
    }
}

impl Default for ReportSeries {
    fn default() -> Self {
        Self::from(&DashboardConfig::default())
    }
}

/// Averages over a range, rounded to two decimals. `None` means no data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RangeAverages {
    pub bitcoin: Option<f64>,
    pub oil: Option<f64>,
    pub sp500: Option<f64>,
    pub nifty: Option<f64>,
}

/// One date present in all four series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotRow {
    pub date: NaiveDate,
    pub btc_price: f64,
    pub oil_price: f64,
    pub sp500_close: f64,
    pub nifty_close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinChoice {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub market_cap_rank: i64,
}

impl CoinChoice {
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price_usd: f64,
}

pub fn range_averages(
    store: &MarketStore,
    series: &ReportSeries,
    range: &DateRange,
) -> Result<RangeAverages, ReportError> {
    let [start, end] = range.bounds();

    let coin_avg = |coin_id: &str| {
        average(
            store,
            "SELECT ROUND(AVG(price_usd), 2) FROM Crypto_prices
             WHERE coin_id = ? AND date >= ? AND date <= ?",
            &[Value::Text(coin_id.to_string()), start.clone(), end.clone()],
        )
    };
    let close_avg = |ticker: &str| {
        average(
            store,
            "SELECT ROUND(AVG(close), 2) FROM stock_price
             WHERE ticker = ? AND date >= ? AND date <= ?",
            &[Value::Text(ticker.to_string()), start.clone(), end.clone()],
        )
    };

    Ok(RangeAverages {
        bitcoin: coin_avg(&series.bitcoin_id)?,
        oil: average(
            store,
            "SELECT ROUND(AVG(price_usd), 2) FROM oil_price WHERE date >= ? AND date <= ?",
            &[start.clone(), end.clone()],
        )?,
        sp500: close_avg(&series.sp500_ticker)?,
        nifty: close_avg(&series.nifty_ticker)?,
    })
}

fn average(store: &MarketStore, sql: &str, params: &[Value]) -> Result<Option<f64>, ReportError> {
    let result = store.run_query_with(sql, params)?;
    match result.scalar() {
        None | Some(Cell::Null) => Ok(None),
        Some(cell) => cell
            .as_f64()
            .map(Some)
            .ok_or_else(|| decode_error(&result, 0, cell)),
    }
}

/// Dates present in the bitcoin, oil, S&P 500 and NIFTY series, aligned.
pub fn daily_snapshot(
    store: &MarketStore,
    series: &ReportSeries,
    range: &DateRange,
) -> Result<Vec<SnapshotRow>, ReportError> {
    let [start, end] = range.bounds();
    let result = store.run_query_with(
        "SELECT o.date,
                b.price_usd AS btc_price,
                o.price_usd AS oil_price,
                s.close AS sp500_close,
                n.close AS nifty_close
         FROM oil_price o
         INNER JOIN (SELECT date, price_usd FROM Crypto_prices WHERE coin_id = ?1) b ON o.date = b.date
         INNER JOIN (SELECT date, close FROM stock_price WHERE ticker = ?2) s ON o.date = s.date
         INNER JOIN (SELECT date, close FROM stock_price WHERE ticker = ?3) n ON o.date = n.date
         WHERE o.date >= ?4 AND o.date <= ?5
         ORDER BY o.date",
        &[
            Value::Text(series.bitcoin_id.clone()),
            Value::Text(series.sp500_ticker.clone()),
            Value::Text(series.nifty_ticker.clone()),
            start,
            end,
        ],
    )?;

    result
        .rows
        .iter()
        .map(|row| {
            Ok(SnapshotRow {
                date: date_at(&result, row, 0)?,
                btc_price: f64_at(&result, row, 1)?,
                oil_price: f64_at(&result, row, 2)?,
                sp500_close: f64_at(&result, row, 3)?,
                nifty_close: f64_at(&result, row, 4)?,
            })
        })
        .collect()
}

/// The `limit` best-ranked coins of the latest snapshot.
pub fn top_coins(store: &MarketStore, limit: usize) -> Result<Vec<CoinChoice>, ReportError> {
    let result = store.run_query_with(
        "SELECT id, symbol, name, market_cap_rank
         FROM Cryptocurrencies
         WHERE market_cap_rank IS NOT NULL
         ORDER BY market_cap_rank ASC, id
         LIMIT ?",
        &[Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX))],
    )?;

    result
        .rows
        .iter()
        .map(|row| {
            Ok(CoinChoice {
                id: text_at(&result, row, 0)?,
                symbol: text_at(&result, row, 1)?,
                name: text_at(&result, row, 2)?,
                market_cap_rank: match &row[3] {
                    Cell::Integer(i) => *i,
                    other => return Err(decode_error(&result, 3, other)),
                },
            })
        })
        .collect()
}

/// Daily prices of one coin within the range, oldest first.
pub fn coin_history(
    store: &MarketStore,
    coin_id: &str,
    range: &DateRange,
) -> Result<Vec<PricePoint>, ReportError> {
    let [start, end] = range.bounds();
    let result = store.run_query_with(
        "SELECT date, price_usd FROM Crypto_prices
         WHERE coin_id = ? AND date >= ? AND date <= ?
         ORDER BY date",
        &[Value::Text(coin_id.to_string()), start, end],
    )?;

    result
        .rows
        .iter()
        .map(|row| {
            Ok(PricePoint {
                date: date_at(&result, row, 0)?,
                price_usd: f64_at(&result, row, 1)?,
            })
        })
        .collect()
}

fn decode_error(result: &QueryResult, idx: usize, cell: &Cell) -> ReportError {
    ReportError::Decode {
        column: result.columns.get(idx).cloned().unwrap_or_default(),
        value: cell.to_string(),
    }
}

fn f64_at(result: &QueryResult, row: &[Cell], idx: usize) -> Result<f64, ReportError> {
    row[idx]
        .as_f64()
        .ok_or_else(|| decode_error(result, idx, &row[idx]))
}

fn text_at(result: &QueryResult, row: &[Cell], idx: usize) -> Result<String, ReportError> {
    row[idx]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| decode_error(result, idx, &row[idx]))
}

fn date_at(result: &QueryResult, row: &[Cell], idx: usize) -> Result<NaiveDate, ReportError> {
    let raw = text_at(result, row, idx)?;
    parse_date("date", &raw).map_err(|_| decode_error(result, idx, &row[idx]))
}
