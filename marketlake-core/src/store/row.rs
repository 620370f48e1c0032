//! Generic rows going in, result cells coming out.

use std::collections::BTreeMap;
use std::fmt;

use rusqlite::types::{Value, ValueRef};
use serde::Serialize;

use super::table::Table;
use crate::domain::{
    format_date, format_timestamp, CoinDailyPrice, CoinSnapshot, OilDailyPrice, StockDailyBar,
};

/// A column → value map for one upsert.
pub type Row = BTreeMap<String, Value>;

/// Conversion of a typed record into a [`Row`] of a known table.
pub trait IntoRow {
    const TABLE: Table;

    fn to_row(&self) -> Row;
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn real_opt(v: Option<f64>) -> Value {
    v.map_or(Value::Null, Value::Real)
}

impl IntoRow for CoinSnapshot {
    const TABLE: Table = Table::Cryptocurrencies;

    fn to_row(&self) -> Row {
        Row::from([
            ("id".to_string(), text(&self.id)),
            ("symbol".to_string(), text(&self.symbol)),
            ("name".to_string(), text(&self.name)),
            ("current_price".to_string(), real_opt(self.current_price)),
            ("market_cap".to_string(), real_opt(self.market_cap)),
            (
                "market_cap_rank".to_string(),
                self.market_cap_rank.map_or(Value::Null, Value::Integer),
            ),
            ("total_volume".to_string(), real_opt(self.total_volume)),
            ("circulating_supply".to_string(), real_opt(self.circulating_supply)),
            ("total_supply".to_string(), real_opt(self.total_supply)),
            ("ath".to_string(), real_opt(self.ath)),
            ("atl".to_string(), real_opt(self.atl)),
            (
                "last_updated".to_string(),
                self.last_updated
                    .map_or(Value::Null, |ts| Value::Text(format_timestamp(ts))),
            ),
        ])
    }
}

impl IntoRow for CoinDailyPrice {
    const TABLE: Table = Table::CryptoPrices;

    fn to_row(&self) -> Row {
        Row::from([
            ("coin_id".to_string(), text(&self.coin_id)),
            ("date".to_string(), Value::Text(format_date(self.date))),
            ("price_usd".to_string(), Value::Real(self.price_usd)),
        ])
    }
}

impl IntoRow for OilDailyPrice {
    const TABLE: Table = Table::OilPrice;

    fn to_row(&self) -> Row {
        Row::from([
            ("date".to_string(), Value::Text(format_date(self.date))),
            ("price_usd".to_string(), Value::Real(self.price_usd)),
        ])
    }
}

impl IntoRow for StockDailyBar {
    const TABLE: Table = Table::StockPrice;

    fn to_row(&self) -> Row {
        Row::from([
            ("date".to_string(), Value::Text(format_date(self.date))),
            ("open".to_string(), Value::Real(self.open)),
            ("high".to_string(), Value::Real(self.high)),
            ("low".to_string(), Value::Real(self.low)),
            ("close".to_string(), Value::Real(self.close)),
            ("volume".to_string(), Value::Integer(self.volume)),
            ("ticker".to_string(), text(&self.ticker)),
        ])
    }
}

/// One value of a query result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    /// Blobs are never rendered; only their length is kept.
    Blob(usize),
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Integer(i) => Some(*i as f64),
            Cell::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

impl From<ValueRef<'_>> for Cell {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Cell::Null,
            ValueRef::Integer(i) => Cell::Integer(i),
            ValueRef::Real(r) => Cell::Real(r),
            ValueRef::Text(t) => Cell::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Cell::Blob(b.len()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str("NULL"),
            Cell::Integer(i) => write!(f, "{i}"),
            Cell::Real(r) => write!(f, "{r}"),
            Cell::Text(s) => f.write_str(s),
            Cell::Blob(n) => write!(f, "<{n} bytes>"),
        }
    }
}

/// Column names plus rows of a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// First cell of the first row, if any.
    pub fn scalar(&self) -> Option<&Cell> {
        self.rows.first().and_then(|r| r.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn stock_bar_row_has_every_column() {
        let bar = StockDailyBar {
            ticker: "^GSPC".into(),
            date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 100,
        };
        let row = bar.to_row();
        for col in Table::StockPrice.columns() {
            assert!(row.contains_key(*col), "missing {col}");
        }
        assert_eq!(row["date"], Value::Text("2025-01-02".into()));
        assert_eq!(row["ticker"], Value::Text("^GSPC".into()));
    }

    #[test]
    fn optional_snapshot_fields_become_null() {
        let snap = CoinSnapshot {
            id: "x".into(),
            symbol: "x".into(),
            name: "X".into(),
            current_price: None,
            market_cap: None,
            market_cap_rank: None,
            total_volume: None,
            circulating_supply: None,
            total_supply: None,
            ath: None,
            atl: None,
            last_updated: None,
        };
        let row = snap.to_row();
        assert_eq!(row["market_cap_rank"], Value::Null);
        assert_eq!(row["last_updated"], Value::Null);
    }

    #[test]
    fn cell_display_and_numbers() {
        assert_eq!(Cell::Null.to_string(), "NULL");
        assert_eq!(Cell::Real(1.5).to_string(), "1.5");
        assert_eq!(Cell::Integer(3).as_f64(), Some(3.0));
        assert_eq!(Cell::Text("a".into()).as_f64(), None);
        assert_eq!(Cell::Blob(4).to_string(), "<4 bytes>");
    }
}
