//! The four market tables and their DDL.

use std::fmt;

use serde::Serialize;

/// A table of the market database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Table {
    Cryptocurrencies,
    CryptoPrices,
    OilPrice,
    StockPrice,
}

impl Table {
    pub const ALL: [Table; 4] = [
        Table::Cryptocurrencies,
        Table::CryptoPrices,
        Table::OilPrice,
        Table::StockPrice,
    ];

    /// SQL name of the table.
    pub fn name(self) -> &'static str {
        match self {
            Table::Cryptocurrencies => "Cryptocurrencies",
            Table::CryptoPrices => "Crypto_prices",
            Table::OilPrice => "oil_price",
            Table::StockPrice => "stock_price",
        }
    }

    /// Every column, in DDL order.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Table::Cryptocurrencies => &[
                "id",
                "symbol",
                "name",
                "current_price",
                "market_cap",
                "market_cap_rank",
                "total_volume",
                "circulating_supply",
                "total_supply",
                "ath",
                "atl",
                "last_updated",
            ],
            Table::CryptoPrices => &["coin_id", "date", "price_usd"],
            Table::OilPrice => &["date", "price_usd"],
            Table::StockPrice => &["date", "open", "high", "low", "close", "volume", "ticker"],
        }
    }

    /// Columns forming the primary key.
    pub fn key_columns(self) -> &'static [&'static str] {
        match self {
            Table::Cryptocurrencies => &["id"],
            Table::CryptoPrices => &["coin_id", "date"],
            Table::OilPrice => &["date"],
            Table::StockPrice => &["ticker", "date"],
        }
    }

    /// The ISO date column, if the table is a daily series.
    pub fn date_column(self) -> Option<&'static str> {
        match self {
            Table::Cryptocurrencies => None,
            Table::CryptoPrices | Table::OilPrice | Table::StockPrice => Some("date"),
        }
    }

    pub fn has_column(self, column: &str) -> bool {
        self.columns().contains(&column)
    }

    pub fn is_key(self, column: &str) -> bool {
        self.key_columns().contains(&column)
    }

    /// `CREATE TABLE IF NOT EXISTS` statement.
    ///
    /// Prices are REAL; SQLite has no fixed-point type. The foreign key on
    /// `Crypto_prices` is declared but not enforced, since the collectors may
    /// load prices before the snapshot exists.
    pub fn create_sql(self) -> &'static str {
        match self {
            Table::Cryptocurrencies => {
                "CREATE TABLE IF NOT EXISTS Cryptocurrencies (
                    id                 TEXT PRIMARY KEY NOT NULL,
                    symbol             TEXT NOT NULL,
                    name               TEXT NOT NULL,
                    current_price      REAL CHECK (current_price IS NULL OR current_price >= 0),
                    market_cap         REAL,
                    market_cap_rank    INTEGER,
                    total_volume       REAL,
                    circulating_supply REAL,
                    total_supply       REAL,
                    ath                REAL,
                    atl                REAL,
                    last_updated       TEXT
                )"
            }
            Table::CryptoPrices => {
                "CREATE TABLE IF NOT EXISTS Crypto_prices (
                    coin_id   TEXT NOT NULL,
                    date      TEXT NOT NULL,
                    price_usd REAL NOT NULL CHECK (price_usd >= 0),
                    PRIMARY KEY (coin_id, date),
                    FOREIGN KEY (coin_id) REFERENCES Cryptocurrencies(id)
                )"
            }
            Table::OilPrice => {
                "CREATE TABLE IF NOT EXISTS oil_price (
                    date      TEXT PRIMARY KEY NOT NULL,
                    price_usd REAL NOT NULL CHECK (price_usd >= 0)
                )"
            }
            Table::StockPrice => {
                "CREATE TABLE IF NOT EXISTS stock_price (
                    date   TEXT NOT NULL,
                    open   REAL NOT NULL CHECK (open >= 0),
                    high   REAL NOT NULL CHECK (high >= 0),
                    low    REAL NOT NULL CHECK (low >= 0),
                    close  REAL NOT NULL CHECK (close >= 0),
                    volume INTEGER NOT NULL CHECK (volume >= 0),
                    ticker TEXT NOT NULL,
                    PRIMARY KEY (ticker, date)
                )"
            }
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
