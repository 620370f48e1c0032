//! Fixed catalog of predefined report queries.
//!
//! Queries run verbatim. Only "All stock prices for a given ticker" takes a
//! parameter, bound as `?` from the ticker the caller selects.

use std::fmt;

use rusqlite::types::Value;
use serde::Serialize;

use crate::store::{MarketStore, QueryResult, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum QueryGroup {
    Cryptocurrencies,
    CryptoPrices,
    Oil,
    Stock,
    Join,
}

impl QueryGroup {
    pub const ALL: [QueryGroup; 5] = [
        QueryGroup::Cryptocurrencies,
        QueryGroup::CryptoPrices,
        QueryGroup::Oil,
        QueryGroup::Stock,
        QueryGroup::Join,
    ];

    /// 1-based position used as the label prefix.
    pub fn ordinal(self) -> usize {
        match self {
            QueryGroup::Cryptocurrencies => 1,
            QueryGroup::CryptoPrices => 2,
            QueryGroup::Oil => 3,
            QueryGroup::Stock => 4,
            QueryGroup::Join => 5,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            QueryGroup::Cryptocurrencies => "Cryptocurrencies",
            QueryGroup::CryptoPrices => "Crypto_prices",
            QueryGroup::Oil => "Oil",
            QueryGroup::Stock => "Stock",
            QueryGroup::Join => "Join",
        }
    }
}

impl fmt::Display for QueryGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Parameters a query binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueryParam {
    None,
    Ticker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PredefinedQuery {
    pub group: QueryGroup,
    pub name: &'static str,
    pub sql: &'static str,
    pub param: QueryParam,
}

impl PredefinedQuery {
    /// Display label, e.g. `3. Oil: Average oil price per year`.
    pub fn label(&self) -> String {
        format!("{}. {}: {}", self.group.ordinal(), self.group, self.name)
    }

    pub fn takes_ticker(&self) -> bool {
        self.param == QueryParam::Ticker
    }

    /// Execute against `store`. `ticker` is bound only when the query takes one.
    pub fn run(&self, store: &MarketStore, ticker: &str) -> Result<QueryResult, StoreError> {
        match self.param {
            QueryParam::None => store.run_query(self.sql),
            QueryParam::Ticker => {
                store.run_query_with(self.sql, &[Value::Text(ticker.to_string())])
            }
        }
    }
}

const fn q(group: QueryGroup, name: &'static str, sql: &'static str) -> PredefinedQuery {
    PredefinedQuery {
        group,
        name,
        sql,
        param: QueryParam::None,
    }
}

use QueryGroup::{CryptoPrices, Cryptocurrencies, Join, Oil, Stock};

static CATALOG: [PredefinedQuery; 30] = [
    // Cryptocurrencies
    q(
        Cryptocurrencies,
        "Top 3 cryptocurrencies by market cap",
        "SELECT id, symbol, name, current_price, market_cap, market_cap_rank
         FROM Cryptocurrencies
         WHERE market_cap_rank IS NOT NULL
         ORDER BY market_cap_rank ASC
         LIMIT 3",
    ),
    q(
        Cryptocurrencies,
        "Coins where circulating supply > 90% of total supply",
        "SELECT id, symbol, name, circulating_supply, total_supply,
                ROUND(100.0 * circulating_supply / NULLIF(total_supply, 0), 2) AS pct_circulating
         FROM Cryptocurrencies
         WHERE total_supply IS NOT NULL AND total_supply > 0
           AND (1.0 * circulating_supply / total_supply) >= 0.9
         ORDER BY pct_circulating DESC, id",
    ),
    q(
        Cryptocurrencies,
        "Coins within 10% of all-time high (ATH)",
        "SELECT id, symbol, name, current_price, ath,
                ROUND(100.0 * current_price / NULLIF(ath, 0), 2) AS pct_of_ath
         FROM Cryptocurrencies
         WHERE ath IS NOT NULL AND ath > 0 AND current_price IS NOT NULL
           AND (1.0 * current_price / ath) >= 0.9
         ORDER BY pct_of_ath DESC, id",
    ),
    q(
        Cryptocurrencies,
        "Average market cap rank of coins with volume > $1B",
        "SELECT ROUND(AVG(market_cap_rank), 2) AS avg_market_cap_rank
         FROM Cryptocurrencies
         WHERE total_volume >= 1e9 AND market_cap_rank IS NOT NULL",
    ),
    q(
        Cryptocurrencies,
        "Most recently updated coin",
        "SELECT * FROM Cryptocurrencies
         ORDER BY last_updated DESC, id
         LIMIT 1",
    ),
    // Crypto_prices
    q(
        CryptoPrices,
        "Highest daily price of Bitcoin (last 365 days)",
        "SELECT date, price_usd FROM Crypto_prices
         WHERE coin_id = 'bitcoin' AND date >= date('now', '-365 days')
         ORDER BY price_usd DESC, date LIMIT 1",
    ),
    q(
        CryptoPrices,
        "Average daily price of Ethereum (past 1 year)",
        "SELECT ROUND(AVG(price_usd), 2) AS avg_price FROM Crypto_prices
         WHERE coin_id = 'ethereum' AND date >= date('now', '-1 year')",
    ),
    q(
        CryptoPrices,
        "Bitcoin daily price trend in January 2025",
        "SELECT date, price_usd FROM Crypto_prices
         WHERE coin_id = 'bitcoin' AND date >= '2025-01-01' AND date < '2025-02-01'
         ORDER BY date",
    ),
    q(
        CryptoPrices,
        "Coin with highest average price over 1 year",
        "SELECT coin_id, ROUND(AVG(price_usd), 2) AS avg_price
         FROM Crypto_prices
         WHERE date >= date('now', '-1 year')
         GROUP BY coin_id
         ORDER BY avg_price DESC, coin_id LIMIT 1",
    ),
    q(
        CryptoPrices,
        "Bitcoin % change Sep 2024 vs Sep 2025",
        "WITH sep24 AS (
             SELECT AVG(price_usd) AS avg_price FROM Crypto_prices
             WHERE coin_id = 'bitcoin' AND date >= '2024-09-01' AND date < '2024-10-01'
         ),
         sep25 AS (
             SELECT AVG(price_usd) AS avg_price FROM Crypto_prices
             WHERE coin_id = 'bitcoin' AND date >= '2025-09-01' AND date < '2025-10-01'
         )
         SELECT ROUND(100.0 * (sep25.avg_price - sep24.avg_price) / NULLIF(sep24.avg_price, 0), 2) AS pct_change
         FROM sep24, sep25",
    ),
    // Oil
    q(
        Oil,
        "Highest oil price in the last 5 years",
        "SELECT date, price_usd FROM oil_price
         WHERE date >= date('now', '-5 years')
         ORDER BY price_usd DESC, date LIMIT 1",
    ),
    q(
        Oil,
        "Average oil price per year",
        "SELECT strftime('%Y', date) AS year, ROUND(AVG(price_usd), 2) AS avg_price
         FROM oil_price
         GROUP BY year ORDER BY year",
    ),
    q(
        Oil,
        "Oil prices during COVID crash (Mar-Apr 2020)",
        "SELECT date, price_usd FROM oil_price
         WHERE date >= '2020-03-01' AND date < '2020-05-01'
         ORDER BY date",
    ),
    q(
        Oil,
        "Lowest oil price in the last 10 years",
        "SELECT date, price_usd FROM oil_price
         WHERE date >= date('now', '-10 years')
         ORDER BY price_usd ASC, date LIMIT 1",
    ),
    q(
        Oil,
        "Oil price volatility (max - min per year)",
        "SELECT strftime('%Y', date) AS year,
                ROUND(MIN(price_usd), 2) AS min_price,
                ROUND(MAX(price_usd), 2) AS max_price,
                ROUND(MAX(price_usd) - MIN(price_usd), 2) AS volatility
         FROM oil_price
         GROUP BY year ORDER BY year",
    ),
    // Stock
    PredefinedQuery {
        group: Stock,
        name: "All stock prices for a given ticker",
        sql: "SELECT * FROM stock_price WHERE ticker = ? ORDER BY date",
        param: QueryParam::Ticker,
    },
    q(
        Stock,
        "Highest closing price for NASDAQ (^IXIC)",
        "SELECT date, close FROM stock_price
         WHERE ticker = '^IXIC'
         ORDER BY close DESC, date LIMIT 1",
    ),
    q(
        Stock,
        "Top 5 days with highest (high - low) for S&P 500 (^GSPC)",
        "SELECT date, open, high, low, close, (high - low) AS price_range
         FROM stock_price
         WHERE ticker = '^GSPC'
         ORDER BY (high - low) DESC, date LIMIT 5",
    ),
    q(
        Stock,
        "Monthly average closing price per ticker",
        "SELECT ticker, strftime('%Y-%m', date) AS month, ROUND(AVG(close), 2) AS avg_close
         FROM stock_price
         GROUP BY ticker, month
         ORDER BY ticker, month",
    ),
    q(
        Stock,
        "Average trading volume of NSEI in 2024",
        "SELECT ROUND(AVG(volume), 0) AS avg_volume FROM stock_price
         WHERE ticker = '^NSEI' AND date >= '2024-01-01' AND date < '2025-01-01'",
    ),
    // Join
    q(
        Join,
        "Bitcoin vs Oil average price in 2025",
        "SELECT
             (SELECT ROUND(AVG(price_usd), 2) FROM Crypto_prices
              WHERE coin_id = 'bitcoin' AND date >= '2025-01-01') AS btc_avg_2025,
             (SELECT ROUND(AVG(price_usd), 2) FROM oil_price
              WHERE date >= '2025-01-01') AS oil_avg_2025",
    ),
    q(
        Join,
        "Bitcoin vs S&P 500 (same-date comparison)",
        "SELECT b.date, b.price_usd AS btc_price, s.close AS sp500_close
         FROM (SELECT date, price_usd FROM Crypto_prices WHERE coin_id = 'bitcoin') b
         INNER JOIN (SELECT date, close FROM stock_price WHERE ticker = '^GSPC') s ON b.date = s.date
         ORDER BY b.date",
    ),
    q(
        Join,
        "Ethereum vs NASDAQ daily prices for 2025",
        "SELECT e.date, e.price_usd AS eth_price, n.close AS nasdaq_close
         FROM (SELECT date, price_usd FROM Crypto_prices WHERE coin_id = 'ethereum') e
         INNER JOIN (SELECT date, close FROM stock_price WHERE ticker = '^IXIC') n ON e.date = n.date
         WHERE e.date >= '2025-01-01'
         ORDER BY e.date",
    ),
    q(
        Join,
        "Days when oil spiked vs Bitcoin price change",
        "WITH oil_daily AS (
             SELECT date, price_usd AS oil_price,
                    LAG(price_usd) OVER (ORDER BY date) AS prev_oil
             FROM oil_price
         ),
         oil_spike AS (
             SELECT date, oil_price, prev_oil, (oil_price - prev_oil) AS oil_change
             FROM oil_daily WHERE prev_oil IS NOT NULL
             ORDER BY (oil_price - prev_oil) DESC, date LIMIT 20
         ),
         btc AS (SELECT date, price_usd FROM Crypto_prices WHERE coin_id = 'bitcoin')
         SELECT o.date, o.oil_price, o.oil_change, b.price_usd AS btc_price
         FROM oil_spike o LEFT JOIN btc b ON o.date = b.date
         ORDER BY o.oil_change DESC, o.date",
    ),
    q(
        Join,
        "Top 3 coins daily price vs Nifty (^NSEI)",
        "WITH top3 AS (
             SELECT id FROM Cryptocurrencies
             WHERE market_cap_rank IS NOT NULL
             ORDER BY market_cap_rank LIMIT 3
         ),
         nifty AS (SELECT date, close AS nifty_close FROM stock_price WHERE ticker = '^NSEI')
         SELECT p.coin_id, p.date, p.price_usd, n.nifty_close
         FROM Crypto_prices p
         INNER JOIN top3 t ON p.coin_id = t.id
         LEFT JOIN nifty n ON p.date = n.date
         ORDER BY p.coin_id, p.date",
    ),
    q(
        Join,
        "S&P 500 (^GSPC) vs crude oil on same dates",
        "SELECT s.date, s.close AS sp500_close, o.price_usd AS oil_price
         FROM stock_price s
         INNER JOIN oil_price o ON s.date = o.date
         WHERE s.ticker = '^GSPC'
         ORDER BY s.date",
    ),
    q(
        Join,
        "Bitcoin closing price vs crude oil (same date)",
        "SELECT b.date, b.price_usd AS btc_close, o.price_usd AS oil_close
         FROM (SELECT date, price_usd FROM Crypto_prices WHERE coin_id = 'bitcoin') b
         INNER JOIN oil_price o ON b.date = o.date
         ORDER BY b.date",
    ),
    q(
        Join,
        "NASDAQ (^IXIC) vs Ethereum price trends",
        "SELECT e.date, e.price_usd AS eth_price, n.close AS nasdaq_close
         FROM (SELECT date, price_usd FROM Crypto_prices WHERE coin_id = 'ethereum') e
         INNER JOIN (SELECT date, close FROM stock_price WHERE ticker = '^IXIC') n ON e.date = n.date
         ORDER BY e.date",
    ),
    q(
        Join,
        "Top 3 crypto + stock indices for 2025",
        "WITH top3 AS (
             SELECT id FROM Cryptocurrencies
             WHERE market_cap_rank IS NOT NULL
             ORDER BY market_cap_rank LIMIT 3
         ),
         prices AS (
             SELECT coin_id, date, price_usd FROM Crypto_prices
             WHERE date >= '2025-01-01' AND coin_id IN (SELECT id FROM top3)
         ),
         stocks AS (
             SELECT date, ticker, close FROM stock_price
             WHERE date >= '2025-01-01' AND ticker IN ('^GSPC', '^IXIC', '^NSEI')
         )
         SELECT p.date, p.coin_id, p.price_usd, s.ticker, s.close AS stock_close
         FROM prices p
         LEFT JOIN stocks s ON p.date = s.date
         ORDER BY p.date, p.coin_id, s.ticker",
    ),
    q(
        Join,
        "Multi-join: stock, oil, Bitcoin daily",
        "SELECT s.date, s.ticker, s.close AS stock_close, o.price_usd AS oil_price, b.price_usd AS btc_price
         FROM stock_price s
         LEFT JOIN oil_price o ON s.date = o.date
         LEFT JOIN (SELECT date, price_usd FROM Crypto_prices WHERE coin_id = 'bitcoin') b ON s.date = b.date
         WHERE s.ticker = '^GSPC'
         ORDER BY s.date",
    ),
];

/// Every predefined query, grouped and in display order.
pub fn catalog() -> &'static [PredefinedQuery] {
    &CATALOG
}

/// Look a query up by 1-based index, exact name, or exact label.
pub fn find(key: &str) -> Option<&'static PredefinedQuery> {
    let key = key.trim();
    if let Ok(n) = key.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| CATALOG.get(i));
    }
    CATALOG
        .iter()
        .find(|q| q.name.eq_ignore_ascii_case(key) || q.label() == key)
}
