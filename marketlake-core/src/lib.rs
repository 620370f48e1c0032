//! Marketlake Core: shared types and services for the market data lake.
//!
//! - Domain rows for coins, coin prices, oil prices and stock bars
//! - TOML pipeline configuration
//! - Rate-limited fetch client with bounded retries and pacing
//! - SQLite store with keyed upserts and ad-hoc queries
//! - Predefined query catalog and dashboard report queries

pub mod catalog;
pub mod config;
pub mod domain;
pub mod fetch;
pub mod report;
pub mod store;

pub use config::{ConfigError, PipelineConfig};
pub use domain::{CoinDailyPrice, CoinSnapshot, OilDailyPrice, ParseError, StockDailyBar};
pub use store::{MarketStore, StoreError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: shared types can cross thread boundaries.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<CoinSnapshot>();
        require_sync::<CoinSnapshot>();
        require_send::<CoinDailyPrice>();
        require_sync::<CoinDailyPrice>();
        require_send::<OilDailyPrice>();
        require_sync::<OilDailyPrice>();
        require_send::<StockDailyBar>();
        require_sync::<StockDailyBar>();

        require_send::<PipelineConfig>();
        require_sync::<PipelineConfig>();
        require_send::<fetch::RateLimitedClient>();
        require_sync::<fetch::RateLimitedClient>();
        require_send::<fetch::FetchError>();
        require_sync::<fetch::FetchError>();

        require_send::<store::QueryResult>();
        require_sync::<store::QueryResult>();
        require_send::<catalog::PredefinedQuery>();
        require_sync::<catalog::PredefinedQuery>();

        // The connection moves between threads but is never shared.
        require_send::<MarketStore>();
    }
}
