//! Marketlake Collect: source adapters and collectors.
//!
//! - CoinGecko markets snapshot and per-coin daily prices
//! - WTI crude daily CSV, with a local fallback file
//! - Yahoo Finance daily OHLCV bars
//! - Raw payload archives for replay without the network

pub mod archive;
pub mod collectors;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod sources;

pub use collectors::{CollectContext, RawSource};
pub use error::CollectError;
pub use pipeline::{run_all, run_collector, CollectOptions};
pub use progress::{CollectProgress, CollectSummary, Collector, ItemOutcome, LogProgress};
