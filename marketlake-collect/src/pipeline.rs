//! Fixed-order collection: snapshot, coin prices, oil, stocks.

use std::path::PathBuf;

use marketlake_core::PipelineConfig;
use tracing::info;

use crate::collectors::{
    collect_coin_prices, collect_coins, collect_oil, collect_stocks, CollectContext, RawSource,
};
use crate::progress::{CollectSummary, Collector};

/// Per-run switches that do not belong in the config file.
#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    /// Payload source for the two CoinGecko collectors.
    pub raw: RawSource,
    /// Local WTI CSV that replaces the download.
    pub csv_file: Option<PathBuf>,
}

/// Run a single collector.
pub fn run_collector(
    ctx: &CollectContext<'_>,
    config: &PipelineConfig,
    collector: Collector,
    options: &CollectOptions,
) -> CollectSummary {
    info!(%collector, "starting collector");
    match collector {
        Collector::Coins => collect_coins(ctx, &config.coingecko, &options.raw),
        Collector::CoinPrices => collect_coin_prices(
            ctx,
            &config.coingecko.base_url,
            &config.coin_prices,
            &options.raw,
        ),
        Collector::Oil => collect_oil(ctx, &config.oil, options.csv_file.as_deref()),
        Collector::Stocks => collect_stocks(ctx, &config.stocks),
    }
}

/// Run every collector live, in order. A failing collector does not stop the
/// ones after it.
pub fn run_all(ctx: &CollectContext<'_>, config: &PipelineConfig) -> Vec<CollectSummary> {
    let options = CollectOptions::default();
    Collector::ALL
        .iter()
        .map(|&collector| run_collector(ctx, config, collector, &options))
        .collect()
}
