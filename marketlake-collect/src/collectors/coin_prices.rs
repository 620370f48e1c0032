use marketlake_core::config::CoinPricesConfig;
use marketlake_core::MarketStore;
use serde_json::Value;

use super::{drive, load_archive, save_archive, store_parsed, CollectContext, RawSource};
use crate::archive::RawArchive;
use crate::error::CollectError;
use crate::progress::{CollectSummary, Collector, ItemOutcome};
use crate::sources::coingecko::{daily_prices, market_chart_params, market_chart_url, MarketChart};

/// Archive tag for `/coins/{id}/market_chart` payloads, keyed by coin id.
pub const MARKET_CHART_SOURCE: &str = "coingecko_market_chart";

/// Load daily closing prices for each configured coin id.
pub fn collect_coin_prices(
    ctx: &CollectContext<'_>,
    base_url: &str,
    config: &CoinPricesConfig,
    raw: &RawSource,
) -> CollectSummary {
    let summary = match raw {
        RawSource::Replay(path) => {
            match load_archive(Collector::CoinPrices, path, MARKET_CHART_SOURCE) {
                Ok(archive) => drive(
                    Collector::CoinPrices,
                    &archive.items,
                    |item| item.key.clone(),
                    ctx.progress,
                    None,
                    |item| store_chart(ctx.store, &item.key, &item.payload),
                ),
                Err(aborted) => aborted,
            }
        }
        live => {
            let client = ctx.client.with_policy(config.retry);
            let params = market_chart_params(config);
            let mut archive = RawArchive::new(MARKET_CHART_SOURCE);

            let mut summary = drive(
                Collector::CoinPrices,
                &config.coin_ids,
                Clone::clone,
                ctx.progress,
                Some(&client),
                |coin_id| {
                    let payload: Value =
                        client.fetch_json(&market_chart_url(base_url, coin_id), &params)?;
                    archive.push(coin_id.clone(), payload.clone());
                    store_chart(ctx.store, coin_id, &payload)
                },
            );
            save_archive(&mut summary, &archive, live.archive_to());
            summary
        }
    };
    ctx.progress.on_batch_complete(&summary);
    summary
}

fn store_chart(store: &MarketStore, coin_id: &str, payload: &Value) -> Result<ItemOutcome, CollectError> {
    let chart = MarketChart::from_value(payload)?;
    let parsed = daily_prices(coin_id, &chart);
    Ok(store_parsed(store, Collector::CoinPrices, coin_id, parsed))
}
