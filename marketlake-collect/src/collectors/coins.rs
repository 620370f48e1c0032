use marketlake_core::config::CoinGeckoConfig;
use marketlake_core::MarketStore;
use serde_json::Value;

use super::{drive, load_archive, save_archive, store_parsed, CollectContext, RawSource};
use crate::archive::RawArchive;
use crate::error::CollectError;
use crate::progress::{CollectSummary, Collector, ItemOutcome};
use crate::sources::coingecko::{markets_params, markets_url, parse_markets_page};

/// Archive tag for `/coins/markets` payloads.
pub const MARKETS_SOURCE: &str = "coingecko_markets";

/// Refresh the coin snapshot table from pages `1..=pages` of the markets
/// endpoint, or from a saved archive.
pub fn collect_coins(
    ctx: &CollectContext<'_>,
    config: &CoinGeckoConfig,
    raw: &RawSource,
) -> CollectSummary {
    let summary = match raw {
        RawSource::Replay(path) => match load_archive(Collector::Coins, path, MARKETS_SOURCE) {
            Ok(archive) => drive(
                Collector::Coins,
                &archive.items,
                |item| format!("page {}", item.key),
                ctx.progress,
                None,
                |item| store_page(ctx.store, &item.key, &item.payload),
            ),
            Err(aborted) => aborted,
        },
        live => {
            let client = ctx.client.with_policy(config.retry);
            let url = markets_url(&config.base_url);
            let pages: Vec<u32> = (1..=config.pages).collect();
            let mut archive = RawArchive::new(MARKETS_SOURCE);

            let mut summary = drive(
                Collector::Coins,
                &pages,
                |page| format!("page {page}"),
                ctx.progress,
                Some(&client),
                |&page| {
                    let payload: Value = client.fetch_json(&url, &markets_params(config, page))?;
                    archive.push(page.to_string(), payload.clone());
                    store_page(ctx.store, &page.to_string(), &payload)
                },
            );
            save_archive(&mut summary, &archive, live.archive_to());
            summary
        }
    };
    ctx.progress.on_batch_complete(&summary);
    summary
}

fn store_page(store: &MarketStore, page: &str, payload: &Value) -> Result<ItemOutcome, CollectError> {
    let parsed = parse_markets_page(payload)?;
    Ok(store_parsed(store, Collector::Coins, &format!("page {page}"), parsed))
}
