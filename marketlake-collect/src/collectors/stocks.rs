use marketlake_core::config::StocksConfig;

use super::{drive, store_parsed, CollectContext};
use crate::error::CollectError;
use crate::progress::{CollectSummary, Collector};
use crate::sources::yahoo::{chart_params, chart_url, parse_chart, ChartResponse};

/// Load daily OHLCV bars for each configured ticker.
pub fn collect_stocks(ctx: &CollectContext<'_>, config: &StocksConfig) -> CollectSummary {
    let client = ctx.client.with_policy(config.retry);
    let params = chart_params(config.start, config.end);

    let summary = drive(
        Collector::Stocks,
        &config.tickers,
        Clone::clone,
        ctx.progress,
        Some(&client),
        |ticker| {
            let resp: ChartResponse = client.fetch_json(&chart_url(&config.base_url, ticker), &params)?;
            let parsed = parse_chart(ticker, resp, config.start, config.end)?;
            Ok::<_, CollectError>(store_parsed(ctx.store, Collector::Stocks, ticker, parsed))
        },
    );
    ctx.progress.on_batch_complete(&summary);
    summary
}
