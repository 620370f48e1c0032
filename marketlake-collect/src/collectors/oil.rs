use std::path::Path;

use marketlake_core::config::OilConfig;
use tracing::warn;

use super::{drive, store_parsed, CollectContext};
use crate::error::CollectError;
use crate::progress::{CollectSummary, Collector, ItemOutcome};
use crate::sources::wti::parse_wti_csv;

/// Load the WTI daily series.
///
/// `csv_file` forces a local file. Otherwise the configured URL is fetched
/// and, if that fails, `fallback_csv` is read when one is configured.
pub fn collect_oil(
    ctx: &CollectContext<'_>,
    config: &OilConfig,
    csv_file: Option<&Path>,
) -> CollectSummary {
    let summary = drive(
        Collector::Oil,
        &["wti"],
        |item| item.to_string(),
        ctx.progress,
        None,
        |&item| {
            let text = load_csv(ctx, config, csv_file)?;
            let parsed = parse_wti_csv(&text, config.start, config.end)?;
            Ok::<ItemOutcome, CollectError>(store_parsed(ctx.store, Collector::Oil, item, parsed))
        },
    );
    ctx.progress.on_batch_complete(&summary);
    summary
}

fn load_csv(
    ctx: &CollectContext<'_>,
    config: &OilConfig,
    csv_file: Option<&Path>,
) -> Result<String, CollectError> {
    if let Some(path) = csv_file {
        return read_file(path);
    }
    let client = ctx.client.with_policy(config.retry);
    match client.fetch(&config.url, &[]) {
        Ok(resp) => Ok(resp.body),
        Err(e) => match &config.fallback_csv {
            Some(path) => {
                warn!(url = %config.url, error = %e, fallback = %path.display(), "WTI download failed, using local CSV");
                read_file(path)
            }
            None => Err(e.into()),
        },
    }
}

fn read_file(path: &Path) -> Result<String, CollectError> {
    std::fs::read_to_string(path).map_err(|source| CollectError::Io {
        path: path.to_path_buf(),
        source,
    })
}
