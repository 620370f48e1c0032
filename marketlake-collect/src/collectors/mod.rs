//! Collectors: fetch a source, parse it, upsert the rows.
//!
//! Every collector walks a list of items (pages, coin ids, one CSV, tickers)
//! through [`drive`], which reports progress, paces live calls and tallies the
//! [`CollectSummary`]. One failed item never stops its siblings.

pub mod coin_prices;
pub mod coins;
pub mod oil;
pub mod stocks;

use std::path::{Path, PathBuf};

use marketlake_core::fetch::RateLimitedClient;
use marketlake_core::store::IntoRow;
use marketlake_core::MarketStore;
use tracing::{info, warn};

use crate::archive::RawArchive;
use crate::error::CollectError;
use crate::progress::{CollectProgress, CollectSummary, Collector, ItemOutcome};
use crate::sources::Parsed;

pub use coin_prices::collect_coin_prices;
pub use coins::collect_coins;
pub use oil::collect_oil;
pub use stocks::collect_stocks;

/// What every collector needs: where to write, how to fetch, whom to tell.
#[derive(Clone, Copy)]
pub struct CollectContext<'a> {
    pub store: &'a MarketStore,
    pub client: &'a RateLimitedClient,
    pub progress: &'a dyn CollectProgress,
}

/// Where the CoinGecko collectors get their payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RawSource {
    /// Call the API, optionally saving every payload to an archive file.
    #[default]
    Live,
    LiveArchived(PathBuf),
    /// Load payloads from an archive written by an earlier live run.
    Replay(PathBuf),
}

impl RawSource {
    fn archive_to(&self) -> Option<&Path> {
        match self {
            RawSource::LiveArchived(path) => Some(path),
            _ => None,
        }
    }
}

/// Run `run` over `items`, pacing between them when `pacer` is given.
pub(crate) fn drive<I>(
    collector: Collector,
    items: &[I],
    label: impl Fn(&I) -> String,
    progress: &dyn CollectProgress,
    pacer: Option<&RateLimitedClient>,
    mut run: impl FnMut(&I) -> Result<ItemOutcome, CollectError>,
) -> CollectSummary {
    let total = items.len();
    let mut summary = CollectSummary::new(collector);
    summary.total = total;

    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            if let Some(client) = pacer {
                client.pace();
            }
        }
        let name = label(item);
        progress.on_start(collector, &name, i, total);
        let result = run(item);
        progress.on_complete(collector, &name, i, total, &result);
        summary.record(name, result);
    }
    summary
}

/// Upsert parsed rows, logging each record that was dropped on the way.
pub(crate) fn store_parsed<R: IntoRow>(
    store: &MarketStore,
    collector: Collector,
    item: &str,
    parsed: Parsed<R>,
) -> ItemOutcome {
    for reason in &parsed.skipped {
        warn!(%collector, item, %reason, "record skipped");
    }
    let batch = store.upsert_batch(&parsed.rows);
    ItemOutcome {
        written: batch.written,
        skipped: parsed.skipped.len() + batch.rejected.len(),
    }
}

/// Save the payloads of a live run. A write failure is counted as one more
/// failed item so the run does not look clean.
pub(crate) fn save_archive(summary: &mut CollectSummary, archive: &RawArchive, path: Option<&Path>) {
    let Some(path) = path else { return };
    summary.total += 1;
    let item = format!("archive {}", path.display());
    match archive.write(path) {
        Ok(()) => {
            info!(path = %path.display(), items = archive.items.len(), "raw payloads archived");
            summary.record(item, Ok(ItemOutcome::default()));
        }
        Err(e) => summary.record(item, Err(e)),
    }
}

/// Load an archive for replay, or produce the summary of a run that could
/// not start.
pub(crate) fn load_archive(
    collector: Collector,
    path: &Path,
    source: &str,
) -> Result<RawArchive, CollectSummary> {
    RawArchive::read(path, source)
        .map_err(|e| CollectSummary::aborted(collector, path.display().to_string(), e))
}
