//! Per-item progress reporting and the run summary.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::CollectError;

/// The four collectors, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Collector {
    Coins,
    CoinPrices,
    Oil,
    Stocks,
}

impl Collector {
    pub const ALL: [Collector; 4] = [
        Collector::Coins,
        Collector::CoinPrices,
        Collector::Oil,
        Collector::Stocks,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collector::Coins => "coins",
            Collector::CoinPrices => "coin-prices",
            Collector::Oil => "oil",
            Collector::Stocks => "stocks",
        }
    }
}

impl fmt::Display for Collector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rows written and skipped for one successful item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    pub written: usize,
    pub skipped: usize,
}

/// Progress callback for collector runs.
pub trait CollectProgress {
    /// Called before an item is fetched or replayed.
    fn on_start(&self, collector: Collector, item: &str, index: usize, total: usize);

    /// Called when an item finishes, successfully or not.
    fn on_complete(
        &self,
        collector: Collector,
        item: &str,
        index: usize,
        total: usize,
        result: &Result<ItemOutcome, CollectError>,
    );

    /// Called once the collector has gone through every item.
    fn on_batch_complete(&self, summary: &CollectSummary);
}

/// Reports progress as tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl CollectProgress for LogProgress {
    fn on_start(&self, collector: Collector, item: &str, index: usize, total: usize) {
        info!(%collector, item, "[{}/{}] fetching", index + 1, total);
    }

    fn on_complete(
        &self,
        collector: Collector,
        item: &str,
        _index: usize,
        _total: usize,
        result: &Result<ItemOutcome, CollectError>,
    ) {
        match result {
            Ok(outcome) => info!(
                %collector,
                item,
                written = outcome.written,
                skipped = outcome.skipped,
                "item stored"
            ),
            Err(e) => warn!(%collector, item, error = %e, "item failed"),
        }
    }

    fn on_batch_complete(&self, summary: &CollectSummary) {
        info!(
            collector = %summary.collector,
            succeeded = summary.succeeded,
            failed = summary.failed,
            total = summary.total,
            rows_written = summary.rows_written,
            rows_skipped = summary.rows_skipped,
            "collection complete"
        );
    }
}

/// Outcome of one collector run.
#[derive(Debug)]
pub struct CollectSummary {
    pub collector: Collector,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub rows_written: usize,
    pub rows_skipped: usize,
    pub errors: Vec<(String, CollectError)>,
}

impl CollectSummary {
    pub fn new(collector: Collector) -> Self {
        Self {
            collector,
            total: 0,
            succeeded: 0,
            failed: 0,
            rows_written: 0,
            rows_skipped: 0,
            errors: Vec::new(),
        }
    }

    /// A run that could not even list its items.
    pub fn aborted(collector: Collector, item: impl Into<String>, error: CollectError) -> Self {
        let mut summary = Self::new(collector);
        summary.total = 1;
        summary.record(item.into(), Err(error));
        summary
    }

    pub fn record(&mut self, item: String, result: Result<ItemOutcome, CollectError>) {
        match result {
            Ok(outcome) => {
                self.succeeded += 1;
                self.rows_written += outcome.written;
                self.rows_skipped += outcome.skipped;
            }
            Err(e) => {
                self.failed += 1;
                self.errors.push((item, e));
            }
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketlake_core::ParseError;

    #[test]
    fn record_tallies_rows_and_failures() {
        let mut summary = CollectSummary::new(Collector::Stocks);
        summary.total = 2;
        summary.record(
            "^GSPC".into(),
            Ok(ItemOutcome {
                written: 10,
                skipped: 1,
            }),
        );
        summary.record(
            "^NSEI".into(),
            Err(CollectError::Parse(ParseError::Malformed("bad".into()))),
        );
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.rows_written, 10);
        assert_eq!(summary.rows_skipped, 1);
        assert!(!summary.all_succeeded());
        assert_eq!(summary.errors[0].0, "^NSEI");
    }

    #[test]
    fn collector_names_match_cli_words() {
        let names: Vec<_> = Collector::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["coins", "coin-prices", "oil", "stocks"]);
    }
}
