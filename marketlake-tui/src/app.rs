//! Application state: single-owner, main-thread only.
//!
//! Every view recomputes from the database when it is refreshed; nothing
//! read from the store outlives the next interaction.

use std::collections::VecDeque;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use marketlake_core::catalog::{self, PredefinedQuery};
use marketlake_core::config::DashboardConfig;
use marketlake_core::report::{
    self, CoinChoice, DateRange, PricePoint, RangeAverages, ReportSeries, SnapshotRow,
};
use marketlake_core::store::QueryResult;
use marketlake_core::MarketStore;

const MAX_ERRORS: usize = 50;

/// Which view is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Panel {
    Explore,
    Queries,
    Coin,
    Help,
}

impl Panel {
    pub const ALL: [Panel; 4] = [Panel::Explore, Panel::Queries, Panel::Coin, Panel::Help];

    pub fn index(self) -> usize {
        match self {
            Panel::Explore => 0,
            Panel::Queries => 1,
            Panel::Coin => 2,
            Panel::Help => 3,
        }
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Panel::Explore => "Explore",
            Panel::Queries => "Queries",
            Panel::Coin => "Coin",
            Panel::Help => "Help",
        }
    }

    pub fn next(self) -> Panel {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Panel {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Status message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// Error category for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Database,
    Input,
}

impl ErrorCategory {
    pub fn label(self) -> &'static str {
        match self {
            ErrorCategory::Database => "DB",
            ErrorCategory::Input => "INPUT",
        }
    }
}

/// An entry of the error history overlay.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub timestamp: NaiveDateTime,
    pub category: ErrorCategory,
    pub message: String,
    pub context: String,
}

/// A date the user can edit through the input overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    ExploreStart,
    ExploreEnd,
    CoinStart,
    CoinEnd,
}

impl DateField {
    pub fn label(self) -> &'static str {
        match self {
            DateField::ExploreStart => "Explore start date",
            DateField::ExploreEnd => "Explore end date",
            DateField::CoinStart => "Coin start date",
            DateField::CoinEnd => "Coin end date",
        }
    }
}

/// Which overlay (if any) is shown on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    None,
    DateInput { field: DateField, buffer: String },
    ErrorHistory,
}

/// Explore view: averages and the aligned daily snapshot over a date range.
#[derive(Debug, Clone)]
pub struct ExploreState {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub averages: Option<RangeAverages>,
    pub snapshot: Vec<SnapshotRow>,
    pub warning: Option<String>,
    pub scroll: usize,
}

impl ExploreState {
    fn new(range: DateRange) -> Self {
        Self {
            start: range.start,
            end: range.end,
            averages: None,
            snapshot: Vec::new(),
            warning: None,
            scroll: 0,
        }
    }
}

/// Query runner view.
#[derive(Debug, Clone)]
pub struct QueriesState {
    pub cursor: usize,
    pub tickers: Vec<String>,
    pub ticker_idx: usize,
    pub result: Option<QueryResult>,
    pub error: Option<String>,
    /// Catalog index of the query whose output is shown.
    pub last_run: Option<usize>,
    pub scroll: usize,
}

impl QueriesState {
    fn new(tickers: Vec<String>) -> Self {
        Self {
            cursor: 0,
            tickers,
            ticker_idx: 0,
            result: None,
            error: None,
            last_run: None,
            scroll: 0,
        }
    }

    pub fn selected(&self) -> Option<&'static PredefinedQuery> {
        catalog::catalog().get(self.cursor)
    }

    pub fn ticker(&self) -> Option<&str> {
        self.tickers.get(self.ticker_idx).map(String::as_str)
    }

    pub fn cycle_ticker(&mut self) {
        if !self.tickers.is_empty() {
            self.ticker_idx = (self.ticker_idx + 1) % self.tickers.len();
        }
    }
}

/// Coin detail view.
#[derive(Debug, Clone)]
pub struct CoinState {
    pub coins: Vec<CoinChoice>,
    pub selected: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub history: Vec<PricePoint>,
    pub warning: Option<String>,
    pub scroll: usize,
}

impl CoinState {
    fn new(range: DateRange) -> Self {
        Self {
            coins: Vec::new(),
            selected: 0,
            start: range.start,
            end: range.end,
            history: Vec::new(),
            warning: None,
            scroll: 0,
        }
    }

    pub fn selected_coin(&self) -> Option<&CoinChoice> {
        self.coins.get(self.selected)
    }
}

/// Top-level application state.
pub struct AppState {
    pub store: MarketStore,
    pub series: ReportSeries,
    pub dashboard: DashboardConfig,
    pub today: NaiveDate,

    // Navigation
    pub active_panel: Panel,
    pub running: bool,

    // Views
    pub explore: ExploreState,
    pub queries: QueriesState,
    pub coin: CoinState,

    // Cross-cutting
    pub status_message: Option<(String, StatusLevel)>,
    pub error_history: VecDeque<ErrorRecord>,
    pub error_scroll: usize,
    pub overlay: Overlay,
}

fn days(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

impl AppState {
    pub fn new(
        store: MarketStore,
        dashboard: DashboardConfig,
        tickers: Vec<String>,
        today: NaiveDate,
    ) -> Self {
        let explore_range = DateRange::last_days(today, days(dashboard.explore_default_days));
        let coin_range = DateRange::last_days(today, days(dashboard.coin_default_days));
        Self {
            store,
            series: ReportSeries::from(&dashboard),
            dashboard,
            today,
            active_panel: Panel::Explore,
            running: true,
            explore: ExploreState::new(explore_range),
            queries: QueriesState::new(tickers),
            coin: CoinState::new(coin_range),
            status_message: None,
            error_history: VecDeque::with_capacity(MAX_ERRORS),
            error_scroll: 0,
            overlay: Overlay::None,
        }
    }

    pub fn switch_panel(&mut self, panel: Panel) {
        self.active_panel = panel;
        self.refresh_active();
    }

    /// Recompute whatever the active view shows.
    pub fn refresh_active(&mut self) {
        match self.active_panel {
            Panel::Explore => self.refresh_explore(),
            Panel::Coin => self.refresh_coin(),
            Panel::Queries | Panel::Help => {}
        }
    }

    pub fn refresh_explore(&mut self) {
        self.explore.scroll = 0;
        self.explore.averages = None;
        self.explore.snapshot.clear();

        let range = match DateRange::new(self.explore.start, self.explore.end) {
            Ok(range) => range,
            Err(e) => {
                self.explore.warning = Some(e.to_string());
                self.set_warning(e.to_string());
                return;
            }
        };
        self.explore.warning = None;

        match report::range_averages(&self.store, &self.series, &range) {
            Ok(averages) => self.explore.averages = Some(averages),
            Err(e) => self.push_error(ErrorCategory::Database, e.to_string(), "range averages".into()),
        }
        match report::daily_snapshot(&self.store, &self.series, &range) {
            Ok(rows) => self.explore.snapshot = rows,
            Err(e) => self.push_error(ErrorCategory::Database, e.to_string(), "daily snapshot".into()),
        }
    }

    pub fn reset_explore_range(&mut self) {
        let range = DateRange::last_days(self.today, days(self.dashboard.explore_default_days));
        self.explore.start = range.start;
        self.explore.end = range.end;
        self.refresh_explore();
    }

    /// Reload the coin list, keeping the current coin selected if it is
    /// still among the top coins.
    pub fn load_coins(&mut self) {
        let current = self.coin.selected_coin().map(|c| c.id.clone());
        match report::top_coins(&self.store, self.dashboard.top_coins) {
            Ok(coins) => {
                self.coin.selected = current
                    .and_then(|id| coins.iter().position(|c| c.id == id))
                    .unwrap_or(0);
                self.coin.coins = coins;
            }
            Err(e) => {
                self.coin.coins.clear();
                self.coin.selected = 0;
                self.push_error(ErrorCategory::Database, e.to_string(), "top coins".into());
            }
        }
    }

    pub fn select_coin(&mut self, id: &str) -> bool {
        match self.coin.coins.iter().position(|c| c.id == id) {
            Some(i) => {
                self.coin.selected = i;
                true
            }
            None => false,
        }
    }

    pub fn cycle_coin(&mut self, forward: bool) {
        let n = self.coin.coins.len();
        if n == 0 {
            return;
        }
        self.coin.selected = if forward {
            (self.coin.selected + 1) % n
        } else {
            (self.coin.selected + n - 1) % n
        };
        self.refresh_coin_history();
    }

    pub fn refresh_coin(&mut self) {
        self.load_coins();
        self.refresh_coin_history();
    }

    pub fn refresh_coin_history(&mut self) {
        self.coin.scroll = 0;
        self.coin.history.clear();

        let range = match DateRange::new(self.coin.start, self.coin.end) {
            Ok(range) => range,
            Err(e) => {
                self.coin.warning = Some(e.to_string());
                self.set_warning(e.to_string());
                return;
            }
        };
        self.coin.warning = None;

        let Some(coin_id) = self.coin.selected_coin().map(|c| c.id.clone()) else {
            return;
        };
        match report::coin_history(&self.store, &coin_id, &range) {
            Ok(points) => self.coin.history = points,
            Err(e) => self.push_error(ErrorCategory::Database, e.to_string(), coin_id),
        }
    }

    pub fn reset_coin_range(&mut self) {
        let range = DateRange::last_days(self.today, days(self.dashboard.coin_default_days));
        self.coin.start = range.start;
        self.coin.end = range.end;
        self.refresh_coin_history();
    }

    /// Run the selected catalog query verbatim. Database errors are shown as
    /// the query's output.
    pub fn run_selected_query(&mut self) {
        let Some(query) = self.queries.selected() else {
            return;
        };
        let ticker = self.queries.ticker().unwrap_or_default().to_string();
        if query.takes_ticker() && ticker.is_empty() {
            self.set_warning("No ticker configured for this query");
            return;
        }

        self.queries.last_run = Some(self.queries.cursor);
        self.queries.scroll = 0;
        match query.run(&self.store, &ticker) {
            Ok(result) => {
                self.set_status(format!("{}: {} rows", query.name, result.row_count()));
                self.queries.result = Some(result);
                self.queries.error = None;
            }
            Err(e) => {
                self.queries.result = None;
                self.queries.error = Some(e.to_string());
                self.push_error(ErrorCategory::Database, e.to_string(), query.label());
            }
        }
    }

    pub fn date(&self, field: DateField) -> NaiveDate {
        match field {
            DateField::ExploreStart => self.explore.start,
            DateField::ExploreEnd => self.explore.end,
            DateField::CoinStart => self.coin.start,
            DateField::CoinEnd => self.coin.end,
        }
    }

    /// Set one end of a range and recompute the view that uses it.
    pub fn set_date(&mut self, field: DateField, date: NaiveDate) {
        match field {
            DateField::ExploreStart => self.explore.start = date,
            DateField::ExploreEnd => self.explore.end = date,
            DateField::CoinStart => self.coin.start = date,
            DateField::CoinEnd => self.coin.end = date,
        }
        match field {
            DateField::ExploreStart | DateField::ExploreEnd => self.refresh_explore(),
            DateField::CoinStart | DateField::CoinEnd => self.refresh_coin_history(),
        }
    }

    /// Push an error to the history, capping at 50.
    pub fn push_error(&mut self, category: ErrorCategory, message: String, context: String) {
        let record = ErrorRecord {
            timestamp: chrono::Local::now().naive_local(),
            category,
            message: message.clone(),
            context,
        };
        self.error_history.push_front(record);
        if self.error_history.len() > MAX_ERRORS {
            self.error_history.pop_back();
        }
        self.status_message = Some((message, StatusLevel::Error));
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Info));
    }

    pub fn set_warning(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Warning));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use marketlake_core::{CoinDailyPrice, CoinSnapshot, OilDailyPrice, StockDailyBar};

    pub(crate) fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn coin(id: &str, name: &str, rank: i64) -> CoinSnapshot {
        CoinSnapshot {
            id: id.into(),
            symbol: id[..3].into(),
            name: name.into(),
            current_price: Some(1.0),
            market_cap: None,
            market_cap_rank: Some(rank),
            total_volume: None,
            circulating_supply: None,
            total_supply: None,
            ath: None,
            atl: None,
            last_updated: None,
        }
    }

    fn bar(ticker: &str, date: NaiveDate, close: f64) -> StockDailyBar {
        StockDailyBar {
            ticker: ticker.into(),
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000,
        }
    }

    /// Store with four coins and two dates that carry all four series.
    pub(crate) fn seeded_app() -> AppState {
        let store = MarketStore::open_in_memory().unwrap();
        store.ensure_schema().unwrap();
        for snapshot in [
            coin("bitcoin", "Bitcoin", 1),
            coin("ethereum", "Ethereum", 2),
            coin("tether", "Tether", 3),
            coin("ripple", "XRP", 4),
        ] {
            store.upsert_coin_snapshot(&snapshot).unwrap();
        }
        for (day, btc, eth) in [(2, 97_000.0, 3_400.0), (3, 98_000.0, 3_500.0)] {
            store
                .upsert_coin_price(&CoinDailyPrice {
                    coin_id: "bitcoin".into(),
                    date: d(2025, 1, day),
                    price_usd: btc,
                })
                .unwrap();
            store
                .upsert_coin_price(&CoinDailyPrice {
                    coin_id: "ethereum".into(),
                    date: d(2025, 1, day),
                    price_usd: eth,
                })
                .unwrap();
            store
                .upsert_oil_price(&OilDailyPrice {
                    date: d(2025, 1, day),
                    price_usd: 73.0,
                })
                .unwrap();
            store.upsert_stock_bar(&bar("^GSPC", d(2025, 1, day), 5_900.0)).unwrap();
            store.upsert_stock_bar(&bar("^NSEI", d(2025, 1, day), 24_000.0)).unwrap();
        }

        AppState::new(
            store,
            DashboardConfig::default(),
            vec!["^GSPC".into(), "^IXIC".into(), "^NSEI".into()],
            d(2025, 1, 31),
        )
    }

    #[test]
    fn panel_cycle() {
        assert_eq!(Panel::Explore.next(), Panel::Queries);
        assert_eq!(Panel::Help.next(), Panel::Explore);
        assert_eq!(Panel::Explore.prev(), Panel::Help);
        assert_eq!(Panel::Coin.prev(), Panel::Queries);
    }

    #[test]
    fn panel_from_index() {
        for i in 0..4 {
            assert_eq!(Panel::from_index(i).unwrap().index(), i);
        }
        assert!(Panel::from_index(4).is_none());
    }

    #[test]
    fn default_ranges_come_from_config() {
        let app = seeded_app();
        assert_eq!(app.explore.start, d(2024, 2, 1));
        assert_eq!(app.explore.end, d(2025, 1, 31));
        assert_eq!(app.coin.start, d(2024, 11, 2));
    }

    #[test]
    fn explore_fills_averages_and_snapshot() {
        let mut app = seeded_app();
        app.refresh_explore();
        let averages = app.explore.averages.unwrap();
        assert_eq!(averages.bitcoin, Some(97_500.0));
        assert_eq!(averages.oil, Some(73.0));
        assert_eq!(app.explore.snapshot.len(), 2);
        assert!(app.explore.warning.is_none());
    }

    #[test]
    fn inverted_range_warns_and_runs_nothing() {
        let mut app = seeded_app();
        app.refresh_explore();
        app.set_date(DateField::ExploreStart, d(2025, 2, 1));
        assert_eq!(
            app.explore.warning.as_deref(),
            Some("Start date must be before end date.")
        );
        assert!(app.explore.averages.is_none());
        assert!(app.explore.snapshot.is_empty());
        assert_eq!(app.status_message.as_ref().unwrap().1, StatusLevel::Warning);
    }

    #[test]
    fn empty_range_has_no_averages_but_no_error() {
        let mut app = seeded_app();
        app.set_date(DateField::ExploreStart, d(2020, 1, 1));
        app.set_date(DateField::ExploreEnd, d(2020, 12, 31));
        let averages = app.explore.averages.unwrap();
        assert_eq!(averages.bitcoin, None);
        assert!(app.error_history.is_empty());
    }

    #[test]
    fn coin_view_offers_top_three_and_keeps_selection() {
        let mut app = seeded_app();
        app.refresh_coin();
        let ids: Vec<_> = app.coin.coins.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["bitcoin", "ethereum", "tether"]);
        assert_eq!(app.coin.history.len(), 2);

        app.cycle_coin(true);
        assert_eq!(app.coin.selected_coin().unwrap().id, "ethereum");
        app.refresh_coin();
        assert_eq!(app.coin.selected_coin().unwrap().id, "ethereum");

        app.cycle_coin(true);
        assert!(app.coin.history.is_empty());
        app.cycle_coin(false);
        app.cycle_coin(false);
        assert_eq!(app.coin.selected_coin().unwrap().id, "bitcoin");
    }

    #[test]
    fn query_with_ticker_uses_the_cycled_ticker() {
        let mut app = seeded_app();
        let index = catalog::catalog()
            .iter()
            .position(|q| q.takes_ticker())
            .unwrap();
        app.queries.cursor = index;
        app.run_selected_query();
        assert_eq!(app.queries.result.as_ref().unwrap().row_count(), 2);

        app.queries.cycle_ticker();
        assert_eq!(app.queries.ticker(), Some("^IXIC"));
        app.run_selected_query();
        assert_eq!(app.queries.result.as_ref().unwrap().row_count(), 0);
        assert_eq!(app.queries.last_run, Some(index));
    }

    #[test]
    fn database_errors_are_shown_as_query_output() {
        let mut app = seeded_app();
        app.store.run_query("DROP TABLE oil_price").unwrap();
        let index = catalog::catalog()
            .iter()
            .position(|q| q.sql.contains("oil_price"))
            .unwrap();
        app.queries.cursor = index;
        app.run_selected_query();
        assert!(app.queries.result.is_none());
        assert!(app.queries.error.as_deref().unwrap().contains("oil_price"));
        assert_eq!(app.error_history[0].category, ErrorCategory::Database);
    }

    #[test]
    fn error_history_caps_at_50() {
        let mut app = seeded_app();
        for i in 0..60 {
            app.push_error(ErrorCategory::Input, format!("error {i}"), String::new());
        }
        assert_eq!(app.error_history.len(), 50);
        assert!(app.error_history[0].message.contains("59"));
    }
}
