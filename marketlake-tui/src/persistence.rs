//! UI state persistence: JSON save/load across restarts.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use marketlake_core::catalog;

use crate::app::{AppState, Panel};

/// Serializable subset of app state that persists across restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub active_panel: Panel,
    pub explore_range: Option<(NaiveDate, NaiveDate)>,
    pub coin_range: Option<(NaiveDate, NaiveDate)>,
    pub query_index: usize,
    pub coin_id: Option<String>,
    pub ticker: Option<String>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            active_panel: Panel::Explore,
            explore_range: None,
            coin_range: None,
            query_index: 0,
            coin_id: None,
            ticker: None,
        }
    }
}

/// `<config dir>/marketlake/tui_state.json`.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("marketlake")
        .join("tui_state.json")
}

/// Load persisted state from disk. Returns defaults if file is missing or corrupt.
pub fn load(path: &Path) -> PersistedState {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
        Err(_) => PersistedState::default(),
    }
}

/// Save persisted state to disk. Creates parent directories if needed.
pub fn save(path: &Path, state: &PersistedState) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn extract(app: &AppState) -> PersistedState {
    PersistedState {
        active_panel: app.active_panel,
        explore_range: Some((app.explore.start, app.explore.end)),
        coin_range: Some((app.coin.start, app.coin.end)),
        query_index: app.queries.cursor,
        coin_id: app.coin.selected_coin().map(|c| c.id.clone()),
        ticker: app.queries.ticker().map(String::from),
    }
}

/// Apply persisted state, then refresh the restored view. Values that no
/// longer fit (a query index past the catalog, an unknown ticker) are
/// ignored.
pub fn apply(app: &mut AppState, state: PersistedState) {
    if let Some((start, end)) = state.explore_range {
        app.explore.start = start;
        app.explore.end = end;
    }
    if let Some((start, end)) = state.coin_range {
        app.coin.start = start;
        app.coin.end = end;
    }
    if state.query_index < catalog::catalog().len() {
        app.queries.cursor = state.query_index;
    }
    if let Some(ticker) = state.ticker {
        if let Some(i) = app.queries.tickers.iter().position(|t| *t == ticker) {
            app.queries.ticker_idx = i;
        }
    }
    if let Some(id) = state.coin_id {
        app.load_coins();
        app.select_coin(&id);
    }
    app.switch_panel(state.active_panel);
}
