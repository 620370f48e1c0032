//! Marketlake TUI: four views over the local market database.
//!
//! Views:
//! 1. Explore: range averages and the four-series daily snapshot
//! 2. Queries: the predefined report catalog
//! 3. Coin: top coins by market cap with a price chart
//! 4. Help: keyboard shortcuts

mod app;
mod input;
mod persistence;
mod theme;
mod ui;

use std::fs::OpenOptions;
use std::io::{self, stdout};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::EnvFilter;

use marketlake_core::config::PipelineConfig;
use marketlake_core::store::MarketStore;

use crate::app::AppState;

#[derive(Parser, Debug)]
#[command(name = "marketlake-tui", about = "Browse the market database in the terminal")]
struct Args {
    /// Database file (overrides the config and MARKETLAKE_DB).
    #[arg(long)]
    db: Option<PathBuf>,

    /// Config file (defaults to ./marketlake.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Append logs to this file. The terminal is owned by the UI, so
    /// nothing is logged without it.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    }

    let mut config = PipelineConfig::load_or_default(args.config.as_deref())?;
    if let Some(db) = args.db {
        config.database.path = db;
    }
    let store = MarketStore::open_read_only(&config.database.path).with_context(|| {
        format!(
            "opening {} (run `marketlake init` and `marketlake collect all` first)",
            config.database.path.display()
        )
    })?;
    tracing::info!(db = %config.database.path.display(), "dashboard starting");

    // Install a panic hook that restores the terminal before printing the panic.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stderr(), LeaveAlternateScreen);
        default_hook(info);
    }));

    let state_path = persistence::default_path();
    let persisted = persistence::load(&state_path);

    let mut app = AppState::new(
        store,
        config.dashboard,
        config.stocks.tickers,
        Local::now().date_naive(),
    );
    persistence::apply(&mut app, persisted);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, &mut app);

    // Save state before exit
    let persisted = persistence::extract(&app);
    if let Err(e) = persistence::save(&state_path, &persisted) {
        tracing::warn!(error = %e, path = %state_path.display(), "could not save UI state");
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        // 50ms timeout keeps the loop responsive without spinning.
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                input::handle_key(app, key);
            }
        }

        if !app.running {
            break;
        }
    }
    Ok(())
}
