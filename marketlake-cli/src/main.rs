//! Marketlake CLI: schema setup, collection runs and predefined queries.
//!
//! Commands:
//! - `init`: create the market tables
//! - `collect <coins|coin-prices|oil|stocks|all>`: fetch sources and upsert rows
//! - `query list` / `query run`: the predefined report catalog
//! - `config show`: effective configuration and per-table row counts

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use marketlake_collect::{
    run_collector, CollectContext, CollectOptions, CollectSummary, Collector, LogProgress,
    RawSource,
};
use marketlake_core::catalog;
use marketlake_core::fetch::{HttpTransport, RateLimitedClient, RetryPolicy};
use marketlake_core::store::QueryResult;
use marketlake_core::{MarketStore, PipelineConfig};

#[derive(Parser, Debug)]
#[command(
    name = "marketlake",
    about = "Marketlake CLI: collect crypto, oil and index data into SQLite"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the market tables if they do not exist.
    Init {
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Fetch one source (or all of them, in order) and upsert into the database.
    Collect {
        #[arg(value_enum)]
        target: Target,

        #[command(flatten)]
        store: StoreArgs,

        /// Disable TLS certificate verification.
        #[arg(long, default_value_t = false)]
        insecure: bool,

        /// Save raw CoinGecko payloads to `<DIR>/<collector>.json`.
        #[arg(long, value_name = "DIR", conflicts_with = "from_raw")]
        raw_out: Option<PathBuf>,

        /// Replay CoinGecko payloads from `<DIR>/<collector>.json` instead of the network.
        #[arg(long, value_name = "DIR")]
        from_raw: Option<PathBuf>,

        /// Load WTI prices from this CSV instead of downloading.
        #[arg(long)]
        csv_file: Option<PathBuf>,
    },
    /// Predefined report queries.
    Query {
        #[command(subcommand)]
        action: QueryAction,
    },
    /// Configuration commands.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum QueryAction {
    /// List the catalog with the index used by `query run`.
    List,
    /// Run a query by index or name and print the result table.
    Run {
        /// 1-based index, query name, or full label.
        query: String,

        /// Ticker for queries that take one. Defaults to the first configured ticker.
        #[arg(long)]
        ticker: Option<String>,

        #[command(flatten)]
        store: StoreArgs,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective config as TOML, then the per-table row counts.
    Show {
        #[command(flatten)]
        store: StoreArgs,
    },
}

#[derive(Args, Debug, Clone)]
struct StoreArgs {
    /// Config file. Defaults to ./marketlake.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Database file (overrides the config and MARKETLAKE_DB).
    #[arg(long)]
    db: Option<PathBuf>,
}

impl StoreArgs {
    fn load(&self) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::load_or_default(self.config.as_deref())?;
        if let Some(db) = &self.db {
            config.database.path = db.clone();
        }
        Ok(config)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Coins,
    CoinPrices,
    Oil,
    Stocks,
    All,
}

impl Target {
    fn collectors(self) -> &'static [Collector] {
        match self {
            Target::Coins => &[Collector::Coins],
            Target::CoinPrices => &[Collector::CoinPrices],
            Target::Oil => &[Collector::Oil],
            Target::Stocks => &[Collector::Stocks],
            Target::All => &Collector::ALL,
        }
    }

    fn uses_coingecko(self) -> bool {
        matches!(self, Target::Coins | Target::CoinPrices | Target::All)
    }

    fn uses_wti(self) -> bool {
        matches!(self, Target::Oil | Target::All)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { store } => run_init(&store),
        Commands::Collect {
            target,
            store,
            insecure,
            raw_out,
            from_raw,
            csv_file,
        } => run_collect(
            target,
            &store,
            insecure,
            raw_out.as_deref(),
            from_raw.as_deref(),
            csv_file.as_deref(),
        ),
        Commands::Query { action } => match action {
            QueryAction::List => {
                print!("{}", render_catalog());
                Ok(())
            }
            QueryAction::Run {
                query,
                ticker,
                store,
            } => run_query(&query, ticker, &store),
        },
        Commands::Config { action } => match action {
            ConfigAction::Show { store } => run_config_show(&store),
        },
    }
}

fn open_store(config: &PipelineConfig) -> Result<MarketStore> {
    let path = &config.database.path;
    let store =
        MarketStore::open(path).with_context(|| format!("opening database {}", path.display()))?;
    store.ensure_schema()?;
    Ok(store)
}

fn run_init(args: &StoreArgs) -> Result<()> {
    let config = args.load()?;
    open_store(&config)?;
    println!("Schema ready: {}", config.database.path.display());
    Ok(())
}

fn run_collect(
    target: Target,
    args: &StoreArgs,
    insecure: bool,
    raw_out: Option<&Path>,
    from_raw: Option<&Path>,
    csv_file: Option<&Path>,
) -> Result<()> {
    check_collect_flags(target, raw_out.or(from_raw).is_some(), csv_file.is_some())?;

    let mut config = args.load()?;
    if insecure {
        config.http.accept_invalid_certs = true;
    }

    let store = open_store(&config)?;
    let transport = HttpTransport::new(&config.http)?;
    let client = RateLimitedClient::new(Arc::new(transport), RetryPolicy::default());
    let progress = LogProgress;
    let ctx = CollectContext {
        store: &store,
        client: &client,
        progress: &progress,
    };

    let summaries: Vec<CollectSummary> = target
        .collectors()
        .iter()
        .map(|&collector| {
            let options = collect_options(collector, raw_out, from_raw, csv_file);
            run_collector(&ctx, &config, collector, &options)
        })
        .collect();

    print!("{}", render_summaries(&summaries));

    if !summaries.iter().all(CollectSummary::all_succeeded) {
        for summary in &summaries {
            for (item, err) in &summary.errors {
                eprintln!("Error for {} {item}: {err}", summary.collector);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}

fn check_collect_flags(target: Target, raw: bool, csv: bool) -> Result<()> {
    if raw && !target.uses_coingecko() {
        bail!("--raw-out and --from-raw apply only to coins, coin-prices or all");
    }
    if csv && !target.uses_wti() {
        bail!("--csv-file applies only to oil or all");
    }
    Ok(())
}

/// Per-collector options. Each CoinGecko collector gets its own archive file
/// inside the raw directory so `collect all` can archive both.
fn collect_options(
    collector: Collector,
    raw_out: Option<&Path>,
    from_raw: Option<&Path>,
    csv_file: Option<&Path>,
) -> CollectOptions {
    let archive = |dir: &Path| dir.join(format!("{}.json", collector.name()));
    let raw = match collector {
        Collector::Coins | Collector::CoinPrices => match (from_raw, raw_out) {
            (Some(dir), _) => RawSource::Replay(archive(dir)),
            (None, Some(dir)) => RawSource::LiveArchived(archive(dir)),
            (None, None) => RawSource::Live,
        },
        Collector::Oil | Collector::Stocks => RawSource::Live,
    };
    let csv_file = match collector {
        Collector::Oil => csv_file.map(Path::to_path_buf),
        _ => None,
    };
    CollectOptions { raw, csv_file }
}

fn render_summaries(summaries: &[CollectSummary]) -> String {
    let mut out = String::new();
    for s in summaries {
        out.push_str(&format!(
            "{}: {}/{} items ok, {} rows written, {} skipped\n",
            s.collector, s.succeeded, s.total, s.rows_written, s.rows_skipped
        ));
    }
    out
}

fn render_catalog() -> String {
    let mut out = String::new();
    for (i, query) in catalog::catalog().iter().enumerate() {
        let suffix = if query.takes_ticker() { "  [--ticker]" } else { "" };
        out.push_str(&format!("{:>3}  {}{suffix}\n", i + 1, query.label()));
    }
    out
}

fn run_query(key: &str, ticker: Option<String>, args: &StoreArgs) -> Result<()> {
    let query = catalog::find(key)
        .ok_or_else(|| anyhow!("no query matches '{key}' (see `marketlake query list`)"))?;
    let config = args.load()?;
    let path = &config.database.path;
    let store = MarketStore::open_read_only(path)
        .with_context(|| format!("opening database {}", path.display()))?;

    let ticker = ticker
        .or_else(|| config.stocks.tickers.first().cloned())
        .unwrap_or_else(|| config.dashboard.sp500_ticker.clone());
    let result = query.run(&store, &ticker)?;

    println!("{}", query.label());
    if query.takes_ticker() {
        println!("Ticker: {ticker}");
    }
    println!();
    print!("{}", render_table(&result));
    println!("{} rows", result.row_count());
    Ok(())
}

/// Left-aligned text table sized to the widest cell of each column.
fn render_table(result: &QueryResult) -> String {
    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = pad_line(result.columns.iter().map(String::as_str), &widths);
    let total: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    out.push_str(&"-".repeat(total));
    out.push('\n');
    for row in &cells {
        out.push_str(&pad_line(row.iter().map(String::as_str), &widths));
    }
    out
}

fn pad_line<'a>(values: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let padded: Vec<String> = values
        .zip(widths)
        .map(|(v, &w)| format!("{v:<w$}"))
        .collect();
    format!("{}\n", padded.join("  ").trim_end())
}

fn run_config_show(args: &StoreArgs) -> Result<()> {
    let config = args.load()?;
    print!("{}", config.to_toml()?);
    println!();

    let path = &config.database.path;
    if !path.is_file() {
        println!("Database {} does not exist yet (run `marketlake init`).", path.display());
        return Ok(());
    }
    let store = MarketStore::open_read_only(path)
        .with_context(|| format!("opening database {}", path.display()))?;

    println!("Database: {}", path.display());
    println!("{:<18} {:>8}  {:<12} {:<12}", "Table", "Rows", "First", "Last");
    println!("{}", "-".repeat(54));
    for stats in store.table_stats()? {
        println!(
            "{:<18} {:>8}  {:<12} {:<12}",
            stats.table.name(),
            stats.rows,
            stats.first_date.as_deref().unwrap_or("-"),
            stats.last_date.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
