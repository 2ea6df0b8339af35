//! Batch locator generation over a record file.
//!
//! Usage:
//!   govlocate <input> <output> [--workers N] [--browsers N] [--config FILE]
//!             [--strategy list|article|auto]
//!
//! Reads `name:`/`url:` pairs from `<input>`, fetches every page over HTTP,
//! and writes one `---` block per item with its locator to `<output>`. Items
//! whose name ends in `js` are rendered in headless Chrome, clicking through
//! the tabs their name lists.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use govlocate::pool::{RenderingFetcher, SessionPool};
use govlocate::{
    read_work_items, run_batch, write_results, ChromeSession, Config, HttpFetcher, Strategy,
    WorkItem,
};

#[derive(Parser)]
#[command(name = "govlocate")]
#[command(about = "Find list and article regions on government pages and emit XPath locators")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Record file with `name:` and `url:` entries
    input: PathBuf,

    /// Where to write the located results
    output: PathBuf,

    /// Pages processed in parallel
    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    /// Headless browsers for pages that need rendering
    #[arg(short, long, default_value_t = 1)]
    browsers: usize,

    /// TOML file overriding the search tunables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Search strategy; overrides the config file
    #[arg(short, long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    List,
    Article,
    Auto,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::List => Strategy::List,
            StrategyArg::Article => Strategy::Article,
            StrategyArg::Auto => Strategy::Auto,
        }
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

/// Launches up to `n` browsers; stops at the first failure.
fn launch_sessions(n: usize, config: &Config) -> Vec<ChromeSession> {
    let mut sessions = Vec::with_capacity(n);
    for _ in 0..n {
        match ChromeSession::launch(config) {
            Ok(session) => sessions.push(session),
            Err(e) => {
                warn!(error = %e, launched = sessions.len(), "cannot launch browser");
                break;
            }
        }
    }
    sessions
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(strategy) = cli.strategy {
        config = config.with_strategy(strategy.into());
    }

    let items = read_work_items(&cli.input)
        .with_context(|| format!("reading work items from {}", cli.input.display()))?;
    info!(items = items.len(), input = %cli.input.display(), "loaded work items");

    let http = HttpFetcher::new().context("building HTTP client")?;
    let sessions = if items.iter().any(WorkItem::needs_rendering) {
        launch_sessions(cli.browsers, &config)
    } else {
        Vec::new()
    };
    info!(browsers = sessions.len(), "rendering sessions ready");
    let pool = SessionPool::new(sessions);
    let fetcher = RenderingFetcher::new(&pool, http);
    let (results, summary) = run_batch(&items, &fetcher, &config, cli.workers);

    let file = File::create(&cli.output)
        .with_context(|| format!("creating {}", cli.output.display()))?;
    let mut out = BufWriter::new(file);
    write_results(&mut out, &results)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    out.flush()?;

    info!(
        output = %cli.output.display(),
        success = summary.success,
        failed = summary.failed,
        fetch_failed = summary.fetch_failed,
        "done"
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.json_logs);
    if let Err(e) = run(&cli) {
        error!("{e:#}");
        process::exit(1);
    }
}
