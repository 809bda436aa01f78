//! Trawl main entry point
//!
//! This is the command-line interface for the Trawl record crawler.

use anyhow::Context;
use clap::Parser;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use trawl::config::{compute_config_hash, parse_config, validate, Config};
use trawl::crawler::run_crawl;
use trawl::output::print_report;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Trawl: a bounded, randomized depth-first record crawler
///
/// Trawl starts from a seed page, follows matching links depth-first in random order,
/// and collects unique `title,url` records until the record cap or one of its time
/// budgets stops it.
#[derive(Parser, Debug)]
#[command(name = "trawl")]
#[command(version = "1.0.0")]
#[command(about = "A bounded, randomized depth-first record crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the seed URL
    #[arg(long, value_name = "URL")]
    seed: Option<String>,

    /// Override the CSV output path
    #[arg(short, long, value_name = "PATH")]
    output: Option<String>,

    /// Override the record cap
    #[arg(long, value_name = "N")]
    max_records: Option<usize>,

    /// Log to the console only, without the timestamped log file
    #[arg(long)]
    no_log_file: bool,

    /// Validate config and show the effective settings without crawling
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(seed) = &self.seed {
            config.crawler.seed_url = seed.clone();
        }
        if let Some(output) = &self.output {
            config.output.csv_path = output.clone();
        }
        if let Some(max_records) = self.max_records {
            config.crawler.max_records = max_records;
        }
        if self.no_log_file {
            config.output.log_dir = None;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = parse_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    cli.apply_overrides(&mut config);

    let log_file = setup_logging(cli.verbose, cli.quiet, config.output.log_dir.as_deref())
        .context("Failed to set up logging")?;

    validate(&config).context("Invalid configuration")?;
    let config_hash = compute_config_hash(&cli.config)?;
    tracing::info!(
        path = %cli.config.display(),
        hash = %config_hash,
        "Configuration loaded successfully"
    );
    if let Some(path) = log_file {
        tracing::info!(path = %path.display(), "Logging to file");
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let report = run_crawl(config).await.context("Crawl failed")?;
    if !cli.quiet {
        print_report(&report);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Console output is always on. Unless `log_dir` is `None`, a plain-text copy goes to
/// `<log_dir>/trawl_<YYYYmmdd_HHMMSS>.log`, whose path is returned.
fn setup_logging(verbose: u8, quiet: bool, log_dir: Option<&str>) -> anyhow::Result<Option<PathBuf>> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("trawl=info,warn"),
            1 => EnvFilter::new("trawl=debug,info"),
            2 => EnvFilter::new("trawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    let (file_layer, log_path) = match log_dir {
        Some(dir) => {
            let path = log_file_path(Path::new(dir));
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir))?;
            let file = File::create(&path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(log_path)
}

fn log_file_path(dir: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("trawl_{}.log", stamp))
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Trawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Seed URL: {}", config.crawler.seed_url);
    println!("  Max records: {}", config.crawler.max_records);
    println!("  Record cap policy: {:?}", config.crawler.record_cap_policy);
    println!("  Page load timeout: {}ms", config.crawler.page_load_timeout_ms);
    println!("  Total timeout: {}s", config.crawler.timeout_total_seconds);
    println!("  Deeper timeout: {}s", config.crawler.timeout_deeper_seconds);
    println!("  Settle delay: {}ms", config.crawler.settle_delay_ms);
    println!("  Workers: {}", config.crawler.workers);
    match config.crawler.shuffle_seed {
        Some(seed) => println!("  Shuffle seed: {}", seed),
        None => println!("  Shuffle seed: random"),
    }

    println!("\nRetry:");
    println!("  Max attempts: {}", config.retry.max_retry_fails);
    println!(
        "  Backoff: {}ms x 2^n, clamped to [{}ms, {}ms]",
        config.retry.multiplier_ms, config.retry.wait_min_ms, config.retry.wait_max_ms
    );

    println!("\nSelectors:");
    println!("  Links: {}", config.selectors.link);
    println!("  Title: {}", config.selectors.title);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  CSV: {}", config.output.csv_path);
    if let Some(db) = &config.output.database_path {
        println!("  Database: {}", db);
    }
    if let Some(dir) = &config.output.log_dir {
        println!("  Log directory: {}", dir);
    }

    println!("\n✓ Configuration is valid");
}
