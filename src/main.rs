//! Listing-Harvester main entry point
//!
//! This is the command-line interface for the Listing-Harvester catalog crawler.

use clap::Parser;
use listing_harvester::config::{load_config_with_hash, validate, Config};
use listing_harvester::crawler::{Coordinator, PageRange};
use listing_harvester::output::{
    print_catalog_stats, print_crawl_report, print_entries, print_stats_history,
};
use listing_harvester::storage::{open_store, ListingStore};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Listing-Harvester: a catalog crawler with a time-series listing store
///
/// Listing-Harvester crawls a range of catalog pages with a bounded pool of
/// workers, normalizes every listing and stores it in SQLite together with
/// a seeds/leeches sample per run.
#[derive(Parser, Debug)]
#[command(name = "listing-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A catalog crawler with a time-series listing store", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// First catalog page to crawl
    #[arg(long, default_value_t = 0)]
    from: u32,

    /// Last catalog page to crawl (inclusive)
    #[arg(long, default_value_t = 0)]
    to: u32,

    /// Number of concurrent workers (1-20), overrides the config file
    #[arg(short, long)]
    workers: Option<u32>,

    /// Per-request timeout in seconds, overrides the config file
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["recent", "search", "category", "history"])]
    stats: bool,

    /// Show the N most recently updated entries and exit
    #[arg(long, value_name = "N", conflicts_with_all = ["stats", "search", "category", "history"])]
    recent: Option<i64>,

    /// Search entry names and categories and exit
    #[arg(long, value_name = "TEXT", conflicts_with_all = ["stats", "recent", "category", "history"])]
    search: Option<String>,

    /// List entries in a category and exit
    #[arg(long, value_name = "NAME", conflicts_with_all = ["stats", "recent", "search", "history"])]
    category: Option<String>,

    /// Show the seeds/leeches history of one entry and exit
    #[arg(long, value_name = "ID", conflicts_with_all = ["stats", "recent", "search", "category"])]
    history: Option<String>,

    /// Row limit for --search, --category and --history (0 uses the default)
    #[arg(long, default_value_t = 0)]
    limit: i64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Command-line flags win over the file
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }
    if let Some(timeout) = cli.timeout {
        config.crawler.timeout_secs = timeout;
    }
    validate(&config)?;

    if cli.stats {
        handle_stats(&config)?;
    } else if let Some(limit) = cli.recent {
        handle_recent(&config, limit)?;
    } else if let Some(text) = cli.search.as_deref() {
        handle_search(&config, text, cli.limit)?;
    } else if let Some(category) = cli.category.as_deref() {
        handle_category(&config, category, cli.limit)?;
    } else if let Some(entry_id) = cli.history.as_deref() {
        handle_history(&config, entry_id, cli.limit)?;
    } else {
        handle_crawl(config, cli.from, cli.to).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_harvester=info,warn"),
            1 => EnvFilter::new("listing_harvester=debug,info"),
            2 => EnvFilter::new("listing_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --stats mode: shows aggregate statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.output.database_path);

    let store = open_store(Path::new(&config.output.database_path))?;
    let stats = store.aggregate_stats()?;
    print_catalog_stats(&stats);

    Ok(())
}

/// Handles the --recent mode: lists the newest entries with current stats
fn handle_recent(config: &Config, limit: i64) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(Path::new(&config.output.database_path))?;
    let entries = store.recent(limit)?;
    print_entries(&entries);

    Ok(())
}

/// Handles the --search mode: substring search over names and categories
fn handle_search(config: &Config, text: &str, limit: i64) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(Path::new(&config.output.database_path))?;
    let entries = store.search(text, limit)?;
    print_entries(&entries);

    Ok(())
}

/// Handles the --category mode: lists entries in one category
fn handle_category(
    config: &Config,
    category: &str,
    limit: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(Path::new(&config.output.database_path))?;
    let entries = store.by_category(category, limit)?;
    print_entries(&entries);

    Ok(())
}

/// Handles the --history mode: prints one entry's samples, newest first
fn handle_history(
    config: &Config,
    entry_id: &str,
    limit: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(Path::new(&config.output.database_path))?;

    match store.current_stats_for(entry_id)? {
        Some(current) => print_entries(std::slice::from_ref(&current)),
        None => {
            println!("No entry with id {}", entry_id);
            return Ok(());
        }
    }

    let samples = store.stats_history(entry_id, limit)?;
    print_stats_history(&samples);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, from: u32, to: u32) -> Result<(), Box<dyn std::error::Error>> {
    let range = PageRange::new(from, to)?;
    let workers = config.crawler.workers;

    tracing::info!(
        "Catalog: {}, pages {}..={}, {} workers, {}s timeout",
        config.source.catalog_url,
        range.from(),
        range.to(),
        workers,
        config.crawler.timeout_secs
    );

    let coordinator = Coordinator::new(config)?;
    match coordinator.run(range, workers).await {
        Ok(report) => {
            print_crawl_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
