//! Fare-Ledger main entry point
//!
//! This is the command-line interface for the Fare-Ledger fare collector.

use chrono::NaiveDate;
use clap::Parser;
use fare_ledger::config::{load_config_with_hash, validate, Config};
use fare_ledger::crawler::{run_crawl, CrawlOrchestrator};
use fare_ledger::output::{load_statistics, print_report, print_statistics};
use fare_ledger::store::RecordStore;
use fare_ledger::timing::{SystemClock, TokioWaiter};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Fare-Ledger: a daily flight-fare collector
///
/// Fare-Ledger searches one route over a rolling window of departure dates
/// and appends every fare it finds to a CSV ledger.
#[derive(Parser, Debug)]
#[command(name = "fare-ledger")]
#[command(version)]
#[command(about = "A daily flight-fare collector", long_about = None)]
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

    /// First departure date to search (YYYY-MM-DD), overriding the config
    #[arg(long, value_name = "DATE")]
    start_date: Option<NaiveDate>,

    /// Number of dates to search, overriding the config
    #[arg(long, value_name = "N")]
    days: Option<u32>,

    /// Validate config and show which pages would be searched without searching
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the ledger and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    apply_overrides(&mut config, &cli)?;

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config).await?;
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
            0 => EnvFilter::new("fare_ledger=info,warn"),
            1 => EnvFilter::new("fare_ledger=debug,info"),
            2 => EnvFilter::new("fare_ledger=trace,debug"),
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

/// Applies command-line overrides and revalidates
fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(start) = cli.start_date {
        tracing::info!("Start date overridden to {}", start);
        config.search.start_date = Some(start);
    }
    if let Some(days) = cli.days {
        tracing::info!("Window overridden to {} days", days);
        config.search.days = days;
    }
    validate(config)?;
    Ok(())
}

/// Handles the --dry-run mode: validates config and shows what would be searched
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Fare-Ledger Dry Run ===\n");

    let orchestrator = CrawlOrchestrator::new(config, TokioWaiter, SystemClock)?;
    let window = orchestrator.window();

    println!("Route:");
    println!("  {} -> {}", config.search.origin, config.search.destination);

    println!("\nWindow:");
    println!("  First date: {}", window.start());
    if let Some(last) = window.last() {
        println!("  Last date: {}", last);
    }
    println!("  Dates: {}", window.len());

    println!("\nTiming:");
    println!("  Page settle: {}ms", config.timing.page_settle_ms);
    println!("  Max attempts per date: {}", config.timing.max_attempts);
    println!("  Retry delay: {}ms", config.timing.retry_delay_ms);
    match config.timing.max_write_attempts {
        Some(max) => println!("  Ledger write attempts: up to {}", max),
        None => println!("  Ledger write attempts: unbounded"),
    }

    println!("\nOutput:");
    println!("  Ledger: {}", config.output.csv_path);
    println!("  Echo: {}", config.output.echo);

    println!("\nPages:");
    for date in window.dates() {
        println!("  {}", orchestrator.fetcher().search_url(date));
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the ledger
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Ledger: {}\n", config.output.csv_path);

    let store = RecordStore::from_config(config, TokioWaiter);
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Route {} -> {}, {} days",
        config.search.origin,
        config.search.destination,
        config.search.days
    );

    match run_crawl(config).await {
        Ok(report) => {
            tracing::info!("Crawl completed successfully");
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
