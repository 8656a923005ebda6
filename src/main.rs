//! Endpoint Collector main entry point
//!
//! This is the command-line interface for the endpoint collector.

use anyhow::Context;
use clap::Parser;
use endpoint_collector::config::{load_config_with_hash, Config};
use endpoint_collector::endpoint::{build_catalog, resolve_url};
use endpoint_collector::output::{load_statistics, print_statistics};
use endpoint_collector::storage::SqliteStorage;
use endpoint_collector::Coordinator;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Endpoint Collector: a polite JSON endpoint collector
///
/// Fetches every configured endpoint once, within a global request rate and
/// a concurrency cap, and records every attempt and every parsed payload in
/// an append-only SQLite store.
#[derive(Parser, Debug)]
#[command(name = "endpoint-collector")]
#[command(version)]
#[command(about = "A polite JSON endpoint collector", long_about = None)]
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

    /// Validate config and show the resolved URLs without fetching anything
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        Ok(())
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_collect(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("endpoint_collector=info,warn"),
            1 => EnvFilter::new("endpoint_collector=debug,info"),
            2 => EnvFilter::new("endpoint_collector=trace,debug"),
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

/// Handles the --dry-run mode: shows settings and resolved URLs
fn handle_dry_run(config: &Config) {
    println!("=== Endpoint Collector Dry Run ===\n");

    println!("Collector:");
    println!("  Base URL: {}", config.collector.base_url);
    println!("  User agent: {}", config.collector.user_agent);
    println!("  Timeout: {}s", config.collector.timeout_secs);
    println!("  Max concurrency: {}", config.collector.max_concurrency);
    println!("  Requests per second: {}", config.collector.requests_per_second);
    println!("  Max attempts: {}", config.collector.max_retries);

    println!("\nBackoff:");
    println!("  Base: {}s", config.backoff.base_secs);
    println!("  Cap: {}s", config.backoff.cap_secs);
    println!("  Jitter ratio: {}", config.backoff.jitter_ratio);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!(
        "\nAuth: {}",
        if config.auth.is_some() { "bearer token set" } else { "none" }
    );

    let catalog = build_catalog(config);
    let mut resolvable = 0;

    println!("\nEndpoints ({}):", catalog.len());
    for descriptor in &catalog {
        match resolve_url(&config.collector.base_url, descriptor) {
            Ok(url) => {
                resolvable += 1;
                println!("  - {}: {}", descriptor.name, url);
            }
            Err(e) => println!("  ! {}", e),
        }
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would collect {} of {} endpoints", resolvable, catalog.len());
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = Path::new(&config.storage.database_path);
    println!("Database: {}\n", path.display());

    // Read path only; a missing file is an error
    let storage = SqliteStorage::open_existing(path)
        .with_context(|| format!("failed to open existing store at {}", path.display()))?;
    let stats = load_statistics(&storage).context("failed to read statistics")?;
    print_statistics(&stats);

    Ok(())
}

/// Handles one collection cycle
async fn handle_collect(config: Config) -> anyhow::Result<()> {
    let database_path = config.storage.database_path.clone();
    let catalog = build_catalog(&config);

    let coordinator = Coordinator::new(config)
        .with_context(|| format!("failed to initialize collector with store {}", database_path))?;

    let summary = match coordinator.run(&catalog).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Collection failed: {}", e);
            return Err(e).context("collection aborted");
        }
    };

    println!(
        "completed: {}/{} endpoints stored into {}",
        summary.succeeded, summary.total, database_path
    );

    Ok(())
}
