//! Profesia crawler main entry point
//!
//! This is the command-line interface for the incremental job-listing indexer.

use anyhow::Context;
use clap::Parser;
use profesia_crawler::config::{load_or_default_config, Config, ConfigSource};
use profesia_crawler::crawler::{crawl, run_continuous, SessionOutcome};
use profesia_crawler::storage::SinkBackend;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Profesia crawler: an incremental job-listing indexer
///
/// Searches profesia.sk for a keyword and stores every listing. With the
/// deduplicating store (-r) later runs stop as soon as they reach listings
/// indexed before.
#[derive(Parser, Debug)]
#[command(name = "profesia-crawler")]
#[command(version)]
#[command(about = "An incremental job-listing indexer", long_about = None)]
struct Cli {
    /// Search keyword (empty searches all offers)
    #[arg(short = 'p', value_name = "KEYWORD", default_value = "")]
    keyword: String,

    /// Use the deduplicating store instead of the per-day CSV table
    #[arg(short = 'r')]
    dedup_store: bool,

    /// Run continuously, starting a new session after every finished one
    #[arg(short = 'a')]
    continuous: bool,

    /// Path to TOML settings file
    #[arg(short, long, value_name = "PATH", default_value = "settings.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate settings and show what would be crawled without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the deduplicating store and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

impl Cli {
    fn backend(&self) -> SinkBackend {
        if self.dedup_store {
            SinkBackend::DedupStore
        } else {
            SinkBackend::AppendOnlyTable
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // The store location must be reviewed before first use; the CSV table
    // works with built-in defaults
    let file_required = cli.dedup_store || cli.stats;
    let source = load_or_default_config(&cli.config, file_required)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    let config = match source {
        ConfigSource::Loaded { config, hash } => {
            tracing::info!(
                "Configuration loaded from {} (hash: {})",
                cli.config.display(),
                hash
            );
            config
        }
        ConfigSource::Defaults(config) => {
            tracing::info!(
                "No settings at {}, using built-in defaults",
                cli.config.display()
            );
            config
        }
        ConfigSource::CreatedDefault => {
            tracing::info!(
                "Created default settings at {}; review it and run again",
                cli.config.display()
            );
            return Ok(());
        }
    };

    if cli.keyword.is_empty() && !cli.dedup_store && !cli.continuous {
        tracing::info!("No arguments given, crawling all offers once; try --help for options");
    }

    if cli.dry_run {
        handle_dry_run(&config, &cli);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.continuous {
        handle_continuous(&config, &cli).await;
    } else {
        handle_crawl(&config, &cli).await?;
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
            0 => EnvFilter::new("profesia_crawler=info,warn"),
            1 => EnvFilter::new("profesia_crawler=debug,info"),
            2 => EnvFilter::new("profesia_crawler=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved settings
fn handle_dry_run(config: &Config, cli: &Cli) {
    println!("=== Profesia Crawler Dry Run ===\n");

    println!("Search:");
    println!("  Site: {}", config.site.base_url);
    println!("  Keyword: '{}'", cli.keyword);
    println!("  Sink: {}", cli.backend().as_str());
    println!("  Continuous: {}", cli.continuous);

    println!("\nStop Policy:");
    println!("  Freshness marker: {}", config.site.freshness_marker);
    println!("  Results heading prefix: {}", config.site.results_heading_prefix);

    println!("\nTiming:");
    println!("  Page load timeout: {}s", config.timing.page_load_timeout_secs);
    println!("  Settle delay: {}ms", config.timing.settle_delay_ms);
    println!("  Continuous delay: {}s", config.timing.continuous_delay_secs);

    println!("\nOutput:");
    match cli.backend() {
        SinkBackend::DedupStore => println!("  Database: {}", config.store.database_path),
        SinkBackend::AppendOnlyTable => println!("  Table directory: {}", config.table.output_dir),
    }

    println!("\nUser Agent:");
    println!(
        "  {}/{}",
        config.user_agent.crawler_name, config.user_agent.crawler_version
    );

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the deduplicating store
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use profesia_crawler::output::{load_statistics, print_statistics};
    use profesia_crawler::storage::DedupStore;

    println!("Database: {}\n", config.store.database_path);

    let store = DedupStore::open(Path::new(&config.store.database_path))?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles a single session
async fn handle_crawl(config: &Config, cli: &Cli) -> anyhow::Result<()> {
    tracing::info!(
        "Starting crawl for '{}' into {}",
        cli.keyword,
        cli.backend().as_str()
    );

    match crawl(config, &cli.keyword, cli.backend()).await {
        Ok(SessionOutcome::Completed(report)) => {
            tracing::info!("Crawl completed: {}", report);
            Ok(())
        }
        Ok(SessionOutcome::NoResults) => Ok(()),
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles -a: sessions back to back until interrupted
async fn handle_continuous(config: &Config, cli: &Cli) {
    tracing::info!(
        "Starting continuous crawl for '{}' into {} (Ctrl-C to stop)",
        cli.keyword,
        cli.backend().as_str()
    );

    tokio::select! {
        _ = run_continuous(config, &cli.keyword, cli.backend(), None) => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
            }
            tracing::info!("Interrupted, stopping continuous crawl");
        }
    }
}
