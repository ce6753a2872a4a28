//! Dogfetch main entry point
//!
//! This is the command-line interface for the dog breed catalog crawler.
//! Results are printed to stdout as JSON; logs go to stderr.

use anyhow::Context;
use clap::{ArgGroup, Parser};
use dogfetch::config::{load_config_with_hash, Config};
use dogfetch::{Coordinator, Dataset};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Dogfetch: a dog breed catalog crawler
///
/// Crawls the breed catalog (or loads the last snapshot), then answers one
/// query about the resulting dataset.
#[derive(Parser, Debug)]
#[command(name = "dogfetch")]
#[command(version)]
#[command(about = "Crawl a dog breed catalog and query the dataset", long_about = None)]
#[command(group(ArgGroup::new("query").required(true).args(["id", "name", "all"])))]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Ignore an existing snapshot and crawl again
    #[arg(long)]
    fresh: bool,

    /// Remove expired cache entries before crawling
    #[arg(long)]
    purge_cache: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Print the breed with this id
    #[arg(long)]
    id: Option<String>,

    /// Print the breed with this exact name
    #[arg(long)]
    name: Option<String>,

    /// Print every breed
    #[arg(long)]
    all: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    let dataset = load_dataset(config, &cli).await?;
    print_query(&dataset, &cli)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("dogfetch=info,warn"),
            1 => EnvFilter::new("dogfetch=debug,info"),
            2 => EnvFilter::new("dogfetch=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Runs the crawl, or loads the snapshot, and returns the dataset
async fn load_dataset(config: Config, cli: &Cli) -> anyhow::Result<Dataset> {
    let coordinator = Coordinator::new(config)
        .context("invalid configuration")?
        .with_fresh(cli.fresh);

    if cli.purge_cache {
        let removed = coordinator
            .cache()
            .purge_expired()
            .await
            .context("failed to purge the cache")?;
        tracing::info!("Removed {} expired cache entries", removed);
    }

    let outcome = coordinator.run().await.context("crawl failed")?;

    for page in outcome.failed() {
        tracing::warn!(
            "Not stored: {} ({})",
            page.url,
            page.error.as_deref().unwrap_or("unknown error")
        );
    }

    let stats = coordinator.cache().stats();
    tracing::info!(
        "Cache: {} hits, {} misses, {} failed fetches",
        stats.hits,
        stats.misses,
        stats.failures
    );

    Ok(outcome.dataset)
}

/// Prints the query result as JSON; `null` when nothing matches
fn print_query(dataset: &Dataset, cli: &Cli) -> anyhow::Result<()> {
    let json = if let Some(id) = &cli.id {
        serde_json::to_string_pretty(&dataset.get_by_id(id))?
    } else if let Some(name) = &cli.name {
        serde_json::to_string_pretty(&dataset.get_by_name(name))?
    } else {
        serde_json::to_string_pretty(&dataset.get_all())?
    };

    println!("{}", json);
    Ok(())
}
