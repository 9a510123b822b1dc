//! Hamster main entry point
//!
//! This is the command-line interface for the Hamster API harvester.

use anyhow::Context;
use clap::Parser;
use hamster::config::{load_config_with_hash, validate, Config};
use hamster::crawler::crawl;
use hamster::output::print_statistics;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Hamster: a resumable bulk harvester for GitHub-style REST APIs
///
/// Hamster walks organizations, their repositories, their pull requests and
/// every pull request timeline, caching each result set below OUT_DIR so an
/// interrupted run resumes where it stopped.
#[derive(Parser, Debug)]
#[command(name = "hamster")]
#[command(version = "1.0.0")]
#[command(about = "A resumable bulk harvester for paginated REST APIs", long_about = None)]
struct Cli {
    /// API token sent as a bearer credential
    #[arg(value_name = "API_TOKEN")]
    api_token: String,

    /// Directory holding the response cache
    #[arg(value_name = "OUT_DIR")]
    out_dir: PathBuf,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// API base URL (overrides the configuration file)
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Fetch every Query again and overwrite the cache
    #[arg(long)]
    disable_cache: bool,

    /// Concurrent requests per Query (overrides the configuration file)
    #[arg(long, value_name = "N")]
    num_workers: Option<u32>,

    /// Crawl a single organization instead of all of them
    #[arg(long, value_name = "LOGIN")]
    organization: Option<String>,

    /// Write logs to a timestamped file in this directory instead of stderr
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet, cli.log_dir.as_deref())?;

    let config = load_effective_config(&cli)?;

    tracing::info!(
        "Harvesting from {} into {}",
        config.api.base_url,
        cli.out_dir.display()
    );

    match crawl(
        config,
        &cli.api_token,
        &cli.out_dir,
        cli.organization.as_deref(),
    )
    .await
    {
        Ok(stats) => {
            tracing::info!("Crawl completed successfully");
            if !cli.quiet {
                print_statistics(&stats);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            if e.is_rate_limited() {
                tracing::error!("API rate limit exhausted; rerun later to resume from the cache");
            }
            Err(e.into())
        }
    }
}

/// Loads the configuration file (if any) and applies command-line overrides
fn load_effective_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    if let Some(workers) = cli.num_workers {
        config.fetch.num_workers = workers;
    }
    if cli.disable_cache {
        config.cache.enabled = false;
    }

    validate(&config).context("invalid configuration")?;
    Ok(config)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool, log_dir: Option<&Path>) -> anyhow::Result<()> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("hamster=info,warn"),
            1 => EnvFilter::new("hamster=debug,info"),
            2 => EnvFilter::new("hamster=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let path = dir.join(format!(
                "hamster_{}.log",
                chrono::Utc::now().format("%Y-%m-%dT%H-%M-%SZ")
            ));
            let file = File::create(&path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }

    Ok(())
}
