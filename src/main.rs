//! Shelfrank main entry point
//!
//! This is the command-line interface for the shelfrank harvest pipeline.

use clap::Parser;
use shelfrank::config::{load_config, validate, Config};
use shelfrank::crawler::{run_pipeline, PipelineOptions};
use shelfrank::output::export_all;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Shelfrank: a ranked-listing harvest pipeline
///
/// Shelfrank walks a paginated product-ranking catalog, enriches each
/// product from its script-rendered detail page, and exports the results
/// as CSV and SQLite.
#[derive(Parser, Debug)]
#[command(name = "shelfrank")]
#[command(version = "0.1.0")]
#[command(about = "A ranked-listing harvest pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Listing pages to crawl at most
    #[arg(long, default_value_t = 1)]
    max_pages: u32,

    /// Reviews to keep per product
    #[arg(long, default_value_t = 10)]
    max_reviews: usize,

    /// Skip the browser-based detail stage
    #[arg(long)]
    no_details: bool,

    /// Skip image downloads
    #[arg(long)]
    no_images: bool,

    /// Override the configured output directory
    #[arg(long, value_name = "DIR")]
    output_dir: Option<String>,

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

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load configuration, or fall back to the built-in defaults
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)?
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if let Some(dir) = cli.output_dir {
        config.output.dir = dir;
        validate(&config)?;
    }

    let options = PipelineOptions {
        max_pages: cli.max_pages,
        max_reviews: cli.max_reviews,
        skip_details: cli.no_details,
        skip_images: cli.no_images,
    };

    // A first Ctrl-C requests a graceful stop; the pipeline finishes its
    // current unit of work and exports what it has
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_signal = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, finishing current work");
            cancel_signal.store(true, Ordering::Relaxed);
        }
    });

    let config = Arc::new(config);
    let records = match run_pipeline(Arc::clone(&config), &options, cancel).await {
        Ok(records) => records,
        Err(e) => {
            tracing::error!("Pipeline failed: {}", e);
            return Err(e.into());
        }
    };

    if records.is_empty() {
        tracing::warn!("no records collected, nothing to export");
        return Ok(());
    }

    export_all(&records, &config.output)?;
    tracing::info!(
        "done: {} records exported to {}",
        records.len(),
        config.output.dir
    );

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shelfrank=info,warn"),
            1 => EnvFilter::new("shelfrank=debug,info"),
            2 => EnvFilter::new("shelfrank=trace,debug"),
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
