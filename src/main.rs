//! MSE Harvester main entry point
//!
//! Command-line interface for the polite financial-report fetcher.

use anyhow::Context;
use clap::Parser;
use mse_harvester::config::load_settings;
use mse_harvester::crawler::Harvester;
use mse_harvester::output::write_manifest;
use mse_harvester::storage::FileRegistry;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use url::Url;

/// MSE Harvester: a polite financial-report fetcher
///
/// Crawls the stock-exchange listings page, follows each company's
/// navigation to its financials subpage, and downloads the linked PDF
/// reports. Repeat runs revalidate with conditional requests instead of
/// re-downloading unchanged content.
#[derive(Parser, Debug)]
#[command(name = "mse-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A polite financial-report fetcher", long_about = None)]
struct Cli {
    /// Only harvest the named companies (repeatable, case-insensitive)
    #[arg(short, long, value_name = "NAME")]
    company: Vec<String>,

    /// Override the listings page URL
    #[arg(long, value_name = "URL")]
    listings_url: Option<Url>,

    /// Write a markdown run manifest to this path
    #[arg(long, value_name = "PATH")]
    manifest: Option<PathBuf>,

    /// Record downloaded files in this SQLite registry
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Discard stored ETag/Last-Modified validators before running
    #[arg(long)]
    fresh: bool,

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

    setup_logging(cli.verbose, cli.quiet);

    let settings = load_settings().context("failed to load settings")?;
    let listings_url = match &cli.listings_url {
        Some(url) => url.clone(),
        None => settings
            .listings_url()
            .context("invalid listings URL in settings")?,
    };

    if cli.fresh {
        match std::fs::remove_file(&settings.http_state_path) {
            Ok(()) => tracing::info!(
                "Discarded conditional state at {}",
                settings.http_state_path.display()
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).context("failed to discard conditional state");
            }
        }
    }

    tracing::info!("Harvesting from {}", listings_url);
    let harvester = Harvester::new(settings)
        .await
        .context("failed to initialize harvester")?;
    let report = harvester.run_selected(&listings_url, &cli.company).await;

    let harvested = report
        .companies
        .iter()
        .filter(|c| !c.outcome.files().is_empty())
        .count();
    let saved = report.downloaded().count();
    tracing::info!(
        "Run complete: {} companies, {} with files, {} files saved",
        report.companies.len(),
        harvested,
        saved
    );

    if let Some(path) = &cli.manifest {
        write_manifest(&report, path)
            .with_context(|| format!("failed to write manifest to {}", path.display()))?;
        tracing::info!("Manifest written to {}", path.display());
    }

    if let Some(path) = &cli.database {
        let mut registry = FileRegistry::new(path)
            .with_context(|| format!("failed to open registry at {}", path.display()))?;
        let recorded = registry
            .record_report(&report)
            .context("failed to record files in registry")?;
        tracing::info!("Recorded {} file(s) in {}", recorded, path.display());
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("mse_harvester=info,warn"),
            1 => EnvFilter::new("mse_harvester=debug,info"),
            2 => EnvFilter::new("mse_harvester=trace,debug"),
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
