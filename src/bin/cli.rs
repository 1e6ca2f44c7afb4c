//! artcrawl CLI
//!
//! Walks a paginated catalog, extracts one record per item, downloads the
//! referenced media, and resumes from the ledger after interruption.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use artcrawl::{
    error::Result,
    models::{Config, IdentityPool},
    pipeline,
    services::SelectorExtractor,
    storage::{PageStore, ProgressLedger},
};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

/// artcrawl - Catalog Crawler
#[derive(Parser, Debug)]
#[command(name = "artcrawl", version, about = "Resumable catalog crawler")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl all pending catalog pages
    Crawl {
        /// Bypass the identity pool and connect directly (smoke runs)
        #[arg(long)]
        direct: bool,

        /// Worker count when --direct is set
        #[arg(long, default_value_t = 2)]
        direct_workers: usize,
    },

    /// Validate configuration and selectors
    Validate,

    /// Show resume state derived from the ledger
    Status,

    /// Aggregate all page outputs into a single file
    Export {
        /// Destination file
        #[arg(long, default_value = "export.json")]
        out: PathBuf,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(&cli.config)?;

    match cli.command {
        Command::Crawl {
            direct,
            direct_workers,
        } => {
            config.validate()?;

            let pool = if direct {
                log::warn!("--direct: bypassing the identity pool");
                IdentityPool::direct(direct_workers, &config.crawler, &config.headers)?
            } else {
                IdentityPool::from_identities(&config.identities, &config.crawler, &config.headers)?
            };
            let extractor = SelectorExtractor::from_config(&config.selectors)?;
            let store = PageStore::new(&config.output.data_dir);
            let ledger = Arc::new(ProgressLedger::open(Path::new(&config.output.ledger_dir))?);

            log::info!(
                "crawling {} pages with {} workers; ledger at {}",
                config.catalog.total_pages,
                pool.len(),
                ledger.path().display()
            );

            let cancel = CancellationToken::new();
            {
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        log::warn!("interrupt received, finishing in-flight pages...");
                        cancel.cancel();
                    }
                });
            }

            let report =
                pipeline::run_crawl(&config, &pool, &extractor, &store, ledger, cancel).await?;

            log::info!(
                "run finished: {} done, {} failed, {} skipped, {} records, {} media{}",
                report.pages_done,
                report.pages_failed,
                report.pages_skipped,
                report.items_extracted,
                report.media_saved,
                if report.cancelled { " (cancelled)" } else { "" }
            );
        }

        Command::Validate => {
            config.validate()?;
            SelectorExtractor::from_config(&config.selectors)?;
            log::info!(
                "✓ Config OK ({} pages, {} identities, {} sections)",
                config.catalog.total_pages,
                config.identities.len(),
                config.selectors.sections.len()
            );
            if config.identities.is_empty() {
                log::warn!("identity pool is empty: only --direct crawls are possible");
            }
        }

        Command::Status => {
            let snapshot = ProgressLedger::snapshot(Path::new(&config.output.ledger_dir))?;
            let pending = snapshot.pending(config.catalog.total_pages);
            log::info!(
                "{} of {} pages completed, {} failed on their last run, {} pending",
                snapshot.completed.len(),
                config.catalog.total_pages,
                snapshot.failed.len(),
                pending.len()
            );
            if !snapshot.failed.is_empty() {
                log::info!(
                    "failed pages (retried on next crawl): {:?}",
                    snapshot.failed
                );
            }
        }

        Command::Export { out } => {
            let store = PageStore::new(&config.output.data_dir);
            let count = store.export(&out).await?;
            log::info!("exported {} records to {}", count, out.display());
        }
    }

    Ok(())
}
