// src/pipeline/crawl.rs

//! Crawl scheduler: resumable, bounded-concurrency page processing.
//!
//! Admission order is ascending page number; completion order is unordered
//! and must not be relied upon. The in-flight bound equals the identity pool
//! cardinality, so concurrency never exceeds the number of distinct egress
//! identities.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use scraper::Html;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Result;
use crate::models::{
    Config, EgressSlot, IdentityPool, LedgerEvent, PageOutput, PageState, PageTask, action,
};
use crate::pipeline::limiter;
use crate::services::{Extract, MediaDownloader, RetryingFetcher};
use crate::storage::{PageStore, ProgressLedger};
use crate::utils::media_file_name;

/// Summary of one crawl run.
#[derive(Debug, Default)]
pub struct CrawlReport {
    pub pages_done: usize,
    pub pages_failed: usize,
    pub pages_skipped: usize,
    pub items_extracted: usize,
    pub media_saved: usize,
    pub cancelled: bool,
}

/// Terminal outcome of one page task.
enum PageOutcome {
    /// Output written
    Done { records: usize, media: usize },
    /// Listing fetch exhausted its budget, or the output write failed
    Failed,
    /// Output already existed; nothing fetched
    Skipped,
    /// Cancellation cut the task short; no output written
    Cancelled,
}

/// Shared, read-only context for page tasks.
struct PageContext<'a> {
    config: &'a Config,
    fetcher: &'a RetryingFetcher,
    media: &'a MediaDownloader,
    extractor: &'a dyn Extract,
    store: &'a PageStore,
    ledger: &'a ProgressLedger,
    cancel: &'a CancellationToken,
}

/// Run the crawl from the resumed state until all pending pages reach a
/// terminal state or cancellation stops admission.
pub async fn run_crawl(
    config: &Config,
    pool: &IdentityPool,
    extractor: &dyn Extract,
    store: &PageStore,
    ledger: Arc<ProgressLedger>,
    cancel: CancellationToken,
) -> Result<CrawlReport> {
    // The ledger is the sole source of resume state.
    let snapshot = ProgressLedger::snapshot(Path::new(&config.output.ledger_dir))?;
    let pending = snapshot.pending(config.catalog.total_pages);

    log::info!(
        "resuming: {} of {} pages pending ({} completed, {} failed previously)",
        pending.len(),
        config.catalog.total_pages,
        snapshot.completed.len(),
        snapshot.failed.len()
    );
    ledger.append(
        LedgerEvent::info(action::RUN)
            .detail("pending", pending.len())
            .detail("total", config.catalog.total_pages)
            .detail("workers", pool.len()),
    );

    let fetcher = Arc::new(RetryingFetcher::new(&config.crawler, Arc::clone(&ledger)));
    let media = MediaDownloader::new(Arc::clone(&fetcher));
    let ctx = PageContext {
        config,
        fetcher: fetcher.as_ref(),
        media: &media,
        extractor,
        store,
        ledger: ledger.as_ref(),
        cancel: &cancel,
    };

    let total_pending = pending.len();
    let mut outcomes = stream::iter(pending.into_iter().enumerate())
        .map(|(index, page)| {
            let task = PageTask {
                page,
                slot: index % pool.len(),
            };
            let ctx = &ctx;
            let slot = pool.assign(task.slot);
            async move { (task.page, process_page(ctx, task, slot).await) }
        })
        .buffer_unordered(pool.len());

    let mut report = CrawlReport::default();
    let mut terminal = 0usize;
    while let Some((page, outcome)) = outcomes.next().await {
        match outcome {
            PageOutcome::Done { records, media } => {
                report.pages_done += 1;
                report.items_extracted += records;
                report.media_saved += media;
                terminal += 1;
                log::info!(
                    "page {} done ({}/{}): {} records, {} media",
                    page,
                    terminal,
                    total_pending,
                    records,
                    media
                );
            }
            PageOutcome::Failed => {
                report.pages_failed += 1;
                terminal += 1;
                log::warn!("page {} failed ({}/{})", page, terminal, total_pending);
            }
            PageOutcome::Skipped => {
                report.pages_skipped += 1;
                terminal += 1;
            }
            PageOutcome::Cancelled => {}
        }
    }

    report.cancelled = cancel.is_cancelled();
    if report.cancelled {
        let deferred = total_pending - terminal;
        log::warn!("run cancelled; {} pages deferred to the next run", deferred);
    }
    ledger.append(
        LedgerEvent::info(action::RUN)
            .detail("done", report.pages_done)
            .detail("failed", report.pages_failed)
            .detail("skipped", report.pages_skipped)
            .detail("cancelled", report.cancelled),
    );

    Ok(report)
}

/// Run one page through the full pipeline:
/// fetch listing → extract links → per item: fetch, extract, save media →
/// persist page output → ledger event.
async fn process_page(
    ctx: &PageContext<'_>,
    task: PageTask,
    slot: &EgressSlot,
) -> PageOutcome {
    let page = task.page;

    // Admission checkpoint: once cancelled, no new page starts.
    if ctx.cancel.is_cancelled() {
        return PageOutcome::Cancelled;
    }
    trace(page, PageState::Assigned);
    log::debug!("page {} assigned to egress {}", page, slot.label());

    // A fully written page is never reprocessed and costs no network calls.
    if ctx.store.page_exists(page) {
        ctx.ledger.append(
            LedgerEvent::info(action::PROCESS_PAGE)
                .for_page(page)
                .detail("skipped", "output exists"),
        );
        log::info!("page {} already written, skipping", page);
        return PageOutcome::Skipped;
    }

    limiter::wait(
        ctx.config.crawler.min_delay_ms,
        ctx.config.crawler.max_delay_ms,
    )
    .await;

    trace(page, PageState::Fetching);
    let listing_url = ctx.config.catalog.listing_url(page);
    let base = match Url::parse(&listing_url) {
        Ok(base) => base,
        Err(e) => {
            log::error!("page {} has an unparseable listing URL: {}", page, e);
            return PageOutcome::Failed;
        }
    };
    let listing = match ctx
        .fetcher
        .fetch_text(&slot.client, &listing_url, action::FETCH_PAGE, page)
        .await
    {
        Ok(body) => body,
        Err(e) => {
            // Terminal listing failure abandons the whole page; the failure
            // event was already appended by the fetcher.
            log::warn!("page {} abandoned: {}", page, e);
            return PageOutcome::Failed;
        }
    };

    trace(page, PageState::Extracting);
    let mut links = {
        let html = Html::parse_document(&listing);
        ctx.extractor.extract_links(&html, &base)
    };
    let mut seen = HashSet::new();
    links.retain(|link| seen.insert(link.clone()));
    log::debug!("page {}: {} item links", page, links.len());

    trace(page, PageState::FetchingItems);
    let mut records = Vec::new();
    let mut media_saved = 0usize;
    for link in &links {
        // Item checkpoint: a cancelled page writes no output and will be
        // reprocessed from scratch on the next run.
        if ctx.cancel.is_cancelled() {
            log::info!("page {} interrupted, discarding partial work", page);
            return PageOutcome::Cancelled;
        }

        let document = match ctx
            .fetcher
            .fetch_text(&slot.client, link, action::FETCH_ITEM, page)
            .await
        {
            Ok(body) => body,
            Err(e) => {
                // Item-level terminal failure: skip the item, keep the page.
                log::warn!("item {} skipped: {}", link, e);
                continue;
            }
        };

        let mut record = {
            let html = Html::parse_document(&document);
            ctx.extractor.extract(&html, link)
        };

        let media_urls = record.media_urls.clone();
        for (index, media_url) in media_urls.iter().enumerate() {
            let file_name = media_file_name(link, media_url, index);
            let dest = ctx.store.media_dir(page).join(&file_name);
            match ctx.media.save(&slot.client, media_url, &dest, page).await {
                Ok(()) => {
                    record
                        .media_paths
                        .push(format!("media/page_{page:04}/{file_name}"));
                    media_saved += 1;
                }
                Err(e) => {
                    // The record is still emitted, just without this asset.
                    log::warn!("media {} for page {} failed: {}", media_url, page, e);
                }
            }
        }

        records.push(record);
    }

    trace(page, PageState::Saving);
    let artifacts_processed = records.len();
    let output = PageOutput::new(page, records);
    if let Err(e) = ctx.store.write_page(&output).await {
        log::error!("page {} output write failed: {}", page, e);
        ctx.ledger.append(
            LedgerEvent::failure(action::PROCESS_PAGE)
                .for_page(page)
                .detail("error", e.to_string()),
        );
        trace(page, PageState::Failed);
        return PageOutcome::Failed;
    }

    ctx.ledger.append(
        LedgerEvent::success(action::PROCESS_PAGE)
            .for_page(page)
            .detail("artifacts_processed", artifacts_processed)
            .detail("links_discovered", links.len())
            .detail("media_saved", media_saved),
    );
    trace(page, PageState::Done);
    PageOutcome::Done {
        records: artifacts_processed,
        media: media_saved,
    }
}

fn trace(page: u32, state: PageState) {
    log::debug!("page {}: -> {}", page, state.as_str());
}
