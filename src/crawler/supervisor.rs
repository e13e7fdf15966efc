//! Crawl supervisor
//!
//! Owns the worker pool for one run. Each page handle becomes one worker
//! task; all of them share a cursor and the downloader. The supervisor
//! captures a diagnostic snapshot when a worker dies, waits for every worker
//! and every queued download, and reports the totals.

use crate::crawler::worker::{CrawlSettings, CrawlWorker, WorkerReport};
use crate::crawler::{CrawlError, PageCursor};
use crate::download::Downloader;
use crate::driver::PageDriver;
use crate::output::RunSummary;
use crate::HarvestError;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// File name of the snapshot taken when a worker fails
pub const ERROR_SNAPSHOT: &str = "__ERROR__.png";

/// Runs a pool of crawl workers to completion
pub struct CrawlSupervisor {
    settings: CrawlSettings,
    cursor: Arc<PageCursor>,
    downloader: Arc<Downloader>,
}

impl CrawlSupervisor {
    pub fn new(settings: CrawlSettings, downloader: Arc<Downloader>) -> Self {
        let cursor = Arc::new(PageCursor::new(settings.start_page));
        Self {
            settings,
            cursor,
            downloader,
        }
    }

    /// Path the diagnostic snapshot is requested at
    pub fn snapshot_path(&self) -> PathBuf {
        self.downloader.destination().join(ERROR_SNAPSHOT)
    }

    /// Crawls with one worker per driver and waits for all downloads
    ///
    /// Sibling workers keep running when one fails. The downloads queued by
    /// every worker, failed ones included, are always joined before this
    /// returns.
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - Every worker reached its empty-page limit
    /// * `Err(HarvestError::WorkersFailed)` - At least one worker failed
    pub async fn run<D>(&self, drivers: Vec<D>) -> Result<RunSummary, HarvestError>
    where
        D: PageDriver + 'static,
    {
        let summary = self.run_to_summary(drivers).await;

        if summary.is_clean() {
            Ok(summary)
        } else {
            tracing::warn!(
                "Run ended with failures: {} pages, {} downloaded, {} skipped, {} failed downloads",
                summary.pages,
                summary.downloads.downloaded,
                summary.downloads.skipped,
                summary.downloads.failed
            );
            Err(HarvestError::WorkersFailed {
                failed: summary.failed_workers,
                total: summary.workers,
            })
        }
    }

    /// Same as [`run`](Self::run) but always returns the totals
    pub async fn run_to_summary<D>(&self, drivers: Vec<D>) -> RunSummary
    where
        D: PageDriver + 'static,
    {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut summary = RunSummary::new(started_at, drivers.len());

        let mut workers = JoinSet::new();
        for (slot, driver) in drivers.into_iter().enumerate() {
            let worker = CrawlWorker::new(
                slot,
                driver,
                Arc::clone(&self.cursor),
                Arc::clone(&self.downloader),
                &self.settings,
            );
            let snapshot = self.snapshot_path();
            workers.spawn(supervise(worker, snapshot));
        }

        tracing::info!("Started {} crawl workers", summary.workers);

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((report, failure)) => {
                    summary.add_report(&report);
                    if failure.is_some() {
                        summary.failed_workers += 1;
                    }
                }
                Err(e) => {
                    tracing::error!("Crawl worker task panicked: {}", e);
                    summary.failed_workers += 1;
                }
            }
        }

        tracing::info!(
            "All workers finished, waiting for {} queued downloads",
            self.downloader.submitted()
        );
        summary.downloads = self.downloader.finish().await;
        summary.submitted = self.downloader.submitted();
        summary.next_page = self.cursor.peek();
        summary.elapsed = start.elapsed();
        summary
    }
}

/// Runs one worker and captures a snapshot if it fails
///
/// The report covers the pages the worker got through either way.
async fn supervise<D: PageDriver>(
    mut worker: CrawlWorker<D>,
    snapshot: PathBuf,
) -> (WorkerReport, Option<CrawlError>) {
    let result = worker.run().await;

    if let Err(e) = &result {
        let slot = worker.slot();
        match worker.driver_mut().screenshot(&snapshot).await {
            Ok(written) => tracing::error!(
                "[{}] {}; page state saved to {}",
                slot,
                e,
                written.display()
            ),
            Err(shot_err) => tracing::error!(
                "[{}] {}; could not save page state: {}",
                slot,
                e,
                shot_err
            ),
        }
    }

    (worker.report().clone(), result.err())
}
