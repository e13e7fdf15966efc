use crate::crawler::WorkerReport;
use crate::download::DownloadStats;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Aggregate counters for one harvesting run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// When the crawl pool was started
    pub started_at: DateTime<Utc>,

    /// Wall time from pool start to the last download resolving
    pub elapsed: Duration,

    /// Workers spawned
    pub workers: usize,

    /// Workers that ended with a fatal error
    pub failed_workers: usize,

    /// Pages loaded across all workers
    pub pages: u64,

    /// Pages that showed the empty-result signal
    pub empty_pages: u64,

    /// Locators handed to the downloader
    pub submitted: u64,

    /// First page index no worker claimed
    pub next_page: u64,

    pub downloads: DownloadStats,
}

impl RunSummary {
    pub fn new(started_at: DateTime<Utc>, workers: usize) -> Self {
        Self {
            started_at,
            elapsed: Duration::ZERO,
            workers,
            failed_workers: 0,
            pages: 0,
            empty_pages: 0,
            submitted: 0,
            next_page: 0,
            downloads: DownloadStats::default(),
        }
    }

    /// Folds one finished worker into the totals
    pub fn add_report(&mut self, report: &WorkerReport) {
        self.pages += report.pages;
        self.empty_pages += report.empty_pages;
        self.submitted += report.submitted;
    }

    pub fn is_clean(&self) -> bool {
        self.failed_workers == 0
    }
}

/// Prints the summary to stdout in a formatted manner
///
/// # Arguments
///
/// * `summary` - The run summary to display
pub fn print_summary(summary: &RunSummary) {
    println!("=== Harvest Summary ===\n");

    println!("Crawl:");
    println!(
        "  Started: {}",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "  Workers: {} ({} failed)",
        summary.workers, summary.failed_workers
    );
    println!(
        "  Pages loaded: {} ({} empty)",
        summary.pages, summary.empty_pages
    );
    println!("  Next unclaimed page: {}", summary.next_page);
    println!("  Media queued: {}", summary.submitted);
    println!();

    let downloads = &summary.downloads;
    println!("Downloads:");
    println!("  Downloaded: {}", downloads.downloaded);
    println!("  Already present: {}", downloads.skipped);
    println!("  Failed: {}", downloads.failed);
    println!("  Bytes written: {}", downloads.bytes);
    println!();

    // Skipped files count as present on disk
    let total = downloads.total();
    let success_rate = if total > 0 {
        ((downloads.downloaded + downloads.skipped) as f64 / total as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} media present)",
        success_rate,
        downloads.downloaded + downloads.skipped,
        total
    );
    println!("Completed in {:.1}s", summary.elapsed.as_secs_f64());
}
