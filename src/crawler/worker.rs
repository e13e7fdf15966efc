//! Crawl worker
//!
//! A worker owns one page driver and walks the feed one page at a time:
//! claim an index from the shared cursor, load the page, hand its media to
//! the downloader, and stop after enough consecutive empty pages.

use crate::config::CrawlerConfig;
use crate::crawler::{CrawlError, PageCursor};
use crate::download::{Downloader, ResourceLocator};
use crate::driver::{DriverError, PageDriver};
use crate::retry::RetryPolicy;
use crate::state::EmptyStreak;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Per-run crawl settings shared by every worker
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Feed URL; the page index is appended as `page=<idx>`
    pub base_url: Url,

    /// First page index handed out
    pub start_page: u64,

    /// Consecutive empty pages after which a worker stops
    pub empty_page_limit: u32,

    /// Retry budget for one page navigation
    pub navigation: RetryPolicy,
}

impl CrawlSettings {
    pub fn from_config(config: &CrawlerConfig) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: Url::parse(&config.base_url)?,
            start_page: config.start_page,
            empty_page_limit: config.empty_page_limit,
            navigation: RetryPolicy::new(
                config.navigation_attempts,
                Duration::from_millis(config.navigation_retry_delay_ms),
            ),
        })
    }
}

/// Builds the URL of page `idx`
///
/// Existing query pairs on `base` are kept.
///
/// # Examples
///
/// ```
/// use likes_harvester::crawler::page_url;
/// use url::Url;
///
/// let base = Url::parse("https://www.tumblr.com/likes?sort=new").unwrap();
/// assert_eq!(
///     page_url(&base, 4).as_str(),
///     "https://www.tumblr.com/likes?sort=new&page=4"
/// );
/// ```
pub fn page_url(base: &Url, idx: u64) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut().append_pair("page", &idx.to_string());
    url
}

/// What a worker did before it stopped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub slot: usize,

    /// Pages loaded successfully
    pub pages: u64,

    /// Pages that showed the empty-result signal
    pub empty_pages: u64,

    /// Locators handed to the downloader
    pub submitted: u64,
}

/// One member of the crawl pool
pub struct CrawlWorker<D: PageDriver> {
    slot: usize,
    driver: D,
    cursor: Arc<PageCursor>,
    downloader: Arc<Downloader>,
    base_url: Url,
    streak: EmptyStreak,
    navigation: RetryPolicy,
    report: WorkerReport,
}

impl<D: PageDriver> CrawlWorker<D> {
    pub fn new(
        slot: usize,
        driver: D,
        cursor: Arc<PageCursor>,
        downloader: Arc<Downloader>,
        settings: &CrawlSettings,
    ) -> Self {
        Self {
            slot,
            driver,
            cursor,
            downloader,
            base_url: settings.base_url.clone(),
            streak: EmptyStreak::new(settings.empty_page_limit),
            navigation: settings.navigation,
            report: WorkerReport {
                slot,
                ..WorkerReport::default()
            },
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Totals so far; after a failed [`run`](Self::run) this is the partial
    /// count up to the failure
    pub fn report(&self) -> &WorkerReport {
        &self.report
    }

    /// Runs until the empty-page limit is reached
    ///
    /// # Returns
    ///
    /// * `Ok(WorkerReport)` - The worker saw its run of empty pages and closed
    ///   its driver
    /// * `Err(CrawlError)` - A navigation ran out of attempts or a page query
    ///   failed; the driver is left open for diagnostics
    pub async fn run(&mut self) -> Result<WorkerReport, CrawlError> {
        loop {
            let idx = self.cursor.next();
            let url = page_url(&self.base_url, idx);

            tracing::info!("[{}] Opening: {}", self.slot, url);
            self.navigate(&url).await?;
            self.report.pages += 1;

            let empty = self
                .driver
                .has_empty_result()
                .await
                .map_err(|source| CrawlError::Driver {
                    worker: self.slot,
                    url: url.to_string(),
                    source,
                })?;
            self.streak.record(empty);
            if empty {
                self.report.empty_pages += 1;
                tracing::info!(
                    "[{}] No posts found on {} ({}/{})",
                    self.slot,
                    url,
                    self.streak.current(),
                    self.streak.limit()
                );
            }

            let locators =
                self.driver
                    .extract_media_locators()
                    .await
                    .map_err(|source| CrawlError::Driver {
                        worker: self.slot,
                        url: url.to_string(),
                        source,
                    })?;
            for locator in locators {
                tracing::debug!("[{}] Queueing {}", self.slot, locator);
                self.downloader.submit(ResourceLocator::new(locator));
                self.report.submitted += 1;
            }

            if self.streak.is_exhausted() {
                break;
            }
        }

        if let Err(e) = self.driver.close().await {
            tracing::warn!("[{}] Failed to close page handle: {}", self.slot, e);
        }

        tracing::info!(
            "[{}] Done after {} pages ({} media queued)",
            self.slot,
            self.report.pages,
            self.report.submitted
        );
        Ok(self.report.clone())
    }

    /// Loads `url`, retrying transient driver errors within the budget
    async fn navigate(&mut self, url: &Url) -> Result<(), CrawlError> {
        let policy = self.navigation;
        let target = url.clone();
        policy
            .run_with(
                &mut self.driver,
                move |driver, _attempt| {
                    let url = target.clone();
                    Box::pin(async move { driver.navigate(&url).await })
                },
                DriverError::is_transient,
            )
            .await
            .map_err(|(source, attempts)| CrawlError::NavigationExhausted {
                worker: self.slot,
                url: url.to_string(),
                attempts,
                source,
            })
    }
}
