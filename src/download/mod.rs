//! Media download subsystem
//!
//! This module contains everything between an extracted locator and a file
//! on disk:
//! - Mapping a locator to its deterministic target path
//! - A bounded admission gate for concurrent downloads
//! - Streaming fetch with skip-if-exists and retry
//! - The shared `Downloader` that crawl workers submit into

mod limiter;
mod task;

pub use limiter::ConcurrencyLimiter;
pub use task::{DownloadOutcome, DownloadTask};

use crate::config::DownloadConfig;
use crate::retry::RetryPolicy;
use reqwest::Client;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// Longest file name, in bytes, that common filesystems accept
pub const MAX_FILE_NAME: usize = 255;

/// Errors from a single download attempt
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("request for {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("file name for {} is {len} bytes, over the {MAX_FILE_NAME}-byte limit", path.display())]
    NameTooLong { path: PathBuf, len: usize },
}

impl DownloadError {
    /// Returns true if another attempt may succeed
    ///
    /// | Condition | Retry |
    /// |-----------|-------|
    /// | Invalid locator (request never built) | no |
    /// | Connection, timeout, body stream error | yes |
    /// | HTTP 408, 429, 5xx | yes |
    /// | Other HTTP status | no |
    /// | Target file name too long | no |
    /// | Permission denied, invalid path | no |
    /// | Other filesystem error | yes |
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request { source, .. } => !source.is_builder(),
            Self::Status { status, .. } => {
                *status == 408 || *status == 429 || (500..600).contains(status)
            }
            Self::Io { source, .. } => !matches!(
                source.kind(),
                ErrorKind::PermissionDenied | ErrorKind::InvalidInput
            ),
            Self::NameTooLong { .. } => false,
        }
    }
}

/// Opaque string identifying one media asset
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceLocator(String);

impl ResourceLocator {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name this locator is stored under
    ///
    /// The whole locator is percent-escaped: everything except ASCII
    /// alphanumerics and `-_.~` becomes `%XX`, so no path separator survives.
    /// The two names that would still mean something to the filesystem,
    /// `.` and `..`, have their dots escaped as well.
    pub fn file_name(&self) -> String {
        let escaped = urlencoding::encode(&self.0).into_owned();
        if escaped == "." || escaped == ".." {
            escaped.replace('.', "%2E")
        } else {
            escaped
        }
    }
}

impl fmt::Display for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ResourceLocator {
    fn from(locator: String) -> Self {
        Self(locator)
    }
}

impl From<&str> for ResourceLocator {
    fn from(locator: &str) -> Self {
        Self(locator.to_string())
    }
}

/// Target path for `locator` inside `destination`
///
/// A pure function: equal locators always map to the same path.
pub fn target_path(destination: &Path, locator: &ResourceLocator) -> PathBuf {
    destination.join(locator.file_name())
}

/// Aggregate download counters for a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadStats {
    pub downloaded: u64,
    pub skipped: u64,
    pub failed: u64,
    pub bytes: u64,
}

impl DownloadStats {
    pub fn record(&mut self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Downloaded { bytes } => {
                self.downloaded += 1;
                self.bytes += bytes;
            }
            DownloadOutcome::Skipped => self.skipped += 1,
            DownloadOutcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.downloaded + self.skipped + self.failed
    }
}

/// Shared submission point for media downloads
///
/// Crawl workers hand every extracted locator to `submit`, which returns
/// immediately; the download runs once the limiter admits it. Finished
/// downloads are folded into the running totals on each submit, so only
/// unfinished ones are held until `finish`.
pub struct Downloader {
    client: Client,
    destination: PathBuf,
    policy: RetryPolicy,
    limiter: ConcurrencyLimiter<DownloadOutcome>,
    submitted: AtomicU64,
    stats: Mutex<DownloadStats>,
}

impl Downloader {
    pub fn new(
        client: Client,
        destination: PathBuf,
        capacity: usize,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            client,
            destination,
            policy,
            limiter: ConcurrencyLimiter::new(capacity),
            submitted: AtomicU64::new(0),
            stats: Mutex::new(DownloadStats::default()),
        }
    }

    /// Builds a downloader with its own HTTP client from configuration
    pub fn from_config(
        config: &DownloadConfig,
        destination: PathBuf,
        user_agent: &str,
    ) -> Result<Self, reqwest::Error> {
        let client = build_media_client(user_agent)?;
        let policy = RetryPolicy::new(
            config.max_attempts,
            Duration::from_millis(config.retry_base_delay_ms),
        );
        Ok(Self::new(
            client,
            destination,
            config.concurrency as usize,
            policy,
        ))
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Number of locators handed to `submit` so far
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Downloads currently holding an admission slot
    pub fn in_flight(&self) -> usize {
        self.limiter.in_flight()
    }

    /// Downloads submitted but not yet folded into the totals
    pub fn outstanding(&self) -> usize {
        self.limiter.outstanding()
    }

    /// Queues a download for `locator` without waiting for it
    pub fn submit(&self, locator: ResourceLocator) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        self.fold(self.limiter.reap());

        let client = self.client.clone();
        let policy = self.policy;
        let mut task = DownloadTask::new(locator, &self.destination);
        self.limiter
            .submit(async move { task.run(&client, &policy).await });
    }

    /// Waits for every submitted download and returns the run's totals
    pub async fn finish(&self) -> DownloadStats {
        let remaining = self.limiter.join_all().await;
        self.fold(remaining);
        self.lock_stats().clone()
    }

    fn fold(&self, outcomes: Vec<DownloadOutcome>) {
        if outcomes.is_empty() {
            return;
        }
        let mut stats = self.lock_stats();
        for outcome in &outcomes {
            stats.record(outcome);
        }
    }

    fn lock_stats(&self) -> MutexGuard<'_, DownloadStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builds the HTTP client used for media fetches
pub fn build_media_client(user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}
