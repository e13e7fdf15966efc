//! Crawler module for walking the paginated feed
//!
//! This module contains the core crawling logic, including:
//! - The shared page cursor
//! - Crawl workers with the empty-page stop rule
//! - The supervisor that runs the pool and joins all downloads
//! - The `crawl` entry point that wires session, downloader and pool

mod cursor;
mod supervisor;
#[cfg(test)]
pub(crate) mod testing;
mod worker;

pub use cursor::PageCursor;
pub use supervisor::{CrawlSupervisor, ERROR_SNAPSHOT};
pub use worker::{page_url, CrawlSettings, CrawlWorker, WorkerReport};

use crate::config::Config;
use crate::download::Downloader;
use crate::driver::DriverError;
use crate::output::RunSummary;
use crate::session::{Credentials, HttpSessionProvider, SessionProvider};
use crate::HarvestError;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors that end a single crawl worker
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("worker {worker}: navigation to {url} failed after {attempts} attempt(s): {source}")]
    NavigationExhausted {
        worker: usize,
        url: String,
        attempts: u32,
        source: DriverError,
    },

    #[error("worker {worker}: reading {url} failed: {source}")]
    Driver {
        worker: usize,
        url: String,
        source: DriverError,
    },
}

impl CrawlError {
    pub fn worker(&self) -> usize {
        match self {
            Self::NavigationExhausted { worker, .. } | Self::Driver { worker, .. } => *worker,
        }
    }
}

/// Runs a complete harvest
///
/// This is the main entry point for a run. It will:
/// 1. Log in and open one page handle per worker
/// 2. Build the downloader for `destination`
/// 3. Run the worker pool until every worker stops
/// 4. Wait for every queued download
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `credentials` - Account used to log in
/// * `destination` - Existing directory media is written to
///
/// # Returns
///
/// * `Ok(RunSummary)` - Every worker finished normally
/// * `Err(HarvestError)` - Login failed or at least one worker failed
pub async fn crawl(
    config: &Config,
    credentials: &Credentials,
    destination: PathBuf,
) -> Result<RunSummary, HarvestError> {
    let session = HttpSessionProvider::new(&config.session, &config.filter)?;
    session.login(credentials).await?;

    let drivers = session.open_handles(config.crawler.concurrency as usize);

    let downloader =
        Downloader::from_config(&config.download, destination, &config.session.user_agent)?;
    let settings = CrawlSettings::from_config(&config.crawler)?;

    let supervisor = CrawlSupervisor::new(settings, Arc::new(downloader));
    supervisor.run(drivers).await
}
