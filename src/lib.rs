//! Likes-Harvester: a media downloader for paginated feeds
//!
//! This crate crawls a paginated, authenticated content feed with a pool of
//! workers, extracts media locators from every page and downloads them into a
//! local directory with bounded concurrency, retry and skip-if-exists dedup.

pub mod config;
pub mod crawler;
pub mod download;
pub mod driver;
pub mod output;
pub mod retry;
pub mod session;
pub mod state;

use thiserror::Error;

/// Main error type for Likes-Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] session::SessionError),

    #[error("Page driver error: {0}")]
    Driver(#[from] driver::DriverError),

    #[error("Crawl error: {0}")]
    Crawl(#[from] crawler::CrawlError),

    #[error("{failed} of {total} crawl workers failed")]
    WorkersFailed { failed: usize, total: usize },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// Result type alias for Likes-Harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlSupervisor, PageCursor};
pub use download::{ConcurrencyLimiter, DownloadTask, Downloader, ResourceLocator};
pub use driver::PageDriver;
pub use state::DownloadState;
