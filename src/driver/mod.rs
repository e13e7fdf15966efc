//! Page driver abstraction
//!
//! A page driver is one controllable handle onto the remote feed: it can
//! navigate, answer questions about the loaded page and capture a
//! diagnostic snapshot. The crawl core only talks to the [`PageDriver`]
//! trait, so any engine able to render pages can sit behind it. The crate
//! ships [`HttpPageDriver`], which fetches documents with reqwest and queries
//! them with scraper.

mod extract;
mod filter;
mod http;

pub use extract::{extract_media_locators, has_empty_result};
pub use filter::{RequestFilter, ResourceKind};
pub use http::HttpPageDriver;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Errors raised by a page driver
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("request for {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} blocked by the request filter")]
    Blocked { url: String },

    #[error("no page has been loaded")]
    NoPage,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverError {
    /// Returns true if navigating again may succeed
    ///
    /// Network failures and HTTP 408, 429 and 5xx are transient. Filtered
    /// requests, other statuses and local errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request { source, .. } => !source.is_builder(),
            Self::Status { status, .. } => {
                *status == 408 || *status == 429 || (500..600).contains(status)
            }
            Self::Blocked { .. } | Self::NoPage | Self::Io(_) => false,
        }
    }
}

/// A controllable view onto the remote feed
///
/// Each handle is owned by exactly one crawl worker. Every method is a
/// suspension point.
#[async_trait]
pub trait PageDriver: Send {
    /// Loads `url`, returning once the page has settled
    async fn navigate(&mut self, url: &Url) -> Result<(), DriverError>;

    /// Returns true if the loaded page says there are no posts
    async fn has_empty_result(&mut self) -> Result<bool, DriverError>;

    /// Returns the media locators on the loaded page, in document order
    async fn extract_media_locators(&mut self) -> Result<Vec<String>, DriverError>;

    /// Captures the current page state near `path`
    ///
    /// Returns the path actually written, which may differ in extension
    /// when the driver cannot produce an image.
    async fn screenshot(&mut self, path: &Path) -> Result<PathBuf, DriverError>;

    /// Releases the handle
    async fn close(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let status = |status| DriverError::Status {
            url: "https://www.tumblr.com/likes?page=1".to_string(),
            status,
        };
        assert!(status(502).is_transient());
        assert!(status(429).is_transient());
        assert!(status(408).is_transient());
        assert!(!status(404).is_transient());
        assert!(!status(401).is_transient());
    }

    #[test]
    fn test_local_errors_not_transient() {
        assert!(!DriverError::NoPage.is_transient());
        assert!(!DriverError::Blocked {
            url: "https://ads.example.com/".to_string()
        }
        .is_transient());
    }
}
