//! HTTP page driver
//!
//! Fetches feed documents with reqwest and answers page queries by parsing
//! the markup with scraper. There is no renderer, so pages that build their
//! posts client-side will look empty to this driver.

use crate::driver::extract::{extract_media_locators, has_empty_result};
use crate::driver::filter::{RequestFilter, ResourceKind};
use crate::driver::{DriverError, PageDriver};
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use url::Url;

/// The document currently shown by a handle
#[derive(Debug, Clone)]
struct LoadedPage {
    /// Final URL after redirects
    url: Url,
    html: String,
}

/// Page handle backed by a plain HTTP client
///
/// Handles created from one session share the client and therefore its
/// cookie store.
pub struct HttpPageDriver {
    client: Client,
    filter: RequestFilter,
    current: Option<LoadedPage>,
}

impl HttpPageDriver {
    pub fn new(client: Client, filter: RequestFilter) -> Self {
        Self {
            client,
            filter,
            current: None,
        }
    }

    fn loaded(&self) -> Result<&LoadedPage, DriverError> {
        self.current.as_ref().ok_or(DriverError::NoPage)
    }
}

#[async_trait]
impl PageDriver for HttpPageDriver {
    async fn navigate(&mut self, url: &Url) -> Result<(), DriverError> {
        if self.filter.should_abort(url.as_str(), ResourceKind::Document) {
            return Err(DriverError::Blocked {
                url: url.to_string(),
            });
        }

        self.current = None;

        let request_err = |source: reqwest::Error| DriverError::Request {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(request_err)?;

        let status = response.status();
        let final_url = response.url().clone();
        let html = response.text().await.map_err(request_err)?;

        // Error pages are kept so a diagnostic snapshot can show them
        self.current = Some(LoadedPage {
            url: final_url,
            html,
        });

        if !status.is_success() {
            return Err(DriverError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(())
    }

    async fn has_empty_result(&mut self) -> Result<bool, DriverError> {
        Ok(has_empty_result(&self.loaded()?.html))
    }

    async fn extract_media_locators(&mut self) -> Result<Vec<String>, DriverError> {
        let page = self.loaded()?;
        Ok(extract_media_locators(&page.html, &page.url))
    }

    /// Writes the loaded markup next to `path` with an `.html` extension
    async fn screenshot(&mut self, path: &Path) -> Result<PathBuf, DriverError> {
        let page = self.loaded()?;
        let snapshot = path.with_extension("html");
        let content = format!("<!-- {} -->\n{}", page.url, page.html);
        tokio::fs::write(&snapshot, content).await?;
        Ok(snapshot)
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.current = None;
        Ok(())
    }
}
