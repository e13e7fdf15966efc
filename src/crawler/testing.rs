//! Scripted page driver for crawl tests

use crate::driver::{DriverError, PageDriver};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

/// What a scripted page looks like
#[derive(Debug, Clone)]
pub(crate) enum StubPage {
    /// A page with posts carrying these locators
    Posts(Vec<String>),
    /// The "no posts found" page
    Empty,
    /// Navigation fails `times` times, then shows `then`
    Flaky {
        times: u32,
        status: u16,
        then: Box<StubPage>,
    },
}

/// Calls observed across every clone of a driver
#[derive(Debug, Default)]
pub(crate) struct StubLog {
    pub navigations: AtomicUsize,
    pub closes: AtomicUsize,
    pub screenshots: Mutex<Vec<PathBuf>>,
    pub visited: Mutex<Vec<u64>>,
}

/// Driver answering from a page-index script
///
/// Indices missing from the script are empty pages.
pub(crate) struct StubDriver {
    script: Arc<HashMap<u64, StubPage>>,
    log: Arc<StubLog>,
    failures: HashMap<u64, u32>,
    current: Option<StubPage>,
}

impl StubDriver {
    pub fn new(script: HashMap<u64, StubPage>) -> Self {
        Self::shared(Arc::new(script), Arc::new(StubLog::default()))
    }

    pub fn shared(script: Arc<HashMap<u64, StubPage>>, log: Arc<StubLog>) -> Self {
        Self {
            script,
            log,
            failures: HashMap::new(),
            current: None,
        }
    }

    pub fn log(&self) -> Arc<StubLog> {
        Arc::clone(&self.log)
    }
}

fn page_index(url: &Url) -> u64 {
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
        .unwrap_or(u64::MAX)
}

#[async_trait]
impl PageDriver for StubDriver {
    async fn navigate(&mut self, url: &Url) -> Result<(), DriverError> {
        self.log.navigations.fetch_add(1, Ordering::SeqCst);
        let idx = page_index(url);

        let mut page = self.script.get(&idx).cloned().unwrap_or(StubPage::Empty);
        if let StubPage::Flaky {
            times,
            status,
            then,
        } = page
        {
            let failed = self.failures.entry(idx).or_insert(0);
            if *failed < times {
                *failed += 1;
                self.current = None;
                return Err(DriverError::Status {
                    url: url.to_string(),
                    status,
                });
            }
            page = *then;
        }

        self.log.visited.lock().unwrap().push(idx);
        self.current = Some(page);
        Ok(())
    }

    async fn has_empty_result(&mut self) -> Result<bool, DriverError> {
        match &self.current {
            Some(StubPage::Empty) => Ok(true),
            Some(_) => Ok(false),
            None => Err(DriverError::NoPage),
        }
    }

    async fn extract_media_locators(&mut self) -> Result<Vec<String>, DriverError> {
        match &self.current {
            Some(StubPage::Posts(locators)) => Ok(locators.clone()),
            Some(_) => Ok(Vec::new()),
            None => Err(DriverError::NoPage),
        }
    }

    async fn screenshot(&mut self, path: &Path) -> Result<PathBuf, DriverError> {
        self.log.screenshots.lock().unwrap().push(path.to_path_buf());
        Ok(path.to_path_buf())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
