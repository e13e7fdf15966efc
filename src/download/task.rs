//! Fetch-and-persist logic for a single media locator
//!
//! A task first checks whether its target file already exists and, if so,
//! finishes without touching the network. Otherwise it streams the body into
//! a temporary sibling file and renames it onto the target once complete.
//! Every failed attempt removes its temporary file, so a task that runs out
//! of attempts leaves nothing behind.

use crate::download::{target_path, DownloadError, ResourceLocator, MAX_FILE_NAME};
use crate::retry::RetryPolicy;
use crate::state::DownloadState;
use futures_util::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Source of unique temporary file suffixes within this process
static PARTIAL_SEQ: AtomicU64 = AtomicU64::new(0);

/// How a download task ended
#[derive(Debug)]
pub enum DownloadOutcome {
    /// The file was fetched and written
    Downloaded { bytes: u64 },

    /// The file was already on disk; no request was made
    Skipped,

    /// Every attempt failed
    Failed { error: DownloadError },
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// One locator on its way to disk
#[derive(Debug)]
pub struct DownloadTask {
    locator: ResourceLocator,
    target: PathBuf,
    state: DownloadState,
}

impl DownloadTask {
    /// Creates a pending task writing into `destination`
    pub fn new(locator: ResourceLocator, destination: &Path) -> Self {
        let target = target_path(destination, &locator);
        Self {
            locator,
            target,
            state: DownloadState::Pending,
        }
    }

    pub fn locator(&self) -> &ResourceLocator {
        &self.locator
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn state(&self) -> DownloadState {
        self.state
    }

    /// Runs the task to a terminal state
    ///
    /// Failures are logged and returned as `DownloadOutcome::Failed`; they are
    /// never raised to the caller.
    pub async fn run(&mut self, client: &Client, policy: &RetryPolicy) -> DownloadOutcome {
        self.transition(DownloadState::Running);

        if let Err(error) = check_name_length(&self.target) {
            tracing::warn!("Cannot store {}: {}", self.locator, error);
            self.transition(DownloadState::Failed);
            return DownloadOutcome::Failed { error };
        }

        if tokio::fs::try_exists(&self.target).await.unwrap_or(false) {
            tracing::trace!("Already downloaded: {}", self.locator);
            self.transition(DownloadState::Succeeded);
            return DownloadOutcome::Skipped;
        }

        tracing::debug!("Downloading: {}", self.locator);

        let this = &*self;
        let result = policy
            .run(
                |attempt| this.fetch_once(client, attempt),
                DownloadError::is_transient,
            )
            .await;

        match result {
            Ok(bytes) => {
                self.transition(DownloadState::Succeeded);
                DownloadOutcome::Downloaded { bytes }
            }
            Err((error, attempts)) => {
                tracing::warn!(
                    "Giving up on {} after {} attempt(s): {}",
                    self.locator,
                    attempts,
                    error
                );
                self.transition(DownloadState::Failed);
                DownloadOutcome::Failed { error }
            }
        }
    }

    /// One complete fetch: request, stream to a temporary file, rename
    async fn fetch_once(&self, client: &Client, attempt: u32) -> Result<u64, DownloadError> {
        let url = self.locator.as_str();

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|source| DownloadError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let partial = partial_path(&self.target);
        let written = async {
            let bytes = stream_to_file(response, url, &partial).await?;
            tokio::fs::rename(&partial, &self.target)
                .await
                .map_err(|source| DownloadError::Io {
                    path: self.target.clone(),
                    source,
                })?;
            Ok(bytes)
        }
        .await;

        if written.is_err() {
            tracing::debug!(attempt, path = %partial.display(), "cleaning up partial file after error");
            let _ = tokio::fs::remove_file(&partial).await;
        }

        written
    }

    fn transition(&mut self, next: DownloadState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal download transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
    }
}

/// Fails if the target's file name is longer than filesystems allow
fn check_name_length(target: &Path) -> Result<(), DownloadError> {
    let len = target.file_name().map_or(0, |name| name.len());
    if len > MAX_FILE_NAME {
        return Err(DownloadError::NameTooLong {
            path: target.to_path_buf(),
            len,
        });
    }
    Ok(())
}

/// Temporary file next to `target`
///
/// The name has a fixed short length, so it fits wherever the target does.
/// `%` is never followed by `p` in an escaped locator, so it cannot collide
/// with any target file.
fn partial_path(target: &Path) -> PathBuf {
    let seq = PARTIAL_SEQ.fetch_add(1, Ordering::Relaxed);
    target.with_file_name(format!("%part-{}-{}", std::process::id(), seq))
}

/// Streams a response body to `path`, returning bytes written
async fn stream_to_file(
    response: reqwest::Response,
    url: &str,
    path: &Path,
) -> Result<u64, DownloadError> {
    let io_err = |source: std::io::Error| DownloadError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).await.map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|source| DownloadError::Request {
            url: url.to_string(),
            source,
        })?;

        writer.write_all(&chunk).await.map_err(io_err)?;
        bytes_written += chunk.len() as u64;
    }

    writer.flush().await.map_err(io_err)?;

    Ok(bytes_written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::ZERO)
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/cat.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"meow".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dest = TempDir::new().unwrap();
        let locator = ResourceLocator::new(format!("{}/media/cat.jpg", server.uri()));
        let mut task = DownloadTask::new(locator, dest.path());

        let outcome = task.run(&Client::new(), &policy(4)).await;

        assert!(matches!(outcome, DownloadOutcome::Downloaded { bytes: 4 }));
        assert_eq!(task.state(), DownloadState::Succeeded);
        assert_eq!(std::fs::read(task.target()).unwrap(), b"meow");
        assert_eq!(dir_entries(dest.path()).len(), 1);
    }

    #[tokio::test]
    async fn test_second_download_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/dog.gif"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"woof".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dest = TempDir::new().unwrap();
        let url = format!("{}/media/dog.gif", server.uri());
        let client = Client::new();

        let mut first = DownloadTask::new(ResourceLocator::new(url.clone()), dest.path());
        let mut second = DownloadTask::new(ResourceLocator::new(url), dest.path());

        assert!(matches!(
            first.run(&client, &policy(4)).await,
            DownloadOutcome::Downloaded { .. }
        ));
        assert!(matches!(
            second.run(&client, &policy(4)).await,
            DownloadOutcome::Skipped
        ));
        assert_eq!(second.state(), DownloadState::Succeeded);
        assert_eq!(dir_entries(dest.path()).len(), 1);
        // MockServer verifies `expect(1)` on drop
    }

    #[tokio::test]
    async fn test_transient_failure_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/flaky.png"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/media/flaky.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 2048]))
            .expect(1)
            .mount(&server)
            .await;

        let dest = TempDir::new().unwrap();
        let locator = ResourceLocator::new(format!("{}/media/flaky.png", server.uri()));
        let mut task = DownloadTask::new(locator, dest.path());

        let outcome = task.run(&Client::new(), &policy(4)).await;

        assert!(matches!(outcome, DownloadOutcome::Downloaded { bytes: 2048 }));
        assert_eq!(std::fs::read(task.target()).unwrap(), vec![7u8; 2048]);
        assert_eq!(dir_entries(dest.path()).len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_leave_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/gone.mp4"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let dest = TempDir::new().unwrap();
        let locator = ResourceLocator::new(format!("{}/media/gone.mp4", server.uri()));
        let mut task = DownloadTask::new(locator, dest.path());

        let outcome = task.run(&Client::new(), &policy(3)).await;

        assert!(matches!(
            outcome,
            DownloadOutcome::Failed {
                error: DownloadError::Status { status: 503, .. }
            }
        ));
        assert_eq!(task.state(), DownloadState::Failed);
        assert!(!task.target().exists());
        assert!(dir_entries(dest.path()).is_empty());
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let dest = TempDir::new().unwrap();
        let locator = ResourceLocator::new(format!("{}/media/missing.jpg", server.uri()));
        let mut task = DownloadTask::new(locator, dest.path());

        let outcome = task.run(&Client::new(), &policy(4)).await;
        assert!(!outcome.is_success());
        assert!(dir_entries(dest.path()).is_empty());
    }

    /// Locator under `/media/` on `server` whose file name is `len` bytes
    fn locator_with_name_len(server: &MockServer, len: usize) -> (String, ResourceLocator) {
        let prefix = ResourceLocator::new(format!("{}/media/", server.uri()))
            .file_name()
            .len();
        let stem = "a".repeat(len - prefix);
        let locator = ResourceLocator::new(format!("{}/media/{}", server.uri(), stem));
        assert_eq!(locator.file_name().len(), len);
        (format!("/media/{}", stem), locator)
    }

    #[tokio::test]
    async fn test_name_near_limit_downloads() {
        let server = MockServer::start().await;
        let dest = TempDir::new().unwrap();
        let (media_path, locator) = locator_with_name_len(&server, 250);
        Mock::given(method("GET"))
            .and(path(media_path))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"long".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let mut task = DownloadTask::new(locator, dest.path());
        let outcome = task.run(&Client::new(), &policy(4)).await;

        assert!(matches!(outcome, DownloadOutcome::Downloaded { bytes: 4 }));
        assert_eq!(std::fs::read(task.target()).unwrap(), b"long");
        assert_eq!(dir_entries(dest.path()).len(), 1);
    }

    #[tokio::test]
    async fn test_name_over_limit_fails_without_request() {
        let server = MockServer::start().await;
        let dest = TempDir::new().unwrap();
        let (_, locator) = locator_with_name_len(&server, MAX_FILE_NAME + 40);
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut task = DownloadTask::new(locator, dest.path());
        let outcome = task.run(&Client::new(), &policy(4)).await;

        assert!(matches!(
            outcome,
            DownloadOutcome::Failed {
                error: DownloadError::NameTooLong { len: 295, .. }
            }
        ));
        assert_eq!(task.state(), DownloadState::Failed);
        assert!(dir_entries(dest.path()).is_empty());
    }

    #[test]
    fn test_partial_path_is_short_unique_sibling() {
        let long_name = "a".repeat(MAX_FILE_NAME);
        let target = Path::new("/tmp/harvest").join(&long_name);
        let a = partial_path(&target);
        let b = partial_path(&target);

        assert_ne!(a, b);
        assert_eq!(a.parent(), target.parent());
        let name = a.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("%part-"));
        assert!(name.len() < 64);
    }
}
