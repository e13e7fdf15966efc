use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Likes-Harvester
///
/// Every section and key is optional; missing values fall back to the
/// defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub download: DownloadConfig,
    pub session: SessionConfig,
    pub filter: FilterConfig,
}

/// Page crawling configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// First page index handed out by the cursor
    #[serde(rename = "start-page")]
    pub start_page: u64,

    /// Paginated feed URL; `page=<n>` is appended to it
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Number of crawl workers (one page handle each)
    pub concurrency: u32,

    /// Consecutive empty pages after which a worker stops
    #[serde(rename = "empty-page-limit")]
    pub empty_page_limit: u32,

    /// Total navigation attempts per page
    #[serde(rename = "navigation-attempts")]
    pub navigation_attempts: u32,

    /// Base delay between navigation attempts (milliseconds)
    #[serde(rename = "navigation-retry-delay-ms")]
    pub navigation_retry_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            start_page: 0,
            base_url: "https://www.tumblr.com/likes".to_string(),
            concurrency: 10,
            empty_page_limit: 10,
            navigation_attempts: 3,
            navigation_retry_delay_ms: 1000,
        }
    }
}

/// Media download configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Maximum number of downloads in flight
    pub concurrency: u32,

    /// Total fetch attempts per media file
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Base delay between download attempts (milliseconds)
    #[serde(rename = "retry-base-delay-ms")]
    pub retry_base_delay_ms: u64,

    /// Destination directory; defaults to `<downloads>/tumblr-downloads`
    pub destination: Option<PathBuf>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            concurrency: 500,
            max_attempts: 4,
            retry_base_delay_ms: 500,
            destination: None,
        }
    }
}

/// Login endpoints and form layout
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    #[serde(rename = "login-url")]
    pub login_url: String,

    /// Where a successful login lands
    #[serde(rename = "dashboard-url")]
    pub dashboard_url: String,

    #[serde(rename = "email-field")]
    pub email_field: String,

    #[serde(rename = "password-field")]
    pub password_field: String,

    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            login_url: "https://www.tumblr.com/login".to_string(),
            dashboard_url: "https://www.tumblr.com/dashboard".to_string(),
            email_field: "email".to_string(),
            password_field: "password".to_string(),
            user_agent: format!("likes-harvester/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Request filtering policy installed on every page handle
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Requests whose URL does not contain this domain are aborted
    #[serde(rename = "content-domain")]
    pub content_domain: String,

    /// Requests whose URL contains any of these are aborted
    #[serde(rename = "blocked-fragments")]
    pub blocked_fragments: Vec<String>,

    /// Requests to exactly these URLs are aborted
    #[serde(rename = "blocked-urls")]
    pub blocked_urls: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            content_domain: "tumblr.com".to_string(),
            blocked_fragments: vec!["yahoo.com".to_string()],
            blocked_urls: vec!["https://www.tumblr.com/services/cslog".to_string()],
        }
    }
}
