//! Request filtering policy for page handles
//!
//! Page renders only need the feed documents and their scripts; media is
//! already captured by extraction and everything off the content domain is
//! noise. The filter is installed once per handle and consulted for every
//! request the handle issues.

use crate::config::FilterConfig;
use url::Url;

/// Kind of resource a request is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Document,
    Stylesheet,
    Script,
    Xhr,
    Image,
    Video,
    Font,
    Other,
}

impl ResourceKind {
    /// Media and fonts are never needed to render a feed page
    fn is_heavy_asset(&self) -> bool {
        matches!(self, Self::Image | Self::Video | Self::Font)
    }
}

/// Decides which requests a page handle lets through
#[derive(Debug, Clone)]
pub struct RequestFilter {
    content_domain: String,
    blocked_fragments: Vec<String>,
    blocked_urls: Vec<String>,
}

impl RequestFilter {
    pub fn new(
        content_domain: impl Into<String>,
        blocked_fragments: Vec<String>,
        blocked_urls: Vec<String>,
    ) -> Self {
        Self {
            content_domain: content_domain.into().to_lowercase(),
            blocked_fragments,
            blocked_urls,
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(
            config.content_domain.clone(),
            config.blocked_fragments.clone(),
            config.blocked_urls.clone(),
        )
    }

    /// Returns true if the request must be aborted
    ///
    /// # Abort Rules
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Image, video or font | Abort |
    /// | Host outside the content domain | Abort |
    /// | URL contains a blocked fragment | Abort |
    /// | URL equals a blocked URL | Abort |
    /// | Unparseable URL | Abort |
    /// | Anything else | Continue |
    pub fn should_abort(&self, url: &str, kind: ResourceKind) -> bool {
        if kind.is_heavy_asset() {
            return true;
        }

        let on_content_domain = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
            .map(|host| matches_domain(&self.content_domain, &host))
            .unwrap_or(false);
        if !on_content_domain {
            return true;
        }

        self.blocked_fragments.iter().any(|f| url.contains(f.as_str()))
            || self.blocked_urls.iter().any(|u| u == url)
    }

    pub fn allows(&self, url: &str, kind: ResourceKind) -> bool {
        !self.should_abort(url, kind)
    }
}

/// Checks if a host is the content domain or one of its subdomains
///
/// "tumblr.com" matches "tumblr.com", "www.tumblr.com" and
/// "64.media.tumblr.com" but not "nottumblr.com".
fn matches_domain(domain: &str, host: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}
