use crate::config::types::{Config, CrawlerConfig, DownloadConfig, FilterConfig, SessionConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_download_config(&config.download)?;
    validate_session_config(&config.session)?;
    validate_filter_config(&config.filter)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_http_url("base-url", &config.base_url)?;

    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "crawler concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.empty_page_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "empty-page-limit must be >= 1, got {}",
            config.empty_page_limit
        )));
    }

    if config.navigation_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "navigation-attempts must be >= 1, got {}",
            config.navigation_attempts
        )));
    }

    Ok(())
}

/// Validates download configuration
fn validate_download_config(config: &DownloadConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 {
        return Err(ConfigError::Validation(format!(
            "download concurrency must be >= 1, got {}",
            config.concurrency
        )));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "download max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if let Some(destination) = &config.destination {
        if destination.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "download destination cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates session configuration
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    validate_http_url("login-url", &config.login_url)?;
    validate_http_url("dashboard-url", &config.dashboard_url)?;

    if config.email_field.is_empty() || config.password_field.is_empty() {
        return Err(ConfigError::Validation(
            "login form field names cannot be empty".to_string(),
        ));
    }

    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the request filter
fn validate_filter_config(config: &FilterConfig) -> Result<(), ConfigError> {
    let domain = config.content_domain.as_str();

    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "content-domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "content-domain '{}' contains invalid characters",
            domain
        )));
    }

    if config.blocked_fragments.iter().any(|f| f.is_empty()) {
        return Err(ConfigError::InvalidPattern(
            "blocked-fragments cannot contain an empty entry".to_string(),
        ));
    }

    Ok(())
}

/// Checks that a URL parses and uses http or https
fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", key, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            key, value
        )));
    }

    Ok(())
}
