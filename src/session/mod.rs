//! Authenticated session setup
//!
//! A [`SessionProvider`] turns credentials into page handles that are
//! already logged in. [`HttpSessionProvider`] performs a form login with a
//! cookie-storing reqwest client and hands out [`HttpPageDriver`]s that share
//! the authenticated cookie jar.

use crate::config::{FilterConfig, SessionConfig};
use crate::driver::{HttpPageDriver, PageDriver, RequestFilter};
use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised while logging in
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("login request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("login was not accepted (landed on {landed})")]
    Rejected { landed: String },

    #[error("invalid session URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
}

/// Account credentials
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Produces authenticated page handles
#[async_trait]
pub trait SessionProvider: Send + Sync {
    type Driver: PageDriver + 'static;

    /// Establishes an authenticated session
    async fn login(&self, credentials: &Credentials) -> Result<(), SessionError>;

    /// Opens `count` independent page handles inside the session
    fn open_handles(&self, count: usize) -> Vec<Self::Driver>;
}

/// Form login over HTTP
pub struct HttpSessionProvider {
    client: Client,
    login_url: Url,
    dashboard_url: Url,
    email_field: String,
    password_field: String,
    filter: FilterConfig,
}

impl HttpSessionProvider {
    /// Builds the provider and its cookie-storing client
    pub fn new(session: &SessionConfig, filter: &FilterConfig) -> Result<Self, SessionError> {
        let parse = |raw: &str| {
            Url::parse(raw).map_err(|source| SessionError::InvalidUrl {
                url: raw.to_string(),
                source,
            })
        };
        let login_url = parse(&session.login_url)?;
        let dashboard_url = parse(&session.dashboard_url)?;

        let client = Client::builder()
            .user_agent(session.user_agent.as_str())
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|source| SessionError::Request {
                url: login_url.to_string(),
                source,
            })?;

        Ok(Self {
            client,
            login_url,
            dashboard_url,
            email_field: session.email_field.clone(),
            password_field: session.password_field.clone(),
            filter: filter.clone(),
        })
    }

    fn request_err(&self, source: reqwest::Error) -> SessionError {
        SessionError::Request {
            url: self.login_url.to_string(),
            source,
        }
    }
}

#[async_trait]
impl SessionProvider for HttpSessionProvider {
    type Driver = HttpPageDriver;

    async fn login(&self, credentials: &Credentials) -> Result<(), SessionError> {
        tracing::info!("Checking if logged in...");
        let landing = self
            .client
            .get(self.login_url.clone())
            .send()
            .await
            .map_err(|e| self.request_err(e))?;

        if landing.url() == &self.dashboard_url {
            tracing::info!("Already logged in");
            return Ok(());
        }

        tracing::info!("Not logged in. Logging in using credentials...");
        let form = [
            (self.email_field.as_str(), credentials.email.as_str()),
            (self.password_field.as_str(), credentials.password.as_str()),
        ];
        let response = self
            .client
            .post(self.login_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| self.request_err(e))?;

        if response.url() != &self.dashboard_url {
            return Err(SessionError::Rejected {
                landed: response.url().to_string(),
            });
        }

        tracing::info!("Logged in");
        Ok(())
    }

    fn open_handles(&self, count: usize) -> Vec<HttpPageDriver> {
        (0..count)
            .map(|_| {
                HttpPageDriver::new(self.client.clone(), RequestFilter::from_config(&self.filter))
            })
            .collect()
    }
}
