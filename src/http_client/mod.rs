//! HTTP fetching of watched pages.
//!
//! One GET per URL, no retries. Transport errors and non-2xx statuses are
//! both fetch failures; the caller decides what a failure means for state.

mod user_agent;

pub use user_agent::{resolve_user_agent, IMPERSONATE_USER_AGENTS, USER_AGENT};

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while fetching a page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status} from {url}")]
    Status { status: StatusCode, url: String },
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Request(e) if e.is_timeout())
    }
}

/// Source of page content.
///
/// [`HttpClient`] is the production implementation; tests substitute fakes.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the body of `url` as text.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Builder for [`HttpClient`].
#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl HttpClientBuilder {
    /// Per-request timeout covering connect through body read.
    /// Without this, requests may block indefinitely.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent string.
    /// - `"impersonate"`: Use a real browser user agent
    /// - Any other string: Use as-is
    /// - Not called: Use the default pagewatch user agent
    pub fn user_agent(mut self, ua: &str) -> Self {
        self.user_agent = Some(ua.to_string());
        self
    }

    pub fn build(self) -> Result<HttpClient, FetchError> {
        let user_agent = resolve_user_agent(self.user_agent.as_deref());
        let mut builder = Client::builder()
            .user_agent(&user_agent)
            .gzip(true)
            .brotli(true);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(HttpClient {
            client,
            timeout: self.timeout,
        })
    }
}

/// reqwest-backed page fetcher.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Option<Duration>,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Make a GET request and return the body as text.
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let start = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        debug!(
            "GET {} -> {} ({} bytes in {}ms)",
            url,
            status.as_u16(),
            body.len(),
            start.elapsed().as_millis()
        );
        Ok(body)
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.get_text(url).await
    }
}
