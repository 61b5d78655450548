//! HTTP fetcher implementation
//!
//! Pages are fetched through a primary transport that identifies the crawler
//! and insists on HTML. Any failure there is retried exactly once through a
//! fallback transport that presents a browser-like User-Agent. Both transports
//! refuse non-HTML bodies. There is no further retry or backoff: a URL whose
//! fallback also fails is dropped.

use crate::config::{Config, FallbackConfig, UserAgentConfig};
use crate::extract::plain_text;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Response};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Hard ceiling on the primary transport's per-page timeout
pub const PRIMARY_TIMEOUT_CAP: Duration = Duration::from_secs(30);

/// Errors raised while fetching a single URL
///
/// These never abort a crawl on their own; the coordinator marks the URL as
/// failed and moves on. Only a failing root page is escalated.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("Non-HTML content type '{content_type}' from {url}")]
    ContentMismatch { url: String, content_type: String },

    #[error("Timed out after {seconds}s fetching {url}")]
    Timeout { url: String, seconds: u64 },

    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("All transports failed for {url} (primary: {primary}; fallback: {fallback})")]
    Exhausted {
        url: String,
        primary: Box<FetchError>,
        fallback: Box<FetchError>,
    },
}

impl FetchError {
    fn from_reqwest(url: &Url, err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            return Self::Timeout {
                url: url.to_string(),
                seconds: timeout.as_secs(),
            };
        }
        if let Some(status) = err.status() {
            return Self::Http {
                url: url.to_string(),
                status: status.as_u16(),
            };
        }
        Self::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

/// Which transport produced a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMethod {
    Primary,
    Fallback,
}

impl FetchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Raw HTML body
    pub html: String,
    /// Plain text with markup stripped
    pub text: String,
    /// Transport that produced the body
    pub method: FetchMethod,
}

/// A way of turning a URL into `(html, text)`
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch_html(&self, url: &Url, timeout: Duration)
        -> Result<(String, String), FetchError>;
}

/// Builds the primary HTTP client carrying the crawler identity
///
/// The User-Agent has the form `CrawlerName/Version (+ContactURL; ContactEmail)`.
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Rejects responses whose Content-Type is not HTML or XHTML
fn ensure_html(url: &Url, response: &Response) -> Result<(), FetchError> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_lowercase();

    if content_type.contains("text/html") || content_type.contains("application/xhtml") {
        Ok(())
    } else {
        Err(FetchError::ContentMismatch {
            url: url.to_string(),
            content_type,
        })
    }
}

/// HTTP-only transport that identifies the crawler and only accepts HTML
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_html(
        &self,
        url: &Url,
        timeout: Duration,
    ) -> Result<(String, String), FetchError> {
        let response = self
            .client
            .get(url.as_str())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        ensure_html(url, &response)?;

        let html = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e, timeout))?;
        let text = plain_text(&html);
        Ok((html, text))
    }
}

/// Minimal transport posing as a desktop browser
///
/// Accepts any success status but, like the primary, only HTML bodies.
pub struct FallbackTransport {
    client: Client,
}

impl FallbackTransport {
    pub fn new(config: &FallbackConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for FallbackTransport {
    async fn fetch_html(
        &self,
        url: &Url,
        timeout: Duration,
    ) -> Result<(String, String), FetchError> {
        let response = self
            .client
            .get(url.as_str())
            .timeout(timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::from_reqwest(url, e, timeout))?;
        ensure_html(url, &response)?;

        let html = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e, timeout))?;
        let text = plain_text(&html);
        Ok((html, text))
    }
}

/// Primary-then-fallback page fetcher shared by all workers of a session
pub struct Fetcher {
    primary: Arc<dyn Transport>,
    fallback: Arc<dyn Transport>,
    primary_timeout: Duration,
    fallback_timeout: Duration,
}

impl Fetcher {
    /// Creates a fetcher from explicit transports
    ///
    /// `page_timeout` is clamped to [`PRIMARY_TIMEOUT_CAP`] for the primary path.
    pub fn new(
        primary: Arc<dyn Transport>,
        fallback: Arc<dyn Transport>,
        page_timeout: Duration,
        fallback_timeout: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            primary_timeout: page_timeout.min(PRIMARY_TIMEOUT_CAP),
            fallback_timeout,
        }
    }

    /// Creates the HTTP transports described by the configuration
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let primary = HttpTransport::new(&config.user_agent)?;
        let fallback = FallbackTransport::new(&config.fallback)?;
        Ok(Self::new(
            Arc::new(primary),
            Arc::new(fallback),
            Duration::from_secs(config.crawler.page_timeout_secs),
            Duration::from_secs(config.fallback.timeout_secs),
        ))
    }

    pub fn primary_timeout(&self) -> Duration {
        self.primary_timeout
    }

    /// Fetches one URL, trying the fallback transport once if the primary fails
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        debug!("Fetching {} (primary, {:?})", url, self.primary_timeout);
        let primary_err = match self.primary.fetch_html(url, self.primary_timeout).await {
            Ok((html, text)) => {
                return Ok(FetchedPage {
                    html,
                    text,
                    method: FetchMethod::Primary,
                })
            }
            Err(e) => e,
        };

        warn!("Primary fetch failed, trying fallback: {}", primary_err);

        match self.fallback.fetch_html(url, self.fallback_timeout).await {
            Ok((html, text)) => {
                info!("Fallback fetch succeeded for {}", url);
                Ok(FetchedPage {
                    html,
                    text,
                    method: FetchMethod::Fallback,
                })
            }
            Err(fallback_err) => Err(FetchError::Exhausted {
                url: url.to_string(),
                primary: Box::new(primary_err),
                fallback: Box::new(fallback_err),
            }),
        }
    }
}
