//! Two-tier page fetching
//!
//! This module handles all page requests for the crawler:
//! - Building HTTP clients with the crawler's user agent and browser-like headers
//! - A static GET tier with a hard timeout
//! - A headless-render tier tried once when the static tier fails
//! - Error classification into per-URL and fatal failures

use crate::config::UserAgentConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, LAST_MODIFIED};
use reqwest::{redirect::Policy, Client};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors from a single fetch tier, or from both
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("empty response body")]
    EmptyBody,

    #[error("render failed: {0}")]
    Render(String),

    /// The headless browser could not be started; no URL can be rendered
    #[error("browser unavailable: {0}")]
    BrowserUnavailable(String),

    #[error("static fetch failed ({static_tier}); render fallback failed ({render_tier})")]
    Exhausted {
        static_tier: String,
        render_tier: String,
    },
}

impl FetchError {
    /// Returns true if the error means no further page can be fetched
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::BrowserUnavailable(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Renders a URL in a headless browser and returns the resulting DOM
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String, FetchError>;

    /// Releases every browser resource held by the renderer
    async fn close(&self);
}

/// HTML body tagged with the tier that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedHtml {
    Static(String),
    Rendered(String),
}

impl FetchedHtml {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Static(html) | Self::Rendered(html) => html,
        }
    }

    pub fn used_fallback(&self) -> bool {
        matches!(self, Self::Rendered(_))
    }
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub body: FetchedHtml,
    /// Parsed `Last-Modified` header; only the static tier sees headers
    pub last_modified: Option<DateTime<Utc>>,
    /// URL the body was served from, after redirects; relative links resolve
    /// against it
    pub final_url: Url,
}

impl FetchedPage {
    pub fn html(&self) -> &str {
        self.body.as_str()
    }

    pub fn used_fallback(&self) -> bool {
        self.body.used_fallback()
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Default per-request timeout
///
/// # Example
///
/// ```
/// use site_sync::config::UserAgentConfig;
/// use site_sync::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(15)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    Client::builder()
        .user_agent(config.user_agent_string())
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Parses an HTTP date (IMF-fixdate or RFC 2822) into UTC
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Fetches pages with a static tier and an optional render fallback
pub struct Fetcher {
    client: Client,
    request_timeout: Duration,
    renderer: Option<Arc<dyn Renderer>>,
}

impl Fetcher {
    /// Creates a fetcher with only the static tier
    pub fn new(client: Client, request_timeout: Duration) -> Self {
        Self {
            client,
            request_timeout,
            renderer: None,
        }
    }

    /// Adds the render tier
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    /// Fetches a page
    ///
    /// # Request Flow
    ///
    /// 1. Static GET with the request timeout
    /// 2. On any failure (non-2xx, timeout, network error, blank body) render
    ///    the URL once through the headless tier
    /// 3. A blank rendered DOM counts as a failure
    ///
    /// A fatal render error is returned as-is so the caller can abort the run.
    pub async fn fetch_page(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let static_error = match self.fetch_static(url).await {
            Ok(page) => return Ok(page),
            Err(e) => e,
        };

        let Some(renderer) = &self.renderer else {
            return Err(static_error);
        };

        tracing::debug!(
            "Static fetch of {} failed ({}), trying render fallback",
            url,
            static_error
        );

        match renderer.render(url).await {
            Ok(html) if !html.trim().is_empty() => Ok(FetchedPage {
                body: FetchedHtml::Rendered(html),
                last_modified: None,
                final_url: Url::parse(url).map_err(|e| FetchError::Network(e.to_string()))?,
            }),
            Ok(_) => Err(FetchError::Exhausted {
                static_tier: static_error.to_string(),
                render_tier: FetchError::EmptyBody.to_string(),
            }),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => Err(FetchError::Exhausted {
                static_tier: static_error.to_string(),
                render_tier: e.to_string(),
            }),
        }
    }

    async fn fetch_static(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let final_url = response.url().clone();
        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date);

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody);
        }

        Ok(FetchedPage {
            body: FetchedHtml::Static(body),
            last_modified,
            final_url,
        })
    }

    /// Releases the render tier's resources
    pub async fn shutdown(&self) {
        if let Some(renderer) = &self.renderer {
            renderer.close().await;
        }
    }
}
