//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building a pooled HTTP client with a bounded redirect policy
//! - Validating fetch requests before any network work
//! - GET requests with a per-request timeout and User-Agent
//! - Reading the body up to a byte budget (truncation, not failure)
//! - Error classification

use crate::config::ScraperConfig;
use crate::url::parse_http_url;
use crate::FetchError;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{redirect::Policy, Client};
use std::borrow::Cow;
use std::time::{Duration, Instant};
use url::Url;

/// Maximum redirect hops followed before giving up
pub const MAX_REDIRECTS: usize = 10;

/// A single bounded GET request
#[derive(Debug, Clone)]
pub struct FetchRequest {
    url: Url,
    timeout: Duration,
    max_bytes: usize,
    user_agent: String,
}

impl FetchRequest {
    /// Builds a request, rejecting non-http(s) URLs and non-positive budgets
    pub fn new(
        url: &str,
        timeout: Duration,
        max_bytes: usize,
        user_agent: impl Into<String>,
    ) -> Result<Self, FetchError> {
        let url = parse_http_url(url).map_err(|e| FetchError::InvalidRequest(e.to_string()))?;

        if timeout.is_zero() {
            return Err(FetchError::InvalidRequest(
                "timeout must be positive".to_string(),
            ));
        }

        if max_bytes == 0 {
            return Err(FetchError::InvalidRequest(
                "max_bytes must be positive".to_string(),
            ));
        }

        Ok(Self {
            url,
            timeout,
            max_bytes,
            user_agent: user_agent.into(),
        })
    }

    /// Builds a request using the scraper limits from the configuration
    pub fn from_config(url: &str, config: &ScraperConfig) -> Result<Self, FetchError> {
        Self::new(
            url,
            config.request_timeout(),
            config.max_page_size,
            config.user_agent.clone(),
        )
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

/// Result of a completed fetch
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Final URL after redirects
    pub final_url: String,

    /// HTTP status code
    pub status_code: u16,

    /// Body bytes, never longer than the request's `max_bytes`
    pub content: Vec<u8>,

    /// Content-Type header value (empty if absent)
    pub content_type: String,

    /// Time from sending the request to the end of the body read
    pub elapsed: Duration,

    /// True if the body was cut at `max_bytes`
    pub truncated: bool,
}

impl FetchResult {
    /// Body decoded as UTF-8, invalid sequences replaced
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    /// True for HTML responses, or when the server sent no Content-Type at all
    pub fn is_html(&self) -> bool {
        let content_type = self.content_type.to_ascii_lowercase();
        content_type.is_empty()
            || content_type.contains("text/html")
            || content_type.contains("application/xhtml")
    }

    /// True for any body that can be shown as text
    pub fn is_textual(&self) -> bool {
        let content_type = self.content_type.to_ascii_lowercase();
        self.is_html()
            || content_type.starts_with("text/")
            || content_type.contains("json")
            || content_type.contains("xml")
    }
}

/// Something that can perform a bounded fetch
///
/// The coordinator only talks to this trait, so tests can swap in an
/// instrumented fetcher.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, FetchError>;
}

/// Builds the shared HTTP client
///
/// The client follows at most [`MAX_REDIRECTS`] redirects. Timeouts and the
/// User-Agent are set per request.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .redirect(Policy::limited(MAX_REDIRECTS))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`PageFetcher`] backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client()?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    /// Fetches a URL, stopping the body read at the byte budget
    ///
    /// # Error Classification
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | No response within timeout | `Timeout` |
    /// | DNS / connect failure | `Connection` |
    /// | Redirect chain > 10 | `TooManyRedirects` |
    /// | Non-2xx status | `HttpStatus`, with the body attached |
    /// | Stream broke mid-body | `Body` |
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, FetchError> {
        let url = request.url().as_str();
        let start = Instant::now();

        let mut response = self
            .client
            .get(request.url().clone())
            .header(USER_AGENT, request.user_agent())
            .timeout(request.timeout())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let max_bytes = request.max_bytes();
        let mut content = Vec::new();
        let mut truncated = false;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| classify_error(url, e))?
        {
            let remaining = max_bytes - content.len();
            if chunk.len() > remaining {
                content.extend_from_slice(&chunk[..remaining]);
                truncated = true;
                break;
            }
            content.extend_from_slice(&chunk);
        }

        let result = FetchResult {
            final_url,
            status_code: status.as_u16(),
            content,
            content_type,
            elapsed: start.elapsed(),
            truncated,
        };

        tracing::debug!(
            "Fetched {} ({} bytes{}, HTTP {}) in {:?}",
            url,
            result.content.len(),
            if truncated { ", truncated" } else { "" },
            result.status_code,
            result.elapsed
        );

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status_code: status.as_u16(),
                response: Box::new(result),
            });
        }

        Ok(result)
    }
}

/// Maps a reqwest error onto the fetch error taxonomy
fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_redirect() {
        FetchError::TooManyRedirects {
            url: url.to_string(),
        }
    } else if error.is_body() || error.is_decode() {
        FetchError::Body {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        FetchError::Connection {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
