//! Shared fixtures for the integration tests

use async_trait::async_trait;
use flocrawl::config::Config;
use flocrawl::crawler::{FetchRequest, FetchResult, PageFetcher, RenderBackend};
use flocrawl::{FetchError, RenderError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Default config with a short request timeout
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.scraper.request_timeout_ms = 2_000;
    config
}

/// Mounts an HTML page at `route`
pub async fn mount_html(server: &MockServer, route: &str, body: impl Into<String>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.into().into_bytes(), "text/html"),
        )
        .mount(server)
        .await;
}

/// Serves the same HTML for every URL after a delay, recording peak concurrency
pub struct InstrumentedFetcher {
    body: String,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl InstrumentedFetcher {
    pub fn new(body: impl Into<String>, delay: Duration) -> Self {
        Self {
            body: body.into(),
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for InstrumentedFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(FetchResult {
            final_url: request.url().to_string(),
            status_code: 200,
            content: self.body.as_bytes().to_vec(),
            content_type: "text/html".to_string(),
            elapsed: self.delay,
            truncated: false,
        })
    }
}

/// Render backend that counts invocations and returns fixed HTML
pub struct CountingRenderer {
    calls: AtomicUsize,
}

impl CountingRenderer {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderBackend for CountingRenderer {
    fn name(&self) -> &str {
        "counting"
    }

    async fn render(&self, url: &Url, _wait: Duration) -> Result<FetchResult, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FetchResult {
            final_url: url.to_string(),
            status_code: 200,
            content: b"<html><body><main>Rendered content</main></body></html>".to_vec(),
            content_type: "text/html".to_string(),
            elapsed: Duration::ZERO,
            truncated: false,
        })
    }
}
