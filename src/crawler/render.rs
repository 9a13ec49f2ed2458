//! Headless rendering fallback
//!
//! Some pages ship an empty shell and build their content with JavaScript. When
//! a fetched page looks like one of those, it is re-fetched through a
//! [`RenderBackend`] that executes scripts and waits for the DOM to settle.
//!
//! The backend is an injected capability. [`NoRenderer`] is used when nothing
//! is configured; with the `browser` feature a Chromium-backed
//! [`ChromeRenderer`] is available. Either way a failed render never fails the
//! scrape: the unrendered result is kept.

use crate::config::RenderConfig;
use crate::crawler::extractor::extract_text_from_html;
use crate::crawler::fetcher::{FetchRequest, FetchResult};
use crate::RenderError;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// Which path produced the final page content
#[derive(Debug, Clone)]
pub enum RenderOutcome {
    /// The plain HTTP response was used as is
    Direct(FetchResult),

    /// The page was re-fetched through the render backend
    Rendered(FetchResult),
}

impl RenderOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered(_))
    }

    pub fn result(&self) -> &FetchResult {
        match self {
            Self::Direct(result) | Self::Rendered(result) => result,
        }
    }

    pub fn into_result(self) -> FetchResult {
        match self {
            Self::Direct(result) | Self::Rendered(result) => result,
        }
    }
}

/// A browser-like engine that can execute a page's scripts
#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Navigates to `url`, waits `wait` for asynchronous content, and returns the realized HTML
    async fn render(&self, url: &Url, wait: Duration) -> Result<FetchResult, RenderError>;
}

/// Backend used when no renderer is installed or configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRenderer;

#[async_trait]
impl RenderBackend for NoRenderer {
    fn name(&self) -> &str {
        "none"
    }

    async fn render(&self, _url: &Url, _wait: Duration) -> Result<FetchResult, RenderError> {
        Err(RenderError::BackendUnavailable(
            "no render backend configured".to_string(),
        ))
    }
}

/// Decides whether a fetched page is a JavaScript placeholder worth rendering
///
/// Two independent signals trigger rendering:
/// - a small body (below `shell_max_bytes`) containing one of the configured
///   "enable JavaScript" markers
/// - an HTML application shell (a mount point such as `id="root"`) with less
///   than `min_text_chars` of readable text
///
/// The thresholds are policy, not guarantees; they live in [`RenderConfig`].
pub fn needs_rendering(result: &FetchResult, config: &RenderConfig) -> bool {
    if !result.is_html() {
        return false;
    }

    let body = result.text();
    let lower = body.to_lowercase();

    if result.content.len() < config.shell_max_bytes
        && config
            .markers
            .iter()
            .any(|marker| lower.contains(&marker.to_lowercase()))
    {
        return true;
    }

    has_shell_mount(&lower, &config.shell_ids)
        && extract_text_from_html(&body, config.min_text_chars)
            .chars()
            .count()
            < config.min_text_chars
}

/// Looks for `id="root"`-style mount points in lowercased HTML
fn has_shell_mount(lower_html: &str, shell_ids: &[String]) -> bool {
    shell_ids.iter().any(|id| {
        let id = id.to_lowercase();
        lower_html.contains(&format!("id=\"{}\"", id)) || lower_html.contains(&format!("id='{}'", id))
    })
}

/// Re-renders a fetched page when the policy asks for it
///
/// The backend is not consulted at all when rendering is disabled. Render
/// failures and timeouts are logged and the original result is returned as
/// [`RenderOutcome::Direct`]. The render is bounded by the request timeout plus
/// the settle delay, and its output is held to the same byte budget as a fetch.
pub async fn maybe_render(
    fetched: FetchResult,
    request: &FetchRequest,
    backend: &dyn RenderBackend,
    config: &RenderConfig,
) -> RenderOutcome {
    if !config.enabled || !needs_rendering(&fetched, config) {
        return RenderOutcome::Direct(fetched);
    }

    let url = request.url();
    let wait = config.wait();
    let budget = request.timeout() + wait;
    tracing::debug!("{} looks script-gated, rendering with {}", url, backend.name());

    match tokio::time::timeout(budget, backend.render(url, wait)).await {
        Ok(Ok(mut rendered)) => {
            if rendered.content.len() > request.max_bytes() {
                rendered.content.truncate(request.max_bytes());
                rendered.truncated = true;
            }
            RenderOutcome::Rendered(rendered)
        }
        Ok(Err(e)) => {
            tracing::warn!("Render fallback for {} failed: {}", url, e);
            RenderOutcome::Direct(fetched)
        }
        Err(_) => {
            let e = RenderError::Timeout {
                url: url.to_string(),
                after: budget,
            };
            tracing::warn!("Render fallback failed: {}", e);
            RenderOutcome::Direct(fetched)
        }
    }
}

/// Runs a cleanup closure when dropped
///
/// Async work can be cancelled at any await point, so resources that must be
/// released (browser tabs) are tied to a guard instead of a trailing call.
#[cfg(any(feature = "browser", test))]
struct OnDrop<F: FnOnce()> {
    cleanup: Option<F>,
}

#[cfg(any(feature = "browser", test))]
impl<F: FnOnce()> OnDrop<F> {
    fn new(cleanup: F) -> Self {
        Self {
            cleanup: Some(cleanup),
        }
    }
}

#[cfg(any(feature = "browser", test))]
impl<F: FnOnce()> Drop for OnDrop<F> {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

#[cfg(feature = "browser")]
pub use chrome::ChromeRenderer;

#[cfg(feature = "browser")]
mod chrome {
    use super::*;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::Page;
    use futures::StreamExt;
    use std::time::Instant;
    use tokio::task::JoinHandle;

    /// Chromium-backed renderer; each render runs in its own tab
    pub struct ChromeRenderer {
        browser: Browser,
        handler: JoinHandle<()>,
    }

    impl ChromeRenderer {
        /// Launches a headless Chromium found on the system
        pub async fn launch(user_agent: &str) -> Result<Self, RenderError> {
            let browser_config = BrowserConfig::builder()
                .arg(format!("--user-agent={}", user_agent))
                .arg("--no-first-run")
                .arg("--disable-extensions")
                .arg("--mute-audio")
                .build()
                .map_err(RenderError::BackendUnavailable)?;

            let (browser, mut handler) = Browser::launch(browser_config)
                .await
                .map_err(|e| RenderError::BackendUnavailable(e.to_string()))?;

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            tracing::info!("Launched headless browser for render fallback");
            Ok(Self { browser, handler })
        }
    }

    impl Drop for ChromeRenderer {
        fn drop(&mut self) {
            self.handler.abort();
        }
    }

    /// Closes a tab in the background; usable from `Drop`
    fn spawn_close(page: Page, url: String) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = page.close().await {
                        tracing::debug!("Failed to close render tab for {}: {}", url, e);
                    }
                });
            }
            Err(_) => tracing::debug!("No runtime left to close render tab for {}", url),
        }
    }

    #[async_trait]
    impl RenderBackend for ChromeRenderer {
        fn name(&self) -> &str {
            "chromium"
        }

        async fn render(&self, url: &Url, wait: Duration) -> Result<FetchResult, RenderError> {
            let start = Instant::now();
            let browser_err = |e: chromiumoxide::error::CdpError| RenderError::Browser(e.to_string());

            let page = self.browser.new_page(url.as_str()).await.map_err(browser_err)?;

            // Closes the tab on every exit: success, error, or the caller's
            // timeout dropping this future mid-wait.
            let _close_tab = OnDrop::new({
                let page = page.clone();
                let url = url.to_string();
                move || spawn_close(page, url)
            });

            page.wait_for_navigation().await.map_err(browser_err)?;
            tokio::time::sleep(wait).await;

            let html = page.content().await.map_err(browser_err)?;
            let final_url = page
                .url()
                .await
                .ok()
                .flatten()
                .unwrap_or_else(|| url.to_string());

            Ok(FetchResult {
                final_url,
                status_code: 200,
                content: html.into_bytes(),
                content_type: "text/html".to_string(),
                elapsed: start.elapsed(),
                truncated: false,
            })
        }
    }
}
