use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Flocrawl
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scraper: ScraperConfig,
    pub render: RenderConfig,
    pub search: SearchConfig,
}

/// Fetch, extraction and crawl limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScraperConfig {
    /// Maximum bytes read from a single response body
    pub max_page_size: usize,

    /// Maximum links kept per page
    pub max_links_per_page: usize,

    /// Maximum pages visited by one crawl
    pub max_pages: usize,

    /// Maximum fetches in flight at once within one crawl
    pub max_concurrent: usize,

    /// Per-request timeout (milliseconds)
    pub request_timeout_ms: u64,

    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Extracted text is cut at this many characters
    pub max_text_chars: usize,

    /// Whether the same-domain filter also accepts subdomains of the page host
    pub include_subdomains: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_page_size: 1_048_576,
            max_links_per_page: 100,
            max_pages: 20,
            max_concurrent: 10,
            request_timeout_ms: 30_000,
            user_agent: "Mozilla/5.0 (compatible; Flocrawl/1.0; +https://flotorch.ai)".to_string(),
            max_text_chars: 50_000,
            include_subdomains: false,
        }
    }
}

impl ScraperConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Headless rendering fallback settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RenderConfig {
    /// Whether JavaScript shells are re-fetched through the render backend
    pub enabled: bool,

    /// Settle time after navigation before the DOM is captured (milliseconds)
    pub wait_ms: u64,

    /// Bodies at or above this size are never treated as "enable JavaScript" placeholders
    pub shell_max_bytes: usize,

    /// App-shell pages with less extracted text than this are rendered
    pub min_text_chars: usize,

    /// Case-insensitive strings that mark a JavaScript-gated placeholder
    pub markers: Vec<String>,

    /// Element ids that mark a client-side application mount point
    pub shell_ids: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            wait_ms: 2_000,
            shell_max_bytes: 8_192,
            min_text_chars: 200,
            markers: [
                "enable javascript",
                "javascript is required",
                "javascript is disabled",
                "requires javascript",
                "you need to enable javascript",
                "please turn on javascript",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            shell_ids: ["root", "app", "__next", "__nuxt", "svelte"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl RenderConfig {
    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }
}

/// Web search settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SearchConfig {
    /// Backends tried in order until one returns results
    pub backends: Vec<String>,

    /// Default number of results when the caller gives none
    pub max_results: usize,

    /// Default region/locale code
    pub region: String,

    /// Per-backend request timeout (milliseconds)
    pub timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backends: vec!["duckduckgo-html".to_string(), "duckduckgo-lite".to_string()],
            max_results: 10,
            region: "wt-wt".to_string(),
            timeout_ms: 15_000,
        }
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
