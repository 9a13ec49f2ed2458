//! Flocrawl: web search, scraping, link discovery and bounded crawling
//!
//! This crate implements the engine behind a small tool-serving layer. Pages are
//! fetched under a global concurrency limit with per-page size and time budgets,
//! optionally re-rendered through a headless browser when they turn out to be
//! JavaScript shells, and reduced to readable text plus outbound links.

pub mod config;
pub mod crawler;
pub mod search;
pub mod tools;
pub mod url;

use std::time::Duration;
use thiserror::Error;

/// Main error type for Flocrawl operations
#[derive(Debug, Error)]
pub enum FlocrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Errors produced by a single page fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid fetch request: {0}")]
    InvalidRequest(String),

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connection { url: String, message: String },

    #[error("Too many redirects from {url}")]
    TooManyRedirects { url: String },

    #[error("HTTP {status_code}")]
    HttpStatus {
        status_code: u16,
        response: Box<crawler::FetchResult>,
    },

    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },
}

impl FetchError {
    /// Returns true for failures of the network itself rather than the server's answer
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::Connection { .. }
                | Self::TooManyRedirects { .. }
                | Self::Body { .. }
        )
    }
}

/// Errors from the render fallback; never fatal to a scrape
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Render backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Render of {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },

    #[error("Browser error: {0}")]
    Browser(String),
}

/// Search backend errors
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search request to {backend} failed: {message}")]
    Request { backend: String, message: String },

    #[error("{backend} returned HTTP {status_code}")]
    Status { backend: String, status_code: u16 },

    #[error("Unknown search backend: {0}")]
    UnknownBackend(String),

    #[error("Empty search query")]
    EmptyQuery,
}

/// Tool invocation errors
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {source}")]
    InvalidArguments {
        tool: String,
        source: serde_json::Error,
    },

    #[error("Failed to serialize output of {tool}: {source}")]
    Output {
        tool: String,
        source: serde_json::Error,
    },
}

/// Result type alias for Flocrawl operations
pub type Result<T> = std::result::Result<T, FlocrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlLimits, CrawlReport, CrawlTarget, PageRecord};
pub use url::{normalize_url, same_domain};
