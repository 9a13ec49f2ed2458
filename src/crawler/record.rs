//! Per-page records and the aggregated crawl report
//!
//! These are plain serializable data: the tool layer turns them into JSON
//! without any further knowledge of the crawler.

use crate::{FetchError, FlocrawlError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Broad class of a per-page failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Timeout, connection failure, redirect limit, broken body stream
    Network,
    /// The server answered with a non-2xx status
    HttpStatus,
    /// The URL or request was malformed
    InvalidInput,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Network => "network",
            Self::HttpStatus => "http_status",
            Self::InvalidInput => "invalid_input",
        };
        write!(f, "{}", name)
    }
}

/// Error recorded against a single page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageError {
    pub kind: ErrorKind,
    pub message: String,
}

impl PageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<&FetchError> for PageError {
    fn from(error: &FetchError) -> Self {
        let kind = match error {
            FetchError::InvalidRequest(_) => ErrorKind::InvalidInput,
            FetchError::HttpStatus { .. } => ErrorKind::HttpStatus,
            _ => ErrorKind::Network,
        };
        Self::new(kind, error.to_string())
    }
}

impl From<&FlocrawlError> for PageError {
    fn from(error: &FlocrawlError) -> Self {
        match error {
            FlocrawlError::Fetch(fetch) => fetch.into(),
            FlocrawlError::UrlError(_) | FlocrawlError::InvalidInput(_) => {
                Self::new(ErrorKind::InvalidInput, error.to_string())
            }
            _ => Self::new(ErrorKind::Network, error.to_string()),
        }
    }
}

/// Outcome of visiting one URL
#[derive(Debug, Clone, Serialize)]
pub struct PageRecord {
    /// Normalized URL; the page's identity within a crawl
    pub url: String,

    /// URL after redirects, when a response was received
    pub final_url: Option<String>,

    /// HTTP status code, when a response was received
    pub status_code: Option<u16>,

    /// Page title
    pub title: String,

    /// Readable text
    pub text: String,

    /// Absolute outbound links, deduplicated and capped
    pub outbound_links: Vec<String>,

    /// True if the content came from the render fallback
    pub rendered: bool,

    /// Wall time spent on this page
    pub elapsed_ms: u64,

    /// When the page was fetched
    pub fetched_at: DateTime<Utc>,

    /// Set when the page could not be scraped
    pub error: Option<PageError>,
}

impl PageRecord {
    /// Creates an empty record for `url`, to be filled in by the caller
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            final_url: None,
            status_code: None,
            title: String::new(),
            text: String::new(),
            outbound_links: Vec::new(),
            rendered: false,
            elapsed_ms: 0,
            fetched_at: Utc::now(),
            error: None,
        }
    }

    /// Creates an error record
    pub fn failed(url: impl Into<String>, error: PageError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(url)
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// How a crawl was seeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlMode {
    /// One seed URL; discovered links are followed
    Seed,
    /// A fixed list of URLs; no link following
    Batch,
}

/// Why a crawl stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Nothing was left to visit
    QueueExhausted,
    /// The page ceiling was reached with URLs still pending
    PageLimitReached,
}

/// Summary counters for a crawl
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlStats {
    pub succeeded: usize,
    pub failed: usize,
    pub rendered: usize,
    pub errors_by_kind: BTreeMap<String, usize>,
    pub elapsed_ms: u64,
}

impl CrawlStats {
    pub fn from_pages<'a>(pages: impl IntoIterator<Item = &'a PageRecord>, elapsed_ms: u64) -> Self {
        let mut stats = Self {
            elapsed_ms,
            ..Self::default()
        };

        for page in pages {
            if page.rendered {
                stats.rendered += 1;
            }
            match &page.error {
                None => stats.succeeded += 1,
                Some(error) => {
                    stats.failed += 1;
                    *stats.errors_by_kind.entry(error.kind.to_string()).or_insert(0) += 1;
                }
            }
        }

        stats
    }
}

/// Aggregated result of one crawl invocation
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub mode: CrawlMode,

    /// Every URL that entered the visited set
    pub visited: BTreeSet<String>,

    /// One record per visited URL, keyed by normalized URL
    pub pages: BTreeMap<String, PageRecord>,

    pub stop_reason: StopReason,

    pub stats: CrawlStats,
}

impl CrawlReport {
    pub fn successes(&self) -> impl Iterator<Item = &PageRecord> {
        self.pages.values().filter(|p| p.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &PageRecord> {
        self.pages.values().filter(|p| !p.is_success())
    }
}
