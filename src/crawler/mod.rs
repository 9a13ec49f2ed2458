//! Crawler module for page fetching, rendering and extraction
//!
//! This module contains the core scraping logic, including:
//! - HTTP fetching under size and time budgets
//! - Fallback rendering for JavaScript shell pages
//! - HTML text and link extraction
//! - Bounded, concurrent crawl coordination

mod coordinator;
mod extractor;
mod fetcher;
mod record;
mod render;
mod session;

pub use coordinator::{Coordinator, CrawlLimits, CrawlTarget};
pub use extractor::{
    extract, extract_text_from_html, resolve_link, ExtractOptions, ExtractedPage, Link,
};
pub use fetcher::{
    build_http_client, FetchRequest, FetchResult, HttpFetcher, PageFetcher, MAX_REDIRECTS,
};
pub use record::{
    CrawlMode, CrawlReport, CrawlStats, ErrorKind, PageError, PageRecord, StopReason,
};
#[cfg(feature = "browser")]
pub use render::ChromeRenderer;
pub use render::{maybe_render, needs_rendering, NoRenderer, RenderBackend, RenderOutcome};
pub use session::{CrawlSession, QueuedUrl};
