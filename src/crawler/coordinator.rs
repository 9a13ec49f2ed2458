//! Crawler coordinator - scrape and crawl orchestration
//!
//! This module ties the fetcher, render fallback and extractor together and
//! exposes the three entry points used by the tool layer:
//! - [`Coordinator::scrape_one`]: one page, errors folded into the record
//! - [`Coordinator::list_links`]: outbound links of one page
//! - [`Coordinator::crawl`]: a seed crawl or a batch scrape under a page
//!   ceiling and a concurrency limit

use crate::config::{validate, Config};
use crate::crawler::extractor::{extract, ExtractOptions, Link};
use crate::crawler::fetcher::{FetchRequest, FetchResult, HttpFetcher, PageFetcher};
use crate::crawler::record::{
    CrawlMode, CrawlReport, CrawlStats, ErrorKind, PageError, PageRecord,
};
use crate::crawler::render::{maybe_render, NoRenderer, RenderBackend};
use crate::crawler::session::{CrawlSession, QueuedUrl};
use crate::url::{normalize_url, parse_http_url, same_domain};
use crate::{FlocrawlError, Result};
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use url::Url;

/// What a crawl starts from
#[derive(Debug, Clone)]
pub enum CrawlTarget {
    /// Start at one URL and follow discovered links
    Seed(String),
    /// Scrape exactly these URLs, following nothing
    Batch(Vec<String>),
}

impl CrawlTarget {
    pub fn mode(&self) -> CrawlMode {
        match self {
            Self::Seed(_) => CrawlMode::Seed,
            Self::Batch(_) => CrawlMode::Batch,
        }
    }
}

/// Ceilings for one crawl
#[derive(Debug, Clone, Copy)]
pub struct CrawlLimits {
    /// Maximum URLs visited
    pub max_pages: usize,

    /// Maximum fetches in flight at once
    pub max_concurrent: usize,

    /// In seed mode, only follow links on the seed's host
    pub same_domain_only: bool,
}

impl CrawlLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_pages: config.scraper.max_pages,
            max_concurrent: config.scraper.max_concurrent,
            same_domain_only: true,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.max_pages == 0 {
            return Err(FlocrawlError::InvalidInput(
                "max_pages must be positive".to_string(),
            ));
        }
        if self.max_concurrent == 0 {
            return Err(FlocrawlError::InvalidInput(
                "max_concurrent must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Main crawler coordinator structure
///
/// Holds only read-only configuration and shared backends; all per-crawl state
/// lives in a [`CrawlSession`] created by each [`crawl`](Self::crawl) call, so
/// one coordinator can serve overlapping invocations.
#[derive(Clone)]
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Arc<dyn PageFetcher>,
    renderer: Arc<dyn RenderBackend>,
}

impl Coordinator {
    /// Creates a coordinator with the HTTP fetcher and no render backend
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = HttpFetcher::new()?;
        Self::with_backends(config, Arc::new(fetcher), Arc::new(NoRenderer))
    }

    /// Creates a coordinator with injected fetch and render backends
    pub fn with_backends(
        config: Config,
        fetcher: Arc<dyn PageFetcher>,
        renderer: Arc<dyn RenderBackend>,
    ) -> Result<Self> {
        validate(&config)?;
        Ok(Self {
            config: Arc::new(config),
            fetcher,
            renderer,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Scrapes a single URL
    ///
    /// Only a malformed URL is returned as an error. Every fetch or render
    /// failure ends up in [`PageRecord::error`].
    pub async fn scrape_one(&self, url: &str) -> Result<PageRecord> {
        let url = parse_http_url(url)?;
        let key = normalize_url(url.as_str())?.to_string();
        Ok(self.scrape_page(key, url, false).await)
    }

    /// Lists the outbound links of a single page
    ///
    /// This is a single-URL operation, so fetch failures are returned directly.
    pub async fn list_links(&self, url: &str, same_domain_only: bool) -> Result<Vec<Link>> {
        let url = parse_http_url(url)?;
        let request = FetchRequest::from_config(url.as_str(), &self.config.scraper)?;
        let fetched = self.fetch_content(&request).await?;

        if !fetched.result.is_html() {
            tracing::debug!(
                "{} is {}, no links to list",
                url,
                fetched.result.content_type
            );
            return Ok(Vec::new());
        }

        let base = base_url(&fetched.result, &url);
        let options = ExtractOptions::from_config(&self.config.scraper, same_domain_only);
        Ok(extract(&fetched.result.text(), &base, &options).links)
    }

    /// Runs a crawl and returns the aggregated report
    ///
    /// # Seed mode
    ///
    /// The queue starts with the seed. Up to `max_concurrent` pages are kept in
    /// flight; each URL is marked visited when it is dispatched, and links found
    /// on successful pages are appended to the queue unless already visited or
    /// queued. Dispatching stops once `max_pages` URLs have been visited.
    ///
    /// # Batch mode
    ///
    /// Every given URL is scraped (duplicates collapse, malformed entries become
    /// error records) with at most `max_concurrent` in flight. No links are
    /// followed.
    ///
    /// # Errors
    ///
    /// Only invalid input (bad seed, zero limits, empty batch) is an error.
    /// Page failures are recorded in the report and never abort the crawl.
    pub async fn crawl(&self, target: CrawlTarget, limits: CrawlLimits) -> Result<CrawlReport> {
        limits.validate()?;

        let mode = target.mode();
        let mut session = CrawlSession::new(limits.max_pages);
        let mut scope = None;

        match target {
            CrawlTarget::Seed(seed) => {
                let seed = parse_http_url(&seed)?;
                session.enqueue(&seed);
                if limits.same_domain_only {
                    scope = Some(CrawlScope::new(seed)?);
                }
            }
            CrawlTarget::Batch(urls) => {
                if urls.is_empty() {
                    return Err(FlocrawlError::InvalidInput(
                        "batch crawl needs at least one URL".to_string(),
                    ));
                }
                for raw in &urls {
                    match parse_http_url(raw) {
                        Ok(url) => {
                            session.enqueue(&url);
                        }
                        Err(e) => {
                            tracing::debug!("Rejecting batch entry {:?}: {}", raw, e);
                            session.reject(raw, PageError::new(ErrorKind::InvalidInput, e.to_string()));
                        }
                    }
                }
            }
        }

        tracing::info!(
            "Starting {:?} crawl: {} queued, max {} pages, {} concurrent",
            mode,
            session.pending(),
            limits.max_pages,
            limits.max_concurrent
        );

        let follow_same_domain = mode == CrawlMode::Seed && limits.same_domain_only;
        let start_time = Instant::now();
        let semaphore = Semaphore::new(limits.max_concurrent);
        let mut in_flight = FuturesUnordered::new();

        loop {
            while in_flight.len() < limits.max_concurrent {
                let Some(next) = session.next_dispatch() else {
                    break;
                };
                tracing::debug!("Dispatching {}", next.url);
                in_flight.push(self.scrape_admitted(next, &semaphore, follow_same_domain));
            }

            let Some(record) = in_flight.next().await else {
                break;
            };

            if mode == CrawlMode::Seed && record.is_success() {
                if let Some(scope) = scope.as_mut() {
                    scope.follow_seed_redirect(&record);
                }
                self.enqueue_links(&mut session, &record, scope.as_ref());
            }

            session.record(record);
        }

        let stop_reason = session.stop_reason();
        let (visited, pages) = session.finish();
        let stats = CrawlStats::from_pages(pages.values(), start_time.elapsed().as_millis() as u64);

        tracing::info!(
            "Crawl finished ({:?}): {} visited, {} succeeded, {} failed in {:?}",
            stop_reason,
            visited.len(),
            stats.succeeded,
            stats.failed,
            start_time.elapsed()
        );

        Ok(CrawlReport {
            mode,
            visited,
            pages,
            stop_reason,
            stats,
        })
    }

    /// Merges a page's outbound links into the queue, honoring the crawl scope
    fn enqueue_links(
        &self,
        session: &mut CrawlSession,
        record: &PageRecord,
        scope: Option<&CrawlScope>,
    ) {
        let include_subdomains = self.config.scraper.include_subdomains;

        for link in &record.outbound_links {
            let Ok(url) = Url::parse(link) else {
                continue;
            };
            if let Some(scope) = scope {
                if !scope.allows(&url, include_subdomains) {
                    continue;
                }
            }
            session.enqueue(&url);
        }
    }

    /// Waits for an admission permit, then scrapes
    ///
    /// The permit is dropped as soon as the page is finished, including when
    /// the fetch timed out.
    async fn scrape_admitted(
        &self,
        queued: QueuedUrl,
        semaphore: &Semaphore,
        same_domain_only: bool,
    ) -> PageRecord {
        let _permit = match semaphore.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                return PageRecord::failed(queued.key, PageError::new(ErrorKind::Network, e.to_string()))
            }
        };

        self.scrape_page(queued.key, queued.url, same_domain_only).await
    }

    /// Fetch, maybe render, extract; never fails
    async fn scrape_page(&self, key: String, url: Url, same_domain_only: bool) -> PageRecord {
        let started = Instant::now();
        let fetched_at = Utc::now();

        let outcome = match FetchRequest::from_config(url.as_str(), &self.config.scraper) {
            Ok(request) => self.fetch_content(&request).await,
            Err(e) => Err(e.into()),
        };

        let mut record = match outcome {
            Ok(fetched) => self.build_record(key, &url, fetched, same_domain_only),
            Err(e) => {
                tracing::debug!("Scrape of {} failed: {}", url, e);
                let mut record = PageRecord::failed(key, PageError::from(&e));
                if let FlocrawlError::Fetch(crate::FetchError::HttpStatus { response, .. }) = &e {
                    record.final_url = Some(response.final_url.clone());
                    record.status_code = Some(response.status_code);
                }
                record
            }
        };

        record.fetched_at = fetched_at;
        record.elapsed_ms = started.elapsed().as_millis() as u64;
        record
    }

    /// Turns fetched content into a successful record
    fn build_record(
        &self,
        key: String,
        url: &Url,
        fetched: FetchedContent,
        same_domain_only: bool,
    ) -> PageRecord {
        let result = fetched.result;
        let mut record = PageRecord::new(key);
        record.final_url = Some(result.final_url.clone());
        record.status_code = Some(result.status_code);
        record.rendered = fetched.rendered;

        if result.is_html() {
            let base = base_url(&result, url);
            let options = ExtractOptions::from_config(&self.config.scraper, same_domain_only);
            let page = extract(&result.text(), &base, &options);
            record.title = page.title.unwrap_or_default();
            record.text = page.text;
            record.outbound_links = page.links.into_iter().map(|link| link.url).collect();
        } else if result.is_textual() {
            record.text = result
                .text()
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
                .chars()
                .take(self.config.scraper.max_text_chars)
                .collect();
        } else {
            tracing::debug!(
                "{} has non-text content ({}), recording without text",
                url,
                result.content_type
            );
        }

        record
    }

    /// Fetches a page and applies the render fallback
    async fn fetch_content(&self, request: &FetchRequest) -> Result<FetchedContent> {
        let fetched = self.fetcher.fetch(request).await?;
        let outcome = maybe_render(fetched, request, self.renderer.as_ref(), &self.config.render).await;

        Ok(FetchedContent {
            rendered: outcome.is_rendered(),
            result: outcome.into_result(),
        })
    }
}

/// Hosts a same-domain seed crawl may follow links into
///
/// Starts as the seed's host. If the seed itself redirects to another host
/// (apex to `www.`, say), that host is accepted too, since every link on the
/// seed page resolves against it.
#[derive(Debug)]
struct CrawlScope {
    seed_key: String,
    hosts: Vec<Url>,
}

impl CrawlScope {
    fn new(seed: Url) -> Result<Self> {
        Ok(Self {
            seed_key: normalize_url(seed.as_str())?.to_string(),
            hosts: vec![seed],
        })
    }

    fn follow_seed_redirect(&mut self, record: &PageRecord) {
        if record.url != self.seed_key {
            return;
        }
        let Some(final_url) = record.final_url.as_deref().and_then(|u| Url::parse(u).ok()) else {
            return;
        };
        if !self.allows(&final_url, false) {
            tracing::debug!("Seed redirected to {}, widening crawl scope", final_url);
            self.hosts.push(final_url);
        }
    }

    fn allows(&self, url: &Url, include_subdomains: bool) -> bool {
        self.hosts
            .iter()
            .any(|host| same_domain(host, url, include_subdomains))
    }
}

/// A fetch result plus which path produced it
struct FetchedContent {
    result: FetchResult,
    rendered: bool,
}

/// Links resolve against the post-redirect URL when it parses
fn base_url(result: &FetchResult, requested: &Url) -> Url {
    Url::parse(&result.final_url).unwrap_or_else(|_| requested.clone())
}
