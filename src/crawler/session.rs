//! Per-invocation crawl state
//!
//! A [`CrawlSession`] owns the visited set, the pending queue and the results
//! of one crawl. It is only ever mutated by the coordinator's dispatch loop;
//! network work happens elsewhere and hands finished records back.
//!
//! Invariants:
//! - `visited.len() <= max_pages`
//! - a key enters `visited` at most once
//! - every key in `results` is in `visited`

use crate::crawler::record::{PageError, PageRecord, StopReason};
use crate::url::normalize_url;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use url::Url;

/// A URL waiting to be dispatched
#[derive(Debug, Clone)]
pub struct QueuedUrl {
    /// Normalized identity key
    pub key: String,

    /// The URL actually requested
    pub url: Url,
}

/// Mutable state of one crawl
#[derive(Debug)]
pub struct CrawlSession {
    max_pages: usize,
    visited: BTreeSet<String>,
    queued: HashSet<String>,
    queue: VecDeque<QueuedUrl>,
    results: BTreeMap<String, PageRecord>,
    overflow: usize,
}

impl CrawlSession {
    pub fn new(max_pages: usize) -> Self {
        Self {
            max_pages,
            visited: BTreeSet::new(),
            queued: HashSet::new(),
            queue: VecDeque::new(),
            results: BTreeMap::new(),
            overflow: 0,
        }
    }

    /// True once the page ceiling has been reached
    pub fn is_full(&self) -> bool {
        self.visited.len() >= self.max_pages
    }

    /// Adds a URL to the back of the queue
    ///
    /// Returns false if the URL is malformed, already visited, already queued,
    /// or the session is full.
    pub fn enqueue(&mut self, url: &Url) -> bool {
        let key = match normalize_url(url.as_str()) {
            Ok(normalized) => normalized.to_string(),
            Err(e) => {
                tracing::trace!("Not queueing {}: {}", url, e);
                return false;
            }
        };

        if self.visited.contains(&key) || self.queued.contains(&key) {
            return false;
        }

        if self.is_full() {
            self.overflow += 1;
            return false;
        }

        self.queued.insert(key.clone());
        self.queue.push_back(QueuedUrl {
            key,
            url: url.clone(),
        });
        true
    }

    /// Pops the next URL and marks it visited
    ///
    /// Marking happens here, before the fetch is dispatched, so a URL can never
    /// be handed to two workers.
    pub fn next_dispatch(&mut self) -> Option<QueuedUrl> {
        while !self.is_full() {
            let next = self.queue.pop_front()?;
            self.queued.remove(&next.key);
            if self.visited.insert(next.key.clone()) {
                return Some(next);
            }
        }
        None
    }

    /// Records an input that could not even be parsed, under its raw text
    ///
    /// The raw key is marked visited so the result set stays a subset of the
    /// visited set. Returns false if there is no room left or the key was seen.
    pub fn reject(&mut self, raw: &str, error: PageError) -> bool {
        if self.is_full() {
            self.overflow += 1;
            return false;
        }

        let key = raw.trim().to_string();
        if !self.visited.insert(key.clone()) {
            return false;
        }

        self.results.insert(key.clone(), PageRecord::failed(key, error));
        true
    }

    /// Stores a finished record; each visited key is written exactly once
    pub fn record(&mut self, record: PageRecord) {
        if !self.visited.contains(&record.url) {
            tracing::warn!("Dropping record for unvisited URL {}", record.url);
            return;
        }
        self.results.entry(record.url.clone()).or_insert(record);
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn results(&self) -> &BTreeMap<String, PageRecord> {
        &self.results
    }

    pub fn stop_reason(&self) -> StopReason {
        if self.overflow > 0 || !self.queue.is_empty() {
            StopReason::PageLimitReached
        } else {
            StopReason::QueueExhausted
        }
    }

    /// Consumes the session, returning the visited set and results
    pub fn finish(self) -> (BTreeSet<String>, BTreeMap<String, PageRecord>) {
        (self.visited, self.results)
    }
}
