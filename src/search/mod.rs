//! Web search over keyless HTML endpoints
//!
//! A [`SearchBackend`] turns a query into ranked [`SearchHit`]s. [`MetaSearch`]
//! chains several backends and falls through to the next one whenever a
//! backend fails or comes back empty, so a single flaky endpoint degrades the
//! result instead of failing it.

mod duckduckgo;

pub use duckduckgo::{DuckDuckGoHtml, DuckDuckGoLite};

use crate::config::SearchConfig;
use crate::crawler::build_http_client;
use crate::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Backend names accepted in `[search] backends`
pub const KNOWN_BACKENDS: &[&str] = &["duckduckgo-html", "duckduckgo-lite"];

/// One ranked search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// A source of ranked search results
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Name used in configuration and logs
    fn name(&self) -> &str;

    /// Runs a query, returning at most `max_results` hits in rank order
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        region: &str,
    ) -> Result<Vec<SearchHit>, SearchError>;
}

/// Builds the backend registered under `name`
pub fn backend_by_name(
    name: &str,
    client: Client,
    config: &SearchConfig,
    user_agent: &str,
) -> Result<Box<dyn SearchBackend>, SearchError> {
    match name {
        "duckduckgo-html" => Ok(Box::new(DuckDuckGoHtml::new(
            client,
            config.timeout(),
            user_agent,
        ))),
        "duckduckgo-lite" => Ok(Box::new(DuckDuckGoLite::new(
            client,
            config.timeout(),
            user_agent,
        ))),
        other => Err(SearchError::UnknownBackend(other.to_string())),
    }
}

/// Result of a fallback search
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<SearchHit>,

    /// Last backend failure, set only when no backend produced results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Tries backends in order until one returns results
pub struct MetaSearch {
    backends: Vec<Box<dyn SearchBackend>>,
}

impl MetaSearch {
    /// Builds the configured backend chain over one shared HTTP client
    pub fn from_config(config: &SearchConfig, user_agent: &str) -> crate::Result<Self> {
        let client = build_http_client()?;
        let backends = config
            .backends
            .iter()
            .map(|name| backend_by_name(name, client.clone(), config, user_agent))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { backends })
    }

    pub fn with_backends(backends: Vec<Box<dyn SearchBackend>>) -> Self {
        Self { backends }
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Searches with fallback
    ///
    /// Only an empty query is an error. When every backend fails the outcome
    /// has no results and carries the last failure message.
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
        region: &str,
    ) -> Result<SearchOutcome, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let mut last_error = None;

        for backend in &self.backends {
            match backend.search(query, max_results, region).await {
                Ok(mut results) if !results.is_empty() => {
                    results.truncate(max_results);
                    tracing::debug!(
                        "{} returned {} results for {:?}",
                        backend.name(),
                        results.len(),
                        query
                    );
                    return Ok(SearchOutcome {
                        results,
                        error: None,
                    });
                }
                Ok(_) => {
                    tracing::debug!("{} returned no results, trying next", backend.name());
                }
                Err(e) => {
                    tracing::warn!("Search backend {} failed: {}. Trying next.", backend.name(), e);
                    last_error = Some(e.to_string());
                }
            }
        }

        if let Some(error) = &last_error {
            tracing::warn!("All search backends failed, last error: {}", error);
        }

        Ok(SearchOutcome {
            results: Vec::new(),
            error: last_error,
        })
    }
}
