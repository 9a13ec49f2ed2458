//! DuckDuckGo HTML and Lite result pages
//!
//! Both endpoints serve plain server-rendered HTML with no API key, which the
//! backends here request with `reqwest` and parse with `scraper`.

use super::{SearchBackend, SearchHit};
use crate::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use url::Url;

const HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const LITE_ENDPOINT: &str = "https://lite.duckduckgo.com/lite/";

/// Backend for the `html.duckduckgo.com` result page
pub struct DuckDuckGoHtml {
    client: Client,
    endpoint: String,
    timeout: Duration,
    user_agent: String,
}

impl DuckDuckGoHtml {
    pub fn new(client: Client, timeout: Duration, user_agent: &str) -> Self {
        Self::with_endpoint(client, HTML_ENDPOINT, timeout, user_agent)
    }

    pub fn with_endpoint(client: Client, endpoint: &str, timeout: Duration, user_agent: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            timeout,
            user_agent: user_agent.to_string(),
        }
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoHtml {
    fn name(&self) -> &str {
        "duckduckgo-html"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
        region: &str,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let html = fetch_results(
            &self.client,
            self.name(),
            &self.endpoint,
            query,
            region,
            self.timeout,
            &self.user_agent,
        )
        .await?;
        Ok(parse_html_results(&html, max_results))
    }
}

/// Backend for the table-based `lite.duckduckgo.com` result page
pub struct DuckDuckGoLite {
    client: Client,
    endpoint: String,
    timeout: Duration,
    user_agent: String,
}

impl DuckDuckGoLite {
    pub fn new(client: Client, timeout: Duration, user_agent: &str) -> Self {
        Self::with_endpoint(client, LITE_ENDPOINT, timeout, user_agent)
    }

    pub fn with_endpoint(client: Client, endpoint: &str, timeout: Duration, user_agent: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            timeout,
            user_agent: user_agent.to_string(),
        }
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoLite {
    fn name(&self) -> &str {
        "duckduckgo-lite"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
        region: &str,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let html = fetch_results(
            &self.client,
            self.name(),
            &self.endpoint,
            query,
            region,
            self.timeout,
            &self.user_agent,
        )
        .await?;
        Ok(parse_lite_results(&html, max_results))
    }
}

/// GETs a result page and returns its body
async fn fetch_results(
    client: &Client,
    backend: &str,
    endpoint: &str,
    query: &str,
    region: &str,
    timeout: Duration,
    user_agent: &str,
) -> Result<String, SearchError> {
    let request_error = |e: reqwest::Error| SearchError::Request {
        backend: backend.to_string(),
        message: e.to_string(),
    };

    let response = client
        .get(endpoint)
        .query(&[("q", query), ("kl", region)])
        .header(reqwest::header::USER_AGENT, user_agent)
        .timeout(timeout)
        .send()
        .await
        .map_err(request_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(SearchError::Status {
            backend: backend.to_string(),
            status_code: status.as_u16(),
        });
    }

    response.text().await.map_err(request_error)
}

/// Parses the HTML endpoint: one `div.result` per hit, ads skipped
pub fn parse_html_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    let (Ok(result_sel), Ok(title_sel), Ok(snippet_sel)) = (
        Selector::parse("div.result"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    let mut hits = Vec::new();

    for result in document.select(&result_sel) {
        if hits.len() >= max_results {
            break;
        }
        if result.value().classes().any(|class| class == "result--ad") {
            continue;
        }

        let Some(anchor) = result.select(&title_sel).next() else {
            continue;
        };
        let Some(url) = anchor.value().attr("href").and_then(unwrap_redirect) else {
            continue;
        };

        hits.push(SearchHit {
            title: element_text(anchor),
            url,
            snippet: result
                .select(&snippet_sel)
                .next()
                .map(element_text)
                .unwrap_or_default(),
        });
    }

    hits
}

/// Parses the Lite endpoint, where titles and snippets sit in sibling rows
///
/// The n-th `a.result-link` pairs with the n-th `td.result-snippet`.
pub fn parse_lite_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    let (Ok(link_sel), Ok(snippet_sel)) = (
        Selector::parse("a.result-link"),
        Selector::parse("td.result-snippet"),
    ) else {
        return Vec::new();
    };

    let snippets: Vec<String> = document.select(&snippet_sel).map(element_text).collect();

    document
        .select(&link_sel)
        .enumerate()
        .filter_map(|(index, anchor)| {
            let url = anchor.value().attr("href").and_then(unwrap_redirect)?;
            Some(SearchHit {
                title: element_text(anchor),
                url,
                snippet: snippets.get(index).cloned().unwrap_or_default(),
            })
        })
        .take(max_results)
        .collect()
}

/// Resolves a result href to the target URL
///
/// Result links usually go through `//duckduckgo.com/l/?uddg=<target>`; the
/// target is pulled out of the query. Non-HTTP(S) targets are dropped.
fn unwrap_redirect(href: &str) -> Option<String> {
    let href = href.trim();
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    let url = Url::parse(&absolute).ok()?;
    let target = if url.path() == "/l/" {
        let (_, target) = url.query_pairs().find(|(key, _)| key == "uddg")?;
        Url::parse(&target).ok()?
    } else {
        url
    };

    matches!(target.scheme(), "http" | "https").then(|| target.to_string())
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
