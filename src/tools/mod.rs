//! JSON tool contracts over the crawl engine and search
//!
//! Each tool takes a deserializable argument struct and returns a serializable
//! output struct. Tools never fail on page-level problems: those are reported
//! inside the output, so a caller always gets a well-formed JSON answer.
//! [`ToolBox::call_tool`] dispatches raw JSON arguments by tool name.

use crate::config::Config;
use crate::crawler::{Coordinator, CrawlLimits, CrawlReport, CrawlTarget, PageRecord};
use crate::search::{MetaSearch, SearchHit};
use crate::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Names accepted by [`ToolBox::call_tool`]
pub const TOOL_NAMES: &[&str] = &[
    "search_web_tool",
    "scrape_url_tool",
    "list_links_tool",
    "scrape_links_tool",
    "scrape_urls_tool",
];

fn default_true() -> bool {
    true
}

fn default_max_pages() -> usize {
    20
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchWebArgs {
    pub query: String,

    /// Falls back to `[search] max-results`
    #[serde(default)]
    pub max_results: Option<usize>,

    /// Falls back to `[search] region`
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchWebOutput {
    pub results: Vec<SearchHit>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeUrlArgs {
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeUrlOutput {
    pub url: String,
    pub title: String,
    pub text: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListLinksArgs {
    pub url: String,

    #[serde(default = "default_true")]
    pub same_domain_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkOutput {
    pub href: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListLinksOutput {
    pub url: String,
    pub links: Vec<LinkOutput>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeLinksArgs {
    pub url: String,

    #[serde(default = "default_true")]
    pub same_domain_only: bool,

    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

/// A successfully scraped page in a multi-page answer
#[derive(Debug, Clone, Serialize)]
pub struct PageOutput {
    pub url: String,
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeLinksOutput {
    pub base_url: String,
    pub pages: Vec<PageOutput>,

    /// One `"<url>: <message>"` entry per failed page
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeUrlsArgs {
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapeUrlsOutput {
    pub pages: Vec<PageOutput>,
    pub errors: Vec<String>,
}

/// Static description of a tool, for listing
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
}

/// All tools with one-line descriptions
pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "search_web_tool",
            description: "Web search returning titles, URLs and snippets",
        },
        ToolDescriptor {
            name: "scrape_url_tool",
            description: "Scrape one URL and return its title and main text",
        },
        ToolDescriptor {
            name: "list_links_tool",
            description: "List the links found on a page",
        },
        ToolDescriptor {
            name: "scrape_links_tool",
            description: "Crawl from a starting URL and scrape the pages reached",
        },
        ToolDescriptor {
            name: "scrape_urls_tool",
            description: "Scrape a list of URLs in parallel",
        },
    ]
}

/// The engine behind every tool
pub struct ToolBox {
    coordinator: Coordinator,
    search: MetaSearch,
}

impl ToolBox {
    /// Builds the default HTTP-backed toolbox from configuration
    pub fn new(config: Config) -> crate::Result<Self> {
        let search = MetaSearch::from_config(&config.search, &config.scraper.user_agent)?;
        let coordinator = Coordinator::new(config)?;
        Ok(Self::with_parts(coordinator, search))
    }

    pub fn with_parts(coordinator: Coordinator, search: MetaSearch) -> Self {
        Self {
            coordinator,
            search,
        }
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub async fn search_web(&self, args: SearchWebArgs) -> SearchWebOutput {
        let defaults = &self.coordinator.config().search;
        let max_results = args.max_results.unwrap_or(defaults.max_results);
        let region = args.region.as_deref().unwrap_or(defaults.region.as_str());

        match self.search.search(&args.query, max_results, region).await {
            Ok(outcome) => SearchWebOutput {
                results: outcome.results,
                error: outcome.error,
            },
            Err(e) => SearchWebOutput {
                results: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }

    pub async fn scrape_url(&self, args: ScrapeUrlArgs) -> ScrapeUrlOutput {
        match self.coordinator.scrape_one(&args.url).await {
            Ok(record) => ScrapeUrlOutput {
                url: record.final_url.clone().unwrap_or_else(|| args.url.clone()),
                title: record.title,
                text: record.text,
                error: record.error.map(|e| e.message),
            },
            Err(e) => ScrapeUrlOutput {
                url: args.url,
                title: String::new(),
                text: String::new(),
                error: Some(e.to_string()),
            },
        }
    }

    pub async fn list_links(&self, args: ListLinksArgs) -> ListLinksOutput {
        match self.coordinator.list_links(&args.url, args.same_domain_only).await {
            Ok(links) => ListLinksOutput {
                url: args.url,
                links: links
                    .into_iter()
                    .map(|link| LinkOutput {
                        href: link.url,
                        text: link.text,
                    })
                    .collect(),
                error: None,
            },
            Err(e) => {
                tracing::debug!("list_links for {} failed: {}", args.url, e);
                ListLinksOutput {
                    url: args.url,
                    links: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Seed crawl from `url`, bounded by `max_pages`
    pub async fn scrape_links(&self, args: ScrapeLinksArgs) -> ScrapeLinksOutput {
        let limits = CrawlLimits {
            max_pages: args.max_pages,
            same_domain_only: args.same_domain_only,
            ..CrawlLimits::from_config(self.coordinator.config())
        };

        match self
            .coordinator
            .crawl(CrawlTarget::Seed(args.url.clone()), limits)
            .await
        {
            Ok(report) => {
                let (pages, errors) = split_report(&report, report.pages.keys());
                ScrapeLinksOutput {
                    base_url: args.url,
                    pages,
                    errors,
                }
            }
            Err(e) => ScrapeLinksOutput {
                base_url: args.url,
                pages: Vec::new(),
                errors: vec![e.to_string()],
            },
        }
    }

    /// Batch scrape; every given URL is attempted and results keep input order
    pub async fn scrape_urls(&self, args: ScrapeUrlsArgs) -> ScrapeUrlsOutput {
        if args.urls.is_empty() {
            return ScrapeUrlsOutput::default();
        }

        let limits = CrawlLimits {
            max_pages: args.urls.len(),
            ..CrawlLimits::from_config(self.coordinator.config())
        };

        match self
            .coordinator
            .crawl(CrawlTarget::Batch(args.urls.clone()), limits)
            .await
        {
            Ok(report) => {
                let mut seen = std::collections::HashSet::new();
                let keys: Vec<String> = args
                    .urls
                    .iter()
                    .map(|raw| report_key(&report, raw))
                    .filter(|key| seen.insert(key.clone()))
                    .collect();
                let (pages, errors) = split_report(&report, keys.iter());
                ScrapeUrlsOutput { pages, errors }
            }
            Err(e) => ScrapeUrlsOutput {
                pages: Vec::new(),
                errors: vec![e.to_string()],
            },
        }
    }

    /// Dispatches a tool by name with raw JSON arguments
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        tracing::debug!("Calling tool {}", name);

        match name {
            "search_web_tool" => {
                let args = parse_args(name, arguments)?;
                to_value(name, self.search_web(args).await)
            }
            "scrape_url_tool" => {
                let args = parse_args(name, arguments)?;
                to_value(name, self.scrape_url(args).await)
            }
            "list_links_tool" => {
                let args = parse_args(name, arguments)?;
                to_value(name, self.list_links(args).await)
            }
            "scrape_links_tool" => {
                let args = parse_args(name, arguments)?;
                to_value(name, self.scrape_links(args).await)
            }
            "scrape_urls_tool" => {
                let args = parse_args(name, arguments)?;
                to_value(name, self.scrape_urls(args).await)
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|source| ToolError::InvalidArguments {
        tool: tool.to_string(),
        source,
    })
}

fn to_value<T: Serialize>(tool: &str, output: T) -> Result<Value, ToolError> {
    serde_json::to_value(output).map_err(|source| ToolError::Output {
        tool: tool.to_string(),
        source,
    })
}

/// Finds the report key a raw batch entry was recorded under
fn report_key(report: &CrawlReport, raw: &str) -> String {
    crate::url::parse_http_url(raw)
        .and_then(|url| crate::url::normalize_url(url.as_str()))
        .map(|url| url.to_string())
        .ok()
        .filter(|key| report.pages.contains_key(key))
        .unwrap_or_else(|| raw.trim().to_string())
}

/// Splits report records into page outputs and `"url: message"` errors
fn split_report<'a>(
    report: &CrawlReport,
    keys: impl Iterator<Item = &'a String>,
) -> (Vec<PageOutput>, Vec<String>) {
    let mut pages = Vec::new();
    let mut errors = Vec::new();

    for record in keys.filter_map(|key| report.pages.get(key)) {
        match &record.error {
            None => pages.push(page_output(record)),
            Some(error) => errors.push(format!("{}: {}", record.url, error)),
        }
    }

    (pages, errors)
}

fn page_output(record: &PageRecord) -> PageOutput {
    PageOutput {
        url: record.final_url.clone().unwrap_or_else(|| record.url.clone()),
        title: record.title.clone(),
        text: record.text.clone(),
    }
}
