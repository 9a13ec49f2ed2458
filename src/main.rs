//! Flocrawl main entry point
//!
//! Command-line front end to the Flocrawl tools. Every command prints a single
//! pretty JSON document on stdout; logs go to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use flocrawl::config::{load_config_with_hash, Config};
use flocrawl::crawler::{Coordinator, CrawlLimits, CrawlTarget, HttpFetcher, RenderBackend};
use flocrawl::search::MetaSearch;
use flocrawl::tools::{
    ListLinksArgs, ScrapeLinksArgs, ScrapeUrlArgs, ScrapeUrlsArgs, SearchWebArgs, ToolBox,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Flocrawl: web search, scraping and bounded crawling
///
/// Fetches pages under size, time and concurrency budgets, falls back to a
/// headless browser for JavaScript shells when enabled, and reduces pages to
/// readable text and links.
#[derive(Parser, Debug)]
#[command(name = "flocrawl")]
#[command(version = "1.0.0")]
#[command(about = "Web search, scraping and bounded crawling", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search the web
    Search {
        query: String,

        /// Maximum number of results
        #[arg(long)]
        max_results: Option<usize>,

        /// Region code, e.g. wt-wt, us-en
        #[arg(long)]
        region: Option<String>,
    },

    /// Scrape a single page
    Scrape { url: String },

    /// List the links on a page
    Links {
        url: String,

        /// Keep links to other domains
        #[arg(long)]
        all_domains: bool,
    },

    /// Crawl from a seed URL and print the full report
    Crawl {
        url: String,

        /// Maximum pages visited
        #[arg(long)]
        max_pages: Option<usize>,

        /// Maximum fetches in flight
        #[arg(long)]
        max_concurrent: Option<usize>,

        /// Follow links to other domains
        #[arg(long)]
        all_domains: bool,
    },

    /// Scrape a list of URLs in parallel
    Batch {
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Invoke a tool by name with JSON arguments
    Tool {
        name: String,

        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        arguments: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_configuration(cli.config.as_deref())?;
    let toolbox = build_toolbox(config).await?;

    match cli.command {
        Command::Search {
            query,
            max_results,
            region,
        } => {
            let output = toolbox
                .search_web(SearchWebArgs {
                    query,
                    max_results,
                    region,
                })
                .await;
            print_json(&output)
        }
        Command::Scrape { url } => print_json(&toolbox.scrape_url(ScrapeUrlArgs { url }).await),
        Command::Links { url, all_domains } => {
            let output = toolbox
                .list_links(ListLinksArgs {
                    url,
                    same_domain_only: !all_domains,
                })
                .await;
            print_json(&output)
        }
        Command::Crawl {
            url,
            max_pages,
            max_concurrent,
            all_domains,
        } => handle_crawl(toolbox.coordinator(), url, max_pages, max_concurrent, all_domains).await,
        Command::Batch { urls } => print_json(&toolbox.scrape_urls(ScrapeUrlsArgs { urls }).await),
        Command::Tool { name, arguments } => {
            let arguments = serde_json::from_str(&arguments)
                .with_context(|| format!("Tool arguments are not valid JSON: {}", arguments))?;
            let output = toolbox.call_tool(&name, arguments).await?;
            print_json(&output)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("flocrawl=info,warn"),
            1 => EnvFilter::new("flocrawl=debug,info"),
            2 => EnvFilter::new("flocrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file if one was given, otherwise the defaults
fn load_configuration(path: Option<&std::path::Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::debug!("No configuration file given, using defaults");
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

/// Wires the toolbox, launching a browser when rendering is enabled
async fn build_toolbox(config: Config) -> anyhow::Result<ToolBox> {
    let renderer = build_renderer(&config).await;
    let search = MetaSearch::from_config(&config.search, &config.scraper.user_agent)?;
    let fetcher = Arc::new(HttpFetcher::new()?);
    let coordinator = Coordinator::with_backends(config, fetcher, renderer)?;
    Ok(ToolBox::with_parts(coordinator, search))
}

#[cfg(feature = "browser")]
async fn build_renderer(config: &Config) -> Arc<dyn RenderBackend> {
    use flocrawl::crawler::{ChromeRenderer, NoRenderer};

    if !config.render.enabled {
        return Arc::new(NoRenderer);
    }

    match ChromeRenderer::launch(&config.scraper.user_agent).await {
        Ok(renderer) => Arc::new(renderer),
        Err(e) => {
            tracing::warn!("Render fallback disabled: {}", e);
            Arc::new(NoRenderer)
        }
    }
}

#[cfg(not(feature = "browser"))]
async fn build_renderer(config: &Config) -> Arc<dyn RenderBackend> {
    if config.render.enabled {
        tracing::warn!("Rendering is enabled but this build has no browser support");
    }
    Arc::new(flocrawl::crawler::NoRenderer)
}

/// Handles the crawl command, printing the full report
async fn handle_crawl(
    coordinator: &Coordinator,
    url: String,
    max_pages: Option<usize>,
    max_concurrent: Option<usize>,
    all_domains: bool,
) -> anyhow::Result<()> {
    let defaults = CrawlLimits::from_config(coordinator.config());
    let limits = CrawlLimits {
        max_pages: max_pages.unwrap_or(defaults.max_pages),
        max_concurrent: max_concurrent.unwrap_or(defaults.max_concurrent),
        same_domain_only: !all_domains,
    };

    match coordinator.crawl(CrawlTarget::Seed(url), limits).await {
        Ok(report) => {
            tracing::info!(
                "Crawl completed: {} succeeded, {} failed",
                report.stats.succeeded,
                report.stats.failed
            );
            print_json(&report)
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
