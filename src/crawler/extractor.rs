//! HTML extractor for readable text, title and outbound links
//!
//! Extraction is heuristic and never fails: malformed HTML is parsed leniently
//! and anything unusable simply yields empty text or no links.

use crate::config::ScraperConfig;
use crate::url::{normalize_url, same_domain};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

/// Elements whose whole subtree is dropped before text extraction
const STRIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "nav", "footer", "aside", "template", "svg", "iframe",
];

/// Containers tried in order when looking for the main content
const MAIN_CONTENT_SELECTORS: &[&str] = &["main", "article", "body"];

/// Maximum characters kept from a link's anchor text
const MAX_LINK_TEXT_CHARS: usize = 200;

/// Options controlling extraction
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Maximum links returned
    pub max_links: usize,

    /// Maximum characters of text returned
    pub max_text_chars: usize,

    /// Keep only links on the base URL's host
    pub same_domain_only: bool,

    /// Let the same-domain filter accept subdomains too
    pub include_subdomains: bool,
}

impl ExtractOptions {
    pub fn from_config(config: &ScraperConfig, same_domain_only: bool) -> Self {
        Self {
            max_links: config.max_links_per_page,
            max_text_chars: config.max_text_chars,
            same_domain_only,
            include_subdomains: config.include_subdomains,
        }
    }
}

/// An outbound link with its anchor text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Absolute URL, fragment removed
    pub url: String,

    /// Anchor text, or the URL when the anchor has none
    pub text: String,
}

/// Everything pulled out of one HTML document
#[derive(Debug, Clone, Default)]
pub struct ExtractedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Readable main text, one text run per line
    pub text: String,

    /// Outbound links in first-seen order
    pub links: Vec<Link>,
}

/// Parses HTML content and extracts title, main text and links
///
/// # Text Rules
///
/// - `script`, `style`, `noscript`, `nav`, `footer`, `aside` (and similar) subtrees are dropped
/// - Content is taken from `<main>`, else `<article>`, else `<body>`, else the whole document
/// - Whitespace inside each text run is collapsed; empty runs are dropped
///
/// # Link Rules
///
/// - Every `<a href>` is resolved against `base_url`
/// - Empty and fragment-only hrefs are skipped, as are non-HTTP(S) targets
///   (`mailto:`, `javascript:`, `tel:`, `data:` ...)
/// - Duplicates (by normalized URL) are removed, keeping the first occurrence
/// - The same-domain filter runs before the list is cut to `max_links`
///
/// # Example
///
/// ```
/// use flocrawl::crawler::{extract, ExtractOptions};
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let options = ExtractOptions {
///     max_links: 10,
///     max_text_chars: 1000,
///     same_domain_only: false,
///     include_subdomains: false,
/// };
/// let page = extract(html, &base_url, &options);
/// assert_eq!(page.title, Some("Test".to_string()));
/// assert_eq!(page.links[0].url, "https://example.com/page");
/// ```
pub fn extract(html: &str, base_url: &Url, options: &ExtractOptions) -> ExtractedPage {
    let document = Html::parse_document(html);

    ExtractedPage {
        title: extract_title(&document),
        text: extract_text(&document, options.max_text_chars),
        links: extract_links(&document, base_url, options),
    }
}

/// Convenience wrapper returning only the readable text of an HTML string
pub fn extract_text_from_html(html: &str, max_chars: usize) -> String {
    extract_text(&Html::parse_document(html), max_chars)
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Extracts readable text from the main content container
fn extract_text(document: &Html, max_chars: usize) -> String {
    let mut lines = Vec::new();

    if let Some(root) = main_content(document) {
        collect_text(root, &mut lines);
    }

    if lines.is_empty() {
        collect_text(document.root_element(), &mut lines);
    }

    truncate_chars(lines.join("\n"), max_chars)
}

/// Finds the first matching main-content container
fn main_content(document: &Html) -> Option<ElementRef<'_>> {
    MAIN_CONTENT_SELECTORS.iter().find_map(|selector| {
        let selector = Selector::parse(selector).ok()?;
        document.select(&selector).next()
    })
}

/// Walks an element, pushing one collapsed line per non-empty text run
fn collect_text(element: ElementRef<'_>, lines: &mut Vec<String>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            let line = collapse_whitespace(text);
            if !line.is_empty() {
                lines.push(line);
            }
        } else if let Some(child_element) = ElementRef::wrap(child) {
            if !STRIPPED_ELEMENTS.contains(&child_element.value().name()) {
                collect_text(child_element, lines);
            }
        }
    }
}

/// Extracts outbound links from the HTML document
fn extract_links(document: &Html, base_url: &Url, options: &ExtractOptions) -> Vec<Link> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&a_selector) {
        if links.len() >= options.max_links {
            break;
        }

        let Some(url) = element.value().attr("href").and_then(|href| resolve_link(href, base_url))
        else {
            continue;
        };

        if options.same_domain_only && !same_domain(base_url, &url, options.include_subdomains) {
            continue;
        }

        let key = match normalize_url(url.as_str()) {
            Ok(normalized) => normalized.to_string(),
            Err(_) => continue,
        };
        if !seen.insert(key) {
            continue;
        }

        let text = collapse_whitespace(&element.text().collect::<String>());
        let text = if text.is_empty() {
            url.to_string()
        } else {
            truncate_chars(text, MAX_LINK_TEXT_CHARS)
        };

        links.push(Link {
            url: url.to_string(),
            text,
        });
    }

    links
}

/// Resolves a link href to an absolute HTTP(S) URL without fragment
///
/// Returns None if the link should be excluded:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel:, data: and any other non-HTTP(S) scheme
/// - hrefs that do not resolve to a valid URL
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }

    absolute_url.set_fragment(None);
    Some(absolute_url)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text,
    }
}
