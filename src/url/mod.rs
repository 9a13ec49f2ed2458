//! URL handling module for Flocrawl
//!
//! This module provides URL normalization (the identity key of a crawled page),
//! validation of caller-supplied URLs, and host comparison for the same-domain
//! filter.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, same_domain};
pub use normalize::normalize_url;

use crate::{UrlError, UrlResult};
use url::Url;

/// Parses a caller-supplied URL and checks that it is absolute http(s) with a host
///
/// # Examples
///
/// ```
/// use flocrawl::url::parse_http_url;
///
/// assert!(parse_http_url("https://example.com/page").is_ok());
/// assert!(parse_http_url("ftp://example.com/file").is_err());
/// assert!(parse_http_url("/relative/path").is_err());
/// ```
pub fn parse_http_url(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}
