use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host, it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use flocrawl::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("https://sub.example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("sub.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks whether `candidate` lives on the same host as `base`
///
/// The match is exact unless `include_subdomains` is set, in which case any
/// subdomain of the base host is accepted too (`docs.example.com` for
/// `example.com`, but never `notexample.com`). Ports are not compared.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use flocrawl::url::same_domain;
///
/// let base = Url::parse("https://example.com/a").unwrap();
/// let sub = Url::parse("https://docs.example.com/b").unwrap();
/// assert!(!same_domain(&base, &sub, false));
/// assert!(same_domain(&base, &sub, true));
/// ```
pub fn same_domain(base: &Url, candidate: &Url, include_subdomains: bool) -> bool {
    let (Some(base_host), Some(host)) = (extract_domain(base), extract_domain(candidate)) else {
        return false;
    };

    if host == base_host {
        return true;
    }

    include_subdomains
        && host.len() > base_host.len()
        && host.ends_with(&base_host)
        && host.as_bytes()[host.len() - base_host.len() - 1] == b'.'
}
