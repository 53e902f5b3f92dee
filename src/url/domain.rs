use url::Url;

/// Extracts the lowercase host from a URL
///
/// The port and scheme are not part of the result, so `http://` and
/// `https://` links to the same site yield the same host.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_scroll::url::extract_host;
///
/// let url = Url::parse("https://Docs.Example.com:8443/path").unwrap();
/// assert_eq!(extract_host(&url), Some("docs.example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Parses `raw` and checks whether its host equals `allowed_host`
///
/// Unparseable or hostless URLs never match.
///
/// # Examples
///
/// ```
/// use sumi_scroll::url::host_matches;
///
/// assert!(host_matches("http://docs.example.com/a", "docs.example.com"));
/// assert!(!host_matches("https://blog.docs.example.com/a", "docs.example.com"));
/// ```
pub fn host_matches(raw: &str, allowed_host: &str) -> bool {
    Url::parse(raw)
        .ok()
        .and_then(|url| extract_host(&url))
        .is_some_and(|host| host == allowed_host.to_lowercase())
}

/// Counts the non-empty segments of a URL path
///
/// `/` has depth 0, `/docs/` depth 1 and `/docs/intro` depth 2.
pub fn path_depth(url: &Url) -> u32 {
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).count() as u32)
        .unwrap_or(0)
}
