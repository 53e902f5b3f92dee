//! HTML parser for extracting navigation links
//!
//! Only links inside elements matched by the navigation selector are
//! followed. Each link keeps its anchor text, which feeds the queue priority.

use scraper::{Html, Selector};
use url::Url;

/// A link found in the navigation of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    /// Absolute URL the link points to
    pub url: Url,

    /// Anchor text with whitespace collapsed
    pub text: String,
}

/// Extracts links from every element matching `nav_selector`
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` descendants of each navigation element
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same page anchors)
/// - Anything that is not http(s) after resolution
///
/// Links appear in document order; duplicates are kept.
///
/// # Example
///
/// ```no_run
/// use scraper::Selector;
/// use sumi_scroll::crawler::extract_navigation_links;
/// use url::Url;
///
/// let html = r#"<nav><a href="/docs/intro">Intro</a></nav>"#;
/// let base = Url::parse("https://x.test/docs/").unwrap();
/// let nav = Selector::parse("nav").unwrap();
/// let links = extract_navigation_links(html, &base, &nav);
/// assert_eq!(links[0].url.as_str(), "https://x.test/docs/intro");
/// ```
pub fn extract_navigation_links(html: &str, base_url: &Url, nav_selector: &Selector) -> Vec<NavLink> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return links;
    };

    for nav in document.select(nav_selector) {
        for element in nav.select(&a_selector) {
            // Skip if it has the download attribute
            if element.value().attr("download").is_some() {
                continue;
            }

            let Some(href) = element.value().attr("href") else {
                continue;
            };

            if let Some(url) = resolve_link(href, base_url) {
                let text = element
                    .text()
                    .collect::<Vec<_>>()
                    .join(" ")
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ");
                links.push(NavLink { url, text });
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    // Skip empty hrefs
    if href.is_empty() {
        return None;
    }

    // Skip special schemes
    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    // Skip fragment-only links (same page anchors)
    if href.starts_with('#') {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute),
        _ => None,
    }
}
