use url::Url;

/// Normalizes a URL into its identity form
///
/// The normalized form is only ever compared and used as a map key; pages are
/// always fetched through their raw form.
///
/// # Normalization Steps
///
/// 1. Parse the URL; on failure fall back to a lowercased copy of the input
/// 2. Lowercase the scheme and host (an explicit port is kept)
/// 3. Trim trailing slashes from the path, keeping the root `/`
/// 4. Drop the query string and fragment
///
/// The function is total and idempotent:
/// `normalize(&normalize(u)) == normalize(u)` for every input.
///
/// # Examples
///
/// ```
/// use sumi_scroll::url::normalize;
///
/// assert_eq!(normalize("HTTPS://Docs.Example.COM/guide/?tab=1#install"), "https://docs.example.com/guide");
/// assert_eq!(normalize("https://docs.example.com"), "https://docs.example.com/");
/// ```
pub fn normalize(url_str: &str) -> String {
    let url = match Url::parse(url_str.trim()) {
        Ok(url) => url,
        Err(_) => {
            let lowered = url_str.to_lowercase();
            // A few non-ASCII capitals lower into ASCII and make the input parseable
            if Url::parse(lowered.trim()).is_ok() {
                return normalize(&lowered);
            }
            return lowered;
        }
    };

    let host = match url.host_str() {
        Some(host) => host.to_lowercase(),
        // Hostless URLs (mailto:, data:) only lose their query and fragment
        None => {
            let mut url = url;
            url.set_query(None);
            url.set_fragment(None);
            return url.as_str().to_string();
        }
    };

    let port = url.port().map(|p| format!(":{}", p)).unwrap_or_default();

    format!(
        "{}://{}{}{}",
        url.scheme().to_lowercase(),
        host,
        port,
        normalize_path(url.path())
    )
}

/// Trims trailing slashes; an empty result becomes the root path
fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}
