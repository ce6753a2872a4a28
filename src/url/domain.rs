use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use dogfetch::url::extract_domain;
///
/// let url = Url::parse("https://WWW.YouTube.com/watch?v=abc").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.youtube.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks if a domain matches a pattern
///
/// `"youtu.be"` matches only itself; `"*.youtube.com"` matches the bare
/// domain and any subdomain of it.
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => candidate == pattern,
    }
}

/// Returns true if the URL's host matches any of the patterns
pub fn host_matches_any<S: AsRef<str>>(url: &Url, patterns: &[S]) -> bool {
    extract_domain(url).is_some_and(|domain| {
        patterns
            .iter()
            .any(|pattern| matches_wildcard(pattern.as_ref(), &domain))
    })
}
