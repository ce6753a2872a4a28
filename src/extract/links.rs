//! Link resolution for reference and gallery URLs

use url::Url;

/// A reference link resolved to an absolute URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub url: Url,

    /// True when the href was a path on the catalog itself
    pub relative: bool,
}

/// Resolves an href to an absolute http(s) URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only anchors
/// - invalid URLs, or non-HTTP(S) URLs after resolution
///
/// Protocol-relative links (`//host/path`) always resolve to `https:`.
pub fn resolve_link(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let resolved = match href.strip_prefix("//") {
        Some(rest) => Url::parse(&format!("https://{}", rest)),
        None => base.join(href),
    }
    .ok()?;

    match resolved.scheme() {
        "http" | "https" => Some(resolved),
        _ => None,
    }
}

/// Resolves a reference href and records whether it was catalog-relative
pub fn resolve_reference(href: &str, base: &Url) -> Option<ResolvedLink> {
    let url = resolve_link(href, base)?;
    Some(ResolvedLink {
        url,
        relative: is_relative(href.trim()),
    })
}

fn is_relative(href: &str) -> bool {
    !href.starts_with("//")
        && matches!(Url::parse(href), Err(url::ParseError::RelativeUrlWithoutBase))
}
