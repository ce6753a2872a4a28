//! URL handling module for Dogfetch
//!
//! This module provides URL normalization (for cache keys and reference-map
//! keys), domain matching, breed id derivation, and reference classification.

mod domain;
mod normalize;

use crate::config::{EnricherConfig, VideoProvider};
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, host_matches_any, matches_wildcard};
pub use normalize::normalize_url;

/// Derives the breed id from a canonical page path
///
/// The id is the lowercase hex MD5 of the path, so the same path always maps
/// to the same id across runs and machines.
///
/// # Examples
///
/// ```
/// use dogfetch::url::breed_id;
///
/// let id = breed_id("/all-dog-breeds/australian-shepherd.html");
/// assert_eq!(id.len(), 32);
/// assert_eq!(id, breed_id("/all-dog-breeds/australian-shepherd.html"));
/// ```
pub fn breed_id(path: &str) -> String {
    format!("{:x}", md5::compute(path.as_bytes()))
}

/// How a reference URL is resolved into metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind<'a> {
    /// Hosted video: ask the provider's oEmbed endpoint
    Video(&'a VideoProvider),
    /// Downloadable document: record the bare URL, never fetch
    Document,
    /// Anything else: fetch the page and read its meta tags
    Page,
}

/// Classifies a reference URL, first match wins
///
/// 1. Video provider domain
/// 2. Document extension on the last path segment
/// 3. Generic page
pub fn classify_reference<'a>(url: &Url, config: &'a EnricherConfig) -> ReferenceKind<'a> {
    if let Some(domain) = extract_domain(url) {
        if let Some(provider) = config
            .video_providers
            .iter()
            .find(|p| matches_wildcard(&p.domain, &domain))
        {
            return ReferenceKind::Video(provider);
        }
    }

    if has_document_extension(url, &config.document_extensions) {
        return ReferenceKind::Document;
    }

    ReferenceKind::Page
}

fn has_document_extension(url: &Url, extensions: &[String]) -> bool {
    let last_segment = url.path().rsplit('/').next().unwrap_or("");

    match last_segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => extensions
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(ext)),
        _ => false,
    }
}
