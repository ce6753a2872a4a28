//! Cache key derivation

use crate::url::normalize_url;
use crate::UrlError;
use sha2::{Digest, Sha512};

/// Computes the cache key for a URL
///
/// The key is the hex SHA-512 of the normalized URL (128 characters), so
/// equivalent spellings of one URL share an entry and distinct URLs do not
/// collide in practice.
pub fn cache_key(url: &str) -> Result<String, UrlError> {
    let normalized = normalize_url(url)?;
    Ok(hash_normalized(normalized.as_str()))
}

pub(crate) fn hash_normalized(normalized: &str) -> String {
    hex::encode(Sha512::digest(normalized.as_bytes()))
}
