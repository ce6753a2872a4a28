//! Metadata document stored next to each cached body

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Metadata for one cached response
///
/// Serialized as `<key>.json` beside the `<key>.body` blob it describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// SHA-512 of the normalized URL
    pub key: String,

    /// URL as requested
    pub url: String,

    pub fetched_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,

    /// Location of the raw body blob
    pub body_path: PathBuf,

    pub status_code: u16,

    pub content_type: String,

    /// Body size in bytes, checked on read to detect truncated blobs
    pub body_len: u64,
}

impl CacheEntry {
    /// Returns true while `now` is before the expiry time
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        !self.is_valid_at(Utc::now())
    }

    /// How long ago the body was fetched
    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }
}
