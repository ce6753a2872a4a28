//! Dogfetch: a dog breed catalog crawler
//!
//! This crate crawls a catalog of breed pages, extracts structured breed records,
//! enriches every record by following its outbound references, and keeps the
//! result as a deduplicated dataset that can be persisted as a JSON snapshot.
//!
//! All network access goes through a TTL-bound disk cache, and the number of
//! breed pages crawled at once is bounded by an admission gate.

pub mod cache;
pub mod config;
pub mod crawler;
pub mod dataset;
pub mod extract;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Dogfetch operations
#[derive(Debug, Error)]
pub enum DogfetchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Parse error for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Cache IO error at {path}: {source}")]
    CacheIo {
        path: String,
        source: std::io::Error,
    },

    #[error("Dataset conflict: record {id} was overwritten")]
    DatasetConflict { id: String },

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Admission gate closed before {url} could start")]
    AdmissionClosed { url: String },

    #[error("Page task for {url} panicked: {message}")]
    TaskPanicked { url: String, message: String },

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::PageState,
        to: state::PageState,
    },
}

impl DogfetchError {
    /// Returns true if this error came from the network or the remote server
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Self::Http { .. } | Self::Timeout { .. } | Self::HttpStatus { .. } | Self::Reqwest(_)
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Dogfetch operations
pub type Result<T> = std::result::Result<T, DogfetchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use cache::ContentCache;
pub use config::Config;
pub use crawler::{fetch_breeds, Coordinator, CrawlOutcome};
pub use dataset::{BreedRecord, BreedStore, Dataset, ReferenceData};
pub use state::PageState;
pub use url::{breed_id, normalize_url};
