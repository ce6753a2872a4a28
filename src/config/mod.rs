//! Configuration module for Dogfetch
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so an empty file (or no file at all) yields a
//! configuration that crawls the public breed catalog.
//!
//! # Example
//!
//! ```no_run
//! use dogfetch::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("dogfetch.toml")).unwrap();
//! println!("Crawling at most {} pages at once", config.crawler.max_concurrent_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CacheConfig, Config, CrawlerConfig, EnricherConfig, FetcherConfig, OutputConfig,
    SourceConfig, VideoProvider,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
