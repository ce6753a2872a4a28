use crate::config::types::{
    CacheConfig, Config, CrawlerConfig, EnricherConfig, FetcherConfig, SourceConfig,
};
use crate::ConfigError;
use url::Url;

/// Upper bound on admission slots; the catalog origin fails well before this
const MAX_CONCURRENT_PAGES: u32 = 500;

const MAX_TTL_SECS: u64 = crate::cache::MAX_TTL.as_secs();

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_crawler_config(&config.crawler)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_cache_config(&config.cache)?;
    validate_enricher_config(&config.enricher)?;
    Ok(())
}

/// Validates the catalog location
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    let origin = Url::parse(&config.origin)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid origin '{}': {}", config.origin, e)))?;

    if origin.scheme() != "http" && origin.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Origin '{}' must use HTTP or HTTPS",
            config.origin
        )));
    }

    if !config.index_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "index_path must start with '/', got '{}'",
            config.index_path
        )));
    }

    if !config.page_prefix.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "page_prefix must start with '/', got '{}'",
            config.page_prefix
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_pages < 1 || config.max_concurrent_pages > MAX_CONCURRENT_PAGES {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_pages must be between 1 and {}, got {}",
            MAX_CONCURRENT_PAGES, config.max_concurrent_pages
        )));
    }

    Ok(())
}

/// Validates request configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates cache configuration
fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "cache directory cannot be empty".to_string(),
        ));
    }

    if config.ttl_secs == 0 {
        return Err(ConfigError::Validation("ttl_secs must be >= 1".to_string()));
    }

    if config.ttl_secs > MAX_TTL_SECS {
        return Err(ConfigError::Validation(format!(
            "ttl_secs must be <= {}, got {}",
            MAX_TTL_SECS, config.ttl_secs
        )));
    }

    Ok(())
}

/// Validates reference enrichment configuration
fn validate_enricher_config(config: &EnricherConfig) -> Result<(), ConfigError> {
    for provider in &config.video_providers {
        validate_domain_pattern(&provider.domain)?;

        Url::parse(&provider.oembed_endpoint).map_err(|e| {
            ConfigError::InvalidUrl(format!(
                "Invalid oembed endpoint '{}': {}",
                provider.oembed_endpoint, e
            ))
        })?;
    }

    for pattern in &config.primary_sources {
        validate_domain_pattern(pattern)?;
    }

    for extension in &config.document_extensions {
        if extension.is_empty() || extension.starts_with('.') {
            return Err(ConfigError::Validation(format!(
                "document extension must be a bare suffix like 'pdf', got '{}'",
                extension
            )));
        }
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    match pattern.strip_prefix("*.") {
        Some(domain) => validate_domain_string(domain),
        None => validate_domain_string(pattern),
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}
