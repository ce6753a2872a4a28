//! HTTP fetcher implementation
//!
//! This module performs the single GET behind every cache miss:
//! - Building an HTTP client with browser-like default headers
//! - Bounding each request with a timeout
//! - Classifying failures into timeout, transport and status errors
//!
//! There is no retry here; callers decide what a failure means.

use crate::config::FetcherConfig;
use crate::{ConfigError, DogfetchError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Maximum redirect hops followed for one request
const MAX_REDIRECTS: usize = 10;

/// A successful (2xx) response
#[derive(Debug, Clone)]
pub struct FetchedBody {
    /// Final URL after redirects
    pub final_url: String,

    pub status_code: u16,

    /// Content-Type header value, empty if absent
    pub content_type: String,

    pub body: Vec<u8>,
}

/// Builds an HTTP client from the fetcher configuration
///
/// The client sends a browser User-Agent plus Accept and Accept-Language
/// headers on every request, and keeps no cookies between calls.
///
/// # Example
///
/// ```
/// use dogfetch::config::FetcherConfig;
/// use dogfetch::crawler::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, DogfetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, header_value("accept", &config.accept)?);
    headers.insert(
        ACCEPT_LANGUAGE,
        header_value("accept_language", &config.accept_language)?,
    );

    let timeout = Duration::from_secs(config.timeout_secs);

    let client = Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, DogfetchError> {
    HeaderValue::from_str(value).map_err(|e| {
        DogfetchError::Config(ConfigError::Validation(format!(
            "{} is not a valid header value: {}",
            name, e
        )))
    })
}

/// Fetches a URL once
///
/// # Error Mapping
///
/// | Condition | Error |
/// |-----------|-------|
/// | Request or body read exceeded the timeout | `Timeout` |
/// | Connection, TLS or redirect failure | `Http` |
/// | Non-2xx status | `HttpStatus` |
pub async fn fetch_url(client: &Client, url: &str) -> Result<FetchedBody, DogfetchError> {
    tracing::trace!("GET {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| classify_error(url, e))?;

    let status = response.status();
    let final_url = response.url().to_string();

    if !status.is_success() {
        return Err(DogfetchError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let body = response
        .bytes()
        .await
        .map_err(|e| classify_error(url, e))?;

    Ok(FetchedBody {
        final_url,
        status_code: status.as_u16(),
        content_type,
        body: body.to_vec(),
    })
}

fn classify_error(url: &str, error: reqwest::Error) -> DogfetchError {
    if error.is_timeout() {
        DogfetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        DogfetchError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
