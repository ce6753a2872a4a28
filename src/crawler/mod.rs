//! Crawler module for breed page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with browser-like headers and a timeout
//! - Reference enrichment with per-page fan-out
//! - Admission control bounding concurrent page crawls
//! - Overall crawl coordination

mod coordinator;
mod enricher;
mod fetcher;
mod scheduler;

pub use coordinator::{Coordinator, CrawlOutcome, PageReport};
pub use enricher::{EnrichSummary, Enricher};
pub use fetcher::{build_http_client, fetch_url, FetchedBody};
pub use scheduler::{AdmissionGate, AdmissionSlot};

use crate::config::Config;
use crate::dataset::Dataset;
use crate::DogfetchError;

/// Runs a complete crawl and returns the dataset
///
/// This is the main entry point. It will:
/// 1. Return the snapshot if one exists
/// 2. Otherwise scrape the breed index
/// 3. Crawl and enrich every breed page
/// 4. Write the new snapshot
///
/// # Example
///
/// ```no_run
/// use dogfetch::config::Config;
/// use dogfetch::crawler::fetch_breeds;
///
/// # async fn example() -> Result<(), dogfetch::DogfetchError> {
/// let dataset = fetch_breeds(Config::default()).await?;
/// println!("{} breeds", dataset.len());
/// # Ok(())
/// # }
/// ```
pub async fn fetch_breeds(config: Config) -> Result<Dataset, DogfetchError> {
    let coordinator = Coordinator::new(config)?;
    coordinator.run().await.map(|outcome| outcome.dataset)
}
