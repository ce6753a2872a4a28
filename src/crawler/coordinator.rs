//! Crawler coordinator - main crawl orchestration logic
//!
//! This module drives a whole crawl:
//! - Short-circuiting on an existing dataset snapshot
//! - Scraping the seed index
//! - Running one task per breed page under the admission gate
//! - Walking each page through fetch, extraction and enrichment
//! - Collecting stored records and per-page outcomes at the final barrier

use crate::cache::ContentCache;
use crate::config::{validate, Config};
use crate::crawler::enricher::Enricher;
use crate::crawler::scheduler::AdmissionGate;
use crate::crawler::build_http_client;
use crate::dataset::{BreedRecord, BreedStore, Dataset};
use crate::extract::{scrape_index, Extraction, Extractor};
use crate::state::PageState;
use crate::url::breed_id;
use crate::DogfetchError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{Id, JoinError, JoinSet};
use url::Url;

/// Completed pages between progress log lines
const PROGRESS_INTERVAL: usize = 25;

/// Final state of one breed page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageReport {
    pub url: String,

    /// Either `Stored` or `Failed`
    pub state: PageState,

    /// Breed id, set once the page was stored
    pub id: Option<String>,

    /// Failure reason
    pub error: Option<String>,
}

/// Result of [`Coordinator::run`] or [`Coordinator::crawl`]
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub dataset: Dataset,

    /// One report per crawled page, in completion order; empty when the
    /// dataset came from a snapshot
    pub pages: Vec<PageReport>,

    pub from_snapshot: bool,
}

impl CrawlOutcome {
    pub fn stored(&self) -> impl Iterator<Item = &PageReport> {
        self.pages.iter().filter(|p| p.state == PageState::Stored)
    }

    pub fn failed(&self) -> impl Iterator<Item = &PageReport> {
        self.pages.iter().filter(|p| p.state == PageState::Failed)
    }
}

/// Main crawler coordinator structure
///
/// Owns everything a crawl needs: the HTTP client (inside the cache), the
/// content cache, the extractor, the enricher and the admission gate.
pub struct Coordinator {
    config: Arc<Config>,
    origin: Url,
    pipeline: PagePipeline,
    gate: AdmissionGate,
    fresh: bool,
}

/// Fetch, extract and enrich steps for one page, shared by page tasks
#[derive(Clone)]
struct PagePipeline {
    cache: Arc<ContentCache>,
    extractor: Arc<Extractor>,
    enricher: Enricher,
}

/// Validated per-page state machine
struct PageTracker {
    url: String,
    state: PageState,
}

/// Page task result before it is folded into the outcome
struct PageRun {
    report: PageReport,
    error: Option<DogfetchError>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// The configuration is validated first; invalid settings fail here
    /// rather than halfway through a crawl.
    pub fn new(config: Config) -> Result<Self, DogfetchError> {
        validate(&config)?;

        let origin = Url::parse(&config.source.origin)?;
        let client = build_http_client(&config.fetcher)?;
        let cache = Arc::new(ContentCache::from_config(&config.cache, client));
        let extractor = Arc::new(Extractor::new()?);
        let enricher = Enricher::new(
            Arc::clone(&cache),
            config.enricher.clone(),
            origin.host_str(),
        );
        let gate = AdmissionGate::new(config.crawler.max_concurrent_pages as usize);

        Ok(Self {
            config: Arc::new(config),
            origin,
            pipeline: PagePipeline {
                cache,
                extractor,
                enricher,
            },
            gate,
            fresh: false,
        })
    }

    /// Ignore any existing snapshot and crawl again
    pub fn with_fresh(mut self, fresh: bool) -> Self {
        self.fresh = fresh;
        self
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn cache(&self) -> &ContentCache {
        &self.pipeline.cache
    }

    /// Runs a complete crawl
    ///
    /// 1. Load the snapshot if enabled and present (unless fresh), and stop
    /// 2. Scrape the seed index; failure here is fatal
    /// 3. Crawl every listed page
    /// 4. Persist the dataset as the new snapshot
    pub async fn run(&self) -> Result<CrawlOutcome, DogfetchError> {
        let output = &self.config.output;

        if output.snapshot && !self.fresh {
            match Dataset::load_snapshot(&output.snapshot_path).await {
                Ok(Some(dataset)) => {
                    tracing::info!(
                        "Loaded {} breeds from snapshot {}",
                        dataset.len(),
                        output.snapshot_path.display()
                    );
                    return Ok(CrawlOutcome {
                        dataset,
                        pages: Vec::new(),
                        from_snapshot: true,
                    });
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(
                    "Ignoring unreadable snapshot {}: {}",
                    output.snapshot_path.display(),
                    e
                ),
            }
        }

        let seeds = self.scrape_seeds().await?;
        let outcome = self.crawl(seeds).await?;

        if output.snapshot {
            if outcome.dataset.is_empty() {
                tracing::warn!("No breeds stored, snapshot not written");
            } else {
                outcome.dataset.save_snapshot(&output.snapshot_path).await?;
            }
        }

        Ok(outcome)
    }

    /// Fetches the A-Z index and returns the breed page URLs it lists
    pub async fn scrape_seeds(&self) -> Result<Vec<Url>, DogfetchError> {
        let index_url = self.origin.join(&self.config.source.index_path)?;
        tracing::info!("Fetching breed index {}", index_url);

        let body = self.pipeline.cache.get_or_fetch(index_url.as_str()).await?;
        let seeds = scrape_index(&body, &self.origin, &self.config.source.page_prefix);

        if seeds.is_empty() {
            tracing::warn!("Breed index {} lists no pages", index_url);
        }
        Ok(seeds)
    }

    /// Crawls an explicit list of breed pages
    ///
    /// Failed pages are reported and skipped unless `fail-fast` is set, in
    /// which case no further pages are admitted, in-flight pages are aborted
    /// and the first failure is returned.
    pub async fn crawl(&self, seeds: Vec<Url>) -> Result<CrawlOutcome, DogfetchError> {
        let total = seeds.len();
        let fail_fast = self.config.crawler.fail_fast;
        let store = Arc::new(BreedStore::new());
        let abort = Arc::new(AtomicBool::new(false));
        let start_time = Instant::now();

        tracing::info!(
            "Crawling {} breed pages, at most {} at a time",
            total,
            self.gate.capacity()
        );

        let mut tasks = JoinSet::new();
        let mut task_urls: HashMap<Id, String> = HashMap::with_capacity(total);
        for url in seeds {
            if abort.load(Ordering::SeqCst) {
                break;
            }

            tracing::debug!("{}: {}", url, PageState::Queued);
            let Some(slot) = self.gate.admit().await else {
                tracing::warn!("Admission gate closed, {} not crawled", url);
                break;
            };
            if abort.load(Ordering::SeqCst) {
                break;
            }

            let pipeline = self.pipeline.clone();
            let store = Arc::clone(&store);
            let abort = Arc::clone(&abort);

            let page_url = url.to_string();
            let handle = tasks.spawn(async move {
                let run = pipeline.crawl_and_store(url, &store).await;
                if fail_fast && run.error.is_some() {
                    abort.store(true, Ordering::SeqCst);
                }
                // The slot is released only now, after the record is stored
                drop(slot);
                run
            });
            task_urls.insert(handle.id(), page_url);
        }

        if abort.load(Ordering::SeqCst) {
            tasks.abort_all();
        }

        let mut pages = Vec::with_capacity(total);
        let mut first_error = None;

        while let Some(joined) = tasks.join_next().await {
            let run = match joined {
                Ok(run) => run,
                Err(e) if e.is_cancelled() => continue,
                Err(e) => {
                    let url = task_urls.remove(&e.id()).unwrap_or_default();
                    panicked_run(url, &e)
                }
            };

            if let Some(error) = run.error {
                if fail_fast && first_error.is_none() {
                    first_error = Some(error);
                    tasks.abort_all();
                }
            }
            pages.push(run.report);

            if pages.len() % PROGRESS_INTERVAL == 0 {
                tracing::info!("Progress: {}/{} pages done", pages.len(), total);
            }
        }

        if let Some(error) = first_error {
            tracing::error!("Crawl aborted after a page failure: {}", error);
            return Err(error);
        }

        let dataset = match Arc::try_unwrap(store) {
            Ok(store) => store.into_dataset(),
            Err(store) => Dataset::from_records(store.get_all()),
        };

        let failed = pages.iter().filter(|p| p.state == PageState::Failed).count();
        tracing::info!(
            "Crawl completed: {} breeds stored, {} pages failed in {:?}",
            dataset.len(),
            failed,
            start_time.elapsed()
        );

        Ok(CrawlOutcome {
            dataset,
            pages,
            from_snapshot: false,
        })
    }

    /// Crawls one breed page end to end without storing it
    ///
    /// `url` may be absolute or a path on the catalog origin. The page still
    /// takes an admission slot while it runs.
    pub async fn crawl_page(&self, url: &str) -> Result<BreedRecord, DogfetchError> {
        let url = self.origin.join(url)?;
        let Some(_slot) = self.gate.admit().await else {
            return Err(DogfetchError::AdmissionClosed {
                url: url.to_string(),
            });
        };

        let mut tracker = PageTracker::new(url.as_str());
        match self.pipeline.process(&url, &mut tracker).await {
            Ok(record) => Ok(record),
            Err(e) => {
                tracker.fail();
                Err(e)
            }
        }
    }
}

impl PagePipeline {
    async fn crawl_and_store(&self, url: Url, store: &BreedStore) -> PageRun {
        let mut tracker = PageTracker::new(url.as_str());

        let result = async {
            let record = self.process(&url, &mut tracker).await?;
            let id = record.id.clone();

            if store.insert(record).is_some() {
                tracing::warn!("{}", DogfetchError::DatasetConflict { id: id.clone() });
            }
            tracker.advance(PageState::Stored)?;
            Ok::<_, DogfetchError>(id)
        }
        .await;

        match result {
            Ok(id) => PageRun {
                report: PageReport {
                    url: url.to_string(),
                    state: PageState::Stored,
                    id: Some(id),
                    error: None,
                },
                error: None,
            },
            Err(e) => {
                tracker.fail();
                tracing::warn!("Page {} failed: {}", url, e);
                PageRun {
                    report: PageReport {
                        url: url.to_string(),
                        state: PageState::Failed,
                        id: None,
                        error: Some(e.to_string()),
                    },
                    error: Some(e),
                }
            }
        }
    }

    /// Fetch, extract and enrich one page
    async fn process(
        &self,
        url: &Url,
        tracker: &mut PageTracker,
    ) -> Result<BreedRecord, DogfetchError> {
        tracker.advance(PageState::Fetching)?;
        let body = self.cache.get_or_fetch(url.as_str()).await?;

        tracker.advance(PageState::Extracting)?;
        let Extraction {
            mut record,
            mut references,
        } = self.extractor.extract(&body, url);

        record.id = breed_id(url.path());
        if record.name.is_empty() {
            tracing::warn!("No breed name found on {}", url);
        }

        // The page itself is always one of its references
        if !references.contains(url) {
            references.push(url.clone());
        }

        tracker.advance(PageState::Enriching)?;
        let (record, summary) = self.enricher.enrich(record, &references).await;
        tracing::debug!(
            "Enriched {}: {} pages, {} embeds, {} markers, {} new images",
            url,
            summary.pages,
            summary.embeds,
            summary.opaque,
            summary.images_added
        );

        Ok(record)
    }
}

/// Failed outcome for a page whose task panicked instead of returning
fn panicked_run(url: String, error: &JoinError) -> PageRun {
    let error = DogfetchError::TaskPanicked {
        url: url.clone(),
        message: error.to_string(),
    };
    tracing::error!("{}", error);

    PageRun {
        report: PageReport {
            url,
            state: PageState::Failed,
            id: None,
            error: Some(error.to_string()),
        },
        error: Some(error),
    }
}

impl PageTracker {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            state: PageState::Queued,
        }
    }

    fn advance(&mut self, next: PageState) -> Result<(), DogfetchError> {
        if !self.state.can_transition_to(next) {
            return Err(DogfetchError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        tracing::debug!("{}: {} -> {}", self.url, self.state, next);
        self.state = next;
        Ok(())
    }

    fn fail(&mut self) {
        if self.state.is_active() {
            tracing::debug!("{}: {} -> {}", self.url, self.state, PageState::Failed);
            self.state = PageState::Failed;
        }
    }
}
