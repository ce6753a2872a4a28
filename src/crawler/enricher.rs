//! Reference enrichment
//!
//! Every outbound reference of a breed page is resolved by its own task:
//! - Video links ask the provider's oEmbed endpoint for a JSON payload
//! - Document links are kept as bare URLs without fetching
//! - Anything else is fetched and its title/description meta tags are read;
//!   pages outside the primary sources are also scanned for breed photos
//!
//! All tasks write into the same record through one mutex and join before
//! [`Enricher::enrich`] returns. A reference that cannot be resolved degrades
//! to an opaque marker and never fails the record.

use crate::cache::ContentCache;
use crate::config::{EnricherConfig, VideoProvider};
use crate::dataset::{BreedRecord, ReferenceData};
use crate::extract::resolve_link;
use crate::url::{classify_reference, host_matches_any, normalize_url, ReferenceKind};
use crate::DogfetchError;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::{Arc, LazyLock, Mutex};
use tokio::task::JoinSet;
use url::Url;

static TITLE_CANDIDATES: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        r#"meta[name="twitter:title"]"#,
        r#"meta[property="twitter:title"]"#,
        r#"meta[property="og:title"]"#,
    ]
    .iter()
    .map(|css| Selector::parse(css).expect("valid selector"))
    .collect()
});

static DESCRIPTION_CANDIDATES: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        r#"meta[name="twitter:description"]"#,
        r#"meta[property="twitter:description"]"#,
        r#"meta[property="og:description"]"#,
        r#"meta[name="description"]"#,
    ]
    .iter()
    .map(|css| Selector::parse(css).expect("valid selector"))
    .collect()
});

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static IMAGE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").expect("valid selector"));

static PARAGRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("valid selector"));

/// Path segment identifying breed photos on third-party pages
const BREED_IMAGE_PATH: &str = "/img/breeds/";

/// "General appearance" heading on Chinese-language breed profiles
const APPEARANCE_HEADING: &str = "一般外貌";

/// What one reference resolved to
#[derive(Debug)]
struct Resolution {
    data: ReferenceData,
    images: Vec<String>,
}

/// Counts of how references resolved, for logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichSummary {
    pub pages: usize,
    pub embeds: usize,
    pub opaque: usize,
    pub images_added: usize,
}

/// Resolves outbound references into record metadata
#[derive(Debug, Clone)]
pub struct Enricher {
    cache: Arc<ContentCache>,
    config: Arc<EnricherConfig>,
    primary_sources: Arc<Vec<String>>,
}

impl Enricher {
    /// Creates an enricher
    ///
    /// `origin_host` is the catalog's own host; its pages count as a primary
    /// source in addition to the configured ones.
    pub fn new(cache: Arc<ContentCache>, config: EnricherConfig, origin_host: Option<&str>) -> Self {
        let mut primary_sources = config.primary_sources.clone();
        if let Some(host) = origin_host {
            primary_sources.push(host.to_lowercase());
        }

        Self {
            cache,
            config: Arc::new(config),
            primary_sources: Arc::new(primary_sources),
        }
    }

    /// Resolves every reference concurrently and attaches the results
    ///
    /// Returns once all reference tasks have joined. Each reference ends up
    /// in `record.refs` under its normalized URL; photos found on secondary
    /// pages are appended to `record.images` without duplicates.
    pub async fn enrich(&self, record: BreedRecord, references: &[Url]) -> (BreedRecord, EnrichSummary) {
        let shared = Arc::new(Mutex::new(record));
        let mut tasks = JoinSet::new();

        for reference in references {
            let this = self.clone();
            let shared = Arc::clone(&shared);
            let reference = reference.clone();

            tasks.spawn(async move {
                let resolution = this.resolve(&reference).await;
                let key = normalize_url(reference.as_str())
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| reference.to_string());

                let mut record = shared.lock().unwrap_or_else(|p| p.into_inner());
                let added = record.add_images(resolution.images);
                let kind = match &resolution.data {
                    ReferenceData::Page { .. } => Kind::Page,
                    ReferenceData::Embed { .. } => Kind::Embed,
                    ReferenceData::Opaque { .. } => Kind::Opaque,
                };
                record.refs.insert(key, resolution.data);
                (kind, added)
            });
        }

        let mut summary = EnrichSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((kind, added)) => {
                    match kind {
                        Kind::Page => summary.pages += 1,
                        Kind::Embed => summary.embeds += 1,
                        Kind::Opaque => summary.opaque += 1,
                    }
                    summary.images_added += added;
                }
                Err(e) => tracing::warn!("Reference task failed: {}", e),
            }
        }

        // Every task has joined, so this is the last handle
        let record = match Arc::try_unwrap(shared) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(|p| p.into_inner()),
            Err(shared) => shared.lock().unwrap_or_else(|p| p.into_inner()).clone(),
        };

        (record, summary)
    }

    async fn resolve(&self, reference: &Url) -> Resolution {
        let result = match classify_reference(reference, &self.config) {
            ReferenceKind::Video(provider) => self.resolve_video(reference, provider).await,
            ReferenceKind::Document => {
                tracing::trace!("Document reference {} kept as marker", reference);
                Ok(opaque(reference))
            }
            ReferenceKind::Page => self.resolve_page(reference).await,
        };

        result.unwrap_or_else(|e| {
            tracing::warn!("Reference {} degraded to marker: {}", reference, e);
            opaque(reference)
        })
    }

    async fn resolve_video(
        &self,
        reference: &Url,
        provider: &VideoProvider,
    ) -> Result<Resolution, DogfetchError> {
        let endpoint = Url::parse_with_params(
            &provider.oembed_endpoint,
            &[("url", reference.as_str()), ("format", "json")],
        )?;

        let body = self.cache.get_or_fetch(endpoint.as_str()).await?;
        let payload: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(&body)
            .map_err(|e| DogfetchError::Parse {
                url: endpoint.to_string(),
                message: format!("invalid oEmbed payload: {}", e),
            })?;

        Ok(Resolution {
            data: ReferenceData::Embed { payload },
            images: Vec::new(),
        })
    }

    async fn resolve_page(&self, reference: &Url) -> Result<Resolution, DogfetchError> {
        let body = self.cache.get_or_fetch(reference.as_str()).await?;
        let scan_images = !host_matches_any(reference, &self.primary_sources);

        Ok(read_page(&body, reference, scan_images, &self.config.image_exclude))
    }
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Page,
    Embed,
    Opaque,
}

fn opaque(reference: &Url) -> Resolution {
    Resolution {
        data: ReferenceData::opaque(reference.as_str()),
        images: Vec::new(),
    }
}

/// Reads meta tags and, when asked, breed photos from a fetched page
fn read_page(body: &[u8], reference: &Url, scan_images: bool, exclude: &[String]) -> Resolution {
    let html = String::from_utf8_lossy(body);
    let document = Html::parse_document(&html);

    let title = first_meta(&document, &TITLE_CANDIDATES).or_else(|| {
        document
            .select(&TITLE)
            .next()
            .map(|t| t.text().collect::<String>())
            .map(|t| crate::extract::clean_text(&t))
            .filter(|t| !t.is_empty())
    });
    let description = first_meta(&document, &DESCRIPTION_CANDIDATES)
        .or_else(|| appearance_paragraph(&document));

    let data = if title.is_none() && description.is_none() {
        ReferenceData::opaque(reference.as_str())
    } else {
        ReferenceData::Page {
            title: title.unwrap_or_default(),
            description: description.unwrap_or_default(),
        }
    };

    let images = if scan_images {
        breed_images(&document, reference, exclude)
    } else {
        Vec::new()
    };

    Resolution { data, images }
}

/// Content of the first candidate meta tag that has a non-empty value
fn first_meta(document: &Html, candidates: &[Selector]) -> Option<String> {
    candidates.iter().find_map(|selector| {
        document
            .select(selector)
            .filter_map(|meta| meta.value().attr("content"))
            .map(crate::extract::clean_text)
            .find(|content| !content.is_empty())
    })
}

/// First `<dd><p>` after the appearance `<h3>`, the description slot of
/// profiles that carry no meta tags
fn appearance_paragraph(document: &Html) -> Option<String> {
    let mut past_heading = false;

    for element in document.root_element().descendants().filter_map(ElementRef::wrap) {
        match element.value().name() {
            "h3" if !past_heading => {
                let text: String = element.text().collect();
                past_heading = crate::extract::clean_text(&text) == APPEARANCE_HEADING;
            }
            "dd" if past_heading => {
                return element
                    .select(&PARAGRAPH)
                    .next()
                    .map(|p| crate::extract::clean_text(&p.text().collect::<String>()))
                    .filter(|text| !text.is_empty());
            }
            _ => {}
        }
    }

    None
}

/// Breed photos following the common conventions: lazy-loaded JPEGs in
/// `data-src`, or `src` paths under `/img/breeds/`
fn breed_images(document: &Html, reference: &Url, exclude: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();

    document
        .select(&IMAGE)
        .filter_map(|img| {
            let element = img.value();
            let lazy_jpeg = element
                .attr("data-src")
                .filter(|_| element.attr("loading") == Some("lazy"))
                .filter(|src| src.to_ascii_lowercase().ends_with(".jpg"));
            let breed_path = element
                .attr("src")
                .filter(|src| src.contains(BREED_IMAGE_PATH));
            lazy_jpeg.or(breed_path)
        })
        .filter(|src| !exclude.iter().any(|pattern| src.contains(pattern.as_str())))
        .filter_map(|src| resolve_link(src, reference))
        .map(|url| url.to_string())
        .filter(|url| seen.insert(url.clone()))
        .collect()
}
