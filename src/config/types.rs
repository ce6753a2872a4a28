use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Dogfetch
///
/// Every section is optional; missing sections and keys fall back to the
/// built-in defaults, which target the public breed catalog.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub crawler: CrawlerConfig,
    pub fetcher: FetcherConfig,
    pub cache: CacheConfig,
    pub enricher: EnricherConfig,
    pub output: OutputConfig,
}

/// Where the catalog lives
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SourceConfig {
    /// Catalog origin, used to resolve relative paths
    pub origin: String,

    /// Path of the A-Z index listing every breed page
    pub index_path: String,

    /// Path prefix shared by all breed pages
    pub page_prefix: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            origin: "https://www.dogbreedslist.info".to_string(),
            index_path: "/dog-breeds-a-z/".to_string(),
            page_prefix: "/all-dog-breeds/".to_string(),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of breed pages crawled at the same time
    pub max_concurrent_pages: u32,

    /// Abort the whole crawl on the first page failure
    pub fail_fast: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_pages: 50,
            fail_fast: false,
        }
    }
}

/// HTTP request configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetcherConfig {
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,

    pub user_agent: String,

    pub accept: String,

    pub accept_language: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 8,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/124.0.0.0 Safari/537.36"
                .to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
                .to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }
}

/// Content cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CacheConfig {
    /// Directory holding `<key>.body` / `<key>.json` pairs
    pub directory: PathBuf,

    /// Time-to-live of a cached response in seconds
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: std::env::temp_dir().join("dogfetch-cache"),
            ttl_secs: 240,
        }
    }
}

/// Reference enrichment configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EnricherConfig {
    /// Video hosts resolved through their oEmbed endpoint
    pub video_providers: Vec<VideoProvider>,

    /// File extensions recorded as opaque markers without fetching
    pub document_extensions: Vec<String>,

    /// Domains whose pages are catalog pages themselves (no photo scan)
    pub primary_sources: Vec<String>,

    /// Substrings that disqualify a scanned image URL
    pub image_exclude: Vec<String>,
}

impl Default for EnricherConfig {
    fn default() -> Self {
        Self {
            video_providers: vec![
                VideoProvider {
                    domain: "*.youtube.com".to_string(),
                    oembed_endpoint: "https://www.youtube.com/oembed".to_string(),
                },
                VideoProvider {
                    domain: "youtu.be".to_string(),
                    oembed_endpoint: "https://www.youtube.com/oembed".to_string(),
                },
                VideoProvider {
                    domain: "*.vimeo.com".to_string(),
                    oembed_endpoint: "https://vimeo.com/api/oembed.json".to_string(),
                },
            ],
            document_extensions: vec!["pdf".to_string(), "doc".to_string(), "docx".to_string()],
            primary_sources: vec![
                "*.dogbreedslist.info".to_string(),
                "*.wikihow.com".to_string(),
            ],
            image_exclude: vec!["Danish".to_string()],
        }
    }
}

/// A video hosting domain and its embed-metadata endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VideoProvider {
    /// Domain pattern (e.g., "youtu.be" or "*.youtube.com")
    pub domain: String,

    /// oEmbed endpoint queried with `?url=<reference>&format=json`
    pub oembed_endpoint: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Load the snapshot instead of crawling, and write it after a crawl
    pub snapshot: bool,

    /// Path of the JSON dataset snapshot
    pub snapshot_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            snapshot: true,
            snapshot_path: std::env::temp_dir().join("breeds.json"),
        }
    }
}
