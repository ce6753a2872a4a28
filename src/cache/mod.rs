//! Content cache
//!
//! Every network read in the crate goes through [`ContentCache::get_or_fetch`].
//! Responses are kept on disk as a `<key>.body` blob plus a `<key>.json`
//! metadata document, where the key is the SHA-512 of the normalized URL.
//! An entry is served until its TTL elapses; after that the next read goes
//! back to the network and overwrites it.
//!
//! Concurrent requests for the same URL are serialized on a per-key lock,
//! so a miss is fetched at most once per process.

mod entry;
mod key;

pub use entry::CacheEntry;
pub use key::cache_key;

use crate::config::CacheConfig;
use crate::crawler::{fetch_url, FetchedBody};
use crate::DogfetchError;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Client;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Longest TTL honoured; longer values are clamped to it
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Counters describing cache effectiveness over the life of one cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered from disk
    pub hits: u64,

    /// Reads that went to the network and succeeded
    pub misses: u64,

    /// Network fetches that failed
    pub failures: u64,
}

/// TTL-bound, disk-backed cache in front of the HTTP client
#[derive(Debug)]
pub struct ContentCache {
    directory: PathBuf,
    ttl: ChronoDuration,
    client: Client,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    failures: AtomicU64,
}

impl ContentCache {
    /// Creates a cache rooted at `directory`
    ///
    /// The directory is created lazily on the first write. A `ttl` above
    /// [`MAX_TTL`] is clamped.
    pub fn new(directory: impl Into<PathBuf>, ttl: Duration, client: Client) -> Self {
        Self {
            directory: directory.into(),
            ttl: ChronoDuration::from_std(ttl.min(MAX_TTL))
                .unwrap_or_else(|_| ChronoDuration::zero()),
            client,
            locks: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CacheConfig, client: Client) -> Self {
        Self::new(
            config.directory.clone(),
            Duration::from_secs(config.ttl_secs),
            client,
        )
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    /// Returns the body for `url`, from disk when fresh, otherwise from the
    /// network
    ///
    /// On a miss the response is fetched once and persisted before it is
    /// returned. Fetch failures are returned unchanged and leave any previous
    /// entry on disk untouched. A failure to persist a fetched body is
    /// reported as [`DogfetchError::CacheIo`].
    pub async fn get_or_fetch(&self, url: &str) -> Result<Vec<u8>, DogfetchError> {
        let key = cache_key(url)?;
        let lock = self.key_lock(&key);

        let result = {
            let _guard = lock.lock().await;
            self.get_or_fetch_locked(&key, url).await
        };

        self.release_key_lock(&key, lock);
        result
    }

    /// Returns the cached body for `url` if a fresh entry exists, without
    /// touching the network
    pub async fn lookup(&self, url: &str) -> Result<Option<Vec<u8>>, DogfetchError> {
        let key = cache_key(url)?;
        self.load_fresh(&key).await
    }

    /// Deletes every expired or unreadable entry under the cache directory
    ///
    /// Intended to run between crawls; returns the number of entries removed.
    pub async fn purge_expired(&self) -> Result<usize, DogfetchError> {
        let mut dir = match tokio::fs::read_dir(&self.directory).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(cache_io(&self.directory, e)),
        };

        let now = Utc::now();
        let mut removed = 0;

        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| cache_io(&self.directory, e))?
        {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let stale = match tokio::fs::read(&path).await {
                Ok(bytes) => match serde_json::from_slice::<CacheEntry>(&bytes) {
                    Ok(entry) => !entry.is_valid_at(now),
                    Err(_) => true,
                },
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(cache_io(&path, e)),
            };

            if stale {
                remove_if_exists(&path.with_extension("body")).await?;
                remove_if_exists(&path).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!("Purged {} expired cache entries", removed);
        }
        Ok(removed)
    }

    async fn get_or_fetch_locked(&self, key: &str, url: &str) -> Result<Vec<u8>, DogfetchError> {
        if let Some(body) = self.load_fresh(key).await? {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("Cache hit for {}", url);
            return Ok(body);
        }

        let fetched = match fetch_url(&self.client, url).await {
            Ok(fetched) => fetched,
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };
        self.misses.fetch_add(1, Ordering::Relaxed);

        self.commit(key, url, &fetched).await?;
        tracing::debug!("Cached {} ({} bytes)", url, fetched.body.len());

        Ok(fetched.body)
    }

    /// Reads a fresh entry; anything missing, stale or inconsistent is a miss
    async fn load_fresh(&self, key: &str) -> Result<Option<Vec<u8>>, DogfetchError> {
        let meta_path = self.meta_path(key);

        let meta = match tokio::fs::read(&meta_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(cache_io(&meta_path, e)),
        };

        let entry: CacheEntry = match serde_json::from_slice(&meta) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable cache metadata {}: {}",
                    meta_path.display(),
                    e
                );
                return Ok(None);
            }
        };

        if entry.key != key || !entry.is_valid_at(Utc::now()) {
            return Ok(None);
        }

        let body = match tokio::fs::read(&entry.body_path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("Cache metadata {} has no body", meta_path.display());
                return Ok(None);
            }
            Err(e) => return Err(cache_io(&entry.body_path, e)),
        };

        if body.len() as u64 != entry.body_len {
            tracing::warn!(
                "Cache body {} is {} bytes, expected {}",
                entry.body_path.display(),
                body.len(),
                entry.body_len
            );
            return Ok(None);
        }

        Ok(Some(body))
    }

    /// Persists body then metadata, each through a temporary file and rename
    ///
    /// Metadata is written last so a reader never sees metadata pointing at
    /// a partially written body.
    async fn commit(
        &self,
        key: &str,
        url: &str,
        fetched: &FetchedBody,
    ) -> Result<CacheEntry, DogfetchError> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| cache_io(&self.directory, e))?;

        let body_path = self.body_path(key);
        write_atomic(&body_path, &fetched.body).await?;

        let fetched_at = Utc::now();
        let entry = CacheEntry {
            key: key.to_string(),
            url: url.to_string(),
            fetched_at,
            expires_at: fetched_at.checked_add_signed(self.ttl).unwrap_or(fetched_at),
            body_path,
            status_code: fetched.status_code,
            content_type: fetched.content_type.clone(),
            body_len: fetched.body.len() as u64,
        };

        let meta = serde_json::to_vec_pretty(&entry)?;
        write_atomic(&self.meta_path(key), &meta).await?;

        Ok(entry)
    }

    fn body_path(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{}.body", key))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{}.json", key))
    }

    fn key_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        Arc::clone(locks.entry(key.to_string()).or_default())
    }

    /// Drops the lock from the map once no other task holds or awaits it
    fn release_key_lock(&self, key: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        // Clones are only taken under the map lock, so the count is exact here
        drop(lock);
        if locks.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(key);
        }
    }
}

/// Distinguishes temporary files of concurrent writers within one process
static TMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Unique temporary sibling of `path`
fn temp_sibling(path: &Path) -> PathBuf {
    let sequence = TMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".{}.{}.tmp", std::process::id(), sequence));
    PathBuf::from(tmp)
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DogfetchError> {
    let tmp = temp_sibling(path);

    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| cache_io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| cache_io(path, e))
}

async fn remove_if_exists(path: &Path) -> Result<(), DogfetchError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(cache_io(path, e)),
    }
}

fn cache_io(path: &Path, source: std::io::Error) -> DogfetchError {
    DogfetchError::CacheIo {
        path: path.display().to_string(),
        source,
    }
}
