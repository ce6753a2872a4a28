//! Dataset module: breed records, the in-flight store, and JSON snapshots
//!
//! - `BreedRecord` / `ReferenceData`: the record model
//! - `BreedStore`: concurrent insert target used while the crawl runs
//! - `Dataset`: immutable, id-ordered result of a finished crawl, persisted
//!   as a JSON object mapping breed id to record

mod record;
mod store;

pub use record::{BreedRecord, ReferenceData};
pub use store::BreedStore;

use crate::DogfetchError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Finished collection of breed records, keyed and ordered by id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    breeds: BTreeMap<String, BreedRecord>,
}

impl Dataset {
    /// Builds a dataset; later records win on id collisions
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = BreedRecord>,
    {
        Self {
            breeds: records.into_iter().map(|r| (r.id.clone(), r)).collect(),
        }
    }

    pub fn get_by_id(&self, id: &str) -> Option<&BreedRecord> {
        self.breeds.get(id)
    }

    /// Exact name match; the first record in id order wins
    pub fn get_by_name(&self, name: &str) -> Option<&BreedRecord> {
        self.breeds.values().find(|r| r.name == name)
    }

    pub fn get_all(&self) -> Vec<&BreedRecord> {
        self.breeds.values().collect()
    }

    pub fn len(&self) -> usize {
        self.breeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breeds.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.breeds.keys().map(String::as_str)
    }

    /// Writes the dataset as JSON
    ///
    /// The document is written to a temporary sibling and renamed into place,
    /// so readers never observe a truncated snapshot.
    pub async fn save_snapshot(&self, path: &Path) -> Result<(), DogfetchError> {
        let bytes = serde_json::to_vec(self)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, path).await?;

        tracing::info!(
            "Wrote snapshot of {} breeds to {}",
            self.len(),
            path.display()
        );
        Ok(())
    }

    /// Loads a snapshot written by [`Dataset::save_snapshot`]
    ///
    /// Returns `Ok(None)` when no snapshot exists at `path`.
    pub async fn load_snapshot(path: &Path) -> Result<Option<Self>, DogfetchError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let dataset: Dataset = serde_json::from_slice(&bytes)?;
        Ok(Some(dataset))
    }
}

impl IntoIterator for Dataset {
    type Item = BreedRecord;
    type IntoIter = std::collections::btree_map::IntoValues<String, BreedRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.breeds.into_values()
    }
}
