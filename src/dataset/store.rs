//! Concurrent record store used while a crawl is in flight

use crate::dataset::{BreedRecord, Dataset};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Mutex-guarded map of finished breed records, keyed by id
///
/// Page tasks insert into the store as they complete. Once every task has
/// joined, [`BreedStore::into_dataset`] turns it into an immutable [`Dataset`].
#[derive(Debug, Default)]
pub struct BreedStore {
    records: Mutex<HashMap<String, BreedRecord>>,
}

impl BreedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record under its id
    ///
    /// A colliding id overwrites the previous record (last writer wins); the
    /// displaced record is returned so the caller can report the conflict.
    pub fn insert(&self, record: BreedRecord) -> Option<BreedRecord> {
        self.lock().insert(record.id.clone(), record)
    }

    pub fn get_by_id(&self, id: &str) -> Option<BreedRecord> {
        self.lock().get(id).cloned()
    }

    /// Linear scan; with duplicate names any one of them may be returned
    pub fn get_by_name(&self, name: &str) -> Option<BreedRecord> {
        self.lock().values().find(|r| r.name == name).cloned()
    }

    /// Full snapshot of the current contents
    pub fn get_all(&self) -> Vec<BreedRecord> {
        self.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Freezes the store into a dataset ordered by id
    pub fn into_dataset(self) -> Dataset {
        let records = self
            .records
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Dataset::from_records(records.into_values())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, BreedRecord>> {
        // A panicking writer cannot leave a half-inserted record behind, so
        // the map is still consistent after poisoning.
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
