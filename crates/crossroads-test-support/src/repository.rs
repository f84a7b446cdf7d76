//! Test stores: mock `BlobStore` implementations for tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use crossroads_core::error::AdventureError;
use crossroads_core::repository::BlobStore;

/// A blob store held in memory. Starts empty unless seeded.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<BTreeMap<String, String>>,
}

impl InMemoryBlobStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `(key, blob)` pairs.
    #[must_use]
    pub fn seeded<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            blobs: Mutex::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Returns a snapshot of every stored blob, keyed and sorted by key.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn blobs(&self) -> BTreeMap<String, String> {
        self.blobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AdventureError> {
        Ok(self.blobs.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, blob: String) -> Result<(), AdventureError> {
        self.blobs.lock().unwrap().insert(key.to_owned(), blob);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), AdventureError> {
        self.blobs.lock().unwrap().remove(key);
        Ok(())
    }
}

/// A blob store that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingBlobStore;

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, AdventureError> {
        Err(AdventureError::Infrastructure("disk unavailable".into()))
    }

    async fn set(&self, _key: &str, _blob: String) -> Result<(), AdventureError> {
        Err(AdventureError::Infrastructure("disk unavailable".into()))
    }

    async fn remove(&self, _key: &str) -> Result<(), AdventureError> {
        Err(AdventureError::Infrastructure("disk unavailable".into()))
    }
}
