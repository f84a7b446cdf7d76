//! Test cover lookups: mock `CoverLookup` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use crossroads_core::error::AdventureError;
use crossroads_core::metadata::CoverLookup;

/// A cover lookup backed by a fixed table. Unknown records have no cover.
/// Every lookup is recorded.
#[derive(Debug, Default)]
pub struct StaticCoverLookup {
    covers: HashMap<(String, String), String>,
    lookups: Mutex<Vec<(String, String)>>,
}

impl StaticCoverLookup {
    /// Create a lookup that knows no covers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `url` as the cover of `name` by `creator`.
    #[must_use]
    pub fn with_cover(mut self, name: &str, creator: &str, url: &str) -> Self {
        self.covers
            .insert((name.to_owned(), creator.to_owned()), url.to_owned());
        self
    }

    /// Returns every `(name, creator)` pair looked up so far, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn lookups(&self) -> Vec<(String, String)> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl CoverLookup for StaticCoverLookup {
    async fn lookup_cover(
        &self,
        name: &str,
        creator: &str,
    ) -> Result<Option<String>, AdventureError> {
        let key = (name.to_owned(), creator.to_owned());
        let cover = self.covers.get(&key).cloned();
        self.lookups.lock().unwrap().push(key);
        Ok(cover)
    }
}

/// A cover lookup that always fails. Useful for testing that a failed
/// lookup leaves the tree untouched.
#[derive(Debug)]
pub struct FailingCoverLookup;

#[async_trait]
impl CoverLookup for FailingCoverLookup {
    async fn lookup_cover(
        &self,
        _name: &str,
        _creator: &str,
    ) -> Result<Option<String>, AdventureError> {
        Err(AdventureError::CoverLookup("catalogue unavailable".into()))
    }
}
