//! Directory-backed implementation of the `BlobStore` trait.
//!
//! Every key maps to `<dir>/<key>.json`. Writes land in a uniquely named
//! temporary file in the same directory and are renamed into place, so a
//! reader never sees a half-written document.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use crossroads_core::error::AdventureError;
use crossroads_core::repository::BlobStore;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

/// Blob store keeping one JSON file per key.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    /// Creates a store rooted at `dir`. The directory is created on the
    /// first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory holding the blobs.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, AdventureError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

/// Keys become file names, so only `[A-Za-z0-9_-]+` is accepted.
fn validate_key(key: &str) -> Result<(), AdventureError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(AdventureError::Validation(format!("invalid blob key {key:?}")))
    }
}

fn io_error(action: &str, path: &Path, error: &std::io::Error) -> AdventureError {
    AdventureError::Infrastructure(format!("failed to {action} {}: {error}", path.display()))
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AdventureError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("read", &path, &e)),
        }
    }

    async fn set(&self, key: &str, blob: String) -> Result<(), AdventureError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error("create", &self.dir, &e))?;

        let staging = self.dir.join(format!(".{key}.{}.tmp", Uuid::new_v4()));
        fs::write(&staging, blob.as_bytes())
            .await
            .map_err(|e| io_error("write", &staging, &e))?;
        if let Err(e) = fs::rename(&staging, &path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(io_error("replace", &path, &e));
        }
        debug!(path = %path.display(), bytes = blob.len(), "blob written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), AdventureError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove", &path, &e)),
        }
    }
}
