use super::Operation;
use crate::blob::{BlobRef, BlobStore};
use crate::error::BackendError;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;

/// In-memory object storage
///
/// Public URLs follow the hosted download URL shape:
/// `<base>/o/<url-encoded path>?alt=media`.
#[derive(Debug)]
pub struct MemoryBlobStore {
    base_url: String,
    objects: DashMap<String, Vec<u8>>,
    faults: Mutex<HashMap<Operation, BackendError>>,
}

impl MemoryBlobStore {
    /// Create empty store serving URLs under `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: DashMap::new(),
            faults: Mutex::new(HashMap::new()),
        }
    }

    /// Make the next call of `op` fail with `error`
    pub fn fail_next(&self, op: Operation, error: BackendError) {
        self.faults.lock().insert(op, error);
    }

    /// Stored bytes at `path`
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.get(path).map(|entry| entry.value().clone())
    }

    /// Number of stored objects
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if nothing is stored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Paths of all stored objects, sorted
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }

    fn take_fault(&self, op: Operation) -> Result<(), BackendError> {
        match self.faults.lock().remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new("http://localhost:9199/v0/b/notehub")
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<BlobRef, BackendError> {
        self.take_fault(Operation::Put)?;
        if path.is_empty() {
            return Err(BackendError::InvalidArgument("empty object path".to_string()));
        }

        tracing::debug!(path, size = bytes.len(), "object stored");
        self.objects.insert(path.to_string(), bytes);
        Ok(BlobRef::new(path))
    }

    async fn public_url(&self, blob: &BlobRef) -> Result<String, BackendError> {
        self.take_fault(Operation::PublicUrl)?;
        if !self.objects.contains_key(&blob.path) {
            return Err(BackendError::NotFound(blob.path.clone()));
        }
        Ok(format!(
            "{}/o/{}?alt=media",
            self.base_url,
            urlencoding::encode(&blob.path)
        ))
    }
}
