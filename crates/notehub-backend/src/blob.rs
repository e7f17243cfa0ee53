//! Blob store contract

use crate::error::BackendError;
use async_trait::async_trait;

/// Reference to a stored object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobRef {
    /// Full object path inside the bucket
    pub path: String,
}

impl BlobRef {
    /// Create reference for path
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Hosted object storage
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` at `path`, replacing any existing object
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<BlobRef, BackendError>;

    /// Publicly readable URL for a stored object
    async fn public_url(&self, blob: &BlobRef) -> Result<String, BackendError>;
}
