//! In-process backend implementations
//!
//! Each store honours the same contract as its hosted counterpart, including
//! server-side timestamps and live query push. Faults can be injected per
//! operation so callers can exercise their error paths.

mod blobs;
mod documents;
mod identity;

pub use blobs::MemoryBlobStore;
pub use documents::MemoryDocumentStore;
pub use identity::MemoryIdentityProvider;

/// Store operations that accept an injected fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Live query open
    Subscribe,
    /// Point read
    Get,
    /// Document create
    Create,
    /// Document update
    Update,
    /// Object put
    Put,
    /// Public URL lookup
    PublicUrl,
}
