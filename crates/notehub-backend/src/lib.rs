//! NoteHub Backend - hosted collaborator contracts
//!
//! The note client delegates persistence, file storage and authentication to a
//! hosted backend. This crate defines the narrow surface the client relies on:
//! - [`DocumentStore`]: create, point read, partial update, live ordered query
//! - [`BlobStore`]: put object, resolve public URL
//! - [`IdentityProvider`]: sign in/up/out, identity change notifications
//!
//! The [`memory`] module provides in-process implementations honouring the
//! same contracts, used by tests and the CLI.
//!
//! # Example
//!
//! ```rust,ignore
//! use notehub_backend::{DocumentStore, MemoryDocumentStore, Query};
//!
//! # async fn example() -> Result<(), notehub_backend::BackendError> {
//! let store = MemoryDocumentStore::new();
//! let mut subscription = store.subscribe(Query::ordered_desc("notes", "createdAt")).await?;
//! let first = subscription.snapshots.recv().await;
//! subscription.handle.cancel();
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod blob;
pub mod document;
pub mod error;
pub mod identity;
pub mod memory;

pub use blob::{BlobRef, BlobStore};
pub use document::{
    Direction, Document, DocumentId, DocumentStore, FieldValue, Fields, OrderBy, Query,
    Subscription, SubscriptionHandle, WriteFields,
};
pub use error::{AuthFailure, BackendError};
pub use identity::{Identity, IdentityProvider};
pub use memory::{MemoryBlobStore, MemoryDocumentStore, MemoryIdentityProvider, Operation};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
