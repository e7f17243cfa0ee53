//! NoteHub Core - shared study-notes client
//!
//! Client-side logic for a hosted note-sharing service:
//! - Live, newest-first note feed with search and facet filtering
//! - Note detail pages with background view counting and sharing
//! - Two-phase note upload (attachment, then document)
//! - Session context carrying the signed-in identity
//!
//! Persistence, files and authentication are delegated to the collaborators in
//! `notehub_backend`.
//!
//! # Example
//!
//! ```rust,ignore
//! use notehub_core::prelude::*;
//!
//! # async fn example(store: Arc<dyn DocumentStore>, session: SessionContext) -> Result<()> {
//! let config = NoteHubConfig::new();
//! let repository = NoteRepository::new(store, config.notes_collection.clone());
//!
//! let feed = FeedViewModel::open(&repository, &session, &config).await?;
//! feed.set_tag("math");
//! let state = feed.loaded().await?;
//! println!("{} visible notes", state.visible_notes().len());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod config;
pub mod detail;
pub mod error;
pub mod feed;
pub mod model;
pub mod repository;
pub mod session;
pub mod share;
pub mod upload;

// Re-exports for convenience
pub use config::NoteHubConfig;
pub use detail::{DetailState, NoteDetailViewModel};
pub use error::{NoteHubError, Result};
pub use feed::{tag_facets, visible_notes, EmptyFeed, FeedFilter, FeedState, FeedViewModel};
pub use model::{AttachmentRef, Author, NewNote, Note, NoteId};
pub use repository::{NoteRepository, NoteStream};
pub use session::SessionContext;
pub use share::{
    mailto_link, share_url, Clipboard, InMemoryClipboard, NativeShare, ShareAction, ShareError,
    SharePayload, ShareStatus,
};
pub use upload::{parse_tags, Attachment, UploadFlow, UploadForm};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with NoteHub Core
    pub use crate::{
        DetailState, FeedFilter, FeedViewModel, NewNote, Note, NoteDetailViewModel, NoteHubConfig,
        NoteHubError, NoteId, NoteRepository, Result, SessionContext, ShareAction, UploadFlow,
        UploadForm,
    };
    pub use notehub_backend::{BlobStore, DocumentStore, IdentityProvider};
    pub use std::sync::Arc;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
