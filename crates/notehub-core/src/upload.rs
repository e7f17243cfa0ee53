//! Upload flow
//!
//! Two-phase write: the attachment goes to blob storage first, then the note
//! document is created pointing at its public URL. There is no compensating
//! delete; if the second phase fails the stored object stays behind and is
//! logged.

use crate::error::{NoteHubError, Result};
use crate::model::{AttachmentRef, Author, NewNote, NoteId};
use crate::repository::NoteRepository;
use crate::session::SessionContext;
use chrono::Utc;
use notehub_backend::{BackendError, BlobRef, BlobStore, Identity};
use std::sync::Arc;

/// File picked for upload
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Attachment {
    #[inline]
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Raw upload form input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadForm {
    pub title: String,
    pub description: String,
    /// Comma-separated tags as typed
    pub tags: String,
    pub semester: Option<String>,
    pub subject: Option<String>,
    pub file: Option<Attachment>,
}

impl UploadForm {
    /// Create form with a title
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// With comma-separated tags
    #[inline]
    #[must_use]
    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    /// With semester
    #[inline]
    #[must_use]
    pub fn with_semester(mut self, semester: impl Into<String>) -> Self {
        self.semester = Some(semester.into());
        self
    }

    /// With subject
    #[inline]
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// With attached file
    #[inline]
    #[must_use]
    pub fn with_file(mut self, file: Attachment) -> Self {
        self.file = Some(file);
        self
    }
}

/// Split comma-separated input into trimmed, non-empty tags
#[must_use]
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Upload flow
#[derive(Clone)]
pub struct UploadFlow {
    repository: NoteRepository,
    blobs: Arc<dyn BlobStore>,
    session: SessionContext,
    blob_prefix: String,
}

impl std::fmt::Debug for UploadFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadFlow")
            .field("repository", &self.repository)
            .field("blob_prefix", &self.blob_prefix)
            .finish_non_exhaustive()
    }
}

impl UploadFlow {
    /// Create flow storing attachments under `blob_prefix`
    #[must_use]
    pub fn new(
        repository: NoteRepository,
        blobs: Arc<dyn BlobStore>,
        session: SessionContext,
        blob_prefix: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            blobs,
            session,
            blob_prefix: blob_prefix.into(),
        }
    }

    /// Validate, store the attachment, then create the note
    ///
    /// # Errors
    /// - `NoteHubError::Unauthenticated` when nobody is signed in
    /// - `NoteHubError::Validation` for a blank title; nothing is stored
    /// - phase-specific backend error otherwise
    pub async fn submit(&self, form: UploadForm) -> Result<NoteId> {
        let identity = self.session.require_identity()?;
        let title = form.title.trim();
        if title.is_empty() {
            return Err(NoteHubError::Validation("Title is required".to_string()));
        }

        let attachment = match &form.file {
            Some(file) => Some(self.store_attachment(&identity, file).await?),
            None => None,
        };
        let blob_path = attachment.as_ref().map(|(blob, _)| blob.path.clone());

        let mut note = NewNote::new(title, author_of(&identity))
            .with_description(form.description.trim())
            .with_tags(parse_tags(&form.tags));
        note.semester = form.semester.filter(|s| !s.is_empty());
        note.subject = form.subject.filter(|s| !s.is_empty());
        note.attachment = attachment.map(|(_, reference)| reference);

        match self.repository.create(note).await {
            Ok(id) => Ok(id),
            Err(e) => {
                if let Some(path) = blob_path {
                    tracing::warn!(
                        blob = %path,
                        error = %e,
                        retryable = e.is_retryable(),
                        "note creation failed, attachment orphaned"
                    );
                }
                Err(database_error(e))
            }
        }
    }

    async fn store_attachment(
        &self,
        identity: &Identity,
        file: &Attachment,
    ) -> Result<(BlobRef, AttachmentRef)> {
        let path = format!(
            "{}/{}/{}_{}",
            self.blob_prefix.trim_end_matches('/'),
            identity.uid,
            Utc::now().timestamp_millis(),
            file.file_name
        );

        let blob = self
            .blobs
            .put(&path, file.bytes.clone())
            .await
            .map_err(storage_error)?;
        let url = self.blobs.public_url(&blob).await.map_err(storage_error)?;
        tracing::debug!(blob = %blob.path, bytes = file.bytes.len(), "attachment stored");

        let reference = AttachmentRef {
            url,
            name: file.file_name.clone(),
        };
        Ok((blob, reference))
    }
}

fn author_of(identity: &Identity) -> Author {
    Author {
        id: identity.uid.clone(),
        email: identity.email.clone(),
        name: identity.author_name(),
    }
}

fn storage_error(e: BackendError) -> NoteHubError {
    tracing::error!(error = %e, "attachment upload failed");
    match e {
        BackendError::PermissionDenied(_) => NoteHubError::PermissionDenied(
            "Storage permission denied. Please check storage rules.".to_string(),
        ),
        BackendError::Unconfigured(_) => NoteHubError::BackendUnconfigured(
            "File storage is not configured. Please enable storage for this project.".to_string(),
        ),
        other => NoteHubError::Transport(format!("File upload failed: {other}")),
    }
}

fn database_error(e: NoteHubError) -> NoteHubError {
    match e {
        NoteHubError::Validation(_) => e,
        NoteHubError::PermissionDenied(_) => NoteHubError::PermissionDenied(
            "Database permission denied. Please check database security rules.".to_string(),
        ),
        NoteHubError::StorageUnavailable(_) => NoteHubError::StorageUnavailable(
            "Database not available. Please create the notes database.".to_string(),
        ),
        other => NoteHubError::Transport(format!("Database error: {other}")),
    }
}
