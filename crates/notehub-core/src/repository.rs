//! Note repository
//!
//! Maps note operations onto the document store:
//! - `list_all` opens a live query ordered by `createdAt` descending
//! - `get_by_id` is a point read that distinguishes "missing" from failure
//! - `create` validates, stamps `createdAt` server-side and zeroes `views`
//! - `increment_view` writes `views = current + 1` (read-modify-write)

use crate::error::{NoteHubError, Result};
use crate::model::{NewNote, Note, NoteId};
use futures::Stream;
use notehub_backend::{
    Document, DocumentStore, FieldValue, Query, SubscriptionHandle, WriteFields,
};
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

const CREATED_AT: &str = "createdAt";

/// Repository over the notes collection
#[derive(Clone)]
pub struct NoteRepository {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl std::fmt::Debug for NoteRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteRepository")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl NoteRepository {
    /// Create repository over `collection`
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Collection name
    #[inline]
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Open a live, newest-first feed of every note
    ///
    /// # Errors
    /// Backend failure while opening the query
    pub async fn list_all(&self) -> Result<NoteStream> {
        let query = Query::ordered_desc(self.collection.clone(), CREATED_AT);
        let subscription = self.store.subscribe(query).await.map_err(|e| {
            tracing::error!(collection = %self.collection, error = %e, "failed to open note feed");
            NoteHubError::from(e)
        })?;

        Ok(NoteStream {
            snapshots: subscription.snapshots,
            handle: subscription.handle,
        })
    }

    /// Fetch one note
    ///
    /// # Errors
    /// - `NoteHubError::NotFound` if no document has this id
    /// - translated backend error otherwise
    pub async fn get_by_id(&self, id: &NoteId) -> Result<Note> {
        let document = self
            .store
            .get(&self.collection, id.as_str())
            .await?
            .ok_or_else(|| NoteHubError::NotFound(id.to_string()))?;

        Note::from_document(document).map_err(|e| {
            tracing::warn!(note_id = %id, error = %e, "stored note is malformed");
            NoteHubError::Transport(format!("malformed note {id}: {e}"))
        })
    }

    /// Persist a new note
    ///
    /// # Errors
    /// - `NoteHubError::Validation` if the title is blank (nothing is written)
    /// - translated backend error otherwise
    pub async fn create(&self, note: NewNote) -> Result<NoteId> {
        let title = note.title.trim();
        if title.is_empty() {
            return Err(NoteHubError::Validation("Title is required".to_string()));
        }

        let mut fields = WriteFields::new();
        fields.insert("title".into(), FieldValue::value(title));
        fields.insert("description".into(), FieldValue::value(note.description));
        fields.insert("tags".into(), FieldValue::value(note.tags));
        if let Some(semester) = note.semester {
            fields.insert("semester".into(), FieldValue::value(semester));
        }
        if let Some(subject) = note.subject {
            fields.insert("subject".into(), FieldValue::value(subject));
        }
        let (file_url, file_name) = match note.attachment {
            Some(attachment) => (Value::from(attachment.url), Value::from(attachment.name)),
            None => (Value::Null, Value::Null),
        };
        fields.insert("fileUrl".into(), FieldValue::Value(file_url));
        fields.insert("fileName".into(), FieldValue::Value(file_name));
        fields.insert("authorId".into(), FieldValue::value(note.author.id));
        fields.insert("authorEmail".into(), FieldValue::value(note.author.email));
        fields.insert("authorName".into(), FieldValue::value(note.author.name));
        fields.insert(CREATED_AT.into(), FieldValue::ServerTimestamp);
        fields.insert("views".into(), FieldValue::value(0));

        let id: NoteId = self.store.create(&self.collection, fields).await?.into();
        tracing::info!(note_id = %id, "note created");
        Ok(id)
    }

    /// Record one view on top of the caller's last read of `views`
    ///
    /// Not atomic: two callers holding the same `current_views` both write
    /// `current_views + 1`.
    ///
    /// # Errors
    /// Translated backend error
    pub async fn increment_view(&self, id: &NoteId, current_views: u64) -> Result<()> {
        let views = current_views.saturating_add(1);
        let mut fields = WriteFields::new();
        fields.insert("views".into(), FieldValue::value(views));
        self.store
            .update(&self.collection, id.as_str(), fields)
            .await?;
        tracing::debug!(note_id = %id, views, "view recorded");
        Ok(())
    }
}

/// Live feed of note snapshots
///
/// Yields the full ordered collection after every change. Yields `None` once
/// cancelled or once the store drops the query.
#[derive(Debug)]
pub struct NoteStream {
    snapshots: mpsc::UnboundedReceiver<Vec<Document>>,
    handle: SubscriptionHandle,
}

impl NoteStream {
    /// Unsubscribe handle
    #[inline]
    #[must_use]
    pub fn handle(&self) -> &SubscriptionHandle {
        &self.handle
    }

    /// Stop server push; idempotent
    #[inline]
    pub fn cancel(&self) {
        self.handle.cancel();
    }
}

impl Stream for NoteStream {
    type Item = Vec<Note>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.handle.is_cancelled() {
            return Poll::Ready(None);
        }
        this.snapshots
            .poll_recv(cx)
            .map(|snapshot| snapshot.map(decode_snapshot))
    }
}

impl Drop for NoteStream {
    fn drop(&mut self) {
        self.handle.cancel();
    }
}

/// Decode a snapshot, skipping documents that are not valid notes
fn decode_snapshot(documents: Vec<Document>) -> Vec<Note> {
    let total = documents.len();
    let notes: Vec<Note> = documents
        .into_iter()
        .filter_map(|document| {
            let id = document.id.clone();
            Note::from_document(document)
                .map_err(|e| tracing::warn!(note_id = %id, error = %e, "skipping malformed note"))
                .ok()
        })
        .collect();
    tracing::debug!(count = notes.len(), skipped = total - notes.len(), "note snapshot");
    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttachmentRef, Author};
    use futures::StreamExt;
    use notehub_backend::{BackendError, MemoryDocumentStore, Operation};
    use serde_json::json;

    fn author() -> Author {
        Author {
            id: "u1".to_string(),
            email: "ada@example.com".to_string(),
            name: "ada".to_string(),
        }
    }

    fn repository() -> (Arc<MemoryDocumentStore>, NoteRepository) {
        let store = Arc::new(MemoryDocumentStore::new());
        let repo = NoteRepository::new(store.clone(), "notes");
        (store, repo)
    }

    #[tokio::test]
    async fn create_then_get() {
        let (_, repo) = repository();
        let id = repo
            .create(
                NewNote::new("  Physics Notes ", author())
                    .with_description("Kinematics")
                    .with_tags(["physics"])
                    .with_attachment(AttachmentRef {
                        url: "https://files/x".to_string(),
                        name: "x.pdf".to_string(),
                    }),
            )
            .await
            .unwrap();

        let note = repo.get_by_id(&id).await.unwrap();
        assert_eq!(note.id, id);
        assert_eq!(note.title, "Physics Notes");
        assert_eq!(note.views, 0);
        assert!(note.created_at.is_some());
        assert_eq!(note.file_name.as_deref(), Some("x.pdf"));
        assert_eq!(note.author_id, "u1");
    }

    #[tokio::test]
    async fn create_without_attachment_writes_null_file_fields() {
        let (store, repo) = repository();
        let id = repo.create(NewNote::new("t", author())).await.unwrap();

        let fields = store.fields("notes", id.as_str()).unwrap();
        assert_eq!(fields["fileUrl"], json!(null));
        assert_eq!(fields["fileName"], json!(null));
        assert_eq!(fields["views"], json!(0));
    }

    #[tokio::test]
    async fn blank_title_is_rejected_without_write() {
        let (store, repo) = repository();
        let err = repo.create(NewNote::new("   ", author())).await.unwrap_err();

        assert!(matches!(err, NoteHubError::Validation(_)));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn missing_note_is_not_found() {
        let (_, repo) = repository();
        let err = repo.get_by_id(&NoteId::new("missing")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn backend_failure_is_not_not_found() {
        let (store, repo) = repository();
        store.fail_next(Operation::Get, BackendError::Transport("offline".to_string()));

        let err = repo.get_by_id(&NoteId::new("x")).await.unwrap_err();
        assert!(matches!(err, NoteHubError::Transport(_)));
    }

    #[tokio::test]
    async fn increment_view_writes_current_plus_one() {
        let (_, repo) = repository();
        let id = repo.create(NewNote::new("t", author())).await.unwrap();

        repo.increment_view(&id, 5).await.unwrap();
        assert_eq!(repo.get_by_id(&id).await.unwrap().views, 6);
    }

    #[tokio::test]
    async fn increment_view_saturates_at_max() {
        let (_, repo) = repository();
        let id = repo.create(NewNote::new("t", author())).await.unwrap();

        repo.increment_view(&id, u64::MAX).await.unwrap();
        assert_eq!(repo.get_by_id(&id).await.unwrap().views, u64::MAX);
    }

    #[tokio::test]
    async fn list_all_streams_newest_first() {
        let (_, repo) = repository();
        let mut stream = repo.list_all().await.unwrap();
        assert!(stream.next().await.unwrap().is_empty());

        repo.create(NewNote::new("older", author())).await.unwrap();
        repo.create(NewNote::new("newer", author())).await.unwrap();

        let _ = stream.next().await.unwrap();
        let snapshot = stream.next().await.unwrap();
        let titles: Vec<_> = snapshot.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["newer", "older"]);
    }

    #[tokio::test]
    async fn malformed_documents_are_skipped() {
        let (store, repo) = repository();
        let serde_json::Value::Object(bad) = json!({ "description": "no title", "createdAt": 1 })
        else {
            unreachable!()
        };
        store.put_document("notes", "bad", bad);
        repo.create(NewNote::new("good", author())).await.unwrap();

        let mut stream = repo.list_all().await.unwrap();
        let snapshot = stream.next().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].title, "good");
    }

    #[tokio::test]
    async fn mistyped_created_at_is_skipped_not_fatal() {
        let (store, repo) = repository();
        for i in 0..40 {
            let created_at = if i % 3 == 0 {
                json!(format!("2024-01-{i}"))
            } else {
                json!(1_700_000_000_000_000_i64 + i)
            };
            let serde_json::Value::Object(fields) =
                json!({ "title": format!("n{i}"), "createdAt": created_at })
            else {
                unreachable!()
            };
            store.put_document("notes", &format!("n{i:02}"), fields);
        }

        let mut stream = repo.list_all().await.unwrap();
        let snapshot = stream.next().await.unwrap();
        assert_eq!(snapshot.len(), 26);
        assert_eq!(snapshot[0].title, "n38");
        assert!(snapshot
            .windows(2)
            .all(|pair| pair[0].created_at >= pair[1].created_at));
    }

    #[tokio::test]
    async fn cancelled_stream_ends_and_stops_push() {
        let (store, repo) = repository();
        let mut stream = repo.list_all().await.unwrap();
        let _ = stream.next().await;

        stream.cancel();
        stream.cancel();

        assert_eq!(store.active_subscribers(), 0);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn dropping_stream_unsubscribes() {
        let (store, repo) = repository();
        let stream = repo.list_all().await.unwrap();
        assert_eq!(store.active_subscribers(), 1);

        drop(stream);
        assert_eq!(store.active_subscribers(), 0);
    }
}
