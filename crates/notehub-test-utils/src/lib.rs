//! Testing utilities for NoteHub workspace
//!
//! Shared fixtures: an in-memory backend wired into the core services, note
//! builders with explicit timestamps, and signed-in identities.

#![allow(missing_docs)]

use chrono::{TimeZone, Utc};
use notehub_backend::{
    Identity, IdentityProvider, MemoryBlobStore, MemoryDocumentStore, MemoryIdentityProvider,
};
use notehub_core::{Note, NoteHubConfig, NoteId, NoteRepository, SessionContext, UploadFlow};
use std::sync::Arc;

pub const TEST_PASSWORD: &str = "secret1";

/// In-memory backend plus the configuration the services are built from
#[derive(Debug)]
pub struct TestBackend {
    pub documents: Arc<MemoryDocumentStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub identity: Arc<MemoryIdentityProvider>,
    pub config: NoteHubConfig,
}

impl Default for TestBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TestBackend {
    pub fn new() -> Self {
        Self::with_config(NoteHubConfig::new())
    }

    pub fn with_config(config: NoteHubConfig) -> Self {
        Self {
            documents: Arc::new(MemoryDocumentStore::new()),
            blobs: Arc::new(MemoryBlobStore::default()),
            identity: Arc::new(MemoryIdentityProvider::new()),
            config,
        }
    }

    pub fn repository(&self) -> NoteRepository {
        NoteRepository::new(self.documents.clone(), self.config.notes_collection.clone())
    }

    pub fn session(&self) -> SessionContext {
        SessionContext::start(self.identity.clone())
    }

    pub fn upload_flow(&self, session: &SessionContext) -> UploadFlow {
        UploadFlow::new(
            self.repository(),
            self.blobs.clone(),
            session.clone(),
            self.config.blob_prefix.clone(),
        )
    }

    /// Register `email` and leave it signed in
    pub async fn sign_up(&self, email: &str) -> Identity {
        self.identity
            .sign_up(email, TEST_PASSWORD, None)
            .await
            .unwrap()
    }

    /// Switch the signed-in identity to an existing account
    pub async fn sign_in(&self, email: &str) -> Identity {
        self.identity.sign_in(email, TEST_PASSWORD).await.unwrap()
    }

    /// Store `note` as-is, keeping its id and `createdAt`
    pub fn seed(&self, note: &Note) -> NoteId {
        let serde_json::Value::Object(fields) = serde_json::to_value(note).unwrap() else {
            panic!("note must serialize to an object");
        };
        self.documents
            .put_document(&self.config.notes_collection, note.id.as_str(), fields);
        note.id.clone()
    }

    /// Current stored `views` of a note
    pub fn views(&self, id: &NoteId) -> u64 {
        self.documents
            .fields(&self.config.notes_collection, id.as_str())
            .and_then(|fields| fields.get("views").and_then(serde_json::Value::as_u64))
            .unwrap_or_default()
    }
}

/// Note builder with test-friendly defaults
#[derive(Debug, Clone)]
pub struct NoteFixture {
    note: Note,
}

/// Start a note with `id` and `title`, authored by `author-a`, no timestamp
pub fn note(id: &str, title: &str) -> NoteFixture {
    NoteFixture {
        note: Note {
            id: NoteId::new(id),
            title: title.to_string(),
            description: String::new(),
            tags: Vec::new(),
            semester: None,
            subject: None,
            file_url: None,
            file_name: None,
            author_id: "author-a".to_string(),
            author_email: "author@example.com".to_string(),
            author_name: "author".to_string(),
            created_at: None,
            views: 0,
        },
    }
}

impl NoteFixture {
    pub fn description(mut self, description: &str) -> Self {
        self.note.description = description.to_string();
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.note.tags = tags.iter().map(|t| (*t).to_string()).collect();
        self
    }

    pub fn semester(mut self, semester: &str) -> Self {
        self.note.semester = Some(semester.to_string());
        self
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.note.subject = Some(subject.to_string());
        self
    }

    pub fn author(mut self, identity: &Identity) -> Self {
        self.note.author_id = identity.uid.clone();
        self.note.author_email = identity.email.clone();
        self.note.author_name = identity.author_name();
        self
    }

    /// Creation time in whole seconds since the epoch
    pub fn created_at(mut self, secs: i64) -> Self {
        self.note.created_at = Utc.timestamp_opt(secs, 0).single();
        self
    }

    pub fn views(mut self, views: u64) -> Self {
        self.note.views = views;
        self
    }

    pub fn build(self) -> Note {
        self.note
    }
}

/// Physics/Math pair: `a` (newer, tags physics+sem3) and `b` (older, tag math)
pub fn physics_and_math() -> Vec<Note> {
    vec![
        note("a", "Physics Notes")
            .tags(&["physics", "sem3"])
            .created_at(2_000)
            .build(),
        note("b", "Math Basics").tags(&["math"]).created_at(1_000).build(),
    ]
}
