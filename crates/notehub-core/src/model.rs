//! Note data model
//!
//! A [`Note`] is decoded from a stored document. Field names on the wire are
//! camelCase; `createdAt` is microseconds since the Unix epoch.

use chrono::{DateTime, Utc};
use notehub_backend::{Document, DocumentId};
use serde::{Deserialize, Deserializer, Serialize};

/// Note identifier, assigned by the document store
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub String);

impl NoteId {
    /// Wrap an identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NoteId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<DocumentId> for NoteId {
    fn from(id: DocumentId) -> Self {
        Self(id.0)
    }
}

/// Shared note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Document id; not part of the stored fields
    #[serde(skip)]
    pub id: NoteId,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub semester: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author_email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author_name: String,
    /// Absent until the store has stamped the write
    #[serde(default, with = "chrono::serde::ts_microseconds_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub views: u64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Note {
    /// Decode a stored document
    ///
    /// # Errors
    /// Returns the serde error if required fields are missing or mistyped
    pub fn from_document(document: Document) -> Result<Self, serde_json::Error> {
        let mut note: Note = serde_json::from_value(serde_json::Value::Object(document.fields))?;
        note.id = document.id.into();
        Ok(note)
    }

    /// Check if `uid` wrote this note
    #[inline]
    #[must_use]
    pub fn is_authored_by(&self, uid: &str) -> bool {
        self.author_id == uid
    }

    /// Check if a file is attached
    #[inline]
    #[must_use]
    pub fn has_attachment(&self) -> bool {
        self.file_url.is_some()
    }

    /// Author shown on cards and detail pages
    #[must_use]
    pub fn author_label(&self) -> &str {
        if self.author_name.is_empty() {
            &self.author_email
        } else {
            &self.author_name
        }
    }

    /// Long creation date, e.g. `March 4, 2025, 09:15 AM`
    #[must_use]
    pub fn created_label(&self) -> String {
        self.created_at.map_or_else(
            || UNKNOWN_DATE.to_string(),
            |ts| ts.format("%B %-d, %Y, %I:%M %p").to_string(),
        )
    }

    /// Short creation date, e.g. `Mar 4, 2025`
    #[must_use]
    pub fn created_label_short(&self) -> String {
        self.created_at.map_or_else(
            || UNKNOWN_DATE.to_string(),
            |ts| ts.format("%b %-d, %Y").to_string(),
        )
    }

    /// Tags shown on a feed card
    #[inline]
    #[must_use]
    pub fn card_tags(&self) -> &[String] {
        &self.tags[..self.tags.len().min(CARD_TAG_LIMIT)]
    }
}

const UNKNOWN_DATE: &str = "Unknown date";
const CARD_TAG_LIMIT: usize = 3;

/// Author stamped on a new note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// Stored attachment reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    /// Public download URL
    pub url: String,
    /// Original file name
    pub name: String,
}

/// Fields for a note about to be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub semester: Option<String>,
    pub subject: Option<String>,
    pub attachment: Option<AttachmentRef>,
    pub author: Author,
}

impl NewNote {
    /// Create with title and author, everything else empty
    #[must_use]
    pub fn new(title: impl Into<String>, author: Author) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            tags: Vec::new(),
            semester: None,
            subject: None,
            attachment: None,
            author,
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// With tags
    #[inline]
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
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

    /// With attachment
    #[inline]
    #[must_use]
    pub fn with_attachment(mut self, attachment: AttachmentRef) -> Self {
        self.attachment = Some(attachment);
        self
    }
}
