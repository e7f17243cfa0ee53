//! Feed view-model
//!
//! Owns the live note snapshot and the filter state, and derives the visible
//! subset from them. The repository stream is the producer; a consumer task
//! applies each snapshot to the state, which is republished on a `watch`
//! channel for renderers.
//!
//! # Filtering
//!
//! A note is visible when every non-empty filter matches:
//! - search: case-insensitive substring of title, description or any tag
//! - semester / subject: exact match
//! - tag: case-insensitive exact match against any tag

use crate::config::NoteHubConfig;
use crate::error::{NoteHubError, Result};
use crate::model::Note;
use crate::repository::{NoteRepository, NoteStream};
use crate::session::SessionContext;
use futures::StreamExt;
use indexmap::IndexSet;
use notehub_backend::SubscriptionHandle;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Feed filter; empty fields impose no constraint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedFilter {
    pub search_term: String,
    pub semester: String,
    pub subject: String,
    pub tag: String,
}

impl FeedFilter {
    /// Filter with no constraints
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With search term
    #[inline]
    #[must_use]
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search_term = term.into();
        self
    }

    /// With semester
    #[inline]
    #[must_use]
    pub fn with_semester(mut self, semester: impl Into<String>) -> Self {
        self.semester = semester.into();
        self
    }

    /// With subject
    #[inline]
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// With tag
    #[inline]
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Check if no filter is active
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search_term.is_empty()
            && self.semester.is_empty()
            && self.subject.is_empty()
            && self.tag.is_empty()
    }

    /// Check a note against every active filter
    #[must_use]
    pub fn matches(&self, note: &Note) -> bool {
        self.matches_search(note)
            && (self.semester.is_empty() || note.semester.as_deref() == Some(&*self.semester))
            && (self.subject.is_empty() || note.subject.as_deref() == Some(&*self.subject))
            && self.matches_tag(note)
    }

    fn matches_search(&self, note: &Note) -> bool {
        if self.search_term.is_empty() {
            return true;
        }
        let term = self.search_term.to_lowercase();
        note.title.to_lowercase().contains(&term)
            || note.description.to_lowercase().contains(&term)
            || note.tags.iter().any(|tag| tag.to_lowercase().contains(&term))
    }

    fn matches_tag(&self, note: &Note) -> bool {
        if self.tag.is_empty() {
            return true;
        }
        let wanted = self.tag.to_lowercase();
        note.tags.iter().any(|tag| tag.to_lowercase() == wanted)
    }
}

/// Notes passing `filter`, in snapshot order
#[must_use]
pub fn visible_notes<'a>(notes: &'a [Note], filter: &FeedFilter) -> Vec<&'a Note> {
    notes.iter().filter(|note| filter.matches(note)).collect()
}

/// Distinct non-empty tags across `notes`, in first-seen order
#[must_use]
pub fn tag_facets(notes: &[Note]) -> Vec<String> {
    notes
        .iter()
        .flat_map(|note| note.tags.iter())
        .filter(|tag| !tag.is_empty())
        .cloned()
        .collect::<IndexSet<String>>()
        .into_iter()
        .collect()
}

/// Why a loaded feed shows nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyFeed {
    /// A search term excluded everything
    NoMatches,
    /// Nothing to show yet
    NoNotesYet,
}

impl EmptyFeed {
    /// Message shown in place of the list
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::NoMatches => "No notes found matching your search.",
            Self::NoNotesYet => "No notes available yet. Be the first to upload one!",
        }
    }
}

/// Observable feed state
#[derive(Debug, Clone)]
pub struct FeedState {
    /// Latest snapshot, newest first
    pub notes: Vec<Note>,
    pub filter: FeedFilter,
    /// True until the first snapshot arrives
    pub loading: bool,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            notes: Vec::new(),
            filter: FeedFilter::default(),
            loading: true,
        }
    }
}

impl FeedState {
    /// Notes passing the current filter
    #[inline]
    #[must_use]
    pub fn visible_notes(&self) -> Vec<&Note> {
        visible_notes(&self.notes, &self.filter)
    }

    /// Tag options from the unfiltered snapshot
    #[inline]
    #[must_use]
    pub fn tag_facets(&self) -> Vec<String> {
        tag_facets(&self.notes)
    }

    /// Empty-state classification; `None` while loading or if anything is visible
    #[must_use]
    pub fn empty_state(&self) -> Option<EmptyFeed> {
        if self.loading || self.notes.iter().any(|note| self.filter.matches(note)) {
            return None;
        }
        if self.filter.search_term.is_empty() {
            Some(EmptyFeed::NoNotesYet)
        } else {
            Some(EmptyFeed::NoMatches)
        }
    }
}

/// Feed view-model
///
/// Holds the only live subscription for its snapshot. Dropping or closing the
/// view-model cancels that subscription and stops the consumer task.
pub struct FeedViewModel {
    state: Arc<watch::Sender<FeedState>>,
    subscription: SubscriptionHandle,
    consumer: Mutex<Option<JoinHandle<()>>>,
    semesters: Vec<String>,
    subjects: Vec<String>,
}

impl std::fmt::Debug for FeedViewModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("FeedViewModel")
            .field("notes", &state.notes.len())
            .field("filter", &state.filter)
            .field("loading", &state.loading)
            .field("closed", &self.subscription.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl FeedViewModel {
    /// Open the feed for the signed-in user
    ///
    /// # Errors
    /// - `NoteHubError::Unauthenticated` when nobody is signed in
    /// - translated backend error if the live query cannot be opened
    pub async fn open(
        repository: &NoteRepository,
        session: &SessionContext,
        config: &NoteHubConfig,
    ) -> Result<Self> {
        let identity = session.require_identity()?;
        let stream = repository.list_all().await?;
        tracing::debug!(uid = %identity.uid, "feed opened");
        Ok(Self::from_stream(stream, config))
    }

    /// Drive a view-model from an already open stream
    #[must_use]
    pub fn from_stream(stream: NoteStream, config: &NoteHubConfig) -> Self {
        let state = Arc::new(watch::Sender::new(FeedState::default()));
        let subscription = stream.handle().clone();
        let consumer = tokio::spawn(consume(stream, state.clone()));

        Self {
            state,
            subscription,
            consumer: Mutex::new(Some(consumer)),
            semesters: config.semesters.clone(),
            subjects: config.subjects.clone(),
        }
    }

    /// Copy of the current state
    #[must_use]
    pub fn snapshot(&self) -> FeedState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    /// Notes passing the current filter, newest first
    #[must_use]
    pub fn visible_notes(&self) -> Vec<Note> {
        self.state
            .borrow()
            .visible_notes()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Tag filter options
    #[must_use]
    pub fn tag_facets(&self) -> Vec<String> {
        self.state.borrow().tag_facets()
    }

    /// Semester filter options
    #[inline]
    #[must_use]
    pub fn semester_options(&self) -> &[String] {
        &self.semesters
    }

    /// Subject filter options
    #[inline]
    #[must_use]
    pub fn subject_options(&self) -> &[String] {
        &self.subjects
    }

    /// Check if the first snapshot is still pending
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Empty-state classification for the current state
    #[must_use]
    pub fn empty_state(&self) -> Option<EmptyFeed> {
        self.state.borrow().empty_state()
    }

    /// Current filter
    #[must_use]
    pub fn filter(&self) -> FeedFilter {
        self.state.borrow().filter.clone()
    }

    /// Set search term
    pub fn set_search_term(&self, term: impl Into<String>) {
        let term = term.into();
        self.state.send_modify(|s| s.filter.search_term = term);
    }

    /// Set semester filter
    pub fn set_semester(&self, semester: impl Into<String>) {
        let semester = semester.into();
        self.state.send_modify(|s| s.filter.semester = semester);
    }

    /// Set subject filter
    pub fn set_subject(&self, subject: impl Into<String>) {
        let subject = subject.into();
        self.state.send_modify(|s| s.filter.subject = subject);
    }

    /// Set tag filter
    pub fn set_tag(&self, tag: impl Into<String>) {
        let tag = tag.into();
        self.state.send_modify(|s| s.filter.tag = tag);
    }

    /// Replace the whole filter in one update
    pub fn set_filter(&self, filter: FeedFilter) {
        self.state.send_modify(|s| s.filter = filter);
    }

    /// Reset all four filters in one update
    pub fn clear_filters(&self) {
        self.set_filter(FeedFilter::default());
    }

    /// Wait until `predicate` holds for the state
    ///
    /// # Errors
    /// `NoteHubError::Cancelled` if the view-model is dropped while waiting
    pub async fn wait_for(&self, mut predicate: impl FnMut(&FeedState) -> bool) -> Result<FeedState> {
        let mut rx = self.state.subscribe();
        let state = rx
            .wait_for(|state| predicate(state))
            .await
            .map_err(|_| NoteHubError::Cancelled)?;
        Ok(state.clone())
    }

    /// Wait for the first snapshot
    ///
    /// # Errors
    /// `NoteHubError::Cancelled` if the view-model is dropped while waiting
    pub async fn loaded(&self) -> Result<FeedState> {
        self.wait_for(|state| !state.loading).await
    }

    /// Cancel the subscription and stop applying snapshots; idempotent
    pub fn close(&self) {
        self.subscription.cancel();
        if let Some(consumer) = self.consumer.lock().take() {
            consumer.abort();
            tracing::debug!("feed closed");
        }
    }

    /// Check if closed
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.subscription.is_cancelled()
    }
}

impl Drop for FeedViewModel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Consumer half: apply each snapshot until cancelled or the stream ends
async fn consume(mut stream: NoteStream, state: Arc<watch::Sender<FeedState>>) {
    let cancelled = stream.handle().token();
    loop {
        tokio::select! {
            biased;
            () = cancelled.cancelled() => break,
            next = stream.next() => match next {
                Some(notes) => state.send_modify(|s| {
                    s.notes = notes;
                    s.loading = false;
                }),
                None => break,
            },
        }
    }
    tracing::trace!("feed consumer stopped");
}
