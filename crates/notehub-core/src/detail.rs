//! Note detail view-model
//!
//! One fetch per note identifier. A successful fetch by anyone other than the
//! author records a view in the background; the page never waits for it and
//! a failed increment is only logged.

use crate::config::NoteHubConfig;
use crate::error::{NoteHubError, Result};
use crate::model::{Note, NoteId};
use crate::repository::NoteRepository;
use crate::session::SessionContext;
use crate::share::{self, ShareAction, SharePayload, ShareStatus};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use url::Url;

/// Detail page state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailState {
    Loading,
    Found(Note),
    /// No note has this identifier
    NotFound,
    /// Fetch failed for any other reason
    LoadError(NoteHubError),
}

impl DetailState {
    /// Check if still loading
    #[inline]
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Loaded note, if any
    #[inline]
    #[must_use]
    pub fn note(&self) -> Option<&Note> {
        match self {
            Self::Found(note) => Some(note),
            _ => None,
        }
    }

    /// Message shown instead of the note
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Loading | Self::Found(_) => None,
            Self::NotFound => Some("Note not found".to_string()),
            Self::LoadError(_) => Some("Failed to load note".to_string()),
        }
    }
}

/// Detail view-model
pub struct NoteDetailViewModel {
    repository: NoteRepository,
    session: SessionContext,
    origin: Url,
    note_id: NoteId,
    state: watch::Sender<DetailState>,
    share: ShareAction,
    pending_increment: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for NoteDetailViewModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteDetailViewModel")
            .field("note_id", &self.note_id)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl NoteDetailViewModel {
    /// Open the detail page for `note_id` and run the first fetch
    ///
    /// Fetch failures land in [`DetailState`], not in the returned error.
    ///
    /// # Errors
    /// - `NoteHubError::Unauthenticated` when nobody is signed in
    /// - `NoteHubError::Config` if the share origin is invalid
    pub async fn open(
        repository: &NoteRepository,
        session: &SessionContext,
        config: &NoteHubConfig,
        note_id: NoteId,
    ) -> Result<Self> {
        session.require_identity()?;
        let origin = config.origin_url()?;
        let (state, _) = watch::channel(DetailState::Loading);

        let view = Self {
            repository: repository.clone(),
            session: session.clone(),
            origin,
            note_id,
            state,
            share: ShareAction::new(config.share_status_window()),
            pending_increment: Mutex::new(None),
        };
        view.load().await;
        Ok(view)
    }

    /// With share targets
    #[inline]
    #[must_use]
    pub fn with_share_action(mut self, share: ShareAction) -> Self {
        self.share = share;
        self
    }

    /// Identifier being shown
    #[inline]
    #[must_use]
    pub fn note_id(&self) -> &NoteId {
        &self.note_id
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> DetailState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DetailState> {
        self.state.subscribe()
    }

    /// Point the page at another note; fetches only if the id changed
    pub async fn set_note_id(&mut self, note_id: NoteId) {
        if note_id == self.note_id {
            return;
        }
        self.note_id = note_id;
        self.load().await;
    }

    /// Fetch again; counts as another page load
    pub async fn reload(&self) {
        self.load().await;
    }

    async fn load(&self) {
        self.state.send_replace(DetailState::Loading);

        let next = match self.repository.get_by_id(&self.note_id).await {
            Ok(note) => {
                self.record_view(&note);
                DetailState::Found(note)
            }
            Err(NoteHubError::NotFound(_)) => {
                tracing::debug!(note_id = %self.note_id, "note not found");
                DetailState::NotFound
            }
            Err(e) => {
                tracing::warn!(
                    note_id = %self.note_id,
                    error = %e,
                    retryable = e.is_retryable(),
                    "failed to load note"
                );
                DetailState::LoadError(e)
            }
        };
        self.state.send_replace(next);
    }

    /// Fire-and-continue view increment for non-authors
    fn record_view(&self, note: &Note) {
        let Some(identity) = self.session.current() else {
            return;
        };
        if note.is_authored_by(&identity.uid) {
            return;
        }

        let repository = self.repository.clone();
        let id = note.id.clone();
        let views = note.views;
        let task = tokio::spawn(async move {
            if let Err(e) = repository.increment_view(&id, views).await {
                tracing::warn!(note_id = %id, error = %e, "failed to record view");
            }
        });
        // A superseded increment keeps running detached
        *self.pending_increment.lock() = Some(task);
    }

    /// Take the most recent background increment, if one was started
    pub fn pending_view_increment(&self) -> Option<JoinHandle<()>> {
        self.pending_increment.lock().take()
    }

    /// Canonical link to this note
    #[must_use]
    pub fn share_url(&self) -> String {
        share::share_url(&self.origin, &self.note_id)
    }

    /// `mailto:` link for the loaded note
    #[must_use]
    pub fn mailto_link(&self) -> Option<String> {
        let state = self.state.borrow();
        let note = state.note()?;
        Some(share::mailto_link(
            &note.title,
            &self.share_url(),
            &note.description,
        ))
    }

    /// Share the loaded note; `None` if nothing is loaded
    pub async fn share(&self) -> Option<ShareStatus> {
        let payload = {
            let state = self.state.borrow();
            let note = state.note()?;
            SharePayload {
                title: note.title.clone(),
                text: note.description.clone(),
                url: self.share_url(),
            }
        };
        Some(self.share.share(&payload).await)
    }

    /// Share button status
    #[inline]
    #[must_use]
    pub fn share_status(&self) -> ShareStatus {
        self.share.status()
    }
}
