//! Share action
//!
//! Produces the canonical note link and hands it to the platform: native share
//! sheet first, clipboard as fallback. The resulting status is published on a
//! `watch` channel and falls back to [`ShareStatus::Idle`] after a fixed window.

use crate::model::NoteId;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use url::Url;

/// Canonical link to a note: `<origin>/note/<id>`
#[must_use]
pub fn share_url(origin: &Url, id: &NoteId) -> String {
    format!(
        "{}/note/{}",
        origin.as_str().trim_end_matches('/'),
        urlencoding::encode(id.as_str())
    )
}

/// `mailto:` link carrying the title as subject and link plus description as body
#[must_use]
pub fn mailto_link(title: &str, url: &str, description: &str) -> String {
    let body = format!("{url}\n\n{description}");
    format!(
        "mailto:?subject={}&body={}",
        urlencoding::encode(title),
        urlencoding::encode(&body)
    )
}

/// Outcome shown on the share button
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ShareStatus {
    #[default]
    Idle,
    /// Native share sheet accepted the payload
    Shared,
    /// Link copied to the clipboard
    Copied,
    /// Neither route worked
    Error,
}

impl ShareStatus {
    /// Button label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Share",
            Self::Shared => "✓ Shared!",
            Self::Copied => "✓ Copied!",
            Self::Error => "Error",
        }
    }
}

/// What gets shared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePayload {
    pub title: String,
    pub text: String,
    pub url: String,
}

/// Share target failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShareError {
    #[error("share target unavailable")]
    Unavailable,
    #[error("share dismissed")]
    Dismissed,
    #[error("share failed: {0}")]
    Failed(String),
}

/// Platform share sheet
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NativeShare: Send + Sync {
    async fn share(&self, payload: &SharePayload) -> Result<(), ShareError>;
}

/// System clipboard
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), ShareError>;
}

/// Clipboard kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl InMemoryClipboard {
    /// Create empty clipboard
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last copied text
    #[must_use]
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

#[async_trait]
impl Clipboard for InMemoryClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ShareError> {
        *self.contents.lock() = Some(text.to_string());
        Ok(())
    }
}

/// Share button state machine
pub struct ShareAction {
    native: Option<Arc<dyn NativeShare>>,
    clipboard: Option<Arc<dyn Clipboard>>,
    status: Arc<watch::Sender<ShareStatus>>,
    window: Duration,
    reset: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for ShareAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareAction")
            .field("native", &self.native.is_some())
            .field("clipboard", &self.clipboard.is_some())
            .field("status", &*self.status.borrow())
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl ShareAction {
    /// Create with no share targets; every share ends in [`ShareStatus::Error`]
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            native: None,
            clipboard: None,
            status: Arc::new(watch::Sender::new(ShareStatus::Idle)),
            window,
            reset: Mutex::new(None),
        }
    }

    /// With native share sheet
    #[inline]
    #[must_use]
    pub fn with_native(mut self, native: Arc<dyn NativeShare>) -> Self {
        self.native = Some(native);
        self
    }

    /// With clipboard fallback
    #[inline]
    #[must_use]
    pub fn with_clipboard(mut self, clipboard: Arc<dyn Clipboard>) -> Self {
        self.clipboard = Some(clipboard);
        self
    }

    /// Current status
    #[must_use]
    pub fn status(&self) -> ShareStatus {
        *self.status.borrow()
    }

    /// Receiver notified on every status change
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ShareStatus> {
        self.status.subscribe()
    }

    /// Share `payload` and schedule the reset to idle
    ///
    /// Must run inside a tokio runtime.
    pub async fn share(&self, payload: &SharePayload) -> ShareStatus {
        let outcome = self.deliver(payload).await;
        self.status.send_replace(outcome);
        self.schedule_reset();
        tracing::debug!(url = %payload.url, status = ?outcome, "note shared");
        outcome
    }

    async fn deliver(&self, payload: &SharePayload) -> ShareStatus {
        if let Some(native) = &self.native {
            match native.share(payload).await {
                Ok(()) => return ShareStatus::Shared,
                Err(e) => tracing::debug!(error = %e, "native share failed, using clipboard"),
            }
        }
        let Some(clipboard) = &self.clipboard else {
            return ShareStatus::Error;
        };
        match clipboard.write_text(&payload.url).await {
            Ok(()) => ShareStatus::Copied,
            Err(e) => {
                tracing::warn!(error = %e, "clipboard write failed");
                ShareStatus::Error
            }
        }
    }

    /// Replace any pending reset with a fresh one
    fn schedule_reset(&self) {
        let status = self.status.clone();
        let window = self.window;
        let task = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            status.send_replace(ShareStatus::Idle);
        });
        if let Some(previous) = self.reset.lock().replace(task) {
            previous.abort();
        }
    }
}

impl Drop for ShareAction {
    fn drop(&mut self) {
        if let Some(reset) = self.reset.get_mut().take() {
            reset.abort();
        }
    }
}
