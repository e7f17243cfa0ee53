use notehub_core::{DetailState, NoteDetailViewModel, NoteId, SessionContext};
use notehub_test_utils::{note, TestBackend};
use pretty_assertions::assert_eq;

async fn open(backend: &TestBackend, session: &SessionContext, id: &str) -> NoteDetailViewModel {
    NoteDetailViewModel::open(&backend.repository(), session, &backend.config, NoteId::new(id))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_missing_note_is_not_found() {
    let backend = TestBackend::new();
    backend.sign_up("b@example.com").await;
    let session = backend.session();

    let err = backend
        .repository()
        .get_by_id(&NoteId::new("missing"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let view = open(&backend, &session, "missing").await;
    assert_eq!(view.state(), DetailState::NotFound);
}

#[tokio::test]
async fn test_author_does_not_count_own_view() {
    let backend = TestBackend::new();
    let author = backend.sign_up("a@example.com").await;
    let id = backend.seed(&note("x", "Own").author(&author).views(3).build());
    let session = backend.session();

    let view = open(&backend, &session, "x").await;
    assert!(view.pending_view_increment().is_none());
    assert_eq!(backend.views(&id), 3);
}

#[tokio::test]
async fn test_other_viewer_increments_from_fetched_count() {
    let backend = TestBackend::new();
    let author = backend.sign_up("a@example.com").await;
    let id = backend.seed(&note("x", "Shared").author(&author).views(5).build());

    backend.sign_up("b@example.com").await;
    let session = backend.session();
    let view = open(&backend, &session, "x").await;

    // Display shows the fetched count, not the incremented one
    assert_eq!(view.state().note().map(|n| n.views), Some(5));
    view.pending_view_increment().unwrap().await.unwrap();
    assert_eq!(backend.views(&id), 6);

    view.reload().await;
    view.pending_view_increment().unwrap().await.unwrap();
    assert_eq!(backend.views(&id), 7);
}

#[tokio::test]
async fn test_concurrent_increments_lose_an_update() {
    let backend = TestBackend::new();
    let id = backend.seed(&note("x", "Popular").views(5).build());
    let repository = backend.repository();

    let (first, second) = tokio::join!(
        repository.increment_view(&id, 5),
        repository.increment_view(&id, 5),
    );
    first.unwrap();
    second.unwrap();

    assert_eq!(backend.views(&id), 6);
}

#[tokio::test]
async fn test_share_link_uses_configured_origin() {
    let backend = TestBackend::with_config(
        notehub_core::NoteHubConfig::new().with_origin("https://notes.example.org/"),
    );
    backend.seed(&note("x", "Shared").build());
    backend.sign_up("b@example.com").await;
    let session = backend.session();

    let view = open(&backend, &session, "x").await;
    assert_eq!(view.share_url(), "https://notes.example.org/note/x");
}
