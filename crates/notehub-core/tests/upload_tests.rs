use notehub_backend::{BackendError, Operation};
use notehub_core::{Attachment, FeedViewModel, NoteHubError, UploadForm};
use notehub_test_utils::TestBackend;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_blank_title_with_file_writes_nothing() {
    let backend = TestBackend::new();
    backend.sign_up("ada@example.com").await;
    let session = backend.session();

    let form = UploadForm::new("").with_file(Attachment::new("notes.pdf", vec![1, 2, 3]));
    let err = backend.upload_flow(&session).submit(form).await.unwrap_err();

    assert!(matches!(err, NoteHubError::Validation(_)));
    assert!(backend.blobs.is_empty());
    assert_eq!(backend.documents.write_count(), 0);
}

#[tokio::test]
async fn test_uploaded_note_reaches_open_feed() {
    let backend = TestBackend::new();
    let identity = backend.sign_up("ada@example.com").await;
    let session = backend.session();
    let feed = FeedViewModel::open(&backend.repository(), &session, &backend.config)
        .await
        .unwrap();
    feed.loaded().await.unwrap();

    let form = UploadForm::new("Sorting")
        .with_tags("aad, algorithms")
        .with_subject("AAD")
        .with_file(Attachment::new("sorting.pdf", b"%PDF-1.7".to_vec()));
    let id = backend.upload_flow(&session).submit(form).await.unwrap();

    let state = feed.wait_for(|s| !s.notes.is_empty()).await.unwrap();
    let stored = &state.notes[0];
    assert_eq!(stored.id, id);
    assert_eq!(stored.views, 0);
    assert!(stored.created_at.is_some());
    assert!(stored.is_authored_by(&identity.uid));
    assert_eq!(stored.file_name.as_deref(), Some("sorting.pdf"));
    assert!(backend.blobs.paths()[0].starts_with(&format!("notes/{}/", identity.uid)));
}

#[tokio::test]
async fn test_failed_create_leaves_orphaned_blob() {
    let backend = TestBackend::new();
    backend.sign_up("ada@example.com").await;
    let session = backend.session();
    backend.documents.fail_next(
        Operation::Create,
        BackendError::Unavailable("unavailable".to_string()),
    );

    let form = UploadForm::new("Sorting").with_file(Attachment::new("sorting.pdf", vec![0]));
    let err = backend.upload_flow(&session).submit(form).await.unwrap_err();

    assert!(matches!(err, NoteHubError::StorageUnavailable(_)));
    assert_eq!(backend.blobs.len(), 1);
    assert_eq!(backend.documents.document_count("notes"), 0);
}

#[tokio::test]
async fn test_signed_out_upload_is_rejected() {
    let backend = TestBackend::new();
    let session = backend.session();

    let err = backend
        .upload_flow(&session)
        .submit(UploadForm::new("Sorting"))
        .await
        .unwrap_err();
    assert_eq!(err, NoteHubError::Unauthenticated);
}
