//! Subcommand implementations
//!
//! Both commands run against the in-memory backend, so every run starts from
//! an empty store.

use anyhow::{bail, Context, Result};
use notehub_backend::{
    Fields, IdentityProvider, MemoryBlobStore, MemoryDocumentStore, MemoryIdentityProvider,
};
use notehub_core::{
    Attachment, DetailState, FeedFilter, FeedViewModel, InMemoryClipboard, Note,
    NoteDetailViewModel, NoteHubConfig, NoteRepository, SessionContext, ShareAction, UploadFlow,
    UploadForm,
};
use std::path::Path;
use std::sync::Arc;

const DEMO_PASSWORD: &str = "notehub-demo";

/// In-memory services for one run
struct Backend {
    documents: Arc<MemoryDocumentStore>,
    blobs: Arc<MemoryBlobStore>,
    identity: Arc<MemoryIdentityProvider>,
    session: SessionContext,
    repository: NoteRepository,
}

impl Backend {
    fn new(config: &NoteHubConfig) -> Self {
        let documents = Arc::new(MemoryDocumentStore::new());
        let identity = Arc::new(MemoryIdentityProvider::new());
        Self {
            repository: NoteRepository::new(documents.clone(), config.notes_collection.clone()),
            session: SessionContext::start(identity.clone()),
            blobs: Arc::new(MemoryBlobStore::default()),
            documents,
            identity,
        }
    }
}

/// Upload a note as one user, then browse, view and share it as another
pub(crate) async fn demo(config: &NoteHubConfig) -> Result<()> {
    let backend = Backend::new(config);
    let session = &backend.session;

    session
        .sign_up("ada@notehub.local", DEMO_PASSWORD, Some("Ada"))
        .await
        .context("registering author")?;
    let upload = UploadFlow::new(
        backend.repository.clone(),
        backend.blobs.clone(),
        session.clone(),
        config.blob_prefix.clone(),
    );
    let form = UploadForm::new("Physics Notes")
        .with_description("Kinematics and projectile motion")
        .with_tags("physics, sem3")
        .with_semester("III")
        .with_file(Attachment::new("kinematics.pdf", b"%PDF-1.7".to_vec()));
    let note_id = upload
        .submit(form)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    println!("Uploaded note {note_id}");
    session.sign_out().await?;

    session
        .sign_up("bob@notehub.local", DEMO_PASSWORD, None)
        .await
        .context("registering viewer")?;
    let feed = FeedViewModel::open(&backend.repository, session, config).await?;
    let state = feed.loaded().await?;
    println!("Feed ({} notes):", state.notes.len());
    for note in state.visible_notes() {
        print_card(note);
    }
    feed.set_tag("PHYSICS");
    println!("Tagged physics: {}", feed.visible_notes().len());
    feed.clear_filters();
    feed.close();

    let detail =
        NoteDetailViewModel::open(&backend.repository, session, config, note_id.clone())
            .await?
            .with_share_action(
                ShareAction::new(config.share_status_window())
                    .with_clipboard(Arc::new(InMemoryClipboard::new())),
            );
    if let Some(increment) = detail.pending_view_increment() {
        increment.await?;
    }
    match detail.state() {
        DetailState::Found(note) => {
            println!("Viewing \"{}\" by {}", note.title, note.author_label());
            println!("  Created: {}", note.created_label());
            if let Some(name) = &note.file_name {
                println!("  Attachment: {name}");
            }
        }
        other => bail!(other.message().unwrap_or_default()),
    }

    if let Some(status) = detail.share().await {
        println!("Share: {} {}", status.label(), detail.share_url());
    }
    if let Some(mailto) = detail.mailto_link() {
        println!("Email: {mailto}");
    }

    let views = backend
        .repository
        .get_by_id(&note_id)
        .await
        .map(|note| note.views)?;
    println!("Views recorded: {views}");

    session.shutdown();
    tracing::info!(
        documents = backend.documents.document_count(&config.notes_collection),
        blobs = backend.blobs.len(),
        "demo finished"
    );
    Ok(())
}

/// Print the feed as a signed-in viewer would see it
pub(crate) async fn feed(
    config: &NoteHubConfig,
    filter: FeedFilter,
    seed: Option<&Path>,
) -> Result<()> {
    let backend = Backend::new(config);
    if let Some(path) = seed {
        let documents = load_seed(path)?;
        tracing::info!(count = documents.len(), path = %path.display(), "seeding notes");
        for (id, fields) in documents {
            backend
                .documents
                .put_document(&config.notes_collection, &id, fields);
        }
    }

    backend
        .identity
        .sign_up("viewer@notehub.local", DEMO_PASSWORD, None)
        .await
        .context("registering viewer")?;
    let feed = FeedViewModel::open(&backend.repository, &backend.session, config).await?;
    feed.set_filter(filter);
    let state = feed.loaded().await?;

    if let Some(empty) = state.empty_state() {
        println!("{}", empty.message());
    } else {
        for note in state.visible_notes() {
            print_card(note);
        }
    }
    let facets = state.tag_facets();
    if !facets.is_empty() {
        println!("Tags: {}", facets.join(", "));
    }
    feed.close();
    Ok(())
}

fn print_card(note: &Note) {
    let tags = note.card_tags().join(", ");
    println!(
        "  {:<14} {:<28} {:<16} [{}] {} views",
        note.created_label_short(),
        note.title,
        note.author_label(),
        tags,
        note.views
    );
}

/// Read a JSON array of note objects; each may carry its own `id`
fn load_seed(path: &Path) -> Result<Vec<(String, Fields)>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading seed file {}", path.display()))?;
    let values: Vec<serde_json::Value> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let serde_json::Value::Object(mut fields) = value else {
                bail!("seed entry {index} is not an object");
            };
            let id = match fields.remove("id") {
                Some(serde_json::Value::String(id)) => id,
                Some(other) => bail!("seed entry {index} has non-string id {other}"),
                None => format!("seed-{index}"),
            };
            Ok((id, fields))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_seed_assigns_missing_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        std::fs::write(
            &path,
            r#"[{"id": "a", "title": "Physics Notes"}, {"title": "Math Basics"}]"#,
        )
        .unwrap();

        let seeded = load_seed(&path).unwrap();
        let ids: Vec<_> = seeded.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["a", "seed-1"]);
        assert!(!seeded[0].1.contains_key("id"));
    }

    #[test]
    fn load_seed_rejects_non_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        std::fs::write(&path, "[1]").unwrap();

        assert!(load_seed(&path).is_err());
    }

    #[tokio::test]
    async fn feed_runs_against_seed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        std::fs::write(
            &path,
            r#"[{"id": "a", "title": "Physics Notes", "tags": ["physics"], "createdAt": 2000000}]"#,
        )
        .unwrap();

        let config = NoteHubConfig::new();
        feed(&config, FeedFilter::new().with_tag("physics"), Some(&path))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn demo_completes() {
        demo(&NoteHubConfig::new()).await.unwrap();
    }
}
