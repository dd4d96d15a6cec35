//! Ingest pipeline tests below the HTTP layer: what a save leaves in the
//! metadata store and on disk, and how re-saves and deletes reconcile the
//! two.

mod common;

use common::{minimal_pdf, spawn_app};
use docpreview_server::db::DocRepository;
use docpreview_server::docs::DocDto;
use docpreview_server::error::AppError;

fn dto(title: &str, content: Vec<u8>, content_type: &str) -> DocDto {
    DocDto {
        title: Some(title.to_string()),
        content: Some(content),
        content_type: Some(content_type.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn pdf_save_populates_previews_and_page_count() {
    let app = spawn_app().await;

    let saved = app
        .state
        .ingest()
        .save(dto(
            "Three pages",
            minimal_pdf(&[(200, 200), (300, 300), (400, 400)]),
            "application/pdf",
        ))
        .await
        .unwrap();

    let id = saved.id.unwrap();
    assert_eq!(saved.page_count, Some(3));
    assert_eq!(
        app.state.previews().list_pages(id).await.unwrap(),
        vec![1, 2, 3]
    );

    let record = DocRepository::new(app.state.db())
        .find(id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.page_count, Some(3));
}

#[tokio::test]
async fn resave_with_fewer_pages_invalidates_the_old_set() {
    let app = spawn_app().await;
    let ingest = app.state.ingest();

    let saved = ingest
        .save(dto(
            "Shrinking",
            minimal_pdf(&[(200, 200), (300, 300), (400, 400)]),
            "application/pdf",
        ))
        .await
        .unwrap();
    let id = saved.id.unwrap();

    let mut update = dto(
        "Shrinking",
        minimal_pdf(&[(200, 200), (300, 300)]),
        "application/pdf",
    );
    update.id = Some(id);
    let saved = ingest.save(update).await.unwrap();

    assert_eq!(saved.page_count, Some(2));
    assert_eq!(
        app.state.previews().list_pages(id).await.unwrap(),
        vec![1, 2]
    );
}

#[tokio::test]
async fn non_pdf_save_never_touches_previews() {
    let app = spawn_app().await;

    let saved = app
        .state
        .ingest()
        .save(dto("Plain text", b"just words".to_vec(), "text/plain"))
        .await
        .unwrap();

    let id = saved.id.unwrap();
    assert_eq!(saved.page_count, None);
    assert!(app
        .state
        .previews()
        .list_pages(id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn parse_failure_clears_prior_previews_but_keeps_the_record() {
    let app = spawn_app().await;
    let ingest = app.state.ingest();

    let saved = ingest
        .save(dto(
            "Goes bad",
            minimal_pdf(&[(200, 200), (300, 300)]),
            "application/pdf",
        ))
        .await
        .unwrap();
    let id = saved.id.unwrap();
    assert_eq!(saved.page_count, Some(2));

    let mut update = dto("Goes bad", b"garbage bytes".to_vec(), "application/pdf");
    update.id = Some(id);
    let saved = ingest.save(update).await.unwrap();

    // The save stands, the page count is unknown, the stale set is gone.
    assert_eq!(saved.page_count, None);
    assert!(app
        .state
        .previews()
        .list_pages(id)
        .await
        .unwrap()
        .is_empty());

    let record = DocRepository::new(app.state.db())
        .find(id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.content, b"garbage bytes");
    assert_eq!(record.page_count, None);
}

#[tokio::test]
async fn resave_preserves_created_at_and_restamps_updated_at() {
    let app = spawn_app().await;
    let ingest = app.state.ingest();

    let first = ingest
        .save(dto("Stamped", b"v1".to_vec(), "text/plain"))
        .await
        .unwrap();
    let id = first.id.unwrap();

    let mut update = dto("Stamped", b"v2".to_vec(), "text/plain");
    update.id = Some(id);
    let second = ingest.save(update).await.unwrap();

    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at.unwrap() >= first.updated_at.unwrap());
    assert_ne!(second.content_sha1, first.content_sha1);
}

#[tokio::test]
async fn delete_removes_both_record_and_preview_set() {
    let app = spawn_app().await;
    let ingest = app.state.ingest();

    let saved = ingest
        .save(dto(
            "Doomed",
            minimal_pdf(&[(200, 200)]),
            "application/pdf",
        ))
        .await
        .unwrap();
    let id = saved.id.unwrap();
    assert_eq!(
        app.state.previews().list_pages(id).await.unwrap(),
        vec![1]
    );

    ingest.delete(id).await.unwrap();

    assert!(DocRepository::new(app.state.db())
        .find(id)
        .await
        .unwrap()
        .is_none());
    assert!(app
        .state
        .previews()
        .list_pages(id)
        .await
        .unwrap()
        .is_empty());

    assert!(matches!(
        ingest.delete(id).await,
        Err(AppError::NotFound(_))
    ));
}
