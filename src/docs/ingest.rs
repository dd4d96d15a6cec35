//! Ingest pipeline
//!
//! Orchestrates a save end to end: validate, fingerprint, persist, and for
//! PDF content parse and render the preview set. Render and parse failures
//! are recovered (the metadata save stands); the one post-persist failure
//! that still fails the save is losing the blocking worker that holds the
//! native document, because its release can no longer be confirmed.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::{DocRepository, DocWrite};
use crate::error::{AppError, Result};
use crate::hash;
use crate::pdf::{PageRenderer, PdfDoc, PdfError, PdfResult, MIME_PDF};
use crate::preview::PreviewStore;

use super::types::DocDto;

/// Save and delete orchestration over the metadata store, the preview
/// store, and the render pipeline.
#[derive(Clone)]
pub struct IngestService {
    db: SqlitePool,
    previews: Arc<dyn PreviewStore>,
    renderer: PageRenderer,
}

impl IngestService {
    pub fn new(db: SqlitePool, previews: Arc<dyn PreviewStore>, renderer: PageRenderer) -> Self {
        Self {
            db,
            previews,
            renderer,
        }
    }

    /// Save a doc, creating or updating depending on whether it carries an id.
    ///
    /// The fingerprint is always recomputed from the content bytes; whatever
    /// the client sent in that field is discarded. PDF content additionally
    /// gets its page count probed and its preview set rebuilt.
    pub async fn save(&self, dto: DocDto) -> Result<DocDto> {
        tracing::debug!("Saving doc (id: {:?})", dto.id);
        dto.validate()?;

        // validate() just guaranteed these fields are present.
        let DocDto {
            id: existing_id,
            title: Some(title),
            language,
            description,
            content: Some(content),
            content_type: Some(content_type),
            ..
        } = dto
        else {
            return Err(AppError::Validation("incomplete payload".to_string()));
        };

        let sha1 = hash::sha1_hex(&content);
        let now = Utc::now();
        let is_pdf = content_type == MIME_PDF;

        let repo = DocRepository::new(&self.db);
        let write = DocWrite {
            title: &title,
            language: language.as_deref(),
            description: description.as_deref(),
            content: &content,
            content_type: &content_type,
            content_sha1: &sha1,
        };

        let id = match existing_id {
            None => repo.insert(&write, now).await?.id,
            Some(id) => {
                if !repo.update(id, &write, now).await? {
                    return Err(AppError::NotFound(format!("Doc {} not found", id)));
                }
                id
            }
        };

        let mut page_count: Option<i64> = None;
        let mut cleanup_err: Option<String> = None;

        if is_pdf {
            match tokio::task::spawn_blocking(move || PdfDoc::parse(content)).await {
                Err(e) => {
                    cleanup_err = Some(format!("Task join error: {}", e));
                }
                Ok(Err(e)) => {
                    // Declared PDF that does not open as one. The metadata
                    // save stands; any stale preview set must go.
                    tracing::warn!("Can not load PDF document for doc {}: {}", id, e);
                    if let Err(fs_err) = self.previews.invalidate(id).await {
                        tracing::warn!(
                            "Failed to invalidate previews for doc {}: {}",
                            id,
                            fs_err
                        );
                    }
                }
                Ok(Ok(doc)) => {
                    let doc = Arc::new(doc);
                    let pages = doc.page_count();
                    page_count = Some(pages as i64);

                    if let Err(e) = self.previews.invalidate(id).await {
                        tracing::warn!("Failed to invalidate previews for doc {}: {}", id, e);
                    }
                    if let Err(e) = self.previews.prepare(id).await {
                        tracing::warn!("Failed to prepare preview dir for doc {}: {}", id, e);
                    }

                    match self.render_previews(&doc, id, pages).await {
                        Ok(()) => {}
                        Err(PdfError::WorkerLost(msg)) => cleanup_err = Some(msg),
                        Err(e) => {
                            tracing::warn!("Can not convert doc {} to images: {}", id, e);
                        }
                    }
                }
            }
        }

        repo.set_page_count(id, page_count).await?;

        if let Some(msg) = cleanup_err {
            return Err(AppError::Cleanup(msg));
        }

        let saved = repo
            .find(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Doc {} vanished during save", id)))?;

        Ok(DocDto::from(saved))
    }

    /// Render every page of `doc` into the preview store.
    ///
    /// Stops at the first failure, leaving earlier pages in place. A lost
    /// worker propagates; everything else comes back as a plain render error
    /// for the caller to log and recover.
    async fn render_previews(&self, doc: &Arc<PdfDoc>, id: i64, pages: usize) -> PdfResult<()> {
        let started = Instant::now();
        let mut rendered = 0usize;

        for page in 1..=pages {
            let bytes = self.renderer.render_page(doc, page).await?;
            self.previews
                .write_page(id, page as u32, &bytes)
                .await
                .map_err(|e| PdfError::Render(format!("Failed to store page {}: {}", page, e)))?;
            rendered += 1;
        }

        tracing::info!(
            "Rendered {} pages for doc {} in {}ms",
            rendered,
            id,
            started.elapsed().as_millis()
        );

        Ok(())
    }

    /// Delete a doc's metadata record and its preview set.
    ///
    /// Both are attempted regardless of the other's outcome; a missing
    /// record is a not-found only after the preview cleanup has run.
    pub async fn delete(&self, id: i64) -> Result<()> {
        tracing::debug!("Deleting doc {}", id);

        let repo = DocRepository::new(&self.db);
        let db_result = repo.delete(id).await;

        if let Err(e) = self.previews.invalidate(id).await {
            tracing::warn!("Failed to remove previews for doc {}: {}", id, e);
        }

        match db_result {
            Err(e) => Err(e),
            Ok(false) => Err(AppError::NotFound(format!("Doc {} not found", id))),
            Ok(true) => Ok(()),
        }
    }
}
