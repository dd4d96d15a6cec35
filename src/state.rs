//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::docs::IngestService;
use crate::pdf::PageRenderer;
use crate::preview::PreviewStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pub config: Config,
    pub db: SqlitePool,
    pub previews: Arc<dyn PreviewStore>,
    pub ingest: IngestService,
}

impl AppState {
    /// Create a new application state
    pub fn new(
        config: Config,
        db: SqlitePool,
        previews: Arc<dyn PreviewStore>,
        renderer: PageRenderer,
    ) -> Self {
        let ingest = IngestService::new(db.clone(), Arc::clone(&previews), renderer);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                previews,
                ingest,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    /// Get the preview store
    pub fn previews(&self) -> &Arc<dyn PreviewStore> {
        &self.inner.previews
    }

    /// Get the ingest service
    pub fn ingest(&self) -> &IngestService {
        &self.inner.ingest
    }
}
