//! Database schema initialization

use sqlx::SqlitePool;

use crate::error::Result;

/// Initialize the database schema
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(SCHEMA_SQL)
        .execute(pool)
        .await?;

    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Documents table: metadata plus the original content bytes.
-- content_sha1 is derived server-side at save time, never client-supplied.
-- page_count is NULL unless the content parsed as a PDF.
CREATE TABLE IF NOT EXISTS docs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    language TEXT,
    description TEXT,
    content BLOB NOT NULL,
    content_type TEXT NOT NULL,
    content_sha1 TEXT,
    page_count INTEGER,
    created_at TEXT NOT NULL,
    updated_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_docs_content_sha1 ON docs(content_sha1);
CREATE INDEX IF NOT EXISTS idx_docs_title ON docs(title);
"#;
