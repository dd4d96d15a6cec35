//! Document metadata operations
//!
//! The repository speaks plain SQL through bound parameters; the listing
//! filter is an explicit typed struct translated onto `sqlx::QueryBuilder`,
//! one optional matcher per filterable column.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::Result;

const SELECT_COLUMNS: &str = "SELECT id, title, language, description, content, content_type, \
     content_sha1, page_count, created_at, updated_at FROM docs WHERE 1=1";

/// Document record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DocRecord {
    pub id: i64,
    pub title: String,
    pub language: Option<String>,
    pub description: Option<String>,
    pub content: Vec<u8>,
    pub content_type: String,
    pub content_sha1: Option<String>,
    pub page_count: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Column values written on insert or update. The fingerprint is the
/// server-computed one; `page_count` is always cleared by these writes and
/// reconciled later through [`DocRepository::set_page_count`].
#[derive(Debug)]
pub struct DocWrite<'a> {
    pub title: &'a str,
    pub language: Option<&'a str>,
    pub description: Option<&'a str>,
    pub content: &'a [u8],
    pub content_type: &'a str,
    pub content_sha1: &'a str,
}

/// Listing filter. Field names on the wire keep the dotted convention of the
/// original API (`title.contains=...&numberOfPages.greaterThanOrEqual=2`).
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct DocCriteria {
    #[serde(rename = "id.equals")]
    pub id_equals: Option<i64>,
    #[serde(rename = "title.equals")]
    pub title_equals: Option<String>,
    #[serde(rename = "title.contains")]
    pub title_contains: Option<String>,
    #[serde(rename = "language.equals")]
    pub language_equals: Option<String>,
    #[serde(rename = "description.contains")]
    pub description_contains: Option<String>,
    #[serde(rename = "contentSha1.equals")]
    pub content_sha1_equals: Option<String>,
    #[serde(rename = "numberOfPages.equals")]
    pub page_count_equals: Option<i64>,
    #[serde(rename = "numberOfPages.greaterThanOrEqual")]
    pub page_count_at_least: Option<i64>,
    #[serde(rename = "numberOfPages.lessThanOrEqual")]
    pub page_count_at_most: Option<i64>,
    #[serde(rename = "createdAt.greaterThanOrEqual")]
    pub created_at_or_after: Option<DateTime<Utc>>,
    #[serde(rename = "createdAt.lessThanOrEqual")]
    pub created_at_or_before: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt.greaterThanOrEqual")]
    pub updated_at_or_after: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt.lessThanOrEqual")]
    pub updated_at_or_before: Option<DateTime<Utc>>,
}

/// Pagination window, 0-based page index.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub size: u32,
}

fn default_page_size() -> u32 {
    20
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: default_page_size(),
        }
    }
}

/// Document repository
pub struct DocRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> DocRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch a document by id
    pub async fn find(&self, id: i64) -> Result<Option<DocRecord>> {
        let doc = sqlx::query_as::<_, DocRecord>(
            r#"
            SELECT id, title, language, description, content, content_type,
                   content_sha1, page_count, created_at, updated_at
            FROM docs
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(doc)
    }

    /// Insert a new document and return the stored record
    pub async fn insert(&self, doc: &DocWrite<'_>, now: DateTime<Utc>) -> Result<DocRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO docs (title, language, description, content, content_type,
                              content_sha1, page_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, NULL, ?, ?)
            "#,
        )
        .bind(doc.title)
        .bind(doc.language)
        .bind(doc.description)
        .bind(doc.content)
        .bind(doc.content_type)
        .bind(doc.content_sha1)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.find(id).await?.ok_or_else(|| {
            crate::error::AppError::Internal("Failed to fetch created doc".to_string())
        })
    }

    /// Overwrite an existing document. `created_at` is left untouched.
    /// Returns false when no record matched the id.
    pub async fn update(&self, id: i64, doc: &DocWrite<'_>, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE docs
            SET title = ?, language = ?, description = ?, content = ?,
                content_type = ?, content_sha1 = ?, page_count = NULL, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(doc.title)
        .bind(doc.language)
        .bind(doc.description)
        .bind(doc.content)
        .bind(doc.content_type)
        .bind(doc.content_sha1)
        .bind(now)
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Reconcile the page count after the render stage
    pub async fn set_page_count(&self, id: i64, page_count: Option<i64>) -> Result<()> {
        sqlx::query("UPDATE docs SET page_count = ? WHERE id = ?")
            .bind(page_count)
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Delete a document record
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM docs WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List documents matching the criteria, ordered by id
    pub async fn list(
        &self,
        criteria: &DocCriteria,
        page: &PageRequest,
    ) -> Result<Vec<DocRecord>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
        apply_filters(&mut qb, criteria);
        qb.push(" ORDER BY id ASC LIMIT ");
        qb.push_bind(i64::from(page.size));
        qb.push(" OFFSET ");
        qb.push_bind(i64::from(page.page) * i64::from(page.size));

        let docs = qb
            .build_query_as::<DocRecord>()
            .fetch_all(self.pool)
            .await?;

        Ok(docs)
    }

    /// Count documents matching the criteria
    pub async fn count(&self, criteria: &DocCriteria) -> Result<i64> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM docs WHERE 1=1");
        apply_filters(&mut qb, criteria);

        let total = qb.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        Ok(total)
    }
}

fn apply_filters<'qb>(qb: &mut QueryBuilder<'qb, Sqlite>, criteria: &'qb DocCriteria) {
    if let Some(id) = criteria.id_equals {
        qb.push(" AND id = ").push_bind(id);
    }
    if let Some(ref title) = criteria.title_equals {
        qb.push(" AND title = ").push_bind(title.as_str());
    }
    if let Some(ref needle) = criteria.title_contains {
        qb.push(" AND title LIKE ").push_bind(format!("%{needle}%"));
    }
    if let Some(ref language) = criteria.language_equals {
        qb.push(" AND language = ").push_bind(language.as_str());
    }
    if let Some(ref needle) = criteria.description_contains {
        qb.push(" AND description LIKE ")
            .push_bind(format!("%{needle}%"));
    }
    if let Some(ref sha1) = criteria.content_sha1_equals {
        qb.push(" AND content_sha1 = ").push_bind(sha1.as_str());
    }
    if let Some(pages) = criteria.page_count_equals {
        qb.push(" AND page_count = ").push_bind(pages);
    }
    if let Some(pages) = criteria.page_count_at_least {
        qb.push(" AND page_count >= ").push_bind(pages);
    }
    if let Some(pages) = criteria.page_count_at_most {
        qb.push(" AND page_count <= ").push_bind(pages);
    }
    if let Some(at) = criteria.created_at_or_after {
        qb.push(" AND created_at >= ").push_bind(at);
    }
    if let Some(at) = criteria.created_at_or_before {
        qb.push(" AND created_at <= ").push_bind(at);
    }
    if let Some(at) = criteria.updated_at_or_after {
        qb.push(" AND updated_at >= ").push_bind(at);
    }
    if let Some(at) = criteria.updated_at_or_before {
        qb.push(" AND updated_at <= ").push_bind(at);
    }
}
