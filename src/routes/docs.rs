//! Docs API routes
//!
//! REST surface of the doc store: create/update/list/get/delete plus the
//! two cached read endpoints, original content and rendered page images.
//! Both read endpoints answer conditional requests with a strong validator
//! compared by literal string equality against the quoted fingerprint.

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};

use crate::db::{DocCriteria, DocRepository, PageRequest};
use crate::docs::DocDto;
use crate::error::{AppError, Result};
use crate::hash;
use crate::pdf::MIME_JPEG;
use crate::state::AppState;

/// Caching policy for the content and page image endpoints.
const CACHE_CONTROL_VALUE: &str = "max-age=3600";

/// Create the docs router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_docs).post(create_doc).put(update_doc))
        .route("/count", get(count_docs))
        .route("/:id", get(get_doc).delete(delete_doc))
        .route("/:id/content", get(get_content))
        .route("/:id/img/:page", get(get_page_image))
        // Content travels base64-encoded inside JSON bodies; allow large ones.
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024))
}

/// Create a new doc
async fn create_doc(State(state): State<AppState>, Json(dto): Json<DocDto>) -> Result<Response> {
    if dto.id.is_some() {
        return Err(AppError::BadRequest(
            "A new doc cannot already have an id".to_string(),
        ));
    }

    let saved = state.ingest().save(dto).await?;
    let id = saved
        .id
        .ok_or_else(|| AppError::Internal("Saved doc has no id".to_string()))?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/docs/{}", id))],
        Json(saved),
    )
        .into_response())
}

/// Update an existing doc
async fn update_doc(State(state): State<AppState>, Json(dto): Json<DocDto>) -> Result<Json<DocDto>> {
    if dto.id.is_none() {
        return Err(AppError::BadRequest(
            "An update must carry the doc id".to_string(),
        ));
    }

    let saved = state.ingest().save(dto).await?;
    Ok(Json(saved))
}

/// List docs matching the filter, one page at a time
async fn list_docs(
    State(state): State<AppState>,
    Query(criteria): Query<DocCriteria>,
    Query(page): Query<PageRequest>,
) -> Result<Response> {
    let repo = DocRepository::new(state.db());
    let docs = repo.list(&criteria, &page).await?;
    let total = repo.count(&criteria).await?;

    let body: Vec<DocDto> = docs.into_iter().map(DocDto::from).collect();

    Ok((
        StatusCode::OK,
        [(HeaderName::from_static("x-total-count"), total.to_string())],
        Json(body),
    )
        .into_response())
}

/// Count docs matching the filter
async fn count_docs(
    State(state): State<AppState>,
    Query(criteria): Query<DocCriteria>,
) -> Result<Json<i64>> {
    let repo = DocRepository::new(state.db());
    let total = repo.count(&criteria).await?;
    Ok(Json(total))
}

/// Get a single doc
async fn get_doc(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<DocDto>> {
    let repo = DocRepository::new(state.db());
    let doc = repo
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Doc {} not found", id)))?;

    Ok(Json(DocDto::from(doc)))
}

/// Delete a doc and its preview set
async fn delete_doc(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    state.ingest().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Serve the original content bytes
async fn get_content(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response> {
    let repo = DocRepository::new(state.db());
    let doc = repo
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Doc {} not found", id)))?;

    // Rows written before fingerprinting existed heal on the fly.
    let fingerprint = match &doc.content_sha1 {
        Some(sha1) => sha1.clone(),
        None => hash::sha1_hex(&doc.content),
    };
    let etag = quoted(&fingerprint);
    let last_modified = http_date(doc.updated_at.unwrap_or(doc.created_at));

    if validator_matches(&headers, &etag) {
        return not_modified(&etag, &last_modified);
    }

    let filename = content_filename(id, &doc.content_type);

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, doc.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", filename),
        )
        .header(header::ETAG, etag)
        .header(header::LAST_MODIFIED, last_modified)
        .header(header::CACHE_CONTROL, CACHE_CONTROL_VALUE)
        .body(Body::from(doc.content))
        .map_err(|e| AppError::Internal(e.to_string()))?)
}

/// Serve a rendered page image
async fn get_page_image(
    State(state): State<AppState>,
    Path((id, page)): Path<(i64, u32)>,
    headers: HeaderMap,
) -> Result<Response> {
    let repo = DocRepository::new(state.db());
    let doc = repo
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Doc {} not found", id)))?;

    let previews = state.previews();

    // A broken sidecar must not take the image down with it.
    let sidecar = match previews.read_fingerprint(id, page).await {
        Ok(fingerprint) => fingerprint,
        Err(e) => {
            tracing::warn!(
                "Failed to read fingerprint for doc {} page {}: {}",
                id,
                page,
                e
            );
            None
        }
    };

    let last_modified = http_date(doc.updated_at.unwrap_or(doc.created_at));

    if let Some(fingerprint) = &sidecar {
        let etag = quoted(fingerprint);
        if validator_matches(&headers, &etag) {
            return not_modified(&etag, &last_modified);
        }
    }

    let bytes = previews
        .read_page(id, page)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Page {} of doc {} not found", page, id)))?;

    let fingerprint = match sidecar {
        Some(fingerprint) => fingerprint,
        None => {
            let fingerprint = hash::sha1_hex(&bytes);
            if let Err(e) = previews
                .write_fingerprint_if_missing(id, page, &fingerprint)
                .await
            {
                tracing::warn!(
                    "Failed to write fingerprint for doc {} page {}: {}",
                    id,
                    page,
                    e
                );
            }
            fingerprint
        }
    };

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, MIME_JPEG)
        .header(header::ETAG, quoted(&fingerprint))
        .header(header::LAST_MODIFIED, last_modified)
        .header(header::CACHE_CONTROL, CACHE_CONTROL_VALUE)
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.to_string()))?)
}

/// Literal equality against the caller's validator; no weak semantics,
/// no wildcard.
fn validator_matches(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .map_or(false, |value| value == etag)
}

fn not_modified(etag: &str, last_modified: &str) -> Result<Response> {
    Ok(Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header(header::ETAG, etag)
        .header(header::LAST_MODIFIED, last_modified)
        .header(header::CACHE_CONTROL, CACHE_CONTROL_VALUE)
        .body(Body::empty())
        .map_err(|e| AppError::Internal(e.to_string()))?)
}

/// Wrap a fingerprint in quotes, the strong-validator convention.
fn quoted(fingerprint: &str) -> String {
    format!("\"{}\"", fingerprint)
}

/// RFC 7231 IMF-fixdate, e.g. `Tue, 25 Aug 2026 08:00:00 GMT`.
fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Inline filename for the content endpoint, extension from the MIME type.
fn content_filename(id: i64, content_type: &str) -> String {
    let ext = mime_guess::get_mime_extensions_str(content_type)
        .and_then(|exts| exts.first())
        .copied()
        .unwrap_or("bin");

    format!("doc_{}.{}", id, ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn http_date_is_imf_fixdate() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(http_date(at), "Tue, 02 Jan 2024 03:04:05 GMT");
    }

    #[test]
    fn validator_requires_exact_quoted_match() {
        let mut headers = HeaderMap::new();
        headers.insert(header::IF_NONE_MATCH, "\"abc\"".parse().unwrap());

        assert!(validator_matches(&headers, "\"abc\""));
        assert!(!validator_matches(&headers, "\"abcd\""));
        // Unquoted and wildcard forms never match.
        assert!(!validator_matches(&headers, "abc"));
        let mut headers = HeaderMap::new();
        headers.insert(header::IF_NONE_MATCH, "*".parse().unwrap());
        assert!(!validator_matches(&headers, "\"abc\""));
    }

    #[test]
    fn filename_extension_follows_mime_type() {
        assert_eq!(content_filename(5, "application/pdf"), "doc_5.pdf");
        assert_eq!(
            content_filename(5, "application/x-unknown-blob"),
            "doc_5.bin"
        );
    }
}
