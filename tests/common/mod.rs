//! Shared helpers for the integration tests: a server wired onto temp
//! storage, a request driver, and a tiny PDF builder.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tempfile::TempDir;
use tower::ServiceExt;

use docpreview_server::config::{
    Config, DatabaseConfig, PreviewConfig, RenderConfig, ServerConfig,
};
use docpreview_server::db;
use docpreview_server::pdf::PageRenderer;
use docpreview_server::preview::{FilesystemPreviewStore, PreviewStore};
use docpreview_server::routes;
use docpreview_server::state::AppState;

/// A fully wired app on temp storage. Keep it alive for the whole test;
/// dropping it removes the database and the preview tree.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _db_dir: TempDir,
    _preview_dir: TempDir,
}

pub async fn spawn_app() -> TestApp {
    let db_dir = tempfile::tempdir().unwrap();
    let preview_dir = tempfile::tempdir().unwrap();

    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: format!("sqlite:{}", db_dir.path().join("docs.db").display()),
        },
        render: RenderConfig {
            dpi: 96,
            quality: 1.0,
        },
        preview: PreviewConfig {
            root: preview_dir.path().join("previews"),
        },
    };

    let pool = db::create_pool(&config.database.url).await.unwrap();

    let previews = Arc::new(FilesystemPreviewStore::new(config.preview.root.clone()));
    previews.ensure_root().await.unwrap();

    let renderer = PageRenderer::new(config.render).unwrap();
    let state = AppState::new(config, pool, previews, renderer);

    let router = Router::new()
        .nest("/api/docs", routes::docs::router())
        .with_state(state.clone());

    TestApp {
        router,
        state,
        _db_dir: db_dir,
        _preview_dir: preview_dir,
    }
}

/// Drive one request through the router and collect the whole response.
pub async fn request(
    app: &TestApp,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, HeaderMap, Bytes) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, headers, bytes)
}

/// JSON save payload with the content already base64 encoded.
pub fn doc_payload(title: &str, content: &[u8], content_type: &str) -> serde_json::Value {
    serde_json::json!({
        "title": title,
        "content": BASE64.encode(content),
        "contentContentType": content_type,
    })
}

/// Minimal n-page PDF, one page per MediaBox entry. Distinct box sizes
/// yield distinct rasters, which the fingerprint tests rely on.
pub fn minimal_pdf(media_boxes: &[(u32, u32)]) -> Vec<u8> {
    let n = media_boxes.len();
    let kids = (0..n)
        .map(|i| format!("{} 0 R", i + 3))
        .collect::<Vec<_>>()
        .join(" ");

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{kids}] /Count {n} >>"),
    ];
    for (w, h) in media_boxes {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {w} {h}] >>"
        ));
    }

    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
    }

    let xref_offset = pdf.len();
    pdf.push_str(&format!("xref\n0 {}\n", objects.len() + 1));
    pdf.push_str("0000000000 65535 f \n");
    for offset in &offsets {
        pdf.push_str(&format!("{offset:010} 00000 n \n"));
    }
    pdf.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_offset
    ));

    pdf.into_bytes()
}
