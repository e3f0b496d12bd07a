//! Browser front end: an upload form and an endpoint that answers with the
//! ZIP archive as a download.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use indicatif::ProgressBar;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::SplitError;
use crate::pipeline::{split_document, SplitOptions};

pub const DEFAULT_BIND: &str = "127.0.0.1:8501";
pub const DEFAULT_MAX_UPLOAD_MB: usize = 50;
const UPLOAD_FIELD: &str = "file";

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>PDF Page Splitter</title></head>
<body>
  <h1>PDF Page Splitter</h1>
  <p>Each page becomes its own PDF, named after the Name and Mobile# printed on it.</p>
  <form action="/split" method="post" enctype="multipart/form-data">
    <input type="file" name="file" accept="application/pdf,.pdf" required>
    <button type="submit">Download All Pages as ZIP</button>
  </form>
</body>
</html>
"#;

#[derive(Clone)]
struct AppState {
    options: SplitOptions,
}

// ============================================================================
// Error type
// ============================================================================

struct AppError(StatusCode, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({"error": self.1}))).into_response()
    }
}

impl From<SplitError> for AppError {
    fn from(e: SplitError) -> Self {
        let status = match e {
            SplitError::UnreadableDocument(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SplitError::Staging(_) | SplitError::Archive(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError(status, e.to_string())
    }
}

fn bad_request(msg: impl Into<String>) -> AppError {
    AppError(StatusCode::BAD_REQUEST, msg.into())
}

// ============================================================================
// Router
// ============================================================================

pub fn build_router(options: SplitOptions, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/split", post(split_upload))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { options })
}

pub async fn start_server(addr: &str, router: Router) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await
}

// ============================================================================
// Handlers
// ============================================================================

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn split_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let name = field.file_name().unwrap_or("document.pdf").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(e.body_text()))?;
        upload = Some((name, bytes));
        break;
    }
    let (name, bytes) =
        upload.ok_or_else(|| bad_request(format!("missing '{}' field", UPLOAD_FIELD)))?;

    info!("Received {:?} ({} bytes)", name, bytes.len());
    let options = state.options;
    let outcome = tokio::task::spawn_blocking(move || {
        split_document(&bytes, &name, &options, &ProgressBar::hidden())
    })
    .await
    .map_err(|e| AppError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    .inspect_err(|e| warn!("Split failed: {}", e))?;

    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (header::CONTENT_DISPOSITION, content_disposition(&outcome.archive_name)),
    ];
    Ok((headers, outcome.archive).into_response())
}

/// `attachment` header with an ASCII fallback name plus the exact UTF-8 name.
fn content_disposition(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        urlencoding::encode(file_name)
    )
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::fixture_pdf;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::io::Cursor;
    use tower::ServiceExt;

    const BOUNDARY: &str = "splitter-test-boundary";

    fn router() -> Router {
        build_router(SplitOptions::default(), 1024 * 1024)
    }

    fn upload(field: &str, file_name: &str, data: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/split")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn serves_upload_form() {
        let resp = router()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("enctype=\"multipart/form-data\""));
        assert!(html.contains("name=\"file\""));
    }

    #[tokio::test]
    async fn health_check() {
        let resp = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn split_returns_zip_download() {
        let pdf = fixture_pdf(&[
            &["Mobile#: 1234567890", "Name: DR. John Smith"],
            &["Name:"],
            &["Mobile#: 5550001111"],
        ]);
        let resp = router()
            .oneshot(upload("file", "clinic.pdf", &pdf))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/zip");
        let disposition = resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=\"clinic.zip\""));

        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let mut zip = zip::ZipArchive::new(Cursor::new(body.to_vec())).unwrap();
        assert_eq!(zip.len(), 3);
        assert_eq!(
            zip.by_index(0).unwrap().name(),
            "DR_ John Smith_Mobile_1234567890_Page_1.pdf"
        );
        assert_eq!(
            zip.by_index(2).unwrap().name(),
            "Unknown_Name_Mobile_5550001111_Page_3.pdf"
        );
    }

    #[tokio::test]
    async fn missing_file_field() {
        let resp = router()
            .oneshot(upload("other", "clinic.pdf", b"%PDF"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn corrupt_pdf_is_unprocessable() {
        let resp = router()
            .oneshot(upload("file", "broken.pdf", b"not a pdf at all"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].as_str().unwrap().contains("unreadable PDF"));
    }

    #[test]
    fn disposition_keeps_ascii_names() {
        assert_eq!(
            content_disposition("batch 7.zip"),
            "attachment; filename=\"batch 7.zip\"; filename*=UTF-8''batch%207.zip"
        );
    }

    #[test]
    fn disposition_escapes_non_ascii() {
        let value = content_disposition("résumé.zip");
        assert!(value.starts_with("attachment; filename=\"r_sum_.zip\""));
        assert!(value.ends_with("filename*=UTF-8''r%C3%A9sum%C3%A9.zip"));
    }
}
