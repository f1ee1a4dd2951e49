//! HTTP surface tests driven through the router with `oneshot`

mod common;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use common::{Harness, MockExtractor, Providers};
use video_summarizer::api::{build_router, AppState};
use video_summarizer::error::PdfError;
use video_summarizer::pdf::DocumentRenderer;
use video_summarizer::{Config, PdfExporter};

const BOUNDARY: &str = "XyZBoundary42";

/// Returns a fixed-size fake PDF, or nothing at all.
struct FakeRenderer {
    size: usize,
}

#[async_trait]
impl DocumentRenderer for FakeRenderer {
    async fn render(&self, _html: &str) -> Result<Vec<u8>, PdfError> {
        let mut bytes = b"%PDF-1.4\n".to_vec();
        bytes.resize(self.size, b' ');
        Ok(bytes)
    }
}

fn app(harness: &Harness, pdf_size: usize) -> Router {
    app_with_limit(harness, pdf_size, Config::default().server.max_upload_bytes)
}

fn app_with_limit(harness: &Harness, pdf_size: usize, max_upload_bytes: usize) -> Router {
    let mut config = Config::default();
    config.server.max_upload_bytes = max_upload_bytes;
    config.storage.upload_dir = harness.dir.path().join("uploads");
    config.storage.audio_dir = harness.dir.path().join("audio");

    build_router(AppState {
        jobs: harness.service.clone(),
        pdf: PdfExporter::new(Arc::new(FakeRenderer { size: pdf_size })),
        config: Arc::new(config),
    })
}

fn harness() -> Harness {
    Harness::new(Arc::new(MockExtractor::ok()), &Providers::default(), false)
}

/// `(name, filename+mime, value)` parts
fn multipart_body(parts: &[(&str, Option<(&str, &str)>, &str)]) -> Body {
    let mut body = String::new();
    for (name, file, value) in parts {
        body.push_str(&format!("--{}\r\n", BOUNDARY));
        match file {
            Some((file_name, mime)) => {
                body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    name, file_name, mime
                ));
            }
            None => {
                body.push_str(&format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name));
            }
        }
        body.push_str(value);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));
    Body::from(body)
}

fn upload_request(body: Body) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(body)
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoints() {
    let harness = harness();
    for uri in ["/health", "/api/health"] {
        let response = app(&harness, 200)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["jobs"]["totalJobs"], 0);
    }
}

#[tokio::test]
async fn test_upload_without_file_is_rejected() {
    let harness = harness();
    let body = multipart_body(&[("contentType", None, "meeting"), ("languages", None, "FR")]);

    let response = app(&harness, 200).oneshot(upload_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No file uploaded");
    assert!(harness.store().is_empty());
}

#[tokio::test]
async fn test_upload_without_multipart_is_rejected() {
    let harness = harness();
    let request = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .body(Body::empty())
        .unwrap();

    let response = app(&harness, 200).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(harness.store().is_empty());
}

#[tokio::test]
async fn test_upload_rejects_non_video() {
    let harness = harness();
    let body = multipart_body(&[("video", Some(("notes.txt", "text/plain")), "hello")]);

    let response = app(&harness, 200).oneshot(upload_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(harness.store().is_empty());
}

#[tokio::test]
async fn test_upload_with_invalid_option_discards_file() {
    let harness = harness();
    let body = multipart_body(&[
        ("video", Some(("talk.mp4", "video/mp4")), "fake video bytes"),
        ("summaryStyle", None, "haiku"),
    ]);

    let response = app(&harness, 200).oneshot(upload_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(harness.store().is_empty());
    let uploads = harness.dir.path().join("uploads");
    let leftover = std::fs::read_dir(&uploads).map(|d| d.count()).unwrap_or(0);
    assert_eq!(leftover, 0);
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let harness = harness();
    let video = "x".repeat(10 * 1024);
    let body = multipart_body(&[("video", Some(("big.mp4", "video/mp4")), &video)]);

    let response = app_with_limit(&harness, 200, 1024)
        .oneshot(upload_request(body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let error = json_body(response).await["error"].as_str().unwrap().to_string();
    assert!(error.starts_with("File too large"), "{}", error);
    assert!(harness.store().is_empty());
    let uploads = harness.dir.path().join("uploads");
    let leftover = std::fs::read_dir(&uploads).map(|d| d.count()).unwrap_or(0);
    assert_eq!(leftover, 0);
}

#[tokio::test]
async fn test_upload_creates_job() {
    let harness = harness();
    let body = multipart_body(&[
        ("video", Some(("talk.mp4", "video/mp4")), "fake video bytes"),
        ("contentType", None, "presentation"),
        ("summaryStyle", None, "bullet"),
        ("languages", None, "es"),
    ]);

    let response = app(&harness, 200).oneshot(upload_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let job_id = body["jobId"].as_str().unwrap().to_string();
    assert!(job_id.starts_with("job_"));
    assert_eq!(body["statusUrl"], format!("/api/status/{}", job_id));

    let status = app(&harness, 200)
        .oneshot(
            Request::builder()
                .uri(format!("/api/status/{}", job_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(status.status(), StatusCode::OK);
    let job = json_body(status).await;
    assert_eq!(job["id"], job_id.as_str());
    assert_eq!(job["sourceFileName"], "talk.mp4");
}

#[tokio::test]
async fn test_unknown_status_is_not_found() {
    let harness = harness();
    let response = app(&harness, 200)
        .oneshot(
            Request::builder()
                .uri("/api/status/job_doesnotexist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "Job not found");
}

fn export_request(json: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/export-pdf")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_export_without_content_is_rejected() {
    let harness = harness();
    let response = app(&harness, 200)
        .oneshot(export_request(r#"{"transcript": "", "summary": "  ", "translations": {}}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No content provided for PDF export");
}

#[tokio::test]
async fn test_export_returns_pdf_attachment() {
    let harness = harness();
    let response = app(&harness, 2048)
        .oneshot(export_request(
            r#"{"summary": "Point A. Point B.", "translations": {"FR": "Point A."}, "fileName": "team sync"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache, no-store, must-revalidate");
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\""));
    assert!(disposition.ends_with(".pdf\""));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.len(), 2048);
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_export_tiny_output_is_server_error() {
    let harness = harness();
    let response = app(&harness, 20)
        .oneshot(export_request(r#"{"summary": "Point A."}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = json_body(response).await["error"].as_str().unwrap().to_string();
    assert!(error.starts_with("PDF export failed"));
}
