//! HTTP server implementation for the API

use anyhow::{Context, Result};
use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

use super::handlers;
use super::models::{ApiError, SubmitResponse};
use crate::config::Config;
use crate::error::ValidationError;
use crate::jobs::JobService;
use crate::pdf::{ExportRequest, PdfExporter};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub jobs: JobService,
    pub pdf: PdfExporter,
    pub config: Arc<Config>,
}

/// Build the application router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.server.max_upload_bytes;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_DISPOSITION]);

    Router::new()
        // Health check endpoints (both paths for compatibility)
        .route("/health", get(health_handler))
        .route("/api/health", get(health_handler))
        .route("/api/upload", post(upload_handler))
        .route("/api/status/:job_id", get(status_handler))
        .route("/api/export-pdf", post(export_pdf_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
}

/// Configure and start the HTTP server
pub async fn start_http_server(state: AppState) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.server.host, state.config.server.port)
        .parse()
        .context("invalid listen address")?;

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("🌐 API server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Health check handler
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(handlers::health_check(state.jobs.store())))
}

/// Upload handler
#[tracing::instrument(skip_all)]
async fn upload_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let multipart = multipart.map_err(|_| ApiError::Validation(ValidationError::MissingFile))?;
    let job_id = handlers::submit_upload(&state.jobs, multipart, &state.config.storage.upload_dir).await?;
    Ok(Json(SubmitResponse::new(job_id)))
}

/// Job status handler
async fn status_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Response, ApiError> {
    let job = state.jobs.status(&job_id)?;
    Ok((StatusCode::OK, Json(job)).into_response())
}

/// PDF export handler
async fn export_pdf_handler(
    State(state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> Result<Response, ApiError> {
    let document = state.pdf.export(&request).await?;

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", document.file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store, must-revalidate")),
            (header::PRAGMA, HeaderValue::from_static("no-cache")),
            (header::EXPIRES, HeaderValue::from_static("0")),
        ],
        document.bytes,
    )
        .into_response())
}
