//! API request handlers

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use serde_json::Value;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::models::ApiError;
use crate::error::ValidationError;
use crate::jobs::{JobService, UploadedFile};
use crate::options::ProcessingOptions;
use crate::state::JobStore;

/// Multipart field carrying the video
pub const VIDEO_FIELD: &str = "video";

/// Handle health check requests
pub fn health_check(store: &JobStore) -> Value {
    serde_json::json!({
        "status": "healthy",
        "service": "video-summarizer",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "jobs": store.statistics(),
    })
}

/// Parsed upload form; the video (if any) is already on disk.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub content_type: Option<String>,
    pub summary_style: Option<String>,
    pub languages: Option<String>,
}

/// Accept an upload: persist the video, validate options, hand off to the job service.
pub async fn submit_upload(jobs: &JobService, multipart: Multipart, upload_dir: &Path) -> Result<String, ApiError> {
    let form = receive_upload(multipart, upload_dir).await?;

    let options = match ProcessingOptions::from_form(
        form.content_type.as_deref(),
        form.summary_style.as_deref(),
        form.languages.as_deref(),
    ) {
        Ok(options) => options,
        Err(e) => {
            discard(form.file.as_ref()).await;
            return Err(e.into());
        }
    };

    Ok(jobs.submit(form.file, options)?)
}

/// Read every multipart field, streaming the video field to `upload_dir`.
pub async fn receive_upload(mut multipart: Multipart, upload_dir: &Path) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                discard(form.file.as_ref()).await;
                return Err(multipart_error(e));
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        let outcome = match name.as_str() {
            VIDEO_FIELD if form.file.is_none() => match store_video(field, upload_dir).await {
                Ok(file) => {
                    form.file = Some(file);
                    Ok(())
                }
                Err(e) => Err(e),
            },
            "contentType" => field.text().await.map(|v| form.content_type = Some(v)).map_err(multipart_error),
            "summaryStyle" => field.text().await.map(|v| form.summary_style = Some(v)).map_err(multipart_error),
            "languages" => field.text().await.map(|v| form.languages = Some(v)).map_err(multipart_error),
            other => {
                debug!(field = other, "Ignoring multipart field");
                Ok(())
            }
        };

        if let Err(e) = outcome {
            discard(form.file.as_ref()).await;
            return Err(e);
        }
    }

    Ok(form)
}

async fn store_video(mut field: Field<'_>, upload_dir: &Path) -> Result<UploadedFile, ApiError> {
    if let Some(mime) = field.content_type() {
        if !mime.starts_with("video/") {
            return Err(ValidationError::UnsupportedMediaType(mime.to_string()).into());
        }
    }

    let original_name = field.file_name().unwrap_or("upload").to_string();
    let path = upload_dir.join(stored_file_name(&original_name));

    tokio::fs::create_dir_all(upload_dir).await.map_err(io_error)?;
    let mut file = tokio::fs::File::create(&path).await.map_err(io_error)?;

    let mut written: u64 = 0;
    let copy = async {
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            file.write_all(&chunk).await.map_err(io_error)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(io_error)
    };

    if let Err(e) = copy.await {
        drop(file);
        remove_quietly(&path).await;
        return Err(e);
    }

    info!(file = %original_name, bytes = written, path = %path.display(), "📼 Upload stored");
    Ok(UploadedFile { original_name, path })
}

/// `<uuid>.<ext>`, keeping a short alphanumeric extension from the client name
fn stored_file_name(original_name: &str) -> String {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_lowercase());

    match extension {
        Some(ext) => format!("{}.{}", Uuid::new_v4().simple(), ext),
        None => Uuid::new_v4().simple().to_string(),
    }
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::Validation(ValidationError::Upload(e.body_text()))
    }
}

fn io_error(e: std::io::Error) -> ApiError {
    ApiError::Validation(ValidationError::Upload(e.to_string()))
}

async fn discard(file: Option<&UploadedFile>) {
    if let Some(file) = file {
        remove_quietly(&file.path).await;
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}
