//! API data models

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{JobNotFound, PdfError, ValidationError};

/// Response to an accepted upload
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: String,
    pub status_url: String,
}

impl SubmitResponse {
    pub fn new(job_id: String) -> Self {
        let status_url = format!("/api/status/{}", job_id);
        Self { job_id, status_url }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Every failure an endpoint can report, mapped onto a status code
#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationError),
    PayloadTooLarge(String),
    NotFound(JobNotFound),
    Pdf(PdfError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Pdf(PdfError::EmptyContent) => StatusCode::BAD_REQUEST,
            ApiError::Pdf(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Validation(e) => e.to_string(),
            ApiError::PayloadTooLarge(detail) => format!("File too large: {}", detail),
            ApiError::NotFound(e) => e.to_string(),
            ApiError::Pdf(PdfError::EmptyContent) => PdfError::EmptyContent.to_string(),
            ApiError::Pdf(e) => format!("PDF export failed: {}", e),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Validation(e)
    }
}

impl From<JobNotFound> for ApiError {
    fn from(e: JobNotFound) -> Self {
        ApiError::NotFound(e)
    }
}

impl From<PdfError> for ApiError {
    fn from(e: PdfError) -> Self {
        ApiError::Pdf(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, "{}", self.message());
        } else {
            tracing::warn!(status = %status, "{}", self.message());
        }
        (status, Json(ErrorResponse { error: self.message() })).into_response()
    }
}
