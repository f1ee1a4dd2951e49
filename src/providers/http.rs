//! Shared plumbing for hosted providers: client construction and mapping of
//! HTTP outcomes onto retryable / non-retryable [`ProviderError`]s.

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::ProviderError;

const BODY_PREVIEW_CHARS: usize = 300;

pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("video-summarizer/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Statuses that mean the request itself is unserviceable.
pub fn is_fatal_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 400 | 404 | 413 | 422)
}

pub fn status_error(provider: &str, status: StatusCode, body: &str) -> ProviderError {
    let message = format!("API error {}: {}", status, preview(body));
    if is_fatal_status(status) {
        ProviderError::fatal(provider, message)
    } else {
        ProviderError::retryable(provider, message)
    }
}

pub fn transport_error(provider: &str, err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::retryable(provider, "request timed out")
    } else {
        ProviderError::retryable(provider, format!("request failed: {}", err))
    }
}

pub fn malformed(provider: &str, detail: impl std::fmt::Display) -> ProviderError {
    ProviderError::retryable(provider, format!("malformed response: {}", detail))
}

pub fn missing_key(provider: &str) -> ProviderError {
    ProviderError::retryable(provider, "API key not configured")
}

/// Read the body of a response, failing on non-success statuses.
pub async fn read_text(provider: &str, response: Response) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(provider, e))?;

    if !status.is_success() {
        return Err(status_error(provider, status, &body));
    }
    Ok(body)
}

/// Read and decode a JSON body, failing on non-success statuses.
pub async fn read_json<T: DeserializeOwned>(provider: &str, response: Response) -> Result<T, ProviderError> {
    let body = read_text(provider, response).await?;
    serde_json::from_str(&body).map_err(|e| malformed(provider, e))
}

fn preview(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_PREVIEW_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(BODY_PREVIEW_CHARS).collect();
        format!("{}...", cut)
    }
}
