//! Error taxonomy for the video pipeline.
//!
//! Stage errors are converted into job state by the executor and never reach
//! the HTTP layer; only `ValidationError`, `JobNotFound` and `PdfError` are
//! mapped to responses.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::fallback::Stage;

/// Bad or missing submission input. Nothing is written to the job store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No file uploaded")]
    MissingFile,

    #[error("Only video files are allowed (got {0})")]
    UnsupportedMediaType(String),

    #[error("Invalid {field}: {value}")]
    InvalidOption { field: &'static str, value: String },

    #[error("Upload failed: {0}")]
    Upload(String),
}

/// Failure of the external audio extraction tool. Always fatal for the job.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("FFmpeg not found at {}", .0.display())]
    ToolMissing(PathBuf),

    #[error("Input video not found: {}", .0.display())]
    InputMissing(PathBuf),

    #[error("Failed to start FFmpeg: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("FFmpeg exited with code {code}. Output: {diagnostics}")]
    ProcessFailed { code: String, diagnostics: String },

    #[error("FFmpeg timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Failure reported by a transcription, summarization or translation backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{provider}: {message}")]
pub struct ProviderError {
    pub provider: String,
    pub message: String,
    pub retryable: bool,
}

impl ProviderError {
    /// Transient or provider-specific failure; another backend may succeed.
    pub fn retryable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            message: message.into(),
            retryable: true,
        }
    }

    /// The request itself cannot be serviced.
    pub fn fatal(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            message: message.into(),
            retryable: false,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Job not found")]
pub struct JobNotFound(pub String);

/// Rejected job store mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("job {0} already exists")]
    Duplicate(String),

    #[error("job {0} does not exist")]
    Unknown(String),

    #[error("job {0} has already finished")]
    Terminal(String),
}

/// Reason a pipeline run ended in the `error` state.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Audio extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("{stage} failed: {source}")]
    Provider {
        stage: Stage,
        #[source]
        source: ProviderError,
    },

    #[error("Job record unavailable: {0}")]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("No content provided for PDF export")]
    EmptyContent,

    #[error("PDF renderer not found at {}", .0.display())]
    RendererMissing(PathBuf),

    #[error("PDF renderer failed: {0}")]
    Render(String),

    #[error("PDF renderer timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Generated PDF is too small ({0} bytes)")]
    OutputTooSmall(usize),

    #[error("PDF renderer I/O error: {0}")]
    Io(#[from] std::io::Error),
}
