/// Video Summarizer
///
/// Accepts uploaded videos and runs them through an asynchronous pipeline:
/// audio extraction, transcription, summarization and translation, with
/// optional fallback to a secondary provider at each AI stage.

pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod fallback;
pub mod jobs;
pub mod options;
pub mod pdf;
pub mod processing;
pub mod providers;
pub mod state;

// Re-export main types for easy access
pub use crate::audio::{AudioExtraction, FfmpegExtractor};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{ExtractionError, JobNotFound, PdfError, PipelineError, ProviderError, ValidationError};
pub use crate::fallback::{FallbackRouter, Stage};
pub use crate::jobs::{JobService, UploadedFile};
pub use crate::options::{ContentType, ProcessingOptions, SummaryStyle};
pub use crate::pdf::{ExportRequest, PdfExporter, WkHtmlToPdf};
pub use crate::processing::{PipelineExecutor, PipelineSettings};
pub use crate::providers::{ProviderRegistry, ProviderSet, Summarizer, Transcriber, Translator};
pub use crate::state::{Job, JobStatus, JobStore};
