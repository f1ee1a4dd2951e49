//! Shared mocks for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;

use video_summarizer::error::{ExtractionError, ProviderError};
use video_summarizer::jobs::UploadedFile;
use video_summarizer::options::{ContentType, SummaryStyle};
use video_summarizer::providers::Provider;
use video_summarizer::{
    AudioExtraction, JobService, JobStore, PipelineExecutor, PipelineSettings, ProviderRegistry, ProviderSet,
    Summarizer, Transcriber, Translator,
};

/// Writes a placeholder WAV, or fails like a broken FFmpeg run.
pub struct MockExtractor {
    fail: bool,
    gate: Option<Arc<Notify>>,
    pub calls: AtomicUsize,
}

impl MockExtractor {
    pub fn ok() -> Self {
        Self {
            fail: false,
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok()
        }
    }

    /// Blocks until the returned handle is notified.
    pub fn gated() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let extractor = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::ok()
        };
        (extractor, gate)
    }
}

#[async_trait]
impl AudioExtraction for MockExtractor {
    async fn extract(&self, _video_path: &Path, audio_path: &Path) -> Result<(), ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail {
            return Err(ExtractionError::ProcessFailed {
                code: "1".to_string(),
                diagnostics: "Invalid data found when processing input".to_string(),
            });
        }
        if let Some(parent) = audio_path.parent() {
            tokio::fs::create_dir_all(parent).await.unwrap();
        }
        tokio::fs::write(audio_path, b"RIFF0000WAVEfmt ").await.unwrap();
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub enum Outcome {
    Text(String),
    Retryable(String),
    Fatal(String),
    Panic,
}

/// Provider double for every family. Counts calls.
pub struct Scripted {
    name: String,
    outcome: Outcome,
    pub calls: AtomicUsize,
}

impl Scripted {
    pub fn new(name: &str, outcome: Outcome) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            outcome,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn text(name: &str, text: &str) -> Arc<Self> {
        Self::new(name, Outcome::Text(text.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn respond(&self) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Outcome::Text(text) => Ok(text.clone()),
            Outcome::Retryable(message) => Err(ProviderError::retryable(&self.name, message)),
            Outcome::Fatal(message) => Err(ProviderError::fatal(&self.name, message)),
            Outcome::Panic => panic!("{} exploded", self.name),
        }
    }
}

impl Provider for Scripted {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Transcriber for Scripted {
    async fn transcribe(&self, _audio_path: &Path) -> Result<String, ProviderError> {
        self.respond()
    }
}

#[async_trait]
impl Summarizer for Scripted {
    async fn summarize(
        &self,
        _transcript: &str,
        _content_type: ContentType,
        _style: SummaryStyle,
    ) -> Result<String, ProviderError> {
        self.respond()
    }
}

#[async_trait]
impl Translator for Scripted {
    async fn translate(&self, _text: &str, _target_language: &str) -> Result<String, ProviderError> {
        self.respond()
    }
}

pub const TRANSCRIPT: &str = "Today we talk about ownership and borrowing in Rust programs.";
pub const SUMMARY: &str = "Point A. Point B.";

/// Provider wiring for one test; secondaries are optional per stage.
pub struct Providers {
    pub transcriber: Arc<Scripted>,
    pub transcriber_fallback: Option<Arc<Scripted>>,
    pub summarizer: Arc<Scripted>,
    pub summarizer_fallback: Option<Arc<Scripted>>,
    pub translator: Arc<Scripted>,
    pub translator_fallback: Option<Arc<Scripted>>,
}

impl Default for Providers {
    fn default() -> Self {
        Self {
            transcriber: Scripted::text("primary-stt", TRANSCRIPT),
            transcriber_fallback: None,
            summarizer: Scripted::text("primary-llm", SUMMARY),
            summarizer_fallback: None,
            translator: Scripted::text("primary-mt", "Point A. Point B. (fr)"),
            translator_fallback: None,
        }
    }
}

impl Providers {
    pub fn registry(&self) -> ProviderRegistry {
        let mut transcription = ProviderSet::new(self.transcriber.clone() as Arc<dyn Transcriber>);
        if let Some(secondary) = &self.transcriber_fallback {
            transcription = transcription.with_secondary(secondary.clone() as Arc<dyn Transcriber>);
        }
        let mut summarization = ProviderSet::new(self.summarizer.clone() as Arc<dyn Summarizer>);
        if let Some(secondary) = &self.summarizer_fallback {
            summarization = summarization.with_secondary(secondary.clone() as Arc<dyn Summarizer>);
        }
        let mut translation = ProviderSet::new(self.translator.clone() as Arc<dyn Translator>);
        if let Some(secondary) = &self.translator_fallback {
            translation = translation.with_secondary(secondary.clone() as Arc<dyn Translator>);
        }
        ProviderRegistry::new(transcription, summarization, translation)
    }
}

/// A job service over temp directories
pub struct Harness {
    pub dir: TempDir,
    pub service: JobService,
    pub executor: Arc<PipelineExecutor>,
}

impl Harness {
    pub fn new(extractor: Arc<dyn AudioExtraction>, providers: &Providers, fallback_enabled: bool) -> Self {
        let dir = TempDir::new().unwrap();
        let settings = PipelineSettings {
            fallback_enabled,
            provider_timeout: Duration::from_secs(5),
            audio_dir: dir.path().join("audio"),
        };
        let executor = Arc::new(PipelineExecutor::new(
            Arc::new(JobStore::new()),
            extractor,
            providers.registry(),
            settings,
        ));
        let service = JobService::new(Arc::clone(&executor));
        Self { dir, service, executor }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        self.service.store()
    }

    /// Put a fake upload on disk
    pub fn upload(&self, name: &str) -> UploadedFile {
        let path: PathBuf = self.dir.path().join(format!("{}.upload", name));
        std::fs::write(&path, b"not really a video").unwrap();
        UploadedFile {
            original_name: name.to_string(),
            path,
        }
    }
}
