//! Per-job pipeline: extraction, transcription, summarization, translation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::audio::AudioExtraction;
use crate::config::Config;
use crate::error::PipelineError;
use crate::fallback::{FallbackRouter, Stage};
use crate::options::{ContentType, ProcessingOptions};
use crate::providers::{ProviderRegistry, Summarizer, Transcriber, Translator};
use crate::state::{JobStatus, JobStore};

/// Transcripts shorter than this (trimmed, in characters) get a basic summary
/// instead of a provider call.
pub const MIN_SUMMARIZABLE_CHARS: usize = 20;

/// Deterministic summary for empty or very short transcripts.
pub fn basic_summary(transcript: &str, content_type: ContentType) -> String {
    let text = transcript.trim();
    if text.is_empty() {
        format!("Basic Summary\nNo speech was detected in this {}.", content_type)
    } else {
        format!(
            "Basic Summary\nThis {} contains: \"{}\"\n\nNote: Content is very brief and may not require detailed summarization.",
            content_type, text
        )
    }
}

/// Executor settings resolved from [`Config`]
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub fallback_enabled: bool,
    pub provider_timeout: Duration,
    /// Where intermediate WAV files are written
    pub audio_dir: PathBuf,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            fallback_enabled: config.providers.enable_fallback,
            provider_timeout: config.providers.call_timeout(),
            audio_dir: config.storage.audio_dir.clone(),
        }
    }
}

/// Files that must not outlive the job.
///
/// `cleanup` removes them asynchronously on every normal exit path; `Drop`
/// removes whatever is left if the task unwinds first.
#[derive(Debug)]
pub struct TransientFiles {
    paths: Vec<PathBuf>,
}

impl TransientFiles {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }

    pub async fn cleanup(&mut self) {
        for path in self.paths.drain(..) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }
}

impl Drop for TransientFiles {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }
}

/// Drives one job at a time through its stages, recording every transition
/// in the [`JobStore`].
pub struct PipelineExecutor {
    store: Arc<JobStore>,
    extractor: Arc<dyn AudioExtraction>,
    transcription: FallbackRouter<dyn Transcriber>,
    summarization: FallbackRouter<dyn Summarizer>,
    translation: FallbackRouter<dyn Translator>,
    audio_dir: PathBuf,
}

impl PipelineExecutor {
    pub fn new(
        store: Arc<JobStore>,
        extractor: Arc<dyn AudioExtraction>,
        registry: ProviderRegistry,
        settings: PipelineSettings,
    ) -> Self {
        let PipelineSettings {
            fallback_enabled,
            provider_timeout,
            audio_dir,
        } = settings;

        Self {
            store,
            extractor,
            transcription: FallbackRouter::new(Stage::Transcription, registry.transcription, fallback_enabled, provider_timeout),
            summarization: FallbackRouter::new(Stage::Summarization, registry.summarization, fallback_enabled, provider_timeout),
            translation: FallbackRouter::new(Stage::Translation, registry.translation, fallback_enabled, provider_timeout),
            audio_dir,
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Intermediate WAV location for a job
    pub fn audio_path_for(&self, job_id: &str) -> PathBuf {
        self.audio_dir.join(format!("{}.wav", job_id))
    }

    /// Run the whole pipeline for `job_id`. Never returns an error: every
    /// outcome ends up in the job record. Transient files are gone before the
    /// terminal state becomes visible.
    pub async fn run(&self, job_id: &str, upload_path: &Path, options: &ProcessingOptions) {
        let audio_path = self.audio_path_for(job_id);
        let mut transient = TransientFiles::new([upload_path.to_path_buf(), audio_path.clone()]);
        let started = Instant::now();

        info!(
            job_id,
            content_type = %options.content_type,
            summary_style = %options.summary_style,
            target_language = %options.target_language,
            "🚀 Starting pipeline"
        );

        let outcome = self.execute(job_id, upload_path, &audio_path, options).await;
        transient.cleanup().await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(()) => match self.store.update(job_id, |job| job.finish()) {
                Ok(_) => info!(job_id, elapsed_ms, "✅ Job completed"),
                Err(e) => warn!(job_id, "Could not mark job done: {}", e),
            },
            Err(e) => {
                error!(job_id, elapsed_ms, "❌ Job failed: {}", e);
                if let Err(store_err) = self.store.update(job_id, |job| job.fail(e.to_string())) {
                    warn!(job_id, "Could not record failure: {}", store_err);
                }
            }
        }
    }

    async fn execute(
        &self,
        job_id: &str,
        upload_path: &Path,
        audio_path: &Path,
        options: &ProcessingOptions,
    ) -> Result<(), PipelineError> {
        self.store.update(job_id, |job| job.advance(JobStatus::Processing))?;

        let stage_started = Instant::now();
        self.extractor.extract(upload_path, audio_path).await?;
        log_stage(job_id, Stage::Extraction, stage_started);
        self.store.update(job_id, |job| job.advance(JobStatus::AudioExtracted))?;

        let stage_started = Instant::now();
        let transcript = self
            .transcription
            .route(move |provider| async move { provider.transcribe(audio_path).await })
            .await
            .map_err(|source| PipelineError::Provider {
                stage: Stage::Transcription,
                source,
            })?;
        log_stage(job_id, Stage::Transcription, stage_started);
        self.store.update(job_id, |job| {
            job.transcript = Some(transcript.clone());
            job.advance(JobStatus::Transcribed);
        })?;

        let stage_started = Instant::now();
        let summary = if transcript.trim().chars().count() < MIN_SUMMARIZABLE_CHARS {
            info!(job_id, chars = transcript.trim().len(), "⚠️  Very short transcript, using basic summary");
            basic_summary(&transcript, options.content_type)
        } else {
            let text = transcript.as_str();
            let (content_type, style) = (options.content_type, options.summary_style);
            self.summarization
                .route(move |provider| async move { provider.summarize(text, content_type, style).await })
                .await
                .map_err(|source| PipelineError::Provider {
                    stage: Stage::Summarization,
                    source,
                })?
        };
        log_stage(job_id, Stage::Summarization, stage_started);
        self.store.update(job_id, |job| {
            job.summary = Some(summary.clone());
            job.advance(JobStatus::Summarized);
        })?;

        let stage_started = Instant::now();
        let language = options.target_language.as_str();
        let translation = if options.is_identity_translation() {
            summary.clone()
        } else {
            let text = summary.as_str();
            match self
                .translation
                .route(move |provider| async move { provider.translate(text, language).await })
                .await
            {
                Ok(translated) => translated,
                Err(e) => {
                    warn!(job_id, target_language = language, "Translation failed: {}", e);
                    format!("Translation failed: {}", e)
                }
            }
        };
        log_stage(job_id, Stage::Translation, stage_started);
        self.store.update(job_id, |job| {
            job.record_translation(language, translation);
        })?;

        Ok(())
    }
}

fn log_stage(job_id: &str, stage: Stage, started: Instant) {
    info!(
        job_id,
        stage = stage.as_str(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "stage finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_basic_summary_empty() {
        assert_eq!(
            basic_summary("   ", ContentType::Meeting),
            "Basic Summary\nNo speech was detected in this meeting."
        );
    }

    #[test]
    fn test_basic_summary_short() {
        assert_eq!(
            basic_summary(" Hello there ", ContentType::Lecture),
            "Basic Summary\nThis lecture contains: \"Hello there\"\n\nNote: Content is very brief and may not require detailed summarization."
        );
    }

    #[tokio::test]
    async fn test_transient_files_cleanup() {
        let dir = TempDir::new().unwrap();
        let upload = dir.path().join("upload.mp4");
        let audio = dir.path().join("audio.wav");
        std::fs::write(&upload, b"video").unwrap();

        let mut files = TransientFiles::new([upload.clone(), audio.clone()]);
        files.cleanup().await;
        assert!(!upload.exists());
        assert!(!audio.exists());
    }

    #[test]
    fn test_transient_files_drop_guard() {
        let dir = TempDir::new().unwrap();
        let upload = dir.path().join("upload.mp4");
        std::fs::write(&upload, b"video").unwrap();

        drop(TransientFiles::new([upload.clone()]));
        assert!(!upload.exists());
    }
}
