use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{Provider, Transcriber};
use crate::config::WhisperConfig;
use crate::error::ProviderError;

/// Local transcription through the whisper.cpp CLI
pub struct WhisperCliTranscriber {
    config: WhisperConfig,
    timeout: Duration,
}

impl WhisperCliTranscriber {
    const NAME: &'static str = "local-whisper";

    pub fn new(config: WhisperConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }

    fn build_command(&self, audio_path: &Path, output_base: &Path) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.arg("-m").arg(&self.config.model_path)
            .arg("-f").arg(audio_path)
            .arg("-l").arg(&self.config.language)
            .arg("-t").arg(self.config.threads.to_string())
            .arg("-otxt")
            .arg("-of").arg(output_base)
            .arg("-np")
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// `audio.wav` -> `audio.transcript`, the CLI appends `.txt`
fn output_base_for(audio_path: &Path) -> PathBuf {
    audio_path.with_extension("transcript")
}

impl Provider for WhisperCliTranscriber {
    fn name(&self) -> &str {
        Self::NAME
    }
}

#[async_trait]
impl Transcriber for WhisperCliTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, ProviderError> {
        if !self.config.model_path.exists() {
            return Err(ProviderError::retryable(
                Self::NAME,
                format!("model not found at {}", self.config.model_path.display()),
            ));
        }

        let output_base = output_base_for(audio_path);
        let mut transcript_path = output_base.clone().into_os_string();
        transcript_path.push(".txt");
        let transcript_path = PathBuf::from(transcript_path);

        let mut cmd = self.build_command(audio_path, &output_base);
        debug!("Executing command: {:?}", cmd);

        let started = Instant::now();
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProviderError::retryable(
                    Self::NAME,
                    format!("{} not found", self.config.binary.display()),
                ));
            }
            Ok(Err(e)) => {
                return Err(ProviderError::retryable(Self::NAME, format!("failed to start: {}", e)));
            }
            Err(_) => {
                return Err(ProviderError::retryable(
                    Self::NAME,
                    format!("timed out after {}s", self.timeout.as_secs()),
                ));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            return Err(ProviderError::retryable(
                Self::NAME,
                format!(
                    "exited with {}: {}",
                    output.status,
                    tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
                ),
            ));
        }

        let text = tokio::fs::read_to_string(&transcript_path)
            .await
            .map_err(|e| ProviderError::retryable(Self::NAME, format!("no transcript produced: {}", e)))?;

        if let Err(e) = tokio::fs::remove_file(&transcript_path).await {
            warn!("Failed to remove {}: {}", transcript_path.display(), e);
        }

        info!(
            provider = Self::NAME,
            elapsed_ms = started.elapsed().as_millis() as u64,
            chars = text.len(),
            "🎙️  whisper.cpp transcription finished"
        );

        Ok(text.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_output_path_derivation() {
        let base = output_base_for(Path::new("/tmp/audio/job_1.wav"));
        assert_eq!(base, PathBuf::from("/tmp/audio/job_1.transcript"));
    }

    #[tokio::test]
    async fn test_missing_model_is_retryable() {
        let dir = TempDir::new().unwrap();
        let config = WhisperConfig {
            model_path: dir.path().join("missing.bin"),
            ..WhisperConfig::default()
        };
        let whisper = WhisperCliTranscriber::new(config, Duration::from_secs(5));
        let err = whisper.transcribe(&dir.path().join("a.wav")).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(err.message.contains("model not found"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_retryable() {
        let dir = TempDir::new().unwrap();
        let model = dir.path().join("model.bin");
        std::fs::write(&model, b"ggml").unwrap();
        let config = WhisperConfig {
            binary: dir.path().join("no-such-whisper"),
            model_path: model,
            ..WhisperConfig::default()
        };
        let whisper = WhisperCliTranscriber::new(config, Duration::from_secs(5));
        let err = whisper.transcribe(&dir.path().join("a.wav")).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(err.message.contains("not found"));
    }
}
