use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::AudioConfig;
use crate::error::ExtractionError;

/// Converts a video file into the WAV the transcription stage consumes
#[async_trait]
pub trait AudioExtraction: Send + Sync {
    async fn extract(&self, video_path: &Path, audio_path: &Path) -> Result<(), ExtractionError>;
}

/// Audio extraction through an external FFmpeg process
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    ffmpeg_path: PathBuf,
    /// 16kHz mono is what every transcription backend expects
    pub target_sample_rate: u32,
    timeout: Duration,
}

impl FfmpegExtractor {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            target_sample_rate: config.target_sample_rate,
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    fn build_command(&self, video_path: &Path, audio_path: &Path) -> Command {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.arg("-y")
            .arg("-i").arg(video_path)
            .arg("-vn") // No video stream
            .arg("-acodec").arg("pcm_s16le") // 16-bit PCM
            .arg("-ar").arg(self.target_sample_rate.to_string())
            .arg("-ac").arg("1") // Mono channel
            .arg(audio_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// A configured path (as opposed to a bare name resolved through PATH) must exist.
    fn configured_binary_missing(&self) -> bool {
        self.ffmpeg_path.components().count() > 1 && !self.ffmpeg_path.exists()
    }
}

#[async_trait]
impl AudioExtraction for FfmpegExtractor {
    async fn extract(&self, video_path: &Path, audio_path: &Path) -> Result<(), ExtractionError> {
        if self.configured_binary_missing() {
            return Err(ExtractionError::ToolMissing(self.ffmpeg_path.clone()));
        }

        if !tokio::fs::try_exists(video_path).await.unwrap_or(false) {
            return Err(ExtractionError::InputMissing(video_path.to_path_buf()));
        }

        if let Some(parent) = audio_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(ExtractionError::Spawn)?;
        }

        info!("🎵 Extracting audio: {} -> {}", video_path.display(), audio_path.display());

        let mut cmd = self.build_command(video_path, audio_path);
        debug!("Executing command: {:?}", cmd);

        let started = Instant::now();
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ExtractionError::ToolMissing(self.ffmpeg_path.clone()));
            }
            Ok(Err(e)) => return Err(ExtractionError::Spawn(e)),
            Err(_) => {
                warn!("⏰ FFmpeg timed out after {}s", self.timeout.as_secs());
                return Err(ExtractionError::Timeout(self.timeout));
            }
        };

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(ExtractionError::ProcessFailed {
                code,
                diagnostics: stderr_tail(&output.stderr),
            });
        }

        let size = tokio::fs::metadata(audio_path).await.map(|m| m.len()).unwrap_or(0);
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = size,
            "✅ Audio extracted: {}",
            audio_path.display()
        );
        Ok(())
    }
}

/// Last lines of FFmpeg's stderr; the banner at the top is noise.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(10);
    lines[start..].join("\n")
}
