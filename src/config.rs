use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::providers::{SummarizationProvider, TranscriptionProvider, TranslationProvider};

/// Configuration for the video summarizer service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener settings
    pub server: ServerConfig,

    /// Where uploads and intermediate audio live
    pub storage: StorageConfig,

    /// Audio extraction settings
    pub audio: AudioConfig,

    /// Provider selection and fallback routing
    pub providers: ProvidersConfig,

    /// Local whisper.cpp transcription
    pub whisper: WhisperConfig,

    /// OpenAI API settings
    pub openai: OpenAIConfig,

    /// Gemini API settings
    pub gemini: GeminiConfig,

    /// Hosted translation services
    pub translation: TranslationConfig,

    /// Job retention
    pub jobs: JobsConfig,

    /// PDF export
    pub pdf: PdfConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Maximum accepted request body in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Uploaded videos, removed once their job finishes
    pub upload_dir: PathBuf,

    /// Intermediate WAV files
    pub audio_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            audio_dir: PathBuf::from("uploads/audio"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// FFmpeg binary (name on PATH or absolute path)
    pub ffmpeg_path: PathBuf,

    /// Target sample rate for transcription
    pub target_sample_rate: u32,

    /// Upper bound for one extraction run (seconds)
    pub timeout_seconds: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            target_sample_rate: 16000,
            timeout_seconds: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub transcription: TranscriptionProvider,
    pub transcription_fallback: Option<TranscriptionProvider>,

    pub summarization: SummarizationProvider,
    pub summarization_fallback: Option<SummarizationProvider>,

    pub translation: TranslationProvider,
    pub translation_fallback: Option<TranslationProvider>,

    /// Route retryable failures to the secondary provider
    pub enable_fallback: bool,

    /// Upper bound for a single provider call (seconds)
    pub timeout_seconds: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            transcription: TranscriptionProvider::Local,
            transcription_fallback: Some(TranscriptionProvider::OpenAI),
            summarization: SummarizationProvider::Extractive,
            summarization_fallback: Some(SummarizationProvider::OpenAI),
            translation: TranslationProvider::MyMemory,
            translation_fallback: Some(TranslationProvider::Gemini),
            enable_fallback: false,
            timeout_seconds: 300,
        }
    }
}

impl ProvidersConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhisperConfig {
    /// whisper.cpp CLI binary
    pub binary: PathBuf,

    /// GGML model file
    pub model_path: PathBuf,

    /// Language hint, `auto` to detect
    pub language: String,

    pub threads: u32,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("whisper-cli"),
            model_path: PathBuf::from("models/ggml-base.en.bin"),
            language: "en".to_string(),
            threads: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAIConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub transcription_model: String,
    pub chat_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            transcription_model: "whisper-1".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            max_tokens: 1200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.3,
            max_output_tokens: 2048,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub libre_endpoint: String,
    pub libre_api_key: Option<String>,
    pub mymemory_endpoint: String,

    /// Raises the MyMemory daily quota when set
    pub mymemory_email: Option<String>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            libre_endpoint: "https://libretranslate.de/translate".to_string(),
            libre_api_key: None,
            mymemory_endpoint: "https://api.mymemory.translated.net/get".to_string(),
            mymemory_email: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// How long finished jobs stay queryable (seconds, 0 keeps them forever)
    pub retention_seconds: u64,

    /// How often the reaper sweeps (seconds)
    pub reap_interval_seconds: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            retention_seconds: 24 * 60 * 60,
            reap_interval_seconds: 10 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// HTML to PDF renderer binary
    pub renderer_path: PathBuf,
    pub timeout_seconds: u64,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            renderer_path: PathBuf::from("wkhtmltopdf"),
            timeout_seconds: 60,
        }
    }
}

impl Config {
    const SEARCH_PATHS: [&'static str; 3] = [
        "video-summarizer.toml",
        "config/video-summarizer.toml",
        "/etc/video-summarizer/config.toml",
    ];

    /// Load from the first readable config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::SEARCH_PATHS
            .iter()
            .find_map(|path| match Self::read_file(Path::new(path)) {
                Ok(config) => {
                    tracing::info!("📄 Loaded configuration from: {}", path);
                    Some(config)
                }
                Err(e) => {
                    if Path::new(path).exists() {
                        tracing::warn!("Failed to parse config file {}: {:#}", path, e);
                    }
                    None
                }
            })
            .unwrap_or_default();

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load from an explicit file, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&config_str).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable source.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(port) = var("VIDEO_SUMMARIZER_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("VIDEO_SUMMARIZER_PORT is not a port: {}", port))?;
        }

        if let Some(dir) = var("VIDEO_SUMMARIZER_UPLOAD_DIR") {
            self.storage.audio_dir = PathBuf::from(&dir).join("audio");
            self.storage.upload_dir = PathBuf::from(dir);
        }

        if let Some(service) = var("TRANSCRIPTION_SERVICE") {
            self.providers.transcription = service.parse()?;
        }

        if let Some(service) = var("SUMMARIZATION_SERVICE") {
            self.providers.summarization = service.parse()?;
        }

        if let Some(service) = var("TRANSLATION_SERVICE") {
            self.providers.translation = service.parse()?;
        }

        if let Some(flag) = var("ENABLE_FALLBACK_SERVICES") {
            self.providers.enable_fallback = flag.eq_ignore_ascii_case("true") || flag == "1";
        }

        if let Some(key) = var("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }

        if let Some(key) = var("GEMINI_API_KEY") {
            self.gemini.api_key = Some(key);
        }

        if let Some(path) = var("FFMPEG_PATH") {
            self.audio.ffmpeg_path = PathBuf::from(path);
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("server.port must be greater than 0"));
        }

        if self.server.max_upload_bytes == 0 {
            return Err(anyhow!("server.max_upload_bytes must be greater than 0"));
        }

        if self.audio.target_sample_rate == 0 {
            return Err(anyhow!("audio.target_sample_rate must be greater than 0"));
        }

        if self.audio.timeout_seconds == 0 || self.providers.timeout_seconds == 0 || self.pdf.timeout_seconds == 0 {
            return Err(anyhow!("timeouts must be greater than 0"));
        }

        if self.jobs.retention_seconds > 0 && self.jobs.reap_interval_seconds == 0 {
            return Err(anyhow!("jobs.reap_interval_seconds must be greater than 0"));
        }

        if self.providers.enable_fallback
            && self.providers.transcription_fallback.is_none()
            && self.providers.summarization_fallback.is_none()
            && self.providers.translation_fallback.is_none()
        {
            tracing::warn!("⚠️  Fallback enabled but no secondary provider is configured");
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Video Summarizer Configuration:\n\
            - Listen: {}:{}\n\
            - Upload Directory: {}\n\
            - Transcription: {} (fallback: {})\n\
            - Summarization: {} (fallback: {})\n\
            - Translation: {} (fallback: {})\n\
            - Fallback Enabled: {}\n\
            - Job Retention: {}s",
            self.server.host,
            self.server.port,
            self.storage.upload_dir.display(),
            self.providers.transcription,
            display_optional(self.providers.transcription_fallback),
            self.providers.summarization,
            display_optional(self.providers.summarization_fallback),
            self.providers.translation,
            display_optional(self.providers.translation_fallback),
            self.providers.enable_fallback,
            self.jobs.retention_seconds,
        )
    }
}

fn display_optional<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string())
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_upload_dir(mut self, dir: PathBuf) -> Self {
        self.config.storage.audio_dir = dir.join("audio");
        self.config.storage.upload_dir = dir;
        self
    }

    pub fn with_transcription(mut self, primary: TranscriptionProvider, secondary: Option<TranscriptionProvider>) -> Self {
        self.config.providers.transcription = primary;
        self.config.providers.transcription_fallback = secondary;
        self
    }

    pub fn with_summarization(mut self, primary: SummarizationProvider, secondary: Option<SummarizationProvider>) -> Self {
        self.config.providers.summarization = primary;
        self.config.providers.summarization_fallback = secondary;
        self
    }

    pub fn with_translation(mut self, primary: TranslationProvider, secondary: Option<TranslationProvider>) -> Self {
        self.config.providers.translation = primary;
        self.config.providers.translation_fallback = secondary;
        self
    }

    pub fn enable_fallback(mut self, enable: bool) -> Self {
        self.config.providers.enable_fallback = enable;
        self
    }

    pub fn with_openai_key(mut self, api_key: String) -> Self {
        self.config.openai.api_key = Some(api_key);
        self
    }

    pub fn with_gemini_key(mut self, api_key: String) -> Self {
        self.config.gemini.api_key = Some(api_key);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
