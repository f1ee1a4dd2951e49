//! Transcription, summarization and translation backends.
//!
//! The pipeline only sees the three family traits. Concrete backends are
//! chosen once at startup from [`Config`] and collected in a [`ProviderRegistry`].

pub mod extractive;
pub mod gemini;
pub mod http;
pub mod openai;
pub mod prompts;
pub mod translate;
pub mod whisper;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::config::Config;
use crate::error::ProviderError;
use crate::options::{ContentType, SummaryStyle};

/// Common identity of every backend
pub trait Provider: Send + Sync {
    /// Short stable name used in logs and error messages
    fn name(&self) -> &str;
}

/// Speech to text
#[async_trait]
pub trait Transcriber: Provider {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, ProviderError>;
}

/// Transcript to structured summary
#[async_trait]
pub trait Summarizer: Provider {
    async fn summarize(
        &self,
        transcript: &str,
        content_type: ContentType,
        style: SummaryStyle,
    ) -> Result<String, ProviderError>;
}

/// Working-language text to `target_language` (upper-case code)
#[async_trait]
pub trait Translator: Provider {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ProviderError>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {family} service: {value}")]
pub struct UnknownProvider {
    family: &'static str,
    value: String,
}

/// Transcription backends
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionProvider {
    /// whisper.cpp CLI on this host
    Local,
    OpenAI,
    Gemini,
}

impl fmt::Display for TranscriptionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TranscriptionProvider::Local => "local",
            TranscriptionProvider::OpenAI => "openai",
            TranscriptionProvider::Gemini => "gemini",
        })
    }
}

impl FromStr for TranscriptionProvider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "custom" | "whisper" => Ok(TranscriptionProvider::Local),
            "openai" => Ok(TranscriptionProvider::OpenAI),
            "gemini" => Ok(TranscriptionProvider::Gemini),
            _ => Err(UnknownProvider {
                family: "transcription",
                value: s.to_string(),
            }),
        }
    }
}

/// Summarization backends
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SummarizationProvider {
    /// Local sentence scoring, no network
    Extractive,
    OpenAI,
    Gemini,
}

impl fmt::Display for SummarizationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SummarizationProvider::Extractive => "extractive",
            SummarizationProvider::OpenAI => "openai",
            SummarizationProvider::Gemini => "gemini",
        })
    }
}

impl FromStr for SummarizationProvider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "extractive" | "custom" => Ok(SummarizationProvider::Extractive),
            "openai" => Ok(SummarizationProvider::OpenAI),
            "gemini" => Ok(SummarizationProvider::Gemini),
            _ => Err(UnknownProvider {
                family: "summarization",
                value: s.to_string(),
            }),
        }
    }
}

/// Translation backends
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    Gemini,
    Libre,
    MyMemory,
    OpenAI,
}

impl fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TranslationProvider::Gemini => "gemini",
            TranslationProvider::Libre => "libre",
            TranslationProvider::MyMemory => "mymemory",
            TranslationProvider::OpenAI => "openai",
        })
    }
}

impl FromStr for TranslationProvider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(TranslationProvider::Gemini),
            "libre" | "libretranslate" => Ok(TranslationProvider::Libre),
            "mymemory" => Ok(TranslationProvider::MyMemory),
            "openai" => Ok(TranslationProvider::OpenAI),
            _ => Err(UnknownProvider {
                family: "translation",
                value: s.to_string(),
            }),
        }
    }
}

/// Primary backend for a stage plus an optional secondary
pub struct ProviderSet<P: ?Sized> {
    pub primary: Arc<P>,
    pub secondary: Option<Arc<P>>,
}

impl<P: ?Sized> ProviderSet<P> {
    pub fn new(primary: Arc<P>) -> Self {
        Self {
            primary,
            secondary: None,
        }
    }

    pub fn with_secondary(mut self, secondary: Arc<P>) -> Self {
        self.secondary = Some(secondary);
        self
    }
}

impl<P: ?Sized> Clone for ProviderSet<P> {
    fn clone(&self) -> Self {
        Self {
            primary: Arc::clone(&self.primary),
            secondary: self.secondary.clone(),
        }
    }
}

/// Backends for all three provider-driven stages, resolved once at startup
#[derive(Clone)]
pub struct ProviderRegistry {
    pub transcription: ProviderSet<dyn Transcriber>,
    pub summarization: ProviderSet<dyn Summarizer>,
    pub translation: ProviderSet<dyn Translator>,
}

impl ProviderRegistry {
    pub fn new(
        transcription: ProviderSet<dyn Transcriber>,
        summarization: ProviderSet<dyn Summarizer>,
        translation: ProviderSet<dyn Translator>,
    ) -> Self {
        Self {
            transcription,
            summarization,
            translation,
        }
    }

    /// Build every configured backend.
    pub fn from_config(config: &Config) -> Result<Self> {
        let providers = &config.providers;

        let mut transcription = ProviderSet::new(create_transcriber(providers.transcription, config)?);
        if let Some(kind) = providers.transcription_fallback {
            transcription = transcription.with_secondary(create_transcriber(kind, config)?);
        }

        let mut summarization = ProviderSet::new(create_summarizer(providers.summarization, config)?);
        if let Some(kind) = providers.summarization_fallback {
            summarization = summarization.with_secondary(create_summarizer(kind, config)?);
        }

        let mut translation = ProviderSet::new(create_translator(providers.translation, config)?);
        if let Some(kind) = providers.translation_fallback {
            translation = translation.with_secondary(create_translator(kind, config)?);
        }

        Ok(Self::new(transcription, summarization, translation))
    }

    pub fn describe(&self) -> String {
        fn pair<P: Provider + ?Sized>(set: &ProviderSet<P>) -> String {
            match &set.secondary {
                Some(secondary) => format!("{} -> {}", set.primary.name(), secondary.name()),
                None => set.primary.name().to_string(),
            }
        }
        format!(
            "transcription [{}], summarization [{}], translation [{}]",
            pair(&self.transcription),
            pair(&self.summarization),
            pair(&self.translation)
        )
    }
}

/// Create a transcription backend
pub fn create_transcriber(kind: TranscriptionProvider, config: &Config) -> Result<Arc<dyn Transcriber>> {
    let timeout = config.providers.call_timeout();
    Ok(match kind {
        TranscriptionProvider::Local => Arc::new(whisper::WhisperCliTranscriber::new(config.whisper.clone(), timeout)),
        TranscriptionProvider::OpenAI => Arc::new(openai::OpenAIProvider::new(config.openai.clone(), timeout)?),
        TranscriptionProvider::Gemini => Arc::new(gemini::GeminiProvider::new(config.gemini.clone(), timeout)?),
    })
}

/// Create a summarization backend
pub fn create_summarizer(kind: SummarizationProvider, config: &Config) -> Result<Arc<dyn Summarizer>> {
    let timeout = config.providers.call_timeout();
    Ok(match kind {
        SummarizationProvider::Extractive => Arc::new(extractive::ExtractiveSummarizer::default()),
        SummarizationProvider::OpenAI => Arc::new(openai::OpenAIProvider::new(config.openai.clone(), timeout)?),
        SummarizationProvider::Gemini => Arc::new(gemini::GeminiProvider::new(config.gemini.clone(), timeout)?),
    })
}

/// Create a translation backend
pub fn create_translator(kind: TranslationProvider, config: &Config) -> Result<Arc<dyn Translator>> {
    let timeout = config.providers.call_timeout();
    Ok(match kind {
        TranslationProvider::Gemini => Arc::new(gemini::GeminiProvider::new(config.gemini.clone(), timeout)?),
        TranslationProvider::OpenAI => Arc::new(openai::OpenAIProvider::new(config.openai.clone(), timeout)?),
        TranslationProvider::Libre => Arc::new(translate::LibreTranslator::new(config.translation.clone(), timeout)?),
        TranslationProvider::MyMemory => Arc::new(translate::MyMemoryTranslator::new(config.translation.clone(), timeout)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_names_parse() {
        assert_eq!("OpenAI".parse::<TranscriptionProvider>().unwrap(), TranscriptionProvider::OpenAI);
        assert_eq!("custom".parse::<SummarizationProvider>().unwrap(), SummarizationProvider::Extractive);
        assert_eq!("mymemory".parse::<TranslationProvider>().unwrap(), TranslationProvider::MyMemory);
        assert!("google".parse::<TranslationProvider>().is_err());
        // No offline translator exists, so "custom" is not silently rerouted to a network service
        assert!("custom".parse::<TranslationProvider>().is_err());
    }

    #[test]
    fn test_display_matches_serde_names() {
        for kind in [TranslationProvider::Gemini, TranslationProvider::Libre, TranslationProvider::MyMemory, TranslationProvider::OpenAI] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }

    #[test]
    fn test_registry_from_default_config() {
        let registry = ProviderRegistry::from_config(&Config::default()).unwrap();
        assert_eq!(registry.transcription.primary.name(), "local-whisper");
        assert_eq!(registry.summarization.primary.name(), "extractive");
        assert_eq!(
            registry.translation.secondary.as_ref().map(|p| p.name().to_string()),
            Some("gemini".to_string())
        );
    }
}
