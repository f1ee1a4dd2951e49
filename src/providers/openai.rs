use anyhow::Result;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::http;
use super::prompts;
use super::{Provider, Summarizer, Transcriber, Translator};
use crate::config::OpenAIConfig;
use crate::error::ProviderError;
use crate::options::{ContentType, SummaryStyle};

const NAME: &str = "openai";

/// OpenAI provider: Whisper transcription plus chat completions for
/// summaries and translations
pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: reqwest::Client,
}

/// Chat message for the completions API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig, timeout: Duration) -> Result<Self> {
        let client = http::build_client(timeout)?;
        Ok(Self { config, client })
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| http::missing_key(NAME))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, ProviderError> {
        let api_key = self.api_key()?;

        let request = ChatRequest {
            model: &self.config.chat_model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!(model = %self.config.chat_model, "Sending request to OpenAI chat completions");

        let response = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| http::transport_error(NAME, e))?;

        let chat: ChatResponse = http::read_json(NAME, response).await?;

        chat.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| http::malformed(NAME, "no choices returned"))
    }
}

impl Provider for OpenAIProvider {
    fn name(&self) -> &str {
        NAME
    }
}

#[async_trait]
impl Transcriber for OpenAIProvider {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, ProviderError> {
        let api_key = self.api_key()?;

        let audio = tokio::fs::read(audio_path)
            .await
            .map_err(|e| ProviderError::fatal(NAME, format!("cannot read {}: {}", audio_path.display(), e)))?;

        let part = Part::bytes(audio)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| ProviderError::fatal(NAME, e.to_string()))?;

        let form = Form::new()
            .part("file", part)
            .text("model", self.config.transcription_model.clone())
            .text("response_format", "text");

        debug!(path = %audio_path.display(), "Uploading audio to OpenAI transcription");

        let response = self
            .client
            .post(self.url("audio/transcriptions"))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| http::transport_error(NAME, e))?;

        let text = http::read_text(NAME, response).await?;
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl Summarizer for OpenAIProvider {
    async fn summarize(
        &self,
        transcript: &str,
        content_type: ContentType,
        style: SummaryStyle,
    ) -> Result<String, ProviderError> {
        let messages = vec![
            ChatMessage::system(prompts::summary_system_prompt(content_type, style)),
            ChatMessage::user(prompts::summary_user_prompt(transcript, content_type, style)),
        ];
        let summary = self.chat(messages).await?;
        Ok(prompts::clean_summary_formatting(&summary))
    }
}

#[async_trait]
impl Translator for OpenAIProvider {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ProviderError> {
        let messages = vec![
            ChatMessage::system("You are a professional translator."),
            ChatMessage::user(prompts::translation_prompt(text, target_language)),
        ];
        let translated = self.chat(messages).await?;
        Ok(translated.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(api_key: Option<&str>) -> OpenAIProvider {
        let config = OpenAIConfig {
            api_key: api_key.map(str::to_string),
            ..OpenAIConfig::default()
        };
        OpenAIProvider::new(config, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_missing_key_fails_retryably_without_network() {
        let openai = provider(None);
        let err = openai
            .summarize("a long enough transcript", ContentType::Lecture, SummaryStyle::Concise)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.provider, "openai");
    }

    #[test]
    fn test_url_joining() {
        let mut openai = provider(Some("sk"));
        openai.config.base_url = "http://localhost:8080/v1/".to_string();
        assert_eq!(openai.url("chat/completions"), "http://localhost:8080/v1/chat/completions");
    }
}
