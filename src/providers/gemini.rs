use anyhow::Result;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::http;
use super::prompts;
use super::{Provider, Summarizer, Transcriber, Translator};
use crate::config::GeminiConfig;
use crate::error::ProviderError;
use crate::options::{ContentType, SummaryStyle};

const NAME: &str = "gemini";

const TRANSCRIBE_PROMPT: &str = "Transcribe this audio recording verbatim. \
Return only the spoken words as plain text. If there is no speech, return an empty response.";

/// Gemini provider implementation
pub struct GeminiProvider {
    config: GeminiConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inline_data")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

impl GeminiResponse {
    fn into_text(self) -> Option<String> {
        let parts = self.candidates.into_iter().next()?.content?.parts;
        let text: Vec<String> = parts
            .into_iter()
            .filter_map(|part| match part {
                GeminiPart::Text { text } => Some(text),
                GeminiPart::InlineData { .. } => None,
            })
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text.join(""))
        }
    }
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig, timeout: Duration) -> Result<Self> {
        let client = http::build_client(timeout)?;
        Ok(Self { config, client })
    }

    async fn generate(&self, parts: Vec<GeminiPart>) -> Result<String, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| http::missing_key(NAME))?;

        let request = GeminiRequest {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.config.max_output_tokens,
                temperature: self.config.temperature,
            },
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );

        debug!(model = %self.config.model, "Sending request to Gemini API");

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| http::transport_error(NAME, e))?;

        let body: GeminiResponse = http::read_json(NAME, response).await?;
        body.into_text()
            .ok_or_else(|| http::malformed(NAME, "no candidates returned"))
    }
}

impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        NAME
    }
}

#[async_trait]
impl Transcriber for GeminiProvider {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, ProviderError> {
        let audio = tokio::fs::read(audio_path)
            .await
            .map_err(|e| ProviderError::fatal(NAME, format!("cannot read {}: {}", audio_path.display(), e)))?;

        let parts = vec![
            GeminiPart::Text {
                text: TRANSCRIBE_PROMPT.to_string(),
            },
            GeminiPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: "audio/wav".to_string(),
                    data: base64::engine::general_purpose::STANDARD.encode(audio),
                },
            },
        ];

        let text = self.generate(parts).await?;
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl Summarizer for GeminiProvider {
    async fn summarize(
        &self,
        transcript: &str,
        content_type: ContentType,
        style: SummaryStyle,
    ) -> Result<String, ProviderError> {
        let prompt = format!(
            "{}\n\n{}",
            prompts::summary_system_prompt(content_type, style),
            prompts::summary_user_prompt(transcript, content_type, style)
        );
        let summary = self.generate(vec![GeminiPart::Text { text: prompt }]).await?;
        Ok(prompts::clean_summary_formatting(&summary))
    }
}

#[async_trait]
impl Translator for GeminiProvider {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ProviderError> {
        let prompt = prompts::translation_prompt(text, target_language);
        let translated = self.generate(vec![GeminiPart::Text { text: prompt }]).await?;
        Ok(translated.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_audio_serialization() {
        let part = GeminiPart::InlineData {
            inline_data: GeminiInlineData {
                mime_type: "audio/wav".to_string(),
                data: "AAAA".to_string(),
            },
        };
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(value["inline_data"]["mime_type"], "audio/wav");
        assert_eq!(value["inline_data"]["data"], "AAAA");
    }

    #[test]
    fn test_response_text_extraction() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Bonjour "},{"text":"le monde"}],"role":"model"}}]}"#;
        let response: GeminiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.into_text().as_deref(), Some("Bonjour le monde"));

        let empty: GeminiResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(empty.into_text().is_none());
    }

    #[tokio::test]
    async fn test_missing_key_is_retryable() {
        let gemini = GeminiProvider::new(GeminiConfig::default(), Duration::from_secs(5)).unwrap();
        let err = gemini.translate("Hello", "FR").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
