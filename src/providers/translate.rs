//! Dedicated machine-translation services.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::http;
use super::{Provider, Translator};
use crate::config::TranslationConfig;
use crate::error::ProviderError;
use crate::options::WORKING_LANGUAGE;

/// LibreTranslate over its JSON API
pub struct LibreTranslator {
    config: TranslationConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct LibreRequest<'a> {
    q: &'a str,
    source: String,
    target: String,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct LibreResponse {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
    error: Option<String>,
}

impl LibreTranslator {
    const NAME: &'static str = "libre";

    pub fn new(config: TranslationConfig, timeout: Duration) -> Result<Self> {
        let client = http::build_client(timeout)?;
        Ok(Self { config, client })
    }
}

impl Provider for LibreTranslator {
    fn name(&self) -> &str {
        Self::NAME
    }
}

#[async_trait]
impl Translator for LibreTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ProviderError> {
        let request = LibreRequest {
            q: text,
            source: WORKING_LANGUAGE.to_lowercase(),
            target: target_language.to_lowercase(),
            format: "text",
            api_key: self.config.libre_api_key.as_deref(),
        };

        debug!(target_language, "Sending request to LibreTranslate");

        let response = self
            .client
            .post(&self.config.libre_endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| http::transport_error(Self::NAME, e))?;

        let body: LibreResponse = http::read_json(Self::NAME, response).await?;
        match (body.translated_text, body.error) {
            (Some(text), _) => Ok(text),
            (None, Some(error)) => Err(ProviderError::fatal(Self::NAME, error)),
            (None, None) => Err(http::malformed(Self::NAME, "missing translatedText")),
        }
    }
}

/// MyMemory public translation memory
pub struct MyMemoryTranslator {
    config: TranslationConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct MyMemoryResponse {
    #[serde(rename = "responseData")]
    response_data: Option<MyMemoryData>,
    #[serde(rename = "responseStatus")]
    response_status: Option<serde_json::Value>,
    #[serde(rename = "responseDetails")]
    response_details: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct MyMemoryData {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
}

impl MyMemoryResponse {
    fn status_code(&self) -> u16 {
        match &self.response_status {
            Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u16::try_from(n).ok()).unwrap_or(200),
            Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(200),
            _ => 200,
        }
    }

    fn details(&self) -> String {
        match &self.response_details {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }
}

impl MyMemoryTranslator {
    const NAME: &'static str = "mymemory";

    /// The public API rejects queries longer than this.
    const MAX_QUERY_BYTES: usize = 480;

    pub fn new(config: TranslationConfig, timeout: Duration) -> Result<Self> {
        let client = http::build_client(timeout)?;
        Ok(Self { config, client })
    }

    async fn translate_chunk(&self, chunk: &str, langpair: &str) -> Result<String, ProviderError> {
        let mut query = vec![("q", chunk), ("langpair", langpair)];
        if let Some(email) = self.config.mymemory_email.as_deref() {
            query.push(("de", email));
        }

        let response = self
            .client
            .get(&self.config.mymemory_endpoint)
            .query(&query)
            .send()
            .await
            .map_err(|e| http::transport_error(Self::NAME, e))?;

        let body: MyMemoryResponse = http::read_json(Self::NAME, response).await?;
        let status = body.status_code();
        if status == 403 {
            return Err(ProviderError::fatal(Self::NAME, body.details()));
        }
        if status != 200 {
            return Err(ProviderError::retryable(
                Self::NAME,
                format!("status {}: {}", status, body.details()),
            ));
        }

        body.response_data
            .and_then(|data| data.translated_text)
            .ok_or_else(|| http::malformed(Self::NAME, "missing translatedText"))
    }
}

impl Provider for MyMemoryTranslator {
    fn name(&self) -> &str {
        Self::NAME
    }
}

#[async_trait]
impl Translator for MyMemoryTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ProviderError> {
        let langpair = format!(
            "{}|{}",
            WORKING_LANGUAGE.to_lowercase(),
            target_language.to_lowercase()
        );

        let chunks = split_into_chunks(text, Self::MAX_QUERY_BYTES);
        debug!(target_language, chunks = chunks.len(), "Sending request to MyMemory");

        let mut translated = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            if chunk.trim().is_empty() {
                translated.push(chunk.clone());
            } else {
                translated.push(self.translate_chunk(chunk, &langpair).await?);
            }
        }
        Ok(translated.join("\n"))
    }
}

/// Split on line boundaries into pieces of at most `max_bytes`, breaking
/// overlong lines on whitespace.
fn split_into_chunks(text: &str, max_bytes: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        let pieces = if line.len() > max_bytes {
            split_line(line, max_bytes)
        } else {
            vec![line.to_string()]
        };

        for piece in pieces {
            if !current.is_empty() && current.len() + 1 + piece.len() > max_bytes {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(&piece);
        }
    }

    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn split_line(line: &str, max_bytes: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for token in line.split_whitespace() {
        for word in split_token(token, max_bytes) {
            if !current.is_empty() && current.len() + 1 + word.len() > max_bytes {
                pieces.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Hard-split a token with no whitespace on char boundaries.
fn split_token(token: &str, max_bytes: usize) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = token;
    while rest.len() > max_bytes {
        let mut end = max_bytes;
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            // A single char wider than the limit
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        let (head, tail) = rest.split_at(end);
        parts.push(head);
        rest = tail;
    }
    if !rest.is_empty() {
        parts.push(rest);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_respect_limit() {
        let text = format!("{}\n{}\nshort", "word ".repeat(200), "line two");
        let chunks = split_into_chunks(&text, 100);
        assert!(chunks.len() > 5);
        assert!(chunks.iter().all(|c| c.len() <= 100));
        assert!(chunks.last().unwrap().ends_with("short"));
    }

    #[test]
    fn test_unbroken_token_is_hard_split() {
        let url = format!("https://example.com/{}", "a".repeat(1200));
        let chunks = split_into_chunks(&url, 480);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() <= 480));
        assert_eq!(chunks.concat(), url);

        // Multi-byte chars are never cut in half
        let text = "é".repeat(300);
        let chunks = split_into_chunks(&text, 101);
        assert!(chunks.iter().all(|c| c.len() <= 101));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        assert_eq!(split_into_chunks("Point A.\nPoint B.", 480), vec!["Point A.\nPoint B."]);
    }

    #[test]
    fn test_mymemory_status_parsing() {
        let body: MyMemoryResponse = serde_json::from_str(
            r#"{"responseData":{"translatedText":"X"},"responseStatus":"403","responseDetails":"'XX' IS AN INVALID TARGET LANGUAGE"}"#,
        )
        .unwrap();
        assert_eq!(body.status_code(), 403);
        assert!(body.details().contains("INVALID TARGET LANGUAGE"));

        let body: MyMemoryResponse =
            serde_json::from_str(r#"{"responseData":{"translatedText":"Bonjour"},"responseStatus":200}"#).unwrap();
        assert_eq!(body.status_code(), 200);
    }
}
