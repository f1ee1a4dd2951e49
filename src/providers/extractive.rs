//! Offline summarizer that picks the highest-scoring transcript sentences.
//!
//! Sentences are scored by the normalized frequency of their content words,
//! with a boost for vocabulary typical of the recording's content type. The
//! output follows the same section layout as the LLM-backed summaries.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use super::{Provider, Summarizer};
use crate::error::ProviderError;
use crate::options::{ContentType, SummaryStyle};

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was", "one",
    "our", "out", "has", "him", "his", "how", "its", "let", "may", "she", "who", "did", "get", "got",
    "just", "like", "that", "this", "with", "have", "from", "they", "will", "would", "there", "their",
    "what", "about", "which", "when", "were", "been", "into", "than", "then", "them", "these", "some",
    "also", "very", "more", "much", "so", "we", "it", "is", "to", "of", "in", "on", "at", "as", "be",
    "or", "an", "a", "i", "um", "uh", "yeah", "okay", "going", "know", "really", "thing", "things",
];

/// Extractive summarizer
#[derive(Debug, Clone)]
pub struct ExtractiveSummarizer {
    /// Sentences shorter than this (in characters) are never selected
    pub min_sentence_chars: usize,
}

impl Default for ExtractiveSummarizer {
    fn default() -> Self {
        Self { min_sentence_chars: 12 }
    }
}

struct ScoredSentence<'a> {
    index: usize,
    text: &'a str,
    score: f64,
}

fn domain_keywords(content_type: ContentType) -> &'static [&'static str] {
    match content_type {
        ContentType::Lecture => &["concept", "theory", "principle", "method", "approach", "technique", "framework", "model", "definition", "example"],
        ContentType::Meeting => &["decision", "action", "agenda", "discussion", "proposal", "plan", "timeline", "deadline", "owner", "next"],
        ContentType::Presentation => &["slide", "point", "highlight", "key", "main", "important", "significant", "critical", "result", "recommend"],
        ContentType::Interview => &["question", "answer", "experience", "background", "opinion", "view", "perspective", "career", "learned"],
        ContentType::News => &["event", "announcement", "development", "report", "statement", "response", "impact", "official", "today"],
    }
}

fn split_sentences(text: &str) -> Vec<&str> {
    text.split_inclusive(|c| matches!(c, '.' | '!' | '?'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

impl ExtractiveSummarizer {
    const NAME: &'static str = "extractive";

    fn word_frequencies(&self, text: &str) -> HashMap<String, f64> {
        let stop: HashSet<&str> = STOP_WORDS.iter().copied().collect();
        let mut freq: HashMap<String, f64> = HashMap::new();
        for word in words(text) {
            if word.chars().count() > 2 && !stop.contains(word.as_str()) {
                *freq.entry(word).or_insert(0.0) += 1.0;
            }
        }
        let max = freq.values().copied().fold(0.0, f64::max);
        if max > 0.0 {
            for value in freq.values_mut() {
                *value /= max;
            }
        }
        freq
    }

    fn score<'a>(&self, sentences: &[&'a str], freq: &HashMap<String, f64>, content_type: ContentType) -> Vec<ScoredSentence<'a>> {
        let keywords: HashSet<&str> = domain_keywords(content_type).iter().copied().collect();
        sentences
            .iter()
            .enumerate()
            .filter(|(_, s)| s.chars().count() >= self.min_sentence_chars)
            .map(|(index, text)| {
                let tokens: Vec<String> = words(text).collect();
                let mut score: f64 = tokens.iter().filter_map(|w| freq.get(w)).sum();
                let boosts = tokens.iter().filter(|w| keywords.contains(w.as_str())).count();
                score += 0.5 * boosts as f64;
                // Favor dense sentences over long rambling ones
                let score = score / (tokens.len() as f64).sqrt().max(1.0);
                ScoredSentence { index, text, score }
            })
            .collect()
    }

    fn top_keywords(freq: &HashMap<String, f64>, count: usize) -> Vec<String> {
        let mut ranked: Vec<(&String, &f64)> = freq.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));
        ranked.into_iter().take(count).map(|(w, _)| w.clone()).collect()
    }

    /// Produce the summary text synchronously.
    pub fn summarize_text(&self, transcript: &str, content_type: ContentType, style: SummaryStyle) -> String {
        let sentences = split_sentences(transcript);
        let freq = self.word_frequencies(transcript);
        let mut scored = self.score(&sentences, &freq, content_type);
        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.index.cmp(&b.index)));

        let (executive_count, key_point_count) = match style {
            SummaryStyle::Concise => (2, 5),
            SummaryStyle::Bullet => (3, 5),
            SummaryStyle::Detailed => (4, 8),
        };

        let mut executive: Vec<&ScoredSentence> = scored.iter().take(executive_count).collect();
        executive.sort_by_key(|s| s.index);
        let executive_text = if executive.is_empty() {
            transcript.trim().to_string()
        } else {
            executive.iter().map(|s| s.text).collect::<Vec<_>>().join(" ")
        };

        let mut key_points: Vec<&ScoredSentence> = scored.iter().take(key_point_count).collect();
        key_points.sort_by_key(|s| s.index);

        let keywords = Self::top_keywords(&freq, 5);

        let mut out = format!("Executive Summary:\n{}\n\nKey Points:\n", executive_text);
        for point in &key_points {
            out.push_str(&format!("• {}\n", point.text));
        }

        out.push_str("\nMain Insights:\n");
        if keywords.is_empty() {
            out.push_str(&format!("• This {} contains little recognizable content\n", content_type));
        } else {
            out.push_str(&format!("• Most discussed topics: {}\n", keywords.join(", ")));
        }
        out.push_str(&format!(
            "• The {} spans {} sentences\n",
            content_type,
            sentences.len()
        ));

        if matches!(style, SummaryStyle::Bullet | SummaryStyle::Detailed) {
            if let Some(detail) = scored.get(key_point_count) {
                out.push_str(&format!("\nImportant Details:\n• {}\n", detail.text));
            }
        }

        if style == SummaryStyle::Detailed && !keywords.is_empty() {
            out.push_str("\nTags/Keywords:\n");
            for keyword in &keywords {
                out.push_str(&format!("• {}\n", keyword));
            }
        }

        out.trim_end().to_string()
    }
}

impl Provider for ExtractiveSummarizer {
    fn name(&self) -> &str {
        Self::NAME
    }
}

#[async_trait]
impl Summarizer for ExtractiveSummarizer {
    async fn summarize(
        &self,
        transcript: &str,
        content_type: ContentType,
        style: SummaryStyle,
    ) -> Result<String, ProviderError> {
        if transcript.trim().is_empty() {
            return Err(ProviderError::fatal(Self::NAME, "transcript is empty"));
        }
        Ok(self.summarize_text(transcript, content_type, style))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSCRIPT: &str = "Welcome to the lecture on ownership in Rust. \
        Ownership is the core concept behind memory safety in Rust. \
        Every value in Rust has a single owner at any time. \
        When the owner goes out of scope the value is dropped. \
        Borrowing lets code use a value without taking ownership. \
        The borrow checker enforces these ownership rules at compile time. \
        Thanks for listening.";

    #[test]
    fn test_concise_layout() {
        let summary = ExtractiveSummarizer::default().summarize_text(TRANSCRIPT, ContentType::Lecture, SummaryStyle::Concise);
        assert!(summary.starts_with("Executive Summary:\n"));
        assert!(summary.contains("\n\nKey Points:\n• "));
        assert!(summary.contains("Main Insights:"));
        assert!(summary.contains("ownership"));
        assert!(!summary.contains("Tags/Keywords:"));
        assert_eq!(summary.matches("\n• ").count(), 5 + 2);
    }

    #[test]
    fn test_detailed_adds_tags() {
        let summary = ExtractiveSummarizer::default().summarize_text(TRANSCRIPT, ContentType::Lecture, SummaryStyle::Detailed);
        assert!(summary.contains("Tags/Keywords:\n• ownership"));
    }

    #[test]
    fn test_deterministic() {
        let summarizer = ExtractiveSummarizer::default();
        let a = summarizer.summarize_text(TRANSCRIPT, ContentType::Meeting, SummaryStyle::Bullet);
        let b = summarizer.summarize_text(TRANSCRIPT, ContentType::Meeting, SummaryStyle::Bullet);
        assert_eq!(a, b);
        assert!(a.contains("Important Details:"));
    }

    #[tokio::test]
    async fn test_empty_transcript_rejected() {
        let err = ExtractiveSummarizer::default()
            .summarize("   ", ContentType::Lecture, SummaryStyle::Concise)
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }
}
