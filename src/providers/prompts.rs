//! Prompt text and output clean-up shared by the LLM-backed providers.

use regex::Regex;
use std::sync::LazyLock;

use crate::options::{ContentType, SummaryStyle};

/// Human-readable names for the language codes the service knows about.
pub fn language_name(code: &str) -> Option<&'static str> {
    let name = match code.to_uppercase().as_str() {
        "EN" => "English",
        "FR" => "French",
        "ES" => "Spanish",
        "DE" => "German",
        "IT" => "Italian",
        "PT" => "Portuguese",
        "RU" => "Russian",
        "JA" => "Japanese",
        "KO" => "Korean",
        "ZH" => "Chinese",
        "AR" => "Arabic",
        "HI" => "Hindi",
        "TE" => "Telugu",
        _ => return None,
    };
    Some(name)
}

pub fn summary_system_prompt(content_type: ContentType, style: SummaryStyle) -> String {
    format!(
        "You are an expert AI assistant that creates intelligent summaries of video content.\n\
         Content type: {content_type}\n\
         Style: {style}\n\n\
         IMPORTANT INSTRUCTIONS:\n\
         1. Do not use asterisks or other markdown emphasis\n\
         2. Use clear headings and bullet points\n\
         3. Focus on key information and actionable insights\n\
         4. Write plain language that translates well\n\
         5. Do not repeat the transcript; add structure and insight\n\
         6. Use the bullet symbol (•) for every list item"
    )
}

pub fn summary_user_prompt(transcript: &str, content_type: ContentType, style: SummaryStyle) -> String {
    let layout = match style {
        SummaryStyle::Bullet => {
            "Create a structured summary with EXACTLY this format:\n\n\
             Executive Summary:\n[2-3 clear sentences about the main topic]\n\n\
             Key Points:\n• [key point]\n(five key points)\n\n\
             Main Insights:\n• [insight]\n(three insights)\n\n\
             Important Details:\n• [critical information]\n\n\
             Action Items:\n• [actionable tasks or next steps]"
        }
        SummaryStyle::Detailed => {
            "Create a detailed summary with EXACTLY this format:\n\n\
             Executive Summary:\n[3-4 comprehensive sentences about the main topic]\n\n\
             Key Points:\n• [detailed point]\n(eight key points)\n\n\
             Main Insights:\n• [deep insight]\n(four insights)\n\n\
             Important Details:\n• [comprehensive coverage of critical information]\n\n\
             Action Items:\n• [actionable tasks with clear responsibilities]\n\n\
             Tags/Keywords:\n• [relevant topics discussed]"
        }
        SummaryStyle::Concise => {
            "Create a concise summary with EXACTLY this format:\n\n\
             Executive Summary:\n[2-3 focused sentences about the main topic]\n\n\
             Key Points:\n• [essential point]\n(five key points)\n\n\
             Main Insights:\n• [core takeaway]\n(two takeaways)\n\n\
             Action Items:\n• [applicable actions]"
        }
    };

    format!(
        "Transcript:\n{transcript}\n\n{layout}\n\nFocus on: {focus}\n\n\
         Extract only the most important information and keep the bullet format above.",
        focus = content_focus(content_type)
    )
}

fn content_focus(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Meeting => "meeting objectives, decisions made, action items with owners and deadlines, key discussions, and next steps.",
        ContentType::Lecture => "main concepts, key takeaways, important definitions, examples provided, and learning objectives.",
        ContentType::Presentation => "presentation goals, key messages, data and statistics mentioned, conclusions, and recommendations.",
        ContentType::Interview => "key questions asked, important answers, insights shared, background information, and notable quotes.",
        ContentType::News => "main story, key facts, people involved, timeline of events, and implications.",
    }
}

pub fn translation_prompt(text: &str, target_language: &str) -> String {
    let language = language_name(target_language).unwrap_or(target_language);
    format!(
        "Translate the following text to {language}. Keep the original formatting, structure and meaning. \
         Reply with the translated text only, without explanations or notes:\n\n{text}"
    )
}

static BULLET_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*[-•*+]\s+").unwrap());

/// Strip markdown emphasis and normalize list markers to `•`.
pub fn clean_summary_formatting(summary: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for raw in summary.lines() {
        let line = BULLET_PREFIX.replace(raw, "• ");
        let line: String = line.chars().filter(|c| !matches!(c, '*' | '_' | '`' | '~' | '#')).collect();
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");

        if line.is_empty() && lines.last().map_or(true, |prev| prev.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}
