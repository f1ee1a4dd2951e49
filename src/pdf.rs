//! PDF export of a finished summary.
//!
//! The report is assembled as HTML and handed to an external renderer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::PdfConfig;
use crate::error::PdfError;
use crate::providers::prompts::language_name;

/// Renderer output below this size is treated as a failed render.
pub const MIN_PDF_BYTES: usize = 100;

/// Body of an export request. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportRequest {
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub translations: BTreeMap<String, String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub summary_style: Option<String>,
}

impl ExportRequest {
    fn has_content(&self) -> bool {
        let filled = |s: &Option<String>| s.as_deref().is_some_and(|v| !v.trim().is_empty());
        filled(&self.transcript)
            || filled(&self.summary)
            || self.translations.values().any(|v| !v.trim().is_empty())
    }
}

/// A rendered report ready to be sent as an attachment
#[derive(Debug, Clone)]
pub struct PdfDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// HTML to PDF conversion
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, html: &str) -> Result<Vec<u8>, PdfError>;
}

/// wkhtmltopdf reading HTML on stdin and writing the PDF to stdout
pub struct WkHtmlToPdf {
    binary: PathBuf,
    timeout: Duration,
}

impl WkHtmlToPdf {
    pub fn new(config: &PdfConfig) -> Self {
        Self {
            binary: config.renderer_path.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    async fn run(&self, html: &str) -> Result<Vec<u8>, PdfError> {
        let mut child = Command::new(&self.binary)
            .args(["--quiet", "--encoding", "utf-8", "--page-size", "A4"])
            .args(["-T", "15mm", "-B", "15mm", "-L", "15mm", "-R", "15mm"])
            .args(["-", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => PdfError::RendererMissing(self.binary.clone()),
                _ => PdfError::Io(e),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let html = html.to_owned();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(html.as_bytes()).await {
                    warn!("Failed to write HTML to renderer: {}", e);
                }
            });
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PdfError::Render(format!("{}: {}", output.status, stderr.trim())));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl DocumentRenderer for WkHtmlToPdf {
    async fn render(&self, html: &str) -> Result<Vec<u8>, PdfError> {
        debug!(bytes = html.len(), "Rendering HTML with {}", self.binary.display());
        tokio::time::timeout(self.timeout, self.run(html))
            .await
            .map_err(|_| PdfError::Timeout(self.timeout))?
    }
}

/// Builds report HTML and drives the renderer
#[derive(Clone)]
pub struct PdfExporter {
    renderer: Arc<dyn DocumentRenderer>,
}

impl PdfExporter {
    pub fn new(renderer: Arc<dyn DocumentRenderer>) -> Self {
        Self { renderer }
    }

    pub async fn export(&self, request: &ExportRequest) -> Result<PdfDocument, PdfError> {
        if !request.has_content() {
            return Err(PdfError::EmptyContent);
        }

        let now = Utc::now();
        let html = render_html(request, now);
        let bytes = self.renderer.render(&html).await?;
        if bytes.len() < MIN_PDF_BYTES {
            return Err(PdfError::OutputTooSmall(bytes.len()));
        }

        let file_name = format!(
            "{}-{}.pdf",
            sanitize_file_name(request.file_name.as_deref().unwrap_or("video-summary")),
            now.format("%Y-%m-%dT%H-%M-%S")
        );

        info!(file = %file_name, bytes = bytes.len(), "📄 PDF generated");
        Ok(PdfDocument { file_name, bytes })
    }
}

fn sanitize_file_name(name: &str) -> String {
    let stem = name.trim().trim_end_matches(".pdf");
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '-' })
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '-' || c == '.').to_string();
    if cleaned.is_empty() {
        "video-summary".to_string()
    } else {
        cleaned
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn title_case(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

const STYLE: &str = "@page { margin: 15mm; size: A4; }
body { font-family: Arial, Helvetica, sans-serif; line-height: 1.4; color: #000; font-size: 11px; }
.header { text-align: center; border-bottom: 2px solid #000; padding-bottom: 10px; margin-bottom: 15px; }
.header h1 { margin: 0; font-size: 20px; }
.subtitle { color: #333; font-size: 12px; margin-top: 5px; }
.metadata { background: #f0f0f0; padding: 8px; margin-bottom: 15px; border-left: 3px solid #000; }
.metadata-label { font-weight: bold; }
.section { margin-bottom: 20px; }
.section-title { font-size: 16px; font-weight: bold; margin-bottom: 8px; border-bottom: 1px solid #ccc; }
.section-content { padding: 10px; border: 1px solid #ddd; white-space: pre-wrap; }
.transcript-content { font-size: 10px; }
.translation-item { margin-bottom: 10px; padding: 8px; background: #f9f9f9; border-left: 2px solid #000; }
.translation-header { font-weight: bold; margin-bottom: 3px; }
.footer { text-align: center; margin-top: 20px; padding-top: 10px; border-top: 1px solid #ccc; color: #666; font-size: 9px; }";

/// Assemble the report HTML. All user text is escaped.
pub fn render_html(request: &ExportRequest, generated_at: DateTime<Utc>) -> String {
    let content_type = title_case(request.content_type.as_deref().unwrap_or("lecture"));
    let summary_style = title_case(request.summary_style.as_deref().unwrap_or("bullet"));
    let languages = request.translations.len();

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n<title>AI Video Summary</title>\n<style>\n");
    html.push_str(STYLE);
    html.push_str("\n</style>\n</head>\n<body>\n");
    html.push_str("<div class=\"header\"><h1>AI Video Summary Report</h1><div class=\"subtitle\">Generated by AI Video Summarizer</div></div>\n");

    html.push_str("<div class=\"metadata\">\n");
    for (label, value) in [
        ("Content Type", escape_html(&content_type)),
        ("Summary Style", escape_html(&summary_style)),
        ("Generated On", generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        (
            "Languages",
            format!("{} language{}", languages, if languages == 1 { "" } else { "s" }),
        ),
    ] {
        html.push_str(&format!(
            "<div><span class=\"metadata-label\">{}:</span> <span>{}</span></div>\n",
            label, value
        ));
    }
    html.push_str("</div>\n");

    if let Some(transcript) = request.transcript.as_deref().filter(|t| !t.trim().is_empty()) {
        html.push_str(&format!(
            "<div class=\"section\"><div class=\"section-title\">Transcript</div><div class=\"section-content transcript-content\">{}</div></div>\n",
            escape_html(transcript)
        ));
    }

    if let Some(summary) = request.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        html.push_str(&format!(
            "<div class=\"section\"><div class=\"section-title\">AI Summary</div><div class=\"section-content\">{}</div></div>\n",
            escape_html(summary)
        ));
    }

    if !request.translations.is_empty() {
        html.push_str("<div class=\"section\"><div class=\"section-title\">Translations</div><div class=\"section-content\">\n");
        for (code, text) in &request.translations {
            let name = language_name(code).map(str::to_string).unwrap_or_else(|| code.to_uppercase());
            html.push_str(&format!(
                "<div class=\"translation-item\"><div class=\"translation-header\">{}</div><div>{}</div></div>\n",
                escape_html(&name),
                escape_html(text)
            ));
        }
        html.push_str("</div></div>\n");
    }

    html.push_str("<div class=\"footer\">AI Video Summarizer</div>\n</body>\n</html>\n");
    html
}
