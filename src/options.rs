//! Per-job processing options captured at submission time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Language the pipeline transcribes and summarizes in. Translating into it is a no-op.
pub const WORKING_LANGUAGE: &str = "EN";

/// Kind of recording being summarized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Lecture,
    Meeting,
    Presentation,
    Interview,
    News,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Lecture => "lecture",
            ContentType::Meeting => "meeting",
            ContentType::Presentation => "presentation",
            ContentType::Interview => "interview",
            ContentType::News => "news",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lecture" => Ok(ContentType::Lecture),
            "meeting" => Ok(ContentType::Meeting),
            "presentation" => Ok(ContentType::Presentation),
            "interview" => Ok(ContentType::Interview),
            "news" => Ok(ContentType::News),
            _ => Err(ValidationError::InvalidOption {
                field: "contentType",
                value: s.to_string(),
            }),
        }
    }
}

/// Layout of the generated summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStyle {
    #[default]
    Concise,
    Bullet,
    Detailed,
}

impl SummaryStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStyle::Concise => "concise",
            SummaryStyle::Bullet => "bullet",
            SummaryStyle::Detailed => "detailed",
        }
    }
}

impl fmt::Display for SummaryStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryStyle {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "concise" => Ok(SummaryStyle::Concise),
            "bullet" | "bullets" => Ok(SummaryStyle::Bullet),
            "detailed" => Ok(SummaryStyle::Detailed),
            _ => Err(ValidationError::InvalidOption {
                field: "summaryStyle",
                value: s.to_string(),
            }),
        }
    }
}

/// Immutable configuration for one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingOptions {
    pub content_type: ContentType,
    pub summary_style: SummaryStyle,
    /// Upper-case language code, e.g. `FR`
    pub target_language: String,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            content_type: ContentType::default(),
            summary_style: SummaryStyle::default(),
            target_language: WORKING_LANGUAGE.to_string(),
        }
    }
}

impl ProcessingOptions {
    /// Build options from the raw upload form fields. Blank fields fall back to defaults.
    pub fn from_form(
        content_type: Option<&str>,
        summary_style: Option<&str>,
        languages: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let content_type = match non_blank(content_type) {
            Some(value) => value.parse()?,
            None => ContentType::default(),
        };
        let summary_style = match non_blank(summary_style) {
            Some(value) => value.parse()?,
            None => SummaryStyle::default(),
        };
        let target_language = parse_target_language(languages)?;

        Ok(Self {
            content_type,
            summary_style,
            target_language,
        })
    }

    pub fn is_identity_translation(&self) -> bool {
        self.target_language == WORKING_LANGUAGE
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// First entry of a comma-separated language list, trimmed and upper-cased.
fn parse_target_language(languages: Option<&str>) -> Result<String, ValidationError> {
    let first = languages
        .and_then(|list| list.split(',').map(str::trim).find(|code| !code.is_empty()));

    let Some(code) = first else {
        return Ok(WORKING_LANGUAGE.to_string());
    };

    let valid = (2..=8).contains(&code.len())
        && code.chars().all(|c| c.is_ascii_alphabetic() || c == '-');
    if !valid {
        return Err(ValidationError::InvalidOption {
            field: "languages",
            value: code.to_string(),
        });
    }

    Ok(code.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_fields_missing() {
        let options = ProcessingOptions::from_form(None, Some("  "), None).unwrap();
        assert_eq!(options, ProcessingOptions::default());
        assert!(options.is_identity_translation());
    }

    #[test]
    fn test_first_language_is_target() {
        let options = ProcessingOptions::from_form(Some("meeting"), Some("bullet"), Some(" fr , es")).unwrap();
        assert_eq!(options.content_type, ContentType::Meeting);
        assert_eq!(options.summary_style, SummaryStyle::Bullet);
        assert_eq!(options.target_language, "FR");
        assert!(!options.is_identity_translation());

        let options = ProcessingOptions::from_form(None, None, Some("EN,FR,ES")).unwrap();
        assert_eq!(options.target_language, "EN");
    }

    #[test]
    fn test_unknown_values_rejected() {
        let err = ProcessingOptions::from_form(Some("podcast"), None, None).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidOption {
                field: "contentType",
                value: "podcast".to_string()
            }
        );

        assert!(ProcessingOptions::from_form(None, Some("haiku"), None).is_err());
        assert!(ProcessingOptions::from_form(None, None, Some("f1")).is_err());
    }
}
