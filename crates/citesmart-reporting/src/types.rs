use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use citesmart_core::{CitationResult, DocumentMetadata, SessionState};

/// Output formats for a set of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Markdown,
    Html,
    Text,
}

impl ExportFormat {
    pub fn label(self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Markdown => "Markdown",
            Self::Html => "HTML",
            Self::Text => "Plain text",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
            Self::Html => "html",
            Self::Text => "txt",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "md" | "markdown" => Ok(Self::Markdown),
            "html" | "htm" => Ok(Self::Html),
            "txt" | "text" => Ok(Self::Text),
            other => Err(format!(
                "unknown format '{other}' (expected json, markdown, html or text)"
            )),
        }
    }
}

/// A read-only view of one finished cycle, ready to render.
#[derive(Debug, Clone, Serialize)]
pub struct Report<'a> {
    pub document: Option<&'a str>,
    pub query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<&'a DocumentMetadata>,
    pub results: &'a [CitationResult],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<&'a str>,
}

impl<'a> Report<'a> {
    pub fn from_state(state: &'a SessionState) -> Self {
        Self {
            document: state.selected_file.as_ref().map(|f| f.name.as_str()),
            query: &state.query_text,
            metadata: state.metadata.as_ref(),
            results: &state.results,
            notice: state.notice.as_deref(),
        }
    }
}

/// Label/value pairs for whichever metadata fields are present.
pub fn metadata_fields(meta: &DocumentMetadata) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    if let Some(title) = &meta.title {
        fields.push(("Title", title.clone()));
    }
    if !meta.authors.is_empty() {
        fields.push(("Authors", meta.authors.join(", ")));
    }
    let optional = [
        ("Published", &meta.published_date),
        ("Journal", &meta.journal),
        ("Publisher", &meta.publisher),
        ("DOI", &meta.doi),
        ("Type", &meta.kind),
    ];
    for (label, value) in optional {
        if let Some(v) = value {
            fields.push((label, v.clone()));
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_formats() {
        assert_eq!("JSON".parse::<ExportFormat>(), Ok(ExportFormat::Json));
        assert_eq!("md".parse::<ExportFormat>(), Ok(ExportFormat::Markdown));
        assert_eq!("html".parse::<ExportFormat>(), Ok(ExportFormat::Html));
        assert_eq!("text".parse::<ExportFormat>(), Ok(ExportFormat::Text));
        assert!("pdf".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn metadata_fields_skip_missing() {
        let meta = DocumentMetadata {
            title: Some("On Skies".into()),
            authors: vec!["Smith, J.".into(), "Doe, A.".into()],
            doi: Some("10.1000/sky".into()),
            ..Default::default()
        };
        let fields = metadata_fields(&meta);
        assert_eq!(
            fields,
            vec![
                ("Title", "On Skies".to_string()),
                ("Authors", "Smith, J., Doe, A.".to_string()),
                ("DOI", "10.1000/sky".to_string()),
            ]
        );
    }
}
