use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub mod client;
pub mod config;
pub mod highlight;
pub mod response;
pub mod session;
pub mod viewer;

pub use client::{CitationBackend, HttpBackend, UploadRequest};
pub use config::{Config, ConfigError, ConfigOverrides, FileConfig};
pub use highlight::{Segment, segments};
pub use response::parse_body;
pub use session::{Completion, FormController, FormPhase, PendingSubmission, SessionState};
pub use viewer::{FindCommand, PdfJsBridge, SystemLauncher, ViewerBridge, ViewerError};

/// Broad category of a submission failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caught before any network call (no file, empty query, busy).
    Validation,
    /// The backend answered with an `error` field.
    Backend,
    /// Timeout, unreachable backend or another transport failure.
    Transport,
    /// The HTTP call succeeded but the body is not a usable result.
    InvalidResponse,
}

/// Everything that can go wrong between pressing submit and rendering results.
///
/// The `Display` text is what the user sees.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Please select a PDF file")]
    NoFile,
    #[error("Please enter some text to search for")]
    EmptyQuery,
    #[error("A request is already in progress")]
    Busy,
    #[error("Could not read {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Request timed out. The file might be too large or the server is busy.")]
    Timeout,
    #[error("You appear to be offline. Please check your internet connection.")]
    Offline,
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Backend(String),
    #[error("Request failed with status code {0}")]
    Status(u16),
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl SubmitError {
    /// Generic transport failure, falling back to a stock message when the
    /// underlying error has nothing to say.
    pub fn transport(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            Self::Transport("An error occurred while processing your request".to_string())
        } else {
            Self::Transport(message)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoFile | Self::EmptyQuery | Self::Busy | Self::ReadFile { .. } => {
                ErrorKind::Validation
            }
            Self::Backend(_) => ErrorKind::Backend,
            Self::Timeout | Self::Offline | Self::Transport(_) | Self::Status(_) => {
                ErrorKind::Transport
            }
            Self::InvalidResponse(_) => ErrorKind::InvalidResponse,
        }
    }
}

/// A single quote returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationResult {
    #[serde(alias = "text")]
    pub quote: String,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub citation: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub highlighted_terms: Vec<String>,
    #[serde(default, alias = "similarity", skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
}

fn first_page() -> u32 {
    1
}

/// Bibliographic metadata the backend may attach to a response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub authors: Vec<String>,
    #[serde(default, alias = "publishedDate")]
    pub published_date: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub journal: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl DocumentMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.authors.is_empty()
            && self.published_date.is_none()
            && self.doi.is_none()
            && self.journal.is_none()
            && self.publisher.is_none()
            && self.kind.is_none()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Where the viewer should load the PDF from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfReference {
    /// Hosted by the backend (`pdf_url`, or `{api}/pdf/{filename}`).
    Remote(String),
    /// The file the user picked, used until the backend offers a hosted copy.
    Local(PathBuf),
}

impl PdfReference {
    /// The string handed to the viewer's `file` parameter.
    pub fn to_viewer_file(&self) -> String {
        match self {
            Self::Remote(url) => url.clone(),
            Self::Local(path) => format!("file://{}", path.display()),
        }
    }
}

/// A well-formed backend answer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CitationResponse {
    pub results: Vec<CitationResult>,
    pub metadata: Option<DocumentMetadata>,
    pub pdf: Option<PdfReference>,
    /// Informational text the backend sends alongside an empty result list.
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_and_offline_messages_differ() {
        let timeout = SubmitError::Timeout.to_string();
        let offline = SubmitError::Offline.to_string();
        assert!(timeout.contains("timed out"));
        assert!(offline.contains("offline"));
        assert_ne!(timeout, offline);
    }

    #[test]
    fn blank_transport_message_gets_stock_text() {
        let err = SubmitError::transport("  ");
        assert_eq!(
            err.to_string(),
            "An error occurred while processing your request"
        );
        assert_eq!(
            SubmitError::transport("connection reset").to_string(),
            "connection reset"
        );
    }

    #[test]
    fn error_kinds() {
        assert_eq!(SubmitError::NoFile.kind(), ErrorKind::Validation);
        assert_eq!(SubmitError::EmptyQuery.kind(), ErrorKind::Validation);
        assert_eq!(SubmitError::Backend("x".into()).kind(), ErrorKind::Backend);
        assert_eq!(SubmitError::Timeout.kind(), ErrorKind::Transport);
        assert_eq!(SubmitError::Status(502).kind(), ErrorKind::Transport);
        assert_eq!(
            SubmitError::InvalidResponse("x".into()).kind(),
            ErrorKind::InvalidResponse
        );
    }

    #[test]
    fn result_accepts_flat_shape() {
        let r: CitationResult =
            serde_json::from_str(r#"{"text": "A sentence.", "page": 1, "similarity": 0.5}"#)
                .unwrap();
        assert_eq!(r.quote, "A sentence.");
        assert_eq!(r.citation, "");
        assert!(r.highlighted_terms.is_empty());
        assert_eq!(r.relevance, Some(0.5));
    }

    #[test]
    fn metadata_tolerates_nulls() {
        let m: DocumentMetadata = serde_json::from_str(
            r#"{"title": null, "authors": null, "publishedDate": "2020", "type": "article"}"#,
        )
        .unwrap();
        assert!(m.title.is_none());
        assert!(m.authors.is_empty());
        assert_eq!(m.published_date.as_deref(), Some("2020"));
        assert_eq!(m.kind.as_deref(), Some("article"));
        assert!(!m.is_empty());
        assert!(DocumentMetadata::default().is_empty());
    }

    #[test]
    fn local_reference_is_file_url() {
        let r = PdfReference::Local(PathBuf::from("/tmp/paper.pdf"));
        assert_eq!(r.to_viewer_file(), "file:///tmp/paper.pdf");
    }
}
