//! The citation backend as seen from the client: one multipart POST per
//! submission, no retries.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::multipart::{Form, Part};

use crate::response::{error_message, parse_body};
use crate::{CitationResponse, Config, SubmitError};

/// Everything sent with one submission. Built fresh each time, never kept.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub file: Vec<u8>,
    pub query_text: String,
}

impl UploadRequest {
    /// Read the selected file into memory.
    pub async fn read(path: &Path, query_text: String) -> Result<Self, SubmitError> {
        let file = tokio::fs::read(path)
            .await
            .map_err(|source| SubmitError::ReadFile {
                path: path.to_path_buf(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document.pdf".to_string());
        Ok(Self {
            file_name,
            file,
            query_text,
        })
    }
}

/// Something that turns an upload into citation results.
///
/// The HTTP implementation is [`HttpBackend`]; tests substitute scripted
/// fakes.
#[async_trait]
pub trait CitationBackend: Send + Sync {
    async fn find_citations(&self, request: UploadRequest) -> Result<CitationResponse, SubmitError>;
}

/// The backend reached over HTTP at `api_url`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    api_url: String,
}

impl HttpBackend {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, SubmitError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SubmitError::transport(e.to_string()))?;
        Ok(Self {
            client,
            api_url: api_url.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, SubmitError> {
        Self::new(config.api_url.clone(), config.timeout)
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl CitationBackend for HttpBackend {
    async fn find_citations(&self, request: UploadRequest) -> Result<CitationResponse, SubmitError> {
        let UploadRequest {
            file_name,
            file,
            query_text,
        } = request;

        debug!(
            "POST {} ({} bytes, {} chars of text)",
            self.api_url,
            file.len(),
            query_text.len()
        );

        let part = Part::bytes(file)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(classify)?;
        let form = Form::new().part("file", part).text("text", query_text);

        let response = self
            .client
            .post(&self.api_url)
            .multipart(form)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let body = response.bytes().await.map_err(classify)?;

        if !status.is_success() {
            // An error body from the backend beats the bare status code.
            let backend_error = serde_json::from_slice::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.as_object().and_then(error_message));
            return Err(match backend_error {
                Some(message) => SubmitError::Backend(message),
                None => SubmitError::Status(status.as_u16()),
            });
        }

        parse_body(&body, &self.api_url)
    }
}

/// Map a reqwest failure onto the user-facing transport errors.
fn classify(err: reqwest::Error) -> SubmitError {
    warn!("request failed: {err}");
    if err.is_timeout() {
        SubmitError::Timeout
    } else if err.is_connect() {
        SubmitError::Offline
    } else {
        SubmitError::transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_takes_file_name_and_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.pdf");
        std::fs::write(&path, b"%PDF-1.4 test").unwrap();

        let req = UploadRequest::read(&path, "sky".to_string()).await.unwrap();
        assert_eq!(req.file_name, "paper.pdf");
        assert_eq!(req.file, b"%PDF-1.4 test");
        assert_eq!(req.query_text, "sky");
    }

    #[tokio::test]
    async fn read_reports_missing_file() {
        let err = UploadRequest::read(Path::new("/nonexistent/paper.pdf"), String::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::ReadFile { .. }));
        assert!(err.to_string().contains("/nonexistent/paper.pdf"));
    }
}
