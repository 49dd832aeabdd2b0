//! The upload/query form: session state and the single request/response cycle.
//!
//! [`FormController`] owns the [`SessionState`]; renderers only ever see it by
//! shared reference. A submission runs in two halves so an event loop can keep
//! drawing while the request is in flight:
//!
//! 1. [`FormController::begin_submit`] validates, resets state, marks loading and
//!    hands back a [`PendingSubmission`].
//! 2. The caller awaits [`PendingSubmission::send`] wherever it likes and feeds
//!    the [`Completion`] back through [`FormController::finish`].
//!
//! [`FormController::submit`] does both in one call.

use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;

use crate::client::{CitationBackend, UploadRequest};
use crate::{CitationResponse, CitationResult, DocumentMetadata, PdfReference, SubmitError};

/// Shown when a well-formed response has nothing in it.
pub const NO_MATCHES: &str = "No matching quotes found";

/// Why a file was not accepted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    #[error("Please select a PDF file")]
    NoFile,
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Not a regular file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error("Only PDF files are supported: {}", .0.display())]
    NotPdf(PathBuf),
}

/// Where the form is in its request cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormPhase {
    #[default]
    Idle,
    Submitting,
    Success,
    Failure,
}

impl FormPhase {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Ready",
            Self::Submitting => "Processing...",
            Self::Success => "Done",
            Self::Failure => "Failed",
        }
    }
}

/// The file the user picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
}

impl SelectedFile {
    fn new(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path: path.to_path_buf(),
            name,
        }
    }
}

/// Everything the front-end knows about the current cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub selected_file: Option<SelectedFile>,
    pub query_text: String,
    pub results: Vec<CitationResult>,
    pub metadata: Option<DocumentMetadata>,
    pub error_message: Option<String>,
    /// Informational text, e.g. "no matches". Never shown as an error.
    pub notice: Option<String>,
    pub is_loading: bool,
    pub pdf_reference: Option<PdfReference>,
    pub phase: FormPhase,
}

/// A submission that passed validation and is waiting to be sent.
#[derive(Debug)]
pub struct PendingSubmission {
    ticket: u64,
    path: PathBuf,
    query_text: String,
}

impl PendingSubmission {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    /// Read the file and make exactly one backend call.
    pub async fn send(self, backend: &dyn CitationBackend) -> Completion {
        let result = match UploadRequest::read(&self.path, self.query_text).await {
            Ok(request) => backend.find_citations(request).await,
            Err(e) => Err(e),
        };
        Completion {
            ticket: self.ticket,
            result,
        }
    }
}

/// The outcome of a [`PendingSubmission`].
#[derive(Debug)]
pub struct Completion {
    pub ticket: u64,
    pub result: Result<CitationResponse, SubmitError>,
}

#[derive(Debug, Clone)]
struct InFlight {
    ticket: u64,
    path: PathBuf,
}

/// Owner of the session state and the only code that mutates it.
#[derive(Debug, Default)]
pub struct FormController {
    state: SessionState,
    next_ticket: u64,
    in_flight: Option<InFlight>,
}

impl FormController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Submit is disabled only while a request is in flight.
    pub fn can_submit(&self) -> bool {
        !self.state.is_loading
    }

    /// Pick a file. `None` means the picker was dismissed.
    ///
    /// On rejection only the error message changes. On success the previous
    /// results, metadata and PDF reference are dropped.
    pub fn select_file(&mut self, path: Option<&Path>) -> Result<(), SelectError> {
        let checked = match path {
            None => Err(SelectError::NoFile),
            Some(p) => check_pdf_path(p),
        };
        let path = match checked {
            Ok(p) => p,
            Err(e) => {
                self.state.error_message = Some(e.to_string());
                return Err(e);
            }
        };

        let file = SelectedFile::new(path);
        info!("selected {}", file.path.display());
        self.state.pdf_reference = Some(PdfReference::Local(file.path.clone()));
        self.state.selected_file = Some(file);
        self.reset_outcome();
        self.settle_phase();
        Ok(())
    }

    /// Forget the selected file along with everything derived from it.
    pub fn clear_file(&mut self) {
        self.state.selected_file = None;
        self.state.pdf_reference = None;
        self.reset_outcome();
        self.settle_phase();
    }

    pub fn update_query_text(&mut self, text: impl Into<String>) {
        self.state.query_text = text.into();
        self.settle_phase();
    }

    /// Validate and start a submission.
    ///
    /// Returns `None` (with the error set) when there is no file, the query is
    /// blank, or a request is already in flight.
    pub fn begin_submit(&mut self) -> Option<PendingSubmission> {
        if let Err(e) = self.validate() {
            if matches!(e, SubmitError::Busy) {
                // The in-flight cycle owns results and phase.
                self.state.error_message = Some(e.to_string());
                return None;
            }
            self.reset_outcome();
            self.state.error_message = Some(e.to_string());
            self.state.phase = FormPhase::Failure;
            return None;
        }
        let path = self.state.selected_file.as_ref()?.path.clone();

        self.reset_outcome();
        self.state.is_loading = true;
        self.state.phase = FormPhase::Submitting;

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.in_flight = Some(InFlight {
            ticket,
            path: path.clone(),
        });

        Some(PendingSubmission {
            ticket,
            path,
            query_text: self.state.query_text.clone(),
        })
    }

    /// Apply a completed submission. Returns `false` if it was stale and
    /// therefore ignored.
    pub fn finish(&mut self, completion: Completion) -> bool {
        let in_flight = match &self.in_flight {
            Some(f) if f.ticket == completion.ticket => f.clone(),
            _ => {
                warn!("ignoring stale completion #{}", completion.ticket);
                return false;
            }
        };
        self.in_flight = None;
        self.state.is_loading = false;

        let still_selected = self
            .state
            .selected_file
            .as_ref()
            .is_some_and(|f| f.path == in_flight.path);
        if !still_selected {
            warn!(
                "discarding results for {}: file changed while in flight",
                in_flight.path.display()
            );
            self.state.phase = FormPhase::Idle;
            return false;
        }

        match completion.result {
            Ok(response) => self.apply_response(response),
            Err(e) => {
                warn!("submission failed ({:?}): {e}", e.kind());
                self.state.results.clear();
                self.state.metadata = None;
                self.state.notice = None;
                self.state.error_message = Some(e.to_string());
                self.state.phase = FormPhase::Failure;
            }
        }
        true
    }

    /// Validate, send and apply in one go.
    pub async fn submit(&mut self, backend: &dyn CitationBackend) -> bool {
        match self.begin_submit() {
            Some(pending) => {
                let completion = pending.send(backend).await;
                self.finish(completion)
            }
            None => false,
        }
    }

    fn validate(&self) -> Result<(), SubmitError> {
        if self.state.is_loading {
            return Err(SubmitError::Busy);
        }
        if self.state.selected_file.is_none() {
            return Err(SubmitError::NoFile);
        }
        if self.state.query_text.trim().is_empty() {
            return Err(SubmitError::EmptyQuery);
        }
        Ok(())
    }

    fn apply_response(&mut self, response: CitationResponse) {
        let CitationResponse {
            results,
            metadata,
            pdf,
            message,
        } = response;

        info!("received {} quote(s)", results.len());
        self.state.error_message = None;
        self.state.notice = if results.is_empty() {
            Some(message.unwrap_or_else(|| NO_MATCHES.to_string()))
        } else {
            None
        };
        self.state.results = results;
        self.state.metadata = metadata;
        if let Some(pdf) = pdf {
            self.state.pdf_reference = Some(pdf);
        }
        self.state.phase = FormPhase::Success;
    }

    fn reset_outcome(&mut self) {
        self.state.results.clear();
        self.state.metadata = None;
        self.state.error_message = None;
        self.state.notice = None;
    }

    /// Success and Failure fall back to Idle on the next interaction.
    fn settle_phase(&mut self) {
        if matches!(self.state.phase, FormPhase::Success | FormPhase::Failure) {
            self.state.phase = FormPhase::Idle;
        }
    }
}

fn check_pdf_path(path: &Path) -> Result<&Path, SelectError> {
    if !path.exists() {
        return Err(SelectError::NotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(SelectError::NotAFile(path.to_path_buf()));
    }
    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(SelectError::NotPdf(path.to_path_buf()));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    /// Replays canned outcomes and counts calls.
    struct ScriptedBackend {
        calls: AtomicUsize,
        outcomes: Mutex<Vec<Result<CitationResponse, SubmitError>>>,
        last_request: Mutex<Option<UploadRequest>>,
    }

    impl ScriptedBackend {
        fn new(outcomes: Vec<Result<CitationResponse, SubmitError>>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                outcomes: Mutex::new(outcomes),
                last_request: Mutex::new(None),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CitationBackend for ScriptedBackend {
        async fn find_citations(
            &self,
            request: UploadRequest,
        ) -> Result<CitationResponse, SubmitError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request);
            self.outcomes.lock().unwrap().remove(0)
        }
    }

    fn sky_result() -> CitationResult {
        CitationResult {
            quote: "The sky is blue and vast".into(),
            page: 3,
            citation: "(Smith, 2020)".into(),
            highlighted_terms: vec!["sky".into(), "vast".into()],
            relevance: None,
        }
    }

    fn one_result() -> CitationResponse {
        CitationResponse {
            results: vec![sky_result()],
            metadata: Some(DocumentMetadata {
                title: Some("On Skies".into()),
                ..Default::default()
            }),
            pdf: Some(PdfReference::Remote("http://b/api/pdf/p.pdf".into())),
            message: None,
        }
    }

    fn pdf_in(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        path
    }

    fn ready_form(dir: &tempfile::TempDir) -> FormController {
        let mut form = FormController::new();
        form.select_file(Some(pdf_in(dir, "paper.pdf").as_path())).unwrap();
        form.update_query_text("blue sky");
        form
    }

    #[tokio::test]
    async fn no_file_never_calls_backend() {
        let backend = ScriptedBackend::new(vec![]);
        let mut form = FormController::new();
        form.update_query_text("sky");

        assert!(!form.submit(&backend).await);
        assert_eq!(backend.calls(), 0);
        assert_eq!(
            form.state().error_message.as_deref(),
            Some("Please select a PDF file")
        );
        assert!(!form.state().is_loading);
    }

    #[tokio::test]
    async fn blank_query_never_calls_backend() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ScriptedBackend::new(vec![]);
        let mut form = FormController::new();
        form.select_file(Some(pdf_in(&dir, "paper.pdf").as_path())).unwrap();

        for blank in ["", "   ", "\n\t "] {
            form.update_query_text(blank);
            assert!(!form.submit(&backend).await);
            assert!(form.state().error_message.is_some());
        }
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn success_stores_results_and_clears_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ScriptedBackend::new(vec![Ok(one_result())]);
        let mut form = ready_form(&dir);
        form.state.error_message = Some("old".into());

        assert!(form.submit(&backend).await);
        let state = form.state();
        assert_eq!(backend.calls(), 1);
        assert_eq!(state.results, vec![sky_result()]);
        assert_eq!(state.metadata.as_ref().unwrap().title.as_deref(), Some("On Skies"));
        assert!(state.error_message.is_none());
        assert!(state.notice.is_none());
        assert!(!state.is_loading);
        assert_eq!(state.phase, FormPhase::Success);
        assert_eq!(
            state.pdf_reference,
            Some(PdfReference::Remote("http://b/api/pdf/p.pdf".into()))
        );

        let sent = backend.last_request.lock().unwrap().take().unwrap();
        assert_eq!(sent.file_name, "paper.pdf");
        assert_eq!(sent.query_text, "blue sky");
    }

    #[tokio::test]
    async fn rejected_resubmit_drops_previous_results() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ScriptedBackend::new(vec![Ok(one_result())]);
        let mut form = ready_form(&dir);
        assert!(form.submit(&backend).await);
        assert_eq!(form.state().results.len(), 1);

        form.update_query_text("   ");
        assert!(!form.submit(&backend).await);

        let state = form.state();
        assert_eq!(backend.calls(), 1);
        assert!(state.results.is_empty());
        assert!(state.metadata.is_none());
        assert!(state.notice.is_none());
        assert_eq!(
            state.error_message.as_deref(),
            Some("Please enter some text to search for")
        );
        assert_eq!(state.phase, FormPhase::Failure);
    }

    #[tokio::test]
    async fn empty_result_is_notice_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ScriptedBackend::new(vec![Ok(CitationResponse::default())]);
        let mut form = ready_form(&dir);

        assert!(form.submit(&backend).await);
        let state = form.state();
        assert!(state.results.is_empty());
        assert!(state.error_message.is_none());
        assert_eq!(state.notice.as_deref(), Some(NO_MATCHES));
        assert_eq!(state.phase, FormPhase::Success);
    }

    #[tokio::test]
    async fn backend_message_used_for_empty_notice() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ScriptedBackend::new(vec![Ok(CitationResponse {
            message: Some("Nothing relevant on any page".into()),
            ..Default::default()
        })]);
        let mut form = ready_form(&dir);
        form.submit(&backend).await;
        assert_eq!(
            form.state().notice.as_deref(),
            Some("Nothing relevant on any page")
        );
    }

    #[tokio::test]
    async fn error_clears_previous_results() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ScriptedBackend::new(vec![
            Ok(one_result()),
            Err(SubmitError::Backend("Failed to process PDF".into())),
        ]);
        let mut form = ready_form(&dir);
        form.submit(&backend).await;
        assert_eq!(form.state().results.len(), 1);

        form.submit(&backend).await;
        let state = form.state();
        assert!(state.results.is_empty());
        assert!(state.metadata.is_none());
        assert_eq!(state.error_message.as_deref(), Some("Failed to process PDF"));
        assert_eq!(state.phase, FormPhase::Failure);
        assert!(!state.is_loading);
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn timeout_and_offline_are_told_apart() {
        let dir = tempfile::tempdir().unwrap();
        let backend =
            ScriptedBackend::new(vec![Err(SubmitError::Timeout), Err(SubmitError::Offline)]);
        let mut form = ready_form(&dir);

        form.submit(&backend).await;
        let timeout = form.state().error_message.clone().unwrap();
        form.submit(&backend).await;
        let offline = form.state().error_message.clone().unwrap();

        assert!(timeout.contains("timed out"));
        assert!(offline.contains("offline"));
        assert_ne!(timeout, offline);
    }

    #[test]
    fn second_submit_refused_while_loading() {
        let dir = tempfile::tempdir().unwrap();
        let mut form = ready_form(&dir);

        let first = form.begin_submit().expect("first submission starts");
        assert!(form.state().is_loading);
        assert!(!form.can_submit());
        assert!(form.begin_submit().is_none());
        assert_eq!(
            form.state().error_message.as_deref(),
            Some("A request is already in progress")
        );
        assert_eq!(form.state().phase, FormPhase::Submitting);

        assert!(form.finish(Completion {
            ticket: first.ticket(),
            result: Ok(one_result()),
        }));
        assert!(form.can_submit());
        assert!(form.state().error_message.is_none());
    }

    #[test]
    fn stale_completion_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut form = ready_form(&dir);
        let first = form.begin_submit().unwrap();
        form.finish(Completion {
            ticket: first.ticket(),
            result: Err(SubmitError::Timeout),
        });
        let second = form.begin_submit().unwrap();

        assert!(!form.finish(Completion {
            ticket: first.ticket(),
            result: Ok(one_result()),
        }));
        assert!(form.state().is_loading);
        assert!(form.state().results.is_empty());

        assert!(form.finish(Completion {
            ticket: second.ticket(),
            result: Ok(one_result()),
        }));
        assert!(!form.state().is_loading);
    }

    #[test]
    fn reselecting_while_in_flight_discards_old_results() {
        let dir = tempfile::tempdir().unwrap();
        let mut form = ready_form(&dir);
        let pending = form.begin_submit().unwrap();
        form.select_file(Some(pdf_in(&dir, "other.pdf").as_path())).unwrap();

        assert!(!form.finish(Completion {
            ticket: pending.ticket(),
            result: Ok(one_result()),
        }));
        assert!(!form.state().is_loading);
        assert!(form.state().results.is_empty());
        assert_eq!(form.state().selected_file.as_ref().unwrap().name, "other.pdf");
    }

    #[tokio::test]
    async fn reselect_resets_results_before_next_submit() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ScriptedBackend::new(vec![Ok(one_result())]);
        let mut form = ready_form(&dir);
        form.submit(&backend).await;
        assert!(!form.state().results.is_empty());

        form.clear_file();
        assert!(form.state().results.is_empty());
        assert!(form.state().metadata.is_none());
        assert!(form.state().pdf_reference.is_none());

        let again = pdf_in(&dir, "again.pdf");
        form.select_file(Some(again.as_path())).unwrap();
        let state = form.state();
        assert!(state.results.is_empty());
        assert!(state.metadata.is_none());
        assert_eq!(state.pdf_reference, Some(PdfReference::Local(again)));
        assert_eq!(state.phase, FormPhase::Idle);
        assert_eq!(backend.calls(), 1);
    }

    #[test]
    fn update_query_text_is_idempotent() {
        let mut form = FormController::new();
        form.update_query_text("sky");
        let snapshot = form.state().clone();
        form.update_query_text("sky");
        assert_eq!(form.state(), &snapshot);
        assert_eq!(form.state().query_text, "sky");
    }

    #[test]
    fn rejected_selection_leaves_state_alone() {
        let dir = tempfile::tempdir().unwrap();
        let mut form = ready_form(&dir);
        let before = form.state().selected_file.clone();

        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, "x").unwrap();
        assert!(matches!(form.select_file(Some(txt.as_path())), Err(SelectError::NotPdf(_))));
        assert!(matches!(form.select_file(None), Err(SelectError::NoFile)));
        assert!(matches!(
            form.select_file(Some(dir.path().join("absent.pdf").as_path())),
            Err(SelectError::NotFound(_))
        ));
        assert!(matches!(
            form.select_file(Some(dir.path())),
            Err(SelectError::NotAFile(_))
        ));

        assert_eq!(form.state().selected_file, before);
        assert_eq!(form.state().query_text, "blue sky");
        assert!(
            form.state()
                .error_message
                .as_deref()
                .unwrap()
                .starts_with("Not a regular file")
        );
    }

    #[test]
    fn uppercase_extension_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let mut form = FormController::new();
        assert!(form.select_file(Some(pdf_in(&dir, "SCAN.PDF").as_path())).is_ok());
    }

    #[tokio::test]
    async fn unreadable_file_surfaces_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ScriptedBackend::new(vec![]);
        let mut form = ready_form(&dir);
        std::fs::remove_file(dir.path().join("paper.pdf")).unwrap();

        assert!(form.submit(&backend).await);
        assert_eq!(backend.calls(), 0);
        assert!(form.state().error_message.as_ref().unwrap().starts_with("Could not read"));
        assert!(!form.state().is_loading);
    }
}
