use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use citesmart_core::{CitationBackend, CitationResult, FormController, ViewerBridge};
use citesmart_reporting::{ExportFormat, Report, export_results};

use crate::action::Action;
use crate::backend;
use crate::input::InputMode;
use crate::model::form::{FormField, FormInputs};
use crate::theme::Theme;
use crate::tui_event::BackendEvent;

/// Which screen is currently displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Form,
    Results,
}

/// Main application state.
pub struct App {
    pub screen: Screen,
    pub form: FormController,
    pub inputs: FormInputs,
    pub result_cursor: usize,
    pub detail_scroll: u16,
    pub tick: usize,
    pub theme: Theme,
    pub should_quit: bool,
    pub show_help: bool,
    /// Height of the visible list area (set on resize, used for page up/down).
    pub visible_rows: usize,
    /// One-line feedback for the last command (copy, export, viewer).
    pub status: Option<String>,
    pub export_format: ExportFormat,
    pub export_dir: PathBuf,
    backend: Arc<dyn CitationBackend>,
    viewer: Arc<dyn ViewerBridge>,
    events: mpsc::UnboundedSender<BackendEvent>,
}

impl App {
    pub fn new(
        backend: Arc<dyn CitationBackend>,
        viewer: Arc<dyn ViewerBridge>,
        events: mpsc::UnboundedSender<BackendEvent>,
    ) -> Self {
        Self {
            screen: Screen::Form,
            form: FormController::new(),
            inputs: FormInputs::default(),
            result_cursor: 0,
            detail_scroll: 0,
            tick: 0,
            theme: Theme::hacker(),
            should_quit: false,
            show_help: false,
            visible_rows: 20,
            status: None,
            export_format: ExportFormat::Html,
            export_dir: PathBuf::from("."),
            backend,
            viewer,
            events,
        }
    }

    /// Pre-fill the form from the command line.
    pub fn prefill(&mut self, pdf: Option<&Path>, query: Option<&str>) {
        if let Some(path) = pdf {
            self.inputs.file_input = path.display().to_string();
            // A rejected path shows its message on the form.
            let _ = self.commit_file();
        }
        if let Some(query) = query {
            self.form.update_query_text(query);
            self.inputs.focus = FormField::Submit;
        }
    }

    pub fn input_mode(&self) -> InputMode {
        if self.show_help || self.screen == Screen::Results {
            InputMode::Normal
        } else {
            InputMode::TextInput
        }
    }

    pub fn selected_result(&self) -> Option<&CitationResult> {
        self.form.state().results.get(self.result_cursor)
    }

    /// Process a user action and update state. Returns true if the app should quit.
    pub fn update(&mut self, action: Action) -> bool {
        // When help overlay is shown, only allow a few actions through
        if self.show_help {
            match action {
                Action::Quit => {
                    self.should_quit = true;
                    return true;
                }
                Action::ToggleHelp | Action::NavigateBack => {
                    self.show_help = false;
                }
                Action::Tick => {
                    self.tick = self.tick.wrapping_add(1);
                }
                Action::Resize(_w, h) => {
                    self.visible_rows = (h as usize).saturating_sub(6);
                }
                _ => {} // swallow everything else
            }
            return false;
        }

        match action {
            Action::Quit => {
                self.should_quit = true;
                return true;
            }
            Action::ToggleHelp => {
                self.show_help = true;
            }
            Action::Tick => {
                self.tick = self.tick.wrapping_add(1);
            }
            Action::Resize(_w, h) => {
                // Rough estimate: total height minus header/footer/borders
                self.visible_rows = (h as usize).saturating_sub(6);
            }
            Action::None => {}
            other => match self.screen {
                Screen::Form => self.update_form(other),
                Screen::Results => self.update_results(other),
            },
        }
        false
    }

    fn update_form(&mut self, action: Action) {
        match action {
            Action::NextField => self.inputs.focus = self.inputs.focus.next(),
            Action::PrevField => self.inputs.focus = self.inputs.focus.prev(),
            Action::Input(c) => match self.inputs.focus {
                FormField::File => self.inputs.file_input.push(c),
                FormField::Query => {
                    let mut text = self.form.state().query_text.clone();
                    text.push(c);
                    self.form.update_query_text(text);
                }
                FormField::Submit => {
                    if c == ' ' {
                        self.start_submit();
                    }
                }
            },
            Action::Backspace => match self.inputs.focus {
                FormField::File => {
                    self.inputs.file_input.pop();
                }
                FormField::Query => {
                    let mut text = self.form.state().query_text.clone();
                    if text.pop().is_some() {
                        self.form.update_query_text(text);
                    }
                }
                FormField::Submit => {}
            },
            Action::DrillIn => match self.inputs.focus {
                FormField::File => {
                    if self.commit_file() && self.form.state().selected_file.is_some() {
                        self.inputs.focus = FormField::Query;
                    }
                }
                FormField::Query => {
                    let mut text = self.form.state().query_text.clone();
                    text.push('\n');
                    self.form.update_query_text(text);
                }
                FormField::Submit => self.start_submit(),
            },
            Action::Submit => self.start_submit(),
            Action::ClearFile => {
                self.form.clear_file();
                self.inputs.file_input.clear();
                self.inputs.focus = FormField::File;
            }
            Action::NavigateBack => {
                if !self.form.state().results.is_empty() {
                    self.screen = Screen::Results;
                }
            }
            _ => {}
        }
    }

    fn update_results(&mut self, action: Action) {
        let count = self.form.state().results.len();
        match action {
            Action::MoveDown => {
                if self.result_cursor + 1 < count {
                    self.result_cursor += 1;
                    self.detail_scroll = 0;
                }
            }
            Action::MoveUp => {
                self.result_cursor = self.result_cursor.saturating_sub(1);
                self.detail_scroll = 0;
            }
            Action::PageDown => {
                let page = self.visible_rows.max(1);
                self.result_cursor = (self.result_cursor + page).min(count.saturating_sub(1));
                self.detail_scroll = 0;
            }
            Action::PageUp => {
                let page = self.visible_rows.max(1);
                self.result_cursor = self.result_cursor.saturating_sub(page);
                self.detail_scroll = 0;
            }
            Action::GoTop => {
                self.result_cursor = 0;
                self.detail_scroll = 0;
            }
            Action::GoBottom => {
                self.result_cursor = count.saturating_sub(1);
                self.detail_scroll = 0;
            }
            Action::DrillIn | Action::OpenInViewer => self.open_in_viewer(),
            Action::CopyCitation => self.copy_citation(),
            Action::Export => self.export(),
            Action::NavigateBack | Action::EditForm => {
                self.screen = Screen::Form;
                self.inputs.focus = FormField::Query;
            }
            _ => {}
        }
    }

    /// Select the typed path. Returns false if it was rejected; the message
    /// is then in the session state.
    fn commit_file(&mut self) -> bool {
        let path = if self.inputs.file_input.trim().is_empty() {
            None
        } else {
            Some(self.inputs.expanded_path())
        };
        self.form.select_file(path.as_deref()).is_ok()
    }

    fn start_submit(&mut self) {
        // Pick up a path typed but never confirmed with Enter.
        let typed = self.inputs.expanded_path();
        let selected = self.form.state().selected_file.as_ref().map(|f| f.path.clone());
        if self.form.can_submit()
            && !self.inputs.file_input.trim().is_empty()
            && selected.as_deref() != Some(typed.as_path())
            && !self.commit_file()
        {
            return;
        }

        self.status = None;
        if let Some(pending) = self.form.begin_submit() {
            info!(ticket = pending.ticket(), "submitting");
            backend::spawn_submission(pending, self.backend.clone(), self.events.clone());
        }
    }

    fn open_in_viewer(&mut self) {
        let Some((page, quote)) = self.selected_result().map(|r| (r.page, r.quote.clone())) else {
            return;
        };
        let Some(pdf) = self.form.state().pdf_reference.clone() else {
            self.status = Some("No PDF available for this result".to_string());
            return;
        };
        self.status = Some(format!("Opening page {page} in viewer..."));
        backend::spawn_viewer(pdf, page, quote, self.viewer.clone(), self.events.clone());
    }

    fn copy_citation(&mut self) {
        let Some(citation) = self.selected_result().map(|r| r.citation.clone()) else {
            return;
        };
        self.status = Some(match crate::clipboard::copy(&citation) {
            Ok(()) => format!("Copied {citation}"),
            Err(e) => format!("Copy failed: {e}"),
        });
    }

    /// Default export file name, derived from the selected document.
    pub fn export_path(&self) -> PathBuf {
        let stem = self
            .form
            .state()
            .selected_file
            .as_ref()
            .and_then(|f| Path::new(&f.name).file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "results".to_string());
        self.export_dir
            .join(format!("{stem}-citations.{}", self.export_format.extension()))
    }

    fn export(&mut self) {
        let path = self.export_path();
        let report = Report::from_state(self.form.state());
        self.status = Some(match export_results(&report, self.export_format, &path) {
            Ok(()) => format!("Exported {} to {}", self.export_format.label(), path.display()),
            Err(e) => format!("Export failed: {e}"),
        });
    }

    /// Process a backend event and update model state.
    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::SubmissionComplete(completion) => {
                if !self.form.finish(completion) {
                    return;
                }
                if self.form.state().results.is_empty() {
                    self.screen = Screen::Form;
                } else {
                    self.screen = Screen::Results;
                    self.result_cursor = 0;
                    self.detail_scroll = 0;
                }
            }
            BackendEvent::ViewerOpened { page } => {
                self.status = Some(format!("Opened page {page} in viewer"));
            }
            BackendEvent::ViewerFailed { error } => {
                self.status = Some(error);
            }
        }
    }

    /// Render the current screen.
    pub fn view(&self, f: &mut ratatui::Frame) {
        match self.screen {
            Screen::Form => crate::view::form::render(f, self),
            Screen::Results => crate::view::results::render(f, self),
        }

        if self.show_help {
            crate::view::help::render(f, &self.theme);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use citesmart_core::{
        CitationResponse, FormPhase, PdfReference, SubmitError, UploadRequest, ViewerError,
    };

    use super::*;

    struct Canned {
        calls: AtomicUsize,
        results: Vec<CitationResult>,
    }

    #[async_trait]
    impl CitationBackend for Canned {
        async fn find_citations(
            &self,
            _request: UploadRequest,
        ) -> Result<CitationResponse, SubmitError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CitationResponse {
                results: self.results.clone(),
                pdf: Some(PdfReference::Remote("http://localhost:5002/api/pdf/paper.pdf".into())),
                ..Default::default()
            })
        }
    }

    #[derive(Default)]
    struct Viewer {
        requests: Mutex<Vec<(PdfReference, u32, String)>>,
    }

    #[async_trait]
    impl ViewerBridge for Viewer {
        async fn request_highlight(
            &self,
            pdf: &PdfReference,
            page: u32,
            quote: &str,
        ) -> Result<(), ViewerError> {
            self.requests
                .lock()
                .unwrap()
                .push((pdf.clone(), page, quote.to_string()));
            Ok(())
        }
    }

    fn sky() -> CitationResult {
        CitationResult {
            quote: "The sky is blue and vast".into(),
            page: 3,
            citation: "(Smith, 2020)".into(),
            highlighted_terms: vec!["sky".into(), "vast".into()],
            relevance: None,
        }
    }

    struct Harness {
        app: App,
        rx: mpsc::UnboundedReceiver<BackendEvent>,
        backend: Arc<Canned>,
        viewer: Arc<Viewer>,
        _dir: tempfile::TempDir,
        pdf: PathBuf,
    }

    fn harness(results: Vec<CitationResult>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("paper.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();
        let backend = Arc::new(Canned {
            calls: AtomicUsize::new(0),
            results,
        });
        let viewer = Arc::new(Viewer::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let mut app = App::new(backend.clone(), viewer.clone(), tx);
        app.export_dir = dir.path().to_path_buf();
        Harness {
            app,
            rx,
            backend,
            viewer,
            _dir: dir,
            pdf,
        }
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.update(Action::Input(c));
        }
    }

    #[tokio::test]
    async fn typing_and_enter_select_the_file() {
        let mut h = harness(vec![]);
        type_text(&mut h.app, &h.pdf.display().to_string());
        h.app.update(Action::DrillIn);

        let selected = h.app.form.state().selected_file.as_ref().unwrap();
        assert_eq!(selected.name, "paper.pdf");
        assert_eq!(h.app.inputs.focus, FormField::Query);
    }

    #[tokio::test]
    async fn submit_without_query_never_calls_backend() {
        let mut h = harness(vec![sky()]);
        h.app.prefill(Some(h.pdf.as_path()), None);
        h.app.update(Action::Submit);

        assert_eq!(
            h.app.form.state().error_message.as_deref(),
            Some("Please enter some text to search for")
        );
        assert!(!h.app.form.state().is_loading);
        tokio::task::yield_now().await;
        assert_eq!(h.backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn completed_submission_shows_results() {
        let mut h = harness(vec![sky()]);
        h.app.prefill(Some(h.pdf.as_path()), Some("blue sky"));
        h.app.update(Action::Submit);
        assert!(h.app.form.state().is_loading);

        // Second press while in flight is ignored.
        h.app.update(Action::Submit);

        let event = h.rx.recv().await.unwrap();
        h.app.handle_backend_event(event);

        assert_eq!(h.app.screen, Screen::Results);
        assert_eq!(h.app.form.state().phase, FormPhase::Success);
        assert_eq!(h.app.selected_result().unwrap().page, 3);
        assert_eq!(h.backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_results_stay_on_form_with_notice() {
        let mut h = harness(vec![]);
        h.app.prefill(Some(h.pdf.as_path()), Some("nothing"));
        h.app.update(Action::Submit);
        let event = h.rx.recv().await.unwrap();
        h.app.handle_backend_event(event);

        assert_eq!(h.app.screen, Screen::Form);
        assert!(h.app.form.state().error_message.is_none());
        assert_eq!(
            h.app.form.state().notice.as_deref(),
            Some("No matching quotes found")
        );
    }

    #[tokio::test]
    async fn open_in_viewer_passes_page_and_quote() {
        let mut h = harness(vec![sky()]);
        h.app.prefill(Some(h.pdf.as_path()), Some("blue sky"));
        h.app.update(Action::Submit);
        let event = h.rx.recv().await.unwrap();
        h.app.handle_backend_event(event);

        h.app.update(Action::OpenInViewer);
        let event = h.rx.recv().await.unwrap();
        h.app.handle_backend_event(event);

        let requests = h.viewer.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1, 3);
        assert_eq!(requests[0].2, "The sky is blue and vast");
        assert_eq!(h.app.status.as_deref(), Some("Opened page 3 in viewer"));
    }

    #[tokio::test]
    async fn export_writes_next_to_export_dir() {
        let mut h = harness(vec![sky()]);
        h.app.prefill(Some(h.pdf.as_path()), Some("blue sky"));
        h.app.update(Action::Submit);
        let event = h.rx.recv().await.unwrap();
        h.app.handle_backend_event(event);

        h.app.export_format = ExportFormat::Markdown;
        h.app.update(Action::Export);
        let path = h.app.export_path();
        assert!(path.ends_with("paper-citations.md"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("**sky**"));
    }

    #[tokio::test]
    async fn escape_toggles_between_screens() {
        let mut h = harness(vec![sky()]);
        h.app.prefill(Some(h.pdf.as_path()), Some("blue sky"));
        h.app.update(Action::Submit);
        let event = h.rx.recv().await.unwrap();
        h.app.handle_backend_event(event);

        h.app.update(Action::NavigateBack);
        assert_eq!(h.app.screen, Screen::Form);
        assert_eq!(h.app.input_mode(), InputMode::TextInput);
        h.app.update(Action::NavigateBack);
        assert_eq!(h.app.screen, Screen::Results);
        assert_eq!(h.app.input_mode(), InputMode::Normal);
    }

    #[tokio::test]
    async fn rejected_typed_path_blocks_submit() {
        let mut h = harness(vec![sky()]);
        h.app.prefill(Some(h.pdf.as_path()), Some("sky"));
        let notes = h._dir.path().join("notes.txt");
        std::fs::write(&notes, b"plain text").unwrap();
        h.app.inputs.file_input = notes.display().to_string();

        h.app.update(Action::Submit);

        let state = h.app.form.state();
        assert!(!state.is_loading);
        assert!(state.error_message.as_deref().unwrap().starts_with("Only PDF files are supported"));
        tokio::task::yield_now().await;
        assert_eq!(h.backend.calls.load(Ordering::SeqCst), 0);
        assert!(h.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn clear_file_resets_selection() {
        let mut h = harness(vec![]);
        h.app.prefill(Some(h.pdf.as_path()), Some("q"));
        h.app.update(Action::ClearFile);
        assert!(h.app.form.state().selected_file.is_none());
        assert!(h.app.inputs.file_input.is_empty());
        assert_eq!(h.app.inputs.focus, FormField::File);
    }
}
