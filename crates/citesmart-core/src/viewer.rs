//! "View in PDF": open a viewer on the right page and ask it to find a quote.
//!
//! The pdf.js bridge is best effort. It opens the viewer, waits a settle delay,
//! then pushes a find command into the viewer's browsing context. If that
//! context has no script channel, or the viewer has not finished loading, the
//! command does nothing and nobody is told. The same query also rides in the
//! URL fragment, which pdf.js applies on its own once the document loads.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::Serialize;
use thiserror::Error;

use crate::highlight::collapse_whitespace;
use crate::{Config, PdfReference};

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("failed to launch viewer: {0}")]
    Launch(String),
    #[error("viewer rejected script: {0}")]
    Script(String),
}

/// Arguments of pdf.js's `find` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FindCommand {
    pub query: String,
    pub phrase_search: bool,
    pub case_sensitive: bool,
    pub entire_word: bool,
    pub highlight_all: bool,
    pub find_previous: bool,
}

impl FindCommand {
    /// Exact-phrase, case-sensitive, whole-word search with every hit
    /// highlighted.
    pub fn for_quote(quote: &str) -> Self {
        Self {
            query: collapse_whitespace(quote),
            phrase_search: true,
            case_sensitive: true,
            entire_word: true,
            highlight_all: true,
            find_previous: false,
        }
    }

    /// Script to run inside the viewer's page. Does nothing until pdf.js
    /// reports itself initialized.
    pub fn to_script(&self) -> String {
        let args = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        format!(
            "if (window.PDFViewerApplication && PDFViewerApplication.initialized) {{ \
             PDFViewerApplication.findController.executeCommand('find', {args}); }}"
        )
    }
}

/// `{viewer}?file={pdf}#page={n}`, plus pdf.js's `search`/`phrase` hash
/// parameters when a find command is given.
pub fn viewer_url(
    viewer: &str,
    pdf: &PdfReference,
    page: u32,
    find: Option<&FindCommand>,
) -> String {
    let mut url = format!(
        "{viewer}?file={}#page={page}",
        urlencoding::encode(&pdf.to_viewer_file())
    );
    if let Some(find) = find.filter(|f| !f.query.is_empty()) {
        url.push_str("&search=");
        url.push_str(&urlencoding::encode(&find.query));
        if find.phrase_search {
            url.push_str("&phrase=true");
        }
    }
    url
}

/// A page opened by a [`Launcher`] that accepts scripts.
pub trait BrowsingContext: Send {
    fn run_script(&mut self, script: &str) -> Result<(), ViewerError>;
}

/// Opens URLs in a new browsing context.
pub trait Launcher: Send + Sync {
    /// Open `url`. Returns a scripting handle when the launcher has one.
    fn open(&self, url: &str) -> Result<Option<Box<dyn BrowsingContext>>, ViewerError>;
}

/// Hands the system's default browser the URL. No scripting handle.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn open(&self, url: &str) -> Result<Option<Box<dyn BrowsingContext>>, ViewerError> {
        open_in_browser(url).map_err(ViewerError::Launch)?;
        Ok(None)
    }
}

fn open_in_browser(url: &str) -> Result<(), String> {
    use std::process::{Command, Stdio};

    #[cfg(target_os = "windows")]
    let mut cmd = {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]).arg(url);
        c
    };
    #[cfg(target_os = "macos")]
    let mut cmd = {
        let mut c = Command::new("open");
        c.arg(url);
        c
    };
    #[cfg(all(unix, not(target_os = "macos")))]
    let mut cmd = {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    };

    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Jump to a page and highlight a quote in some PDF viewer.
#[async_trait]
pub trait ViewerBridge: Send + Sync {
    async fn request_highlight(
        &self,
        pdf: &PdfReference,
        page: u32,
        quote: &str,
    ) -> Result<(), ViewerError>;
}

/// The hosted pdf.js viewer.
#[derive(Debug, Clone)]
pub struct PdfJsBridge<L = SystemLauncher> {
    viewer_url: String,
    settle_delay: Duration,
    launcher: L,
}

impl<L: Launcher> PdfJsBridge<L> {
    pub fn new(viewer_url: impl Into<String>, settle_delay: Duration, launcher: L) -> Self {
        Self {
            viewer_url: viewer_url.into(),
            settle_delay,
            launcher,
        }
    }

    /// The URL that would be opened for this quote.
    pub fn url_for(&self, pdf: &PdfReference, page: u32, quote: &str) -> String {
        viewer_url(
            &self.viewer_url,
            pdf,
            page,
            Some(&FindCommand::for_quote(quote)),
        )
    }
}

impl PdfJsBridge<SystemLauncher> {
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.viewer_url.clone(), config.settle_delay, SystemLauncher)
    }
}

#[async_trait]
impl<L: Launcher> ViewerBridge for PdfJsBridge<L> {
    async fn request_highlight(
        &self,
        pdf: &PdfReference,
        page: u32,
        quote: &str,
    ) -> Result<(), ViewerError> {
        let find = FindCommand::for_quote(quote);
        let url = viewer_url(&self.viewer_url, pdf, page.max(1), Some(&find));
        debug!("opening viewer at {url}");

        let Some(mut context) = self.launcher.open(&url)? else {
            return Ok(());
        };

        tokio::time::sleep(self.settle_delay).await;
        if let Err(e) = context.run_script(&find.to_script()) {
            debug!("find command had no effect: {e}");
        }
        Ok(())
    }
}
