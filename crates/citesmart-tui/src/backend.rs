use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use citesmart_core::{CitationBackend, PdfReference, PendingSubmission, ViewerBridge};

use crate::tui_event::BackendEvent;

/// Send a submission to the backend in the background and report back.
///
/// The completion is always delivered, even on failure; the form decides
/// whether it still applies.
pub fn spawn_submission(
    pending: PendingSubmission,
    backend: Arc<dyn CitationBackend>,
    tx: mpsc::UnboundedSender<BackendEvent>,
) {
    tokio::spawn(async move {
        let ticket = pending.ticket();
        debug!(ticket, "submission started");
        let completion = pending.send(backend.as_ref()).await;
        if let Err(e) = &completion.result {
            warn!(ticket, "submission failed: {e}");
        }
        let _ = tx.send(BackendEvent::SubmissionComplete(completion));
    });
}

/// Open the viewer on `page` with `quote` highlighted, in the background.
pub fn spawn_viewer(
    pdf: PdfReference,
    page: u32,
    quote: String,
    viewer: Arc<dyn ViewerBridge>,
    tx: mpsc::UnboundedSender<BackendEvent>,
) {
    tokio::spawn(async move {
        let event = match viewer.request_highlight(&pdf, page, &quote).await {
            Ok(()) => BackendEvent::ViewerOpened { page },
            Err(e) => {
                warn!("viewer: {e}");
                BackendEvent::ViewerFailed {
                    error: e.to_string(),
                }
            }
        };
        let _ = tx.send(event);
    });
}
