use citesmart_core::Completion;

/// Events flowing from spawned tasks back to the TUI loop.
#[derive(Debug)]
pub enum BackendEvent {
    /// The backend call for a submission finished, one way or another.
    SubmissionComplete(Completion),
    /// The viewer was launched for a result on `page`.
    ViewerOpened { page: u32 },
    /// The viewer could not be launched.
    ViewerFailed { error: String },
}
