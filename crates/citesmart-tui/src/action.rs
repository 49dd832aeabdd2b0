/// Actions that the TUI can process, mapped from keyboard input or internal events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    NavigateBack,
    DrillIn,
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    GoTop,
    GoBottom,
    ToggleHelp,
    /// Form: move focus to the next/previous field.
    NextField,
    PrevField,
    /// Form: a typed character for the focused field.
    Input(char),
    Backspace,
    Submit,
    ClearFile,
    /// Results: back to the form without clearing anything.
    EditForm,
    OpenInViewer,
    CopyCitation,
    Export,
    Tick,
    Resize(u16, u16),
    None,
}
