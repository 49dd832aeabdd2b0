use ratatui::crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::action::Action;

/// How keystrokes are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Single-key commands (results screen, help overlay).
    Normal,
    /// Printable keys go into the focused form field.
    TextInput,
}

/// Map a crossterm terminal event to a TUI action.
pub fn map_event(event: &Event, mode: InputMode) -> Action {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => match mode {
            InputMode::Normal => map_key(key),
            InputMode::TextInput => map_text_key(key),
        },
        Event::Resize(w, h) => Action::Resize(*w, *h),
        _ => Action::None,
    }
}

fn map_key(key: &KeyEvent) -> Action {
    // Ctrl+C always quits
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Action::Quit;
    }

    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char('j') | KeyCode::Down => Action::MoveDown,
        KeyCode::Char('k') | KeyCode::Up => Action::MoveUp,
        KeyCode::Enter => Action::DrillIn,
        KeyCode::Esc => Action::NavigateBack,
        KeyCode::Char('g') => Action::GoTop,
        KeyCode::Char('G') => Action::GoBottom,
        KeyCode::Char('?') | KeyCode::F(1) => Action::ToggleHelp,
        KeyCode::Char('v') | KeyCode::Char('o') => Action::OpenInViewer,
        KeyCode::Char('c') | KeyCode::Char('y') => Action::CopyCitation,
        KeyCode::Char('e') => Action::Export,
        KeyCode::Char('/') | KeyCode::Char('n') => Action::EditForm,
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::PageDown,
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::Home => Action::GoTop,
        KeyCode::End => Action::GoBottom,
        _ => Action::None,
    }
}

fn map_text_key(key: &KeyEvent) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') => Action::Quit,
            KeyCode::Char('s') => Action::Submit,
            KeyCode::Char('x') => Action::ClearFile,
            _ => Action::None,
        };
    }

    match key.code {
        KeyCode::Tab | KeyCode::Down => Action::NextField,
        KeyCode::BackTab | KeyCode::Up => Action::PrevField,
        KeyCode::Enter => Action::DrillIn,
        KeyCode::Esc => Action::NavigateBack,
        KeyCode::Backspace => Action::Backspace,
        KeyCode::F(1) => Action::ToggleHelp,
        KeyCode::F(5) => Action::Submit,
        KeyCode::Char(c) => Action::Input(c),
        _ => Action::None,
    }
}
