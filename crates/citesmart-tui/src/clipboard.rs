use std::io::Write;

use base64::Engine;

/// OSC 52 escape sequence that asks the terminal to set the clipboard.
pub fn osc52_sequence(text: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(text);
    format!("\x1b]52;c;{encoded}\x07")
}

/// Copy `text` to the system clipboard through the terminal.
///
/// Works over SSH and inside tmux when the terminal allows OSC 52.
pub fn copy(text: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(osc52_sequence(text).as_bytes())?;
    stdout.flush()
}
