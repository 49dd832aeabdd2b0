use ratatui::style::Style;
use ratatui::text::{Line, Span};

use citesmart_core::segments;

pub mod form;
pub mod help;
pub mod results;

/// Spinner frames for animated progress indication.
const SPINNER_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Get the current spinner character based on a tick counter.
pub fn spinner_char(tick: usize) -> char {
    SPINNER_FRAMES[tick % SPINNER_FRAMES.len()]
}

/// Truncate a string to fit in `max_width` columns, appending "…" if truncated.
pub fn truncate(s: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if s.chars().count() <= max_width {
        return s.to_string();
    }
    let mut truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

/// Quote text as styled lines, with every occurrence of a highlighted term
/// in `mark`. Newlines in the quote start new lines.
pub fn quote_lines<'a>(text: &'a str, terms: &[String], base: Style, mark: Style) -> Vec<Line<'a>> {
    let mut lines = Vec::new();
    let mut current: Vec<Span<'a>> = Vec::new();
    for seg in segments(text, terms) {
        let style = if seg.highlighted { mark } else { base };
        let mut parts = seg.text.split('\n');
        if let Some(first) = parts.next() {
            if !first.is_empty() {
                current.push(Span::styled(first, style));
            }
        }
        for part in parts {
            lines.push(Line::from(std::mem::take(&mut current)));
            if !part.is_empty() {
                current.push(Span::styled(part, style));
            }
        }
    }
    lines.push(Line::from(current));
    lines
}

#[cfg(test)]
mod tests {
    use ratatui::style::Color;

    use super::*;

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("café au lait", 20), "café au lait");
        assert_eq!(truncate("café au lait", 5), "café…");
        assert_eq!(truncate("abc", 0), "");
    }

    #[test]
    fn quote_lines_mark_terms() {
        let mark = Style::default().bg(Color::Yellow);
        let terms = vec!["sky".to_string(), "vast".to_string()];
        let lines = quote_lines("The sky is blue and vast", &terms, Style::default(), mark);
        assert_eq!(lines.len(), 1);
        let spans: Vec<(&str, bool)> = lines[0]
            .spans
            .iter()
            .map(|s| (s.content.as_ref(), s.style == mark))
            .collect();
        assert_eq!(
            spans,
            vec![
                ("The ", false),
                ("sky", true),
                (" is blue and ", false),
                ("vast", true),
            ]
        );
    }

    #[test]
    fn quote_lines_split_on_newline() {
        let lines = quote_lines("first line\nsecond", &[], Style::default(), Style::default());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].spans[0].content, "second");
    }
}
