use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use citesmart_core::FormPhase;

use crate::app::App;
use crate::model::form::FormField;
use crate::theme::Theme;
use crate::view::spinner_char;

/// Render the search form: file, query, submit, and the last outcome.
pub fn render(f: &mut Frame, app: &App) {
    let area = f.area();

    let chunks = Layout::vertical([
        Constraint::Length(1), // header
        Constraint::Length(4), // file
        Constraint::Min(5),    // query
        Constraint::Length(3), // submit
        Constraint::Length(3), // banner
        Constraint::Length(1), // footer
    ])
    .split(area);

    render_header(f, chunks[0], app);
    render_file(f, chunks[1], app);
    render_query(f, chunks[2], app);
    render_submit(f, chunks[3], app);
    render_banner(f, chunks[4], app);
    render_footer(f, chunks[5], &app.theme);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let phase = app.form.state().phase;
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" CITESMART ", theme.header_style()),
        Span::styled(" Find References", Style::default().fg(theme.text).add_modifier(Modifier::BOLD)),
        Span::styled("  ", Style::default()),
        Span::styled(phase.label(), Style::default().fg(theme.phase_color(phase))),
    ]));
    f.render_widget(header, area);
}

fn field_block<'a>(title: &'a str, focused: bool, theme: &Theme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(if focused { theme.focus_style() } else { theme.border_style() })
        .title(title)
}

fn cursor<'a>(focused: bool, theme: &Theme) -> Span<'a> {
    if focused {
        Span::styled("▏", Style::default().fg(theme.active))
    } else {
        Span::raw("")
    }
}

fn render_file(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let focused = app.inputs.focus == FormField::File;
    let state = app.form.state();

    let mut lines = vec![Line::from(vec![
        Span::styled(app.inputs.file_input.as_str(), Style::default().fg(theme.text)),
        cursor(focused, theme),
    ])];
    lines.push(match &state.selected_file {
        Some(file) => Line::from(vec![
            Span::styled("Selected: ", Style::default().fg(theme.dim)),
            Span::styled(file.name.as_str(), Style::default().fg(theme.success)),
        ]),
        None => Line::from(Span::styled(
            "Type a path and press Enter",
            Style::default().fg(theme.dim),
        )),
    });

    let block = field_block(" PDF file ", focused, theme);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_query(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let focused = app.inputs.focus == FormField::Query;
    let text = &app.form.state().query_text;

    let mut lines: Vec<Line> = text
        .split('\n')
        .map(|l| Line::from(Span::styled(l, Style::default().fg(theme.text))))
        .collect();
    if let Some(last) = lines.last_mut() {
        last.push_span(cursor(focused, theme));
    }
    if text.is_empty() && !focused {
        lines = vec![Line::from(Span::styled(
            "Paste the text you want to find references for",
            Style::default().fg(theme.dim),
        ))];
    }

    // Keep the end of long text in view.
    let inner_height = area.height.saturating_sub(2) as usize;
    let scroll = lines.len().saturating_sub(inner_height) as u16;

    let block = field_block(" Text to find ", focused, theme);
    f.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0)),
        area,
    );
}

fn render_submit(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let focused = app.inputs.focus == FormField::Submit;
    let state = app.form.state();

    let label = if state.is_loading {
        Span::styled(
            format!(" {} Processing... ", spinner_char(app.tick)),
            Style::default().fg(theme.spinner).add_modifier(Modifier::BOLD),
        )
    } else {
        let style = if focused {
            theme.header_style()
        } else {
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD)
        };
        Span::styled(" Find References ", style)
    };

    let block = field_block("", focused, theme);
    f.render_widget(Paragraph::new(Line::from(label)).block(block), area);
}

fn render_banner(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let state = app.form.state();

    let line = if let Some(err) = &state.error_message {
        Line::from(Span::styled(
            err.as_str(),
            Style::default().fg(theme.error).add_modifier(Modifier::BOLD),
        ))
    } else if let Some(notice) = &state.notice {
        Line::from(Span::styled(notice.as_str(), Style::default().fg(theme.notice)))
    } else if state.phase == FormPhase::Success && !state.results.is_empty() {
        Line::from(Span::styled(
            format!("{} result(s), press Esc to view", state.results.len()),
            Style::default().fg(theme.success),
        ))
    } else {
        Line::from("")
    };

    f.render_widget(
        Paragraph::new(line)
            .block(Block::default().borders(Borders::TOP).border_style(theme.border_style()))
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn render_footer(f: &mut Frame, area: Rect, theme: &Theme) {
    let footer = Line::from(Span::styled(
        " Tab:next field  Enter:confirm  Ctrl+s:submit  Ctrl+x:clear file  Esc:results  F1:help  Ctrl+q:quit",
        theme.footer_style(),
    ));
    f.render_widget(Paragraph::new(footer), area);
}
