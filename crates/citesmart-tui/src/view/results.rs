use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap};

use citesmart_reporting::metadata_fields;

use crate::app::App;
use crate::view::{quote_lines, truncate};

/// Render the results screen: document metadata, the list of quotes and the
/// selected quote in full.
pub fn render(f: &mut Frame, app: &App) {
    let area = f.area();
    let state = app.form.state();
    let meta_rows = state
        .metadata
        .as_ref()
        .map_or(0, |m| metadata_fields(m).len() as u16 + 2);

    let chunks = Layout::vertical([
        Constraint::Length(1),         // breadcrumb
        Constraint::Length(meta_rows), // metadata
        Constraint::Percentage(40),    // list
        Constraint::Min(5),            // detail
        Constraint::Length(1),         // footer
    ])
    .split(area);

    render_breadcrumb(f, chunks[0], app);
    render_metadata(f, chunks[1], app);
    render_list(f, chunks[2], app);
    render_detail(f, chunks[3], app);
    render_footer(f, chunks[4], app);
}

fn render_breadcrumb(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let state = app.form.state();
    let doc = state
        .selected_file
        .as_ref()
        .map_or("(no file)", |file| file.name.as_str());
    let query = truncate(
        &state.query_text.replace('\n', " "),
        (area.width as usize).saturating_sub(doc.len() + 24),
    );

    let breadcrumb = Line::from(vec![
        Span::styled(" CITESMART ", theme.header_style()),
        Span::styled(" > ", Style::default().fg(theme.dim)),
        Span::styled(doc, Style::default().fg(theme.text).add_modifier(Modifier::BOLD)),
        Span::styled(" > ", Style::default().fg(theme.dim)),
        Span::styled(format!("\"{query}\""), Style::default().fg(theme.text)),
    ]);
    f.render_widget(Paragraph::new(breadcrumb), area);
}

fn render_metadata(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let Some(meta) = &app.form.state().metadata else {
        return;
    };
    let lines: Vec<Line> = metadata_fields(meta)
        .into_iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(format!("  {label:<11}"), Style::default().fg(theme.dim)),
                Span::styled(value, Style::default().fg(theme.text)),
            ])
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_style())
        .title(" Document ");
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_list(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let results = &app.form.state().results;
    let quote_width = (area.width as usize).saturating_sub(40);

    let header = Row::new(
        ["#", "Page", "Quote", "Citation"]
            .iter()
            .map(|h| Cell::from(*h).style(Style::default().fg(theme.text).add_modifier(Modifier::BOLD))),
    )
    .height(1);

    let rows: Vec<Row> = results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            Row::new(vec![
                Cell::from(format!("{}", i + 1)),
                Cell::from(format!("{}", r.page)).style(Style::default().fg(theme.active)),
                Cell::from(truncate(&r.quote.replace('\n', " "), quote_width)),
                Cell::from(r.citation.as_str()).style(Style::default().fg(theme.dim)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Length(5),
        Constraint::Min(20),
        Constraint::Length(28),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border_style())
                .title(format!(" Found References ({}) ", results.len())),
        )
        .row_highlight_style(theme.highlight_style());

    let mut table_state = TableState::default();
    table_state.select(Some(app.result_cursor));
    f.render_stateful_widget(table, area, &mut table_state);
}

fn render_detail(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let Some(result) = app.selected_result() else {
        return;
    };

    let mut lines = quote_lines(
        &result.quote,
        &result.highlighted_terms,
        Style::default().fg(theme.text),
        theme.mark_style(),
    );
    lines.push(Line::from(""));
    let mut meta = vec![
        Span::styled(
            format!("Page {}", result.page),
            Style::default().fg(theme.active).add_modifier(Modifier::BOLD),
        ),
        Span::styled("  ", Style::default()),
        Span::styled(result.citation.as_str(), Style::default().fg(theme.text)),
    ];
    if let Some(relevance) = result.relevance {
        meta.push(Span::styled(
            format!("  relevance {relevance:.2}"),
            Style::default().fg(theme.dim),
        ));
    }
    lines.push(Line::from(meta));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_style())
        .title(format!(" #{} ", app.result_cursor + 1));
    f.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((app.detail_scroll, 0)),
        area,
    );
}

fn render_footer(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let mut spans = Vec::new();
    if let Some(status) = &app.status {
        spans.push(Span::styled(format!(" {status} "), Style::default().fg(theme.notice)));
        spans.push(Span::styled("|", theme.footer_style()));
    }
    spans.push(Span::styled(
        format!(
            " j/k:nav  Enter/v:view in PDF  c:copy citation  e:export {}  /:edit  ?:help  q:quit",
            app.export_format.extension()
        ),
        theme.footer_style(),
    ));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
