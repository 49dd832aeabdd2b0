use std::fmt::Write as _;
use std::path::Path;

use thiserror::Error;

use citesmart_core::CitationResult;
use citesmart_core::highlight::segments;

use crate::types::{ExportFormat, Report, metadata_fields};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Render a report in the given format.
pub fn render(report: &Report<'_>, format: ExportFormat) -> Result<String, ExportError> {
    Ok(match format {
        ExportFormat::Json => serde_json::to_string_pretty(report)?,
        ExportFormat::Markdown => render_markdown(report),
        ExportFormat::Html => render_html(report),
        ExportFormat::Text => render_text(report),
    })
}

/// Render a report and write it to `path`.
pub fn export_results(
    report: &Report<'_>,
    format: ExportFormat,
    path: &Path,
) -> Result<(), ExportError> {
    let content = render(report, format)?;
    std::fs::write(path, content).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn render_text(report: &Report<'_>) -> String {
    let mut out = String::new();
    if let Some(doc) = report.document {
        let _ = writeln!(out, "Document: {doc}");
    }
    let _ = writeln!(out, "Query: {}", report.query);
    if let Some(meta) = report.metadata {
        for (label, value) in metadata_fields(meta) {
            let _ = writeln!(out, "{label}: {value}");
        }
    }
    out.push('\n');

    if report.results.is_empty() {
        let _ = writeln!(out, "{}", notice_or_default(report));
        return out;
    }

    for (i, r) in report.results.iter().enumerate() {
        let quote: String = segments(&r.quote, &r.highlighted_terms)
            .iter()
            .map(|s| {
                if s.highlighted {
                    format!("[{}]", s.text)
                } else {
                    s.text.to_string()
                }
            })
            .collect();
        let _ = writeln!(out, "{}. {quote}", i + 1);
        let _ = writeln!(out, "   Page {}  {}", r.page, r.citation);
        out.push('\n');
    }
    out
}

fn render_markdown(report: &Report<'_>) -> String {
    let mut out = String::from("# Found References\n\n");
    if let Some(doc) = report.document {
        let _ = writeln!(out, "- **Document:** {}", md_escape(doc));
    }
    let _ = writeln!(out, "- **Query:** {}", md_escape(report.query));
    if let Some(meta) = report.metadata {
        for (label, value) in metadata_fields(meta) {
            let _ = writeln!(out, "- **{label}:** {}", md_escape(&value));
        }
    }
    out.push('\n');

    if report.results.is_empty() {
        let _ = writeln!(out, "_{}_", md_escape(notice_or_default(report)));
        return out;
    }

    for r in report.results {
        let quote: String = segments(&r.quote, &r.highlighted_terms)
            .iter()
            .map(|s| {
                let text = md_escape(s.text);
                if s.highlighted {
                    format!("**{text}**")
                } else {
                    text
                }
            })
            .collect();
        let _ = writeln!(out, "> {}", quote.replace('\n', "\n> "));
        let _ = writeln!(out, ">");
        let _ = writeln!(out, "> Page {} · {}", r.page, md_escape(&r.citation));
        out.push('\n');
    }
    out
}

fn render_html(report: &Report<'_>) -> String {
    let mut out = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Found References</title>\n</head>\n<body>\n<h1>Found References</h1>\n",
    );

    out.push_str("<dl class=\"summary\">\n");
    if let Some(doc) = report.document {
        let _ = writeln!(out, "<dt>Document</dt><dd>{}</dd>", esc(doc));
    }
    let _ = writeln!(out, "<dt>Query</dt><dd>{}</dd>", esc(report.query));
    if let Some(meta) = report.metadata {
        for (label, value) in metadata_fields(meta) {
            let _ = writeln!(out, "<dt>{label}</dt><dd>{}</dd>", esc(&value));
        }
    }
    out.push_str("</dl>\n");

    if report.results.is_empty() {
        let _ = writeln!(
            out,
            "<p class=\"notice\">{}</p>",
            esc(notice_or_default(report))
        );
    } else {
        for r in report.results {
            out.push_str(&html_card(r));
        }
    }

    out.push_str("</body>\n</html>\n");
    out
}

/// One result as an HTML card, highlighted terms wrapped in `<mark>`.
pub fn html_card(result: &CitationResult) -> String {
    let quote: String = segments(&result.quote, &result.highlighted_terms)
        .iter()
        .map(|s| {
            if s.highlighted {
                format!("<mark>{}</mark>", esc(s.text))
            } else {
                esc(s.text)
            }
        })
        .collect();
    format!(
        "<div class=\"citation\">\n<p class=\"quote\">{quote}</p>\n\
         <p class=\"meta\"><span class=\"page\">Page {}</span> \
         <span class=\"citation-string\">{}</span></p>\n</div>\n",
        result.page,
        esc(&result.citation)
    )
}

fn notice_or_default<'a>(report: &Report<'a>) -> &'a str {
    report
        .notice
        .unwrap_or(citesmart_core::session::NO_MATCHES)
}

fn esc(s: &str) -> String {
    html_escape::encode_text(s).into_owned()
}

fn md_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '*' | '_' | '`' | '[' | ']' | '<' | '>') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
