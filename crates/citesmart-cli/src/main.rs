use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::{OwoColorize, Stream};
use tracing_subscriber::EnvFilter;

use citesmart_core::{
    CitationResult, Config, ConfigOverrides, FormController, HttpBackend, PdfJsBridge,
    SessionState, ViewerBridge, segments,
};
use citesmart_reporting::{ExportFormat, Report, export_results, metadata_fields, render};

/// CiteSmart - find citable quotes for a piece of text inside a PDF
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the PDF file to search
    pdf_path: PathBuf,

    /// Text to find references for
    #[arg(required_unless_present = "text_flag")]
    text: Option<String>,

    /// Text to find references for (alternative to the positional argument)
    #[arg(long = "text", short = 't', id = "text_flag", conflicts_with = "text")]
    text_flag: Option<String>,

    /// Backend endpoint that accepts the upload
    #[arg(long, env = "CITESMART_API_URL")]
    api_url: Option<String>,

    /// pdf.js viewer used by --open
    #[arg(long, env = "CITESMART_VIEWER_URL")]
    viewer_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "CITESMART_TIMEOUT")]
    timeout: Option<u64>,

    /// Delay before the find command is sent to the viewer, in milliseconds
    #[arg(long, env = "CITESMART_SETTLE_MS")]
    settle_ms: Option<u64>,

    /// Config file (default: <config dir>/citesmart/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print results in this format instead of the colored listing
    #[arg(long, short = 'f')]
    format: Option<ExportFormat>,

    /// Write results to this file (format from --format, else the extension)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Open result N (1-based) in the PDF viewer
    #[arg(long, value_name = "N")]
    open: Option<usize>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if args.no_color {
        owo_colors::set_override(false);
    }

    // CLI flags and env vars > config file > defaults
    let overrides = ConfigOverrides {
        api_url: args.api_url.clone(),
        viewer_url: args.viewer_url.clone(),
        timeout_secs: args.timeout,
        settle_ms: args.settle_ms,
    };
    let config = Config::load(overrides, args.config.as_deref())?;
    tracing::debug!(?config, "resolved configuration");
    let backend = HttpBackend::from_config(&config)?;
    tracing::info!(api_url = backend.api_url(), "backend ready");

    let query = args.text.clone().or(args.text_flag.clone()).unwrap_or_default();

    let mut form = FormController::new();
    if form.select_file(Some(args.pdf_path.as_path())).is_err() {
        fail(form.state());
    }
    form.update_query_text(query);

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(format!("Searching {} ...", args.pdf_path.display()));
    pb.enable_steady_tick(Duration::from_millis(100));
    let applied = form.submit(&backend).await;
    pb.finish_and_clear();

    let state = form.state();
    if !applied || state.error_message.is_some() {
        fail(state);
    }

    let report = Report::from_state(state);
    if let Some(path) = &args.output {
        let format = match args.format {
            Some(f) => f,
            None => format_from_extension(path)?,
        };
        export_results(&report, format, path)?;
        eprintln!(
            "{} Wrote {} results to {}",
            "✓".if_supports_color(Stream::Stderr, |s| s.green()),
            state.results.len(),
            path.display()
        );
    } else if let Some(format) = args.format {
        print!("{}", render(&report, format)?);
    } else {
        print_results(state);
    }

    if let Some(n) = args.open {
        open_result(&config, state, n).await?;
    }

    Ok(())
}

fn fail(state: &SessionState) -> ! {
    let msg = state
        .error_message
        .as_deref()
        .unwrap_or("An error occurred while processing your request");
    eprintln!("{} {msg}", "✗".if_supports_color(Stream::Stderr, |s| s.red()));
    std::process::exit(1);
}

fn format_from_extension(path: &std::path::Path) -> anyhow::Result<ExportFormat> {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        bail!("cannot tell the output format of {}; pass --format", path.display());
    };
    ext.parse().map_err(anyhow::Error::msg)
}

fn print_results(state: &SessionState) {
    if let Some(file) = &state.selected_file {
        println!(
            "{} {}",
            "Document:".if_supports_color(Stream::Stdout, |s| s.dimmed()),
            file.name.if_supports_color(Stream::Stdout, |s| s.bold())
        );
    }
    if let Some(meta) = &state.metadata {
        for (label, value) in metadata_fields(meta) {
            println!(
                "{} {value}",
                format!("{label}:").if_supports_color(Stream::Stdout, |s| s.dimmed())
            );
        }
    }
    println!();

    if state.results.is_empty() {
        let notice = state
            .notice
            .as_deref()
            .unwrap_or(citesmart_core::session::NO_MATCHES);
        println!("{}", notice.if_supports_color(Stream::Stdout, |s| s.yellow()));
        return;
    }

    println!(
        "{}",
        "Found References".if_supports_color(Stream::Stdout, |s| s.bold())
    );
    println!();
    for (i, r) in state.results.iter().enumerate() {
        println!("{:>3}. {}", i + 1, highlighted(r));
        println!(
            "     {}  {}",
            format!("Page {}", r.page).if_supports_color(Stream::Stdout, |s| s.cyan()),
            r.citation.if_supports_color(Stream::Stdout, |s| s.dimmed())
        );
        println!();
    }
}

fn highlighted(result: &CitationResult) -> String {
    segments(&result.quote, &result.highlighted_terms)
        .iter()
        .map(|s| {
            if s.highlighted {
                s.text
                    .if_supports_color(Stream::Stdout, |t| t.black().on_yellow().to_string())
                    .to_string()
            } else {
                s.text.to_string()
            }
        })
        .collect()
}

async fn open_result(config: &Config, state: &SessionState, n: usize) -> anyhow::Result<()> {
    let Some(result) = n.checked_sub(1).and_then(|i| state.results.get(i)) else {
        bail!("no result #{n} (got {})", state.results.len());
    };
    let Some(pdf) = &state.pdf_reference else {
        bail!("no PDF available to open");
    };
    let bridge = PdfJsBridge::from_config(config);
    eprintln!("Opening {}", bridge.url_for(pdf, result.page, &result.quote));
    bridge.request_highlight(pdf, result.page, &result.quote).await?;
    Ok(())
}
