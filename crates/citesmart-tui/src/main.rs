use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use ratatui::Terminal;
use ratatui::crossterm::event;
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::CrosstermBackend;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use citesmart_core::{Config, ConfigOverrides, HttpBackend, PdfJsBridge};
use citesmart_reporting::ExportFormat;

mod action;
mod app;
mod backend;
mod clipboard;
mod input;
mod model;
mod theme;
mod tui_event;
mod view;

use app::App;

/// CiteSmart TUI: find citable quotes for a piece of text inside a PDF.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// PDF to search (can also be typed into the form)
    pdf_path: Option<PathBuf>,

    /// Text to find references for
    #[arg(long, short = 't')]
    text: Option<String>,

    /// Backend endpoint that accepts the upload
    #[arg(long, env = "CITESMART_API_URL")]
    api_url: Option<String>,

    /// pdf.js viewer used for "View in PDF"
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

    /// Format written by the export key
    #[arg(long, default_value = "html")]
    export_format: ExportFormat,

    /// Write logs here; the TUI owns the terminal so nothing is logged otherwise
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_logging(log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(args.log_file.as_ref())?;

    // CLI flags and env vars > config file > defaults
    let overrides = ConfigOverrides {
        api_url: args.api_url,
        viewer_url: args.viewer_url,
        timeout_secs: args.timeout,
        settle_ms: args.settle_ms,
    };
    let config = Config::load(overrides, args.config.as_deref())?;
    tracing::info!(api_url = %config.api_url, "starting");

    let backend = Arc::new(HttpBackend::from_config(&config)?);
    let viewer = Arc::new(PdfJsBridge::from_config(&config));

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    // Install panic hook that restores terminal before printing panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let term_backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(term_backend)?;

    // Drain any stray input events (e.g. Enter keypress from launching the command)
    while event::poll(Duration::from_millis(50)).unwrap_or(false) {
        let _ = event::read();
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut app = App::new(backend, viewer, tx);
    app.export_format = args.export_format;
    app.prefill(args.pdf_path.as_deref(), args.text.as_deref());

    // Also handle Ctrl+C at the OS level for clean shutdown
    let cancel = CancellationToken::new();
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_for_signal.cancel();
        }
    });

    // Main event loop
    let tick_rate = Duration::from_millis(100);

    loop {
        terminal.draw(|f| app.view(f))?;

        let mode = app.input_mode();
        tokio::select! {
            Some(backend_event) = rx.recv() => {
                app.handle_backend_event(backend_event);
                // Drain any additional queued backend events
                while let Ok(evt) = rx.try_recv() {
                    app.handle_backend_event(evt);
                }
            }
            _ = cancel.cancelled() => {
                app.should_quit = true;
            }
            // Terminal input events
            maybe_action = async {
                if event::poll(tick_rate).unwrap_or(false) {
                    event::read().ok().map(|evt| input::map_event(&evt, mode))
                } else {
                    None
                }
            } => {
                if let Some(action) = maybe_action {
                    app.update(action);
                }
            }
        }

        app.update(action::Action::Tick);

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    Ok(())
}
