//! TCATALOG - Terminal Product Catalog
//!
//! A terminal-based catalog manager for categories, tags, products and their
//! technical details, with validated forms, cascade deletes, price reports,
//! JSON persistence and CSV export.

use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use tcatalog::application::{App, AppConfig, AppMode, CatalogService};
use tcatalog::infrastructure::{CatalogStore, FileRepository};
use tcatalog::presentation::{render_ui, InputHandler};

/// Entry point for the tcatalog terminal application.
///
/// Parses the command line, sets up file logging, loads the catalog,
/// and runs the main event loop until the user quits.
///
/// # Errors
///
/// Returns an error if the log file or catalog file cannot be opened, or if
/// terminal setup fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::parse();
    init_logging(&config)?;

    let catalog = FileRepository::load_or_default(&config.data)?;
    let mut store = CatalogStore::new(catalog);
    if config.autosave() && !config.read_only {
        store = store.with_autosave(&config.data);
    }
    let service = CatalogService::new(store, !config.read_only);
    info!(
        data = %config.data.display(),
        autosave = config.autosave(),
        read_only = config.read_only,
        "tcatalog started"
    );

    let mut app = App::new(
        service,
        config.report_settings(),
        Some(config.data.display().to_string()),
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }
    info!("tcatalog stopped");

    Ok(())
}

/// Sends tracing output to the configured log file; the terminal belongs to
/// the interface. `RUST_LOG` overrides the `-v` level.
fn init_logging(config: &AppConfig) -> io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(config.verbose >= 2)
        .init();

    debug!("tcatalog started with verbosity level: {}", config.verbose);
    Ok(())
}

/// Main application event loop.
///
/// Handles terminal rendering and keyboard input processing.
/// Continues running until the user presses 'q' in normal mode.
///
/// # Arguments
///
/// * `terminal` - Terminal interface for rendering
/// * `app` - Mutable reference to application state
///
/// # Errors
///
/// Returns an IO error if terminal operations fail.
fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| render_ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                match key.code {
                    KeyCode::Char('q') if matches!(app.mode, AppMode::Normal) => return Ok(()),
                    _ => InputHandler::handle_key_event(app, key.code, key.modifiers),
                }
            }
        }
    }
}
