//! Tempo TUI - terminal render surface for the pacing engine.
//!
//! Draws the selected conversation with paced reveal, citations, the work
//! step panel and a log panel, and follows growing content the way a chat
//! view should.

pub mod app;
pub mod events;
pub mod input;
pub mod logs;
pub mod ui;

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use std::io::{self, Stdout};
use std::panic;
use tempo_engine::{ChatEngine, EngineConfig};

pub use app::App;
pub use logs::{LogBuffer, LogEntry, TuiLogLayer};

/// Terminal type alias for convenience.
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Initialize the terminal for TUI mode.
pub fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    Ok(terminal)
}

/// Restore the terminal to normal mode.
pub fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Install a panic hook that restores the terminal before panicking.
pub fn install_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));
}

/// Configuration for running the TUI.
#[derive(Debug, Clone, Default)]
pub struct TuiConfig {
    pub engine: EngineConfig,
    /// Buffer the caller's [`TuiLogLayer`] writes into.
    pub log_buffer: LogBuffer,
}

impl TuiConfig {
    /// Create a config with a fresh log buffer.
    pub fn new(engine: EngineConfig) -> Self {
        Self {
            engine,
            log_buffer: LogBuffer::new(),
        }
    }

    /// Use an existing log buffer.
    pub fn with_log_buffer(mut self, log_buffer: LogBuffer) -> Self {
        self.log_buffer = log_buffer;
        self
    }
}

/// Run the TUI with the scripted responder.
///
/// Tracing must already be routed to `config.log_buffer`; anything written
/// to stdout would corrupt the screen.
pub async fn run_with_config(config: TuiConfig) -> Result<()> {
    install_panic_hook();

    let engine = ChatEngine::with_scripted_responder(config.engine);
    let mut app = App::new(engine, config.log_buffer);

    let mut terminal = init_terminal()?;
    tracing::info!("TUI started");
    let result = app.run(&mut terminal).await;
    restore_terminal(&mut terminal)?;

    result
}
