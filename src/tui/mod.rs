//! Terminal UI module
//!
//! Terminal setup/teardown and the Ratatui view that carries the
//! engine's visible window to the screen.

pub mod view;

pub use view::{draw, BufferRenderer, StatusLine};

use anyhow::Result;
use crossterm::{
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use std::io::{self, stdout};

/// Terminal UI wrapper
///
/// Handles terminal setup, teardown, and provides the rendering surface.
pub struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    entered: bool,
}

/// Error handler for terminal cleanup operations, used during both
/// normal exit and panic/drop scenarios
enum ErrorHandler {
    /// Log errors via tracing (normal exit)
    Tracing,
    /// Print errors to stderr (panic/drop, tracing may be unavailable)
    Stderr,
}

impl ErrorHandler {
    fn handle(&self, context: &str, error: impl std::fmt::Display) {
        match self {
            ErrorHandler::Tracing => tracing::warn!("{}: {}", context, error),
            ErrorHandler::Stderr => eprintln!("TUI teardown: {}: {}", context, error),
        }
    }
}

/// Best-effort terminal restore, callable from a panic hook
pub fn restore_terminal() {
    let handler = ErrorHandler::Stderr;
    if let Err(e) = stdout().execute(LeaveAlternateScreen) {
        handler.handle("failed to leave alternate screen", e);
    }
    if let Err(e) = disable_raw_mode() {
        handler.handle("failed to disable raw mode", e);
    }
}

impl Tui {
    /// Create a new TUI instance
    pub fn new() -> Result<Self> {
        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;
        Ok(Self {
            terminal,
            entered: false,
        })
    }

    /// Enter TUI mode (raw mode + alternate screen)
    pub fn enter(&mut self) -> Result<()> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;
        self.terminal.hide_cursor()?;
        self.terminal.clear()?;
        self.entered = true;

        // A panic mid-session must not leave the user's terminal raw.
        let default_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            restore_terminal();
            default_hook(info);
        }));
        Ok(())
    }

    /// Exit TUI mode (restore terminal)
    pub fn exit(&mut self) -> Result<()> {
        if !self.entered {
            return Ok(());
        }
        tracing::debug!("Starting TUI exit sequence");
        self.terminal.show_cursor()?;
        stdout().execute(LeaveAlternateScreen)?;
        disable_raw_mode()?;
        self.entered = false;
        tracing::debug!("TUI exit sequence completed");
        Ok(())
    }

    /// Get terminal size
    pub fn size(&self) -> Result<Rect> {
        Ok(self.terminal.size()?)
    }

    /// Draw one frame
    pub fn draw<F>(&mut self, render: F) -> Result<()>
    where
        F: FnOnce(&mut Frame),
    {
        self.terminal.draw(render)?;
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        if self.entered {
            let handler = ErrorHandler::Stderr;
            if let Err(e) = self.exit() {
                handler.handle("failed to restore terminal", e);
            }
        }
    }
}
