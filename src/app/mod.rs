//! Application wiring
//!
//! Ties together the configuration, the TUI, and the session (engine +
//! transport), and hosts the main event loop.

mod event_loop;
mod state;
mod view;

pub use state::{AppState, UiMode};

use anyhow::{Context, Result};

use crate::config::Config;
use crate::session::{PtyTransport, Session};
use crate::tui::Tui;

/// Main application struct
pub struct App {
    pub config: Config,
    pub tui: Tui,
    pub session: Session<PtyTransport>,
    pub state: AppState,
}

impl App {
    /// Create a new application instance: load config, spawn the local
    /// shell, and stand up the engine.
    pub fn new() -> Result<Self> {
        let config = Config::load()?;
        let tui = Tui::new()?;
        let transport = PtyTransport::spawn(&config.shell, 24, 80)
            .with_context(|| format!("Failed to spawn shell {}", config.shell))?;
        let session = Session::new(&config, transport);
        Ok(Self {
            config,
            tui,
            session,
            state: AppState::new(),
        })
    }

    /// Run the main application loop
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!(
            "Retroterm starting with {} emulation",
            self.session.emulation().label()
        );
        self.tui.enter()?;
        let result = event_loop::run(self).await;
        self.tui.exit()?;
        self.session.transport_mut().shutdown();
        result
    }

    /// Draw one frame
    pub fn draw(&mut self) -> Result<()> {
        let session = &mut self.session;
        let state = &mut self.state;
        self.tui.draw(|frame| view::render(frame, session, state))
    }
}
