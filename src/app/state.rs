//! Application state management
//!
//! The UI-side state: which mode the program is in (console, scrollback
//! view, or one of the dialogs), the dialog fields, and the transient
//! notification line.

use std::time::{Duration, Instant};

use crate::field::TextField;

/// How long a transient notice stays on the status line
const NOTICE_DURATION: Duration = Duration::from_secs(3);

/// The top-level UI modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiMode {
    /// Live console: keystrokes go to the remote
    #[default]
    Console,
    /// Paging through scrollback history
    ScrollbackView,
    /// Entering a search string (from scrollback view)
    SearchDialog,
    /// Entering a dump filename
    SaveDialog,
}

/// UI state carried across event-loop iterations
pub struct AppState {
    pub mode: UiMode,
    pub search_field: TextField,
    pub save_field: TextField,
    /// Last search string, for find-again
    pub last_search: String,
    notice: Option<(String, Instant)>,
    pub quit: bool,
    /// Force a redraw even when the engine is clean
    pub redraw: bool,
}

impl AppState {
    pub fn new() -> Self {
        use crate::term::attr::{CellAttr, BLACK, WHITE};
        let dialog_color = CellAttr::new(BLACK, WHITE);
        let mut search_field = TextField::new(40, false);
        search_field.color_active = dialog_color;
        let mut save_field = TextField::new(60, false);
        save_field.color_active = dialog_color;
        Self {
            mode: UiMode::default(),
            search_field,
            save_field,
            last_search: String::new(),
            notice: None,
            quit: false,
            redraw: true,
        }
    }

    pub fn in_scrollback(&self) -> bool {
        matches!(
            self.mode,
            UiMode::ScrollbackView | UiMode::SearchDialog | UiMode::SaveDialog
        )
    }

    /// Show a transient message on the status line
    pub fn notify(&mut self, message: impl Into<String>) {
        self.notice = Some((message.into(), Instant::now()));
        self.redraw = true;
    }

    /// Current notice if it has not expired
    pub fn notice(&mut self) -> Option<&str> {
        let expired = matches!(&self.notice, Some((_, at)) if at.elapsed() > NOTICE_DURATION);
        if expired {
            self.notice = None;
            self.redraw = true;
        }
        self.notice.as_ref().map(|(text, _)| text.as_str())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mode_is_console() {
        let state = AppState::new();
        assert_eq!(state.mode, UiMode::Console);
        assert!(!state.in_scrollback());
    }

    #[test]
    fn test_dialogs_count_as_scrollback_state() {
        let mut state = AppState::new();
        state.mode = UiMode::SearchDialog;
        assert!(state.in_scrollback());
    }

    #[test]
    fn test_notice_expires() {
        let mut state = AppState::new();
        assert!(state.notice().is_none());
        state.notify("saved");
        assert_eq!(state.notice(), Some("saved"));
        state.notice = Some(("old".into(), Instant::now() - Duration::from_secs(10)));
        assert!(state.notice().is_none());
    }
}
