//! Frame composition
//!
//! Builds the status line (or the active dialog's prompt row) and hands
//! the engine window to the TUI view.

use ratatui::prelude::*;

use crate::session::{Session, Transport};
use crate::tui::view::{draw as draw_engine, BufferRenderer, StatusLine};

use super::state::{AppState, UiMode};

/// Render one frame: engine window, then status line or dialog row
pub fn render<T: Transport>(frame: &mut Frame, session: &mut Session<T>, state: &mut AppState) {
    let in_view = state.in_scrollback();
    let mut status = StatusLine {
        emulation: session.emulation().label(),
        cursor: (
            session.terminal().cursor_x(),
            session.terminal().cursor_y(),
        ),
        online: true,
        scrollback_view: in_view,
        hint: "Alt-X quit  Alt-E emulation  PgUp history".to_string(),
    };
    if let Some(notice) = state.notice() {
        status.hint = notice.to_string();
    }

    draw_engine(frame, session.terminal_mut(), &status, in_view);

    // Dialogs take over the status row with a prompt and a field.
    let size = frame.size();
    let row = size.height.saturating_sub(1);
    match state.mode {
        UiMode::SearchDialog => {
            draw_prompt(frame, row, "Search: ", &state.search_field);
        }
        UiMode::SaveDialog => {
            draw_prompt(frame, row, "Save to: ", &state.save_field);
        }
        _ => {}
    }
}

fn draw_prompt(frame: &mut Frame, row: u16, label: &str, field: &crate::field::TextField) {
    let size = frame.size();
    let style = Style::default().fg(Color::Black).bg(Color::White);
    frame.buffer_mut().set_string(
        0,
        row,
        format!("{:width$}", label, width = usize::from(size.width)),
        style,
    );
    let field_area = Rect::new(
        label.len() as u16,
        row,
        (field.width() as u16).min(size.width.saturating_sub(label.len() as u16)),
        1,
    );
    let cursor_col = {
        let mut renderer = BufferRenderer::new(frame.buffer_mut(), field_area);
        field.render(&mut renderer, 0, 0, true)
    };
    frame.set_cursor(field_area.x + cursor_col as u16, row);
}
