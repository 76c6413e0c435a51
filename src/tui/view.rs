//! Ratatui view for the terminal engine
//!
//! Implements the engine's renderer surface on top of a Ratatui frame
//! buffer and draws the one-row status line underneath the emulation
//! window.

use ratatui::prelude::*;

use crate::term::attr::{CellAttr, Style as CellStyle};
use crate::term::renderer::Renderer;
use crate::term::Terminal as Engine;

/// Convert a cell attribute to a Ratatui style
fn convert_attr(attr: CellAttr) -> Style {
    let style = Style::default()
        .fg(Color::Indexed(attr.fg()))
        .bg(Color::Indexed(attr.bg()));
    let mut modifiers = Modifier::empty();
    if attr.has(CellStyle::BOLD) {
        modifiers |= Modifier::BOLD;
    }
    if attr.has(CellStyle::UNDERLINE) {
        modifiers |= Modifier::UNDERLINED;
    }
    if attr.has(CellStyle::REVERSE) {
        modifiers |= Modifier::REVERSED;
    }
    if attr.has(CellStyle::BLINK) {
        modifiers |= Modifier::SLOW_BLINK;
    }
    style.add_modifier(modifiers)
}

/// Renderer surface backed by a Ratatui buffer region
pub struct BufferRenderer<'a> {
    buf: &'a mut Buffer,
    area: Rect,
    /// Where the engine asked the hardware cursor to go
    pub cursor: Option<(u16, u16)>,
}

impl<'a> BufferRenderer<'a> {
    pub fn new(buf: &'a mut Buffer, area: Rect) -> Self {
        Self {
            buf,
            area,
            cursor: None,
        }
    }

    fn cell_at(&mut self, row: usize, col: usize) -> Option<&mut ratatui::buffer::Cell> {
        if row >= usize::from(self.area.height) || col >= usize::from(self.area.width) {
            return None;
        }
        let x = self.area.x + col as u16;
        let y = self.area.y + row as u16;
        Some(self.buf.get_mut(x, y))
    }
}

impl Renderer for BufferRenderer<'_> {
    fn put_cell(&mut self, row: usize, col: usize, ch: char, attr: CellAttr) {
        if let Some(cell) = self.cell_at(row, col) {
            cell.set_char(ch);
            cell.set_style(convert_attr(attr));
        }
    }

    fn move_cursor(&mut self, row: usize, col: usize) {
        if row < usize::from(self.area.height) && col < usize::from(self.area.width) {
            self.cursor = Some((self.area.x + col as u16, self.area.y + row as u16));
        }
    }

    fn clear_to_eol(&mut self, row: usize, col: usize) {
        let width = usize::from(self.area.width);
        for c in col..width {
            if let Some(cell) = self.cell_at(row, c) {
                cell.set_char(' ');
                cell.set_style(Style::default());
            }
        }
    }

    fn set_row_double_width(&mut self, _row: usize, _enabled: bool) {
        // Ratatui has no native double-width rows; the engine already
        // spaces the glyphs out for us.
    }

    fn has_true_doublewidth(&self) -> bool {
        false
    }

    fn flush(&mut self) {}
}

/// Everything the status row displays
#[derive(Debug, Clone, Default)]
pub struct StatusLine {
    pub emulation: &'static str,
    pub cursor: (usize, usize),
    pub online: bool,
    pub scrollback_view: bool,
    pub hint: String,
}

impl StatusLine {
    fn text(&self, width: usize) -> String {
        let link = if self.online { "online" } else { "offline" };
        let mode = if self.scrollback_view {
            "  SCROLLBACK"
        } else {
            ""
        };
        let left = format!(
            " {}  {}  ({},{}){}",
            self.emulation, link, self.cursor.0, self.cursor.1, mode
        );
        let mut text = left;
        if !self.hint.is_empty() {
            let used = text.chars().count() + self.hint.chars().count() + 1;
            text.push_str(&" ".repeat(width.saturating_sub(used)));
            text.push_str(&self.hint);
        }
        if text.chars().count() > width {
            text = text.chars().take(width).collect();
        }
        text
    }
}

/// Draw the engine window plus the status line into the frame
pub fn draw(frame: &mut Frame, engine: &mut Engine, status: &StatusLine, in_view_state: bool) {
    let size = frame.size();
    let content_height = size.height.saturating_sub(1);
    let content = Rect::new(size.x, size.y, size.width, content_height);
    let status_area = Rect::new(size.x, size.y + content_height, size.width, 1);

    let cursor = {
        let mut renderer = BufferRenderer::new(frame.buffer_mut(), content);
        engine.render(&mut renderer, in_view_state);
        renderer.cursor
    };

    let status_style = Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan);
    let text = status.text(usize::from(status_area.width));
    frame.buffer_mut().set_string(
        status_area.x,
        status_area.y,
        format!("{:width$}", text, width = usize::from(status_area.width)),
        status_style,
    );

    if let Some((x, y)) = cursor {
        frame.set_cursor(x, y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::test_terminal;

    #[test]
    fn test_renderer_writes_into_buffer_region() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 80, 25));
        let area = Rect::new(0, 0, 80, 24);
        let mut engine = test_terminal();
        for ch in "probe".chars() {
            engine.print_character(ch);
        }
        let mut renderer = BufferRenderer::new(&mut buf, area);
        engine.render(&mut renderer, false);
        let cursor = renderer.cursor;
        assert_eq!(buf.get(0, 0).symbol(), "p");
        assert_eq!(buf.get(4, 0).symbol(), "e");
        assert_eq!(cursor, Some((5, 0)));
    }

    #[test]
    fn test_renderer_clips_to_area() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 10, 5));
        let area = Rect::new(0, 0, 10, 4);
        let mut renderer = BufferRenderer::new(&mut buf, area);
        // Out-of-area writes are dropped, not panics.
        renderer.put_cell(100, 100, 'x', CellAttr::default());
        renderer.move_cursor(50, 50);
        assert_eq!(renderer.cursor, None);
    }

    #[test]
    fn test_status_line_fits_width() {
        let status = StatusLine {
            emulation: "VT100",
            cursor: (12, 3),
            online: true,
            scrollback_view: true,
            hint: "Alt-X quit".to_string(),
        };
        let text = status.text(40);
        assert!(text.len() <= 40);
        assert!(text.contains("VT100"));
        assert!(text.contains("SCROLLBACK"));
    }
}
