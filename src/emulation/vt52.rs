//! VT52 emulation
//!
//! The pre-ANSI DEC terminal: single-character escapes, direct cursor
//! addressing with offset-32 bytes, and a small graphics character set
//! toggled by `ESC F` / `ESC G`.

use tracing::debug;

use crate::term::Terminal;

use super::keys::TerminalKey;
use super::Step;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Ground,
    Escape,
    /// `ESC Y`: waiting for the row byte
    Row,
    /// `ESC Y <row>`: waiting for the column byte
    Col(u8),
}

#[derive(Debug)]
pub struct Vt52State {
    state: ParseState,
    /// Graphics character set active (`ESC F`)
    graphics: bool,
    keypad_app: bool,
}

impl Vt52State {
    pub fn new() -> Self {
        Self {
            state: ParseState::Ground,
            graphics: false,
            keypad_app: false,
        }
    }

    pub fn step(&mut self, term: &mut Terminal, byte: Option<u8>) -> Step {
        let Some(byte) = byte else {
            return Step::NoCharYet;
        };
        match self.state {
            ParseState::Ground => self.ground(term, byte),
            ParseState::Escape => self.escape(term, byte),
            ParseState::Row => {
                self.state = ParseState::Col(byte);
                Step::NoCharYet
            }
            ParseState::Col(row) => {
                self.state = ParseState::Ground;
                let row = usize::from(row.saturating_sub(32));
                let col = usize::from(byte.saturating_sub(32));
                term.cursor_position(row, col);
                Step::NoCharYet
            }
        }
    }

    fn ground(&mut self, term: &mut Terminal, byte: u8) -> Step {
        match byte {
            0x00 => Step::OneChar('\0'),
            0x07 => {
                term.bell();
                Step::NoCharYet
            }
            0x08 => {
                term.backspace();
                Step::NoCharYet
            }
            0x09 => {
                term.tab_advance_fixed();
                Step::NoCharYet
            }
            0x0A..=0x0C => {
                term.linefeed(false);
                Step::NoCharYet
            }
            0x0D => {
                term.carriage_return();
                Step::NoCharYet
            }
            0x1B => {
                self.state = ParseState::Escape;
                Step::NoCharYet
            }
            0x01..=0x1F | 0x7F => Step::NoCharYet,
            b if b < 0x80 => Step::OneChar(self.translate(b)),
            // VT52 is a 7-bit terminal; the high bit is dropped.
            b => Step::OneChar(self.translate(b & 0x7F)),
        }
    }

    fn escape(&mut self, term: &mut Terminal, byte: u8) -> Step {
        self.state = ParseState::Ground;
        match byte {
            b'A' => term.cursor_up(1, true),
            b'B' => term.cursor_down(1, true),
            b'C' => term.cursor_right(1, true),
            b'D' => term.cursor_left(1, true),
            b'F' => self.graphics = true,
            b'G' => self.graphics = false,
            b'H' => term.cursor_position(0, 0),
            b'I' => {
                // Reverse linefeed: scroll down when already at the top.
                if term.cursor_y() == 0 {
                    let (top, bottom) = term.scroll_region();
                    term.scroll_region_down(top, bottom, 1);
                } else {
                    term.cursor_up(1, true);
                }
            }
            b'J' => {
                let (x, y) = (term.cursor_x(), term.cursor_y());
                let (margin, bottom) = (term.right_margin(), term.visible_rows() - 1);
                term.erase_line(x, margin, false);
                if y < bottom {
                    term.erase_screen(y + 1, 0, bottom, margin, false);
                }
            }
            b'K' => {
                let (x, margin) = (term.cursor_x(), term.right_margin());
                term.erase_line(x, margin, false);
            }
            b'Y' => self.state = ParseState::Row,
            b'Z' => term.reply(b"\x1b/Z"),
            b'=' => self.keypad_app = true,
            b'>' => self.keypad_app = false,
            other => {
                debug!("vt52: ignoring ESC {:02x}", other);
            }
        }
        Step::NoCharYet
    }

    fn translate(&self, byte: u8) -> char {
        if !self.graphics {
            return byte as char;
        }
        match byte {
            0x5E | 0x5F | 0x60 => ' ',
            b'a' => '\u{25AE}',
            b'b' => '\u{215F}',
            b'c' => '\u{00BE}',
            b'd' => '\u{215D}',
            b'e' => '\u{215B}',
            b'f' => '\u{00B0}',
            b'g' => '\u{00B1}',
            b'h' => '\u{2192}',
            b'i' => '\u{2026}',
            b'j' => '\u{00F7}',
            b'k' => '\u{2193}',
            b'l'..=b's' => {
                // Horizontal bar graph characters at eight heights.
                char::from_u32(0x2581 + u32::from(byte - b'l')).unwrap_or(' ')
            }
            b't'..=b'}' => {
                // Subscript digits 0-9.
                char::from_u32(0x2080 + u32::from(byte - b't')).unwrap_or(' ')
            }
            b'~' => '\u{00B6}',
            b => b as char,
        }
    }

    pub fn encode_key(&self, key: TerminalKey) -> String {
        match key {
            TerminalKey::Up => "\x1bA".into(),
            TerminalKey::Down => "\x1bB".into(),
            TerminalKey::Right => "\x1bC".into(),
            TerminalKey::Left => "\x1bD".into(),
            TerminalKey::Home => "\x1bH".into(),
            TerminalKey::F(1) => "\x1bP".into(),
            TerminalKey::F(2) => "\x1bQ".into(),
            TerminalKey::F(3) => "\x1bR".into(),
            TerminalKey::F(4) => "\x1bS".into(),
            TerminalKey::Backspace => "\x08".into(),
            TerminalKey::Tab => "\t".into(),
            TerminalKey::Enter => {
                if self.keypad_app {
                    "\x1b?M".into()
                } else {
                    "\r".into()
                }
            }
            TerminalKey::Escape => "\x1b".into(),
            TerminalKey::Char(c) => c.to_string(),
            _ => String::new(),
        }
    }
}

impl Default for Vt52State {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulation::{Emulation, EmulationState};
    use crate::term::test_terminal;

    fn setup() -> (Terminal, EmulationState) {
        let mut term = test_terminal();
        term.set_emulation(Emulation::Vt52);
        (term, EmulationState::new(Emulation::Vt52))
    }

    fn feed(term: &mut Terminal, state: &mut EmulationState, bytes: &[u8]) {
        for b in bytes {
            state.consume(term, *b);
        }
    }

    #[test]
    fn test_direct_cursor_addressing() {
        let (mut term, mut state) = setup();
        feed(&mut term, &mut state, b"\x1bY\x25\x2aX");
        // Row 32+5, col 32+10.
        assert_eq!((term.cursor_y(), term.cursor_x()), (5, 11));
        let line = term.scrollback().line(term.row_index(5));
        assert_eq!(line.char_at(10), 'X');
    }

    #[test]
    fn test_identify_reply() {
        let (mut term, mut state) = setup();
        feed(&mut term, &mut state, b"\x1bZ");
        assert_eq!(term.take_reply(), b"\x1b/Z");
    }

    #[test]
    fn test_reverse_linefeed_scrolls_at_top() {
        let (mut term, mut state) = setup();
        feed(&mut term, &mut state, b"first\x1bH\x1bI");
        assert_eq!(term.cursor_y(), 0);
        let line = term.scrollback().line(term.row_index(1));
        assert_eq!(line.text(), "first");
    }

    #[test]
    fn test_graphics_charset_toggle() {
        let (mut term, mut state) = setup();
        feed(&mut term, &mut state, b"\x1bFf\x1bGf");
        let line = term.scrollback().line(term.row_index(0));
        assert_eq!(line.char_at(0), '\u{00B0}');
        assert_eq!(line.char_at(1), 'f');
    }

    #[test]
    fn test_erase_to_end_of_screen() {
        let (mut term, mut state) = setup();
        feed(&mut term, &mut state, b"aaa\r\nbbb\r\nccc");
        feed(&mut term, &mut state, b"\x1bY\x21\x21\x1bJ");
        // Cursor at row 1, col 1; everything from there on is gone.
        let line1 = term.scrollback().line(term.row_index(1)).text();
        assert_eq!(line1, "b");
        let line2 = term.scrollback().line(term.row_index(2)).text();
        assert_eq!(line2.trim_end(), "");
        let line0 = term.scrollback().line(term.row_index(0)).text();
        assert_eq!(line0, "aaa");
    }
}
