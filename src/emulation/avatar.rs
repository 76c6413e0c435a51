//! AVT/0+ (Avatar) emulation
//!
//! Avatar compresses what ANSI spells out: one control byte plus binary
//! arguments. `^V` introduces a command, `^Y` run-length-encodes a
//! repeated character, and `^L` clears the screen. Arguments arrive as
//! raw bytes (rows and columns are 1-based).

use std::collections::VecDeque;

use tracing::debug;

use crate::term::attr::{from_pc_byte, CellAttr, Style};
use crate::term::Terminal;

use super::charset;
use super::Step;

#[derive(Debug)]
enum AvState {
    Ground,
    /// After `^Y`: the character to repeat
    RepeatChar,
    /// After `^Y <char>`: the repeat count
    RepeatCount(u8),
    /// After `^V`: the command byte
    Command,
    /// `^V^A`: attribute byte
    Attr,
    /// `^V^H`: row argument
    GotoRow,
    /// `^V^H <row>`: column argument
    GotoCol(u8),
    /// `^V^J` / `^V^K`: five arguments (lines, top, left, bottom, right)
    Scroll { down: bool, args: Vec<u8> },
    /// `^V^L`: attribute, lines, columns
    ClearArea(Vec<u8>),
    /// `^V^M`: attribute, character, lines, columns
    InitArea(Vec<u8>),
    /// `^V^Y`: pattern length
    PatternLen,
    /// `^V^Y <len>`: the pattern bytes
    PatternChars { need: u8, chars: Vec<u8> },
    /// `^V^Y <len> <chars>`: the repeat count
    PatternCount { chars: Vec<u8> },
}

#[derive(Debug)]
pub struct AvatarState {
    state: AvState,
    /// Characters waiting to be drained through `ManyChars`
    emit: VecDeque<char>,
}

impl AvatarState {
    pub fn new() -> Self {
        Self {
            state: AvState::Ground,
            emit: VecDeque::new(),
        }
    }

    pub fn step(&mut self, term: &mut Terminal, byte: Option<u8>) -> Step {
        let Some(byte) = byte else {
            return self.drain();
        };
        match std::mem::replace(&mut self.state, AvState::Ground) {
            AvState::Ground => self.ground(term, byte),
            AvState::RepeatChar => {
                self.state = AvState::RepeatCount(byte);
                Step::NoCharYet
            }
            AvState::RepeatCount(ch) => {
                let glyph = charset::cp437_to_unicode(ch);
                for _ in 0..byte {
                    self.emit.push_back(glyph);
                }
                self.drain()
            }
            AvState::Command => self.command(term, byte),
            AvState::Attr => {
                term.set_attr(from_pc_byte(byte));
                Step::NoCharYet
            }
            AvState::GotoRow => {
                self.state = AvState::GotoCol(byte);
                Step::NoCharYet
            }
            AvState::GotoCol(row) => {
                term.set_insert_mode(false);
                term.cursor_position(
                    usize::from(row.saturating_sub(1)),
                    usize::from(byte.saturating_sub(1)),
                );
                Step::NoCharYet
            }
            AvState::Scroll { down, mut args } => {
                args.push(byte);
                if args.len() == 5 {
                    self.scroll_area(term, down, &args);
                } else {
                    self.state = AvState::Scroll { down, args };
                }
                Step::NoCharYet
            }
            AvState::ClearArea(mut args) => {
                args.push(byte);
                if args.len() == 3 {
                    self.clear_area(term, &args);
                } else {
                    self.state = AvState::ClearArea(args);
                }
                Step::NoCharYet
            }
            AvState::InitArea(mut args) => {
                args.push(byte);
                if args.len() == 4 {
                    self.init_area(term, &args);
                } else {
                    self.state = AvState::InitArea(args);
                }
                Step::NoCharYet
            }
            AvState::PatternLen => {
                if byte == 0 {
                    return Step::NoCharYet;
                }
                self.state = AvState::PatternChars {
                    need: byte,
                    chars: Vec::new(),
                };
                Step::NoCharYet
            }
            AvState::PatternChars { need, mut chars } => {
                chars.push(byte);
                if chars.len() == usize::from(need) {
                    self.state = AvState::PatternCount { chars };
                } else {
                    self.state = AvState::PatternChars { need, chars };
                }
                Step::NoCharYet
            }
            AvState::PatternCount { chars } => {
                for _ in 0..byte {
                    for &ch in &chars {
                        self.emit.push_back(charset::cp437_to_unicode(ch));
                    }
                }
                self.drain()
            }
        }
    }

    fn drain(&mut self) -> Step {
        match self.emit.pop_front() {
            None => Step::NoCharYet,
            Some(ch) if self.emit.is_empty() => Step::OneChar(ch),
            Some(ch) => Step::ManyChars(ch),
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
            0x0A => {
                term.linefeed(false);
                Step::NoCharYet
            }
            0x0C => {
                term.set_attr(CellAttr::default());
                term.set_insert_mode(false);
                term.formfeed();
                Step::NoCharYet
            }
            0x0D => {
                term.carriage_return();
                Step::NoCharYet
            }
            0x16 => {
                self.state = AvState::Command;
                Step::NoCharYet
            }
            0x19 => {
                self.state = AvState::RepeatChar;
                Step::NoCharYet
            }
            0x01..=0x1F | 0x7F => Step::NoCharYet,
            b => Step::OneChar(charset::cp437_to_unicode(b)),
        }
    }

    fn command(&mut self, term: &mut Terminal, byte: u8) -> Step {
        match byte {
            0x01 => self.state = AvState::Attr,
            0x02 => {
                let mut attr = term.attr();
                attr.set(Style::BLINK);
                term.set_attr(attr);
            }
            0x03 => {
                term.set_insert_mode(false);
                term.cursor_up(1, true);
            }
            0x04 => {
                term.set_insert_mode(false);
                term.cursor_down(1, true);
            }
            0x05 => {
                term.set_insert_mode(false);
                term.cursor_left(1, true);
            }
            0x06 => {
                term.set_insert_mode(false);
                term.cursor_right(1, true);
            }
            0x07 => {
                let (x, margin) = (term.cursor_x(), term.right_margin());
                term.erase_line(x, margin, false);
            }
            0x08 => self.state = AvState::GotoRow,
            0x09 => term.set_insert_mode(true),
            0x0A => {
                self.state = AvState::Scroll {
                    down: false,
                    args: Vec::new(),
                }
            }
            0x0B => {
                self.state = AvState::Scroll {
                    down: true,
                    args: Vec::new(),
                }
            }
            0x0C => self.state = AvState::ClearArea(Vec::new()),
            0x0D => self.state = AvState::InitArea(Vec::new()),
            0x19 => self.state = AvState::PatternLen,
            other => {
                debug!("avatar: ignoring ^V command {:02x}", other);
            }
        }
        Step::NoCharYet
    }

    fn scroll_area(&self, term: &mut Terminal, down: bool, args: &[u8]) {
        let lines = usize::from(args[0]);
        let top = usize::from(args[1].saturating_sub(1));
        let left = usize::from(args[2].saturating_sub(1));
        let bottom = usize::from(args[3].saturating_sub(1)).min(term.visible_rows() - 1);
        let right = usize::from(args[4].saturating_sub(1)).min(term.right_margin());
        if bottom < top || right < left {
            return;
        }
        if down {
            term.rectangle_scroll_down(top, left, bottom, right, lines);
        } else {
            term.rectangle_scroll_up(top, left, bottom, right, lines);
        }
    }

    fn clear_area(&self, term: &mut Terminal, args: &[u8]) {
        term.set_attr(from_pc_byte(args[0]));
        let (x, y) = (term.cursor_x(), term.cursor_y());
        let lines = usize::from(args[1]).max(1);
        let cols = usize::from(args[2]).max(1);
        let bottom = (y + lines - 1).min(term.visible_rows() - 1);
        let right = (x + cols - 1).min(term.right_margin());
        term.erase_screen(y, x, bottom, right, false);
    }

    fn init_area(&self, term: &mut Terminal, args: &[u8]) {
        term.set_attr(from_pc_byte(args[0]));
        let glyph = args[1];
        let (x, y) = (term.cursor_x(), term.cursor_y());
        let lines = usize::from(args[2]).max(1);
        let cols = usize::from(args[3]).max(1);
        let bottom = (y + lines - 1).min(term.visible_rows() - 1);
        let right = (x + cols - 1).min(term.right_margin());
        let saved_y = term.cursor_y();
        for row in y..=bottom {
            term.set_cursor_y(row);
            term.ensure_row(row);
            term.fill_line_with_character(x, right, charset::cp437_to_unicode(glyph), false);
        }
        term.set_cursor_y(saved_y);
    }
}

impl Default for AvatarState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulation::{Emulation, EmulationState};
    use crate::term::attr;
    use crate::term::test_terminal;

    fn setup() -> (Terminal, EmulationState) {
        let mut term = test_terminal();
        term.set_emulation(Emulation::Avatar);
        (term, EmulationState::new(Emulation::Avatar))
    }

    fn feed(term: &mut Terminal, state: &mut EmulationState, bytes: &[u8]) {
        for b in bytes {
            state.consume(term, *b);
        }
    }

    fn row_text(term: &Terminal, row: usize) -> String {
        term.scrollback().line(term.row_index(row)).text()
    }

    #[test]
    fn test_rle_repeat() {
        let (mut term, mut state) = setup();
        feed(&mut term, &mut state, &[0x19, b'*', 5]);
        assert_eq!(row_text(&term, 0), "*****");
        assert_eq!(term.cursor_x(), 5);
    }

    #[test]
    fn test_attribute_command() {
        let (mut term, mut state) = setup();
        feed(&mut term, &mut state, &[0x16, 0x01, 0x1F, b'x']);
        let line = term.scrollback().line(term.row_index(0));
        assert_eq!(line.attr_at(0).bg(), attr::BLUE);
        assert_eq!(line.attr_at(0).fg(), attr::WHITE);
        assert!(line.attr_at(0).has(Style::BOLD));
    }

    #[test]
    fn test_goto_is_one_based() {
        let (mut term, mut state) = setup();
        feed(&mut term, &mut state, &[0x16, 0x08, 3, 10]);
        assert_eq!((term.cursor_y(), term.cursor_x()), (2, 9));
    }

    #[test]
    fn test_clear_screen_resets_attribute() {
        let (mut term, mut state) = setup();
        feed(&mut term, &mut state, &[0x16, 0x01, 0x4E]);
        feed(&mut term, &mut state, b"x");
        feed(&mut term, &mut state, &[0x0C]);
        assert_eq!(term.attr(), CellAttr::default());
        assert_eq!((term.cursor_x(), term.cursor_y()), (0, 0));
        assert_eq!(row_text(&term, 0).trim_end(), "");
    }

    #[test]
    fn test_scroll_area_up() {
        let (mut term, mut state) = setup();
        feed(&mut term, &mut state, b"aaa\r\nbbb\r\nccc");
        // Scroll rows 1-2, full width, up one line.
        feed(&mut term, &mut state, &[0x16, 0x0A, 1, 1, 1, 2, 80]);
        assert_eq!(row_text(&term, 0).trim_end(), "bbb");
        assert_eq!(row_text(&term, 1).trim_end(), "");
        assert_eq!(row_text(&term, 2).trim_end(), "ccc");
    }

    #[test]
    fn test_pattern_repeat() {
        let (mut term, mut state) = setup();
        feed(&mut term, &mut state, &[0x16, 0x19, 2, b'-', b'=', 3]);
        assert_eq!(row_text(&term, 0), "-=-=-=");
    }

    #[test]
    fn test_init_area_fills_with_character() {
        let (mut term, mut state) = setup();
        feed(&mut term, &mut state, &[0x16, 0x08, 2, 2]);
        feed(&mut term, &mut state, &[0x16, 0x0D, 0x07, b'#', 2, 3]);
        for row in 1..=2 {
            let line = term.scrollback().line(term.row_index(row));
            assert_eq!(line.char_at(1), '#');
            assert_eq!(line.char_at(3), '#');
            assert_eq!(line.char_at(0), ' ');
        }
    }

    #[test]
    fn test_insert_mode_set_and_cleared_by_movement() {
        let (mut term, mut state) = setup();
        feed(&mut term, &mut state, &[0x16, 0x09]);
        assert!(term.insert_mode());
        feed(&mut term, &mut state, &[0x16, 0x06]);
        assert!(!term.insert_mode());
    }
}
