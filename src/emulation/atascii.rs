//! ATASCII (Atari 8-bit) emulation
//!
//! ATASCII has no escape sequences in the ANSI sense; a single escape
//! gate decides whether the next control byte acts on the screen or is
//! printed as its glyph. The top bit of a printable byte selects reverse
//! video for that character.

use crate::term::attr::Style;
use crate::term::Terminal;

use super::charset;
use super::Step;

/// Columns with a tab stop at startup: every eighth column across the
/// classic 80-column screen.
fn default_tab_stops() -> Vec<usize> {
    (0..80).step_by(8).collect()
}

#[derive(Debug)]
pub struct AtasciiState {
    /// When true, control bytes perform their action; an ESC flips it so
    /// the next control byte is printed literally instead.
    print_control_char: bool,
    /// Sorted tab stop columns
    tab_stops: Vec<usize>,
}

impl AtasciiState {
    pub fn new() -> Self {
        Self {
            print_control_char: true,
            tab_stops: default_tab_stops(),
        }
    }

    /// First stop strictly right of the cursor, or the right margin
    fn advance_to_next_tab_stop(&self, term: &mut Terminal) -> usize {
        let x = term.cursor_x();
        self.tab_stops
            .iter()
            .copied()
            .find(|&stop| stop > x)
            .unwrap_or(term.right_margin())
            .min(term.right_margin())
    }

    fn set_tab_stop(&mut self, col: usize) {
        if let Err(pos) = self.tab_stops.binary_search(&col) {
            self.tab_stops.insert(pos, col);
        }
    }

    fn clear_tab_stop(&mut self, col: usize) {
        if let Ok(pos) = self.tab_stops.binary_search(&col) {
            self.tab_stops.remove(pos);
        }
    }

    pub fn step(&mut self, term: &mut Terminal, byte: Option<u8>) -> Step {
        let Some(byte) = byte else {
            return Step::NoCharYet;
        };

        if byte == 0x1B {
            self.print_control_char = !self.print_control_char;
            return Step::NoCharYet;
        }

        let is_control = matches!(
            byte,
            0x1C..=0x1F | 0x7D..=0x7F | 0x9B..=0x9F | 0xFD..=0xFF
        );
        if is_control {
            if !self.print_control_char {
                self.print_control_char = true;
                return self.printable(term, byte);
            }
            self.control(term, byte);
            return Step::NoCharYet;
        }

        self.printable(term, byte)
    }

    fn control(&mut self, term: &mut Terminal, byte: u8) {
        match byte {
            0x1C => term.cursor_up(1, true),
            0x1D => term.cursor_down(1, true),
            0x1E => term.cursor_left(1, true),
            0x1F => term.cursor_right(1, true),
            0x7D => term.formfeed(),
            0x7E => {
                term.cursor_left(1, true);
                term.delete_character(1);
            }
            0x7F => {
                let target = self.advance_to_next_tab_stop(term);
                let n = target.saturating_sub(term.cursor_x());
                term.cursor_right(n, true);
            }
            0x9B => term.linefeed(true),
            0x9C => {
                let (x, margin) = (term.cursor_x(), term.right_margin());
                term.erase_line(x, margin, false);
            }
            0x9D => {
                let (top, bottom) = term.scroll_region();
                term.scroll_region_down(top, bottom, 1);
            }
            0x9E => self.clear_tab_stop(term.cursor_x()),
            0x9F => self.set_tab_stop(term.cursor_x()),
            0xFD => term.bell(),
            0xFE => term.delete_character(1),
            0xFF => term.insert_blanks(1),
            _ => unreachable!(),
        }
    }

    fn printable(&mut self, term: &mut Terminal, byte: u8) -> Step {
        let mut attr = term.attr();
        if byte & 0x80 != 0 {
            attr.set(Style::REVERSE);
        } else {
            attr.clear(Style::REVERSE);
        }
        term.set_attr(attr);

        if !term.options().atascii_has_wide_font {
            let idx = term.edit_index();
            if !term.scrollback().line(idx).double_width {
                term.set_double_width(true);
            }
        }

        Step::OneChar(charset::atascii_to_unicode(byte))
    }
}

impl Default for AtasciiState {
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
        term.set_emulation(Emulation::Atascii);
        (term, EmulationState::new(Emulation::Atascii))
    }

    fn feed(term: &mut Terminal, state: &mut EmulationState, bytes: &[u8]) {
        for b in bytes {
            state.consume(term, *b);
        }
    }

    #[test]
    fn test_tab_cycle_clamps_at_margin() {
        let (mut term, mut state) = setup();
        let mut cols = Vec::new();
        for _ in 0..12 {
            feed(&mut term, &mut state, &[0x7F]);
            cols.push(term.cursor_x());
        }
        assert_eq!(
            cols,
            vec![8, 16, 24, 32, 40, 48, 56, 64, 72, 79, 79, 79]
        );
    }

    #[test]
    fn test_tab_stop_lifecycle_is_idempotent() {
        let (mut term, mut state) = setup();
        // Set the same stop twice at column 3, clear a stop that is not
        // there; both leave the list consistent.
        feed(&mut term, &mut state, &[0x1F, 0x1F, 0x1F, 0x9F, 0x9F]);
        if let EmulationState::Atascii(ref st) = state {
            assert_eq!(st.tab_stops.iter().filter(|&&c| c == 3).count(), 1);
        } else {
            panic!("wrong state variant");
        }
        feed(&mut term, &mut state, &[0x1F, 0x9E]);
        if let EmulationState::Atascii(ref st) = state {
            assert!(!st.tab_stops.contains(&4));
        } else {
            panic!("wrong state variant");
        }
        // Cleared stop at 3 still present; next tab from 0 goes there.
        feed(&mut term, &mut state, &[0x7D, 0x7F]);
        assert_eq!(term.cursor_x(), 3);
    }

    #[test]
    fn test_escape_gate_prints_control_literally() {
        let (mut term, mut state) = setup();
        feed(&mut term, &mut state, &[0x1B, 0x1C]);
        // The up-arrow glyph was printed instead of moving the cursor.
        assert_eq!(
            term.scrollback().line(term.row_index(0)).char_at(0),
            '\u{2191}'
        );
        assert_eq!(term.cursor_x(), 1);
        // Gate restored: the next control acts again.
        feed(&mut term, &mut state, &[0x1C]);
        assert_eq!(term.cursor_y(), 0);
        assert_eq!(term.cursor_x(), 1);
    }

    #[test]
    fn test_high_bit_selects_reverse_video() {
        let (mut term, mut state) = setup();
        feed(&mut term, &mut state, &[b'A', 0x80 | b'B']);
        let line = term.scrollback().line(term.row_index(0));
        assert!(!line.attr_at(0).has(Style::REVERSE));
        assert!(line.attr_at(1).has(Style::REVERSE));
        assert_eq!(line.char_at(1), 'B');
    }

    #[test]
    fn test_eol_is_a_newline() {
        let (mut term, mut state) = setup();
        feed(&mut term, &mut state, b"hi");
        feed(&mut term, &mut state, &[0x9B]);
        feed(&mut term, &mut state, b"lo");
        assert_eq!(term.scrollback().line(term.row_index(0)).text(), "hi");
        assert_eq!(term.scrollback().line(term.row_index(1)).text(), "lo");
    }

    #[test]
    fn test_backspace_deletes() {
        let (mut term, mut state) = setup();
        feed(&mut term, &mut state, b"abc");
        feed(&mut term, &mut state, &[0x7E]);
        assert_eq!(term.scrollback().line(term.row_index(0)).text(), "ab");
        assert_eq!(term.cursor_x(), 2);
    }

    #[test]
    fn test_erase_to_end_of_line() {
        let (mut term, mut state) = setup();
        feed(&mut term, &mut state, b"abcdef");
        for _ in 0..3 {
            feed(&mut term, &mut state, &[0x1E]);
        }
        feed(&mut term, &mut state, &[0x9C]);
        assert_eq!(term.scrollback().line(term.row_index(0)).text(), "abc");
    }
}
