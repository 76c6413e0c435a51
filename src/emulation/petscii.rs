//! PETSCII (Commodore) emulation
//!
//! A 40-column screen, color controls scattered through the C0/C1
//! ranges, a reverse-video mode that RETURN cancels, and two glyph
//! banks (uppercase/graphics vs. lowercase/uppercase) switched by
//! `0x0E`/`0x8E`.

use crate::term::attr::{self, Style};
use crate::term::Terminal;

use super::charset;
use super::Step;

#[derive(Debug)]
pub struct PetsciiState {
    /// Lowercase/uppercase bank active (as opposed to uppercase/graphics)
    lowercase: bool,
    /// Reverse-video mode (`0x12` on, `0x92` or RETURN off)
    reverse: bool,
}

impl PetsciiState {
    pub fn new() -> Self {
        Self {
            lowercase: false,
            reverse: false,
        }
    }

    pub fn step(&mut self, term: &mut Terminal, byte: Option<u8>) -> Step {
        let Some(byte) = byte else {
            return Step::NoCharYet;
        };
        match byte {
            0x07 => {
                term.bell();
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
            0x0D | 0x8D => {
                self.reverse = false;
                self.sync_reverse(term);
                term.carriage_return();
                term.linefeed(false);
                Step::NoCharYet
            }
            0x0E => {
                self.lowercase = true;
                Step::NoCharYet
            }
            0x8E => {
                self.lowercase = false;
                Step::NoCharYet
            }
            0x11 => {
                term.cursor_down(1, true);
                Step::NoCharYet
            }
            0x91 => {
                term.cursor_up(1, true);
                Step::NoCharYet
            }
            0x1D => {
                term.cursor_right(1, true);
                Step::NoCharYet
            }
            0x9D => {
                term.cursor_left(1, true);
                Step::NoCharYet
            }
            0x12 => {
                self.reverse = true;
                self.sync_reverse(term);
                Step::NoCharYet
            }
            0x92 => {
                self.reverse = false;
                self.sync_reverse(term);
                Step::NoCharYet
            }
            0x13 => {
                term.cursor_position(0, 0);
                Step::NoCharYet
            }
            0x93 => {
                term.formfeed();
                Step::NoCharYet
            }
            0x14 => {
                term.cursor_left(1, true);
                term.delete_character(1);
                Step::NoCharYet
            }
            0x94 => {
                term.insert_blanks(1);
                Step::NoCharYet
            }
            b => {
                if let Some((fg, bold)) = color_code(b) {
                    let mut a = term.attr();
                    a.set_fg(fg);
                    if bold {
                        a.set(Style::BOLD);
                    } else {
                        a.clear(Style::BOLD);
                    }
                    term.set_attr(a);
                    return Step::NoCharYet;
                }
                match charset::petscii_to_unicode(b, self.lowercase) {
                    Some(glyph) => {
                        if !term.options().petscii_has_wide_font {
                            let idx = term.edit_index();
                            if !term.scrollback().line(idx).double_width {
                                term.set_double_width(true);
                            }
                        }
                        Step::OneChar(glyph)
                    }
                    None => Step::NoCharYet,
                }
            }
        }
    }

    fn sync_reverse(&self, term: &mut Terminal) {
        let mut a = term.attr();
        if self.reverse {
            a.set(Style::REVERSE);
        } else {
            a.clear(Style::REVERSE);
        }
        term.set_attr(a);
    }
}

impl Default for PetsciiState {
    fn default() -> Self {
        Self::new()
    }
}

/// The C64 palette folded onto the 16-color display: `(index, bright)`
fn color_code(byte: u8) -> Option<(u8, bool)> {
    match byte {
        0x05 => Some((attr::WHITE, true)),
        0x1C => Some((attr::RED, false)),
        0x1E => Some((attr::GREEN, false)),
        0x1F => Some((attr::BLUE, false)),
        0x81 => Some((attr::YELLOW, false)),
        0x90 => Some((attr::BLACK, false)),
        0x95 => Some((attr::YELLOW, false)),
        0x96 => Some((attr::RED, true)),
        0x97 => Some((attr::BLACK, true)),
        0x98 => Some((attr::WHITE, false)),
        0x99 => Some((attr::GREEN, true)),
        0x9A => Some((attr::BLUE, true)),
        0x9B => Some((attr::WHITE, false)),
        0x9C => Some((attr::MAGENTA, false)),
        0x9E => Some((attr::YELLOW, true)),
        0x9F => Some((attr::CYAN, false)),
        _ => None,
    }
}
