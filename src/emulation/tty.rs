//! Dumb TTY emulation
//!
//! No escape sequences at all: the handful of C0 controls a teleprinter
//! honors, everything else printed through CP437.

use crate::term::Terminal;

use super::charset;
use super::Step;

#[derive(Debug, Default)]
pub struct TtyState;

impl TtyState {
    pub fn new() -> Self {
        Self
    }

    pub fn step(&mut self, term: &mut Terminal, byte: Option<u8>) -> Step {
        let Some(byte) = byte else {
            return Step::NoCharYet;
        };
        match byte {
            // print_character applies the display_null option
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
            0x01..=0x1F | 0x7F => Step::NoCharYet,
            b => Step::OneChar(charset::cp437_to_unicode(b)),
        }
    }
}
