//! BBS-style ANSI emulation
//!
//! The ANSI.SYS dialect the door-game era settled on: a small CSI
//! repertoire, 16-color SGR, cursor save/restore, and ANSI music behind
//! `CSI M`. Wrapping is immediate at the margin (no deferred wrap) and
//! erased cells keep the current background.

use tracing::debug;

use crate::music;
use crate::term::attr::{CellAttr, Style};
use crate::term::{TermEvent, Terminal};

use super::charset;
use super::Step;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Ground,
    Escape,
    Csi,
    Music,
}

#[derive(Debug)]
pub struct AnsiState {
    state: ParseState,
    params: Vec<u16>,
    current: Option<u16>,
    music_buf: Vec<u8>,
    saved_cursor: Option<(usize, usize)>,
}

impl AnsiState {
    pub fn new() -> Self {
        Self {
            state: ParseState::Ground,
            params: Vec::new(),
            current: None,
            music_buf: Vec::new(),
            saved_cursor: None,
        }
    }

    pub fn step(&mut self, term: &mut Terminal, byte: Option<u8>) -> Step {
        let Some(byte) = byte else {
            return Step::NoCharYet;
        };
        match self.state {
            ParseState::Ground => self.ground(term, byte),
            ParseState::Escape => self.escape(byte),
            ParseState::Csi => self.csi(term, byte),
            ParseState::Music => self.music(term, byte),
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
            0x0A | 0x0B => {
                term.linefeed(false);
                Step::NoCharYet
            }
            0x0C => {
                term.formfeed();
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
            b => Step::OneChar(charset::cp437_to_unicode(b)),
        }
    }

    fn escape(&mut self, byte: u8) -> Step {
        match byte {
            b'[' => {
                self.params.clear();
                self.current = None;
                self.state = ParseState::Csi;
            }
            0x1B => {}
            _ => {
                // Unknown escape: abort and return to ground.
                self.state = ParseState::Ground;
            }
        }
        Step::NoCharYet
    }

    fn csi(&mut self, term: &mut Terminal, byte: u8) -> Step {
        match byte {
            b'0'..=b'9' => {
                let digit = u16::from(byte - b'0');
                self.current = Some(
                    self.current
                        .unwrap_or(0)
                        .saturating_mul(10)
                        .saturating_add(digit),
                );
            }
            b';' => {
                self.params.push(self.current.take().unwrap_or(0));
            }
            // Private markers from other dialects; parse and ignore.
            b'?' | b'=' | b'<' | b'>' => {}
            0x18 | 0x1A => {
                self.state = ParseState::Ground;
            }
            0x1B => {
                self.state = ParseState::Escape;
            }
            final_byte => {
                if let Some(p) = self.current.take() {
                    self.params.push(p);
                }
                self.state = ParseState::Ground;
                self.dispatch_csi(term, final_byte);
            }
        }
        Step::NoCharYet
    }

    fn param(&self, idx: usize, default: u16) -> u16 {
        match self.params.get(idx) {
            Some(0) | None => default,
            Some(&v) => v,
        }
    }

    fn dispatch_csi(&mut self, term: &mut Terminal, final_byte: u8) {
        match final_byte {
            b'A' => term.cursor_up(self.param(0, 1) as usize, true),
            b'B' => term.cursor_down(self.param(0, 1) as usize, true),
            b'C' => term.cursor_right(self.param(0, 1) as usize, true),
            b'D' => term.cursor_left(self.param(0, 1) as usize, true),
            b'H' | b'f' => {
                let row = self.param(0, 1) as usize - 1;
                let col = self.param(1, 1) as usize - 1;
                term.cursor_position(row, col);
            }
            b'J' => self.erase_display(term),
            b'K' => self.erase_line(term),
            b'm' => apply_sgr(term, &self.params),
            b'n' => {
                if self.param(0, 0) == 6 {
                    let report =
                        format!("\x1b[{};{}R", term.cursor_y() + 1, term.cursor_x() + 1);
                    term.reply(report.as_bytes());
                } else if self.param(0, 0) == 5 {
                    term.reply(b"\x1b[0n");
                }
            }
            b's' => {
                self.saved_cursor = Some((term.cursor_x(), term.cursor_y()));
            }
            b'u' => {
                if let Some((x, y)) = self.saved_cursor {
                    term.cursor_position(y, x);
                }
            }
            b'M' => {
                // ANSI music: collect the macro string until its
                // terminator and hand it to the tone parser.
                self.music_buf.clear();
                self.state = ParseState::Music;
            }
            other => {
                debug!("ansi: ignoring CSI final byte {:02x}", other);
            }
        }
    }

    fn erase_display(&mut self, term: &mut Terminal) {
        let margin = term.right_margin();
        let bottom = term.visible_rows() - 1;
        match self.param(0, 0) {
            0 => {
                let (x, y) = (term.cursor_x(), term.cursor_y());
                term.erase_line(x, margin, false);
                if y < bottom {
                    term.erase_screen(y + 1, 0, bottom, margin, false);
                }
            }
            1 => {
                let (x, y) = (term.cursor_x(), term.cursor_y());
                if y > 0 {
                    term.erase_screen(0, 0, y - 1, margin, false);
                }
                term.erase_line(0, x, false);
            }
            2 => term.formfeed(),
            _ => {}
        }
    }

    fn erase_line(&mut self, term: &mut Terminal) {
        let margin = term.right_margin();
        let x = term.cursor_x();
        match self.param(0, 0) {
            0 => term.erase_line(x, margin, false),
            1 => term.erase_line(0, x, false),
            2 => term.erase_line(0, margin, false),
            _ => {}
        }
    }

    fn music(&mut self, term: &mut Terminal, byte: u8) -> Step {
        match byte {
            0x0E | 0x0D => {
                self.finish_music(term);
                self.state = ParseState::Ground;
            }
            0x1B => {
                self.finish_music(term);
                self.state = ParseState::Escape;
            }
            b => self.music_buf.push(b),
        }
        Step::NoCharYet
    }

    fn finish_music(&mut self, term: &mut Terminal) {
        let buf = std::mem::take(&mut self.music_buf);
        match music::parse(&buf) {
            Ok(tones) if !tones.is_empty() => term.push_event(TermEvent::Music(tones)),
            Ok(_) => {}
            Err(e) => debug!("ansi: discarding unparsable music string: {}", e),
        }
    }
}

impl Default for AnsiState {
    fn default() -> Self {
        Self::new()
    }
}

/// 16-color SGR used by the BBS dialect
fn apply_sgr(term: &mut Terminal, params: &[u16]) {
    let mut attr = term.attr();
    let params = if params.is_empty() { &[0][..] } else { params };
    for &p in params {
        match p {
            0 => attr = CellAttr::default(),
            1 => attr.set(Style::BOLD),
            4 => attr.set(Style::UNDERLINE),
            5 => attr.set(Style::BLINK),
            7 => attr.set(Style::REVERSE),
            21 | 22 => attr.clear(Style::BOLD),
            24 => attr.clear(Style::UNDERLINE),
            25 => attr.clear(Style::BLINK),
            27 => attr.clear(Style::REVERSE),
            30..=37 => attr.set_fg((p - 30) as u8),
            39 => attr.set_fg(CellAttr::default().fg()),
            40..=47 => attr.set_bg((p - 40) as u8),
            49 => attr.set_bg(CellAttr::default().bg()),
            other => debug!("ansi: ignoring SGR {}", other),
        }
    }
    term.set_attr(attr);
}
