//! VT-family emulation
//!
//! One state machine drives VT100, VT102, VT220 and the Linux/Xterm
//! console flavors; a capability check on the variant gates what each
//! flavor answers to. The Linux and Xterm variants come in an 8-bit
//! (Latin-1) and a UTF-8 form; for the UTF-8 forms bytes at and above
//! 0x80 bypass the translation tables and feed a streaming decoder.

use tracing::debug;

use crate::term::attr::{CellAttr, Style};
use crate::term::line::DoubleHeight;
use crate::term::Terminal;

use super::charset;
use super::keys::TerminalKey;
use super::{Emulation, Step};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Ground,
    Escape,
    EscapeIntermediate,
    Csi,
    Osc,
    Dcs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Charset {
    Ascii,
    DecGraphics,
    Uk,
}

#[derive(Debug, Clone, Copy)]
struct SavedCursor {
    x: usize,
    y: usize,
    attr: CellAttr,
    origin_mode: bool,
    g0: Charset,
    g1: Charset,
    shift_out: bool,
}

fn default_tab_stops() -> Vec<usize> {
    (0..80).step_by(8).collect()
}

#[derive(Debug)]
pub struct VtState {
    kind: Emulation,
    state: ParseState,
    params: Vec<u16>,
    current: Option<u16>,
    private: Option<u8>,
    intermediates: Vec<u8>,
    osc: Vec<u8>,

    utf8_acc: u32,
    utf8_remaining: u8,
    /// Held-over code point when an aborted UTF-8 sequence yields both a
    /// replacement character and the byte that cut it short
    pending: Option<char>,

    g0: Charset,
    g1: Charset,
    shift_out: bool,
    saved: Option<SavedCursor>,

    app_cursor: bool,
    /// DECKPAM; tracked for completeness, the abstract key set has no
    /// keypad keys to re-encode
    #[allow(dead_code)]
    app_keypad: bool,
    new_line_mode: bool,
    tab_stops: Vec<usize>,
}

impl VtState {
    pub fn new(kind: Emulation) -> Self {
        Self {
            kind,
            state: ParseState::Ground,
            params: Vec::new(),
            current: None,
            private: None,
            intermediates: Vec::new(),
            osc: Vec::new(),
            utf8_acc: 0,
            utf8_remaining: 0,
            pending: None,
            g0: Charset::Ascii,
            g1: Charset::DecGraphics,
            shift_out: false,
            saved: None,
            app_cursor: false,
            app_keypad: false,
            new_line_mode: false,
            tab_stops: default_tab_stops(),
        }
    }

    fn has_8bit_controls(&self) -> bool {
        matches!(
            self.kind,
            Emulation::Vt220 | Emulation::Linux | Emulation::Xterm
        )
    }

    fn is_vt220_or_better(&self) -> bool {
        matches!(
            self.kind,
            Emulation::Vt220 | Emulation::Xterm | Emulation::XtermUtf8
        )
    }

    pub fn step(&mut self, term: &mut Terminal, byte: Option<u8>) -> Step {
        let Some(byte) = byte else {
            return match self.pending.take() {
                Some(ch) => Step::OneChar(ch),
                None => Step::NoCharYet,
            };
        };

        // C0 controls execute from within any escape sequence too, with
        // CAN and SUB aborting the sequence in progress.
        if byte < 0x20 && self.state != ParseState::Ground {
            match byte {
                0x18 | 0x1A => {
                    self.state = ParseState::Ground;
                    return Step::NoCharYet;
                }
                0x1B => {
                    if self.state == ParseState::Osc || self.state == ParseState::Dcs {
                        // Likely the first half of a two-byte ST.
                        self.state = ParseState::Ground;
                        self.osc_dispatch(term);
                    }
                    self.enter_escape();
                    return Step::NoCharYet;
                }
                _ => return self.c0(term, byte),
            }
        }

        match self.state {
            ParseState::Ground => self.ground(term, byte),
            ParseState::Escape => self.escape(term, byte),
            ParseState::EscapeIntermediate => {
                if (0x20..0x30).contains(&byte) {
                    self.intermediates.push(byte);
                    Step::NoCharYet
                } else {
                    self.state = ParseState::Ground;
                    self.esc_dispatch(term, byte)
                }
            }
            ParseState::Csi => self.csi(term, byte),
            ParseState::Osc => {
                if byte == 0x07 || byte == 0x9C {
                    self.state = ParseState::Ground;
                    self.osc_dispatch(term);
                } else {
                    self.osc.push(byte);
                }
                Step::NoCharYet
            }
            ParseState::Dcs => {
                // Device control strings are consumed and dropped.
                if byte == 0x9C {
                    self.state = ParseState::Ground;
                }
                Step::NoCharYet
            }
        }
    }

    fn enter_escape(&mut self) {
        self.state = ParseState::Escape;
        self.intermediates.clear();
    }

    fn enter_csi(&mut self) {
        self.state = ParseState::Csi;
        self.params.clear();
        self.current = None;
        self.private = None;
        self.intermediates.clear();
    }

    fn ground(&mut self, term: &mut Terminal, byte: u8) -> Step {
        if byte < 0x20 {
            return self.c0(term, byte);
        }
        if byte == 0x7F {
            return Step::NoCharYet;
        }
        if byte >= 0x80 {
            if self.kind.is_utf8() {
                return self.utf8(byte);
            }
            if self.has_8bit_controls() && (0x80..0xA0).contains(&byte) {
                return self.c1(term, byte);
            }
            return match self.kind {
                // The VT100 and VT102 are 7-bit terminals.
                Emulation::Vt100 | Emulation::Vt102 => {
                    self.printable(byte & 0x7F)
                }
                _ => Step::OneChar(charset::latin1_to_unicode(byte)),
            };
        }
        if self.kind.is_utf8() && self.utf8_remaining > 0 {
            // An ASCII byte cut a multibyte sequence short: emit the
            // replacement character, then the byte itself.
            self.utf8_remaining = 0;
            self.pending = Some(byte as char);
            return Step::ManyChars('\u{FFFD}');
        }
        self.printable(byte)
    }

    fn printable(&mut self, byte: u8) -> Step {
        if byte < 0x20 {
            return Step::NoCharYet;
        }
        let set = if self.shift_out { self.g1 } else { self.g0 };
        let ch = match set {
            Charset::Ascii => byte as char,
            Charset::DecGraphics => charset::dec_graphics(byte),
            Charset::Uk => {
                if byte == b'#' {
                    '\u{00A3}'
                } else {
                    byte as char
                }
            }
        };
        Step::OneChar(ch)
    }

    fn utf8(&mut self, byte: u8) -> Step {
        if self.utf8_remaining > 0 {
            if byte & 0xC0 != 0x80 {
                self.utf8_remaining = 0;
                return Step::OneChar('\u{FFFD}');
            }
            self.utf8_acc = (self.utf8_acc << 6) | u32::from(byte & 0x3F);
            self.utf8_remaining -= 1;
            if self.utf8_remaining == 0 {
                return Step::OneChar(char::from_u32(self.utf8_acc).unwrap_or('\u{FFFD}'));
            }
            return Step::NoCharYet;
        }
        match byte {
            0xC0..=0xDF => {
                self.utf8_acc = u32::from(byte & 0x1F);
                self.utf8_remaining = 1;
                Step::NoCharYet
            }
            0xE0..=0xEF => {
                self.utf8_acc = u32::from(byte & 0x0F);
                self.utf8_remaining = 2;
                Step::NoCharYet
            }
            0xF0..=0xF7 => {
                self.utf8_acc = u32::from(byte & 0x07);
                self.utf8_remaining = 3;
                Step::NoCharYet
            }
            _ => Step::OneChar('\u{FFFD}'),
        }
    }

    fn c0(&mut self, term: &mut Terminal, byte: u8) -> Step {
        match byte {
            0x00 => return Step::OneChar('\0'),
            0x05 => {
                // ENQ: answerback. An empty answerback string is sent.
            }
            0x07 => term.bell(),
            0x08 => term.backspace(),
            0x09 => self.tab_forward(term, 1),
            0x0A | 0x0B | 0x0C => term.linefeed(self.new_line_mode),
            0x0D => term.carriage_return(),
            0x0E => self.shift_out = true,
            0x0F => self.shift_out = false,
            0x1B => self.enter_escape(),
            _ => {}
        }
        Step::NoCharYet
    }

    fn c1(&mut self, term: &mut Terminal, byte: u8) -> Step {
        match byte {
            0x84 => term.linefeed(self.new_line_mode),
            0x85 => term.linefeed(true),
            0x88 => self.set_tab_stop(term.cursor_x()),
            0x8D => self.reverse_index(term),
            0x90 => self.state = ParseState::Dcs,
            0x9B => self.enter_csi(),
            0x9D => {
                self.state = ParseState::Osc;
                self.osc.clear();
            }
            0x9C => {}
            other => {
                debug!("vt: ignoring C1 control {:02x}", other);
            }
        }
        Step::NoCharYet
    }

    fn escape(&mut self, term: &mut Terminal, byte: u8) -> Step {
        if (0x20..0x30).contains(&byte) {
            self.intermediates.push(byte);
            self.state = ParseState::EscapeIntermediate;
            return Step::NoCharYet;
        }
        self.state = ParseState::Ground;
        match byte {
            b'[' => {
                self.enter_csi();
                Step::NoCharYet
            }
            b']' => {
                self.state = ParseState::Osc;
                self.osc.clear();
                Step::NoCharYet
            }
            b'P' => {
                self.state = ParseState::Dcs;
                Step::NoCharYet
            }
            _ => self.esc_dispatch(term, byte),
        }
    }

    fn esc_dispatch(&mut self, term: &mut Terminal, final_byte: u8) -> Step {
        match self.intermediates.first().copied() {
            None => self.esc_plain(term, final_byte),
            Some(b'#') => self.esc_hash(term, final_byte),
            Some(b'(') => {
                self.g0 = designate_charset(final_byte);
                Step::NoCharYet
            }
            Some(b')') => {
                self.g1 = designate_charset(final_byte);
                Step::NoCharYet
            }
            Some(other) => {
                debug!(
                    "vt: ignoring ESC {} {:02x}",
                    other as char, final_byte
                );
                Step::NoCharYet
            }
        }
    }

    fn esc_plain(&mut self, term: &mut Terminal, byte: u8) -> Step {
        match byte {
            b'7' => {
                self.saved = Some(SavedCursor {
                    x: term.cursor_x(),
                    y: term.cursor_y(),
                    attr: term.attr(),
                    origin_mode: term.origin_mode(),
                    g0: self.g0,
                    g1: self.g1,
                    shift_out: self.shift_out,
                });
            }
            b'8' => {
                if let Some(saved) = self.saved {
                    term.set_origin_mode(saved.origin_mode);
                    term.set_attr(saved.attr);
                    self.g0 = saved.g0;
                    self.g1 = saved.g1;
                    self.shift_out = saved.shift_out;
                    term.cursor_position(
                        if saved.origin_mode {
                            saved.y.saturating_sub(term.scroll_region().0)
                        } else {
                            saved.y
                        },
                        saved.x,
                    );
                }
            }
            b'D' => term.linefeed(false),
            b'E' => term.linefeed(true),
            b'H' => self.set_tab_stop(term.cursor_x()),
            b'M' => self.reverse_index(term),
            b'Z' => self.device_attributes(term),
            b'c' => self.hard_reset(term),
            b'=' => self.app_keypad = true,
            b'>' => self.app_keypad = false,
            b'N' | b'O' => {
                // SS2/SS3: G2/G3 are not tracked; the next printable
                // falls back to the active set.
            }
            b'\\' => {}
            other => {
                debug!("vt: ignoring ESC {:02x}", other);
            }
        }
        Step::NoCharYet
    }

    fn esc_hash(&mut self, term: &mut Terminal, byte: u8) -> Step {
        match byte {
            b'3' => term.set_double_height(DoubleHeight::Top),
            b'4' => term.set_double_height(DoubleHeight::Bottom),
            b'5' => term.set_double_width(false),
            b'6' => term.set_double_width(true),
            b'8' => {
                // DECALN: fill the screen with E and reset the region.
                term.reset_scroll_region();
                term.set_origin_mode(false);
                let bottom = term.visible_rows() - 1;
                let margin = term.right_margin();
                let saved_attr = term.attr();
                term.set_attr(CellAttr::default());
                term.cursor_position(0, 0);
                for row in 0..=bottom {
                    term.cursor_position(row, 0);
                    term.fill_line_with_character(0, margin, 'E', false);
                }
                term.cursor_position(0, 0);
                term.set_attr(saved_attr);
            }
            other => {
                debug!("vt: ignoring ESC # {:02x}", other);
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
            b';' => self.params.push(self.current.take().unwrap_or(0)),
            b'?' | b'>' | b'=' | b'<' => self.private = Some(byte),
            0x20..=0x2F => self.intermediates.push(byte),
            0x40..=0x7E => {
                if let Some(p) = self.current.take() {
                    self.params.push(p);
                }
                self.state = ParseState::Ground;
                self.csi_dispatch(term, byte);
            }
            _ => {
                // Anything else is a syntax error; drop the sequence.
                self.state = ParseState::Ground;
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

    fn csi_dispatch(&mut self, term: &mut Terminal, final_byte: u8) {
        let n = self.param(0, 1) as usize;
        match final_byte {
            b'@' => term.insert_blanks(n),
            b'A' => term.cursor_up(n, true),
            b'B' | b'e' => term.cursor_down(n, true),
            b'C' | b'a' => term.cursor_right(n, true),
            b'D' => term.cursor_left(n, true),
            b'E' => {
                term.cursor_down(n, true);
                term.carriage_return();
            }
            b'F' => {
                term.cursor_up(n, true);
                term.carriage_return();
            }
            b'G' | b'`' => self.set_column(term, n.saturating_sub(1)),
            b'H' | b'f' => {
                let row = self.param(0, 1) as usize - 1;
                let col = self.param(1, 1) as usize - 1;
                term.cursor_position(row, col);
            }
            b'I' => self.tab_forward(term, n),
            b'J' => self.erase_display(term),
            b'K' => self.erase_line(term),
            b'L' => {
                let (_, bottom) = term.scroll_region();
                if term.cursor_y() <= bottom {
                    term.scroll_region_down(term.cursor_y(), bottom, n);
                }
            }
            b'M' => {
                let (_, bottom) = term.scroll_region();
                if term.cursor_y() <= bottom {
                    term.scroll_region_up(term.cursor_y(), bottom, n);
                }
            }
            b'P' => term.delete_character(n),
            b'S' => {
                let (top, bottom) = term.scroll_region();
                term.scroll_region_up(top, bottom, n);
            }
            b'T' => {
                let (top, bottom) = term.scroll_region();
                term.scroll_region_down(top, bottom, n);
            }
            b'X' => {
                let x = term.cursor_x();
                let end = (x + n - 1).min(term.right_margin());
                term.erase_line(x, end, false);
            }
            b'Z' => self.tab_backward(term, n),
            b'c' => self.device_attributes(term),
            b'd' => {
                let row = n.saturating_sub(1);
                let col = term.cursor_x();
                let row = if term.origin_mode() {
                    row
                } else {
                    row.min(term.visible_rows() - 1)
                };
                term.cursor_position(row, col);
            }
            b'g' => match self.param(0, 0) {
                0 => self.clear_tab_stop(term.cursor_x()),
                3 => self.tab_stops.clear(),
                _ => {}
            },
            b'h' => self.set_modes(term, true),
            b'l' => self.set_modes(term, false),
            b'm' => self.sgr(term),
            b'n' => match self.param(0, 0) {
                5 => term.reply(b"\x1b[0n"),
                6 => {
                    let report =
                        format!("\x1b[{};{}R", term.cursor_y() + 1, term.cursor_x() + 1);
                    term.reply(report.as_bytes());
                }
                _ => {}
            },
            b'p' => {
                if self.intermediates.first() == Some(&b'!') {
                    self.soft_reset(term);
                }
            }
            b'q' => {
                if self.intermediates.first() == Some(&b'"') && self.is_vt220_or_better() {
                    let mut attr = term.attr();
                    match self.param(0, 0) {
                        1 => attr.set(Style::PROTECT),
                        _ => attr.clear(Style::PROTECT),
                    }
                    term.set_attr(attr);
                }
            }
            b'r' => {
                let bottom_default = term.visible_rows() as u16;
                let top = self.param(0, 1) as usize - 1;
                let bottom = self.param(1, bottom_default) as usize - 1;
                term.reset_scroll_region();
                term.set_scroll_region(top, bottom);
                term.cursor_position(0, 0);
            }
            b's' => {
                self.saved = Some(SavedCursor {
                    x: term.cursor_x(),
                    y: term.cursor_y(),
                    attr: term.attr(),
                    origin_mode: term.origin_mode(),
                    g0: self.g0,
                    g1: self.g1,
                    shift_out: self.shift_out,
                });
            }
            b'u' => {
                if let Some(saved) = self.saved {
                    term.cursor_position(saved.y, saved.x);
                    term.set_attr(saved.attr);
                }
            }
            other => {
                debug!("vt: ignoring CSI final {:02x}", other);
            }
        }
    }

    fn set_column(&self, term: &mut Terminal, col: usize) {
        let row = if term.origin_mode() {
            term.cursor_y().saturating_sub(term.scroll_region().0)
        } else {
            term.cursor_y()
        };
        term.cursor_position(row, col);
    }

    fn erase_display(&mut self, term: &mut Terminal) {
        // With the `?` marker this is DECSED, which spares protected
        // cells on terminals that have DECSCA.
        let honor = self.private == Some(b'?') && self.is_vt220_or_better();
        let margin = term.right_margin();
        let bottom = term.visible_rows() - 1;
        match self.param(0, 0) {
            0 => {
                let (x, y) = (term.cursor_x(), term.cursor_y());
                term.erase_line(x, margin, honor);
                if y < bottom {
                    term.erase_screen(y + 1, 0, bottom, margin, honor);
                }
            }
            1 => {
                let (x, y) = (term.cursor_x(), term.cursor_y());
                if y > 0 {
                    term.erase_screen(0, 0, y - 1, margin, honor);
                }
                term.erase_line(0, x, honor);
            }
            2 => term.erase_screen(0, 0, bottom, margin, honor),
            _ => {}
        }
    }

    fn erase_line(&mut self, term: &mut Terminal) {
        let honor = self.private == Some(b'?') && self.is_vt220_or_better();
        let margin = term.right_margin();
        let x = term.cursor_x();
        match self.param(0, 0) {
            0 => term.erase_line(x, margin, honor),
            1 => term.erase_line(0, x, honor),
            2 => term.erase_line(0, margin, honor),
            _ => {}
        }
    }

    fn set_modes(&mut self, term: &mut Terminal, on: bool) {
        let private = self.private == Some(b'?');
        for i in 0..self.params.len().max(1) {
            let mode = self.param(i, 0);
            if private {
                match mode {
                    1 => self.app_cursor = on,
                    3 => {
                        // DECCOLM: the column count is pinned, but the
                        // side effect (clear + home) is honored.
                        let bottom = term.visible_rows() - 1;
                        let margin = term.right_margin();
                        term.erase_screen(0, 0, bottom, margin, false);
                        term.cursor_position(0, 0);
                    }
                    5 => term.set_reverse_video(on),
                    6 => {
                        term.set_origin_mode(on);
                        term.cursor_position(0, 0);
                    }
                    7 => term.set_auto_wrap(on),
                    25 => term.set_visible_cursor(on),
                    other => {
                        debug!("vt: ignoring private mode {} {}", other, on);
                    }
                }
            } else {
                match mode {
                    4 => term.set_insert_mode(on),
                    20 => {
                        self.new_line_mode = on;
                        term.set_line_feed_on_cr(on);
                    }
                    other => {
                        debug!("vt: ignoring mode {} {}", other, on);
                    }
                }
            }
        }
    }

    fn sgr(&mut self, term: &mut Terminal) {
        let mut attr = term.attr();
        let params: Vec<u16> = if self.params.is_empty() {
            vec![0]
        } else {
            self.params.clone()
        };
        let mut i = 0;
        while i < params.len() {
            match params[i] {
                0 => attr = CellAttr::default(),
                1 => attr.set(Style::BOLD),
                4 => attr.set(Style::UNDERLINE),
                5 => attr.set(Style::BLINK),
                7 => attr.set(Style::REVERSE),
                21 | 22 => attr.clear(Style::BOLD),
                24 => attr.clear(Style::UNDERLINE),
                25 => attr.clear(Style::BLINK),
                27 => attr.clear(Style::REVERSE),
                30..=37 => attr.set_fg((params[i] - 30) as u8),
                39 => attr.set_fg(CellAttr::default().fg()),
                40..=47 => attr.set_bg((params[i] - 40) as u8),
                49 => attr.set_bg(CellAttr::default().bg()),
                // Extended color forms are parsed past, not honored.
                38 | 48 => {
                    if params.get(i + 1) == Some(&5) {
                        i += 2;
                    } else if params.get(i + 1) == Some(&2) {
                        i += 4;
                    }
                }
                90..=97 => {
                    attr.set_fg((params[i] - 90) as u8);
                    attr.set(Style::BOLD);
                }
                100..=107 => {
                    attr.set_bg((params[i] - 100) as u8);
                    attr.set(Style::BLINK);
                }
                other => {
                    debug!("vt: ignoring SGR {}", other);
                }
            }
            i += 1;
        }
        term.set_attr(attr);
    }

    fn device_attributes(&self, term: &mut Terminal) {
        if self.private == Some(b'>') {
            term.reply(b"\x1b[>1;10;0c");
            return;
        }
        let reply: &[u8] = match self.kind {
            Emulation::Vt100 => b"\x1b[?1;2c",
            Emulation::Vt102 | Emulation::Linux | Emulation::LinuxUtf8 => b"\x1b[?6c",
            _ => b"\x1b[?62;1;6c",
        };
        term.reply(reply);
    }

    fn reverse_index(&mut self, term: &mut Terminal) {
        let (top, bottom) = term.scroll_region();
        if term.cursor_y() == top {
            term.scroll_region_down(top, bottom, 1);
        } else {
            term.cursor_up(1, true);
        }
    }

    fn tab_forward(&mut self, term: &mut Terminal, count: usize) {
        for _ in 0..count {
            let x = term.cursor_x();
            let target = self
                .tab_stops
                .iter()
                .copied()
                .find(|&stop| stop > x)
                .unwrap_or(term.right_margin())
                .min(term.right_margin());
            term.cursor_right(target.saturating_sub(x), true);
        }
    }

    fn tab_backward(&mut self, term: &mut Terminal, count: usize) {
        for _ in 0..count {
            let x = term.cursor_x();
            let target = self
                .tab_stops
                .iter()
                .rev()
                .copied()
                .find(|&stop| stop < x)
                .unwrap_or(0);
            term.cursor_left(x.saturating_sub(target), true);
        }
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

    fn osc_dispatch(&mut self, term: &mut Terminal) {
        let _ = term;
        if let Ok(text) = std::str::from_utf8(&self.osc) {
            debug!("vt: ignoring OSC {:?}", text);
        }
        self.osc.clear();
    }

    fn soft_reset(&mut self, term: &mut Terminal) {
        term.set_origin_mode(false);
        term.set_insert_mode(false);
        term.set_auto_wrap(term.options().line_wrap);
        term.set_visible_cursor(true);
        term.reset_scroll_region();
        term.set_attr(CellAttr::default());
        self.app_cursor = false;
        self.app_keypad = false;
        self.shift_out = false;
        self.g0 = Charset::Ascii;
        self.g1 = Charset::DecGraphics;
    }

    fn hard_reset(&mut self, term: &mut Terminal) {
        let kind = self.kind;
        *self = VtState::new(kind);
        term.set_emulation(kind);
        term.set_attr(CellAttr::default());
        let bottom = term.visible_rows() - 1;
        let margin = term.right_margin();
        term.erase_screen(0, 0, bottom, margin, false);
        term.cursor_position(0, 0);
    }

    pub fn encode_key(&self, key: TerminalKey, term: &Terminal) -> String {
        let is_xterm = matches!(self.kind, Emulation::Xterm | Emulation::XtermUtf8);
        let is_linux = matches!(self.kind, Emulation::Linux | Emulation::LinuxUtf8);
        match key {
            TerminalKey::Up | TerminalKey::Down | TerminalKey::Right | TerminalKey::Left => {
                let ch = match key {
                    TerminalKey::Up => 'A',
                    TerminalKey::Down => 'B',
                    TerminalKey::Right => 'C',
                    _ => 'D',
                };
                if self.app_cursor {
                    format!("\x1bO{}", ch)
                } else {
                    format!("\x1b[{}", ch)
                }
            }
            TerminalKey::Home => {
                if is_xterm {
                    "\x1b[H".into()
                } else {
                    "\x1b[1~".into()
                }
            }
            TerminalKey::End => {
                if is_xterm {
                    "\x1b[F".into()
                } else {
                    "\x1b[4~".into()
                }
            }
            TerminalKey::PageUp => "\x1b[5~".into(),
            TerminalKey::PageDown => "\x1b[6~".into(),
            TerminalKey::Insert => "\x1b[2~".into(),
            TerminalKey::Delete => "\x1b[3~".into(),
            TerminalKey::Backspace => "\x7f".into(),
            TerminalKey::Tab => "\t".into(),
            TerminalKey::BackTab => "\x1b[Z".into(),
            TerminalKey::Escape => "\x1b".into(),
            TerminalKey::Enter => {
                if self.new_line_mode || term.line_feed_on_cr() {
                    "\r\n".into()
                } else {
                    "\r".into()
                }
            }
            TerminalKey::F(n @ 1..=5) if is_linux => {
                let ch = (b'A' + n - 1) as char;
                format!("\x1b[[{}", ch)
            }
            TerminalKey::F(n @ 1..=4)
                if matches!(self.kind, Emulation::Vt100 | Emulation::Vt102) || is_xterm =>
            {
                let ch = (b'P' + n - 1) as char;
                format!("\x1bO{}", ch)
            }
            TerminalKey::F(n @ 1..=12) => {
                let code = match n {
                    1 => 11,
                    2 => 12,
                    3 => 13,
                    4 => 14,
                    5 => 15,
                    6 => 17,
                    7 => 18,
                    8 => 19,
                    9 => 20,
                    10 => 21,
                    11 => 23,
                    _ => 24,
                };
                format!("\x1b[{}~", code)
            }
            TerminalKey::F(_) => String::new(),
            TerminalKey::Char(c) => c.to_string(),
        }
    }
}

fn designate_charset(byte: u8) -> Charset {
    match byte {
        b'0' => Charset::DecGraphics,
        b'A' => Charset::Uk,
        _ => Charset::Ascii,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulation::{Emulation, EmulationState};
    use crate::term::test_terminal;

    fn setup(kind: Emulation) -> (Terminal, EmulationState) {
        let mut term = test_terminal();
        term.set_emulation(kind);
        (term, EmulationState::new(kind))
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
    fn test_cup_and_sgr() {
        let (mut term, mut state) = setup(Emulation::Vt100);
        feed(&mut term, &mut state, b"\x1b[3;5H\x1b[7mX");
        let line = term.scrollback().line(term.row_index(2));
        assert_eq!(line.char_at(4), 'X');
        assert!(line.attr_at(4).has(Style::REVERSE));
    }

    #[test]
    fn test_scroll_region_confines_linefeed() {
        let (mut term, mut state) = setup(Emulation::Vt100);
        feed(&mut term, &mut state, b"\x1b[5;10r");
        assert_eq!(term.scroll_region(), (4, 9));
        assert_eq!((term.cursor_y(), term.cursor_x()), (0, 0));
        feed(&mut term, &mut state, b"\x1b[10;1Ha");
        for _ in 0..3 {
            feed(&mut term, &mut state, b"\n");
        }
        // Cursor pinned to the region bottom, screen did not grow.
        assert_eq!(term.cursor_y(), 9);
    }

    #[test]
    fn test_origin_mode_homes_into_region() {
        let (mut term, mut state) = setup(Emulation::Vt100);
        feed(&mut term, &mut state, b"\x1b[5;10r\x1b[?6h\x1b[HX");
        let line = term.scrollback().line(term.row_index(4));
        assert_eq!(line.char_at(0), 'X');
    }

    #[test]
    fn test_dec_graphics_charset() {
        let (mut term, mut state) = setup(Emulation::Vt100);
        feed(&mut term, &mut state, b"\x1b(0qq\x1b(Bqq");
        assert_eq!(row_text(&term, 0), "\u{2500}\u{2500}qq");
    }

    #[test]
    fn test_shift_in_out() {
        let (mut term, mut state) = setup(Emulation::Vt100);
        feed(&mut term, &mut state, b"q\x0eq\x0fq");
        assert_eq!(row_text(&term, 0), "q\u{2500}q");
    }

    #[test]
    fn test_device_attributes_per_variant() {
        for (kind, reply) in [
            (Emulation::Vt100, &b"\x1b[?1;2c"[..]),
            (Emulation::Vt102, &b"\x1b[?6c"[..]),
            (Emulation::Vt220, &b"\x1b[?62;1;6c"[..]),
        ] {
            let (mut term, mut state) = setup(kind);
            feed(&mut term, &mut state, b"\x1b[c");
            assert_eq!(term.take_reply(), reply, "kind {:?}", kind);
        }
    }

    #[test]
    fn test_decaln_fills_screen() {
        let (mut term, mut state) = setup(Emulation::Vt100);
        feed(&mut term, &mut state, b"\x1b#8");
        assert!(row_text(&term, 0).chars().all(|c| c == 'E'));
        assert!(row_text(&term, 23).chars().all(|c| c == 'E'));
        assert_eq!((term.cursor_x(), term.cursor_y()), (0, 0));
    }

    #[test]
    fn test_double_width_line_tags() {
        let (mut term, mut state) = setup(Emulation::Vt100);
        feed(&mut term, &mut state, b"\x1b#6wide");
        let line = term.scrollback().line(term.row_index(0));
        assert!(line.double_width);
        feed(&mut term, &mut state, b"\x1b#3");
        let line = term.scrollback().line(term.row_index(0));
        assert_eq!(line.double_height, DoubleHeight::Top);
    }

    #[test]
    fn test_tab_stops_set_and_clear() {
        let (mut term, mut state) = setup(Emulation::Vt100);
        // Clear all stops, set one at column 5.
        feed(&mut term, &mut state, b"\x1b[3g\x1b[6G\x1bH\x1b[G");
        feed(&mut term, &mut state, b"\t");
        assert_eq!(term.cursor_x(), 5);
        feed(&mut term, &mut state, b"\t");
        assert_eq!(term.cursor_x(), 79);
    }

    #[test]
    fn test_insert_and_delete_lines() {
        let (mut term, mut state) = setup(Emulation::Vt102);
        feed(&mut term, &mut state, b"one\r\ntwo\r\nthree");
        feed(&mut term, &mut state, b"\x1b[2;1H\x1b[L");
        assert_eq!(row_text(&term, 1).trim_end(), "");
        assert_eq!(row_text(&term, 2).trim_end(), "two");
        feed(&mut term, &mut state, b"\x1b[M");
        assert_eq!(row_text(&term, 1).trim_end(), "two");
    }

    #[test]
    fn test_protected_cells_survive_selective_erase() {
        let (mut term, mut state) = setup(Emulation::Vt220);
        feed(&mut term, &mut state, b"ab\x1b[1\"qcd\x1b[0\"qef");
        feed(&mut term, &mut state, b"\x1b[1;1H\x1b[?2K");
        assert_eq!(row_text(&term, 0).trim_end(), "  cd");
    }

    #[test]
    fn test_plain_erase_ignores_protection() {
        let (mut term, mut state) = setup(Emulation::Vt220);
        feed(&mut term, &mut state, b"ab\x1b[1\"qcd");
        feed(&mut term, &mut state, b"\x1b[2K");
        assert_eq!(row_text(&term, 0).trim_end(), "");
    }

    #[test]
    fn test_utf8_decoding() {
        let (mut term, mut state) = setup(Emulation::XtermUtf8);
        feed(&mut term, &mut state, "héllo ┐".as_bytes());
        assert_eq!(row_text(&term, 0), "héllo ┐");
    }

    #[test]
    fn test_utf8_invalid_sequence_is_replaced() {
        let (mut term, mut state) = setup(Emulation::LinuxUtf8);
        feed(&mut term, &mut state, &[0xC3, b'x']);
        assert_eq!(row_text(&term, 0), "\u{FFFD}x");
    }

    #[test]
    fn test_8bit_csi_on_vt220() {
        let (mut term, mut state) = setup(Emulation::Vt220);
        feed(&mut term, &mut state, &[0x9B, b'3', b'C', b'x']);
        let line = term.scrollback().line(term.row_index(0));
        assert_eq!(line.char_at(3), 'x');
    }

    #[test]
    fn test_osc_title_is_consumed() {
        let (mut term, mut state) = setup(Emulation::XtermUtf8);
        feed(&mut term, &mut state, b"\x1b]0;my title\x07after");
        assert_eq!(row_text(&term, 0), "after");
    }

    #[test]
    fn test_reverse_index_at_top_scrolls_down() {
        let (mut term, mut state) = setup(Emulation::Vt100);
        feed(&mut term, &mut state, b"first\x1b[H\x1bM");
        assert_eq!(row_text(&term, 1), "first");
        assert_eq!(term.cursor_y(), 0);
    }

    #[test]
    fn test_app_cursor_mode_changes_arrows() {
        let (mut term, mut state) = setup(Emulation::Vt100);
        assert_eq!(state.encode_key(TerminalKey::Up, &term), "\x1b[A");
        feed(&mut term, &mut state, b"\x1b[?1h");
        assert_eq!(state.encode_key(TerminalKey::Up, &term), "\x1bOA");
    }

    #[test]
    fn test_function_keys_per_variant() {
        let (term, state) = setup(Emulation::Vt100);
        assert_eq!(state.encode_key(TerminalKey::F(1), &term), "\x1bOP");
        let (term, state) = setup(Emulation::Linux);
        assert_eq!(state.encode_key(TerminalKey::F(1), &term), "\x1b[[A");
        let (term, state) = setup(Emulation::Vt220);
        assert_eq!(state.encode_key(TerminalKey::F(6), &term), "\x1b[17~");
    }

    #[test]
    fn test_linux_sgr_bright_colors() {
        let (mut term, mut state) = setup(Emulation::Linux);
        feed(&mut term, &mut state, b"\x1b[94mx");
        let line = term.scrollback().line(term.row_index(0));
        assert_eq!(line.attr_at(0).fg(), crate::term::attr::BLUE);
        assert!(line.attr_at(0).has(Style::BOLD));
    }

    #[test]
    fn test_decsc_decrc_roundtrip() {
        let (mut term, mut state) = setup(Emulation::Vt100);
        feed(&mut term, &mut state, b"\x1b[5;20H\x1b[7m\x1b7\x1b[H\x1b[m\x1b8");
        assert_eq!((term.cursor_y(), term.cursor_x()), (4, 19));
        assert!(term.attr().has(Style::REVERSE));
    }
}
