//! Emulation state machines
//!
//! Each variant is a byte-at-a-time finite state machine. A step either
//! swallows the byte (control handling happens as direct commands
//! against the terminal), yields one displayable code point, or signals
//! that an internal buffer holds more output; in the last case the
//! dispatcher keeps draining with the sentinel (no byte) until the
//! machine runs dry. Every displayable code point funnels through
//! [`crate::term::Terminal::print_character`].

pub mod charset;
pub mod keys;

mod ansi;
mod atascii;
mod avatar;
mod debug;
mod petscii;
mod tty;
mod vt52;
mod vt100;

pub use ansi::AnsiState;
pub use atascii::AtasciiState;
pub use avatar::AvatarState;
pub use debug::DebugState;
pub use keys::TerminalKey;
pub use petscii::PetsciiState;
pub use tty::TtyState;
pub use vt52::Vt52State;
pub use vt100::VtState;

use crate::term::Terminal;

/// The supported emulation variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emulation {
    Tty,
    Ansi,
    Avatar,
    Vt52,
    Vt100,
    Vt102,
    Vt220,
    Linux,
    LinuxUtf8,
    Xterm,
    XtermUtf8,
    Petscii,
    Atascii,
    Debug,
}

impl Emulation {
    pub const ALL: [Emulation; 14] = [
        Emulation::Tty,
        Emulation::Ansi,
        Emulation::Avatar,
        Emulation::Vt52,
        Emulation::Vt100,
        Emulation::Vt102,
        Emulation::Vt220,
        Emulation::Linux,
        Emulation::LinuxUtf8,
        Emulation::Xterm,
        Emulation::XtermUtf8,
        Emulation::Petscii,
        Emulation::Atascii,
        Emulation::Debug,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Emulation::Tty => "TTY",
            Emulation::Ansi => "ANSI",
            Emulation::Avatar => "AVATAR",
            Emulation::Vt52 => "VT52",
            Emulation::Vt100 => "VT100",
            Emulation::Vt102 => "VT102",
            Emulation::Vt220 => "VT220",
            Emulation::Linux => "LINUX",
            Emulation::LinuxUtf8 => "L_UTF8",
            Emulation::Xterm => "XTERM",
            Emulation::XtermUtf8 => "X_UTF8",
            Emulation::Petscii => "PETSCII",
            Emulation::Atascii => "ATASCII",
            Emulation::Debug => "DEBUG",
        }
    }

    pub fn from_name(name: &str) -> Option<Emulation> {
        Emulation::ALL
            .iter()
            .copied()
            .find(|e| e.label().eq_ignore_ascii_case(name))
    }

    /// Variants that use the two-phase deferred wrap at the right margin
    pub fn is_vt_family(&self) -> bool {
        matches!(
            self,
            Emulation::Vt100
                | Emulation::Vt102
                | Emulation::Vt220
                | Emulation::Linux
                | Emulation::LinuxUtf8
                | Emulation::Xterm
                | Emulation::XtermUtf8
        )
    }

    /// Variants whose erased cells keep the current background color
    /// instead of resetting to the default attribute
    pub fn back_color_erase(&self) -> bool {
        !matches!(
            self,
            Emulation::Vt52
                | Emulation::Vt100
                | Emulation::Vt102
                | Emulation::Vt220
                | Emulation::Linux
                | Emulation::LinuxUtf8
                | Emulation::Xterm
                | Emulation::XtermUtf8
        )
    }

    /// Variants that decode incoming bytes as UTF-8
    pub fn is_utf8(&self) -> bool {
        matches!(self, Emulation::LinuxUtf8 | Emulation::XtermUtf8)
    }

    /// The codepage raw bytes display in under this variant
    pub fn codepage(&self) -> charset::Codepage {
        if self.is_vt_family() {
            charset::Codepage::Latin1
        } else {
            charset::Codepage::Cp437
        }
    }
}

/// Result of feeding one byte (or the drain sentinel) to a state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The byte was consumed; nothing to display yet
    NoCharYet,
    /// One code point to display
    OneChar(char),
    /// A code point to display, with more buffered; keep draining
    ManyChars(char),
}

/// Tagged per-variant state. Each arm carries only what that variant
/// needs; switching emulations rebuilds the value from scratch.
pub enum EmulationState {
    Tty(TtyState),
    Ansi(AnsiState),
    Avatar(AvatarState),
    Vt52(Vt52State),
    Vt(VtState),
    Petscii(PetsciiState),
    Atascii(AtasciiState),
    Debug(DebugState),
}

impl EmulationState {
    pub fn new(kind: Emulation) -> Self {
        match kind {
            Emulation::Tty => EmulationState::Tty(TtyState::new()),
            Emulation::Ansi => EmulationState::Ansi(AnsiState::new()),
            Emulation::Avatar => EmulationState::Avatar(AvatarState::new()),
            Emulation::Vt52 => EmulationState::Vt52(Vt52State::new()),
            Emulation::Vt100
            | Emulation::Vt102
            | Emulation::Vt220
            | Emulation::Linux
            | Emulation::LinuxUtf8
            | Emulation::Xterm
            | Emulation::XtermUtf8 => EmulationState::Vt(VtState::new(kind)),
            Emulation::Petscii => EmulationState::Petscii(PetsciiState::new()),
            Emulation::Atascii => EmulationState::Atascii(AtasciiState::new()),
            Emulation::Debug => EmulationState::Debug(DebugState::new()),
        }
    }

    /// Feed one byte (`Some`) or drain buffered output (`None`)
    pub fn step(&mut self, term: &mut Terminal, byte: Option<u8>) -> Step {
        match self {
            EmulationState::Tty(state) => state.step(term, byte),
            EmulationState::Ansi(state) => state.step(term, byte),
            EmulationState::Avatar(state) => state.step(term, byte),
            EmulationState::Vt52(state) => state.step(term, byte),
            EmulationState::Vt(state) => state.step(term, byte),
            EmulationState::Petscii(state) => state.step(term, byte),
            EmulationState::Atascii(state) => state.step(term, byte),
            EmulationState::Debug(state) => state.step(term, byte),
        }
    }

    /// Clear internal parser state and restore the variant's margin and
    /// mode invariants. The deferred-wrap flag is always cleared.
    pub fn reset(&mut self, term: &mut Terminal) {
        let kind = term.emulation();
        term.set_emulation(kind);
        *self = EmulationState::new(kind);
    }

    /// Called when the host switches away from this variant; the hex
    /// view uses it to flush a partial trailing dump row.
    pub fn finish(&mut self, term: &mut Terminal) {
        if let EmulationState::Debug(state) = self {
            state.finish(term);
        }
    }

    /// Encode an abstract key into the string the transport should send
    pub fn encode_key(&self, key: TerminalKey, term: &Terminal) -> String {
        match self {
            EmulationState::Vt(state) => state.encode_key(key, term),
            EmulationState::Vt52(state) => state.encode_key(key),
            EmulationState::Petscii(_) => keys::encode_petscii(key),
            EmulationState::Atascii(_) => keys::encode_atascii(key),
            _ => keys::encode_bbs(key, term),
        }
    }

    /// Drive the full contract for one incoming byte: step, print any
    /// yielded code points, and drain `ManyChars` with the sentinel.
    pub fn consume(&mut self, term: &mut Terminal, byte: u8) {
        let mut result = self.step(term, Some(byte));
        loop {
            match result {
                Step::NoCharYet => break,
                Step::OneChar(ch) => {
                    term.print_character(ch);
                    break;
                }
                Step::ManyChars(ch) => {
                    term.print_character(ch);
                    result = self.step(term, None);
                }
            }
        }
    }
}
