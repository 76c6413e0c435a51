//! Keystroke encoding
//!
//! The host translates crossterm key events into this abstract key set;
//! the active emulation then encodes each key as the string its remote
//! end expects. The VT family and VT52 encoders live with their state
//! machines (they depend on mode flags); the byte-oriented variants are
//! covered here.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::term::Terminal;

/// Abstract keys the emulations know how to encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalKey {
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    Backspace,
    Enter,
    Escape,
    Tab,
    BackTab,
    F(u8),
    Char(char),
}

/// Map a crossterm key event to the abstract key set. Control-modified
/// letters become their control bytes; anything the emulations cannot
/// express returns `None`.
pub fn from_key_event(event: &KeyEvent) -> Option<TerminalKey> {
    match event.code {
        KeyCode::Up => Some(TerminalKey::Up),
        KeyCode::Down => Some(TerminalKey::Down),
        KeyCode::Left => Some(TerminalKey::Left),
        KeyCode::Right => Some(TerminalKey::Right),
        KeyCode::Home => Some(TerminalKey::Home),
        KeyCode::End => Some(TerminalKey::End),
        KeyCode::PageUp => Some(TerminalKey::PageUp),
        KeyCode::PageDown => Some(TerminalKey::PageDown),
        KeyCode::Insert => Some(TerminalKey::Insert),
        KeyCode::Delete => Some(TerminalKey::Delete),
        KeyCode::Backspace => Some(TerminalKey::Backspace),
        KeyCode::Enter => Some(TerminalKey::Enter),
        KeyCode::Esc => Some(TerminalKey::Escape),
        KeyCode::Tab => Some(TerminalKey::Tab),
        KeyCode::BackTab => Some(TerminalKey::BackTab),
        KeyCode::F(n) => Some(TerminalKey::F(n)),
        KeyCode::Char(c) => {
            if event.modifiers.contains(KeyModifiers::CONTROL) {
                let upper = c.to_ascii_uppercase();
                if upper.is_ascii_uppercase() {
                    let ctrl = (upper as u8) & 0x1F;
                    return Some(TerminalKey::Char(ctrl as char));
                }
                // Ctrl-Space and friends.
                if c == ' ' {
                    return Some(TerminalKey::Char('\0'));
                }
                Some(TerminalKey::Char(c))
            } else {
                Some(TerminalKey::Char(c))
            }
        }
        _ => None,
    }
}

/// Encoder for the BBS family (TTY, ANSI, Avatar, hex view): ANSI.SYS
/// cursor strings, DOS-style editing keys.
pub fn encode_bbs(key: TerminalKey, term: &Terminal) -> String {
    match key {
        TerminalKey::Up => "\x1b[A".into(),
        TerminalKey::Down => "\x1b[B".into(),
        TerminalKey::Right => "\x1b[C".into(),
        TerminalKey::Left => "\x1b[D".into(),
        TerminalKey::Home => "\x1b[H".into(),
        TerminalKey::End => "\x1b[K".into(),
        TerminalKey::PageUp => "\x1b[V".into(),
        TerminalKey::PageDown => "\x1b[U".into(),
        TerminalKey::Insert => "\x1b[@".into(),
        TerminalKey::Delete => "\x7f".into(),
        TerminalKey::Backspace => "\x08".into(),
        TerminalKey::Tab => "\t".into(),
        TerminalKey::BackTab => "\x1b[Z".into(),
        TerminalKey::Escape => "\x1b".into(),
        TerminalKey::Enter => {
            if term.line_feed_on_cr() {
                "\r\n".into()
            } else {
                "\r".into()
            }
        }
        TerminalKey::F(n @ 1..=10) => {
            // DoorWay-style function key strings.
            let codes = [b'P', b'Q', b'w', b'x', b't', b'u', b'q', b'r', b'p', b'M'];
            format!("\x1bO{}", codes[usize::from(n) - 1] as char)
        }
        TerminalKey::F(_) => String::new(),
        TerminalKey::Char(c) => c.to_string(),
    }
}

/// PETSCII control bytes as the C64 keyboard produces them
pub fn encode_petscii(key: TerminalKey) -> String {
    let byte: u8 = match key {
        TerminalKey::Up => 0x91,
        TerminalKey::Down => 0x11,
        TerminalKey::Left => 0x9D,
        TerminalKey::Right => 0x1D,
        TerminalKey::Home => 0x13,
        TerminalKey::Insert => 0x94,
        TerminalKey::Delete | TerminalKey::Backspace => 0x14,
        TerminalKey::Enter => 0x0D,
        TerminalKey::F(n @ 1..=8) => {
            // F1/F3/F5/F7 are the unshifted keys.
            const F_KEYS: [u8; 8] = [0x85, 0x89, 0x86, 0x8A, 0x87, 0x8B, 0x88, 0x8C];
            F_KEYS[usize::from(n) - 1]
        }
        TerminalKey::Char(c) => {
            // Letter case is swapped on the PETSCII wire.
            let swapped = if c.is_ascii_lowercase() {
                c.to_ascii_uppercase()
            } else if c.is_ascii_uppercase() {
                c.to_ascii_lowercase()
            } else {
                c
            };
            return swapped.to_string();
        }
        _ => return String::new(),
    };
    char::from(byte).to_string()
}

/// ATASCII control bytes per the Atari keyboard
pub fn encode_atascii(key: TerminalKey) -> String {
    let byte: u8 = match key {
        TerminalKey::Up => 0x1C,
        TerminalKey::Down => 0x1D,
        TerminalKey::Left => 0x1E,
        TerminalKey::Right => 0x1F,
        TerminalKey::Backspace => 0x7E,
        TerminalKey::Delete => 0xFE,
        TerminalKey::Insert => 0xFF,
        TerminalKey::Tab => 0x7F,
        TerminalKey::Enter => 0x9B,
        TerminalKey::Escape => 0x1B,
        TerminalKey::Char(c) if c.is_ascii() => c as u8,
        _ => return String::new(),
    };
    char::from(byte).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{test_terminal, Terminal};
    use crossterm::event::KeyEventKind;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        let mut event = KeyEvent::new(code, modifiers);
        event.kind = KeyEventKind::Press;
        event
    }

    #[test]
    fn test_key_event_mapping() {
        assert_eq!(
            from_key_event(&key(KeyCode::Up, KeyModifiers::NONE)),
            Some(TerminalKey::Up)
        );
        assert_eq!(
            from_key_event(&key(KeyCode::Char('a'), KeyModifiers::NONE)),
            Some(TerminalKey::Char('a'))
        );
        assert_eq!(
            from_key_event(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(TerminalKey::Char('\x03'))
        );
    }

    #[test]
    fn test_bbs_enter_respects_lf_on_cr() {
        let mut term: Terminal = test_terminal();
        assert_eq!(encode_bbs(TerminalKey::Enter, &term), "\r");
        term.set_line_feed_on_cr(true);
        assert_eq!(encode_bbs(TerminalKey::Enter, &term), "\r\n");
    }

    #[test]
    fn test_petscii_case_swap() {
        assert_eq!(encode_petscii(TerminalKey::Char('a')), "A");
        assert_eq!(encode_petscii(TerminalKey::Char('A')), "a");
        assert_eq!(encode_petscii(TerminalKey::Up), "\u{91}");
    }

    #[test]
    fn test_atascii_keys() {
        assert_eq!(encode_atascii(TerminalKey::Enter), "\u{9b}");
        assert_eq!(encode_atascii(TerminalKey::Up), "\u{1c}");
        assert_eq!(encode_atascii(TerminalKey::PageUp), "");
    }
}
