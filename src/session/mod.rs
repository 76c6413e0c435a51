//! Session management
//!
//! A session owns the terminal engine, the active emulation state
//! machine, and the transport carrying bytes to and from the remote
//! end. It pumps received bytes through the emulation, flushes the
//! engine's replies back out, applies half-duplex local echo, and keeps
//! the console-flood heuristic that the host consults before starting
//! opportunistic behaviors.

pub mod pty;

pub use pty::{ExitInfo, PtyTransport};

use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::debug;

use crate::config::Config;
use crate::emulation::{Emulation, EmulationState};
use crate::term::{TermOptions, Terminal};

/// Byte-level transport surface; no framing
pub trait Transport {
    /// Non-blocking read; 0 means nothing available right now
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
    fn write(&mut self, data: &[u8]) -> Result<usize>;
}

/// Bytes per second past which the console counts as flooded
const FLOOD_BYTES_PER_WINDOW: usize = 4096;
const FLOOD_WINDOW: Duration = Duration::from_secs(1);

/// Sliding-window byte rate tracker
#[derive(Debug)]
struct FloodMeter {
    window_start: Instant,
    bytes: usize,
    flooded: bool,
}

impl FloodMeter {
    fn new() -> Self {
        Self {
            window_start: Instant::now(),
            bytes: 0,
            flooded: false,
        }
    }

    fn record(&mut self, n: usize) {
        let now = Instant::now();
        if now.duration_since(self.window_start) > FLOOD_WINDOW {
            self.flooded = self.bytes > FLOOD_BYTES_PER_WINDOW;
            self.window_start = now;
            self.bytes = 0;
        }
        self.bytes += n;
        if self.bytes > FLOOD_BYTES_PER_WINDOW {
            self.flooded = true;
        }
    }

    fn flooded(&self) -> bool {
        self.flooded
    }
}

pub struct Session<T: Transport> {
    term: Terminal,
    emulation: EmulationState,
    transport: T,
    strip_8th_bit: bool,
    flood: FloodMeter,
    read_buf: Vec<u8>,
}

impl<T: Transport> Session<T> {
    pub fn new(config: &Config, transport: T) -> Self {
        let kind = Emulation::from_name(&config.emulation).unwrap_or(Emulation::Ansi);
        let mut term = Terminal::new(80, 25, TermOptions::from(config));
        term.set_emulation(kind);
        Self {
            term,
            emulation: EmulationState::new(kind),
            transport,
            strip_8th_bit: config.strip_8th_bit,
            flood: FloodMeter::new(),
            read_buf: vec![0u8; 4096],
        }
    }

    pub fn terminal(&self) -> &Terminal {
        &self.term
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal {
        &mut self.term
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn emulation(&self) -> Emulation {
        self.term.emulation()
    }

    /// Switch the active emulation, flushing the old state machine
    pub fn set_emulation(&mut self, kind: Emulation) {
        self.emulation.finish(&mut self.term);
        self.term.set_emulation(kind);
        self.emulation = EmulationState::new(kind);
        debug!("emulation switched to {}", kind.label());
    }

    /// Reset the active emulation to its ground state
    pub fn reset_emulation(&mut self) {
        self.emulation.reset(&mut self.term);
    }

    /// True while bytes are arriving faster than a human would send
    /// them; the host suppresses autostart heuristics meanwhile.
    pub fn console_flooded(&self) -> bool {
        self.flood.flooded()
    }

    /// Pump one round of transport input through the emulation. Returns
    /// the number of bytes processed.
    pub fn poll(&mut self) -> Result<usize> {
        let n = self.transport.read(&mut self.read_buf)?;
        if n == 0 {
            return Ok(0);
        }
        self.flood.record(n);
        let utf8 = self.term.emulation().is_utf8();
        for i in 0..n {
            let mut byte = self.read_buf[i];
            if self.strip_8th_bit && !utf8 {
                byte &= 0x7F;
            }
            self.emulation.consume(&mut self.term, byte);
        }
        self.flush_replies()?;
        Ok(n)
    }

    /// Encode and transmit one abstract key
    pub fn send_key(&mut self, key: crate::emulation::TerminalKey) -> Result<()> {
        let encoded = self.emulation.encode_key(key, &self.term);
        if encoded.is_empty() {
            return Ok(());
        }
        let bytes = encode_outgoing(self.term.emulation(), &encoded);
        self.transport.write(&bytes)?;
        self.local_echo(&bytes);
        Ok(())
    }

    /// Transmit raw bytes (pastes, scripted sends)
    pub fn send_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.transport.write(bytes)?;
        self.local_echo(bytes);
        Ok(())
    }

    fn local_echo(&mut self, bytes: &[u8]) {
        // The hex view records every transmitted byte in its echo
        // color; ordinary emulations echo only in half duplex.
        if let EmulationState::Debug(ref mut debug) = self.emulation {
            for &b in bytes {
                debug.echo_byte(&mut self.term, b);
            }
            return;
        }
        if !self.term.full_duplex() {
            for &b in bytes {
                self.emulation.consume(&mut self.term, b);
            }
        }
    }

    fn flush_replies(&mut self) -> Result<()> {
        let reply = self.term.take_reply();
        if !reply.is_empty() {
            self.transport.write(&reply)?;
        }
        Ok(())
    }
}

/// Encode an emulation keystroke string for the wire: UTF-8 variants
/// send UTF-8, everything else sends one byte per code point.
fn encode_outgoing(kind: Emulation, s: &str) -> Vec<u8> {
    if kind.is_utf8() {
        s.as_bytes().to_vec()
    } else {
        s.chars().map(|c| c as u32 as u8).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulation::TerminalKey;

    /// In-memory transport for tests: reads feed from a script, writes
    /// are captured.
    #[derive(Default)]
    struct LoopTransport {
        incoming: Vec<u8>,
        outgoing: Vec<u8>,
    }

    impl Transport for LoopTransport {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            let n = self.incoming.len().min(buf.len());
            buf[..n].copy_from_slice(&self.incoming[..n]);
            self.incoming.drain(..n);
            Ok(n)
        }
        fn write(&mut self, data: &[u8]) -> Result<usize> {
            self.outgoing.extend_from_slice(data);
            Ok(data.len())
        }
    }

    fn session_with(incoming: &[u8]) -> Session<LoopTransport> {
        let transport = LoopTransport {
            incoming: incoming.to_vec(),
            outgoing: Vec::new(),
        };
        Session::new(&Config::default(), transport)
    }

    #[test]
    fn test_poll_prints_through_emulation() {
        let mut session = session_with(b"\x1b[1;33mhello");
        session.poll().unwrap();
        let term = session.terminal();
        let line = term.scrollback().line(term.row_index(0));
        assert_eq!(line.text(), "hello");
        assert_eq!(line.attr_at(0).fg(), crate::term::attr::YELLOW);
    }

    #[test]
    fn test_replies_go_back_out() {
        let mut session = session_with(b"\x1b[6n");
        session.poll().unwrap();
        assert_eq!(session.transport.outgoing, b"\x1b[1;1R");
    }

    #[test]
    fn test_strip_8th_bit() {
        let mut config = Config::default();
        config.strip_8th_bit = true;
        config.emulation = "TTY".to_string();
        let transport = LoopTransport {
            incoming: vec![0xC1],
            outgoing: Vec::new(),
        };
        let mut session = Session::new(&config, transport);
        session.poll().unwrap();
        let term = session.terminal();
        assert_eq!(term.scrollback().line(term.row_index(0)).char_at(0), 'A');
    }

    #[test]
    fn test_send_key_encodes_for_variant() {
        let mut session = session_with(b"");
        session.set_emulation(Emulation::Vt100);
        session.send_key(TerminalKey::Up).unwrap();
        assert_eq!(session.transport.outgoing, b"\x1b[A");
    }

    #[test]
    fn test_half_duplex_echoes_locally() {
        let mut session = session_with(b"");
        session.terminal_mut().set_full_duplex(false);
        session.send_key(TerminalKey::Char('x')).unwrap();
        let term = session.terminal();
        assert_eq!(term.scrollback().line(term.row_index(0)).char_at(0), 'x');
    }

    #[test]
    fn test_debug_records_transmitted_bytes() {
        let mut session = session_with(b"");
        session.set_emulation(Emulation::Debug);
        session.send_key(TerminalKey::Char('q')).unwrap();
        let term = session.terminal();
        let line = term.scrollback().line(term.row_index(0));
        assert_eq!(line.attr_at(12).fg(), crate::term::attr::RED);
    }

    #[test]
    fn test_switching_away_from_debug_flushes() {
        let mut session = session_with(b"Z");
        session.set_emulation(Emulation::Debug);
        session.poll().unwrap();
        session.set_emulation(Emulation::Ansi);
        let term = session.terminal();
        assert_eq!((term.cursor_x(), term.cursor_y()), (0, 1));
    }

    #[test]
    fn test_flood_meter_triggers() {
        let mut session = session_with(&vec![b'a'; 8192]);
        // Two polls drain 4096 bytes each.
        session.poll().unwrap();
        session.poll().unwrap();
        assert!(session.console_flooded());
    }
}
