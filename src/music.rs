//! ANSI music
//!
//! Parses the BBS music macro language (the GW-BASIC `PLAY` dialect plus
//! the semicolon-separated "digital" form) into a flat list of tones.
//! Parsing is pure; playback goes through a [`ToneSink`] so the audio
//! device stays out of the engine. Any syntax error discards the whole
//! tone list.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use thiserror::Error;

/// One tone; zero hertz means silence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub hertz: f64,
    pub duration_ms: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MusicError {
    #[error("music syntax error at byte {position}")]
    Syntax { position: usize },
    #[error("music value out of range at byte {position}")]
    Range { position: usize },
}

/// Longest tone the engine will queue
const MAX_TONE_MS: u32 = 3000;
/// Keystroke-interrupt ban window before the next tone list may start
const BAN_WINDOW: Duration = Duration::from_secs(5);

/// Note articulation styles: the fraction of the note that sounds
#[derive(Debug, Clone, Copy, PartialEq)]
enum NoteStyle {
    Normal,
    Legato,
    Staccato,
}

impl NoteStyle {
    fn fraction(self) -> f64 {
        match self {
            NoteStyle::Normal => 7.0 / 8.0,
            NoteStyle::Legato => 1.0,
            NoteStyle::Staccato => 3.0 / 4.0,
        }
    }
}

/// The 7-octave by 12-semitone frequency table, each step one
/// twelfth-root-of-two above the last, anchored so the first cell of the
/// third octave is middle C.
fn frequency_table() -> &'static [[f64; 12]; 7] {
    static TABLE: OnceLock<[[f64; 12]; 7]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let semitone = 2.0_f64.powf(1.0 / 12.0);
        let mut table = [[0.0; 12]; 7];
        // Middle C two octaves down gives the table origin.
        let mut freq = 261.625_565 / 4.0;
        for octave in table.iter_mut() {
            for cell in octave.iter_mut() {
                *cell = freq;
                freq *= semitone;
            }
        }
        table
    })
}

/// Frequency of `semitone` (0 = C) in `octave` (0-6)
pub fn note_frequency(octave: usize, semitone: usize) -> f64 {
    frequency_table()[octave.min(6)][semitone.min(11)]
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    tempo: u32,
    length: u32,
    octave: i32,
    /// One-shot octave offset from `<` / `>`
    octave_shift: i32,
    style: NoteStyle,
    tones: Vec<Tone>,
}

/// Parse a music macro string into its tone list
pub fn parse(input: &[u8]) -> Result<Vec<Tone>, MusicError> {
    let mut parser = Parser {
        input,
        pos: 0,
        tempo: 120,
        length: 4,
        octave: 4,
        octave_shift: 0,
        style: NoteStyle::Normal,
        tones: Vec::new(),
    };
    parser.run()?;
    Ok(parser.tones)
}

impl<'a> Parser<'a> {
    fn run(&mut self) -> Result<(), MusicError> {
        self.skip_spaces();
        // The digital form announces itself with a leading digit.
        if matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            return self.digital_form();
        }
        while let Some(byte) = self.next() {
            match byte.to_ascii_uppercase() {
                b' ' | b'\t' => {}
                b'L' => {
                    let n = self.number().ok_or(self.syntax())?;
                    if !(1..=64).contains(&n) {
                        return Err(self.range());
                    }
                    self.length = n;
                }
                b'M' => {
                    let style = self.next().ok_or(self.syntax())?;
                    match style.to_ascii_uppercase() {
                        b'F' | b'B' => {}
                        b'N' => self.style = NoteStyle::Normal,
                        b'L' => self.style = NoteStyle::Legato,
                        b'S' => self.style = NoteStyle::Staccato,
                        _ => return Err(self.syntax()),
                    }
                }
                b'N' => {
                    let n = self.number().ok_or(self.syntax())?;
                    if n > 84 {
                        return Err(self.range());
                    }
                    if n == 0 {
                        let duration = self.note_duration(self.length)?;
                        self.tones.push(Tone {
                            hertz: 0.0,
                            duration_ms: duration as u32,
                        });
                    } else {
                        let octave = ((n - 1) / 12) as i32;
                        let semitone = ((n - 1) % 12) as usize;
                        let length = self.length;
                        self.emit_note(octave, semitone, length, 0)?;
                    }
                }
                b'O' => {
                    let n = self.number().ok_or(self.syntax())?;
                    self.octave = (n as i32).clamp(0, 6);
                }
                b'P' => {
                    let n = self.number().ok_or(self.syntax())?;
                    if !(1..=64).contains(&n) {
                        return Err(self.range());
                    }
                    let duration = self.note_duration(n)?;
                    self.tones.push(Tone {
                        hertz: 0.0,
                        duration_ms: duration as u32,
                    });
                }
                b'T' => {
                    let n = self.number().ok_or(self.syntax())?;
                    if n == 0 {
                        return Err(self.range());
                    }
                    self.tempo = n;
                }
                b'<' => self.octave_shift = -1,
                b'>' => self.octave_shift = 1,
                note @ b'A'..=b'G' => self.letter_note(note)?,
                _ => return Err(self.syntax()),
            }
        }
        Ok(())
    }

    fn letter_note(&mut self, letter: u8) -> Result<(), MusicError> {
        // C D E F G A B as semitone offsets from C.
        const SEMITONES: [usize; 7] = [9, 11, 0, 2, 4, 5, 7];
        let mut semitone = SEMITONES[usize::from(letter - b'A')] as i32;
        match self.peek() {
            Some(b'#') | Some(b'+') => {
                self.pos += 1;
                semitone += 1;
            }
            Some(b'-') => {
                self.pos += 1;
                semitone -= 1;
            }
            _ => {}
        }
        let length = match self.number() {
            Some(n) if (1..=64).contains(&n) => n,
            Some(_) => return Err(self.range()),
            None => self.length,
        };
        let mut dots = 0;
        while self.peek() == Some(b'.') {
            self.pos += 1;
            dots += 1;
        }
        let octave = self.octave + self.octave_shift;
        self.octave_shift = 0;
        // A sharp below C or flat above B spills into the next octave.
        let (octave, semitone) = if semitone < 0 {
            (octave - 1, semitone + 12)
        } else if semitone > 11 {
            (octave + 1, semitone - 12)
        } else {
            (octave, semitone)
        };
        self.emit_note(octave, semitone as usize, length, dots)
    }

    /// Push the audible/silent pair for one note at an absolute octave
    fn emit_note(
        &mut self,
        octave: i32,
        semitone: usize,
        length: u32,
        dots: u32,
    ) -> Result<(), MusicError> {
        let octave = octave.clamp(0, 6);
        let mut duration = self.note_duration(length)?;
        for _ in 0..dots {
            duration *= 1.5;
        }
        if duration > f64::from(MAX_TONE_MS) {
            return Err(self.range());
        }
        let hertz = note_frequency(octave as usize, semitone);
        let audible = (duration * self.style.fraction()) as u32;
        let silent = duration as u32 - audible;
        self.tones.push(Tone {
            hertz,
            duration_ms: audible,
        });
        self.tones.push(Tone {
            hertz: 0.0,
            duration_ms: silent,
        });
        Ok(())
    }

    /// Quarter-note math: a length-4 note at tempo 120 lasts 500 ms.
    fn note_duration(&self, length: u32) -> Result<f64, MusicError> {
        let ms = 1000.0 / ((f64::from(self.tempo) / 60.0) * (f64::from(length) / 4.0));
        if ms <= 0.0 || ms > f64::from(MAX_TONE_MS) {
            return Err(MusicError::Range { position: self.pos });
        }
        Ok(ms)
    }

    /// Five semicolon-separated integers:
    /// `freq;duration_ms;cycles;cycle_delay_ms;variation_hz`.
    fn digital_form(&mut self) -> Result<(), MusicError> {
        loop {
            let freq = self.signed_number().ok_or(self.syntax())?;
            self.expect(b';')?;
            let duration = self.signed_number().ok_or(self.syntax())?;
            self.expect(b';')?;
            let cycles = self.signed_number().ok_or(self.syntax())?;
            self.expect(b';')?;
            let delay = self.signed_number().ok_or(self.syntax())?;
            self.expect(b';')?;
            let variation = self.signed_number().ok_or(self.syntax())?;

            if duration <= 0 || duration > i64::from(MAX_TONE_MS) {
                return Err(self.range());
            }
            if delay < 0 || delay > i64::from(MAX_TONE_MS) {
                return Err(self.range());
            }
            if cycles <= 0 {
                return Err(self.range());
            }

            let mut hertz = freq.max(0) as f64;
            for _ in 0..cycles {
                self.tones.push(Tone {
                    hertz,
                    duration_ms: duration as u32,
                });
                self.tones.push(Tone {
                    hertz: 0.0,
                    duration_ms: delay as u32,
                });
                hertz = (hertz + variation as f64).max(0.0);
            }

            self.skip_spaces();
            match self.peek() {
                None => return Ok(()),
                Some(b) if b.is_ascii_digit() || b == b'-' => {}
                Some(_) => return Err(self.syntax()),
            }
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), MusicError> {
        if self.next() == Some(byte) {
            Ok(())
        } else {
            Err(self.syntax())
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    fn skip_spaces(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t')) {
            self.pos += 1;
        }
    }

    fn number(&mut self) -> Option<u32> {
        self.skip_spaces();
        let start = self.pos;
        let mut value: u32 = 0;
        while let Some(b) = self.peek() {
            if !b.is_ascii_digit() {
                break;
            }
            value = value.saturating_mul(10).saturating_add(u32::from(b - b'0'));
            self.pos += 1;
        }
        if self.pos == start {
            None
        } else {
            Some(value)
        }
    }

    fn signed_number(&mut self) -> Option<i64> {
        self.skip_spaces();
        let negative = if self.peek() == Some(b'-') {
            self.pos += 1;
            true
        } else {
            false
        };
        let magnitude = self.number()?;
        let value = i64::from(magnitude);
        Some(if negative { -value } else { value })
    }

    fn syntax(&self) -> MusicError {
        MusicError::Syntax { position: self.pos }
    }

    fn range(&self) -> MusicError {
        MusicError::Range { position: self.pos }
    }
}

/// Consumer of a tone list; the real audio device lives behind this
pub trait ToneSink {
    fn play(&mut self, tone: &Tone);
}

/// Playback facade with the keystroke-interrupt ban window
#[derive(Debug, Default)]
pub struct Player {
    banned_until: Option<Instant>,
}

impl Player {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the tone list to the sink. When `interruptible` is set and
    /// `interrupted` reports a keystroke, playback stops and further
    /// tone lists are refused for five seconds. Returns whether the
    /// list played to completion.
    pub fn play<F>(
        &mut self,
        tones: &[Tone],
        interruptible: bool,
        sink: &mut dyn ToneSink,
        mut interrupted: F,
    ) -> bool
    where
        F: FnMut() -> bool,
    {
        if let Some(until) = self.banned_until {
            if Instant::now() < until {
                return false;
            }
            self.banned_until = None;
        }
        for tone in tones {
            if interruptible && interrupted() {
                self.banned_until = Some(Instant::now() + BAN_WINDOW);
                return false;
            }
            sink.play(tone);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_produces_audible_and_silent_pairs() {
        let tones = parse(b"T120 O4 L4 C D E C").unwrap();
        assert_eq!(tones.len(), 8);
        for pair in tones.chunks(2) {
            assert_eq!(pair[0].duration_ms, 437);
            assert_eq!(pair[1].duration_ms, 63);
            assert_eq!(pair[1].hertz, 0.0);
        }
        assert!((tones[0].hertz - note_frequency(4, 0)).abs() < 0.5);
        assert!((tones[2].hertz - note_frequency(4, 2)).abs() < 0.5);
        assert!((tones[4].hertz - note_frequency(4, 4)).abs() < 0.5);
        assert!((tones[6].hertz - note_frequency(4, 0)).abs() < 0.5);
    }

    #[test]
    fn test_table_is_anchored_at_middle_c() {
        assert!((note_frequency(2, 0) - 261.625_565).abs() < 0.001);
        // One octave doubles the frequency.
        assert!((note_frequency(3, 0) - 2.0 * note_frequency(2, 0)).abs() < 0.001);
        // A above middle C lands on 440 Hz.
        assert!((note_frequency(2, 9) - 440.0).abs() < 0.5);
    }

    #[test]
    fn test_sharps_flats_and_dots() {
        let tones = parse(b"L4 C# D- C.").unwrap();
        assert_eq!(tones.len(), 6);
        assert!((tones[0].hertz - note_frequency(4, 1)).abs() < 0.5);
        assert!((tones[2].hertz - note_frequency(4, 1)).abs() < 0.5);
        // One dot stretches the note by half.
        assert_eq!(tones[4].duration_ms + tones[5].duration_ms, 750);
    }

    #[test]
    fn test_octave_shift_is_one_shot() {
        let tones = parse(b"O4 C >C C").unwrap();
        let base = tones[0].hertz;
        assert!((tones[2].hertz - base * 2.0).abs() < 1.0);
        assert!((tones[4].hertz - base).abs() < 0.5);
    }

    #[test]
    fn test_styles_change_split() {
        let legato = parse(b"ML C").unwrap();
        assert_eq!(legato[0].duration_ms, 500);
        assert_eq!(legato[1].duration_ms, 0);
        let staccato = parse(b"MS C").unwrap();
        assert_eq!(staccato[0].duration_ms, 375);
        assert_eq!(staccato[1].duration_ms, 125);
    }

    #[test]
    fn test_pause_is_single_silence() {
        let tones = parse(b"P4").unwrap();
        assert_eq!(tones.len(), 1);
        assert_eq!(tones[0].hertz, 0.0);
        assert_eq!(tones[0].duration_ms, 500);
    }

    #[test]
    fn test_parse_is_pure() {
        let a = parse(b"T90 O3 L8 C D E F G").unwrap();
        let b = parse(b"T90 O3 L8 C D E F G").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_syntax_error_discards_everything() {
        assert!(matches!(
            parse(b"C D Q E"),
            Err(MusicError::Syntax { .. })
        ));
        assert!(matches!(parse(b"L99 C"), Err(MusicError::Range { .. })));
    }

    #[test]
    fn test_digital_form_expands_cycles() {
        let tones = parse(b"440;100;3;50;10").unwrap();
        assert_eq!(tones.len(), 6);
        assert_eq!(tones[0].hertz, 440.0);
        assert_eq!(tones[0].duration_ms, 100);
        assert_eq!(tones[1], Tone { hertz: 0.0, duration_ms: 50 });
        assert_eq!(tones[2].hertz, 450.0);
        assert_eq!(tones[4].hertz, 460.0);
    }

    #[test]
    fn test_digital_form_duration_bounds() {
        assert!(matches!(
            parse(b"440;0;1;0;0"),
            Err(MusicError::Range { .. })
        ));
        assert!(matches!(
            parse(b"440;5000;1;0;0"),
            Err(MusicError::Range { .. })
        ));
    }

    #[test]
    fn test_raw_note_index() {
        // N37 is one semitone above the start of octave 3.
        let tones = parse(b"N37").unwrap();
        assert!((tones[0].hertz - note_frequency(3, 0)).abs() < 0.5);
    }

    struct Recorder(Vec<Tone>);

    impl ToneSink for Recorder {
        fn play(&mut self, tone: &Tone) {
            self.0.push(*tone);
        }
    }

    #[test]
    fn test_player_plays_to_completion() {
        let tones = parse(b"C D").unwrap();
        let mut sink = Recorder(Vec::new());
        let mut player = Player::new();
        assert!(player.play(&tones, true, &mut sink, || false));
        assert_eq!(sink.0.len(), tones.len());
    }

    #[test]
    fn test_interrupt_applies_ban_window() {
        let tones = parse(b"C D E F").unwrap();
        let mut sink = Recorder(Vec::new());
        let mut player = Player::new();
        let mut count = 0;
        let done = player.play(&tones, true, &mut sink, || {
            count += 1;
            count > 2
        });
        assert!(!done);
        // Within the ban window nothing plays.
        let played = sink.0.len();
        assert!(!player.play(&tones, true, &mut sink, || false));
        assert_eq!(sink.0.len(), played);
    }
}
