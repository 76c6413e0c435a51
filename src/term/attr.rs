//! Cell attributes
//!
//! Every cell in the scrollback buffer carries a packed attribute: a
//! foreground color index, a background color index, and a set of style
//! bits. All color decisions in the engine flow through this type.

use bitflags::bitflags;

bitflags! {
    /// Style bits carried by a cell attribute
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Style: u8 {
        const BOLD      = 0b0000_0001;
        const UNDERLINE = 0b0000_0010;
        const REVERSE   = 0b0000_0100;
        const BLINK     = 0b0000_1000;
        /// Cell is excluded from erase operations that honor protection
        /// (DECSCA / selective erase).
        const PROTECT   = 0b0001_0000;
    }
}

/// The eight base color indices
pub const BLACK: u8 = 0;
pub const RED: u8 = 1;
pub const GREEN: u8 = 2;
pub const YELLOW: u8 = 3;
pub const BLUE: u8 = 4;
pub const MAGENTA: u8 = 5;
pub const CYAN: u8 = 6;
pub const WHITE: u8 = 7;

/// Packed per-cell attribute: color indices plus style bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellAttr {
    fg: u8,
    bg: u8,
    style: Style,
}

impl Default for CellAttr {
    fn default() -> Self {
        Self {
            fg: WHITE,
            bg: BLACK,
            style: Style::empty(),
        }
    }
}

impl CellAttr {
    /// Build an attribute from color indices
    pub fn new(fg: u8, bg: u8) -> Self {
        Self {
            fg: fg & 0x07,
            bg: bg & 0x07,
            style: Style::empty(),
        }
    }

    pub fn fg(&self) -> u8 {
        self.fg
    }

    pub fn bg(&self) -> u8 {
        self.bg
    }

    pub fn style(&self) -> Style {
        self.style
    }

    pub fn set_fg(&mut self, fg: u8) {
        self.fg = fg & 0x07;
    }

    pub fn set_bg(&mut self, bg: u8) {
        self.bg = bg & 0x07;
    }

    /// Set style bits (OR into the current set)
    pub fn set(&mut self, bits: Style) {
        self.style |= bits;
    }

    /// Clear style bits
    pub fn clear(&mut self, bits: Style) {
        self.style &= !bits;
    }

    pub fn has(&self, bits: Style) -> bool {
        self.style.contains(bits)
    }

    /// Copy of self with the given bits set
    pub fn with(mut self, bits: Style) -> Self {
        self.set(bits);
        self
    }

    /// Copy of self with the given bits cleared
    pub fn without(mut self, bits: Style) -> Self {
        self.clear(bits);
        self
    }

    /// The attribute used to erase cells when the active variant uses
    /// back-color erase: the current drawing color's background is kept,
    /// every style bit is dropped.
    pub fn bce_erase(&self) -> Self {
        Self {
            fg: self.fg,
            bg: self.bg,
            style: Style::empty(),
        }
    }

    /// Resolve the DEC per-line reverse flag against this attribute.
    ///
    /// When the line (or the whole screen) is in reverse video, a cell
    /// that itself carries REVERSE cancels out and renders normally.
    pub fn check_reverse(&self, line_reverse: bool) -> Self {
        if !line_reverse {
            return *self;
        }
        let mut out = *self;
        if self.has(Style::REVERSE) {
            out.clear(Style::REVERSE);
        } else {
            out.set(Style::REVERSE);
        }
        out
    }

    /// Swap foreground and background, used when REVERSE must be baked
    /// into the color indices for a backend without a reverse modifier.
    pub fn swapped(&self) -> Self {
        Self {
            fg: self.bg,
            bg: self.fg,
            style: self.style,
        }
    }
}

/// Decode an IBM PC attribute byte (as used by Avatar's ^V^A command):
/// low nibble foreground with intensity, bits 4-6 background, bit 7 blink.
pub fn from_pc_byte(byte: u8) -> CellAttr {
    let mut attr = CellAttr::new(byte & 0x07, (byte >> 4) & 0x07);
    if byte & 0x08 != 0 {
        attr.set(Style::BOLD);
    }
    if byte & 0x80 != 0 {
        attr.set(Style::BLINK);
    }
    attr
}
