//! Terminal engine
//!
//! One owning value ties together the scrollback buffer, the cursor and
//! mode state, and the drawing attribute. Emulation state machines issue
//! commands against it; the host renders its visible window through the
//! [`renderer::Renderer`] trait and drains its reply/event queues.

pub mod attr;
pub mod line;
pub mod renderer;
pub mod save;
pub mod scrollback;
pub mod search;

mod cursor;
mod edit;

use std::collections::VecDeque;

use crate::config::Config;
use crate::emulation::Emulation;
use crate::music::Tone;

use attr::CellAttr;
use line::Line;
use scrollback::Scrollback;

/// Out-of-band happenings the host must act on
#[derive(Debug, Clone, PartialEq)]
pub enum TermEvent {
    /// BEL was received
    Bell,
    /// An ANSI music string was parsed into a tone list
    Music(Vec<Tone>),
}

/// Engine options distilled from [`Config`]; the session applies the
/// transport-level ones (strip-8th-bit) itself.
#[derive(Debug, Clone)]
pub struct TermOptions {
    pub line_wrap: bool,
    pub line_feed_on_cr: bool,
    pub display_null: bool,
    pub assume_80_columns: bool,
    pub atascii_has_wide_font: bool,
    pub petscii_has_wide_font: bool,
    pub scrollback_lines_max: usize,
}

impl Default for TermOptions {
    fn default() -> Self {
        Self {
            line_wrap: true,
            line_feed_on_cr: false,
            display_null: false,
            assume_80_columns: true,
            atascii_has_wide_font: false,
            petscii_has_wide_font: false,
            scrollback_lines_max: 20_000,
        }
    }
}

impl From<&Config> for TermOptions {
    fn from(config: &Config) -> Self {
        Self {
            line_wrap: config.line_wrap,
            line_feed_on_cr: config.line_feed_on_cr,
            display_null: config.display_null,
            assume_80_columns: config.assume_80_columns,
            atascii_has_wide_font: config.atascii_has_wide_font,
            petscii_has_wide_font: config.petscii_has_wide_font,
            scrollback_lines_max: config.scrollback_lines_max,
        }
    }
}

pub struct Terminal {
    pub(crate) sb: Scrollback,
    width: usize,
    height: usize,
    status_height: usize,

    cursor_x: usize,
    cursor_y: usize,
    scroll_top: usize,
    scroll_bottom: usize,

    origin_mode: bool,
    auto_wrap: bool,
    insert_mode: bool,
    reverse_video: bool,
    line_feed_on_cr: bool,
    visible_cursor: bool,
    display_null: bool,
    full_duplex: bool,

    emulation: Emulation,
    codepage: crate::emulation::charset::Codepage,
    attr: CellAttr,
    right_margin: usize,
    wrap_pending: bool,

    /// Capture/logging flags surfaced to external collaborators
    capture: bool,
    session_log: bool,

    options: TermOptions,
    /// Line index the next find-again resumes after
    pub(crate) search_resume: Option<usize>,
    /// Bytes the emulation wants sent back to the remote (DA replies etc.)
    reply: Vec<u8>,
    events: VecDeque<TermEvent>,
    /// Anything changed since the host last rendered
    dirty: bool,
}

impl Terminal {
    pub fn new(width: usize, height: usize, options: TermOptions) -> Self {
        let status_height = 1;
        let visible_rows = height - status_height;
        let mut term = Self {
            sb: Scrollback::new(visible_rows, options.scrollback_lines_max),
            width,
            height,
            status_height,
            cursor_x: 0,
            cursor_y: 0,
            scroll_top: 0,
            scroll_bottom: visible_rows - 1,
            origin_mode: false,
            auto_wrap: options.line_wrap,
            insert_mode: false,
            reverse_video: false,
            line_feed_on_cr: options.line_feed_on_cr,
            visible_cursor: true,
            display_null: options.display_null,
            full_duplex: true,
            emulation: Emulation::Ansi,
            codepage: Emulation::Ansi.codepage(),
            attr: CellAttr::default(),
            right_margin: width - 1,
            wrap_pending: false,
            capture: false,
            session_log: false,
            options,
            search_resume: None,
            reply: Vec::new(),
            events: VecDeque::new(),
            dirty: true,
        };
        term.apply_emulation_margins();
        term
    }

    // --- geometry -------------------------------------------------------

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn status_height(&self) -> usize {
        self.status_height
    }

    /// Rows the emulation can write to
    pub fn visible_rows(&self) -> usize {
        self.height - self.status_height
    }

    /// Absolute buffer index of screen row `row`
    pub(crate) fn row_index(&self, row: usize) -> usize {
        self.sb.screen_base() + row
    }

    /// Buffer index of the line under the cursor (the edit anchor)
    pub fn edit_index(&self) -> usize {
        self.row_index(self.cursor_y)
    }

    /// Append blank lines until screen row `row` exists
    pub(crate) fn ensure_row(&mut self, row: usize) {
        let debug_attr = self.debug_fill_attr();
        while self.sb.len() <= self.sb.screen_base() + row {
            self.sb.append(scrollback::blank_line(self.width, debug_attr));
        }
    }

    pub(crate) fn line_at_row(&mut self, row: usize) -> &mut Line {
        self.ensure_row(row);
        let idx = self.row_index(row);
        self.sb.line_mut(idx)
    }

    pub(crate) fn current_line(&mut self) -> &mut Line {
        self.line_at_row(self.cursor_y)
    }

    fn debug_fill_attr(&self) -> Option<CellAttr> {
        if self.emulation == Emulation::Debug {
            Some(CellAttr::default().with(attr::Style::REVERSE))
        } else {
            None
        }
    }

    // --- cursor and mode accessors --------------------------------------

    pub fn cursor_x(&self) -> usize {
        self.cursor_x
    }

    pub fn cursor_y(&self) -> usize {
        self.cursor_y
    }

    pub(crate) fn set_cursor_x(&mut self, x: usize) {
        self.cursor_x = x;
    }

    pub(crate) fn set_cursor_y(&mut self, y: usize) {
        self.cursor_y = y;
    }

    pub fn scroll_region(&self) -> (usize, usize) {
        (self.scroll_top, self.scroll_bottom)
    }

    /// Set the scrolling region (rows, inclusive). Invalid regions are
    /// ignored, matching DECSTBM.
    pub fn set_scroll_region(&mut self, top: usize, bottom: usize) {
        if top < bottom && bottom < self.visible_rows() {
            self.scroll_top = top;
            self.scroll_bottom = bottom;
        }
    }

    pub fn reset_scroll_region(&mut self) {
        self.scroll_top = 0;
        self.scroll_bottom = self.visible_rows() - 1;
    }

    pub fn origin_mode(&self) -> bool {
        self.origin_mode
    }

    pub fn set_origin_mode(&mut self, on: bool) {
        self.origin_mode = on;
    }

    pub fn auto_wrap(&self) -> bool {
        self.auto_wrap
    }

    pub fn set_auto_wrap(&mut self, on: bool) {
        self.auto_wrap = on;
        if !on {
            self.wrap_pending = false;
        }
    }

    pub fn insert_mode(&self) -> bool {
        self.insert_mode
    }

    pub fn set_insert_mode(&mut self, on: bool) {
        self.insert_mode = on;
    }

    pub fn reverse_video(&self) -> bool {
        self.reverse_video
    }

    /// DECSCNM. Toggling repaints the visible region by flipping each
    /// line's reverse flag.
    pub fn set_reverse_video(&mut self, on: bool) {
        if self.reverse_video != on {
            self.reverse_video = on;
            self.invert_scrollback_colors();
        }
    }

    pub fn line_feed_on_cr(&self) -> bool {
        self.line_feed_on_cr
    }

    pub fn set_line_feed_on_cr(&mut self, on: bool) {
        self.line_feed_on_cr = on;
    }

    pub fn visible_cursor(&self) -> bool {
        self.visible_cursor
    }

    pub fn set_visible_cursor(&mut self, on: bool) {
        self.visible_cursor = on;
    }

    pub fn display_null(&self) -> bool {
        self.display_null
    }

    pub fn full_duplex(&self) -> bool {
        self.full_duplex
    }

    pub fn set_full_duplex(&mut self, on: bool) {
        self.full_duplex = on;
    }

    pub fn capture(&self) -> bool {
        self.capture
    }

    pub fn set_capture(&mut self, on: bool) {
        self.capture = on;
    }

    pub fn session_log(&self) -> bool {
        self.session_log
    }

    pub fn set_session_log(&mut self, on: bool) {
        self.session_log = on;
    }

    pub fn wrap_pending(&self) -> bool {
        self.wrap_pending
    }

    pub(crate) fn set_wrap_pending(&mut self, pending: bool) {
        self.wrap_pending = pending;
    }

    pub fn attr(&self) -> CellAttr {
        self.attr
    }

    pub fn attr_mut(&mut self) -> &mut CellAttr {
        &mut self.attr
    }

    pub fn set_attr(&mut self, attr: CellAttr) {
        self.attr = attr;
    }

    pub fn options(&self) -> &TermOptions {
        &self.options
    }

    // --- emulation wiring -----------------------------------------------

    pub fn emulation(&self) -> Emulation {
        self.emulation
    }

    pub fn codepage(&self) -> crate::emulation::charset::Codepage {
        self.codepage
    }

    /// Switch the active variant and restore its margin/mode defaults.
    /// The deferred-wrap flag is unconditionally cleared.
    pub fn set_emulation(&mut self, emulation: Emulation) {
        self.emulation = emulation;
        self.codepage = emulation.codepage();
        self.wrap_pending = false;
        self.insert_mode = false;
        self.origin_mode = false;
        self.auto_wrap = self.options.line_wrap;
        self.reset_scroll_region();
        self.apply_emulation_margins();
        self.dirty = true;
    }

    fn apply_emulation_margins(&mut self) {
        self.right_margin = match self.emulation {
            Emulation::Petscii => 39,
            _ if self.options.assume_80_columns => 79.min(self.width - 1),
            _ => self.width - 1,
        };
    }

    pub fn right_margin(&self) -> usize {
        self.right_margin
    }

    pub fn set_right_margin(&mut self, margin: usize) {
        self.right_margin = margin.min(self.width - 1);
    }

    /// Margin in effect for the cursor line, halved for double width
    pub fn effective_right_margin(&mut self) -> usize {
        if self.current_line().double_width {
            (self.right_margin + 1) / 2 - 1
        } else {
            self.right_margin
        }
    }

    /// The attribute written into erased cells: DEC-family variants reset
    /// to the default attribute, the BBS family erases in the current
    /// background color.
    pub fn erase_attr(&self) -> CellAttr {
        if self.emulation.back_color_erase() {
            self.attr.bce_erase()
        } else {
            CellAttr::default()
        }
    }

    // --- host surfaces ---------------------------------------------------

    /// Queue bytes for the transport (terminal reports, answerback)
    pub fn reply(&mut self, bytes: &[u8]) {
        self.reply.extend_from_slice(bytes);
    }

    pub fn take_reply(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.reply)
    }

    pub fn push_event(&mut self, event: TermEvent) {
        self.events.push_back(event);
    }

    pub fn pop_event(&mut self) -> Option<TermEvent> {
        self.events.pop_front()
    }

    pub fn bell(&mut self) {
        self.push_event(TermEvent::Bell);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Render the visible window through the backend and place the cursor
    pub fn render(&mut self, renderer: &mut dyn renderer::Renderer, in_view_state: bool) {
        self.sb
            .render_window(renderer, self.width, 0, in_view_state);
        if self.visible_cursor && !in_view_state {
            renderer.move_cursor(self.cursor_y, self.cursor_x);
        }
        self.dirty = false;
    }

    /// Write a cell at an absolute screen position without touching the
    /// cursor or the wrap state. The hex-debug view uses this for its
    /// right-hand character column.
    pub fn raw_cell_write(&mut self, row: usize, col: usize, ch: char, attr: CellAttr) {
        if row >= self.visible_rows() {
            return;
        }
        self.line_at_row(row).put(col, ch, attr);
        self.dirty = true;
    }

    pub fn scrollback(&self) -> &Scrollback {
        &self.sb
    }

    pub fn scrollback_mut(&mut self) -> &mut Scrollback {
        &mut self.sb
    }
}

#[cfg(test)]
pub(crate) fn test_terminal() -> Terminal {
    Terminal::new(80, 25, TermOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_terminal_geometry() {
        let term = test_terminal();
        assert_eq!(term.visible_rows(), 24);
        assert_eq!(term.scroll_region(), (0, 23));
        assert_eq!(term.right_margin(), 79);
        assert_eq!((term.cursor_x(), term.cursor_y()), (0, 0));
    }

    #[test]
    fn test_petscii_margin() {
        let mut term = test_terminal();
        term.set_emulation(Emulation::Petscii);
        assert_eq!(term.right_margin(), 39);
        term.set_emulation(Emulation::Ansi);
        assert_eq!(term.right_margin(), 79);
    }

    #[test]
    fn test_emulation_switch_clears_wrap_pending() {
        let mut term = test_terminal();
        term.set_wrap_pending(true);
        term.set_emulation(Emulation::Vt100);
        assert!(!term.wrap_pending());
    }

    #[test]
    fn test_erase_attr_policy() {
        let mut term = test_terminal();
        *term.attr_mut() = CellAttr::new(attr::GREEN, attr::BLUE);

        term.set_emulation(Emulation::Ansi);
        assert_eq!(term.erase_attr().bg(), attr::BLUE);

        term.set_emulation(Emulation::Vt100);
        assert_eq!(term.erase_attr(), CellAttr::default());
    }

    #[test]
    fn test_raw_cell_write_leaves_cursor_alone() {
        let mut term = test_terminal();
        term.raw_cell_write(3, 62, 'A', CellAttr::default());
        assert_eq!((term.cursor_x(), term.cursor_y()), (0, 0));
        let idx = term.row_index(3);
        assert_eq!(term.scrollback().line(idx).char_at(62), 'A');
    }

    #[test]
    fn test_reply_queue_drains() {
        let mut term = test_terminal();
        term.reply(b"\x1b[?1;2c");
        assert_eq!(term.take_reply(), b"\x1b[?1;2c");
        assert!(term.take_reply().is_empty());
    }
}
