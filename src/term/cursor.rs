//! Cursor movement and the character write path
//!
//! Every visible update funnels through [`Terminal::print_character`],
//! which implements the two-phase deferred wrap used by the VT family:
//! a character written in the right-margin cell does not move the
//! cursor, it arms a flag, and the wrap happens when the next printable
//! arrives. Any explicit cursor movement disarms the flag.

use super::Terminal;

impl Terminal {
    /// Move up `n` rows. With `honor` set the cursor clamps at the top of
    /// the scrolling region instead of the screen edge; it never scrolls.
    pub fn cursor_up(&mut self, n: usize, honor: bool) {
        if n == 0 {
            return;
        }
        self.wrap_pending = false;
        let limit = if honor && self.cursor_y >= self.scroll_top {
            self.scroll_top
        } else {
            0
        };
        self.cursor_y = self.cursor_y.saturating_sub(n).max(limit);
        self.mark_dirty();
    }

    /// Move down `n` rows, creating lines past the current tail
    pub fn cursor_down(&mut self, n: usize, honor: bool) {
        if n == 0 {
            return;
        }
        self.wrap_pending = false;
        let limit = if honor && self.cursor_y <= self.scroll_bottom {
            self.scroll_bottom
        } else {
            self.visible_rows() - 1
        };
        self.cursor_y = (self.cursor_y + n).min(limit);
        self.ensure_row(self.cursor_y);
        self.mark_dirty();
    }

    pub fn cursor_left(&mut self, n: usize, _honor: bool) {
        if n == 0 {
            return;
        }
        self.wrap_pending = false;
        self.cursor_x = self.cursor_x.saturating_sub(n);
        self.mark_dirty();
    }

    /// Move right `n` columns, padding the line with spaces in the
    /// current attribute over any cells the cursor travels past.
    pub fn cursor_right(&mut self, n: usize, _honor: bool) {
        if n == 0 {
            return;
        }
        self.wrap_pending = false;
        let margin = self.effective_right_margin();
        self.cursor_x = (self.cursor_x + n).min(margin);
        let x = self.cursor_x;
        let attr = self.attr;
        self.current_line().pad_to(x, attr);
        self.mark_dirty();
    }

    /// Absolute placement. With origin mode on, `row` is relative to the
    /// scrolling region top and confined to the region.
    pub fn cursor_position(&mut self, row: usize, col: usize) {
        self.wrap_pending = false;
        let row = if self.origin_mode {
            (self.scroll_top + row).min(self.scroll_bottom)
        } else {
            row.min(self.visible_rows() - 1)
        };
        self.cursor_y = row;
        self.ensure_row(row);
        self.cursor_x = col.min(self.effective_right_margin());
        self.mark_dirty();
    }

    pub fn carriage_return(&mut self) {
        self.cursor_x = 0;
        self.wrap_pending = false;
        if self.line_feed_on_cr {
            self.linefeed(false);
        }
        self.mark_dirty();
    }

    /// Advance one row, honoring the scrolling region. At the bottom of a
    /// full-screen region a new tail line is appended so the old top
    /// enters history; at the bottom of a sub-region the region scrolls
    /// up in place.
    pub fn linefeed(&mut self, new_line_mode: bool) {
        self.wrap_pending = false;
        if self.cursor_y < self.scroll_bottom {
            self.cursor_y += 1;
            self.ensure_row(self.cursor_y);
        } else if self.scroll_top == 0 && self.scroll_bottom == self.visible_rows() - 1 {
            let old_top = self.row_index(0);
            let debug_attr = self.debug_fill_attr();
            self.sb
                .append(super::scrollback::blank_line(self.width, debug_attr));
            if old_top < self.sb.len() {
                self.sb.line_mut(old_top).dirty = true;
            }
        } else {
            self.scroll_region_up(self.scroll_top, self.scroll_bottom, 1);
        }
        if new_line_mode {
            self.cursor_x = 0;
        }
        self.mark_dirty();
    }

    /// Clear the screen region and home the cursor
    pub fn formfeed(&mut self) {
        self.wrap_pending = false;
        let bottom = self.visible_rows() - 1;
        let right = self.right_margin;
        self.erase_screen(0, 0, bottom, right, false);
        self.cursor_x = 0;
        self.cursor_y = 0;
        self.mark_dirty();
    }

    /// Backspace: one cell left, clamped at the left margin
    pub fn backspace(&mut self) {
        self.cursor_left(1, true);
    }

    /// Advance to the next multiple-of-eight column, clamped at the
    /// margin. Variants that own a real tab-stop list compute their own
    /// target and use [`Terminal::cursor_right`] instead.
    pub fn tab_advance_fixed(&mut self) {
        let margin = self.effective_right_margin();
        let next = ((self.cursor_x / 8) + 1) * 8;
        let n = next.min(margin).saturating_sub(self.cursor_x);
        self.cursor_right(n, false);
    }

    /// Write one displayable code point at the cursor, applying insert
    /// mode and the auto-wrap rule.
    pub fn print_character(&mut self, ch: char) {
        let ch = if ch == '\0' {
            if !self.display_null {
                return;
            }
            ' '
        } else {
            ch
        };

        let margin = self.effective_right_margin();
        if self.cursor_x > margin {
            // Margin shrank underneath us (double-width tag); clamp.
            self.cursor_x = margin;
            self.wrap_pending = false;
        }

        if self.insert_mode && self.cursor_x < margin {
            let x = self.cursor_x;
            let attr = self.attr;
            self.current_line().insert_blank(x, attr);
        }

        if self.cursor_x < margin {
            self.put_at_cursor(ch);
            self.cursor_x += 1;
            self.wrap_pending = false;
        } else if self.auto_wrap && self.emulation.is_vt_family() {
            if !self.wrap_pending {
                self.put_at_cursor(ch);
                self.wrap_pending = true;
            } else {
                self.wrap_pending = false;
                self.linefeed(false);
                self.cursor_x = 0;
                self.put_at_cursor(ch);
                self.cursor_x = 1;
            }
        } else if self.auto_wrap {
            self.put_at_cursor(ch);
            self.linefeed(false);
            self.cursor_x = 0;
        } else {
            self.put_at_cursor(ch);
        }
        self.mark_dirty();
    }

    fn put_at_cursor(&mut self, ch: char) {
        let (x, attr) = (self.cursor_x, self.attr);
        self.current_line().put(x, ch, attr);
    }
}
