//! Region editing operations
//!
//! Erase and fill honor the protected attribute when asked; whether an
//! erased cell takes the default attribute or the current background is
//! the active variant's call (see [`Terminal::erase_attr`]).

use super::attr::{CellAttr, Style};
use super::line::DoubleHeight;
use super::scrollback::blank_line;
use super::Terminal;

impl Terminal {
    /// Replace cells `[start, end]` of the cursor line with spaces
    pub fn erase_line(&mut self, start: usize, end: usize, honor_protected: bool) {
        let attr = self.erase_attr();
        self.fill_line_span(start, end, ' ', attr, honor_protected);
    }

    /// Replace cells `[start, end]` of the cursor line with `ch` in the
    /// current drawing attribute
    pub fn fill_line_with_character(
        &mut self,
        start: usize,
        end: usize,
        ch: char,
        honor_protected: bool,
    ) {
        let attr = self.attr();
        self.fill_line_span(start, end, ch, attr, honor_protected);
    }

    fn fill_line_span(
        &mut self,
        start: usize,
        end: usize,
        ch: char,
        attr: CellAttr,
        honor_protected: bool,
    ) {
        if end < start {
            return;
        }
        let default_erase = ch == ' ' && attr == CellAttr::default();
        let line = self.current_line();
        // Erasing the tail of a line in the default attribute shortens it
        // instead; the implicit-space rendering rule covers the rest.
        if default_erase && !honor_protected && end + 1 >= line.len() {
            line.truncate(start);
            line.dirty = true;
            self.mark_dirty();
            return;
        }
        for col in start..=end.min(super::line::LINE_CAPACITY - 1) {
            if honor_protected && line.attr_at(col).has(Style::PROTECT) {
                continue;
            }
            line.put(col, ch, attr);
        }
        self.mark_dirty();
    }

    /// Erase a rectangular region, extending the buffer as needed
    pub fn erase_screen(
        &mut self,
        top_row: usize,
        left: usize,
        bottom_row: usize,
        right: usize,
        honor_protected: bool,
    ) {
        let saved_y = self.cursor_y();
        for row in top_row..=bottom_row.min(self.visible_rows() - 1) {
            self.set_cursor_y(row);
            self.ensure_row(row);
            self.erase_line(left, right, honor_protected);
        }
        self.set_cursor_y(saved_y);
        self.mark_dirty();
    }

    /// Scroll a full-width row range up by `count` inside the buffer:
    /// the top lines leave the range and blanks enter at the bottom.
    pub fn scroll_region_up(&mut self, top: usize, bottom: usize, count: usize) {
        if bottom < top || count == 0 {
            return;
        }
        if top == bottom {
            self.erase_screen(top, 0, bottom, self.width() - 1, false);
            return;
        }
        let count = count.min(bottom - top + 1);
        self.ensure_row(bottom);
        let t = self.row_index(top);
        let b = self.row_index(bottom);
        let width = self.width();
        let debug_attr = self.debug_fill_attr();
        for _ in 0..count {
            self.sb.remove(t);
            self.sb.insert_before(b, blank_line(width, debug_attr));
        }
        self.touch_rows(top, bottom);
    }

    /// Scroll a full-width row range down by `count`: blanks enter at the
    /// top and the bottom lines leave the range.
    pub fn scroll_region_down(&mut self, top: usize, bottom: usize, count: usize) {
        if bottom < top || count == 0 {
            return;
        }
        if top == bottom {
            self.erase_screen(top, 0, bottom, self.width() - 1, false);
            return;
        }
        let count = count.min(bottom - top + 1);
        self.ensure_row(bottom);
        let t = self.row_index(top);
        let b = self.row_index(bottom);
        let width = self.width();
        let debug_attr = self.debug_fill_attr();
        for _ in 0..count {
            self.sb.remove(b);
            self.sb.insert_before(t, blank_line(width, debug_attr));
        }
        self.touch_rows(top, bottom);
    }

    /// Scroll the cell span `[left, right]` of rows `[top, bottom]` up by
    /// `count`, erasing the vacated rows. Columns outside the span are
    /// untouched, which is what distinguishes this from the full-width
    /// scrolls above.
    pub fn rectangle_scroll_up(
        &mut self,
        top: usize,
        left: usize,
        bottom: usize,
        right: usize,
        count: usize,
    ) {
        if bottom < top || count == 0 {
            return;
        }
        let height = bottom - top + 1;
        if count >= height {
            self.erase_screen(top, left, bottom, right, false);
            return;
        }
        self.ensure_row(bottom);
        for row in top..=bottom - count {
            self.copy_span(row + count, row, left, right);
        }
        self.erase_screen(bottom - count + 1, left, bottom, right, false);
        self.touch_rows(top, bottom);
    }

    pub fn rectangle_scroll_down(
        &mut self,
        top: usize,
        left: usize,
        bottom: usize,
        right: usize,
        count: usize,
    ) {
        if bottom < top || count == 0 {
            return;
        }
        let height = bottom - top + 1;
        if count >= height {
            self.erase_screen(top, left, bottom, right, false);
            return;
        }
        self.ensure_row(bottom);
        for row in (top + count..=bottom).rev() {
            self.copy_span(row - count, row, left, right);
        }
        self.erase_screen(top, left, top + count - 1, right, false);
        self.touch_rows(top, bottom);
    }

    fn copy_span(&mut self, from_row: usize, to_row: usize, left: usize, right: usize) {
        let src = self.row_index(from_row);
        let cells: Vec<(char, CellAttr)> = {
            let line = self.sb.line(src);
            (left..=right)
                .map(|col| (line.char_at(col), line.attr_at(col)))
                .collect()
        };
        let line = self.line_at_row(to_row);
        for (i, (ch, attr)) in cells.into_iter().enumerate() {
            line.put(left + i, ch, attr);
        }
    }

    fn touch_rows(&mut self, top: usize, bottom: usize) {
        for row in top..=bottom {
            let idx = self.row_index(row);
            if idx < self.sb.len() {
                self.sb.line_mut(idx).dirty = true;
            }
        }
        self.mark_dirty();
    }

    /// Remove `n` cells at the cursor; the rest of the line shifts left
    pub fn delete_character(&mut self, n: usize) {
        let x = self.cursor_x();
        let line = self.current_line();
        for _ in 0..n {
            line.delete_cell(x);
        }
        self.mark_dirty();
    }

    /// Insert `n` blank cells at the cursor; the tail shifts right and
    /// falls off at the capacity
    pub fn insert_blanks(&mut self, n: usize) {
        let x = self.cursor_x();
        let attr = self.erase_attr();
        let line = self.current_line();
        for _ in 0..n {
            line.insert_blank(x, attr);
        }
        self.mark_dirty();
    }

    /// Tag the cursor line single or double width. Going back to single
    /// width also drops any double-height state.
    pub fn set_double_width(&mut self, double: bool) {
        self.set_wrap_pending(false);
        let line = self.current_line();
        line.double_width = double;
        if !double {
            line.double_height = DoubleHeight::Single;
        }
        line.dirty = true;
        let margin = self.effective_right_margin();
        if self.cursor_x() > margin {
            self.set_cursor_x(margin);
        }
        self.mark_dirty();
    }

    /// Tag the cursor line as the top or bottom half of a double-height
    /// row. Double height implies double width.
    pub fn set_double_height(&mut self, mode: DoubleHeight) {
        self.set_wrap_pending(false);
        {
            let line = self.current_line();
            line.double_height = mode;
            if mode != DoubleHeight::Single {
                line.double_width = true;
            }
            line.dirty = true;
        }
        let margin = self.effective_right_margin();
        if self.cursor_x() > margin {
            self.set_cursor_x(margin);
        }
        self.mark_dirty();
    }

    /// Toggle the per-line reverse flag across the visible region,
    /// padding short lines so the flip covers the full screen width.
    pub fn invert_scrollback_colors(&mut self) {
        let width = self.width();
        for row in 0..self.visible_rows() {
            let idx = self.row_index(row);
            if idx >= self.sb.len() {
                break;
            }
            let line = self.sb.line_mut(idx);
            line.pad_to(width, CellAttr::default());
            line.reverse_color = !line.reverse_color;
            line.dirty = true;
        }
        self.mark_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulation::Emulation;
    use crate::term::test_terminal;

    fn type_str(term: &mut Terminal, s: &str) {
        for ch in s.chars() {
            term.print_character(ch);
        }
    }

    fn row_text(term: &Terminal, row: usize) -> String {
        term.scrollback().line(term.row_index(row)).text()
    }

    #[test]
    fn test_erase_line_honors_protect() {
        let mut term = test_terminal();
        term.set_emulation(Emulation::Vt220);
        type_str(&mut term, "ab");
        term.attr_mut().set(Style::PROTECT);
        type_str(&mut term, "cd");
        term.attr_mut().clear(Style::PROTECT);
        type_str(&mut term, "ef");

        term.erase_line(0, 79, true);
        assert_eq!(row_text(&term, 0).trim_end(), "  cd");

        term.erase_line(0, 79, false);
        assert_eq!(row_text(&term, 0).trim_end(), "");
    }

    #[test]
    fn test_erase_to_eol_truncates_with_default_attr() {
        let mut term = test_terminal();
        term.set_emulation(Emulation::Vt100);
        type_str(&mut term, "hello world");
        term.cursor_position(0, 5);
        term.erase_line(5, 79, false);
        assert_eq!(term.scrollback().line(term.row_index(0)).len(), 5);
        assert_eq!(row_text(&term, 0), "hello");
    }

    #[test]
    fn test_delete_and_insert_characters() {
        let mut term = test_terminal();
        type_str(&mut term, "abcdef");
        term.cursor_position(0, 2);
        term.delete_character(2);
        assert_eq!(row_text(&term, 0), "abef");
        term.insert_blanks(1);
        assert_eq!(row_text(&term, 0), "ab ef");
    }

    #[test]
    fn test_rectangle_scroll_up_moves_span_only() {
        let mut term = test_terminal();
        for row in 0..4 {
            term.cursor_position(row, 0);
            type_str(&mut term, &format!("L{}xxxx", row));
        }
        term.rectangle_scroll_up(0, 2, 3, 5, 1);
        // Columns 0-1 keep their row labels, columns 2-5 moved up.
        assert_eq!(row_text(&term, 0), "L0xxxx");
        let row3 = term.scrollback().line(term.row_index(3));
        assert_eq!(row3.char_at(0), 'L');
        assert_eq!(row3.char_at(1), '3');
        for col in 2..=5 {
            assert_eq!(row3.char_at(col), ' ');
        }
    }

    #[test]
    fn test_rectangle_scroll_shortcuts_to_erase() {
        let mut term = test_terminal();
        for row in 0..3 {
            term.cursor_position(row, 0);
            type_str(&mut term, "zzz");
        }
        term.rectangle_scroll_up(0, 0, 2, 79, 5);
        for row in 0..3 {
            assert_eq!(row_text(&term, row).trim_end(), "");
        }
    }

    #[test]
    fn test_scroll_region_down_inserts_blank_at_top() {
        let mut term = test_terminal();
        for row in 0..3 {
            term.cursor_position(row, 0);
            type_str(&mut term, &format!("{}", row));
        }
        term.scroll_region_down(0, 2, 1);
        assert_eq!(row_text(&term, 0).trim_end(), "");
        assert_eq!(row_text(&term, 1).trim_end(), "0");
        assert_eq!(row_text(&term, 2).trim_end(), "1");
    }

    #[test]
    fn test_double_height_implies_double_width() {
        let mut term = test_terminal();
        term.set_double_height(DoubleHeight::Top);
        let line = term.scrollback().line(term.row_index(0));
        assert!(line.double_width);
        assert_eq!(line.double_height, DoubleHeight::Top);

        term.set_double_width(false);
        let line = term.scrollback().line(term.row_index(0));
        assert!(!line.double_width);
        assert_eq!(line.double_height, DoubleHeight::Single);
    }

    #[test]
    fn test_invert_scrollback_colors_twice_restores() {
        let mut term = test_terminal();
        type_str(&mut term, "abc");
        term.invert_scrollback_colors();
        let line = term.scrollback().line(term.row_index(0));
        assert!(line.reverse_color);
        assert_eq!(line.len(), 80);
        term.invert_scrollback_colors();
        let line = term.scrollback().line(term.row_index(0));
        assert!(!line.reverse_color);
    }

    #[test]
    fn test_bce_erase_keeps_background() {
        let mut term = test_terminal();
        term.set_emulation(Emulation::Ansi);
        term.attr_mut().set_bg(crate::term::attr::BLUE);
        type_str(&mut term, "x");
        term.erase_line(0, 79, false);
        let line = term.scrollback().line(term.row_index(0));
        assert_eq!(line.attr_at(0).bg(), crate::term::attr::BLUE);
        assert_eq!(line.char_at(0), ' ');
    }
}
