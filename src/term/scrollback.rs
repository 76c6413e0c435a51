//! Scrollback buffer
//!
//! A growable deque of owned line records. The oldest line (head) sits at
//! the front, the newest (tail) at the back; the `view_bottom` anchor is
//! the last line currently shown in the viewport and normally tracks the
//! tail, only diverging while the user is paging through history. The
//! edit anchor (the line under the virtual cursor) is derived from the
//! cursor row in [`super::Terminal`] and therefore cannot alias.

use std::collections::VecDeque;

use super::attr::CellAttr;
use super::line::Line;
use super::renderer::Renderer;

pub struct Scrollback {
    lines: VecDeque<Line>,
    /// Index of the last line visible in the viewport
    view_bottom: usize,
    /// Rows available to the emulation (terminal height minus status area)
    visible_rows: usize,
    /// Cap when scrollback is enabled; 0 means uncapped
    max_lines: usize,
    /// When disabled the buffer holds only the visible region
    enabled: bool,
    /// While true, appending moves `view_bottom` to the new tail
    track_tail: bool,
}

impl Scrollback {
    pub fn new(visible_rows: usize, max_lines: usize) -> Self {
        let mut lines = VecDeque::new();
        lines.push_back(Line::new());
        Self {
            lines,
            view_bottom: 0,
            visible_rows,
            max_lines,
            enabled: true,
            track_tail: true,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn visible_rows(&self) -> usize {
        self.visible_rows
    }

    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    pub fn set_max_lines(&mut self, max_lines: usize) {
        self.max_lines = max_lines;
        self.enforce_cap();
    }

    pub fn scrollback_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_scrollback_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.enforce_cap();
    }

    /// Whether `view_bottom` follows the tail. The host turns this off
    /// while the user pages through history; bytes that arrive meanwhile
    /// still mutate the tail without moving the view.
    pub fn tracking_tail(&self) -> bool {
        self.track_tail
    }

    pub fn set_tracking_tail(&mut self, track: bool) {
        self.track_tail = track;
        if track {
            self.view_bottom = self.tail_index();
        }
    }

    pub fn tail_index(&self) -> usize {
        self.lines.len() - 1
    }

    pub fn view_bottom(&self) -> usize {
        self.view_bottom
    }

    /// Move the view so `idx` is the bottom visible line
    pub fn set_view_bottom(&mut self, idx: usize) {
        self.view_bottom = idx.min(self.tail_index());
    }

    /// Index of the line rendered at screen row 0 when viewing the tail
    pub fn screen_base(&self) -> usize {
        self.lines.len().saturating_sub(self.visible_rows)
    }

    pub fn line(&self, idx: usize) -> &Line {
        &self.lines[idx]
    }

    pub fn line_mut(&mut self, idx: usize) -> &mut Line {
        &mut self.lines[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Line> {
        self.lines.iter_mut()
    }

    /// Append a new tail line and enforce the cap
    pub fn append(&mut self, line: Line) {
        self.lines.push_back(line);
        if self.track_tail {
            self.view_bottom = self.tail_index();
        }
        self.enforce_cap();
    }

    /// Insert a line before `idx`. A detached view anchor shifts with the
    /// cells it was showing; a tracking anchor stays pinned to the tail.
    pub fn insert_before(&mut self, idx: usize, line: Line) {
        self.lines.insert(idx, line);
        if self.track_tail {
            self.view_bottom = self.tail_index();
        } else if self.view_bottom >= idx {
            self.view_bottom += 1;
        }
        self.enforce_cap();
    }

    /// Remove and return the line at `idx`
    pub fn remove(&mut self, idx: usize) -> Line {
        let line = self.lines.remove(idx).unwrap_or_default();
        if self.lines.is_empty() {
            self.lines.push_back(Line::new());
        }
        if self.track_tail {
            self.view_bottom = self.tail_index();
        } else {
            if self.view_bottom > idx {
                self.view_bottom -= 1;
            }
            self.view_bottom = self.view_bottom.min(self.tail_index());
        }
        line
    }

    fn enforce_cap(&mut self) {
        if self.enabled {
            if self.max_lines == 0 {
                return;
            }
            while self.lines.len() > self.max_lines {
                self.lines.pop_front();
                self.view_bottom = self.view_bottom.saturating_sub(1);
            }
        } else {
            // Without scrollback only the visible region is retained; the
            // line dropped is the one just above the visible window.
            while self.lines.len() > self.visible_rows {
                let drop_idx = self.lines.len() - self.visible_rows - 1;
                let _ = self.lines.remove(drop_idx);
                if self.view_bottom > drop_idx {
                    self.view_bottom -= 1;
                }
            }
        }
        self.view_bottom = self.view_bottom.min(self.tail_index());
    }

    /// Render the viewport through the backend.
    ///
    /// The window ends at `view_bottom` and spans `visible_rows -
    /// skip_lines` rows, drawn into display rows `skip_lines..`. Lines
    /// whose `dirty` flag is clear are still emitted; dirty tracking only
    /// gates whether the host bothers calling us.
    pub fn render_window(
        &mut self,
        renderer: &mut dyn Renderer,
        width: usize,
        skip_lines: usize,
        in_view_state: bool,
    ) {
        let rows = self.visible_rows.saturating_sub(skip_lines);
        if rows == 0 {
            return;
        }
        let top = (self.view_bottom + 1).saturating_sub(rows);
        let hw_doublewidth = renderer.has_true_doublewidth();

        let mut row = skip_lines;
        for idx in top..=self.view_bottom {
            let line = &mut self.lines[idx];
            let use_search = in_view_state && line.search_match;
            let cells = if line.double_width && !hw_doublewidth {
                width / 2
            } else {
                width
            };
            renderer.set_row_double_width(row, line.double_width && hw_doublewidth);
            let mut col = 0;
            for i in 0..line.len().min(cells) {
                let attr = if use_search {
                    line.search_colors.get(i).copied().unwrap_or_default()
                } else {
                    line.attr_at(i)
                };
                let attr = attr.check_reverse(line.reverse_color);
                renderer.put_cell(row, col, line.char_at(i), attr);
                col += 1;
                if line.double_width && !hw_doublewidth {
                    renderer.put_cell(row, col, ' ', attr);
                    col += 1;
                }
            }
            renderer.clear_to_eol(row, col);
            line.dirty = false;
            row += 1;
        }

        // Rows below the last renderable line are blanked and reset to
        // single width.
        while row < skip_lines + rows {
            renderer.set_row_double_width(row, false);
            renderer.clear_to_eol(row, 0);
            row += 1;
        }
        renderer.flush();
    }
}

/// Build a blank line: spaces in the default attribute. The hex-debug
/// variant instead wants new rows pre-painted in reverse video so its
/// write position is visible.
pub fn blank_line(width: usize, debug_reverse: Option<CellAttr>) -> Line {
    match debug_reverse {
        Some(attr) => Line::filled(width, attr),
        None => Line::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::attr::Style;

    fn push_text(sb: &mut Scrollback, text: &str) {
        let mut line = Line::new();
        for (i, ch) in text.chars().enumerate() {
            line.put(i, ch, CellAttr::default());
        }
        sb.append(line);
    }

    #[test]
    fn test_cap_drops_head_when_enabled() {
        let mut sb = Scrollback::new(24, 10);
        for i in 0..15 {
            push_text(&mut sb, &format!("{:X}", i + 1));
        }
        // The initial blank line plus 15 appended, capped at 10.
        assert_eq!(sb.len(), 10);
        assert_eq!(sb.line(0).char_at(0), '6');
        assert_eq!(sb.line(sb.tail_index()).char_at(0), 'F');
    }

    #[test]
    fn test_cap_zero_is_uncapped() {
        let mut sb = Scrollback::new(24, 0);
        for i in 0..100 {
            push_text(&mut sb, &format!("{}", i));
        }
        assert_eq!(sb.len(), 101);
    }

    #[test]
    fn test_disabled_scrollback_keeps_visible_region_only() {
        let mut sb = Scrollback::new(5, 0);
        sb.set_scrollback_enabled(false);
        for i in 0..9 {
            push_text(&mut sb, &format!("{}", i));
        }
        assert_eq!(sb.len(), 5);
        // Tail survives; the lines dropped were those scrolled off the top.
        assert_eq!(sb.line(sb.tail_index()).char_at(0), '8');
    }

    #[test]
    fn test_view_bottom_tracks_tail_until_detached() {
        let mut sb = Scrollback::new(24, 0);
        push_text(&mut sb, "a");
        assert_eq!(sb.view_bottom(), sb.tail_index());

        sb.set_tracking_tail(false);
        let pinned = sb.view_bottom();
        push_text(&mut sb, "b");
        push_text(&mut sb, "c");
        assert_eq!(sb.view_bottom(), pinned);

        sb.set_tracking_tail(true);
        assert_eq!(sb.view_bottom(), sb.tail_index());
    }

    #[test]
    fn test_insert_before_keeps_view_on_same_cells() {
        let mut sb = Scrollback::new(24, 0);
        for i in 0..5 {
            push_text(&mut sb, &format!("{}", i));
        }
        sb.set_tracking_tail(false);
        sb.set_view_bottom(3);
        sb.insert_before(2, Line::new());
        assert_eq!(sb.view_bottom(), 4);
        // Still the line that used to be at index 3.
        assert_eq!(sb.line(sb.view_bottom()).char_at(0), '2');
    }

    #[test]
    fn test_eviction_adjusts_detached_view() {
        let mut sb = Scrollback::new(2, 4);
        for i in 0..4 {
            push_text(&mut sb, &format!("{}", i));
        }
        sb.set_tracking_tail(false);
        sb.set_view_bottom(2);
        push_text(&mut sb, "x");
        // One line evicted from the head; the anchor shifted with it.
        assert_eq!(sb.len(), 4);
        assert_eq!(sb.view_bottom(), 1);
    }

    struct Grid {
        cells: Vec<Vec<(char, CellAttr)>>,
        dw: Vec<bool>,
    }

    impl Grid {
        fn new(rows: usize, cols: usize) -> Self {
            Self {
                cells: vec![vec![(' ', CellAttr::default()); cols]; rows],
                dw: vec![false; rows],
            }
        }

        fn row_text(&self, row: usize) -> String {
            self.cells[row].iter().map(|c| c.0).collect()
        }
    }

    impl Renderer for Grid {
        fn put_cell(&mut self, row: usize, col: usize, ch: char, attr: CellAttr) {
            if row < self.cells.len() && col < self.cells[row].len() {
                self.cells[row][col] = (ch, attr);
            }
        }
        fn move_cursor(&mut self, _row: usize, _col: usize) {}
        fn clear_to_eol(&mut self, row: usize, col: usize) {
            if row < self.cells.len() {
                for cell in self.cells[row].iter_mut().skip(col) {
                    *cell = (' ', CellAttr::default());
                }
            }
        }
        fn set_row_double_width(&mut self, row: usize, enabled: bool) {
            if row < self.dw.len() {
                self.dw[row] = enabled;
            }
        }
        fn has_true_doublewidth(&self) -> bool {
            false
        }
        fn flush(&mut self) {}
    }

    #[test]
    fn test_render_window_basic() {
        let mut sb = Scrollback::new(4, 0);
        sb.line_mut(0).put(0, '0', CellAttr::default());
        push_text(&mut sb, "one");
        push_text(&mut sb, "two");

        let mut grid = Grid::new(4, 10);
        sb.render_window(&mut grid, 10, 0, false);
        assert_eq!(grid.row_text(0), "0         ");
        assert_eq!(grid.row_text(1), "one       ");
        assert_eq!(grid.row_text(2), "two       ");
        assert_eq!(grid.row_text(3), "          ");
        assert!(!sb.line(1).dirty);
    }

    #[test]
    fn test_render_window_doubles_width_in_software() {
        let mut sb = Scrollback::new(2, 0);
        push_text(&mut sb, "ab");
        sb.line_mut(1).double_width = true;

        let mut grid = Grid::new(2, 8);
        sb.render_window(&mut grid, 8, 0, false);
        assert_eq!(grid.row_text(1), "a b     ");
        assert!(!grid.dw[1]);
    }

    #[test]
    fn test_render_window_search_overlay_only_in_view_state() {
        let mut sb = Scrollback::new(2, 0);
        push_text(&mut sb, "hit");
        let idx = sb.tail_index();
        sb.line_mut(idx).mark_search_match(0, 3);

        let mut grid = Grid::new(2, 8);
        sb.render_window(&mut grid, 8, 0, true);
        assert!(grid.cells[1][0].1.has(Style::REVERSE));

        sb.render_window(&mut grid, 8, 0, false);
        assert!(!grid.cells[1][0].1.has(Style::REVERSE));
    }
}
