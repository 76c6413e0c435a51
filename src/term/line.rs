//! Scrollback line records

use super::attr::{CellAttr, Style};

/// Maximum number of cells a single line can hold. Emulations never
/// address columns at or beyond this value.
pub const LINE_CAPACITY: usize = 256;

/// Double-height rendering state of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DoubleHeight {
    #[default]
    Single,
    /// Top half of a double-height row
    Top,
    /// Bottom half of a double-height row
    Bottom,
}

/// One row of the scrollback buffer.
///
/// Cells at index >= `len()` are implicitly spaces in the default
/// attribute; the vectors only hold the meaningful prefix.
#[derive(Debug, Clone)]
pub struct Line {
    chars: Vec<char>,
    colors: Vec<CellAttr>,
    /// Render hint, set by every mutation and cleared by the renderer
    pub dirty: bool,
    /// Line renders at half the usual horizontal density
    pub double_width: bool,
    pub double_height: DoubleHeight,
    /// DEC-style per-line reverse flag, applied to all cells at render time
    pub reverse_color: bool,
    /// Overlay colors computed by a search pass; valid when `search_match`
    pub search_colors: Vec<CellAttr>,
    pub search_match: bool,
}

impl Default for Line {
    fn default() -> Self {
        Self::new()
    }
}

impl Line {
    pub fn new() -> Self {
        Self {
            chars: Vec::new(),
            colors: Vec::new(),
            dirty: true,
            double_width: false,
            double_height: DoubleHeight::Single,
            reverse_color: false,
            search_colors: Vec::new(),
            search_match: false,
        }
    }

    /// A line whose first `width` cells are spaces in `attr`. Used by the
    /// hex-debug view, which wants freshly scrolled rows pre-painted.
    pub fn filled(width: usize, attr: CellAttr) -> Self {
        let mut line = Self::new();
        line.pad_to(width.min(LINE_CAPACITY), attr);
        line
    }

    /// Number of meaningful cells
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Character at `col`, implicit space beyond the meaningful prefix
    pub fn char_at(&self, col: usize) -> char {
        self.chars.get(col).copied().unwrap_or(' ')
    }

    /// Attribute at `col`, implicit default beyond the meaningful prefix
    pub fn attr_at(&self, col: usize) -> CellAttr {
        self.colors.get(col).copied().unwrap_or_default()
    }

    /// Grow the meaningful prefix to `col` cells, padding with spaces
    pub fn pad_to(&mut self, col: usize, attr: CellAttr) {
        let col = col.min(LINE_CAPACITY);
        while self.chars.len() < col {
            self.chars.push(' ');
            self.colors.push(attr);
        }
    }

    /// Write one cell, padding any gap with spaces in `attr`
    pub fn put(&mut self, col: usize, ch: char, attr: CellAttr) {
        if col >= LINE_CAPACITY {
            return;
        }
        if col < self.chars.len() {
            self.chars[col] = ch;
            self.colors[col] = attr;
        } else {
            self.pad_to(col, attr);
            self.chars.push(ch);
            self.colors.push(attr);
        }
        self.dirty = true;
    }

    /// Replace the attribute of an existing cell without touching the glyph
    pub fn put_attr(&mut self, col: usize, attr: CellAttr) {
        if col < self.colors.len() {
            self.colors[col] = attr;
            self.dirty = true;
        }
    }

    /// Drop cells at and beyond `col`
    pub fn truncate(&mut self, col: usize) {
        if col < self.chars.len() {
            self.chars.truncate(col);
            self.colors.truncate(col);
            self.dirty = true;
        }
    }

    /// Shift cells left by one starting at `col`, shrinking the line
    pub fn delete_cell(&mut self, col: usize) {
        if col < self.chars.len() {
            self.chars.remove(col);
            self.colors.remove(col);
            self.dirty = true;
        }
    }

    /// Insert a blank cell at `col`, shifting the tail right. Cells pushed
    /// past the capacity fall off.
    pub fn insert_blank(&mut self, col: usize, attr: CellAttr) {
        if col >= LINE_CAPACITY {
            return;
        }
        self.pad_to(col, attr);
        self.chars.insert(col, ' ');
        self.colors.insert(col, attr);
        if self.chars.len() > LINE_CAPACITY {
            self.chars.truncate(LINE_CAPACITY);
            self.colors.truncate(LINE_CAPACITY);
        }
        self.dirty = true;
    }

    /// The meaningful cells as a string (for search and dumps)
    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    /// Paint the search overlay: a copy of the cell colors with
    /// REVERSE|BLINK OR'd over `[start, end)`.
    pub fn mark_search_match(&mut self, start: usize, end: usize) {
        self.search_colors.clear();
        for col in 0..self.len().max(end) {
            self.search_colors.push(self.attr_at(col));
        }
        for col in start..end.min(self.search_colors.len()) {
            self.search_colors[col].set(Style::REVERSE | Style::BLINK);
        }
        self.search_match = true;
        self.dirty = true;
    }

    /// Forget a previous search overlay
    pub fn clear_search_match(&mut self) {
        if self.search_match {
            self.search_match = false;
            self.search_colors.clear();
            self.dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_beyond_len_are_spaces() {
        let line = Line::new();
        assert_eq!(line.len(), 0);
        assert_eq!(line.char_at(40), ' ');
        assert_eq!(line.attr_at(40), CellAttr::default());
    }

    #[test]
    fn test_put_pads_gap() {
        let mut line = Line::new();
        let attr = CellAttr::new(2, 0);
        line.put(3, 'x', attr);
        assert_eq!(line.len(), 4);
        assert_eq!(line.char_at(0), ' ');
        assert_eq!(line.attr_at(0), attr);
        assert_eq!(line.char_at(3), 'x');
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut line = Line::new();
        line.put(LINE_CAPACITY, 'x', CellAttr::default());
        assert_eq!(line.len(), 0);

        line.put(LINE_CAPACITY - 1, 'y', CellAttr::default());
        assert_eq!(line.len(), LINE_CAPACITY);
        line.insert_blank(0, CellAttr::default());
        assert_eq!(line.len(), LINE_CAPACITY);
        assert_eq!(line.char_at(0), ' ');
        assert_eq!(line.char_at(LINE_CAPACITY - 1), ' ');
    }

    #[test]
    fn test_insert_and_delete_shift_cells() {
        let mut line = Line::new();
        for (i, ch) in "abc".chars().enumerate() {
            line.put(i, ch, CellAttr::default());
        }
        line.insert_blank(1, CellAttr::default());
        assert_eq!(line.text(), "a bc");
        line.delete_cell(1);
        assert_eq!(line.text(), "abc");
    }

    #[test]
    fn test_search_overlay() {
        let mut line = Line::new();
        for (i, ch) in "hello".chars().enumerate() {
            line.put(i, ch, CellAttr::default());
        }
        line.mark_search_match(0, 5);
        assert!(line.search_match);
        assert!(line.search_colors[0].has(Style::REVERSE));
        assert!(line.search_colors[4].has(Style::BLINK));
        line.clear_search_match();
        assert!(!line.search_match);
        assert!(line.search_colors.is_empty());
    }
}
