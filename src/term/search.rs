//! Scrollback text search
//!
//! Case-insensitive substring search over the buffer. Matching lines get
//! a color overlay (REVERSE|BLINK over the matched span) that the render
//! pass substitutes while the user is paging through history. Find-again
//! resumes below the previous hit; running out of hits wraps the resume
//! point back to the head and tells the caller so.

use super::Terminal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A line matched; its buffer index
    Found(usize),
    /// Nothing in the buffer matches
    NotFound,
    /// All remaining matches exhausted; the next find-again starts over
    NoMoreMatches,
}

/// Case-insensitive character-wise substring scan. Returns the column of
/// the first match.
fn find_ci(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    let fold = |c: char| c.to_lowercase().next().unwrap_or(c);
    'outer: for start in 0..=haystack.len() - needle.len() {
        for (i, nc) in needle.iter().enumerate() {
            if fold(haystack[start + i]) != fold(*nc) {
                continue 'outer;
            }
        }
        return Some(start);
    }
    None
}

impl Terminal {
    /// Fresh search: drop old overlays, mark every matching line, and
    /// bring the first match near the top of the viewport.
    pub fn search(&mut self, needle: &str) -> SearchOutcome {
        self.clear_search();
        let needle: Vec<char> = needle.chars().collect();
        let mut first = None;
        for idx in 0..self.sb.len() {
            let chars: Vec<char> = self.sb.line(idx).text().chars().collect();
            if let Some(col) = find_ci(&chars, &needle) {
                self.sb
                    .line_mut(idx)
                    .mark_search_match(col, col + needle.len());
                if first.is_none() {
                    first = Some(idx);
                }
            }
        }
        match first {
            Some(idx) => {
                self.search_resume = Some(idx);
                self.show_match(idx);
                SearchOutcome::Found(idx)
            }
            None => SearchOutcome::NotFound,
        }
    }

    /// Resume below the previous hit. The overlays from the initial
    /// search stay in place; only the viewport moves.
    pub fn search_again(&mut self) -> SearchOutcome {
        let start = match self.search_resume {
            Some(idx) => idx + 1,
            None => 0,
        };
        for idx in start..self.sb.len() {
            if self.sb.line(idx).search_match {
                self.search_resume = Some(idx);
                self.show_match(idx);
                return SearchOutcome::Found(idx);
            }
        }
        // Exhausted: wrap the resume point back to the head.
        self.search_resume = None;
        if self.sb.iter().any(|line| line.search_match) {
            SearchOutcome::NoMoreMatches
        } else {
            SearchOutcome::NotFound
        }
    }

    /// Remove all match overlays (leaving scrollback-view state does this)
    pub fn clear_search(&mut self) {
        for line in self.sb.iter_mut() {
            line.clear_search_match();
        }
        self.search_resume = None;
        self.mark_dirty();
    }

    /// Position `view_bottom` so line `idx` lands near the viewport top
    fn show_match(&mut self, idx: usize) {
        let bottom = (idx + self.sb.visible_rows() - 1).min(self.sb.len() - 1);
        self.sb.set_view_bottom(bottom);
        self.mark_dirty();
    }
}
