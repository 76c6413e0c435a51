//! Scrollback dumps
//!
//! Two textual renderings of the buffer: a plain code-point dump and an
//! HTML rendering that preserves cell colors. Both bracket the payload
//! with a timestamped BEGIN/END banner. A failed write leaves the
//! in-memory buffer untouched; the caller routes the error to its
//! notification surface.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;

use super::attr::{CellAttr, Style};
use super::Terminal;

/// Dump rendering selected by the `scrollback_save_type` option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    Normal,
    Html,
}

fn banner(which: &str) -> String {
    format!(
        "* - * {} {} {} {} * - *",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        which,
    )
}

/// Map a cell attribute to the HTML font color, folding BOLD into the
/// bright variant the way a 16-color display would.
fn html_color(attr: CellAttr) -> &'static str {
    let attr = if attr.has(Style::REVERSE) {
        attr.swapped()
    } else {
        attr
    };
    match (attr.fg(), attr.has(Style::BOLD)) {
        (0, false) => "#000000",
        (1, false) => "#ab0000",
        (2, false) => "#00ab00",
        (3, false) => "#ab5700",
        (4, false) => "#0000ab",
        (5, false) => "#ab00ab",
        (6, false) => "#00abab",
        (0, true) => "#545454",
        (1, true) => "#ff5454",
        (2, true) => "#54ff54",
        (3, true) => "#ffff54",
        (4, true) => "#5454ff",
        (5, true) => "#ff54ff",
        (6, true) => "#54ffff",
        (_, true) => "#ffffff",
        _ => "#ababab",
    }
}

fn push_html_char(out: &mut String, ch: char) {
    match ch {
        ' ' => out.push_str("&nbsp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '&' => out.push_str("&amp;"),
        c if (c as u32) > 127 => out.push_str(&format!("&#{};", c as u32)),
        c => out.push(c),
    }
}

impl Terminal {
    /// Serialize the whole buffer in the requested format
    pub fn render_scrollback_dump(&self, format: SaveFormat) -> String {
        match format {
            SaveFormat::Normal => self.dump_normal(),
            SaveFormat::Html => self.dump_html(),
        }
    }

    /// Write the dump to `path`. The buffer is not modified.
    pub fn save_scrollback(&self, path: &Path, format: SaveFormat) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create dump file {}", path.display()))?;
        let mut out = BufWriter::new(file);
        out.write_all(self.render_scrollback_dump(format).as_bytes())
            .context("Failed to write scrollback dump")?;
        out.flush().context("Failed to flush scrollback dump")?;
        Ok(())
    }

    fn dump_normal(&self) -> String {
        let mut out = String::new();
        out.push_str(&banner("BEGIN"));
        out.push('\n');
        for line in self.sb.iter() {
            let text = line.text();
            out.push_str(text.trim_end_matches(' '));
            out.push('\n');
        }
        out.push_str(&banner("END"));
        out.push('\n');
        out
    }

    fn dump_html(&self) -> String {
        let mut out = String::new();
        out.push_str("<html>\n<body bgcolor=\"black\">\n<pre><code>\n");
        out.push_str(&format!(
            "<font color=\"#ffffff\">{}</font>\n",
            banner("BEGIN")
        ));
        for line in self.sb.iter() {
            let mut current: Option<CellAttr> = None;
            for col in 0..line.len() {
                let attr = line.attr_at(col).check_reverse(line.reverse_color);
                if current != Some(attr) {
                    if current.is_some() {
                        out.push_str("</font>");
                    }
                    out.push_str(&format!("<font color=\"{}\">", html_color(attr)));
                    current = Some(attr);
                }
                push_html_char(&mut out, line.char_at(col));
            }
            if current.is_some() {
                out.push_str("</font>");
            }
            out.push('\n');
        }
        out.push_str(&format!(
            "<font color=\"#ffffff\">{}</font>\n",
            banner("END")
        ));
        out.push_str("</code></pre>\n</body>\n</html>\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::test_terminal;

    fn type_str(term: &mut crate::term::Terminal, s: &str) {
        for ch in s.chars() {
            term.print_character(ch);
        }
    }

    #[test]
    fn test_normal_dump_brackets_with_banners() {
        let mut term = test_terminal();
        type_str(&mut term, "hello");
        let dump = term.render_scrollback_dump(SaveFormat::Normal);
        let lines: Vec<&str> = dump.lines().collect();
        assert!(lines.first().unwrap().contains("BEGIN"));
        assert!(lines.first().unwrap().contains("retroterm"));
        assert!(lines.last().unwrap().contains("END"));
        assert_eq!(lines[1], "hello");
    }

    #[test]
    fn test_normal_dump_roundtrips_code_points() {
        let mut term = test_terminal();
        type_str(&mut term, "caf\u{e9} \u{2502}\u{2524}");
        let dump = term.render_scrollback_dump(SaveFormat::Normal);
        assert!(dump.contains("caf\u{e9} \u{2502}\u{2524}"));
    }

    #[test]
    fn test_html_dump_escapes_and_coalesces() {
        let mut term = test_terminal();
        type_str(&mut term, "a<b>");
        term.attr_mut().set(Style::BOLD);
        type_str(&mut term, "c");
        let dump = term.render_scrollback_dump(SaveFormat::Html);
        assert!(dump.starts_with("<html>"));
        assert!(dump.contains("a&lt;b&gt;"));
        // One font run for the plain span, a second for the bold cell.
        assert!(dump.contains("</font><font color=\"#ffffff\">c</font>"));
        assert!(dump.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_html_dump_encodes_non_ascii_as_entities() {
        let mut term = test_terminal();
        type_str(&mut term, "\u{2500}");
        let dump = term.render_scrollback_dump(SaveFormat::Html);
        assert!(dump.contains("&#9472;"));
    }

    #[test]
    fn test_save_writes_file() {
        let mut term = test_terminal();
        type_str(&mut term, "persisted");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.txt");
        term.save_scrollback(&path, SaveFormat::Normal).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("persisted"));
    }
}
