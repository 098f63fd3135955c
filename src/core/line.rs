//! Terminal line representation
//!
//! A line is a row of cells plus the metadata the renderer and the reflow
//! code need: whether it soft-wraps into the next row, which columns changed
//! since the renderer last looked, and when it was last touched.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::cell::{Cell, Color};

/// A row of cells in the terminal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    /// The cells in this line
    cells: Vec<Cell>,
    /// True if this line's content continues on the next row (soft wrap)
    wrapped: bool,
    /// Columns changed since the last `clear_dirty`
    dirty: Option<Range<usize>>,
    /// Screen sequence number of the last mutation
    timestamp: u64,
}

impl Line {
    /// Create a new blank line with the specified number of columns
    pub fn new(cols: usize) -> Self {
        Self::blank(cols, Color::Default)
    }

    /// Create a blank line whose cells carry a background color
    pub fn blank(cols: usize, bg: Color) -> Self {
        Self {
            cells: vec![Cell::blank(bg); cols],
            wrapped: false,
            dirty: None,
            timestamp: 0,
        }
    }

    /// Build a line from cells, used when rewrapping
    pub fn from_cells(cells: Vec<Cell>, wrapped: bool) -> Self {
        Self {
            cells,
            wrapped,
            dirty: None,
            timestamp: 0,
        }
    }

    /// Get the number of columns in this line
    pub fn cols(&self) -> usize {
        self.cells.len()
    }

    pub fn cell(&self, col: usize) -> Option<&Cell> {
        self.cells.get(col)
    }

    pub fn cell_mut(&mut self, col: usize) -> Option<&mut Cell> {
        self.cells.get_mut(col)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// Consume the line, returning its cells
    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }

    /// Check if this line soft-wraps into the next
    pub fn is_wrapped(&self) -> bool {
        self.wrapped
    }

    pub fn set_wrapped(&mut self, wrapped: bool) {
        self.wrapped = wrapped;
    }

    /// Columns changed since the last `clear_dirty`
    pub fn dirty_range(&self) -> Option<Range<usize>> {
        self.dirty.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = None;
    }

    /// Sequence number of the last mutation
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Record a change to `cols` at time `now`
    pub fn touch(&mut self, cols: Range<usize>, now: u64) {
        let cols = cols.start.min(self.cells.len())..cols.end.min(self.cells.len());
        self.dirty = Some(match self.dirty.take() {
            Some(d) => d.start.min(cols.start)..d.end.max(cols.end),
            None => cols,
        });
        self.timestamp = now;
    }

    /// Record a change to the whole line
    pub fn touch_all(&mut self, now: u64) {
        self.touch(0..self.cells.len(), now);
    }

    /// Resize to a new number of columns without rewrapping
    pub fn resize(&mut self, cols: usize, bg: Color) {
        if cols < self.cells.len() {
            self.cells.truncate(cols);
            // Never leave the left half of a wide char dangling
            if let Some(last) = self.cells.last_mut() {
                if last.is_wide() {
                    last.erase(bg);
                }
            }
        } else {
            self.cells.resize_with(cols, || Cell::blank(bg));
        }
        if let Some(d) = &mut self.dirty {
            d.end = d.end.min(cols);
            d.start = d.start.min(d.end);
        }
    }

    /// Clear all cells with a background color
    pub fn clear(&mut self, bg: Color) {
        for cell in &mut self.cells {
            cell.erase(bg);
        }
        self.wrapped = false;
    }

    /// Clear cells from the given column to the end of the line
    pub fn clear_from(&mut self, col: usize, bg: Color) {
        self.split_wide_at(col, bg);
        for cell in self.cells.iter_mut().skip(col) {
            cell.erase(bg);
        }
        self.wrapped = false;
    }

    /// Clear cells from the start of the line to the given column (inclusive)
    pub fn clear_to(&mut self, col: usize, bg: Color) {
        self.split_wide_at(col + 1, bg);
        for cell in self.cells.iter_mut().take(col + 1) {
            cell.erase(bg);
        }
    }

    /// Insert blank cells at the given column, shifting existing cells right.
    /// Cells that shift past the end are lost.
    pub fn insert_cells(&mut self, col: usize, count: usize, bg: Color) {
        let len = self.cells.len();
        if col >= len {
            return;
        }
        self.split_wide_at(col, bg);
        let count = count.min(len - col);
        self.cells[col..].rotate_right(count);
        for cell in &mut self.cells[col..col + count] {
            cell.erase(bg);
        }
        // A wide char pushed against the margin loses its right half
        if let Some(last) = self.cells.last_mut() {
            if last.is_wide() {
                last.erase(bg);
            }
        }
        self.wrapped = false;
    }

    /// Delete cells at the given column, shifting remaining cells left.
    /// New cells at the end are blank.
    pub fn delete_cells(&mut self, col: usize, count: usize, bg: Color) {
        let len = self.cells.len();
        if col >= len {
            return;
        }
        let count = count.min(len - col);
        self.split_wide_at(col, bg);
        self.split_wide_at(col + count, bg);
        self.cells[col..].rotate_left(count);
        for cell in &mut self.cells[len - count..] {
            cell.erase(bg);
        }
        self.wrapped = false;
    }

    /// Erase `count` characters starting at the given column (ECH)
    pub fn erase_cells(&mut self, col: usize, count: usize, bg: Color) {
        let end = col.saturating_add(count).min(self.cells.len());
        if col >= end {
            return;
        }
        self.split_wide_at(col, bg);
        self.split_wide_at(end, bg);
        for cell in &mut self.cells[col..end] {
            cell.erase(bg);
        }
    }

    /// If `col` falls on the right half of a wide character, blank both
    /// halves so an edit at `col` never leaves half a glyph behind.
    pub fn split_wide_at(&mut self, col: usize, bg: Color) {
        if col == 0 || col >= self.cells.len() {
            return;
        }
        if self.cells[col].is_wide_continuation() && self.cells[col - 1].is_wide() {
            self.cells[col - 1].erase(bg);
            self.cells[col].erase(bg);
        }
    }

    /// Number of columns up to and including the last non-blank cell
    pub fn content_len(&self) -> usize {
        self.cells
            .iter()
            .rposition(|c| !c.is_blank())
            .map_or(0, |i| i + 1)
    }

    /// Get the text content of this line, trailing blanks trimmed
    pub fn text(&self) -> String {
        let mut result = String::new();
        for cell in &self.cells {
            if cell.is_wide_continuation() {
                continue;
            }
            if cell.content.is_empty() {
                result.push(' ');
            } else {
                result.push_str(&cell.content);
            }
        }
        result.truncate(result.trim_end().len());
        result
    }

    /// Check if every cell is blank
    pub fn is_blank(&self) -> bool {
        self.content_len() == 0
    }

    /// Approximate memory footprint, used for history budgeting
    pub fn approx_bytes(&self) -> usize {
        std::mem::size_of::<Line>() + self.cells.iter().map(Cell::approx_bytes).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alphabet(cols: usize) -> Line {
        let mut line = Line::new(cols);
        for i in 0..cols {
            line.cell_mut(i).unwrap().content = ((b'A' + i as u8) as char).to_string();
        }
        line
    }

    #[test]
    fn test_line_new() {
        let line = Line::new(80);
        assert_eq!(line.cols(), 80);
        assert!(!line.is_wrapped());
        assert!(line.is_blank());
        assert!(!line.is_dirty());
    }

    #[test]
    fn test_line_resize() {
        let mut line = Line::new(10);
        line.cell_mut(5).unwrap().content = "A".into();

        line.resize(20, Color::Default);
        assert_eq!(line.cols(), 20);
        assert_eq!(line.cell(5).unwrap().content, "A");

        line.resize(5, Color::Default);
        assert_eq!(line.cols(), 5);
        assert!(line.is_blank());
    }

    #[test]
    fn test_line_clear_from_and_to() {
        let mut line = alphabet(10);
        line.clear_from(5, Color::Default);
        assert_eq!(line.text(), "ABCDE");

        let mut line = alphabet(10);
        line.clear_to(4, Color::Default);
        assert_eq!(line.text(), "     FGHIJ");
    }

    #[test]
    fn test_line_insert_cells() {
        let mut line = alphabet(10);
        line.insert_cells(2, 3, Color::Default);
        assert_eq!(line.text(), "AB   CDEFG");
    }

    #[test]
    fn test_line_delete_cells() {
        let mut line = alphabet(10);
        line.delete_cells(2, 3, Color::Default);
        assert_eq!(line.text(), "ABFGHIJ");
        assert_eq!(line.cols(), 10);
    }

    #[test]
    fn test_line_erase_cells() {
        let mut line = alphabet(10);
        line.erase_cells(8, 100, Color::Default);
        assert_eq!(line.text(), "ABCDEFGH");
    }

    #[test]
    fn test_split_wide_char() {
        let mut line = Line::new(4);
        line.cell_mut(1).unwrap().content = "中".into();
        line.cell_mut(1).unwrap().width = 2;
        line.cell_mut(2).unwrap().width = 0;

        line.erase_cells(2, 1, Color::Default);
        assert!(line.cell(1).unwrap().is_empty());
        assert_eq!(line.cell(1).unwrap().width, 1);
        assert_eq!(line.cell(2).unwrap().width, 1);
    }

    #[test]
    fn test_touch_merges_ranges() {
        let mut line = Line::new(10);
        line.touch(2..4, 7);
        line.touch(6..8, 9);
        assert_eq!(line.dirty_range(), Some(2..8));
        assert_eq!(line.timestamp(), 9);
        line.clear_dirty();
        assert!(!line.is_dirty());
        assert_eq!(line.timestamp(), 9);
    }

    #[test]
    fn test_content_len_ignores_trailing_blanks() {
        let mut line = Line::new(10);
        line.cell_mut(3).unwrap().content = "x".into();
        assert_eq!(line.content_len(), 4);
        assert_eq!(line.text(), "   x");
    }
}
