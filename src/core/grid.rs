//! Terminal Grid
//!
//! A 2D grid of lines representing the visible terminal area. The grid only
//! knows rows and columns; history and cursor live in the screen.

use serde::{Deserialize, Serialize};

use super::cell::{Cell, Color};
use super::line::Line;

/// The terminal grid: exactly `rows` lines of exactly `cols` cells
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    lines: Vec<Line>,
    cols: usize,
    rows: usize,
    /// Timestamp stamped onto lines this grid mutates
    #[serde(skip)]
    clock: u64,
}

impl Grid {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            lines: (0..rows).map(|_| Line::new(cols)).collect(),
            cols,
            rows,
            clock: 0,
        }
    }

    /// Build a grid from already sized lines (reflow output)
    pub(crate) fn from_lines(lines: Vec<Line>, cols: usize, rows: usize) -> Self {
        let mut grid = Self {
            lines,
            cols,
            rows,
            clock: 0,
        };
        for line in &mut grid.lines {
            line.resize(cols, Color::Default);
        }
        grid.lines.resize_with(rows, || Line::new(cols));
        grid
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Set the timestamp used for subsequent mutations
    pub fn set_clock(&mut self, now: u64) {
        self.clock = now;
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Get a reference to a cell
    pub fn cell(&self, col: usize, row: usize) -> Option<&Cell> {
        self.lines.get(row).and_then(|l| l.cell(col))
    }

    /// Get a reference to a line
    pub fn line(&self, row: usize) -> Option<&Line> {
        self.lines.get(row)
    }

    /// Get a mutable reference to a line. The caller is responsible for
    /// calling `Line::touch` on what it changes.
    pub fn line_mut(&mut self, row: usize) -> Option<&mut Line> {
        self.lines.get_mut(row)
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Take all lines out, leaving the grid empty until `from_lines`
    pub(crate) fn take_lines(&mut self) -> Vec<Line> {
        std::mem::take(&mut self.lines)
    }

    /// Truncate or extend without rewrapping
    pub fn resize(&mut self, cols: usize, rows: usize) {
        for line in &mut self.lines {
            line.resize(cols, Color::Default);
        }
        self.lines.resize_with(rows, || Line::new(cols));
        self.cols = cols;
        self.rows = rows;
        self.touch_rows(0, rows);
    }

    /// Erase every line with a background color
    pub fn clear(&mut self, bg: Color) {
        for line in &mut self.lines {
            line.clear(bg);
        }
        self.touch_rows(0, self.rows);
    }

    /// Erase rows `start..end`
    pub fn clear_rows(&mut self, start: usize, end: usize, bg: Color) {
        let end = end.min(self.rows);
        for line in self.lines.iter_mut().take(end).skip(start) {
            line.clear(bg);
        }
        self.touch_rows(start, end);
    }

    /// Scroll rows `top..=bottom` up by `n`. Lines leaving the top are
    /// returned so the caller can move them into history.
    pub fn scroll_up(&mut self, n: usize, top: usize, bottom: usize, bg: Color) -> Vec<Line> {
        if top > bottom || bottom >= self.rows {
            return Vec::new();
        }
        let n = n.min(bottom - top + 1);
        let evicted: Vec<Line> = self
            .lines
            .splice(top..top + n, std::iter::empty())
            .collect();
        let fresh = (0..n).map(|_| Line::blank(self.cols, bg));
        let at = bottom + 1 - n;
        self.lines.splice(at..at, fresh);
        self.touch_rows(top, bottom + 1);
        evicted
    }

    /// Scroll rows `top..=bottom` down by `n`; lines leaving the bottom are lost
    pub fn scroll_down(&mut self, n: usize, top: usize, bottom: usize, bg: Color) {
        if top > bottom || bottom >= self.rows {
            return;
        }
        let n = n.min(bottom - top + 1);
        self.lines.drain(bottom + 1 - n..=bottom);
        let fresh = (0..n).map(|_| Line::blank(self.cols, bg));
        self.lines.splice(top..top, fresh);
        self.touch_rows(top, bottom + 1);
    }

    /// Mark rows `start..end` as changed
    pub fn touch_rows(&mut self, start: usize, end: usize) {
        let now = self.clock;
        for line in self.lines.iter_mut().take(end).skip(start) {
            line.touch_all(now);
        }
    }

    /// Clear dirty ranges on all lines
    pub fn clear_dirty(&mut self) {
        for line in &mut self.lines {
            line.clear_dirty();
        }
    }

    /// Text of every row, joined with newlines
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(Line::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
