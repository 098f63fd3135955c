//! Resize reflow
//!
//! Soft-wrapped rows are joined back into logical lines, trailing blanks
//! are dropped, and the logical lines are wrapped again at the new width.
//! The cursor keeps its logical offset within its line. When the result
//! has more rows than fit, blank rows below the cursor go first, then rows
//! from the top are evicted (the caller moves them into history).

use super::cell::{Cell, Color};
use super::line::Line;

/// Cursor position carried through a reflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CursorPos {
    pub col: usize,
    pub row: usize,
    pub pending_wrap: bool,
}

#[derive(Debug)]
pub(crate) struct Reflowed {
    /// Exactly `rows` lines of exactly `cols` cells
    pub lines: Vec<Line>,
    /// Rows pushed off the top, oldest first
    pub evicted: Vec<Line>,
    pub cursor: CursorPos,
}

pub(crate) fn reflow(lines: Vec<Line>, cols: usize, rows: usize, cursor: CursorPos) -> Reflowed {
    let cols = cols.max(1);
    let (logical, cursor_at) = join(lines, cursor);

    let mut out: Vec<Line> = Vec::new();
    let mut new_cursor = CursorPos {
        col: 0,
        row: 0,
        pending_wrap: false,
    };
    for (index, mut cells) in logical.into_iter().enumerate() {
        let cursor_offset = cursor_at.filter(|&(line, _)| line == index).map(|(_, off)| off);
        let keep = content_len(&cells).max(cursor_offset.map_or(0, |off| off + 1));
        cells.truncate(keep);
        cells.resize_with(keep, || Cell::blank(Color::Default));

        let first_row = out.len();
        let (wrapped, positions) = wrap(cells, cols);
        if let Some(off) = cursor_offset {
            let (r, c) = positions.get(off).copied().unwrap_or((0, 0));
            new_cursor = place_cursor(first_row + r, c, cols, cursor.pending_wrap);
        }
        out.extend(wrapped);
    }

    // Blank rows below the cursor are dropped before anything is evicted
    while out.len() > rows && out.len() - 1 > new_cursor.row {
        match out.last() {
            Some(last) if last.is_blank() => {
                out.pop();
                if let Some(prev) = out.last_mut() {
                    prev.set_wrapped(false);
                }
            }
            _ => break,
        }
    }

    let excess = out.len().saturating_sub(rows);
    let from_top = excess.min(new_cursor.row);
    let evicted: Vec<Line> = out.drain(..from_top).collect();
    new_cursor.row -= from_top;
    // Whatever still does not fit goes from the bottom
    if out.len() > rows {
        out.truncate(rows);
        if let Some(last) = out.last_mut() {
            last.set_wrapped(false);
        }
    }
    out.resize_with(rows, || Line::new(cols));
    new_cursor.row = new_cursor.row.min(rows.saturating_sub(1));

    Reflowed {
        lines: out,
        evicted,
        cursor: new_cursor,
    }
}

/// Join soft-wrapped rows. Returns the logical lines and the cursor's
/// (logical line, cell offset).
fn join(lines: Vec<Line>, cursor: CursorPos) -> (Vec<Vec<Cell>>, Option<(usize, usize)>) {
    let mut logical = Vec::new();
    let mut current: Vec<Cell> = Vec::new();
    let mut cursor_at = None;
    for (row, line) in lines.into_iter().enumerate() {
        let wrapped = line.is_wrapped();
        if row == cursor.row {
            cursor_at = Some((logical.len(), current.len() + cursor.col));
        }
        current.extend(line.into_cells());
        if !wrapped {
            logical.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        logical.push(current);
    }
    (logical, cursor_at)
}

fn content_len(cells: &[Cell]) -> usize {
    cells.iter().rposition(|c| !c.is_blank()).map_or(0, |i| i + 1)
}

/// Wrap one logical line at `cols`. Also returns, for every input cell,
/// the (row, col) it landed on.
fn wrap(cells: Vec<Cell>, cols: usize) -> (Vec<Line>, Vec<(usize, usize)>) {
    let mut rows: Vec<Line> = Vec::new();
    let mut positions = Vec::with_capacity(cells.len());
    let mut row: Vec<Cell> = Vec::with_capacity(cols);

    let mut iter = cells.into_iter().peekable();
    while let Some(cell) = iter.next() {
        if cell.is_wide_continuation() {
            // Orphaned right half; its left half was lost earlier
            positions.push((rows.len(), row.len().min(cols - 1)));
            continue;
        }
        if cell.is_wide() {
            let continuation = iter.next_if(Cell::is_wide_continuation);
            if cols < 2 {
                positions.push((rows.len(), row.len()));
                positions.extend(continuation.map(|_| (rows.len(), row.len())));
                push_cell(&mut rows, &mut row, Cell::blank(Color::Default), cols);
                continue;
            }
            if row.len() + 2 > cols {
                row.resize_with(cols, || Cell::blank(Color::Default));
                rows.push(Line::from_cells(std::mem::take(&mut row), true));
            }
            positions.push((rows.len(), row.len()));
            row.push(cell);
            let right = match continuation {
                Some(right) => {
                    positions.push((rows.len(), row.len()));
                    right
                }
                None => Cell {
                    width: 0,
                    ..Cell::default()
                },
            };
            row.push(right);
            continue;
        }
        if row.len() == cols {
            rows.push(Line::from_cells(std::mem::take(&mut row), true));
        }
        positions.push((rows.len(), row.len()));
        row.push(cell);
    }
    row.resize_with(cols, || Cell::blank(Color::Default));
    rows.push(Line::from_cells(row, false));
    (rows, positions)
}

fn push_cell(rows: &mut Vec<Line>, row: &mut Vec<Cell>, cell: Cell, cols: usize) {
    if row.len() == cols {
        rows.push(Line::from_cells(std::mem::take(row), true));
    }
    row.push(cell);
}

fn place_cursor(row: usize, col: usize, cols: usize, pending_wrap: bool) -> CursorPos {
    if !pending_wrap {
        return CursorPos {
            col,
            row,
            pending_wrap: false,
        };
    }
    // The cursor sat just past its cell; keep it there if the row has room
    if col + 1 < cols {
        CursorPos {
            col: col + 1,
            row,
            pending_wrap: false,
        }
    } else {
        CursorPos {
            col: cols - 1,
            row,
            pending_wrap: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(text: &str, cols: usize, wrapped: bool) -> Line {
        let mut cells: Vec<Cell> = text.chars().map(Cell::new).collect();
        cells.resize_with(cols, Cell::default);
        Line::from_cells(cells, wrapped)
    }

    fn texts(lines: &[Line]) -> Vec<String> {
        lines.iter().map(Line::text).collect()
    }

    fn at(col: usize, row: usize) -> CursorPos {
        CursorPos {
            col,
            row,
            pending_wrap: false,
        }
    }

    #[test]
    fn test_widen_joins_wrapped_rows() {
        let lines = vec![row("abcdefghij", 10, true), row("KL", 10, false), row("", 10, false)];
        let out = reflow(lines, 20, 3, at(2, 1));
        assert_eq!(texts(&out.lines), vec!["abcdefghijKL", "", ""]);
        assert_eq!(out.cursor, at(12, 0));
        assert!(!out.lines[0].is_wrapped());
        assert!(out.lines.iter().all(|l| l.cols() == 20));
    }

    #[test]
    fn test_narrow_rewraps() {
        let lines = vec![row("abcdefghij", 10, false), row("", 10, false)];
        let out = reflow(lines, 4, 4, at(0, 1));
        assert_eq!(texts(&out.lines), vec!["abcd", "efgh", "ij", ""]);
        assert!(out.lines[0].is_wrapped());
        assert!(out.lines[1].is_wrapped());
        assert!(!out.lines[2].is_wrapped());
        assert_eq!(out.cursor, at(0, 3));
    }

    #[test]
    fn test_overflow_evicts_from_top() {
        let lines = vec![row("abcdefgh", 8, false), row("xy", 8, false)];
        let out = reflow(lines, 4, 2, at(2, 1));
        assert_eq!(texts(&out.evicted), vec!["abcd"]);
        assert_eq!(texts(&out.lines), vec!["efgh", "xy"]);
        assert_eq!(out.cursor, at(2, 1));
    }

    #[test]
    fn test_blank_rows_below_cursor_dropped_first() {
        let lines = vec![row("top", 5, false), row("", 5, false), row("", 5, false)];
        let out = reflow(lines, 5, 1, at(3, 0));
        assert!(out.evicted.is_empty());
        assert_eq!(texts(&out.lines), vec!["top"]);
    }

    #[test]
    fn test_wide_char_not_split() {
        let mut cells: Vec<Cell> = "abc".chars().map(Cell::new).collect();
        let mut wide = Cell::new('漢');
        wide.width = 2;
        cells.push(wide);
        cells.push(Cell {
            width: 0,
            ..Cell::default()
        });
        cells.resize_with(6, Cell::default);
        let lines = vec![Line::from_cells(cells, false)];
        let out = reflow(lines, 4, 2, at(0, 0));
        assert_eq!(texts(&out.lines), vec!["abc", "漢"]);
        assert!(out.lines[1].cell(0).is_some_and(Cell::is_wide));
        assert!(out.lines[1].cell(1).is_some_and(Cell::is_wide_continuation));
    }

    #[test]
    fn test_pending_wrap_kept_at_margin() {
        let lines = vec![row("abcde", 5, false)];
        let cursor = CursorPos {
            col: 4,
            row: 0,
            pending_wrap: true,
        };
        let out = reflow(lines.clone(), 5, 1, cursor);
        assert_eq!(out.cursor, cursor);
        let out = reflow(lines, 8, 1, cursor);
        assert_eq!(out.cursor, at(5, 0));
    }
}
