//! Screen model implementation
//!
//! The screen owns both grids, the cursor, scroll region, tab stops, mode
//! flags, history and marks. Token execution lives in `execute`; this file
//! holds the state and the primitive operations those handlers are built
//! from. Every primitive leaves the cursor inside the grid.

use std::collections::HashMap;

use unicode_width::UnicodeWidthChar;

use super::cell::{Attributes, Color, Hyperlink};
use super::charset::CharsetState;
use super::cursor::{Cursor, SavedCursor};
use super::grid::Grid;
use super::history::{AbsLine, LineBuffer};
use super::line::Line;
use super::marks::{MarkId, MarkStore};
use super::modes::Modes;
use super::reflow::{reflow, CursorPos};
use super::side_effect::{DynamicColor, SideEffect, SideEffectQueue};
use crate::config::TerminalConfig;
use crate::error::HistoryError;

/// Deepest the title stack (`CSI 22 t`) may grow
pub(super) const TITLE_STACK_LIMIT: usize = 10;

/// The main screen structure
#[derive(Debug, Clone)]
pub struct Screen {
    pub(super) primary: Grid,
    pub(super) alternate: Grid,
    pub(super) on_alternate: bool,
    pub(super) cursor: Cursor,
    /// DECSC slot of each screen
    pub(super) saved_primary: SavedCursor,
    pub(super) saved_alternate: SavedCursor,
    /// Scroll region, 0-indexed and inclusive
    pub(super) scroll_top: usize,
    pub(super) scroll_bottom: usize,
    pub(super) tab_stops: Vec<bool>,
    pub(super) tab_width: usize,
    pub(super) modes: Modes,
    /// DEC modes saved by `CSI ? Pm s`
    pub(super) saved_dec_modes: HashMap<u16, bool>,
    pub(super) charsets: CharsetState,
    pub(super) history: LineBuffer,
    pub(super) marks: MarkStore,
    /// OSC 8 registry; a cell's `hyperlink_id` is `hyperlink_base` plus
    /// its index + 1
    pub(super) hyperlinks: Vec<Hyperlink>,
    /// Ids handed out before the last RIS; cells still holding them resolve
    /// to nothing
    pub(super) hyperlink_base: u32,
    pub(super) palette: Vec<(u8, u8, u8)>,
    /// Overrides set through OSC 10/11/12
    pub(super) dynamic_colors: [Option<(u8, u8, u8)>; 3],
    pub(super) title: String,
    pub(super) icon_title: String,
    pub(super) title_stack: Vec<(String, String)>,
    pub(super) working_directory: Option<String>,
    pub(super) remote_host: Option<String>,
    pub(super) synchronized: bool,
    /// Last graphic character printed, for REP
    pub(super) last_printed: Option<char>,
    /// Tokens applied so far; also the timestamp stamped on touched lines
    pub(super) seq: u64,
    /// `seq` at the last `flush_dirty`
    pub(super) flushed_seq: u64,
    pub(super) effects: SideEffectQueue,
    pub(super) clear_scrollback_on_ed3: bool,
    /// Prompt mark of the command currently running
    pub(super) open_prompt: Option<MarkId>,
}

impl Screen {
    pub fn new(config: &TerminalConfig) -> Self {
        let (cols, rows) = (config.cols.max(1), config.rows.max(1));
        let tab_width = config.tab_width.max(1);
        Self {
            primary: Grid::new(cols, rows),
            alternate: Grid::new(cols, rows),
            on_alternate: false,
            cursor: Cursor::new(),
            saved_primary: SavedCursor::default(),
            saved_alternate: SavedCursor::default(),
            scroll_top: 0,
            scroll_bottom: rows - 1,
            tab_stops: default_tab_stops(cols, tab_width),
            tab_width,
            modes: Modes::new(),
            saved_dec_modes: HashMap::new(),
            charsets: CharsetState::new(),
            history: LineBuffer::new(config.scrollback_lines, config.scrollback_bytes),
            marks: MarkStore::new(),
            hyperlinks: Vec::new(),
            hyperlink_base: 0,
            palette: default_palette(),
            dynamic_colors: [None; 3],
            title: String::new(),
            icon_title: String::new(),
            title_stack: Vec::new(),
            working_directory: None,
            remote_host: None,
            synchronized: false,
            last_printed: None,
            seq: 0,
            flushed_seq: 0,
            effects: SideEffectQueue::new(),
            clear_scrollback_on_ed3: config.clear_scrollback_on_ed3,
            open_prompt: None,
        }
    }

    pub fn cols(&self) -> usize {
        self.primary.cols()
    }

    pub fn rows(&self) -> usize {
        self.primary.rows()
    }

    /// The grid currently shown
    pub fn grid(&self) -> &Grid {
        if self.on_alternate {
            &self.alternate
        } else {
            &self.primary
        }
    }

    pub(super) fn grid_mut(&mut self) -> &mut Grid {
        if self.on_alternate {
            &mut self.alternate
        } else {
            &mut self.primary
        }
    }

    pub fn primary_grid(&self) -> &Grid {
        &self.primary
    }

    pub fn alternate_grid(&self) -> &Grid {
        &self.alternate
    }

    pub fn is_alternate(&self) -> bool {
        self.on_alternate
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Current SGR pen
    pub fn attributes(&self) -> &Attributes {
        &self.cursor.attrs
    }

    pub fn modes(&self) -> &Modes {
        &self.modes
    }

    /// Scroll region as (top, bottom), 0-indexed inclusive
    pub fn scroll_region(&self) -> (usize, usize) {
        (self.scroll_top, self.scroll_bottom)
    }

    pub fn tab_stops(&self) -> impl Iterator<Item = usize> + '_ {
        self.tab_stops
            .iter()
            .enumerate()
            .filter_map(|(col, &set)| set.then_some(col))
    }

    pub fn history(&self) -> &LineBuffer {
        &self.history
    }

    /// Change the scrollback budget, dropping the oldest lines (and marks
    /// that only covered them) if history is now over it
    pub fn set_history_budget(&mut self, max_lines: usize, max_bytes: usize) {
        if self.history.set_budget(max_lines, max_bytes) > 0 {
            self.marks.collect_garbage(self.history.first_position());
        }
    }

    pub fn marks(&self) -> &MarkStore {
        &self.marks
    }

    pub fn marks_mut(&mut self) -> &mut MarkStore {
        &mut self.marks
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn icon_title(&self) -> &str {
        &self.icon_title
    }

    pub fn working_directory(&self) -> Option<&str> {
        self.working_directory.as_deref()
    }

    pub fn remote_host(&self) -> Option<&str> {
        self.remote_host.as_deref()
    }

    /// Inside a synchronized update (DECSET 2026 or DCS = 1 s)
    pub fn is_synchronized(&self) -> bool {
        self.synchronized
    }

    pub fn hyperlink(&self, id: u32) -> Option<&Hyperlink> {
        let index = id.checked_sub(self.hyperlink_base.checked_add(1)?)?;
        self.hyperlinks.get(index as usize)
    }

    pub fn palette_color(&self, index: u8) -> (u8, u8, u8) {
        self.palette[index as usize]
    }

    pub fn dynamic_color(&self, which: DynamicColor) -> (u8, u8, u8) {
        self.dynamic_colors[dynamic_index(which)].unwrap_or(default_dynamic_color(which))
    }

    /// Number of tokens applied
    pub fn sequence(&self) -> u64 {
        self.seq
    }

    /// Side effects produced since the last drain, in order
    pub fn side_effects(&self) -> &[SideEffect] {
        self.effects.as_slice()
    }

    pub fn take_side_effects(&mut self) -> Vec<SideEffect> {
        self.effects.drain()
    }

    /// Visible text, one line per row
    pub fn text(&self) -> String {
        self.grid().text()
    }

    /// Absolute position of a visible row
    pub fn absolute_line_for_row(&self, row: usize) -> AbsLine {
        self.history.next_position() + row as AbsLine
    }

    /// Visible row holding an absolute position, if it is on screen
    pub fn row_for_absolute_line(&self, line: AbsLine) -> Option<usize> {
        let row = line.checked_sub(self.history.next_position())?;
        (row < self.rows() as u64).then_some(row as usize)
    }

    /// A line by absolute position, from history or the visible grid
    pub fn line_at_absolute(&self, line: AbsLine) -> Result<&Line, HistoryError> {
        match self.row_for_absolute_line(line) {
            Some(row) => self
                .grid()
                .line(row)
                .ok_or(HistoryError::NotYetAssigned { position: line }),
            None => self.history.line_at(line),
        }
    }

    /// Report rows touched since the last flush as one `RegionDirty`
    pub fn flush_dirty(&mut self) {
        let since = self.flushed_seq;
        let mut touched = self
            .grid()
            .lines()
            .iter()
            .enumerate()
            .filter(|(_, line)| line.timestamp() > since)
            .map(|(row, _)| row);
        if let Some(first_row) = touched.next() {
            let last_row = touched.last().unwrap_or(first_row);
            self.effects.push(SideEffect::RegionDirty { first_row, last_row });
        }
        self.flushed_seq = self.seq;
    }

    /// Forget per-line dirty column ranges (the renderer has caught up)
    pub fn clear_dirty(&mut self) {
        self.primary.clear_dirty();
        self.alternate.clear_dirty();
    }

    /// Advance the logical clock; called once per token
    pub(super) fn tick(&mut self) {
        self.seq += 1;
        self.primary.set_clock(self.seq);
        self.alternate.set_clock(self.seq);
    }

    pub(super) fn push(&mut self, effect: SideEffect) {
        self.effects.push(effect);
    }

    // Printing

    pub(super) fn print(&mut self, text: &str) {
        for c in text.chars() {
            self.print_char(c);
        }
    }

    pub(super) fn print_char(&mut self, c: char) {
        let c = if self.charsets.is_identity() {
            c
        } else {
            self.charsets.map(c)
        };
        let width = match c.width() {
            Some(0) => return self.combine(c),
            Some(w) => w,
            None => return,
        };
        let cols = self.cols();
        if width > cols {
            return;
        }

        if self.cursor.pending_wrap {
            if self.modes.autowrap {
                self.wrap_line();
            } else {
                self.cursor.pending_wrap = false;
            }
        }
        if width == 2 && self.cursor.col + 1 >= cols {
            if self.modes.autowrap {
                // The last column stays blank and the character wraps
                let (col, row, bg) = (self.cursor.col, self.cursor.row, self.cursor.attrs.bg);
                let now = self.seq;
                if let Some(line) = self.grid_mut().line_mut(row) {
                    line.erase_cells(col, 1, bg);
                    line.touch(col..col + 1, now);
                }
                self.wrap_line();
            } else {
                self.cursor.col = cols - 2;
            }
        }

        let (col, row) = (self.cursor.col, self.cursor.row);
        let attrs = self.cursor.attrs;
        let link = self.cursor.hyperlink_id;
        let insert = self.modes.insert;
        let now = self.seq;
        if let Some(line) = self.grid_mut().line_mut(row) {
            if insert {
                line.insert_cells(col, width, attrs.bg);
            }
            line.split_wide_at(col, attrs.bg);
            line.split_wide_at(col + width, attrs.bg);
            if let Some(cell) = line.cell_mut(col) {
                cell.content.clear();
                cell.content.push(c);
                cell.attrs = attrs;
                cell.hyperlink_id = link;
                cell.width = width as u8;
            }
            if width == 2 {
                if let Some(cell) = line.cell_mut(col + 1) {
                    cell.content.clear();
                    cell.attrs = attrs;
                    cell.hyperlink_id = link;
                    cell.width = 0;
                }
            }
            let end = if insert { cols } else { col + width };
            line.touch(col..end, now);
        }
        self.last_printed = Some(c);

        if col + width >= cols {
            self.cursor.col = cols - 1;
            self.cursor.pending_wrap = self.modes.autowrap;
        } else {
            self.cursor.col = col + width;
        }
    }

    /// Attach a zero-width character to the previously printed cell
    fn combine(&mut self, c: char) {
        let row = self.cursor.row;
        let mut col = if self.cursor.pending_wrap {
            self.cursor.col
        } else if self.cursor.col > 0 {
            self.cursor.col - 1
        } else {
            return;
        };
        let now = self.seq;
        let Some(line) = self.grid_mut().line_mut(row) else {
            return;
        };
        if col > 0 && line.cell(col).is_some_and(|cell| cell.is_wide_continuation()) {
            col -= 1;
        }
        if let Some(cell) = line.cell_mut(col) {
            if !cell.content.is_empty() {
                cell.content.push(c);
                line.touch(col..col + 1, now);
            }
        }
    }

    /// Soft wrap: mark the row as continuing and move to the next
    fn wrap_line(&mut self) {
        let row = self.cursor.row;
        if let Some(line) = self.grid_mut().line_mut(row) {
            line.set_wrapped(true);
        }
        self.cursor.carriage_return();
        self.index();
    }

    /// REP: repeat the last printed character
    pub(super) fn repeat(&mut self, count: usize) {
        if let Some(c) = self.last_printed {
            let count = count.min(self.cols() * self.rows());
            for _ in 0..count {
                self.print_char(c);
            }
        }
    }

    // Vertical movement and scrolling

    /// LF, VT and FF
    pub(super) fn linefeed(&mut self) {
        self.index();
        if self.modes.linefeed_newline {
            self.cursor.carriage_return();
        }
    }

    /// IND: down one row, scrolling at the bottom margin
    pub(super) fn index(&mut self) {
        if self.cursor.row == self.scroll_bottom {
            self.scroll_up(1);
        } else if self.cursor.row + 1 < self.rows() {
            self.cursor.row += 1;
        }
        self.cursor.pending_wrap = false;
    }

    /// RI: up one row, scrolling at the top margin
    pub(super) fn reverse_index(&mut self) {
        if self.cursor.row == self.scroll_top {
            self.scroll_down(1);
        } else if self.cursor.row > 0 {
            self.cursor.row -= 1;
        }
        self.cursor.pending_wrap = false;
    }

    /// NEL
    pub(super) fn next_line(&mut self) {
        self.cursor.carriage_return();
        self.index();
    }

    /// Scroll the region up. Lines leave into history only when the region
    /// is the whole primary screen.
    pub(super) fn scroll_up(&mut self, n: usize) {
        let (top, bottom) = (self.scroll_top, self.scroll_bottom);
        let bg = self.cursor.attrs.bg;
        let full = top == 0 && bottom + 1 == self.rows();
        let evicted = self.grid_mut().scroll_up(n, top, bottom, bg);
        if full && !self.on_alternate {
            self.push_history(evicted);
        }
    }

    pub(super) fn scroll_down(&mut self, n: usize) {
        let (top, bottom) = (self.scroll_top, self.scroll_bottom);
        let bg = self.cursor.attrs.bg;
        self.grid_mut().scroll_down(n, top, bottom, bg);
    }

    pub(super) fn push_history(&mut self, lines: Vec<Line>) {
        if lines.is_empty() {
            return;
        }
        for line in lines {
            self.history.append_line(line);
        }
        if self.history.drop_excess_if_over_budget() > 0 {
            let removed = self.marks.collect_garbage(self.history.first_position());
            if removed > 0 {
                tracing::trace!(removed, "marks collected after history trim");
            }
        }
    }

    /// Drop all scrollback (ED 3, OSC 1337 ClearScrollback)
    pub(super) fn clear_scrollback(&mut self) {
        self.history.clear();
        self.marks.collect_garbage(self.history.first_position());
        self.push(SideEffect::ScrollbackCleared);
    }

    /// DECSTBM with 1-based bounds, 0 meaning the screen edge. An empty or
    /// inverted region resets to the full screen.
    pub(super) fn set_scroll_region(&mut self, top: usize, bottom: usize) {
        let rows = self.rows();
        let top = top.max(1);
        let bottom = if bottom == 0 { rows } else { bottom.min(rows) };
        if top < bottom {
            self.scroll_top = top - 1;
            self.scroll_bottom = bottom - 1;
        } else {
            self.scroll_top = 0;
            self.scroll_bottom = rows - 1;
        }
        self.goto(0, 0);
    }

    // Cursor movement

    /// Absolute move; `row` is relative to the scroll region in origin mode
    pub(super) fn goto(&mut self, col: usize, row: usize) {
        let (cols, rows) = (self.cols(), self.rows());
        let row = if self.modes.origin {
            (self.scroll_top + row).min(self.scroll_bottom)
        } else {
            row
        };
        self.cursor.move_to(col, row, cols, rows);
    }

    pub(super) fn goto_row(&mut self, row: usize) {
        self.goto(self.cursor.col, row);
    }

    pub(super) fn goto_col(&mut self, col: usize) {
        let cols = self.cols();
        self.cursor.col = col.min(cols - 1);
        self.cursor.pending_wrap = false;
    }

    /// CUU: stops at the top margin when starting inside the region
    pub(super) fn cursor_up(&mut self, n: usize) {
        let limit = if self.cursor.row >= self.scroll_top {
            self.scroll_top
        } else {
            0
        };
        self.cursor.row = self.cursor.row.saturating_sub(n).max(limit);
        self.cursor.pending_wrap = false;
    }

    /// CUD: stops at the bottom margin when starting inside the region
    pub(super) fn cursor_down(&mut self, n: usize) {
        let limit = if self.cursor.row <= self.scroll_bottom {
            self.scroll_bottom
        } else {
            self.rows() - 1
        };
        self.cursor.row = self.cursor.row.saturating_add(n).min(limit);
        self.cursor.pending_wrap = false;
    }

    pub(super) fn cursor_forward(&mut self, n: usize) {
        let cols = self.cols();
        self.cursor.move_right(n, cols);
    }

    pub(super) fn cursor_backward(&mut self, n: usize) {
        self.cursor.move_left(n);
    }

    /// BS, with reverse wraparound onto a soft-wrapped previous row
    pub(super) fn backspace(&mut self) {
        if self.cursor.pending_wrap {
            self.cursor.pending_wrap = false;
            return;
        }
        if self.cursor.col > 0 {
            self.cursor.col -= 1;
        } else if self.modes.reverse_wraparound && self.cursor.row > 0 {
            let prev = self.cursor.row - 1;
            if self.grid().line(prev).is_some_and(Line::is_wrapped) {
                self.cursor.row = prev;
                self.cursor.col = self.cols() - 1;
            }
        }
    }

    // Tabs

    pub(super) fn tab_forward(&mut self, n: usize) {
        let last = self.cols() - 1;
        for _ in 0..n {
            let next = (self.cursor.col + 1..=last).find(|&c| self.tab_stops[c]);
            self.cursor.col = next.unwrap_or(last);
        }
        self.cursor.pending_wrap = false;
    }

    pub(super) fn tab_backward(&mut self, n: usize) {
        for _ in 0..n {
            let prev = (0..self.cursor.col).rev().find(|&c| self.tab_stops[c]);
            self.cursor.col = prev.unwrap_or(0);
        }
        self.cursor.pending_wrap = false;
    }

    pub(super) fn set_tab_stop(&mut self) {
        if let Some(stop) = self.tab_stops.get_mut(self.cursor.col) {
            *stop = true;
        }
    }

    /// TBC: 0 clears the stop at the cursor, 3 clears all
    pub(super) fn clear_tab_stops(&mut self, mode: u32) {
        match mode {
            0 => {
                if let Some(stop) = self.tab_stops.get_mut(self.cursor.col) {
                    *stop = false;
                }
            }
            3 | 5 => self.tab_stops.iter_mut().for_each(|s| *s = false),
            _ => {}
        }
    }

    // Erasing and editing

    /// ED
    pub(super) fn erase_display(&mut self, mode: u32) {
        let (col, row) = (self.cursor.col, self.cursor.row);
        let rows = self.rows();
        let bg = self.cursor.attrs.bg;
        let now = self.seq;
        match mode {
            0 => {
                if let Some(line) = self.grid_mut().line_mut(row) {
                    line.clear_from(col, bg);
                    line.touch_all(now);
                }
                self.grid_mut().clear_rows(row + 1, rows, bg);
            }
            1 => {
                self.grid_mut().clear_rows(0, row, bg);
                if let Some(line) = self.grid_mut().line_mut(row) {
                    line.clear_to(col, bg);
                    line.touch(0..col + 1, now);
                }
            }
            2 => self.grid_mut().clear(bg),
            3 => {
                if self.clear_scrollback_on_ed3 {
                    self.clear_scrollback();
                }
            }
            _ => tracing::debug!(mode, "unknown erase-in-display mode"),
        }
    }

    /// EL
    pub(super) fn erase_line(&mut self, mode: u32) {
        let (col, row) = (self.cursor.col, self.cursor.row);
        let bg = self.cursor.attrs.bg;
        let now = self.seq;
        let Some(line) = self.grid_mut().line_mut(row) else {
            return;
        };
        match mode {
            0 => line.clear_from(col, bg),
            1 => line.clear_to(col, bg),
            2 => line.clear(bg),
            _ => return,
        }
        line.touch_all(now);
    }

    /// ECH
    pub(super) fn erase_chars(&mut self, n: usize) {
        self.edit_line(|line, col, bg| line.erase_cells(col, n, bg));
    }

    /// ICH
    pub(super) fn insert_chars(&mut self, n: usize) {
        self.edit_line(|line, col, bg| line.insert_cells(col, n, bg));
    }

    /// DCH
    pub(super) fn delete_chars(&mut self, n: usize) {
        self.edit_line(|line, col, bg| line.delete_cells(col, n, bg));
    }

    fn edit_line<F>(&mut self, edit: F)
    where
        F: FnOnce(&mut Line, usize, Color),
    {
        let (col, row) = (self.cursor.col, self.cursor.row);
        let bg = self.cursor.attrs.bg;
        let now = self.seq;
        if let Some(line) = self.grid_mut().line_mut(row) {
            edit(line, col, bg);
            let end = line.cols();
            line.touch(col..end, now);
        }
        self.cursor.pending_wrap = false;
    }

    /// IL: only inside the scroll region
    pub(super) fn insert_lines(&mut self, n: usize) {
        let (row, top, bottom) = (self.cursor.row, self.scroll_top, self.scroll_bottom);
        if row < top || row > bottom {
            return;
        }
        let bg = self.cursor.attrs.bg;
        self.grid_mut().scroll_down(n, row, bottom, bg);
        self.cursor.carriage_return();
    }

    /// DL: only inside the scroll region; deleted lines are not kept
    pub(super) fn delete_lines(&mut self, n: usize) {
        let (row, top, bottom) = (self.cursor.row, self.scroll_top, self.scroll_bottom);
        if row < top || row > bottom {
            return;
        }
        let bg = self.cursor.attrs.bg;
        self.grid_mut().scroll_up(n, row, bottom, bg);
        self.cursor.carriage_return();
    }

    /// DECALN: fill with `E`, reset margins, home
    pub(super) fn screen_alignment(&mut self) {
        let now = self.seq;
        for row in 0..self.rows() {
            if let Some(line) = self.grid_mut().line_mut(row) {
                for cell in line.cells_mut() {
                    cell.erase(Color::Default);
                    cell.content.push('E');
                }
                line.set_wrapped(false);
                line.touch_all(now);
            }
        }
        self.scroll_top = 0;
        self.scroll_bottom = self.rows() - 1;
        self.cursor.move_to(0, 0, self.cols(), self.rows());
    }

    // Cursor save/restore and screens

    /// DECSC / SCOSC
    pub(super) fn save_cursor(&mut self) {
        let saved = SavedCursor {
            col: self.cursor.col,
            row: self.cursor.row,
            attrs: self.cursor.attrs,
            pending_wrap: self.cursor.pending_wrap,
            origin: self.modes.origin,
            autowrap: self.modes.autowrap,
            charsets: self.charsets.clone(),
        };
        if self.on_alternate {
            self.saved_alternate = saved;
        } else {
            self.saved_primary = saved;
        }
    }

    /// DECRC / SCORC
    pub(super) fn restore_cursor(&mut self) {
        let saved = if self.on_alternate {
            self.saved_alternate.clone()
        } else {
            self.saved_primary.clone()
        };
        self.cursor.attrs = saved.attrs;
        self.modes.origin = saved.origin;
        self.modes.autowrap = saved.autowrap;
        self.charsets = saved.charsets;
        self.cursor
            .move_to(saved.col, saved.row, self.cols(), self.rows());
        self.cursor.pending_wrap = saved.pending_wrap && saved.col + 1 >= self.cols();
    }

    pub(super) fn enter_alternate(&mut self, clear: bool) {
        if self.on_alternate {
            return;
        }
        self.on_alternate = true;
        if clear {
            self.alternate.clear(Color::Default);
        }
        let rows = self.rows();
        self.alternate.touch_rows(0, rows);
        self.push(SideEffect::AlternateScreen(true));
    }

    pub(super) fn exit_alternate(&mut self) {
        if !self.on_alternate {
            return;
        }
        self.on_alternate = false;
        let rows = self.rows();
        self.primary.touch_rows(0, rows);
        self.push(SideEffect::AlternateScreen(false));
    }

    /// DECSTR
    pub(super) fn soft_reset(&mut self) {
        self.cursor.visible = true;
        self.cursor.attrs.reset();
        self.cursor.pending_wrap = false;
        self.modes.insert = false;
        self.modes.origin = false;
        self.modes.autowrap = true;
        self.modes.cursor_keys_application = false;
        self.modes.keypad_application = false;
        self.modes.reverse_wraparound = false;
        self.charsets = CharsetState::new();
        self.scroll_top = 0;
        self.scroll_bottom = self.rows() - 1;
        self.saved_primary = SavedCursor::default();
        self.saved_alternate = SavedCursor::default();
    }

    /// RIS: everything but history and marks returns to power-on state
    pub(super) fn full_reset(&mut self) {
        self.exit_alternate();
        let (cols, rows) = (self.cols(), self.rows());
        self.primary.clear(Color::Default);
        self.alternate.clear(Color::Default);
        self.cursor = Cursor::new();
        self.saved_primary = SavedCursor::default();
        self.saved_alternate = SavedCursor::default();
        self.scroll_top = 0;
        self.scroll_bottom = rows - 1;
        self.tab_stops = default_tab_stops(cols, self.tab_width);
        let mouse_was_on = self.modes.mouse_mode != super::modes::MouseMode::None;
        self.modes = Modes::new();
        if mouse_was_on {
            self.push(SideEffect::MouseModeChanged {
                mode: self.modes.mouse_mode,
                encoding: self.modes.mouse_encoding,
            });
        }
        self.saved_dec_modes.clear();
        self.charsets = CharsetState::new();
        self.palette = default_palette();
        self.dynamic_colors = [None; 3];
        self.hyperlink_base = self
            .hyperlink_base
            .saturating_add(self.hyperlinks.len() as u32);
        self.hyperlinks.clear();
        self.title_stack.clear();
        self.synchronized = false;
        self.last_printed = None;
        self.open_prompt = None;
    }

    // Resize

    /// Resize both grids. The primary grid is reflowed; the alternate grid
    /// is truncated or padded.
    pub fn resize(&mut self, cols: usize, rows: usize) {
        let (cols, rows) = (cols.max(1), rows.max(1));
        if cols == self.cols() && rows == self.rows() {
            return;
        }
        tracing::debug!(cols, rows, "resizing screen");

        // The primary cursor is the live one unless the alternate is shown,
        // in which case the DECSC slot is what 1049 will restore
        let primary_cursor = if self.on_alternate {
            CursorPos {
                col: self.saved_primary.col,
                row: self.saved_primary.row,
                pending_wrap: self.saved_primary.pending_wrap,
            }
        } else {
            CursorPos {
                col: self.cursor.col,
                row: self.cursor.row,
                pending_wrap: self.cursor.pending_wrap,
            }
        };
        let reflowed = reflow(self.primary.take_lines(), cols, rows, primary_cursor);
        self.primary = Grid::from_lines(reflowed.lines, cols, rows);
        let evicted = reflowed.evicted;
        self.push_history(evicted);

        if self.on_alternate {
            self.saved_primary.col = reflowed.cursor.col;
            self.saved_primary.row = reflowed.cursor.row;
            self.saved_primary.pending_wrap = reflowed.cursor.pending_wrap;
            self.cursor.clamp(cols, rows);
        } else {
            self.cursor.col = reflowed.cursor.col;
            self.cursor.row = reflowed.cursor.row;
            self.cursor.pending_wrap = reflowed.cursor.pending_wrap;
        }
        self.alternate.resize(cols, rows);
        clamp_saved(&mut self.saved_alternate, cols, rows);

        let mut tab_stops = default_tab_stops(cols, self.tab_width);
        let keep = self.tab_stops.len().min(cols);
        tab_stops[..keep].copy_from_slice(&self.tab_stops[..keep]);
        self.tab_stops = tab_stops;
        self.scroll_top = 0;
        self.scroll_bottom = rows - 1;

        self.primary.set_clock(self.seq);
        self.alternate.set_clock(self.seq);
        self.primary.touch_rows(0, rows);
        self.alternate.touch_rows(0, rows);
    }
}

fn clamp_saved(saved: &mut SavedCursor, cols: usize, rows: usize) {
    if saved.col >= cols {
        saved.col = cols - 1;
        saved.pending_wrap = false;
    }
    saved.row = saved.row.min(rows - 1);
}

fn default_tab_stops(cols: usize, width: usize) -> Vec<bool> {
    (0..cols).map(|c| c > 0 && c % width == 0).collect()
}

pub(super) fn default_palette() -> Vec<(u8, u8, u8)> {
    (0..=255u8).map(Color::indexed_to_rgb).collect()
}

pub(super) fn dynamic_index(which: DynamicColor) -> usize {
    match which {
        DynamicColor::Foreground => 0,
        DynamicColor::Background => 1,
        DynamicColor::Cursor => 2,
    }
}

pub(super) fn default_dynamic_color(which: DynamicColor) -> (u8, u8, u8) {
    match which {
        DynamicColor::Foreground | DynamicColor::Cursor => (229, 229, 229),
        DynamicColor::Background => (0, 0, 0),
    }
}
