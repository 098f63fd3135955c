//! Cursor state management
//!
//! The cursor tracks position, visibility, style and the pen used for newly
//! printed cells. DECSC/DECRC snapshots live in `SavedCursor`.

use serde::{Deserialize, Serialize};

use super::cell::Attributes;
use super::charset::CharsetState;

/// Cursor shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CursorShape {
    #[default]
    Block,
    Underline,
    Bar,
}

impl CursorShape {
    /// Decode a DECSCUSR parameter into shape and blink
    pub fn from_decscusr(ps: u32) -> (CursorShape, bool) {
        match ps {
            0 | 1 => (CursorShape::Block, true),
            2 => (CursorShape::Block, false),
            3 => (CursorShape::Underline, true),
            4 => (CursorShape::Underline, false),
            5 => (CursorShape::Bar, true),
            6 => (CursorShape::Bar, false),
            _ => (CursorShape::Block, true),
        }
    }

    /// Encode shape and blink back into a DECSCUSR parameter
    pub fn to_decscusr(self, blinking: bool) -> u32 {
        let base = match self {
            CursorShape::Block => 1,
            CursorShape::Underline => 3,
            CursorShape::Bar => 5,
        };
        if blinking {
            base
        } else {
            base + 1
        }
    }
}

/// Cursor state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Column position (0-indexed)
    pub col: usize,
    /// Row position (0-indexed)
    pub row: usize,
    /// Whether the cursor is visible (DECTCEM)
    pub visible: bool,
    pub shape: CursorShape,
    pub blinking: bool,
    /// The cursor sits past the last column; the next printable wraps first
    pub pending_wrap: bool,
    /// Attributes applied to new characters
    pub attrs: Attributes,
    /// Active OSC 8 hyperlink (0 = none)
    pub hyperlink_id: u32,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            col: 0,
            row: 0,
            visible: true,
            shape: CursorShape::Block,
            blinking: true,
            pending_wrap: false,
            attrs: Attributes::default(),
            hyperlink_id: 0,
        }
    }
}

/// Saved cursor state for DECSC/DECRC
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedCursor {
    pub col: usize,
    pub row: usize,
    pub attrs: Attributes,
    pub pending_wrap: bool,
    pub origin: bool,
    pub autowrap: bool,
    pub charsets: CharsetState,
}

/// What DECRC restores when nothing was saved: home, default rendition,
/// autowrap on
impl Default for SavedCursor {
    fn default() -> Self {
        Self {
            col: 0,
            row: 0,
            attrs: Attributes::default(),
            pending_wrap: false,
            origin: false,
            autowrap: true,
            charsets: CharsetState::default(),
        }
    }
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to an absolute position, clamping to the grid
    pub fn move_to(&mut self, col: usize, row: usize, cols: usize, rows: usize) {
        self.col = col.min(cols.saturating_sub(1));
        self.row = row.min(rows.saturating_sub(1));
        self.pending_wrap = false;
    }

    /// Move left by n columns, stopping at column 0
    pub fn move_left(&mut self, n: usize) {
        self.col = self.col.saturating_sub(n);
        self.pending_wrap = false;
    }

    /// Move right by n columns, stopping at the last column
    pub fn move_right(&mut self, n: usize, cols: usize) {
        self.col = self.col.saturating_add(n).min(cols.saturating_sub(1));
        self.pending_wrap = false;
    }

    pub fn carriage_return(&mut self) {
        self.col = 0;
        self.pending_wrap = false;
    }

    /// Keep the cursor inside a (possibly shrunk) grid
    pub fn clamp(&mut self, cols: usize, rows: usize) {
        if self.col >= cols {
            self.col = cols.saturating_sub(1);
            self.pending_wrap = false;
        }
        self.row = self.row.min(rows.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_default() {
        let cursor = Cursor::default();
        assert_eq!((cursor.col, cursor.row), (0, 0));
        assert!(cursor.visible);
        assert!(!cursor.pending_wrap);
    }

    #[test]
    fn test_cursor_move_to_clamps() {
        let mut cursor = Cursor::new();
        cursor.move_to(5, 10, 80, 24);
        assert_eq!((cursor.col, cursor.row), (5, 10));

        cursor.move_to(100, 50, 80, 24);
        assert_eq!((cursor.col, cursor.row), (79, 23));
    }

    #[test]
    fn test_cursor_horizontal_bounds() {
        let mut cursor = Cursor::new();
        cursor.move_left(100);
        assert_eq!(cursor.col, 0);
        cursor.move_right(usize::MAX, 80);
        assert_eq!(cursor.col, 79);
    }

    #[test]
    fn test_carriage_return_clears_pending_wrap() {
        let mut cursor = Cursor::new();
        cursor.move_to(79, 10, 80, 24);
        cursor.pending_wrap = true;
        cursor.carriage_return();
        assert_eq!((cursor.col, cursor.row), (0, 10));
        assert!(!cursor.pending_wrap);
    }

    #[test]
    fn test_decscusr_round_trip_values() {
        assert_eq!(CursorShape::from_decscusr(4), (CursorShape::Underline, false));
        assert_eq!(CursorShape::Bar.to_decscusr(true), 5);
        assert_eq!(CursorShape::from_decscusr(0), (CursorShape::Block, true));
    }
}
