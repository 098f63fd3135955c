//! Render snapshots
//!
//! A snapshot is an owned copy of what a renderer needs: the visible grid,
//! cursor, modes and titles. Hosts read snapshots instead of the live
//! screen so the mutation thread never waits on drawing. Given the same
//! byte stream, the terminal produces identical snapshots.

use serde::{Deserialize, Serialize};

use super::cell::{Attributes, Cell};
use super::cursor::Cursor;
use super::line::Line;
use super::modes::Modes;
use super::screen::Screen;

/// A copy of the visible terminal state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cols: usize,
    pub rows: usize,
    /// Visible rows, top to bottom
    pub lines: Vec<LineSnapshot>,
    pub cursor: Cursor,
    pub scroll_top: usize,
    pub scroll_bottom: usize,
    pub modes: Modes,
    pub title: String,
    pub icon_title: String,
    pub alternate_screen: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    /// Lines currently held in history
    pub history_lines: usize,
    /// Absolute position of the top visible row
    pub first_visible_line: u64,
    /// Tokens applied when the snapshot was taken
    pub sequence: u64,
}

/// One row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSnapshot {
    pub cells: Vec<CellSnapshot>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub wrapped: bool,
}

/// One cell. Default attributes and absent links are left out of JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub content: String,
    #[serde(default, skip_serializing_if = "is_default")]
    pub attrs: Attributes,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub hyperlink_id: u32,
    /// 0 for the right half of a wide character, otherwise 1 or 2
    pub width: u8,
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

fn is_default(attrs: &Attributes) -> bool {
    *attrs == Attributes::default()
}

impl From<&Cell> for CellSnapshot {
    fn from(cell: &Cell) -> Self {
        CellSnapshot {
            content: cell.content.clone(),
            attrs: cell.attrs,
            hyperlink_id: cell.hyperlink_id,
            width: cell.width,
        }
    }
}

impl From<&Line> for LineSnapshot {
    fn from(line: &Line) -> Self {
        LineSnapshot {
            cells: line.cells().iter().map(CellSnapshot::from).collect(),
            wrapped: line.is_wrapped(),
        }
    }
}

impl LineSnapshot {
    /// Row text with trailing blanks trimmed
    pub fn text(&self) -> String {
        let mut text = String::new();
        for cell in self.cells.iter().filter(|c| c.width > 0) {
            if cell.content.is_empty() {
                text.push(' ');
            } else {
                text.push_str(&cell.content);
            }
        }
        text.truncate(text.trim_end().len());
        text
    }
}

impl Snapshot {
    /// Capture the current screen state
    pub fn from_screen(screen: &Screen) -> Self {
        let (scroll_top, scroll_bottom) = screen.scroll_region();
        Snapshot {
            cols: screen.cols(),
            rows: screen.rows(),
            lines: screen.grid().lines().iter().map(LineSnapshot::from).collect(),
            cursor: screen.cursor().clone(),
            scroll_top,
            scroll_bottom,
            modes: screen.modes().clone(),
            title: screen.title().to_string(),
            icon_title: screen.icon_title().to_string(),
            alternate_screen: screen.is_alternate(),
            working_directory: screen.working_directory().map(str::to_string),
            history_lines: screen.history().len(),
            first_visible_line: screen.absolute_line_for_row(0),
            sequence: screen.sequence(),
        }
    }

    /// Visible text, one line per row
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(LineSnapshot::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerminalConfig;
    use crate::core::Color;

    #[test]
    fn test_snapshot_text_and_cursor() {
        let mut screen = Screen::new(&TerminalConfig::with_size(10, 3));
        screen.print("hi there");
        let snapshot = Snapshot::from_screen(&screen);
        assert_eq!(snapshot.text(), "hi there\n\n");
        assert_eq!(snapshot.cursor.col, 8);
        assert_eq!(snapshot.lines.len(), 3);
        assert_eq!(snapshot.lines[0].cells.len(), 10);
    }

    #[test]
    fn test_snapshot_json_round_trip() {
        let mut screen = Screen::new(&TerminalConfig::with_size(4, 2));
        screen.cursor.attrs.fg = Color::Rgb(1, 2, 3);
        screen.print("ab");
        let snapshot = Snapshot::from_screen(&screen);
        let json = snapshot.to_json().unwrap();
        assert_eq!(Snapshot::from_json(&json).unwrap(), snapshot);
    }

    #[test]
    fn test_default_cells_are_compact() {
        let cell = CellSnapshot::from(&Cell::new('x'));
        let json = serde_json::to_string(&cell).unwrap();
        assert_eq!(json, r#"{"content":"x","width":1}"#);
    }
}
