//! Terminal Cell
//!
//! A single cell in the grid: the glyph(s) drawn there plus the rendition
//! that was current when they were printed.

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

/// A single cell in the terminal grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// The character(s) in this cell. Empty for blanks and for the right
    /// half of a wide character; may hold combining marks after the base.
    pub content: String,
    /// Rendition
    pub attrs: Attributes,
    /// Hyperlink ID (0 = no hyperlink)
    pub hyperlink_id: u32,
    /// Columns occupied: 1 normally, 2 for the left half of a wide
    /// character, 0 for the right half
    pub width: u8,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            content: String::new(),
            attrs: Attributes::default(),
            hyperlink_id: 0,
            width: 1,
        }
    }
}

impl Cell {
    /// Create a new cell with a single character
    pub fn new(c: char) -> Self {
        Self {
            content: c.to_string(),
            ..Default::default()
        }
    }

    /// A blank cell that keeps only the given background (BCE erase)
    pub fn blank(bg: Color) -> Self {
        let mut cell = Self::default();
        cell.attrs.bg = bg;
        cell
    }

    /// Check if this cell has no glyph
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// True for a cell that draws nothing and carries no styling
    pub fn is_blank(&self) -> bool {
        self.content.is_empty() && self.width == 1 && self.attrs == Attributes::default()
    }

    /// Left half of a double-width character
    pub fn is_wide(&self) -> bool {
        self.width == 2
    }

    /// Right half of a double-width character
    pub fn is_wide_continuation(&self) -> bool {
        self.width == 0
    }

    /// Display width of the content as reported by unicode-width
    pub fn content_width(&self) -> usize {
        self.content.width()
    }

    /// Clear the cell but preserve background color (for erase operations)
    pub fn erase(&mut self, bg: Color) {
        self.content.clear();
        self.attrs = Attributes::default();
        self.attrs.bg = bg;
        self.hyperlink_id = 0;
        self.width = 1;
    }

    /// Approximate heap plus inline size, used for history budgeting
    pub fn approx_bytes(&self) -> usize {
        std::mem::size_of::<Cell>() + self.content.capacity()
    }
}

/// Color representation supporting indexed and RGB colors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    /// Default terminal color (foreground or background)
    #[default]
    Default,
    /// 256-color palette index (0-15 are the ANSI colors)
    Indexed(u8),
    /// 24-bit RGB color
    Rgb(u8, u8, u8),
}

impl Color {
    pub const BLACK: Color = Color::Indexed(0);
    pub const RED: Color = Color::Indexed(1);
    pub const GREEN: Color = Color::Indexed(2);
    pub const YELLOW: Color = Color::Indexed(3);
    pub const BLUE: Color = Color::Indexed(4);
    pub const MAGENTA: Color = Color::Indexed(5);
    pub const CYAN: Color = Color::Indexed(6);
    pub const WHITE: Color = Color::Indexed(7);

    /// Convert a 256-color index to RGB using the xterm palette
    pub fn indexed_to_rgb(index: u8) -> (u8, u8, u8) {
        match index {
            0 => (0, 0, 0),
            1 => (205, 0, 0),
            2 => (0, 205, 0),
            3 => (205, 205, 0),
            4 => (0, 0, 238),
            5 => (205, 0, 205),
            6 => (0, 205, 205),
            7 => (229, 229, 229),
            8 => (127, 127, 127),
            9 => (255, 0, 0),
            10 => (0, 255, 0),
            11 => (255, 255, 0),
            12 => (92, 92, 255),
            13 => (255, 0, 255),
            14 => (0, 255, 255),
            15 => (255, 255, 255),
            // 6x6x6 color cube
            16..=231 => {
                let n = index - 16;
                let to_rgb = |v: u8| if v == 0 { 0 } else { 55 + v * 40 };
                (to_rgb(n / 36), to_rgb((n % 36) / 6), to_rgb(n % 6))
            }
            // Grayscale ramp
            232..=255 => {
                let gray = 8 + (index - 232) * 10;
                (gray, gray, gray)
            }
        }
    }
}

/// Underline variants (SGR 4 and the `4:n` subparameter form)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnderlineStyle {
    #[default]
    None,
    Single,
    Double,
    Curly,
    Dotted,
    Dashed,
}

/// Text style flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Style {
    pub bold: bool,
    pub faint: bool,
    pub italic: bool,
    pub underline: UnderlineStyle,
    pub blink: bool,
    pub inverse: bool,
    pub hidden: bool,
    pub strikethrough: bool,
    pub overline: bool,
}

/// The "current attributes" record applied to newly printed cells
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attributes {
    pub fg: Color,
    pub bg: Color,
    /// Underline color (SGR 58); `None` follows the foreground
    pub underline_color: Option<Color>,
    pub style: Style,
}

impl Attributes {
    /// SGR 0
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Hyperlink registered through OSC 8
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hyperlink {
    pub id: u32,
    pub url: String,
    /// The `id=` parameter, used to join links split across lines
    pub params: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_default() {
        let cell = Cell::default();
        assert!(cell.is_empty());
        assert!(cell.is_blank());
        assert_eq!(cell.width, 1);
    }

    #[test]
    fn test_cell_erase_keeps_background() {
        let mut cell = Cell::new('A');
        cell.attrs.fg = Color::RED;
        cell.attrs.style.bold = true;
        cell.erase(Color::BLUE);
        assert!(cell.is_empty());
        assert_eq!(cell.attrs.fg, Color::Default);
        assert_eq!(cell.attrs.bg, Color::BLUE);
        assert!(!cell.attrs.style.bold);
        assert!(!cell.is_blank());
    }

    #[test]
    fn test_color_indexed_to_rgb() {
        assert_eq!(Color::indexed_to_rgb(0), (0, 0, 0));
        assert_eq!(Color::indexed_to_rgb(15), (255, 255, 255));
        assert_eq!(Color::indexed_to_rgb(16), (0, 0, 0));
        assert_eq!(Color::indexed_to_rgb(231), (255, 255, 255));
        assert_eq!(Color::indexed_to_rgb(232), (8, 8, 8));
        assert_eq!(Color::indexed_to_rgb(255), (238, 238, 238));
    }

    #[test]
    fn test_cell_content_width() {
        assert_eq!(Cell::new('A').content_width(), 1);
        assert_eq!(Cell::new('中').content_width(), 2);
    }
}
