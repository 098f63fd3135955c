//! Terminal Core Module
//!
//! Platform-independent terminal state. This module contains:
//! - Screen model (primary and alternate grids) and token execution
//! - Cell representation with attributes
//! - Cursor state, modes and character sets
//! - Scrollback history with absolute line positions, and marks
//! - The ordered side-effect queue and render snapshots
//!
//! The core is deterministic: given the same token sequence it always
//! produces the same state.

mod cell;
mod charset;
mod cursor;
mod execute;
mod grid;
mod history;
mod line;
mod marks;
mod modes;
mod reflow;
mod screen;
mod side_effect;
mod snapshot;

pub use cell::{Attributes, Cell, Color, Hyperlink, Style, UnderlineStyle};
pub use charset::{Charset, CharsetState};
pub use cursor::{Cursor, CursorShape, SavedCursor};
pub use execute::{apply_sgr, sgr_string};
pub use grid::Grid;
pub use history::{AbsLine, LineBuffer};
pub use line::Line;
pub use marks::{Mark, MarkId, MarkKind, MarkStore};
pub use modes::{Modes, MouseEncoding, MouseMode};
pub use screen::Screen;
pub use side_effect::{ClipboardOp, ClipboardTarget, DynamicColor, SideEffect, SideEffectQueue};
pub use snapshot::{CellSnapshot, LineSnapshot, Snapshot};
