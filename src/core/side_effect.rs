//! Side effects for the UI layer
//!
//! The screen never calls into UI objects. Everything the host must react
//! to is appended to an ordered queue, which the host drains and executes
//! in order.

use serde::{Deserialize, Serialize};

use super::cursor::CursorShape;
use super::history::AbsLine;
use super::modes::{MouseEncoding, MouseMode};

/// Which clipboard an OSC 52 request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClipboardTarget {
    Clipboard,
    Primary,
    Selection,
}

/// A clipboard operation requested by the application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClipboardOp {
    /// Replace the clipboard contents with decoded bytes
    Set(Vec<u8>),
    /// The application asked to read the clipboard
    Query,
    /// Clear it
    Clear,
}

/// Dynamic colors addressable by OSC 10/11/12
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DynamicColor {
    Foreground,
    Background,
    Cursor,
}

/// One notification for the UI, in the order it was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SideEffect {
    Bell,
    TitleChanged(String),
    IconTitleChanged(String),
    /// Bytes to send back to the child (DSR, DA and similar replies)
    WriteToHost(Vec<u8>),
    /// Palette entry changed; `None` means the whole palette was reset
    PaletteChanged(Option<u8>),
    /// Dynamic color set or, with `None`, reset to default
    DynamicColorChanged {
        which: DynamicColor,
        rgb: Option<(u8, u8, u8)>,
    },
    Clipboard {
        target: ClipboardTarget,
        op: ClipboardOp,
    },
    /// Desktop notification (OSC 9 / OSC 777)
    Notification { title: Option<String>, body: String },
    WorkingDirectoryChanged(String),
    HostChanged(String),
    /// Shell integration: a prompt started at this absolute line
    PromptMarked(AbsLine),
    /// Shell integration: a command finished
    CommandFinished { exit_code: Option<i32> },
    AlternateScreen(bool),
    MouseModeChanged {
        mode: MouseMode,
        encoding: MouseEncoding,
    },
    CursorStyleChanged { shape: CursorShape, blinking: bool },
    SynchronizedUpdate(bool),
    /// Rows of the visible grid changed since the last report
    RegionDirty { first_row: usize, last_row: usize },
    TmuxLine(String),
    TmuxExit,
    SixelImage { params: Vec<u32>, data: Vec<u8> },
    /// The application asked for a new size (CSI 8 t)
    ResizeRequested { cols: usize, rows: usize },
    StealFocus,
    ScrollbackCleared,
}

/// Ordered queue of side effects
#[derive(Debug, Clone, Default)]
pub struct SideEffectQueue {
    effects: Vec<SideEffect>,
}

impl SideEffectQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, effect: SideEffect) {
        tracing::trace!(?effect, "side effect");
        self.effects.push(effect);
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Peek without draining
    pub fn as_slice(&self) -> &[SideEffect] {
        &self.effects
    }

    /// Swap the queue out, leaving it empty
    pub fn drain(&mut self) -> Vec<SideEffect> {
        std::mem::take(&mut self.effects)
    }
}
