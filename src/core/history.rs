//! Line storage for scrollback
//!
//! Lines evicted from the top of the primary grid are appended here. Every
//! line gets an absolute position (`total_dropped + index`) when it arrives;
//! dropping old lines to stay within budget advances `total_dropped` so the
//! positions of surviving lines never change.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::line::Line;
use crate::error::HistoryError;

/// Absolute line position. Monotonic across the lifetime of a screen.
pub type AbsLine = u64;

/// Memory-bounded, append-only store of off-screen lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineBuffer {
    lines: VecDeque<Line>,
    /// Lines ever removed from the front
    total_dropped: u64,
    /// Approximate bytes held by `lines`
    bytes: usize,
    max_lines: usize,
    /// 0 = no byte limit
    max_bytes: usize,
}

impl LineBuffer {
    /// Create a buffer keeping at most `max_lines` lines and roughly
    /// `max_bytes` bytes (0 disables the byte limit)
    pub fn new(max_lines: usize, max_bytes: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(max_lines.min(1000)),
            total_dropped: 0,
            bytes: 0,
            max_lines,
            max_bytes,
        }
    }

    /// Store an evicted line, returning its absolute position
    pub fn append_line(&mut self, mut line: Line) -> AbsLine {
        let position = self.next_position();
        line.clear_dirty();
        self.bytes += line.approx_bytes();
        self.lines.push_back(line);
        position
    }

    /// Retrieve a line by absolute position
    pub fn line_at(&self, position: AbsLine) -> Result<&Line, HistoryError> {
        if position < self.total_dropped {
            return Err(HistoryError::NotFound { position });
        }
        self.index_of(position)
            .and_then(|i| self.lines.get(i))
            .ok_or(HistoryError::NotYetAssigned { position })
    }

    /// Drop the oldest lines until the buffer is within budget. Returns the
    /// number of lines dropped.
    pub fn drop_excess_if_over_budget(&mut self) -> usize {
        let mut dropped = 0;
        while self.over_budget() {
            let Some(line) = self.lines.pop_front() else {
                break;
            };
            self.bytes = self.bytes.saturating_sub(line.approx_bytes());
            dropped += 1;
        }
        if dropped > 0 {
            self.total_dropped += dropped as u64;
            tracing::trace!(dropped, total_dropped = self.total_dropped, "history trimmed");
        }
        dropped
    }

    fn over_budget(&self) -> bool {
        self.lines.len() > self.max_lines || (self.max_bytes > 0 && self.bytes > self.max_bytes)
    }

    /// Position of the oldest retained line
    pub fn first_position(&self) -> AbsLine {
        self.total_dropped
    }

    /// Position the next appended line will receive
    pub fn next_position(&self) -> AbsLine {
        self.total_dropped + self.lines.len() as u64
    }

    pub fn total_dropped(&self) -> u64 {
        self.total_dropped
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Approximate bytes held
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// Relative index of an absolute position, if retained
    pub fn index_of(&self, position: AbsLine) -> Option<usize> {
        position
            .checked_sub(self.total_dropped)
            .map(|i| i as usize)
            .filter(|&i| i < self.lines.len())
    }

    /// Absolute position of a relative index
    pub fn position_of(&self, index: usize) -> AbsLine {
        self.total_dropped + index as u64
    }

    /// Change the budget and trim to it
    pub fn set_budget(&mut self, max_lines: usize, max_bytes: usize) -> usize {
        self.max_lines = max_lines;
        self.max_bytes = max_bytes;
        self.drop_excess_if_over_budget()
    }

    /// Drop every line. Positions keep counting from where they were.
    pub fn clear(&mut self) {
        self.total_dropped += self.lines.len() as u64;
        self.lines.clear();
        self.bytes = 0;
    }

    /// Iterate retained lines oldest first, with their positions
    pub fn iter(&self) -> impl Iterator<Item = (AbsLine, &Line)> {
        let base = self.total_dropped;
        self.lines
            .iter()
            .enumerate()
            .map(move |(i, line)| (base + i as u64, line))
    }
}
