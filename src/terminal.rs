//! Terminal Executor
//!
//! Ties together the byte buffer, the dispatch parser and the screen.
//! Bytes go in through `put_stream_data`; `process_pending` turns whatever
//! can be decoded into tokens and applies them in order.

use crate::buffer::ByteStreamBuffer;
use crate::config::TerminalConfig;
use crate::core::{Screen, SideEffect, Snapshot};
use crate::parser::{Encoding, Parser, Token};

/// Buffer, parser and screen driven from one thread
#[derive(Debug)]
pub struct Terminal {
    buffer: ByteStreamBuffer,
    parser: Parser,
    screen: Screen,
    /// Reused between batches
    tokens: Vec<Token>,
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new(&TerminalConfig::default())
    }
}

impl Terminal {
    pub fn new(config: &TerminalConfig) -> Self {
        Self {
            buffer: ByteStreamBuffer::with_compact_threshold(config.compact_threshold),
            parser: Parser::new(config),
            screen: Screen::new(config),
            tokens: Vec::new(),
        }
    }

    /// Create a terminal of the given size with default settings
    pub fn with_size(cols: usize, rows: usize) -> Self {
        Self::new(&TerminalConfig::with_size(cols, rows))
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    /// Bytes received but not yet decoded
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Queue bytes from the child without parsing them
    pub fn put_stream_data(&mut self, bytes: &[u8]) {
        self.buffer.append(bytes);
    }

    /// Decode every complete token from the queued bytes into `out`.
    /// Returns the number of tokens added.
    pub fn drain_tokens(&mut self, out: &mut Vec<Token>) -> usize {
        self.parser.parse(&mut self.buffer, out)
    }

    /// Decode and apply everything decodable, then report dirty rows
    pub fn process_pending(&mut self) -> usize {
        let mut tokens = std::mem::take(&mut self.tokens);
        tokens.clear();
        let count = self.parser.parse(&mut self.buffer, &mut tokens);
        self.screen.apply_all(&tokens);
        self.tokens = tokens;
        if count > 0 {
            tracing::trace!(count, pending = self.buffer.len(), "applied tokens");
            self.screen.flush_dirty();
        }
        count
    }

    /// Append and process in one step
    pub fn process(&mut self, bytes: &[u8]) -> usize {
        self.put_stream_data(bytes);
        self.process_pending()
    }

    pub fn resize(&mut self, cols: usize, rows: usize) {
        self.screen.resize(cols, rows);
        self.screen.flush_dirty();
    }

    pub fn encoding(&self) -> Encoding {
        self.parser.encoding()
    }

    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.parser.set_encoding(encoding);
    }

    /// Drop buffered bytes and in-flight parser state (including any hook)
    /// together. The grid is left alone.
    pub fn reset_session(&mut self) {
        tracing::debug!(
            discarded = self.buffer.len(),
            hooked = self.parser.is_hooked(),
            "session reset"
        );
        self.buffer.reset();
        self.parser.reset();
    }

    pub fn take_side_effects(&mut self) -> Vec<SideEffect> {
        self.screen.take_side_effects()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_screen(&self.screen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Color;

    #[test]
    fn test_terminal_print() {
        let mut term = Terminal::with_size(80, 24);
        term.process(b"Hello, World!");
        assert!(term.snapshot().text().starts_with("Hello, World!"));
    }

    #[test]
    fn test_terminal_cursor_movement() {
        let mut term = Terminal::with_size(80, 24);
        term.process(b"\x1b[10;5HX");
        assert_eq!(term.screen().cursor().row, 9);
        assert_eq!(term.screen().cursor().col, 5);
    }

    #[test]
    fn test_terminal_colors() {
        let mut term = Terminal::with_size(80, 24);
        term.process(b"\x1b[31;44mColored");
        assert_eq!(term.screen().attributes().fg, Color::RED);
        assert_eq!(term.screen().attributes().bg, Color::BLUE);
    }

    #[test]
    fn test_split_sequence_across_chunks() {
        let mut term = Terminal::with_size(20, 3);
        assert_eq!(term.process(b"ab\x1b["), 1);
        assert_eq!(term.pending_bytes(), 2);
        term.process(b"31mc");
        assert_eq!(term.snapshot().text(), "abc\n\n");
        assert_eq!(term.screen().grid().cell(2, 0).map(|c| c.attrs.fg), Some(Color::RED));
        assert_eq!(term.pending_bytes(), 0);
    }

    #[test]
    fn test_split_utf8_across_chunks() {
        let mut term = Terminal::with_size(20, 3);
        let bytes = "é".as_bytes();
        term.process(&bytes[..1]);
        term.process(&bytes[1..]);
        assert_eq!(term.snapshot().text(), "é\n\n");
    }

    #[test]
    fn test_drain_tokens_does_not_execute() {
        let mut term = Terminal::with_size(20, 3);
        term.put_stream_data(b"hi\r\n");
        let mut tokens = Vec::new();
        assert_eq!(term.drain_tokens(&mut tokens), 3);
        assert_eq!(term.snapshot().text(), "\n\n");
    }

    #[test]
    fn test_reset_session_discards_partial_sequence() {
        let mut term = Terminal::with_size(20, 3);
        term.process(b"keep\x1b]0;unterminated");
        term.reset_session();
        term.process(b"!");
        assert_eq!(term.snapshot().text(), "keep!\n\n");
        assert_eq!(term.screen().title(), "");
    }

    #[test]
    fn test_reset_session_unhooks_tmux() {
        let mut term = Terminal::with_size(20, 3);
        term.process(b"\x1bP1000p%begin\n");
        assert!(term.parser().is_hooked());
        term.reset_session();
        assert!(!term.parser().is_hooked());
        term.process(b"x");
        assert_eq!(term.snapshot().text(), "x\n\n");
    }

    #[test]
    fn test_region_dirty_after_batch() {
        let mut term = Terminal::with_size(10, 5);
        term.take_side_effects();
        term.process(b"\x1b[3;1Hx\r\ny");
        assert_eq!(
            term.take_side_effects(),
            vec![SideEffect::RegionDirty {
                first_row: 2,
                last_row: 3
            }]
        );
    }

    #[test]
    fn test_encoding_switch_by_escape() {
        let mut term = Terminal::with_size(10, 2);
        term.process(b"\x1b%@");
        assert_eq!(term.encoding(), Encoding::Latin1);
        term.process(b"\xe9");
        assert_eq!(term.snapshot().text(), "é\n");
        term.process(b"\x1b%G");
        assert_eq!(term.encoding(), Encoding::Utf8);
    }

    #[test]
    fn test_terminal_title() {
        let mut term = Terminal::with_size(80, 24);
        term.process(b"\x1b]0;My Terminal Title\x07");
        assert_eq!(term.screen().title(), "My Terminal Title");
        assert!(term
            .take_side_effects()
            .contains(&SideEffect::TitleChanged("My Terminal Title".into())));
    }
}
