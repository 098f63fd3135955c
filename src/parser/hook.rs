//! DCS hooks
//!
//! While a hook is installed every byte goes to it instead of the normal
//! dispatch. A hook reports how much it consumed and whether it is finished;
//! consuming nothing means it needs more input.

use std::fmt;

use super::token::Token;
use super::{is_string_terminator, Encoding};

/// Outcome of feeding bytes to a hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookStep {
    /// Still hooked
    More { consumed: usize, tokens: Vec<Token> },
    /// Finished; normal parsing resumes after `consumed` bytes
    Done { consumed: usize, tokens: Vec<Token> },
    /// Aborted; `tokens` (complete before the abort) come first, then the
    /// parser collects `cancel()` and resumes after `consumed`
    Cancelled { consumed: usize, tokens: Vec<Token> },
}

/// A stateful consumer of a long-running DCS
pub trait DcsHook: fmt::Debug + Send {
    /// Unique per parser instance
    fn identifier(&self) -> &str;

    fn feed(&mut self, bytes: &[u8]) -> HookStep;

    /// Tokens to emit when the hook is aborted
    fn cancel(&mut self) -> Vec<Token> {
        Vec::new()
    }
}

/// Where a string terminator was found in a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Terminator {
    /// Terminator starts at `at` and spans `len` bytes
    Found { at: usize, len: usize },
    /// CAN or SUB at `at`
    Cancel { at: usize },
    /// ESC followed by something other than `\` at `at`; the ESC is not
    /// part of the string
    Escape { at: usize },
    /// The chunk ends with a lone ESC at `at`
    Pending { at: usize },
    None,
}

/// Find the end of a DCS/SOS/PM/APC string. BEL is not a terminator here.
pub(crate) fn find_terminator(bytes: &[u8], encoding: Encoding) -> Terminator {
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            0x18 | 0x1A => return Terminator::Cancel { at: i },
            0x1B => {
                return match bytes.get(i + 1) {
                    None => Terminator::Pending { at: i },
                    Some(b'\\') => Terminator::Found { at: i, len: 2 },
                    Some(_) => Terminator::Escape { at: i },
                }
            }
            b if is_string_terminator(b, encoding) => return Terminator::Found { at: i, len: 1 },
            _ => {}
        }
    }
    Terminator::None
}

/// Outcome of scanning a string body against its length cap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StringEnd {
    /// The string ends within the cap
    Terminated(Terminator),
    /// More than `max_len` payload bytes with no end among them
    Overflow,
    /// Neither yet
    NeedMore,
}

/// Look for the end of a string body whose payload may hold at most
/// `max_len` bytes. The answer depends only on the first `max_len + 2`
/// bytes, never on how many more happen to be buffered.
pub(crate) fn scan_string(body: &[u8], encoding: Encoding, max_len: usize) -> StringEnd {
    // Room for a two-byte terminator right after a full payload
    let window = &body[..body.len().min(max_len.saturating_add(2))];
    match find_terminator(window, encoding) {
        Terminator::None if window.len() > max_len => StringEnd::Overflow,
        Terminator::None => StringEnd::NeedMore,
        Terminator::Found { at, .. }
        | Terminator::Cancel { at }
        | Terminator::Escape { at }
        | Terminator::Pending { at }
            if at > max_len =>
        {
            StringEnd::Overflow
        }
        Terminator::Pending { .. } => StringEnd::NeedMore,
        found => StringEnd::Terminated(found),
    }
}

/// Swallows an oversized string without keeping it, then emits a stand-in
#[derive(Debug)]
pub(crate) struct DiscardHook {
    id: String,
    token: Option<Token>,
    encoding: Encoding,
    /// OSC also ends at BEL
    bel_terminates: bool,
}

impl DiscardHook {
    pub(crate) fn new(n: u64, token: Token, encoding: Encoding) -> Self {
        let bel_terminates = matches!(token.kind, super::TokenKind::Osc(_));
        Self {
            id: format!("discard-{n}"),
            token: Some(token),
            encoding,
            bel_terminates,
        }
    }

    fn emit(&mut self) -> Vec<Token> {
        self.token.take().into_iter().collect()
    }
}

impl DcsHook for DiscardHook {
    fn identifier(&self) -> &str {
        &self.id
    }

    fn feed(&mut self, bytes: &[u8]) -> HookStep {
        let bel = if self.bel_terminates {
            bytes.iter().position(|&b| b == 0x07)
        } else {
            None
        };
        let terminator = find_terminator(bytes, self.encoding);
        let string_end = match terminator {
            Terminator::Found { at, .. }
            | Terminator::Cancel { at }
            | Terminator::Escape { at }
            | Terminator::Pending { at } => Some(at),
            Terminator::None => None,
        };
        if let Some(b) = bel {
            if string_end.map_or(true, |end| b < end) {
                return HookStep::Done {
                    consumed: b + 1,
                    tokens: self.emit(),
                };
            }
        }
        match terminator {
            Terminator::Found { at, len } => HookStep::Done {
                consumed: at + len,
                tokens: self.emit(),
            },
            Terminator::Cancel { at } => HookStep::Cancelled {
                consumed: at + 1,
                tokens: Vec::new(),
            },
            Terminator::Escape { at } => HookStep::Done {
                consumed: at,
                tokens: self.emit(),
            },
            Terminator::Pending { at } => HookStep::More {
                consumed: at,
                tokens: Vec::new(),
            },
            Terminator::None => HookStep::More {
                consumed: bytes.len(),
                tokens: Vec::new(),
            },
        }
    }

    fn cancel(&mut self) -> Vec<Token> {
        self.token = None;
        Vec::new()
    }
}
