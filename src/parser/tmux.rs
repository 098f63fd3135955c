//! tmux control mode
//!
//! After `DCS 1000 p` tmux speaks a line protocol until it sends `%exit` or
//! the string terminator. Each complete line becomes a `TmuxEvent::Line`;
//! interpreting the protocol is left to the host.

use super::hook::{DcsHook, HookStep};
use super::token::{TmuxEvent, Token, TokenKind};

#[derive(Debug)]
pub struct TmuxHook {
    id: String,
    /// Bytes of a line not yet terminated by `\n`
    partial: Vec<u8>,
}

impl TmuxHook {
    pub fn new(n: u64) -> Self {
        Self {
            id: format!("tmux-{n}"),
            partial: Vec::new(),
        }
    }

    /// Returns the line and its raw length, which spans earlier feeds
    fn take_line(&mut self) -> (String, usize) {
        let mut line = std::mem::take(&mut self.partial);
        let raw_len = line.len();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        (String::from_utf8_lossy(&line).into_owned(), raw_len)
    }
}

fn event(event: TmuxEvent, raw_len: usize) -> Token {
    Token::new(TokenKind::Tmux(event), raw_len)
}

impl DcsHook for TmuxHook {
    fn identifier(&self) -> &str {
        &self.id
    }

    fn feed(&mut self, bytes: &[u8]) -> HookStep {
        let mut tokens = Vec::new();
        let mut line_start = 0;
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => {
                    self.partial.extend_from_slice(&bytes[line_start..i]);
                    let (line, len) = self.take_line();
                    let raw_len = len + 1;
                    line_start = i + 1;
                    if line == "%exit" {
                        tokens.push(event(TmuxEvent::Exit, raw_len));
                        return HookStep::Done {
                            consumed: i + 1,
                            tokens,
                        };
                    }
                    tokens.push(event(TmuxEvent::Line(line), raw_len));
                }
                0x18 | 0x1A => {
                    return HookStep::Cancelled {
                        consumed: i + 1,
                        tokens,
                    };
                }
                0x1B => match bytes.get(i + 1) {
                    None => {
                        // Hold the ESC back until we know what follows
                        self.partial.extend_from_slice(&bytes[line_start..i]);
                        return HookStep::More { consumed: i, tokens };
                    }
                    Some(b'\\') => {
                        self.partial.extend_from_slice(&bytes[line_start..i]);
                        if !self.partial.is_empty() {
                            let (line, raw_len) = self.take_line();
                            tokens.push(event(TmuxEvent::Line(line), raw_len));
                        }
                        tokens.push(event(TmuxEvent::Exit, 2));
                        return HookStep::Done {
                            consumed: i + 2,
                            tokens,
                        };
                    }
                    Some(b'P') => {
                        // A new DCS while hooked is a protocol violation
                        self.partial.clear();
                        return HookStep::Cancelled { consumed: i, tokens };
                    }
                    Some(_) => {}
                },
                _ => {}
            }
            i += 1;
        }
        self.partial.extend_from_slice(&bytes[line_start..]);
        HookStep::More {
            consumed: bytes.len(),
            tokens,
        }
    }

    fn cancel(&mut self) -> Vec<Token> {
        self.partial.clear();
        vec![event(TmuxEvent::Exit, 0)]
    }
}
