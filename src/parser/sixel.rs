//! Sixel graphics (`DCS Pa;Pb;Ph q ... ST`)
//!
//! The payload is collected and handed over whole; decoding the image is
//! the host's job. Data past `max_dcs_len` is dropped but still consumed.

use super::hook::{find_terminator, DcsHook, HookStep, Terminator};
use super::token::{DcsCommand, Token, TokenKind};
use super::Encoding;

#[derive(Debug)]
pub struct SixelHook {
    id: String,
    params: Vec<u32>,
    data: Vec<u8>,
    encoding: Encoding,
    max_len: usize,
    /// Bytes seen so far, including dropped ones
    raw_len: usize,
}

impl SixelHook {
    pub fn new(n: u64, params: Vec<u32>, encoding: Encoding, max_len: usize) -> Self {
        Self {
            id: format!("sixel-{n}"),
            params,
            data: Vec::new(),
            encoding,
            max_len,
            raw_len: 0,
        }
    }

    fn accept(&mut self, bytes: &[u8]) {
        self.raw_len += bytes.len();
        let room = self.max_len.saturating_sub(self.data.len());
        if bytes.len() > room {
            tracing::debug!(hook = %self.id, dropped = bytes.len() - room, "sixel data over limit");
        }
        self.data.extend_from_slice(&bytes[..bytes.len().min(room)]);
    }

    fn image(&mut self, terminator_len: usize) -> Vec<Token> {
        let kind = TokenKind::Dcs(DcsCommand::Sixel {
            params: std::mem::take(&mut self.params),
            data: std::mem::take(&mut self.data),
        });
        vec![Token::new(kind, self.raw_len + terminator_len)]
    }
}

impl DcsHook for SixelHook {
    fn identifier(&self) -> &str {
        &self.id
    }

    fn feed(&mut self, bytes: &[u8]) -> HookStep {
        match find_terminator(bytes, self.encoding) {
            Terminator::Found { at, len } => {
                self.accept(&bytes[..at]);
                HookStep::Done {
                    consumed: at + len,
                    tokens: self.image(len),
                }
            }
            Terminator::Escape { at } => {
                self.accept(&bytes[..at]);
                HookStep::Done {
                    consumed: at,
                    tokens: self.image(0),
                }
            }
            Terminator::Cancel { at } => HookStep::Cancelled {
                consumed: at + 1,
                tokens: Vec::new(),
            },
            Terminator::Pending { at } => {
                self.accept(&bytes[..at]);
                HookStep::More {
                    consumed: at,
                    tokens: Vec::new(),
                }
            }
            Terminator::None => {
                self.accept(bytes);
                HookStep::More {
                    consumed: bytes.len(),
                    tokens: Vec::new(),
                }
            }
        }
    }

    fn cancel(&mut self) -> Vec<Token> {
        self.data.clear();
        Vec::new()
    }
}
