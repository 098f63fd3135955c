//! Terminal Parser Module
//!
//! Streaming VT100/xterm parser. A front controller peeks at the next one or
//! two bytes and hands the position to the sub-parser that owns it. Each
//! sub-parser either decodes one complete token or reports that more bytes
//! are needed, in which case parsing stops for this call so ordering is kept.
//!
//! Multi-chunk DCS payloads (tmux control mode, sixel, oversized strings)
//! are routed to a stateful hook until it finishes.
//!
//! Reference: <https://vt100.net/emu/dec_ansi_parser> and the xterm
//! control sequence documentation.

mod ansi;
mod control;
mod csi;
mod dcs;
pub mod hook;
mod osc;
mod other;
mod params;
mod sixel;
mod text;
pub mod token;
mod tmux;

use serde::{Deserialize, Serialize};

pub use hook::{DcsHook, HookStep};
pub use sixel::SixelHook;
pub use tmux::TmuxHook;
pub use token::{
    ColorSpec, ControlCode, CsiCommand, DcsCommand, EscCommand, ITermCommand, OscCommand,
    SgrAttribute, ShellMark, StringKind, TmuxEvent, Token, TokenKind,
};

use crate::buffer::ByteStreamBuffer;
use crate::config::{ParserLimits, TerminalConfig};
use hook::DiscardHook;

/// Byte encoding of the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// UTF-8; bytes 0x80-0xFF are always text
    #[default]
    Utf8,
    /// ISO-8859-1; 0x80-0x9F are C1 controls
    Latin1,
}

/// Cursor over the unparsed bytes for one `Parser::parse` call
#[derive(Debug, Clone)]
pub struct ParserContext<'a> {
    bytes: &'a [u8],
    /// Offset of the next undecoded byte
    pub position: usize,
    pub encoding: Encoding,
    pub limits: ParserLimits,
}

impl<'a> ParserContext<'a> {
    pub fn new(bytes: &'a [u8], encoding: Encoding, limits: ParserLimits) -> Self {
        Self {
            bytes,
            position: 0,
            encoding,
            limits,
        }
    }

    /// Bytes not decoded yet
    pub fn rest(&self) -> &'a [u8] {
        &self.bytes[self.position..]
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    fn advance(&mut self, n: usize) {
        self.position = (self.position + n).min(self.bytes.len());
    }
}

/// Hooks a DCS introducer can install
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HookRequest {
    Tmux,
    Sixel { params: Vec<u32> },
    /// Skip an oversized string up to its terminator, then emit `token`
    Discard { token: Token },
}

/// Result of one sub-parser invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Decoded {
    Complete {
        token: Token,
        consumed: usize,
        /// C0 controls found inside the sequence, executed before `token`
        incidentals: Vec<Token>,
    },
    /// `consumed` bytes start a sequence handled by a hook from now on
    Hook {
        request: HookRequest,
        token: Option<Token>,
        consumed: usize,
    },
    NeedMore,
}

impl Decoded {
    pub(crate) fn complete(token: Token) -> Self {
        let consumed = token.raw_len;
        Decoded::Complete {
            token,
            consumed,
            incidentals: Vec::new(),
        }
    }
}

/// The dispatch parser
#[derive(Debug)]
pub struct Parser {
    encoding: Encoding,
    limits: ParserLimits,
    hook: Option<Box<dyn DcsHook>>,
    hooks_created: u64,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(&TerminalConfig::default())
    }
}

impl Parser {
    pub fn new(config: &TerminalConfig) -> Self {
        Self {
            encoding: config.encoding,
            limits: config.limits,
            hook: None,
            hooks_created: 0,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.encoding = encoding;
    }

    pub fn is_hooked(&self) -> bool {
        self.hook.is_some()
    }

    /// Identifier of the active hook, unique per parser
    pub fn hook_identifier(&self) -> Option<&str> {
        self.hook.as_deref().map(|h| h.identifier())
    }

    /// Drop the active hook without emitting anything. Returns whether a
    /// hook was active.
    pub fn force_unhook(&mut self) -> bool {
        match self.hook.take() {
            Some(hook) => {
                tracing::debug!(hook = hook.identifier(), "forced unhook");
                true
            }
            None => false,
        }
    }

    /// Forget all in-flight state. Encoding is configuration and is kept.
    pub fn reset(&mut self) {
        self.hook = None;
    }

    /// Decode every token derivable from the buffer's unconsumed bytes,
    /// append them to `out` and mark their bytes consumed. Returns the
    /// number of tokens added.
    pub fn parse(&mut self, buffer: &mut ByteStreamBuffer, out: &mut Vec<Token>) -> usize {
        let before = out.len();
        let mut ctx = ParserContext::new(buffer.unconsumed(), self.encoding, self.limits);

        while ctx.remaining() > 0 {
            if let Some(hook) = self.hook.as_mut() {
                match hook.feed(ctx.rest()) {
                    HookStep::More { consumed, tokens } => {
                        out.extend(tokens);
                        if consumed == 0 {
                            break;
                        }
                        ctx.advance(consumed);
                    }
                    HookStep::Done { consumed, tokens } => {
                        out.extend(tokens);
                        tracing::trace!(hook = hook.identifier(), "unhooked");
                        self.hook = None;
                        ctx.advance(consumed);
                    }
                    HookStep::Cancelled { consumed, tokens } => {
                        tracing::debug!(hook = hook.identifier(), "hook cancelled");
                        out.extend(tokens);
                        out.extend(hook.cancel());
                        self.hook = None;
                        ctx.advance(consumed);
                    }
                }
                continue;
            }

            match dispatch(&ctx) {
                Decoded::NeedMore => break,
                Decoded::Complete {
                    token,
                    consumed,
                    incidentals,
                } => {
                    out.extend(incidentals);
                    self.observe(&token);
                    ctx.encoding = self.encoding;
                    out.push(token);
                    // Sub-parsers always consume; guard the loop regardless
                    ctx.advance(consumed.max(1));
                }
                Decoded::Hook {
                    request,
                    token,
                    consumed,
                } => {
                    out.extend(token);
                    self.install_hook(request);
                    ctx.advance(consumed.max(1));
                }
            }
        }

        let consumed = ctx.position;
        buffer.consumed(consumed);
        out.len() - before
    }

    /// Tokens that change how later bytes decode take effect immediately
    fn observe(&mut self, token: &Token) {
        match token.kind {
            TokenKind::Esc(EscCommand::SelectUtf8) => self.encoding = Encoding::Utf8,
            TokenKind::Esc(EscCommand::SelectLatin1) => self.encoding = Encoding::Latin1,
            TokenKind::Esc(EscCommand::FullReset) => self.hook = None,
            _ => {}
        }
    }

    fn install_hook(&mut self, request: HookRequest) {
        self.hooks_created += 1;
        let n = self.hooks_created;
        let hook: Box<dyn DcsHook> = match request {
            HookRequest::Tmux => Box::new(TmuxHook::new(n)),
            HookRequest::Sixel { params } => Box::new(SixelHook::new(
                n,
                params,
                self.encoding,
                self.limits.max_dcs_len,
            )),
            HookRequest::Discard { token } => Box::new(DiscardHook::new(n, token, self.encoding)),
        };
        tracing::debug!(hook = hook.identifier(), "hooked");
        self.hook = Some(hook);
    }
}

/// Pick the sub-parser that owns the next byte(s)
fn dispatch(ctx: &ParserContext<'_>) -> Decoded {
    let rest = ctx.rest();
    let first = rest[0];
    match first {
        0x1B => match rest.get(1) {
            None => Decoded::NeedMore,
            Some(b'[') => csi::decode(ctx, 2),
            Some(b']') => osc::decode(ctx, 2),
            Some(b'P') => dcs::decode(ctx, 2),
            Some(b'X') => other::decode_string(ctx, 2, StringKind::Sos),
            Some(b'^') => other::decode_string(ctx, 2, StringKind::Pm),
            Some(b'_') => other::decode_string(ctx, 2, StringKind::Apc),
            Some(_) => ansi::decode(ctx),
        },
        0x00..=0x1F | 0x7F => control::decode(ctx),
        0x80..=0x9F if ctx.encoding == Encoding::Latin1 => match first {
            0x9B => csi::decode(ctx, 1),
            0x9D => osc::decode(ctx, 1),
            0x90 => dcs::decode(ctx, 1),
            0x98 => other::decode_string(ctx, 1, StringKind::Sos),
            0x9E => other::decode_string(ctx, 1, StringKind::Pm),
            0x9F => other::decode_string(ctx, 1, StringKind::Apc),
            _ => ansi::decode_c1(first),
        },
        _ => text::decode(ctx),
    }
}

/// True for the bytes that terminate a string sequence on their own
pub(crate) fn is_string_terminator(byte: u8, encoding: Encoding) -> bool {
    byte == 0x9C && encoding == Encoding::Latin1
}
