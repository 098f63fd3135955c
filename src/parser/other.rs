//! SOS, PM and APC strings
//!
//! These carry nothing a terminal acts on, but they must be consumed up to
//! their terminator so the payload is not printed.

use super::hook::{scan_string, StringEnd, Terminator};
use super::token::{StringKind, Token, TokenKind};
use super::{Decoded, HookRequest, ParserContext};

pub(crate) fn decode_string(ctx: &ParserContext<'_>, intro_len: usize, kind: StringKind) -> Decoded {
    let rest = ctx.rest();
    let body = &rest[intro_len..];
    let token = |payload: &[u8], consumed: usize| {
        Token::new(
            TokenKind::StringSequence {
                kind,
                payload: payload.to_vec(),
            },
            consumed,
        )
    };

    let max_len = ctx.limits.max_osc_len;
    match scan_string(body, ctx.encoding, max_len) {
        StringEnd::Terminated(Terminator::Found { at, len }) => {
            Decoded::complete(token(&body[..at], intro_len + at + len))
        }
        StringEnd::Terminated(Terminator::Escape { at }) => {
            Decoded::complete(token(&body[..at], intro_len + at))
        }
        StringEnd::Terminated(Terminator::Cancel { at }) => {
            Decoded::complete(Token::malformed(&rest[..intro_len + at + 1]))
        }
        StringEnd::Overflow => {
            tracing::debug!(?kind, max_len, "string sequence over limit, discarding");
            let consumed = intro_len + max_len;
            Decoded::Hook {
                request: HookRequest::Discard {
                    token: token(&[], consumed),
                },
                token: None,
                consumed,
            }
        }
        StringEnd::Terminated(Terminator::Pending { .. } | Terminator::None) | StringEnd::NeedMore => {
            Decoded::NeedMore
        }
    }
}
