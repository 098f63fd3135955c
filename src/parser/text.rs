//! Printable runs
//!
//! A run extends until the next control byte (C0, DEL, and in Latin-1 the
//! C1 range). Under UTF-8 a run never ends inside a codepoint: an
//! incomplete sequence at the very end of the available bytes is left for
//! the next call, while an invalid one becomes U+FFFD.

use super::token::{Token, TokenKind};
use super::{Decoded, Encoding, ParserContext};

pub(crate) fn decode(ctx: &ParserContext<'_>) -> Decoded {
    let rest = ctx.rest();
    let end = rest
        .iter()
        .position(|&b| is_run_terminator(b, ctx.encoding))
        .unwrap_or(rest.len());
    let at_buffer_end = end == rest.len();
    let run = &rest[..end];

    match ctx.encoding {
        Encoding::Latin1 => {
            let text: String = run.iter().map(|&b| char::from(b)).collect();
            Decoded::complete(Token::new(TokenKind::Text(text), end))
        }
        Encoding::Utf8 => decode_utf8(run, at_buffer_end),
    }
}

fn is_run_terminator(byte: u8, encoding: Encoding) -> bool {
    match byte {
        0x00..=0x1F | 0x7F => true,
        0x80..=0x9F => encoding == Encoding::Latin1,
        _ => false,
    }
}

fn decode_utf8(run: &[u8], at_buffer_end: bool) -> Decoded {
    let mut text = String::with_capacity(run.len());
    let mut pos = 0;
    while pos < run.len() {
        match std::str::from_utf8(&run[pos..]) {
            Ok(valid) => {
                text.push_str(valid);
                pos = run.len();
            }
            Err(err) => {
                let valid_up_to = err.valid_up_to();
                if let Ok(valid) = std::str::from_utf8(&run[pos..pos + valid_up_to]) {
                    text.push_str(valid);
                }
                pos += valid_up_to;
                match err.error_len() {
                    Some(len) => {
                        text.push(char::REPLACEMENT_CHARACTER);
                        pos += len;
                    }
                    // Truncated codepoint at the end of the run
                    None if at_buffer_end => break,
                    None => {
                        text.push(char::REPLACEMENT_CHARACTER);
                        pos = run.len();
                    }
                }
            }
        }
    }

    if pos == 0 {
        return Decoded::NeedMore;
    }
    Decoded::complete(Token::new(TokenKind::Text(text), pos))
}
