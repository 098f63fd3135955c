//! Two-byte and short escape sequences (`ESC [intermediates] final`) and
//! their 8-bit C1 equivalents.

use super::control::control_token;
use super::token::{ControlCode, EscCommand, Token, TokenKind};
use super::{csi::MAX_CSI_LEN, Decoded, ParserContext};

pub(crate) fn decode(ctx: &ParserContext<'_>) -> Decoded {
    let rest = ctx.rest();
    let mut incidentals = Vec::new();
    let mut intermediates = Vec::new();

    let mut i = 1;
    let final_byte = loop {
        // Controls between ESC and its final byte are executed, but only
        // so many of them are held
        if i >= MAX_CSI_LEN {
            return malformed(&rest[..i], incidentals);
        }
        let Some(&b) = rest.get(i) else {
            return Decoded::NeedMore;
        };
        match b {
            0x18 | 0x1A => return malformed(&rest[..=i], incidentals),
            // ESC ESC: the first one is dropped and the second starts over
            0x1B => return malformed(&rest[..i], incidentals),
            0x00..=0x1F => incidentals.push(control_token(b)),
            0x7F => {}
            0x20..=0x2F => intermediates.push(b),
            0x30..=0x7E => break b,
            _ => {
                // Not part of any escape; only the ESC is dropped
                if intermediates.is_empty() && incidentals.is_empty() {
                    return malformed(&rest[..1], incidentals);
                }
                return malformed(&rest[..i], incidentals);
            }
        }
        i += 1;
        if intermediates.len() > 2 {
            return malformed(&rest[..i], incidentals);
        }
    };
    let consumed = i + 1;

    let command = command(&intermediates, final_byte);
    if let EscCommand::Unsupported { .. } = &command {
        tracing::debug!(?command, "unsupported escape");
    }
    Decoded::Complete {
        token: Token::new(TokenKind::Esc(command), consumed),
        consumed,
        incidentals,
    }
}

fn malformed(bytes: &[u8], incidentals: Vec<Token>) -> Decoded {
    Decoded::Complete {
        token: Token::malformed(bytes),
        consumed: bytes.len(),
        incidentals,
    }
}

fn command(intermediates: &[u8], final_byte: u8) -> EscCommand {
    use EscCommand::*;

    match (intermediates, final_byte) {
        ([], b'7') => SaveCursor,
        ([], b'8') => RestoreCursor,
        ([], b'D') => Index,
        ([], b'E') => NextLine,
        ([], b'H') => TabSet,
        ([], b'M') => ReverseIndex,
        ([], b'c') => FullReset,
        ([], b'=') => KeypadApplication,
        ([], b'>') => KeypadNumeric,
        ([], b'N') => SingleShift(2),
        ([], b'O') => SingleShift(3),
        ([], b'n') => LockingShift(2),
        ([], b'o') => LockingShift(3),
        ([], b'Z') => Identify,
        ([], b'\\') => StringTerminator,
        ([slot @ (b'(' | b')' | b'*' | b'+')], charset) => DesignateCharset {
            slot: slot - b'(',
            charset,
        },
        ([b'#'], b'8') => ScreenAlignment,
        ([b'%'], b'G') => SelectUtf8,
        ([b'%'], b'@') => SelectLatin1,
        _ => Unsupported {
            intermediates: intermediates.to_vec(),
            final_byte,
        },
    }
}

/// An 8-bit C1 control that is not a sequence introducer
pub(crate) fn decode_c1(byte: u8) -> Decoded {
    let kind = match byte {
        0x84 => TokenKind::Esc(EscCommand::Index),
        0x85 => TokenKind::Esc(EscCommand::NextLine),
        0x88 => TokenKind::Esc(EscCommand::TabSet),
        0x8D => TokenKind::Esc(EscCommand::ReverseIndex),
        0x8E => TokenKind::Esc(EscCommand::SingleShift(2)),
        0x8F => TokenKind::Esc(EscCommand::SingleShift(3)),
        0x9C => TokenKind::Esc(EscCommand::StringTerminator),
        b => TokenKind::Control(ControlCode::Other(b)),
    };
    Decoded::complete(Token::new(kind, 1))
}
