//! C0 controls outside of any sequence
//!
//! Always one byte, one token. CAN and SUB outside a sequence have nothing
//! to cancel and come out as `ControlCode::Other`.

use super::token::{ControlCode, Token, TokenKind};
use super::{Decoded, ParserContext};

pub(crate) fn decode(ctx: &ParserContext<'_>) -> Decoded {
    let byte = ctx.rest()[0];
    Decoded::complete(control_token(byte))
}

/// One-byte control token
pub(crate) fn control_token(byte: u8) -> Token {
    Token::new(TokenKind::Control(ControlCode::from_byte(byte)), 1)
}
