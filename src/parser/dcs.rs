//! DCS sequences
//!
//! The header (`DCS [<=>?] params [intermediates] final`) is parsed like a
//! CSI. tmux control mode and sixel install a hook; the short requests
//! (DECRQSS, XTGETTCAP, synchronized update) are decoded once the
//! terminator is in the buffer.

use super::hook::{scan_string, StringEnd, Terminator};
use super::params::Params;
use super::token::{DcsCommand, Token, TokenKind};
use super::{csi::MAX_CSI_LEN, Decoded, HookRequest, ParserContext};

struct Header {
    private: Option<u8>,
    params: Params,
    intermediates: Vec<u8>,
    final_byte: u8,
    len: usize,
}

enum HeaderScan {
    Header(Header),
    Malformed(usize),
    NeedMore,
}

fn scan_header(ctx: &ParserContext<'_>, intro_len: usize) -> HeaderScan {
    let rest = ctx.rest();
    let mut private = None;
    let mut param_bytes = Vec::new();
    let mut intermediates = Vec::new();
    let mut ignore = false;

    let mut i = intro_len;
    let final_byte = loop {
        if i >= MAX_CSI_LEN {
            return HeaderScan::Malformed(i);
        }
        let Some(&b) = rest.get(i) else {
            return HeaderScan::NeedMore;
        };
        match b {
            0x18 | 0x1A => return HeaderScan::Malformed(i + 1),
            0x1B => return HeaderScan::Malformed(i),
            // C0 inside a DCS header is ignored
            0x00..=0x1F | 0x7F => {}
            0x3C..=0x3F if i == intro_len => private = Some(b),
            0x30..=0x3F => {
                if !intermediates.is_empty() || (0x3C..=0x3F).contains(&b) {
                    ignore = true;
                } else {
                    param_bytes.push(b);
                }
            }
            0x20..=0x2F => intermediates.push(b),
            0x40..=0x7E => break b,
            _ => ignore = true,
        }
        i += 1;
    };
    let params = match Params::parse(&param_bytes, ctx.limits.max_csi_params) {
        Some(params) if !ignore => params,
        _ => Params::default(),
    };
    HeaderScan::Header(Header {
        private,
        params,
        intermediates,
        final_byte,
        len: i + 1,
    })
}

pub(crate) fn decode(ctx: &ParserContext<'_>, intro_len: usize) -> Decoded {
    let rest = ctx.rest();
    let header = match scan_header(ctx, intro_len) {
        HeaderScan::Header(header) => header,
        HeaderScan::Malformed(len) => return Decoded::complete(Token::malformed(&rest[..len])),
        HeaderScan::NeedMore => return Decoded::NeedMore,
    };

    match (header.private, header.intermediates.as_slice(), header.final_byte) {
        (None, [], b'p') if header.params.values() == [1000] => {
            return Decoded::Hook {
                request: HookRequest::Tmux,
                token: Some(Token::new(
                    TokenKind::Dcs(DcsCommand::TmuxHookStarted),
                    header.len,
                )),
                consumed: header.len,
            };
        }
        (None, [], b'q') => {
            return Decoded::Hook {
                request: HookRequest::Sixel {
                    params: header.params.values(),
                },
                token: None,
                consumed: header.len,
            };
        }
        _ => {}
    }

    let body = &rest[header.len..];
    let max_len = ctx.limits.max_osc_len;
    match scan_string(body, ctx.encoding, max_len) {
        StringEnd::Terminated(Terminator::Found { at, len }) => {
            let consumed = header.len + at + len;
            Decoded::complete(Token::new(
                TokenKind::Dcs(command(&header, &body[..at])),
                consumed,
            ))
        }
        StringEnd::Terminated(Terminator::Escape { at }) => {
            let consumed = header.len + at;
            Decoded::complete(Token::new(
                TokenKind::Dcs(command(&header, &body[..at])),
                consumed,
            ))
        }
        StringEnd::Terminated(Terminator::Cancel { at }) => {
            Decoded::complete(Token::malformed(&rest[..header.len + at + 1]))
        }
        StringEnd::Overflow => {
            // Requests are short; anything longer is skipped without rescanning
            tracing::debug!(max_len, "DCS payload over limit, discarding");
            let consumed = header.len + max_len;
            Decoded::Hook {
                request: HookRequest::Discard {
                    token: Token::new(TokenKind::Dcs(unsupported(&header)), consumed),
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

fn unsupported(header: &Header) -> DcsCommand {
    DcsCommand::Unsupported {
        params: header.params.values(),
        intermediates: header.intermediates.clone(),
        final_byte: header.final_byte,
    }
}

fn command(header: &Header, payload: &[u8]) -> DcsCommand {
    let command = match (header.private, header.intermediates.as_slice(), header.final_byte) {
        (None, [b'$'], b'q') => DcsCommand::RequestStatusString(payload.to_vec()),
        (None, [b'+'], b'q') => DcsCommand::RequestTermcap(
            payload
                .split(|&b| b == b';')
                .filter(|name| !name.is_empty())
                .map(|name| decode_hex(name).unwrap_or_default())
                .collect(),
        ),
        (Some(b'='), [], b's') => match header.params.get(0) {
            Some(1) => DcsCommand::SynchronizedUpdate(true),
            Some(2) => DcsCommand::SynchronizedUpdate(false),
            _ => unsupported(header),
        },
        _ => unsupported(header),
    };
    if let DcsCommand::Unsupported { .. } = &command {
        tracing::debug!(?command, "unsupported DCS");
    }
    command
}

/// Hex-encoded capability name, as XTGETTCAP sends it
fn decode_hex(hex: &[u8]) -> Option<String> {
    if hex.len() % 2 != 0 {
        return None;
    }
    let bytes = hex
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(pair, 16).ok()
        })
        .collect::<Option<Vec<u8>>>()?;
    String::from_utf8(bytes).ok()
}
