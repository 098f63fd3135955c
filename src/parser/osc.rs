//! OSC sequences
//!
//! `OSC Ps ; Pt ST` where ST is BEL, `ESC \` or (8-bit) 0x9C. The payload
//! is scanned up to `max_osc_len`; a longer one is handed to a discard hook
//! so it is still consumed up to its terminator without being buffered.

use base64::Engine;

use super::token::{ColorSpec, ITermCommand, OscCommand, ShellMark, Token, TokenKind};
use super::{is_string_terminator, Decoded, Encoding, HookRequest, ParserContext};
use crate::core::{ClipboardTarget, DynamicColor};

pub(crate) fn decode(ctx: &ParserContext<'_>, intro_len: usize) -> Decoded {
    let rest = ctx.rest();
    let limit = intro_len + ctx.limits.max_osc_len;

    let mut i = intro_len;
    loop {
        let Some(&b) = rest.get(i) else {
            return Decoded::NeedMore;
        };
        match b {
            0x07 => return finish(ctx, &rest[intro_len..i], i + 1),
            0x18 | 0x1A => return Decoded::complete(Token::malformed(&rest[..=i])),
            0x1B => match rest.get(i + 1) {
                None => return Decoded::NeedMore,
                Some(b'\\') => return finish(ctx, &rest[intro_len..i], i + 2),
                // Any other escape ends the string and is parsed on its own
                Some(_) => return finish(ctx, &rest[intro_len..i], i),
            },
            b if is_string_terminator(b, ctx.encoding) => {
                return finish(ctx, &rest[intro_len..i], i + 1)
            }
            _ => {}
        }
        i += 1;
        if i >= limit {
            let payload = &rest[intro_len..i];
            tracing::debug!(len = payload.len(), "OSC payload over limit, discarding");
            let token = Token::new(
                TokenKind::Osc(OscCommand::Unsupported {
                    command: command_number(payload).0,
                    payload: Vec::new(),
                }),
                i,
            );
            return Decoded::Hook {
                request: HookRequest::Discard { token },
                token: None,
                consumed: i,
            };
        }
    }
}

fn finish(ctx: &ParserContext<'_>, payload: &[u8], consumed: usize) -> Decoded {
    // Other C0 controls inside the string are ignored
    let payload: Vec<u8> = payload.iter().copied().filter(|&b| b >= 0x20).collect();
    let command = parse_command(&payload, ctx.encoding);
    if let OscCommand::Unsupported { command, .. } = &command {
        tracing::debug!(?command, "unsupported OSC");
    }
    Decoded::complete(Token::new(TokenKind::Osc(command), consumed))
}

/// Split `Ps ; Pt` into the numeric command and the rest
fn command_number(payload: &[u8]) -> (Option<u32>, &[u8]) {
    let split = payload.iter().position(|&b| b == b';');
    let (head, tail) = match split {
        Some(i) => (&payload[..i], &payload[i + 1..]),
        None => (payload, &payload[payload.len()..]),
    };
    let number = std::str::from_utf8(head).ok().and_then(|s| s.parse::<u32>().ok());
    (number, tail)
}

fn decode_string(bytes: &[u8], encoding: Encoding) -> String {
    match encoding {
        Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        Encoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Interpret a complete OSC payload
pub(crate) fn parse_command(payload: &[u8], encoding: Encoding) -> OscCommand {
    let (number, rest) = command_number(payload);
    let text = || decode_string(rest, encoding);
    let unsupported = || OscCommand::Unsupported {
        command: number,
        payload: payload.to_vec(),
    };

    let Some(number) = number else {
        return unsupported();
    };
    match number {
        0 => OscCommand::SetTitleAndIcon(text()),
        1 => OscCommand::SetIconTitle(text()),
        2 => OscCommand::SetTitle(text()),
        4 => {
            let text = text();
            let fields: Vec<&str> = text.split(';').collect();
            let colors = fields
                .chunks(2)
                .filter_map(|pair| match pair {
                    [index, spec] => Some((index.parse::<u8>().ok()?, parse_color_spec(spec)?)),
                    _ => None,
                })
                .collect();
            OscCommand::SetPaletteColors(colors)
        }
        104 => OscCommand::ResetPaletteColors(
            text().split(';').filter_map(|s| s.parse::<u8>().ok()).collect(),
        ),
        10..=12 => {
            let text = text();
            let which = [
                DynamicColor::Foreground,
                DynamicColor::Background,
                DynamicColor::Cursor,
            ];
            let colors = text
                .split(';')
                .zip(which.iter().skip((number - 10) as usize))
                .filter_map(|(spec, &w)| Some((w, parse_color_spec(spec)?)))
                .collect();
            OscCommand::SetDynamicColors(colors)
        }
        110 => OscCommand::ResetDynamicColor(DynamicColor::Foreground),
        111 => OscCommand::ResetDynamicColor(DynamicColor::Background),
        112 => OscCommand::ResetDynamicColor(DynamicColor::Cursor),
        7 => OscCommand::CurrentDirectory(text()),
        8 => {
            let text = text();
            match text.split_once(';') {
                Some((params, url)) => OscCommand::Hyperlink {
                    params: params
                        .split(':')
                        .find_map(|kv| kv.strip_prefix("id="))
                        .map(str::to_string),
                    url: url.to_string(),
                },
                None => unsupported(),
            }
        }
        9 => OscCommand::Notify {
            title: None,
            body: text(),
        },
        777 => {
            let text = text();
            let mut parts = text.splitn(3, ';');
            match (parts.next(), parts.next(), parts.next()) {
                (Some("notify"), Some(title), body) => OscCommand::Notify {
                    title: Some(title.to_string()),
                    body: body.unwrap_or_default().to_string(),
                },
                _ => unsupported(),
            }
        }
        52 => parse_clipboard(rest).unwrap_or_else(unsupported),
        133 => {
            let text = text();
            let mut fields = text.split(';');
            let mark = match fields.next() {
                Some("A") => ShellMark::PromptStart,
                Some("B") => ShellMark::CommandStart,
                Some("C") => ShellMark::OutputStart,
                Some("D") => ShellMark::CommandFinished(fields.next().and_then(|s| s.parse().ok())),
                _ => return unsupported(),
            };
            OscCommand::ShellIntegration(mark)
        }
        1337 => OscCommand::ITerm(parse_iterm(&text())),
        _ => unsupported(),
    }
}

fn parse_clipboard(rest: &[u8]) -> Option<OscCommand> {
    let split = rest.iter().position(|&b| b == b';')?;
    let (selection, data) = (&rest[..split], &rest[split + 1..]);
    let mut targets: Vec<ClipboardTarget> = selection
        .iter()
        .filter_map(|&b| match b {
            b'c' => Some(ClipboardTarget::Clipboard),
            b'p' => Some(ClipboardTarget::Primary),
            b's' => Some(ClipboardTarget::Selection),
            _ => None,
        })
        .collect();
    if targets.is_empty() {
        targets.push(ClipboardTarget::Clipboard);
    }
    let data = match data {
        b"?" => None,
        _ => Some(
            base64::engine::general_purpose::STANDARD
                .decode(data)
                .ok()?,
        ),
    };
    Some(OscCommand::Clipboard { targets, data })
}

fn parse_iterm(text: &str) -> ITermCommand {
    let (key, value) = match text.split_once('=') {
        Some((k, v)) => (k, Some(v)),
        None => (text, None),
    };
    match (key, value) {
        ("SetMark", _) => ITermCommand::SetMark,
        ("CurrentDir", Some(dir)) => ITermCommand::CurrentDir(dir.to_string()),
        ("RemoteHost", Some(host)) => ITermCommand::RemoteHost(host.to_string()),
        ("ClearScrollback", _) => ITermCommand::ClearScrollback,
        ("StealFocus", _) => ITermCommand::StealFocus,
        _ => ITermCommand::Other {
            key: key.to_string(),
            value: value.map(str::to_string),
        },
    }
}

/// `?`, `#rgb`, `#rrggbb` or `rgb:r/g/b` with 1-4 hex digits per channel
pub(crate) fn parse_color_spec(spec: &str) -> Option<ColorSpec> {
    if spec == "?" {
        return Some(ColorSpec::Query);
    }
    if let Some(hex) = spec.strip_prefix('#') {
        let n = match hex.len() {
            3 | 6 | 9 | 12 => hex.len() / 3,
            _ => return None,
        };
        let channel = |i: usize| scale_hex(hex.get(i * n..(i + 1) * n)?);
        return Some(ColorSpec::Rgb(channel(0)?, channel(1)?, channel(2)?));
    }
    let body = spec.strip_prefix("rgb:")?;
    let mut channels = body.split('/').map(scale_hex);
    let rgb = (channels.next()??, channels.next()??, channels.next()??);
    if channels.next().is_some() {
        return None;
    }
    Some(ColorSpec::Rgb(rgb.0, rgb.1, rgb.2))
}

/// Scale a 1-4 digit hex channel to 8 bits
fn scale_hex(digits: &str) -> Option<u8> {
    if digits.is_empty() || digits.len() > 4 {
        return None;
    }
    let value = u32::from_str_radix(digits, 16).ok()?;
    let max = (1u32 << (4 * digits.len())) - 1;
    Some((value * 255 / max) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserLimits;

    fn osc(bytes: &[u8]) -> Decoded {
        decode(
            &ParserContext::new(bytes, Encoding::Utf8, ParserLimits::default()),
            2,
        )
    }

    fn command_of(bytes: &[u8]) -> OscCommand {
        match osc(bytes) {
            Decoded::Complete {
                token:
                    Token {
                        kind: TokenKind::Osc(c),
                        ..
                    },
                ..
            } => c,
            other => panic!("expected OSC, got {other:?}"),
        }
    }

    #[test]
    fn test_title_terminators() {
        assert_eq!(
            command_of(b"\x1b]0;hi\x07"),
            OscCommand::SetTitleAndIcon("hi".into())
        );
        assert_eq!(
            command_of(b"\x1b]2;hi\x1b\\"),
            OscCommand::SetTitle("hi".into())
        );
    }

    #[test]
    fn test_unterminated_needs_more() {
        assert_eq!(osc(b"\x1b]2;unterminated"), Decoded::NeedMore);
        assert_eq!(osc(b"\x1b]2;x\x1b"), Decoded::NeedMore);
    }

    #[test]
    fn test_escape_ends_string_without_consuming() {
        match osc(b"\x1b]2;x\x1b[m") {
            Decoded::Complete { consumed, token, .. } => {
                assert_eq!(consumed, 5);
                assert_eq!(token.kind, TokenKind::Osc(OscCommand::SetTitle("x".into())));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_cancel() {
        match osc(b"\x1b]2;x\x18") {
            Decoded::Complete { consumed, token, .. } => {
                assert_eq!(consumed, 6);
                assert!(matches!(token.kind, TokenKind::Malformed(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_oversized_payload_hooks_discard() {
        let limits = ParserLimits {
            max_osc_len: 8,
            ..ParserLimits::default()
        };
        let ctx = ParserContext::new(b"\x1b]2;0123456789", Encoding::Utf8, limits);
        match decode(&ctx, 2) {
            Decoded::Hook {
                request: HookRequest::Discard { .. },
                consumed,
                ..
            } => assert_eq!(consumed, 10),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_palette_and_dynamic_colors() {
        assert_eq!(
            command_of(b"\x1b]4;1;rgb:ff/00/80;2;?\x07"),
            OscCommand::SetPaletteColors(vec![
                (1, ColorSpec::Rgb(255, 0, 128)),
                (2, ColorSpec::Query)
            ])
        );
        assert_eq!(
            command_of(b"\x1b]11;#102030;?\x07"),
            OscCommand::SetDynamicColors(vec![
                (DynamicColor::Background, ColorSpec::Rgb(0x10, 0x20, 0x30)),
                (DynamicColor::Cursor, ColorSpec::Query)
            ])
        );
        assert_eq!(
            command_of(b"\x1b]104\x07"),
            OscCommand::ResetPaletteColors(vec![])
        );
    }

    #[test]
    fn test_color_spec_scaling() {
        assert_eq!(parse_color_spec("rgb:f/8/0"), Some(ColorSpec::Rgb(255, 136, 0)));
        assert_eq!(
            parse_color_spec("rgb:ffff/0000/7fff"),
            Some(ColorSpec::Rgb(255, 0, 127))
        );
        assert_eq!(parse_color_spec("bogus"), None);
    }

    #[test]
    fn test_hyperlink() {
        assert_eq!(
            command_of(b"\x1b]8;id=a1;https://example.com\x07"),
            OscCommand::Hyperlink {
                params: Some("a1".into()),
                url: "https://example.com".into()
            }
        );
        assert_eq!(
            command_of(b"\x1b]8;;\x07"),
            OscCommand::Hyperlink {
                params: None,
                url: String::new()
            }
        );
    }

    #[test]
    fn test_clipboard() {
        assert_eq!(
            command_of(b"\x1b]52;c;aGVsbG8=\x07"),
            OscCommand::Clipboard {
                targets: vec![ClipboardTarget::Clipboard],
                data: Some(b"hello".to_vec())
            }
        );
        assert_eq!(
            command_of(b"\x1b]52;p;?\x07"),
            OscCommand::Clipboard {
                targets: vec![ClipboardTarget::Primary],
                data: None
            }
        );
        assert!(matches!(
            command_of(b"\x1b]52;c;!!!\x07"),
            OscCommand::Unsupported { .. }
        ));
    }

    #[test]
    fn test_shell_integration() {
        assert_eq!(
            command_of(b"\x1b]133;A\x07"),
            OscCommand::ShellIntegration(ShellMark::PromptStart)
        );
        assert_eq!(
            command_of(b"\x1b]133;D;127\x07"),
            OscCommand::ShellIntegration(ShellMark::CommandFinished(Some(127)))
        );
        assert_eq!(
            command_of(b"\x1b]133;D\x07"),
            OscCommand::ShellIntegration(ShellMark::CommandFinished(None))
        );
    }

    #[test]
    fn test_iterm_commands() {
        assert_eq!(
            command_of(b"\x1b]1337;SetMark\x07"),
            OscCommand::ITerm(ITermCommand::SetMark)
        );
        assert_eq!(
            command_of(b"\x1b]1337;CurrentDir=/tmp\x07"),
            OscCommand::ITerm(ITermCommand::CurrentDir("/tmp".into()))
        );
        assert_eq!(
            command_of(b"\x1b]1337;SetUserVar=a=b\x07"),
            OscCommand::ITerm(ITermCommand::Other {
                key: "SetUserVar".into(),
                value: Some("a=b".into())
            })
        );
    }

    #[test]
    fn test_notifications() {
        assert_eq!(
            command_of(b"\x1b]9;done\x07"),
            OscCommand::Notify {
                title: None,
                body: "done".into()
            }
        );
        assert_eq!(
            command_of(b"\x1b]777;notify;Build;ok\x07"),
            OscCommand::Notify {
                title: Some("Build".into()),
                body: "ok".into()
            }
        );
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            command_of(b"\x1b]5555;x\x07"),
            OscCommand::Unsupported {
                command: Some(5555),
                payload: b"5555;x".to_vec()
            }
        );
    }
}
