//! CSI sequences
//!
//! `CSI [<=>?] params [intermediates] final`. C0 controls inside the
//! sequence are executed as incidentals; CAN and SUB abort it; ESC aborts it
//! and starts a new sequence.

use super::control::control_token;
use super::params::Params;
use super::token::{CsiCommand, SgrAttribute, Token, TokenKind};
use super::{Decoded, ParserContext};
use crate::core::{Color, UnderlineStyle};

/// Longest CSI sequence scanned before it is declared malformed
pub(crate) const MAX_CSI_LEN: usize = 1024;

/// Most intermediate bytes any known sequence uses
const MAX_INTERMEDIATES: usize = 2;

pub(crate) fn decode(ctx: &ParserContext<'_>, intro_len: usize) -> Decoded {
    let rest = ctx.rest();
    let mut incidentals = Vec::new();
    let mut private = None;
    let mut param_bytes: Vec<u8> = Vec::new();
    let mut intermediates: Vec<u8> = Vec::new();
    let mut ignore = false;

    let mut i = intro_len;
    let final_byte = loop {
        if i >= MAX_CSI_LEN {
            return malformed(&rest[..i], incidentals);
        }
        let Some(&b) = rest.get(i) else {
            return Decoded::NeedMore;
        };
        match b {
            0x18 | 0x1A => return malformed(&rest[..=i], incidentals),
            0x1B => return malformed(&rest[..i], incidentals),
            0x00..=0x1F => incidentals.push(control_token(b)),
            0x7F => {}
            0x3C..=0x3F if i == intro_len => private = Some(b),
            0x30..=0x3F => {
                if !intermediates.is_empty() || (0x3C..=0x3F).contains(&b) {
                    ignore = true;
                } else {
                    param_bytes.push(b);
                }
            }
            0x20..=0x2F => {
                intermediates.push(b);
                ignore |= intermediates.len() > MAX_INTERMEDIATES;
            }
            0x40..=0x7E => break b,
            _ => ignore = true,
        }
        i += 1;
    };
    let consumed = i + 1;

    if ignore {
        tracing::trace!(len = consumed, "ignoring malformed CSI");
        return malformed(&rest[..consumed], incidentals);
    }
    let Some(params) = Params::parse(&param_bytes, ctx.limits.max_csi_params)
    else {
        tracing::debug!(len = consumed, "CSI parameter list over limit, ignored");
        return malformed(&rest[..consumed], incidentals);
    };

    let command = command(private, &intermediates, final_byte, &params);
    if let CsiCommand::Unsupported { .. } = &command {
        tracing::debug!(?command, "unsupported CSI");
    }
    Decoded::Complete {
        token: Token::new(TokenKind::Csi(command), consumed),
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

/// Map a syntactically valid sequence to its command
fn command(private: Option<u8>, intermediates: &[u8], final_byte: u8, p: &Params) -> CsiCommand {
    use CsiCommand::*;

    match (private, intermediates, final_byte) {
        (None, [], b'@') => InsertChars(p.get_or(0, 1)),
        (None, [], b'A') => CursorUp(p.get_or(0, 1)),
        (None, [], b'B') => CursorDown(p.get_or(0, 1)),
        (None, [], b'C') => CursorForward(p.get_or(0, 1)),
        (None, [], b'D') => CursorBackward(p.get_or(0, 1)),
        (None, [], b'E') => CursorNextLine(p.get_or(0, 1)),
        (None, [], b'F') => CursorPrevLine(p.get_or(0, 1)),
        (None, [], b'G') | (None, [], b'`') => CursorColumn(p.get_or(0, 1)),
        (None, [], b'a') => CursorColumnRelative(p.get_or(0, 1)),
        (None, [], b'd') => CursorRow(p.get_or(0, 1)),
        (None, [], b'e') => CursorRowRelative(p.get_or(0, 1)),
        (None, [], b'H') | (None, [], b'f') => CursorPosition {
            row: p.get_or(0, 1),
            col: p.get_or(1, 1),
        },
        (None, [], b'I') => TabForward(p.get_or(0, 1)),
        (None, [], b'Z') => TabBackward(p.get_or(0, 1)),
        (None, [], b'J') => EraseInDisplay {
            mode: p.get_or_zero(0, 0),
            selective: false,
        },
        (Some(b'?'), [], b'J') => EraseInDisplay {
            mode: p.get_or_zero(0, 0),
            selective: true,
        },
        (None, [], b'K') => EraseInLine {
            mode: p.get_or_zero(0, 0),
            selective: false,
        },
        (Some(b'?'), [], b'K') => EraseInLine {
            mode: p.get_or_zero(0, 0),
            selective: true,
        },
        (None, [], b'X') => EraseChars(p.get_or(0, 1)),
        (None, [], b'P') => DeleteChars(p.get_or(0, 1)),
        (None, [], b'L') => InsertLines(p.get_or(0, 1)),
        (None, [], b'M') => DeleteLines(p.get_or(0, 1)),
        (None, [], b'S') => ScrollUp(p.get_or(0, 1)),
        // Five parameters is the mouse highlight-tracking form
        (None, [], b'T') if p.len() <= 1 => ScrollDown(p.get_or(0, 1)),
        (None, [], b'b') => Repeat(p.get_or(0, 1)),
        (None, [], b'r') => SetScrollRegion {
            top: p.get_or_zero(0, 0),
            bottom: p.get_or_zero(1, 0),
        },
        (None, [], b'g') => TabClear(p.get_or_zero(0, 0)),
        (None, [], b'h') => SetModes(p.modes()),
        (None, [], b'l') => ResetModes(p.modes()),
        (Some(b'?'), [], b'h') => SetDecModes(p.modes()),
        (Some(b'?'), [], b'l') => ResetDecModes(p.modes()),
        (Some(b'?'), [], b's') => SaveDecModes(p.modes()),
        (Some(b'?'), [], b'r') => RestoreDecModes(p.modes()),
        (None, [], b'm') => Sgr(parse_sgr(p)),
        (None, [], b'n') => DeviceStatusReport(p.get_or_zero(0, 0)),
        (Some(b'?'), [], b'n') => DecDeviceStatusReport(p.get_or_zero(0, 0)),
        (None, [], b'c') if p.get_or_zero(0, 0) == 0 => PrimaryDeviceAttributes,
        (Some(b'>'), [], b'c') if p.get_or_zero(0, 0) == 0 => SecondaryDeviceAttributes,
        (Some(b'='), [], b'c') if p.get_or_zero(0, 0) == 0 => TertiaryDeviceAttributes,
        (None, [b'!'], b'p') => SoftReset,
        (None, [b' '], b'q') => SetCursorStyle(p.get_or_zero(0, 0)),
        (None, [], b's') if p.is_empty() => SaveCursor,
        (None, [], b'u') if p.is_empty() => RestoreCursor,
        (None, [], b't') => {
            let values = p.values();
            WindowOp {
                op: values.first().copied().unwrap_or(0),
                args: values.into_iter().skip(1).collect(),
            }
        }
        (None, [b'$'], b'p') => RequestAnsiMode(p.get_or_zero(0, 0) as u16),
        (Some(b'?'), [b'$'], b'p') => RequestDecMode(p.get_or_zero(0, 0) as u16),
        _ => Unsupported {
            private,
            intermediates: intermediates.to_vec(),
            final_byte,
            params: p.values(),
        },
    }
}

/// Decode an SGR parameter list. Unknown values are skipped; an extended
/// color with too few components consumes what is there and is dropped.
pub(crate) fn parse_sgr(p: &Params) -> Vec<SgrAttribute> {
    use SgrAttribute::*;

    if p.is_empty() {
        return vec![Reset];
    }

    let mut attrs = Vec::with_capacity(p.len());
    let mut i = 0;
    while i < p.len() {
        let group = p.group(i);
        let code = p.get_or_zero(i, 0);
        i += 1;
        let attr = match code {
            0 => Some(Reset),
            1 => Some(Bold),
            2 => Some(Faint),
            3 => Some(Italic),
            4 => Some(Underline(underline_style(group.get(1).copied().flatten()))),
            5 | 6 => Some(Blink),
            7 => Some(Inverse),
            8 => Some(Hidden),
            9 => Some(Strikethrough),
            21 => Some(Underline(UnderlineStyle::Double)),
            22 => Some(NormalIntensity),
            23 => Some(NotItalic),
            24 => Some(Underline(UnderlineStyle::None)),
            25 => Some(NotBlinking),
            27 => Some(NotInverse),
            28 => Some(NotHidden),
            29 => Some(NotStrikethrough),
            30..=37 => Some(Foreground(Color::Indexed((code - 30) as u8))),
            39 => Some(Foreground(Color::Default)),
            40..=47 => Some(Background(Color::Indexed((code - 40) as u8))),
            49 => Some(Background(Color::Default)),
            53 => Some(Overline),
            55 => Some(NotOverline),
            59 => Some(UnderlineColor(None)),
            90..=97 => Some(Foreground(Color::Indexed((code - 90 + 8) as u8))),
            100..=107 => Some(Background(Color::Indexed((code - 100 + 8) as u8))),
            38 | 48 | 58 => {
                let color = if group.len() > 1 {
                    extended_color_colon(&group[1..])
                } else {
                    let (color, used) = extended_color_semicolon(p, i);
                    i += used;
                    color
                };
                color.map(|c| match code {
                    38 => Foreground(c),
                    48 => Background(c),
                    _ => UnderlineColor(Some(c)),
                })
            }
            _ => None,
        };
        attrs.extend(attr);
    }
    attrs
}

fn underline_style(sub: Option<u32>) -> UnderlineStyle {
    match sub {
        None | Some(1) => UnderlineStyle::Single,
        Some(0) => UnderlineStyle::None,
        Some(2) => UnderlineStyle::Double,
        Some(3) => UnderlineStyle::Curly,
        Some(4) => UnderlineStyle::Dotted,
        Some(5) => UnderlineStyle::Dashed,
        Some(_) => UnderlineStyle::Single,
    }
}

fn to_u8(v: Option<u32>) -> u8 {
    v.unwrap_or(0).min(255) as u8
}

/// `38:5:n`, `38:2:r:g:b` or `38:2:cs:r:g:b`
fn extended_color_colon(sub: &[Option<u32>]) -> Option<Color> {
    match sub.first().copied().flatten() {
        Some(5) => sub.get(1).map(|&v| Color::Indexed(to_u8(v))),
        Some(2) => {
            let rgb = if sub.len() >= 5 { &sub[2..5] } else { sub.get(1..4)? };
            Some(Color::Rgb(to_u8(rgb[0]), to_u8(rgb[1]), to_u8(rgb[2])))
        }
        _ => None,
    }
}

/// `38;5;n` or `38;2;r;g;b`, returning the color and how many following
/// parameters it used
fn extended_color_semicolon(p: &Params, i: usize) -> (Option<Color>, usize) {
    match p.get(i) {
        Some(5) => {
            if i + 1 < p.len() {
                (Some(Color::Indexed(to_u8(p.get(i + 1)))), 2)
            } else {
                (None, p.len() - i)
            }
        }
        Some(2) => {
            if i + 3 < p.len() {
                let c = Color::Rgb(to_u8(p.get(i + 1)), to_u8(p.get(i + 2)), to_u8(p.get(i + 3)));
                (Some(c), 4)
            } else {
                (None, p.len() - i)
            }
        }
        _ => (None, 1.min(p.len() - i)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserLimits;
    use crate::parser::token::ControlCode;
    use crate::parser::Encoding;

    fn csi(bytes: &[u8]) -> Decoded {
        decode(
            &ParserContext::new(bytes, Encoding::Utf8, ParserLimits::default()),
            2,
        )
    }

    fn command_of(bytes: &[u8]) -> CsiCommand {
        match csi(bytes) {
            Decoded::Complete {
                token:
                    Token {
                        kind: TokenKind::Csi(c),
                        ..
                    },
                ..
            } => c,
            other => panic!("expected CSI, got {other:?}"),
        }
    }

    #[test]
    fn test_cursor_position_defaults() {
        assert_eq!(
            command_of(b"\x1b[H"),
            CsiCommand::CursorPosition { row: 1, col: 1 }
        );
        assert_eq!(
            command_of(b"\x1b[5;10H"),
            CsiCommand::CursorPosition { row: 5, col: 10 }
        );
        assert_eq!(
            command_of(b"\x1b[;7f"),
            CsiCommand::CursorPosition { row: 1, col: 7 }
        );
        assert_eq!(command_of(b"\x1b[0A"), CsiCommand::CursorUp(1));
    }

    #[test]
    fn test_need_more() {
        assert_eq!(csi(b"\x1b["), Decoded::NeedMore);
        assert_eq!(csi(b"\x1b[12;3"), Decoded::NeedMore);
        assert_eq!(csi(b"\x1b[?25"), Decoded::NeedMore);
    }

    #[test]
    fn test_private_modes() {
        assert_eq!(
            command_of(b"\x1b[?1049h"),
            CsiCommand::SetDecModes(vec![1049])
        );
        assert_eq!(
            command_of(b"\x1b[?1;2004l"),
            CsiCommand::ResetDecModes(vec![1, 2004])
        );
        assert_eq!(command_of(b"\x1b[4h"), CsiCommand::SetModes(vec![4]));
        assert_eq!(command_of(b"\x1b[?2026$p"), CsiCommand::RequestDecMode(2026));
    }

    #[test]
    fn test_embedded_control_is_incidental() {
        match csi(b"\x1b[1\n;2H") {
            Decoded::Complete {
                token,
                consumed,
                incidentals,
            } => {
                assert_eq!(
                    token.kind,
                    TokenKind::Csi(CsiCommand::CursorPosition { row: 1, col: 2 })
                );
                assert_eq!(consumed, 7);
                assert_eq!(
                    incidentals,
                    vec![Token::new(TokenKind::Control(ControlCode::LineFeed), 1)]
                );
            }
            other => panic!("unexpected {other:?}"),
        }

        match csi(b"\x1b[\x072J") {
            Decoded::Complete {
                token, incidentals, ..
            } => {
                assert_eq!(
                    token.kind,
                    TokenKind::Csi(CsiCommand::EraseInDisplay {
                        mode: 2,
                        selective: false
                    })
                );
                assert_eq!(incidentals.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_escape_aborts() {
        match csi(b"\x1b[12\x1b[m") {
            Decoded::Complete { token, consumed, .. } => {
                assert!(matches!(token.kind, TokenKind::Malformed(_)));
                assert_eq!(consumed, 4);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_cancel_consumed() {
        match csi(b"\x1b[12\x18x") {
            Decoded::Complete { consumed, .. } => assert_eq!(consumed, 5),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_param_cap() {
        let mut seq = b"\x1b[".to_vec();
        for _ in 0..20 {
            seq.extend_from_slice(b"1;");
        }
        seq.push(b'm');
        match csi(&seq) {
            Decoded::Complete { token, consumed, .. } => {
                assert!(matches!(token.kind, TokenKind::Malformed(_)));
                assert_eq!(consumed, seq.len());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_overlong_sequence_resyncs() {
        let mut seq = b"\x1b[".to_vec();
        seq.extend(std::iter::repeat(b'1').take(MAX_CSI_LEN + 10));
        match csi(&seq) {
            Decoded::Complete { consumed, .. } => assert_eq!(consumed, MAX_CSI_LEN),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_is_fully_consumed() {
        match csi(b"\x1b[1;2;3~rest") {
            Decoded::Complete { token, consumed, .. } => {
                assert_eq!(consumed, 8);
                assert!(matches!(
                    token.kind,
                    TokenKind::Csi(CsiCommand::Unsupported { final_byte: b'~', .. })
                ));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_sgr_basic() {
        use SgrAttribute::*;
        assert_eq!(command_of(b"\x1b[m"), CsiCommand::Sgr(vec![Reset]));
        assert_eq!(
            command_of(b"\x1b[1;31;44m"),
            CsiCommand::Sgr(vec![Bold, Foreground(Color::RED), Background(Color::BLUE)])
        );
        assert_eq!(
            command_of(b"\x1b[97;39m"),
            CsiCommand::Sgr(vec![Foreground(Color::Indexed(15)), Foreground(Color::Default)])
        );
    }

    #[test]
    fn test_sgr_extended_colors() {
        use SgrAttribute::*;
        assert_eq!(
            command_of(b"\x1b[38;5;208;48;2;1;2;3m"),
            CsiCommand::Sgr(vec![
                Foreground(Color::Indexed(208)),
                Background(Color::Rgb(1, 2, 3))
            ])
        );
        assert_eq!(
            command_of(b"\x1b[38:2::10:20:30;4:3m"),
            CsiCommand::Sgr(vec![
                Foreground(Color::Rgb(10, 20, 30)),
                Underline(UnderlineStyle::Curly)
            ])
        );
        assert_eq!(
            command_of(b"\x1b[58:5:9m"),
            CsiCommand::Sgr(vec![UnderlineColor(Some(Color::Indexed(9)))])
        );
        // Truncated extended color is dropped without eating other params
        assert_eq!(command_of(b"\x1b[38;2;1m"), CsiCommand::Sgr(vec![]));
    }

    #[test]
    fn test_decscusr_and_decstr() {
        assert_eq!(command_of(b"\x1b[5 q"), CsiCommand::SetCursorStyle(5));
        assert_eq!(command_of(b"\x1b[!p"), CsiCommand::SoftReset);
    }
}
