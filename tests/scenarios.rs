//! End-to-end scenarios
//!
//! Each test drives the public API the way a host would: bytes in through
//! `Terminal` (or a threaded `Session`), state out through the screen,
//! snapshots and side effects.

use vt_engine::core::{Color, SideEffect};
use vt_engine::parser::{CsiCommand, SgrAttribute};
use vt_engine::{ByteStreamBuffer, Parser, Session, Terminal, TerminalConfig, Token, TokenKind};

fn parse_all(chunks: &[&[u8]]) -> Vec<Token> {
    let mut parser = Parser::default();
    let mut buffer = ByteStreamBuffer::new();
    let mut tokens = Vec::new();
    for chunk in chunks {
        buffer.append(chunk);
        parser.parse(&mut buffer, &mut tokens);
    }
    tokens
}

// ============================================================================
// Plain text
// ============================================================================

#[test]
fn test_hello_line() {
    let mut term = Terminal::with_size(80, 24);
    term.process(b"hello\r\n");

    let cursor = term.screen().cursor();
    assert_eq!((cursor.col, cursor.row), (0, 1));

    let row = term.screen().grid().line(0).unwrap();
    assert_eq!(row.text(), "hello");
    assert!(row.cells()[5..].iter().all(|c| c.is_blank()));
}

#[test]
fn test_long_output_scrolls_into_history() {
    let mut term = Terminal::with_size(20, 5);
    for i in 0..12 {
        term.process(format!("line {}\r\n", i).as_bytes());
    }
    let screen = term.screen();
    assert_eq!(screen.history().len(), 8);
    assert_eq!(screen.history().line_at(0).unwrap().text(), "line 0");
    assert_eq!(screen.grid().line(0).unwrap().text(), "line 8");
    assert_eq!(screen.absolute_line_for_row(0), 8);
}

// ============================================================================
// Chunk boundaries
// ============================================================================

#[test]
fn test_split_csi_matches_whole() {
    let split = parse_all(&[b"\x1b", b"[", b"3", b"1", b"m"]);
    let whole = parse_all(&[b"\x1b[31m"]);
    assert_eq!(split, whole);
    assert_eq!(
        whole,
        vec![Token::new(
            TokenKind::Csi(CsiCommand::Sgr(vec![SgrAttribute::Foreground(Color::RED)])),
            5
        )]
    );
}

#[test]
fn test_split_csi_applies_red() {
    let mut term = Terminal::with_size(10, 2);
    for byte in b"\x1b[31mX" {
        term.process(std::slice::from_ref(byte));
    }
    assert_eq!(term.screen().grid().cell(0, 0).unwrap().attrs.fg, Color::RED);
}

#[test]
fn test_osc_split_at_string_terminator() {
    let mut term = Terminal::with_size(10, 2);
    term.process(b"\x1b]2;split title\x1b");
    assert_eq!(term.screen().title(), "");
    term.process(b"\\");
    assert_eq!(term.screen().title(), "split title");
}

// ============================================================================
// Malformed input
// ============================================================================

#[test]
fn test_unterminated_osc_waits_then_reset_clears() {
    let mut term = Terminal::with_size(20, 3);
    term.take_side_effects();
    let before = term.snapshot();

    assert_eq!(term.process(b"\x1b]2;unterminated"), 0);
    assert!(term.pending_bytes() > 0);

    term.reset_session();
    assert_eq!(term.pending_bytes(), 0);
    assert_eq!(term.process_pending(), 0);
    assert!(term.take_side_effects().is_empty());
    assert_eq!(term.snapshot().lines, before.lines);
    assert_eq!(term.snapshot().cursor, before.cursor);
}

#[test]
fn test_garbage_never_stalls() {
    let mut term = Terminal::with_size(20, 3);
    term.process(b"\x1b[9999999999999999999;;;;;;;;;;;;;;;;;;;;;;;;;;;;;;;;q\xff\xfe\x1bZ\x9b");
    term.process(b"ok");
    assert!(term.snapshot().text().contains("ok"));
}

// ============================================================================
// Alternate screen
// ============================================================================

#[test]
fn test_alternate_screen_restores_primary() {
    let mut term = Terminal::with_size(20, 5);
    term.process(b"$ ls\r\nfile-a  file-b\r\n$ \x1b[31mvi\x1b[0m");
    let before = term.snapshot();

    term.process(b"\x1b[?1049h");
    assert!(term.screen().is_alternate());
    term.process(b"\x1b[2J\x1b[H~\r\n~\r\n~ editing\x1b[3;4H");
    term.process(b"\x1b[?1049l");

    let after = term.snapshot();
    assert!(!term.screen().is_alternate());
    assert_eq!(after.lines, before.lines);
    assert_eq!(after.cursor, before.cursor);
    assert!(term
        .take_side_effects()
        .contains(&SideEffect::AlternateScreen(true)));
}

#[test]
fn test_alternate_screen_keeps_history() {
    let mut term = Terminal::with_size(10, 2);
    term.process(b"a\r\nb\r\n");
    let history = term.screen().history().len();
    term.process(b"\x1b[?1049h1\r\n2\r\n3\r\n4");
    assert_eq!(term.screen().alternate_grid().line(1).unwrap().text(), "4");
    assert_eq!(term.screen().primary_grid().line(0).unwrap().text(), "b");
    term.process(b"\x1b[?1049l");
    assert_eq!(term.screen().history().len(), history);
}

#[test]
fn test_history_budget_change_at_runtime() {
    let mut term = Terminal::with_size(10, 2);
    for i in 0..20 {
        term.process(format!("{}\r\n", i).as_bytes());
    }
    assert_eq!(term.screen().history().len(), 19);
    term.screen_mut().set_history_budget(5, 0);
    let history = term.screen().history();
    assert_eq!(history.len(), 5);
    assert_eq!(history.first_position(), 14);
    assert_eq!(history.line_at(14).unwrap().text(), "14");
}

// ============================================================================
// Resize
// ============================================================================

#[test]
fn test_resize_reflows_wrapped_line() {
    let mut term = Terminal::with_size(10, 4);
    term.process(b"abcdefghijklmno");
    assert_eq!(term.screen().grid().line(0).unwrap().text(), "abcdefghij");
    assert!(term.screen().grid().line(0).unwrap().is_wrapped());
    let cursor = term.screen().cursor();
    assert_eq!((cursor.col, cursor.row), (5, 1));

    term.resize(20, 4);

    assert_eq!(term.screen().grid().line(0).unwrap().text(), "abcdefghijklmno");
    assert_eq!(term.screen().grid().line(1).unwrap().text(), "");
    let cursor = term.screen().cursor();
    assert_eq!((cursor.col, cursor.row), (15, 0));
}

#[test]
fn test_resize_reports_dirty_rows() {
    let mut term = Terminal::with_size(10, 3);
    term.process(b"x");
    term.take_side_effects();
    term.resize(12, 4);
    assert!(term
        .take_side_effects()
        .iter()
        .any(|e| matches!(e, SideEffect::RegionDirty { .. })));
}

// ============================================================================
// Host replies and integrations
// ============================================================================

#[test]
fn test_device_attribute_replies_in_order() {
    let mut term = Terminal::with_size(80, 24);
    term.process(b"\x1b[5;7H\x1b[6n\x1b[5n");
    let replies: Vec<Vec<u8>> = term
        .take_side_effects()
        .into_iter()
        .filter_map(|e| match e {
            SideEffect::WriteToHost(bytes) => Some(bytes),
            _ => None,
        })
        .collect();
    assert_eq!(replies, vec![b"\x1b[5;7R".to_vec(), b"\x1b[0n".to_vec()]);
}

#[test]
fn test_shell_integration_marks_prompt() {
    let mut term = Terminal::with_size(40, 5);
    term.process(b"\x1b]133;A\x07$ \x1b]133;B\x07make\r\n\x1b]133;C\x07ok\r\n\x1b]133;D;0\x07");
    let effects = term.take_side_effects();
    assert!(effects.contains(&SideEffect::PromptMarked(0)));
    assert!(effects.contains(&SideEffect::CommandFinished { exit_code: Some(0) }));
    assert!(!term.screen().marks().is_empty());
}

#[test]
fn test_tmux_gateway_round_trip() {
    let mut term = Terminal::with_size(40, 5);
    term.process(b"\x1bP1000p%begin 1 1 0\n%end 1 1 0\n%exit\n");
    let effects = term.take_side_effects();
    assert!(effects.contains(&SideEffect::TmuxLine("%begin 1 1 0".into())));
    assert!(effects.contains(&SideEffect::TmuxExit));
    assert!(!term.parser().is_hooked());
    term.process(b"back");
    assert!(term.snapshot().text().starts_with("back"));
}

// ============================================================================
// Threaded session
// ============================================================================

#[test]
fn test_session_matches_terminal() {
    let input: &[u8] = b"\x1b[1mbold\x1b[0m plain\r\n\x1b]0;title\x07\x1b[2;3Hx";

    let mut term = Terminal::with_size(20, 4);
    term.process(input);

    let handle = Session::spawn(&TerminalConfig::with_size(20, 4)).unwrap();
    for chunk in input.chunks(3) {
        handle.put_stream_data(chunk).unwrap();
    }
    handle.sync().unwrap();

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.lines, term.snapshot().lines);
    assert_eq!(snapshot.cursor, term.snapshot().cursor);
    assert_eq!(snapshot.title, "title");
    assert!(handle
        .drain_side_effects()
        .contains(&SideEffect::TitleChanged("title".into())));
    handle.shutdown().unwrap();
}
