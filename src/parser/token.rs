//! Tokens
//!
//! Semantic units produced by the parser and consumed, in order, by the
//! screen. Every token records how many bytes it was decoded from.

use serde::{Deserialize, Serialize};

use crate::core::{ClipboardTarget, Color, DynamicColor, UnderlineStyle};

/// Longest prefix kept inside `TokenKind::Malformed`
pub const MALFORMED_KEEP: usize = 16;

/// One parsed unit of the byte stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Bytes consumed to produce this token
    pub raw_len: usize,
}

impl Token {
    pub fn new(kind: TokenKind, raw_len: usize) -> Self {
        Self { kind, raw_len }
    }

    /// Resynchronisation marker for `bytes`
    pub fn malformed(bytes: &[u8]) -> Self {
        let keep = bytes.len().min(MALFORMED_KEEP);
        Self::new(TokenKind::Malformed(bytes[..keep].to_vec()), bytes.len())
    }
}

/// The closed set of things the byte stream can say
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    /// A maximal run of printable characters
    Text(String),
    /// A single C0 control (or DEL)
    Control(ControlCode),
    Csi(CsiCommand),
    Esc(EscCommand),
    Osc(OscCommand),
    Dcs(DcsCommand),
    /// Output of a tmux control-mode hook
    Tmux(TmuxEvent),
    /// SOS / PM / APC: parsed for correct byte accounting, never executed
    StringSequence { kind: StringKind, payload: Vec<u8> },
    /// Bytes that could not be decoded; keeps at most a short prefix
    Malformed(Vec<u8>),
}

/// C0 control codes (0x00-0x1F) and DEL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlCode {
    Null,
    Enquiry,
    Bell,
    Backspace,
    Tab,
    LineFeed,
    VerticalTab,
    FormFeed,
    CarriageReturn,
    /// SO: invoke G1
    ShiftOut,
    /// SI: invoke G0
    ShiftIn,
    Delete,
    /// Any other C0 (or unassigned C1 in 8-bit mode); no effect
    Other(u8),
}

impl ControlCode {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => ControlCode::Null,
            0x05 => ControlCode::Enquiry,
            0x07 => ControlCode::Bell,
            0x08 => ControlCode::Backspace,
            0x09 => ControlCode::Tab,
            0x0A => ControlCode::LineFeed,
            0x0B => ControlCode::VerticalTab,
            0x0C => ControlCode::FormFeed,
            0x0D => ControlCode::CarriageReturn,
            0x0E => ControlCode::ShiftOut,
            0x0F => ControlCode::ShiftIn,
            0x7F => ControlCode::Delete,
            b => ControlCode::Other(b),
        }
    }
}

/// One SGR attribute change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SgrAttribute {
    Reset,
    Bold,
    Faint,
    Italic,
    Underline(UnderlineStyle),
    Blink,
    Inverse,
    Hidden,
    Strikethrough,
    Overline,
    /// SGR 22: neither bold nor faint
    NormalIntensity,
    NotItalic,
    NotBlinking,
    NotInverse,
    NotHidden,
    NotStrikethrough,
    NotOverline,
    /// `Color::Default` for SGR 39
    Foreground(Color),
    /// `Color::Default` for SGR 49
    Background(Color),
    /// `None` for SGR 59
    UnderlineColor(Option<Color>),
}

/// Semantic CSI commands. Counts and positions are as sent (1-based where
/// the protocol is 1-based), with protocol defaults already applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CsiCommand {
    /// CUU
    CursorUp(u32),
    /// CUD
    CursorDown(u32),
    /// CUF
    CursorForward(u32),
    /// CUB
    CursorBackward(u32),
    /// CNL
    CursorNextLine(u32),
    /// CPL
    CursorPrevLine(u32),
    /// CHA / HPA (1-based)
    CursorColumn(u32),
    /// HPR
    CursorColumnRelative(u32),
    /// VPA (1-based)
    CursorRow(u32),
    /// VPR
    CursorRowRelative(u32),
    /// CUP / HVP (1-based)
    CursorPosition { row: u32, col: u32 },
    /// CHT
    TabForward(u32),
    /// CBT
    TabBackward(u32),
    /// ED / DECSED
    EraseInDisplay { mode: u32, selective: bool },
    /// EL / DECSEL
    EraseInLine { mode: u32, selective: bool },
    /// ECH
    EraseChars(u32),
    /// ICH
    InsertChars(u32),
    /// DCH
    DeleteChars(u32),
    /// IL
    InsertLines(u32),
    /// DL
    DeleteLines(u32),
    /// SU
    ScrollUp(u32),
    /// SD
    ScrollDown(u32),
    /// REP
    Repeat(u32),
    /// DECSTBM (1-based, 0 = default)
    SetScrollRegion { top: u32, bottom: u32 },
    /// TBC
    TabClear(u32),
    /// SM
    SetModes(Vec<u16>),
    /// RM
    ResetModes(Vec<u16>),
    /// DECSET
    SetDecModes(Vec<u16>),
    /// DECRST
    ResetDecModes(Vec<u16>),
    /// CSI ? Pm s
    SaveDecModes(Vec<u16>),
    /// CSI ? Pm r
    RestoreDecModes(Vec<u16>),
    /// SGR
    Sgr(Vec<SgrAttribute>),
    /// DSR
    DeviceStatusReport(u32),
    /// DSR with `?`
    DecDeviceStatusReport(u32),
    /// DA1
    PrimaryDeviceAttributes,
    /// DA2
    SecondaryDeviceAttributes,
    /// DA3
    TertiaryDeviceAttributes,
    /// DECSTR
    SoftReset,
    /// DECSCUSR
    SetCursorStyle(u32),
    /// SCOSC
    SaveCursor,
    /// SCORC
    RestoreCursor,
    /// XTWINOPS
    WindowOp { op: u32, args: Vec<u32> },
    /// DECRQM for an ANSI mode
    RequestAnsiMode(u16),
    /// DECRQM for a DEC private mode
    RequestDecMode(u16),
    /// Syntactically valid but not executed
    Unsupported {
        private: Option<u8>,
        intermediates: Vec<u8>,
        final_byte: u8,
        params: Vec<u32>,
    },
}

/// Non-CSI escape sequences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscCommand {
    /// DECSC
    SaveCursor,
    /// DECRC
    RestoreCursor,
    /// IND
    Index,
    /// NEL
    NextLine,
    /// RI
    ReverseIndex,
    /// HTS
    TabSet,
    /// RIS
    FullReset,
    /// DECKPAM
    KeypadApplication,
    /// DECKPNM
    KeypadNumeric,
    /// SCS: designate a charset (by final byte) into G0-G3
    DesignateCharset { slot: u8, charset: u8 },
    /// SS2 / SS3
    SingleShift(u8),
    /// LS2 / LS3
    LockingShift(u8),
    /// DECALN
    ScreenAlignment,
    /// DECID
    Identify,
    /// `ESC % G`
    SelectUtf8,
    /// `ESC % @`
    SelectLatin1,
    /// A stray ST
    StringTerminator,
    Unsupported { intermediates: Vec<u8>, final_byte: u8 },
}

/// Color value in an OSC color request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorSpec {
    Rgb(u8, u8, u8),
    /// `?`: report the current value
    Query,
}

/// FinalTerm shell-integration markers (OSC 133)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShellMark {
    PromptStart,
    CommandStart,
    OutputStart,
    CommandFinished(Option<i32>),
}

/// Proprietary OSC 1337 commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ITermCommand {
    SetMark,
    CurrentDir(String),
    RemoteHost(String),
    ClearScrollback,
    StealFocus,
    Other { key: String, value: Option<String> },
}

/// Operating System Commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OscCommand {
    /// OSC 0
    SetTitleAndIcon(String),
    /// OSC 1
    SetIconTitle(String),
    /// OSC 2
    SetTitle(String),
    /// OSC 4
    SetPaletteColors(Vec<(u8, ColorSpec)>),
    /// OSC 104; empty means every entry
    ResetPaletteColors(Vec<u8>),
    /// OSC 10/11/12, possibly chained
    SetDynamicColors(Vec<(DynamicColor, ColorSpec)>),
    /// OSC 110/111/112
    ResetDynamicColor(DynamicColor),
    /// OSC 8; an empty url closes the link
    Hyperlink { params: Option<String>, url: String },
    /// OSC 7
    CurrentDirectory(String),
    /// OSC 9 / OSC 777 notify
    Notify { title: Option<String>, body: String },
    /// OSC 52; `data` is `None` for a query
    Clipboard {
        targets: Vec<ClipboardTarget>,
        data: Option<Vec<u8>>,
    },
    /// OSC 133
    ShellIntegration(ShellMark),
    /// OSC 1337
    ITerm(ITermCommand),
    Unsupported { command: Option<u32>, payload: Vec<u8> },
}

/// Device Control Strings that are not hooked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DcsCommand {
    /// DECRQSS: the setting being asked about
    RequestStatusString(Vec<u8>),
    /// XTGETTCAP: decoded capability names
    RequestTermcap(Vec<String>),
    /// Synchronized update begin (true) / end (false)
    SynchronizedUpdate(bool),
    /// Complete sixel image
    Sixel { params: Vec<u32>, data: Vec<u8> },
    /// A tmux control-mode session started
    TmuxHookStarted,
    Unsupported {
        params: Vec<u32>,
        intermediates: Vec<u8>,
        final_byte: u8,
    },
}

/// tmux control-mode output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TmuxEvent {
    /// One protocol line without its terminator
    Line(String),
    Exit,
}

/// String sequences that carry no terminal semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StringKind {
    Sos,
    Pm,
    Apc,
}
