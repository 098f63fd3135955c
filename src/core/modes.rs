//! Terminal mode flags
//!
//! ANSI (SM/RM) and DEC private (DECSET/DECRST) modes that are plain flags.
//! Modes with side effects on the grid (alternate screen, cursor
//! visibility, synchronized output) are handled by the screen.

use serde::{Deserialize, Serialize};

/// Mouse reporting mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MouseMode {
    #[default]
    None,
    /// DECSET 9: press only
    X10,
    /// DECSET 1000: press and release
    Normal,
    /// DECSET 1002: motion while a button is held
    ButtonMotion,
    /// DECSET 1003: all motion
    AnyMotion,
}

impl MouseMode {
    fn dec_mode(self) -> Option<u16> {
        match self {
            MouseMode::None => None,
            MouseMode::X10 => Some(9),
            MouseMode::Normal => Some(1000),
            MouseMode::ButtonMotion => Some(1002),
            MouseMode::AnyMotion => Some(1003),
        }
    }
}

/// Mouse report encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MouseEncoding {
    /// Legacy byte encoding, limited to 223 columns
    #[default]
    X10,
    /// DECSET 1005
    Utf8,
    /// DECSET 1006
    Sgr,
    /// DECSET 1015
    Urxvt,
    /// DECSET 1016
    SgrPixels,
}

impl MouseEncoding {
    fn dec_mode(self) -> Option<u16> {
        match self {
            MouseEncoding::X10 => None,
            MouseEncoding::Utf8 => Some(1005),
            MouseEncoding::Sgr => Some(1006),
            MouseEncoding::Urxvt => Some(1015),
            MouseEncoding::SgrPixels => Some(1016),
        }
    }
}

/// Terminal mode flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modes {
    /// DECAWM: wrap at the right margin
    pub autowrap: bool,
    /// DECOM: cursor addressing relative to the scroll region
    pub origin: bool,
    /// IRM: insert instead of overwrite
    pub insert: bool,
    /// LNM: LF also performs CR
    pub linefeed_newline: bool,
    /// DECCKM: cursor keys send ESC O sequences
    pub cursor_keys_application: bool,
    /// DECKPAM / DECKPNM
    pub keypad_application: bool,
    /// DECSCNM: reverse video
    pub reverse_video: bool,
    /// Reverse wraparound (DECSET 45)
    pub reverse_wraparound: bool,
    /// DECSET 2004
    pub bracketed_paste: bool,
    /// DECSET 1004
    pub focus_reporting: bool,
    /// DECSET 1007: wheel sends arrow keys on the alternate screen
    pub alternate_scroll: bool,
    /// DECCOLM is tracked only; the host decides whether to resize
    pub column_132: bool,
    pub mouse_mode: MouseMode,
    pub mouse_encoding: MouseEncoding,
}

impl Default for Modes {
    fn default() -> Self {
        Self {
            autowrap: true,
            origin: false,
            insert: false,
            linefeed_newline: false,
            cursor_keys_application: false,
            keypad_application: false,
            reverse_video: false,
            reverse_wraparound: false,
            bracketed_paste: false,
            focus_reporting: false,
            alternate_scroll: false,
            column_132: false,
            mouse_mode: MouseMode::None,
            mouse_encoding: MouseEncoding::X10,
        }
    }
}

impl Modes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or reset a DEC private mode. Returns false for modes not kept here.
    pub fn set_dec_mode(&mut self, mode: u16, enabled: bool) -> bool {
        match mode {
            1 => self.cursor_keys_application = enabled,
            3 => self.column_132 = enabled,
            5 => self.reverse_video = enabled,
            6 => self.origin = enabled,
            7 => self.autowrap = enabled,
            45 => self.reverse_wraparound = enabled,
            66 => self.keypad_application = enabled,
            9 | 1000 | 1002 | 1003 => {
                self.mouse_mode = if !enabled {
                    MouseMode::None
                } else {
                    match mode {
                        9 => MouseMode::X10,
                        1000 => MouseMode::Normal,
                        1002 => MouseMode::ButtonMotion,
                        _ => MouseMode::AnyMotion,
                    }
                };
            }
            1004 => self.focus_reporting = enabled,
            1005 | 1006 | 1015 | 1016 => {
                let encoding = match mode {
                    1005 => MouseEncoding::Utf8,
                    1006 => MouseEncoding::Sgr,
                    1015 => MouseEncoding::Urxvt,
                    _ => MouseEncoding::SgrPixels,
                };
                if enabled {
                    self.mouse_encoding = encoding;
                } else if self.mouse_encoding == encoding {
                    self.mouse_encoding = MouseEncoding::X10;
                }
            }
            1007 => self.alternate_scroll = enabled,
            2004 => self.bracketed_paste = enabled,
            _ => return false,
        }
        true
    }

    /// Current value of a DEC private mode kept here
    pub fn dec_mode(&self, mode: u16) -> Option<bool> {
        Some(match mode {
            1 => self.cursor_keys_application,
            3 => self.column_132,
            5 => self.reverse_video,
            6 => self.origin,
            7 => self.autowrap,
            45 => self.reverse_wraparound,
            66 => self.keypad_application,
            9 | 1000 | 1002 | 1003 => self.mouse_mode.dec_mode() == Some(mode),
            1004 => self.focus_reporting,
            1005 | 1006 | 1015 | 1016 => self.mouse_encoding.dec_mode() == Some(mode),
            1007 => self.alternate_scroll,
            2004 => self.bracketed_paste,
            _ => return None,
        })
    }

    /// Set or reset an ANSI mode (SM/RM). Returns false for unknown modes.
    pub fn set_ansi_mode(&mut self, mode: u16, enabled: bool) -> bool {
        match mode {
            4 => self.insert = enabled,
            20 => self.linefeed_newline = enabled,
            _ => return false,
        }
        true
    }

    pub fn ansi_mode(&self, mode: u16) -> Option<bool> {
        match mode {
            4 => Some(self.insert),
            20 => Some(self.linefeed_newline),
            _ => None,
        }
    }
}
