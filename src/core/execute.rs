//! Token execution
//!
//! Maps every token onto the screen primitives. Replies to the application
//! (DSR, DA, DECRQM, DECRQSS, XTGETTCAP, color queries) are queued as
//! `SideEffect::WriteToHost`.

use super::cell::{Attributes, Color, Hyperlink, UnderlineStyle};
use super::charset::Charset;
use super::cursor::CursorShape;
use super::marks::MarkKind;
use super::screen::{default_palette, dynamic_index, Screen, TITLE_STACK_LIMIT};
use super::side_effect::{ClipboardOp, DynamicColor, SideEffect};
use crate::parser::{
    ColorSpec, ControlCode, CsiCommand, DcsCommand, EscCommand, ITermCommand, OscCommand,
    SgrAttribute, ShellMark, TmuxEvent, Token, TokenKind,
};

/// DA1: VT220 with sixel graphics and ANSI color
const PRIMARY_DA: &[u8] = b"\x1b[?62;4;22c";
const SECONDARY_DA: &[u8] = b"\x1b[>0;95;0c";
const TERTIARY_DA: &[u8] = b"\x1bP!|00000000\x1b\\";

fn count(n: u32) -> usize {
    n.max(1) as usize
}

impl Screen {
    /// Apply one token. Every token is accepted; ones with no meaning for
    /// the screen are ignored.
    pub fn apply(&mut self, token: &Token) {
        self.tick();
        match &token.kind {
            TokenKind::Text(text) => self.print(text),
            TokenKind::Control(code) => self.execute_control(*code),
            TokenKind::Csi(command) => self.execute_csi(command),
            TokenKind::Esc(command) => self.execute_esc(command),
            TokenKind::Osc(command) => self.execute_osc(command),
            TokenKind::Dcs(command) => self.execute_dcs(command),
            TokenKind::Tmux(TmuxEvent::Line(line)) => self.push(SideEffect::TmuxLine(line.clone())),
            TokenKind::Tmux(TmuxEvent::Exit) => self.push(SideEffect::TmuxExit),
            TokenKind::StringSequence { .. } | TokenKind::Malformed(_) => {}
        }
    }

    /// Apply tokens in order
    pub fn apply_all<'a, I>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = &'a Token>,
    {
        for token in tokens {
            self.apply(token);
        }
    }

    fn execute_control(&mut self, code: ControlCode) {
        match code {
            ControlCode::Bell => self.push(SideEffect::Bell),
            ControlCode::Backspace => self.backspace(),
            ControlCode::Tab => self.tab_forward(1),
            ControlCode::LineFeed | ControlCode::VerticalTab | ControlCode::FormFeed => {
                self.linefeed()
            }
            ControlCode::CarriageReturn => self.cursor.carriage_return(),
            ControlCode::ShiftOut => self.charsets.shift_out(),
            ControlCode::ShiftIn => self.charsets.shift_in(),
            // No answerback message is configured
            ControlCode::Enquiry => {}
            ControlCode::Null | ControlCode::Delete | ControlCode::Other(_) => {}
        }
    }

    fn execute_csi(&mut self, command: &CsiCommand) {
        use CsiCommand::*;

        match command {
            CursorUp(n) => self.cursor_up(count(*n)),
            CursorDown(n) => self.cursor_down(count(*n)),
            CursorForward(n) => self.cursor_forward(count(*n)),
            CursorBackward(n) => self.cursor_backward(count(*n)),
            CursorNextLine(n) => {
                self.cursor_down(count(*n));
                self.cursor.carriage_return();
            }
            CursorPrevLine(n) => {
                self.cursor_up(count(*n));
                self.cursor.carriage_return();
            }
            CursorColumn(col) => self.goto_col(count(*col) - 1),
            CursorColumnRelative(n) => self.cursor_forward(count(*n)),
            CursorRow(row) => self.goto_row(count(*row) - 1),
            CursorRowRelative(n) => self.cursor_down(count(*n)),
            CursorPosition { row, col } => self.goto(count(*col) - 1, count(*row) - 1),
            TabForward(n) => self.tab_forward(count(*n)),
            TabBackward(n) => self.tab_backward(count(*n)),
            // No protected-cell attribute exists, so the selective forms
            // erase the same cells
            EraseInDisplay { mode, .. } => self.erase_display(*mode),
            EraseInLine { mode, .. } => self.erase_line(*mode),
            EraseChars(n) => self.erase_chars(count(*n)),
            InsertChars(n) => self.insert_chars(count(*n)),
            DeleteChars(n) => self.delete_chars(count(*n)),
            InsertLines(n) => self.insert_lines(count(*n)),
            DeleteLines(n) => self.delete_lines(count(*n)),
            ScrollUp(n) => self.scroll_up(count(*n)),
            ScrollDown(n) => self.scroll_down(count(*n)),
            Repeat(n) => self.repeat(count(*n)),
            SetScrollRegion { top, bottom } => {
                self.set_scroll_region(*top as usize, *bottom as usize)
            }
            TabClear(mode) => self.clear_tab_stops(*mode),
            SetModes(modes) => self.set_ansi_modes(modes, true),
            ResetModes(modes) => self.set_ansi_modes(modes, false),
            SetDecModes(modes) => {
                for &mode in modes {
                    self.set_dec_mode(mode, true);
                }
            }
            ResetDecModes(modes) => {
                for &mode in modes {
                    self.set_dec_mode(mode, false);
                }
            }
            SaveDecModes(modes) => {
                for &mode in modes {
                    if let Some(value) = self.dec_mode(mode) {
                        self.saved_dec_modes.insert(mode, value);
                    }
                }
            }
            RestoreDecModes(modes) => {
                for &mode in modes {
                    if let Some(&value) = self.saved_dec_modes.get(&mode) {
                        self.set_dec_mode(mode, value);
                    }
                }
            }
            Sgr(attrs) => apply_sgr(&mut self.cursor.attrs, attrs),
            DeviceStatusReport(n) => self.device_status_report(*n),
            DecDeviceStatusReport(n) => self.dec_device_status_report(*n),
            PrimaryDeviceAttributes => self.reply(PRIMARY_DA.to_vec()),
            SecondaryDeviceAttributes => self.reply(SECONDARY_DA.to_vec()),
            TertiaryDeviceAttributes => self.reply(TERTIARY_DA.to_vec()),
            SoftReset => self.soft_reset(),
            SetCursorStyle(ps) => {
                let (shape, blinking) = CursorShape::from_decscusr(*ps);
                self.cursor.shape = shape;
                self.cursor.blinking = blinking;
                self.push(SideEffect::CursorStyleChanged { shape, blinking });
            }
            SaveCursor => self.save_cursor(),
            RestoreCursor => self.restore_cursor(),
            WindowOp { op, args } => self.window_op(*op, args),
            RequestAnsiMode(mode) => {
                let state = report_state(self.modes.ansi_mode(*mode));
                self.reply(format!("\x1b[{mode};{state}$y").into_bytes());
            }
            RequestDecMode(mode) => {
                let state = report_state(self.dec_mode(*mode));
                self.reply(format!("\x1b[?{mode};{state}$y").into_bytes());
            }
            Unsupported { .. } => tracing::debug!(?command, "ignoring CSI"),
        }
    }

    fn set_ansi_modes(&mut self, modes: &[u16], enabled: bool) {
        for &mode in modes {
            if !self.modes.set_ansi_mode(mode, enabled) {
                tracing::debug!(mode, enabled, "unknown ANSI mode");
            }
        }
    }

    /// Current value of a DEC private mode, including the ones the screen
    /// itself owns
    pub fn dec_mode(&self, mode: u16) -> Option<bool> {
        match mode {
            12 => Some(self.cursor.blinking),
            25 => Some(self.cursor.visible),
            47 | 1047 | 1049 => Some(self.on_alternate),
            1048 => Some(false),
            2026 => Some(self.synchronized),
            _ => self.modes.dec_mode(mode),
        }
    }

    fn set_dec_mode(&mut self, mode: u16, enabled: bool) {
        match mode {
            12 => {
                self.cursor.blinking = enabled;
                self.push(SideEffect::CursorStyleChanged {
                    shape: self.cursor.shape,
                    blinking: enabled,
                });
            }
            25 => self.cursor.visible = enabled,
            47 => {
                if enabled {
                    self.enter_alternate(false);
                } else {
                    self.exit_alternate();
                }
            }
            1047 => {
                if enabled {
                    self.enter_alternate(false);
                } else if self.on_alternate {
                    self.alternate.clear(Color::Default);
                    self.exit_alternate();
                }
            }
            1048 => {
                if enabled {
                    self.save_cursor();
                } else {
                    self.restore_cursor();
                }
            }
            1049 => {
                if enabled {
                    if !self.on_alternate {
                        self.save_cursor();
                        self.enter_alternate(true);
                    }
                } else if self.on_alternate {
                    self.exit_alternate();
                    self.restore_cursor();
                }
            }
            2026 => self.set_synchronized(enabled),
            _ => {
                let mouse = (self.modes.mouse_mode, self.modes.mouse_encoding);
                if !self.modes.set_dec_mode(mode, enabled) {
                    tracing::debug!(mode, enabled, "unknown DEC private mode");
                    return;
                }
                match mode {
                    // DECOM homes the cursor to the new origin
                    6 => self.goto(0, 0),
                    5 => {
                        let rows = self.rows();
                        self.grid_mut().touch_rows(0, rows);
                    }
                    _ => {}
                }
                if mouse != (self.modes.mouse_mode, self.modes.mouse_encoding) {
                    self.push(SideEffect::MouseModeChanged {
                        mode: self.modes.mouse_mode,
                        encoding: self.modes.mouse_encoding,
                    });
                }
            }
        }
    }

    fn set_synchronized(&mut self, enabled: bool) {
        if self.synchronized != enabled {
            self.synchronized = enabled;
            self.push(SideEffect::SynchronizedUpdate(enabled));
        }
    }

    fn reply(&mut self, bytes: Vec<u8>) {
        self.push(SideEffect::WriteToHost(bytes));
    }

    /// Cursor position as reported to the application (1-based, relative
    /// to the scroll region in origin mode)
    fn reported_position(&self) -> (usize, usize) {
        let row = if self.modes.origin {
            self.cursor.row.saturating_sub(self.scroll_top)
        } else {
            self.cursor.row
        };
        (row + 1, self.cursor.col + 1)
    }

    fn device_status_report(&mut self, n: u32) {
        match n {
            5 => self.reply(b"\x1b[0n".to_vec()),
            6 => {
                let (row, col) = self.reported_position();
                self.reply(format!("\x1b[{row};{col}R").into_bytes());
            }
            _ => tracing::debug!(n, "unknown DSR"),
        }
    }

    fn dec_device_status_report(&mut self, n: u32) {
        match n {
            6 => {
                let (row, col) = self.reported_position();
                self.reply(format!("\x1b[?{row};{col}R").into_bytes());
            }
            // No printer
            15 => self.reply(b"\x1b[?13n".to_vec()),
            // User-defined keys unlocked
            25 => self.reply(b"\x1b[?20n".to_vec()),
            // North American keyboard, ready
            26 => self.reply(b"\x1b[?27;1;0;0n".to_vec()),
            _ => tracing::debug!(n, "unknown DECDSR"),
        }
    }

    fn window_op(&mut self, op: u32, args: &[u32]) {
        let arg = |i: usize| args.get(i).copied().unwrap_or(0) as usize;
        match op {
            8 => {
                let rows = if arg(0) == 0 { self.rows() } else { arg(0) };
                let cols = if arg(1) == 0 { self.cols() } else { arg(1) };
                self.push(SideEffect::ResizeRequested { cols, rows });
            }
            // Never iconified
            11 => self.reply(b"\x1b[1t".to_vec()),
            18 => {
                let (rows, cols) = (self.rows(), self.cols());
                self.reply(format!("\x1b[8;{rows};{cols}t").into_bytes());
            }
            22 => {
                if self.title_stack.len() == TITLE_STACK_LIMIT {
                    self.title_stack.remove(0);
                }
                self.title_stack
                    .push((self.title.clone(), self.icon_title.clone()));
            }
            23 => {
                if let Some((title, icon)) = self.title_stack.pop() {
                    if title != self.title {
                        self.title = title.clone();
                        self.push(SideEffect::TitleChanged(title));
                    }
                    if icon != self.icon_title {
                        self.icon_title = icon.clone();
                        self.push(SideEffect::IconTitleChanged(icon));
                    }
                }
            }
            _ => tracing::debug!(op, ?args, "unsupported window operation"),
        }
    }

    fn execute_esc(&mut self, command: &EscCommand) {
        match command {
            EscCommand::SaveCursor => self.save_cursor(),
            EscCommand::RestoreCursor => self.restore_cursor(),
            EscCommand::Index => self.index(),
            EscCommand::NextLine => self.next_line(),
            EscCommand::ReverseIndex => self.reverse_index(),
            EscCommand::TabSet => self.set_tab_stop(),
            EscCommand::FullReset => self.full_reset(),
            EscCommand::KeypadApplication => self.modes.keypad_application = true,
            EscCommand::KeypadNumeric => self.modes.keypad_application = false,
            EscCommand::DesignateCharset { slot, charset } => self
                .charsets
                .designate(*slot as usize, Charset::from_designator(*charset)),
            EscCommand::SingleShift(g) => self.charsets.single_shift(*g as usize),
            EscCommand::LockingShift(g) => self.charsets.invoke(*g as usize),
            EscCommand::ScreenAlignment => self.screen_alignment(),
            EscCommand::Identify => self.reply(PRIMARY_DA.to_vec()),
            // Encoding switches take effect in the parser
            EscCommand::SelectUtf8 | EscCommand::SelectLatin1 => {}
            EscCommand::StringTerminator => {}
            EscCommand::Unsupported { .. } => tracing::trace!(?command, "ignoring escape"),
        }
    }

    fn execute_osc(&mut self, command: &OscCommand) {
        match command {
            OscCommand::SetTitleAndIcon(title) => {
                self.title = title.clone();
                self.icon_title = title.clone();
                self.push(SideEffect::TitleChanged(title.clone()));
                self.push(SideEffect::IconTitleChanged(title.clone()));
            }
            OscCommand::SetIconTitle(title) => {
                self.icon_title = title.clone();
                self.push(SideEffect::IconTitleChanged(title.clone()));
            }
            OscCommand::SetTitle(title) => {
                self.title = title.clone();
                self.push(SideEffect::TitleChanged(title.clone()));
            }
            OscCommand::SetPaletteColors(entries) => {
                for &(index, spec) in entries {
                    match spec {
                        ColorSpec::Rgb(r, g, b) => {
                            self.palette[index as usize] = (r, g, b);
                            self.push(SideEffect::PaletteChanged(Some(index)));
                        }
                        ColorSpec::Query => {
                            let rgb = color_report(self.palette[index as usize]);
                            self.reply(format!("\x1b]4;{index};{rgb}\x1b\\").into_bytes());
                        }
                    }
                }
            }
            OscCommand::ResetPaletteColors(indices) => {
                let defaults = default_palette();
                if indices.is_empty() {
                    self.palette = defaults;
                    self.push(SideEffect::PaletteChanged(None));
                } else {
                    for &index in indices {
                        self.palette[index as usize] = defaults[index as usize];
                        self.push(SideEffect::PaletteChanged(Some(index)));
                    }
                }
            }
            OscCommand::SetDynamicColors(entries) => {
                for &(which, spec) in entries {
                    match spec {
                        ColorSpec::Rgb(r, g, b) => {
                            self.dynamic_colors[dynamic_index(which)] = Some((r, g, b));
                            self.push(SideEffect::DynamicColorChanged {
                                which,
                                rgb: Some((r, g, b)),
                            });
                        }
                        ColorSpec::Query => {
                            let code = dynamic_osc(which);
                            let rgb = color_report(self.dynamic_color(which));
                            self.reply(format!("\x1b]{code};{rgb}\x1b\\").into_bytes());
                        }
                    }
                }
            }
            OscCommand::ResetDynamicColor(which) => {
                self.dynamic_colors[dynamic_index(*which)] = None;
                self.push(SideEffect::DynamicColorChanged {
                    which: *which,
                    rgb: None,
                });
            }
            OscCommand::Hyperlink { params, url } => self.set_hyperlink(params, url),
            OscCommand::CurrentDirectory(uri) => {
                let (host, path) = split_file_uri(uri);
                if let Some(host) = host {
                    self.set_remote_host(host);
                }
                self.set_working_directory(path);
            }
            OscCommand::Notify { title, body } => self.push(SideEffect::Notification {
                title: title.clone(),
                body: body.clone(),
            }),
            OscCommand::Clipboard { targets, data } => {
                for &target in targets {
                    let op = match data {
                        None => ClipboardOp::Query,
                        Some(bytes) if bytes.is_empty() => ClipboardOp::Clear,
                        Some(bytes) => ClipboardOp::Set(bytes.clone()),
                    };
                    self.push(SideEffect::Clipboard { target, op });
                }
            }
            OscCommand::ShellIntegration(mark) => self.shell_mark(*mark),
            OscCommand::ITerm(command) => self.execute_iterm(command),
            OscCommand::Unsupported { command, payload } => {
                tracing::debug!(?command, len = payload.len(), "ignoring OSC")
            }
        }
    }

    fn set_hyperlink(&mut self, params: &Option<String>, url: &str) {
        if url.is_empty() {
            self.cursor.hyperlink_id = 0;
            return;
        }
        // Links with the same url and params share one registry entry
        let existing = self
            .hyperlinks
            .iter()
            .find(|link| link.params == *params && link.url == url)
            .map(|link| link.id);
        let id = match existing {
            Some(id) => id,
            None => {
                let id = self
                    .hyperlink_base
                    .saturating_add(self.hyperlinks.len() as u32 + 1);
                self.hyperlinks.push(Hyperlink {
                    id,
                    url: url.to_string(),
                    params: params.clone(),
                });
                id
            }
        };
        self.cursor.hyperlink_id = id;
        let line = self.absolute_line_for_row(self.cursor.row);
        self.marks
            .insert(MarkKind::Hyperlink(url.to_string()), line..line + 1);
    }

    fn set_working_directory(&mut self, path: String) {
        let line = self.absolute_line_for_row(self.cursor.row);
        self.marks
            .insert(MarkKind::WorkingDirectory(path.clone()), line..line + 1);
        self.working_directory = Some(path.clone());
        self.push(SideEffect::WorkingDirectoryChanged(path));
    }

    fn set_remote_host(&mut self, host: String) {
        let line = self.absolute_line_for_row(self.cursor.row);
        self.marks.insert(MarkKind::Host(host.clone()), line..line + 1);
        self.remote_host = Some(host.clone());
        self.push(SideEffect::HostChanged(host));
    }

    fn shell_mark(&mut self, mark: ShellMark) {
        let line = self.absolute_line_for_row(self.cursor.row);
        match mark {
            ShellMark::PromptStart => {
                let id = self.marks.insert(MarkKind::Prompt, line..line + 1);
                self.open_prompt = Some(id);
                self.push(SideEffect::PromptMarked(line));
            }
            ShellMark::CommandStart => {
                self.marks.insert(MarkKind::CommandStart, line..line + 1);
            }
            ShellMark::OutputStart => {
                self.marks.insert(MarkKind::OutputStart, line..line + 1);
            }
            ShellMark::CommandFinished(exit_code) => {
                self.marks
                    .insert(MarkKind::CommandEnd { exit_code }, line..line + 1);
                // The prompt mark grows to cover the whole command
                if let Some(id) = self.open_prompt.take() {
                    self.marks.extend_to(id, line + 1);
                }
                self.push(SideEffect::CommandFinished { exit_code });
            }
        }
    }

    fn execute_iterm(&mut self, command: &ITermCommand) {
        match command {
            ITermCommand::SetMark => {
                let line = self.absolute_line_for_row(self.cursor.row);
                self.marks.insert(MarkKind::Bookmark, line..line + 1);
            }
            ITermCommand::CurrentDir(dir) => self.set_working_directory(dir.clone()),
            ITermCommand::RemoteHost(host) => self.set_remote_host(host.clone()),
            ITermCommand::ClearScrollback => self.clear_scrollback(),
            ITermCommand::StealFocus => self.push(SideEffect::StealFocus),
            ITermCommand::Other { key, .. } => tracing::debug!(key, "ignoring OSC 1337 key"),
        }
    }

    fn execute_dcs(&mut self, command: &DcsCommand) {
        match command {
            DcsCommand::RequestStatusString(setting) => self.request_status_string(setting),
            DcsCommand::RequestTermcap(names) => {
                for name in names {
                    let reply = match termcap(name) {
                        Some(value) => {
                            format!("\x1bP1+r{}={}\x1b\\", hex(name), hex(value))
                        }
                        None => format!("\x1bP0+r{}\x1b\\", hex(name)),
                    };
                    self.reply(reply.into_bytes());
                }
            }
            DcsCommand::SynchronizedUpdate(enabled) => self.set_synchronized(*enabled),
            DcsCommand::Sixel { params, data } => {
                let line = self.absolute_line_for_row(self.cursor.row);
                self.marks.insert(MarkKind::Image, line..line + 1);
                self.push(SideEffect::SixelImage {
                    params: params.clone(),
                    data: data.clone(),
                });
            }
            DcsCommand::TmuxHookStarted => tracing::debug!("tmux control mode started"),
            DcsCommand::Unsupported { .. } => tracing::debug!(?command, "ignoring DCS"),
        }
    }

    /// DECRQSS
    fn request_status_string(&mut self, setting: &[u8]) {
        let value = match setting {
            b"m" => Some(format!("{}m", sgr_string(&self.cursor.attrs))),
            b"r" => Some(format!("{};{}r", self.scroll_top + 1, self.scroll_bottom + 1)),
            b" q" => Some(format!(
                "{} q",
                self.cursor.shape.to_decscusr(self.cursor.blinking)
            )),
            _ => None,
        };
        let reply = match value {
            Some(value) => format!("\x1bP1$r{value}\x1b\\"),
            None => "\x1bP0$r\x1b\\".to_string(),
        };
        self.reply(reply.into_bytes());
    }
}

/// Apply SGR attribute changes to a pen
pub fn apply_sgr(attrs: &mut Attributes, changes: &[SgrAttribute]) {
    use SgrAttribute::*;

    for change in changes {
        let style = &mut attrs.style;
        match *change {
            Reset => attrs.reset(),
            Bold => style.bold = true,
            Faint => style.faint = true,
            Italic => style.italic = true,
            Underline(kind) => style.underline = kind,
            Blink => style.blink = true,
            Inverse => style.inverse = true,
            Hidden => style.hidden = true,
            Strikethrough => style.strikethrough = true,
            Overline => style.overline = true,
            NormalIntensity => {
                style.bold = false;
                style.faint = false;
            }
            NotItalic => style.italic = false,
            NotBlinking => style.blink = false,
            NotInverse => style.inverse = false,
            NotHidden => style.hidden = false,
            NotStrikethrough => style.strikethrough = false,
            NotOverline => style.overline = false,
            Foreground(color) => attrs.fg = color,
            Background(color) => attrs.bg = color,
            UnderlineColor(color) => attrs.underline_color = color,
        }
    }
}

/// The SGR parameter string that recreates `attrs` from a reset pen
pub fn sgr_string(attrs: &Attributes) -> String {
    let mut parts = vec!["0".to_string()];
    let style = &attrs.style;
    let flags = [
        (style.bold, "1"),
        (style.faint, "2"),
        (style.italic, "3"),
        (style.blink, "5"),
        (style.inverse, "7"),
        (style.hidden, "8"),
        (style.strikethrough, "9"),
        (style.overline, "53"),
    ];
    parts.extend(flags.iter().filter(|(on, _)| *on).map(|(_, p)| p.to_string()));
    match style.underline {
        UnderlineStyle::None => {}
        UnderlineStyle::Single => parts.push("4".into()),
        UnderlineStyle::Double => parts.push("4:2".into()),
        UnderlineStyle::Curly => parts.push("4:3".into()),
        UnderlineStyle::Dotted => parts.push("4:4".into()),
        UnderlineStyle::Dashed => parts.push("4:5".into()),
    }
    parts.extend(color_param(attrs.fg, Some((30, 90)), 38));
    parts.extend(color_param(attrs.bg, Some((40, 100)), 48));
    if let Some(color) = attrs.underline_color {
        parts.extend(color_param(color, None, 58));
    }
    parts.join(";")
}

/// `short` holds the bases of the 8 normal and 8 bright forms, when the
/// attribute has them
fn color_param(color: Color, short: Option<(u8, u8)>, extended: u8) -> Option<String> {
    match (color, short) {
        (Color::Default, _) => None,
        (Color::Indexed(n), Some((normal, _))) if n < 8 => Some(format!("{}", normal + n)),
        (Color::Indexed(n), Some((_, bright))) if n < 16 => Some(format!("{}", bright + n - 8)),
        (Color::Indexed(n), _) => Some(format!("{extended};5;{n}")),
        (Color::Rgb(r, g, b), _) => Some(format!("{extended};2;{r};{g};{b}")),
    }
}

/// 0 = not recognized, 1 = set, 2 = reset
fn report_state(value: Option<bool>) -> u8 {
    match value {
        None => 0,
        Some(true) => 1,
        Some(false) => 2,
    }
}

/// `rgb:rrrr/gggg/bbbb` as xterm reports colors
fn color_report((r, g, b): (u8, u8, u8)) -> String {
    let wide = |c: u8| u16::from(c) * 257;
    format!("rgb:{:04x}/{:04x}/{:04x}", wide(r), wide(g), wide(b))
}

fn dynamic_osc(which: DynamicColor) -> u32 {
    match which {
        DynamicColor::Foreground => 10,
        DynamicColor::Background => 11,
        DynamicColor::Cursor => 12,
    }
}

/// Split `file://host/path` into host and path. Anything else is a bare path.
fn split_file_uri(uri: &str) -> (Option<String>, String) {
    let Some(rest) = uri.strip_prefix("file://") else {
        return (None, uri.to_string());
    };
    match rest.find('/') {
        Some(slash) => {
            let host = &rest[..slash];
            let host = (!host.is_empty()).then(|| host.to_string());
            (host, rest[slash..].to_string())
        }
        None => (None, "/".to_string()),
    }
}

fn termcap(name: &str) -> Option<&'static str> {
    match name {
        "TN" | "name" => Some("xterm-256color"),
        "Co" | "colors" => Some("256"),
        "RGB" => Some("8"),
        _ => None,
    }
}

fn hex(s: &str) -> String {
    s.bytes().map(|b| format!("{b:02X}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ByteStreamBuffer;
    use crate::config::TerminalConfig;
    use crate::core::{ClipboardTarget, MouseMode};
    use crate::parser::Parser;

    fn screen(cols: usize, rows: usize) -> Screen {
        Screen::new(&TerminalConfig::with_size(cols, rows))
    }

    fn feed(screen: &mut Screen, bytes: &[u8]) {
        let mut parser = Parser::default();
        let mut buffer = ByteStreamBuffer::new();
        buffer.append(bytes);
        let mut tokens = Vec::new();
        parser.parse(&mut buffer, &mut tokens);
        screen.apply_all(&tokens);
    }

    fn replies(screen: &mut Screen) -> Vec<String> {
        screen
            .take_side_effects()
            .into_iter()
            .filter_map(|e| match e {
                SideEffect::WriteToHost(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_hello_world() {
        let mut s = screen(20, 3);
        feed(&mut s, b"Hello\r\nWorld");
        assert_eq!(s.text(), "Hello\nWorld\n");
        assert_eq!((s.cursor().col, s.cursor().row), (5, 1));
    }

    #[test]
    fn test_cursor_position() {
        let mut s = screen(20, 10);
        feed(&mut s, b"\x1b[5;10H");
        assert_eq!((s.cursor().col, s.cursor().row), (9, 4));
        feed(&mut s, b"\x1b[2A\x1b[3D");
        assert_eq!((s.cursor().col, s.cursor().row), (6, 2));
        feed(&mut s, b"\x1b[99;99H");
        assert_eq!((s.cursor().col, s.cursor().row), (19, 9));
    }

    #[test]
    fn test_sgr_colors() {
        let mut s = screen(10, 2);
        feed(&mut s, b"\x1b[1;31;44mX\x1b[0mY");
        let x = s.grid().cell(0, 0).cloned().unwrap_or_default();
        assert!(x.attrs.style.bold);
        assert_eq!(x.attrs.fg, Color::RED);
        assert_eq!(x.attrs.bg, Color::BLUE);
        let y = s.grid().cell(1, 0).cloned().unwrap_or_default();
        assert_eq!(y.attrs, Attributes::default());
    }

    #[test]
    fn test_truecolor() {
        let mut s = screen(10, 2);
        feed(&mut s, b"\x1b[38;2;255;128;0mX");
        assert_eq!(s.grid().cell(0, 0).map(|c| c.attrs.fg), Some(Color::Rgb(255, 128, 0)));
    }

    #[test]
    fn test_alternate_screen_1049_restores_cursor() {
        let mut s = screen(10, 4);
        feed(&mut s, b"main\x1b[3;4H");
        feed(&mut s, b"\x1b[?1049h");
        assert!(s.is_alternate());
        assert_eq!(s.text(), "\n\n\n");
        feed(&mut s, b"\x1b[Halt");
        feed(&mut s, b"\x1b[?1049l");
        assert!(!s.is_alternate());
        assert_eq!(s.grid().line(0).map(|l| l.text()).as_deref(), Some("main"));
        assert_eq!((s.cursor().col, s.cursor().row), (3, 2));
        let effects = s.take_side_effects();
        assert!(effects.contains(&SideEffect::AlternateScreen(true)));
        assert!(effects.contains(&SideEffect::AlternateScreen(false)));
    }

    #[test]
    fn test_alternate_screen_keeps_history_untouched() {
        let mut s = screen(5, 2);
        feed(&mut s, b"\x1b[?1049h1\r\n2\r\n3\r\n4");
        assert!(s.history().is_empty());
    }

    #[test]
    fn test_mode_47_does_not_clear() {
        let mut s = screen(5, 2);
        feed(&mut s, b"\x1b[?47hold\x1b[?47l\x1b[?47h");
        assert_eq!(s.grid().line(0).map(|l| l.text()).as_deref(), Some("old"));
    }

    #[test]
    fn test_device_status_reports() {
        let mut s = screen(10, 5);
        feed(&mut s, b"\x1b[3;4H\x1b[6n\x1b[5n\x1b[c\x1b[>c");
        assert_eq!(
            replies(&mut s),
            vec!["\x1b[3;4R", "\x1b[0n", "\x1b[?62;4;22c", "\x1b[>0;95;0c"]
        );
    }

    #[test]
    fn test_cpr_in_origin_mode() {
        let mut s = screen(10, 10);
        feed(&mut s, b"\x1b[3;8r\x1b[?6h\x1b[2;2H\x1b[6n");
        assert_eq!(replies(&mut s), vec!["\x1b[2;2R"]);
        assert_eq!(s.cursor().row, 3);
    }

    #[test]
    fn test_decrqm() {
        let mut s = screen(10, 5);
        feed(&mut s, b"\x1b[?2004h\x1b[?2004$p\x1b[?25$p\x1b[?9999$p\x1b[4$p");
        assert_eq!(
            replies(&mut s),
            vec!["\x1b[?2004;1$y", "\x1b[?25;1$y", "\x1b[?9999;0$y", "\x1b[4;2$y"]
        );
    }

    #[test]
    fn test_decrqss() {
        let mut s = screen(10, 5);
        feed(&mut s, b"\x1b[1;31m\x1bP$qm\x1b\\\x1b[2;4r\x1bP$qr\x1b\\\x1bP$qz\x1b\\");
        assert_eq!(
            replies(&mut s),
            vec!["\x1bP1$r0;1;31m\x1b\\", "\x1bP1$r2;4r\x1b\\", "\x1bP0$r\x1b\\"]
        );
    }

    #[test]
    fn test_xtgettcap() {
        let mut s = screen(10, 5);
        // "Co" and "xx" hex-encoded
        feed(&mut s, b"\x1bP+q436F;7878\x1b\\");
        assert_eq!(
            replies(&mut s),
            vec!["\x1bP1+r436F=323536\x1b\\", "\x1bP0+r7878\x1b\\"]
        );
    }

    #[test]
    fn test_dec_mode_save_restore() {
        let mut s = screen(10, 5);
        feed(&mut s, b"\x1b[?7s\x1b[?7l");
        assert!(!s.modes().autowrap);
        feed(&mut s, b"\x1b[?7r");
        assert!(s.modes().autowrap);
    }

    #[test]
    fn test_mouse_mode_side_effect() {
        let mut s = screen(10, 5);
        feed(&mut s, b"\x1b[?1002h\x1b[?1006h");
        assert_eq!(s.modes().mouse_mode, MouseMode::ButtonMotion);
        let changes = s
            .take_side_effects()
            .into_iter()
            .filter(|e| matches!(e, SideEffect::MouseModeChanged { .. }))
            .count();
        assert_eq!(changes, 2);
    }

    #[test]
    fn test_title_stack() {
        let mut s = screen(10, 5);
        feed(&mut s, b"\x1b]2;one\x07\x1b[22t\x1b]2;two\x07\x1b[23t");
        assert_eq!(s.title(), "one");
    }

    #[test]
    fn test_palette_query_and_reset() {
        let mut s = screen(10, 5);
        feed(&mut s, b"\x1b]4;1;rgb:ff/00/00\x1b\\\x1b]4;1;?\x1b\\");
        assert_eq!(s.palette_color(1), (255, 0, 0));
        assert_eq!(replies(&mut s), vec!["\x1b]4;1;rgb:ffff/0000/0000\x1b\\"]);
        feed(&mut s, b"\x1b]104\x07");
        assert_eq!(s.palette_color(1), (205, 0, 0));
        assert!(s.side_effects().contains(&SideEffect::PaletteChanged(None)));
    }

    #[test]
    fn test_palette_reset_single_index() {
        let mut s = screen(10, 5);
        feed(&mut s, b"\x1b]4;1;rgb:ff/00/00;2;rgb:00/00/ff\x07");
        s.take_side_effects();
        feed(&mut s, b"\x1b]104;1\x07");
        assert_eq!(s.palette_color(1), (205, 0, 0));
        assert_eq!(s.palette_color(2), (0, 0, 255));
        assert_eq!(s.side_effects(), &[SideEffect::PaletteChanged(Some(1))]);
    }

    #[test]
    fn test_dynamic_color_query() {
        let mut s = screen(10, 5);
        feed(&mut s, b"\x1b]11;?\x07");
        assert_eq!(replies(&mut s), vec!["\x1b]11;rgb:0000/0000/0000\x1b\\"]);
    }

    #[test]
    fn test_hyperlinks_share_ids() {
        let mut s = screen(20, 2);
        feed(&mut s, b"\x1b]8;id=a;http://x\x1b\\ab\x1b]8;;\x1b\\c\x1b]8;id=a;http://x\x1b\\d");
        let ids: Vec<u32> = (0..4)
            .map(|c| s.grid().cell(c, 0).map_or(0, |cell| cell.hyperlink_id))
            .collect();
        assert_eq!(ids, vec![1, 1, 0, 1]);
        assert_eq!(s.hyperlink(1).map(|l| l.url.as_str()), Some("http://x"));
    }

    #[test]
    fn test_repeated_links_reuse_one_entry() {
        let mut s = screen(20, 2);
        for _ in 0..5000 {
            feed(&mut s, b"\x1b]8;;http://x\x1b\\a\x1b]8;;\x1b\\");
        }
        assert_eq!(s.hyperlinks.len(), 1);
        feed(&mut s, b"\x1b]8;;http://y\x1b\\b");
        assert_eq!(s.hyperlinks.len(), 2);

        // RIS empties the registry; ids handed out before stay dead
        feed(&mut s, b"\x1bc");
        assert!(s.hyperlinks.is_empty());
        assert!(s.hyperlink(1).is_none());
        feed(&mut s, b"\x1b]8;;http://z\x1b\\c");
        let id = s.grid().cell(0, 0).map_or(0, |cell| cell.hyperlink_id);
        assert_eq!(id, 3);
        assert_eq!(s.hyperlink(id).map(|l| l.url.as_str()), Some("http://z"));
    }

    #[test]
    fn test_current_directory() {
        let mut s = screen(20, 2);
        feed(&mut s, b"\x1b]7;file://box/home/me\x07");
        assert_eq!(s.working_directory(), Some("/home/me"));
        assert_eq!(s.remote_host(), Some("box"));
        let effects = s.take_side_effects();
        assert!(effects.contains(&SideEffect::WorkingDirectoryChanged("/home/me".into())));
        assert!(effects.contains(&SideEffect::HostChanged("box".into())));
    }

    #[test]
    fn test_clipboard() {
        let mut s = screen(20, 2);
        feed(&mut s, b"\x1b]52;c;aGk=\x07\x1b]52;p;?\x07");
        assert_eq!(
            s.take_side_effects(),
            vec![
                SideEffect::Clipboard {
                    target: ClipboardTarget::Clipboard,
                    op: ClipboardOp::Set(b"hi".to_vec())
                },
                SideEffect::Clipboard {
                    target: ClipboardTarget::Primary,
                    op: ClipboardOp::Query
                },
            ]
        );
    }

    #[test]
    fn test_shell_integration_marks() {
        let mut s = screen(20, 5);
        feed(&mut s, b"\x1b]133;A\x07$ \x1b]133;B\x07ls\r\n\x1b]133;C\x07out\r\n\x1b]133;D;0\x07");
        let kinds: Vec<MarkKind> = s.marks().iter().map(|(_, m)| m.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                MarkKind::Prompt,
                MarkKind::CommandStart,
                MarkKind::OutputStart,
                MarkKind::CommandEnd { exit_code: Some(0) },
            ]
        );
        let prompt = s.marks().iter().next().map(|(_, m)| m.lines.clone());
        assert_eq!(prompt, Some(0..3));
        let effects = s.take_side_effects();
        assert!(effects.contains(&SideEffect::PromptMarked(0)));
        assert!(effects.contains(&SideEffect::CommandFinished { exit_code: Some(0) }));
    }

    #[test]
    fn test_ed3_clears_scrollback() {
        let mut s = screen(5, 2);
        feed(&mut s, b"1\r\n2\r\n3\r\n");
        assert_eq!(s.history().len(), 2);
        feed(&mut s, b"\x1b[3J");
        assert!(s.history().is_empty());
        assert_eq!(s.history().first_position(), 2);
        assert!(s.side_effects().contains(&SideEffect::ScrollbackCleared));
    }

    #[test]
    fn test_dec_special_graphics() {
        let mut s = screen(10, 2);
        feed(&mut s, b"\x1b(0lqk\x1b(Bq");
        assert_eq!(s.text(), "┌─┐q\n");
    }

    #[test]
    fn test_shift_out() {
        let mut s = screen(10, 2);
        feed(&mut s, b"\x1b)0\x0eq\x0fq");
        assert_eq!(s.text(), "─q\n");
    }

    #[test]
    fn test_repeat() {
        let mut s = screen(10, 2);
        feed(&mut s, b"x\x1b[3b");
        assert_eq!(s.text(), "xxxx\n");
    }

    #[test]
    fn test_insert_mode() {
        let mut s = screen(10, 2);
        feed(&mut s, b"abc\x1b[1G\x1b[4hX\x1b[4lY");
        assert_eq!(s.text(), "XYbc\n");
    }

    #[test]
    fn test_decaln() {
        let mut s = screen(3, 2);
        feed(&mut s, b"\x1b[2;2r\x1b#8");
        assert_eq!(s.text(), "EEE\nEEE");
        assert_eq!(s.scroll_region(), (0, 1));
    }

    #[test]
    fn test_full_reset() {
        let mut s = screen(10, 3);
        feed(&mut s, b"\x1b[?1049h\x1b[1mhi\x1b[?2004h");
        s.take_side_effects();
        feed(&mut s, b"\x1bc");
        assert!(!s.is_alternate());
        assert!(!s.modes().bracketed_paste);
        assert_eq!(s.attributes(), &Attributes::default());
        assert_eq!(s.take_side_effects(), vec![SideEffect::AlternateScreen(false)]);
    }

    #[test]
    fn test_soft_reset_keeps_screen() {
        let mut s = screen(10, 3);
        feed(&mut s, b"text\x1b[?25l\x1b[4h\x1b[!p");
        assert_eq!(s.text(), "text\n\n");
        assert!(s.cursor().visible);
        assert!(!s.modes().insert);
    }

    #[test]
    fn test_synchronized_update() {
        let mut s = screen(10, 3);
        feed(&mut s, b"\x1b[?2026h");
        assert!(s.is_synchronized());
        feed(&mut s, b"\x1bP=2s\x1b\\");
        assert!(!s.is_synchronized());
        assert_eq!(
            s.take_side_effects(),
            vec![SideEffect::SynchronizedUpdate(true), SideEffect::SynchronizedUpdate(false)]
        );
    }

    #[test]
    fn test_window_ops() {
        let mut s = screen(80, 24);
        feed(&mut s, b"\x1b[18t\x1b[8;30;0t");
        assert_eq!(
            s.take_side_effects(),
            vec![
                SideEffect::WriteToHost(b"\x1b[8;24;80t".to_vec()),
                SideEffect::ResizeRequested { cols: 80, rows: 30 },
            ]
        );
    }

    #[test]
    fn test_sgr_string_round_trips_through_parser() {
        let mut attrs = Attributes::default();
        apply_sgr(
            &mut attrs,
            &[
                SgrAttribute::Italic,
                SgrAttribute::Foreground(Color::Indexed(12)),
                SgrAttribute::Background(Color::Rgb(1, 2, 3)),
            ],
        );
        assert_eq!(sgr_string(&attrs), "0;3;94;48;2;1;2;3");
    }
}
