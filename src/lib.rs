//! VT Engine
//!
//! A streaming VT100/xterm terminal-emulation engine: raw bytes from a
//! child process go in, a grid of styled cells plus an ordered queue of
//! side effects comes out. This crate provides:
//!
//! - `buffer`: the byte stream buffer between I/O and the parser
//! - `parser`: the dispatch parser, its sub-parsers and DCS hooks
//! - `core`: screen model, history, marks, side effects and snapshots
//! - `terminal`: single-threaded executor tying the three together
//! - `session`: the same executor on its own mutation thread

pub mod buffer;
pub mod config;
pub mod core;
pub mod error;
pub mod parser;
pub mod session;
pub mod terminal;

pub use buffer::ByteStreamBuffer;
pub use config::{ParserLimits, TerminalConfig};
pub use core::{Screen, SideEffect, Snapshot};
pub use error::{ConfigError, Error, HistoryError, Result, SessionError};
pub use parser::{Encoding, Parser, Token, TokenKind};
pub use session::{Session, SessionHandle};
pub use terminal::Terminal;
