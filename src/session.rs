//! Threaded session
//!
//! Three roles share one terminal:
//! - the I/O side pushes raw chunks through a bounded channel, and gets
//!   backpressure when the mutation thread falls behind;
//! - the mutation thread owns the `Terminal` outright, parses and applies
//!   everything queued, then publishes side effects and a fresh snapshot;
//! - the UI side drains side effects and reads the latest snapshot.
//!
//! A reset bumps an epoch and is queued carrying it. The mutation thread
//! tracks the newest epoch it has seen: chunks tagged with an older one
//! are dropped unread, and a chunk tagged with a newer one applies the
//! reset first. Bytes queued before a reset never reach the parser, and
//! bytes sent after it are never lost to it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::config::TerminalConfig;
use crate::core::{SideEffect, Snapshot};
use crate::error::SessionError;
use crate::terminal::Terminal;

#[derive(Debug)]
enum Command {
    Data { epoch: u64, bytes: Vec<u8> },
    Resize { cols: usize, rows: usize },
    Reset { epoch: u64 },
    /// Acknowledged once everything queued before it is applied
    Sync(Sender<()>),
    Shutdown,
}

/// State published by the mutation thread
#[derive(Debug)]
struct Shared {
    epoch: AtomicU64,
    effects: Mutex<Vec<SideEffect>>,
    snapshot: Mutex<Arc<Snapshot>>,
}

/// Entry point for a threaded terminal
pub struct Session;

impl Session {
    /// Start the mutation thread for a new terminal
    pub fn spawn(config: &TerminalConfig) -> Result<SessionHandle, SessionError> {
        let terminal = Terminal::new(config);
        let shared = Arc::new(Shared {
            epoch: AtomicU64::new(0),
            effects: Mutex::new(Vec::new()),
            snapshot: Mutex::new(Arc::new(terminal.snapshot())),
        });
        let (tx, rx) = bounded(config.channel_capacity.max(1));

        let thread_shared = Arc::clone(&shared);
        let thread = std::thread::Builder::new()
            .name("vt-mutation".into())
            .spawn(move || run(terminal, rx, thread_shared))
            .map_err(|e| SessionError::Spawn(e.to_string()))?;

        tracing::debug!(
            cols = config.cols,
            rows = config.rows,
            capacity = config.channel_capacity,
            "session started"
        );
        Ok(SessionHandle {
            tx,
            shared,
            thread: Some(thread),
        })
    }
}

/// Handle used by the I/O and UI sides. Dropping it stops the session.
#[derive(Debug)]
pub struct SessionHandle {
    tx: Sender<Command>,
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Queue bytes from the child, waiting while the queue is full
    pub fn put_stream_data(&self, bytes: &[u8]) -> Result<(), SessionError> {
        let epoch = self.shared.epoch.load(Ordering::Acquire);
        self.send(Command::Data {
            epoch,
            bytes: bytes.to_vec(),
        })
    }

    /// Queue bytes without waiting. `Backpressure` means the reader should
    /// pause; the bytes were not queued.
    pub fn try_put_stream_data(&self, bytes: &[u8]) -> Result<(), SessionError> {
        let epoch = self.shared.epoch.load(Ordering::Acquire);
        let command = Command::Data {
            epoch,
            bytes: bytes.to_vec(),
        };
        match self.tx.try_send(command) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(SessionError::Backpressure),
            Err(TrySendError::Disconnected(_)) => Err(SessionError::Closed),
        }
    }

    pub fn resize(&self, cols: usize, rows: usize) -> Result<(), SessionError> {
        self.send(Command::Resize { cols, rows })
    }

    /// Discard queued bytes and parser state. The grid is kept.
    pub fn reset(&self) -> Result<(), SessionError> {
        let epoch = self.shared.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!(epoch, "session reset requested");
        self.send(Command::Reset { epoch })
    }

    /// Block until everything queued so far has been applied and published
    pub fn sync(&self) -> Result<(), SessionError> {
        let (ack_tx, ack_rx) = bounded(1);
        self.send(Command::Sync(ack_tx))?;
        ack_rx.recv().map_err(|_| SessionError::Closed)
    }

    /// Take the side effects published so far, oldest first
    pub fn drain_side_effects(&self) -> Vec<SideEffect> {
        std::mem::take(&mut *self.shared.effects.lock())
    }

    /// The most recently published snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.shared.snapshot.lock())
    }

    /// Stop the mutation thread after it applies what is queued
    pub fn shutdown(mut self) -> Result<(), SessionError> {
        self.stop()
    }

    fn send(&self, command: Command) -> Result<(), SessionError> {
        self.tx.send(command).map_err(|_| SessionError::Closed)
    }

    fn stop(&mut self) -> Result<(), SessionError> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        // The thread may already be gone; joining is what matters
        let _ = self.tx.send(Command::Shutdown);
        thread
            .join()
            .map_err(|_| SessionError::Spawn("session thread panicked".into()))
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!("session did not stop cleanly: {}", e);
        }
    }
}

fn run(mut terminal: Terminal, rx: Receiver<Command>, shared: Arc<Shared>) {
    let mut current = shared.epoch.load(Ordering::Acquire);
    while let Ok(first) = rx.recv() {
        let mut dirty = false;
        let mut next = Some(first);
        // Everything already queued is handled as one batch
        while let Some(command) = next.take().or_else(|| rx.try_recv().ok()) {
            match command {
                Command::Data { epoch, bytes } => {
                    if epoch < current {
                        tracing::trace!(len = bytes.len(), "dropping bytes queued before reset");
                        continue;
                    }
                    if epoch > current {
                        // Sent after a reset that is still behind it in the queue
                        terminal.reset_session();
                        current = epoch;
                    }
                    terminal.put_stream_data(&bytes);
                    dirty = true;
                }
                Command::Resize { cols, rows } => {
                    terminal.process_pending();
                    terminal.resize(cols, rows);
                    dirty = true;
                }
                Command::Reset { epoch } => {
                    if epoch > current {
                        terminal.reset_session();
                        current = epoch;
                    }
                }
                Command::Sync(ack) => {
                    publish(&mut terminal, &shared);
                    dirty = false;
                    let _ = ack.send(());
                }
                Command::Shutdown => {
                    publish(&mut terminal, &shared);
                    tracing::debug!("session stopped");
                    return;
                }
            }
        }
        if dirty {
            publish(&mut terminal, &shared);
        }
    }
}

/// Apply whatever is decodable, then hand effects and a snapshot to the UI
fn publish(terminal: &mut Terminal, shared: &Shared) {
    terminal.process_pending();
    let effects = terminal.take_side_effects();
    if !effects.is_empty() {
        shared.effects.lock().extend(effects);
    }
    *shared.snapshot.lock() = Arc::new(terminal.snapshot());
}
