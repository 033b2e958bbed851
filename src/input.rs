//! Terminal key capture.
//!
//! A dedicated thread reads crossterm key events and forwards the few the
//! loop cares about over a bounded channel. Everything else is ignored so a
//! stray keypress can never wedge the control loop.

use crossbeam_channel::{Sender, TrySendError};
use crossterm::event::{poll, read, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::thread;
use std::time::Duration;
use tracing::warn;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    VolumeUp,
    VolumeDown,
    BaselineUp,
    BaselineDown,
    /// Orderly quit (`q`).
    Quit,
    /// Ctrl-C; exits with the interrupted status code.
    Interrupt,
}

/// Spawn the key reader. The thread ends when the receiver goes away or a
/// shutdown key is seen.
pub fn spawn_input_thread(tx: Sender<InputEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || loop {
        match poll(POLL_INTERVAL) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(err) => {
                warn!(%err, "input poll failed");
                return;
            }
        }
        let event = match read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => key,
            Ok(_) => continue,
            Err(err) => {
                warn!(%err, "input read failed");
                return;
            }
        };
        let mapped = match event.code {
            KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(InputEvent::Interrupt)
            }
            KeyCode::Up => Some(InputEvent::VolumeUp),
            KeyCode::Down => Some(InputEvent::VolumeDown),
            KeyCode::Char('+') | KeyCode::Char('=') => Some(InputEvent::BaselineUp),
            KeyCode::Char('-') => Some(InputEvent::BaselineDown),
            KeyCode::Char('q') | KeyCode::Esc => Some(InputEvent::Quit),
            _ => None,
        };
        let Some(mapped) = mapped else { continue };
        let stop = matches!(mapped, InputEvent::Quit | InputEvent::Interrupt);
        match tx.try_send(mapped) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => return,
        }
        if stop {
            return;
        }
    })
}

/// Puts the terminal in raw mode for the process lifetime and restores it on
/// drop, panics included.
pub struct RawModeGuard {
    active: bool,
}

impl RawModeGuard {
    pub fn new() -> Self {
        let active = match enable_raw_mode() {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "raw mode unavailable, key input disabled");
                false
            }
        };
        Self { active }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Default for RawModeGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.active {
            let _ = disable_raw_mode();
        }
    }
}
