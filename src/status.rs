//! Status output.

use crossterm::terminal::{Clear, ClearType};
use crossterm::{cursor::MoveToColumn, QueueableCommand};
use std::io::{self, Write};

use crate::state::StatusSnapshot;

/// Consumer of loop snapshots. Implementations must not block the loop.
pub trait StatusSink: Send {
    fn publish(&mut self, snapshot: &StatusSnapshot);
}

/// Repaints a single terminal line per snapshot.
pub struct TerminalStatus {
    out: io::Stdout,
}

impl TerminalStatus {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }

    fn render(snapshot: &StatusSnapshot) -> String {
        let volume = match snapshot.volume {
            Some(volume) => format!("{volume:3}%"),
            None => "  --".to_string(),
        };
        let mut line = format!(
            "vol {volume} (max {max}) | {db:6.1} dB | {label} {confidence:.2} | {mode}",
            max = snapshot.baseline_max,
            db = snapshot.db,
            label = snapshot.label,
            confidence = snapshot.confidence,
            mode = snapshot.mode,
        );
        if snapshot.pause_remaining_s > 0.0 {
            line.push_str(&format!(" ({:.0}s)", snapshot.pause_remaining_s.ceil()));
        }
        line.push_str(&format!(" | target {:.0} dB", snapshot.target_db));
        if snapshot.degraded {
            line.push_str(" | renderer degraded");
        }
        if snapshot.gaps > 0 {
            line.push_str(&format!(" | {} gaps", snapshot.gaps));
        }
        line
    }
}

impl Default for TerminalStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSink for TerminalStatus {
    fn publish(&mut self, snapshot: &StatusSnapshot) {
        let line = Self::render(snapshot);
        let _ = self
            .out
            .queue(MoveToColumn(0))
            .and_then(|out| out.queue(Clear(ClearType::UntilNewLine)));
        let _ = self.out.write_all(line.as_bytes());
        let _ = self.out.flush();
    }
}

/// Discards snapshots; used when no terminal is attached.
pub struct NullStatus;

impl StatusSink for NullStatus {
    fn publish(&mut self, _snapshot: &StatusSnapshot) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> StatusSnapshot {
        StatusSnapshot {
            volume: Some(54),
            baseline_max: 70,
            db: -23.4,
            label: "dialogue".into(),
            confidence: 0.62,
            mode: "auto".into(),
            pause_remaining_s: 0.0,
            target_db: -20.0,
            degraded: false,
            gaps: 0,
        }
    }

    #[test]
    fn renders_core_fields() {
        let line = TerminalStatus::render(&snapshot());
        assert!(line.contains("54%"));
        assert!(line.contains("-23.4 dB"));
        assert!(line.contains("dialogue 0.62"));
        assert!(line.contains("auto"));
        assert!(line.contains("target -20 dB"));
    }

    #[test]
    fn renders_unknown_volume_and_pause() {
        let mut snapshot = snapshot();
        snapshot.volume = None;
        snapshot.mode = "manual".into();
        snapshot.pause_remaining_s = 7.2;
        snapshot.degraded = true;
        let line = TerminalStatus::render(&snapshot);
        assert!(line.contains("--"));
        assert!(line.contains("manual (8s)"));
        assert!(line.contains("renderer degraded"));
    }
}
