//! Authoritative loop state.
//!
//! Everything here is owned by the control-loop thread; analysis stages are
//! pure and the capture/input threads only talk to the loop over channels.

mod adaptive;
mod history;

pub use adaptive::{AdaptiveBaseline, ManualDirection, TARGET_DB_MAX, TARGET_DB_MIN};
pub use history::{HistoryWindow, Smoothed};

use serde::Serialize;
use std::time::{Duration, Instant};

use crate::config::defaults::MANUAL_PAUSE_SECS;
use crate::config::AppConfig;

/// Whether automatic commands are currently allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Auto,
    ManualHold,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Auto => "auto",
            Mode::ManualHold => "manual",
        }
    }
}

/// Volume-control state mutated only from the control loop.
#[derive(Debug, Clone)]
pub struct ControllerState {
    /// Last value observed from the renderer; `None` until the first
    /// successful `get_volume`.
    pub current_volume: Option<u8>,
    /// Cap automatic increases must not cross.
    pub baseline_max: u8,
    /// Cap no command may cross, manual included.
    pub hard_max: u8,
    pub hard_min: u8,
    pub target_db: f32,
    pub threshold_loud: f32,
    pub threshold_quiet: f32,
    pub silence_threshold: f32,
    pub last_adjust_at: Option<Instant>,
    pub manual_pause_until: Option<Instant>,
    pub min_adjust_interval: Duration,
    pub step: u8,
    pub last_manual_volume: Option<u8>,
    pub last_manual_db: Option<f32>,
}

impl ControllerState {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            current_volume: None,
            baseline_max: config.volume_baseline_max,
            hard_max: config.volume_max,
            hard_min: config.volume_min,
            target_db: config.target_db,
            threshold_loud: config.threshold_loud,
            threshold_quiet: config.threshold_quiet,
            silence_threshold: config.silence_threshold,
            last_adjust_at: None,
            manual_pause_until: None,
            min_adjust_interval: Duration::from_secs_f32(config.min_adjust_interval),
            step: config.step,
            last_manual_volume: None,
            last_manual_db: None,
        }
    }

    pub fn mode(&self, now: Instant) -> Mode {
        match self.manual_pause_until {
            Some(until) if now < until => Mode::ManualHold,
            _ => Mode::Auto,
        }
    }

    pub fn pause_remaining(&self, now: Instant) -> Duration {
        match self.manual_pause_until {
            Some(until) if now < until => until - now,
            _ => Duration::ZERO,
        }
    }

    /// Start (or extend) the manual hold.
    pub fn begin_manual_pause(&mut self, now: Instant) {
        self.manual_pause_until = Some(now + Duration::from_secs(MANUAL_PAUSE_SECS));
    }

    /// Shift the target level and both thresholds together, preserving their
    /// differences.
    pub fn shift_baseline(&mut self, delta_db: f32) {
        self.target_db += delta_db;
        self.threshold_loud += delta_db;
        self.threshold_quiet += delta_db;
    }
}

/// What the status sink sees on every publish.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub volume: Option<u8>,
    pub baseline_max: u8,
    pub db: f32,
    pub label: String,
    pub confidence: f32,
    pub mode: String,
    pub pause_remaining_s: f32,
    pub target_db: f32,
    pub degraded: bool,
    pub gaps: u64,
}

/// Adaptive baselines dumped by `--save-state` on exit.
#[derive(Debug, Clone, Serialize)]
pub struct AdaptiveSnapshot {
    pub target_db: f32,
    pub threshold_loud: f32,
    pub threshold_quiet: f32,
}

impl AdaptiveSnapshot {
    pub fn from_state(state: &ControllerState) -> Self {
        Self {
            target_db: state.target_db,
            threshold_loud: state.threshold_loud,
            threshold_quiet: state.threshold_quiet,
        }
    }
}
