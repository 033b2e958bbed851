//! The core loop: ticks the pipeline, dispatches user input, serves
//! snapshots.
//!
//! One thread owns every piece of mutable state. The capture callback and the
//! key reader only feed bounded channels; the loop drains them, so window
//! `W_i` always finishes (classification and decision) before `W_{i+1}`
//! starts, and user events seen between windows apply before the next window
//! is classified.

use anyhow::Result;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::audio::{
    dbfs, normalize_for_analysis, rms, AudioSource, AudioTypeResult, Classifier,
    DecisionThresholds, FrameAssembler, SpectrumAnalyzer, SpectrumFeatures,
};
use crate::config::defaults::{BASELINE_SHIFT_DB, MANUAL_VOLUME_STEP};
use crate::config::AppConfig;
use crate::control::{plan_auto, plan_manual};
use crate::error::FatalError;
use crate::input::InputEvent;
use crate::renderer::RendererLink;
use crate::state::{
    AdaptiveBaseline, ControllerState, HistoryWindow, ManualDirection, Smoothed, StatusSnapshot,
};
use crate::status::StatusSink;

const RECV_TIMEOUT: Duration = Duration::from_millis(100);
const SNAPSHOT_INTERVAL: Duration = Duration::from_millis(100);

/// The capture side is considered lost after this long without a chunk.
const CAPTURE_STALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Quit,
    Interrupted,
}

pub struct ControlLoop {
    state: ControllerState,
    assembler: FrameAssembler,
    analyzer: SpectrumAnalyzer,
    classifier: Classifier,
    history: HistoryWindow,
    adaptive: AdaptiveBaseline,
    link: RendererLink,
    sink: Box<dyn StatusSink>,
    last_snapshot: Option<Instant>,
    seen_overflows: u64,
    gap_total: u64,
}

impl ControlLoop {
    /// `sample_rate` is the rate the capture stream actually runs at, which
    /// may differ from the requested one.
    pub fn new(
        config: &AppConfig,
        sample_rate: u32,
        link: RendererLink,
        sink: Box<dyn StatusSink>,
    ) -> Self {
        let window_samples =
            ((sample_rate as f32 * config.chunk_duration).round() as usize).max(1);
        Self {
            state: ControllerState::from_config(config),
            assembler: FrameAssembler::new(window_samples),
            analyzer: SpectrumAnalyzer::new(sample_rate, window_samples),
            classifier: Classifier::new(DecisionThresholds {
                dialogue: config.dialogue_threshold,
                music: config.music_threshold,
            }),
            history: HistoryWindow::new(config.smoothing_window),
            adaptive: AdaptiveBaseline::new(),
            link,
            sink,
            last_snapshot: None,
            seen_overflows: 0,
            gap_total: 0,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Ask the renderer for its volume so the first decision has a base.
    pub fn prime_volume(&mut self, now: Instant) {
        match self.link.get_volume(now) {
            Ok(volume) => {
                info!(volume, "renderer volume");
                self.state.current_volume = Some(volume);
            }
            Err(err) => warn!(%err, "could not read initial volume"),
        }
    }

    /// Drive the pipeline until a shutdown event arrives or capture dies.
    pub fn run(
        &mut self,
        source: &mut dyn AudioSource,
        frames: &Receiver<Vec<f32>>,
        events: &Receiver<InputEvent>,
    ) -> Result<()> {
        let mut last_chunk = Instant::now();
        let mut reopened = false;
        let shutdown = 'ticks: loop {
            let now = Instant::now();
            self.link.tick(now);
            if let Some(shutdown) = self.drain_events(events) {
                break 'ticks shutdown;
            }

            match frames.recv_timeout(RECV_TIMEOUT) {
                Ok(chunk) => {
                    last_chunk = Instant::now();
                    reopened = false;
                    self.check_overflow(source);
                    for window in self.assembler.push(&chunk) {
                        if let Some(shutdown) = self.drain_events(events) {
                            break 'ticks shutdown;
                        }
                        self.process_window(&window, Instant::now());
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if last_chunk.elapsed() >= CAPTURE_STALL_TIMEOUT {
                        if reopened {
                            return Err(FatalError::AudioDeviceUnavailable(
                                "capture stalled and reopen did not recover".into(),
                            )
                            .into());
                        }
                        warn!("no audio for {CAPTURE_STALL_TIMEOUT:?}, reopening capture");
                        source.reopen().map_err(|err| {
                            FatalError::AudioDeviceUnavailable(format!("{err:#}"))
                        })?;
                        reopened = true;
                        last_chunk = Instant::now();
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(
                        FatalError::AudioDeviceUnavailable("capture stream closed".into()).into(),
                    );
                }
            }
            self.maybe_publish(Instant::now());
        };

        // One last snapshot so the sink shows the final state; no command is
        // issued past this point.
        self.publish(Instant::now());
        self.link.close();
        match shutdown {
            Shutdown::Quit => Ok(()),
            Shutdown::Interrupted => Err(FatalError::Interrupted.into()),
        }
    }

    fn drain_events(&mut self, events: &Receiver<InputEvent>) -> Option<Shutdown> {
        while let Ok(event) = events.try_recv() {
            if let Some(shutdown) = self.handle_event(event, Instant::now()) {
                return Some(shutdown);
            }
        }
        None
    }

    /// Run one window through meter → normalizer → spectrum → classifier,
    /// update the history, and consult the volume decision once.
    pub fn process_window(&mut self, window: &[f32], now: Instant) {
        let db = dbfs(window);
        // Silent windows skip classification: amplified noise floor would
        // otherwise score as dialogue. They still enter the history so the
        // smoothed level decays toward the floor.
        let result = if db <= self.state.silence_threshold {
            AudioTypeResult::default()
        } else {
            let normalized = normalize_for_analysis(window, rms(window));
            let bands = self.analyzer.analyze(&normalized);
            self.classifier.classify(SpectrumFeatures::from_bands(&bands))
        };
        self.history.push(db, result);

        let smoothed = self.history.smoothed();
        debug!(
            db,
            label = %result.label,
            confidence = result.confidence,
            smoothed_db = smoothed.db,
            smoothed_label = %smoothed.label,
            "window"
        );
        self.auto_adjust(&smoothed, now);
    }

    fn auto_adjust(&mut self, smoothed: &Smoothed, now: Instant) {
        if self.link.is_degraded(now) {
            return;
        }
        if self.state.current_volume.is_none() {
            match self.link.get_volume(now) {
                Ok(volume) => self.state.current_volume = Some(volume),
                Err(_) => return,
            }
        }
        let Some(target) = plan_auto(&self.state, smoothed, now) else {
            return;
        };
        match self.link.set_volume(target, now) {
            Ok(()) => {
                info!(
                    volume = target,
                    label = %smoothed.label,
                    db = smoothed.db,
                    "volume adjusted"
                );
                self.state.current_volume = Some(target);
                self.state.last_adjust_at = Some(now);
            }
            // State untouched: the next window may retry after the degraded
            // window closes.
            Err(err) => warn!(%err, volume = target, "automatic volume change failed"),
        }
    }

    /// Returns the shutdown kind when the event ends the loop.
    pub fn handle_event(&mut self, event: InputEvent, now: Instant) -> Option<Shutdown> {
        match event {
            InputEvent::VolumeUp => {
                self.manual_adjust(MANUAL_VOLUME_STEP, ManualDirection::Up, now);
                None
            }
            InputEvent::VolumeDown => {
                self.manual_adjust(-MANUAL_VOLUME_STEP, ManualDirection::Down, now);
                None
            }
            InputEvent::BaselineUp => {
                // An explicit reposition invalidates the learned press streak.
                self.adaptive.reset();
                self.state.shift_baseline(BASELINE_SHIFT_DB);
                info!(target_db = self.state.target_db, "baseline raised");
                None
            }
            InputEvent::BaselineDown => {
                self.adaptive.reset();
                self.state.shift_baseline(-BASELINE_SHIFT_DB);
                info!(target_db = self.state.target_db, "baseline lowered");
                None
            }
            InputEvent::Quit => Some(Shutdown::Quit),
            InputEvent::Interrupt => Some(Shutdown::Interrupted),
        }
    }

    fn manual_adjust(&mut self, delta: i32, direction: ManualDirection, now: Instant) {
        self.state.begin_manual_pause(now);
        if self.state.current_volume.is_none() {
            match self.link.get_volume(now) {
                Ok(volume) => self.state.current_volume = Some(volume),
                Err(err) => {
                    warn!(%err, "manual adjustment dropped, volume unknown");
                    return;
                }
            }
        }

        let smoothed_db = self.history.smoothed_db();
        if let Some(shift) = self.adaptive.observe(direction, smoothed_db, self.state.target_db) {
            info!(shift, target_db = self.state.target_db + shift, "baseline adapted");
            self.state.shift_baseline(shift);
        }
        self.state.last_manual_db = Some(smoothed_db);

        let Some(target) = plan_manual(&self.state, delta) else {
            return;
        };
        match self.link.set_volume(target, now) {
            Ok(()) => {
                info!(volume = target, "manual volume change");
                self.state.current_volume = Some(target);
                self.state.last_manual_volume = Some(target);
            }
            Err(err) => warn!(%err, volume = target, "manual volume change failed"),
        }
    }

    fn check_overflow(&mut self, source: &dyn AudioSource) {
        let overflows = source.overflow_count();
        if overflows > self.seen_overflows {
            warn!(
                dropped = overflows - self.seen_overflows,
                "capture overflow, flushing partial window"
            );
            self.seen_overflows = overflows;
            self.assembler.note_overflow();
        }
        self.gap_total += self.assembler.take_gaps();
    }

    pub fn maybe_publish(&mut self, now: Instant) {
        let due = self
            .last_snapshot
            .map_or(true, |at| now.duration_since(at) >= SNAPSHOT_INTERVAL);
        if due {
            self.publish(now);
        }
    }

    fn publish(&mut self, now: Instant) {
        self.last_snapshot = Some(now);
        let smoothed = self.history.smoothed();
        let snapshot = StatusSnapshot {
            volume: self.state.current_volume,
            baseline_max: self.state.baseline_max,
            db: smoothed.db,
            label: smoothed.label.to_string(),
            confidence: smoothed.confidence,
            mode: self.state.mode(now).label().to_string(),
            pause_remaining_s: self.state.pause_remaining(now).as_secs_f32(),
            target_db: self.state.target_db,
            degraded: self.link.is_degraded(now),
            gaps: self.gap_total,
        };
        self.sink.publish(&snapshot);
    }
}
