//! Command-line parsing and validation helpers.

pub mod defaults;

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;

use defaults::{
    DEFAULT_CHUNK_DURATION_S, DEFAULT_DEVICE_NAME, DEFAULT_DIALOGUE_THRESHOLD,
    DEFAULT_MIN_ADJUST_INTERVAL_S, DEFAULT_MUSIC_THRESHOLD, DEFAULT_RENDERER_CMD,
    DEFAULT_SAMPLE_RATE, DEFAULT_SILENCE_THRESHOLD_DB, DEFAULT_SMOOTHING_WINDOW, DEFAULT_STEP,
    DEFAULT_TARGET_DB, DEFAULT_THRESHOLD_LOUD_DB, DEFAULT_THRESHOLD_QUIET_DB, DEFAULT_VOLUME_MAX,
    DEFAULT_VOLUME_BASELINE_MAX, DEFAULT_VOLUME_MIN,
};

/// CLI options for the AGC loop. Validated values keep the control loop and
/// the renderer subprocess safe.
#[derive(Debug, Parser, Clone)]
#[command(name = "agc", about = "Microphone-driven AGC for a network media renderer", version)]
pub struct AppConfig {
    /// Friendly name of the renderer to control
    #[arg(long, default_value = DEFAULT_DEVICE_NAME)]
    pub device: String,

    /// Audio input device index (default input device when omitted)
    #[arg(long = "device-index")]
    pub device_index: Option<usize>,

    /// Floor for any volume command
    #[arg(long = "volume-min", default_value_t = DEFAULT_VOLUME_MIN)]
    pub volume_min: u8,

    /// Ceiling for any volume command, manual included
    #[arg(long = "volume-max", default_value_t = DEFAULT_VOLUME_MAX)]
    pub volume_max: u8,

    /// Ceiling automatic increases must not cross
    #[arg(long = "volume-baseline-max", default_value_t = DEFAULT_VOLUME_BASELINE_MAX)]
    pub volume_baseline_max: u8,

    /// Level above which audio counts as loud (dBFS)
    #[arg(long = "threshold-loud", default_value_t = DEFAULT_THRESHOLD_LOUD_DB, allow_hyphen_values = true)]
    pub threshold_loud: f32,

    /// Level below which audio counts as quiet (dBFS)
    #[arg(long = "threshold-quiet", default_value_t = DEFAULT_THRESHOLD_QUIET_DB, allow_hyphen_values = true)]
    pub threshold_quiet: f32,

    /// Level the loop steers dialogue toward (dBFS)
    #[arg(long = "target-db", default_value_t = DEFAULT_TARGET_DB, allow_hyphen_values = true)]
    pub target_db: f32,

    /// Base volume step for automatic adjustments
    #[arg(long, default_value_t = DEFAULT_STEP)]
    pub step: u8,

    /// Print detected audio input devices and exit
    #[arg(long = "list-devices", default_value_t = false)]
    pub list_devices: bool,

    /// Analysis window duration in seconds
    #[arg(long = "chunk-duration", default_value_t = DEFAULT_CHUNK_DURATION_S)]
    pub chunk_duration: f32,

    /// Requested capture sample rate (Hz)
    #[arg(long = "sample-rate", default_value_t = DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,

    /// Minimum seconds between automatic volume commands
    #[arg(long = "min-adjust-interval", default_value_t = DEFAULT_MIN_ADJUST_INTERVAL_S)]
    pub min_adjust_interval: f32,

    /// Level at or below which no automatic command is issued (dBFS)
    #[arg(long = "silence-threshold", default_value_t = DEFAULT_SILENCE_THRESHOLD_DB, allow_hyphen_values = true)]
    pub silence_threshold: f32,

    /// Classifier score required to label a window as dialogue
    #[arg(long = "dialogue-threshold", default_value_t = DEFAULT_DIALOGUE_THRESHOLD)]
    pub dialogue_threshold: f32,

    /// Classifier score required to label a window as music
    #[arg(long = "music-threshold", default_value_t = DEFAULT_MUSIC_THRESHOLD)]
    pub music_threshold: f32,

    /// Number of windows in the smoothing history
    #[arg(long = "smoothing-window", default_value_t = DEFAULT_SMOOTHING_WINDOW)]
    pub smoothing_window: usize,

    /// CLI tool the renderer backend shells out to
    #[arg(long = "renderer-cmd", default_value = DEFAULT_RENDERER_CMD)]
    pub renderer_cmd: String,

    /// Write adaptive baselines to this file on exit
    #[arg(long = "save-state")]
    pub save_state: Option<PathBuf>,

    /// Enable file logging
    #[arg(long = "logs", env = "AGC_LOGS", default_value_t = false)]
    pub logs: bool,
}

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values against the ranges the control loop assumes.
    pub fn validate(&self) -> Result<()> {
        if self.volume_min >= self.volume_max || self.volume_max > 100 {
            bail!(
                "--volume-min ({}) must be below --volume-max ({}), both within 0..=100",
                self.volume_min,
                self.volume_max
            );
        }
        if self.volume_baseline_max < self.volume_min || self.volume_baseline_max > self.volume_max
        {
            bail!(
                "--volume-baseline-max ({}) must lie between --volume-min and --volume-max",
                self.volume_baseline_max
            );
        }
        if self.threshold_quiet >= self.threshold_loud {
            bail!(
                "--threshold-quiet ({}) must be below --threshold-loud ({})",
                self.threshold_quiet,
                self.threshold_loud
            );
        }
        if !(-80.0..=0.0).contains(&self.threshold_loud)
            || !(-80.0..=0.0).contains(&self.threshold_quiet)
        {
            bail!("--threshold-loud and --threshold-quiet must be between -80.0 and 0.0 dB");
        }
        if !(-50.0..=-10.0).contains(&self.target_db) {
            bail!(
                "--target-db must be between -50.0 and -10.0 dB, got {}",
                self.target_db
            );
        }
        if self.silence_threshold >= self.threshold_quiet {
            bail!(
                "--silence-threshold ({}) must be below --threshold-quiet ({})",
                self.silence_threshold,
                self.threshold_quiet
            );
        }
        if !(1..=10).contains(&self.step) {
            bail!("--step must be between 1 and 10, got {}", self.step);
        }
        if !(0.25..=1.0).contains(&self.chunk_duration) {
            bail!(
                "--chunk-duration must be between 0.25 and 1.0 seconds, got {}",
                self.chunk_duration
            );
        }
        if !(8_000..=96_000).contains(&self.sample_rate) {
            bail!(
                "--sample-rate must be between 8000 and 96000 Hz, got {}",
                self.sample_rate
            );
        }
        if !(0.1..=5.0).contains(&self.min_adjust_interval) {
            bail!(
                "--min-adjust-interval must be between 0.1 and 5.0 seconds, got {}",
                self.min_adjust_interval
            );
        }
        if !(0.0..=1.0).contains(&self.dialogue_threshold)
            || !(0.0..=1.0).contains(&self.music_threshold)
        {
            bail!("--dialogue-threshold and --music-threshold must be between 0.0 and 1.0");
        }
        if !(1..=20).contains(&self.smoothing_window) {
            bail!(
                "--smoothing-window must be between 1 and 20, got {}",
                self.smoothing_window
            );
        }
        if self.renderer_cmd.trim().is_empty() {
            bail!("--renderer-cmd cannot be empty");
        }
        Ok(())
    }

    /// Samples per analysis window at the configured rate.
    pub fn window_samples(&self) -> usize {
        ((self.sample_rate as f32 * self.chunk_duration).round() as usize).max(1)
    }
}
