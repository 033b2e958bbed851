//! Default values for the CLI surface and the control loop.

/// Friendly name of the renderer the loop attaches to.
pub const DEFAULT_DEVICE_NAME: &str = "AceituTele";

pub const DEFAULT_VOLUME_MIN: u8 = 20;
pub const DEFAULT_VOLUME_MAX: u8 = 80;
pub const DEFAULT_VOLUME_BASELINE_MAX: u8 = 70;

pub const DEFAULT_THRESHOLD_LOUD_DB: f32 = -15.0;
pub const DEFAULT_THRESHOLD_QUIET_DB: f32 = -35.0;
pub const DEFAULT_TARGET_DB: f32 = -20.0;
pub const DEFAULT_SILENCE_THRESHOLD_DB: f32 = -65.0;

pub const DEFAULT_STEP: u8 = 5;
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_CHUNK_DURATION_S: f32 = 0.4;
pub const DEFAULT_MIN_ADJUST_INTERVAL_S: f32 = 0.4;
pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

/// Classifier decision thresholds. The source project shipped two pairs
/// (0.20/0.40 and 0.15/0.35); the latter is the default and both are
/// reachable through `--dialogue-threshold` / `--music-threshold`.
pub const DEFAULT_DIALOGUE_THRESHOLD: f32 = 0.15;
pub const DEFAULT_MUSIC_THRESHOLD: f32 = 0.35;

/// External CLI used by the renderer backend.
pub const DEFAULT_RENDERER_CMD: &str = "catt";

/// Manual key presses move the volume by this much.
pub const MANUAL_VOLUME_STEP: i32 = 2;

/// Automatic adjustments are suppressed for this long after a manual one.
pub const MANUAL_PAUSE_SECS: u64 = 10;

/// Baseline keys shift the target and both thresholds by this many dB.
pub const BASELINE_SHIFT_DB: f32 = 1.0;
