//! Analysis-only pre-gain.
//!
//! The microphone may sit several meters from the source; the classifier's
//! features are scale-sensitive, so windows are scaled to a common RMS before
//! spectral analysis. The level meter always sees the raw window.

use super::EPSILON;

pub const TARGET_RMS: f32 = 0.15;

/// Cap on the pre-gain so the noise floor cannot masquerade as high-band
/// energy.
pub const MAX_GAIN: f32 = 20.0;

/// Gain that brings `rms` to [`TARGET_RMS`], bounded to `[0, MAX_GAIN]`.
pub fn analysis_gain(rms: f32) -> f32 {
    (TARGET_RMS / rms.max(EPSILON)).clamp(0.0, MAX_GAIN)
}

/// Scaled copy of `samples` for the spectral analyzer.
pub fn normalize_for_analysis(samples: &[f32], rms: f32) -> Vec<f32> {
    let gain = analysis_gain(rms);
    samples.iter().map(|s| s * gain).collect()
}
