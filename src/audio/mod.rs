//! Capture and per-window analysis pipeline.
//!
//! Microphone chunks are assembled into fixed-duration windows, metered,
//! normalized for analysis, and classified from FFT band energies. Every
//! stage past the assembler is a pure function of its window.

mod assembler;
mod classifier;
mod meter;
mod normalizer;
mod source;
mod spectrum;

pub use assembler::FrameAssembler;
pub use classifier::{AudioLabel, AudioTypeResult, Classifier, DecisionThresholds};
pub use meter::{dbfs, rms, DB_FLOOR};
pub use normalizer::{analysis_gain, normalize_for_analysis, MAX_GAIN, TARGET_RMS};
pub use source::{list_input_devices, open_input, AudioSource, MicSource};
pub use spectrum::{SpectrumAnalyzer, SpectrumBands, SpectrumFeatures};

/// Floor for divisions over spectral sums and RMS values.
pub(crate) const EPSILON: f32 = 1e-10;
