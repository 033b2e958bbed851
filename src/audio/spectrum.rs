//! FFT band-energy reduction.
//!
//! A forward FFT over the full analysis window, magnitudes of the
//! non-negative-frequency half, and magnitude sums over the fixed band plan
//! below. No window function is applied before the transform; the band sums
//! only feed ratio features, which tolerate the leakage.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::EPSILON;

/// Band plan (Hz, half-open ranges). The voice bands straddle the fundamental,
/// the F1/F2 formant region, and the upper harmonics.
const BASS_HZ: (f32, f32) = (20.0, 200.0);
const VOICE_FUND_HZ: (f32, f32) = (200.0, 500.0);
const VOICE_FORMANTS_HZ: (f32, f32) = (500.0, 2000.0);
const VOICE_HARMONICS_HZ: (f32, f32) = (2000.0, 4000.0);
const HIGH_MID_HZ: (f32, f32) = (4000.0, 8000.0);
const HIGH_HZ_LOW: f32 = 8000.0;

/// Magnitude sums over the positive-frequency half-spectrum of one window.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpectrumBands {
    pub total: f32,
    pub bass: f32,
    pub voice_fund: f32,
    pub voice_formants: f32,
    pub voice_harmonics: f32,
    pub high_mid: f32,
    pub high: f32,
    /// Mean of the half-spectrum magnitudes.
    pub mean: f32,
    /// Population standard deviation of the half-spectrum magnitudes.
    pub stddev: f32,
}

/// Derived, unitless features the classifier consumes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpectrumFeatures {
    pub voice_formants_ratio: f32,
    pub voice_energy_ratio: f32,
    pub bass_ratio: f32,
    pub high_ratio: f32,
    pub bass_to_voice: f32,
    pub background_music_ratio: f32,
    pub spectral_variation: f32,
}

impl SpectrumFeatures {
    pub fn from_bands(bands: &SpectrumBands) -> Self {
        let total = bands.total.max(EPSILON);
        let voice = (bands.voice_fund + bands.voice_formants + bands.voice_harmonics).max(EPSILON);
        Self {
            voice_formants_ratio: bands.voice_formants / total,
            voice_energy_ratio: (bands.voice_fund + bands.voice_formants + bands.voice_harmonics)
                / total,
            bass_ratio: bands.bass / total,
            high_ratio: bands.high / total,
            bass_to_voice: bands.bass / voice,
            background_music_ratio: ((bands.bass + bands.high) / voice).min(1.0),
            spectral_variation: bands.stddev / bands.mean.max(EPSILON),
        }
    }
}

/// Plans the FFT once for the configured window length and reuses the buffer
/// across windows.
pub struct SpectrumAnalyzer {
    sample_rate: u32,
    window_samples: usize,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    pub fn new(sample_rate: u32, window_samples: usize) -> Self {
        let window_samples = window_samples.max(1);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(window_samples);
        Self {
            sample_rate,
            window_samples,
            fft,
            buffer: vec![Complex::default(); window_samples],
        }
    }

    /// Band reduction of one normalized window. `samples` shorter than the
    /// window length are zero-padded; longer input is truncated.
    pub fn analyze(&mut self, samples: &[f32]) -> SpectrumBands {
        let n = self.window_samples;
        for (slot, sample) in self
            .buffer
            .iter_mut()
            .zip(samples.iter().copied().chain(std::iter::repeat(0.0)))
        {
            *slot = Complex::new(sample, 0.0);
        }
        self.fft.process(&mut self.buffer);

        let half = n / 2 + 1;
        let bin_hz = self.sample_rate as f32 / n as f32;
        let nyquist = self.sample_rate as f32 / 2.0;

        let mut bands = SpectrumBands::default();
        let mut sum = 0.0f32;
        let mut sum_sq = 0.0f32;
        for (k, value) in self.buffer[..half].iter().enumerate() {
            let magnitude = value.norm();
            sum += magnitude;
            sum_sq += magnitude * magnitude;

            let freq = k as f32 * bin_hz;
            if freq >= BASS_HZ.0 && freq < BASS_HZ.1 {
                bands.bass += magnitude;
            } else if freq < VOICE_FUND_HZ.1 && freq >= VOICE_FUND_HZ.0 {
                bands.voice_fund += magnitude;
            } else if freq < VOICE_FORMANTS_HZ.1 && freq >= VOICE_FORMANTS_HZ.0 {
                bands.voice_formants += magnitude;
            } else if freq < VOICE_HARMONICS_HZ.1 && freq >= VOICE_HARMONICS_HZ.0 {
                bands.voice_harmonics += magnitude;
            } else if freq < HIGH_MID_HZ.1 && freq >= HIGH_MID_HZ.0 {
                bands.high_mid += magnitude;
            } else if freq >= HIGH_HZ_LOW && freq < nyquist {
                bands.high += magnitude;
            }
        }

        bands.total = bands.bass
            + bands.voice_fund
            + bands.voice_formants
            + bands.voice_harmonics
            + bands.high_mid
            + bands.high;

        let count = half as f32;
        bands.mean = sum / count;
        let variance = (sum_sq / count - bands.mean * bands.mean).max(0.0);
        bands.stddev = variance.sqrt();
        bands
    }

    pub fn window_samples(&self) -> usize {
        self.window_samples
    }
}
