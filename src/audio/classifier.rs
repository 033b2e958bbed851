//! Dialogue/music classification from spectral features.

use std::fmt;

use super::spectrum::SpectrumFeatures;
use crate::config::defaults::{DEFAULT_DIALOGUE_THRESHOLD, DEFAULT_MUSIC_THRESHOLD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioLabel {
    Dialogue,
    Music,
    #[default]
    Unknown,
}

impl AudioLabel {
    pub fn label(&self) -> &'static str {
        match self {
            AudioLabel::Dialogue => "dialogue",
            AudioLabel::Music => "music",
            AudioLabel::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AudioLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One window's classification.
#[derive(Debug, Clone, Copy, Default)]
pub struct AudioTypeResult {
    pub label: AudioLabel,
    pub confidence: f32,
    pub features: SpectrumFeatures,
    pub dialogue_score: f32,
    pub music_score: f32,
}

/// Minimum score a label needs before it can win.
#[derive(Debug, Clone, Copy)]
pub struct DecisionThresholds {
    pub dialogue: f32,
    pub music: f32,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            dialogue: DEFAULT_DIALOGUE_THRESHOLD,
            music: DEFAULT_MUSIC_THRESHOLD,
        }
    }
}

/// Scores dialogue against music cues. Pure: the same features always produce
/// the same result.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    thresholds: DecisionThresholds,
}

impl Classifier {
    pub fn new(thresholds: DecisionThresholds) -> Self {
        Self { thresholds }
    }

    pub fn classify(&self, features: SpectrumFeatures) -> AudioTypeResult {
        let mut dialogue = 0.0f32;
        let mut music = 0.0f32;

        // Formant energy with little bass/high competition is the strongest
        // dialogue cue.
        if features.voice_formants_ratio > 0.08 && features.background_music_ratio < 0.20 {
            dialogue += 0.35;
        } else if features.voice_formants_ratio > 0.05 {
            dialogue += 0.20;
        }

        if features.voice_energy_ratio > 0.45 {
            dialogue += 0.25;
        } else if features.voice_energy_ratio > 0.30 {
            dialogue += 0.15;
        }

        if features.bass_to_voice < 0.5 {
            dialogue += 0.15;
        }
        if features.bass_to_voice > 1.5 {
            music += 0.25;
        }

        if features.background_music_ratio > 0.40 {
            music += 0.30;
        }

        if features.spectral_variation < 0.8 {
            dialogue += 0.10;
        }
        if features.spectral_variation > 1.5 {
            music += 0.15;
        }

        if features.high_ratio > 0.15 {
            music += 0.10;
        }

        let dialogue = dialogue.clamp(0.0, 1.0);
        let music = music.clamp(0.0, 1.0);

        // Dialogue wins ties against music once over its threshold;
        // exact score equality stays Unknown.
        let (label, confidence) = if dialogue >= self.thresholds.dialogue && dialogue > music {
            (AudioLabel::Dialogue, dialogue)
        } else if music >= self.thresholds.music && music > dialogue {
            (AudioLabel::Music, music)
        } else {
            (AudioLabel::Unknown, dialogue.max(music))
        };

        AudioTypeResult {
            label,
            confidence,
            features,
            dialogue_score: dialogue,
            music_score: music,
        }
    }
}
