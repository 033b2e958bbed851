//! Bounded history of recent levels and classifications.

use std::collections::VecDeque;

use crate::audio::{AudioLabel, AudioTypeResult, DB_FLOOR};

/// A label must appear this many times in the ring before it can win.
/// Dialogue reacts fastest; music needs more agreement before the loop pulls
/// volume down.
const MIN_SAMPLES_DIALOGUE: usize = 2;
const MIN_SAMPLES_MUSIC: usize = 3;
const MIN_SAMPLES_UNKNOWN: usize = 1;

/// Smoothed view over the last `capacity` windows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smoothed {
    pub db: f32,
    pub label: AudioLabel,
    pub confidence: f32,
}

/// Two rings of the last `capacity` dB readings and classifier results. New
/// entries evict the oldest; the rings never reallocate after construction.
pub struct HistoryWindow {
    capacity: usize,
    levels: VecDeque<f32>,
    results: VecDeque<AudioTypeResult>,
}

impl HistoryWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            levels: VecDeque::with_capacity(capacity),
            results: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, db: f32, result: AudioTypeResult) {
        if self.levels.len() == self.capacity {
            self.levels.pop_front();
        }
        if self.results.len() == self.capacity {
            self.results.pop_front();
        }
        self.levels.push_back(db);
        self.results.push_back(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn smoothed_db(&self) -> f32 {
        if self.levels.is_empty() {
            return DB_FLOOR;
        }
        self.levels.iter().sum::<f32>() / self.levels.len() as f32
    }

    /// Confidence-weighted predominant label.
    ///
    /// Each label's entries are counted and weighted by confidence; the label
    /// with the highest weighted count wins, provided its raw count reaches
    /// that label's minimum. Ties fall to dialogue rather than risk turning
    /// speech down.
    pub fn predominant(&self) -> (AudioLabel, f32) {
        let mut best: Option<(AudioLabel, f32, f32)> = None;
        for label in [AudioLabel::Dialogue, AudioLabel::Music, AudioLabel::Unknown] {
            let mut count = 0usize;
            let mut weight = 0.0f32;
            for result in &self.results {
                if result.label == label {
                    count += 1;
                    weight += result.confidence;
                }
            }
            if count < min_samples(label) {
                continue;
            }
            let mean_confidence = weight / count as f32;
            match best {
                Some((_, best_weight, _)) if weight <= best_weight => {}
                _ => best = Some((label, weight, mean_confidence)),
            }
        }
        match best {
            Some((label, _, confidence)) => (label, confidence),
            None => (AudioLabel::Unknown, 0.0),
        }
    }

    /// Smoothed view combining both rings.
    pub fn smoothed(&self) -> Smoothed {
        let (label, confidence) = self.predominant();
        Smoothed {
            db: self.smoothed_db(),
            label,
            confidence,
        }
    }

    pub fn clear(&mut self) {
        self.levels.clear();
        self.results.clear();
    }
}

fn min_samples(label: AudioLabel) -> usize {
    match label {
        AudioLabel::Dialogue => MIN_SAMPLES_DIALOGUE,
        AudioLabel::Music => MIN_SAMPLES_MUSIC,
        AudioLabel::Unknown => MIN_SAMPLES_UNKNOWN,
    }
}
