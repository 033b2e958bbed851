//! Adaptive target level learned from manual corrections.
//!
//! When the user keeps pushing volume in the same direction even though the
//! measured level already satisfies the current target, the target is wrong
//! for this room: move it one dB per manual event toward where the user
//! stops pressing. In-memory only; nothing persists across runs.

pub const TARGET_DB_MIN: f32 = -50.0;
pub const TARGET_DB_MAX: f32 = -10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualDirection {
    Up,
    Down,
}

#[derive(Debug, Default)]
pub struct AdaptiveBaseline {
    last_direction: Option<ManualDirection>,
}

impl AdaptiveBaseline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a manual adjustment and return the dB shift to apply to the
    /// target and both thresholds, if two successive events agree.
    pub fn observe(
        &mut self,
        direction: ManualDirection,
        smoothed_db: f32,
        target_db: f32,
    ) -> Option<f32> {
        let consistent = self.last_direction == Some(direction);
        self.last_direction = Some(direction);
        if !consistent {
            return None;
        }
        match direction {
            ManualDirection::Up if smoothed_db >= target_db => {
                let shifted = (target_db + 1.0).min(TARGET_DB_MAX);
                let delta = shifted - target_db;
                (delta != 0.0).then_some(delta)
            }
            ManualDirection::Down if smoothed_db <= target_db => {
                let shifted = (target_db - 1.0).max(TARGET_DB_MIN);
                let delta = shifted - target_db;
                (delta != 0.0).then_some(delta)
            }
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.last_direction = None;
    }
}
