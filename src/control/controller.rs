//! Volume decisions from smoothed analysis output.
//!
//! Planning is separated from actuation: these functions only decide the next
//! volume, the loop issues it. That keeps the rate limit, silence guard, and
//! caps testable with a synthetic clock.

use std::time::Instant;

use crate::audio::AudioLabel;
use crate::state::{ControllerState, Mode, Smoothed};

// Dialogue raises aggressively once confidence clears the pivot; music pulls
// down at a gentler slope.
const DIALOGUE_MULT_BASE: f32 = 2.0;
const DIALOGUE_MULT_MAX: f32 = 3.5;
const DIALOGUE_MULT_MIN: f32 = 1.0;
const DIALOGUE_MULT_SLOPE: f32 = 3.0;
const DIALOGUE_CONF_PIVOT: f32 = 0.25;

const MUSIC_MULT_BASE: f32 = 0.8;
const MUSIC_MULT_MAX: f32 = 1.2;
const MUSIC_MULT_MIN: f32 = 0.5;
const MUSIC_MULT_SLOPE: f32 = 1.5;
const MUSIC_CONF_PIVOT: f32 = 0.5;

/// Music only gets the plain-step reduction once the level sits this far
/// above the target.
const MUSIC_OVER_TARGET_MARGIN_DB: f32 = 3.0;

/// Decide the next automatic volume, or `None` when no command should be
/// issued this tick. Never returns the current volume.
pub fn plan_auto(state: &ControllerState, smoothed: &Smoothed, now: Instant) -> Option<u8> {
    if state.mode(now) == Mode::ManualHold {
        return None;
    }
    if smoothed.db <= state.silence_threshold {
        return None;
    }
    if let Some(last) = state.last_adjust_at {
        if now.duration_since(last) < state.min_adjust_interval {
            return None;
        }
    }
    let volume = i32::from(state.current_volume?);
    let step = i32::from(state.step);

    let delta = match smoothed.label {
        AudioLabel::Dialogue => {
            let multiplier = (DIALOGUE_MULT_BASE
                + (smoothed.confidence - DIALOGUE_CONF_PIVOT) * DIALOGUE_MULT_SLOPE)
                .clamp(DIALOGUE_MULT_MIN, DIALOGUE_MULT_MAX);
            if smoothed.db < state.threshold_quiet {
                (step as f32 * multiplier).round() as i32
            } else if smoothed.db < state.target_db {
                step
            } else {
                0
            }
        }
        AudioLabel::Music => {
            let multiplier = (MUSIC_MULT_BASE
                + (smoothed.confidence - MUSIC_CONF_PIVOT) * MUSIC_MULT_SLOPE)
                .clamp(MUSIC_MULT_MIN, MUSIC_MULT_MAX);
            if smoothed.db > state.threshold_loud {
                -(step as f32 * multiplier).round() as i32
            } else if smoothed.db > state.target_db + MUSIC_OVER_TARGET_MARGIN_DB {
                -step
            } else {
                0
            }
        }
        AudioLabel::Unknown => {
            if smoothed.db > state.threshold_loud {
                -step
            } else if smoothed.db < state.threshold_quiet {
                step
            } else {
                0
            }
        }
    };
    if delta == 0 {
        return None;
    }

    // Increases stop at the baseline cap; decreases stop at the hard floor.
    let target = if delta > 0 {
        (volume + delta).clamp(i32::from(state.hard_min), i32::from(state.baseline_max))
    } else {
        (volume + delta).clamp(i32::from(state.hard_min), i32::from(state.hard_max))
    };
    let moved_in_direction = (delta > 0 && target > volume) || (delta < 0 && target < volume);
    moved_in_direction.then_some(target as u8)
}

/// Clamp a manual step; manual commands may exceed the baseline cap but never
/// the hard bounds. Returns `None` when the clamp lands on the current value.
pub fn plan_manual(state: &ControllerState, delta: i32) -> Option<u8> {
    let volume = i32::from(state.current_volume?);
    let target = (volume + delta).clamp(i32::from(state.hard_min), i32::from(state.hard_max));
    (target != volume).then_some(target as u8)
}
