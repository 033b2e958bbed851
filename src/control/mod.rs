//! Decision engine and core loop.

mod controller;
mod engine;

pub use controller::{plan_auto, plan_manual};
pub use engine::{ControlLoop, Shutdown};
