pub mod audio;
pub mod config;
pub mod control;
pub mod error;
pub mod input;
pub mod renderer;
pub mod state;
pub mod status;
pub mod telemetry;

pub use audio::{AudioLabel, AudioTypeResult};
pub use config::AppConfig;
pub use error::FatalError;
pub use state::StatusSnapshot;
