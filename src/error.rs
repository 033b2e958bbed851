use thiserror::Error;

/// Faults that end the process. The binary maps each variant to its exit code;
/// everything transient stays inside the control loop.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("renderer '{0}' not found")]
    RendererNotFound(String),

    #[error("audio device unavailable: {0}")]
    AudioDeviceUnavailable(String),

    #[error("interrupted")]
    Interrupted,
}

impl FatalError {
    pub fn exit_code(&self) -> i32 {
        match self {
            FatalError::RendererNotFound(_) => 3,
            FatalError::AudioDeviceUnavailable(_) => 4,
            FatalError::Interrupted => 130,
        }
    }
}
