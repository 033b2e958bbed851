//! Groups arbitrary-length PCM chunks into fixed-size analysis windows.

/// Accumulates mono samples and hands out complete windows of exactly
/// `window_samples` samples. The partial remainder stays buffered, so no
/// sample is delivered twice and none is lost short of an overflow flush.
pub struct FrameAssembler {
    window_samples: usize,
    pending: Vec<f32>,
    gaps: u64,
}

impl FrameAssembler {
    pub fn new(window_samples: usize) -> Self {
        let window_samples = window_samples.max(1);
        Self {
            window_samples,
            pending: Vec::with_capacity(window_samples * 2),
            gaps: 0,
        }
    }

    /// Append a chunk and drain every complete window it finishes.
    pub fn push(&mut self, chunk: &[f32]) -> Vec<Vec<f32>> {
        self.pending.extend_from_slice(chunk);
        let mut windows = Vec::new();
        while self.pending.len() >= self.window_samples {
            windows.push(self.pending.drain(..self.window_samples).collect());
        }
        windows
    }

    /// The capture side reported dropped samples: the partial window no longer
    /// lines up with the stream, so flush it and record the gap.
    pub fn note_overflow(&mut self) {
        self.pending.clear();
        self.gaps += 1;
    }

    pub fn pending_samples(&self) -> usize {
        self.pending.len()
    }

    /// Gap events recorded since the last call.
    pub fn take_gaps(&mut self) -> u64 {
        std::mem::take(&mut self.gaps)
    }
}
