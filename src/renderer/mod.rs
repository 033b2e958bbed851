//! Renderer volume control.
//!
//! The control loop only ever sees the [`RendererControl`] capability; which
//! transport backs it is a one-time construction choice. [`RendererLink`]
//! layers the retry/degraded policy on top so the loop stays oblivious to
//! transient network trouble.

mod catt;
mod link;
#[cfg(test)]
mod tests;

pub use catt::CattRenderer;
pub use link::RendererLink;

use anyhow::{Context, Result};

/// Minimal control surface of one renderer. Volumes are 0..=100.
/// `set_volume` is idempotent: repeating the current value is a no-op on the
/// device side.
pub trait RendererControl: Send {
    fn name(&self) -> &str;
    fn get_volume(&mut self) -> Result<u8>;
    fn set_volume(&mut self, volume: u8) -> Result<()>;
    fn close(&mut self) {}
}

/// Locate the named renderer and hand back a ready backend.
pub fn discover(cmd: &str, device: &str) -> Result<Box<dyn RendererControl>> {
    let renderer = CattRenderer::new(cmd, device);
    renderer
        .probe()
        .with_context(|| format!("renderer '{device}' not reachable via '{cmd}'"))?;
    Ok(Box::new(renderer))
}
