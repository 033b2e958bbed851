//! Failure policy around the renderer backend.
//!
//! Transient command failures are retried with a short backoff. A command
//! that still fails opens a degraded window during which the loop issues no
//! automatic commands; repeated failures trigger rediscovery while analysis
//! keeps running.

use anyhow::{anyhow, Result};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::{discover, RendererControl};

const RETRY_BACKOFF: [Duration; 2] = [Duration::from_millis(100), Duration::from_millis(400)];
const DEGRADED_WINDOW: Duration = Duration::from_secs(5);
const RECONNECT_INTERVAL: Duration = Duration::from_secs(5);
const REDISCOVER_AFTER: u32 = 3;

pub struct RendererLink {
    backend: Box<dyn RendererControl>,
    cmd: String,
    device: String,
    consecutive_failures: u32,
    degraded_until: Option<Instant>,
    connected: bool,
    last_reconnect: Option<Instant>,
}

impl RendererLink {
    pub fn new(backend: Box<dyn RendererControl>, cmd: &str, device: &str) -> Self {
        Self {
            backend,
            cmd: cmd.to_string(),
            device: device.to_string(),
            consecutive_failures: 0,
            degraded_until: None,
            connected: true,
            last_reconnect: None,
        }
    }

    /// While degraded or disconnected the loop must not issue automatic
    /// commands; analysis continues regardless.
    pub fn is_degraded(&self, now: Instant) -> bool {
        !self.connected || self.degraded_until.map_or(false, |until| now < until)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Periodic reconnect attempt while the backend is gone.
    pub fn tick(&mut self, now: Instant) {
        if self.connected {
            return;
        }
        let due = self
            .last_reconnect
            .map_or(true, |at| now.duration_since(at) >= RECONNECT_INTERVAL);
        if !due {
            return;
        }
        self.last_reconnect = Some(now);
        match discover(&self.cmd, &self.device) {
            Ok(backend) => {
                info!(device = %self.device, "renderer reconnected");
                self.backend = backend;
                self.connected = true;
                self.consecutive_failures = 0;
            }
            Err(err) => warn!(device = %self.device, %err, "renderer still unreachable"),
        }
    }

    pub fn get_volume(&mut self, now: Instant) -> Result<u8> {
        self.command(now, |backend| backend.get_volume())
    }

    pub fn set_volume(&mut self, volume: u8, now: Instant) -> Result<()> {
        self.command(now, move |backend| backend.set_volume(volume))
    }

    pub fn close(&mut self) {
        self.backend.close();
    }

    fn command<R>(
        &mut self,
        now: Instant,
        op: impl Fn(&mut dyn RendererControl) -> Result<R>,
    ) -> Result<R> {
        let mut last_err = None;
        for delay in std::iter::once(None).chain(RETRY_BACKOFF.iter().copied().map(Some)) {
            if let Some(delay) = delay {
                thread::sleep(delay);
            }
            match op(self.backend.as_mut()) {
                Ok(value) => {
                    self.consecutive_failures = 0;
                    self.degraded_until = None;
                    self.connected = true;
                    return Ok(value);
                }
                Err(err) => {
                    warn!(device = %self.device, %err, "renderer command failed");
                    last_err = Some(err);
                }
            }
        }

        self.consecutive_failures += 1;
        self.degraded_until = Some(now + DEGRADED_WINDOW);
        if self.consecutive_failures >= REDISCOVER_AFTER {
            match discover(&self.cmd, &self.device) {
                Ok(backend) => {
                    info!(device = %self.device, "renderer rediscovered");
                    self.backend = backend;
                    self.consecutive_failures = 0;
                }
                Err(err) => {
                    warn!(device = %self.device, %err, "renderer lost, will keep analyzing");
                    self.connected = false;
                    self.last_reconnect = Some(now);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow!("renderer command failed")))
    }
}
