//! Renderer backend driving a `catt`-style CLI.
//!
//! Every command shells out to `<cmd> -d <device> ...` with a hard deadline,
//! so a wedged network transport can never stall the control loop for more
//! than the timeout.

use anyhow::{anyhow, bail, Context, Result};
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

use super::RendererControl;

/// Hard deadline for one CLI invocation.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub struct CattRenderer {
    cmd: String,
    device: String,
}

impl CattRenderer {
    pub fn new(cmd: &str, device: &str) -> Self {
        Self {
            cmd: cmd.to_string(),
            device: device.to_string(),
        }
    }

    /// Check the device answers at all.
    pub fn probe(&self) -> Result<()> {
        self.run(&["status"]).map(|_| ())
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let mut child = Command::new(&self.cmd)
            .arg("-d")
            .arg(&self.device)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to run '{}'", self.cmd))?;

        let deadline = Instant::now() + COMMAND_TIMEOUT;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        bail!(
                            "'{} {}' timed out after {:?}",
                            self.cmd,
                            args.join(" "),
                            COMMAND_TIMEOUT
                        );
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(err) => {
                    let _ = child.kill();
                    return Err(anyhow!("failed to wait for '{}': {err}", self.cmd));
                }
            }
        };

        let stdout = read_pipe(child.stdout.take());
        if !status.success() {
            let stderr = read_pipe(child.stderr.take());
            bail!(
                "'{} {}' exited with {status}: {}",
                self.cmd,
                args.join(" "),
                stderr.trim()
            );
        }
        Ok(stdout)
    }
}

fn read_pipe(pipe: Option<impl Read>) -> String {
    let mut out = String::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_string(&mut out);
    }
    out
}

impl RendererControl for CattRenderer {
    fn name(&self) -> &str {
        &self.device
    }

    fn get_volume(&mut self) -> Result<u8> {
        let output = self.run(&["status"])?;
        for line in output.lines() {
            if let Some(rest) = line.trim().strip_prefix("Volume:") {
                let volume: u8 = rest
                    .trim()
                    .parse()
                    .with_context(|| format!("unparseable volume line '{line}'"))?;
                return Ok(volume.min(100));
            }
        }
        bail!("no volume line in status output for '{}'", self.device)
    }

    fn set_volume(&mut self, volume: u8) -> Result<()> {
        debug!(volume, device = %self.device, "set_volume");
        self.run(&["volume", &volume.min(100).to_string()])
            .map(|_| ())
    }
}
