use super::{CattRenderer, RendererControl, RendererLink};
use anyhow::{bail, Result};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Default)]
struct FakeInner {
    volume: u8,
    set_calls: Vec<u8>,
    get_calls: usize,
    fail_next: usize,
}

#[derive(Clone)]
struct FakeRenderer(Arc<Mutex<FakeInner>>);

impl FakeRenderer {
    fn new(volume: u8) -> Self {
        Self(Arc::new(Mutex::new(FakeInner {
            volume,
            ..FakeInner::default()
        })))
    }

    fn fail_next(&self, count: usize) {
        self.0.lock().unwrap().fail_next = count;
    }

    fn set_calls(&self) -> Vec<u8> {
        self.0.lock().unwrap().set_calls.clone()
    }
}

impl RendererControl for FakeRenderer {
    fn name(&self) -> &str {
        "fake"
    }

    fn get_volume(&mut self) -> Result<u8> {
        let mut inner = self.0.lock().unwrap();
        inner.get_calls += 1;
        if inner.fail_next > 0 {
            inner.fail_next -= 1;
            bail!("injected get failure");
        }
        Ok(inner.volume)
    }

    fn set_volume(&mut self, volume: u8) -> Result<()> {
        let mut inner = self.0.lock().unwrap();
        if inner.fail_next > 0 {
            inner.fail_next -= 1;
            bail!("injected set failure");
        }
        inner.volume = volume;
        inner.set_calls.push(volume);
        Ok(())
    }
}

fn link_with(fake: &FakeRenderer) -> RendererLink {
    // Rediscovery shells out; a missing binary makes it fail fast in tests.
    RendererLink::new(Box::new(fake.clone()), "/nonexistent/agc-test-cmd", "fake")
}

#[test]
fn set_volume_retries_transient_failures() {
    let fake = FakeRenderer::new(50);
    let mut link = link_with(&fake);
    fake.fail_next(1);

    let now = Instant::now();
    assert!(link.set_volume(55, now).is_ok());
    assert_eq!(fake.set_calls(), vec![55]);
    assert!(!link.is_degraded(Instant::now()));
}

#[test]
fn exhausted_retries_open_a_degraded_window() {
    let fake = FakeRenderer::new(50);
    let mut link = link_with(&fake);
    fake.fail_next(3);

    let now = Instant::now();
    assert!(link.set_volume(55, now).is_err());
    assert!(fake.set_calls().is_empty());
    assert_eq!(link.consecutive_failures(), 1);
    assert!(link.is_degraded(now + Duration::from_secs(4)));
    assert!(!link.is_degraded(now + Duration::from_secs(6)));
}

#[test]
fn success_resets_failure_streak() {
    let fake = FakeRenderer::new(50);
    let mut link = link_with(&fake);
    fake.fail_next(3);
    let now = Instant::now();
    assert!(link.set_volume(55, now).is_err());

    assert!(link.set_volume(56, now + Duration::from_secs(6)).is_ok());
    assert_eq!(link.consecutive_failures(), 0);
    assert!(!link.is_degraded(now + Duration::from_secs(6)));
}

#[test]
fn three_command_failures_disconnect_when_rediscovery_fails() {
    let fake = FakeRenderer::new(50);
    let mut link = link_with(&fake);

    let mut now = Instant::now();
    for _ in 0..3 {
        fake.fail_next(3);
        assert!(link.set_volume(60, now).is_err());
        now += Duration::from_secs(6);
    }
    // The rediscovery command does not exist, so the link reports degraded
    // even past the 5 s window.
    assert!(link.is_degraded(now + Duration::from_secs(30)));

    // Reconnect ticks keep failing quietly.
    link.tick(now + Duration::from_secs(30));
    assert!(link.is_degraded(now + Duration::from_secs(31)));
}

#[test]
fn get_volume_passes_through() {
    let fake = FakeRenderer::new(42);
    let mut link = link_with(&fake);
    assert_eq!(link.get_volume(Instant::now()).unwrap(), 42);
}

#[test]
fn catt_reports_missing_volume_line() {
    // `echo` succeeds but prints no status block.
    let mut renderer = CattRenderer::new("echo", "TestDevice");
    let err = renderer.get_volume().unwrap_err();
    assert!(err.to_string().contains("no volume line"));
}

#[cfg(unix)]
#[test]
fn catt_kills_commands_past_the_deadline() {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slow-catt");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "#!/bin/sh\nsleep 10").unwrap();
    drop(file);
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

    let renderer = CattRenderer::new(path.to_str().unwrap(), "TestDevice");
    let started = Instant::now();
    let err = renderer.probe().unwrap_err();
    assert!(err.to_string().contains("timed out"));
    assert!(started.elapsed() < Duration::from_secs(5));
}
