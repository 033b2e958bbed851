//! AGC entrypoint: wire capture, key input, renderer, and the control loop.
//!
//! Thread layout: the CPAL callback and the key reader produce into bounded
//! channels; this thread runs the control loop and owns all state.

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::time::Instant;

use agc::audio::{list_input_devices, open_input, AudioSource};
use agc::config::AppConfig;
use agc::control::ControlLoop;
use agc::error::FatalError;
use agc::input::{spawn_input_thread, RawModeGuard};
use agc::renderer::{discover, RendererLink};
use agc::state::AdaptiveSnapshot;
use agc::status::TerminalStatus;
use agc::telemetry;

fn main() -> ExitCode {
    let config = AppConfig::parse();
    if let Err(err) = config.validate() {
        eprintln!("agc: {err:#}");
        return ExitCode::from(2);
    }
    telemetry::init(&config);

    if config.list_devices {
        return match list_input_devices() {
            Ok(lines) => {
                println!("Available audio inputs:");
                for line in lines {
                    println!("  {line}");
                }
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("agc: {err:#}");
                ExitCode::from(4)
            }
        };
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("agc: {err:#}");
            let code = err
                .downcast_ref::<FatalError>()
                .map(FatalError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}

fn run(config: &AppConfig) -> Result<()> {
    let backend = discover(&config.renderer_cmd, &config.device)
        .map_err(|_| FatalError::RendererNotFound(config.device.clone()))?;
    let link = RendererLink::new(backend, &config.renderer_cmd, &config.device);

    let chunk_capacity = ((config.window_samples() * 4) / 1024).max(16);
    let (mut source, frames) = open_input(config.device_index, config.sample_rate, chunk_capacity)
        .map_err(|err| FatalError::AudioDeviceUnavailable(format!("{err:#}")))?;

    let (event_tx, events) = crossbeam_channel::bounded(64);

    let mut engine = ControlLoop::new(
        config,
        source.sample_rate(),
        link,
        Box::new(TerminalStatus::new()),
    );
    engine.prime_volume(Instant::now());

    let result = {
        let _raw_mode = RawModeGuard::new();
        let _input_thread = spawn_input_thread(event_tx);
        engine.run(&mut source, &frames, &events)
    };
    println!();

    if let Some(path) = &config.save_state {
        let snapshot = AdaptiveSnapshot::from_state(engine.state());
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write state to '{}'", path.display()))?;
    }
    result
}
