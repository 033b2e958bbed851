//! System microphone capture via CPAL.
//!
//! The capture callback is the only producer in the process: it downmixes
//! whatever format the device delivers to mono f32 and pushes chunks into a
//! bounded channel. When the control loop falls behind, chunks are counted as
//! dropped instead of blocking the audio thread.

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Capture backend as the control loop sees it. The engine never touches CPAL
/// directly, which keeps the loop testable with scripted sources.
pub trait AudioSource {
    /// Rate the stream actually runs at (may differ from the requested rate).
    fn sample_rate(&self) -> u32;

    /// Chunks discarded because the analysis side fell behind.
    fn overflow_count(&self) -> u64;

    /// Tear down and rebuild the stream after a stall.
    fn reopen(&mut self) -> Result<()>;
}

pub struct MicSource {
    device: cpal::Device,
    stream: cpal::Stream,
    sender: Sender<Vec<f32>>,
    dropped: Arc<AtomicU64>,
    sample_rate: u32,
}

/// Open the capture stream and hand back the chunk receiver the control loop
/// drains. `capacity` bounds the in-flight chunk queue.
pub fn open_input(
    device_index: Option<usize>,
    requested_rate: u32,
    capacity: usize,
) -> Result<(MicSource, Receiver<Vec<f32>>)> {
    let host = cpal::default_host();
    let device = match device_index {
        Some(index) => host
            .input_devices()
            .context("no input devices available")?
            .nth(index)
            .ok_or_else(|| anyhow!("input device index {index} out of range"))?,
        None => host
            .default_input_device()
            .context("no default input device available")?,
    };

    let (sender, receiver) = crossbeam_channel::bounded::<Vec<f32>>(capacity.max(4));
    let dropped = Arc::new(AtomicU64::new(0));

    let (stream, sample_rate) =
        build_capture_stream(&device, requested_rate, sender.clone(), dropped.clone())?;
    stream.play().context("failed to start capture stream")?;

    debug!(
        device = %device.name().unwrap_or_else(|_| "unknown".into()),
        sample_rate,
        "capture stream started"
    );

    Ok((
        MicSource {
            device,
            stream,
            sender,
            dropped,
            sample_rate,
        },
        receiver,
    ))
}

impl AudioSource for MicSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn overflow_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn reopen(&mut self) -> Result<()> {
        let (stream, sample_rate) = build_capture_stream(
            &self.device,
            self.sample_rate,
            self.sender.clone(),
            self.dropped.clone(),
        )?;
        stream.play().context("failed to restart capture stream")?;
        self.stream = stream;
        self.sample_rate = sample_rate;
        Ok(())
    }
}

fn build_capture_stream(
    device: &cpal::Device,
    requested_rate: u32,
    sender: Sender<Vec<f32>>,
    dropped: Arc<AtomicU64>,
) -> Result<(cpal::Stream, u32)> {
    let default_config = device
        .default_input_config()
        .context("failed to query input device configuration")?;
    let format = default_config.sample_format();
    let mut config: StreamConfig = default_config.into();
    let channels = usize::from(config.channels.max(1));

    // Prefer the requested rate; fall back to whatever the device runs at.
    let native_rate = config.sample_rate.0;
    config.sample_rate = cpal::SampleRate(requested_rate);
    match try_build(device, format, &config, channels, &sender, &dropped) {
        Ok(stream) => Ok((stream, requested_rate)),
        Err(err) => {
            warn!(requested_rate, native_rate, %err, "requested rate rejected, using device rate");
            config.sample_rate = cpal::SampleRate(native_rate);
            let stream = try_build(device, format, &config, channels, &sender, &dropped)?;
            Ok((stream, native_rate))
        }
    }
}

fn try_build(
    device: &cpal::Device,
    format: SampleFormat,
    config: &StreamConfig,
    channels: usize,
    sender: &Sender<Vec<f32>>,
    dropped: &Arc<AtomicU64>,
) -> Result<cpal::Stream> {
    let err_fn = |err| warn!(%err, "audio stream error");
    let stream = match format {
        SampleFormat::F32 => {
            let forward = chunk_forwarder(channels, sender.clone(), dropped.clone(), |s| s);
            device.build_input_stream(config, move |data: &[f32], _| forward(data), err_fn, None)?
        }
        SampleFormat::I16 => {
            let forward = chunk_forwarder(channels, sender.clone(), dropped.clone(), |s: i16| {
                s as f32 / 32_768.0
            });
            device.build_input_stream(config, move |data: &[i16], _| forward(data), err_fn, None)?
        }
        SampleFormat::U16 => {
            let forward = chunk_forwarder(channels, sender.clone(), dropped.clone(), |s: u16| {
                (s as f32 - 32_768.0) / 32_768.0
            });
            device.build_input_stream(config, move |data: &[u16], _| forward(data), err_fn, None)?
        }
        other => return Err(anyhow!("unsupported sample format: {other:?}")),
    };
    Ok(stream)
}

fn chunk_forwarder<T, F>(
    channels: usize,
    sender: Sender<Vec<f32>>,
    dropped: Arc<AtomicU64>,
    convert: F,
) -> impl Fn(&[T])
where
    T: Copy,
    F: Fn(T) -> f32 + Copy,
{
    let channels = channels.max(1);
    move |data: &[T]| {
        let chunk = downmix_to_mono(data, channels, convert);
        if let Err(TrySendError::Full(_)) = sender.try_send(chunk) {
            dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Collapse an interleaved capture buffer to mono f32. The level meter and
/// the band analysis both assume one channel, and averaging keeps a centered
/// TV source at the same level regardless of the microphone layout.
pub(super) fn downmix_to_mono<T, F>(data: &[T], channels: usize, convert: F) -> Vec<f32>
where
    T: Copy,
    F: Fn(T) -> f32,
{
    if channels <= 1 {
        return data.iter().map(|&sample| convert(sample)).collect();
    }

    let scale = 1.0 / channels as f32;
    let mut mono = Vec::with_capacity(data.len() / channels + 1);
    let mut frames = data.chunks_exact(channels);
    for frame in frames.by_ref() {
        mono.push(frame.iter().map(|&sample| convert(sample)).sum::<f32>() * scale);
    }
    // A torn frame at the buffer edge is averaged over what arrived.
    let tail = frames.remainder();
    if !tail.is_empty() {
        mono.push(tail.iter().map(|&sample| convert(sample)).sum::<f32>() / tail.len() as f32);
    }
    mono
}

/// Input device names for `--list-devices`.
pub fn list_input_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host.input_devices().context("no input devices available")?;
    let mut lines = Vec::new();
    for (index, device) in devices.enumerate() {
        let name = device.name().unwrap_or_else(|_| "Unknown Device".into());
        match device.default_input_config() {
            Ok(config) => lines.push(format!(
                "{index}: {name} ({} Hz, {} ch)",
                config.sample_rate().0,
                config.channels()
            )),
            Err(_) => lines.push(format!("{index}: {name}")),
        }
    }
    Ok(lines)
}
