//! Microphone capture via cpal.
//!
//! # Design constraints
//!
//! The cpal input callback runs on an OS audio thread at elevated priority.
//! It must not block or perform I/O, so it only mixes down to mono and
//! writes into an SPSC ring buffer producer. The owner thread drains the
//! consumer, resamples to 16 kHz and hands [`FRAME_SAMPLES`]-sized frames
//! to the handler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use parking_lot::{Mutex, RwLock};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapProd, HeapRb};
use tracing::{error, info, warn};

use super::resample::{to_i16, RateConverter};
use super::{CaptureEvent, CaptureHandler, CaptureSource, FRAME_SAMPLES};
use crate::buffering::{AudioFrame, SAMPLE_RATE};
use crate::error::{EarshotError, Result};

/// Two seconds of 48 kHz mono.
const RING_CAPACITY: usize = 96_000;
const DRAIN_INTERVAL: Duration = Duration::from_millis(10);

pub struct CpalCapture {
    preferred_device: Option<String>,
    handler: Arc<RwLock<Option<CaptureHandler>>>,
    running: Arc<AtomicBool>,
    owner: Mutex<Option<JoinHandle<()>>>,
}

impl CpalCapture {
    pub fn new() -> Self {
        Self {
            preferred_device: None,
            handler: Arc::new(RwLock::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            owner: Mutex::new(None),
        }
    }

    /// Prefer the input device with this exact name, falling back to the
    /// default device when it is missing.
    pub fn with_device(mut self, name: impl Into<String>) -> Self {
        self.preferred_device = Some(name.into());
        self
    }

    /// Names of all input devices the default host reports.
    pub fn input_device_names() -> Vec<String> {
        cpal::default_host()
            .input_devices()
            .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
            .unwrap_or_default()
    }
}

impl Default for CpalCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for CpalCapture {
    fn is_available(&self) -> bool {
        cpal::default_host()
            .input_devices()
            .map(|mut devices| devices.next().is_some())
            .unwrap_or(false)
    }

    fn set_handler(&self, handler: CaptureHandler) {
        *self.handler.write() = Some(handler);
    }

    fn start(&self) -> Result<()> {
        let mut owner = self.owner.lock();
        if self.running.load(Ordering::Acquire) {
            return Ok(());
        }
        if let Some(previous) = owner.take() {
            let _ = previous.join();
        }

        self.running.store(true, Ordering::Release);
        let (opened_tx, opened_rx) = mpsc::channel();
        let running = Arc::clone(&self.running);
        let handler = Arc::clone(&self.handler);
        let preferred = self.preferred_device.clone();

        let handle = std::thread::Builder::new()
            .name("earshot-cpal".into())
            .spawn(move || run_stream(preferred.as_deref(), &running, &handler, opened_tx))
            .map_err(EarshotError::Io)?;

        match opened_rx.recv() {
            Ok(Ok(rate)) => {
                info!(sample_rate = rate, "microphone capture started");
                *owner = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::Release);
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::Release);
                let _ = handle.join();
                Err(EarshotError::AudioStream(
                    "capture thread exited before opening the stream".into(),
                ))
            }
        }
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.owner.get_mut().take() {
            let _ = handle.join();
        }
    }
}

/// Owner-thread body: open, play, drain until `running` clears, drop.
fn run_stream(
    preferred: Option<&str>,
    running: &AtomicBool,
    handler: &RwLock<Option<CaptureHandler>>,
    opened: mpsc::Sender<Result<u32>>,
) {
    let (producer, mut consumer) = HeapRb::<f32>::new(RING_CAPACITY).split();
    let (stream, device_rate) = match open_stream(preferred, producer) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = opened.send(Err(e));
            return;
        }
    };
    let mut converter = match RateConverter::new(device_rate, SAMPLE_RATE, 1_024) {
        Ok(c) => c,
        Err(e) => {
            let _ = opened.send(Err(e));
            return;
        }
    };
    let _ = opened.send(Ok(device_rate));

    let mut raw = vec![0f32; RING_CAPACITY];
    let mut pending: Vec<f32> = Vec::with_capacity(FRAME_SAMPLES * 2);

    while running.load(Ordering::Acquire) {
        let n = consumer.pop_slice(&mut raw);
        if n == 0 {
            std::thread::sleep(DRAIN_INTERVAL);
            continue;
        }
        pending.extend(converter.process(&raw[..n]));

        while pending.len() >= FRAME_SAMPLES {
            let frame = to_i16(&pending[..FRAME_SAMPLES]);
            pending.drain(..FRAME_SAMPLES);
            let current = handler.read().clone();
            if let Some(handler) = current {
                handler(CaptureEvent::Frame(AudioFrame::new(frame)));
            }
        }
    }

    if let Err(e) = stream.pause() {
        warn!("failed to pause input stream: {e}");
    }
    drop(stream);
    info!("microphone capture stopped");

    let current = handler.read().clone();
    if let Some(handler) = current {
        handler(CaptureEvent::Stopped);
    }
}

fn open_stream(preferred: Option<&str>, producer: HeapProd<f32>) -> Result<(Stream, u32)> {
    let host = cpal::default_host();
    let mut selected = None;

    if let Some(name) = preferred {
        match host.input_devices() {
            Ok(mut devices) => {
                selected = devices.find(|d| d.name().map(|n| n == name).unwrap_or(false));
                if selected.is_none() {
                    warn!("preferred input device '{name}' not found, falling back");
                }
            }
            Err(e) => warn!("failed to list input devices: {e}"),
        }
    }

    let device = match selected.or_else(|| host.default_input_device()) {
        Some(device) => device,
        None => host
            .input_devices()
            .map_err(|e| EarshotError::AudioDevice(e.to_string()))?
            .next()
            .ok_or_else(|| EarshotError::AudioDevice("no input device available".into()))?,
    };

    info!(
        device = device.name().unwrap_or_default().as_str(),
        "opening input device"
    );

    let supported = device
        .default_input_config()
        .map_err(|e| EarshotError::AudioDevice(e.to_string()))?;
    let sample_rate = supported.sample_rate().0;
    let config: StreamConfig = supported.config();

    let stream = match supported.sample_format() {
        SampleFormat::F32 => build_mono_stream::<f32>(&device, &config, producer),
        SampleFormat::I16 => build_mono_stream::<i16>(&device, &config, producer),
        SampleFormat::U16 => build_mono_stream::<u16>(&device, &config, producer),
        SampleFormat::U8 => build_mono_stream::<u8>(&device, &config, producer),
        fmt => {
            return Err(EarshotError::AudioStream(format!(
                "unsupported sample format: {fmt:?}"
            )))
        }
    }?;

    stream
        .play()
        .map_err(|e| EarshotError::AudioStream(e.to_string()))?;
    Ok((stream, sample_rate))
}

/// Build an input stream that mixes every callback down to mono f32.
fn build_mono_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: HeapProd<f32>,
) -> Result<Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels.max(1) as usize;
    let mut mix: Vec<f32> = Vec::with_capacity(8_192);

    device
        .build_input_stream(
            config,
            move |data: &[T], _info| {
                let frames = data.len() / channels;
                mix.resize(frames, 0.0);
                for (f, out) in mix.iter_mut().enumerate() {
                    let base = f * channels;
                    let sum: f32 = data[base..base + channels]
                        .iter()
                        .map(|&s| f32::from_sample(s))
                        .sum();
                    *out = sum / channels as f32;
                }
                let written = producer.push_slice(&mix);
                if written < mix.len() {
                    warn!("ring buffer full: dropped {} samples", mix.len() - written);
                }
            },
            |err| error!("audio stream error: {err}"),
            None,
        )
        .map_err(|e| EarshotError::AudioStream(e.to_string()))
}
