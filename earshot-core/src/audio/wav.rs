//! WAV file replay as a capture source.
//!
//! The file is decoded with `hound` when `start` is called, mixed down to
//! mono, resampled to 16 kHz and replayed from a background thread in
//! [`FRAME_SAMPLES`]-sized frames. By default replay is paced in real time;
//! tests switch pacing off.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use hound::{SampleFormat, WavReader};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::resample::{to_i16, RateConverter};
use super::{CaptureEvent, CaptureHandler, CaptureSource, FRAME_SAMPLES};
use crate::buffering::{AudioFrame, SAMPLE_RATE};
use crate::error::{EarshotError, Result};

pub struct WavCapture {
    path: PathBuf,
    realtime: bool,
    handler: Arc<RwLock<Option<CaptureHandler>>>,
    running: Arc<AtomicBool>,
    replay: Mutex<Option<JoinHandle<()>>>,
}

impl WavCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            realtime: true,
            handler: Arc::new(RwLock::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            replay: Mutex::new(None),
        }
    }

    /// Replay as fast as the handler accepts frames.
    pub fn unpaced(mut self) -> Self {
        self.realtime = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `true` while the replay thread is delivering frames.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Block until the replay thread has exited.
    pub fn wait(&self) {
        if let Some(handle) = self.replay.lock().take() {
            let _ = handle.join();
        }
    }
}

impl CaptureSource for WavCapture {
    fn is_available(&self) -> bool {
        self.path.is_file()
    }

    fn set_handler(&self, handler: CaptureHandler) {
        *self.handler.write() = Some(handler);
    }

    fn start(&self) -> Result<()> {
        let mut replay = self.replay.lock();
        if self.running.load(Ordering::Acquire) {
            return Ok(());
        }
        if let Some(previous) = replay.take() {
            let _ = previous.join();
        }

        let samples = decode_to_16k(&self.path)?;
        info!(
            path = %self.path.display(),
            samples = samples.len(),
            "wav replay starting"
        );

        self.running.store(true, Ordering::Release);
        let running = Arc::clone(&self.running);
        let handler = Arc::clone(&self.handler);
        let realtime = self.realtime;

        let handle = std::thread::Builder::new()
            .name("earshot-wav".into())
            .spawn(move || replay_frames(samples, realtime, &running, &handler))
            .map_err(EarshotError::Io)?;
        *replay = Some(handle);
        Ok(())
    }

    fn stop(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            debug!("wav replay stop requested");
        }
    }
}

impl Drop for WavCapture {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

fn replay_frames(
    samples: Vec<i16>,
    realtime: bool,
    running: &AtomicBool,
    handler: &RwLock<Option<CaptureHandler>>,
) {
    let frame_period = Duration::from_secs_f64(FRAME_SAMPLES as f64 / SAMPLE_RATE as f64);
    let mut delivered = 0usize;

    for chunk in samples.chunks(FRAME_SAMPLES) {
        if !running.load(Ordering::Acquire) {
            break;
        }
        let current = handler.read().clone();
        if let Some(handler) = current {
            handler(CaptureEvent::Frame(AudioFrame::new(chunk.to_vec())));
            delivered += 1;
        }
        if realtime {
            std::thread::sleep(frame_period);
        }
    }

    debug!(frames = delivered, "wav replay finished");
    let current = handler.read().clone();
    if let Some(handler) = current {
        handler(CaptureEvent::Stopped);
    }
    // Lowered only after the handler has seen the end of input.
    running.store(false, Ordering::Release);
}

/// Decode a WAV file into 16 kHz mono i16.
fn decode_to_16k(path: &Path) -> Result<Vec<i16>> {
    let mut reader = WavReader::open(path)
        .map_err(|e| EarshotError::AudioDevice(format!("{}: {e}", path.display())))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| EarshotError::AudioStream(e.to_string()))?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| EarshotError::AudioStream(e.to_string()))?
        }
    };

    let mono: Vec<f32> = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    if spec.sample_rate != SAMPLE_RATE {
        warn!(
            source_rate = spec.sample_rate,
            "wav is not 16 kHz, resampling"
        );
    }
    let mut converter = RateConverter::new(spec.sample_rate, SAMPLE_RATE, 1_024)?;
    let mut resampled = converter.process(&mono);
    resampled.extend(converter.flush());
    Ok(to_i16(&resampled))
}
