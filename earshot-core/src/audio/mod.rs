//! Audio capture sources.
//!
//! A [`CaptureSource`] pushes 16 kHz mono i16 frames to a single registered
//! handler. The handler runs on whatever thread the source delivers on (the
//! cpal callback thread, the WAV replay thread, or the caller of
//! [`ManualCapture::push`]), so it must be cheap: controllers only enqueue
//! or append there.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows, CoreAudio on
//! macOS). [`CpalCapture`] therefore owns a dedicated thread that creates,
//! plays and drops the stream; the public handle stays `Send + Sync`.

mod manual;
pub mod resample;
mod wav;

#[cfg(feature = "audio-cpal")]
mod microphone;

use std::sync::Arc;

use crate::buffering::AudioFrame;
use crate::error::Result;

pub use manual::ManualCapture;
pub use resample::RateConverter;
pub use wav::WavCapture;

#[cfg(feature = "audio-cpal")]
pub use microphone::CpalCapture;

/// Frame length delivered by the bundled sources: 100 ms at 16 kHz.
pub const FRAME_SAMPLES: usize = 1_600;

/// What a capture source reports to its handler.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    Frame(AudioFrame),
    /// The source will deliver no further frames until restarted.
    Stopped,
}

pub type CaptureHandler = Arc<dyn Fn(CaptureEvent) + Send + Sync>;

/// Platform audio input as seen by the controllers.
pub trait CaptureSource: Send + Sync + 'static {
    /// Whether at least one usable input device exists right now.
    fn is_available(&self) -> bool;

    /// Replace the frame handler. Only one handler is active at a time.
    fn set_handler(&self, handler: CaptureHandler);

    /// Begin delivering frames.
    ///
    /// # Errors
    /// `EarshotError::AudioDevice` / `EarshotError::AudioStream` when the
    /// device cannot be opened.
    fn start(&self) -> Result<()>;

    /// Stop delivering frames. Idempotent.
    fn stop(&self);
}
