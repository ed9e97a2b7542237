//! # earshot-core
//!
//! Speech-to-text orchestration: buffers captured audio, drives an opaque
//! decoder through its lifecycle, compiles key-phrase grammars and hands
//! results to a polling consumer without blocking the capture path.
//!
//! ## Architecture
//!
//! ```text
//! CaptureSource ──► FrameQueue ──► continuous worker ─┐
//!      │                                              ├─► RecognizerSession ──► RecognizerEngine
//!      └──────────► utterance buffer ──► decode job ──┘          │
//!                         (busy gate)                           ▼
//!                                          ResultQueue / ResultSlot
//!                                                               │
//!                                       SpeechRecognizer::tick ─┴─► StatusNotifier listeners
//! ```
//!
//! The capture handler never decodes. All decoder work happens on worker
//! threads; all delivery happens on the consumer tick.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod grammar;
pub mod inference;
pub mod session;
pub mod status;

// Convenience re-exports for downstream crates
pub use audio::{CaptureEvent, CaptureSource, ManualCapture, WavCapture};
pub use buffering::{AudioFrame, RecognitionResult, SAMPLE_RATE};
pub use config::{RecognitionMode, RecognizerConfig};
pub use engine::{DiagnosticsSnapshot, SpeechRecognizer};
pub use error::{EarshotError, Result};
pub use events::{SessionState, StatusEvent, TranscriptEvent};
pub use grammar::{compile, Grammar, KeyPhraseSet};
pub use inference::{EngineFactory, ModelHandle, ModelProvider, RecognizerEngine, StubBackend};
pub use status::StatusNotifier;

#[cfg(feature = "audio-cpal")]
pub use audio::CpalCapture;
