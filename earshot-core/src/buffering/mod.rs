//! Hand-off structures between the capture callback, decode workers and the
//! consumer tick.
//!
//! ```text
//! capture thread ──push──► FrameQueue ──try_pop──► worker
//! worker ──push──► ResultQueue (continuous) ──drain──► consumer
//! worker ──publish──► ResultSlot (bounded) ──take_changed──► consumer
//! ```

pub mod frame;
pub mod queue;
pub mod results;

pub use frame::AudioFrame;
pub use queue::FrameQueue;
pub use results::{RecognitionResult, ResultKind, ResultQueue, ResultSlot};

/// Fixed decoder sample rate (Hz). Not configurable.
pub const SAMPLE_RATE: u32 = 16_000;
