//! Event types delivered to the owning application.
//!
//! All types derive `serde::Serialize` + `serde::Deserialize` so hosts can
//! forward them over their own IPC or log them as JSON.

use serde::{Deserialize, Serialize};

use crate::buffering::RecognitionResult;

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Lifecycle of a [`SpeechRecognizer`](crate::SpeechRecognizer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Nothing loaded yet.
    #[default]
    Uninitialized,
    /// Waiting for a capture device or loading the model.
    Initializing,
    /// Capture device present and model loaded; not recognising.
    Ready,
    /// Frames are being accumulated or drained.
    Listening,
    /// A bounded decode job is in flight.
    Processing,
    /// Recognition stopped; `start` may be called again.
    Stopped,
}

// ---------------------------------------------------------------------------
// Status events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    /// State after this event.
    pub state: SessionState,
    /// Human-readable status line ("Listening", "Loading Model from: ...").
    pub message: String,
}

// ---------------------------------------------------------------------------
// Transcript events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEvent {
    /// Monotonically increasing delivery sequence number.
    pub seq: u64,
    pub result: RecognitionResult,
}
