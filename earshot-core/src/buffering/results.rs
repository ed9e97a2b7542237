//! Decoder output and the two ways it travels to the consumer tick.

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Distinguishes provisional decoder output from committed output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Partial,
    Final,
}

/// Decoder result payload. The JSON is treated as opaque text except for
/// [`RecognitionResult::text`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResult {
    pub json: String,
    pub kind: ResultKind,
}

impl RecognitionResult {
    pub fn final_result(json: impl Into<String>) -> Self {
        Self {
            json: json.into(),
            kind: ResultKind::Final,
        }
    }

    pub fn partial(json: impl Into<String>) -> Self {
        Self {
            json: json.into(),
            kind: ResultKind::Partial,
        }
    }

    pub fn is_final(&self) -> bool {
        self.kind == ResultKind::Final
    }

    /// Best hypothesis text, if the payload carries one.
    ///
    /// Understands both the single-result shape `{"text": ...}` and the
    /// alternatives shape `{"alternatives": [{"text": ...}, ...]}`.
    pub fn text(&self) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(&self.json).ok()?;
        let text = value.get("text").or_else(|| {
            value
                .get("alternatives")
                .and_then(|alts| alts.get(0))
                .and_then(|best| best.get("text"))
        })?;
        text.as_str().map(str::to_owned)
    }
}

/// Unbounded FIFO of results (continuous mode).
#[derive(Clone)]
pub struct ResultQueue {
    tx: Sender<RecognitionResult>,
    rx: Receiver<RecognitionResult>,
}

impl ResultQueue {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    pub fn push(&self, result: RecognitionResult) {
        // Both halves live in `self`, so the channel cannot be disconnected.
        let _ = self.tx.send(result);
    }

    /// Everything currently available, oldest first.
    pub fn drain(&self) -> Vec<RecognitionResult> {
        self.rx.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for ResultQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct SlotInner {
    latest: Option<RecognitionResult>,
    delivered: Option<RecognitionResult>,
}

/// Single latest-value cell shared by the bounded decode job (writer) and the
/// consumer tick (reader). Both sides go through the same lock.
#[derive(Default)]
pub struct ResultSlot {
    inner: Mutex<SlotInner>,
}

impl ResultSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, result: RecognitionResult) {
        self.inner.lock().latest = Some(result);
    }

    /// Returns the latest value if it differs from the last one handed out,
    /// and records it as delivered.
    pub fn take_changed(&self) -> Option<RecognitionResult> {
        let mut inner = self.inner.lock();
        if inner.latest == inner.delivered {
            return None;
        }
        inner.delivered = inner.latest.clone();
        inner.delivered.clone()
    }

    pub fn latest(&self) -> Option<RecognitionResult> {
        self.inner.lock().latest.clone()
    }
}
