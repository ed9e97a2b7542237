//! Thread-safe FIFO carrying captured frames to the continuous worker.
//!
//! Backed by `crossbeam_channel`. The queue owns both channel halves, so it
//! never disconnects; cloning it yields another producer/consumer handle onto
//! the same FIFO.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::warn;

use super::AudioFrame;

#[derive(Clone)]
pub struct FrameQueue {
    tx: Sender<AudioFrame>,
    rx: Receiver<AudioFrame>,
    capacity: Option<usize>,
}

impl FrameQueue {
    /// `None` builds an unbounded queue; `Some(n)` caps it at `n` frames.
    pub fn new(capacity: Option<usize>) -> Self {
        let (tx, rx) = match capacity {
            Some(n) => crossbeam_channel::bounded(n.max(1)),
            None => crossbeam_channel::unbounded(),
        };
        Self { tx, rx, capacity }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Enqueue a frame. Returns `false` if the queue is bounded and full, in
    /// which case the frame is dropped.
    pub fn push(&self, frame: AudioFrame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(frame)) => {
                warn!(
                    capacity = ?self.capacity,
                    samples = frame.len(),
                    "frame queue full: dropped frame"
                );
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn try_pop(&self) -> Option<AudioFrame> {
        self.rx.try_recv().ok()
    }

    /// Discard everything queued. Returns the number of frames dropped.
    pub fn clear(&self) -> usize {
        self.rx.try_iter().count()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl std::fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
