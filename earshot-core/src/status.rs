//! Status and transcription delivery.
//!
//! Two delivery paths exist for each event kind:
//!
//! - registered listeners (`on_status` / `on_transcription`), invoked
//!   synchronously on the emitting thread;
//! - `tokio::sync::broadcast` channels (`subscribe_*`) for async consumers.
//!
//! Listeners are snapshotted before invocation, so a listener may register
//! further listeners without deadlocking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::buffering::RecognitionResult;
use crate::events::{SessionState, StatusEvent, TranscriptEvent};

/// Broadcast channel capacity: events buffered for slow subscribers.
const BROADCAST_CAP: usize = 256;

pub type StatusListener = Arc<dyn Fn(&StatusEvent) + Send + Sync>;
pub type TranscriptListener = Arc<dyn Fn(&TranscriptEvent) + Send + Sync>;

pub struct StatusNotifier {
    state: Mutex<SessionState>,
    status_tx: broadcast::Sender<StatusEvent>,
    transcript_tx: broadcast::Sender<TranscriptEvent>,
    status_listeners: RwLock<Vec<StatusListener>>,
    transcript_listeners: RwLock<Vec<TranscriptListener>>,
    seq: AtomicU64,
}

impl StatusNotifier {
    pub fn new() -> Self {
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (transcript_tx, _) = broadcast::channel(BROADCAST_CAP);
        Self {
            state: Mutex::new(SessionState::Uninitialized),
            status_tx,
            transcript_tx,
            status_listeners: RwLock::new(Vec::new()),
            transcript_listeners: RwLock::new(Vec::new()),
            seq: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Emit a status line without changing state.
    pub fn notify(&self, message: impl Into<String>) {
        let state = self.state();
        self.emit(StatusEvent {
            state,
            message: message.into(),
        });
    }

    /// Change state and emit a status line.
    pub fn transition(&self, state: SessionState, message: impl Into<String>) {
        let previous = std::mem::replace(&mut *self.state.lock(), state);
        if previous != state {
            info!(from = ?previous, to = ?state, "session state changed");
        }
        self.emit(StatusEvent {
            state,
            message: message.into(),
        });
    }

    /// Hand one result to the application.
    pub fn deliver(&self, result: RecognitionResult) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let event = TranscriptEvent { seq, result };
        let listeners = self.transcript_listeners.read().clone();
        for listener in &listeners {
            listener(&event);
        }
        let _ = self.transcript_tx.send(event);
    }

    pub fn on_status<F>(&self, listener: F)
    where
        F: Fn(&StatusEvent) + Send + Sync + 'static,
    {
        self.status_listeners.write().push(Arc::new(listener));
    }

    pub fn on_transcription<F>(&self, listener: F)
    where
        F: Fn(&TranscriptEvent) + Send + Sync + 'static,
    {
        self.transcript_listeners.write().push(Arc::new(listener));
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusEvent> {
        self.status_tx.subscribe()
    }

    pub fn subscribe_transcripts(&self) -> broadcast::Receiver<TranscriptEvent> {
        self.transcript_tx.subscribe()
    }

    fn emit(&self, event: StatusEvent) {
        debug!(state = ?event.state, message = %event.message, "status");
        let listeners = self.status_listeners.read().clone();
        for listener in &listeners {
            listener(&event);
        }
        let _ = self.status_tx.send(event);
    }
}

impl Default for StatusNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StatusNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusNotifier")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
