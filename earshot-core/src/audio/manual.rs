//! Host-driven capture source.
//!
//! Frames are pushed by the owning application (or a test) and forwarded to
//! the handler on the pushing thread, but only while started.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::trace;

use super::{CaptureEvent, CaptureHandler, CaptureSource};
use crate::buffering::AudioFrame;
use crate::error::Result;

pub struct ManualCapture {
    handler: RwLock<Option<CaptureHandler>>,
    available: AtomicBool,
    started: AtomicBool,
}

impl ManualCapture {
    pub fn new() -> Self {
        Self {
            handler: RwLock::new(None),
            available: AtomicBool::new(true),
            started: AtomicBool::new(false),
        }
    }

    /// A source that reports no device until [`ManualCapture::set_available`].
    pub fn unavailable() -> Self {
        let capture = Self::new();
        capture.available.store(false, Ordering::Release);
        capture
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Deliver one frame. Returns `false` (frame discarded) when not started.
    pub fn push(&self, frame: impl Into<AudioFrame>) -> bool {
        if !self.is_started() {
            trace!("manual capture not started, frame discarded");
            return false;
        }
        self.dispatch(CaptureEvent::Frame(frame.into()))
    }

    fn dispatch(&self, event: CaptureEvent) -> bool {
        let handler = self.handler.read().clone();
        match handler {
            Some(handler) => {
                handler(event);
                true
            }
            None => false,
        }
    }
}

impl Default for ManualCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for ManualCapture {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    fn set_handler(&self, handler: CaptureHandler) {
        *self.handler.write() = Some(handler);
    }

    fn start(&self) -> Result<()> {
        self.started.store(true, Ordering::Release);
        Ok(())
    }

    fn stop(&self) {
        if self.started.swap(false, Ordering::AcqRel) {
            self.dispatch(CaptureEvent::Stopped);
        }
    }
}
