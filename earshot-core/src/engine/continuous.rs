//! Continuous recognition: one persistent worker drains the frame queue.
//!
//! ```text
//! capture thread ──push──► FrameQueue ──try_pop──► worker (owns RecognizerSession)
//!                                                      │ boundary
//!                                                      ▼
//!                                   consumer tick ◄── ResultQueue
//! ```
//!
//! The worker owns its session outright, so the engine is never shared.
//! Dropping the session when the worker exits is what makes the next
//! `start` rebuild the engine with the then-current key phrases.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::diagnostics::RecognizerDiagnostics;
use super::ControllerContext;
use crate::audio::CaptureEvent;
use crate::buffering::{FrameQueue, RecognitionResult, ResultQueue};
use crate::error::{EarshotError, Result};
use crate::events::SessionState;
use crate::grammar::{compile, Grammar, KeyPhraseSet};
use crate::session::RecognizerSession;

pub struct ContinuousController {
    ctx: Arc<ControllerContext>,
    frames: FrameQueue,
    results: ResultQueue,
    running: Arc<AtomicBool>,
    /// Raised by the worker before each pop and lowered once that frame is
    /// fully handled.
    decoding: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ContinuousController {
    pub fn new(ctx: Arc<ControllerContext>) -> Self {
        let frames = FrameQueue::new(ctx.config.frame_queue_capacity);
        Self {
            ctx,
            frames,
            results: ResultQueue::new(),
            running: Arc::new(AtomicBool::new(false)),
            decoding: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    /// Begin a session constrained to `key_phrases` (empty = unconstrained).
    ///
    /// # Errors
    /// - `EarshotError::AlreadyRunning` while a session is active.
    /// - Capture start failures; the controller is left stopped.
    pub fn start(&self, key_phrases: &KeyPhraseSet) -> Result<()> {
        let mut worker = self.worker.lock();
        if self.running.load(Ordering::Acquire) {
            return Err(EarshotError::AlreadyRunning);
        }
        if let Some(previous) = worker.take() {
            debug!("joining previous continuous worker");
            let _ = previous.join();
        }
        self.ctx.diagnostics.reset();

        let stale = self.frames.clear();
        if stale > 0 {
            debug!(stale, "discarded frames from previous session");
        }
        let grammar = compile(key_phrases);

        self.running.store(true, Ordering::Release);
        if let Err(e) = self.ctx.capture.start() {
            self.running.store(false, Ordering::Release);
            self.ctx
                .notifier
                .transition(SessionState::Stopped, format!("Capture error: {e}"));
            return Err(e);
        }
        self.ctx
            .notifier
            .transition(SessionState::Listening, "Listening");
        info!(
            phrases = key_phrases.len(),
            queue_capacity = ?self.frames.capacity(),
            "continuous recognition started"
        );

        let ctx = Arc::clone(&self.ctx);
        let frames = self.frames.clone();
        let results = self.results.clone();
        let running = Arc::clone(&self.running);
        let decoding = Arc::clone(&self.decoding);
        let handle = std::thread::Builder::new()
            .name("earshot-continuous".into())
            .spawn(move || {
                run_worker(&ctx, &frames, &results, &running, &decoding, &grammar)
            })
            .map_err(|e| {
                self.running.store(false, Ordering::Release);
                self.ctx.capture.stop();
                EarshotError::Io(e)
            })?;
        *worker = Some(handle);
        Ok(())
    }

    /// Request the worker to stop. Observed within one idle backoff; frames
    /// still queued at that point are discarded by the exiting worker.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            debug!("continuous stop requested while idle");
            return;
        }
        self.ctx.capture.stop();
        self.ctx
            .notifier
            .transition(SessionState::Stopped, "Recognition stopped");
        info!("continuous recognition stop requested");
    }

    /// Capture handler body: enqueue only.
    pub fn on_capture(&self, event: CaptureEvent) {
        match event {
            CaptureEvent::Frame(frame) => {
                RecognizerDiagnostics::bump(&self.ctx.diagnostics.frames_in);
                if !self.frames.push(frame) {
                    RecognizerDiagnostics::bump(&self.ctx.diagnostics.frames_dropped);
                }
            }
            CaptureEvent::Stopped => debug!("capture reported stop"),
        }
    }

    /// Every result produced since the last call, oldest first.
    pub fn drain_results(&self) -> Vec<RecognitionResult> {
        self.results.drain()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// `true` until the worker thread has actually exited.
    pub fn is_worker_active(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn queued_frames(&self) -> usize {
        self.frames.len()
    }

    /// `true` once every enqueued frame has been handed to the engine and
    /// any result it produced is in the result queue.
    pub fn is_drained(&self) -> bool {
        self.frames.is_empty() && !self.decoding.load(Ordering::SeqCst)
    }
}

impl Drop for ContinuousController {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.worker.get_mut().take() {
            let _ = handle.join();
        }
    }
}

fn run_worker(
    ctx: &ControllerContext,
    frames: &FrameQueue,
    results: &ResultQueue,
    running: &AtomicBool,
    decoding: &AtomicBool,
    grammar: &Grammar,
) {
    let mut session = RecognizerSession::new(Arc::clone(&ctx.factory));
    if let Err(e) = session.ensure_ready(&ctx.model, grammar, ctx.options) {
        error!("recognizer construction failed: {e}");
        running.store(false, Ordering::Release);
        ctx.capture.stop();
        ctx.notifier
            .transition(SessionState::Stopped, format!("Recognizer error: {e}"));
        return;
    }
    RecognizerDiagnostics::bump(&ctx.diagnostics.engine_builds);
    ctx.notifier.notify("Recognizer ready");

    let backoff = ctx.config.idle_backoff();
    while running.load(Ordering::Acquire) {
        decoding.store(true, Ordering::SeqCst);
        let Some(frame) = frames.try_pop() else {
            decoding.store(false, Ordering::SeqCst);
            std::thread::sleep(backoff);
            continue;
        };

        RecognizerDiagnostics::bump(&ctx.diagnostics.frames_decoded);
        match session.accept_frame(&frame) {
            Ok(true) => match session.current_result() {
                Ok(result) => {
                    debug!(bytes = result.json.len(), "final result queued");
                    results.push(result);
                    RecognizerDiagnostics::bump(&ctx.diagnostics.results_emitted);
                }
                Err(e) => {
                    warn!("failed to read recognizer result: {e}");
                    RecognizerDiagnostics::bump(&ctx.diagnostics.decode_errors);
                }
            },
            Ok(false) => {}
            Err(e) => {
                error!("frame decode failed: {e}");
                RecognizerDiagnostics::bump(&ctx.diagnostics.decode_errors);
            }
        }
        decoding.store(false, Ordering::SeqCst);
    }

    let leftover = frames.clear();
    if leftover > 0 {
        debug!(leftover, "discarded frames queued after stop");
        ctx.diagnostics
            .frames_dropped
            .fetch_add(leftover, Ordering::Relaxed);
    }
    drop(session);
    ctx.notifier.notify("Recognizer stop");
    info!("continuous worker exited");
}
