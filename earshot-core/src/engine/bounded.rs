//! Bounded recognition: accumulate one utterance, decode it as a single job.
//!
//! ```text
//! capture thread ──on_frame──► utterance buffer ──stop trigger──► decode job
//!                                                (busy gate)         │
//!                                                                    ▼
//!                                 consumer tick ◄── take_changed ── ResultSlot
//! ```
//!
//! A stop trigger comes from an explicit `stop`, the capture source ending,
//! or the utterance exceeding `maxRecordLength`. Triggers that arrive while
//! the gate is held are ignored. The job keeps the gate through the settle
//! delay after publishing its result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, error, info, info_span};

use super::diagnostics::RecognizerDiagnostics;
use super::gate::BusyGate;
use super::ControllerContext;
use crate::audio::CaptureEvent;
use crate::buffering::{AudioFrame, RecognitionResult, ResultSlot};
use crate::error::{EarshotError, Result};
use crate::events::SessionState;
use crate::grammar::{compile, Grammar, KeyPhraseSet};
use crate::session::RecognizerSession;

/// Why a decode was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopTrigger {
    Explicit,
    CaptureStopped,
    MaxLength,
}

#[derive(Default)]
struct Utterance {
    samples: Vec<i16>,
    /// Kept across dispatches; only `start` clears it. Re-armed by the next
    /// frame whenever it is unset.
    started_at: Option<Instant>,
}

pub struct BoundedController {
    ctx: Arc<ControllerContext>,
    utterance: Mutex<Utterance>,
    gate: BusyGate,
    slot: ResultSlot,
    session: Mutex<RecognizerSession>,
    grammar: Mutex<Grammar>,
    capturing: AtomicBool,
    /// Set by `stop` and by a grammar change at `start`; the next job
    /// rebuilds the engine.
    needs_reset: AtomicBool,
    job: Mutex<Option<JoinHandle<()>>>,
}

impl BoundedController {
    pub fn new(ctx: Arc<ControllerContext>) -> Self {
        let session = RecognizerSession::new(Arc::clone(&ctx.factory));
        Self {
            ctx,
            utterance: Mutex::new(Utterance::default()),
            gate: BusyGate::new(),
            slot: ResultSlot::new(),
            session: Mutex::new(session),
            grammar: Mutex::new(Grammar::unconstrained()),
            capturing: AtomicBool::new(false),
            needs_reset: AtomicBool::new(false),
            job: Mutex::new(None),
        }
    }

    /// Begin capturing. The compiled grammar applies from the next engine
    /// construction.
    ///
    /// # Errors
    /// - `EarshotError::AlreadyRunning` while capturing.
    /// - Capture start failures.
    pub fn start(&self, key_phrases: &KeyPhraseSet) -> Result<()> {
        if self
            .capturing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(EarshotError::AlreadyRunning);
        }
        self.ctx.diagnostics.reset();

        let grammar = compile(key_phrases);
        {
            let mut current = self.grammar.lock();
            if *current != grammar {
                self.needs_reset.store(true, Ordering::Release);
                *current = grammar;
            }
        }
        *self.utterance.lock() = Utterance::default();

        if let Err(e) = self.ctx.capture.start() {
            self.capturing.store(false, Ordering::Release);
            self.ctx
                .notifier
                .transition(SessionState::Stopped, format!("Capture error: {e}"));
            return Err(e);
        }
        info!(phrases = key_phrases.len(), "bounded recognition started");
        Ok(())
    }

    /// Stop capturing and decode whatever has been accumulated.
    ///
    /// The recognizer is marked for rebuild, so the job decoding this final
    /// utterance and any later one runs on a fresh engine.
    pub fn stop(self: &Arc<Self>) {
        if self.capturing.swap(false, Ordering::AcqRel) {
            self.ctx.capture.stop();
        }
        self.needs_reset.store(true, Ordering::Release);
        self.trigger_stop(StopTrigger::Explicit);
        if !self.gate.is_busy() {
            self.ctx
                .notifier
                .transition(SessionState::Stopped, "Recognition stopped");
        }
    }

    pub fn on_capture(self: &Arc<Self>, event: CaptureEvent) {
        match event {
            CaptureEvent::Frame(frame) => {
                RecognizerDiagnostics::bump(&self.ctx.diagnostics.frames_in);
                if self.capturing.load(Ordering::Acquire) {
                    self.on_frame_at(frame, Instant::now());
                } else {
                    RecognizerDiagnostics::bump(&self.ctx.diagnostics.frames_dropped);
                }
            }
            CaptureEvent::Stopped => {
                if self.capturing.swap(false, Ordering::AcqRel) {
                    debug!("capture ended on its own");
                    self.trigger_stop(StopTrigger::CaptureStopped);
                }
            }
        }
    }

    /// Frame handling with an explicit clock reading.
    ///
    /// A fresh utterance starts (timer recorded, "Listening" emitted) only
    /// when no job is in flight and the buffer is empty. A frame buffered
    /// with no start recorded (after a restart while a job holds the gate)
    /// arms the timer silently. Once the time since the recorded start
    /// strictly exceeds `maxRecordLength`, the frame is dropped and an
    /// implicit stop is triggered.
    pub fn on_frame_at(self: &Arc<Self>, frame: AudioFrame, now: Instant) {
        let max = self.ctx.config.max_record_duration();
        let mut fresh = false;
        let mut over_limit = false;
        {
            let mut utterance = self.utterance.lock();
            if !self.gate.is_busy() && utterance.samples.is_empty() {
                utterance.started_at = Some(now);
                fresh = true;
            }
            let start = *utterance.started_at.get_or_insert(now);
            let elapsed = now.saturating_duration_since(start);
            if elapsed > max {
                over_limit = true;
            } else {
                utterance.samples.extend_from_slice(frame.samples());
            }
        }

        if fresh {
            self.ctx
                .notifier
                .transition(SessionState::Listening, "Listening");
        }
        if over_limit {
            debug!(?max, "utterance exceeded max record length");
            RecognizerDiagnostics::bump(&self.ctx.diagnostics.frames_dropped);
            self.trigger_stop(StopTrigger::MaxLength);
        }
    }

    /// Dispatch the buffered utterance unless a job already holds the gate.
    ///
    /// Returns `true` if a decode job was spawned.
    pub fn trigger_stop(self: &Arc<Self>, trigger: StopTrigger) -> bool {
        if !self.gate.try_acquire() {
            debug!(?trigger, "decode in flight, stop trigger ignored");
            RecognizerDiagnostics::bump(&self.ctx.diagnostics.triggers_ignored);
            return false;
        }

        let samples = std::mem::take(&mut self.utterance.lock().samples);
        if samples.is_empty() {
            debug!(?trigger, "nothing buffered, no decode dispatched");
            self.gate.release();
            return false;
        }

        self.ctx
            .notifier
            .transition(SessionState::Processing, "Fetching Result");
        RecognizerDiagnostics::bump(&self.ctx.diagnostics.decode_jobs);

        let job = Arc::clone(self);
        let mut running_job = self.job.lock();
        if running_job.as_ref().is_some_and(|h| h.is_finished()) {
            if let Some(done) = running_job.take() {
                let _ = done.join();
            }
        }
        match std::thread::Builder::new()
            .name("earshot-decode".into())
            .spawn(move || job.run_job(trigger, samples))
        {
            Ok(handle) => {
                *running_job = Some(handle);
                true
            }
            Err(e) => {
                error!("failed to spawn decode job: {e}");
                self.gate.release();
                false
            }
        }
    }

    /// Latest result if it has not been handed out yet.
    pub fn poll(&self) -> Option<RecognitionResult> {
        self.slot.take_changed()
    }

    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Acquire)
    }

    pub fn buffered_samples(&self) -> usize {
        self.utterance.lock().samples.len()
    }

    /// Block until the current job (if any) has finished, settle delay
    /// included.
    pub fn wait_idle(&self) {
        let handle = self.job.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    fn run_job(&self, trigger: StopTrigger, samples: Vec<i16>) {
        let span = info_span!("decode_job", ?trigger, samples = samples.len());
        let _entered = span.enter();
        let started = Instant::now();

        match self.decode(&samples) {
            Ok(result) => {
                debug!(elapsed_ms = started.elapsed().as_millis() as u64, "decode finished");
                self.slot.publish(result);
                RecognizerDiagnostics::bump(&self.ctx.diagnostics.results_emitted);
            }
            Err(e @ EarshotError::EngineConstruction(_)) => {
                error!("recognizer construction failed: {e}");
                self.capturing.store(false, Ordering::Release);
                self.ctx.capture.stop();
                self.gate.release();
                self.ctx
                    .notifier
                    .transition(SessionState::Stopped, format!("Recognizer error: {e}"));
                return;
            }
            Err(e) => {
                error!("decode failed: {e}");
                RecognizerDiagnostics::bump(&self.ctx.diagnostics.decode_errors);
            }
        }

        std::thread::sleep(self.ctx.config.settle_delay());
        self.gate.release();

        if self.capturing.load(Ordering::Acquire) {
            self.ctx
                .notifier
                .transition(SessionState::Listening, "Decode finished");
        } else {
            self.ctx
                .notifier
                .transition(SessionState::Stopped, "Decode finished");
        }
    }

    fn decode(&self, samples: &[i16]) -> Result<RecognitionResult> {
        let mut session = self.session.lock();
        if self.needs_reset.swap(false, Ordering::AcqRel) {
            session.reset();
        }
        if !session.is_ready() {
            let grammar = self.grammar.lock().clone();
            session.ensure_ready(&self.ctx.model, &grammar, self.ctx.options)?;
            RecognizerDiagnostics::bump(&self.ctx.diagnostics.engine_builds);
            self.ctx.notifier.notify("Recognizer ready");
        }
        session.decode_utterance(samples)
    }
}
