//! `SpeechRecognizer` — top-level lifecycle controller.
//!
//! ## Lifecycle
//!
//! ```text
//! SpeechRecognizer::new()
//!     └─► initialize().await   → device wait, model load, status = Ready
//!         └─► start_recognition()   → capture on, status = Listening
//!             └─► stop_recognition()    → capture off, status = Stopped
//! ```
//!
//! `initialize()` is one-shot: a second call while initializing or after
//! success reports on the status channel and returns an error without
//! touching state. A failed model load returns to `Uninitialized` so the
//! call can be retried.
//!
//! ## Threading
//!
//! Capture handlers only enqueue (continuous) or append (bounded). Decoding
//! runs on named `std::thread`s owned by the controllers. Results reach the
//! application only through [`SpeechRecognizer::tick`], normally driven by
//! [`SpeechRecognizer::run_consumer`] on the tokio runtime.

pub mod bounded;
pub mod continuous;
pub mod diagnostics;
pub mod gate;
pub mod init;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::audio::CaptureSource;
use crate::config::{RecognitionMode, RecognizerConfig};
use crate::error::{EarshotError, Result};
use crate::events::{SessionState, StatusEvent, TranscriptEvent};
use crate::grammar::KeyPhraseSet;
use crate::inference::{EngineFactory, ModelHandle, ModelProvider};
use crate::session::EngineOptions;
use crate::status::StatusNotifier;

pub use bounded::{BoundedController, StopTrigger};
pub use continuous::ContinuousController;
pub use diagnostics::{DiagnosticsSnapshot, RecognizerDiagnostics};
pub use gate::BusyGate;

/// Everything a controller needs once the model is loaded.
pub struct ControllerContext {
    pub model: ModelHandle,
    pub factory: Arc<dyn EngineFactory>,
    pub capture: Arc<dyn CaptureSource>,
    pub notifier: Arc<StatusNotifier>,
    pub diagnostics: Arc<RecognizerDiagnostics>,
    pub options: EngineOptions,
    pub config: RecognizerConfig,
}

/// The mode-specific controller built by `initialize`.
#[derive(Clone)]
pub enum Controller {
    Continuous(Arc<ContinuousController>),
    Bounded(Arc<BoundedController>),
}

impl Controller {
    pub fn build(ctx: Arc<ControllerContext>) -> Self {
        match ctx.config.mode {
            RecognitionMode::Continuous => {
                Self::Continuous(Arc::new(ContinuousController::new(ctx)))
            }
            RecognitionMode::Bounded => Self::Bounded(Arc::new(BoundedController::new(ctx))),
        }
    }

    /// Route capture events to this controller. Holds only a weak reference.
    fn install_handler(&self, capture: &dyn CaptureSource) {
        match self {
            Self::Continuous(c) => {
                let weak = Arc::downgrade(c);
                capture.set_handler(Arc::new(move |event| {
                    if let Some(controller) = weak.upgrade() {
                        controller.on_capture(event);
                    }
                }));
            }
            Self::Bounded(b) => {
                let weak = Arc::downgrade(b);
                capture.set_handler(Arc::new(move |event| {
                    if let Some(controller) = weak.upgrade() {
                        controller.on_capture(event);
                    }
                }));
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Uninitialized,
    Initializing,
    Initialized,
}

/// The top-level recognizer handle.
///
/// `SpeechRecognizer` is `Send + Sync`; wrap it in an `Arc` to share between
/// the consumer task and whatever drives start/stop.
pub struct SpeechRecognizer {
    config: RecognizerConfig,
    models: Arc<dyn ModelProvider>,
    factory: Arc<dyn EngineFactory>,
    capture: Arc<dyn CaptureSource>,
    notifier: Arc<StatusNotifier>,
    diagnostics: Arc<RecognizerDiagnostics>,
    lifecycle: Mutex<Lifecycle>,
    controller: RwLock<Option<Controller>>,
}

impl SpeechRecognizer {
    pub fn new(
        mut config: RecognizerConfig,
        models: Arc<dyn ModelProvider>,
        factory: Arc<dyn EngineFactory>,
        capture: Arc<dyn CaptureSource>,
    ) -> Self {
        config.normalize();
        Self {
            config,
            models,
            factory,
            capture,
            notifier: Arc::new(StatusNotifier::new()),
            diagnostics: Arc::new(RecognizerDiagnostics::default()),
            lifecycle: Mutex::new(Lifecycle::Uninitialized),
            controller: RwLock::new(None),
        }
    }

    /// Convenience for backends that both load models and build engines.
    pub fn with_backend<B>(
        config: RecognizerConfig,
        backend: Arc<B>,
        capture: Arc<dyn CaptureSource>,
    ) -> Self
    where
        B: ModelProvider + EngineFactory,
    {
        let models: Arc<dyn ModelProvider> = backend.clone();
        let factory: Arc<dyn EngineFactory> = backend;
        Self::new(config, models, factory, capture)
    }

    /// Wait for a capture device, load the model, build the controller.
    ///
    /// # Errors
    /// - `EarshotError::AlreadyInitializing` / `EarshotError::AlreadyInitialized`.
    /// - `EarshotError::ModelLoad`; the recognizer returns to `Uninitialized`.
    pub async fn initialize(&self) -> Result<()> {
        self.notifier.notify("Start Initialize");

        let rejected = {
            let mut lifecycle = self.lifecycle.lock();
            match *lifecycle {
                Lifecycle::Initializing => Some(EarshotError::AlreadyInitializing),
                Lifecycle::Initialized => Some(EarshotError::AlreadyInitialized),
                Lifecycle::Uninitialized => {
                    *lifecycle = Lifecycle::Initializing;
                    None
                }
            }
        };
        if let Some(e) = rejected {
            warn!("initialize rejected: {e}");
            self.notifier.notify(e.to_string());
            return Err(e);
        }

        self.notifier
            .transition(SessionState::Initializing, "Waiting for audio input device");
        init::wait_for_device(self.capture.as_ref(), self.config.device_poll_interval()).await;

        let path = self.config.resolved_model_path();
        self.notifier
            .notify(format!("Loading Model from: {}", path.display()));
        let model = match init::load_model(Arc::clone(&self.models), path).await {
            Ok(model) => model,
            Err(e) => {
                *self.lifecycle.lock() = Lifecycle::Uninitialized;
                self.notifier
                    .transition(SessionState::Uninitialized, format!("Model load failed: {e}"));
                return Err(e);
            }
        };

        let ctx = Arc::new(ControllerContext {
            model,
            factory: Arc::clone(&self.factory),
            capture: Arc::clone(&self.capture),
            notifier: Arc::clone(&self.notifier),
            diagnostics: Arc::clone(&self.diagnostics),
            options: EngineOptions {
                max_alternatives: self.config.max_alternatives,
                words: self.config.words,
            },
            config: self.config.clone(),
        });
        let controller = Controller::build(ctx);
        controller.install_handler(self.capture.as_ref());
        *self.controller.write() = Some(controller);
        *self.lifecycle.lock() = Lifecycle::Initialized;

        info!(mode = ?self.config.mode, "recognizer initialized");
        self.notifier.transition(SessionState::Ready, "Initialized");
        Ok(())
    }

    /// Start unconstrained recognition.
    pub fn start_recognition(&self) -> Result<()> {
        self.start_recognition_with(&KeyPhraseSet::empty())
    }

    /// Start recognition limited to `key_phrases` plus the unknown token.
    ///
    /// # Errors
    /// - `EarshotError::NotInitialized` before `initialize` succeeded.
    /// - `EarshotError::AlreadyRunning` while a session is active. A rejected
    ///   start leaves the running session and its diagnostics untouched.
    pub fn start_recognition_with(&self, key_phrases: &KeyPhraseSet) -> Result<()> {
        match self.require_controller()? {
            Controller::Continuous(c) => c.start(key_phrases),
            Controller::Bounded(b) => b.start(key_phrases),
        }
    }

    /// # Errors
    /// `EarshotError::NotInitialized` before `initialize` succeeded.
    pub fn stop_recognition(&self) -> Result<()> {
        match self.require_controller()? {
            Controller::Continuous(c) => c.stop(),
            Controller::Bounded(b) => b.stop(),
        }
        Ok(())
    }

    /// One consumer pass. Returns the number of results delivered.
    pub fn tick(&self) -> usize {
        let Some(controller) = self.controller() else {
            return 0;
        };
        match controller {
            Controller::Continuous(c) => {
                let results = c.drain_results();
                let delivered = results.len();
                for result in results {
                    self.notifier.deliver(result);
                }
                delivered
            }
            Controller::Bounded(b) => match b.poll() {
                Some(result) => {
                    self.notifier.notify("Received Result");
                    self.notifier.deliver(result);
                    1
                }
                None => 0,
            },
        }
    }

    /// Drive [`tick`](Self::tick) every `period` until `shutdown` resolves.
    /// Returns the total number of results delivered.
    pub async fn run_consumer<F>(&self, period: Duration, shutdown: F) -> usize
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut delivered = 0usize;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = interval.tick() => delivered += self.tick(),
            }
        }
        delivered + self.tick()
    }

    pub fn on_status<F>(&self, listener: F)
    where
        F: Fn(&StatusEvent) + Send + Sync + 'static,
    {
        self.notifier.on_status(listener);
    }

    pub fn on_transcription<F>(&self, listener: F)
    where
        F: Fn(&TranscriptEvent) + Send + Sync + 'static,
    {
        self.notifier.on_transcription(listener);
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusEvent> {
        self.notifier.subscribe_status()
    }

    pub fn subscribe_transcripts(&self) -> broadcast::Receiver<TranscriptEvent> {
        self.notifier.subscribe_transcripts()
    }

    pub fn state(&self) -> SessionState {
        self.notifier.state()
    }

    pub fn is_initialized(&self) -> bool {
        *self.lifecycle.lock() == Lifecycle::Initialized
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    pub fn controller(&self) -> Option<Controller> {
        self.controller.read().clone()
    }

    fn require_controller(&self) -> Result<Controller> {
        self.controller().ok_or_else(|| {
            self.notifier.notify(EarshotError::NotInitialized.to_string());
            EarshotError::NotInitialized
        })
    }
}

impl std::fmt::Debug for SpeechRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechRecognizer")
            .field("mode", &self.config.mode)
            .field("state", &self.state())
            .field("lifecycle", &*self.lifecycle.lock())
            .finish_non_exhaustive()
    }
}
