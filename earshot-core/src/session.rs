//! `RecognizerSession` — owns at most one decoder instance.
//!
//! The engine is built lazily by [`RecognizerSession::ensure_ready`] and kept
//! until [`RecognizerSession::reset`]. Grammar changes require a reset; a
//! ready session ignores the grammar passed to later `ensure_ready` calls.
//!
//! No locking happens here. Callers guarantee a single driving thread (the
//! continuous worker owns its session outright; bounded jobs are serialised by
//! the busy gate).

use std::sync::Arc;

use tracing::{debug, info};

use crate::buffering::{AudioFrame, RecognitionResult, SAMPLE_RATE};
use crate::error::{EarshotError, Result};
use crate::grammar::Grammar;
use crate::inference::{EngineFactory, ModelHandle, RecognizerEngine};

/// Decoder knobs applied right after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub max_alternatives: u16,
    pub words: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_alternatives: 3,
            words: true,
        }
    }
}

pub struct RecognizerSession {
    factory: Arc<dyn EngineFactory>,
    engine: Option<Box<dyn RecognizerEngine>>,
    /// Grammar the current engine was built with.
    grammar: Grammar,
    builds: usize,
}

impl RecognizerSession {
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            factory,
            engine: None,
            grammar: Grammar::unconstrained(),
            builds: 0,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.engine.is_some()
    }

    /// Grammar of the live engine, if any.
    pub fn grammar(&self) -> Option<&Grammar> {
        self.engine.as_ref().map(|_| &self.grammar)
    }

    /// Number of engines this session has constructed.
    pub fn builds(&self) -> usize {
        self.builds
    }

    /// Build the engine if none exists. No-op when already ready.
    ///
    /// # Errors
    /// `EarshotError::EngineConstruction` from the factory.
    pub fn ensure_ready(
        &mut self,
        model: &ModelHandle,
        grammar: &Grammar,
        options: EngineOptions,
    ) -> Result<()> {
        if self.engine.is_some() {
            return Ok(());
        }

        let constraint = (!grammar.is_empty()).then_some(grammar);
        let mut engine = self
            .factory
            .create(model, SAMPLE_RATE as f32, constraint)
            .map_err(|e| match e {
                EarshotError::EngineConstruction(_) => e,
                other => EarshotError::EngineConstruction(other.to_string()),
            })?;
        engine.set_max_alternatives(options.max_alternatives);
        engine.set_words(options.words);

        self.engine = Some(engine);
        self.grammar = grammar.clone();
        self.builds += 1;
        info!(
            model = %model.path().display(),
            constrained = constraint.is_some(),
            max_alternatives = options.max_alternatives,
            words = options.words,
            "recognizer engine constructed"
        );
        Ok(())
    }

    /// Feed one frame. Returns `true` on an utterance boundary.
    pub fn accept_frame(&mut self, frame: &AudioFrame) -> Result<bool> {
        self.engine_mut()?.accept_waveform(frame.samples())
    }

    pub fn current_result(&mut self) -> Result<RecognitionResult> {
        let json = self.engine_mut()?.result();
        Ok(RecognitionResult::final_result(json))
    }

    /// Feed an entire utterance buffer and return the decoder's result for it.
    pub fn decode_utterance(&mut self, samples: &[i16]) -> Result<RecognitionResult> {
        let engine = self.engine_mut()?;
        let boundary = engine.accept_waveform(samples)?;
        debug!(samples = samples.len(), boundary, "utterance fed to engine");
        Ok(RecognitionResult::final_result(engine.result()))
    }

    /// Drop the engine; the next `ensure_ready` rebuilds it.
    pub fn reset(&mut self) {
        if self.engine.take().is_some() {
            debug!("recognizer session reset");
        }
    }

    fn engine_mut(&mut self) -> Result<&mut Box<dyn RecognizerEngine>> {
        self.engine
            .as_mut()
            .ok_or_else(|| EarshotError::Decode("recognizer session is not ready".into()))
    }
}

impl std::fmt::Debug for RecognizerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognizerSession")
            .field("ready", &self.is_ready())
            .field("grammar", &self.grammar)
            .field("builds", &self.builds)
            .finish_non_exhaustive()
    }
}
