//! `StubBackend` — deterministic placeholder decoder.
//!
//! Lets the full capture → controller → consumer path run without a real
//! acoustic model. Utterance boundaries come from [`EnergyEndpointer`]; the
//! "recognised" text is either the next key phrase of the grammar (cycling)
//! or a `[stub: N samples]` marker when decoding is unconstrained.

use std::path::Path;

use serde_json::json;
use tracing::debug;

use super::endpoint::EnergyEndpointer;
use super::{EngineFactory, ModelHandle, ModelProvider, RecognizerEngine};
use crate::error::{EarshotError, Result};
use crate::grammar::{Grammar, UNKNOWN_TOKEN};

/// Payload stored inside a [`ModelHandle`] produced by [`StubBackend`].
#[derive(Debug)]
pub struct StubModel;

/// Model provider + engine factory pair for the stub decoder.
#[derive(Debug, Clone)]
pub struct StubBackend {
    /// Reject model paths that do not exist on disk.
    check_paths: bool,
}

impl StubBackend {
    pub fn new() -> Self {
        Self { check_paths: true }
    }

    /// Accepts any model path.
    pub fn lenient() -> Self {
        Self { check_paths: false }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelProvider for StubBackend {
    fn load_model(&self, path: &Path) -> Result<ModelHandle> {
        if self.check_paths && !path.exists() {
            return Err(EarshotError::ModelLoad {
                path: path.to_path_buf(),
                reason: "path does not exist".into(),
            });
        }
        debug!(path = %path.display(), "StubBackend::load_model");
        Ok(ModelHandle::new(path, StubModel))
    }
}

impl EngineFactory for StubBackend {
    fn create(
        &self,
        model: &ModelHandle,
        sample_rate: f32,
        grammar: Option<&Grammar>,
    ) -> Result<Box<dyn RecognizerEngine>> {
        if model.downcast_ref::<StubModel>().is_none() {
            return Err(EarshotError::EngineConstruction(format!(
                "model at {} was not loaded by the stub backend",
                model.path().display()
            )));
        }
        let phrases = match grammar {
            Some(g) => serde_json::from_str::<Vec<String>>(g.as_str())
                .map_err(|e| EarshotError::EngineConstruction(format!("bad grammar: {e}")))?
                .into_iter()
                .filter(|p| p != UNKNOWN_TOKEN)
                .collect(),
            None => Vec::new(),
        };
        debug!(sample_rate, phrases = phrases.len(), "StubBackend::create");
        Ok(Box::new(StubEngine::new(sample_rate, phrases)))
    }
}

/// Echo-style engine. See module docs.
pub struct StubEngine {
    sample_rate: f32,
    phrases: Vec<String>,
    endpointer: EnergyEndpointer,
    pending_samples: usize,
    utterance_count: usize,
    max_alternatives: u16,
    words: bool,
}

impl StubEngine {
    pub fn new(sample_rate: f32, phrases: Vec<String>) -> Self {
        Self {
            sample_rate,
            phrases,
            endpointer: EnergyEndpointer::default(),
            pending_samples: 0,
            utterance_count: 0,
            max_alternatives: 0,
            words: false,
        }
    }

    fn utterance_text(&self) -> String {
        if self.pending_samples == 0 {
            return String::new();
        }
        if self.phrases.is_empty() {
            format!("[stub: {} samples]", self.pending_samples)
        } else {
            self.phrases[(self.utterance_count - 1) % self.phrases.len()].clone()
        }
    }
}

impl RecognizerEngine for StubEngine {
    fn accept_waveform(&mut self, samples: &[i16]) -> Result<bool> {
        self.pending_samples += samples.len();
        Ok(self.endpointer.is_boundary(samples))
    }

    fn result(&mut self) -> String {
        if self.pending_samples > 0 {
            self.utterance_count += 1;
        }
        let text = self.utterance_text();
        let duration = self.pending_samples as f32 / self.sample_rate;
        self.pending_samples = 0;
        self.endpointer.reset();

        if self.max_alternatives > 0 {
            return json!({ "alternatives": [{ "confidence": 1.0, "text": text }] }).to_string();
        }
        if self.words && !text.is_empty() {
            let words: Vec<&str> = text.split_whitespace().collect();
            let step = duration / words.len().max(1) as f32;
            let timed: Vec<_> = words
                .iter()
                .enumerate()
                .map(|(i, w)| {
                    json!({
                        "conf": 1.0,
                        "start": step * i as f32,
                        "end": step * (i + 1) as f32,
                        "word": w,
                    })
                })
                .collect();
            return json!({ "result": timed, "text": text }).to_string();
        }
        json!({ "text": text }).to_string()
    }

    fn set_max_alternatives(&mut self, max_alternatives: u16) {
        self.max_alternatives = max_alternatives;
    }

    fn set_words(&mut self, enabled: bool) {
        self.words = enabled;
    }
}
