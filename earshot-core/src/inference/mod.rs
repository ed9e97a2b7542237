//! Decoder abstraction.
//!
//! The acoustic model and decoder are opaque. This module only fixes the
//! surface the controllers need:
//!
//! - [`ModelProvider`] turns a model path into a shareable [`ModelHandle`].
//! - [`EngineFactory`] binds a handle, a sample rate and an optional grammar
//!   into one [`RecognizerEngine`].
//!
//! `&mut self` on the engine methods expresses that decoders are stateful.
//! Each engine is owned by exactly one `RecognizerSession`, so no locking
//! happens at this layer.

pub mod endpoint;
pub mod stub;

pub use stub::{StubBackend, StubEngine};

use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;
use crate::grammar::Grammar;

/// Contract for one decoder instance.
pub trait RecognizerEngine: Send + 'static {
    /// Feed one block of 16-bit PCM. Returns `true` when the decoder has
    /// reached an utterance boundary and a final result is available.
    fn accept_waveform(&mut self, samples: &[i16]) -> Result<bool>;

    /// JSON payload for the most recently completed utterance.
    fn result(&mut self) -> String;

    fn set_max_alternatives(&mut self, max_alternatives: u16);

    /// Enables per-word timing and confidence in results.
    fn set_words(&mut self, enabled: bool);
}

/// Loads models from disk (or wherever the backend keeps them).
pub trait ModelProvider: Send + Sync + 'static {
    /// # Errors
    /// `EarshotError::ModelLoad` if the path is invalid or unreadable.
    fn load_model(&self, path: &Path) -> Result<ModelHandle>;
}

/// Constructs decoder instances bound to a loaded model.
pub trait EngineFactory: Send + Sync + 'static {
    /// # Errors
    /// `EarshotError::EngineConstruction` if the handle does not belong to
    /// this backend or the decoder refuses the grammar.
    fn create(
        &self,
        model: &ModelHandle,
        sample_rate: f32,
        grammar: Option<&Grammar>,
    ) -> Result<Box<dyn RecognizerEngine>>;
}

/// Reference-counted handle to a backend-specific loaded model.
///
/// The payload is type-erased; the factory that understands it recovers the
/// concrete type with [`ModelHandle::downcast_ref`].
#[derive(Clone)]
pub struct ModelHandle {
    path: PathBuf,
    inner: Arc<dyn Any + Send + Sync>,
}

impl ModelHandle {
    pub fn new<M: Any + Send + Sync>(path: impl Into<PathBuf>, model: M) -> Self {
        Self {
            path: path.into(),
            inner: Arc::new(model),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn downcast_ref<M: Any>(&self) -> Option<&M> {
        self.inner.downcast_ref::<M>()
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
