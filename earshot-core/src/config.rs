//! Recognizer configuration.
//!
//! Serialised as camelCase JSON so hosts can persist it alongside their own
//! settings. Every field has a default; call [`RecognizerConfig::normalize`]
//! after deserialising untrusted input.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Session policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionMode {
    /// Persistent worker, every final result delivered.
    #[default]
    Continuous,
    /// One decode job per utterance, length-capped.
    Bounded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct RecognizerConfig {
    /// Directory model paths are resolved against.
    pub model_root: PathBuf,
    /// Model location relative to `model_root`.
    pub model_path: PathBuf,
    pub max_alternatives: u16,
    /// Per-word timing/confidence in results.
    pub words: bool,
    pub mode: RecognitionMode,
    /// Seconds of audio a bounded utterance may span before an implicit stop.
    pub max_record_length: f32,
    /// `None` keeps the frame queue unbounded.
    pub frame_queue_capacity: Option<usize>,
    pub idle_backoff_ms: u64,
    pub settle_delay_ms: u64,
    pub device_poll_interval_ms: u64,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            model_root: PathBuf::from("."),
            model_path: PathBuf::from("vosk-model-small-cn-0.22"),
            max_alternatives: 3,
            words: true,
            mode: RecognitionMode::Continuous,
            max_record_length: 15.0,
            frame_queue_capacity: None,
            idle_backoff_ms: 100,
            settle_delay_ms: 2_000,
            device_poll_interval_ms: 50,
        }
    }
}

impl RecognizerConfig {
    pub fn normalize(&mut self) {
        self.max_alternatives = self.max_alternatives.max(1);
        if !self.max_record_length.is_finite() || self.max_record_length <= 0.0 {
            self.max_record_length = 15.0;
        }
        self.max_record_length = self.max_record_length.min(600.0);
        self.frame_queue_capacity = self.frame_queue_capacity.filter(|&n| n > 0);
        self.idle_backoff_ms = self.idle_backoff_ms.clamp(1, 1_000);
        self.settle_delay_ms = self.settle_delay_ms.min(10_000);
        self.device_poll_interval_ms = self.device_poll_interval_ms.clamp(1, 1_000);
        if self.model_root.as_os_str().is_empty() {
            self.model_root = PathBuf::from(".");
        }
    }

    pub fn resolved_model_path(&self) -> PathBuf {
        self.model_root.join(&self.model_path)
    }

    pub fn max_record_duration(&self) -> Duration {
        Duration::from_secs_f32(self.max_record_length)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn device_poll_interval(&self) -> Duration {
        Duration::from_millis(self.device_poll_interval_ms)
    }
}
