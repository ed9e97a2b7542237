//! Energy-based utterance endpointing using RMS threshold + hangover counter.
//!
//! ## Algorithm
//!
//! 1. Compute RMS of the incoming block.
//! 2. If RMS ≥ `threshold` → `Speech`, reset hangover counter.
//! 3. If RMS < `threshold` and hangover counter > 0 → still `Speech`,
//!    decrement counter (prevents clipping word endings).
//! 4. Otherwise → `Silence`.
//!
//! An utterance boundary is the first `Silence` after at least one `Speech`.

use crate::buffering::frame::rms_i16;

/// Whether a given block contains speech or silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceDecision {
    Speech,
    Silence,
}

#[derive(Debug, Clone)]
pub struct EnergyEndpointer {
    /// RMS amplitude threshold in [0.0, 1.0].
    threshold: f32,
    /// Silent blocks still counted as speech after real speech ends.
    hangover_blocks: u32,
    hangover_counter: u32,
    in_speech: bool,
}

impl EnergyEndpointer {
    pub fn new(threshold: f32, hangover_blocks: u32) -> Self {
        Self {
            threshold,
            hangover_blocks,
            hangover_counter: 0,
            in_speech: false,
        }
    }

    pub fn classify(&mut self, samples: &[i16]) -> VoiceDecision {
        if rms_i16(samples) >= self.threshold {
            self.hangover_counter = self.hangover_blocks;
            VoiceDecision::Speech
        } else if self.hangover_counter > 0 {
            self.hangover_counter -= 1;
            VoiceDecision::Speech
        } else {
            VoiceDecision::Silence
        }
    }

    /// Classify a block and report whether it closes an utterance.
    pub fn is_boundary(&mut self, samples: &[i16]) -> bool {
        match self.classify(samples) {
            VoiceDecision::Speech => {
                self.in_speech = true;
                false
            }
            VoiceDecision::Silence => std::mem::replace(&mut self.in_speech, false),
        }
    }

    pub fn in_speech(&self) -> bool {
        self.in_speech
    }

    pub fn reset(&mut self) {
        self.hangover_counter = 0;
        self.in_speech = false;
    }
}

impl Default for EnergyEndpointer {
    fn default() -> Self {
        Self::new(0.02, 8)
    }
}
