use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

/// Lock-free counters shared by the controllers.
#[derive(Debug, Default)]
pub struct RecognizerDiagnostics {
    pub frames_in: AtomicUsize,
    pub frames_dropped: AtomicUsize,
    pub frames_decoded: AtomicUsize,
    pub results_emitted: AtomicUsize,
    pub decode_jobs: AtomicUsize,
    pub triggers_ignored: AtomicUsize,
    pub engine_builds: AtomicUsize,
    pub decode_errors: AtomicUsize,
}

impl RecognizerDiagnostics {
    pub fn reset(&self) {
        self.frames_in.store(0, Ordering::Relaxed);
        self.frames_dropped.store(0, Ordering::Relaxed);
        self.frames_decoded.store(0, Ordering::Relaxed);
        self.results_emitted.store(0, Ordering::Relaxed);
        self.decode_jobs.store(0, Ordering::Relaxed);
        self.triggers_ignored.store(0, Ordering::Relaxed);
        self.engine_builds.store(0, Ordering::Relaxed);
        self.decode_errors.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            frames_in: self.frames_in.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            results_emitted: self.results_emitted.load(Ordering::Relaxed),
            decode_jobs: self.decode_jobs.load(Ordering::Relaxed),
            triggers_ignored: self.triggers_ignored.load(Ordering::Relaxed),
            engine_builds: self.engine_builds.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    pub frames_in: usize,
    pub frames_dropped: usize,
    pub frames_decoded: usize,
    pub results_emitted: usize,
    pub decode_jobs: usize,
    pub triggers_ignored: usize,
    pub engine_builds: usize,
    pub decode_errors: usize,
}
