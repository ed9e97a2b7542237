use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use earshot_core::engine::{Controller, StopTrigger};
use earshot_core::{
    AudioFrame, CaptureSource, EarshotError, EngineFactory, Grammar, KeyPhraseSet, ManualCapture,
    ModelHandle, ModelProvider, RecognitionMode, RecognizerConfig, RecognizerEngine, Result,
    SessionState, SpeechRecognizer, StatusEvent, StubBackend, TranscriptEvent, WavCapture,
};
use parking_lot::Mutex;
use serde_json::json;

// ── Scripted backend ─────────────────────────────────────────────────────────

/// Shared observation points for every engine the backend builds.
#[derive(Default)]
struct EngineLog {
    loads: AtomicUsize,
    fail_loads: AtomicUsize,
    fail_create: AtomicBool,
    grammars: Mutex<Vec<Option<String>>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    decoded_lengths: Mutex<Vec<usize>>,
}

/// Reports a boundary on every call and echoes the first sample of the most
/// recent block as the result text.
struct ScriptedEngine {
    calls: Arc<EngineLog>,
    delay: Duration,
    last: Option<i16>,
    fed: usize,
}

impl RecognizerEngine for ScriptedEngine {
    fn accept_waveform(&mut self, samples: &[i16]) -> Result<bool> {
        let now_active = self.calls.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.max_active.fetch_max(now_active, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.last = samples.first().copied();
        self.fed += samples.len();
        self.calls.active.fetch_sub(1, Ordering::SeqCst);
        Ok(true)
    }

    fn result(&mut self) -> String {
        self.calls.decoded_lengths.lock().push(self.fed);
        self.fed = 0;
        let text = self.last.map(|s| s.to_string()).unwrap_or_default();
        json!({ "text": text }).to_string()
    }

    fn set_max_alternatives(&mut self, _max_alternatives: u16) {}

    fn set_words(&mut self, _enabled: bool) {}
}

struct ScriptedBackend {
    calls: Arc<EngineLog>,
    delay: Duration,
}

impl ScriptedBackend {
    fn new(delay: Duration) -> (Arc<Self>, Arc<EngineLog>) {
        let calls = Arc::new(EngineLog::default());
        let backend = Arc::new(Self {
            calls: Arc::clone(&calls),
            delay,
        });
        (backend, calls)
    }
}

impl ModelProvider for ScriptedBackend {
    fn load_model(&self, path: &Path) -> Result<ModelHandle> {
        self.calls.loads.fetch_add(1, Ordering::SeqCst);
        let remaining = self.calls.fail_loads.load(Ordering::SeqCst);
        if remaining > 0 {
            self.calls.fail_loads.store(remaining - 1, Ordering::SeqCst);
            return Err(EarshotError::ModelLoad {
                path: path.to_path_buf(),
                reason: "scripted failure".into(),
            });
        }
        Ok(ModelHandle::new(path, ()))
    }
}

impl EngineFactory for ScriptedBackend {
    fn create(
        &self,
        _model: &ModelHandle,
        _sample_rate: f32,
        grammar: Option<&Grammar>,
    ) -> Result<Box<dyn RecognizerEngine>> {
        if self.calls.fail_create.load(Ordering::SeqCst) {
            return Err(EarshotError::EngineConstruction("scripted failure".into()));
        }
        self.calls
            .grammars
            .lock()
            .push(grammar.map(|g| g.as_str().to_string()));
        Ok(Box::new(ScriptedEngine {
            calls: Arc::clone(&self.calls),
            delay: self.delay,
            last: None,
            fed: 0,
        }))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn config(mode: RecognitionMode) -> RecognizerConfig {
    RecognizerConfig {
        mode,
        settle_delay_ms: 50,
        device_poll_interval_ms: 5,
        ..RecognizerConfig::default()
    }
}

fn frame(marker: i16) -> AudioFrame {
    AudioFrame::from(vec![marker; 160])
}

fn record_status(rec: &SpeechRecognizer) -> Arc<Mutex<Vec<StatusEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    rec.on_status(move |ev| sink.lock().push(ev.clone()));
    seen
}

fn record_transcripts(rec: &SpeechRecognizer) -> Arc<Mutex<Vec<TranscriptEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    rec.on_transcription(move |ev| sink.lock().push(ev.clone()));
    seen
}

fn messages(seen: &Mutex<Vec<StatusEvent>>) -> Vec<String> {
    seen.lock().iter().map(|ev| ev.message.clone()).collect()
}

/// Poll `cond` every 5 ms until it holds or `timeout` elapses.
fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

async fn initialized(
    mode: RecognitionMode,
    delay: Duration,
) -> (SpeechRecognizer, Arc<ManualCapture>, Arc<EngineLog>) {
    let (backend, calls) = ScriptedBackend::new(delay);
    let capture = Arc::new(ManualCapture::new());
    let rec = SpeechRecognizer::with_backend(config(mode), backend, capture.clone());
    rec.initialize().await.expect("initialize");
    (rec, capture, calls)
}

fn bounded_of(rec: &SpeechRecognizer) -> Arc<earshot_core::engine::BoundedController> {
    match rec.controller() {
        Some(Controller::Bounded(b)) => b,
        _ => panic!("expected bounded controller"),
    }
}

fn continuous_of(rec: &SpeechRecognizer) -> Arc<earshot_core::engine::ContinuousController> {
    match rec.controller() {
        Some(Controller::Continuous(c)) => c,
        _ => panic!("expected continuous controller"),
    }
}

// ── Continuous mode ──────────────────────────────────────────────────────────

#[tokio::test]
async fn continuous_delivers_frames_in_capture_order() {
    let (rec, capture, _calls) = initialized(RecognitionMode::Continuous, Duration::ZERO).await;
    let status = record_status(&rec);
    let transcripts = record_transcripts(&rec);

    rec.start_recognition().expect("start");
    assert_eq!(rec.state(), SessionState::Listening);
    for marker in [1, 2, 3] {
        assert!(capture.push(frame(marker)));
    }

    assert!(wait_until(Duration::from_secs(2), || {
        rec.tick();
        transcripts.lock().len() == 3
    }));
    let texts: Vec<_> = transcripts
        .lock()
        .iter()
        .map(|ev| ev.result.text().unwrap_or_default())
        .collect();
    assert_eq!(texts, ["1", "2", "3"]);
    let seqs: Vec<_> = transcripts.lock().iter().map(|ev| ev.seq).collect();
    assert_eq!(seqs, [0, 1, 2]);
    assert!(messages(&status).contains(&"Recognizer ready".to_string()));

    let stop_requested = Instant::now();
    rec.stop_recognition().expect("stop");
    let worker = continuous_of(&rec);
    assert!(wait_until(Duration::from_secs(1), || !worker.is_worker_active()));
    assert!(
        stop_requested.elapsed() < Duration::from_millis(400),
        "worker took {:?} to observe stop",
        stop_requested.elapsed()
    );
    assert_eq!(rec.state(), SessionState::Stopped);
    assert!(messages(&status).contains(&"Recognizer stop".to_string()));
    assert!(!capture.is_started());
}

#[tokio::test]
async fn continuous_start_while_running_is_rejected() {
    let (rec, capture, _calls) = initialized(RecognitionMode::Continuous, Duration::ZERO).await;
    rec.start_recognition().expect("start");
    assert!(capture.push(frame(1)));
    assert_eq!(rec.diagnostics().frames_in, 1);

    assert!(matches!(
        rec.start_recognition(),
        Err(EarshotError::AlreadyRunning)
    ));
    assert_eq!(
        rec.diagnostics().frames_in,
        1,
        "rejected start must not reset counters"
    );
    assert!(continuous_of(&rec).is_running());
    rec.stop_recognition().expect("stop");
}

#[tokio::test]
async fn continuous_stop_discards_frames_left_in_queue() {
    let (rec, capture, calls) =
        initialized(RecognitionMode::Continuous, Duration::from_millis(100)).await;
    rec.start_recognition().expect("start");
    let worker = continuous_of(&rec);

    assert!(capture.push(frame(1)));
    assert!(wait_until(Duration::from_secs(1), || {
        calls.active.load(Ordering::SeqCst) == 1
    }));
    assert!(capture.push(frame(2)));
    assert!(capture.push(frame(3)));
    rec.stop_recognition().expect("stop");

    assert!(wait_until(Duration::from_secs(1), || !worker.is_worker_active()));
    assert_eq!(worker.queued_frames(), 0);
    let diag = rec.diagnostics();
    assert_eq!(diag.frames_decoded, 1);
    assert_eq!(diag.frames_dropped, 2);
}

#[tokio::test]
async fn continuous_drained_means_result_is_ready() {
    let (rec, capture, _calls) =
        initialized(RecognitionMode::Continuous, Duration::from_millis(50)).await;
    rec.start_recognition().expect("start");
    let worker = continuous_of(&rec);

    assert!(capture.push(frame(4)));
    assert!(!worker.is_drained());
    assert!(wait_until(Duration::from_secs(1), || worker.is_drained()));
    assert_eq!(rec.tick(), 1, "result queued before the worker reports drained");
    rec.stop_recognition().expect("stop");
}

#[tokio::test]
async fn continuous_restart_rebuilds_engine_with_new_phrases() {
    let (rec, _capture, calls) = initialized(RecognitionMode::Continuous, Duration::ZERO).await;

    rec.start_recognition().expect("first start");
    assert!(wait_until(Duration::from_secs(1), || {
        calls.grammars.lock().len() == 1
    }));
    rec.stop_recognition().expect("stop");

    rec.start_recognition_with(&KeyPhraseSet::new(["Left", "Right"]))
        .expect("second start");
    assert!(wait_until(Duration::from_secs(1), || {
        calls.grammars.lock().len() == 2
    }));
    rec.stop_recognition().expect("stop");

    assert_eq!(
        &*calls.grammars.lock(),
        &[None, Some(r#"["left","right","[unk]"]"#.to_string())]
    );
}

#[tokio::test]
async fn continuous_engine_failure_stops_session_and_allows_retry() {
    let (rec, capture, calls) = initialized(RecognitionMode::Continuous, Duration::ZERO).await;
    let status = record_status(&rec);
    calls.fail_create.store(true, Ordering::SeqCst);

    rec.start_recognition().expect("start");
    assert!(wait_until(Duration::from_secs(1), || {
        rec.state() == SessionState::Stopped
    }));
    assert!(messages(&status)
        .iter()
        .any(|m| m.starts_with("Recognizer error")));
    assert!(!capture.is_started());

    calls.fail_create.store(false, Ordering::SeqCst);
    assert!(wait_until(Duration::from_secs(1), || {
        !continuous_of(&rec).is_running()
    }));
    rec.start_recognition().expect("retry start");
    assert!(wait_until(Duration::from_secs(1), || {
        calls.grammars.lock().len() == 1
    }));
    rec.stop_recognition().expect("stop");
}

// ── Bounded mode ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn bounded_gate_admits_one_job_under_concurrent_triggers() {
    let (rec, capture, calls) =
        initialized(RecognitionMode::Bounded, Duration::from_millis(40)).await;
    rec.start_recognition().expect("start");
    capture.push(frame(7));

    let bounded = bounded_of(&rec);
    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let bounded = Arc::clone(&bounded);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                bounded.trigger_stop(StopTrigger::Explicit)
            })
        })
        .collect();
    let dispatched = handles
        .into_iter()
        .map(|h| h.join().expect("trigger thread"))
        .filter(|&won| won)
        .count();

    bounded.wait_idle();
    assert_eq!(dispatched, 1);
    assert_eq!(calls.max_active.load(Ordering::SeqCst), 1);
    let diag = rec.diagnostics();
    assert_eq!(diag.decode_jobs, 1);
    assert_eq!(diag.triggers_ignored, 7);
    assert!(!bounded.is_busy());
}

#[tokio::test]
async fn bounded_max_length_cutoff_is_strict() {
    let (backend, calls) = ScriptedBackend::new(Duration::ZERO);
    let capture = Arc::new(ManualCapture::new());
    let rec = SpeechRecognizer::with_backend(
        RecognizerConfig {
            max_record_length: 1.0,
            ..config(RecognitionMode::Bounded)
        },
        backend,
        capture,
    );
    rec.initialize().await.expect("initialize");
    rec.start_recognition().expect("start");
    let bounded = bounded_of(&rec);

    let t0 = Instant::now();
    bounded.on_frame_at(frame(1), t0);
    bounded.on_frame_at(frame(2), t0 + Duration::from_secs(1));
    assert_eq!(bounded.buffered_samples(), 320, "exactly max length is kept");
    assert!(!bounded.is_busy());

    bounded.on_frame_at(frame(3), t0 + Duration::from_millis(1_001));
    assert_eq!(bounded.buffered_samples(), 0);
    bounded.wait_idle();

    assert_eq!(&*calls.decoded_lengths.lock(), &[320]);
    assert_eq!(rec.diagnostics().decode_jobs, 1);
}

#[tokio::test]
async fn bounded_settle_delay_keeps_gate_after_result() {
    let (backend, _calls) = ScriptedBackend::new(Duration::ZERO);
    let capture = Arc::new(ManualCapture::new());
    let rec = SpeechRecognizer::with_backend(
        RecognizerConfig {
            settle_delay_ms: 300,
            ..config(RecognitionMode::Bounded)
        },
        backend,
        capture.clone(),
    );
    rec.initialize().await.expect("initialize");
    rec.start_recognition().expect("start");
    let bounded = bounded_of(&rec);

    capture.push(frame(5));
    assert!(bounded.trigger_stop(StopTrigger::Explicit));
    assert!(wait_until(Duration::from_secs(1), || rec.tick() == 1));

    assert!(bounded.is_busy(), "gate held through the settle delay");
    capture.push(frame(6));
    assert!(!bounded.trigger_stop(StopTrigger::Explicit));
    assert_eq!(bounded.buffered_samples(), 160, "frame kept for next utterance");

    bounded.wait_idle();
    assert!(!bounded.is_busy());
    assert_eq!(rec.state(), SessionState::Listening);
}

#[tokio::test]
async fn bounded_consumer_reports_each_result_once() {
    let (rec, capture, _calls) = initialized(RecognitionMode::Bounded, Duration::ZERO).await;
    let status = record_status(&rec);
    let transcripts = record_transcripts(&rec);

    rec.start_recognition().expect("start");
    capture.push(frame(9));
    assert_eq!(rec.state(), SessionState::Listening);
    rec.stop_recognition().expect("stop");
    bounded_of(&rec).wait_idle();

    assert_eq!(rec.tick(), 1);
    assert_eq!(rec.tick(), 0);
    assert_eq!(transcripts.lock().len(), 1);
    assert_eq!(
        transcripts.lock()[0].result.text().as_deref(),
        Some("9")
    );

    let msgs = messages(&status);
    let fetching = msgs.iter().position(|m| m == "Fetching Result");
    let received = msgs.iter().position(|m| m == "Received Result");
    assert!(fetching.is_some() && fetching < received);
    assert_eq!(rec.state(), SessionState::Stopped);
}

#[tokio::test]
async fn bounded_stop_with_empty_buffer_dispatches_nothing() {
    let (rec, _capture, calls) = initialized(RecognitionMode::Bounded, Duration::ZERO).await;
    rec.start_recognition().expect("start");
    rec.stop_recognition().expect("stop");

    let bounded = bounded_of(&rec);
    assert!(!bounded.is_busy());
    assert_eq!(rec.diagnostics().decode_jobs, 0);
    assert!(calls.grammars.lock().is_empty());
    assert_eq!(rec.state(), SessionState::Stopped);
}

#[tokio::test]
async fn bounded_restart_during_settle_keeps_max_length() {
    let (backend, calls) = ScriptedBackend::new(Duration::ZERO);
    let capture = Arc::new(ManualCapture::new());
    let rec = SpeechRecognizer::with_backend(
        RecognizerConfig {
            max_record_length: 1.0,
            settle_delay_ms: 200,
            ..config(RecognitionMode::Bounded)
        },
        backend,
        capture.clone(),
    );
    rec.initialize().await.expect("initialize");
    let bounded = bounded_of(&rec);

    rec.start_recognition().expect("start");
    assert!(capture.push(frame(1)));
    rec.stop_recognition().expect("stop");
    assert!(bounded.is_busy());

    rec.start_recognition().expect("restart while job settles");
    let t0 = Instant::now();
    bounded.on_frame_at(frame(2), t0);
    bounded.wait_idle();
    assert!(!bounded.is_busy());

    bounded.on_frame_at(frame(3), t0 + Duration::from_millis(500));
    assert_eq!(bounded.buffered_samples(), 320);
    bounded.on_frame_at(frame(4), t0 + Duration::from_millis(1_001));
    assert_eq!(bounded.buffered_samples(), 0, "cutoff measured from first buffered frame");
    bounded.wait_idle();

    assert_eq!(&*calls.decoded_lengths.lock(), &[160, 320]);
    assert_eq!(rec.diagnostics().decode_jobs, 1);
    rec.stop_recognition().expect("stop");
}

#[tokio::test]
async fn bounded_restart_with_new_phrases_rebuilds_engine() {
    let (rec, capture, calls) = initialized(RecognitionMode::Bounded, Duration::ZERO).await;
    let bounded = bounded_of(&rec);

    rec.start_recognition_with(&KeyPhraseSet::new(["Yes"]))
        .expect("first start");
    assert!(capture.push(frame(1)));
    rec.stop_recognition().expect("stop");
    bounded.wait_idle();

    rec.start_recognition_with(&KeyPhraseSet::new(["No"]))
        .expect("second start");
    assert!(capture.push(frame(2)));
    rec.stop_recognition().expect("stop");
    bounded.wait_idle();

    assert_eq!(
        &*calls.grammars.lock(),
        &[
            Some(r#"["yes","[unk]"]"#.to_string()),
            Some(r#"["no","[unk]"]"#.to_string()),
        ]
    );
}

#[tokio::test]
async fn bounded_engine_reused_within_session_and_rebuilt_after_stop() {
    let (rec, capture, calls) = initialized(RecognitionMode::Bounded, Duration::ZERO).await;
    let bounded = bounded_of(&rec);

    rec.start_recognition().expect("start");
    for marker in [1, 2] {
        assert!(capture.push(frame(marker)));
        assert!(bounded.trigger_stop(StopTrigger::Explicit));
        bounded.wait_idle();
    }
    assert_eq!(calls.grammars.lock().len(), 1, "same engine for both utterances");

    assert!(capture.push(frame(3)));
    rec.stop_recognition().expect("stop");
    bounded.wait_idle();
    assert_eq!(calls.grammars.lock().len(), 2, "stop forces a fresh engine");
    assert_eq!(&*calls.decoded_lengths.lock(), &[160, 160, 160]);
}

#[tokio::test]
async fn bounded_engine_failure_releases_gate_and_stops_session() {
    let (rec, capture, calls) = initialized(RecognitionMode::Bounded, Duration::ZERO).await;
    let status = record_status(&rec);
    let bounded = bounded_of(&rec);
    calls.fail_create.store(true, Ordering::SeqCst);

    rec.start_recognition().expect("start");
    assert!(capture.push(frame(1)));
    assert!(bounded.trigger_stop(StopTrigger::Explicit));
    bounded.wait_idle();

    assert!(!bounded.is_busy());
    assert!(!bounded.is_capturing());
    assert!(!capture.is_started());
    assert_eq!(rec.state(), SessionState::Stopped);
    assert!(messages(&status)
        .iter()
        .any(|m| m.starts_with("Recognizer error")));
    assert_eq!(rec.tick(), 0);

    calls.fail_create.store(false, Ordering::SeqCst);
    rec.start_recognition().expect("retry start");
    assert!(capture.push(frame(2)));
    rec.stop_recognition().expect("stop");
    bounded.wait_idle();
    assert_eq!(calls.grammars.lock().len(), 1);
    assert_eq!(rec.tick(), 1);
}

// ── Initialisation ───────────────────────────────────────────────────────────

#[tokio::test]
async fn initialize_is_one_shot_and_reports_races() {
    let (backend, calls) = ScriptedBackend::new(Duration::ZERO);
    let capture = Arc::new(ManualCapture::unavailable());
    let rec = Arc::new(SpeechRecognizer::with_backend(
        config(RecognitionMode::Continuous),
        backend,
        capture.clone(),
    ));
    let status = record_status(&rec);

    let first = {
        let rec = Arc::clone(&rec);
        tokio::spawn(async move { rec.initialize().await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(rec.state(), SessionState::Initializing);
    assert!(matches!(
        rec.initialize().await,
        Err(EarshotError::AlreadyInitializing)
    ));

    capture.set_available(true);
    first.await.expect("join").expect("first initialize");
    assert!(matches!(
        rec.initialize().await,
        Err(EarshotError::AlreadyInitialized)
    ));

    assert_eq!(calls.loads.load(Ordering::SeqCst), 1);
    assert_eq!(rec.state(), SessionState::Ready);
    let msgs = messages(&status);
    assert_eq!(msgs.iter().filter(|m| *m == "Start Initialize").count(), 3);
    assert!(msgs.iter().any(|m| m.starts_with("Loading Model from: ")));
    assert_eq!(msgs.iter().filter(|m| *m == "Initialized").count(), 1);
}

#[tokio::test]
async fn failed_model_load_can_be_retried() {
    let (backend, calls) = ScriptedBackend::new(Duration::ZERO);
    calls.fail_loads.store(1, Ordering::SeqCst);
    let rec = SpeechRecognizer::with_backend(
        config(RecognitionMode::Continuous),
        backend,
        Arc::new(ManualCapture::new()),
    );

    assert!(matches!(
        rec.initialize().await,
        Err(EarshotError::ModelLoad { .. })
    ));
    assert!(!rec.is_initialized());
    assert_eq!(rec.state(), SessionState::Uninitialized);

    rec.initialize().await.expect("retry");
    assert!(rec.is_initialized());
    assert_eq!(calls.loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn model_path_is_resolved_against_root() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir(dir.path().join("small-en")).expect("model dir");
    let rec = SpeechRecognizer::with_backend(
        RecognizerConfig {
            model_root: dir.path().to_path_buf(),
            model_path: "small-en".into(),
            ..config(RecognitionMode::Continuous)
        },
        Arc::new(StubBackend::new()),
        Arc::new(ManualCapture::new()),
    );
    let status = record_status(&rec);
    rec.initialize().await.expect("initialize");

    let expected = format!(
        "Loading Model from: {}",
        dir.path().join("small-en").display()
    );
    assert!(messages(&status).contains(&expected));
}

// ── WAV replay end to end ────────────────────────────────────────────────────

#[tokio::test]
async fn wav_replay_produces_stub_transcript() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("utterance.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).expect("create wav");
    for i in 0..48_000 {
        let sample = if i < 16_000 { 12_000 } else { 0 };
        writer.write_sample(sample as i16).expect("write");
    }
    writer.finalize().expect("finalize");

    let capture = Arc::new(WavCapture::new(&path).unpaced());
    let rec = SpeechRecognizer::with_backend(
        RecognizerConfig {
            idle_backoff_ms: 5,
            ..config(RecognitionMode::Continuous)
        },
        Arc::new(StubBackend::lenient()),
        capture.clone() as Arc<dyn CaptureSource>,
    );
    let transcripts = record_transcripts(&rec);
    rec.initialize().await.expect("initialize");
    rec.start_recognition().expect("start");
    capture.wait();

    assert!(wait_until(Duration::from_secs(2), || {
        rec.tick();
        !transcripts.lock().is_empty()
    }));
    rec.stop_recognition().expect("stop");

    let text = transcripts.lock()[0].result.text().unwrap_or_default();
    assert!(text.starts_with("[stub: "), "unexpected text {text:?}");
    assert_eq!(rec.diagnostics().frames_in, 30);
}
