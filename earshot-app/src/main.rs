//! `earshot` command-line host.
//!
//! Loads settings, wires a capture source to the stub backend, prints status
//! lines and transcription payloads, and drives the consumer tick until the
//! input ends or Ctrl-C.

mod settings;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use earshot_core::engine::Controller;
use earshot_core::{
    CaptureSource, RecognitionMode, SpeechRecognizer, StubBackend, WavCapture,
};
use settings::{default_settings_path, load_settings, save_settings, AppSettings};
use tracing::info;

const SETTLE_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Continuous,
    Bounded,
}

impl From<ModeArg> for RecognitionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Continuous => RecognitionMode::Continuous,
            ModeArg::Bounded => RecognitionMode::Bounded,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "earshot", version, about = "Speech-to-text session runner")]
struct Args {
    /// Settings file (defaults to the per-user config location).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Replay this WAV file instead of capturing from a microphone.
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Replay the WAV file as fast as possible.
    #[arg(long, requires = "wav")]
    fast: bool,

    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Key phrase to constrain decoding to. Repeatable.
    #[arg(long = "phrase")]
    phrases: Vec<String>,

    #[arg(long)]
    model_root: Option<PathBuf>,

    #[arg(long)]
    model_path: Option<PathBuf>,

    /// Seconds a bounded utterance may last.
    #[arg(long)]
    max_record_length: Option<f32>,

    /// Write the effective settings back to the settings file.
    #[arg(long)]
    save: bool,

    /// Print input device names and exit.
    #[cfg(feature = "microphone")]
    #[arg(long)]
    list_devices: bool,
}

impl Args {
    fn apply(&self, settings: &mut AppSettings) {
        if let Some(mode) = self.mode {
            settings.recognizer.mode = mode.into();
        }
        if !self.phrases.is_empty() {
            settings.key_phrases = self.phrases.clone();
        }
        if let Some(root) = &self.model_root {
            settings.recognizer.model_root = root.clone();
        }
        if let Some(path) = &self.model_path {
            settings.recognizer.model_path = path.clone();
        }
        if let Some(seconds) = self.max_record_length {
            settings.recognizer.max_record_length = seconds;
        }
        settings.normalize();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Tracing ───────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("earshot=info")),
        )
        .init();

    let args = Args::parse();

    #[cfg(feature = "microphone")]
    if args.list_devices {
        for name in earshot_core::CpalCapture::input_device_names() {
            println!("{name}");
        }
        return Ok(());
    }

    let settings_path = args.settings.clone().unwrap_or_else(default_settings_path);
    let mut settings = load_settings(&settings_path);
    args.apply(&mut settings);
    info!(path = %settings_path.display(), mode = ?settings.recognizer.mode, "settings loaded");
    if args.save {
        save_settings(&settings_path, &settings)
            .with_context(|| format!("writing {}", settings_path.display()))?;
    }

    let (capture, wav) = build_capture(&args, settings.preferred_input_device.as_deref())?;
    let recognizer = SpeechRecognizer::with_backend(
        settings.recognizer.clone(),
        Arc::new(StubBackend::lenient()),
        capture,
    );
    recognizer.on_status(|ev| println!("Status changed=>{}", ev.message));
    recognizer.on_transcription(|ev| println!("{}", ev.result.json));

    recognizer.initialize().await?;
    let phrases = settings.key_phrase_set();
    if phrases.is_empty() {
        recognizer.start_recognition()?;
    } else {
        recognizer.start_recognition_with(&phrases)?;
    }

    let period = Duration::from_millis(settings.tick_ms);
    let shutdown = async {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("interrupted"),
            _ = input_finished(&recognizer, wav.as_deref()) => info!("input finished"),
        }
    };
    let delivered = recognizer.run_consumer(period, shutdown).await;

    recognizer.stop_recognition()?;
    wait_for_decode(&recognizer).await;
    let delivered = delivered + recognizer.tick();

    info!(delivered, "session complete");
    println!("{}", serde_json::to_string_pretty(&recognizer.diagnostics())?);
    Ok(())
}

fn build_capture(
    args: &Args,
    preferred_device: Option<&str>,
) -> anyhow::Result<(Arc<dyn CaptureSource>, Option<Arc<WavCapture>>)> {
    if let Some(path) = &args.wav {
        let mut wav = WavCapture::new(path);
        if args.fast {
            wav = wav.unpaced();
        }
        let wav = Arc::new(wav);
        return Ok((wav.clone(), Some(wav)));
    }

    #[cfg(feature = "microphone")]
    {
        let mut mic = earshot_core::CpalCapture::new();
        if let Some(name) = preferred_device {
            mic = mic.with_device(name);
        }
        Ok((Arc::new(mic), None))
    }

    #[cfg(not(feature = "microphone"))]
    {
        let _ = preferred_device;
        anyhow::bail!("no audio source: pass --wav <file> or build with --features microphone")
    }
}

/// Resolves once a WAV replay has ended and every frame it produced has
/// been decoded. Never resolves for live capture.
async fn input_finished(recognizer: &SpeechRecognizer, wav: Option<&WavCapture>) {
    let Some(wav) = wav else {
        return std::future::pending().await;
    };
    while wav.is_running() {
        tokio::time::sleep(SETTLE_POLL).await;
    }
    loop {
        let settled = match recognizer.controller() {
            Some(Controller::Bounded(b)) => !b.is_busy(),
            Some(Controller::Continuous(c)) => c.is_drained() || !c.is_worker_active(),
            None => true,
        };
        if settled {
            return;
        }
        tokio::time::sleep(SETTLE_POLL).await;
    }
}

/// Waits after `stop_recognition` for the bounded decode job or the
/// continuous worker to finish.
async fn wait_for_decode(recognizer: &SpeechRecognizer) {
    loop {
        let pending = match recognizer.controller() {
            Some(Controller::Bounded(b)) => b.is_busy(),
            Some(Controller::Continuous(c)) => c.is_worker_active(),
            None => false,
        };
        if !pending {
            return;
        }
        tokio::time::sleep(SETTLE_POLL).await;
    }
}
